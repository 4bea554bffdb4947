use approx::assert_abs_diff_eq;
use twin96::dynamics::Dynamics;
use twin96::linalg::{DMatrix, DVector};
use twin96::linearize::{linearization_error, transition_matrix};
use twin96::propagators::{PropOpts, Propagator};

#[test]
fn transition_matrix_at_zero_lead_time_is_identity() {
    let (model, base) = crate::spun_up_l96(8, 1.0);
    let prop = Propagator::default(model);
    let phi = transition_matrix(&prop, &base, 0.0).unwrap();
    assert!((phi - DMatrix::identity(8, 8)).amax() < 1e-14);
}

#[test]
fn transition_matrix_matches_finite_differences() {
    let (model, base) = crate::spun_up_l96(6, 1.0);
    let prop = Propagator::rk4(model, PropOpts::with_fixed_step(0.01));
    let tau = 0.1;
    let phi = transition_matrix(&prop, &base, tau).unwrap();

    let propagate = |x0: DVector<f64>| {
        let mut state = base.clone();
        state.vector = x0;
        let mut instance = prop.with(state);
        instance.for_duration(tau).unwrap().vector
    };

    let h = 1e-5;
    for j in 0..model.dimension() {
        let mut xp = base.vector.clone();
        let mut xm = base.vector.clone();
        xp[j] += h;
        xm[j] -= h;
        let fd_col = (propagate(xp) - propagate(xm)) / (2.0 * h);
        for i in 0..model.dimension() {
            assert_abs_diff_eq!(phi[(i, j)], fd_col[i], epsilon = 1e-6);
        }
    }
}

#[test]
fn linearization_error_vanishes_with_the_perturbation() {
    let (model, base) = crate::spun_up_l96(8, 1.0);
    let prop = Propagator::default(model);

    // A fixed perturbation direction at two amplitudes: the relative error
    // must scale down with the amplitude.
    let direction = DVector::from_fn(8, |i, _| if i % 2 == 0 { 1.0 } else { -0.5 });
    let small = linearization_error(&prop, &base, &(&direction * 1e-6), &[0.2]).unwrap();
    let large = linearization_error(&prop, &base, &(&direction * 1e-2), &[0.2]).unwrap();

    assert!(small[0].relative_error < 1e-3);
    assert!(small[0].relative_error < large[0].relative_error);
}

#[test]
fn linearization_error_grows_with_lead_time() {
    let (model, base) = crate::spun_up_l96(8, 1.0);
    let prop = Propagator::default(model);
    let delta = DVector::from_element(8, 1e-3);

    let samples = linearization_error(&prop, &base, &delta, &[0.05, 0.5, 1.5]).unwrap();
    assert_eq!(samples.len(), 3);
    // Sorted by lead time.
    assert_abs_diff_eq!(samples[0].lead_time, 0.05, epsilon = 1e-15);
    // Short lead: the tangent linear model tracks the nonlinear evolution.
    assert!(
        samples[0].relative_error < 0.05,
        "relative error at τ = 0.05: {}",
        samples[0].relative_error
    );
    // The gap grows by orders of magnitude over 1.5 MTU.
    assert!(samples[2].relative_error > samples[0].relative_error);
    // The nonlinear and tangent RMS both start at the perturbation scale.
    assert!(samples[0].nonlinear_rms > 0.0 && samples[0].tangent_rms > 0.0);
}

#[test]
fn lead_times_are_processed_sorted_regardless_of_input_order() {
    let (model, base) = crate::spun_up_l96(6, 1.0);
    let prop = Propagator::default(model);
    let delta = DVector::from_element(6, 1e-4);

    let shuffled = linearization_error(&prop, &base, &delta, &[0.3, 0.05, 0.15]).unwrap();
    let times: Vec<f64> = shuffled.iter().map(|s| s.lead_time).collect();
    assert_eq!(times, vec![0.05, 0.15, 0.3]);
}
