use approx::assert_abs_diff_eq;
use rstest::{fixture, rstest};
use twin96::dynamics::{Lorenz63, Lorenz96};
use twin96::linalg::DVector;
use twin96::propagators::{CashKarp45, PropOpts, Propagator, RSSStep};
use twin96::state::ModelState;
use twin96::utils::rms;

#[fixture]
fn l96() -> Lorenz96 {
    Lorenz96::canonical()
}

#[rstest]
fn equilibrium_is_a_fixed_point(l96: Lorenz96) {
    // At x_i = F the derivative vanishes exactly, so the integrator must not
    // move the state at all, step after step.
    let prop = Propagator::default(l96);
    let mut instance = prop.with(l96.equilibrium());
    let end = instance.for_duration(1.0).unwrap();
    assert!((end.vector - l96.equilibrium().vector).amax() < 1e-13);
    assert_abs_diff_eq!(end.time, 1.0, epsilon = 1e-12);
}

#[test]
fn rk4_exhibits_fourth_order_convergence() {
    // Richardson step halving on a smooth Lorenz 63 arc: the difference
    // between consecutive solutions must shrink by about 2^4 per halving.
    let model = Lorenz63::default();
    let initial = ModelState::new(0.0, DVector::from_vec(vec![1.0, 1.0, 1.0]));
    let solution = |step: f64| {
        let prop = Propagator::rk4(model, PropOpts::with_fixed_step(step));
        let mut instance = prop.with(initial.clone());
        instance.for_duration(0.5).unwrap().vector
    };

    let coarse = solution(0.02);
    let medium = solution(0.01);
    let fine = solution(0.005);

    let ratio = (&coarse - &medium).norm() / (&medium - &fine).norm();
    assert!(
        ratio > 8.0 && ratio < 32.0,
        "expected a convergence ratio near 16, got {ratio}"
    );
}

#[rstest]
fn adaptive_agrees_with_fine_fixed_step(l96: Lorenz96) {
    let start = {
        let prop = Propagator::default(l96);
        let mut instance = prop.with(l96.perturbed_equilibrium(0.08));
        let mut state = instance.for_duration(2.0).unwrap();
        state.time = 0.0;
        state
    };

    let fine = {
        let prop = Propagator::rk4(l96, PropOpts::with_fixed_step(0.005));
        let mut instance = prop.with(start.clone());
        instance.for_duration(1.0).unwrap()
    };
    let adaptive = {
        let opts = PropOpts::with_adaptive_step(1e-6, 0.1, 1e-10, RSSStep {});
        let prop = Propagator::new::<CashKarp45>(l96, opts);
        let mut instance = prop.with(start);
        let end = instance.for_duration(1.0).unwrap();
        let details = instance.latest_details();
        assert!(details.step.abs() <= 0.1 + 1e-12);
        end
    };

    let gap = rms(&(&fine.vector - &adaptive.vector));
    assert!(gap < 1e-5, "adaptive vs fine fixed step gap: {gap:.3e}");
    assert_abs_diff_eq!(fine.time, adaptive.time, epsilon = 1e-12);
}

#[rstest]
fn stop_time_is_hit_exactly(l96: Lorenz96) {
    // 0.5 MTU is not a multiple of the 0.15 MTU step, so the propagator must
    // shorten the final step.
    let prop = Propagator::rk4(l96, PropOpts::with_fixed_step(0.15));
    let mut instance = prop.with(l96.perturbed_equilibrium(0.08));
    let end = instance.for_duration(0.5).unwrap();
    assert_abs_diff_eq!(end.time, 0.5, epsilon = 1e-12);
    // The subsequent call still honors the original step.
    let end = instance.for_duration(0.3).unwrap();
    assert_abs_diff_eq!(end.time, 0.8, epsilon = 1e-12);
}

#[rstest]
fn backward_propagation_returns_to_start(l96: Lorenz96) {
    let (_, start) = crate::spun_up_l96(40, 2.0);
    let prop = Propagator::rk4(l96, PropOpts::with_fixed_step(0.01));
    let mut instance = prop.with(start.clone());
    instance.for_duration(0.5).unwrap();
    let back = instance.for_duration(-0.5).unwrap();
    assert_abs_diff_eq!(back.time, start.time, epsilon = 1e-12);
    let gap = rms(&(&back.vector - &start.vector));
    assert!(gap < 1e-5, "forward/backward gap: {gap:.3e}");
}

#[rstest]
fn zero_duration_is_a_noop(l96: Lorenz96) {
    let prop = Propagator::default(l96);
    let start = l96.perturbed_equilibrium(0.08);
    let mut instance = prop.with(start.clone());
    let end = instance.for_duration(0.0).unwrap();
    assert_eq!(end, start);
}

#[rstest]
fn trajectory_records_every_step(l96: Lorenz96) {
    let prop = Propagator::default(l96);
    let mut instance = prop.with(l96.perturbed_equilibrium(0.08));
    let (end, traj) = instance.for_duration_with_traj(1.0).unwrap();
    // 20 steps of 0.05 MTU plus the start state.
    assert_eq!(traj.len(), 21);
    assert_eq!(traj.first().unwrap().time, 0.0);
    assert_eq!(traj.last().unwrap(), &end);
    let dt = traj.sampling_interval().unwrap();
    assert_abs_diff_eq!(dt, 0.05, epsilon = 1e-9);
}

#[test]
fn dimension_mismatch_surfaces_as_an_error() {
    let model = Lorenz96::canonical();
    let prop = Propagator::default(model);
    let mut instance = prop.with(ModelState::zeros(39));
    assert!(instance.for_duration(0.1).is_err());
}

#[rstest]
fn default_propagator_uses_rk4_at_classroom_step(l96: Lorenz96) {
    let prop = Propagator::default(l96);
    let mut instance = prop.with(l96.perturbed_equilibrium(0.08));
    instance.for_duration(0.05).unwrap();
    let details = instance.latest_details();
    assert_abs_diff_eq!(details.step, 0.05, epsilon = 1e-15);
}
