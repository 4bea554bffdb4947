use rand_pcg::Pcg64Mcg;
use twin96::covariance::{sample_covariance, CanadianQuick, Covariance};
use twin96::linalg::{DMatrix, DVector};
use twin96::mc::MultivariateNormal;
use twin96::propagators::Propagator;
use twin96::state::ModelState;
use twin96::trajectory::Trajectory;
use twin96::utils::is_symmetric;

/// Builds a trajectory whose states are i.i.d. draws from a known normal:
/// the lagged differences then have covariance 2Σ, and the estimator must
/// recover Σ.
fn iid_trajectory(target: &Covariance, n_states: usize, seed: u128) -> Trajectory {
    let mvn = MultivariateNormal::zero_mean(target).unwrap();
    let mut rng = Pcg64Mcg::new(seed);
    let mut traj = Trajectory::new();
    for k in 0..n_states {
        traj.states
            .push(ModelState::new(k as f64 * 0.05, mvn.sample(&mut rng)));
    }
    traj.finalize();
    traj
}

#[test]
fn recovers_a_known_covariance_from_iid_states() {
    let target = Covariance::new(DMatrix::from_row_slice(
        2,
        2,
        &[2.0, 0.6, 0.6, 1.0],
    ))
    .unwrap();
    let traj = iid_trajectory(&target, 6000, 0xDA);

    let estimate = CanadianQuick::builder().lag(0.05).build().estimate(&traj).unwrap();
    let gap = (estimate.matrix() - target.matrix()).amax();
    assert!(gap < 0.2, "recovered covariance off by {gap}");
}

#[test]
fn halves_the_difference_covariance() {
    // Same data, estimated by hand without the ½: the estimator must return
    // half of the raw difference covariance.
    let target = Covariance::new(DMatrix::from_diagonal(&DVector::from_vec(vec![1.0, 4.0])))
        .unwrap();
    let traj = iid_trajectory(&target, 2000, 7);

    let estimate = CanadianQuick::builder().lag(0.05).build().estimate(&traj).unwrap();

    let diffs: Vec<DVector<f64>> = traj
        .states
        .windows(2)
        .map(|pair| &pair[1].vector - &pair[0].vector)
        .collect();
    let raw = sample_covariance(&diffs).unwrap();
    assert!((estimate.matrix() - 0.5 * raw.matrix()).amax() < 1e-12);
}

#[test]
fn lorenz96_background_is_symmetric_and_psd() {
    let (model, initial) = crate::spun_up_l96(12, 2.0);
    let prop = Propagator::default(model);
    let mut instance = prop.with(initial);
    let (_, truth) = instance.for_duration_with_traj(20.0).unwrap();

    let background = CanadianQuick::builder()
        .lag(0.25)
        .spinup(1.0)
        .build()
        .estimate(&truth)
        .unwrap();

    assert_eq!(background.dimension(), 12);
    assert!(is_symmetric(background.matrix(), 0.0));
    assert!(background.is_positive_semi_definite());
    assert!(
        background.variances().min() > 0.0,
        "a free running chaotic model must spread in every component"
    );
    // The correlation matrix has a unit diagonal.
    let corr = background.correlation();
    for i in 0..12 {
        assert!((corr[(i, i)] - 1.0).abs() < 1e-12);
    }
}

#[test]
fn stride_thins_the_samples() {
    let target = Covariance::new(DMatrix::identity(2, 2)).unwrap();
    let traj = iid_trajectory(&target, 400, 11);

    // Stride of 4 grid steps: about a quarter of the samples.
    let dense = CanadianQuick::builder().lag(0.05).build();
    let thinned = CanadianQuick::builder().lag(0.05).stride(0.2).build();
    // Both must succeed; the thinned one sees fewer samples so the two
    // estimates differ.
    let d = dense.estimate(&traj).unwrap();
    let t = thinned.estimate(&traj).unwrap();
    assert_ne!(d.matrix(), t.matrix());
}

#[test]
fn rejects_unusable_requests() {
    let target = Covariance::new(DMatrix::identity(2, 2)).unwrap();
    let traj = iid_trajectory(&target, 50, 3);

    // Lag off the 0.05 MTU grid.
    assert!(CanadianQuick::builder().lag(0.07).build().estimate(&traj).is_err());
    // Lag longer than the whole run.
    assert!(CanadianQuick::builder().lag(5.0).build().estimate(&traj).is_err());
    // Spinup swallowing every sample.
    assert!(CanadianQuick::builder()
        .lag(0.05)
        .spinup(100.0)
        .build()
        .estimate(&traj)
        .is_err());
}
