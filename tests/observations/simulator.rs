use approx::assert_abs_diff_eq;
use rand_pcg::Pcg64Mcg;
use twin96::experiment::TwinExperiment;
use twin96::io::{OperatorKind, ScenarioConfig};
use twin96::obs::{LinearOperator, ObsNoise, ObservationOperator, ObservationSimulator};
use twin96::propagators::Propagator;

/// A small scenario that keeps the whole pipeline cheap.
fn small_scenario() -> ScenarioConfig {
    let mut cfg = ScenarioConfig::default();
    cfg.model.dimension = 8;
    cfg.spinup = 1.0;
    cfg.truth_length = 5.0;
    cfg.linearization.samples = 2;
    cfg.linearization.lead_times = vec![0.05, 0.2];
    cfg
}

#[test]
fn noiseless_observations_reproduce_the_truth() {
    let (model, initial) = crate::spun_up_l96(8, 1.0);
    let prop = Propagator::default(model);
    let mut instance = prop.with(initial);
    let (_, truth) = instance.for_duration_with_traj(5.0).unwrap();

    let h = LinearOperator::every_nth(8, 0, 2).unwrap();
    let sim = ObservationSimulator::new(h.clone(), ObsNoise::none(4), 0.25).unwrap();
    let arc = sim.simulate(&truth, &mut Pcg64Mcg::new(1)).unwrap();

    // 5 MTU at a 0.25 MTU cadence, including the initial batch.
    assert_eq!(arc.len(), 21);
    for obs in arc.iter() {
        let state = truth.nearest(obs.time).unwrap();
        assert_eq!(obs.values, h.observe(&state.vector).unwrap());
    }
}

#[test]
fn noisy_observations_have_the_configured_spread() {
    // Observe a constant zero truth so the sample spread is the noise alone.
    let mut truth = twin96::trajectory::Trajectory::new();
    for k in 0..4000 {
        truth
            .states
            .push(twin96::state::ModelState::new(k as f64 * 0.05, twin96::linalg::DVector::zeros(1)));
    }
    truth.finalize();

    let sigma = 2.0;
    let sim = ObservationSimulator::new(
        LinearOperator::identity(1),
        ObsNoise::uniform(1, sigma),
        0.05,
    )
    .unwrap();
    let arc = sim.simulate(&truth, &mut Pcg64Mcg::new(31)).unwrap();

    let n = arc.len() as f64;
    let mean: f64 = arc.iter().map(|o| o.values[0]).sum::<f64>() / n;
    let var: f64 = arc.iter().map(|o| (o.values[0] - mean).powi(2)).sum::<f64>() / (n - 1.0);
    assert!(
        (var.sqrt() - sigma).abs() < 0.15,
        "sample σ = {} vs configured σ = {sigma}",
        var.sqrt()
    );
}

#[test]
fn twin_experiment_runs_end_to_end() {
    let experiment = TwinExperiment::new(small_scenario()).unwrap();
    let run = experiment.run().unwrap();

    // Truth on the 0.05 MTU grid: 5 MTU = 101 states starting at t = 0.
    assert_eq!(run.truth.len(), 101);
    assert_eq!(run.truth.first().unwrap().time, 0.0);
    assert_abs_diff_eq!(run.truth.last().unwrap().time, 5.0, epsilon = 1e-9);
    assert_eq!(run.initial.vector, run.truth.first().unwrap().vector);

    // Default operator: every other of the 8 gridpoints, every 0.25 MTU.
    assert_eq!(run.observations.len(), 21);
    assert_eq!(run.observations.observations[0].values.len(), 4);

    // Background: right size, usable as a covariance.
    assert_eq!(run.background.dimension(), 8);
    assert!(run.background.is_positive_semi_definite());

    // Study: one aggregate per configured lead time.
    assert_eq!(run.study.lead_times, vec![0.05, 0.2]);
    assert!(run
        .study
        .mean_relative_error
        .iter()
        .all(|e| e.is_finite() && *e >= 0.0));
}

#[test]
fn twin_experiment_is_reproducible() {
    let experiment = TwinExperiment::new(small_scenario()).unwrap();
    let a = experiment.run().unwrap();
    let b = experiment.run().unwrap();
    assert_eq!(a.observations.observations, b.observations.observations);
    assert_eq!(a.study.mean_relative_error, b.study.mean_relative_error);
    assert_eq!(
        a.background.matrix(),
        b.background.matrix()
    );
}

#[test]
fn quadratic_scenario_observes_half_squares() {
    let mut cfg = small_scenario();
    cfg.observations.operator = OperatorKind::Quadratic;
    cfg.observations.sigma = 0.0;
    let experiment = TwinExperiment::new(cfg).unwrap();
    let run = experiment.run().unwrap();

    let first_truth = run.truth.first().unwrap();
    let first_obs = &run.observations.observations[0];
    assert_eq!(first_obs.time, first_truth.time);
    for i in 0..8 {
        assert_abs_diff_eq!(
            first_obs.values[i],
            0.5 * first_truth.vector[i] * first_truth.vector[i],
            epsilon = 1e-14
        );
    }
}
