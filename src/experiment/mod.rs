/*
    twin96, identical twin experiments with the Lorenz 96 model
    Copyright (C) 2026-onwards The twin96 developers

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

//! The identical twin experiment driver.
//!
//! A twin experiment validates assimilation machinery under controlled
//! conditions: the same model generates the truth and the observations, so
//! every error source is known by construction. The driver runs the whole
//! pipeline of the course exercise in order: spinup onto the attractor,
//! truth run, linearization error study, Canadian Quick background
//! covariance, observation synthesis, CSV export.

use crate::covariance::{CanadianQuick, Covariance, CovarianceError};
use crate::dynamics::{Dynamics, DynamicsError, Lorenz96};
use crate::io::export::{
    write_linearization, write_matrix, write_observations, write_trajectory,
};
use crate::io::{ConfigError, InputOutputError, IntegScheme, ScenarioConfig};
use crate::linearize::{LinearizationStats, LinearizationStudy};
use crate::mc::PerturbationGenerator;
use crate::obs::{ObsNoise, ObservationArc, ObservationError, ObservationSimulator};
use crate::propagators::{
    CashKarp45, Dormand45, PropOpts, Propagator, PropagationError, RK2Fixed, RK4Fixed, RSSStep,
};
use crate::state::ModelState;
use crate::trajectory::Trajectory;
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use snafu::prelude::*;
use std::path::Path;

/// Fraction of the forcing used to bump the spinup initial condition off the
/// unstable equilibrium.
const SPINUP_BUMP_FRACTION: f64 = 0.01;

/// Experiment errors, wrapping whichever stage failed.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ExperimentError {
    #[snafu(display("scenario error: {source}"))]
    Scenario { source: ConfigError },
    #[snafu(display("model setup failed: {source}"))]
    Model { source: DynamicsError },
    #[snafu(display("propagation failed: {source}"))]
    ExpPropagation { source: PropagationError },
    #[snafu(display("background estimation failed: {source}"))]
    ExpCovariance { source: CovarianceError },
    #[snafu(display("observation synthesis failed: {source}"))]
    ExpObservation { source: ObservationError },
    #[snafu(display("export failed: {source}"))]
    ExpExport { source: InputOutputError },
}

/// The products of one full twin experiment.
#[derive(Clone, Debug)]
pub struct TwinRun {
    /// The on-attractor state the truth run started from, at t = 0.
    pub initial: ModelState,
    /// The synthetic truth.
    pub truth: Trajectory,
    /// The ensemble linearization error study around the initial state.
    pub study: LinearizationStats,
    /// The Canadian Quick background error covariance estimate.
    pub background: Covariance,
    /// The synthetic observations of the truth.
    pub observations: ObservationArc,
}

/// Drives an identical twin experiment from a scenario configuration.
pub struct TwinExperiment {
    cfg: ScenarioConfig,
    model: Lorenz96,
}

impl TwinExperiment {
    /// Builds the experiment, validating the scenario and the model.
    pub fn new(cfg: ScenarioConfig) -> Result<Self, ExperimentError> {
        cfg.validate().context(ScenarioSnafu)?;
        let model =
            Lorenz96::new(cfg.model.dimension, cfg.model.forcing).context(ModelSnafu)?;
        Ok(Self { cfg, model })
    }

    pub fn scenario(&self) -> &ScenarioConfig {
        &self.cfg
    }

    pub fn model(&self) -> &Lorenz96 {
        &self.model
    }

    /// The propagator requested by the scenario.
    pub fn propagator(&self) -> Propagator<'static, Lorenz96, RSSStep> {
        let integ = &self.cfg.integration;
        match integ.scheme {
            IntegScheme::Rk2 => Propagator::new::<RK2Fixed>(
                self.model,
                PropOpts::with_fixed_step(integ.step),
            ),
            IntegScheme::Rk4 => Propagator::new::<RK4Fixed>(
                self.model,
                PropOpts::with_fixed_step(integ.step),
            ),
            IntegScheme::CashKarp45 => Propagator::new::<CashKarp45>(
                self.model,
                PropOpts::with_adaptive_step(
                    integ.min_step,
                    integ.max_step,
                    integ.tolerance,
                    RSSStep {},
                ),
            ),
            IntegScheme::Dormand45 => Propagator::new::<Dormand45>(
                self.model,
                PropOpts::with_adaptive_step(
                    integ.min_step,
                    integ.max_step,
                    integ.tolerance,
                    RSSStep {},
                ),
            ),
        }
    }

    /// Integrates from the bumped equilibrium through the spinup transient
    /// and returns the on-attractor state, relabeled to t = 0.
    pub fn spinup(&self) -> Result<ModelState, ExperimentError> {
        let start = self
            .model
            .perturbed_equilibrium(SPINUP_BUMP_FRACTION * self.model.forcing);
        info!(
            "spinning up {} for {} MTU",
            self.model, self.cfg.spinup
        );
        let prop = self.propagator();
        let mut instance = prop.with(start);
        let mut state = instance
            .for_duration(self.cfg.spinup)
            .context(ExpPropagationSnafu)?;
        state.time = 0.0;
        debug!("spinup complete: {state}");
        Ok(state)
    }

    /// Runs the truth segment, recording states on the uniform
    /// `integration.step` grid regardless of the scheme's internal stepping.
    pub fn generate_truth(&self, initial: &ModelState) -> Result<Trajectory, ExperimentError> {
        let dt = self.cfg.integration.step;
        let n_steps = (self.cfg.truth_length / dt).round() as usize;
        info!(
            "generating {} MTU of truth ({} states at {} MTU)",
            self.cfg.truth_length,
            n_steps + 1,
            dt
        );

        let prop = self.propagator();
        let mut instance = prop.with(initial.clone());
        let mut traj = Trajectory::new();
        traj.states.push(initial.clone());
        for k in 1..=n_steps {
            let state = instance
                .until_time(initial.time + k as f64 * dt)
                .context(ExpPropagationSnafu)?;
            traj.states.push(state);
        }
        traj.finalize();
        Ok(traj)
    }

    /// Runs the ensemble linearization error study around the provided state.
    pub fn linearization_study(
        &self,
        base: &ModelState,
    ) -> Result<LinearizationStats, ExperimentError> {
        let lin = &self.cfg.linearization;
        let study = LinearizationStudy::builder()
            .lead_times(lin.lead_times.clone())
            .generator(PerturbationGenerator::uniform(
                self.model.dimension(),
                lin.sigma,
            ))
            .samples(lin.samples)
            .seed(self.cfg.seed)
            .build();
        study
            .run(&self.propagator(), base)
            .context(ExpPropagationSnafu)
    }

    /// Estimates the background error covariance from the truth run.
    pub fn estimate_background(&self, truth: &Trajectory) -> Result<Covariance, ExperimentError> {
        let bg = &self.cfg.background;
        let estimator = CanadianQuick {
            lag: bg.lag,
            stride: bg.stride,
            spinup: bg.spinup,
        };
        estimator.estimate(truth).context(ExpCovarianceSnafu)
    }

    /// Synthesizes the observation arc over the truth run.
    pub fn synthesize_observations<R: Rng>(
        &self,
        truth: &Trajectory,
        rng: &mut R,
    ) -> Result<ObservationArc, ExperimentError> {
        let obs = &self.cfg.observations;
        let operator = obs
            .operator
            .build(self.model.dimension())
            .context(ExpObservationSnafu)?;
        let noise = ObsNoise::uniform(operator.obs_dim(), obs.sigma);
        let simulator =
            ObservationSimulator::new(operator, noise, obs.cadence).context(ExpObservationSnafu)?;
        simulator.simulate(truth, rng).context(ExpObservationSnafu)
    }

    /// Runs the full pipeline, exporting the products if the scenario
    /// requests it.
    pub fn run(&self) -> Result<TwinRun, ExperimentError> {
        let initial = self.spinup()?;
        let truth = self.generate_truth(&initial)?;
        let study = self.linearization_study(&initial)?;
        let background = self.estimate_background(&truth)?;
        let mut rng = Pcg64Mcg::seed_from_u64(self.cfg.seed);
        let observations = self.synthesize_observations(&truth, &mut rng)?;

        info!("truth: {truth}");
        info!("background: {background}");
        info!("observations: {observations}");

        let run = TwinRun {
            initial,
            truth,
            study,
            background,
            observations,
        };
        if let Some(dir) = &self.cfg.output_dir {
            self.export(&run, dir)?;
        }
        Ok(run)
    }

    /// Writes every product of the run as CSV into the provided directory.
    pub fn export<P: AsRef<Path>>(&self, run: &TwinRun, dir: P) -> Result<(), ExperimentError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .map_err(|source| InputOutputError::StdIo {
                action: "creating the output directory",
                source,
            })
            .context(ExpExportSnafu)?;

        write_trajectory(dir.join("truth.csv"), &run.truth).context(ExpExportSnafu)?;
        write_matrix(dir.join("background.csv"), run.background.matrix())
            .context(ExpExportSnafu)?;
        write_matrix(
            dir.join("background_correlation.csv"),
            &run.background.correlation(),
        )
        .context(ExpExportSnafu)?;
        write_observations(dir.join("observations.csv"), &run.observations)
            .context(ExpExportSnafu)?;
        write_linearization(dir.join("linearization.csv"), &run.study)
            .context(ExpExportSnafu)?;
        info!("exported all products to {}", dir.display());
        Ok(())
    }
}
