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

//! Tangent-linear diagnostics.
//!
//! The linearization error of a perturbation δ over a lead time τ is the gap
//! between its true nonlinear evolution, M_τ(x+δ) − M_τ(x), and the
//! tangent-linear prediction Φ(τ)·δ. How fast that gap grows sets the window
//! in which incremental/linearized assimilation methods can be trusted.

use crate::dynamics::Dynamics;
use crate::linalg::{DMatrix, DVector};
use crate::mc::PerturbationGenerator;
use crate::propagators::{ErrorCtrl, PropStateSnafu, PropagationError, Propagator};
use crate::state::ModelState;
use crate::utils::rms;
use indicatif::ParallelProgressIterator;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use rayon::prelude::*;
use snafu::prelude::*;
use typed_builder::TypedBuilder;

/// Propagates the state transition matrix Φ(τ) from the provided state over
/// the lead time (in MTU).
pub fn transition_matrix<D: Dynamics, E: ErrorCtrl>(
    prop: &Propagator<D, E>,
    state: &ModelState,
    lead_time: f64,
) -> Result<DMatrix<f64>, PropagationError> {
    let mut instance = prop.with(state.clone().with_stm());
    let end = instance.for_duration(lead_time)?;
    Ok(end.stm().context(PropStateSnafu)?.clone())
}

/// The linearization error of one perturbation at one lead time.
#[derive(Clone, Copy, Debug)]
pub struct LinearizationSample {
    /// Lead time τ in MTU.
    pub lead_time: f64,
    /// RMS of the nonlinear perturbation evolution M_τ(x+δ) − M_τ(x).
    pub nonlinear_rms: f64,
    /// RMS of the tangent-linear prediction Φ(τ)·δ.
    pub tangent_rms: f64,
    /// RMS of the difference between the two.
    pub error_rms: f64,
    /// `error_rms` relative to `nonlinear_rms` (zero when the latter vanishes).
    pub relative_error: f64,
}

/// Compares the nonlinear and tangent-linear evolutions of one perturbation
/// at each requested lead time (returned sorted by lead time).
///
/// All propagations start from the same base state and share the integrator
/// settings of the provided propagator; the nominal and perturbed runs are
/// advanced incrementally through the sorted lead times.
pub fn linearization_error<D: Dynamics, E: ErrorCtrl>(
    prop: &Propagator<D, E>,
    base: &ModelState,
    delta: &DVector<f64>,
    lead_times: &[f64],
) -> Result<Vec<LinearizationSample>, PropagationError> {
    let mut times = lead_times.to_vec();
    times.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let mut nominal = prop.with(base.clone().with_stm());
    let mut perturbed_start = base.clone();
    perturbed_start.vector += delta;
    let mut perturbed = prop.with(perturbed_start);

    let t0 = base.time;
    let mut samples = Vec::with_capacity(times.len());
    for tau in times {
        let nom = nominal.until_time(t0 + tau)?;
        let per = perturbed.until_time(t0 + tau)?;
        let phi = nom.stm().context(PropStateSnafu)?;

        let d_nl = &per.vector - &nom.vector;
        let d_tl = phi * delta;
        let gap = &d_nl - &d_tl;

        let nonlinear_rms = rms(&d_nl);
        let error_rms = rms(&gap);
        samples.push(LinearizationSample {
            lead_time: tau,
            nonlinear_rms,
            tangent_rms: rms(&d_tl),
            error_rms,
            relative_error: if nonlinear_rms > 0.0 {
                error_rms / nonlinear_rms
            } else {
                0.0
            },
        });
    }
    Ok(samples)
}

/// An ensemble linearization error study.
///
/// Draws `samples` random perturbations, runs [`linearization_error`] for
/// each in parallel, and aggregates the relative errors per lead time.
#[derive(Clone, Debug, TypedBuilder)]
#[builder(doc)]
pub struct LinearizationStudy {
    /// The lead times to probe, in MTU.
    pub lead_times: Vec<f64>,
    /// The perturbation generator.
    pub generator: PerturbationGenerator,
    /// Ensemble size.
    #[builder(default = 50)]
    pub samples: usize,
    /// RNG seed; sample `i` uses `seed + i` so runs are reproducible and
    /// independent of the thread schedule.
    #[builder(default = 0)]
    pub seed: u64,
}

/// Aggregated ensemble linearization errors, one entry per lead time.
#[derive(Clone, Debug)]
pub struct LinearizationStats {
    /// Sorted lead times, in MTU.
    pub lead_times: Vec<f64>,
    /// Ensemble size behind each aggregate.
    pub samples: usize,
    /// Mean RMS linearization error.
    pub mean_error_rms: Vec<f64>,
    /// Mean, smallest and largest relative error across the ensemble.
    pub mean_relative_error: Vec<f64>,
    pub min_relative_error: Vec<f64>,
    pub max_relative_error: Vec<f64>,
}

impl LinearizationStats {
    /// One row per lead time: (τ, mean error RMS, mean, min and max relative error).
    pub fn rows(&self) -> Vec<(f64, f64, f64, f64, f64)> {
        (0..self.lead_times.len())
            .map(|i| {
                (
                    self.lead_times[i],
                    self.mean_error_rms[i],
                    self.mean_relative_error[i],
                    self.min_relative_error[i],
                    self.max_relative_error[i],
                )
            })
            .collect()
    }
}

impl LinearizationStudy {
    /// Runs the ensemble study around the provided base state.
    pub fn run<D: Dynamics, E: ErrorCtrl>(
        &self,
        prop: &Propagator<D, E>,
        base: &ModelState,
    ) -> Result<LinearizationStats, PropagationError> {
        let n_samples = self.samples.max(1);
        info!(
            "linearization study: {} samples over {} lead times",
            n_samples,
            self.lead_times.len()
        );

        let ensemble: Vec<Vec<LinearizationSample>> = (0..n_samples)
            .into_par_iter()
            .progress_count(n_samples as u64)
            .map(|i| {
                let mut rng = Pcg64Mcg::seed_from_u64(self.seed.wrapping_add(i as u64));
                let delta = self.generator.sample(&mut rng);
                linearization_error(prop, base, &delta, &self.lead_times)
            })
            .collect::<Result<Vec<_>, PropagationError>>()?;

        let n_times = self.lead_times.len();
        let mut stats = LinearizationStats {
            lead_times: ensemble
                .first()
                .map(|s| s.iter().map(|e| e.lead_time).collect())
                .unwrap_or_default(),
            samples: n_samples,
            mean_error_rms: vec![0.0; n_times],
            mean_relative_error: vec![0.0; n_times],
            min_relative_error: vec![f64::INFINITY; n_times],
            max_relative_error: vec![f64::NEG_INFINITY; n_times],
        };
        for member in &ensemble {
            for (i, sample) in member.iter().enumerate() {
                stats.mean_error_rms[i] += sample.error_rms / n_samples as f64;
                stats.mean_relative_error[i] += sample.relative_error / n_samples as f64;
                stats.min_relative_error[i] = stats.min_relative_error[i].min(sample.relative_error);
                stats.max_relative_error[i] = stats.max_relative_error[i].max(sample.relative_error);
            }
        }
        Ok(stats)
    }
}
