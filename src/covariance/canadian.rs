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

use super::{sample_covariance, Covariance, CovarianceError, CovTrajectorySnafu};
use crate::linalg::DVector;
use crate::trajectory::Trajectory;
use snafu::prelude::*;
use typed_builder::TypedBuilder;

/// The Canadian Quick background error covariance estimator.
///
/// A single long free run stands in for a population of forecasts: states
/// separated by the lag τ are differenced, d_k = x(t_k + τ) − x(t_k), and the
/// background covariance is estimated as
///
/// ```text
/// B̂ = ½ · Cov(d)
/// ```
///
/// where the ½ undoes the variance doubling of differencing two states whose
/// errors are approximately uncorrelated at that separation. The lag should
/// be long enough to decorrelate (a day or more of "atmosphere") and short
/// enough that the climatological spread does not dominate.
#[derive(Clone, Copy, Debug, TypedBuilder)]
#[builder(doc)]
pub struct CanadianQuick {
    /// The difference lag τ in MTU.
    #[builder(default = 0.25)]
    pub lag: f64,
    /// The spacing between successive difference samples in MTU. Defaults to
    /// the trajectory sampling interval.
    #[builder(default, setter(strip_option))]
    pub stride: Option<f64>,
    /// Leading transient to discard before sampling, in MTU.
    #[builder(default = 0.0)]
    pub spinup: f64,
}

impl Default for CanadianQuick {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CanadianQuick {
    /// Estimates the background error covariance from a free-run trajectory.
    ///
    /// The trajectory must be sampled on a uniform grid and both the lag and
    /// the stride must be multiples of the sampling interval.
    pub fn estimate(&self, traj: &Trajectory) -> Result<Covariance, CovarianceError> {
        let dt = traj.sampling_interval().context(CovTrajectorySnafu)?;
        let lag_steps = Self::resolve_on_grid(self.lag, dt)?;
        ensure!(
            lag_steps >= 1,
            super::LagNotResolvedSnafu { lag: self.lag, dt }
        );
        let stride_steps = match self.stride {
            Some(stride) => Self::resolve_on_grid(stride, dt)?.max(1),
            None => 1,
        };
        let start = traj.first().context(CovTrajectorySnafu)?.time;
        let skip = ((self.spinup / dt).round() as usize).min(traj.len());

        let mut diffs: Vec<DVector<f64>> = Vec::new();
        let mut k = skip;
        while k + lag_steps < traj.len() {
            diffs.push(&traj.states[k + lag_steps].vector - &traj.states[k].vector);
            k += stride_steps;
        }
        ensure!(
            diffs.len() >= 2,
            super::NotEnoughSamplesSnafu {
                needed: 2_usize,
                found: diffs.len()
            }
        );

        info!(
            "Canadian Quick: {} lagged differences (τ = {} MTU, stride = {} steps, spinup until t = {:.4} MTU)",
            diffs.len(),
            self.lag,
            stride_steps,
            start + skip as f64 * dt,
        );

        let cov = sample_covariance(&diffs)?;
        // Halve the difference covariance to recover the single-time variance.
        Covariance::new(cov.matrix() * 0.5)
    }

    /// Expresses a duration as a whole number of grid steps, or fails.
    fn resolve_on_grid(duration: f64, dt: f64) -> Result<usize, CovarianceError> {
        let steps = duration / dt;
        let rounded = steps.round();
        ensure!(
            rounded >= 0.0 && approx::relative_eq!(steps, rounded, max_relative = 1e-6, epsilon = 1e-9),
            super::LagNotResolvedSnafu { lag: duration, dt }
        );
        Ok(rounded as usize)
    }
}
