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

use super::{
    CadenceNotResolvedSnafu, NoiseDimensionSnafu, ObsNoise, ObsTrajectorySnafu, Observation,
    ObservationArc, ObservationError, ObservationOperator,
};
use crate::trajectory::Trajectory;
use rand::Rng;
use snafu::prelude::*;

/// Synthesizes observations of a truth trajectory.
///
/// In an identical twin experiment the "instrument" sees the same model that
/// generated the truth: at every cadence tick, the operator maps the recorded
/// truth state to observation space and white noise with the configured R is
/// added on top.
pub struct ObservationSimulator<H: ObservationOperator> {
    operator: H,
    noise: ObsNoise,
    /// Time between observation batches, in MTU.
    cadence: f64,
}

impl<H: ObservationOperator> ObservationSimulator<H> {
    pub fn new(operator: H, noise: ObsNoise, cadence: f64) -> Result<Self, ObservationError> {
        ensure!(
            noise.dimension() == operator.obs_dim(),
            NoiseDimensionSnafu {
                noise: noise.dimension(),
                obs: operator.obs_dim()
            }
        );
        Ok(Self {
            operator,
            noise,
            cadence,
        })
    }

    pub fn operator(&self) -> &H {
        &self.operator
    }

    /// Walks the truth trajectory and emits one noisy observation batch per
    /// cadence tick, starting at the first recorded state.
    ///
    /// The trajectory must be uniformly sampled and the cadence must be a
    /// multiple of the sampling interval, so every observation sits exactly
    /// on a recorded truth state.
    pub fn simulate<R: Rng>(
        &self,
        truth: &Trajectory,
        rng: &mut R,
    ) -> Result<ObservationArc, ObservationError> {
        let dt = truth.sampling_interval().context(ObsTrajectorySnafu)?;
        let steps = self.cadence / dt;
        let cadence_steps = steps.round();
        ensure!(
            cadence_steps >= 1.0
                && approx::relative_eq!(steps, cadence_steps, max_relative = 1e-6, epsilon = 1e-9),
            CadenceNotResolvedSnafu {
                cadence: self.cadence,
                dt
            }
        );
        let cadence_steps = cadence_steps as usize;

        let mut observations = Vec::with_capacity(truth.len() / cadence_steps + 1);
        for state in truth.every(cadence_steps) {
            let mut values = self.operator.observe(&state.vector)?;
            values += self.noise.sample(rng);
            observations.push(Observation {
                time: state.time,
                values,
            });
        }

        info!(
            "synthesized {} observations of [{}] every {} MTU",
            observations.len(),
            self.operator,
            self.cadence
        );

        Ok(ObservationArc {
            observations,
            operator: format!("{}", self.operator),
            noise_std_devs: self.noise.std_devs.clone(),
        })
    }
}
