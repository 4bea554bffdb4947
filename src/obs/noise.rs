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

use crate::linalg::{DMatrix, DVector};
use rand::Rng;
use rand_distr::Normal;

/// White, time-uncorrelated observation noise with a diagonal R.
#[derive(Clone, Debug, PartialEq)]
pub struct ObsNoise {
    /// One-sigma noise level per observation component.
    pub std_devs: DVector<f64>,
}

impl ObsNoise {
    /// The same noise level on every component.
    pub fn uniform(obs_dim: usize, std_dev: f64) -> Self {
        Self {
            std_devs: DVector::from_element(obs_dim, std_dev.abs()),
        }
    }

    /// Per-component noise levels.
    pub fn from_std_devs(std_devs: DVector<f64>) -> Self {
        Self {
            std_devs: std_devs.map(|s| s.abs()),
        }
    }

    /// A noiseless model, handy for checking an experiment end to end.
    pub fn none(obs_dim: usize) -> Self {
        Self::uniform(obs_dim, 0.0)
    }

    pub fn dimension(&self) -> usize {
        self.std_devs.len()
    }

    /// The diagonal observation error covariance R.
    pub fn covariance(&self) -> DMatrix<f64> {
        DMatrix::from_diagonal(&self.std_devs.map(|s| s * s))
    }

    /// Draws one noise vector.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> DVector<f64> {
        DVector::from_iterator(
            self.dimension(),
            self.std_devs.iter().map(|&sigma| {
                if sigma > 0.0 {
                    rng.sample(Normal::new(0.0, sigma).unwrap())
                } else {
                    0.0
                }
            }),
        )
    }
}
