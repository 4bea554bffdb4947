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

use super::Dispersion;
use crate::linalg::DVector;
use crate::state::ModelState;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// A perturbation generator for ensemble studies.
///
/// Draws independent Gaussian perturbation vectors, one dispersion per state
/// component. Correlated draws go through [`super::MultivariateNormal`].
#[derive(Clone, Debug)]
pub struct PerturbationGenerator {
    /// The list of dispersions, one per state component.
    pub dispersions: Vec<Dispersion>,
}

impl PerturbationGenerator {
    /// A generator applying the same zero-mean sigma to every component.
    pub fn uniform(dimension: usize, std_dev: f64) -> Self {
        Self {
            dispersions: vec![Dispersion::zero_mean(std_dev); dimension],
        }
    }

    /// A generator with per-component dispersions.
    pub fn from_dispersions(dispersions: Vec<Dispersion>) -> Self {
        Self { dispersions }
    }

    pub fn dimension(&self) -> usize {
        self.dispersions.len()
    }

    /// Draws one perturbation vector.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> DVector<f64> {
        DVector::from_iterator(
            self.dimension(),
            self.dispersions.iter().map(|d| {
                Normal::new(d.mean, d.std_dev).unwrap().sample(rng)
            }),
        )
    }

    /// Returns a copy of the template state with a fresh perturbation added.
    pub fn disperse<R: Rng>(&self, template: &ModelState, rng: &mut R) -> ModelState {
        let mut dispersed = template.clone();
        dispersed.vector += self.sample(rng);
        dispersed
    }
}
