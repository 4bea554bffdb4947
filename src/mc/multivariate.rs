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

use crate::covariance::{Covariance, CovarianceError};
use crate::linalg::{DMatrix, DVector};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// A correlated Gaussian vector generator.
///
/// Samples x = μ + L·z where L is the Cholesky factor of the covariance and
/// z is standard normal. Used to perturb states with an estimated background
/// covariance, and in tests to feed the Canadian Quick estimator a known
/// answer.
#[derive(Clone, Debug)]
pub struct MultivariateNormal {
    /// The mean of the multivariate normal distribution.
    pub mean: DVector<f64>,
    /// The lower Cholesky factor of the covariance.
    sqrt: DMatrix<f64>,
    /// The standard normal distribution used to seed the multivariate normal distribution.
    std_norm_distr: Normal<f64>,
}

impl MultivariateNormal {
    /// Creates a new generator from a mean and a covariance of matching
    /// dimension. The covariance must be positive definite.
    pub fn new(mean: DVector<f64>, covariance: &Covariance) -> Result<Self, CovarianceError> {
        let sqrt = covariance.sqrt_cholesky()?;
        Ok(Self {
            mean,
            sqrt,
            std_norm_distr: Normal::new(0.0, 1.0).unwrap(),
        })
    }

    /// A zero-mean generator.
    pub fn zero_mean(covariance: &Covariance) -> Result<Self, CovarianceError> {
        Self::new(DVector::zeros(covariance.dimension()), covariance)
    }

    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    /// Draws one correlated vector.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> DVector<f64> {
        let z = DVector::from_iterator(
            self.dimension(),
            (0..self.dimension()).map(|_| self.std_norm_distr.sample(rng)),
        );
        &self.mean + &self.sqrt * z
    }
}
