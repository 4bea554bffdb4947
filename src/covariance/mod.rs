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
use crate::trajectory::TrajError;
use snafu::prelude::*;
use std::fmt;

/// The Canadian Quick lagged-difference estimator.
pub mod canadian;
pub use self::canadian::CanadianQuick;

/// Eigenvalues are considered nonnegative above this (relative to the largest).
const PSD_REL_TOL: f64 = 1e-10;

/// Covariance estimation errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CovarianceError {
    /// Covariance matrices must be square.
    #[snafu(display("expected a square matrix, got {nrows}x{ncols}"))]
    NotSquare { nrows: usize, ncols: usize },
    /// Sample vectors must share one dimension.
    #[snafu(display("sample {index} has length {got}, expected {expected}"))]
    RaggedSamples {
        index: usize,
        expected: usize,
        got: usize,
    },
    /// Too few samples for the requested estimate.
    #[snafu(display("covariance estimation requires at least {needed} samples, found {found}"))]
    NotEnoughSamples { needed: usize, found: usize },
    /// The requested lag does not fall on the trajectory sampling grid.
    #[snafu(display(
        "lag of {lag} MTU is not a multiple of the {dt} MTU sampling interval"
    ))]
    LagNotResolved { lag: f64, dt: f64 },
    /// The matrix is not positive semi-definite.
    #[snafu(display("matrix is not positive semi-definite (eigenvalue {eigenvalue:.3e})"))]
    NotPositiveSemiDefinite { eigenvalue: f64 },
    /// The underlying trajectory is unusable.
    #[snafu(display("covariance estimation failed on the trajectory: {source}"))]
    CovTrajectory { source: TrajError },
}

/// A background (or observation) error covariance matrix.
///
/// The wrapped matrix is symmetrized on construction, so downstream consumers
/// can rely on exact symmetry regardless of floating point accumulation order.
#[derive(Clone, Debug, PartialEq)]
pub struct Covariance {
    matrix: DMatrix<f64>,
}

impl Covariance {
    /// Wraps a matrix as a covariance, averaging it with its transpose.
    pub fn new(matrix: DMatrix<f64>) -> Result<Self, CovarianceError> {
        ensure!(
            matrix.is_square(),
            NotSquareSnafu {
                nrows: matrix.nrows(),
                ncols: matrix.ncols()
            }
        );
        let sym = 0.5 * (&matrix + matrix.transpose());
        Ok(Self { matrix: sym })
    }

    /// A zero covariance of the provided dimension.
    pub fn zeros(dimension: usize) -> Self {
        Self {
            matrix: DMatrix::zeros(dimension, dimension),
        }
    }

    pub fn dimension(&self) -> usize {
        self.matrix.nrows()
    }

    /// The wrapped symmetric matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// The error variances (diagonal).
    pub fn variances(&self) -> DVector<f64> {
        self.matrix.diagonal()
    }

    /// The error standard deviations.
    pub fn std_devs(&self) -> DVector<f64> {
        self.variances().map(|v| v.max(0.0).sqrt())
    }

    pub fn trace(&self) -> f64 {
        self.matrix.trace()
    }

    /// The correlation matrix D^{-1/2} B D^{-1/2}. Zero-variance components
    /// yield zero correlation rows rather than NaNs.
    pub fn correlation(&self) -> DMatrix<f64> {
        let sig = self.std_devs();
        DMatrix::from_fn(self.dimension(), self.dimension(), |i, j| {
            let denom = sig[i] * sig[j];
            if denom > 0.0 {
                self.matrix[(i, j)] / denom
            } else {
                0.0
            }
        })
    }

    /// Checks positive semi-definiteness through the symmetric eigenvalues,
    /// with a relative tolerance for the tiny negative values produced by
    /// floating point sample accumulation.
    pub fn is_positive_semi_definite(&self) -> bool {
        let eigenvalues = self.matrix.clone().symmetric_eigen().eigenvalues;
        let max = eigenvalues.amax().max(f64::MIN_POSITIVE);
        eigenvalues.iter().all(|&l| l >= -PSD_REL_TOL * max)
    }

    /// The lower Cholesky factor L with B = L·Lᵀ, used to draw correlated
    /// perturbations. Fails on non positive-definite matrices.
    pub fn sqrt_cholesky(&self) -> Result<DMatrix<f64>, CovarianceError> {
        match self.matrix.clone().cholesky() {
            Some(chol) => Ok(chol.l()),
            None => {
                let min_eig = self
                    .matrix
                    .clone()
                    .symmetric_eigen()
                    .eigenvalues
                    .min();
                Err(CovarianceError::NotPositiveSemiDefinite {
                    eigenvalue: min_eig,
                })
            }
        }
    }
}

impl fmt::Display for Covariance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sig = self.std_devs();
        write!(
            f,
            "Covariance ({0}x{0}), mean σ = {1:.6}, trace = {2:.6}",
            self.dimension(),
            sig.mean(),
            self.trace()
        )
    }
}

/// The unbiased sample covariance of the provided vectors, with sample-mean
/// removal. Requires at least two samples.
pub fn sample_covariance(samples: &[DVector<f64>]) -> Result<Covariance, CovarianceError> {
    ensure!(
        samples.len() >= 2,
        NotEnoughSamplesSnafu {
            needed: 2_usize,
            found: samples.len()
        }
    );
    let n = samples[0].len();
    for (index, s) in samples.iter().enumerate() {
        ensure!(
            s.len() == n,
            RaggedSamplesSnafu {
                index,
                expected: n,
                got: s.len()
            }
        );
    }

    let m = samples.len() as f64;
    let mut mean = DVector::<f64>::zeros(n);
    for s in samples {
        mean += s;
    }
    mean /= m;

    let mut cov = DMatrix::<f64>::zeros(n, n);
    for s in samples {
        let centered = s - &mean;
        // Rank-one update B += c cᵀ / (m - 1)
        cov.ger(1.0 / (m - 1.0), &centered, &centered, 1.0);
    }
    Covariance::new(cov)
}
