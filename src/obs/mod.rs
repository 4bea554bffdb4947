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

/// Linear observation operators (identity, gridpoint subset, moving average).
pub mod linear;
pub use self::linear::LinearOperator;

/// Nonlinear observation operators.
pub mod nonlinear;
pub use self::nonlinear::Quadratic;

/// Measurement noise models.
pub mod noise;
pub use self::noise::ObsNoise;

/// Walks a truth trajectory and emits noisy observations.
pub mod simulator;
pub use self::simulator::ObservationSimulator;

/// Observation generation errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ObservationError {
    /// The state does not match the operator's input dimension.
    #[snafu(display("operator expects a state of length {expected}, got {got}"))]
    DimensionMismatch { expected: usize, got: usize },
    /// The operator configuration is unusable.
    #[snafu(display("invalid observation operator: {reason}"))]
    InvalidOperator { reason: String },
    /// The noise configuration does not match the operator output.
    #[snafu(display("noise of dimension {noise}, operator emits {obs}"))]
    NoiseDimension { noise: usize, obs: usize },
    /// The underlying trajectory is unusable.
    #[snafu(display("observation synthesis failed on the trajectory: {source}"))]
    ObsTrajectory { source: TrajError },
    /// The observation cadence does not fall on the trajectory grid.
    #[snafu(display("cadence of {cadence} MTU is not a multiple of the {dt} MTU sampling interval"))]
    CadenceNotResolved { cadence: f64, dt: f64 },
}

/// The mapping H from model space to observation space.
///
/// Implementors provide both the (possibly nonlinear) forward map and its
/// linearization, the seam every assimilation method hangs off of.
pub trait ObservationOperator: Send + Sync + fmt::Display {
    /// The model state dimension this operator accepts.
    fn state_dim(&self) -> usize;

    /// The observation space dimension this operator emits.
    fn obs_dim(&self) -> usize;

    /// Applies H to the state.
    fn observe(&self, x: &DVector<f64>) -> Result<DVector<f64>, ObservationError>;

    /// The Jacobian ∂H/∂x at the provided state (constant for linear operators).
    fn jacobian(&self, x: &DVector<f64>) -> Result<DMatrix<f64>, ObservationError>;
}

impl ObservationOperator for Box<dyn ObservationOperator> {
    fn state_dim(&self) -> usize {
        (**self).state_dim()
    }

    fn obs_dim(&self) -> usize {
        (**self).obs_dim()
    }

    fn observe(&self, x: &DVector<f64>) -> Result<DVector<f64>, ObservationError> {
        (**self).observe(x)
    }

    fn jacobian(&self, x: &DVector<f64>) -> Result<DMatrix<f64>, ObservationError> {
        (**self).jacobian(x)
    }
}

/// A single synthetic observation.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    /// Model time of the observation in MTU.
    pub time: f64,
    /// The observed values, one per operator output component.
    pub values: DVector<f64>,
}

/// A time-ordered collection of synthetic observations, with the generating
/// operator and noise levels recorded for downstream use.
#[derive(Clone, Debug, Default)]
pub struct ObservationArc {
    pub observations: Vec<Observation>,
    /// Display form of the generating operator.
    pub operator: String,
    /// The observation error standard deviations (the diagonal of R^{1/2}).
    pub noise_std_devs: DVector<f64>,
}

impl ObservationArc {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter()
    }

    /// The diagonal observation error covariance R.
    pub fn noise_covariance(&self) -> DMatrix<f64> {
        DMatrix::from_diagonal(&self.noise_std_devs.map(|s| s * s))
    }
}

impl fmt::Display for ObservationArc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.observations.first(), self.observations.last()) {
            (Some(first), Some(last)) => write!(
                f,
                "{} observations of [{}] from t = {:.4} to t = {:.4} MTU",
                self.len(),
                self.operator,
                first.time,
                last.time
            ),
            _ => write!(f, "empty arc of [{}]", self.operator),
        }
    }
}
