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
use crate::state::{ModelState, StateError};
use snafu::prelude::*;

/// The Lorenz 96 cyclic toy atmosphere.
pub mod lorenz96;
pub use self::lorenz96::Lorenz96;

/// The three-variable Lorenz 63 convection model.
pub mod lorenz63;
pub use self::lorenz63::Lorenz63;

/// A trait for models with equations of motion that can be integrated.
///
/// Models provide their analytic Jacobian so the propagator can carry the
/// state transition matrix alongside the state itself.
pub trait Dynamics: Clone + Send + Sync {
    /// The dimension of the state vector this model operates on.
    fn dimension(&self) -> usize;

    /// Defines the equations of motion.
    ///
    /// - `t`: Model time in MTU. The Lorenz systems are autonomous, but the
    ///   signature carries the time for forced variants.
    /// - `x`: The state vector.
    fn eom(&self, t: f64, x: &DVector<f64>) -> Result<DVector<f64>, DynamicsError>;

    /// Defines the Jacobian ∂f/∂x of the equations of motion, used for
    /// tangent-linear propagation.
    fn jacobian(&self, t: f64, x: &DVector<f64>) -> Result<DMatrix<f64>, DynamicsError>;

    /// Defines the equations of motion of the augmented system [x; Φ], where
    /// Φ̇ = J(x)·Φ. Called by the propagator; the augmented vector is the
    /// state vector itself when the context has no STM set.
    ///
    /// - `delta_t`: Time in MTU past the context state time.
    /// - `aug`: The augmented vector, which changes at each integration stage.
    /// - `ctx`: The state context, used to decide the augmented layout.
    fn eom_augmented(
        &self,
        delta_t: f64,
        aug: &DVector<f64>,
        ctx: &ModelState,
    ) -> Result<DVector<f64>, DynamicsError> {
        let n = self.dimension();
        let t = ctx.time + delta_t;
        if ctx.stm.is_none() {
            return self.eom(t, aug);
        }
        ensure!(
            aug.len() == n * (n + 1),
            AugmentedLengthSnafu {
                expected: n * (n + 1),
                got: aug.len()
            }
        );
        let x = aug.rows(0, n).into_owned();
        let f = self.eom(t, &x)?;
        let jac = self.jacobian(t, &x)?;
        let phi = DMatrix::from_column_slice(n, n, &aug.as_slice()[n..]);
        let phi_dot = jac * phi;

        let mut out = DVector::zeros(n * (n + 1));
        out.rows_mut(0, n).copy_from(&f);
        out.rows_mut(n, n * n).copy_from_slice(phi_dot.as_slice());
        Ok(out)
    }

    /// Performs final changes after each successful integration step.
    ///
    /// Also called before the first integration step.
    fn finally(&self, next_state: ModelState) -> Result<ModelState, DynamicsError> {
        Ok(next_state)
    }
}

/// Dynamical model errors.
#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DynamicsError {
    /// The state vector does not match the model dimension.
    #[snafu(display("model of dimension {expected} called with a state of length {got}"))]
    DimensionMismatch { expected: usize, got: usize },
    /// The augmented vector does not match the model dimension.
    #[snafu(display("augmented vector of length {got}, expected {expected}"))]
    AugmentedLength { expected: usize, got: usize },
    /// The model configuration is unusable.
    #[snafu(display("invalid model configuration: {reason}"))]
    InvalidModel { reason: String },
    /// State handling error during propagation.
    #[snafu(display("state error in dynamics: {source}"))]
    DynamicsState { source: StateError },
}
