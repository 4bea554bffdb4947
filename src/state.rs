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
use crate::utils::rms;
use snafu::prelude::*;
use std::fmt;

/// State errors.
#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StateError {
    /// State Transition Matrix (STM) was expected but not set.
    #[snafu(display("expected STM to be set"))]
    StmUnset,
    /// The provided vector does not have the expected length.
    #[snafu(display("expected a vector of length {expected}, got {got}"))]
    VectorLength { expected: usize, got: usize },
}

/// A model state at a given model time, with an optional state transition matrix.
///
/// When the STM is enabled, the propagator integrates the augmented system
/// [x; Φ] so that the state and its transition matrix see the exact same step
/// sequence. The STM maps perturbations from the time it was enabled (where it
/// is reset to identity) to the current time.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelState {
    /// Model time in MTU.
    pub time: f64,
    /// The state vector.
    pub vector: DVector<f64>,
    /// The state transition matrix, if tangent-linear propagation is enabled.
    pub stm: Option<DMatrix<f64>>,
}

impl ModelState {
    /// Initializes a new state from its vector at the provided model time.
    pub fn new(time: f64, vector: DVector<f64>) -> Self {
        Self {
            time,
            vector,
            stm: None,
        }
    }

    /// Initializes a zero state of the provided dimension at time zero.
    pub fn zeros(dimension: usize) -> Self {
        Self::new(0.0, DVector::zeros(dimension))
    }

    /// The dimension of the state vector (excluding any STM block).
    pub fn dimension(&self) -> usize {
        self.vector.len()
    }

    /// Enables tangent-linear propagation by resetting the STM to identity at
    /// the current time.
    pub fn enable_stm(&mut self) {
        let n = self.dimension();
        self.stm = Some(DMatrix::identity(n, n));
    }

    /// Builder-style variant of [`ModelState::enable_stm`].
    pub fn with_stm(mut self) -> Self {
        self.enable_stm();
        self
    }

    /// Disables tangent-linear propagation.
    pub fn unset_stm(&mut self) {
        self.stm = None;
    }

    /// Returns the STM, or an error if tangent-linear propagation is not enabled.
    pub fn stm(&self) -> Result<&DMatrix<f64>, StateError> {
        self.stm.as_ref().ok_or(StateError::StmUnset)
    }

    /// Packs the state (and the STM when set) into a single vector for
    /// integration: length n without an STM, n·(n+1) with one (column-major
    /// STM block after the state components).
    pub fn as_augmented(&self) -> DVector<f64> {
        match &self.stm {
            None => self.vector.clone(),
            Some(stm) => {
                let n = self.dimension();
                let mut aug = DVector::zeros(n * (n + 1));
                aug.rows_mut(0, n).copy_from(&self.vector);
                aug.rows_mut(n, n * n).copy_from_slice(stm.as_slice());
                aug
            }
        }
    }

    /// Restores this state from an augmented vector, the exact inverse of
    /// [`ModelState::as_augmented`].
    pub fn set_augmented(&mut self, time: f64, aug: &DVector<f64>) -> Result<(), StateError> {
        let n = self.dimension();
        let expected = if self.stm.is_some() { n * (n + 1) } else { n };
        ensure!(
            aug.len() == expected,
            VectorLengthSnafu {
                expected,
                got: aug.len()
            }
        );
        self.time = time;
        self.vector.copy_from(&aug.rows(0, n));
        if let Some(stm) = &mut self.stm {
            stm.copy_from_slice(&aug.as_slice()[n..]);
        }
        Ok(())
    }

    /// The RMS of the state components, a common scalar summary for Lorenz 96.
    pub fn rms(&self) -> f64 {
        rms(&self.vector)
    }
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "t = {:.4} MTU\tn = {}\trms = {:.6}",
            self.time,
            self.dimension(),
            self.rms()
        )
    }
}
