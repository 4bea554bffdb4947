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

use super::{DimensionMismatchSnafu, Dynamics, DynamicsError, InvalidModelSnafu};
use crate::linalg::{DMatrix, DVector};
use crate::state::ModelState;
use snafu::prelude::*;
use std::fmt;

/// The Lorenz 96 model, a cyclic chain of advected variables:
///
/// dx_i/dt = (x_{i+1} − x_{i−2}) · x_{i−1} − x_i + F,  indices modulo n.
///
/// With the canonical 40 variables and forcing F = 8 the system is chaotic
/// with a leading Lyapunov exponent near 1.7 / MTU, making it the standard
/// testbed for data assimilation experiments.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lorenz96 {
    dimension: usize,
    /// The constant forcing term F.
    pub forcing: f64,
}

impl Lorenz96 {
    /// The canonical chaotic configuration: 40 variables, F = 8.
    pub const CANONICAL_DIMENSION: usize = 40;
    pub const CANONICAL_FORCING: f64 = 8.0;

    /// Initializes a Lorenz 96 model. The cyclic stencil references four
    /// distinct indices, so dimensions below four are rejected.
    pub fn new(dimension: usize, forcing: f64) -> Result<Self, DynamicsError> {
        ensure!(
            dimension >= 4,
            InvalidModelSnafu {
                reason: format!("Lorenz 96 needs at least 4 variables, got {dimension}"),
            }
        );
        ensure!(
            forcing.is_finite(),
            InvalidModelSnafu {
                reason: format!("forcing must be finite, got {forcing}"),
            }
        );
        Ok(Self { dimension, forcing })
    }

    /// The canonical 40-variable, F = 8 model.
    pub fn canonical() -> Self {
        Self {
            dimension: Self::CANONICAL_DIMENSION,
            forcing: Self::CANONICAL_FORCING,
        }
    }

    /// The equilibrium state x_i = F (unstable in the chaotic regime). Used
    /// as the base of the customary spinup initial condition.
    pub fn equilibrium(&self) -> ModelState {
        ModelState::new(0.0, DVector::from_element(self.dimension, self.forcing))
    }

    /// The customary spinup initial condition: the equilibrium with a small
    /// bump on one variable to kick the run off the unstable fixed point.
    pub fn perturbed_equilibrium(&self, bump: f64) -> ModelState {
        let mut state = self.equilibrium();
        state.vector[self.dimension / 2] += bump;
        state
    }

    fn check_dimension(&self, x: &DVector<f64>) -> Result<(), DynamicsError> {
        ensure!(
            x.len() == self.dimension,
            DimensionMismatchSnafu {
                expected: self.dimension,
                got: x.len()
            }
        );
        Ok(())
    }
}

impl Dynamics for Lorenz96 {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn eom(&self, _t: f64, x: &DVector<f64>) -> Result<DVector<f64>, DynamicsError> {
        self.check_dimension(x)?;
        let n = self.dimension;
        let f = DVector::from_fn(n, |i, _| {
            let ip1 = (i + 1) % n;
            let im1 = (i + n - 1) % n;
            let im2 = (i + n - 2) % n;
            (x[ip1] - x[im2]) * x[im1] - x[i] + self.forcing
        });
        Ok(f)
    }

    fn jacobian(&self, _t: f64, x: &DVector<f64>) -> Result<DMatrix<f64>, DynamicsError> {
        self.check_dimension(x)?;
        let n = self.dimension;
        let mut jac = DMatrix::zeros(n, n);
        for i in 0..n {
            let ip1 = (i + 1) % n;
            let im1 = (i + n - 1) % n;
            let im2 = (i + n - 2) % n;
            // Row i of ∂f/∂x; the cyclic indices may coincide for small n,
            // hence the accumulation instead of assignment.
            jac[(i, im2)] += -x[im1];
            jac[(i, im1)] += x[ip1] - x[im2];
            jac[(i, i)] += -1.0;
            jac[(i, ip1)] += x[im1];
        }
        Ok(jac)
    }
}

impl fmt::Display for Lorenz96 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Lorenz 96 (n = {}, F = {})", self.dimension, self.forcing)
    }
}
