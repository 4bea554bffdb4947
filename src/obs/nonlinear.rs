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

use super::{DimensionMismatchSnafu, ObservationError, ObservationOperator};
use crate::linalg::{DMatrix, DVector};
use snafu::prelude::*;
use std::fmt;

/// The quadratic observation operator, y_i = x_i²/2.
///
/// The standard nonlinear-H exercise: its Jacobian diag(x) changes with the
/// state, so assimilating it exposes every linearity assumption downstream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quadratic {
    state_dim: usize,
}

impl Quadratic {
    pub fn new(state_dim: usize) -> Self {
        Self { state_dim }
    }

    fn check(&self, x: &DVector<f64>) -> Result<(), ObservationError> {
        ensure!(
            x.len() == self.state_dim,
            DimensionMismatchSnafu {
                expected: self.state_dim,
                got: x.len()
            }
        );
        Ok(())
    }
}

impl ObservationOperator for Quadratic {
    fn state_dim(&self) -> usize {
        self.state_dim
    }

    fn obs_dim(&self) -> usize {
        self.state_dim
    }

    fn observe(&self, x: &DVector<f64>) -> Result<DVector<f64>, ObservationError> {
        self.check(x)?;
        Ok(x.map(|v| 0.5 * v * v))
    }

    fn jacobian(&self, x: &DVector<f64>) -> Result<DMatrix<f64>, ObservationError> {
        self.check(x)?;
        Ok(DMatrix::from_diagonal(x))
    }
}

impl fmt::Display for Quadratic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "quadratic (x²/2)")
    }
}

#[cfg(test)]
mod ut_quadratic {
    use super::{ObservationOperator, Quadratic};
    use crate::linalg::DVector;

    #[test]
    fn jacobian_matches_finite_differences() {
        let h = Quadratic::new(5);
        let x = DVector::from_fn(5, |i, _| 0.7 * (i as f64) - 1.2);
        let jac = h.jacobian(&x).unwrap();

        let eps = 1e-6;
        for j in 0..5 {
            let mut xp = x.clone();
            let mut xm = x.clone();
            xp[j] += eps;
            xm[j] -= eps;
            let col = (h.observe(&xp).unwrap() - h.observe(&xm).unwrap()) / (2.0 * eps);
            for i in 0..5 {
                assert!((jac[(i, j)] - col[i]).abs() < 1e-9);
            }
        }
    }
}
