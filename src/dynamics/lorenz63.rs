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

use super::{DimensionMismatchSnafu, Dynamics, DynamicsError};
use crate::linalg::{DMatrix, DVector};
use snafu::prelude::*;
use std::fmt;

/// The Lorenz 63 convection model, the three-variable companion of the
/// course material. Mostly used here as a low-cost integrator verification
/// target; its short doubling time makes convergence failures obvious.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lorenz63 {
    pub sigma: f64,
    pub rho: f64,
    pub beta: f64,
}

impl Lorenz63 {
    /// The classic chaotic parameters (10, 28, 8/3).
    pub fn new(sigma: f64, rho: f64, beta: f64) -> Self {
        Self { sigma, rho, beta }
    }
}

impl Default for Lorenz63 {
    fn default() -> Self {
        Self::new(10.0, 28.0, 8.0 / 3.0)
    }
}

impl Dynamics for Lorenz63 {
    fn dimension(&self) -> usize {
        3
    }

    fn eom(&self, _t: f64, x: &DVector<f64>) -> Result<DVector<f64>, DynamicsError> {
        ensure!(
            x.len() == 3,
            DimensionMismatchSnafu {
                expected: 3_usize,
                got: x.len()
            }
        );
        Ok(DVector::from_vec(vec![
            self.sigma * (x[1] - x[0]),
            x[0] * (self.rho - x[2]) - x[1],
            x[0] * x[1] - self.beta * x[2],
        ]))
    }

    fn jacobian(&self, _t: f64, x: &DVector<f64>) -> Result<DMatrix<f64>, DynamicsError> {
        ensure!(
            x.len() == 3,
            DimensionMismatchSnafu {
                expected: 3_usize,
                got: x.len()
            }
        );
        Ok(DMatrix::from_row_slice(
            3,
            3,
            &[
                -self.sigma,
                self.sigma,
                0.0,
                self.rho - x[2],
                -1.0,
                -x[0],
                x[1],
                x[0],
                -self.beta,
            ],
        ))
    }
}

impl fmt::Display for Lorenz63 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Lorenz 63 (σ = {}, ρ = {}, β = {:.4})",
            self.sigma, self.rho, self.beta
        )
    }
}

#[cfg(test)]
mod ut_lorenz63 {
    use super::{DVector, Dynamics, Lorenz63};

    #[test]
    fn jacobian_matches_finite_differences() {
        let model = Lorenz63::default();
        let x = DVector::from_vec(vec![1.0, -2.0, 20.0]);
        let jac = model.jacobian(0.0, &x).unwrap();

        let h = 1e-6;
        for j in 0..3 {
            let mut xp = x.clone();
            let mut xm = x.clone();
            xp[j] += h;
            xm[j] -= h;
            let col = (model.eom(0.0, &xp).unwrap() - model.eom(0.0, &xm).unwrap()) / (2.0 * h);
            for i in 0..3 {
                assert!((jac[(i, j)] - col[i]).abs() < 1e-6);
            }
        }
    }
}
