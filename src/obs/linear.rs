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

use super::{DimensionMismatchSnafu, InvalidOperatorSnafu, ObservationError, ObservationOperator};
use crate::linalg::{DMatrix, DVector};
use snafu::prelude::*;
use std::fmt;

/// A linear observation operator, y = H·x, with its matrix held explicitly.
///
/// All the linear operators of the course material are constructed through
/// the associated functions; arbitrary H matrices are accepted through
/// [`LinearOperator::from_matrix`].
#[derive(Clone, Debug, PartialEq)]
pub struct LinearOperator {
    matrix: DMatrix<f64>,
    label: String,
}

impl LinearOperator {
    /// Wraps an arbitrary matrix as an observation operator.
    pub fn from_matrix(matrix: DMatrix<f64>, label: impl Into<String>) -> Self {
        Self {
            matrix,
            label: label.into(),
        }
    }

    /// Observes every state variable directly.
    pub fn identity(state_dim: usize) -> Self {
        Self::from_matrix(DMatrix::identity(state_dim, state_dim), "identity")
    }

    /// Observes the gridpoints `offset, offset + stride, ...` — the classic
    /// "every other gridpoint" network for `stride = 2`.
    pub fn every_nth(
        state_dim: usize,
        offset: usize,
        stride: usize,
    ) -> Result<Self, ObservationError> {
        ensure!(
            stride >= 1,
            InvalidOperatorSnafu {
                reason: "every_nth needs a stride of at least 1".to_string(),
            }
        );
        ensure!(
            offset < stride.min(state_dim),
            InvalidOperatorSnafu {
                reason: format!("offset {offset} must be below the stride {stride}"),
            }
        );
        let rows: Vec<usize> = (offset..state_dim).step_by(stride).collect();
        let mut matrix = DMatrix::zeros(rows.len(), state_dim);
        for (r, &c) in rows.iter().enumerate() {
            matrix[(r, c)] = 1.0;
        }
        Ok(Self::from_matrix(
            matrix,
            format!("every {stride}th gridpoint from {offset}"),
        ))
    }

    /// Observes the cyclic mean of `width` adjacent gridpoints centered on
    /// each variable, a crude instrument footprint. Each row sums to one.
    pub fn moving_average(state_dim: usize, width: usize) -> Result<Self, ObservationError> {
        ensure!(
            width >= 1 && width <= state_dim,
            InvalidOperatorSnafu {
                reason: format!("width {width} must be in [1, {state_dim}]"),
            }
        );
        let w = width as f64;
        let half = (width - 1) / 2;
        let mut matrix = DMatrix::zeros(state_dim, state_dim);
        for i in 0..state_dim {
            for k in 0..width {
                let j = (i + state_dim + k - half) % state_dim;
                matrix[(i, j)] += 1.0 / w;
            }
        }
        Ok(Self::from_matrix(
            matrix,
            format!("{width}-point moving average"),
        ))
    }

    /// The explicit H matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }
}

impl ObservationOperator for LinearOperator {
    fn state_dim(&self) -> usize {
        self.matrix.ncols()
    }

    fn obs_dim(&self) -> usize {
        self.matrix.nrows()
    }

    fn observe(&self, x: &DVector<f64>) -> Result<DVector<f64>, ObservationError> {
        ensure!(
            x.len() == self.state_dim(),
            DimensionMismatchSnafu {
                expected: self.state_dim(),
                got: x.len()
            }
        );
        Ok(&self.matrix * x)
    }

    fn jacobian(&self, x: &DVector<f64>) -> Result<DMatrix<f64>, ObservationError> {
        ensure!(
            x.len() == self.state_dim(),
            DimensionMismatchSnafu {
                expected: self.state_dim(),
                got: x.len()
            }
        );
        Ok(self.matrix.clone())
    }
}

impl fmt::Display for LinearOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

#[cfg(test)]
mod ut_linear {
    use super::{LinearOperator, ObservationOperator};
    use crate::linalg::DVector;

    #[test]
    fn every_nth_selects_the_expected_gridpoints() {
        let h = LinearOperator::every_nth(8, 1, 2).unwrap();
        assert_eq!(h.obs_dim(), 4);
        let x = DVector::from_fn(8, |i, _| i as f64);
        let y = h.observe(&x).unwrap();
        assert_eq!(y, DVector::from_vec(vec![1.0, 3.0, 5.0, 7.0]));
    }

    #[test]
    fn moving_average_rows_sum_to_one() {
        let h = LinearOperator::moving_average(10, 3).unwrap();
        for i in 0..10 {
            let row_sum: f64 = h.matrix().row(i).iter().sum();
            assert!((row_sum - 1.0).abs() < 1e-14);
        }
        // A constant state is invariant under averaging.
        let x = DVector::from_element(10, 4.2);
        let y = h.observe(&x).unwrap();
        assert!((y - x).amax() < 1e-14);
    }

    #[test]
    fn rejects_bad_configurations() {
        assert!(LinearOperator::every_nth(8, 2, 2).is_err());
        assert!(LinearOperator::every_nth(8, 0, 0).is_err());
        assert!(LinearOperator::moving_average(8, 0).is_err());
        assert!(LinearOperator::moving_average(8, 9).is_err());
        let h = LinearOperator::identity(8);
        assert!(h.observe(&DVector::zeros(7)).is_err());
    }
}
