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

/// Returns the root mean square of the vector components.
///
/// Unlike the Euclidean norm, the RMS does not grow with the state dimension,
/// which makes Lorenz 96 diagnostics comparable across grid sizes.
pub fn rms(v: &DVector<f64>) -> f64 {
    if v.is_empty() {
        0.0
    } else {
        (v.norm_squared() / v.len() as f64).sqrt()
    }
}

/// Returns whether the provided square matrix is symmetric within the tolerance.
pub fn is_symmetric(m: &DMatrix<f64>, tol: f64) -> bool {
    if !m.is_square() {
        return false;
    }
    for i in 1..m.nrows() {
        for j in 0..i {
            if (m[(i, j)] - m[(j, i)]).abs() > tol {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod ut_utils {
    use super::{is_symmetric, rms, DMatrix, DVector};

    #[test]
    fn rms_is_dimension_free() {
        let short = DVector::from_element(4, 3.0);
        let long = DVector::from_element(400, 3.0);
        assert!((rms(&short) - 3.0).abs() < 1e-15);
        assert!((rms(&long) - 3.0).abs() < 1e-15);
        assert_eq!(rms(&DVector::zeros(0)), 0.0);
    }

    #[test]
    fn symmetry_check() {
        let sym = DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.5, 2.0]);
        let asym = DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.4, 2.0]);
        assert!(is_symmetric(&sym, 1e-12));
        assert!(!is_symmetric(&asym, 1e-12));
        assert!(!is_symmetric(&DMatrix::zeros(2, 3), 1e-12));
    }
}
