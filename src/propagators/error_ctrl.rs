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

use crate::linalg::DVector;

// Avoid dividing by too small of a number
const REL_ERR_THRESH: f64 = 0.1;

/// The ErrorCtrl trait manages the tolerance level of the integrator.
///
/// Each controller turns the embedded error estimate of an adaptive step into
/// a scalar compared against the propagator tolerance. All Lorenz 96
/// components share one unit, so the controllers operate on the whole state
/// vector at once.
pub trait ErrorCtrl: Copy + Send + Sync {
    /// Computes the actual error of the current step.
    ///
    /// The `error_est` is the estimated error computed from the b* coefficients
    /// of the Runge Kutta integrator, `candidate` is the proposed next state
    /// and `cur_state` is the current state.
    fn estimate(error_est: &DVector<f64>, candidate: &DVector<f64>, cur_state: &DVector<f64>)
        -> f64;
}

/// An RSS step error control: the error norm relative to the step change.
#[derive(Clone, Copy, Debug, Default)]
pub struct RSSStep;

impl ErrorCtrl for RSSStep {
    fn estimate(
        error_est: &DVector<f64>,
        candidate: &DVector<f64>,
        cur_state: &DVector<f64>,
    ) -> f64 {
        let mag = (candidate - cur_state).norm();
        let err = error_est.norm();
        if mag > REL_ERR_THRESH {
            err / mag
        } else {
            err
        }
    }
}

/// An RSS state error control: when in doubt, use this error controller,
/// especially for high accuracy.
#[derive(Clone, Copy, Debug, Default)]
pub struct RSSState;

impl ErrorCtrl for RSSState {
    fn estimate(
        error_est: &DVector<f64>,
        candidate: &DVector<f64>,
        cur_state: &DVector<f64>,
    ) -> f64 {
        let mag = 0.5 * (candidate + cur_state).norm();
        let err = error_est.norm();
        if mag > REL_ERR_THRESH {
            err / mag
        } else {
            err
        }
    }
}

/// A largest error control which effectively computes the largest component-wise
/// relative error.
#[derive(Clone, Copy, Debug, Default)]
pub struct LargestError;

impl ErrorCtrl for LargestError {
    fn estimate(
        error_est: &DVector<f64>,
        candidate: &DVector<f64>,
        cur_state: &DVector<f64>,
    ) -> f64 {
        let state_delta = candidate - cur_state;
        let mut max_err = 0.0;
        for (i, prop_err_i) in error_est.iter().enumerate() {
            let err = if state_delta[i].abs() > REL_ERR_THRESH {
                (prop_err_i / state_delta[i]).abs()
            } else {
                prop_err_i.abs()
            };
            if err > max_err {
                max_err = err;
            }
        }
        max_err
    }
}

#[cfg(test)]
mod ut_error_ctrl {
    use super::{DVector, ErrorCtrl, LargestError, RSSState, RSSStep};

    #[test]
    fn relative_when_step_is_large() {
        let err = DVector::from_element(4, 1e-6);
        let cur = DVector::zeros(4);
        let cand = DVector::from_element(4, 1.0);
        // Step magnitude is 2, so the estimate is relative.
        let est = RSSStep::estimate(&err, &cand, &cur);
        assert!((est - err.norm() / 2.0).abs() < 1e-15);
        // Mean state magnitude is 1.
        let est = RSSState::estimate(&err, &cand, &cur);
        assert!((est - err.norm()).abs() < 1e-15);
    }

    #[test]
    fn absolute_when_step_is_tiny() {
        let err = DVector::from_element(4, 1e-6);
        let cur = DVector::zeros(4);
        let cand = DVector::from_element(4, 1e-3);
        assert!((RSSStep::estimate(&err, &cand, &cur) - err.norm()).abs() < 1e-15);
        assert!((LargestError::estimate(&err, &cand, &cur) - 1e-6).abs() < 1e-18);
    }
}
