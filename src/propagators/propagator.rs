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

use super::error_ctrl::{ErrorCtrl, RSSStep};
use super::{CashKarp45, Dormand45, IntegrationDetails, PropInstance, PropOpts, RK, RK4Fixed};
use crate::dynamics::Dynamics;
use crate::linalg::DVector;
use crate::state::ModelState;

/// A Propagator allows propagating a set of dynamics forward or backward in model time.
/// It includes the options, the integrator details of the previous step, and
/// the set of coefficients used for the monomorphic instance.
#[derive(Clone, Debug)]
pub struct Propagator<'a, D: Dynamics, E: ErrorCtrl> {
    pub dynamics: D, // Stores the dynamics used. *Must* use this to get the latest values
    pub opts: PropOpts<E>, // Stores the integration options (tolerance, min/max step, init step, etc.)
    pub(crate) order: u8,  // Order of the integrator
    pub(crate) stages: usize, // Number of stages, i.e. how many times the derivatives will be called
    pub(crate) a_coeffs: &'a [f64],
    pub(crate) b_coeffs: &'a [f64],
}

impl<'a, D: Dynamics, E: ErrorCtrl> Propagator<'a, D, E> {
    /// Each propagator must be initialized with `new` which stores propagator information.
    pub fn new<T: RK>(dynamics: D, opts: PropOpts<E>) -> Self {
        Self {
            dynamics,
            opts,
            stages: T::STAGES,
            order: T::ORDER,
            a_coeffs: T::A_COEFFS,
            b_coeffs: T::B_COEFFS,
        }
    }

    /// Set the tolerance for the propagator.
    pub fn set_tolerance(&mut self, tol: f64) {
        self.opts.tolerance = tol;
    }

    /// Set the maximum step size for the propagator and sets the initial step to that value if currently greater.
    pub fn set_max_step(&mut self, step: f64) {
        self.opts.set_max_step(step);
    }

    pub fn set_min_step(&mut self, step: f64) {
        self.opts.set_min_step(step);
    }

    /// A CashKarp45 propagator with custom propagator options.
    pub fn cash_karp45(dynamics: D, opts: PropOpts<E>) -> Self {
        Self::new::<CashKarp45>(dynamics, opts)
    }

    /// A Dormand Prince 4-5 propagator with custom propagator options.
    pub fn dormand45(dynamics: D, opts: PropOpts<E>) -> Self {
        Self::new::<Dormand45>(dynamics, opts)
    }

    /// An RK4 propagator with custom propagator options.
    pub fn rk4(dynamics: D, opts: PropOpts<E>) -> Self {
        Self::new::<RK4Fixed>(dynamics, opts)
    }

    pub fn with(&self, state: ModelState) -> PropInstance<'_, D, E> {
        // Pre-allocate the k used in the propagator
        let veclen = state.as_augmented().len();
        let mut k = Vec::with_capacity(self.stages + 1);
        for _ in 0..self.stages {
            k.push(DVector::<f64>::zeros(veclen));
        }
        PropInstance {
            state,
            prop: self,
            details: IntegrationDetails {
                step: self.opts.init_step,
                error: 0.0,
                attempts: 1,
            },
            step_size: self.opts.init_step,
            fixed_step: self.opts.fixed_step,
            k,
        }
    }
}

impl<'a, D: Dynamics> Propagator<'a, D, RSSStep> {
    /// Default propagator is the classic RK4 with the default (fixed 0.05 MTU step) PropOpts.
    pub fn default(dynamics: D) -> Self {
        Self::new::<RK4Fixed>(dynamics, PropOpts::default())
    }

    /// A default Dormand Prince 45 propagator with adaptive stepping at the provided tolerance.
    pub fn default_dormand45(dynamics: D, tolerance: f64) -> Self {
        Self::new::<Dormand45>(dynamics, PropOpts::with_tolerance(tolerance))
    }
}
