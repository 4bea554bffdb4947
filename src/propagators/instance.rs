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

use super::error_ctrl::ErrorCtrl;
use super::{
    DynamicsSnafu, IntegrationDetails, NonFiniteDurationSnafu, PropStateSnafu, PropagationError,
    Propagator,
};
use crate::dynamics::Dynamics;
use crate::linalg::DVector;
use crate::state::ModelState;
use crate::trajectory::Trajectory;
use rayon::iter::ParallelBridge;
use rayon::prelude::ParallelIterator;
use snafu::prelude::*;
use std::sync::mpsc::{channel, Sender};

/// Durations at least this long get a progress log line.
const LOG_PROGRESS_MTU: f64 = 1.0;

/// A `PropInstance` owns the state being propagated and the pre-allocated
/// stage vectors. It is built from [`Propagator::with`].
#[derive(Debug)]
pub struct PropInstance<'a, D: Dynamics, E: ErrorCtrl> {
    /// The state of this propagator instance
    pub state: ModelState,
    /// The propagator setup (kind, stages, etc.)
    pub prop: &'a Propagator<'a, D, E>,
    /// Stores the details of the previous integration step
    pub details: IntegrationDetails,
    pub(crate) step_size: f64, // Stores the adapted step for the _next_ call
    pub(crate) fixed_step: bool,
    // Allows us to do pre-allocation of the ki vectors
    pub(crate) k: Vec<DVector<f64>>,
}

impl<'a, D: Dynamics, E: ErrorCtrl> PropInstance<'a, D, E> {
    /// Allows setting the step size of the propagator
    pub fn set_step(&mut self, step_size: f64, fixed: bool) {
        self.step_size = step_size;
        self.fixed_step = fixed;
    }

    fn for_duration_channel_option(
        &mut self,
        duration: f64,
        maybe_tx_chan: Option<Sender<ModelState>>,
    ) -> Result<ModelState, PropagationError> {
        ensure!(duration.is_finite(), NonFiniteDurationSnafu { duration });
        if duration == 0.0 {
            return Ok(self.state.clone());
        }
        let stop_time = self.state.time + duration;
        if duration.abs() >= LOG_PROGRESS_MTU {
            // Prevent the print spam for short diagnostic propagations
            info!(
                "Propagating for {:.4} MTU until t = {:.4} MTU",
                duration, stop_time
            );
        }
        // Call `finally` on the current state to set anything up
        self.state = self
            .prop
            .dynamics
            .finally(self.state.clone())
            .context(DynamicsSnafu)?;

        let backprop = duration < 0.0;
        if backprop {
            self.step_size = -self.step_size; // Invert the step size
        }
        loop {
            let t = self.state.time;
            if (!backprop && t + self.step_size > stop_time)
                || (backprop && t + self.step_size <= stop_time)
            {
                // Accumulated f64 time can sit within a few ulps of the stop
                // time; a residual step that small is no step at all.
                if (stop_time - t).abs() <= 4.0 * f64::EPSILON * stop_time.abs().max(1.0) {
                    // No propagation necessary
                    return Ok(self.state.clone());
                }
                // Take one final step of exactly the needed duration until the stop time
                let prev_step_size = self.step_size;
                let prev_step_kind = self.fixed_step;
                self.set_step(stop_time - t, true);

                self.single_step()?;

                // Publish to channel if provided
                if let Some(ref chan) = maybe_tx_chan {
                    if let Err(e) = chan.send(self.state.clone()) {
                        warn!("{} when sending on channel", e)
                    }
                }

                // Restore the step size for subsequent calls
                self.set_step(prev_step_size, prev_step_kind);

                if backprop {
                    self.step_size = -self.step_size; // Restore to a positive step size
                }

                return Ok(self.state.clone());
            } else {
                self.single_step()?;
                // Publish to channel if provided
                if let Some(ref chan) = maybe_tx_chan {
                    if let Err(e) = chan.send(self.state.clone()) {
                        warn!("{} when sending on channel", e)
                    }
                }
            }
        }
    }

    /// This method propagates the provided Dynamics for the provided duration (in MTU).
    pub fn for_duration(&mut self, duration: f64) -> Result<ModelState, PropagationError> {
        self.for_duration_channel_option(duration, None)
    }

    /// This method propagates the provided Dynamics for the provided duration and publishes each state on the channel.
    pub fn for_duration_with_channel(
        &mut self,
        duration: f64,
        tx_chan: Sender<ModelState>,
    ) -> Result<ModelState, PropagationError> {
        self.for_duration_channel_option(duration, Some(tx_chan))
    }

    /// Propagates the provided Dynamics until the provided model time. Returns the end state.
    pub fn until_time(&mut self, end_time: f64) -> Result<ModelState, PropagationError> {
        let duration = end_time - self.state.time;
        self.for_duration(duration)
    }

    /// Propagates the provided Dynamics for the provided duration and generates the trajectory
    /// of these dynamics on its own thread. Returns the end state and the trajectory.
    pub fn for_duration_with_traj(
        &mut self,
        duration: f64,
    ) -> Result<(ModelState, Trajectory), PropagationError> {
        let end_state;
        let mut traj = Trajectory::new();
        let start_state = self.state.clone();

        let rx = {
            // Channels that have a single state for the propagator
            let (tx, rx) = channel();
            // Propagate the dynamics
            // Note that the end state is also sent on the channel before the return of this function.
            end_state = self.for_duration_with_channel(duration, tx)?;
            rx
        };

        traj.states = rx.into_iter().par_bridge().collect();
        // Push the start state -- it is reordered in the finalize call.
        traj.states.push(start_state);

        traj.finalize();

        Ok((end_state, traj))
    }

    /// Propagates the provided Dynamics until the provided model time and generates the
    /// trajectory along the way. Returns the end state and the trajectory.
    pub fn until_time_with_traj(
        &mut self,
        end_time: f64,
    ) -> Result<(ModelState, Trajectory), PropagationError> {
        let duration = end_time - self.state.time;
        self.for_duration_with_traj(duration)
    }

    /// Take a single propagator step
    pub fn single_step(&mut self) -> Result<(), PropagationError> {
        let (t, state_vec) = self.derive()?;
        let new_time = self.state.time + t;
        self.state
            .set_augmented(new_time, &state_vec)
            .context(PropStateSnafu)?;
        self.state = self
            .prop
            .dynamics
            .finally(self.state.clone())
            .context(DynamicsSnafu)?;

        Ok(())
    }

    /// This method integrates the equations of motion (augmented with the STM
    /// when the state carries one).
    ///
    /// This function returns the step size used (in MTU) and the new augmented
    /// state as y_{n+1} = y_n + \frac{dy_n}{dt}. To get the integration
    /// details, check `self.latest_details`.
    fn derive(&mut self) -> Result<(f64, DVector<f64>), PropagationError> {
        let state_vec = self.state.as_augmented();
        // Re-allocate the stage vectors if the STM was toggled after `with`.
        if self.k[0].len() != state_vec.len() {
            for ki in &mut self.k {
                *ki = DVector::zeros(state_vec.len());
            }
        }
        // Reset the number of attempts used (we don't reset the error because it's set before it's read)
        self.details.attempts = 1;
        let mut step_size = self.step_size;
        loop {
            let ki = self
                .prop
                .dynamics
                .eom_augmented(0.0, &state_vec, &self.state)
                .context(DynamicsSnafu)?;
            self.k[0] = ki;
            let mut a_idx: usize = 0;
            for i in 0..(self.prop.stages - 1) {
                // Let's compute the c_i by summing the relevant items from the list of coefficients.
                // \sum_{j=1}^{i-1} a_ij  ∀ i ∈ [2, s]
                let mut ci: f64 = 0.0;
                // The wi stores the a_{s1} * k_1 + a_{s2} * k_2 + ... + a_{s, s-1} * k_{s-1} +
                let mut wi = DVector::<f64>::zeros(state_vec.len());
                for kj in &self.k[0..i + 1] {
                    let a_ij = self.prop.a_coeffs[a_idx];
                    ci += a_ij;
                    wi.axpy(a_ij, kj, 1.0);
                    a_idx += 1;
                }

                let mut yi = wi * step_size;
                yi += &state_vec;
                let ki = self
                    .prop
                    .dynamics
                    .eom_augmented(ci * step_size, &yi, &self.state)
                    .context(DynamicsSnafu)?;
                self.k[i + 1] = ki;
            }
            // Compute the next state and the error
            let mut next_state = state_vec.clone();
            // State error estimation from the embedded lower order method.
            let mut error_est = DVector::<f64>::zeros(state_vec.len());
            for (i, ki) in self.k.iter().enumerate() {
                let b_i = self.prop.b_coeffs[i];
                if !self.fixed_step {
                    let b_i_star = self.prop.b_coeffs[i + self.prop.stages];
                    error_est.axpy(step_size * (b_i - b_i_star), ki, 1.0);
                }
                next_state.axpy(step_size * b_i, ki, 1.0);
            }

            if self.fixed_step {
                // Using a fixed step, no adaptive step necessary
                self.details.step = self.step_size;
                return Ok((self.details.step, next_state));
            } else {
                // Compute the error estimate over the full augmented vector.
                self.details.error = E::estimate(&error_est, &next_state, &state_vec);
                if self.details.error <= self.prop.opts.tolerance
                    || step_size.abs() <= self.prop.opts.min_step
                    || self.details.attempts >= self.prop.opts.attempts
                {
                    if self.details.attempts >= self.prop.opts.attempts {
                        warn!(
                            "Could not further decrease step size: maximum number of attempts reached ({})",
                            self.details.attempts
                        );
                    }

                    self.details.step = step_size;
                    if self.details.error < self.prop.opts.tolerance {
                        // Let's increase the step size for the next iteration.
                        // Error is less than tolerance, let's attempt to increase the step for the next iteration.
                        let proposed_step = 0.9
                            * step_size.abs()
                            * (self.prop.opts.tolerance / self.details.error)
                                .powf(1.0 / f64::from(self.prop.order));
                        let proposed_step = if proposed_step > self.prop.opts.max_step {
                            self.prop.opts.max_step
                        } else {
                            proposed_step
                        };
                        step_size = proposed_step.copysign(step_size);
                    }
                    // In all cases, let's update the step size to whatever was the adapted step size
                    self.step_size = step_size;
                    return Ok((self.details.step, next_state));
                } else {
                    // Error is too high and we aren't using the smallest step, and we haven't hit the max number of attempts.
                    // So let's adapt the step size.
                    self.details.attempts += 1;
                    let proposed_step = 0.9
                        * step_size.abs()
                        * (self.prop.opts.tolerance / self.details.error)
                            .powf(1.0 / f64::from(self.prop.order - 1));
                    let proposed_step = if proposed_step < self.prop.opts.min_step {
                        self.prop.opts.min_step
                    } else {
                        proposed_step
                    };
                    step_size = proposed_step.copysign(step_size);
                    // Note that we don't set self.step_size, that will be updated right before we return
                }
            }
        }
    }

    /// Copy the details of the latest integration step.
    pub fn latest_details(&self) -> IntegrationDetails {
        self.details
    }
}
