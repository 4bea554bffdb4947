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

use crate::state::ModelState;
use snafu::prelude::*;
use std::fmt;

/// Relative slack allowed when checking the uniformity of the sampling grid.
const GRID_REL_TOL: f64 = 1e-6;

/// Trajectory errors.
#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TrajError {
    /// The trajectory holds no states.
    #[snafu(display("trajectory is empty"))]
    NoStates,
    /// The requested time is not covered by the trajectory.
    #[snafu(display("time {t} MTU is outside of [{start}, {end}] MTU"))]
    OutOfBounds { t: f64, start: f64, end: f64 },
    /// The trajectory is not sampled on a uniform grid.
    #[snafu(display("trajectory is not uniformly sampled (found steps {dt0:.6e} and {dt1:.6e} MTU)"))]
    NonUniformSampling { dt0: f64, dt1: f64 },
}

/// A time-ordered record of propagated states.
///
/// Propagators record every accepted step; the covariance estimator and the
/// observation simulator then work on the recorded grid directly, so there is
/// no interpolation in this crate.
#[derive(Clone, Debug, Default)]
pub struct Trajectory {
    /// Optionally ordered list of states in this trajectory (ordered by `finalize`).
    pub states: Vec<ModelState>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self { states: Vec::new() }
    }

    /// Orders the states by model time and removes duplicated times. Called
    /// by the propagator once all states are collected.
    pub fn finalize(&mut self) {
        self.states
            .sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap());
        self.states.dedup_by(|a, b| a.time == b.time);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn first(&self) -> Result<&ModelState, TrajError> {
        self.states.first().ok_or(TrajError::NoStates)
    }

    pub fn last(&self) -> Result<&ModelState, TrajError> {
        self.states.last().ok_or(TrajError::NoStates)
    }

    /// The covered model time span in MTU.
    pub fn span(&self) -> Result<f64, TrajError> {
        Ok(self.last()?.time - self.first()?.time)
    }

    /// Iterates over the recorded states in time order.
    pub fn iter(&self) -> impl Iterator<Item = &ModelState> {
        self.states.iter()
    }

    /// Iterates over every `stride`-th recorded state.
    pub fn every(&self, stride: usize) -> impl Iterator<Item = &ModelState> {
        self.states.iter().step_by(stride.max(1))
    }

    /// Returns the uniform sampling interval of this trajectory, or an error
    /// if the grid is not uniform. Requires at least two states.
    pub fn sampling_interval(&self) -> Result<f64, TrajError> {
        ensure!(self.states.len() >= 2, NoStatesSnafu);
        let dt0 = self.states[1].time - self.states[0].time;
        for pair in self.states.windows(2) {
            let dt1 = pair[1].time - pair[0].time;
            ensure!(
                (dt1 - dt0).abs() <= GRID_REL_TOL * dt0.abs().max(1e-12),
                NonUniformSamplingSnafu { dt0, dt1 }
            );
        }
        Ok(dt0)
    }

    /// Returns the recorded state nearest to the requested model time.
    pub fn nearest(&self, t: f64) -> Result<&ModelState, TrajError> {
        let first = self.first()?;
        let last = self.last()?;
        ensure!(
            t >= first.time - GRID_REL_TOL && t <= last.time + GRID_REL_TOL,
            OutOfBoundsSnafu {
                t,
                start: first.time,
                end: last.time
            }
        );
        let idx = self.states.partition_point(|s| s.time < t);
        if idx == 0 {
            return Ok(&self.states[0]);
        }
        if idx == self.states.len() {
            return Ok(&self.states[idx - 1]);
        }
        let before = &self.states[idx - 1];
        let after = &self.states[idx];
        if (t - before.time).abs() <= (after.time - t).abs() {
            Ok(before)
        } else {
            Ok(after)
        }
    }
}

impl fmt::Display for Trajectory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.first(), self.last()) {
            (Ok(first), Ok(last)) => write!(
                f,
                "Trajectory of {} states from t = {:.4} to t = {:.4} MTU",
                self.len(),
                first.time,
                last.time
            ),
            _ => write!(f, "empty Trajectory"),
        }
    }
}
