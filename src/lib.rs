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

/*! # twin96

Identical twin data assimilation experiments with the Lorenz 96 model.

twin96 generates synthetic "truth" by integrating a chaotic toy atmosphere,
quantifies how quickly the tangent-linear model diverges from the nonlinear
evolution of a perturbation, estimates a background error covariance with the
Canadian Quick lagged-difference method, and synthesizes noisy observations
through configurable observation operators. Every product can be exported as
CSV for plotting, and a whole experiment is described by a single YAML
scenario file.

All time quantities are in nondimensional model time units (MTU); the usual
Lorenz 96 scaling maps 0.05 MTU to about six hours of atmosphere.
*/

/// Provides all the propagators / integrators available in `twin96`.
pub mod propagators;

/// Provides the dynamical models (Lorenz 96 and its three-variable companion).
pub mod dynamics;

/// The model state: time, state vector, and optional state transition matrix.
pub mod state;

/// Time-ordered records of propagated states.
pub mod trajectory;

/// Tangent-linear diagnostics: transition matrices and linearization error.
pub mod linearize;

/// Random perturbation generation for ensemble studies.
pub mod mc;

/// Background error covariance estimation, including the Canadian Quick method.
pub mod covariance;

/// Observation operators, measurement noise, and synthetic observation arcs.
pub mod obs;

/// The identical twin experiment driver.
pub mod experiment;

/// Scenario configuration and CSV input/output.
pub mod io;

/// Utility functions shared by different modules.
pub mod utils;

#[macro_use]
extern crate log;

/// Re-export nalgebra
pub mod linalg {
    pub use nalgebra::base::*;
}

pub use self::state::ModelState;

#[allow(unused_imports)]
pub mod prelude {
    pub use crate::covariance::{sample_covariance, CanadianQuick, Covariance};
    pub use crate::dynamics::{Dynamics, Lorenz63, Lorenz96};
    pub use crate::experiment::{TwinExperiment, TwinRun};
    pub use crate::io::ScenarioConfig;
    pub use crate::linearize::{linearization_error, transition_matrix, LinearizationStudy};
    pub use crate::mc::{Dispersion, MultivariateNormal, PerturbationGenerator};
    pub use crate::obs::{
        LinearOperator, ObsNoise, Observation, ObservationArc, ObservationOperator,
        ObservationSimulator, Quadratic,
    };
    pub use crate::propagators::{PropOpts, Propagator};
    pub use crate::state::ModelState;
    pub use crate::trajectory::Trajectory;
}
