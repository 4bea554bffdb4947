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

use snafu::prelude::*;
use std::path::PathBuf;

/// Scenario files: the YAML description of a whole experiment.
pub mod scenario;
pub use self::scenario::{
    BackgroundConfig, IntegrationConfig, IntegScheme, LinearizationConfig, ModelConfig,
    ObservationConfig, OperatorKind, ScenarioConfig,
};

/// CSV writers (and readers) for every experiment product.
pub mod export;
pub use self::export::{
    read_matrix, write_linearization, write_matrix, write_observations, write_trajectory,
};

/// Scenario configuration errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    /// The scenario file could not be read.
    #[snafu(display("could not read scenario file {}: {source}", path.display()))]
    ReadScenario {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The scenario file could not be parsed.
    #[snafu(display("scenario parsing failed: {source}"))]
    ParseScenario { source: serde_yaml::Error },
    /// The scenario is parseable but unusable.
    #[snafu(display("invalid scenario: {reason}"))]
    InvalidConfig { reason: String },
}

/// Input/output errors for the CSV products.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum InputOutputError {
    #[snafu(display("I/O error while {action}: {source}"))]
    StdIo {
        action: &'static str,
        source: std::io::Error,
    },
    #[snafu(display("CSV error while {action}: {source}"))]
    Csv {
        action: &'static str,
        source: csv::Error,
    },
    #[snafu(display("could not parse a float while {action}: {source}"))]
    ParseFloat {
        action: &'static str,
        source: std::num::ParseFloatError,
    },
    #[snafu(display("matrix file {} is empty or ragged", path.display()))]
    BadMatrixFile { path: PathBuf },
}
