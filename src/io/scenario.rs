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

use super::{ConfigError, InvalidConfigSnafu, ParseScenarioSnafu, ReadScenarioSnafu};
use crate::obs::{LinearOperator, ObservationError, ObservationOperator, Quadratic};
use serde_derive::{Deserialize, Serialize};
use snafu::prelude::*;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// The YAML description of a whole identical twin experiment.
///
/// Every field has a classroom default, so the empty document `{}` is a valid
/// scenario; unknown fields are rejected to catch typos early.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    pub model: ModelConfig,
    pub integration: IntegrationConfig,
    /// Transient discarded before the truth run starts, in MTU.
    pub spinup: f64,
    /// Length of the recorded truth run, in MTU.
    pub truth_length: f64,
    pub linearization: LinearizationConfig,
    pub background: BackgroundConfig,
    pub observations: ObservationConfig,
    /// Seed of the experiment RNG; a scenario file fully determines its outputs.
    pub seed: u64,
    /// Where to export the CSV products; no export when unset.
    pub output_dir: Option<PathBuf>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            integration: IntegrationConfig::default(),
            spinup: 5.0,
            truth_length: 50.0,
            linearization: LinearizationConfig::default(),
            background: BackgroundConfig::default(),
            observations: ObservationConfig::default(),
            seed: 42,
            output_dir: None,
        }
    }
}

impl ScenarioConfig {
    /// Loads and validates a scenario from a YAML file.
    pub fn from_yaml_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path.as_ref()).context(ReadScenarioSnafu {
            path: path.as_ref().to_path_buf(),
        })?;
        let cfg: Self =
            serde_yaml::from_reader(BufReader::new(file)).context(ParseScenarioSnafu)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parses and validates a scenario from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_yaml::from_str(yaml).context(ParseScenarioSnafu)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serializes this scenario back to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).context(ParseScenarioSnafu)
    }

    /// Checks every parameter against its domain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(
            self.model.dimension >= 4,
            InvalidConfigSnafu {
                reason: format!(
                    "model.dimension must be at least 4, got {}",
                    self.model.dimension
                ),
            }
        );
        ensure!(
            self.model.forcing.is_finite(),
            InvalidConfigSnafu {
                reason: "model.forcing must be finite".to_string(),
            }
        );
        ensure!(
            self.integration.step > 0.0 && self.integration.step.is_finite(),
            InvalidConfigSnafu {
                reason: format!("integration.step must be positive, got {}", self.integration.step),
            }
        );
        ensure!(
            self.integration.min_step > 0.0
                && self.integration.max_step >= self.integration.min_step,
            InvalidConfigSnafu {
                reason: "integration.min_step/max_step must satisfy 0 < min <= max".to_string(),
            }
        );
        ensure!(
            self.integration.tolerance > 0.0,
            InvalidConfigSnafu {
                reason: "integration.tolerance must be positive".to_string(),
            }
        );
        ensure!(
            self.spinup >= 0.0 && self.truth_length > 0.0,
            InvalidConfigSnafu {
                reason: "spinup must be nonnegative and truth_length positive".to_string(),
            }
        );
        ensure!(
            !self.linearization.lead_times.is_empty()
                && self
                    .linearization
                    .lead_times
                    .iter()
                    .all(|t| *t > 0.0 && t.is_finite()),
            InvalidConfigSnafu {
                reason: "linearization.lead_times must be non-empty and positive".to_string(),
            }
        );
        ensure!(
            self.linearization.sigma > 0.0 && self.linearization.samples >= 1,
            InvalidConfigSnafu {
                reason: "linearization.sigma must be positive and samples at least 1".to_string(),
            }
        );
        ensure!(
            self.background.lag > 0.0,
            InvalidConfigSnafu {
                reason: "background.lag must be positive".to_string(),
            }
        );
        ensure!(
            self.observations.sigma >= 0.0 && self.observations.cadence > 0.0,
            InvalidConfigSnafu {
                reason: "observations.sigma must be nonnegative and cadence positive".to_string(),
            }
        );
        // Surface unusable operator configurations at load time rather than
        // halfway through an experiment.
        self.observations
            .operator
            .build(self.model.dimension)
            .map_err(|e| ConfigError::InvalidConfig {
                reason: format!("observations.operator: {e}"),
            })?;
        Ok(())
    }
}

/// The dynamical model parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub dimension: usize,
    pub forcing: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dimension: 40,
            forcing: 8.0,
        }
    }
}

/// The integrator selection and settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegrationConfig {
    pub scheme: IntegScheme,
    /// The truth recording grid (and the fixed step of the fixed schemes), in MTU.
    pub step: f64,
    /// Adaptive schemes only.
    pub min_step: f64,
    pub max_step: f64,
    pub tolerance: f64,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            scheme: IntegScheme::Rk4,
            step: 0.05,
            min_step: 1e-6,
            max_step: 0.25,
            tolerance: 1e-9,
        }
    }
}

/// The available integration schemes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegScheme {
    Rk2,
    Rk4,
    CashKarp45,
    Dormand45,
}

/// The linearization error study parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinearizationConfig {
    /// One-sigma size of the random initial perturbations.
    pub sigma: f64,
    /// Lead times to probe, in MTU.
    pub lead_times: Vec<f64>,
    /// Ensemble size.
    pub samples: usize,
}

impl Default for LinearizationConfig {
    fn default() -> Self {
        Self {
            sigma: 1e-3,
            lead_times: vec![0.05, 0.1, 0.2, 0.3, 0.5],
            samples: 50,
        }
    }
}

/// The Canadian Quick estimator parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackgroundConfig {
    /// The difference lag τ, in MTU.
    pub lag: f64,
    /// Spacing between difference samples, in MTU (defaults to every truth state).
    pub stride: Option<f64>,
    /// Additional transient to discard on top of the experiment spinup, in MTU.
    pub spinup: f64,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            lag: 0.25,
            stride: None,
            spinup: 0.0,
        }
    }
}

/// The observation synthesis parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObservationConfig {
    pub operator: OperatorKind,
    /// One-sigma observation noise, identical on every component.
    pub sigma: f64,
    /// Time between observation batches, in MTU.
    pub cadence: f64,
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            operator: OperatorKind::EveryNth {
                offset: 0,
                stride: 2,
            },
            sigma: 1.0,
            cadence: 0.25,
        }
    }
}

/// The observation operators a scenario can request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    /// Observe every variable.
    Identity,
    /// Observe the gridpoints `offset, offset + stride, ...`.
    EveryNth { offset: usize, stride: usize },
    /// Observe the cyclic mean of `width` adjacent gridpoints.
    MovingAverage { width: usize },
    /// Observe x²/2 on every variable.
    Quadratic,
}

impl OperatorKind {
    /// Instantiates the operator for the provided state dimension.
    pub fn build(
        &self,
        state_dim: usize,
    ) -> Result<Box<dyn ObservationOperator>, ObservationError> {
        Ok(match self {
            OperatorKind::Identity => Box::new(LinearOperator::identity(state_dim)),
            OperatorKind::EveryNth { offset, stride } => {
                Box::new(LinearOperator::every_nth(state_dim, *offset, *stride)?)
            }
            OperatorKind::MovingAverage { width } => {
                Box::new(LinearOperator::moving_average(state_dim, *width)?)
            }
            OperatorKind::Quadratic => Box::new(Quadratic::new(state_dim)),
        })
    }
}

#[cfg(test)]
mod ut_scenario {
    use super::{IntegScheme, OperatorKind, ScenarioConfig};

    #[test]
    fn empty_document_is_the_default_scenario() {
        let cfg = ScenarioConfig::from_yaml_str("{}").unwrap();
        assert_eq!(cfg, ScenarioConfig::default());
        assert_eq!(cfg.integration.scheme, IntegScheme::Rk4);
    }

    #[test]
    fn yaml_round_trip() {
        let mut cfg = ScenarioConfig::default();
        cfg.model.dimension = 12;
        cfg.observations.operator = OperatorKind::MovingAverage { width: 3 };
        let yaml = cfg.to_yaml().unwrap();
        let reparsed = ScenarioConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(reparsed, cfg);
    }

    #[test]
    fn typos_are_rejected() {
        assert!(ScenarioConfig::from_yaml_str("truth_lenght: 10.0").is_err());
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(ScenarioConfig::from_yaml_str("model: {dimension: 3}").is_err());
        assert!(ScenarioConfig::from_yaml_str("integration: {step: -0.05}").is_err());
        assert!(ScenarioConfig::from_yaml_str(
            "observations: {operator: {every_nth: {offset: 5, stride: 2}}}"
        )
        .is_err());
    }
}
