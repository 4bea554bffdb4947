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

use serde_derive::{Deserialize, Serialize};

/// A Gaussian dispersion applied to one state component.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dispersion {
    pub mean: f64,
    pub std_dev: f64,
}

impl Dispersion {
    pub fn new(mean: f64, std_dev: f64) -> Self {
        Self { mean, std_dev }
    }

    /// A zero-mean dispersion from its one-sigma value.
    pub fn zero_mean(std_dev: f64) -> Self {
        Self { mean: 0.0, std_dev }
    }

    /// A zero-mean dispersion from its three-sigma value.
    pub fn from_3std_dev(three_sigma: f64) -> Self {
        Self::zero_mean(three_sigma / 3.0)
    }
}
