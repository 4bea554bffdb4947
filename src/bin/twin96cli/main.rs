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

extern crate log;
extern crate pretty_env_logger;
extern crate twin96;

use log::{error, info};
use std::env::{set_var, var};
use std::process::exit;
use twin96::experiment::TwinExperiment;
use twin96::io::ScenarioConfig;

const LOG_VAR: &str = "TWIN96_LOG";
const USAGE: &str = "usage: twin96cli <scenario.yaml>";

fn main() {
    if var(LOG_VAR).is_err() {
        set_var(LOG_VAR, "INFO");
    }
    if pretty_env_logger::try_init_custom_env(LOG_VAR).is_err() {
        println!("could not init logger");
    }

    let path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("{USAGE}");
            exit(2);
        }
    };

    let cfg = match ScenarioConfig::from_yaml_path(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{e}");
            exit(1);
        }
    };
    if cfg.output_dir.is_none() {
        info!("no output_dir in {path}: the products will not be exported");
    }

    let experiment = match TwinExperiment::new(cfg) {
        Ok(experiment) => experiment,
        Err(e) => {
            error!("{e}");
            exit(1);
        }
    };

    match experiment.run() {
        Ok(run) => {
            info!("twin experiment complete");
            info!("  initial state: {}", run.initial);
            info!("  truth: {}", run.truth);
            info!("  background: {}", run.background);
            let corr = run.background.correlation();
            let mut max_off_diag = 0.0_f64;
            for i in 0..corr.nrows() {
                for j in 0..i {
                    max_off_diag = max_off_diag.max(corr[(i, j)].abs());
                }
            }
            info!("  largest off-diagonal correlation: {max_off_diag:.4}");
            info!("  observations: {}", run.observations);
            if let Some(last) = run.study.lead_times.last() {
                info!(
                    "  linearization: mean relative error {:.3e} at τ = {} MTU",
                    run.study.mean_relative_error.last().unwrap(),
                    last
                );
            }
        }
        Err(e) => {
            error!("{e}");
            exit(1);
        }
    }
}
