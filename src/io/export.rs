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

//! CSV writers for every experiment product. Floats are written with Rust's
//! shortest round-trip formatting, so reading a matrix back is lossless.

use super::{BadMatrixFileSnafu, CsvSnafu, InputOutputError, StdIoSnafu};
use crate::linalg::DMatrix;
use crate::linearize::LinearizationStats;
use crate::obs::ObservationArc;
use crate::trajectory::Trajectory;
use snafu::prelude::*;
use std::path::Path;

/// Writes a trajectory as `time, x00, x01, ...` rows with a header.
pub fn write_trajectory<P: AsRef<Path>>(
    path: P,
    traj: &Trajectory,
) -> Result<(), InputOutputError> {
    let mut wtr = csv::Writer::from_path(path.as_ref()).context(CsvSnafu {
        action: "creating the trajectory file",
    })?;
    let dim = traj.states.first().map(|s| s.dimension()).unwrap_or(0);
    let mut header = vec!["time".to_string()];
    header.extend((0..dim).map(|i| format!("x{i:02}")));
    wtr.write_record(&header).context(CsvSnafu {
        action: "writing the trajectory header",
    })?;
    for state in traj.iter() {
        let mut record = vec![state.time.to_string()];
        record.extend(state.vector.iter().map(|v| v.to_string()));
        wtr.write_record(&record).context(CsvSnafu {
            action: "writing a trajectory row",
        })?;
    }
    wtr.flush().context(StdIoSnafu {
        action: "flushing the trajectory file",
    })
}

/// Writes a dense matrix as headerless CSV rows.
pub fn write_matrix<P: AsRef<Path>>(
    path: P,
    matrix: &DMatrix<f64>,
) -> Result<(), InputOutputError> {
    let mut wtr = csv::Writer::from_path(path.as_ref()).context(CsvSnafu {
        action: "creating the matrix file",
    })?;
    for i in 0..matrix.nrows() {
        let record: Vec<String> = (0..matrix.ncols())
            .map(|j| matrix[(i, j)].to_string())
            .collect();
        wtr.write_record(&record).context(CsvSnafu {
            action: "writing a matrix row",
        })?;
    }
    wtr.flush().context(StdIoSnafu {
        action: "flushing the matrix file",
    })
}

/// Reads a dense matrix written by [`write_matrix`].
pub fn read_matrix<P: AsRef<Path>>(path: P) -> Result<DMatrix<f64>, InputOutputError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path.as_ref())
        .context(CsvSnafu {
            action: "opening the matrix file",
        })?;
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for record in rdr.records() {
        let record = record.context(CsvSnafu {
            action: "reading a matrix row",
        })?;
        let row: Vec<f64> = record
            .iter()
            .map(|field| {
                field.trim().parse::<f64>().context(super::ParseFloatSnafu {
                    action: "reading a matrix entry",
                })
            })
            .collect::<Result<_, _>>()?;
        rows.push(row);
    }
    let nrows = rows.len();
    let ncols = rows.first().map(Vec::len).unwrap_or(0);
    ensure!(
        nrows > 0 && ncols > 0 && rows.iter().all(|r| r.len() == ncols),
        BadMatrixFileSnafu {
            path: path.as_ref().to_path_buf()
        }
    );
    Ok(DMatrix::from_fn(nrows, ncols, |i, j| rows[i][j]))
}

/// Writes an observation arc as `time, y00, y01, ...` rows with a header.
pub fn write_observations<P: AsRef<Path>>(
    path: P,
    arc: &ObservationArc,
) -> Result<(), InputOutputError> {
    let mut wtr = csv::Writer::from_path(path.as_ref()).context(CsvSnafu {
        action: "creating the observations file",
    })?;
    let dim = arc
        .observations
        .first()
        .map(|o| o.values.len())
        .unwrap_or(0);
    let mut header = vec!["time".to_string()];
    header.extend((0..dim).map(|i| format!("y{i:02}")));
    wtr.write_record(&header).context(CsvSnafu {
        action: "writing the observations header",
    })?;
    for obs in arc.iter() {
        let mut record = vec![obs.time.to_string()];
        record.extend(obs.values.iter().map(|v| v.to_string()));
        wtr.write_record(&record).context(CsvSnafu {
            action: "writing an observation row",
        })?;
    }
    wtr.flush().context(StdIoSnafu {
        action: "flushing the observations file",
    })
}

/// Writes the aggregated linearization study, one row per lead time.
pub fn write_linearization<P: AsRef<Path>>(
    path: P,
    stats: &LinearizationStats,
) -> Result<(), InputOutputError> {
    let mut wtr = csv::Writer::from_path(path.as_ref()).context(CsvSnafu {
        action: "creating the linearization file",
    })?;
    wtr.write_record([
        "lead_time",
        "mean_error_rms",
        "mean_relative_error",
        "min_relative_error",
        "max_relative_error",
    ])
    .context(CsvSnafu {
        action: "writing the linearization header",
    })?;
    for (tau, err, mean, min, max) in stats.rows() {
        wtr.write_record(&[
            tau.to_string(),
            err.to_string(),
            mean.to_string(),
            min.to_string(),
            max.to_string(),
        ])
        .context(CsvSnafu {
            action: "writing a linearization row",
        })?;
    }
    wtr.flush().context(StdIoSnafu {
        action: "flushing the linearization file",
    })
}
