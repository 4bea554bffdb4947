use std::fs;
use std::path::PathBuf;
use twin96::io::{
    read_matrix, write_matrix, write_observations, write_trajectory, ScenarioConfig,
};
use twin96::linalg::{DMatrix, DVector};
use twin96::obs::{Observation, ObservationArc};
use twin96::state::ModelState;
use twin96::trajectory::Trajectory;

/// A scratch directory unique to the calling test.
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("twin96_tests").join(name);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn scenario_file_round_trip() {
    let dir = scratch_dir("scenario_file_round_trip");
    let path = dir.join("scenario.yaml");

    let mut cfg = ScenarioConfig::default();
    cfg.model.dimension = 12;
    cfg.seed = 7;
    fs::write(&path, cfg.to_yaml().unwrap()).unwrap();

    let loaded = ScenarioConfig::from_yaml_path(&path).unwrap();
    assert_eq!(loaded, cfg);
}

#[test]
fn missing_scenario_file_is_an_error() {
    assert!(ScenarioConfig::from_yaml_path("/nonexistent/scenario.yaml").is_err());
}

#[test]
fn hand_written_scenario_parses() {
    let yaml = r#"
model:
  dimension: 12
  forcing: 8.0
integration:
  scheme: dormand45
  tolerance: 1.0e-8
truth_length: 10.0
observations:
  operator:
    moving_average:
      width: 3
  sigma: 0.5
  cadence: 0.5
"#;
    let cfg = ScenarioConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(cfg.model.dimension, 12);
    assert_eq!(cfg.truth_length, 10.0);
    assert_eq!(cfg.observations.sigma, 0.5);
    // Untouched sections keep their defaults.
    assert_eq!(cfg.spinup, 5.0);
    assert_eq!(cfg.seed, 42);
}

#[test]
fn matrix_csv_round_trip_is_lossless() {
    let dir = scratch_dir("matrix_csv_round_trip");
    let path = dir.join("matrix.csv");

    let matrix = DMatrix::from_fn(5, 5, |i, j| {
        ((i * 5 + j) as f64 / 7.0) * if (i + j) % 2 == 0 { 1.0 } else { -1.0 }
    });
    write_matrix(&path, &matrix).unwrap();
    let read_back = read_matrix(&path).unwrap();
    // Shortest round-trip float formatting: bitwise equality.
    assert_eq!(read_back, matrix);
}

#[test]
fn trajectory_export_has_one_row_per_state() {
    let dir = scratch_dir("trajectory_export");
    let path = dir.join("truth.csv");

    let mut traj = Trajectory::new();
    for k in 0..7 {
        traj.states
            .push(ModelState::new(k as f64 * 0.05, DVector::from_element(3, k as f64)));
    }
    traj.finalize();
    write_trajectory(&path, &traj).unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 8, "header plus one row per state");
    assert_eq!(lines[0], "time,x00,x01,x02");
    assert!(lines[1].starts_with("0,"));
}

#[test]
fn observation_export_has_one_row_per_batch() {
    let dir = scratch_dir("observation_export");
    let path = dir.join("observations.csv");

    let arc = ObservationArc {
        observations: vec![
            Observation {
                time: 0.0,
                values: DVector::from_vec(vec![1.0, 2.0]),
            },
            Observation {
                time: 0.25,
                values: DVector::from_vec(vec![3.0, 4.0]),
            },
        ],
        operator: "identity".to_string(),
        noise_std_devs: DVector::from_element(2, 1.0),
    };
    write_observations(&path, &arc).unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "time,y00,y01");
    assert_eq!(lines[2], "0.25,3,4");
}
