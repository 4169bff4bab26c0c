//! End-to-end: run spec on disk → fit → artifact bundle → replay.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use swarm_nmf::artifacts::RunArtifactBundle;
use swarm_nmf::io::{read_matrix, write_matrix};
use swarm_nmf::prelude::*;
use swarm_nmf::run::execute;

fn temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut dir = std::env::temp_dir();
    dir.push(format!("swarmnmf_it_{prefix}_{}_{nanos}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_problem(dir: &PathBuf, config: &str) -> PathBuf {
    let w = Matrix::from_rows(&[[1.0, 0.0], [0.0, 1.0], [2.0, 1.0], [1.0, 3.0]]).unwrap();
    let h = Matrix::from_rows(&[[0.5, 1.0, 2.0], [1.5, 0.0, 1.0]]).unwrap();
    let x = w.matmul(&h).unwrap();
    write_matrix(dir.join("w.json"), &w).unwrap();
    write_matrix(dir.join("x.json"), &x).unwrap();

    let spec = dir.join("fit.json");
    fs::write(
        &spec,
        format!(r#"{{"w": "w.json", "x": "x.json", "config": {config}}}"#),
    )
    .unwrap();
    spec
}

#[test]
fn seeded_spec_produces_a_reopenable_bundle() {
    let dir = temp_dir("reopenable");
    let spec_path = write_problem(&dir, r#"{"max_iterations": 400, "seed": 11}"#);
    let out_dir = dir.join("out");

    let spec = RunSpec::load(&spec_path).unwrap();
    let output = execute(&spec, &out_dir).unwrap();

    let reopened = RunArtifactBundle::open(output.bundle.run_dir()).unwrap();
    assert_eq!(reopened.run_id(), output.bundle.run_id());
    reopened.validate_manifest().unwrap();

    let summary = reopened.read_summary().unwrap();
    assert_eq!(summary.seed, 11);
    assert_eq!(summary.h_shape, (2, 3));
    assert!(summary.reconstruction_error.is_finite());

    // The recorded snapshot replays to the same factor.
    let state = reopened.read_state().unwrap();
    let replay = Optimizer::new(state.replay_config())
        .fit(&read_matrix(&spec.w).unwrap(), &read_matrix(&spec.x).unwrap())
        .unwrap();
    assert_eq!(replay, state.h);

    // The quadratic objective is well within reach of 400 iterations.
    let x = read_matrix(&spec.x).unwrap();
    assert!(output.reconstruction_error < 0.1 * x.frobenius_norm());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn identical_inputs_map_to_the_same_run_id() {
    let dir = temp_dir("same_run_id");
    let spec_path = write_problem(&dir, r#"{"max_iterations": 5, "seed": 3}"#);
    let out_dir = dir.join("out");
    let spec = RunSpec::load(&spec_path).unwrap();

    let first = execute(&spec, &out_dir).unwrap();
    match execute(&spec, &out_dir) {
        Err(RunError::Io(e)) => assert_eq!(e.kind(), ErrorKind::AlreadyExists),
        other => panic!("expected an existing-bundle error, got {other:?}"),
    }
    // The first bundle is untouched by the refused second run.
    first.bundle.validate_manifest().unwrap();

    let other_dir = dir.join("other");
    let reseeded = RunSpec {
        config: PsoConfig {
            seed: Some(4),
            ..spec.config.clone()
        },
        ..spec.clone()
    };
    let second = execute(&reseeded, &other_dir).unwrap();
    assert_ne!(first.bundle.run_id(), second.bundle.run_id());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn invalid_config_is_reported_before_any_output() {
    let dir = temp_dir("invalid_config");
    let spec_path = write_problem(&dir, r#"{"population_size": 0}"#);
    let out_dir = dir.join("out");

    let spec = RunSpec::load(&spec_path).unwrap();
    let err = execute(&spec, &out_dir).unwrap_err();
    assert!(matches!(
        err,
        RunError::Optimize(Error::Config(ConfigError::EmptyPopulation))
    ));
    assert!(!out_dir.exists());

    let _ = fs::remove_dir_all(&dir);
}
