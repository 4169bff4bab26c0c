//! End-to-end fit pipeline: run spec → matrices → swarm → artifact bundle.

use std::fs;
use std::path::{Path, PathBuf};

use swarm_nmf_core::fitness::ReconstructionError;
use swarm_nmf_core::observe::Tee;
use swarm_nmf_core::particle::resolve_seed;

use crate::artifacts::{MetricsObserver, RunArtifactBundle, RunId, RunSummaryV1};
use crate::{FactorizationState, FitReport, Matrix, Optimizer, PsoConfig, RunError, TracingObserver};

/// A fit described on disk.
///
/// ```json
/// {
///   "w": "w.json",
///   "x": "x.json",
///   "config": { "population_size": 20, "max_iterations": 1000, "verbose": true }
/// }
/// ```
///
/// Relative matrix paths resolve against the spec file's directory.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RunSpec {
    pub w: PathBuf,
    pub x: PathBuf,
    #[serde(default)]
    pub config: PsoConfig,
}

impl RunSpec {
    /// Load a spec from JSON, resolving relative matrix paths.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RunError> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let mut spec: RunSpec = serde_json::from_slice(&bytes).map_err(|source| RunError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(dir) = path.parent() {
            spec.w = dir.join(&spec.w);
            spec.x = dir.join(&spec.x);
        }
        Ok(spec)
    }
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunOutput {
    pub bundle: RunArtifactBundle,
    pub report: FitReport,
    /// `‖X − W·H‖_F`
    pub reconstruction_error: f64,
}

/// Read the spec's matrices and run [`fit_to_bundle`].
pub fn execute(spec: &RunSpec, base: impl AsRef<Path>) -> Result<RunOutput, RunError> {
    let w = crate::io::read_matrix(&spec.w)?;
    let x = crate::io::read_matrix(&spec.x)?;
    fit_to_bundle(&w, &x, &spec.config, base)
}

/// Fit `H` and record the run under `<base>/runs/<run_id>/`.
///
/// Configuration and shape errors are raised before the bundle is created.
/// Any later failure removes the bundle again, so a failed run leaves no
/// output behind. The effective seed is pinned into the recorded
/// configuration so the bundle replays exactly.
pub fn fit_to_bundle(
    w: &Matrix,
    x: &Matrix,
    config: &PsoConfig,
    base: impl AsRef<Path>,
) -> Result<RunOutput, RunError> {
    config.validate().map_err(crate::Error::from)?;
    ReconstructionError::new(w, x)?;

    let config = PsoConfig {
        seed: Some(resolve_seed(config.seed)),
        ..config.clone()
    };
    let run_id = RunId::derive(&config, w, x)?;
    let bundle = RunArtifactBundle::create(base, run_id, &config)?;
    tracing::info!(
        %run_id,
        run_dir = %bundle.run_dir().display(),
        g = x.rows(),
        k = w.cols(),
        s = x.cols(),
        "starting fit"
    );

    match record_fit(&bundle, w, x, &config) {
        Ok((report, reconstruction_error)) => Ok(RunOutput {
            bundle,
            report,
            reconstruction_error,
        }),
        Err(e) => {
            tracing::warn!(%run_id, error = %e, "fit failed; removing run bundle");
            if let Err(cleanup) = fs::remove_dir_all(bundle.run_dir()) {
                tracing::warn!(%run_id, error = %cleanup, "failed to remove run bundle");
            }
            Err(e)
        }
    }
}

fn record_fit(
    bundle: &RunArtifactBundle,
    w: &Matrix,
    x: &Matrix,
    config: &PsoConfig,
) -> Result<(FitReport, f64), RunError> {
    let run_id = bundle.run_id();
    let mut observer = Tee(TracingObserver, MetricsObserver::new(bundle));
    let report = Optimizer::new(config.clone()).fit_with_observer(w, x, &mut observer)?;
    observer.1.finish()?;

    let reconstruction_error = report.best_fitness.sqrt();
    let state = FactorizationState::from_report(&report, config);
    let summary = RunSummaryV1 {
        schema_version: 1,
        run_id,
        best_fitness: report.best_fitness,
        reconstruction_error,
        iterations: report.iterations,
        status: report.status,
        seed: report.seed,
        h_shape: report.h.shape(),
    };
    bundle.write_result(&state, &summary)?;
    bundle.finalize_manifest()?;

    tracing::info!(
        %run_id,
        iterations = report.iterations,
        reconstruction_error,
        status = ?report.status,
        "fit finished"
    );
    Ok((report, reconstruction_error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    use crate::RunStatus;

    fn temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let mut dir = std::env::temp_dir();
        dir.push(format!("swarmnmf_run_{prefix}_{}_{nanos}", std::process::id()));
        dir
    }

    fn problem() -> (Matrix, Matrix) {
        let w = Matrix::from_rows(&[[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]).unwrap();
        let x = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0], [4.0, 6.0]]).unwrap();
        (w, x)
    }

    #[test]
    fn fit_writes_a_valid_bundle() {
        let base = temp_dir("fit_writes_a_valid_bundle");
        let (w, x) = problem();
        let config = PsoConfig::builder()
            .max_iterations(60)
            .verbose(true)
            .log_every(20)
            .seed(9)
            .build()
            .unwrap();

        let out = fit_to_bundle(&w, &x, &config, &base).unwrap();
        out.bundle.validate_manifest().unwrap();

        let metrics = out.bundle.read_metrics().unwrap();
        let iterations: Vec<usize> = metrics.iter().map(|e| e.iteration).collect();
        assert_eq!(iterations, vec![20, 40, 60]);

        let summary = out.bundle.read_summary().unwrap();
        assert_eq!(summary.run_id, out.bundle.run_id());
        assert_eq!(summary.iterations, 60);
        assert_eq!(summary.status, RunStatus::Completed);
        assert_eq!(summary.h_shape, (2, 2));
        assert!((summary.reconstruction_error - out.reconstruction_error).abs() < 1e-12);

        let state = out.bundle.read_state().unwrap();
        assert_eq!(state.h, out.report.h);
        let h_json = crate::io::read_matrix(out.bundle.run_dir().join("h.json")).unwrap();
        assert_eq!(h_json.shape(), out.report.h.shape());
        for (a, b) in h_json.as_slice().iter().zip(out.report.h.as_slice()) {
            assert!((a - b).abs() <= 1e-12 * b.abs().max(1.0));
        }

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn unseeded_runs_pin_their_seed() {
        let base = temp_dir("unseeded_runs_pin_their_seed");
        let (w, x) = problem();
        let config = PsoConfig::builder().max_iterations(10).build().unwrap();

        let out = fit_to_bundle(&w, &x, &config, &base).unwrap();
        let recorded = out.bundle.read_config().unwrap();
        assert_eq!(recorded.seed, Some(out.report.seed));

        let replay = Optimizer::new(recorded).fit(&w, &x).unwrap();
        assert_eq!(replay, out.report.h);

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn shape_errors_leave_no_bundle() {
        let base = temp_dir("shape_errors_leave_no_bundle");
        let w = Matrix::zeros(2, 1);
        let x = Matrix::zeros(3, 1);
        let err = fit_to_bundle(&w, &x, &PsoConfig::default(), &base).unwrap_err();
        assert!(matches!(err, RunError::Optimize(crate::Error::Config(_))));
        assert!(!base.join("runs").exists());
    }

    #[test]
    fn numeric_failures_remove_the_bundle() {
        let base = temp_dir("numeric_failures_remove_the_bundle");
        let w = Matrix::from_rows(&[[1.0]]).unwrap();
        let x = Matrix::from_rows(&[[f64::NAN]]).unwrap();
        let config = PsoConfig::builder().max_iterations(5).seed(3).build().unwrap();

        for _ in 0..2 {
            let err = fit_to_bundle(&w, &x, &config, &base).unwrap_err();
            assert!(
                matches!(err, RunError::Optimize(crate::Error::Numeric { iteration: 0 })),
                "unexpected error: {err:?}"
            );
            let leftovers: Vec<_> = fs::read_dir(base.join("runs")).unwrap().collect();
            assert!(leftovers.is_empty());
        }

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn spec_paths_resolve_against_spec_dir() {
        let dir = temp_dir("spec_paths_resolve");
        fs::create_dir_all(&dir).unwrap();
        let (w, x) = problem();
        crate::io::write_matrix(dir.join("w.json"), &w).unwrap();
        crate::io::write_matrix(dir.join("x.json"), &x).unwrap();
        fs::write(
            dir.join("spec.json"),
            r#"{"w": "w.json", "x": "x.json", "config": {"max_iterations": 25, "seed": 3}}"#,
        )
        .unwrap();

        let spec = RunSpec::load(dir.join("spec.json")).unwrap();
        assert_eq!(spec.w, dir.join("w.json"));
        assert_eq!(spec.config.max_iterations, 25);
        assert_eq!(spec.config.population_size, 20);

        let out = execute(&spec, &dir).unwrap();
        assert_eq!(out.report.iterations, 25);
        assert!(out.report.h.is_non_negative());

        let _ = fs::remove_dir_all(&dir);
    }
}
