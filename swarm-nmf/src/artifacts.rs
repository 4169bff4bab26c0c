//! Run artifact bundle writer/validator.
//!
//! A fit writes `runs/<run_id>/` containing:
//! - `run.json`: bundle metadata
//! - `config.json`: the configuration with its effective seed pinned
//! - `metrics.ndjson`: one [`IterationEvent`] per reported iteration
//! - `h.json`, `state.bin`, `summary.json`: written once the fit completes
//! - `manifest.json`: path-addressed SHA-256 digests of every other file
//!
//! The run id is derived from the pinned configuration and the input matrices,
//! so identical inputs always land in the same directory.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

use swarm_nmf_core::observe::{IterationEvent, Observer};

use crate::{FactorizationState, Matrix, PsoConfig, RunStatus};

const SCHEMA_VERSION_V1: u32 = 1;

/// A 16-byte run identifier, shown as 32 lowercase hex chars.
#[derive(Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct RunId(pub [u8; 16]);

impl RunId {
    /// `sha256(config_json || W || X)[0..16]`, with matrices hashed as
    /// shape followed by little-endian entries.
    pub fn derive(config: &PsoConfig, w: &Matrix, x: &Matrix) -> io::Result<Self> {
        let config_json =
            serde_json::to_vec(config).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let mut hasher = Sha256::new();
        hasher.update(&config_json);
        for m in [w, x] {
            hasher.update((m.rows() as u64).to_le_bytes());
            hasher.update((m.cols() as u64).to_le_bytes());
            for v in m.as_slice() {
                hasher.update(v.to_le_bytes());
            }
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        Ok(Self(bytes))
    }

    pub fn parse_hex(s: &str) -> Option<Self> {
        if s.len() != 32 {
            return None;
        }
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(s.get(i * 2..i * 2 + 2)?, 16).ok()?;
        }
        Some(Self(bytes))
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex_lower(&self.0))
    }
}

impl std::fmt::Debug for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl From<RunId> for String {
    fn from(id: RunId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for RunId {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        RunId::parse_hex(&s).ok_or_else(|| format!("invalid run id: {s}"))
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct ManifestV1 {
    schema_version: u32,
    run_id: RunId,
    hash_algo: String,
    entries: Vec<ManifestEntryV1>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct ManifestEntryV1 {
    // Path relative to `runs/<run_id>/`.
    path: String,
    sha256: String, // lowercase hex
    bytes: u64,
    required: bool,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct RunFileV1 {
    schema_version: u32,
    run_id: RunId,
    created_unix_nanos: u64,
    swarmnmf_version: String,
}

/// Outcome of a fit as recorded in `summary.json`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RunSummaryV1 {
    pub schema_version: u32,
    pub run_id: RunId,
    /// `‖X − W·H‖²_F`
    pub best_fitness: f64,
    /// `‖X − W·H‖_F`
    pub reconstruction_error: f64,
    pub iterations: usize,
    pub status: RunStatus,
    pub seed: u64,
    pub h_shape: (usize, usize),
}

/// A writer/validator for a single run artifact bundle (`runs/<run_id>/...`).
#[derive(Debug, Clone)]
pub struct RunArtifactBundle {
    run_dir: PathBuf,
    run_id: RunId,
}

impl RunArtifactBundle {
    /// Open an existing bundle directory by reading `run.json`.
    pub fn open(run_dir: impl AsRef<Path>) -> io::Result<Self> {
        let run_dir = run_dir.as_ref().to_path_buf();
        let run_file: RunFileV1 = read_json(&run_dir.join("run.json"))?;
        Ok(Self {
            run_dir,
            run_id: run_file.run_id,
        })
    }

    /// Create `<base>/runs/<run_id>/` with `run.json`, `config.json` and an
    /// empty `metrics.ndjson`.
    pub fn create(base: impl AsRef<Path>, run_id: RunId, config: &PsoConfig) -> io::Result<Self> {
        let run_dir = base.as_ref().join("runs").join(run_id.to_string());

        if run_dir.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("run artifact bundle already exists: {}", run_dir.display()),
            ));
        }
        fs::create_dir_all(&run_dir)?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let run_file = RunFileV1 {
            schema_version: SCHEMA_VERSION_V1,
            run_id,
            created_unix_nanos: now.as_nanos().min(u64::MAX as u128) as u64,
            swarmnmf_version: env!("CARGO_PKG_VERSION").to_string(),
        };
        write_json_pretty_atomic(&run_dir.join("run.json"), &run_file)?;
        write_json_pretty_atomic(&run_dir.join("config.json"), config)?;
        ensure_file(&run_dir.join("metrics.ndjson"))?;

        let bundle = Self { run_dir, run_id };
        // Emit an initial manifest so a bundle is valid immediately.
        bundle.finalize_manifest()?;
        Ok(bundle)
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn append_metric(&self, event: &IterationEvent) -> io::Result<()> {
        append_ndjson(&self.run_dir.join("metrics.ndjson"), event)
    }

    pub fn read_metrics(&self) -> io::Result<Vec<IterationEvent>> {
        let file = File::open(self.run_dir.join("metrics.ndjson"))?;
        let mut out = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            out.push(
                serde_json::from_str(&line)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
            );
        }
        Ok(out)
    }

    pub fn read_config(&self) -> io::Result<PsoConfig> {
        read_json(&self.run_dir.join("config.json"))
    }

    /// Write `h.json`, `state.bin` and `summary.json` for a finished fit.
    pub fn write_result(
        &self,
        state: &FactorizationState,
        summary: &RunSummaryV1,
    ) -> io::Result<()> {
        write_json_pretty_atomic(&self.run_dir.join("h.json"), &crate::io::to_rows(&state.h))?;
        let bytes = state
            .to_bytes()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        atomic_write(&self.run_dir.join("state.bin"), &bytes)?;
        write_json_pretty_atomic(&self.run_dir.join("summary.json"), summary)
    }

    pub fn read_summary(&self) -> io::Result<RunSummaryV1> {
        read_json(&self.run_dir.join("summary.json"))
    }

    pub fn read_state(&self) -> io::Result<FactorizationState> {
        let bytes = fs::read(self.run_dir.join("state.bin"))?;
        FactorizationState::from_bytes(&bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// (Re)compute and write `manifest.json` for all current files in the bundle.
    ///
    /// Note: `manifest.json` is excluded from itself (non-self-referential).
    pub fn finalize_manifest(&self) -> io::Result<()> {
        for p in REQUIRED_PATHS_V1 {
            let full = self.run_dir.join(p);
            if !full.exists() {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("missing required bundle file: {p}"),
                ));
            }
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.run_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name == "manifest.json" || name.ends_with(".tmp") {
                continue;
            }
            let path = entry.path();
            entries.push(ManifestEntryV1 {
                required: REQUIRED_PATHS_V1.contains(&name.as_str()),
                bytes: fs::metadata(&path)?.len(),
                sha256: hex_lower(&sha256_file(&path)?),
                path: name,
            });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        let manifest = ManifestV1 {
            schema_version: SCHEMA_VERSION_V1,
            run_id: self.run_id,
            hash_algo: "sha256".to_string(),
            entries,
        };
        write_json_pretty_atomic(&self.run_dir.join("manifest.json"), &manifest)
    }

    /// Validate `manifest.json` against current on-disk bytes.
    pub fn validate_manifest(&self) -> io::Result<()> {
        let manifest: ManifestV1 = read_json(&self.run_dir.join("manifest.json"))?;

        if manifest.schema_version != SCHEMA_VERSION_V1 {
            return Err(invalid_data("unsupported manifest schema_version"));
        }
        if manifest.run_id != self.run_id {
            return Err(invalid_data("manifest run_id mismatch"));
        }
        if manifest.hash_algo != "sha256" {
            return Err(invalid_data("unsupported hash algorithm"));
        }

        for entry in manifest.entries {
            let path = self.run_dir.join(&entry.path);
            if !path.exists() {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("missing file listed in manifest: {}", entry.path),
                ));
            }
            if fs::metadata(&path)?.len() != entry.bytes {
                return Err(invalid_data(&format!(
                    "size mismatch for {} (expected {})",
                    entry.path, entry.bytes
                )));
            }
            if hex_lower(&sha256_file(&path)?) != entry.sha256 {
                return Err(invalid_data(&format!("sha256 mismatch for {}", entry.path)));
            }
        }
        Ok(())
    }
}

/// Appends every observed event to a bundle's `metrics.ndjson`.
///
/// Observers cannot fail, so the first write error is kept and surfaced by
/// [`finish`](Self::finish); later events are dropped.
#[derive(Debug)]
pub struct MetricsObserver<'a> {
    bundle: &'a RunArtifactBundle,
    error: Option<io::Error>,
}

impl<'a> MetricsObserver<'a> {
    pub fn new(bundle: &'a RunArtifactBundle) -> Self {
        Self {
            bundle,
            error: None,
        }
    }

    pub fn finish(self) -> io::Result<()> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Observer for MetricsObserver<'_> {
    fn on_iteration(&mut self, event: &IterationEvent) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.bundle.append_metric(event) {
            tracing::warn!(error = %e, "failed to append iteration metric");
            self.error = Some(e);
        }
    }
}

const REQUIRED_PATHS_V1: &[&str] = &["run.json", "config.json", "metrics.ndjson"];

fn invalid_data(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}

fn ensure_file(path: &Path) -> io::Result<()> {
    if path.exists() {
        return Ok(());
    }
    File::create(path)?;
    Ok(())
}

fn write_json_pretty_atomic<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    let json =
        serde_json::to_vec_pretty(value).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    atomic_write(path, &json)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> io::Result<T> {
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn append_ndjson<T: serde::Serialize>(path: &Path, record: &T) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let line =
        serde_json::to_string(record).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    let mut buf = line.into_bytes();
    buf.push(b'\n');
    file.write_all(&buf)?;
    file.flush()
}

fn sha256_file(path: &Path) -> io::Result<[u8; 32]> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    Ok(out)
}

fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid file name"))?;
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));

    {
        let mut f = File::create(&tmp_path)?;
        f.write_all(bytes)?;
        f.flush()?;
        let _ = f.sync_all();
    }

    fs::rename(&tmp_path, path)
}

fn hex_lower(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}
