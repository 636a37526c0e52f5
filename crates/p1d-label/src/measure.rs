use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use p1d_core::serde::from_json_slice;
use p1d_core::{ErrorInfo, LabelError, P1dMeasurement};

/// Collaborator interface for the 1D flux power measured on a snapshot.
pub trait P1dSource {
    /// Returns the measurement for `snapshot` at redshift `z`.
    fn measure_p1d(&self, snapshot: usize, z: f64) -> Result<P1dMeasurement, LabelError>;
}

fn missing_measurement(snapshot: usize, z: f64) -> ErrorInfo {
    ErrorInfo::new("missing-measurement", "no 1D power available for snapshot")
        .with_context("snapshot", snapshot)
        .with_context("z", z)
}

/// Checks that the measured power is aligned with its k grid and holds
/// finite, non-negative samples.
pub fn check_measurement(snapshot: usize, p1d: &P1dMeasurement) -> Result<(), LabelError> {
    if p1d.k_mpc.len() != p1d.p1d_mpc.len() {
        return Err(LabelError::Alignment(
            ErrorInfo::new("length-mismatch", "1D power is not aligned with its k grid")
                .with_context("snapshot", snapshot)
                .with_context("k_len", p1d.k_mpc.len())
                .with_context("p1d_len", p1d.p1d_mpc.len()),
        ));
    }
    if let Some(idx) = p1d
        .k_mpc
        .iter()
        .zip(&p1d.p1d_mpc)
        .position(|(&k, &p)| !(k.is_finite() && k > 0.0 && p.is_finite() && p >= 0.0))
    {
        return Err(LabelError::Measurement(
            ErrorInfo::new("invalid-sample", "1D power samples must be finite and non-negative")
                .with_context("snapshot", snapshot)
                .with_context("index", idx)
                .with_context("k_mpc", p1d.k_mpc[idx])
                .with_context("p1d_mpc", p1d.p1d_mpc[idx]),
        ));
    }
    Ok(())
}

/// Measurements held in memory, keyed by snapshot index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemoryP1d {
    measurements: BTreeMap<usize, P1dMeasurement>,
}

impl InMemoryP1d {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a measurement, returning the one it replaced.
    pub fn insert(&mut self, snapshot: usize, p1d: P1dMeasurement) -> Option<P1dMeasurement> {
        self.measurements.insert(snapshot, p1d)
    }

    /// Number of stored measurements.
    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }
}

impl FromIterator<(usize, P1dMeasurement)> for InMemoryP1d {
    fn from_iter<I: IntoIterator<Item = (usize, P1dMeasurement)>>(iter: I) -> Self {
        Self {
            measurements: iter.into_iter().collect(),
        }
    }
}

impl P1dSource for InMemoryP1d {
    fn measure_p1d(&self, snapshot: usize, z: f64) -> Result<P1dMeasurement, LabelError> {
        self.measurements
            .get(&snapshot)
            .cloned()
            .ok_or_else(|| LabelError::Measurement(missing_measurement(snapshot, z)))
    }
}

/// Reads `p1d_NNN.json` files written by the flux power post-processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonDirP1d {
    dir: PathBuf,
}

impl JsonDirP1d {
    /// Serves measurements stored under `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the measurement files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File expected to hold the measurement for `snapshot`.
    pub fn path_for(&self, snapshot: usize) -> PathBuf {
        self.dir.join(format!("p1d_{snapshot:03}.json"))
    }
}

impl P1dSource for JsonDirP1d {
    fn measure_p1d(&self, snapshot: usize, z: f64) -> Result<P1dMeasurement, LabelError> {
        let path = self.path_for(snapshot);
        if !path.is_file() {
            return Err(LabelError::Measurement(
                missing_measurement(snapshot, z).with_context("path", path.display()),
            ));
        }
        let bytes = fs::read(&path).map_err(|err| LabelError::io("read-measurement", &path, err))?;
        from_json_slice(&bytes)
    }
}
