//! Snapshot labeler and end-to-end pipeline.

use std::collections::BTreeMap;

use p1d_core::serde::{from_yaml_slice, to_yaml_string};
use p1d_core::{
    stable_hash_string, CosmologicalParameters, DatasetProvenance, EmulatorParams, ErrorInfo,
    LabelError, SchemaVersion, SnapshotRecord,
};
use p1d_cosmo::{
    align_to_requested, cosmology_from_genic_str, AlignedLinearPower, ExpansionHistory,
    LinearPowerProvider,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::astro::{estimate_astro, AstroDefaults};
use crate::fit::{fit_polynomial, summarize, LinPowerFitOpts};
use crate::measure::{check_measurement, P1dSource};

fn default_redshift_tolerance() -> f64 {
    1e-6
}

/// Options controlling a labeling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelOpts {
    /// Polynomial shape fit configuration.
    #[serde(default)]
    pub fit: LinPowerFitOpts,
    /// Placeholder astrophysics.
    #[serde(default)]
    pub astro: AstroDefaults,
    /// Absolute tolerance used to match backend redshifts to requested ones.
    #[serde(default = "default_redshift_tolerance")]
    pub redshift_tolerance: f64,
}

impl Default for LabelOpts {
    fn default() -> Self {
        Self {
            fit: LinPowerFitOpts::default(),
            astro: AstroDefaults::default(),
            redshift_tolerance: default_redshift_tolerance(),
        }
    }
}

impl LabelOpts {
    /// Loads options from YAML; omitted fields take their defaults.
    pub fn from_yaml(data: &[u8]) -> Result<Self, LabelError> {
        from_yaml_slice(data)
    }

    /// Renders the options, defaults included, as YAML.
    pub fn to_yaml(&self) -> Result<String, LabelError> {
        to_yaml_string(self)
    }
}

/// Labeled snapshots of one simulation box together with their provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDataset {
    /// Schema of the serialized payload.
    pub schema_version: SchemaVersion,
    /// Hashes and backend identification.
    pub provenance: DatasetProvenance,
    /// Fit configuration shared by every record.
    pub fit: LinPowerFitOpts,
    /// Box cosmology shared by every record.
    pub cosmology: CosmologicalParameters,
    /// Records in snapshot order.
    pub records: Vec<SnapshotRecord>,
}

impl SnapshotDataset {
    /// Wraps labeled records and computes provenance hashes.
    pub fn assemble(
        cosmology: CosmologicalParameters,
        backend: &str,
        records: Vec<SnapshotRecord>,
        opts: &LabelOpts,
    ) -> Result<Self, LabelError> {
        let mut tool_versions = BTreeMap::new();
        tool_versions.insert(
            env!("CARGO_PKG_NAME").to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        let provenance = DatasetProvenance {
            cosmology_hash: stable_hash_string(&cosmology)?,
            options_hash: stable_hash_string(opts)?,
            dataset_hash: stable_hash_string(&records)?,
            linear_power_backend: backend.to_string(),
            tool_versions,
        };
        Ok(Self {
            schema_version: SchemaVersion::default(),
            provenance,
            fit: opts.fit.clone(),
            cosmology,
            records,
        })
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Emulator feature vectors in snapshot order.
    pub fn emulator_params(&self) -> Vec<EmulatorParams> {
        self.records
            .iter()
            .map(SnapshotRecord::emulator_params)
            .collect()
    }
}

fn check_alignment(
    redshifts: &[f64],
    linear: &AlignedLinearPower,
    tolerance: f64,
) -> Result<(), LabelError> {
    if linear.len() != redshifts.len() || linear.power.len() != redshifts.len() {
        return Err(LabelError::Alignment(
            ErrorInfo::new("length-mismatch", "linear power rows do not match snapshots")
                .with_context("snapshots", redshifts.len())
                .with_context("rows", linear.power.len()),
        ));
    }
    for (idx, (&z, &row_z)) in redshifts.iter().zip(&linear.redshifts).enumerate() {
        if (z - row_z).abs() > tolerance {
            return Err(LabelError::Alignment(
                ErrorInfo::new(
                    "unmatched-redshift",
                    "linear power row belongs to a different redshift",
                )
                .with_context("snapshot", idx)
                .with_context("z", z)
                .with_context("row_z", row_z),
            ));
        }
    }
    Ok(())
}

/// Labels each snapshot in order.
///
/// `linear` must already be aligned with `redshifts`. The first failure
/// aborts the pass and no records are returned.
pub fn label_snapshots(
    redshifts: &[f64],
    cosmo: &CosmologicalParameters,
    linear: &AlignedLinearPower,
    background: &dyn ExpansionHistory,
    p1d: &dyn P1dSource,
    opts: &LabelOpts,
) -> Result<Vec<SnapshotRecord>, LabelError> {
    check_alignment(redshifts, linear, opts.redshift_tolerance)?;
    let mut records = Vec::with_capacity(redshifts.len());
    for (snapshot, (&z, curve)) in redshifts.iter().zip(&linear.power).enumerate() {
        let fit = fit_polynomial(&linear.k_mpc, curve, &opts.fit)?;
        let astro_params = estimate_astro(snapshot, z, cosmo, background, &opts.astro)?;
        let growth_rate = background.growth_rate(cosmo, z)?;
        let summary = summarize(&fit, opts.fit.pivot_k_mpc, growth_rate)?;
        let measurement = p1d.measure_p1d(snapshot, z)?;
        check_measurement(snapshot, &measurement)?;
        debug!(
            snapshot,
            z,
            delta2_p = summary.Delta2_p,
            n_p = summary.n_p,
            "labeled snapshot"
        );
        records.push(SnapshotRecord {
            snapshot,
            z,
            astro_params,
            lin_p_mpc: fit,
            lin_p_summary: summary,
            p1d: measurement,
        });
    }
    Ok(records)
}

/// Runs the whole pipeline for one simulation box.
///
/// The GenIC parameter text is parsed first, so configuration errors surface
/// before the linear power backend or the fitter run.
pub fn label_simulation(
    genic_text: &str,
    redshifts: &[f64],
    provider: &dyn LinearPowerProvider,
    background: &dyn ExpansionHistory,
    p1d: &dyn P1dSource,
    opts: &LabelOpts,
) -> Result<SnapshotDataset, LabelError> {
    let cosmo = cosmology_from_genic_str(genic_text)?;
    info!(
        snapshots = redshifts.len(),
        backend = provider.name(),
        "labeling simulation"
    );
    let table = provider.linear_power(&cosmo, redshifts)?;
    let aligned = align_to_requested(&table, redshifts, opts.redshift_tolerance)?;
    let records = label_snapshots(redshifts, &cosmo, &aligned, background, p1d, opts)?;
    let dataset = SnapshotDataset::assemble(cosmo, provider.name(), records, opts)?;
    info!(
        records = dataset.len(),
        dataset_hash = %dataset.provenance.dataset_hash,
        "labeled simulation"
    );
    Ok(dataset)
}
