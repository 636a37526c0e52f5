//! Linear matter power provider seam and redshift alignment.

use std::f64::consts::PI;

use p1d_core::{CosmologicalParameters, ErrorInfo, LabelError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::background::{BackgroundOpts, FriedmannBackground};
use crate::transfer::NoWiggleTransfer;

/// Speed of light in km/s.
pub const SPEED_OF_LIGHT_KMS: f64 = 299_792.458;
/// Wavenumber at which the primordial amplitude is quoted, in Mpc^-1.
pub const PRIMORDIAL_PIVOT_MPC: f64 = 0.05;

fn default_k_min() -> f64 {
    1e-4
}

fn default_k_max() -> f64 {
    20.0
}

fn default_points() -> usize {
    400
}

/// Log-spaced wavenumber grid specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KGridSpec {
    /// Smallest wavenumber in comoving Mpc^-1.
    #[serde(default = "default_k_min")]
    pub k_min_mpc: f64,
    /// Largest wavenumber in comoving Mpc^-1.
    #[serde(default = "default_k_max")]
    pub k_max_mpc: f64,
    /// Number of grid points including both ends.
    #[serde(default = "default_points")]
    pub points: usize,
}

impl Default for KGridSpec {
    fn default() -> Self {
        Self {
            k_min_mpc: default_k_min(),
            k_max_mpc: default_k_max(),
            points: default_points(),
        }
    }
}

impl KGridSpec {
    /// Materialises the grid in increasing order.
    pub fn build(&self) -> Result<Vec<f64>, LabelError> {
        if !(self.k_min_mpc > 0.0 && self.k_max_mpc > self.k_min_mpc) || self.points < 2 {
            return Err(LabelError::InsufficientData(
                ErrorInfo::new("invalid-k-grid", "k grid needs 0 < k_min < k_max and 2+ points")
                    .with_context("k_min_mpc", self.k_min_mpc)
                    .with_context("k_max_mpc", self.k_max_mpc)
                    .with_context("points", self.points),
            ));
        }
        let log_min = self.k_min_mpc.ln();
        let step = (self.k_max_mpc.ln() - log_min) / (self.points - 1) as f64;
        Ok((0..self.points)
            .map(|idx| (log_min + step * idx as f64).exp())
            .collect())
    }
}

/// Linear power as reported by a backend, rows in the backend's own order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearPowerTable {
    /// Wavenumber grid in comoving Mpc^-1.
    pub k_mpc: Vec<f64>,
    /// Redshift of each row of `power`.
    pub redshifts: Vec<f64>,
    /// Power in comoving Mpc^3, one row per entry of `redshifts`.
    pub power: Vec<Vec<f64>>,
}

/// Linear power re-matched to the caller's redshift order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedLinearPower {
    /// Wavenumber grid in comoving Mpc^-1.
    pub k_mpc: Vec<f64>,
    /// Requested redshifts, in the caller's order.
    pub redshifts: Vec<f64>,
    /// Power rows aligned with `redshifts`.
    pub power: Vec<Vec<f64>>,
}

impl AlignedLinearPower {
    /// Power curve for the snapshot at `index`.
    pub fn curve(&self, index: usize) -> Option<&[f64]> {
        self.power.get(index).map(Vec::as_slice)
    }

    /// Number of aligned rows.
    pub fn len(&self) -> usize {
        self.redshifts.len()
    }

    /// Whether no rows are present.
    pub fn is_empty(&self) -> bool {
        self.redshifts.is_empty()
    }
}

/// Collaborator interface for Boltzmann-code style linear power backends.
pub trait LinearPowerProvider {
    /// Short backend label recorded in dataset provenance.
    fn name(&self) -> &str;

    /// Computes the linear matter power at each requested redshift.
    ///
    /// Backends may reorder rows; `LinearPowerTable::redshifts` must report
    /// the order actually produced.
    fn linear_power(
        &self,
        cosmo: &CosmologicalParameters,
        redshifts: &[f64],
    ) -> Result<LinearPowerTable, LabelError>;
}

/// Re-matches backend rows to the requested redshifts by value.
pub fn align_to_requested(
    table: &LinearPowerTable,
    requested: &[f64],
    tolerance: f64,
) -> Result<AlignedLinearPower, LabelError> {
    if table.power.len() != table.redshifts.len() {
        return Err(LabelError::Alignment(
            ErrorInfo::new("length-mismatch", "power rows do not match reported redshifts")
                .with_context("rows", table.power.len())
                .with_context("redshifts", table.redshifts.len()),
        ));
    }
    if let Some((row, values)) = table
        .power
        .iter()
        .enumerate()
        .find(|(_, values)| values.len() != table.k_mpc.len())
    {
        return Err(LabelError::Alignment(
            ErrorInfo::new("length-mismatch", "power row is not aligned with the k grid")
                .with_context("row", row)
                .with_context("row_len", values.len())
                .with_context("k_len", table.k_mpc.len()),
        ));
    }

    let mut power = Vec::with_capacity(requested.len());
    let mut reordered = false;
    for (idx, &z) in requested.iter().enumerate() {
        let row = table
            .redshifts
            .iter()
            .position(|&candidate| (candidate - z).abs() <= tolerance)
            .ok_or_else(|| {
                LabelError::Alignment(
                    ErrorInfo::new(
                        "unmatched-redshift",
                        "backend did not report a row for the requested redshift",
                    )
                    .with_context("z", z)
                    .with_context("index", idx),
                )
            })?;
        reordered |= row != idx;
        power.push(table.power[row].clone());
    }
    if reordered {
        warn!(
            requested = ?requested,
            reported = ?table.redshifts,
            "linear power rows were reordered by the backend; re-matched by value"
        );
    }
    Ok(AlignedLinearPower {
        k_mpc: table.k_mpc.clone(),
        redshifts: requested.to_vec(),
        power,
    })
}

/// Tuning knobs for [`EisensteinHuProvider`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LinearPowerOpts {
    /// Output wavenumber grid.
    #[serde(default)]
    pub grid: KGridSpec,
    /// Expansion-history settings used for the growth factor.
    #[serde(default)]
    pub background: BackgroundOpts,
}

/// Analytic linear power backend: no-wiggle transfer function times
/// primordial spectrum times linear growth squared.
///
/// Rows are reported in decreasing redshift, the convention of common
/// Boltzmann codes.
#[derive(Debug, Clone, Default)]
pub struct EisensteinHuProvider {
    grid: KGridSpec,
    background: FriedmannBackground,
}

impl EisensteinHuProvider {
    /// Creates a provider from options.
    pub fn new(opts: LinearPowerOpts) -> Self {
        Self {
            grid: opts.grid,
            background: FriedmannBackground::new(opts.background),
        }
    }

    /// Linear power at `z` on the supplied grid.
    pub fn power_at(
        &self,
        cosmo: &CosmologicalParameters,
        k_mpc: &[f64],
        z: f64,
    ) -> Result<Vec<f64>, LabelError> {
        let transfer = NoWiggleTransfer::new(cosmo);
        let growth = self.background.growth_factor(cosmo, z)?;
        let hubble_mpc = cosmo.h0 / SPEED_OF_LIGHT_KMS;
        let omega_m = cosmo.omega_m();
        Ok(k_mpc
            .iter()
            .map(|&k| {
                let primordial = cosmo.a_s * (k / PRIMORDIAL_PIVOT_MPC).powf(cosmo.n_s - 1.0);
                let t = transfer.evaluate(k);
                let delta2 = 4.0 / 25.0
                    * primordial
                    * (k / hubble_mpc).powi(4)
                    * t
                    * t
                    * (growth / omega_m).powi(2);
                2.0 * PI * PI * delta2 / k.powi(3)
            })
            .collect())
    }
}

impl LinearPowerProvider for EisensteinHuProvider {
    fn name(&self) -> &str {
        "eisenstein-hu-nowiggle"
    }

    fn linear_power(
        &self,
        cosmo: &CosmologicalParameters,
        redshifts: &[f64],
    ) -> Result<LinearPowerTable, LabelError> {
        let k_mpc = self.grid.build()?;
        let mut ordered = redshifts.to_vec();
        ordered.sort_by(|a, b| b.total_cmp(a));
        let mut power = Vec::with_capacity(ordered.len());
        for &z in &ordered {
            power.push(self.power_at(cosmo, &k_mpc, z)?);
        }
        debug!(
            backend = self.name(),
            rows = ordered.len(),
            points = k_mpc.len(),
            "computed linear power table"
        );
        Ok(LinearPowerTable {
            k_mpc,
            redshifts: ordered,
            power,
        })
    }
}
