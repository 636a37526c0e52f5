//! Astrophysical nuisance parameters assigned to each snapshot.
//!
//! Every value here is a placeholder for a per-box measurement that does not
//! exist yet, so each one is a named configuration default rather than a
//! constant inside a formula.

use p1d_core::{AstroParameters, CosmologicalParameters, ErrorInfo, LabelError};
use p1d_cosmo::ExpansionHistory;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Reference temperature for the thermal broadening scaling, in Kelvin.
const T_REFERENCE_KELVIN: f64 = 1e4;

fn default_mf_anchor() -> f64 {
    0.8
}

fn default_z_anchor_plus_one() -> f64 {
    3.25
}

fn default_slope() -> f64 {
    3.2
}

fn default_t0_kelvin() -> f64 {
    1.5e4
}

fn default_kf_mpc() -> f64 {
    10.0
}

fn default_gamma() -> f64 {
    1.6
}

fn default_sigma_kms_per_sqrt_t4() -> f64 {
    9.1
}

/// Toy redshift evolution `mF = exp(ln(anchor) * ((1+z)/z_anchor_plus_one)^slope)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanFluxModel {
    /// Flux value whose logarithm sets the optical depth normalisation.
    #[serde(default = "default_mf_anchor")]
    pub mf_anchor: f64,
    /// `1 + z` at which the optical depth equals `-ln(mf_anchor)`.
    #[serde(default = "default_z_anchor_plus_one")]
    pub z_anchor_plus_one: f64,
    /// Power-law slope of the optical depth in `1 + z`.
    #[serde(default = "default_slope")]
    pub slope: f64,
}

impl Default for MeanFluxModel {
    fn default() -> Self {
        Self {
            mf_anchor: default_mf_anchor(),
            z_anchor_plus_one: default_z_anchor_plus_one(),
            slope: default_slope(),
        }
    }
}

impl MeanFluxModel {
    /// Mean transmitted flux at redshift `z`.
    pub fn mean_flux(&self, z: f64) -> f64 {
        let tau = -self.mf_anchor.ln() * ((1.0 + z) / self.z_anchor_plus_one).powf(self.slope);
        (-tau).exp()
    }
}

/// Placeholder astrophysics shared by every snapshot of a box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AstroDefaults {
    /// IGM temperature at mean density in Kelvin.
    #[serde(default = "default_t0_kelvin")]
    pub t0_kelvin: f64,
    /// Pressure-smoothing wavenumber in comoving Mpc^-1.
    #[serde(default = "default_kf_mpc")]
    pub kf_mpc: f64,
    /// Temperature-density slope.
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    /// Mean flux evolution.
    #[serde(default)]
    pub mean_flux: MeanFluxModel,
    /// Thermal velocity dispersion in km/s at `T = 10^4 K`.
    #[serde(default = "default_sigma_kms_per_sqrt_t4")]
    pub sigma_kms_per_sqrt_t4: f64,
}

impl Default for AstroDefaults {
    fn default() -> Self {
        Self {
            t0_kelvin: default_t0_kelvin(),
            kf_mpc: default_kf_mpc(),
            gamma: default_gamma(),
            mean_flux: MeanFluxModel::default(),
            sigma_kms_per_sqrt_t4: default_sigma_kms_per_sqrt_t4(),
        }
    }
}

fn invalid_astro(key: &str, value: f64, requirement: &str) -> LabelError {
    LabelError::ConfigParse(
        ErrorInfo::new("invalid-value", format!("astro option {key} must be {requirement}"))
            .with_context("key", key)
            .with_context("value", value),
    )
}

impl AstroDefaults {
    /// Rejects placeholders that would produce unphysical labels.
    pub fn validate(&self) -> Result<(), LabelError> {
        let positive = [
            ("t0_kelvin", self.t0_kelvin),
            ("sigma_kms_per_sqrt_t4", self.sigma_kms_per_sqrt_t4),
            ("kf_mpc", self.kf_mpc),
            ("mean_flux.z_anchor_plus_one", self.mean_flux.z_anchor_plus_one),
        ];
        for (key, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid_astro(key, value, "positive and finite"));
            }
        }
        if !(self.gamma.is_finite() && self.gamma > 1.0) {
            return Err(invalid_astro("gamma", self.gamma, "finite and greater than 1"));
        }
        let anchor = self.mean_flux.mf_anchor;
        if !(anchor > 0.0 && anchor <= 1.0) {
            return Err(invalid_astro("mean_flux.mf_anchor", anchor, "in (0, 1]"));
        }
        if !self.mean_flux.slope.is_finite() {
            return Err(invalid_astro("mean_flux.slope", self.mean_flux.slope, "finite"));
        }
        Ok(())
    }

    /// Thermal broadening in km/s, `sigma_T4 * sqrt(T0 / 10^4 K)`.
    pub fn thermal_broadening_kms(&self) -> f64 {
        self.sigma_kms_per_sqrt_t4 * (self.t0_kelvin / T_REFERENCE_KELVIN).sqrt()
    }
}

/// Converts a velocity width into comoving Mpc.
///
/// `dvdx` is in km/s per comoving Mpc/h; dividing by `h` removes the
/// little-h units.
pub fn thermal_broadening_mpc(sigma_kms: f64, dvdx: f64, h: f64) -> Result<f64, LabelError> {
    if !(sigma_kms.is_finite() && sigma_kms > 0.0) {
        return Err(LabelError::ConfigParse(
            ErrorInfo::new(
                "invalid-value",
                "thermal velocity width must be positive and finite",
            )
            .with_context("sigma_kms", sigma_kms),
        ));
    }
    if !(dvdx.is_finite() && dvdx > 0.0 && h.is_finite() && h > 0.0) {
        return Err(LabelError::Conversion(
            ErrorInfo::new(
                "non-finite-factor",
                "velocity-to-length factor must be positive and finite",
            )
            .with_context("dvdx", dvdx)
            .with_context("h", h),
        ));
    }
    Ok(sigma_kms / dvdx / h)
}

/// Derives the astrophysical parameters for one snapshot.
///
/// Fails with `ConfigParse` before querying the background when the
/// placeholders are out of range.
pub fn estimate_astro(
    snapshot: usize,
    z: f64,
    cosmo: &CosmologicalParameters,
    background: &dyn ExpansionHistory,
    defaults: &AstroDefaults,
) -> Result<AstroParameters, LabelError> {
    defaults.validate()?;
    let dvdx = background.velocity_to_length_factor(cosmo, z)?;
    let sigma_t_mpc = thermal_broadening_mpc(defaults.thermal_broadening_kms(), dvdx, cosmo.h())?;
    let params = AstroParameters {
        mean_flux: defaults.mean_flux.mean_flux(z),
        kf_mpc: defaults.kf_mpc,
        sigma_t_mpc,
        gamma: defaults.gamma,
    };
    debug!(
        snapshot,
        z,
        dvdx,
        mean_flux = params.mean_flux,
        sigma_t_mpc,
        "estimated astro parameters"
    );
    Ok(params)
}
