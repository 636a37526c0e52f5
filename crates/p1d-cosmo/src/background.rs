//! Homogeneous expansion history and linear growth for ΛCDM with curvature.

use p1d_core::{CosmologicalParameters, ErrorInfo, LabelError};
use serde::{Deserialize, Serialize};

/// Photon density today, `Omega_gamma h^2`, at `T_cmb = 2.7255 K`.
const OMEGA_GAMMA_H2_FIDUCIAL: f64 = 2.47282e-5;
/// Energy density of one relativistic neutrino species relative to photons.
const NEUTRINO_PER_PHOTON: f64 = 0.227_107_317_660_239_4;
/// Effective relativistic species without massive neutrinos.
const N_UR_MASSLESS: f64 = 3.046;
/// Residual relativistic species when three massive neutrinos are present.
const N_UR_MASSIVE: f64 = 0.00641;

fn conversion_error(code: &str, message: impl Into<String>, z: f64) -> LabelError {
    LabelError::Conversion(ErrorInfo::new(code, message.into()).with_context("z", z))
}

fn default_z_max() -> f64 {
    1100.0
}

fn default_growth_steps() -> usize {
    4096
}

/// Collaborator interface for expansion-history queries.
pub trait ExpansionHistory {
    /// Velocity-to-length conversion in km/s per comoving Mpc/h.
    fn velocity_to_length_factor(
        &self,
        cosmo: &CosmologicalParameters,
        z: f64,
    ) -> Result<f64, LabelError>;

    /// Logarithmic growth rate `dlnD/dlna`.
    fn growth_rate(&self, cosmo: &CosmologicalParameters, z: f64) -> Result<f64, LabelError>;
}

/// Density parameters today.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityBudget {
    /// Matter, including massive neutrinos.
    pub omega_m: f64,
    /// Photons plus relativistic neutrinos.
    pub omega_r: f64,
    /// Curvature.
    pub omega_k: f64,
    /// Cosmological constant closing the budget.
    pub omega_lambda: f64,
}

impl DensityBudget {
    /// Derives the budget from physical densities.
    pub fn from_cosmology(cosmo: &CosmologicalParameters) -> Self {
        let h2 = cosmo.h() * cosmo.h();
        let omega_gamma = OMEGA_GAMMA_H2_FIDUCIAL * (cosmo.t_cmb / 2.7255).powi(4) / h2;
        let n_ur = if cosmo.mnu > 0.0 {
            N_UR_MASSIVE
        } else {
            N_UR_MASSLESS
        };
        let omega_r = omega_gamma * (1.0 + NEUTRINO_PER_PHOTON * n_ur);
        let omega_m = cosmo.omega_m();
        Self {
            omega_m,
            omega_r,
            omega_k: cosmo.omk,
            omega_lambda: 1.0 - omega_m - cosmo.omk - omega_r,
        }
    }

    /// Dimensionless `E^2(z) = H^2(z) / H0^2`.
    pub fn e2(&self, z: f64) -> f64 {
        let zp1 = 1.0 + z;
        self.omega_r * zp1.powi(4)
            + self.omega_m * zp1.powi(3)
            + self.omega_k * zp1.powi(2)
            + self.omega_lambda
    }

    // Growth ignores radiation; the constant term absorbs it so E(a=1) = 1.
    fn growth_lambda(&self) -> f64 {
        1.0 - self.omega_m - self.omega_k
    }

    fn growth_e2(&self, a: f64) -> f64 {
        self.omega_m / a.powi(3) + self.omega_k / (a * a) + self.growth_lambda()
    }

    fn growth_integrand(&self, a: f64) -> f64 {
        if a <= 0.0 {
            return 0.0;
        }
        let denom = self.omega_m + self.omega_k * a + self.growth_lambda() * a.powi(3);
        a.powf(1.5) / denom.powf(1.5)
    }
}

/// Tuning knobs for [`FriedmannBackground`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundOpts {
    /// Largest redshift accepted by the expansion-history queries.
    #[serde(default = "default_z_max")]
    pub z_max: f64,
    /// Simpson intervals used for the growth integral (rounded up to even).
    #[serde(default = "default_growth_steps")]
    pub growth_steps: usize,
}

impl Default for BackgroundOpts {
    fn default() -> Self {
        Self {
            z_max: default_z_max(),
            growth_steps: default_growth_steps(),
        }
    }
}

/// Friedmann expansion history with linear growth from the Heath integral.
#[derive(Debug, Clone, Default)]
pub struct FriedmannBackground {
    opts: BackgroundOpts,
}

impl FriedmannBackground {
    /// Creates a background with the provided options.
    pub fn new(opts: BackgroundOpts) -> Self {
        Self { opts }
    }

    /// Options in use.
    pub fn opts(&self) -> &BackgroundOpts {
        &self.opts
    }

    fn check_redshift(&self, z: f64) -> Result<(), LabelError> {
        if !z.is_finite() || z < 0.0 || z > self.opts.z_max {
            return Err(LabelError::Conversion(
                ErrorInfo::new(
                    "redshift-out-of-range",
                    "redshift outside the valid range of the expansion history",
                )
                .with_context("z", z)
                .with_context("z_max", self.opts.z_max),
            ));
        }
        Ok(())
    }

    /// Hubble rate in km/s/Mpc.
    pub fn hubble(&self, cosmo: &CosmologicalParameters, z: f64) -> Result<f64, LabelError> {
        self.check_redshift(z)?;
        let e2 = DensityBudget::from_cosmology(cosmo).e2(z);
        let hubble = cosmo.h0 * e2.sqrt();
        if !hubble.is_finite() || hubble <= 0.0 {
            return Err(conversion_error(
                "non-finite-factor",
                "expansion rate is not a positive finite number",
                z,
            ));
        }
        Ok(hubble)
    }

    fn growth_integral(&self, budget: &DensityBudget, a: f64) -> f64 {
        let steps = (self.opts.growth_steps.max(2) + 1) & !1;
        let width = a / steps as f64;
        let mut sum = budget.growth_integrand(0.0) + budget.growth_integrand(a);
        for idx in 1..steps {
            let weight = if idx % 2 == 1 { 4.0 } else { 2.0 };
            sum += weight * budget.growth_integrand(idx as f64 * width);
        }
        sum * width / 3.0
    }

    /// Linear growth factor normalised to `a` during matter domination.
    pub fn growth_factor(
        &self,
        cosmo: &CosmologicalParameters,
        z: f64,
    ) -> Result<f64, LabelError> {
        self.check_redshift(z)?;
        let budget = DensityBudget::from_cosmology(cosmo);
        let a = 1.0 / (1.0 + z);
        let e = budget.growth_e2(a).sqrt();
        let growth = 2.5 * budget.omega_m * e * self.growth_integral(&budget, a);
        if !growth.is_finite() || growth <= 0.0 {
            return Err(conversion_error(
                "non-finite-growth",
                "linear growth factor is not a positive finite number",
                z,
            ));
        }
        Ok(growth)
    }
}

impl ExpansionHistory for FriedmannBackground {
    fn velocity_to_length_factor(
        &self,
        cosmo: &CosmologicalParameters,
        z: f64,
    ) -> Result<f64, LabelError> {
        let hubble = self.hubble(cosmo, z)?;
        Ok(hubble / (1.0 + z) / cosmo.h())
    }

    fn growth_rate(&self, cosmo: &CosmologicalParameters, z: f64) -> Result<f64, LabelError> {
        self.check_redshift(z)?;
        let budget = DensityBudget::from_cosmology(cosmo);
        let a = 1.0 / (1.0 + z);
        let e2 = budget.growth_e2(a);
        let integral = self.growth_integral(&budget, a);
        let dln_e =
            (-3.0 * budget.omega_m / a.powi(3) - 2.0 * budget.omega_k / (a * a)) / (2.0 * e2);
        let rate = dln_e + 1.0 / (a * a * e2.powf(1.5) * integral);
        if !rate.is_finite() {
            return Err(conversion_error(
                "non-finite-growth",
                "growth rate is not finite",
                z,
            ));
        }
        Ok(rate)
    }
}
