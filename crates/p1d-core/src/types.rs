use serde::{Deserialize, Serialize};

/// Physical neutrino density conversion, `omega_nu h^2 = sum(m_nu) / 93.14 eV`.
pub const NEUTRINO_MASS_PER_OMEGA_EV: f64 = 93.14;

/// Canonical cosmological parameters consumed by the linear power and
/// expansion-history backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CosmologicalParameters {
    /// Hubble constant in km/s/Mpc.
    #[serde(rename = "H0")]
    pub h0: f64,
    /// Physical baryon density `Omega_b h^2`.
    pub ombh2: f64,
    /// Physical cold dark matter density `Omega_cdm h^2`.
    pub omch2: f64,
    /// Sum of neutrino masses in eV.
    pub mnu: f64,
    /// Curvature density parameter.
    pub omk: f64,
    /// CMB temperature today in Kelvin.
    #[serde(rename = "TCMB")]
    pub t_cmb: f64,
    /// Primordial scalar amplitude at 0.05 Mpc^-1.
    #[serde(rename = "As")]
    pub a_s: f64,
    /// Primordial scalar spectral index.
    #[serde(rename = "ns")]
    pub n_s: f64,
}

impl CosmologicalParameters {
    /// Dimensionless Hubble parameter `h = H0 / 100`.
    pub fn h(&self) -> f64 {
        self.h0 / 100.0
    }

    /// Physical neutrino density `Omega_nu h^2`.
    pub fn omnuh2(&self) -> f64 {
        self.mnu / NEUTRINO_MASS_PER_OMEGA_EV
    }

    /// Baryon density parameter.
    pub fn omega_b(&self) -> f64 {
        self.ombh2 / (self.h() * self.h())
    }

    /// Total matter density parameter including massive neutrinos.
    pub fn omega_m(&self) -> f64 {
        (self.ombh2 + self.omch2 + self.omnuh2()) / (self.h() * self.h())
    }
}

/// Astrophysical nuisance parameters for a single snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AstroParameters {
    /// Mean transmitted flux, in (0, 1].
    #[serde(rename = "mF")]
    pub mean_flux: f64,
    /// Pressure-smoothing wavenumber in comoving Mpc^-1.
    #[serde(rename = "kF_Mpc")]
    pub kf_mpc: f64,
    /// Thermal broadening length in comoving Mpc.
    #[serde(rename = "sigT_Mpc")]
    pub sigma_t_mpc: f64,
    /// Slope of the temperature-density relation.
    pub gamma: f64,
}

/// Polynomial coefficients of `log(P)` in `log(k / k_pivot)`, highest degree first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PowerFitParameters {
    coefficients: Vec<f64>,
}

impl PowerFitParameters {
    /// Wraps coefficients ordered from the highest degree to the constant term.
    pub fn from_coefficients(coefficients: Vec<f64>) -> Self {
        Self { coefficients }
    }

    /// Coefficients ordered from the highest degree to the constant term.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Polynomial degree of the fit.
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Coefficient multiplying `x^power`, if the fit has that order.
    pub fn coefficient(&self, power: usize) -> Option<f64> {
        let degree = self.degree();
        if self.coefficients.is_empty() || power > degree {
            return None;
        }
        Some(self.coefficients[degree - power])
    }

    /// Fitted `log(P(k_pivot))`.
    pub fn log_power_at_pivot(&self) -> Option<f64> {
        self.coefficient(0)
    }

    /// Evaluates the polynomial at `x = log(k / k_pivot)`.
    pub fn evaluate(&self, x: f64) -> f64 {
        self.coefficients
            .iter()
            .fold(0.0, |acc, coeff| acc * x + coeff)
    }
}

/// Compact description of the linear power around the pivot.
#[allow(non_snake_case)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinPowerSummary {
    /// Dimensionless amplitude `k_p^3 P(k_p) / (2 pi^2)`.
    pub Delta2_p: f64,
    /// Logarithmic slope at the pivot.
    pub n_p: f64,
    /// Logarithmic running at the pivot.
    pub alpha_p: f64,
    /// Logarithmic growth rate at the snapshot redshift.
    pub f_p: f64,
}

/// 1D flux power spectrum measured on a snapshot at native resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct P1dMeasurement {
    /// Wavenumbers in comoving Mpc^-1.
    #[serde(rename = "k_Mpc")]
    pub k_mpc: Vec<f64>,
    /// Power aligned with `k_mpc`, in comoving Mpc.
    #[serde(rename = "p1d_Mpc")]
    pub p1d_mpc: Vec<f64>,
}

/// Emulator-facing feature vector in the emulator's canonical ordering.
#[allow(non_snake_case)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmulatorParams {
    /// Mean transmitted flux.
    pub mF: f64,
    /// Linear amplitude at the pivot.
    pub Delta2_p: f64,
    /// Linear running at the pivot.
    pub alpha_p: f64,
    /// Thermal broadening length in comoving Mpc.
    pub sigT_Mpc: f64,
    /// Logarithmic growth rate.
    pub f_p: f64,
    /// Linear slope at the pivot.
    pub n_p: f64,
    /// Temperature-density slope.
    pub gamma: f64,
    /// Pressure-smoothing wavenumber.
    pub kF_Mpc: f64,
}

impl EmulatorParams {
    /// Parameter names in the order returned by [`EmulatorParams::ordered`].
    pub const NAMES: [&'static str; 8] = [
        "mF", "Delta2_p", "alpha_p", "sigT_Mpc", "f_p", "n_p", "gamma", "kF_Mpc",
    ];

    /// Returns `(name, value)` pairs in canonical order.
    pub fn ordered(&self) -> [(&'static str, f64); 8] {
        let values = [
            self.mF,
            self.Delta2_p,
            self.alpha_p,
            self.sigT_Mpc,
            self.f_p,
            self.n_p,
            self.gamma,
            self.kF_Mpc,
        ];
        let mut out = [("", 0.0); 8];
        for (idx, slot) in out.iter_mut().enumerate() {
            *slot = (Self::NAMES[idx], values[idx]);
        }
        out
    }
}

/// Emulator-facing labeled snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Position of the snapshot in the input sequence.
    pub snapshot: usize,
    /// Snapshot redshift.
    pub z: f64,
    /// Astrophysical parameters derived for the snapshot.
    pub astro_params: AstroParameters,
    /// Polynomial description of the linear power around the pivot.
    #[serde(rename = "linP_Mpc")]
    pub lin_p_mpc: PowerFitParameters,
    /// Compact linear power summary derived from the fit.
    #[serde(rename = "linP_summary")]
    pub lin_p_summary: LinPowerSummary,
    /// Measured 1D flux power.
    pub p1d: P1dMeasurement,
}

impl SnapshotRecord {
    /// Assembles the emulator feature vector for this snapshot.
    pub fn emulator_params(&self) -> EmulatorParams {
        EmulatorParams {
            mF: self.astro_params.mean_flux,
            Delta2_p: self.lin_p_summary.Delta2_p,
            alpha_p: self.lin_p_summary.alpha_p,
            sigT_Mpc: self.astro_params.sigma_t_mpc,
            f_p: self.lin_p_summary.f_p,
            n_p: self.lin_p_summary.n_p,
            gamma: self.astro_params.gamma,
            kF_Mpc: self.astro_params.kf_mpc,
        }
    }
}
