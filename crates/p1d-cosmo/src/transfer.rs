use p1d_core::CosmologicalParameters;

/// Eisenstein & Hu (1998) zero-baryon-oscillation transfer function.
///
/// Baryons only suppress power through the scale-dependent effective shape
/// parameter; acoustic wiggles are smoothed out, which keeps `log P` locally
/// polynomial around the pivot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoWiggleTransfer {
    h: f64,
    omega_m: f64,
    theta2: f64,
    sound_horizon_mpc: f64,
    alpha_gamma: f64,
}

impl NoWiggleTransfer {
    /// Precomputes the cosmology-dependent coefficients.
    pub fn new(cosmo: &CosmologicalParameters) -> Self {
        let h = cosmo.h();
        let omega_m = cosmo.omega_m();
        let omh2 = omega_m * h * h;
        let obh2 = cosmo.ombh2;
        let baryon_fraction = cosmo.omega_b() / omega_m;
        let theta = cosmo.t_cmb / 2.7;
        let sound_horizon_mpc = 44.5 * (9.83 / omh2).ln() / (1.0 + 10.0 * obh2.powf(0.75)).sqrt();
        let alpha_gamma = 1.0 - 0.328 * (431.0 * omh2).ln() * baryon_fraction
            + 0.38 * (22.3 * omh2).ln() * baryon_fraction * baryon_fraction;
        Self {
            h,
            omega_m,
            theta2: theta * theta,
            sound_horizon_mpc,
            alpha_gamma,
        }
    }

    /// Approximate sound horizon at the drag epoch in Mpc.
    pub fn sound_horizon_mpc(&self) -> f64 {
        self.sound_horizon_mpc
    }

    /// Evaluates the transfer function at `k` in comoving Mpc^-1.
    pub fn evaluate(&self, k_mpc: f64) -> f64 {
        let ks = 0.43 * k_mpc * self.sound_horizon_mpc;
        let gamma_eff = self.omega_m
            * self.h
            * (self.alpha_gamma + (1.0 - self.alpha_gamma) / (1.0 + ks.powi(4)));
        let q = k_mpc / self.h * self.theta2 / gamma_eff;
        let l0 = (2.0 * std::f64::consts::E + 1.8 * q).ln();
        let c0 = 14.2 + 731.0 / (1.0 + 62.5 * q);
        l0 / (l0 + c0 * q * q)
    }
}
