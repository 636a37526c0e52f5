use std::cmp::Ordering;
use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};
use p1d_core::{ErrorInfo, LabelError, LinPowerSummary, PowerFitParameters};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Highest polynomial degree accepted by the fit.
pub const MAX_FIT_DEGREE: usize = 8;

/// Singular values below this threshold are treated as zero by the solver.
const SVD_EPS: f64 = 1e-12;

fn fit_error(code: &str, message: impl Into<String>) -> LabelError {
    LabelError::InsufficientData(ErrorInfo::new(code, message.into()))
}

fn default_pivot_k_mpc() -> f64 {
    0.7
}

fn default_degree() -> usize {
    2
}

fn default_window_ratio() -> f64 {
    0.8
}

/// Configuration of the polynomial shape fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinPowerFitOpts {
    /// Pivot wavenumber in comoving Mpc^-1.
    #[serde(default = "default_pivot_k_mpc")]
    pub pivot_k_mpc: f64,
    /// Polynomial degree in `log(k / k_pivot)`.
    #[serde(default = "default_degree")]
    pub degree: usize,
    /// The window spans `[ratio * pivot, pivot / ratio]`.
    #[serde(default = "default_window_ratio")]
    pub window_ratio: f64,
}

impl Default for LinPowerFitOpts {
    fn default() -> Self {
        Self {
            pivot_k_mpc: default_pivot_k_mpc(),
            degree: default_degree(),
            window_ratio: default_window_ratio(),
        }
    }
}

impl LinPowerFitOpts {
    /// Inclusive fitting window in comoving Mpc^-1.
    pub fn window(&self) -> (f64, f64) {
        (
            self.window_ratio * self.pivot_k_mpc,
            self.pivot_k_mpc / self.window_ratio,
        )
    }

    fn validate(&self) -> Result<(), LabelError> {
        let pivot_ok = self.pivot_k_mpc.is_finite() && self.pivot_k_mpc > 0.0;
        let ratio_ok = self.window_ratio > 0.0 && self.window_ratio < 1.0;
        if !pivot_ok || !ratio_ok {
            return Err(LabelError::ConfigParse(
                ErrorInfo::new(
                    "invalid-value",
                    "fit needs a positive pivot and a window ratio in (0, 1)",
                )
                .with_context("pivot_k_mpc", self.pivot_k_mpc)
                .with_context("window_ratio", self.window_ratio),
            ));
        }
        if self.degree > MAX_FIT_DEGREE {
            return Err(LabelError::ConfigParse(
                ErrorInfo::new("invalid-value", "fit degree is too large")
                    .with_context("degree", self.degree)
                    .with_context("max_degree", MAX_FIT_DEGREE),
            ));
        }
        Ok(())
    }
}

/// Fits `log(P)` as a polynomial in `x = log(k / k_pivot)` inside the window.
///
/// Coefficients are returned from the highest degree down to the constant
/// term, so for an exact model the last entry equals `log(P(k_pivot))`.
/// Samples are ordered by wavenumber before solving, which makes the result
/// independent of the order of the input pairs.
pub fn fit_polynomial(
    k_mpc: &[f64],
    power: &[f64],
    opts: &LinPowerFitOpts,
) -> Result<PowerFitParameters, LabelError> {
    opts.validate()?;
    if k_mpc.len() != power.len() {
        return Err(LabelError::Alignment(
            ErrorInfo::new("length-mismatch", "power is not aligned with the k grid")
                .with_context("k_len", k_mpc.len())
                .with_context("power_len", power.len()),
        ));
    }
    if let Some(idx) = k_mpc
        .iter()
        .zip(power)
        .position(|(&k, &p)| !(k.is_finite() && k > 0.0 && p.is_finite() && p > 0.0))
    {
        return Err(LabelError::InsufficientData(
            ErrorInfo::new("invalid-sample", "wavenumbers and power must be positive and finite")
                .with_context("index", idx)
                .with_context("k_mpc", k_mpc[idx])
                .with_context("power", power[idx]),
        ));
    }

    let pivot = opts.pivot_k_mpc;
    let k_lo = k_mpc.iter().copied().fold(f64::INFINITY, f64::min);
    let k_hi = k_mpc.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(k_lo..=k_hi).contains(&pivot) {
        return Err(LabelError::InsufficientData(
            ErrorInfo::new("pivot-outside-grid", "pivot wavenumber lies outside the k grid")
                .with_context("pivot_k_mpc", pivot)
                .with_context("k_min", k_lo)
                .with_context("k_max", k_hi),
        ));
    }

    let (lo, hi) = opts.window();
    let mut samples: Vec<(f64, f64)> = k_mpc
        .iter()
        .zip(power)
        .filter(|(k, _)| **k >= lo && **k <= hi)
        .map(|(&k, &p)| (k, p))
        .collect();
    samples.sort_by(|a, b| match a.0.total_cmp(&b.0) {
        Ordering::Equal => a.1.total_cmp(&b.1),
        other => other,
    });
    let mut distinct = samples.iter().map(|(k, _)| *k).collect::<Vec<_>>();
    distinct.dedup();
    let needed = opts.degree + 1;
    if distinct.len() < needed {
        return Err(LabelError::InsufficientData(
            ErrorInfo::new(
                "insufficient-window-points",
                "fit window holds fewer distinct wavenumbers than coefficients",
            )
            .with_context("window_points", distinct.len())
            .with_context("needed", needed)
            .with_context("window_lo", lo)
            .with_context("window_hi", hi)
            .with_hint("widen the window ratio or refine the k grid"),
        ));
    }

    let design = DMatrix::from_fn(samples.len(), needed, |row, col| {
        let x = (samples[row].0 / pivot).ln();
        x.powi((opts.degree - col) as i32)
    });
    let rhs = DVector::from_iterator(samples.len(), samples.iter().map(|(_, p)| p.ln()));
    let solution = design
        .svd(true, true)
        .solve(&rhs, SVD_EPS)
        .map_err(|msg| fit_error("singular-design", msg))?;
    let coefficients: Vec<f64> = solution.iter().copied().collect();
    if coefficients.iter().any(|c| !c.is_finite()) {
        return Err(fit_error("non-finite-fit", "least-squares solution is not finite"));
    }
    debug!(
        pivot_k_mpc = pivot,
        degree = opts.degree,
        window_points = samples.len(),
        coefficients = ?coefficients,
        "fitted linear power shape"
    );
    Ok(PowerFitParameters::from_coefficients(coefficients))
}

/// Converts the fitted coefficients into the compact pivot summary.
pub fn summarize(
    fit: &PowerFitParameters,
    pivot_k_mpc: f64,
    growth_rate: f64,
) -> Result<LinPowerSummary, LabelError> {
    let log_power = fit
        .log_power_at_pivot()
        .ok_or_else(|| fit_error("empty-fit", "fit carries no coefficients"))?;
    Ok(LinPowerSummary {
        Delta2_p: pivot_k_mpc.powi(3) * log_power.exp() / (2.0 * PI * PI),
        n_p: fit.coefficient(1).unwrap_or(0.0),
        alpha_p: 2.0 * fit.coefficient(2).unwrap_or(0.0),
        f_p: growth_rate,
    })
}
