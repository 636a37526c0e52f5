use p1d_core::{CosmologicalParameters, LabelError};
use p1d_cosmo::{ExpansionHistory, FriedmannBackground};
use p1d_label::{
    estimate_astro, thermal_broadening_mpc, AstroDefaults, LabelOpts, MeanFluxModel,
};

fn planck_like() -> CosmologicalParameters {
    let h: f64 = 0.67;
    CosmologicalParameters {
        h0: 100.0 * h,
        ombh2: 0.049 * h * h,
        omch2: (0.3 - 0.049) * h * h,
        mnu: 0.0,
        omk: 0.0,
        t_cmb: 2.7255,
        a_s: 2.1e-9,
        n_s: 0.965,
    }
}

/// Expansion history with a fixed conversion factor.
struct FixedFactor(f64);

impl ExpansionHistory for FixedFactor {
    fn velocity_to_length_factor(
        &self,
        _cosmo: &CosmologicalParameters,
        _z: f64,
    ) -> Result<f64, LabelError> {
        Ok(self.0)
    }

    fn growth_rate(&self, _cosmo: &CosmologicalParameters, _z: f64) -> Result<f64, LabelError> {
        Ok(1.0)
    }
}

#[test]
fn mean_flux_matches_toy_model() {
    let model = MeanFluxModel::default();
    for (z, expected) in [(2.0, 0.84137), (3.0, 0.64813), (4.0, 0.41245)] {
        let mf: f64 = model.mean_flux(z);
        assert!((mf - expected).abs() < 1e-5, "z = {z}: {mf}");
        let closed_form = (0.8f64.ln() * ((1.0 + z) / 3.25).powf(3.2)).exp();
        assert!((mf - closed_form).abs() < 1e-15);
    }
    // (1 + z) equals the anchor at z = 2.25.
    assert!((model.mean_flux(2.25) - 0.8).abs() < 1e-15);
}

#[test]
fn mean_flux_decreases_with_redshift() {
    let model = MeanFluxModel::default();
    let mut previous = model.mean_flux(2.0);
    for step in 1..=60 {
        let z = 2.0 + step as f64 * 0.05;
        let mf = model.mean_flux(z);
        assert!(mf < previous, "not decreasing at z = {z}");
        assert!(mf > 0.0 && mf <= 1.0);
        previous = mf;
    }
}

#[test]
fn thermal_broadening_scales_with_sqrt_temperature() {
    let base = AstroDefaults::default();
    let hot = AstroDefaults {
        t0_kelvin: 4.0 * base.t0_kelvin,
        ..AstroDefaults::default()
    };
    assert!((base.thermal_broadening_kms() - 9.1 * 1.5f64.sqrt()).abs() < 1e-12);
    assert!((hot.thermal_broadening_kms() / base.thermal_broadening_kms() - 2.0).abs() < 1e-12);

    for dvdx in [50.0, 110.0, 300.0] {
        let cold = thermal_broadening_mpc(base.thermal_broadening_kms(), dvdx, 0.67)
            .expect("conversion");
        let warm = thermal_broadening_mpc(hot.thermal_broadening_kms(), dvdx, 0.67)
            .expect("conversion");
        assert!(cold > 0.0);
        assert!((warm / cold - 2.0).abs() < 1e-12);
    }
}

#[test]
fn non_physical_factor_is_a_conversion_error() {
    for dvdx in [0.0, -3.0, f64::NAN, f64::INFINITY] {
        match thermal_broadening_mpc(11.0, dvdx, 0.67) {
            Err(LabelError::Conversion(info)) => assert_eq!(info.code, "non-finite-factor"),
            other => panic!("expected conversion error, got {other:?}"),
        }
    }
    let cosmo = planck_like();
    let err = estimate_astro(0, 3.0, &cosmo, &FixedFactor(f64::NAN), &AstroDefaults::default())
        .unwrap_err();
    assert!(matches!(err, LabelError::Conversion(_)));
}

#[test]
fn placeholders_flow_into_parameters() {
    let cosmo = planck_like();
    let defaults = AstroDefaults::default();
    let params = estimate_astro(1, 3.0, &cosmo, &FixedFactor(100.0), &defaults).expect("astro");
    assert_eq!(params.kf_mpc, 10.0);
    assert_eq!(params.gamma, 1.6);
    let expected = 9.1 * 1.5f64.sqrt() / 100.0 / 0.67;
    assert!((params.sigma_t_mpc - expected).abs() < 1e-12);
}

#[test]
fn friedmann_background_gives_sub_megaparsec_broadening() {
    let cosmo = planck_like();
    let background = FriedmannBackground::default();
    let params = estimate_astro(0, 3.0, &cosmo, &background, &AstroDefaults::default())
        .expect("astro");
    assert!(params.sigma_t_mpc > 0.1 && params.sigma_t_mpc < 0.2);

    let err = estimate_astro(0, -1.0, &cosmo, &background, &AstroDefaults::default())
        .unwrap_err();
    assert!(matches!(err, LabelError::Conversion(ref info) if info.code == "redshift-out-of-range"));
}

fn expect_invalid_astro(defaults: &AstroDefaults, key: &str) {
    match defaults.validate() {
        Err(LabelError::ConfigParse(info)) => {
            assert_eq!(info.code, "invalid-value");
            assert_eq!(info.context.get("key"), Some(&key.to_string()));
        }
        other => panic!("expected config parse error for {key}, got {other:?}"),
    }
}

#[test]
fn unphysical_placeholders_are_rejected() {
    AstroDefaults::default().validate().expect("defaults are valid");

    let cases = [
        (AstroDefaults { t0_kelvin: -1.5e4, ..AstroDefaults::default() }, "t0_kelvin"),
        (AstroDefaults { sigma_kms_per_sqrt_t4: 0.0, ..AstroDefaults::default() }, "sigma_kms_per_sqrt_t4"),
        (AstroDefaults { kf_mpc: f64::NAN, ..AstroDefaults::default() }, "kf_mpc"),
        (AstroDefaults { gamma: 0.5, ..AstroDefaults::default() }, "gamma"),
        (
            AstroDefaults {
                mean_flux: MeanFluxModel { mf_anchor: 1.5, ..MeanFluxModel::default() },
                ..AstroDefaults::default()
            },
            "mean_flux.mf_anchor",
        ),
        (
            AstroDefaults {
                mean_flux: MeanFluxModel { z_anchor_plus_one: -3.25, ..MeanFluxModel::default() },
                ..AstroDefaults::default()
            },
            "mean_flux.z_anchor_plus_one",
        ),
        (
            AstroDefaults {
                mean_flux: MeanFluxModel { slope: f64::INFINITY, ..MeanFluxModel::default() },
                ..AstroDefaults::default()
            },
            "mean_flux.slope",
        ),
    ];
    for (defaults, key) in &cases {
        expect_invalid_astro(defaults, key);
    }
}

#[test]
fn invalid_yaml_placeholders_fail_before_labeling() {
    let opts = LabelOpts::from_yaml(
        b"astro: {t0_kelvin: -15000, gamma: 0.5, mean_flux: {mf_anchor: 1.5}}",
    )
    .expect("options parse");
    let err = estimate_astro(0, 2.0, &planck_like(), &FixedFactor(100.0), &opts.astro)
        .unwrap_err();
    assert!(matches!(err, LabelError::ConfigParse(ref info) if info.code == "invalid-value"));
}

#[test]
fn non_positive_velocity_width_is_rejected() {
    for sigma in [-9.1, 0.0, f64::NAN] {
        let err = thermal_broadening_mpc(sigma, 100.0, 0.67).unwrap_err();
        assert!(matches!(err, LabelError::ConfigParse(ref info) if info.code == "invalid-value"));
    }
}
