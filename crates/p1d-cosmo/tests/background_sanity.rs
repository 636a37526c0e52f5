use p1d_core::{CosmologicalParameters, LabelError};
use p1d_cosmo::{BackgroundOpts, DensityBudget, ExpansionHistory, FriedmannBackground};

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

fn einstein_de_sitter() -> CosmologicalParameters {
    let h: f64 = 0.5;
    CosmologicalParameters {
        h0: 100.0 * h,
        ombh2: 0.05 * h * h,
        omch2: 0.95 * h * h,
        mnu: 0.0,
        omk: 0.0,
        t_cmb: 2.7255,
        a_s: 2.1e-9,
        n_s: 1.0,
    }
}

#[test]
fn density_budget_closes() {
    let budget = DensityBudget::from_cosmology(&planck_like());
    let total = budget.omega_m + budget.omega_r + budget.omega_k + budget.omega_lambda;
    assert!((total - 1.0).abs() < 1e-12);
    assert!(budget.omega_r > 0.0 && budget.omega_r < 1e-3);
    assert!((budget.e2(0.0) - 1.0).abs() < 1e-12);
}

#[test]
fn velocity_factor_matches_hubble_flow() {
    let cosmo = planck_like();
    let background = FriedmannBackground::default();
    let budget = DensityBudget::from_cosmology(&cosmo);
    for z in [2.0, 3.0, 4.0] {
        let factor = background
            .velocity_to_length_factor(&cosmo, z)
            .expect("factor");
        let expected = 100.0 * budget.e2(z).sqrt() / (1.0 + z);
        assert!((factor - expected).abs() < 1e-9 * expected);
    }
    let at_z3 = background.velocity_to_length_factor(&cosmo, 3.0).expect("factor");
    assert!(at_z3 > 100.0 && at_z3 < 120.0);
}

#[test]
fn matter_dominated_growth_is_scale_factor() {
    let cosmo = einstein_de_sitter();
    let background = FriedmannBackground::default();
    for z in [0.0, 2.0, 4.0] {
        let growth = background.growth_factor(&cosmo, z).expect("growth");
        assert!((growth - 1.0 / (1.0 + z)).abs() < 1e-6);
        let rate = background.growth_rate(&cosmo, z).expect("rate");
        assert!((rate - 1.0).abs() < 1e-6);
    }
}

#[test]
fn lambda_growth_is_suppressed_at_late_times() {
    let cosmo = planck_like();
    let background = FriedmannBackground::default();
    let today = background.growth_factor(&cosmo, 0.0).expect("growth");
    assert!(today > 0.7 && today < 0.85);
    let mut previous = today;
    for z in [1.0, 2.0, 3.0, 4.0] {
        let growth = background.growth_factor(&cosmo, z).expect("growth");
        assert!(growth < previous);
        previous = growth;
    }
    let rate_today = background.growth_rate(&cosmo, 0.0).expect("rate");
    assert!((rate_today - 0.3f64.powf(0.55)).abs() < 0.02);
    let rate_z3 = background.growth_rate(&cosmo, 3.0).expect("rate");
    assert!(rate_z3 > 0.95 && rate_z3 <= 1.0);
}

#[test]
fn out_of_range_redshift_is_a_conversion_error() {
    let cosmo = planck_like();
    let background = FriedmannBackground::new(BackgroundOpts {
        z_max: 10.0,
        ..BackgroundOpts::default()
    });
    assert_eq!(background.opts().z_max, 10.0);
    for z in [-0.5, 12.0, f64::NAN] {
        match background.velocity_to_length_factor(&cosmo, z) {
            Err(LabelError::Conversion(info)) => assert_eq!(info.code, "redshift-out-of-range"),
            other => panic!("expected conversion error, got {other:?}"),
        }
    }
}
