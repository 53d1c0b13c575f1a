// tests/variance_gamma_test.rs
use option_engines::models::variance_gamma::{
    VarianceGammaEngine, VarianceGammaFitter, VgParams, MIN_OBSERVATIONS,
};
use option_engines::models::Contract;
use option_engines::rng;
use option_engines::EngineError;
use std::fs;

#[test]
fn test_fitter_on_fat_tailed_synthetic_returns() {
    // normal mixture: mostly calm days with occasional large moves, the
    // shape VG exists to capture
    let dt: f64 = 1.0 / 252.0;
    let calm_sd = 0.15 * dt.sqrt();
    let wild_sd = 0.60 * dt.sqrt();
    let mut rng = rng::seed_rng_from_u64(2024);
    let returns: Vec<f64> = (0..1500)
        .map(|i| {
            let sd = if i % 20 == 0 { wild_sd } else { calm_sd };
            sd * rng::get_normal_draw(&mut rng)
        })
        .collect();

    let fit = VarianceGammaFitter::fit(&returns, dt).unwrap();
    println!(
        "sigma {:.4} nu {:.4} theta {:.4} gof {:.3} fell_back {}",
        fit.params.sigma, fit.params.nu, fit.params.theta, fit.goodness_of_fit, fit.fell_back
    );
    assert!(!fit.fell_back);
    // mixture kurtosis must show up as a positive gamma-clock variance
    assert!(fit.params.nu >= 0.01);
    assert!(fit.params.sigma > 0.05 && fit.params.sigma < 0.6);
}

#[test]
fn test_fitter_enforces_minimum_observations() {
    let thin = vec![0.001; MIN_OBSERVATIONS - 1];
    let err = VarianceGammaFitter::fit(&thin, 1.0 / 252.0).unwrap_err();
    assert!(matches!(err, EngineError::InsufficientData { .. }));
}

#[test]
fn test_fit_from_file_round_trip() {
    let path = std::env::temp_dir().join("option_engines_vg_fit.csv");
    let mut csv = String::from("Date,Open,High,Low,Close,Volume\n");
    let dt: f64 = 1.0 / 252.0;
    let daily_sd = 0.25 * dt.sqrt();
    let mut rng = rng::seed_rng_from_u64(7);
    let mut price = 100.0_f64;
    for day in 0..600 {
        price *= (daily_sd * rng::get_normal_draw(&mut rng)).exp();
        csv.push_str(&format!("2024-{:03},0,0,0,{:.6},1000\n", day, price));
    }
    fs::write(&path, csv).unwrap();

    let fit = VarianceGammaFitter::fit_from_file(&path, dt).unwrap();
    println!("file fit sigma {:.4}", fit.params.sigma);
    assert!(!fit.fell_back);
    assert!((fit.params.sigma - 0.25).abs() < 0.08);

    fs::remove_file(&path).ok();
}

#[test]
fn test_fit_from_missing_file_is_io_error() {
    let path = std::env::temp_dir().join("option_engines_vg_missing.csv");
    let err = VarianceGammaFitter::fit_from_file(&path, 1.0 / 252.0).unwrap_err();
    assert!(matches!(err, EngineError::Io { .. }));
}

#[test]
fn test_pricing_end_to_end_from_fitted_params() {
    let dt: f64 = 1.0 / 252.0;
    let daily_sd = 0.2 * dt.sqrt();
    let mut rng = rng::seed_rng_from_u64(11);
    let returns: Vec<f64> = (0..1000)
        .map(|_| daily_sd * rng::get_normal_draw(&mut rng))
        .collect();
    let fit = VarianceGammaFitter::fit(&returns, dt).unwrap();

    let contract = Contract::new(100.0, 100.0, 0.03, 0.5).unwrap();
    let engine = VarianceGammaEngine::new(contract, fit.params).unwrap();
    let px = engine.price();
    println!("vg call {:.4} put {:.4}", px.call, px.put);
    assert!(px.call > 0.0 && px.put > 0.0);
    // effective vol near 20% implies an ATM call around 6.5 here
    assert!(px.call > 4.0 && px.call < 10.0);
}

#[test]
fn test_heavier_clock_raises_prices() {
    let contract = Contract::new(100.0, 100.0, 0.03, 1.0).unwrap();
    let thin = VarianceGammaEngine::new(
        contract,
        VgParams {
            sigma: 0.2,
            nu: 0.05,
            theta: -0.1,
        },
    )
    .unwrap()
    .price();
    let heavy = VarianceGammaEngine::new(
        contract,
        VgParams {
            sigma: 0.2,
            nu: 0.6,
            theta: -0.1,
        },
    )
    .unwrap()
    .price();
    assert!(heavy.call + heavy.put > thin.call + thin.put);
}
