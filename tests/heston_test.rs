// tests/heston_test.rs
use option_engines::calibration::{CalibrationPhase, HestonCalibrator};
use option_engines::greeks::{finite_difference_greeks, GreeksConfig};
use option_engines::models::black_scholes::{self, BsParams};
use option_engines::models::heston::{
    HestonEngine, HestonModel, HestonParams, IntegrationMethod,
};
use option_engines::models::{Contract, OptionRight};

#[test]
fn test_reduction_to_black_scholes() {
    // near-zero vol-of-vol and zero correlation freeze the variance path
    let params = HestonParams {
        v0: 0.04,
        theta: 0.04,
        kappa: 2.0,
        xi: 0.01,
        rho: 0.0,
    };

    for &k in &[90.0, 100.0, 110.0] {
        for &t in &[0.1, 0.5, 1.0] {
            let contract = Contract::new(100.0, k, 0.05, t).unwrap();
            let heston = HestonEngine::standard(contract, params).unwrap().price();
            let bs = black_scholes::price(&BsParams {
                s: 100.0,
                k,
                r: 0.05,
                t,
                sigma: 0.2,
            });
            let tol = (0.03 * bs.call).max(0.02);
            assert!(
                (heston.call - bs.call).abs() < tol,
                "k={} t={}: heston {} vs bs {}",
                k,
                t,
                heston.call,
                bs.call
            );
        }
    }
}

#[test]
fn test_atm_delta_scenario() {
    // S=K=100, r=5%, 30 days, v0=theta=0.04, kappa=2, xi=0.3, rho=-0.7
    let params = HestonParams {
        v0: 0.04,
        theta: 0.04,
        kappa: 2.0,
        xi: 0.3,
        rho: -0.7,
    };
    let contract = Contract::new(100.0, 100.0, 0.05, 30.0 / 365.0).unwrap();
    let engine = HestonEngine::standard(contract, params).unwrap();

    let delta = finite_difference_greeks(&engine, OptionRight::Call, GreeksConfig::DELTA).delta;
    println!("ATM 30d call delta = {:.4}", delta);
    assert!(
        (delta - 0.5).abs() < 0.1,
        "ATM call delta {} should be near 0.5",
        delta
    );

    for &k in &[80.0, 90.0, 95.0, 100.0, 105.0, 110.0, 120.0] {
        let c = Contract::new(100.0, k, 0.05, 30.0 / 365.0).unwrap();
        let e = HestonEngine::standard(c, params).unwrap();
        let call = finite_difference_greeks(&e, OptionRight::Call, GreeksConfig::DELTA).delta;
        let put = finite_difference_greeks(&e, OptionRight::Put, GreeksConfig::DELTA).delta;
        assert!(
            ((call - put) - 1.0).abs() < 0.01,
            "delta parity at k={}: call {} put {}",
            k,
            call,
            put
        );
    }
}

#[test]
fn test_negative_rho_skews_puts_richer() {
    // equity-style negative correlation must price OTM puts above the
    // symmetric model
    let symmetric = HestonParams {
        rho: 0.0,
        ..HestonParams::default()
    };
    let skewed = HestonParams {
        rho: -0.7,
        ..HestonParams::default()
    };
    let contract = Contract::new(100.0, 85.0, 0.03, 0.5).unwrap();
    let flat = HestonEngine::standard(contract, symmetric).unwrap().price();
    let tilted = HestonEngine::standard(contract, skewed).unwrap().price();
    println!("OTM put: flat {:.4} vs skewed {:.4}", flat.put, tilted.put);
    assert!(tilted.put > flat.put);
}

#[test]
fn test_full_greeks_set_is_finite_and_sane() {
    let contract = Contract::new(100.0, 100.0, 0.03, 0.5).unwrap();
    let engine = HestonEngine::standard(contract, HestonParams::default()).unwrap();
    let g = finite_difference_greeks(&engine, OptionRight::Call, GreeksConfig::ALL);
    println!("{:?}", g);
    assert!(g.delta > 0.0 && g.delta < 1.0);
    assert!(g.gamma > 0.0);
    assert!(g.vega > 0.0);
    assert!(g.theta < 0.0);
    assert!(g.vanna.is_finite() && g.charm.is_finite());
}

#[test]
fn test_calibration_recovers_smile_shape() {
    // quotes generated with the CF path, fitted with the approximation:
    // the calibrator must land close in price space even across paths
    let truth = HestonParams {
        v0: 0.045,
        theta: 0.055,
        kappa: 2.0,
        xi: 0.5,
        rho: -0.6,
    };
    let strikes = vec![85.0, 92.5, 100.0, 107.5, 115.0, 90.0, 100.0, 110.0];
    let expiries = vec![0.5, 0.5, 0.5, 0.5, 0.5, 1.0, 1.0, 1.0];
    let puts: Vec<f64> = strikes
        .iter()
        .zip(&expiries)
        .map(|(k, t)| {
            let c = Contract::new(100.0, *k, 0.03, *t).unwrap();
            HestonEngine::new(c, truth, HestonModel::Standard, IntegrationMethod::FixedGrid)
                .unwrap()
                .price()
                .put
        })
        .collect();

    let result = HestonCalibrator::new(100.0, 0.03)
        .unwrap()
        .calibrate(&puts, &strikes, &expiries)
        .unwrap();
    println!(
        "calibrated rmse {:.5} after {} passes ({:?})",
        result.rmse, result.passes, result.phase
    );
    assert!(result.rmse < 0.25, "rmse = {}", result.rmse);
    assert!(result.params.rho < 0.0);
    assert!(matches!(
        result.phase,
        CalibrationPhase::Converged | CalibrationPhase::Narrowing
    ));
}
