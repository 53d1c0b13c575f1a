// tests/parity_test.rs
//! Cross-engine no-arbitrage checks: put-call parity, monotonicity,
//! convexity and delta bounds.

use option_engines::greeks::{finite_difference_greeks, GreeksConfig};
use option_engines::models::bates::{BatesEngine, JumpParams};
use option_engines::models::black_scholes::{self, BsParams};
use option_engines::models::heston::{HestonEngine, HestonParams};
use option_engines::models::variance_gamma::{VarianceGammaEngine, VgParams};
use option_engines::models::{Contract, OptionPrices, OptionRight};

fn heston_params() -> HestonParams {
    HestonParams {
        v0: 0.04,
        theta: 0.05,
        kappa: 2.0,
        xi: 0.4,
        rho: -0.6,
    }
}

fn price_all_engines(contract: Contract) -> Vec<(&'static str, OptionPrices)> {
    let bs = black_scholes::price(&BsParams {
        s: contract.spot,
        k: contract.strike,
        r: contract.rate,
        t: contract.expiry,
        sigma: 0.2,
    });
    let heston = HestonEngine::standard(contract, heston_params())
        .unwrap()
        .price();
    let bates = BatesEngine::new(contract, heston_params(), JumpParams::default())
        .unwrap()
        .price()
        .unwrap();
    vec![("black-scholes", bs), ("heston", heston), ("bates", bates)]
}

#[test]
fn test_parity_holds_across_engines_and_strikes() {
    for &k in &[75.0, 90.0, 100.0, 110.0, 130.0] {
        let contract = Contract::new(100.0, k, 0.03, 0.5).unwrap();
        for (name, px) in price_all_engines(contract) {
            let gap = px.parity_gap(&contract);
            assert!(
                gap.abs() < 1e-6,
                "{} violates parity at k={}: gap {}",
                name,
                k,
                gap
            );
        }
    }
}

#[test]
fn test_prices_monotone_in_strike() {
    let strikes = [70.0, 80.0, 90.0, 100.0, 110.0, 120.0, 130.0];
    for engine_idx in 0..3 {
        let prices: Vec<OptionPrices> = strikes
            .iter()
            .map(|&k| {
                let contract = Contract::new(100.0, k, 0.03, 1.0).unwrap();
                price_all_engines(contract)[engine_idx].1
            })
            .collect();
        for pair in prices.windows(2) {
            assert!(
                pair[1].call <= pair[0].call + 1e-9,
                "call must not increase with strike: {:?}",
                prices
            );
            assert!(
                pair[1].put >= pair[0].put - 1e-9,
                "put must not decrease with strike: {:?}",
                prices
            );
        }
    }
}

#[test]
fn test_call_convex_in_strike() {
    let h = 5.0;
    for &k in &[85.0, 95.0, 100.0, 105.0, 115.0] {
        for engine_idx in 0..3 {
            let price_at = |strike: f64| {
                let contract = Contract::new(100.0, strike, 0.03, 1.0).unwrap();
                price_all_engines(contract)[engine_idx].1.call
            };
            let second = price_at(k - h) - 2.0 * price_at(k) + price_at(k + h);
            assert!(
                second >= -1e-4,
                "engine {} not convex at k={}: {}",
                engine_idx,
                k,
                second
            );
        }
    }
}

#[test]
fn test_prices_inside_no_arbitrage_corridor() {
    for &k in &[60.0, 100.0, 150.0] {
        let contract = Contract::new(100.0, k, 0.05, 2.0).unwrap();
        let lo = contract.lower_bounds();
        let hi = contract.upper_bounds();
        for (name, px) in price_all_engines(contract) {
            assert!(
                px.call >= lo.call - 1e-9 && px.call <= hi.call + 1e-9,
                "{} call {} outside [{}, {}] at k={}",
                name,
                px.call,
                lo.call,
                hi.call,
                k
            );
            assert!(
                px.put >= lo.put - 1e-9 && px.put <= hi.put + 1e-9,
                "{} put {} outside [{}, {}] at k={}",
                name,
                px.put,
                lo.put,
                hi.put,
                k
            );
        }
    }
}

#[test]
fn test_delta_bounds_heston() {
    for &k in &[80.0, 95.0, 100.0, 105.0, 125.0] {
        let contract = Contract::new(100.0, k, 0.03, 0.5).unwrap();
        let engine = HestonEngine::standard(contract, heston_params()).unwrap();
        let call = finite_difference_greeks(&engine, OptionRight::Call, GreeksConfig::DELTA).delta;
        let put = finite_difference_greeks(&engine, OptionRight::Put, GreeksConfig::DELTA).delta;
        assert!((0.0..=1.0).contains(&call), "call delta {} at k={}", call, k);
        assert!((-1.0..=0.0).contains(&put), "put delta {} at k={}", put, k);
        assert!(
            ((call - put) - 1.0).abs() < 0.01,
            "delta parity at k={}: {} vs {}",
            k,
            call,
            put
        );
    }
}

#[test]
fn test_variance_gamma_parity_gap_stays_bounded() {
    // VG keeps its asymmetric tail premium, so parity is approximate by
    // design; the gap must stay inside the premium bound.
    let contract = Contract::new(100.0, 100.0, 0.03, 1.0).unwrap();
    let engine = VarianceGammaEngine::new(
        contract,
        VgParams {
            sigma: 0.2,
            nu: 0.3,
            theta: -0.15,
        },
    )
    .unwrap();
    let px = engine.price();
    let time_value = px.put - contract.lower_bounds().put;
    assert!(px.parity_gap(&contract).abs() <= 0.25 * time_value + 1e-9);
}
