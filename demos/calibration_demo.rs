// demos/calibration_demo.rs
use option_engines::calibration::HestonCalibrator;
use option_engines::greeks::{finite_difference_greeks, GreeksConfig};
use option_engines::models::black_scholes::{self, implied_vol_fast, BsParams};
use option_engines::models::heston::{HestonEngine, HestonParams};
use option_engines::models::{Contract, OptionRight};
use option_engines::scenario;

fn main() {
    println!("Heston Calibration Example");
    println!("==========================\n");

    // Market parameters
    let spot = 100.0;
    let rate = 0.05;

    // Synthetic market data: a put smile generated from Black-Scholes with
    // strike-dependent implied vols (normally this comes from live quotes)
    let quotes: Vec<(f64, f64, f64)> = vec![
        (90.0, 0.25, 0.24),
        (95.0, 0.25, 0.22),
        (100.0, 0.25, 0.20),
        (105.0, 0.25, 0.21),
        (110.0, 0.25, 0.23),
        (95.0, 1.0, 0.22),
        (100.0, 1.0, 0.21),
        (105.0, 1.0, 0.22),
    ];
    let (mut puts, mut strikes, mut expiries) = (Vec::new(), Vec::new(), Vec::new());
    println!("Market Data:");
    for (i, &(k, t, vol)) in quotes.iter().enumerate() {
        let put = black_scholes::price(&BsParams {
            s: spot,
            k,
            r: rate,
            t,
            sigma: vol,
        })
        .put;
        println!(
            "  {}: K={}, T={}, σ_impl={:.3}, Put={:.4}",
            i + 1,
            k,
            t,
            vol,
            put
        );
        puts.push(put);
        strikes.push(k);
        expiries.push(t);
    }
    println!();

    // Calibrate
    println!("Starting Heston calibration...");
    let calibrator = HestonCalibrator::new(spot, rate).expect("valid market inputs");
    let result = calibrator
        .calibrate(&puts, &strikes, &expiries)
        .expect("calibration should converge on clean synthetic data");

    println!("Calibration complete after {} passes ({:?})", result.passes, result.phase);
    println!("RMSE: {:.6}", result.rmse);
    println!("Best parameters:");
    println!("  κ (kappa): {:.4}", result.params.kappa);
    println!("  θ (theta): {:.4}", result.params.theta);
    println!("  ξ (xi):    {:.4}", result.params.xi);
    println!("  ρ (rho):   {:.4}", result.params.rho);
    println!("  v0:        {:.4}", result.params.v0);

    // Validate: reprice the quotes and back out implied vols
    println!("\nValidation:");
    for (i, &(k, t, vol)) in quotes.iter().enumerate() {
        let contract = Contract::new(spot, k, rate, t).expect("valid contract");
        let model_put = HestonEngine::standard(contract, result.params)
            .expect("calibrated parameters are valid")
            .price()
            .put;
        let model_iv = implied_vol_fast(spot, k, rate, t, model_put, OptionRight::Put, None)
            .map(|iv| format!("{:.3}", iv))
            .unwrap_or_else(|_| "n/a".to_string());
        println!(
            "  Point {}: Market={:.4}, Model={:.4}, IV market/model = {:.3}/{}",
            i + 1,
            puts[i],
            model_put,
            vol,
            model_iv
        );
    }

    // Greeks and a P&L sweep under the calibrated dynamics
    let contract = Contract::new(spot, 100.0, rate, 0.25).expect("valid contract");
    let engine = HestonEngine::standard(contract, result.params)
        .expect("calibrated parameters are valid");
    let greeks = finite_difference_greeks(&engine, OptionRight::Call, GreeksConfig::ALL);
    println!("\nATM call Greeks under the calibrated model:");
    println!("  delta: {:+.4}", greeks.delta);
    println!("  gamma: {:+.4}", greeks.gamma);
    println!("  vega:  {:+.4} per vol point", greeks.vega);
    println!("  theta: {:+.4} per day", greeks.theta);

    let entry = engine.price().call;
    let curve = scenario::pnl_curve(&engine, OptionRight::Call, 90.0, 110.0, 5, entry, 1.0);
    println!("\nP&L sweep for one long ATM call (entry {:.4}):", entry);
    for (s, pnl) in curve {
        println!("  spot {:>6.1}: {:+.4}", s, pnl);
    }
}
