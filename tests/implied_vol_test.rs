// tests/implied_vol_test.rs
use option_engines::models::black_scholes::{
    self, implied_vol_bisection, implied_vol_fast, implied_vol_newton, BsParams, Expiry,
    DEFAULT_IV_ACCURACY,
};
use option_engines::models::OptionRight;
use option_engines::EngineError;

#[test]
fn test_all_solvers_round_trip_across_the_smile() {
    let s = 100.0;
    let r = 0.04;
    let t = 0.75;

    for &k in &[70.0, 85.0, 95.0, 100.0, 105.0, 115.0, 140.0] {
        for &sigma in &[0.1, 0.2, 0.45] {
            let target = black_scholes::price(&BsParams { s, k, r, t, sigma }).call;
            if target < 1e-4 {
                continue; // below solver resolution, nothing to recover
            }

            let bisect =
                implied_vol_bisection(s, k, r, t, target, OptionRight::Call, None).unwrap();
            let newton =
                implied_vol_newton(s, k, r, t, target, OptionRight::Call, None, None).unwrap();
            let fast = implied_vol_fast(s, k, r, t, target, OptionRight::Call, None).unwrap();

            for (name, iv) in [("bisection", bisect), ("newton", newton), ("fast", fast)] {
                let reprice = black_scholes::price(&BsParams {
                    s,
                    k,
                    r,
                    t,
                    sigma: iv,
                })
                .call;
                assert!(
                    (reprice - target).abs() < DEFAULT_IV_ACCURACY,
                    "{} solver at k={} sigma={}: reprice {} vs target {}",
                    name,
                    k,
                    sigma,
                    reprice,
                    target
                );
            }
        }
    }
}

#[test]
fn test_put_round_trip() {
    let s = 100.0;
    let k = 92.0;
    let r = 0.02;
    let t = 0.4;
    let target = black_scholes::price(&BsParams {
        s,
        k,
        r,
        t,
        sigma: 0.3,
    })
    .put;

    let iv = implied_vol_fast(s, k, r, t, target, OptionRight::Put, None).unwrap();
    let reprice = black_scholes::price(&BsParams {
        s,
        k,
        r,
        t,
        sigma: iv,
    })
    .put;
    assert!((reprice - target).abs() < DEFAULT_IV_ACCURACY);
}

#[test]
fn test_reference_quote_short_dated_index_call() {
    // Observed index-option quote: spot 5401.25, strike 5470, 7.3 calendar
    // days left, rate -4.5%, call trading at 54.0.
    let s = 5401.25;
    let k = 5470.0;
    let r = -0.045;
    let t = Expiry::from_days_left(7.3).calendar;
    let price = 54.0;

    for solver in ["bisection", "newton", "fast"] {
        let iv = match solver {
            "bisection" => {
                implied_vol_bisection(s, k, r, t, price, OptionRight::Call, Some(1e-4)).unwrap()
            }
            "newton" => {
                implied_vol_newton(s, k, r, t, price, OptionRight::Call, None, Some(1e-4)).unwrap()
            }
            _ => implied_vol_fast(s, k, r, t, price, OptionRight::Call, Some(1e-4)).unwrap(),
        };
        println!("{} IV = {:.5}", solver, iv);
        assert!(
            (iv - 0.279).abs() < 0.005,
            "{} solver IV {} should be near 0.279",
            solver,
            iv
        );

        let reprice = black_scholes::price(&BsParams {
            s,
            k,
            r,
            t,
            sigma: iv,
        })
        .call;
        assert!(
            (reprice - price).abs() < 0.005,
            "{} reprice {} vs quote {}",
            solver,
            reprice,
            price
        );
    }
}

#[test]
fn test_impossible_prices_are_rejected() {
    // call above spot has no volatility
    assert!(matches!(
        implied_vol_bisection(100.0, 100.0, 0.05, 1.0, 120.0, OptionRight::Call, None),
        Err(EngineError::BracketExhausted { .. })
    ));

    // invalid market inputs fail validation before any iteration
    assert!(implied_vol_newton(-1.0, 100.0, 0.05, 1.0, 5.0, OptionRight::Call, None, None).is_err());
    assert!(implied_vol_fast(100.0, 100.0, 0.05, 0.0, 5.0, OptionRight::Call, None).is_err());
}

#[test]
fn test_solvers_agree_with_each_other() {
    let s = 250.0;
    let k = 240.0;
    let r = 0.01;
    let t = 0.25;
    let target = black_scholes::price(&BsParams {
        s,
        k,
        r,
        t,
        sigma: 0.35,
    })
    .call;

    let acc = Some(1e-5);
    let bisect = implied_vol_bisection(s, k, r, t, target, OptionRight::Call, acc).unwrap();
    let newton = implied_vol_newton(s, k, r, t, target, OptionRight::Call, None, acc).unwrap();
    let fast = implied_vol_fast(s, k, r, t, target, OptionRight::Call, acc).unwrap();
    println!("bisect {:.6} newton {:.6} fast {:.6}", bisect, newton, fast);
    assert!((bisect - newton).abs() < 1e-3);
    assert!((newton - fast).abs() < 1e-3);
}
