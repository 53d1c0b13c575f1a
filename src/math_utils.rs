// src/math_utils.rs
//! Shared numerical utilities: normal distribution and day-count conversions.

use statrs::function::erf;
use std::f64::consts::{PI, SQRT_2};

/// Cumulative standard normal distribution, Abramowitz-Stegun polynomial
/// approximation (formula 26.2.17, ~1e-7 absolute error).
///
/// Inputs beyond ±6 are clamped to exactly 0/1 so extreme d1/d2 values cannot
/// overflow downstream pricing formulas.
pub fn norm_cdf(z: f64) -> f64 {
    if z > 6.0 {
        return 1.0;
    }
    if z < -6.0 {
        return 0.0;
    }

    const B1: f64 = 0.319381530;
    const B2: f64 = -0.356563782;
    const B3: f64 = 1.781477937;
    const B4: f64 = -1.821255978;
    const B5: f64 = 1.330274429;
    const P: f64 = 0.2316419;
    const C2: f64 = 0.3989423;

    let a = z.abs();
    let t = 1.0 / (1.0 + a * P);
    let b = C2 * (-0.5 * z * z).exp();
    let mut n = ((((B5 * t + B4) * t + B3) * t + B2) * t + B1) * t;
    n = 1.0 - b * n;
    if z < 0.0 {
        1.0 - n
    } else {
        n
    }
}

/// Reference normal CDF via the error function. Used as the test oracle for
/// [`norm_cdf`] and wherever full double precision is wanted.
pub fn norm_cdf_erf(x: f64) -> f64 {
    0.5 * (1.0 + erf::erf(x / SQRT_2))
}

/// Standard normal probability density function
pub fn norm_pdf(x: f64) -> f64 {
    (1.0 / (2.0 * PI).sqrt()) * (-0.5 * x * x).exp()
}

/// Calendar days per year used everywhere a "days left" value is converted
/// to a year fraction.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Trading days per year for the working-day expiry variant.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Year fraction from calendar days left (ACT/365).
pub fn years_from_days(days: f64) -> f64 {
    days / DAYS_PER_YEAR
}

/// Year fraction from calendar days left on a trading-day clock: calendar
/// days are scaled to weekdays (5/7) over a 252-day year.
pub fn years_from_trading_days(days: f64) -> f64 {
    (days * 5.0 / 7.0) / TRADING_DAYS_PER_YEAR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm_cdf_matches_erf_reference() {
        // Abramowitz-Stegun must track the erf reference to ~1e-6 inside ±6
        let mut z = -5.9;
        while z < 6.0 {
            let approx = norm_cdf(z);
            let reference = norm_cdf_erf(z);
            assert!(
                (approx - reference).abs() < 1e-6,
                "norm_cdf({}) = {}, reference = {}",
                z,
                approx,
                reference
            );
            z += 0.1;
        }
    }

    #[test]
    fn test_norm_cdf_clamps_tails() {
        assert_eq!(norm_cdf(6.5), 1.0);
        assert_eq!(norm_cdf(-6.5), 0.0);
        assert_eq!(norm_cdf(100.0), 1.0);
        assert_eq!(norm_cdf(f64::INFINITY), 1.0);
    }

    #[test]
    fn test_norm_cdf_known_values() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((norm_cdf(1.0) - 0.8413447461).abs() < 1e-6);
        assert!((norm_cdf(-1.0) - 0.1586552539).abs() < 1e-6);
        assert!((norm_cdf(1.96) - 0.9750021049).abs() < 1e-6);
    }

    #[test]
    fn test_norm_pdf_symmetric() {
        assert!((norm_pdf(0.0) - 0.3989422804).abs() < 1e-9);
        assert!((norm_pdf(1.3) - norm_pdf(-1.3)).abs() < 1e-15);
    }

    #[test]
    fn test_day_count_conversions() {
        assert!((years_from_days(365.0) - 1.0).abs() < 1e-12);
        assert!((years_from_days(7.3) - 0.02).abs() < 1e-12);
        // 7 calendar days ≈ 5 weekdays out of 252
        assert!((years_from_trading_days(7.0) - 5.0 / 252.0).abs() < 1e-12);
    }
}
