// src/models/black_scholes.rs
//! Closed-form lognormal (Black-Scholes) pricing, Greeks and implied
//! volatility solvers.
//!
//! # Mathematical Foundation
//!
//! Under the Black-Scholes model the underlying follows:
//! ```text
//! dS_t = r S_t dt + σ S_t dW_t
//! ```
//!
//! European prices have the closed form:
//! ```text
//! C = S·Φ(d₁) - K·e^(-rT)·Φ(d₂)
//! P = K·e^(-rT)·Φ(-d₂) - S·Φ(-d₁)
//! d₁ = [ln(S/K) + (r + σ²/2)T] / (σ√T),  d₂ = d₁ - σ√T
//! ```
//!
//! Three implied-volatility solvers are provided: a robust bracketing
//! bisection, an analytic-vega Newton-Raphson, and a fast hybrid that feeds
//! a moneyness-aware initial guess into the Newton refiner.

use crate::error::{validation::*, EngineError, EngineResult};
use crate::greeks::Greeks;
use crate::math_utils::{
    norm_cdf, norm_pdf, years_from_days, years_from_trading_days, DAYS_PER_YEAR,
};
use crate::models::{OptionPrices, OptionRight};
use std::f64::consts::PI;

/// Immutable Black-Scholes parameter set. Greeks bumps construct modified
/// copies instead of mutating shared engine state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BsParams {
    pub s: f64,
    pub k: f64,
    pub r: f64,
    pub t: f64,
    pub sigma: f64,
}

impl BsParams {
    pub fn validate(&self) -> EngineResult<()> {
        validate_positive("s", self.s)?;
        validate_positive("k", self.k)?;
        validate_finite("r", self.r)?;
        validate_non_negative("t", self.t)?;
        validate_non_negative("sigma", self.sigma)?;
        Ok(())
    }
}

/// Expiry pair derived from a "days left" convenience value: the calendar
/// ACT/365 fraction and the working-day (252) variant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Expiry {
    pub calendar: f64,
    pub trading: f64,
}

impl Expiry {
    pub fn from_days_left(days: f64) -> Self {
        Expiry {
            calendar: years_from_days(days.max(0.0)),
            trading: years_from_trading_days(days.max(0.0)),
        }
    }
}

fn d1_d2(p: &BsParams) -> (f64, f64) {
    let sig_sqrt_t = p.sigma * p.t.sqrt();
    let d1 = ((p.s / p.k).ln() + (p.r + 0.5 * p.sigma * p.sigma) * p.t) / sig_sqrt_t;
    (d1, d1 - sig_sqrt_t)
}

/// European call and put prices.
///
/// Degenerate inputs are handled in-engine: at `t <= 0` the pair equals
/// intrinsic exactly, and at `sigma ≈ 0` it collapses to the discounted
/// forward intrinsic.
pub fn price(p: &BsParams) -> OptionPrices {
    if p.t <= 0.0 {
        return OptionPrices {
            call: (p.s - p.k).max(0.0),
            put: (p.k - p.s).max(0.0),
        };
    }
    let df = (-p.r * p.t).exp();
    if p.sigma <= 1e-12 {
        return OptionPrices {
            call: (p.s - p.k * df).max(0.0),
            put: (p.k * df - p.s).max(0.0),
        };
    }
    let (d1, d2) = d1_d2(p);
    OptionPrices {
        call: p.s * norm_cdf(d1) - p.k * df * norm_cdf(d2),
        put: p.k * df * norm_cdf(-d2) - p.s * norm_cdf(-d1),
    }
}

/// Analytic (call, put) delta pair: Φ(d₁) and Φ(d₁) - 1.
pub fn analytic_delta(p: &BsParams) -> (f64, f64) {
    if p.t <= 0.0 || p.sigma <= 1e-12 {
        let call = if p.s > p.k {
            1.0
        } else if p.s < p.k {
            0.0
        } else {
            0.5
        };
        return (call, call - 1.0);
    }
    let (d1, _) = d1_d2(p);
    let call = norm_cdf(d1);
    (call, call - 1.0)
}

/// Raw vega S·φ(d₁)·√T, per 1.0 of volatility (unscaled).
pub fn raw_vega(p: &BsParams) -> f64 {
    if p.t <= 0.0 || p.sigma <= 1e-12 {
        return 0.0;
    }
    let (d1, _) = d1_d2(p);
    p.s * norm_pdf(d1) * p.t.sqrt()
}

/// Complete Greeks set for one leg.
///
/// Delta is a ±1-unit spot bump rather than Φ(d₁), so it matches the delta a
/// hedger realises when the underlying moves a whole point. Gamma, vega,
/// theta, vanna and charm are analytic; vega and vanna are scaled per 1.00
/// volatility point, theta and charm per calendar day.
///
/// When `spot_vol_slope` (∂σ/∂S) is non-zero the delta is the Hull-White
/// minimum-variance delta `Δ + vega·∂σ/∂S`; a zero slope leaves the standard
/// bumped delta.
pub fn greeks(p: &BsParams, right: OptionRight, spot_vol_slope: f64) -> Greeks {
    if p.t <= 0.0 || p.sigma <= 1e-12 {
        let (dc, dp) = analytic_delta(p);
        return Greeks {
            delta: match right {
                OptionRight::Call => dc,
                OptionRight::Put => dp,
            },
            ..Default::default()
        };
    }

    let (d1, d2) = d1_d2(p);
    let sqrt_t = p.t.sqrt();
    let df = (-p.r * p.t).exp();

    // Delta by ±1-unit spot bump (clamped so the down bump keeps spot > 0)
    let ds = 1.0_f64.min(0.5 * p.s);
    let up = price(&BsParams {
        s: p.s + ds,
        ..*p
    });
    let dn = price(&BsParams {
        s: p.s - ds,
        ..*p
    });
    let mut delta = (up.pick(right) - dn.pick(right)) / (2.0 * ds);
    if spot_vol_slope != 0.0 {
        delta += raw_vega(p) * spot_vol_slope;
    }

    let gamma = norm_pdf(d1) / (p.s * p.sigma * sqrt_t);
    let vega = raw_vega(p) / 100.0;

    let theta_year = match right {
        OptionRight::Call => {
            (-p.s * norm_pdf(d1) * p.sigma) / (2.0 * sqrt_t) - p.r * p.k * df * norm_cdf(d2)
        }
        OptionRight::Put => {
            (-p.s * norm_pdf(d1) * p.sigma) / (2.0 * sqrt_t) + p.r * p.k * df * norm_cdf(-d2)
        }
    };
    let theta = theta_year / DAYS_PER_YEAR;

    // ∂Δ/∂σ, same for call and put, per vol point
    let vanna = -norm_pdf(d1) * d2 / p.sigma / 100.0;

    // ∂Δ/∂t, same for call and put, per calendar day
    let charm_year =
        -norm_pdf(d1) * (2.0 * p.r * p.t - d2 * p.sigma * sqrt_t) / (2.0 * p.t * p.sigma * sqrt_t);
    let charm = charm_year / DAYS_PER_YEAR;

    Greeks {
        delta,
        gamma,
        vega,
        theta,
        vanna,
        charm,
    }
}

/// Default price accuracy for the implied-volatility solvers.
pub const DEFAULT_IV_ACCURACY: f64 = 0.005;
const IV_MAX_ITERATIONS: usize = 100;
const BRACKET_CEILING: f64 = 1e10;
const VEGA_UNDERFLOW: f64 = 1e-10;

fn leg_price(p: &BsParams, right: OptionRight) -> f64 {
    price(p).pick(right)
}

fn validate_iv_inputs(s: f64, k: f64, t: f64, target: f64) -> EngineResult<()> {
    validate_positive("s", s)?;
    validate_positive("k", k)?;
    validate_positive("t", t)?;
    validate_non_negative("target price", target)?;
    Ok(())
}

/// Bisection implied volatility.
///
/// Doubles an upper volatility bracket until the model price exceeds the
/// target, then bisects until the price error drops below `accuracy`
/// (default 0.005) or 100 iterations elapse.
///
/// # Errors
/// [`EngineError::BracketExhausted`] when the bracket search blows past 1e10
/// — the target price is economically inconsistent with the model.
pub fn implied_vol_bisection(
    s: f64,
    k: f64,
    r: f64,
    t: f64,
    target: f64,
    right: OptionRight,
    accuracy: Option<f64>,
) -> EngineResult<f64> {
    validate_iv_inputs(s, k, t, target)?;
    let acc = accuracy.unwrap_or(DEFAULT_IV_ACCURACY);

    let price_at = |sigma: f64| leg_price(&BsParams { s, k, r, t, sigma }, right);

    let mut hi = 0.5;
    while price_at(hi) < target {
        hi *= 2.0;
        if hi > BRACKET_CEILING {
            return Err(EngineError::BracketExhausted {
                target_price: target,
                bound: hi,
            });
        }
    }

    let mut lo = 0.0;
    let mut sigma = 0.5 * hi;
    for _ in 0..IV_MAX_ITERATIONS {
        sigma = 0.5 * (lo + hi);
        let diff = price_at(sigma) - target;
        if diff.abs() < acc {
            return Ok(sigma);
        }
        if diff > 0.0 {
            hi = sigma;
        } else {
            lo = sigma;
        }
    }
    Ok(sigma)
}

/// Brenner-Subrahmanyam at-the-money seed: σ ≈ √(2π/T) · price / S.
fn brenner_subrahmanyam_guess(s: f64, t: f64, target: f64) -> f64 {
    ((2.0 * PI) / t).sqrt() * target / s
}

/// Newton-Raphson implied volatility with the analytic vega update.
///
/// Starts from `initial` when supplied, otherwise from the
/// Brenner-Subrahmanyam seed. When vega underflows (< 1e-10) the current
/// estimate is returned as-is rather than diverging.
pub fn implied_vol_newton(
    s: f64,
    k: f64,
    r: f64,
    t: f64,
    target: f64,
    right: OptionRight,
    initial: Option<f64>,
    accuracy: Option<f64>,
) -> EngineResult<f64> {
    validate_iv_inputs(s, k, t, target)?;
    let acc = accuracy.unwrap_or(DEFAULT_IV_ACCURACY);

    let mut sigma = initial
        .unwrap_or_else(|| brenner_subrahmanyam_guess(s, t, target))
        .clamp(1e-4, 5.0);

    for _ in 0..IV_MAX_ITERATIONS {
        let p = BsParams { s, k, r, t, sigma };
        let diff = leg_price(&p, right) - target;
        if diff.abs() < acc {
            return Ok(sigma);
        }
        let vega = raw_vega(&p);
        if vega < VEGA_UNDERFLOW {
            return Ok(sigma);
        }
        sigma = (sigma - diff / vega).clamp(1e-6, 1e3);
    }
    Ok(sigma)
}

/// Corrado-Miller closed-form volatility estimate from a call price.
/// `x` is the discounted strike. Returns `None` when the inner square root
/// goes negative (deep ITM/OTM where the expansion breaks down).
fn corrado_miller_guess(s: f64, x: f64, call: f64, t: f64) -> Option<f64> {
    let half_gap = 0.5 * (s - x);
    let centered = call - half_gap;
    let inner = centered * centered - (s - x) * (s - x) / PI;
    if inner < 0.0 {
        return None;
    }
    let sigma_sqrt_t = (2.0 * PI).sqrt() / (s + x) * (centered + inner.sqrt());
    let sigma = sigma_sqrt_t / t.sqrt();
    (sigma.is_finite() && sigma > 0.0).then_some(sigma)
}

/// Fast hybrid implied volatility: moneyness-aware initial guess feeding the
/// Newton refiner.
///
/// At the money the guess is the time-value/spot scaling; away from the
/// money puts are converted to synthetic calls via put-call parity before
/// the Corrado-Miller correction is applied.
pub fn implied_vol_fast(
    s: f64,
    k: f64,
    r: f64,
    t: f64,
    target: f64,
    right: OptionRight,
    accuracy: Option<f64>,
) -> EngineResult<f64> {
    validate_iv_inputs(s, k, t, target)?;

    let df_strike = k * (-r * t).exp();
    // Synthetic call value for the guess; parity keeps the IV identical.
    let call_target = match right {
        OptionRight::Call => target,
        OptionRight::Put => (target + s - df_strike).max(0.0),
    };

    let log_moneyness = (s / k).ln();
    let guess = if log_moneyness.abs() < 0.01 {
        let time_value = (call_target - (s - df_strike).max(0.0)).max(1e-10);
        ((2.0 * PI) / t).sqrt() * time_value / s
    } else {
        corrado_miller_guess(s, df_strike, call_target, t)
            .unwrap_or_else(|| brenner_subrahmanyam_guess(s, t, call_target.max(1e-10)))
    };

    implied_vol_newton(s, k, r, t, target, right, Some(guess.clamp(1e-4, 5.0)), accuracy)
}
