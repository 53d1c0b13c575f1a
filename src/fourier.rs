// src/fourier.rs
//! Characteristic-function pricing shared by the Heston and Bates engines.
//!
//! # Mathematical Foundation
//!
//! Both engines price through the two exercise probabilities of the
//! Heston-style semi-analytic formula:
//! ```text
//! C = S·P₁ - K·e^(-rT)·P₂
//! Pⱼ = 1/2 + (1/π) ∫₀^∞ Re[ e^(-iu·lnK) fⱼ(u) / (iu) ] du
//! ```
//!
//! Only one characteristic function φ of ln S_T is needed: the risk-neutral
//! probability uses `f₂(u) = φ(u)` and the share-measure probability uses
//! `f₁(u) = φ(u - i) / φ(-i)`. Since any risk-neutral φ satisfies
//! `φ(-i) = S·e^(rT)` exactly, this construction keeps put-call parity exact
//! by definition, for any model whose characteristic function is supplied.
//!
//! The Heston characteristic function uses the Gatheral log formulation with
//! the `Re(d) >= 0` branch convention, which is continuous in u and avoids
//! the branch-cut discontinuities of the original Heston rotation.

use crate::error::{EngineError, EngineResult};
use crate::models::heston::HestonParams;
use crate::models::{Contract, OptionPrices};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Lower integration cutoff: the integrand has a removable singularity at
/// u = 0, so the grid starts just above it.
const U_FLOOR: f64 = 1e-6;

/// Trapezoid grid for the probability integrals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntegrationGrid {
    pub upper: f64,
    pub points: usize,
}

impl IntegrationGrid {
    /// Fixed grid: upper bound 100, 1000 points. Adequate for vanilla-range
    /// maturities and moderate vol-of-vol.
    pub fn fixed() -> Self {
        IntegrationGrid {
            upper: 100.0,
            points: 1000,
        }
    }

    /// Grid scaled to the decay rate of the integrand: short expiries,
    /// large vol-of-vol and jump intensity all slow the decay, so the upper
    /// bound stretches with ξ and λ and with 1/√T, and the point count
    /// keeps the step near 0.1.
    pub fn adaptive(expiry: f64, xi: f64, jump_intensity: f64) -> Self {
        let t = expiry.clamp(1e-4, 1.0);
        let upper =
            (100.0 * (1.0 + xi) * (1.0 + jump_intensity) / t.sqrt()).clamp(100.0, 3000.0);
        let points = ((upper / 0.1) as usize).clamp(1000, 16_000);
        IntegrationGrid { upper, points }
    }
}

/// Heston characteristic function of ln S_T in the Gatheral log formulation.
///
/// `d` is flipped onto the `Re(d) >= 0` branch so the complex logarithm never
/// crosses a cut as u sweeps the integration grid.
pub fn heston_cf(u: Complex64, params: &HestonParams, contract: &Contract) -> Complex64 {
    let i = Complex64::new(0.0, 1.0);
    let one = Complex64::new(1.0, 0.0);
    let t = contract.expiry;

    let xi2 = params.xi * params.xi;
    let iu = i * u;
    let beta = Complex64::new(params.kappa, 0.0) - params.rho * params.xi * iu;

    let mut d = (beta * beta + xi2 * (u * u + iu)).sqrt();
    if d.re < 0.0 {
        d = -d;
    }

    let g = (beta - d) / (beta + d);
    let exp_neg_dt = (-d * t).exp();
    let log_term = ((one - g * exp_neg_dt) / (one - g)).ln();

    let a = params.kappa * params.theta / xi2;
    let c = iu * (contract.spot.ln() + contract.rate * t) + a * ((beta - d) * t - 2.0 * log_term);
    let v_coeff = ((beta - d) / xi2) * ((one - exp_neg_dt) / (one - g * exp_neg_dt));

    (c + v_coeff * params.v0).exp()
}

/// Lognormal-jump multiplier for a Bates characteristic function:
/// `exp(λt(e^{iuμ_J - u²σ_J²/2} - 1) - iu·λ·m·t)` with the martingale
/// compensator `m = e^{μ_J + σ_J²/2} - 1`. The product `heston_cf · jump_cf`
/// still satisfies φ(-i) = S·e^(rT) exactly.
pub fn jump_cf(u: Complex64, lambda: f64, mu_j: f64, sigma_j: f64, t: f64) -> Complex64 {
    let i = Complex64::new(0.0, 1.0);
    let iu = i * u;
    let compensator = (mu_j + 0.5 * sigma_j * sigma_j).exp() - 1.0;
    let jump_term = (iu * mu_j - 0.5 * u * u * sigma_j * sigma_j).exp() - 1.0;
    (lambda * t * jump_term - iu * (lambda * compensator * t)).exp()
}

/// Exercise probabilities (P₁, P₂) by trapezoid integration of the supplied
/// characteristic function of ln S_T.
///
/// # Errors
/// [`EngineError::NumericalInstability`] when the integrals fail to produce
/// finite probabilities (CF overflow or a degenerate φ(-i)).
pub fn exercise_probabilities<F>(
    cf: F,
    strike: f64,
    grid: IntegrationGrid,
) -> EngineResult<(f64, f64)>
where
    F: Fn(Complex64) -> Complex64,
{
    let i = Complex64::new(0.0, 1.0);
    let ln_k = strike.ln();

    // φ(-i) = S·e^{rT} for any risk-neutral CF; a non-finite or vanishing
    // value means the CF itself has blown up.
    let phi_minus_i = cf(-i);
    if !phi_minus_i.re.is_finite() || phi_minus_i.norm() < 1e-300 {
        return Err(EngineError::NumericalInstability {
            method: "fourier".to_string(),
            reason: "characteristic function degenerate at u = -i".to_string(),
        });
    }

    let integrand = |u: f64| -> (f64, f64) {
        let uc = Complex64::new(u, 0.0);
        let twist = (-i * uc * ln_k).exp() / (i * uc);
        let f2 = cf(uc);
        let f1 = cf(uc - i) / phi_minus_i;
        ((twist * f1).re, (twist * f2).re)
    };

    let n = grid.points.max(2);
    let du = (grid.upper - U_FLOOR) / (n - 1) as f64;
    let mut sum1 = 0.0;
    let mut sum2 = 0.0;
    for j in 0..n {
        let u = U_FLOOR + j as f64 * du;
        let (g1, g2) = integrand(u);
        let w = if j == 0 || j == n - 1 { 0.5 } else { 1.0 };
        sum1 += w * g1;
        sum2 += w * g2;
    }

    let p1 = 0.5 + sum1 * du / PI;
    let p2 = 0.5 + sum2 * du / PI;
    if !p1.is_finite() || !p2.is_finite() {
        return Err(EngineError::NumericalInstability {
            method: "fourier".to_string(),
            reason: "probability integral is non-finite".to_string(),
        });
    }

    Ok((p1.clamp(0.0, 1.0), p2.clamp(0.0, 1.0)))
}

/// European call/put pair from a characteristic function of ln S_T. The put
/// comes from parity, so the pair satisfies it exactly.
///
/// The raw integration output is returned as-is: a leg outside the
/// no-arbitrage corridor is how a truncated or unstable integral announces
/// itself, and callers screen for that (see
/// [`OptionPrices::is_plausible`]) rather than clamping it away.
pub fn price_european<F>(
    cf: F,
    contract: &Contract,
    grid: IntegrationGrid,
) -> EngineResult<OptionPrices>
where
    F: Fn(Complex64) -> Complex64,
{
    let (p1, p2) = exercise_probabilities(cf, contract.strike, grid)?;
    let df_strike = contract.strike * contract.discount();
    let call = contract.spot * p1 - df_strike * p2;
    let put = call - contract.spot + df_strike;
    Ok(OptionPrices { call, put })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::black_scholes::{self, BsParams};

    fn contract() -> Contract {
        Contract {
            spot: 100.0,
            strike: 100.0,
            rate: 0.03,
            expiry: 1.0,
        }
    }

    #[test]
    fn test_heston_cf_martingale_at_minus_i() {
        let c = contract();
        let params = HestonParams {
            v0: 0.04,
            theta: 0.04,
            kappa: 2.0,
            xi: 0.5,
            rho: -0.7,
        };
        let phi = heston_cf(Complex64::new(0.0, -1.0), &params, &c);
        let forward = c.spot * (c.rate * c.expiry).exp();
        assert!(
            (phi.re - forward).abs() < 1e-8 && phi.im.abs() < 1e-8,
            "phi(-i) = {}, forward = {}",
            phi,
            forward
        );
    }

    #[test]
    fn test_jump_cf_martingale_at_minus_i() {
        let phi = jump_cf(Complex64::new(0.0, -1.0), 0.5, -0.1, 0.2, 1.0);
        assert!((phi.re - 1.0).abs() < 1e-12 && phi.im.abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_heston_reduces_to_black_scholes() {
        // xi -> 0 with v0 = theta freezes the variance at sigma^2
        let c = contract();
        let sigma = 0.2;
        let params = HestonParams {
            v0: sigma * sigma,
            theta: sigma * sigma,
            kappa: 2.0,
            xi: 1e-4,
            rho: 0.0,
        };
        let px = price_european(
            |u| heston_cf(u, &params, &c),
            &c,
            IntegrationGrid::fixed(),
        )
        .unwrap();
        let bs = black_scholes::price(&BsParams {
            s: c.spot,
            k: c.strike,
            r: c.rate,
            t: c.expiry,
            sigma,
        });
        println!("fourier call {} vs bs {}", px.call, bs.call);
        assert!((px.call - bs.call).abs() < 1e-2);
        assert!((px.put - bs.put).abs() < 1e-2);
    }

    #[test]
    fn test_probabilities_in_unit_interval_across_strikes() {
        let params = HestonParams {
            v0: 0.09,
            theta: 0.06,
            kappa: 1.5,
            xi: 0.8,
            rho: -0.6,
        };
        for k in [50.0, 80.0, 100.0, 130.0, 200.0] {
            let c = Contract {
                strike: k,
                ..contract()
            };
            let (p1, p2) = exercise_probabilities(
                |u| heston_cf(u, &params, &c),
                c.strike,
                IntegrationGrid::adaptive(c.expiry, params.xi, 0.0),
            )
            .unwrap();
            assert!((0.0..=1.0).contains(&p1), "p1 = {} at k = {}", p1, k);
            assert!((0.0..=1.0).contains(&p2), "p2 = {} at k = {}", p2, k);
            // deeper OTM calls must be less likely to exercise
            assert!(p1 >= p2 - 1e-9, "share-measure prob below risk-neutral");
        }
    }

    #[test]
    fn test_adaptive_grid_stretches_for_short_expiry() {
        let long = IntegrationGrid::adaptive(1.0, 0.5, 0.0);
        let short = IntegrationGrid::adaptive(0.02, 0.5, 0.0);
        assert!(short.upper > long.upper);
        assert!(short.points >= long.points);
    }
}
