// src/models/variance_gamma.rs
//! Variance Gamma pricing and return-series fitting.
//!
//! # Mathematical Framework
//!
//! The Variance Gamma process subordinates Brownian motion with drift to a
//! gamma clock:
//! ```text
//! X_t = θ G_t + σ W_{G_t},   G_t ~ Gamma(t/ν, ν)
//! ```
//! - σ: diffusion volatility of the subordinated Brownian motion
//! - ν: variance rate of the gamma time change (tail weight)
//! - θ: drift of the subordinated motion (sign controls skew direction)
//!
//! Risk-neutral pricing requires the martingale correction
//! `ω = ln(1 - θν - σ²ν/2) / ν` so that `E[S_T] = S·e^(rT)`.
//!
//! # Pricing
//!
//! The engine prices through a moment-matched effective volatility with an
//! asymmetric tail premium added to the leg on the heavy side (put for
//! θ < 0, call for θ > 0). The pair is deliberately NOT parity-repaired:
//! the asymmetry is the point of the model and the premium is bounded so
//! the parity gap stays small.
//!
//! # Fitting
//!
//! [`VarianceGammaFitter`] estimates (σ, ν, θ) from a log-return series:
//! method-of-moments initialization followed by a grid refinement of an
//! Edgeworth-corrected pseudo-likelihood. When the data are too thin or the
//! objective degenerates the fitter falls back to conservative defaults and
//! says so in the result.

use crate::error::{validation::*, EngineError, EngineResult};
use crate::math_utils::norm_pdf;
use crate::models::black_scholes::{self, BsParams};
use crate::models::{Contract, OptionPrices};
use std::path::Path;

/// Minimum observations before the fitter will attempt estimation.
pub const MIN_OBSERVATIONS: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VgParams {
    pub sigma: f64,
    pub nu: f64,
    pub theta: f64,
}

impl Default for VgParams {
    fn default() -> Self {
        VgParams {
            sigma: 0.2,
            nu: 0.2,
            theta: -0.1,
        }
    }
}

impl VgParams {
    pub fn validate(&self) -> EngineResult<()> {
        validate_positive("sigma", self.sigma)?;
        validate_positive("nu", self.nu)?;
        validate_finite("theta", self.theta)?;
        // the martingale correction must exist
        if 1.0 - self.theta * self.nu - 0.5 * self.sigma * self.sigma * self.nu <= 0.0 {
            return Err(EngineError::InvalidParameters {
                parameter: "theta".to_string(),
                value: self.theta,
                constraint: "1 - θν - σ²ν/2 must be positive for a risk-neutral measure"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// Martingale correction ω = ln(1 - θν - σ²ν/2) / ν.
    pub fn martingale_correction(&self) -> f64 {
        (1.0 - self.theta * self.nu - 0.5 * self.sigma * self.sigma * self.nu).ln() / self.nu
    }

    /// Moment-matched effective variance per year: the process variance
    /// σ² + θ²ν plus a gamma-clock uncertainty term and a small premium for
    /// the jump-like tail mass.
    pub fn effective_variance(&self) -> f64 {
        let base = self.sigma * self.sigma + self.theta * self.theta * self.nu;
        let clock_uncertainty = 0.25 * self.sigma * self.sigma * self.nu * self.nu;
        let tail_premium = 0.5 * self.theta.abs() * self.nu * self.sigma;
        (base + clock_uncertainty + tail_premium).max(1e-6)
    }
}

pub struct VarianceGammaEngine {
    pub contract: Contract,
    pub params: VgParams,
}

impl VarianceGammaEngine {
    pub fn new(contract: Contract, params: VgParams) -> EngineResult<Self> {
        contract.validate()?;
        params.validate()?;
        Ok(VarianceGammaEngine { contract, params })
    }

    /// Call/put pair at the moment-matched effective volatility plus an
    /// asymmetric tail premium on the heavy-tail leg.
    pub fn price(&self) -> OptionPrices {
        let c = &self.contract;
        if c.expiry <= 0.0 {
            return c.intrinsic();
        }

        let sigma_eff = self.params.effective_variance().sqrt();
        let mut pair = black_scholes::price(&BsParams {
            s: c.spot,
            k: c.strike,
            r: c.rate,
            t: c.expiry,
            sigma: sigma_eff,
        });

        let premium = self.tail_premium(&pair, sigma_eff);
        if self.params.theta < 0.0 {
            pair.put += premium;
        } else if self.params.theta > 0.0 {
            pair.call += premium;
        }
        pair.clamp_to_bounds(c)
    }

    /// Premium for the heavy tail the symmetric lognormal misses, bounded
    /// at a quarter of the option's time value.
    fn tail_premium(&self, pair: &OptionPrices, sigma_eff: f64) -> f64 {
        let c = &self.contract;
        let sqrt_t = c.expiry.sqrt();
        let d1 = ((c.spot / c.strike).ln()
            + (c.rate + 0.5 * sigma_eff * sigma_eff) * c.expiry)
            / (sigma_eff * sqrt_t);
        let raw = c.spot
            * self.params.theta.abs()
            * self.params.nu
            * sqrt_t
            * norm_pdf(d1)
            * 0.5;

        let time_value = if self.params.theta < 0.0 {
            (pair.put - c.lower_bounds().put).max(0.0)
        } else {
            (pair.call - c.lower_bounds().call).max(0.0)
        };
        raw.min(0.25 * time_value)
    }
}

/// Fit result: estimated parameters, mean log-density of the data under
/// them, and whether the fitter gave up and returned defaults.
#[derive(Clone, Copy, Debug)]
pub struct VgFit {
    pub params: VgParams,
    pub goodness_of_fit: f64,
    pub fell_back: bool,
}

pub struct VarianceGammaFitter;

impl VarianceGammaFitter {
    /// Fit (σ, ν, θ) to a log-return series sampled at interval `dt` years.
    ///
    /// # Errors
    /// [`EngineError::InsufficientData`] below [`MIN_OBSERVATIONS`] returns,
    /// and [`EngineError::InvalidParameters`] for a non-positive `dt`.
    pub fn fit(log_returns: &[f64], dt: f64) -> EngineResult<VgFit> {
        validate_positive("dt", dt)?;
        if log_returns.len() < MIN_OBSERVATIONS {
            return Err(EngineError::InsufficientData {
                required: MIN_OBSERVATIONS,
                actual: log_returns.len(),
            });
        }

        let init = match Self::moments_init(log_returns, dt) {
            Some(p) => p,
            None => return Ok(Self::fallback()),
        };

        // single serial refinement pass around the moment estimate
        let mut best = init;
        let mut best_ll = Self::pseudo_log_likelihood(log_returns, dt, &init);
        for si in -3i32..=3 {
            for ni in -3i32..=3 {
                for ti in -3i32..=3 {
                    let candidate = VgParams {
                        sigma: (init.sigma * (1.0 + 0.15 * si as f64)).clamp(0.01, 2.0),
                        nu: (init.nu * (1.0 + 0.25 * ni as f64)).clamp(0.01, 2.0),
                        theta: (init.theta + 0.05 * ti as f64).clamp(-1.0, 1.0),
                    };
                    let ll = Self::pseudo_log_likelihood(log_returns, dt, &candidate);
                    if ll > best_ll {
                        best_ll = ll;
                        best = candidate;
                    }
                }
            }
        }

        if !best_ll.is_finite() || best.validate().is_err() {
            return Ok(Self::fallback());
        }

        Ok(VgFit {
            params: best,
            goodness_of_fit: best_ll / log_returns.len() as f64,
            fell_back: false,
        })
    }

    /// Convenience wrapper: load a close series, difference it and fit.
    pub fn fit_from_file(path: &Path, dt: f64) -> EngineResult<VgFit> {
        let prices = crate::timeseries::read_close_series(path)?;
        let returns = crate::timeseries::log_returns(&prices);
        Self::fit(&returns, dt)
    }

    fn fallback() -> VgFit {
        VgFit {
            params: VgParams::default(),
            goodness_of_fit: f64::NEG_INFINITY,
            fell_back: true,
        }
    }

    /// Method-of-moments initialization from the first four sample moments:
    /// excess kurtosis pins ν, the third moment pins θ, the variance pins σ.
    fn moments_init(returns: &[f64], dt: f64) -> Option<VgParams> {
        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let mut m2 = 0.0;
        let mut m3 = 0.0;
        let mut m4 = 0.0;
        for x in returns {
            let d = x - mean;
            m2 += d * d;
            m3 += d * d * d;
            m4 += d * d * d * d;
        }
        m2 /= n;
        m3 /= n;
        m4 /= n;
        if !(m2 > 0.0) || !m2.is_finite() {
            return None;
        }

        let excess_kurt = (m4 / (m2 * m2) - 3.0).max(0.0);
        // per-horizon excess kurtosis of VG is 3ν/h
        let nu = (excess_kurt * dt / 3.0).clamp(0.01, 2.0);
        let variance_annual = m2 / dt;
        // leading third moment is 3θνσ²h
        let theta = (m3 / (3.0 * nu * variance_annual.max(1e-8) * dt)).clamp(-1.0, 1.0);
        let sigma2 = (variance_annual - theta * theta * nu).max(1e-4);
        let params = VgParams {
            sigma: sigma2.sqrt().clamp(0.01, 2.0),
            nu,
            theta,
        };
        params.sigma.is_finite().then_some(params)
    }

    /// Edgeworth-corrected pseudo log-likelihood: a normal density at the
    /// VG mean/variance multiplied by a fourth-Hermite tail correction. The
    /// correction factor is floored at 0.01 before the log so a single
    /// outlier cannot send the objective to -inf.
    fn pseudo_log_likelihood(returns: &[f64], dt: f64, p: &VgParams) -> f64 {
        let mean = p.theta * dt;
        let variance = (p.sigma * p.sigma + p.theta * p.theta * p.nu) * dt;
        if variance <= 0.0 {
            return f64::NEG_INFINITY;
        }
        let sd = variance.sqrt();
        // Edgeworth coefficients, clamped to the expansion's sane region
        let skew = (p.theta * p.nu * (3.0 * p.sigma * p.sigma + 2.0 * p.theta * p.theta * p.nu)
            / (dt.sqrt() * variance / dt * (variance / dt).sqrt()))
        .clamp(-0.5, 0.5);
        let excess_kurt = (3.0 * p.nu / dt).min(1.0);

        returns
            .iter()
            .map(|x| {
                let z = (x - mean) / sd;
                let h3 = z * z * z - 3.0 * z;
                let h4 = z * z * z * z - 6.0 * z * z + 3.0;
                let correction =
                    (1.0 + skew / 6.0 * h3 + excess_kurt / 24.0 * h4).max(0.01);
                -0.5 * z * z - sd.ln() + correction.ln()
            })
            .sum()
    }
}
