// src/models/heston.rs
//! Heston stochastic-volatility pricing engine.
//!
//! # Mathematical Framework
//!
//! The Heston model describes asset price evolution with stochastic volatility:
//! ```text
//! dS_t = r S_t dt + √V_t S_t dW_t^(1)
//! dV_t = κ(θ - V_t) dt + ξ√V_t dW_t^(2)
//! ```
//!
//! Where:
//! - V_t: Instantaneous variance (volatility squared)
//! - κ: Mean reversion speed for variance
//! - θ: Long-term variance level
//! - ξ: Volatility of variance (vol-of-vol)
//! - ρ: Correlation between dW_t^(1) and dW_t^(2)
//!
//! # Pricing Paths
//!
//! Two pricing paths with different speed/accuracy tradeoffs:
//! 1. **Characteristic function** (fixed or adaptive grid): semi-analytic
//!    Fourier integration, the accurate reference path
//! 2. **Approximation**: Black-Scholes at an expectation-matched effective
//!    variance plus moment-expansion smile corrections; fast enough to sit in
//!    a calibration objective
//!
//! The characteristic-function path silently falls back to the approximation
//! when the integral goes non-finite, so `price` is total once the engine is
//! constructed.
//!
//! # Feller Condition
//!
//! For variance to remain strictly positive the Feller condition must hold:
//! ```text
//! 2κθ ≥ ξ²
//! ```
//!
//! Violations are tolerated with a warning; severe violations (severity
//! ξ²/(2κθ) above 20) get ξ clamped back to the severity cap so the
//! integrand stays tame.

use crate::error::{validation::*, EngineError, EngineResult};
use crate::fourier::{self, IntegrationGrid};
use crate::greeks::{Bump, BumpPricer};
use crate::math_utils::{norm_cdf, norm_pdf};
use crate::models::black_scholes::{self, BsParams};
use crate::models::{Contract, OptionPrices};

/// Maximum tolerated Feller severity ξ²/(2κθ) before ξ is clamped.
pub(crate) const FELLER_SEVERITY_CAP: f64 = 20.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HestonParams {
    pub v0: f64,    // Initial variance
    pub theta: f64, // Long-term variance
    pub kappa: f64, // Mean reversion speed
    pub xi: f64,    // Volatility of variance (vol-of-vol)
    pub rho: f64,   // Correlation between spot and variance
}

impl Default for HestonParams {
    fn default() -> Self {
        HestonParams {
            v0: 0.04,
            theta: 0.04,
            kappa: 2.0,
            xi: 0.3,
            rho: -0.5,
        }
    }
}

impl HestonParams {
    pub fn validate(&self) -> EngineResult<()> {
        validate_non_negative("v0", self.v0)?;
        validate_positive("theta", self.theta)?;
        validate_positive("kappa", self.kappa)?;
        validate_positive("xi", self.xi)?;
        validate_correlation("rho", self.rho)?;

        if self.kappa > 100.0 {
            return Err(EngineError::InvalidParameters {
                parameter: "kappa".to_string(),
                value: self.kappa,
                constraint: "extremely high mean reversion speed (>100) may cause numerical issues"
                    .to_string(),
            });
        }

        if self.xi > 5.0 {
            return Err(EngineError::InvalidParameters {
                parameter: "xi".to_string(),
                value: self.xi,
                constraint: "extremely high vol-of-vol (>5) may cause numerical issues".to_string(),
            });
        }

        if self.theta > 1.0 {
            return Err(EngineError::InvalidParameters {
                parameter: "theta".to_string(),
                value: self.theta,
                constraint: "long-term variance >1 (100% vol) is unrealistic".to_string(),
            });
        }

        Ok(())
    }

    /// Feller condition 2κθ ≥ ξ² (θ and v0 are variances, not vols).
    pub fn is_feller_satisfied(&self) -> bool {
        2.0 * self.kappa * self.theta >= self.xi * self.xi
    }

    /// Violation severity ξ²/(2κθ): 1.0 sits exactly on the boundary,
    /// larger means worse.
    pub fn feller_severity(&self) -> f64 {
        (self.xi * self.xi) / (2.0 * self.kappa * self.theta)
    }

    /// Copy with ξ pulled back so the Feller severity is at most the cap.
    /// A no-op for parameters already inside the cap.
    pub fn with_damped_xi(&self) -> Self {
        if self.feller_severity() <= FELLER_SEVERITY_CAP {
            return *self;
        }
        HestonParams {
            xi: (FELLER_SEVERITY_CAP * 2.0 * self.kappa * self.theta).sqrt(),
            ..*self
        }
    }
}

/// How the engine evaluates prices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntegrationMethod {
    /// Effective-variance Black-Scholes with smile corrections. Fast; used
    /// inside calibration loops.
    Approximation,
    /// Characteristic-function integration on the fixed default grid.
    FixedGrid,
    /// Characteristic-function integration with the grid scaled to the
    /// integrand's decay rate.
    Adaptive,
}

/// Return-distribution variant layered on the Heston variance dynamics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HestonModel {
    Standard,
    /// Lognormal jumps on top of the diffusion (Bates-style).
    JumpDiffusion { lambda: f64, mu_j: f64, sigma_j: f64 },
    /// Variance-gamma-flavoured fat tails, expressed through the
    /// approximation path. The Feller check is skipped for this variant:
    /// its tails come from subordinated time, not the variance process.
    VarianceGammaApprox { nu: f64, drift: f64 },
    /// Asymmetric-Laplace tails: heavier kurtosis with a signed tilt.
    AsymmetricLaplace { tail_asymmetry: f64 },
}

/// Extra skew/kurtosis applied on top of whatever the model itself implies,
/// in Corrado-Su moment units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SmileAdjustments {
    pub skew: f64,
    pub kurtosis: f64,
}

pub struct HestonEngine {
    pub contract: Contract,
    pub params: HestonParams,
    pub model: HestonModel,
    pub method: IntegrationMethod,
    pub smile: SmileAdjustments,
}

impl HestonEngine {
    pub fn new(
        contract: Contract,
        params: HestonParams,
        model: HestonModel,
        method: IntegrationMethod,
    ) -> EngineResult<Self> {
        Self::new_quiet(contract, params, model, method, false)
    }

    /// Standard dynamics on the adaptive grid.
    pub fn standard(contract: Contract, params: HestonParams) -> EngineResult<Self> {
        Self::new(contract, params, HestonModel::Standard, IntegrationMethod::Adaptive)
    }

    pub fn new_quiet(
        contract: Contract,
        mut params: HestonParams,
        model: HestonModel,
        method: IntegrationMethod,
        suppress_warnings: bool,
    ) -> EngineResult<Self> {
        contract.validate()?;
        params.validate()?;
        Self::validate_model(&model)?;

        let skip_feller = matches!(model, HestonModel::VarianceGammaApprox { .. });
        if !skip_feller && !params.is_feller_satisfied() {
            let severity = params.feller_severity();
            if !suppress_warnings {
                eprintln!(
                    "WARNING!: Feller condition violated (2κθ < ξ², severity {:.1}). Variance may hit zero.",
                    severity
                );
            }
            if severity > FELLER_SEVERITY_CAP {
                params = params.with_damped_xi();
                if !suppress_warnings {
                    eprintln!(
                        "WARNING!: vol-of-vol clamped to ξ = {:.4} (severity cap {}).",
                        params.xi, FELLER_SEVERITY_CAP
                    );
                }
            }
        }

        Ok(HestonEngine {
            contract,
            params,
            model,
            method,
            smile: SmileAdjustments::default(),
        })
    }

    pub fn with_smile(mut self, smile: SmileAdjustments) -> Self {
        self.smile = smile;
        self
    }

    fn validate_model(model: &HestonModel) -> EngineResult<()> {
        match model {
            HestonModel::Standard => Ok(()),
            HestonModel::JumpDiffusion {
                lambda,
                mu_j,
                sigma_j,
            } => {
                validate_non_negative("lambda", *lambda)?;
                validate_finite("mu_j", *mu_j)?;
                validate_non_negative("sigma_j", *sigma_j)?;
                Ok(())
            }
            HestonModel::VarianceGammaApprox { nu, drift } => {
                validate_positive("nu", *nu)?;
                validate_finite("drift", *drift)?;
                Ok(())
            }
            HestonModel::AsymmetricLaplace { tail_asymmetry } => {
                validate_range("tail_asymmetry", *tail_asymmetry, -1.0, 1.0)
            }
        }
    }

    /// Expectation of average variance over the life of the option:
    /// `θ + (v0 - θ)·w` with `w = (1 - e^(-κT))/(κT)`, plus a small
    /// vol-of-vol convexity correction `ξ²w(1-w)/(4κ)`.
    pub fn effective_variance(&self) -> f64 {
        let t = self.contract.expiry;
        if t <= 0.0 {
            return self.params.v0.max(1e-6);
        }
        let kt = self.params.kappa * t;
        let w = (1.0 - (-kt).exp()) / kt;
        let base = self.params.theta + (self.params.v0 - self.params.theta) * w;
        let convexity = self.params.xi * self.params.xi * w * (1.0 - w) / (4.0 * self.params.kappa);

        let mut variance = base + convexity;
        if let HestonModel::VarianceGammaApprox { nu, drift } = self.model {
            // Subordinated-time variance uplift
            variance += drift * drift * nu + 0.25 * variance * variance * nu * nu;
        }
        variance.max(1e-6)
    }

    pub fn effective_vol(&self) -> f64 {
        self.effective_variance().sqrt()
    }

    /// Call/put pair. Total after construction: the characteristic-function
    /// path falls back to the approximation rather than surfacing an error,
    /// and the result is parity-repaired and clamped to the no-arbitrage
    /// corridor.
    pub fn price(&self) -> OptionPrices {
        self.price_contract(&self.contract, &self.params)
    }

    fn price_contract(&self, contract: &Contract, params: &HestonParams) -> OptionPrices {
        if contract.expiry <= 0.0 {
            return contract.intrinsic();
        }

        // the characteristic function covers the Standard and JumpDiffusion
        // dynamics; the tail variants exist only in approximation form
        let cf_capable = matches!(
            self.model,
            HestonModel::Standard | HestonModel::JumpDiffusion { .. }
        );
        let raw = match self.method {
            IntegrationMethod::FixedGrid | IntegrationMethod::Adaptive if cf_capable => {
                // a CF result outside the no-arbitrage corridor or collapsed
                // to zero is integration failure; reprice, never clamp it
                match self.price_characteristic(contract, params) {
                    Ok(pair) if pair.is_plausible(contract) => pair,
                    _ => self.price_approximation(contract, params),
                }
            }
            _ => self.price_approximation(contract, params),
        };

        raw.repair_parity(contract).clamp_to_bounds(contract)
    }

    fn grid(&self, contract: &Contract, params: &HestonParams) -> IntegrationGrid {
        match self.method {
            IntegrationMethod::Adaptive => {
                let lambda = match self.model {
                    HestonModel::JumpDiffusion { lambda, .. } => lambda,
                    _ => 0.0,
                };
                IntegrationGrid::adaptive(contract.expiry, params.xi, lambda)
            }
            _ => IntegrationGrid::fixed(),
        }
    }

    fn price_characteristic(
        &self,
        contract: &Contract,
        params: &HestonParams,
    ) -> EngineResult<OptionPrices> {
        let grid = self.grid(contract, params);
        let t = contract.expiry;
        match self.model {
            HestonModel::JumpDiffusion {
                lambda,
                mu_j,
                sigma_j,
            } => fourier::price_european(
                |u| {
                    fourier::heston_cf(u, params, contract)
                        * fourier::jump_cf(u, lambda, mu_j, sigma_j, t)
                },
                contract,
                grid,
            ),
            _ => fourier::price_european(
                |u| fourier::heston_cf(u, params, contract),
                contract,
                grid,
            ),
        }
    }

    /// Effective-variance Black-Scholes plus moment corrections. Each
    /// correction is additive on the call; the put is recovered through
    /// parity by the caller's repair step.
    fn price_approximation(&self, contract: &Contract, params: &HestonParams) -> OptionPrices {
        let sigma = self.effective_vol_for(contract, params);
        let bs = BsParams {
            s: contract.spot,
            k: contract.strike,
            r: contract.rate,
            t: contract.expiry,
            sigma,
        };

        if let HestonModel::JumpDiffusion {
            lambda,
            mu_j,
            sigma_j,
        } = self.model
        {
            return merton_mixture(contract, sigma, lambda, mu_j, sigma_j);
        }

        let mut pair = black_scholes::price(&bs);
        let adjustment = self.smile_call_adjustment(contract, params, &bs, &pair);
        pair.call += adjustment;
        pair.put += adjustment; // parity-neutral shift; repair re-centers
        pair
    }

    fn effective_vol_for(&self, contract: &Contract, params: &HestonParams) -> f64 {
        // Recompute on the (possibly bumped) contract/params copies
        let probe = HestonEngine {
            contract: *contract,
            params: *params,
            model: self.model,
            method: self.method,
            smile: self.smile,
        };
        probe.effective_vol()
    }

    /// Corrado-Su style third/fourth moment adjustment to the call.
    ///
    /// The model-implied skew comes from ρξ (spot-variance correlation tilts
    /// the return density), the model-implied excess kurtosis from ξ². Any
    /// user-supplied `SmileAdjustments` add on top. The total is capped at
    /// half the option's time value so the correction can never dominate the
    /// Black-Scholes backbone, and it is disabled in regimes where the
    /// expansion is known to misbehave (very short expiry, extreme ρ/ξ).
    fn smile_call_adjustment(
        &self,
        contract: &Contract,
        params: &HestonParams,
        bs: &BsParams,
        pair: &OptionPrices,
    ) -> f64 {
        let t = contract.expiry;
        if t < 0.01 {
            return 0.0;
        }
        if t < 0.02 && params.xi > 1.0 {
            return 0.0;
        }
        if params.rho.abs() > 0.95 && params.xi * t.sqrt() > 0.5 {
            return 0.0;
        }

        let kt = params.kappa * t;
        let w = (1.0 - (-kt).exp()) / kt;
        let sigma = bs.sigma.max(0.05);

        let mut skew = (params.rho * params.xi * w * t.sqrt() / sigma).clamp(-1.5, 1.5);
        let mut kurt =
            (params.xi * params.xi * w * t / (4.0 * sigma * sigma)).clamp(0.0, 2.0);

        match self.model {
            HestonModel::VarianceGammaApprox { nu, drift } => {
                skew = (skew + 3.0 * drift * nu / sigma).clamp(-2.0, 2.0);
                kurt = (kurt + 3.0 * nu).clamp(0.0, 3.0);
            }
            HestonModel::AsymmetricLaplace { tail_asymmetry } => {
                skew = (skew + 1.5 * tail_asymmetry).clamp(-2.0, 2.0);
                kurt = (kurt + 3.0).min(4.0);
            }
            _ => {}
        }
        skew += self.smile.skew;
        kurt += self.smile.kurtosis;

        let (q3, q4) = corrado_su_terms(bs);
        let mut adjustment = skew * q3 + kurt * q4;

        // Deep-OTM-put strikes sit far in the left tail where the expansion
        // over-corrects; halve it there.
        if (contract.strike / contract.spot).ln() < -0.1 {
            adjustment *= 0.5;
        }

        let time_value = (pair.call - contract.lower_bounds().call).max(0.0);
        adjustment.clamp(-0.5 * time_value, 0.5 * time_value)
    }
}

/// Corrado-Su moment terms Q₃ (skewness) and Q₄ (excess kurtosis) for the
/// call expansion `C ≈ C_BS + skew·Q₃ + kurt·Q₄`.
fn corrado_su_terms(bs: &BsParams) -> (f64, f64) {
    let sqrt_t = bs.t.sqrt();
    let sig_sqrt_t = bs.sigma * sqrt_t;
    let d1 = ((bs.s / bs.k).ln() + (bs.r + 0.5 * bs.sigma * bs.sigma) * bs.t) / sig_sqrt_t;
    let d2 = d1 - sig_sqrt_t;

    let q3 = bs.s * sig_sqrt_t / 6.0
        * ((2.0 * sig_sqrt_t - d1) * norm_pdf(d1) + sig_sqrt_t * sig_sqrt_t * norm_cdf(d1));
    let q4 = bs.s * sig_sqrt_t / 24.0
        * ((d1 * d1 - 1.0 - 3.0 * sig_sqrt_t * d2) * norm_pdf(d1)
            + sig_sqrt_t.powi(3) * norm_cdf(d1));
    (q3, q4)
}

/// Merton jump-diffusion mixture: Poisson-weighted sum of Black-Scholes
/// prices with jump-conditional vol and drift. Terms are added until the
/// Poisson weight underflows.
fn merton_mixture(
    contract: &Contract,
    sigma: f64,
    lambda: f64,
    mu_j: f64,
    sigma_j: f64,
) -> OptionPrices {
    let t = contract.expiry;
    let jump_mean = (mu_j + 0.5 * sigma_j * sigma_j).exp() - 1.0;
    let lambda_prime = lambda * (1.0 + jump_mean);

    let mut call = 0.0;
    let mut put = 0.0;
    let mut weight = (-lambda_prime * t).exp();
    for n in 0..=40u32 {
        if n > 0 {
            weight *= lambda_prime * t / n as f64;
        }
        if weight < 1e-12 && n > 0 {
            break;
        }
        let nf = n as f64;
        let sigma_n = (sigma * sigma + nf * sigma_j * sigma_j / t).sqrt();
        let r_n = contract.rate - lambda * jump_mean + nf * (mu_j + 0.5 * sigma_j * sigma_j) / t;
        let term = black_scholes::price(&BsParams {
            s: contract.spot,
            k: contract.strike,
            r: r_n,
            t,
            sigma: sigma_n,
        });
        call += weight * term.call;
        put += weight * term.put;
    }

    OptionPrices { call, put }
}

impl BumpPricer for HestonEngine {
    fn contract(&self) -> Contract {
        self.contract
    }

    fn price_bumped(&self, bump: Bump) -> OptionPrices {
        let contract = Contract {
            spot: (self.contract.spot + bump.spot).max(1e-6),
            expiry: (self.contract.expiry - bump.time).max(0.0),
            ..self.contract
        };
        // Vol bumps move the vol handles sqrt(v0) and sqrt(theta) in
        // lockstep so the whole variance curve shifts.
        let sqrt_v0 = (self.params.v0.sqrt() + bump.vol).max(1e-4);
        let sqrt_theta = (self.params.theta.sqrt() + bump.vol).max(1e-4);
        let params = HestonParams {
            v0: sqrt_v0 * sqrt_v0,
            theta: sqrt_theta * sqrt_theta,
            ..self.params
        };
        self.price_contract(&contract, &params)
    }

    fn fallback_delta(&self) -> Option<(f64, f64)> {
        Some(black_scholes::analytic_delta(&BsParams {
            s: self.contract.spot,
            k: self.contract.strike,
            r: self.contract.rate,
            t: self.contract.expiry,
            sigma: self.effective_vol(),
        }))
    }
}
