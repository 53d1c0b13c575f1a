// src/calibration.rs
//! Heston parameter calibration to observed put quotes.
//!
//! # Method
//!
//! Derivative-free nested grid search over (θ, κ, ξ, ρ, v0): each pass
//! evaluates a 5-point-per-dimension cartesian grid in parallel, then the
//! ranges are re-centered on the best candidate and halved for the next
//! pass, down to a floor step. Grid search is deliberately chosen over
//! gradient methods: the objective is cheap under the approximation pricer,
//! has flat ridges where gradients mislead, and the grid is trivially
//! parallel and deterministic.
//!
//! Determinism under rayon: candidates reduce as `(objective, index,
//! params)` tuples and ties break toward the lower index, so the result is
//! independent of work-stealing order.
//!
//! The objective is the sum of squared put-price errors; candidates that
//! fail validation or produce non-finite prices score a flat penalty.

use crate::cancel::CancelToken;
use crate::error::{validation::*, EngineError, EngineResult};
use crate::models::heston::{HestonEngine, HestonModel, HestonParams, IntegrationMethod};
use crate::models::Contract;
use rayon::prelude::*;

const PENALTY: f64 = 1e6;
const GRID_POINTS: usize = 5;
const STEP_FLOOR: f64 = 0.01;

/// Where the calibrator is in its search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationPhase {
    /// First coarse pass over the full parameter ranges.
    Searching,
    /// Subsequent passes on halved ranges.
    Narrowing,
    /// Ranges hit the step floor or the objective stopped improving.
    Converged,
}

/// One market quote the calibrator fits against.
#[derive(Clone, Copy, Debug)]
struct Quote {
    strike: f64,
    expiry: f64,
    put_price: f64,
}

pub struct HestonCalibrator {
    pub spot: f64,
    pub rate: f64,
    /// Pricing path used inside the objective. Defaults to the
    /// approximation: ~3000 candidate evaluations per pass make the CF
    /// integral unaffordable here.
    pub method: IntegrationMethod,
    pub max_passes: usize,
    pub cancel: Option<CancelToken>,
}

#[derive(Clone, Copy, Debug)]
pub struct CalibrationResult {
    pub params: HestonParams,
    /// Final sum of squared put-price errors.
    pub objective: f64,
    /// Root-mean-square price error per quote, in price units.
    pub rmse: f64,
    pub passes: usize,
    pub phase: CalibrationPhase,
}

#[derive(Clone, Copy, Debug)]
struct Axis {
    lo: f64,
    hi: f64,
    floor: f64,
    ceil: f64,
}

impl Axis {
    fn new(lo: f64, hi: f64, floor: f64, ceil: f64) -> Self {
        Axis { lo, hi, floor, ceil }
    }

    fn points(&self) -> [f64; GRID_POINTS] {
        let step = (self.hi - self.lo) / (GRID_POINTS - 1) as f64;
        let mut pts = [0.0; GRID_POINTS];
        for (i, p) in pts.iter_mut().enumerate() {
            *p = self.lo + i as f64 * step;
        }
        pts
    }

    fn width(&self) -> f64 {
        self.hi - self.lo
    }

    /// Re-center on `value` with half the current width, clamped to the
    /// global bounds and floored at the minimum step.
    fn narrowed(&self, value: f64) -> Self {
        let half = (self.width() / 4.0).max(STEP_FLOOR);
        Axis {
            lo: (value - half).max(self.floor),
            hi: (value + half).min(self.ceil),
            ..*self
        }
    }
}

impl HestonCalibrator {
    pub fn new(spot: f64, rate: f64) -> EngineResult<Self> {
        validate_positive("spot", spot)?;
        validate_finite("rate", rate)?;
        Ok(HestonCalibrator {
            spot,
            rate,
            method: IntegrationMethod::Approximation,
            max_passes: 8,
            cancel: None,
        })
    }

    pub fn with_method(mut self, method: IntegrationMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Calibrate to put quotes. The three slices are matched by index.
    ///
    /// # Errors
    /// - [`EngineError::InvalidConfiguration`] for mismatched slice lengths
    /// - [`EngineError::InsufficientData`] for fewer than 3 quotes
    /// - [`EngineError::Cancelled`] when the cancel token fires between passes
    /// - [`EngineError::CalibrationError`] when no candidate ever beats the
    ///   penalty score
    pub fn calibrate(
        &self,
        put_prices: &[f64],
        strikes: &[f64],
        expiries: &[f64],
    ) -> EngineResult<CalibrationResult> {
        validate_same_length("put_prices", put_prices.len(), "strikes", strikes.len())?;
        validate_same_length("put_prices", put_prices.len(), "expiries", expiries.len())?;
        if put_prices.len() < 3 {
            return Err(EngineError::InsufficientData {
                required: 3,
                actual: put_prices.len(),
            });
        }

        let quotes: Vec<Quote> = put_prices
            .iter()
            .zip(strikes)
            .zip(expiries)
            .map(|((p, k), t)| Quote {
                strike: *k,
                expiry: *t,
                put_price: *p,
            })
            .collect();

        let mut theta = Axis::new(0.01, 0.25, 0.001, 1.0);
        let mut kappa = Axis::new(0.5, 8.0, 0.1, 20.0);
        let mut xi = Axis::new(0.1, 2.0, 0.01, 5.0);
        let mut rho = Axis::new(-0.9, 0.0, -0.99, 0.99);
        let mut v0 = Axis::new(0.01, 0.25, 0.001, 1.0);

        let mut best_obj = f64::INFINITY;
        let mut best_params = HestonParams::default();
        let mut phase = CalibrationPhase::Searching;
        let mut passes = 0;

        for pass in 0..self.max_passes {
            if let Some(token) = &self.cancel {
                if token.is_cancelled() {
                    return Err(EngineError::Cancelled {
                        operation: "heston calibration".to_string(),
                    });
                }
            }
            passes = pass + 1;
            phase = if pass == 0 {
                CalibrationPhase::Searching
            } else {
                CalibrationPhase::Narrowing
            };

            let candidates = Self::cartesian(&theta, &kappa, &xi, &rho, &v0);
            let (obj, _idx, params) = candidates
                .par_iter()
                .enumerate()
                .map(|(i, p)| (self.objective(p, &quotes), i, *p))
                .reduce(
                    || (f64::INFINITY, usize::MAX, HestonParams::default()),
                    |a, b| {
                        if b.0 < a.0 || (b.0 == a.0 && b.1 < a.1) {
                            b
                        } else {
                            a
                        }
                    },
                );

            let improvement = best_obj - obj;
            if obj < best_obj {
                best_obj = obj;
                best_params = params;
            }

            theta = theta.narrowed(best_params.theta);
            kappa = kappa.narrowed(best_params.kappa);
            xi = xi.narrowed(best_params.xi);
            rho = rho.narrowed(best_params.rho);
            v0 = v0.narrowed(best_params.v0);

            let all_at_floor = [&theta, &kappa, &xi, &rho, &v0]
                .iter()
                .all(|axis| axis.width() <= 2.0 * STEP_FLOOR + 1e-12);
            if all_at_floor || (pass > 0 && improvement.abs() < 1e-10) {
                phase = CalibrationPhase::Converged;
                break;
            }
        }

        if best_obj >= PENALTY {
            return Err(EngineError::CalibrationError {
                reason: "no parameter candidate produced finite prices".to_string(),
                current_error: Some(best_obj),
            });
        }

        Ok(CalibrationResult {
            params: best_params,
            objective: best_obj,
            rmse: (best_obj / quotes.len() as f64).sqrt(),
            passes,
            phase,
        })
    }

    fn cartesian(
        theta: &Axis,
        kappa: &Axis,
        xi: &Axis,
        rho: &Axis,
        v0: &Axis,
    ) -> Vec<HestonParams> {
        let mut out = Vec::with_capacity(GRID_POINTS.pow(5));
        for t in theta.points() {
            for k in kappa.points() {
                for x in xi.points() {
                    for r in rho.points() {
                        for v in v0.points() {
                            out.push(HestonParams {
                                v0: v,
                                theta: t,
                                kappa: k,
                                xi: x,
                                rho: r,
                            });
                        }
                    }
                }
            }
        }
        out
    }

    /// Sum of squared put-price errors, or the flat penalty for candidates
    /// that fail validation or blow up numerically.
    fn objective(&self, params: &HestonParams, quotes: &[Quote]) -> f64 {
        let mut sse = 0.0;
        for quote in quotes {
            let contract = match Contract::new(self.spot, quote.strike, self.rate, quote.expiry) {
                Ok(c) => c,
                Err(_) => return PENALTY,
            };
            let engine = match HestonEngine::new_quiet(
                contract,
                *params,
                HestonModel::Standard,
                self.method,
                true,
            ) {
                Ok(e) => e,
                Err(_) => return PENALTY,
            };
            let model_put = engine.price().put;
            if !model_put.is_finite() {
                return PENALTY;
            }
            let err = model_put - quote.put_price;
            sse += err * err;
        }
        if sse.is_finite() {
            sse
        } else {
            PENALTY
        }
    }
}
