// src/greeks.rs
//! Shared finite-difference Greeks engine.
//!
//! # Design
//!
//! The stochastic-volatility engines have no closed-form sensitivities, so
//! all of their Greeks come from central finite differences on a pure
//! `price(bumped params)` call. Rather than each engine re-implementing the
//! bump plumbing, any pricer that can reprice itself under a spot/vol/time
//! bump implements [`BumpPricer`] and gets the full Greeks set from
//! [`finite_difference_greeks`].
//!
//! Bumping constructs a modified copy of the immutable parameter set; no
//! engine state is mutated and restored, so Greeks computation is safe to
//! parallelize across positions.
//!
//! # Units
//!
//! - delta, gamma: per unit of spot
//! - vega, vanna:  per 1.00 volatility point (raw derivative divided by 100)
//! - theta, charm: per calendar day

use crate::models::{Contract, OptionPrices, OptionRight};
use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GreeksConfig: u32 {
        const NONE  = 0;
        const DELTA = 1 << 0;
        const GAMMA = 1 << 1;
        const VEGA  = 1 << 2;
        const THETA = 1 << 3;
        const VANNA = 1 << 4;
        const CHARM = 1 << 5;
        const ALL   = Self::DELTA.bits()
                    | Self::GAMMA.bits()
                    | Self::VEGA.bits()
                    | Self::THETA.bits()
                    | Self::VANNA.bits()
                    | Self::CHARM.bits();
    }
}

/// Full sensitivity set for one option leg.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub vega: f64,
    pub theta: f64,
    pub vanna: f64,
    pub charm: f64,
}

/// Additive shifts applied to a pricer's inputs before repricing.
///
/// `spot` shifts the spot price, `vol` shifts the model's volatility handle
/// (sigma for lognormal models, sqrt-variance for stochastic-volatility
/// models), `time` is subtracted from the expiry.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bump {
    pub spot: f64,
    pub vol: f64,
    pub time: f64,
}

impl Bump {
    pub fn spot(ds: f64) -> Self {
        Bump {
            spot: ds,
            ..Default::default()
        }
    }

    pub fn vol(dv: f64) -> Self {
        Bump {
            vol: dv,
            ..Default::default()
        }
    }

    pub fn time(dt: f64) -> Self {
        Bump {
            time: dt,
            ..Default::default()
        }
    }
}

/// Capability interface for finite-difference Greeks: reprice under a bump.
pub trait BumpPricer {
    fn contract(&self) -> Contract;

    /// Price the call/put pair with the given bump applied to a copy of the
    /// parameters. Must be pure: repeated calls with equal bumps agree.
    fn price_bumped(&self, bump: Bump) -> OptionPrices;

    /// Analytic (call, put) delta pair used when the finite-difference
    /// estimate is unstable. `None` disables the fallback.
    fn fallback_delta(&self) -> Option<(f64, f64)> {
        None
    }
}

const VOL_BUMP: f64 = 0.01;
const DAY: f64 = 1.0 / 365.0;
const DELTA_RANGE: f64 = 1.5;
const DELTA_PARITY_TOL: f64 = 0.05;

/// Spot bump sized to the contract: 0.5% of spot, shrunk for short expiries
/// where the price surface steepens.
fn spot_bump(contract: &Contract) -> f64 {
    let scale = (contract.expiry / 0.25).sqrt().clamp(0.2, 1.0);
    (contract.spot * 5e-3 * scale).max(1e-6)
}

/// Central finite-difference Greeks for any [`BumpPricer`].
///
/// Delta is validated (finite, inside [-1.5, 1.5], call and put deltas one
/// apart) and replaced by the pricer's analytic fallback when the estimate is
/// unstable. The remaining Greeks are plain central differences.
pub fn finite_difference_greeks<P: BumpPricer + ?Sized>(
    pricer: &P,
    right: OptionRight,
    config: GreeksConfig,
) -> Greeks {
    let contract = pricer.contract();
    let mut greeks = Greeks::default();
    if config.is_empty() || contract.expiry <= 0.0 {
        return greeks;
    }

    let h = spot_bump(&contract);
    let need_spot_pair = config.intersects(GreeksConfig::DELTA | GreeksConfig::GAMMA);
    let up = if need_spot_pair {
        pricer.price_bumped(Bump::spot(h))
    } else {
        OptionPrices::default()
    };
    let dn = if need_spot_pair {
        pricer.price_bumped(Bump::spot(-h))
    } else {
        OptionPrices::default()
    };

    if config.contains(GreeksConfig::DELTA) {
        let call_delta = (up.call - dn.call) / (2.0 * h);
        let put_delta = (up.put - dn.put) / (2.0 * h);
        greeks.delta = stabilized_delta(pricer, right, call_delta, put_delta);
    }

    if config.contains(GreeksConfig::GAMMA) {
        let base = pricer.price_bumped(Bump::default());
        let second = up.pick(right) - 2.0 * base.pick(right) + dn.pick(right);
        let gamma = second / (h * h);
        greeks.gamma = if gamma.is_finite() { gamma } else { 0.0 };
    }

    if config.contains(GreeksConfig::VEGA) {
        let v_up = pricer.price_bumped(Bump::vol(VOL_BUMP));
        let v_dn = pricer.price_bumped(Bump::vol(-VOL_BUMP));
        let vega = (v_up.pick(right) - v_dn.pick(right)) / (2.0 * VOL_BUMP) / 100.0;
        greeks.vega = if vega.is_finite() { vega } else { 0.0 };
    }

    if config.contains(GreeksConfig::THETA) {
        greeks.theta = one_day_decay(pricer, right, Bump::default());
    }

    if config.contains(GreeksConfig::VANNA) {
        let delta_at_vol = |dv: f64| -> f64 {
            let b_up = Bump {
                spot: h,
                vol: dv,
                time: 0.0,
            };
            let b_dn = Bump {
                spot: -h,
                vol: dv,
                time: 0.0,
            };
            (pricer.price_bumped(b_up).pick(right) - pricer.price_bumped(b_dn).pick(right))
                / (2.0 * h)
        };
        let vanna = (delta_at_vol(VOL_BUMP) - delta_at_vol(-VOL_BUMP)) / (2.0 * VOL_BUMP) / 100.0;
        greeks.vanna = if vanna.is_finite() { vanna } else { 0.0 };
    }

    if config.contains(GreeksConfig::CHARM) {
        let dt = DAY.min(0.5 * contract.expiry);
        if dt > 0.0 {
            let delta_at_time = |t_shift: f64| -> f64 {
                let b_up = Bump {
                    spot: h,
                    vol: 0.0,
                    time: t_shift,
                };
                let b_dn = Bump {
                    spot: -h,
                    vol: 0.0,
                    time: t_shift,
                };
                (pricer.price_bumped(b_up).pick(right) - pricer.price_bumped(b_dn).pick(right))
                    / (2.0 * h)
            };
            // delta change over one day of decay, reported per day
            let charm = (delta_at_time(dt) - delta_at_time(0.0)) * (DAY / dt);
            greeks.charm = if charm.is_finite() { charm } else { 0.0 };
        }
    }

    greeks
}

/// Price decay over one calendar day (negative for long options).
fn one_day_decay<P: BumpPricer + ?Sized>(pricer: &P, right: OptionRight, base_bump: Bump) -> f64 {
    let contract = pricer.contract();
    let dt = DAY.min(0.5 * contract.expiry);
    if dt <= 0.0 {
        return 0.0;
    }
    let now = pricer.price_bumped(base_bump).pick(right);
    let later = pricer
        .price_bumped(Bump {
            time: base_bump.time + dt,
            ..base_bump
        })
        .pick(right);
    let theta = (later - now) * (DAY / dt);
    if theta.is_finite() {
        theta
    } else {
        0.0
    }
}

/// Accept the finite-difference delta only when it is finite, inside the
/// plausible range, and consistent with call-put delta parity; otherwise use
/// the engine's analytic fallback.
fn stabilized_delta<P: BumpPricer + ?Sized>(
    pricer: &P,
    right: OptionRight,
    call_delta: f64,
    put_delta: f64,
) -> f64 {
    let fd = match right {
        OptionRight::Call => call_delta,
        OptionRight::Put => put_delta,
    };

    let unstable = !fd.is_finite()
        || fd.abs() > DELTA_RANGE
        || !call_delta.is_finite()
        || !put_delta.is_finite()
        || ((call_delta - put_delta) - 1.0).abs() > DELTA_PARITY_TOL;

    if !unstable {
        return fd;
    }

    match pricer.fallback_delta() {
        Some((call_fb, put_fb)) => match right {
            OptionRight::Call => call_fb,
            OptionRight::Put => put_fb,
        },
        None => fd.clamp(-DELTA_RANGE, DELTA_RANGE),
    }
}
