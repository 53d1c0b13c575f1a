// src/models/mod.rs
//! Pricing engines: one module per model family.

pub mod bates;
pub mod black_scholes;
pub mod heston;
pub mod variance_gamma;

use crate::error::{validation::*, EngineResult};

/// Option right (exercise direction).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionRight {
    Call,
    Put,
}

/// Vanilla contract state shared by every engine: spot, strike, risk-free
/// rate and expiry in year fractions.
#[derive(Clone, Copy, Debug)]
pub struct Contract {
    pub spot: f64,
    pub strike: f64,
    pub rate: f64,
    pub expiry: f64,
}

impl Contract {
    pub fn new(spot: f64, strike: f64, rate: f64, expiry: f64) -> EngineResult<Self> {
        let contract = Contract {
            spot,
            strike,
            rate,
            expiry,
        };
        contract.validate()?;
        Ok(contract)
    }

    pub fn validate(&self) -> EngineResult<()> {
        validate_positive("spot", self.spot)?;
        validate_positive("strike", self.strike)?;
        validate_finite("rate", self.rate)?;
        validate_non_negative("expiry", self.expiry)?;
        Ok(())
    }

    /// Discount factor e^(-rT)
    pub fn discount(&self) -> f64 {
        (-self.rate * self.expiry).exp()
    }

    /// Exercise-now intrinsic values (the T = 0 boundary prices).
    pub fn intrinsic(&self) -> OptionPrices {
        OptionPrices {
            call: (self.spot - self.strike).max(0.0),
            put: (self.strike - self.spot).max(0.0),
        }
    }

    /// No-arbitrage lower bounds: discounted intrinsic.
    pub fn lower_bounds(&self) -> OptionPrices {
        let df = self.discount();
        OptionPrices {
            call: (self.spot - self.strike * df).max(0.0),
            put: (self.strike * df - self.spot).max(0.0),
        }
    }

    /// No-arbitrage upper bounds: spot for the call, discounted strike for
    /// the put.
    pub fn upper_bounds(&self) -> OptionPrices {
        OptionPrices {
            call: self.spot,
            put: self.strike * self.discount(),
        }
    }
}

/// Call/put price pair produced by every pricing path.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OptionPrices {
    pub call: f64,
    pub put: f64,
}

impl OptionPrices {
    pub fn pick(&self, right: OptionRight) -> f64 {
        match right {
            OptionRight::Call => self.call,
            OptionRight::Put => self.put,
        }
    }

    /// Deviation from put-call parity: (call - put) - (S - K e^{-rT}).
    pub fn parity_gap(&self, contract: &Contract) -> f64 {
        (self.call - self.put) - (contract.spot - contract.strike * contract.discount())
    }

    /// Symmetric parity repair: split the parity gap evenly between call and
    /// put so the pair lands back on the no-arbitrage identity.
    pub fn repair_parity(mut self, contract: &Contract) -> Self {
        let gap = self.parity_gap(contract);
        self.call -= 0.5 * gap;
        self.put += 0.5 * gap;
        self
    }

    /// Screen for a healthy pricing result: both legs finite, inside the
    /// no-arbitrage corridor, and not a degenerate all-zero pair. Failures
    /// mean the producing method broke down and a fallback should reprice,
    /// not that clamping is in order.
    pub fn is_plausible(&self, contract: &Contract) -> bool {
        if !self.call.is_finite() || !self.put.is_finite() {
            return false;
        }
        let tol = 1e-8 * contract.spot.max(contract.strike);
        let lo = contract.lower_bounds();
        let hi = contract.upper_bounds();
        if self.call < lo.call - tol || self.call > hi.call + tol {
            return false;
        }
        if self.put < lo.put - tol || self.put > hi.put + tol {
            return false;
        }
        // both legs at zero with time on the clock means the method
        // collapsed, not that the straddle is worthless
        if contract.expiry > 0.0 && self.call <= tol && self.put <= tol {
            return false;
        }
        true
    }

    /// Clamp both legs to their no-arbitrage [intrinsic, upper] corridor.
    pub fn clamp_to_bounds(mut self, contract: &Contract) -> Self {
        let lo = contract.lower_bounds();
        let hi = contract.upper_bounds();
        self.call = self.call.clamp(lo.call, hi.call);
        self.put = self.put.clamp(lo.put, hi.put);
        self
    }
}
