// src/scenario.rs
//! Price-curve sweeps for the risk-display layer.
//!
//! The display collaborator plots (spot, value) curves; this module only
//! produces the ordered point sequence and never renders anything.

use crate::greeks::{Bump, BumpPricer};
use crate::models::OptionRight;

/// Sweep a pricer across `[lo, hi]` in `points` evenly spaced spots and
/// return the ordered `(spot, price)` curve.
///
/// Returns an empty curve for degenerate ranges (`points < 2` or `hi <= lo`).
pub fn price_curve<P: BumpPricer + ?Sized>(
    pricer: &P,
    right: OptionRight,
    lo: f64,
    hi: f64,
    points: usize,
) -> Vec<(f64, f64)> {
    if points < 2 || !(hi > lo) {
        return Vec::new();
    }

    let base_spot = pricer.contract().spot;
    let step = (hi - lo) / (points - 1) as f64;

    (0..points)
        .map(|i| {
            let spot = lo + i as f64 * step;
            let price = pricer.price_bumped(Bump::spot(spot - base_spot)).pick(right);
            (spot, price)
        })
        .collect()
}

/// Same sweep expressed as P&L against the position's entry price:
/// `value - entry_price` per unit, scaled by a signed quantity.
pub fn pnl_curve<P: BumpPricer + ?Sized>(
    pricer: &P,
    right: OptionRight,
    lo: f64,
    hi: f64,
    points: usize,
    entry_price: f64,
    quantity: f64,
) -> Vec<(f64, f64)> {
    price_curve(pricer, right, lo, hi, points)
        .into_iter()
        .map(|(spot, price)| (spot, (price - entry_price) * quantity))
        .collect()
}
