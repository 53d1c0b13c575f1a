//! # option-engines: Semi-Analytic Option Pricing and Calibration
//!
//! A Rust library for European option pricing under Black-Scholes, Heston,
//! Bates and Variance Gamma dynamics, with implied-volatility solvers, a
//! shared finite-difference Greeks engine and a parallel Heston calibrator.
//!
//! ## Key Features
//!
//! - **Implied Volatility**: Bisection, Newton-Raphson and a fast hybrid
//!   solver with moneyness-aware initial guesses
//! - **Stochastic Volatility**: Heston pricing via characteristic-function
//!   integration with a calibration-grade approximation fallback
//! - **Jumps**: Bates SVJ via the characteristic function, validated by a
//!   parallel antithetic Monte Carlo path, plus a COS-expansion delta
//! - **Fat Tails**: Variance Gamma pricing and return-series fitting
//! - **Complete Greeks**: Delta, gamma, vega, theta, vanna, charm from one
//!   bump interface shared by every engine
//! - **Production Ready**: Comprehensive error handling, validation and
//!   cooperative cancellation for long-running work
//!
//! ## Quick Start
//!
//! ```rust
//! use option_engines::models::black_scholes::{self, BsParams};
//! use option_engines::models::OptionRight;
//!
//! let prices = black_scholes::price(&BsParams {
//!     s: 100.0,       // Spot price
//!     k: 105.0,       // Strike
//!     r: 0.05,        // Risk-free rate
//!     t: 0.5,         // Time to expiration (years)
//!     sigma: 0.2,     // Volatility
//! });
//! println!("call {:.4}, put {:.4}", prices.call, prices.put);
//!
//! let iv = black_scholes::implied_vol_fast(
//!     100.0, 105.0, 0.05, 0.5, prices.call, OptionRight::Call, None,
//! ).expect("price is attainable");
//! assert!((iv - 0.2).abs() < 0.01);
//! ```
//!
//! ## Mathematical Foundation
//!
//! Every engine produces a call/put pair under the risk-neutral measure.
//! The stochastic-volatility engines price through characteristic-function
//! integration (see [`fourier`]); all results are kept on put-call parity
//! and inside the no-arbitrage corridor.

// Module declarations
pub mod error;
pub mod cancel;
pub mod rng;
pub mod math_utils;
pub mod models;
pub mod fourier;
pub mod greeks;
pub mod scenario;
pub mod calibration;
pub mod timeseries;

// Re-export commonly used types for convenience
pub use error::{EngineError, EngineResult};
