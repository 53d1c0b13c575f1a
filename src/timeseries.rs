// src/timeseries.rs
//! CSV close-price loading for the return-based fitters.
//!
//! The expected layout is a header row naming a `Close` column
//! (case-insensitive) followed by one row per observation. I/O failures and
//! malformed rows are reported as distinct error variants so callers can
//! tell a missing file from a corrupt one; row numbers in format errors are
//! 1-based and count the header.

use crate::error::{EngineError, EngineResult};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Read the close-price column from a CSV file.
///
/// # Errors
/// - [`EngineError::Io`] when the file cannot be opened or read
/// - [`EngineError::Format`] when the header lacks a `Close` column, a cell
///   fails to parse, or a price is non-positive
pub fn read_close_series(path: &Path) -> EngineResult<Vec<f64>> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|e| EngineError::Io {
        path: display.clone(),
        reason: e.to_string(),
    })?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let header = match lines.next() {
        Some(Ok(line)) => line,
        Some(Err(e)) => {
            return Err(EngineError::Io {
                path: display,
                reason: e.to_string(),
            })
        }
        None => {
            return Err(EngineError::Format {
                line: 1,
                reason: "file is empty, expected a header row".to_string(),
            })
        }
    };

    let close_col = header
        .split(',')
        .position(|name| name.trim().eq_ignore_ascii_case("close"))
        .ok_or_else(|| EngineError::Format {
            line: 1,
            reason: format!("no Close column in header: {:?}", header),
        })?;

    let mut prices = Vec::new();
    for (idx, line) in lines.enumerate() {
        let row_no = idx + 2;
        let line = line.map_err(|e| EngineError::Io {
            path: display.clone(),
            reason: e.to_string(),
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let cell = line
            .split(',')
            .nth(close_col)
            .ok_or_else(|| EngineError::Format {
                line: row_no,
                reason: format!("row has no column {}", close_col + 1),
            })?;
        let price: f64 = cell.trim().parse().map_err(|_| EngineError::Format {
            line: row_no,
            reason: format!("cannot parse close price {:?}", cell.trim()),
        })?;
        if !price.is_finite() || price <= 0.0 {
            return Err(EngineError::Format {
                line: row_no,
                reason: format!("close price must be positive, got {}", price),
            });
        }
        prices.push(price);
    }

    Ok(prices)
}

/// Log returns ln(p_{i+1}/p_i) from a price series.
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|pair| (pair[1] / pair[0]).ln())
        .collect()
}
