//! Domain model for properties (predios), taxpayers (contribuyentes) and
//! tax records (tributos).
//!
//! # Responsibility
//! - Define request/response shapes shared by services and callers.
//! - Own input validation rules that must hold before any mutation.
//!
//! # Invariants
//! - Wire names follow the municipal vocabulary (`codigo_catastral`,
//!   `deuda_total`, ...); Rust names stay descriptive.
//! - Monetary and percentage outputs are rounded with [`round2`] at the
//!   response boundary only.

pub mod property;
pub mod report;

/// Rounds to 2 decimal places (half away from zero).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
