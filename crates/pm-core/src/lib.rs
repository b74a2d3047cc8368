//! # pm-core
//!
//! Core types and error definitions for the property Monte Carlo engine.
//!
//! This crate provides the foundational building blocks shared across all
//! other crates in the workspace: scalar type aliases, the error hierarchy
//! with its `ensure!` / `ensure_config!` / `fail!` macros, and the
//! cooperative [`CancellationToken`] used by the simulation orchestrator.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Public modules ───────────────────────────────────────────────────────────

/// Cooperative cancellation of long-running work.
pub mod cancellation;

/// Error types and the `ensure!` / `ensure_config!` / `fail!` macros.
pub mod errors;

// ── Primitive type aliases ────────────────────────────────────────────────────

/// Floating-point type used throughout the workspace.
pub type Real = f64;

/// A rate expressed as a decimal (e.g. 0.05 = 5 %).
pub type Rate = Real;

/// A monetary amount in the property's currency.
pub type Amount = Real;

/// Alias used for counts, sizes, and indices.
pub type Size = usize;

/// A one-based projection year (year 1 is the first year after purchase).
pub type Year = u32;

// ── Re-exports for convenience ────────────────────────────────────────────────

pub use cancellation::CancellationToken;
pub use errors::{Error, Result};
