//! Nullable infrastructure for deterministic testing.
//!
//! The ledger's only external dependency is the host that moves value out
//! (`ValueTransfer`). This crate provides a test-friendly implementation that:
//! - Records every payout instead of moving anything
//! - Can be told to reject payouts, per recipient or globally
//!
//! Usage: pass a `NullTransfer` wherever the ledger expects a transfer host.

pub mod transfer;

pub use transfer::NullTransfer;
