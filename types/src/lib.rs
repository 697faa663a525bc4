//! Fundamental types for the splitter ledger.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! peer identities (`Address`) and value amounts (`Amount`).

pub mod address;
pub mod amount;
pub mod error;

pub use address::Address;
pub use amount::Amount;
pub use error::TypesError;
