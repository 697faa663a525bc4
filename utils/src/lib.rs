//! Shared utilities for the splitter workspace.

pub mod logging;

pub use logging::init_tracing;
