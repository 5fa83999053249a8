//! Logger setup for applications embedding kiln.
//!
//! The library itself only emits through the `log` facade; per-draw decisions
//! are logged at `trace`, resource lifetimes and activation changes at
//! `debug`.

mod init;

pub use init::{init_logging, LoggingConfig};
