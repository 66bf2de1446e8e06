//! # nekolc_core
//!
//! Token issuance, device signature checks and the revocation ledger for
//! the NekoLc server.

pub mod auth;
pub mod clock;
pub mod migrate;
pub mod models;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
