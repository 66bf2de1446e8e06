//! Token and credential logic.
//!
//! Provides claims encoding, device signature checks, token minting and
//! credential verification shared by `nekolc_api` and the server binary.
//! None of these components touch storage.

pub mod claims;
pub mod credentials;
pub mod issuer;
pub mod signature;

pub use claims::{ClaimsCodec, ClaimsError, content_hash};
pub use credentials::{CredentialBackend, StaticCredentials};
pub use issuer::{IssueError, IssuedPair, IssuedToken, TokenIssuer};
pub use signature::{ReplayGuard, ReplayRejection};

/// Compare two byte slices without short-circuiting on the first difference.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
