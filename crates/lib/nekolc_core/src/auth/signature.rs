//! Device signature verification with a bounded replay window.
//!
//! A device proves possession of the shared secret by sending
//! `hex(sha256(identifier ‖ timestamp ‖ secret))` together with the
//! identifier and the unix timestamp it signed.

use std::fmt;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::warn;

use super::constant_time_eq;
use crate::models::auth::DeviceSignatureAssertion;

/// Default replay window: 5 minutes either side of the server clock.
pub const DEFAULT_REPLAY_WINDOW_SECS: i64 = 300;

/// Why an assertion was refused. Logged, never shown to clients.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplayRejection {
    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("timestamp outside replay window (skew {skew}s)")]
    OutsideWindow { skew: i64 },
}

/// Checks device signature assertions against the shared secret.
#[derive(Clone)]
pub struct ReplayGuard {
    secret: Vec<u8>,
    window_secs: i64,
}

impl fmt::Debug for ReplayGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplayGuard")
            .field("window_secs", &self.window_secs)
            .finish_non_exhaustive()
    }
}

impl ReplayGuard {
    pub fn new(secret: &[u8]) -> Self {
        Self::with_window(secret, DEFAULT_REPLAY_WINDOW_SECS)
    }

    pub fn with_window(secret: &[u8], window_secs: i64) -> Self {
        Self {
            secret: secret.to_vec(),
            window_secs,
        }
    }

    pub fn window_secs(&self) -> i64 {
        self.window_secs
    }

    /// Signature a device must send for `identifier` at `timestamp`.
    pub fn expected_signature(&self, identifier: &str, timestamp: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(identifier.as_bytes());
        hasher.update(timestamp.to_string().as_bytes());
        hasher.update(&self.secret);
        format!("{:x}", hasher.finalize())
    }

    /// Check an assertion at `now`, reporting the rejection reason.
    pub fn check(
        &self,
        assertion: &DeviceSignatureAssertion,
        now: DateTime<Utc>,
    ) -> Result<(), ReplayRejection> {
        let expected = self.expected_signature(&assertion.identifier, assertion.timestamp);
        if !constant_time_eq(expected.as_bytes(), assertion.signature.as_bytes()) {
            return Err(ReplayRejection::SignatureMismatch);
        }

        let skew = now.timestamp().saturating_sub(assertion.timestamp);
        if skew.saturating_abs() > self.window_secs {
            return Err(ReplayRejection::OutsideWindow { skew });
        }
        Ok(())
    }

    /// `true` iff the signature matches and the timestamp is within the window.
    pub fn verify(&self, assertion: &DeviceSignatureAssertion, now: DateTime<Utc>) -> bool {
        match self.check(assertion, now) {
            Ok(()) => true,
            Err(reason) => {
                warn!(identifier = %assertion.identifier, %reason, "device assertion rejected");
                false
            }
        }
    }
}
