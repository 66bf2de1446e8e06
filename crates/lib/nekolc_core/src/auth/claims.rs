//! JWT encoding and verification of token claims.

use std::fmt;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, crypto, decode, decode_header,
    encode,
};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::models::auth::{TOKEN_ISSUER, TokenClaims};

/// Algorithm used for every token this server mints.
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Symmetric algorithms accepted on decode. Anything else is a downgrade attempt.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Claims codec errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimsError {
    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("unsupported token algorithm")]
    UnsupportedAlgorithm,

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

/// Encodes and verifies HS256 tokens with a shared secret.
#[derive(Clone)]
pub struct ClaimsCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for ClaimsCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimsCodec").finish_non_exhaustive()
    }
}

impl ClaimsCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        // Expiry is compared by the caller against its own clock.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.set_issuer(&[TOKEN_ISSUER]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Serialize and sign `claims`. Deterministic for identical claims and secret.
    pub fn encode(&self, claims: &TokenClaims) -> Result<String, ClaimsError> {
        encode(&Header::new(SIGNING_ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| ClaimsError::Encoding(format!("jwt encode: {e}")))
    }

    /// Verify `token` and return its claims. Expiry is not checked here.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, ClaimsError> {
        if token.split('.').count() != 3 {
            return Err(ClaimsError::Malformed("expected three segments".into()));
        }

        let claims = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| self.classify(token, e.into_kind()))?;

        if claims.exp <= claims.iat {
            return Err(ClaimsError::Malformed("expiry precedes issuance".into()));
        }
        Ok(claims)
    }

    /// Sort a decode failure into the three rejection classes.
    ///
    /// Content errors only count as `Malformed` when the signature itself
    /// verifies; otherwise the token was tampered with.
    fn classify(&self, token: &str, kind: ErrorKind) -> ClaimsError {
        match kind {
            ErrorKind::InvalidSignature => ClaimsError::InvalidSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::MissingAlgorithm => {
                ClaimsError::UnsupportedAlgorithm
            }
            other if self.signature_matches(token) => {
                ClaimsError::Malformed(format!("{other:?}"))
            }
            _ => ClaimsError::InvalidSignature,
        }
    }

    fn signature_matches(&self, token: &str) -> bool {
        let Some((message, signature)) = token.rsplit_once('.') else {
            return false;
        };
        let algorithm = decode_header(token)
            .ok()
            .map(|h| h.alg)
            .filter(|alg| ACCEPTED_ALGORITHMS.contains(alg))
            .unwrap_or(SIGNING_ALGORITHM);
        crypto::verify(signature, message.as_bytes(), &self.decoding_key, algorithm)
            .unwrap_or(false)
    }
}

/// SHA-256 hash of the raw token text, used as the revocation store key.
pub fn content_hash(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
