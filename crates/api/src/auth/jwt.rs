//! JWT issuance and verification
//!
//! Tokens are HS256-signed JWTs carrying the user id in `sub`. The signing
//! secret is handed to [`JwtManager::new`]; rotating it invalidates every
//! outstanding token.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// The only algorithm this service signs with or accepts
const EXPECTED_ALGORITHM: &str = "HS256";

/// Claims written into every issued token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
}

/// Claims as read back from an untrusted token; `sub` is checked by hand
#[derive(Debug, Deserialize)]
struct UnverifiedClaims {
    #[serde(default)]
    sub: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct UnverifiedHeader {
    alg: String,
}

/// Reasons a presented token is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("malformed token")]
    Malformed,
    #[error("unexpected signing algorithm")]
    AlgorithmMismatch,
    #[error("signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("required claim missing")]
    MissingClaim,
}

impl From<jsonwebtoken::errors::Error> for VerifyError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => VerifyError::BadSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                VerifyError::AlgorithmMismatch
            }
            ErrorKind::ExpiredSignature => VerifyError::Expired,
            ErrorKind::MissingRequiredClaim(_) => VerifyError::MissingClaim,
            _ => VerifyError::Malformed,
        }
    }
}

/// Failure while issuing a token
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("token expiry is out of range")]
    ExpiryOutOfRange,
}

/// Issues and verifies identity tokens with a shared HMAC secret
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry: Duration,
}

impl JwtManager {
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            expiry: Duration::seconds(expiry_hours.saturating_mul(3600)),
        }
    }

    /// Token lifetime applied by [`JwtManager::issue`]
    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Mint a token for `subject` valid from now until now + expiry
    pub fn issue(&self, subject: &str) -> Result<String, JwtError> {
        self.issue_at(subject, OffsetDateTime::now_utc())
    }

    pub(crate) fn issue_at(
        &self,
        subject: &str,
        issued_at: OffsetDateTime,
    ) -> Result<String, JwtError> {
        let expires_at = issued_at
            .checked_add(self.expiry)
            .ok_or(JwtError::ExpiryOutOfRange)?;

        let claims = Claims {
            sub: subject.to_string(),
            iat: issued_at.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    /// Validate a token and return its subject
    ///
    /// Checks run in a fixed order: structure, declared algorithm, signature,
    /// expiry, subject claim. The first failure is returned.
    pub fn verify(&self, token: &str) -> Result<String, VerifyError> {
        let header = inspect_header(token)?;
        if header.alg != EXPECTED_ALGORITHM {
            return Err(VerifyError::AlgorithmMismatch);
        }

        let data = decode::<UnverifiedClaims>(token, &self.decoding_key, &self.validation)?;

        match data.claims.sub {
            Some(serde_json::Value::String(sub)) => Ok(sub),
            _ => Err(VerifyError::MissingClaim),
        }
    }
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

/// Decode the header segment without trusting it
///
/// `jsonwebtoken` refuses to parse headers naming algorithms it does not
/// know (`none`, for one), which would hide an algorithm mismatch behind a
/// generic parse error.
fn inspect_header(token: &str) -> Result<UnverifiedHeader, VerifyError> {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(VerifyError::Malformed);
    };

    if header.is_empty() || payload.is_empty() {
        return Err(VerifyError::Malformed);
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| VerifyError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| VerifyError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret-key-that-is-32-bytes!";

    #[test]
    fn test_issue_and_verify_round_trip() {
        let manager = JwtManager::new(SECRET, 24);
        let token = manager.issue("user-123").unwrap();

        assert_eq!(token.split('.').count(), 3);
        assert_eq!(manager.verify(&token), Ok("user-123".to_string()));
    }

    #[test]
    fn test_issued_token_expires_after_configured_window() {
        let manager = JwtManager::new(SECRET, 24);
        let token = manager.issue("user-123").unwrap();

        let payload = token.split('.').nth(1).unwrap();
        let claims: Claims =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();

        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn test_issued_header_declares_hs256() {
        let manager = JwtManager::new(SECRET, 24);
        let token = manager.issue("user-123").unwrap();
        let header = inspect_header(&token).unwrap();
        assert_eq!(header.alg, "HS256");
    }

    #[test]
    fn test_verify_rejects_other_key() {
        let issuer = JwtManager::new(SECRET, 24);
        let verifier = JwtManager::new("a-completely-different-secret-key!!", 24);

        let token = issuer.issue("user-123").unwrap();
        assert_eq!(verifier.verify(&token), Err(VerifyError::BadSignature));
    }

    #[test]
    fn test_verify_rejects_expired() {
        let manager = JwtManager::new(SECRET, 24);
        let issued_at = OffsetDateTime::now_utc() - Duration::hours(25);
        let token = manager.issue_at("user-123", issued_at).unwrap();

        assert_eq!(manager.verify(&token), Err(VerifyError::Expired));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let manager = JwtManager::new(SECRET, 24);

        assert_eq!(manager.verify(""), Err(VerifyError::Malformed));
        assert_eq!(manager.verify("not-a-token"), Err(VerifyError::Malformed));
        assert_eq!(manager.verify("a.b"), Err(VerifyError::Malformed));
        assert_eq!(manager.verify("a.b.c.d"), Err(VerifyError::Malformed));
    }

    #[test]
    fn test_unrepresentable_expiry_is_an_error() {
        let manager = JwtManager::new(SECRET, i64::MAX);
        assert!(matches!(
            manager.issue("user-123"),
            Err(JwtError::ExpiryOutOfRange)
        ));

        let manager = JwtManager::new(SECRET, 100_000_000);
        assert!(matches!(
            manager.issue("user-123"),
            Err(JwtError::ExpiryOutOfRange)
        ));
    }

    #[test]
    fn test_debug_does_not_expose_secret() {
        let manager = JwtManager::new(SECRET, 24);
        let rendered = format!("{:?}", manager);
        assert!(!rendered.contains(SECRET));
    }
}
