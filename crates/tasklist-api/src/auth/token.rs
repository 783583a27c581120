//! Bearer token issuance and verification
//!
//! The [`TokenAuthority`] owns the RSA keypair. It binds a user id and an
//! expiry into a signed-then-encrypted token and turns such tokens back into
//! the user id. Every verification failure collapses into
//! [`TokenError::VerificationFailed`]; the underlying reason is only logged.
//!
//! Build one authority at startup and share it behind an `Arc`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use super::codec::{RsaTokenCodec, TokenCodec};
use super::keys::{KeyError, RsaKeyPair};

/// Claim set carried by every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer
    pub iss: String,
    /// Subject - user ID
    pub sub: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
}

impl Claims {
    /// A token is live strictly before `exp`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// Token authority errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid token authority configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("Failed to read private key {path}: {source}")]
    KeyUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse private key: {0}")]
    KeyUnparseable(String),

    #[error("Token subject must not be empty")]
    InvalidSubject,

    #[error("Failed to create token: {0}")]
    TokenCreationFailed(String),

    #[error("Token verification failed")]
    VerificationFailed,
}

impl From<KeyError> for TokenError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::Unreadable { path, source } => TokenError::KeyUnreadable { path, source },
            KeyError::Unparseable(msg) => TokenError::KeyUnparseable(msg),
        }
    }
}

/// Issues and verifies bearer tokens for a single issuer and keypair
pub struct TokenAuthority {
    issuer: String,
    codec: Box<dyn TokenCodec>,
    validate_issuer: bool,
}

impl TokenAuthority {
    /// Load the PEM private key at `key_path`
    ///
    /// Empty arguments are rejected before any file access.
    pub fn new(issuer: impl Into<String>, key_path: impl AsRef<Path>) -> Result<Self, TokenError> {
        let issuer = issuer.into();
        let key_path = key_path.as_ref();
        if issuer.is_empty() {
            return Err(TokenError::InvalidConfig("issuer is empty"));
        }
        if key_path.as_os_str().is_empty() {
            return Err(TokenError::InvalidConfig("private key path is empty"));
        }

        let keys = RsaKeyPair::from_pem_file(key_path)?;
        let authority = Self::with_codec(issuer, RsaTokenCodec::from_key_pair(&keys)?)?;

        info!(
            issuer = %authority.issuer,
            key_path = %key_path.display(),
            key_bits = keys.bits(),
            "Token authority initialized"
        );
        Ok(authority)
    }

    /// Build from PEM text already in memory
    pub fn from_pem(issuer: impl Into<String>, pem: &str) -> Result<Self, TokenError> {
        let issuer = issuer.into();
        if issuer.is_empty() {
            return Err(TokenError::InvalidConfig("issuer is empty"));
        }
        if pem.trim().is_empty() {
            return Err(TokenError::InvalidConfig("private key is empty"));
        }

        let keys = RsaKeyPair::from_pem(pem)?;
        Self::with_codec(issuer, RsaTokenCodec::from_key_pair(&keys)?)
    }

    /// Use a custom codec
    pub fn with_codec(
        issuer: impl Into<String>,
        codec: impl TokenCodec + 'static,
    ) -> Result<Self, TokenError> {
        let issuer = issuer.into();
        if issuer.is_empty() {
            return Err(TokenError::InvalidConfig("issuer is empty"));
        }

        Ok(Self {
            issuer,
            codec: Box::new(codec),
            validate_issuer: false,
        })
    }

    /// Also reject tokens whose `iss` differs from this authority's issuer.
    /// Off by default.
    pub fn require_issuer(mut self, enabled: bool) -> Self {
        self.validate_issuer = enabled;
        self
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Issue a token for `subject` valid for `duration`
    ///
    /// A zero or negative duration yields a token that is already expired.
    pub fn issue(&self, subject: &str, duration: Duration) -> Result<String, TokenError> {
        if subject.is_empty() {
            return Err(TokenError::InvalidSubject);
        }

        let now = Utc::now();
        let out_of_range = || TokenError::TokenCreationFailed("expiry out of range".to_string());
        now.checked_add_signed(duration).ok_or_else(out_of_range)?;

        let iat = now.timestamp();
        let exp = iat
            .checked_add(whole_seconds_ceil(duration))
            .ok_or_else(out_of_range)?;

        let claims = Claims {
            iss: self.issuer.clone(),
            sub: subject.to_string(),
            iat,
            exp,
        };

        let token = self
            .codec
            .encode(&claims)
            .map_err(|e| TokenError::TokenCreationFailed(e.to_string()))?;

        debug!(sub = %claims.sub, exp = claims.exp, "Issued token");
        Ok(token)
    }

    /// Verify a token and return its claims
    pub fn verify_claims(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.codec.decode(token).map_err(|e| {
            debug!(error = %e, "Token rejected");
            TokenError::VerificationFailed
        })?;

        if claims.is_expired_at(Utc::now()) {
            debug!(sub = %claims.sub, exp = claims.exp, "Token rejected: expired");
            return Err(TokenError::VerificationFailed);
        }
        if self.validate_issuer && claims.iss != self.issuer {
            debug!(iss = %claims.iss, "Token rejected: foreign issuer");
            return Err(TokenError::VerificationFailed);
        }
        if claims.sub.is_empty() {
            debug!("Token rejected: empty subject");
            return Err(TokenError::VerificationFailed);
        }

        Ok(claims)
    }

    /// Verify a token and return the user id it was issued for
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        self.verify_claims(token).map(|claims| claims.sub)
    }
}

/// Round up to whole seconds so a positive lifetime never yields `exp == iat`.
/// Non-positive lifetimes round toward zero and stay expired.
fn whole_seconds_ceil(duration: Duration) -> i64 {
    let secs = duration.num_seconds();
    if duration > Duration::seconds(secs) {
        secs + 1
    } else {
        secs
    }
}

impl std::fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("issuer", &self.issuer)
            .field("validate_issuer", &self.validate_issuer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::codec::CodecError;
    use crate::auth::keys::test_keys::{fixture, EC_PEM, FOREIGN_PKCS8_PEM, PKCS1_PEM};

    fn authority() -> TokenAuthority {
        TokenAuthority::from_pem("issuer", PKCS1_PEM).unwrap()
    }

    #[test]
    fn test_new_from_file() {
        let authority = TokenAuthority::new("issuer", fixture("id_rsa")).unwrap();
        assert_eq!(authority.issuer(), "issuer");
    }

    #[test]
    fn test_new_invalid_config() {
        assert!(matches!(
            TokenAuthority::new("", fixture("id_rsa")),
            Err(TokenError::InvalidConfig(_))
        ));
        assert!(matches!(
            TokenAuthority::new("issuer", ""),
            Err(TokenError::InvalidConfig(_))
        ));
        // Empty issuer wins even when the path is bogus: no I/O attempted
        assert!(matches!(
            TokenAuthority::new("", "/nonexistent/key"),
            Err(TokenError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_new_missing_file() {
        let result = TokenAuthority::new("issuer", fixture("undefined"));
        assert!(matches!(result, Err(TokenError::KeyUnreadable { .. })));
    }

    #[test]
    fn test_new_not_pem() {
        let result = TokenAuthority::new("issuer", fixture("id_rsa.dummy"));
        assert!(matches!(result, Err(TokenError::KeyUnparseable(_))));
    }

    #[test]
    fn test_new_wrong_key_type() {
        let result = TokenAuthority::new("issuer", fixture("ec_key.pem"));
        assert!(matches!(result, Err(TokenError::KeyUnparseable(_))));

        let result = TokenAuthority::from_pem("issuer", EC_PEM);
        assert!(matches!(result, Err(TokenError::KeyUnparseable(_))));
    }

    #[test]
    fn test_from_pem_empty() {
        assert!(matches!(
            TokenAuthority::from_pem("issuer", "  \n"),
            Err(TokenError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_issue_and_verify() {
        let authority = authority();
        let token = authority.issue("uid", Duration::hours(1)).unwrap();

        assert!(!token.contains("uid"));
        assert_eq!(authority.verify(&token).unwrap(), "uid");
    }

    #[test]
    fn test_claims_contents() {
        let authority = authority();
        let token = authority.issue("uid", Duration::minutes(5)).unwrap();
        let claims = authority.verify_claims(&token).unwrap();

        assert_eq!(claims.iss, "issuer");
        assert_eq!(claims.sub, "uid");
        assert_eq!(claims.exp - claims.iat, 300);
    }

    #[test]
    fn test_verify_is_repeatable() {
        let authority = authority();
        let token = authority.issue("uid", Duration::hours(1)).unwrap();

        assert_eq!(authority.verify(&token).unwrap(), "uid");
        assert_eq!(authority.verify(&token).unwrap(), "uid");
    }

    #[test]
    fn test_tokens_are_unique() {
        let authority = authority();
        let a = authority.issue("uid", Duration::hours(1)).unwrap();
        let b = authority.issue("uid", Duration::hours(1)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_issue_empty_subject() {
        let result = authority().issue("", Duration::hours(1));
        assert!(matches!(result, Err(TokenError::InvalidSubject)));
    }

    #[test]
    fn test_non_positive_duration_yields_expired_token() {
        let authority = authority();
        for duration in [Duration::hours(-1), Duration::seconds(-1), Duration::zero()] {
            let token = authority.issue("uid", duration).unwrap();
            assert!(
                matches!(authority.verify(&token), Err(TokenError::VerificationFailed)),
                "duration {duration} should produce an expired token"
            );
        }
    }

    #[test]
    fn test_subsecond_duration_roundtrip() {
        let authority = authority();
        // Start early in a second so issue and verify share it
        while Utc::now().timestamp_subsec_millis() > 100 {
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        for millis in [1, 10, 100, 500, 999] {
            let token = authority
                .issue("uid", Duration::milliseconds(millis))
                .unwrap();
            assert_eq!(
                authority.verify(&token).unwrap(),
                "uid",
                "{millis}ms token should verify right after issuance"
            );
        }
    }

    #[test]
    fn test_whole_seconds_ceil() {
        assert_eq!(whole_seconds_ceil(Duration::milliseconds(1)), 1);
        assert_eq!(whole_seconds_ceil(Duration::milliseconds(1500)), 2);
        assert_eq!(whole_seconds_ceil(Duration::seconds(300)), 300);
        assert_eq!(whole_seconds_ceil(Duration::zero()), 0);
        assert_eq!(whole_seconds_ceil(Duration::milliseconds(-1)), 0);
        assert_eq!(whole_seconds_ceil(Duration::milliseconds(-1500)), -1);
    }

    #[test]
    fn test_issue_overflowing_duration() {
        let result = authority().issue("uid", Duration::MAX);
        assert!(matches!(result, Err(TokenError::TokenCreationFailed(_))));
    }

    #[test]
    fn test_verify_garbage() {
        let authority = authority();
        for token in ["", "invalid.token.here", "a.b.c.d.e", "Bearer", "\u{0}"] {
            assert!(
                matches!(authority.verify(token), Err(TokenError::VerificationFailed)),
                "token: {token:?}"
            );
        }
    }

    #[test]
    fn test_foreign_keypair_rejected() {
        let ours = authority();
        let theirs = TokenAuthority::from_pem("issuer", FOREIGN_PKCS8_PEM).unwrap();

        let token = theirs.issue("uid", Duration::hours(1)).unwrap();
        assert!(matches!(
            ours.verify(&token),
            Err(TokenError::VerificationFailed)
        ));
    }

    #[test]
    fn test_issuer_not_checked_by_default() {
        let issuing = TokenAuthority::from_pem("other-issuer", PKCS1_PEM).unwrap();
        let verifying = authority();

        let token = issuing.issue("uid", Duration::hours(1)).unwrap();
        assert_eq!(verifying.verify(&token).unwrap(), "uid");
    }

    #[test]
    fn test_issuer_checked_when_required() {
        let issuing = TokenAuthority::from_pem("other-issuer", PKCS1_PEM).unwrap();
        let verifying = authority().require_issuer(true);

        let foreign = issuing.issue("uid", Duration::hours(1)).unwrap();
        assert!(matches!(
            verifying.verify(&foreign),
            Err(TokenError::VerificationFailed)
        ));

        let own = verifying.issue("uid", Duration::hours(1)).unwrap();
        assert_eq!(verifying.verify(&own).unwrap(), "uid");
    }

    struct FailingCodec;

    impl TokenCodec for FailingCodec {
        fn encode(&self, _claims: &Claims) -> Result<String, CodecError> {
            Err(CodecError::Sign("hardware token unplugged".to_string()))
        }

        fn decode(&self, _token: &str) -> Result<Claims, CodecError> {
            Err(CodecError::Decrypt("no key".to_string()))
        }
    }

    #[test]
    fn test_codec_failure_surfaces_as_creation_failed() {
        let authority = TokenAuthority::with_codec("issuer", FailingCodec).unwrap();
        assert!(matches!(
            authority.issue("uid", Duration::hours(1)),
            Err(TokenError::TokenCreationFailed(_))
        ));
        assert!(matches!(
            authority.verify("anything"),
            Err(TokenError::VerificationFailed)
        ));
    }

    #[test]
    fn test_is_expired_at() {
        let claims = Claims {
            iss: "issuer".to_string(),
            sub: "uid".to_string(),
            iat: 100,
            exp: 200,
        };
        let at = |secs| DateTime::<Utc>::from_timestamp(secs, 0).unwrap();

        assert!(!claims.is_expired_at(at(199)));
        assert!(claims.is_expired_at(at(200)));
        assert!(claims.is_expired_at(at(201)));
    }
}
