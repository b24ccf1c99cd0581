//! Issuing and verifying stream keys
//!
//! Verification runs in a fixed order and stops at the first failure:
//! format, subject, freshness, signature.

use crate::auth::context::SigningContext;
use crate::auth::stream_key::{signed_payload, StreamKey};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

/// Why a key was rejected. For logs only, never for network callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("malformed stream key")]
    Malformed,

    #[error("stream key belongs to subject {actual}, expected {expected}")]
    SubjectMismatch { expected: u64, actual: u64 },

    #[error("stream key expired: age {age}s exceeds {max_age}s")]
    Expired { age: u64, max_age: u64 },

    #[error("stream key issued {ahead}s in the future")]
    NotYetValid { ahead: u64 },

    #[error("stream key signature mismatch")]
    BadSignature,
}

impl VerifyError {
    /// Short label for structured logs
    pub fn reason(&self) -> &'static str {
        match self {
            VerifyError::Malformed => "format",
            VerifyError::SubjectMismatch { .. } => "subject-mismatch",
            VerifyError::Expired { .. } => "expired",
            VerifyError::NotYetValid { .. } => "not-yet-valid",
            VerifyError::BadSignature => "bad-signature",
        }
    }
}

/// Current wall-clock time in Unix seconds
pub fn unix_now() -> u64 {
    unix_seconds(SystemTime::now())
}

/// Seconds since the epoch; a time before the epoch counts as 0
fn unix_seconds(time: SystemTime) -> u64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs(),
        Err(e) => {
            warn!(
                behind_secs = e.duration().as_secs(),
                "System clock is before the Unix epoch; using 0"
            );
            0
        }
    }
}

/// Stateless issuer and verifier of stream keys.
///
/// Holds only the immutable [`SigningContext`], so one instance can be shared
/// across any number of tasks without locking.
#[derive(Debug, Clone)]
pub struct StreamKeyAuthority {
    context: SigningContext,
}

impl StreamKeyAuthority {
    pub fn new(context: SigningContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &SigningContext {
        &self.context
    }

    /// Issue a key for a positive `subject_id`, stamped with the current time
    pub fn issue(&self, subject_id: u64) -> StreamKey {
        self.issue_at(subject_id, unix_now())
    }

    /// Issue a key with an explicit timestamp.
    ///
    /// `subject_id` must be positive. A key issued for 0 fails the format
    /// check and never verifies.
    pub fn issue_at(&self, subject_id: u64, issued_at: u64) -> StreamKey {
        let signature = self.sign(subject_id, issued_at);
        StreamKey::new(subject_id, issued_at, signature)
    }

    /// Verify `token` for `expected_subject` using the configured max age
    pub fn verify(&self, token: &str, expected_subject: u64) -> bool {
        self.verify_with_max_age(token, expected_subject, self.context.expiry().max_age)
    }

    /// Verify `token` for `expected_subject` with an explicit max age.
    ///
    /// The rejection reason is logged at debug level and otherwise discarded.
    pub fn verify_with_max_age(&self, token: &str, expected_subject: u64, max_age: Duration) -> bool {
        match self.check(token, expected_subject, max_age, unix_now()) {
            Ok(_) => true,
            Err(e) => {
                debug!(
                    expected_subject,
                    reason = e.reason(),
                    error = %e,
                    "Stream key rejected"
                );
                false
            }
        }
    }

    /// Run the full pipeline against an explicit `now`, reporting the first failure
    pub fn check(
        &self,
        token: &str,
        expected_subject: u64,
        max_age: Duration,
        now: u64,
    ) -> Result<StreamKey, VerifyError> {
        let key: StreamKey = token.parse().map_err(|_| VerifyError::Malformed)?;

        if key.subject_id() != expected_subject {
            return Err(VerifyError::SubjectMismatch {
                expected: expected_subject,
                actual: key.subject_id(),
            });
        }

        self.check_freshness(key.issued_at(), max_age, now)?;

        // Recompute from the parsed fields, never trust the supplied payload
        let expected_sig = self.sign(key.subject_id(), key.issued_at());
        if !bool::from(expected_sig.as_bytes().ct_eq(key.signature().as_bytes())) {
            return Err(VerifyError::BadSignature);
        }

        Ok(key)
    }

    fn check_freshness(&self, issued_at: u64, max_age: Duration, now: u64) -> Result<(), VerifyError> {
        if issued_at <= now {
            let age = now - issued_at;
            let max_age = max_age.as_secs();
            if age > max_age {
                return Err(VerifyError::Expired { age, max_age });
            }
        } else {
            let ahead = issued_at - now;
            if ahead > self.context.expiry().clock_skew.as_secs() {
                return Err(VerifyError::NotYetValid { ahead });
            }
        }
        Ok(())
    }

    fn sign(&self, subject_id: u64, issued_at: u64) -> String {
        let mut mac =
            HmacSha256::new_from_slice(self.context.secret()).expect("HMAC can take key of any size");
        mac.update(signed_payload(subject_id, issued_at).as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }
}
