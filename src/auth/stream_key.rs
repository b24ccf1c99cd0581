//! Stream key value type and wire format
//!
//! Wire form: `{subject_id}:{issued_at}:{signature}`
//! - `subject_id` : positive integer, the broadcaster the key is scoped to
//! - `issued_at`  : Unix seconds at issuance
//! - `signature`  : base64url (no padding) HMAC-SHA256 over `{subject_id}:{issued_at}`

use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Field separator in the serialized form
pub const SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamKeyError {
    #[error("invalid stream key format")]
    InvalidFormat,
}

/// A parsed stream key.
///
/// Keys are bearer capabilities: there is no revocation, a leaked key stays
/// usable until it expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamKey {
    subject_id: u64,
    issued_at: u64,
    signature: String,
}

impl StreamKey {
    pub(crate) fn new(subject_id: u64, issued_at: u64, signature: String) -> Self {
        Self {
            subject_id,
            issued_at,
            signature,
        }
    }

    /// Signature-free structural check.
    ///
    /// Uses the same parser as verification, so a `false` here always means
    /// verification fails at its first step.
    pub fn has_valid_format(token: &str) -> bool {
        token.parse::<StreamKey>().is_ok()
    }

    pub fn subject_id(&self) -> u64 {
        self.subject_id
    }

    pub fn issued_at(&self) -> u64 {
        self.issued_at
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Unix second after which the key is stale under `max_age`
    pub fn expires_at(&self, max_age: Duration) -> u64 {
        self.issued_at.saturating_add(max_age.as_secs())
    }

    /// The bytes covered by the signature
    pub fn signed_payload(&self) -> String {
        signed_payload(self.subject_id, self.issued_at)
    }
}

pub(crate) fn signed_payload(subject_id: u64, issued_at: u64) -> String {
    format!("{}{}{}", subject_id, SEPARATOR, issued_at)
}

/// Strict decimal parse: ASCII digits only, no sign, no whitespace
fn parse_decimal(field: &str) -> Result<u64, StreamKeyError> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(StreamKeyError::InvalidFormat);
    }
    field.parse().map_err(|_| StreamKeyError::InvalidFormat)
}

impl FromStr for StreamKey {
    type Err = StreamKeyError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = token.split(SEPARATOR).collect();

        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(StreamKeyError::InvalidFormat);
        }

        let subject_id = parse_decimal(parts[0])?;
        let issued_at = parse_decimal(parts[1])?;

        if subject_id == 0 {
            return Err(StreamKeyError::InvalidFormat);
        }

        Ok(Self::new(subject_id, issued_at, parts[2].to_string()))
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}{}",
            self.subject_id, SEPARATOR, self.issued_at, SEPARATOR, self.signature
        )
    }
}
