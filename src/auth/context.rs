//! Signing configuration, loaded once at startup

use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Development-only secret, used only when explicitly allowed
const FALLBACK_SECRET: &str = "traxx-development-stream-key-secret";

/// Default key lifetime: 24 hours
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Default tolerance for keys stamped slightly in the future
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no stream key secret configured (set STREAM_KEY_SECRET, or opt in to the insecure development secret)")]
    MissingSecret,
}

/// How long a key stays valid, and how far in the future it may be stamped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    pub max_age: Duration,
    pub clock_skew: Duration,
}

impl ExpiryPolicy {
    pub fn new(max_age: Duration, clock_skew: Duration) -> Self {
        Self { max_age, clock_skew }
    }
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AGE, DEFAULT_CLOCK_SKEW)
    }
}

/// Secret material plus expiry policy. Immutable once built.
#[derive(Clone)]
pub struct SigningContext {
    secret: Vec<u8>,
    expiry: ExpiryPolicy,
    insecure: bool,
}

impl SigningContext {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            expiry: ExpiryPolicy::default(),
            insecure: false,
        }
    }

    /// Build the context from an optionally configured secret.
    ///
    /// An empty secret counts as missing. Without a secret startup fails,
    /// unless `allow_insecure` opts in to the built-in development secret.
    pub fn resolve(secret: Option<String>, allow_insecure: bool) -> Result<Self, ConfigError> {
        match secret.filter(|s| !s.is_empty()) {
            Some(secret) => Ok(Self::new(secret)),
            None if allow_insecure => {
                warn!(
                    "STREAM_KEY_SECRET is not set; using the built-in development secret. \
                     Stream keys issued by this process can be forged by anyone. \
                     Never run like this in production."
                );
                Ok(Self {
                    insecure: true,
                    ..Self::new(FALLBACK_SECRET)
                })
            }
            None => Err(ConfigError::MissingSecret),
        }
    }

    pub fn with_expiry(mut self, expiry: ExpiryPolicy) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn expiry(&self) -> ExpiryPolicy {
        self.expiry
    }

    /// True when running on the development fallback secret
    pub fn is_insecure(&self) -> bool {
        self.insecure
    }

    pub(crate) fn secret(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for SigningContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningContext")
            .field("secret", &"[REDACTED]")
            .field("expiry", &self.expiry)
            .field("insecure", &self.insecure)
            .finish()
    }
}
