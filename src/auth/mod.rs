//! Stream key authentication
//!
//! A stream key is a stateless capability: `{subject_id}:{issued_at}:{signature}`,
//! signed with HMAC-SHA256 over the first two fields. Verification needs the
//! shared secret and the subject the caller claims to be, nothing else.
//!
//! Keys cannot be revoked before they expire.

mod authority;
mod context;
mod stream_key;

pub use authority::{unix_now, StreamKeyAuthority, VerifyError};
pub use context::{ConfigError, ExpiryPolicy, SigningContext, DEFAULT_CLOCK_SKEW, DEFAULT_MAX_AGE};
pub use stream_key::{StreamKey, StreamKeyError, SEPARATOR};
