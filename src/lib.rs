//! Traxx - signed stream keys for live broadcasts
//!
//! Issues and verifies user-scoped, time-bound stream keys, and serves them
//! over a small HTTP API for the Traxx web client.

pub mod auth;
pub mod server;

pub use auth::{ExpiryPolicy, SigningContext, StreamKey, StreamKeyAuthority, VerifyError};
pub use server::{create_router, run_http_server, AppState};
