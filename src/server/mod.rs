//! HTTP service for issuing and validating stream keys

mod http;
mod identity;

pub use http::{create_router, run_http_server, AppState, IssueResponse, ValidateRequest, ValidateResponse};
pub use identity::{CurrentUser, USER_ID_HEADER};
