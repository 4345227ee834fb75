mod dto;
mod error;
mod library;
mod router;
mod routes;
mod state;

pub use dto::{ChatRequest, ErrorResponse, SmtpSettings};
pub use error::{ApiError, ServerError};
pub use router::{build_router, serve, serve_listener};
pub use state::AppState;

/// Header carrying the caller's account id. Not authenticated.
pub const ACCOUNT_HEADER: &str = "x-account-id";
