//! HTTP surface of the ideation service

pub mod handlers;
pub mod models;
pub mod routes;

pub use handlers::{AppState, SERVICE_NAME};
pub use models::{error_codes, ApiError, IdeationRequest};
pub use routes::build_router;
