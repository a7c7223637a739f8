//! HTTP surface of the order service

pub mod error_response;
pub mod routes;

pub use error_response::{ApiError, ErrorResponse, REQUEST_ID_HEADER};
pub use routes::{router, AppState};
