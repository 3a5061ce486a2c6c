//! HTTP front door for echodb
//!
//! Thin boundary over `MessageStore`: the four `/api/messages` endpoints
//! plus static serving of the bundled front-end. All validation of caller
//! input (empty text, malformed ids) happens here, not in the store.

mod config;
mod errors;
mod routes;
mod server;

pub use config::HttpConfig;
pub use errors::{ApiError, ApiResult};
pub use routes::{api_routes, AppState};
pub use server::HttpServer;
