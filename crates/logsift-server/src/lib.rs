//! LogSift Server
//!
//! Thin HTTP layer over the classification cascade:
//! - `POST /v1/classify` — one `{source, message}` pair
//! - `POST /v1/classify/file` — a `text/csv` table, returned annotated
//! - `GET /health`, `GET /metrics`
//!
//! Authentication is out of scope for the cascade itself and belongs to
//! whatever sits in front of this service.

pub mod config;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use state::AppState;
