//! HTTP API for the clinic front end.
//!
//! JSON routes under `/api/` for patients, medications and prescriptions,
//! PDF download of rendered prescriptions, and the static front end.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::app_router;
pub use server::{start_server, RunningServer};
pub use types::ApiContext;
