//! HTTP request layer for the patient registry.
//!
//! # Responsibility
//! - Map HTTP verbs on `/api/patients` to patient service calls.
//! - Translate repository errors into JSON error responses.
//!
//! # Invariants
//! - The router is only built from a state whose database is migrated.
//! - Blocking SQLite work never runs on async worker threads.

pub mod api;
pub mod error;
pub mod state;

pub use api::router;
pub use error::ApiError;
pub use state::AppState;
