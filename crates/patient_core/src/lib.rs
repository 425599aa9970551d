//! Core domain logic for the patient registry.
//! This crate owns the patient invariants, the schema and its migrations.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::patient::{
    Patient, PatientDraft, PatientId, PatientValidationError, MAX_BIRTH_YEAR, MIN_BIRTH_YEAR,
};
pub use repo::patient_repo::{PatientRepository, RepoError, RepoResult, SqlitePatientRepository};
pub use service::patient_service::PatientService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
