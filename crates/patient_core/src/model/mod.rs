//! Domain model for the patient registry.
//!
//! # Responsibility
//! - Define the canonical `Patient` record and the caller-supplied draft shape.
//! - Hold the field constraints that every write path must enforce.
//!
//! # Invariants
//! - Every stored patient is identified by a store-assigned `PatientId`.
//! - Field constraints live here, not in the persistence layer.

pub mod patient;
