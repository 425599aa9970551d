//! Patient use-case service.
//!
//! # Responsibility
//! - Provide stable CRUD entry points for request-layer callers.
//! - Emit metadata-only log events for every mutation.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Log lines carry ids and error codes, never names or addresses.

use crate::model::patient::{Patient, PatientDraft, PatientId};
use crate::repo::patient_repo::{PatientRepository, RepoResult};
use log::{debug, info, warn};

/// Use-case service wrapper for patient CRUD operations.
pub struct PatientService<R: PatientRepository> {
    repo: R,
}

impl<R: PatientRepository> PatientService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a patient and returns it with its assigned id.
    pub fn create_patient(&self, draft: &PatientDraft) -> RepoResult<Patient> {
        let result = self.repo.create(draft);
        match &result {
            Ok(patient) => info!(
                "event=patient_create module=service status=ok id={}",
                patient.id
            ),
            Err(err) => warn!(
                "event=patient_create module=service status=error error_code={}",
                err.code()
            ),
        }
        result
    }

    /// Gets one patient by id.
    pub fn get_patient(&self, id: PatientId) -> RepoResult<Patient> {
        let result = self.repo.get(id);
        if let Err(err) = &result {
            debug!(
                "event=patient_get module=service status=error id={} error_code={}",
                id,
                err.code()
            );
        }
        result
    }

    /// Lists all patients in id order.
    pub fn list_patients(&self) -> RepoResult<Vec<Patient>> {
        let patients = self.repo.list()?;
        debug!(
            "event=patient_list module=service status=ok count={}",
            patients.len()
        );
        Ok(patients)
    }

    /// Replaces the writable fields of an existing patient.
    ///
    /// Returns repository-level not-found, validation and conflict errors
    /// unchanged.
    pub fn update_patient(&self, id: PatientId, draft: &PatientDraft) -> RepoResult<Patient> {
        let result = self.repo.update(id, draft);
        match &result {
            Ok(_) => info!("event=patient_update module=service status=ok id={}", id),
            Err(err) => warn!(
                "event=patient_update module=service status=error id={} error_code={}",
                id,
                err.code()
            ),
        }
        result
    }

    /// Deletes a patient by id.
    pub fn delete_patient(&self, id: PatientId) -> RepoResult<()> {
        let result = self.repo.delete(id);
        match &result {
            Ok(()) => info!("event=patient_delete module=service status=ok id={}", id),
            Err(err) => warn!(
                "event=patient_delete module=service status=error id={} error_code={}",
                id,
                err.code()
            ),
        }
        result
    }
}
