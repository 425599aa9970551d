//! Patient HTTP routes.
//!
//! | route | service call |
//! |---|---|
//! | `GET /api/patients` | `list_patients` |
//! | `GET /api/patients/{id}` | `get_patient` |
//! | `POST /api/patients` | `create_patient` |
//! | `PUT /api/patients/{id}` | `update_patient` |
//! | `DELETE /api/patients/{id}` | `delete_patient` |

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use log::info;
use patient_core::{
    core_version, Patient, PatientDraft, PatientId, PatientService, RepoResult,
    SqlitePatientRepository,
};
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Builds the application router over a migrated state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/patients", get(list_patients).post(create_patient))
        .route(
            "/api/patients/{id}",
            get(get_patient).put(update_patient).delete(delete_patient),
        )
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: core_version(),
    })
}

async fn list_patients(State(state): State<AppState>) -> Result<Json<Vec<Patient>>, ApiError> {
    let patients = with_patient_service(&state, |service| service.list_patients()).await?;
    Ok(Json(patients))
}

async fn get_patient(
    State(state): State<AppState>,
    id: Result<Path<PatientId>, PathRejection>,
) -> Result<Json<Patient>, ApiError> {
    let id = patient_id(id)?;
    let patient = with_patient_service(&state, move |service| service.get_patient(id)).await?;
    Ok(Json(patient))
}

async fn create_patient(
    State(state): State<AppState>,
    body: Result<Json<PatientDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let draft = patient_draft(body)?;
    let patient =
        with_patient_service(&state, move |service| service.create_patient(&draft)).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

async fn update_patient(
    State(state): State<AppState>,
    id: Result<Path<PatientId>, PathRejection>,
    body: Result<Json<PatientDraft>, JsonRejection>,
) -> Result<Json<Patient>, ApiError> {
    let id = patient_id(id)?;
    let draft = patient_draft(body)?;
    let patient =
        with_patient_service(&state, move |service| service.update_patient(id, &draft)).await?;
    Ok(Json(patient))
}

async fn delete_patient(
    State(state): State<AppState>,
    id: Result<Path<PatientId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = patient_id(id)?;
    with_patient_service(&state, move |service| service.delete_patient(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn patient_id(id: Result<Path<PatientId>, PathRejection>) -> Result<PatientId, ApiError> {
    id.map(|Path(id)| id)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

fn patient_draft(body: Result<Json<PatientDraft>, JsonRejection>) -> Result<PatientDraft, ApiError> {
    body.map(|Json(draft)| draft)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

/// Runs one service call on the blocking pool against the shared connection.
async fn with_patient_service<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: for<'conn> FnOnce(&PatientService<SqlitePatientRepository<'conn>>) -> RepoResult<T>
        + Send
        + 'static,
{
    let conn = state.connection();
    tokio::task::spawn_blocking(move || {
        let guard = conn
            .lock()
            .map_err(|_| ApiError::internal("database connection lock poisoned"))?;
        let repo = SqlitePatientRepository::try_new(&guard)?;
        let service = PatientService::new(repo);
        op(&service).map_err(ApiError::from)
    })
    .await
    .map_err(|err| ApiError::internal(format!("storage task failed: {err}")))?
}

async fn log_request(req: Request, next: Next) -> Response {
    let started_at = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    info!(
        "event=http_request module=server method={} path={} status={} duration_ms={}",
        method,
        path,
        response.status().as_u16(),
        started_at.elapsed().as_millis()
    );
    response
}
