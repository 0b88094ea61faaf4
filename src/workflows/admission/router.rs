use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::ApplicantId;
use super::repository::{
    AdmissionRepository, ApplicantStatusView, NoticePublisher, RepositoryError,
};
use super::service::{AdmissionService, AdmissionServiceError, RegistrationForm};
use super::verification::{VerificationAction, VerificationError};

/// Router builder exposing HTTP endpoints for registration, the engine passes,
/// and the read-side views.
pub fn admission_router<R, N>(service: Arc<AdmissionService<R, N>>) -> Router
where
    R: AdmissionRepository + 'static,
    N: NoticePublisher + 'static,
{
    Router::new()
        .route("/api/v1/admissions/applicants", post(register_handler::<R, N>))
        .route(
            "/api/v1/admissions/applicants/:applicant_id",
            get(status_handler::<R, N>),
        )
        .route(
            "/api/v1/admissions/applicants/:applicant_id/verification",
            post(verification_handler::<R, N>),
        )
        .route("/api/v1/admissions/merit", post(merit_handler::<R, N>))
        .route("/api/v1/admissions/allocation", post(allocation_handler::<R, N>))
        .route("/api/v1/admissions/waiting", get(waiting_handler::<R, N>))
        .route("/api/v1/admissions/dashboard", get(dashboard_handler::<R, N>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct VerificationRequest {
    action: VerificationAction,
}

pub(crate) async fn register_handler<R, N>(
    State(service): State<Arc<AdmissionService<R, N>>>,
    axum::Json(form): axum::Json<RegistrationForm>,
) -> Response
where
    R: AdmissionRepository + 'static,
    N: NoticePublisher + 'static,
{
    match service.register(form) {
        Ok(applicant) => {
            let view = ApplicantStatusView::of(&applicant);
            (StatusCode::CREATED, axum::Json(view)).into_response()
        }
        Err(AdmissionServiceError::Registration(error)) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(AdmissionServiceError::Repository(RepositoryError::Conflict)) => {
            let payload = json!({ "error": "applicant already exists" });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn status_handler<R, N>(
    State(service): State<Arc<AdmissionService<R, N>>>,
    Path(applicant_id): Path<u64>,
) -> Response
where
    R: AdmissionRepository + 'static,
    N: NoticePublisher + 'static,
{
    let id = ApplicantId(applicant_id);
    match service.status(id) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(AdmissionServiceError::Repository(RepositoryError::NotFound)) => {
            not_found(id)
        }
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn verification_handler<R, N>(
    State(service): State<Arc<AdmissionService<R, N>>>,
    Path(applicant_id): Path<u64>,
    axum::Json(request): axum::Json<VerificationRequest>,
) -> Response
where
    R: AdmissionRepository + 'static,
    N: NoticePublisher + 'static,
{
    let id = ApplicantId(applicant_id);
    match service.verify(id, request.action) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(AdmissionServiceError::Verification(VerificationError::ApplicantNotFound(_))) => {
            not_found(id)
        }
        Err(AdmissionServiceError::Verification(
            error @ VerificationError::NotAwaitingVerification { .. },
        )) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn merit_handler<R, N>(
    State(service): State<Arc<AdmissionService<R, N>>>,
) -> Response
where
    R: AdmissionRepository + 'static,
    N: NoticePublisher + 'static,
{
    match service.generate_merit_list() {
        Ok(merit) => (StatusCode::OK, axum::Json(merit)).into_response(),
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn allocation_handler<R, N>(
    State(service): State<Arc<AdmissionService<R, N>>>,
) -> Response
where
    R: AdmissionRepository + 'static,
    N: NoticePublisher + 'static,
{
    match service.allocate() {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn waiting_handler<R, N>(
    State(service): State<Arc<AdmissionService<R, N>>>,
) -> Response
where
    R: AdmissionRepository + 'static,
    N: NoticePublisher + 'static,
{
    match service.waiting_list() {
        Ok(waiting) => (StatusCode::OK, axum::Json(waiting)).into_response(),
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn dashboard_handler<R, N>(
    State(service): State<Arc<AdmissionService<R, N>>>,
) -> Response
where
    R: AdmissionRepository + 'static,
    N: NoticePublisher + 'static,
{
    match service.dashboard() {
        Ok(dashboard) => (StatusCode::OK, axum::Json(dashboard)).into_response(),
        Err(other) => internal_error(other),
    }
}

fn not_found(id: ApplicantId) -> Response {
    let payload = json!({ "error": format!("applicant {id} not found") });
    (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
}

fn internal_error(error: AdmissionServiceError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
