use super::common::*;
use crate::workflows::admission::domain::Category;
use crate::workflows::admission::router::admission_router;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn build_router() -> (
    axum::Router,
    Arc<
        crate::workflows::admission::service::AdmissionService<
            crate::workflows::admission::repository::MemoryRepository,
            MemoryNotices,
        >,
    >,
) {
    let (service, _, _) = build_service(campus());
    let service = Arc::new(service);
    (admission_router(service.clone()), service)
}

async fn read_json_body(response: Response) -> Value {
    let body = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

fn post_json(uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_vec(payload).expect("serialize payload"),
        ))
        .expect("request")
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn registration_payload() -> Value {
    json!({
        "name": "Asha Verma",
        "age": 18,
        "qualifying_score": 92.0,
        "entrance_score": 88.0,
        "preferences": ["CS"],
        "category": "General",
    })
}

#[tokio::test]
async fn post_applicants_returns_created_view() {
    let (router, _) = build_router();

    let response = router
        .oneshot(post_json("/api/v1/admissions/applicants", &registration_payload()))
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert!(payload.get("applicant_id").is_some());
    assert_eq!(payload.get("status"), Some(&json!("Applied")));
    assert!(payload.get("rank").is_none());
}

#[tokio::test]
async fn post_applicants_rejects_invalid_forms() {
    let (router, _) = build_router();
    let mut payload = registration_payload();
    payload["age"] = json!(12);

    let response = router
        .oneshot(post_json("/api/v1/admissions/applicants", &payload))
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert!(payload
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .contains("at least 16"));
}

#[tokio::test]
async fn get_applicant_returns_not_found_for_unknown_ids() {
    let (router, _) = build_router();

    let response = router
        .oneshot(get_request("/api/v1/admissions/applicants/424242"))
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert!(payload
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .contains("not found"));
}

#[tokio::test]
async fn merit_and_allocation_endpoints_run_the_pipeline() {
    let (router, service) = build_router();
    let applicant = service
        .register(registration("Asha", 18, 92.0, 88.0, &["CS"], Category::General))
        .expect("registration succeeds");

    let response = router
        .clone()
        .oneshot(post_json("/api/v1/admissions/merit", &json!({})))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    let merit = read_json_body(response).await;
    assert_eq!(
        merit
            .as_array()
            .and_then(|entries| entries.first())
            .and_then(|entry| entry.get("rank"))
            .and_then(Value::as_u64),
        Some(1)
    );

    let response = router
        .clone()
        .oneshot(post_json("/api/v1/admissions/allocation", &json!({})))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = read_json_body(response).await;
    assert_eq!(
        outcome.get("selected"),
        Some(&json!([applicant.id.0])),
    );

    let response = router
        .oneshot(get_request(&format!(
            "/api/v1/admissions/applicants/{}",
            applicant.id.0
        )))
        .await
        .expect("router dispatch");
    let status = read_json_body(response).await;
    assert_eq!(status.get("status"), Some(&json!("Selected")));
    assert_eq!(status.get("allocated_department"), Some(&json!("CS")));
}

#[tokio::test]
async fn verification_endpoint_rejects_wrong_state() {
    let (router, service) = build_router();
    let applicant = service
        .register(registration("Asha", 18, 92.0, 88.0, &["CS"], Category::General))
        .expect("registration succeeds");

    // Still `Applied`: no seat has been offered yet.
    let response = router
        .oneshot(post_json(
            &format!(
                "/api/v1/admissions/applicants/{}/verification",
                applicant.id.0
            ),
            &json!({ "action": "approve" }),
        ))
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn verification_endpoint_reports_the_cascade() {
    let (router, service) = build_router();
    let holder = service
        .register(registration("Holder", 18, 95.0, 95.0, &["MECH"], Category::General))
        .expect("registration succeeds");
    let waiter = service
        .register(registration("Waiter", 18, 85.0, 85.0, &["MECH"], Category::General))
        .expect("registration succeeds");
    service.generate_merit_list().expect("merit pass succeeds");
    service.allocate().expect("allocation succeeds");

    let response = router
        .clone()
        .oneshot(post_json(
            &format!("/api/v1/admissions/applicants/{}/verification", holder.id.0),
            &json!({ "action": "reject" }),
        ))
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("status"), Some(&json!("cancelled")));
    assert_eq!(payload.get("promoted"), Some(&json!(waiter.id.0)));

    let response = router
        .oneshot(get_request("/api/v1/admissions/waiting"))
        .await
        .expect("router dispatch");
    let waiting = read_json_body(response).await;
    assert_eq!(waiting, json!([]));
}

#[tokio::test]
async fn dashboard_endpoint_serves_the_seat_matrix() {
    let (router, service) = build_router();
    service
        .register(registration("Asha", 18, 92.0, 88.0, &["CS"], Category::General))
        .expect("registration succeeds");
    service.generate_merit_list().expect("merit pass succeeds");
    service.allocate().expect("allocation succeeds");

    let response = router
        .oneshot(get_request("/api/v1/admissions/dashboard"))
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let departments = payload
        .get("departments")
        .and_then(Value::as_array)
        .expect("departments listed");
    let cs = departments
        .iter()
        .find(|department| department.get("name") == Some(&json!("CS")))
        .expect("CS present");
    assert_eq!(cs.get("occupied"), Some(&json!(1)));
}
