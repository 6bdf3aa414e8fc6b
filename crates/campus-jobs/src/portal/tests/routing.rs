use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::portal::domain::Actor;
use crate::portal::repository::UserRepository;
use crate::portal::router::portal_router;

async fn send(
    fx: &Fixture,
    method: Method,
    uri: &str,
    user: Option<&Actor>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let response = portal_router(fx.portal.clone())
        .oneshot(request(method, uri, user, body))
        .await
        .expect("router response");
    let status = response.status();
    (status, read_json_body(response).await)
}

#[tokio::test]
async fn unknown_routes_use_the_error_envelope() {
    let fx = fixture();
    let (status, body) = send(&fx, Method::GET, "/api/v1/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
    assert!(body["error"]["suggestions"].is_array());
}

#[tokio::test]
async fn malformed_or_unknown_user_header_is_unauthorized() {
    let fx = fixture();
    let request_with = |value: &str| {
        let mut req = request(Method::GET, "/api/v1/jobs", None, None);
        req.headers_mut()
            .insert("x-user-id", value.parse().expect("header value"));
        req
    };

    for value in ["abc", "999999"] {
        let response = portal_router(fx.portal.clone())
            .oneshot(request_with(value))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = read_json_body(response).await;
        assert_eq!(body["error"]["code"], "authentication_error");
    }
}

#[tokio::test]
async fn deactivated_accounts_are_rejected() {
    let fx = fixture();
    let mut bob = fx
        .store
        .fetch_user(fx.bob.id)
        .expect("fetch")
        .expect("bob exists");
    bob.is_active = false;
    fx.store.update_user(bob).expect("deactivate");

    let (status, _) = send(&fx, Method::GET, "/api/v1/applications", Some(&fx.bob), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn anonymous_writes_need_authentication() {
    let fx = fixture();
    let (status, body) = send(
        &fx,
        Method::POST,
        "/api/v1/applications",
        None,
        Some(json!({"job": fx.job.id, "cover_letter": "Hello"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"]["suggestions"]
        .as_array()
        .expect("suggestions")
        .iter()
        .any(|s| s == "Write operations always require authentication"));
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let fx = fixture();
    let mut bad = request(Method::POST, "/api/v1/applications", Some(&fx.alice), None);
    *bad.body_mut() = axum::body::Body::from("{not json");
    bad.headers_mut().insert(
        axum::http::header::CONTENT_TYPE,
        "application/json".parse().expect("header value"),
    );

    let response = portal_router(fx.portal.clone())
        .oneshot(bad)
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn applying_twice_conflicts_with_suggestions() {
    let fx = fixture();
    let payload = json!({"job": fx.job.id, "cover_letter": "I know Django well."});

    let (status, created) = send(
        &fx,
        Method::POST,
        "/api/v1/applications",
        Some(&fx.alice),
        Some(payload.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");

    let (status, body) = send(
        &fx,
        Method::POST,
        "/api/v1/applications",
        Some(&fx.alice),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "application_already_exists");
    assert!(body["error"]["suggestions"]
        .as_array()
        .expect("suggestions")
        .iter()
        .any(|s| s.as_str().is_some_and(|s| s.contains("existing application"))));
}

#[tokio::test]
async fn status_update_and_notification_actions_route() {
    let fx = fixture();
    let application = fx.apply(&fx.alice);

    let (status, body) = send(
        &fx,
        Method::POST,
        &format!("/api/v1/applications/{}/update_status", application.id),
        Some(&fx.employer),
        Some(json!({"status": "accepted"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");

    let (status, body) = send(
        &fx,
        Method::POST,
        &format!("/api/v1/applications/{}/update_status", application.id),
        Some(&fx.employer),
        Some(json!({"status": "rejected"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_status_transition");

    let (status, body) = send(
        &fx,
        Method::GET,
        "/api/v1/notifications?is_read=false",
        Some(&fx.alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["type"], "application_update");

    let (status, body) = send(
        &fx,
        Method::POST,
        "/api/v1/notifications/mark_all_as_read",
        Some(&fx.alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 1);
}

#[tokio::test]
async fn job_listing_reports_invalid_ordering() {
    let fx = fixture();
    let (status, body) = send(&fx, Method::GET, "/api/v1/jobs?ordering=-salary", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["page"], 1);

    let (status, body) = send(&fx, Method::GET, "/api/v1/jobs?ordering=hype", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["ordering"]["current_value"], "hype");
}

#[tokio::test]
async fn deleting_returns_no_content() {
    let fx = fixture();
    let application = fx.apply(&fx.alice);
    let response = portal_router(fx.portal.clone())
        .oneshot(request(
            Method::DELETE,
            &format!("/api/v1/applications/{}", application.id),
            Some(&fx.alice),
            None,
        ))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
