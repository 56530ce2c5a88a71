//! HTTP API tests.
//!
//! Drives the full router over the in-memory document store, with bearer
//! credentials resolved by the mock identity resolver.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use axum::http::{HeaderName, HeaderValue, StatusCode, header::AUTHORIZATION};
use axum_test::{TestResponse, TestServer};
use rsvp_auth::CancellationSigner;
use rsvp_auth::mocks::MockIdentityResolver;
use rsvp_core::{Clock, Identity, Role, UserId};
use rsvp_engine::RsvpEnvironment;
use rsvp_testing::fixtures::{identity, organization, seed_org_with_event};
use rsvp_testing::{InMemoryDocumentStore, SequentialQrHashGenerator, test_clock};
use rsvp_web::{AppState, CORRELATION_ID_HEADER, build_router};
use serde_json::{Value, json};
use std::sync::Arc;

const MEMBER: &str = "member-token";
const OUTSIDER: &str = "outsider-token";
const GUEST: &str = "guest-token";

struct Harness {
    server: TestServer,
    store: InMemoryDocumentStore,
}

/// `O1` owns event `E1`, `O2` owns `E2`.
async fn harness() -> Harness {
    rsvp_testing::init_test_tracing();
    let clock = test_clock();
    let store = InMemoryDocumentStore::new();
    let now = clock.now();
    seed_org_with_event(&store, &organization("O1", "Acme", "acme", "u1", now), "E1")
        .await
        .unwrap();
    seed_org_with_event(&store, &organization("O2", "Other", "other", "u9", now), "E2")
        .await
        .unwrap();

    let identities = MockIdentityResolver::new()
        .with(MEMBER, identity("u2", &[("O1", Role::Member)]))
        .with(OUTSIDER, identity("u9", &[("O2", Role::Admin)]))
        .with(
            GUEST,
            Identity::new(UserId::from_string("u5")).with_email("ana@x.com"),
        );

    let env = RsvpEnvironment::new(
        Arc::new(store.clone()),
        Arc::new(clock),
        Arc::new(SequentialQrHashGenerator::new()),
        CancellationSigner::new("test-secret").unwrap(),
    );
    let app = build_router(AppState::new(env, Arc::new(identities)));

    Harness {
        server: TestServer::new(app).expect("test server"),
        store,
    }
}

fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    (
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    )
}

async fn register(server: &TestServer, email: &str) -> Value {
    let response = server
        .post("/api/events/E1/registrations")
        .json(&json!({ "guestName": "Ana", "guestEmail": email }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()
}

async fn check_in(server: &TestServer, token: &str, body: Value) -> TestResponse {
    let (name, value) = bearer(token);
    server
        .post("/api/check-in")
        .add_header(name, value)
        .json(&body)
        .await
}

// ═══════════════════════════════════════════════════════════
// Health
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn test_health_and_readiness() {
    let h = harness().await;

    let health = h.server.get("/health").await;
    health.assert_status_ok();
    assert_eq!(health.json::<Value>()["status"], "ok");

    h.server.get("/ready").await.assert_status_ok();

    h.store.set_unavailable(true);
    let ready = h.server.get("/ready").await;
    ready.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(ready.json::<Value>()["database"], false);
}

#[tokio::test]
async fn test_correlation_id_is_echoed() {
    let h = harness().await;
    let id = "6f1c2d3e-4b5a-4c6d-8e7f-9a0b1c2d3e4f";

    let response = h
        .server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-correlation-id"),
            HeaderValue::from_static(id),
        )
        .await;

    assert_eq!(response.header(CORRELATION_ID_HEADER), id);
}

// ═══════════════════════════════════════════════════════════
// Create
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn test_create_returns_ticket() {
    let h = harness().await;

    let body = register(&h.server, "Ana@X.com").await;

    let registration = &body["registration"];
    assert_eq!(registration["status"], "confirmed");
    assert_eq!(registration["orgId"], "O1");
    assert_eq!(registration["guestEmail"], "ana@x.com");
    assert!(registration["attendedAt"].is_null());
    assert!(!body["qrPayload"].as_str().unwrap().is_empty());
    assert!(!body["cancellationToken"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_validation_error_names_field() {
    let h = harness().await;

    let response = h
        .server
        .post("/api/events/E1/registrations")
        .json(&json!({ "guestName": "Ana", "guestEmail": "nope" }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.json::<Value>();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["field"], "guestEmail");
}

#[tokio::test]
async fn test_create_for_unknown_event_is_404() {
    let h = harness().await;

    let response = h
        .server
        .post("/api/events/missing/registrations")
        .json(&json!({ "guestName": "Ana", "guestEmail": "ana@x.com" }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(
        response.json::<Value>(),
        json!({ "code": "NOT_FOUND", "message": "Not found or not authorized" })
    );
}

#[tokio::test]
async fn test_storage_outage_is_503_without_details() {
    let h = harness().await;
    h.store.set_unavailable(true);

    let response = h
        .server
        .post("/api/events/E1/registrations")
        .json(&json!({ "guestName": "Ana", "guestEmail": "ana@x.com" }))
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body = response.json::<Value>();
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
    assert_eq!(body["message"], "Service temporarily unavailable");
}

// ═══════════════════════════════════════════════════════════
// Check-in
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn test_check_in_requires_a_session() {
    let h = harness().await;
    let ticket = register(&h.server, "ana@x.com").await;

    let anonymous = h
        .server
        .post("/api/check-in")
        .json(&json!({ "payload": ticket["qrPayload"] }))
        .await;
    anonymous.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.json::<Value>()["code"], "UNAUTHORIZED");

    let unknown = check_in(&h.server, "stolen", json!({ "payload": ticket["qrPayload"] })).await;
    unknown.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_second_scan_is_conflict_with_original_time() {
    let h = harness().await;
    let ticket = register(&h.server, "ana@x.com").await;

    let first = check_in(&h.server, MEMBER, json!({ "payload": ticket["qrPayload"] })).await;
    first.assert_status_ok();
    let checked_in = first.json::<Value>();
    assert_eq!(checked_in["status"], "checked-in");

    let second = check_in(
        &h.server,
        MEMBER,
        json!({ "qrHash": ticket["registration"]["qrHash"] }),
    )
    .await;
    second.assert_status(StatusCode::CONFLICT);
    let body = second.json::<Value>();
    assert_eq!(body["code"], "ALREADY_CHECKED_IN");
    assert_eq!(body["status"], "checked-in");
    assert_eq!(body["attendedAt"], checked_in["attendedAt"]);
}

#[tokio::test]
async fn test_foreign_org_scan_looks_like_unknown_code() {
    let h = harness().await;
    let ticket = register(&h.server, "ana@x.com").await;

    let foreign = check_in(
        &h.server,
        OUTSIDER,
        json!({ "qrHash": ticket["registration"]["qrHash"] }),
    )
    .await;
    let unknown = check_in(&h.server, OUTSIDER, json!({ "qrHash": "no-such-hash" })).await;

    foreign.assert_status(StatusCode::NOT_FOUND);
    unknown.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(foreign.json::<Value>(), unknown.json::<Value>());
}

#[tokio::test]
async fn test_check_in_needs_payload_or_hash() {
    let h = harness().await;

    let response = check_in(&h.server, MEMBER, json!({})).await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json::<Value>()["field"], "payload");

    let garbled = check_in(&h.server, MEMBER, json!({ "payload": "%%%" })).await;
    garbled.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

// ═══════════════════════════════════════════════════════════
// Cancel
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn test_cancel_with_link_token_then_scan() {
    let h = harness().await;
    let ticket = register(&h.server, "ana@x.com").await;
    let id = ticket["registration"]["id"].as_str().unwrap();

    let cancelled = h
        .server
        .post(&format!("/api/registrations/{id}/cancel"))
        .json(&json!({ "token": ticket["cancellationToken"] }))
        .await;
    cancelled.assert_status_ok();
    assert_eq!(cancelled.json::<Value>()["status"], "cancelled");

    let scan = check_in(&h.server, MEMBER, json!({ "payload": ticket["qrPayload"] })).await;
    scan.assert_status(StatusCode::CONFLICT);
    assert_eq!(scan.json::<Value>()["code"], "REGISTRATION_CANCELLED");
}

#[tokio::test]
async fn test_cancel_requires_some_authority() {
    let h = harness().await;
    let ticket = register(&h.server, "ana@x.com").await;
    let id = ticket["registration"]["id"].as_str().unwrap();
    let path = format!("/api/registrations/{id}/cancel");

    h.server
        .post(&path)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let forged = h
        .server
        .post(&path)
        .json(&json!({ "token": "forged" }))
        .await;
    forged.assert_status(StatusCode::NOT_FOUND);

    let (name, value) = bearer(OUTSIDER);
    h.server
        .post(&path)
        .add_header(name, value)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_guest_cancels_own_registration_once() {
    let h = harness().await;
    let ticket = register(&h.server, "Ana@X.com").await;
    let id = ticket["registration"]["id"].as_str().unwrap();
    let path = format!("/api/registrations/{id}/cancel");

    let (name, value) = bearer(GUEST);
    h.server
        .post(&path)
        .add_header(name.clone(), value.clone())
        .await
        .assert_status_ok();

    let again = h.server.post(&path).add_header(name, value).await;
    again.assert_status(StatusCode::CONFLICT);
    assert_eq!(again.json::<Value>()["code"], "REGISTRATION_CANCELLED");
}

// ═══════════════════════════════════════════════════════════
// List
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn test_list_with_status_filter() {
    let h = harness().await;
    let first = register(&h.server, "ana@x.com").await;
    register(&h.server, "bo@x.com").await;
    check_in(&h.server, MEMBER, json!({ "payload": first["qrPayload"] }))
        .await
        .assert_status_ok();

    let (name, value) = bearer(MEMBER);
    let all = h
        .server
        .get("/api/events/E1/registrations")
        .add_header(name.clone(), value.clone())
        .await;
    all.assert_status_ok();
    let all = all.json::<Value>();
    assert_eq!(all["eventId"], "E1");
    assert_eq!(all["registrations"].as_array().unwrap().len(), 2);

    let checked_in = h
        .server
        .get("/api/events/E1/registrations")
        .add_query_param("status", "checked-in")
        .add_header(name, value)
        .await
        .json::<Value>();
    let registrations = checked_in["registrations"].as_array().unwrap();
    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0]["guestEmail"], "ana@x.com");
}

#[tokio::test]
async fn test_list_is_hidden_from_other_orgs() {
    let h = harness().await;
    register(&h.server, "ana@x.com").await;

    h.server
        .get("/api/events/E1/registrations")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let (name, value) = bearer(OUTSIDER);
    let response = h
        .server
        .get("/api/events/E1/registrations")
        .add_header(name, value)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["message"], "Not found or not authorized");
}
