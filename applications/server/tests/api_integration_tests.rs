/// API integration tests
/// Tests complete HTTP request/response cycles with real database
mod common;

use axum::http::{Method, StatusCode};
use chrono::Duration;
use common::{fixtures, jan_first_at, test_config, TestApp};
use serde_json::{json, Value};
use std::sync::Arc;

fn create_body(doctor_id: i64, patient_id: i64, scheduled_at: &str) -> Value {
    json!({
        "doctor_id": doctor_id,
        "patient_id": patient_id,
        "scheduled_at": scheduled_at,
    })
}

/// Test GET /api/appointments/list/ without authentication
#[tokio::test]
async fn test_list_unauthenticated() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(Method::GET, "/api/appointments/list/", None, None)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

/// Test a forged token is rejected before any handler runs
#[tokio::test]
async fn test_invalid_token_rejected() {
    let app = TestApp::new().await;

    let (status, _) = app.get("/api/appointments/list/", "not.a.jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

/// Test a token whose user was removed no longer authenticates
#[tokio::test]
async fn test_token_for_deleted_user_rejected() {
    let app = TestApp::new().await;
    let (patient, token) = app.patient("gone").await;

    clinic_storage::users::delete(&app.pool, patient.id)
        .await
        .unwrap();

    let (status, _) = app.get("/api/appointments/list/", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

/// Test login, refresh, and token usage
#[tokio::test]
async fn test_token_flow() {
    let app = TestApp::new().await;
    app.patient("alice").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/token",
            None,
            Some(json!({ "username": "alice", "password": fixtures::TEST_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    let access = body["access_token"].as_str().unwrap().to_string();
    let refresh = body["refresh_token"].as_str().unwrap().to_string();

    let (status, _) = app.get("/api/appointments/list/", &access).await;
    assert_eq!(status, StatusCode::OK);

    // Refresh tokens are not accepted as access tokens
    let (status, _) = app.get("/api/appointments/list/", &refresh).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/token/refresh",
            None,
            Some(json!({ "refresh_token": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let renewed = body["access_token"].as_str().unwrap();

    let (status, _) = app.get("/api/appointments/list/", renewed).await;
    assert_eq!(status, StatusCode::OK);
}

/// Test login with wrong password or unknown user
#[tokio::test]
async fn test_token_bad_credentials() {
    let app = TestApp::new().await;
    app.patient("alice").await;

    for (username, password) in [("alice", "wrong"), ("nobody", fixtures::TEST_PASSWORD)] {
        let (status, body) = app
            .send(
                Method::POST,
                "/api/auth/token",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid username or password");
    }
}

/// Test malformed JSON is a client error
#[tokio::test]
async fn test_invalid_json_request() {
    let app = TestApp::new().await;
    let (_, token) = app.superuser().await;

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/appointments/create/")
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Test a doctor cannot be double-booked, but the next hour is free
#[tokio::test]
async fn test_create_conflict_then_next_hour() {
    let app = TestApp::new().await;
    let (_, admin) = app.superuser().await;
    let (doctor, _) = app.doctor("house", "Gregory", "House").await;
    let (first, _) = app.patient("alice").await;
    let (second, _) = app.patient("bob").await;

    let (status, created) = app
        .send(
            Method::POST,
            "/api/appointments/create/",
            Some(&admin),
            Some(create_body(
                doctor.id.get(),
                first.id.get(),
                "2025-01-01T10:00:00Z",
            )),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["doctor"]["last_name"], "House");
    assert_eq!(created["patient"]["id"], first.id.get());
    assert_eq!(created["is_completed"], false);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/appointments/create/",
            Some(&admin),
            Some(create_body(
                doctor.id.get(),
                second.id.get(),
                "2025-01-01T10:00:00Z",
            )),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["fields"]["scheduled_at"][0],
        "Doctor already has an appointment at this time."
    );

    let (status, _) = app
        .send(
            Method::POST,
            "/api/appointments/create/",
            Some(&admin),
            Some(create_body(
                doctor.id.get(),
                second.id.get(),
                "2025-01-01T11:00:00Z",
            )),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

/// Test racing creates for one slot book it once and reject the rest with 400
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_for_one_slot() {
    let app = Arc::new(TestApp::new().await);
    let (_, admin) = app.superuser().await;
    let (doctor, _) = app.doctor("house", "Gregory", "House").await;
    let (patient, _) = app.patient("alice").await;

    let handles: Vec<_> = (0..12)
        .map(|_| {
            let app = Arc::clone(&app);
            let admin = admin.clone();
            let body = create_body(doctor.id.get(), patient.id.get(), "2025-01-01T10:00:00Z");
            tokio::spawn(async move {
                app.send(
                    Method::POST,
                    "/api/appointments/create/",
                    Some(&admin),
                    Some(body),
                )
                .await
                .0
            })
        })
        .collect();

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.unwrap());
    }

    let created = statuses
        .iter()
        .filter(|s| **s == StatusCode::CREATED)
        .count();
    assert_eq!(created, 1, "statuses: {statuses:?}");
    assert!(statuses
        .iter()
        .all(|s| *s == StatusCode::CREATED || *s == StatusCode::BAD_REQUEST));

    let (_, page) = app.get("/api/appointments/list/", &admin).await;
    assert_eq!(page["count"], 1);
}

/// Test create validation errors are reported per field
#[tokio::test]
async fn test_create_validation_errors() {
    let app = TestApp::new().await;
    let (_, admin) = app.superuser().await;
    let (not_doctor, _) = app.patient("alice").await;
    let (patient, _) = app.patient("bob").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/appointments/create/",
            Some(&admin),
            Some(json!({ "patient_id": patient.id.get() })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"]["doctor_id"][0], "This field is required.");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/appointments/create/",
            Some(&admin),
            Some(create_body(
                not_doctor.id.get(),
                patient.id.get(),
                "2025-01-01T10:00:00Z",
            )),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["fields"]["doctor_id"][0],
        "Only doctors can have appointments."
    );
}

/// Test only superusers may create
#[tokio::test]
async fn test_create_requires_superuser() {
    let app = TestApp::new().await;
    let (doctor, doctor_token) = app.doctor("house", "Gregory", "House").await;
    let (patient, _) = app.patient("alice").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/appointments/create/",
            Some(&doctor_token),
            Some(create_body(
                doctor.id.get(),
                patient.id.get(),
                "2025-01-01T10:00:00Z",
            )),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/appointments/create/",
            None,
            Some(create_body(
                doctor.id.get(),
                patient.id.get(),
                "2025-01-01T10:00:00Z",
            )),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

/// Test retrieve visibility: participants and superusers only, 403 for others
#[tokio::test]
async fn test_retrieve_visibility() {
    let app = TestApp::new().await;
    let (_, admin) = app.superuser().await;
    let (doctor, doctor_token) = app.doctor("house", "Gregory", "House").await;
    let (patient, patient_token) = app.patient("alice").await;
    let (_, stranger_token) = app.patient("mallory").await;

    let appointment = app.appointment(&doctor, &patient, jan_first_at(10)).await;
    let uri = format!("/api/appointments/{}/", appointment.id);

    for token in [&admin, &doctor_token, &patient_token] {
        let (status, body) = app.get(&uri, token).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], appointment.id.get());
    }

    let (status, _) = app.get(&uri, &stranger_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

/// Test absent rows: 404 for superusers, 403 for everyone else
#[tokio::test]
async fn test_retrieve_missing() {
    let app = TestApp::new().await;
    let (_, admin) = app.superuser().await;
    let (_, patient_token) = app.patient("alice").await;

    let (status, _) = app.get("/api/appointments/999/", &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/api/appointments/999/", &patient_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

/// Test PATCH and PUT are superuser-only partial updates
#[tokio::test]
async fn test_update_gate_and_partial_update() {
    let app = TestApp::new().await;
    let (_, admin) = app.superuser().await;
    let (doctor, doctor_token) = app.doctor("house", "Gregory", "House").await;
    let (patient, _) = app.patient("alice").await;

    let appointment = app.appointment(&doctor, &patient, jan_first_at(10)).await;
    let uri = format!("/api/appointments/{}/", appointment.id);

    let (status, _) = app
        .send(
            Method::PATCH,
            &uri,
            Some(&doctor_token),
            Some(json!({ "is_completed": true })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(
            Method::PATCH,
            &uri,
            Some(&admin),
            Some(json!({ "is_completed": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_completed"], true);
    assert_eq!(body["doctor"]["id"], doctor.id.get());

    let (status, body) = app
        .send(
            Method::PUT,
            &uri,
            Some(&admin),
            Some(json!({ "scheduled_at": "2025-01-01T12:00:00Z" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_completed"], true);
    assert_eq!(body["scheduled_at"], "2025-01-01T12:00:00Z");
}

/// Test moving an appointment onto a taken slot fails
#[tokio::test]
async fn test_update_conflict() {
    let app = TestApp::new().await;
    let (_, admin) = app.superuser().await;
    let (doctor, _) = app.doctor("house", "Gregory", "House").await;
    let (patient, _) = app.patient("alice").await;

    app.appointment(&doctor, &patient, jan_first_at(10)).await;
    let later = app.appointment(&doctor, &patient, jan_first_at(11)).await;

    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/api/appointments/{}/", later.id),
            Some(&admin),
            Some(json!({ "scheduled_at": "2025-01-01T10:00:00Z" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["scheduled_at"].is_array());
}

/// Test DELETE is superuser-only and returns 204
#[tokio::test]
async fn test_delete_gate() {
    let app = TestApp::new().await;
    let (_, admin) = app.superuser().await;
    let (doctor, _) = app.doctor("house", "Gregory", "House").await;
    let (patient, patient_token) = app.patient("alice").await;

    let appointment = app.appointment(&doctor, &patient, jan_first_at(10)).await;
    let uri = format!("/api/appointments/{}/", appointment.id);

    let (status, _) = app
        .send(Method::DELETE, &uri, Some(&patient_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send(Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = app.get(&uri, &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Test listing is scoped to the caller's own appointments
#[tokio::test]
async fn test_list_scoping() {
    let app = TestApp::new().await;
    let (_, admin) = app.superuser().await;
    let (house, house_token) = app.doctor("house", "Gregory", "House").await;
    let (wilson, _) = app.doctor("wilson", "James", "Wilson").await;
    let (alice, alice_token) = app.patient("alice").await;
    let (bob, _) = app.patient("bob").await;

    app.appointment(&house, &alice, jan_first_at(9)).await;
    app.appointment(&house, &bob, jan_first_at(10)).await;
    app.appointment(&wilson, &bob, jan_first_at(11)).await;

    let (_, body) = app.get("/api/appointments/list/", &admin).await;
    assert_eq!(body["count"], 3);

    let (_, body) = app.get("/api/appointments/list/", &house_token).await;
    assert_eq!(body["count"], 2);

    let (_, body) = app.get("/api/appointments/list/", &alice_token).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["patient"]["id"], alice.id.get());
}

/// Test list filters and pagination
#[tokio::test]
async fn test_list_filters_and_pagination() {
    let app = TestApp::new().await;
    let (_, admin) = app.superuser().await;
    let (house, _) = app.doctor("house", "Gregory", "House").await;
    let (wilson, _) = app.doctor("wilson", "James", "Wilson").await;
    let (alice, _) = app.patient("alice").await;

    app.appointment(&house, &alice, jan_first_at(9)).await;
    app.appointment(&house, &alice, jan_first_at(10)).await;
    app.appointment(&wilson, &alice, jan_first_at(9) + Duration::days(1))
        .await;

    let (_, body) = app
        .get("/api/appointments/list/?doctor_name=HOU", &admin)
        .await;
    assert_eq!(body["count"], 2);

    let (_, body) = app
        .get("/api/appointments/list/?date=2025-01-02", &admin)
        .await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["doctor"]["last_name"], "Wilson");

    let (_, body) = app
        .get("/api/appointments/list/?is_completed=true", &admin)
        .await;
    assert_eq!(body["count"], 0);

    let (status, body) = app
        .get("/api/appointments/list/?limit=2&offset=0", &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(body["limit"], 2);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);

    let (_, body) = app
        .get("/api/appointments/list/?limit=100000", &admin)
        .await;
    assert_eq!(body["limit"], 100);

    let (status, body) = app
        .get("/api/appointments/list/?date=01-01-2025", &admin)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["date"].is_array());
}

/// Test unfiltered pages are cached, filtered ones never are, and writes invalidate
#[tokio::test]
async fn test_list_cache_bypass_and_invalidation() {
    let app = TestApp::new().await;
    let (_, admin) = app.superuser().await;
    let (house, _) = app.doctor("house", "Gregory", "House").await;
    let (alice, _) = app.patient("alice").await;

    app.appointment(&house, &alice, jan_first_at(9)).await;

    let (_, body) = app.get("/api/appointments/list/", &admin).await;
    assert_eq!(body["count"], 1);

    // Written behind the service's back: the cached page is stale
    app.appointment(&house, &alice, jan_first_at(10)).await;
    let (_, body) = app.get("/api/appointments/list/", &admin).await;
    assert_eq!(body["count"], 1);

    // Filtered requests go to the database
    let (_, body) = app
        .get("/api/appointments/list/?doctor_name=house", &admin)
        .await;
    assert_eq!(body["count"], 2);

    // A write through the API purges the listing
    let (status, _) = app
        .send(
            Method::POST,
            "/api/appointments/create/",
            Some(&admin),
            Some(create_body(
                house.id.get(),
                alice.id.get(),
                "2025-01-01T11:00:00Z",
            )),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app.get("/api/appointments/list/", &admin).await;
    assert_eq!(body["count"], 3);
}

/// Test deletes are visible on the next unfiltered listing
#[tokio::test]
async fn test_delete_invalidates_listing() {
    let app = TestApp::new().await;
    let (_, admin) = app.superuser().await;
    let (house, _) = app.doctor("house", "Gregory", "House").await;
    let (alice, _) = app.patient("alice").await;

    let appointment = app.appointment(&house, &alice, jan_first_at(9)).await;

    let (_, body) = app.get("/api/appointments/list/", &admin).await;
    assert_eq!(body["count"], 1);

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/appointments/{}/", appointment.id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = app.get("/api/appointments/list/", &admin).await;
    assert_eq!(body["count"], 0);
}

/// Test a disabled cache serves every listing fresh
#[tokio::test]
async fn test_list_without_cache() {
    let mut config = test_config();
    config.cache.enabled = false;
    let app = TestApp::with_config(config).await;
    let (_, admin) = app.superuser().await;
    let (house, _) = app.doctor("house", "Gregory", "House").await;
    let (alice, _) = app.patient("alice").await;

    app.get("/api/appointments/list/", &admin).await;
    app.appointment(&house, &alice, jan_first_at(9)).await;

    let (_, body) = app.get("/api/appointments/list/", &admin).await;
    assert_eq!(body["count"], 1);
}

/// Test the report groups by day and links back to the listing
#[tokio::test]
async fn test_report_per_day_counts() {
    let app = TestApp::new().await;
    let (_, admin) = app.superuser().await;
    let (house, _) = app.doctor("house", "Gregory", "House").await;
    let (alice, _) = app.patient("alice").await;

    app.appointment(&house, &alice, jan_first_at(9)).await;
    app.appointment(&house, &alice, jan_first_at(10)).await;
    app.appointment(&house, &alice, jan_first_at(9) + Duration::days(14))
        .await;
    // Outside the range
    app.appointment(&house, &alice, jan_first_at(9) + Duration::days(40))
        .await;

    let (status, body) = app
        .get(
            "/api/appointments/report/?start_date=2025-01-01&end_date=2025-01-31",
            &admin,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["date"], "2025-01-01");
    assert_eq!(rows[0]["count"], 2);
    assert_eq!(rows[1]["date"], "2025-01-15");
    let total: u64 = rows.iter().map(|r| r["count"].as_u64().unwrap()).sum();
    assert_eq!(total, 3);

    assert_eq!(
        rows[0]["url"],
        "/api/appointments/list/?date=2025-01-01&doctor_name=&is_completed="
    );
    assert_eq!(rows[0]["filters"]["doctor_name"], Value::Null);
}

/// Test report access and filter validation
#[tokio::test]
async fn test_report_errors() {
    let app = TestApp::new().await;
    let (_, admin) = app.superuser().await;
    let (_, doctor_token) = app.doctor("house", "Gregory", "House").await;

    let (status, _) = app.get("/api/appointments/report/", &doctor_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .get("/api/appointments/report/?start_date=yesterday", &admin)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["start_date"].is_array());

    let (status, _) = app
        .get(
            "/api/appointments/report/?start_date=2025-02-01&end_date=2025-01-01",
            &admin,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

/// Test report links use the configured public URL and echo filters
#[tokio::test]
async fn test_report_public_url() {
    let mut config = test_config();
    config.server.public_url = Some("https://clinic.example.com".to_string());
    let app = TestApp::with_config(config).await;
    let (_, admin) = app.superuser().await;
    let (house, _) = app.doctor("house", "Gregory", "House").await;
    let (alice, _) = app.patient("alice").await;

    app.appointment(&house, &alice, jan_first_at(9)).await;

    let (_, body) = app
        .get(
            "/api/appointments/report/?doctor_name=House&is_completed=false",
            &admin,
        )
        .await;

    assert_eq!(
        body[0]["url"],
        "https://clinic.example.com/api/appointments/list/?date=2025-01-01&doctor_name=House&is_completed=false"
    );
    assert_eq!(body[0]["filters"]["doctor_name"], "House");
    assert_eq!(body[0]["filters"]["is_completed"], false);
}

/// Test health endpoint is public
#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}
