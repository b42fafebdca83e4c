//! Common test utilities and fixtures
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use clinic_core::{Appointment, CreateUser, ProposedAppointment, Role, User};
use clinic_server::{config::ServerConfig, create_router, services::AuthService, state::AppState};
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const TEST_SECRET: &str = "test-secret-key";

/// Test user credentials
pub mod fixtures {
    pub const TEST_PASSWORD: &str = "TestPassword123!";
}

/// Router over a fresh SQLite file
pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub auth_service: Arc<AuthService>,
    _temp_dir: TempDir,
}

pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.auth.jwt_secret = TEST_SECRET.to_string();
    config
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: ServerConfig) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_url = format!("sqlite://{}", temp_dir.path().join("test.db").display());
        let pool = clinic_storage::connect(&db_url)
            .await
            .expect("Failed to open test database");

        let auth_service = Arc::new(AuthService::new(
            &config.auth.jwt_secret,
            1, // 1 hour access
            1, // 1 day refresh
        ));

        let app_state = AppState::new(pool.clone(), Arc::clone(&auth_service), config);

        Self {
            router: create_router(app_state),
            pool,
            auth_service,
            _temp_dir: temp_dir,
        }
    }

    /// Create a user (password `fixtures::TEST_PASSWORD`) and an access token for it
    pub async fn user(
        &self,
        username: &str,
        first_name: &str,
        last_name: &str,
        role: Role,
        is_superuser: bool,
    ) -> (User, String) {
        // Low cost keeps the suite fast; verification reads the cost from the hash
        let password_hash = bcrypt::hash(fixtures::TEST_PASSWORD, 4).unwrap();
        let user = clinic_storage::users::create(
            &self.pool,
            CreateUser {
                username: username.to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email: None,
                role,
                is_superuser,
                password_hash: Some(password_hash),
            },
        )
        .await
        .unwrap();

        let token = self.auth_service.create_access_token(user.id).unwrap();
        (user, token)
    }

    pub async fn superuser(&self) -> (User, String) {
        self.user("admin", "Site", "Admin", Role::Admin, true).await
    }

    pub async fn doctor(
        &self,
        username: &str,
        first_name: &str,
        last_name: &str,
    ) -> (User, String) {
        self.user(username, first_name, last_name, Role::Doctor, false)
            .await
    }

    pub async fn patient(&self, username: &str) -> (User, String) {
        self.user(username, "Pat", username, Role::Patient, false)
            .await
    }

    /// Insert an appointment straight through storage, bypassing the HTTP layer
    pub async fn appointment(
        &self,
        doctor: &User,
        patient: &User,
        scheduled_at: DateTime<Utc>,
    ) -> Appointment {
        clinic_storage::appointments::create(
            &self.pool,
            &ProposedAppointment {
                doctor_id: Some(doctor.id),
                patient_id: Some(patient.id),
                scheduled_at: Some(scheduled_at),
                is_completed: None,
            },
        )
        .await
        .unwrap()
    }

    /// Send a request and decode the JSON body (`Value::Null` when empty)
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }
}

/// 2025-01-01 at `hour`:00 UTC
pub fn jan_first_at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap()
}
