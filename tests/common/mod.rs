//! Router-level test harness shared by the integration tests
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use jobboard::{
    config::ServerConfig, db, mailer::testing::RecordingMailer, server::build_router,
    uploads::DiskStorage, AppContext,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub router: Router,
    pub ctx: AppContext,
    pub mailer: Arc<RecordingMailer>,
    _uploads: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Rate limiting starts disabled; `configure` may turn it back on
    pub async fn with_config(configure: impl FnOnce(&mut ServerConfig)) -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::development();
        config.storage.upload_directory = uploads.path().to_path_buf();
        config.rate_limit.enabled = false;
        config.authentication.admin_emails = vec![ADMIN_EMAIL.to_string()];
        configure(&mut config);

        let mailer = Arc::new(RecordingMailer::new());
        let pool = db::memory_pool().await.unwrap();
        let storage = Arc::new(DiskStorage::new(uploads.path().to_path_buf()));
        let ctx = AppContext::from_parts(config, pool, mailer.clone(), storage);

        Self {
            router: build_router(ctx.clone()),
            ctx,
            mailer,
            _uploads: uploads,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, token, Some(body)).await
    }

    /// Register through the API and log in; returns `(token, user_id)`
    pub async fn signup(&self, name: &str, email: &str, role: &str) -> (String, i64) {
        let (status, _) = self
            .post(
                "/api/auth/register",
                None,
                json!({ "name": name, "email": email, "password": PASSWORD, "role": role }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        self.login(email).await
    }

    pub async fn login(&self, email: &str) -> (String, i64) {
        let (status, body) = self
            .post(
                "/api/auth/login",
                None,
                json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_i64().unwrap(),
        )
    }

    /// There is no endpoint that creates moderators
    pub async fn moderator(&self, name: &str, email: &str) -> (String, i64) {
        let (_, id) = self.signup(name, email, "job_seeker").await;
        sqlx::query("UPDATE users SET role = 'moderator' WHERE id = ?")
            .bind(id)
            .execute(&self.ctx.db)
            .await
            .unwrap();
        self.login(email).await
    }

    pub async fn admin(&self) -> (String, i64) {
        self.signup("Root", ADMIN_EMAIL, "employer").await
    }

    /// Post a job as `employer` and approve it as `moderator`
    pub async fn published_job(&self, employer: &str, moderator: &str, title: &str) -> i64 {
        let (status, job) = self.post("/api/jobs", Some(employer), job_body(title)).await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", job);
        let id = job["id"].as_i64().unwrap();

        let (status, _) = self
            .post(&format!("/api/admin/jobs/{}/approve", id), Some(moderator), json!({}))
            .await;
        assert_eq!(status, StatusCode::OK);
        id
    }
}

pub fn job_body(title: &str) -> Value {
    json!({
        "title": title,
        "description": "Build and run the services behind our marketplace.",
        "location": "Berlin",
        "job_type": "full_time",
        "remote": true,
        "salary_min": 60000,
        "salary_max": 80000
    })
}
