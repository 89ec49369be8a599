/// Staff endpoints, account status enforcement, reports and uploads
mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_ban_blocks_access_until_unbanned() {
    let app = TestApp::new().await;
    let (moderator, _) = app.moderator("Mod", "mod@example.com").await;
    let (seeker, seeker_id) = app.signup("Ada", "ada@example.com", "job_seeker").await;

    let (status, user) = app
        .post(
            &format!("/api/admin/users/{}/ban", seeker_id),
            Some(&moderator),
            json!({ "reason": "Fake profile" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["status"], "banned");

    // An already-issued token stops working
    let (status, body) = app.get("/api/me", Some(&seeker)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "AccountBanned");

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "ada@example.com", "password": common::PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "AccountBanned");

    // A body that does not parse is refused instead of read as empty
    let (status, body) = app
        .post(
            &format!("/api/admin/users/{}/unban", seeker_id),
            Some(&moderator),
            json!({ "reasn": "Appeal accepted" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidRequest");
    let (status, _) = app.get("/api/me", Some(&seeker)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, user) = app
        .call(
            Method::POST,
            &format!("/api/admin/users/{}/unban", seeker_id),
            Some(&moderator),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["status"], "active");

    // Unbanning an active account is a transition conflict
    let (status, _) = app
        .post(&format!("/api/admin/users/{}/unban", seeker_id), Some(&moderator), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.get("/api/me", Some(&seeker)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, detail) = app
        .get(&format!("/api/admin/users/{}", seeker_id), Some(&moderator))
        .await;
    let actions: Vec<_> = detail["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(actions.len(), 2);
    assert!(actions.contains(&"ban".to_string()));
    assert!(actions.contains(&"unban".to_string()));
}

#[tokio::test]
async fn test_role_hierarchy() {
    let app = TestApp::new().await;
    let (admin, admin_id) = app.admin().await;
    let (moderator, moderator_id) = app.moderator("Mod", "mod@example.com").await;
    let (seeker, seeker_id) = app.signup("Ada", "ada@example.com", "job_seeker").await;

    // Regular users never reach the staff surface
    let (status, _) = app.get("/api/admin/stats", Some(&seeker)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Moderators cannot act on admins or on themselves
    let (status, _) = app
        .post(
            &format!("/api/admin/users/{}/warn", admin_id),
            Some(&moderator),
            json!({ "reason": "nope" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .post(
            &format!("/api/admin/users/{}/warn", moderator_id),
            Some(&moderator),
            json!({ "reason": "self" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Admins can act on moderators
    let (status, user) = app
        .post(
            &format!("/api/admin/users/{}/warn", moderator_id),
            Some(&admin),
            json!({ "reason": "Be gentler in reviews" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["warning_count"], 1);

    let (status, body) = app
        .post(
            &format!("/api/admin/users/{}/suspend", seeker_id),
            Some(&moderator),
            json!({ "reason": "Spam", "days": 400 }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["days"].is_array());

    let (status, user) = app
        .post(
            &format!("/api/admin/users/{}/suspend", seeker_id),
            Some(&moderator),
            json!({ "reason": "Spam", "days": 7 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["status"], "suspended");
    assert!(user["banned_until"].is_string());

    let (_, users) = app
        .get("/api/admin/users?status=suspended", Some(&admin))
        .await;
    assert_eq!(users["total"], 1);
    assert_eq!(users["data"][0]["id"], seeker_id);
}

#[tokio::test]
async fn test_deleting_employer_closes_listings() {
    let app = TestApp::new().await;
    let (admin, _) = app.admin().await;
    let (moderator, _) = app.moderator("Mod", "mod@example.com").await;
    let (employer, employer_id) = app.signup("Acme", "hr@acme.test", "employer").await;
    let job_id = app.published_job(&employer, &moderator, "Site Reliability Engineer").await;

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/admin/users/{}", employer_id),
            Some(&admin),
            Some(json!({ "reason": "Fraudulent company" })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&format!("/api/jobs/{}", job_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/api/me", Some(&employer)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Soft-deleted accounts stay listable for staff
    let (_, users) = app
        .get("/api/admin/users?include_deleted=true&role=employer", Some(&admin))
        .await;
    assert_eq!(users["total"], 1);
}

#[tokio::test]
async fn test_report_review() {
    let app = TestApp::new().await;
    let (moderator, _) = app.moderator("Mod", "mod@example.com").await;
    let (employer, _) = app.signup("Acme", "hr@acme.test", "employer").await;
    let (seeker, _) = app.signup("Ada", "ada@example.com", "job_seeker").await;
    let job_id = app.published_job(&employer, &moderator, "Too Good To Be True").await;

    let report = json!({
        "target": { "kind": "job", "id": job_id },
        "category": "fraud",
        "details": "Asks for a deposit up front"
    });
    let (status, created) = app.post("/api/reports", Some(&seeker), report.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["status"], "pending");
    let report_id = created["id"].as_i64().unwrap();

    let (status, _) = app.post("/api/reports", Some(&seeker), report).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post(
            "/api/reports",
            Some(&seeker),
            json!({ "target": { "kind": "job", "id": 9999 }, "category": "spam" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, stats) = app.get("/api/admin/stats", Some(&moderator)).await;
    assert_eq!(stats["pending_reports"], 1);
    assert_eq!(stats["active_jobs"], 1);

    let (_, queue) = app
        .get("/api/admin/reports?status=pending", Some(&moderator))
        .await;
    assert_eq!(queue["total"], 1);

    let (status, resolved) = app
        .post(
            &format!("/api/admin/reports/{}/resolve", report_id),
            Some(&moderator),
            json!({ "note": "Listing removed" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["status"], "resolved");
    assert_eq!(resolved["resolution_note"], "Listing removed");

    let (status, _) = app
        .post(
            &format!("/api/admin/reports/{}/dismiss", report_id),
            Some(&moderator),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, audit) = app
        .get("/api/admin/audit-log?action_type=report_review", Some(&moderator))
        .await;
    assert_eq!(audit["total"], 1);
    assert_eq!(audit["data"][0]["action"], "resolve");
}

#[tokio::test]
async fn test_resume_upload() {
    let app = TestApp::new().await;
    let (seeker, _) = app.signup("Ada", "ada@example.com", "job_seeker").await;

    let boundary = "XBOUNDARYX";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cv.pdf\"\r\nContent-Type: application/pdf\r\n\r\n",
            b = boundary
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"%PDF-1.4 my resume");
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/me/resume")
        .header(header::AUTHORIZATION, format!("Bearer {}", seeker))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, uploaded) = app.send(request).await;
    assert_eq!(status, StatusCode::OK, "{}", uploaded);
    let key = uploaded["key"].as_str().unwrap();
    assert!(key.ends_with(".pdf"));
    assert_eq!(uploaded["content_type"], "application/pdf");
    assert_eq!(uploaded["user"]["resume_path"], key);

    // A photo endpoint refuses documents
    let (status, _) = app
        .call(Method::POST, "/api/me/photo", Some(&seeker), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_anonymous_rate_limit() {
    let app = TestApp::with_config(|config| {
        config.rate_limit.enabled = true;
        config.rate_limit.anonymous_rps = 1;
        config.rate_limit.burst_size = 5;
    })
    .await;

    // Anonymous callers get a fifth of the burst
    let (status, _) = app.get("/api/jobs", None).await;
    assert_eq!(status, StatusCode::OK);

    let request = Request::builder()
        .uri("/api/jobs")
        .body(Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));
}
