//! # Integration Tests for soptrack-api
//!
//! Drives the assembled router with `oneshot` against an in-memory SQLite
//! database: health probes, login and access control, roster import,
//! acknowledgment uniqueness, compliance rates, CSV exports, and the JSON
//! API.

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use soptrack_core::validation::{SopDraft, StaffDraft};
use soptrack_core::Role;
use sqlx::SqlitePool;
use tower::ServiceExt;

use soptrack_api::config::{AppConfig, SecretString};
use soptrack_api::middleware::rate_limit::RateLimitConfig;
use soptrack_api::{auth, db, AppState};

const ADMIN_PASSWORD: &str = "Adm1nPass";
const STAFF_PASSWORD: &str = "Staff1Pass";

struct TestApp {
    router: Router,
    pool: SqlitePool,
}

/// Helper: in-memory app with a bootstrapped admin.
async fn test_app() -> TestApp {
    test_app_with_throttle(RateLimitConfig::default()).await
}

async fn test_app_with_throttle(throttle: RateLimitConfig) -> TestApp {
    let pool = db::connect("sqlite::memory:", 1).await.unwrap();
    let config = AppConfig {
        admin_password: SecretString::new(ADMIN_PASSWORD),
        ..AppConfig::default()
    };
    auth::ensure_default_admin(&pool, &config).await.unwrap();
    let router = soptrack_api::app_with_throttle(AppState::new(pool.clone(), config), throttle);
    TestApp { router, pool }
}

/// A wrong-password login from socket peer `peer`, claiming `forwarded_for`.
fn failed_login_from(peer: [u8; 4], forwarded_for: &str) -> Request<Body> {
    let mut request = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("x-forwarded-for", forwarded_for)
        .body(Body::from("username=admin&password=Wrong1234"))
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((peer, 50_000))));
    request
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> axum::http::Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> axum::http::Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, cookie: Option<&str>, body: &str) -> axum::http::Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Log in and return the `Cookie` header value.
    async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .post_form("/login", None, &format!("username={username}&password={password}"))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("session cookie")
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    /// Staff user linked to a new roster row, without a pending reset.
    async fn staff_user(&self, username: &str) -> i64 {
        auth::create_user(&self.pool, None, username, STAFF_PASSWORD, Role::Staff, None, false)
            .await
            .unwrap()
            .unwrap()
    }

    async fn sop(&self, title: &str) -> i64 {
        let draft = SopInputs::draft(title);
        db::sops::create(&self.pool, &draft, None).await.unwrap()
    }
}

struct SopInputs;

impl SopInputs {
    fn draft(title: &str) -> SopDraft {
        SopDraft {
            title: title.to_string(),
            category: "Safety".to_string(),
            content: "Pull the alarm and leave the building calmly.".to_string(),
        }
    }
}

fn location(response: &axum::http::Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

/// Helper: read response body as string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let app = test_app().await;
    let response = app.get("/health/liveness", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let app = test_app().await;
    let response = app.get("/health/readiness", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

// -- Sessions -----------------------------------------------------------------

#[tokio::test]
async fn test_protected_page_redirects_to_login() {
    let app = test_app().await;
    for uri in ["/", "/sop/1", "/compliance", "/admin", "/admin/audit"] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), "/login", "{uri}");
    }
}

#[tokio::test]
async fn test_login_rejects_bad_password() {
    let app = test_app().await;
    let response = app
        .post_form("/login", None, "username=admin&password=Wrong1234")
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_string(response).await.contains("Invalid credentials"));
}

#[tokio::test]
async fn test_login_throttle_keys_on_socket_peer() {
    let app = test_app_with_throttle(RateLimitConfig {
        max_attempts: 2,
        window: Duration::from_secs(300),
    })
    .await;

    let mut statuses = Vec::new();
    for n in 0..4 {
        let request = failed_login_from([198, 51, 100, 7], &format!("203.0.113.{n}"));
        statuses.push(app.send(request).await.status());
    }
    assert_eq!(
        statuses,
        [
            StatusCode::UNAUTHORIZED,
            StatusCode::UNAUTHORIZED,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::TOO_MANY_REQUESTS,
        ]
    );

    let other_peer = app.send(failed_login_from([198, 51, 100, 8], "203.0.113.0")).await;
    assert_eq!(other_peer.status(), StatusCode::UNAUTHORIZED);

    let admin = app.login("admin", ADMIN_PASSWORD).await;
    let response = app.get("/api/v1/metrics", Some(&admin)).await;
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["login_failures"], 3);
    assert_eq!(body["throttled"], 2);
}

#[tokio::test]
async fn test_login_then_browse() {
    let app = test_app().await;
    app.sop("Fire Drill").await;
    let cookie = app.login("admin", ADMIN_PASSWORD).await;

    let response = app.get("/?q=alarm", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Fire Drill"));
    assert!(body.contains("Safety"));
}

#[tokio::test]
async fn test_forced_reset_redirects_to_account() {
    let app = test_app().await;
    auth::create_user(&app.pool, None, "newhire", STAFF_PASSWORD, Role::Staff, None, true)
        .await
        .unwrap();

    let response = app
        .post_form("/login", None, &format!("username=newhire&password={STAFF_PASSWORD}"))
        .await;
    assert_eq!(location(&response), "/account?force=1");
    let cookie = app.login("newhire", STAFF_PASSWORD).await;

    let response = app.get("/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/account?force=1");

    let response = app
        .post_form(
            "/account",
            Some(&cookie),
            &format!("current_password={STAFF_PASSWORD}&new_password=Fresh1Pass&confirm_password=Fresh1Pass"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("Password updated."));

    let response = app.get("/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// -- Access Control -----------------------------------------------------------

#[tokio::test]
async fn test_staff_cannot_reach_admin_routes() {
    let app = test_app().await;
    app.staff_user("ann").await;
    let cookie = app.login("ann", STAFF_PASSWORD).await;

    for uri in [
        "/admin",
        "/admin/new",
        "/admin/staff",
        "/admin/users",
        "/admin/audit",
        "/admin/export/acknowledgments.csv",
        "/compliance",
    ] {
        let response = app.get(uri, Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
    }

    let response = app
        .post_form("/admin/new", Some(&cookie), "title=X&category=Y&content=long+enough+text")
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(db::sops::count(&app.pool).await.unwrap(), 0);
}

#[tokio::test]
async fn test_training_lead_sees_compliance_not_admin() {
    let app = test_app().await;
    auth::create_user(&app.pool, None, "lead", STAFF_PASSWORD, Role::TrainingLead, None, false)
        .await
        .unwrap();
    let cookie = app.login("lead", STAFF_PASSWORD).await;

    assert_eq!(app.get("/compliance", Some(&cookie)).await.status(), StatusCode::OK);
    assert_eq!(app.get("/admin", Some(&cookie)).await.status(), StatusCode::FORBIDDEN);
}

// -- SOP Administration -------------------------------------------------------

#[tokio::test]
async fn test_admin_creates_and_edits_sop() {
    let app = test_app().await;
    let cookie = app.login("admin", ADMIN_PASSWORD).await;

    let response = app
        .post_form(
            "/admin/new",
            Some(&cookie),
            "title=Hand+Hygiene&category=Infection+Control&content=Wash+hands+for+twenty+seconds.",
        )
        .await;
    assert_eq!(location(&response), "/admin?notice=created");
    let id = db::sops::list_recent(&app.pool).await.unwrap()[0].id;

    let response = app
        .post_form(
            &format!("/admin/edit/{id}"),
            Some(&cookie),
            "title=Hand+Hygiene&category=Infection+Control&content=Wash+hands+for+thirty+seconds.",
        )
        .await;
    assert_eq!(location(&response), "/admin?notice=updated");
    let sop = db::sops::get(&app.pool, id).await.unwrap().unwrap();
    assert_eq!(sop.current_version, 2);
    assert_eq!(db::sops::versions(&app.pool, id).await.unwrap().len(), 2);

    let response = app
        .post_form("/admin/new", Some(&cookie), "title=&category=Safety&content=short")
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app.get("/admin/edit/9999", Some(&cookie)).await;
    assert_eq!(location(&response), "/admin");
}

// -- Roster Import ------------------------------------------------------------

#[tokio::test]
async fn test_roster_import_dedupes_and_skips_blanks() {
    let app = test_app().await;
    let cookie = app.login("admin", ADMIN_PASSWORD).await;

    let csv = "Name,job_title,department\nAnn Lee,Nurse,Clinical\n ann  lee ,Nurse,Clinical\n,Orphan,Nowhere\nBo Chan,Cook,Dietary\n";
    let boundary = "soptrackboundary";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"roster.csv\"\r\nContent-Type: text/csv\r\n\r\n{csv}\r\n--{boundary}--\r\n"
    );
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/admin/staff/import")
                .header(header::COOKIE, &cookie)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "/admin/staff?inserted=2&duplicates=1&skipped=1"
    );

    let staff = db::staff::list(&app.pool).await.unwrap();
    let names: Vec<_> = staff.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Ann Lee", "Bo Chan"]);

    let response = app
        .get("/admin/staff?inserted=2&duplicates=1&skipped=1", Some(&cookie))
        .await;
    assert!(body_string(response).await.contains("2 added"));
}

// -- Acknowledgments ----------------------------------------------------------

#[tokio::test]
async fn test_expired_acknowledgment_can_be_renewed() {
    let app = test_app().await;
    let sop_id = app.sop("Fire Drill").await;
    app.staff_user("ann").await;
    let cookie = app.login("ann", STAFF_PASSWORD).await;
    let uri = format!("/sop/{sop_id}/ack");

    let response = app
        .post_form(&uri, Some(&cookie), "signature_text=Ann&read_seconds=30")
        .await;
    assert_eq!(location(&response), format!("/sop/{sop_id}?notice=acknowledged"));
    sqlx::query("UPDATE acknowledgments SET acknowledged_at = datetime('now', '-400 days')")
        .execute(&app.pool)
        .await
        .unwrap();

    let response = app
        .post_form(&uri, Some(&cookie), "signature_text=Ann+Lee&read_seconds=30")
        .await;
    assert_eq!(location(&response), format!("/sop/{sop_id}?notice=acknowledged"));

    let acks = db::acknowledgments::for_sop(&app.pool, sop_id).await.unwrap();
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0].signature_text, "Ann Lee");
}

#[tokio::test]
async fn test_acknowledgment_is_recorded_once_per_version() {
    let app = test_app().await;
    let sop_id = app.sop("Fire Drill").await;
    app.staff_user("ann").await;
    let cookie = app.login("ann", STAFF_PASSWORD).await;
    let uri = format!("/sop/{sop_id}/ack");

    let response = app
        .post_form(&uri, Some(&cookie), "signature_text=Ann&read_seconds=3")
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .post_form(&uri, Some(&cookie), "signature_text=Ann&read_seconds=30")
        .await;
    assert_eq!(location(&response), format!("/sop/{sop_id}?notice=acknowledged"));

    let response = app
        .post_form(&uri, Some(&cookie), "signature_text=Ann&read_seconds=45")
        .await;
    assert_eq!(location(&response), format!("/sop/{sop_id}?notice=already"));

    let acks = db::acknowledgments::for_sop(&app.pool, sop_id).await.unwrap();
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0].sop_version, 1);
    assert_eq!(acks[0].signature_text, "Ann");

    // A new version needs a new acknowledgment.
    let draft = SopInputs::draft("Fire Drill");
    let draft = SopDraft {
        content: format!("{} Use the east stairwell.", draft.content),
        ..draft
    };
    db::sops::update(&app.pool, sop_id, &draft, None).await.unwrap();
    let response = app
        .post_form(&uri, Some(&cookie), "signature_text=Ann&read_seconds=30")
        .await;
    assert_eq!(location(&response), format!("/sop/{sop_id}?notice=acknowledged"));
    assert_eq!(db::acknowledgments::for_sop(&app.pool, sop_id).await.unwrap().len(), 2);
}

// -- Compliance ---------------------------------------------------------------

#[tokio::test]
async fn test_compliance_rate_and_export() {
    let app = test_app().await;
    let sop_id = app.sop("Fire Drill").await;
    for name in ["ann", "bo"] {
        app.staff_user(name).await;
    }
    for name in ["Cy Diaz", "Di Ng"] {
        let mut conn = app.pool.acquire().await.unwrap();
        db::staff::find_or_create(&mut conn, &StaffDraft::from_name(name).unwrap())
            .await
            .unwrap();
    }
    let ann = app.login("ann", STAFF_PASSWORD).await;
    app.post_form(&format!("/sop/{sop_id}/ack"), Some(&ann), "signature_text=Ann&read_seconds=30")
        .await;

    let admin = app.login("admin", ADMIN_PASSWORD).await;
    let response = app.get("/api/v1/compliance", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["staff_count"], 4);
    assert_eq!(body["sops"][0]["rate"]["acknowledged"], 1);
    assert_eq!(body["sops"][0]["rate"]["eligible"], 4);
    assert_eq!(body["sops"][0]["rate"]["percent"], 25.0);

    let response = app.get("/compliance", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("Fire Drill"));

    // A window that ends before today's acknowledgment excludes it.
    let response = app
        .get("/compliance/export.csv?end_date=2000-01-01", Some(&admin))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let csv = body_string(response).await;
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("sop_id,title,category,current_version,acknowledged,eligible,rate_percent")
    );
    assert_eq!(lines.next(), Some(format!("{sop_id},Fire Drill,Safety,1,0,4,0.0").as_str()));
}

// -- Exports ------------------------------------------------------------------

#[tokio::test]
async fn test_admin_csv_exports() {
    let app = test_app().await;
    let sop_id = app.sop("Fire Drill").await;
    app.staff_user("ann").await;
    let ann = app.login("ann", STAFF_PASSWORD).await;
    app.post_form(&format!("/sop/{sop_id}/ack"), Some(&ann), "signature_text=Ann&read_seconds=30")
        .await;
    let admin = app.login("admin", ADMIN_PASSWORD).await;

    let response = app.get("/admin/export/acknowledgments.csv", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/csv; charset=utf-8"
    );
    let csv = body_string(response).await;
    assert!(csv.starts_with(
        "acknowledged_at,sop_title,category,staff_name,sop_version,read_seconds,ip_address\n"
    ));
    assert!(csv.contains(",Fire Drill,Safety,ann,1,30,"));

    let csv = body_string(app.get("/admin/export/sops.csv", Some(&admin)).await).await;
    assert!(csv.starts_with("title,category,current_version,updated_at\n"));

    let csv = body_string(app.get("/admin/export/audit.csv", Some(&admin)).await).await;
    assert!(csv.starts_with("created_at,action,entity_type,entity_id,details,username\n"));
    assert!(csv.contains("acknowledged"));
}

// -- Users and Audit ----------------------------------------------------------

#[tokio::test]
async fn test_user_admin_actions_are_audited() {
    let app = test_app().await;
    let admin = app.login("admin", ADMIN_PASSWORD).await;

    let response = app
        .post_form(
            "/admin/users/new",
            Some(&admin),
            &format!("username=Cara&password={STAFF_PASSWORD}&role=staff&staff_id="),
        )
        .await;
    assert_eq!(location(&response), "/admin/users?notice=created");
    let cara = db::users::find_by_username(&app.pool, "cara").await.unwrap().unwrap();
    assert!(cara.must_reset_password);
    assert!(cara.staff_id.is_some());

    let response = app
        .post_form(
            "/admin/users/new",
            Some(&admin),
            &format!("username=cara&password={STAFF_PASSWORD}&role=staff"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(body_string(response).await.contains("Username already exists"));

    let admin_id = db::users::find_by_username(&app.pool, "admin").await.unwrap().unwrap().id;
    let response = app
        .post_form(&format!("/admin/users/{admin_id}/toggle"), Some(&admin), "")
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .post_form(&format!("/admin/users/{}/toggle", cara.id), Some(&admin), "")
        .await;
    assert_eq!(location(&response), "/admin/users?notice=toggled");
    let cara = db::users::get(&app.pool, cara.id).await.unwrap().unwrap();
    assert!(!cara.active);

    let response = app.get("/admin/audit?action=toggle", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("active=0"));
}

// -- JSON API -----------------------------------------------------------------

#[tokio::test]
async fn test_api_requires_session_and_role() {
    let app = test_app().await;
    let response = app.get("/api/v1/sops", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    app.staff_user("ann").await;
    let ann = app.login("ann", STAFF_PASSWORD).await;
    assert_eq!(app.get("/api/v1/sops", Some(&ann)).await.status(), StatusCode::FORBIDDEN);

    let admin = app.login("admin", ADMIN_PASSWORD).await;
    let response = app.get("/api/v1/metrics", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(body["requests"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn test_openapi_spec_served() {
    let app = test_app().await;
    let response = app.get("/openapi.json", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("/api/v1/compliance"));
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let app = test_app().await;
    let response = app.get("/no/such/page", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
