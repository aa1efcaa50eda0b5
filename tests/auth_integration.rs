use std::net::TcpListener;
use std::sync::Arc;

use authgate::auth::hash_password_with_cost;
use authgate::clock::ManualClock;
use authgate::configuration::JwtSettings;
use authgate::startup::{build_auth_service, run};
use authgate::store::{InMemorySessionStore, InMemoryUserStore, SessionStore, User};
use authgate::telemetry::init_test_telemetry;
use chrono::Duration;
use serde_json::{json, Value};

pub struct TestApp {
    pub address: String,
    pub clock: Arc<ManualClock>,
    pub sessions: Arc<InMemorySessionStore>,
    pub client: reqwest::Client,
}

async fn spawn_app() -> TestApp {
    init_test_telemetry();

    let listener = TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let clock = Arc::new(ManualClock::starting_now());
    let sessions = Arc::new(InMemorySessionStore::new());
    let users = Arc::new(InMemoryUserStore::new());

    users
        .insert(User {
            id: 1,
            name: "Ann".to_string(),
            email: "a@x.com".to_string(),
            password_hash: hash_password_with_cost("secret", 4).unwrap(),
            is_admin: false,
        })
        .await
        .expect("Failed to seed user");
    users
        .insert(User {
            id: 2,
            name: "Root".to_string(),
            email: "admin@x.com".to_string(),
            password_hash: hash_password_with_cost("admin-pass", 4).unwrap(),
            is_admin: true,
        })
        .await
        .expect("Failed to seed admin");

    let jwt = JwtSettings {
        secret: "test-secret-key-at-least-32-characters-long".to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 86400,
    };
    let auth = build_auth_service(&jwt, users, sessions.clone(), clock.clone())
        .expect("Failed to build auth service");

    let server = run(listener, auth).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        clock,
        sessions,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    async fn post_login(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(&format!("{}/auth/login", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn login(&self, email: &str, password: &str) -> Value {
        let response = self
            .post_login(&json!({"email": email, "password": password}))
            .await;
        assert_eq!(200, response.status().as_u16());
        response.json().await.expect("Failed to parse response")
    }

    async fn renew(&self, refresh_token: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}/auth/renew", &self.address))
            .json(&json!({"refresh_token": refresh_token}))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn logout(&self, access_token: &str, session_id: &str) -> reqwest::Response {
        self.client
            .delete(&format!("{}/api/sessions/{}", &self.address, session_id))
            .bearer_auth(access_token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn admin_revoke(&self, admin_token: &str, session_id: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}/admin/sessions/{}/revoke", &self.address, session_id))
            .bearer_auth(admin_token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn me(&self, access_token: &str) -> reqwest::Response {
        self.client
            .get(&format!("{}/api/me", &self.address))
            .bearer_auth(access_token)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

fn field<'a>(body: &'a Value, name: &str) -> &'a str {
    body[name]
        .as_str()
        .unwrap_or_else(|| panic!("missing string field {}", name))
}

async fn error_code(response: reqwest::Response) -> String {
    let body: Value = response.json().await.expect("Failed to parse error body");
    body["code"].as_str().unwrap_or_default().to_string()
}

// --- Login ---

#[tokio::test]
async fn login_returns_tokens_and_session() {
    let app = spawn_app().await;

    let body = app.login("a@x.com", "secret").await;

    assert!(body.get("access_token").is_some());
    assert!(body.get("refresh_token").is_some());
    assert!(body.get("access_token_expires_at").is_some());
    assert!(body.get("refresh_token_expires_at").is_some());
    assert_eq!(body["user"]["email"], "a@x.com");
    assert_eq!(body["user"]["is_admin"], false);
    assert!(body["user"].get("password_hash").is_none());

    let session = app
        .sessions
        .get(field(&body, "session_id"))
        .await
        .expect("Session should be stored");
    assert_eq!(session.user_email, "a@x.com");
    assert!(!session.is_revoked);
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_indistinguishable() {
    let app = spawn_app().await;

    let wrong = app
        .post_login(&json!({"email": "a@x.com", "password": "wrong"}))
        .await;
    let unknown = app
        .post_login(&json!({"email": "nosuch@x.com", "password": "anything"}))
        .await;

    assert_eq!(401, wrong.status().as_u16());
    assert_eq!(401, unknown.status().as_u16());

    let wrong_body: Value = wrong.json().await.unwrap();
    let unknown_body: Value = unknown.json().await.unwrap();
    assert_eq!(wrong_body["code"], "INVALID_CREDENTIALS");
    assert_eq!(wrong_body["code"], unknown_body["code"]);
    assert_eq!(wrong_body["message"], unknown_body["message"]);

    assert!(app.sessions.is_empty().await);
}

#[tokio::test]
async fn login_returns_400_for_missing_fields() {
    let app = spawn_app().await;

    let test_cases = vec![
        (json!({"password": "secret"}), "missing email"),
        (json!({"email": "a@x.com"}), "missing password"),
        (json!({"email": "  ", "password": "secret"}), "blank email"),
        (json!({}), "missing all fields"),
    ];

    for (body, reason) in test_cases {
        let response = app.post_login(&body).await;
        assert_eq!(400, response.status().as_u16(), "Should reject request: {}", reason);
    }
}

// --- Renewal ---

#[tokio::test]
async fn renew_returns_new_access_token() {
    let app = spawn_app().await;
    let login = app.login("a@x.com", "secret").await;

    let response = app.renew(field(&login, "refresh_token")).await;
    assert_eq!(200, response.status().as_u16());

    let renewed: Value = response.json().await.unwrap();
    assert_ne!(renewed["access_token"], login["access_token"]);
    assert!(renewed.get("refresh_token").is_none());

    let me = app.me(field(&renewed, "access_token")).await;
    assert_eq!(200, me.status().as_u16());

    // Same refresh token keeps working
    let again = app.renew(field(&login, "refresh_token")).await;
    assert_eq!(200, again.status().as_u16());
}

#[tokio::test]
async fn renew_rejects_forged_refresh_token() {
    let app = spawn_app().await;
    let login = app.login("a@x.com", "secret").await;

    let forged = format!("{}X", field(&login, "refresh_token"));
    let response = app.renew(&forged).await;

    assert_eq!(401, response.status().as_u16());
    assert_eq!(error_code(response).await, "TOKEN_INVALID");
}

#[tokio::test]
async fn renew_rejects_access_token() {
    let app = spawn_app().await;
    let login = app.login("a@x.com", "secret").await;

    let response = app.renew(field(&login, "access_token")).await;

    assert_eq!(401, response.status().as_u16());
    assert_eq!(error_code(response).await, "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn expired_refresh_token_is_rejected_even_with_live_session() {
    let app = spawn_app().await;
    let login = app.login("a@x.com", "secret").await;

    app.clock.advance(Duration::hours(24) + Duration::seconds(1));

    let response = app.renew(field(&login, "refresh_token")).await;
    assert_eq!(401, response.status().as_u16());
    assert_eq!(error_code(response).await, "TOKEN_EXPIRED");

    let session = app.sessions.get(field(&login, "session_id")).await.unwrap();
    assert!(!session.is_revoked);
}

// --- Revocation and logout ---

#[tokio::test]
async fn revoked_session_cannot_renew() {
    let app = spawn_app().await;
    let user = app.login("a@x.com", "secret").await;
    let admin = app.login("admin@x.com", "admin-pass").await;

    for _ in 0..2 {
        let response = app.renew(field(&user, "refresh_token")).await;
        assert_eq!(200, response.status().as_u16());
    }

    for _ in 0..2 {
        let response = app
            .admin_revoke(field(&admin, "access_token"), field(&user, "session_id"))
            .await;
        assert_eq!(204, response.status().as_u16());
    }

    for _ in 0..2 {
        let response = app.renew(field(&user, "refresh_token")).await;
        assert_eq!(401, response.status().as_u16());
        assert_eq!(error_code(response).await, "SESSION_REVOKED");
    }

    // Revoked rows are kept
    assert!(app.sessions.get(field(&user, "session_id")).await.unwrap().is_revoked);
}

#[tokio::test]
async fn non_admin_cannot_revoke() {
    let app = spawn_app().await;
    let user = app.login("a@x.com", "secret").await;

    let response = app
        .admin_revoke(field(&user, "access_token"), field(&user, "session_id"))
        .await;

    assert_eq!(403, response.status().as_u16());
    assert!(!app.sessions.get(field(&user, "session_id")).await.unwrap().is_revoked);
}

#[tokio::test]
async fn logout_is_idempotent() {
    let app = spawn_app().await;
    let login = app.login("a@x.com", "secret").await;
    let access_token = field(&login, "access_token");
    let session_id = field(&login, "session_id");

    assert_eq!(204, app.logout(access_token, session_id).await.status().as_u16());
    assert_eq!(204, app.logout(access_token, session_id).await.status().as_u16());

    let response = app.renew(field(&login, "refresh_token")).await;
    assert_eq!(401, response.status().as_u16());
    assert_eq!(error_code(response).await, "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn logout_requires_token_and_ownership() {
    let app = spawn_app().await;
    let user = app.login("a@x.com", "secret").await;
    let other = app.login("admin@x.com", "admin-pass").await;
    let session_id = field(&user, "session_id");

    let response = app
        .client
        .delete(&format!("{}/api/sessions/{}", &app.address, session_id))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());

    let response = app.logout(field(&other, "access_token"), session_id).await;
    assert_eq!(403, response.status().as_u16());

    assert!(app.sessions.get(session_id).await.is_ok());
    assert_eq!(200, app.renew(field(&user, "refresh_token")).await.status().as_u16());
}

#[tokio::test]
async fn revoke_all_own_sessions() {
    let app = spawn_app().await;
    let first = app.login("a@x.com", "secret").await;
    let second = app.login("a@x.com", "secret").await;

    let response = app
        .client
        .post(&format!("{}/api/sessions/revoke-all", &app.address))
        .bearer_auth(field(&second, "access_token"))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["revoked"], 2);

    for login in [&first, &second] {
        let response = app.renew(field(login, "refresh_token")).await;
        assert_eq!(error_code(response).await, "SESSION_REVOKED");
    }
}

// --- Protected routes ---

#[tokio::test]
async fn me_returns_claims_for_valid_token() {
    let app = spawn_app().await;
    let login = app.login("admin@x.com", "admin-pass").await;

    let response = app.me(field(&login, "access_token")).await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["id"], 2);
    assert_eq!(body["email"], "admin@x.com");
    assert_eq!(body["is_admin"], true);
}

#[tokio::test]
async fn me_requires_token() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(&format!("{}/api/me", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());
    assert_eq!(error_code(response).await, "MISSING_TOKEN");

    let response = app.me("invalid.token.here").await;
    assert_eq!(401, response.status().as_u16());
    assert_eq!(error_code(response).await, "TOKEN_INVALID");
}

#[tokio::test]
async fn expired_access_token_is_rejected_but_renewable() {
    let app = spawn_app().await;
    let login = app.login("a@x.com", "secret").await;

    app.clock.advance(Duration::minutes(15) + Duration::seconds(1));

    let response = app.me(field(&login, "access_token")).await;
    assert_eq!(401, response.status().as_u16());
    assert_eq!(error_code(response).await, "TOKEN_EXPIRED");

    let renewed = app.renew(field(&login, "refresh_token")).await;
    assert_eq!(200, renewed.status().as_u16());
    let renewed: Value = renewed.json().await.unwrap();

    let response = app.me(field(&renewed, "access_token")).await;
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn refresh_token_is_refused_on_protected_routes() {
    let app = spawn_app().await;
    let admin = app.login("admin@x.com", "admin-pass").await;
    let refresh_token = field(&admin, "refresh_token");
    let session_id = field(&admin, "session_id");

    let response = app.me(refresh_token).await;
    assert_eq!(401, response.status().as_u16());
    assert_eq!(error_code(response).await, "TOKEN_INVALID");

    let response = app.admin_revoke(refresh_token, session_id).await;
    assert_eq!(401, response.status().as_u16());
    assert!(!app.sessions.get(session_id).await.unwrap().is_revoked);

    // Still refused once the session is revoked and most of a day has passed
    let response = app.admin_revoke(field(&admin, "access_token"), session_id).await;
    assert_eq!(204, response.status().as_u16());
    app.clock.advance(Duration::hours(23));

    let response = app.me(refresh_token).await;
    assert_eq!(401, response.status().as_u16());
    assert_eq!(error_code(response).await, "TOKEN_INVALID");
}
