// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use exam_portal::{
    config::{CatalogSource, Config},
    models::{session::TokenPayload, user::User},
    routes,
    state::AppState,
    storage::{KeyValueStore, SqliteStore},
    utils::jwt::{now_secs, sign_token},
};
use serde_json::{Value, json};

pub const SIGNING_KEY: &str = "wordpress-plugin-signing-key-for-tests";

/// What the fake WordPress backend has seen and how it should behave.
#[derive(Default)]
pub struct WordPressState {
    pub submitted: Vec<Value>,
    pub reject_submissions: bool,
    pub user_results: Vec<Value>,
    pub user_data: Option<Value>,
    pub name_updates: Vec<String>,
    /// Holds `/user-results` and `/result/{id}` answers back this long.
    pub results_delay: Duration,
}

pub type SharedWordPress = Arc<Mutex<WordPressState>>;

fn wp_error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({ "code": code, "message": message, "data": { "status": status.as_u16() } })),
    )
        .into_response()
}

async fn app_config() -> Json<Value> {
    let raw = include_str!("../../data/catalog.json");
    Json(serde_json::from_str(raw).expect("catalog fixture"))
}

async fn submit_result(State(wp): State<SharedWordPress>, Json(body): Json<Value>) -> Response {
    let mut wp = wp.lock().unwrap();
    if wp.reject_submissions {
        return wp_error(
            StatusCode::FORBIDDEN,
            "jwt_auth_invalid_token",
            "Expired token",
        );
    }
    wp.submitted.push(body.clone());
    Json(body).into_response()
}

async fn results_delay(wp: &SharedWordPress) {
    let delay = wp.lock().unwrap().results_delay;
    tokio::time::sleep(delay).await;
}

async fn user_results(State(wp): State<SharedWordPress>) -> Json<Value> {
    results_delay(&wp).await;
    Json(Value::Array(wp.lock().unwrap().user_results.clone()))
}

async fn single_result(State(wp): State<SharedWordPress>, Path(test_id): Path<String>) -> Response {
    results_delay(&wp).await;
    let wp = wp.lock().unwrap();
    match wp.user_results.iter().find(|r| r["testId"] == test_id.as_str()) {
        Some(result) => Json(result.clone()).into_response(),
        None => wp_error(StatusCode::NOT_FOUND, "not_found", "Result not found"),
    }
}

async fn certificate_data(Path(_test_id): Path<String>) -> Response {
    wp_error(
        StatusCode::FORBIDDEN,
        "not_earned",
        "Certificate not earned. A score of 70% is required.",
    )
}

async fn update_name(State(wp): State<SharedWordPress>, Json(body): Json<Value>) -> Response {
    let name = body["fullName"].as_str().unwrap_or_default().to_string();
    if name.is_empty() {
        return wp_error(StatusCode::BAD_REQUEST, "empty_name", "Full name cannot be empty.");
    }
    wp.lock().unwrap().name_updates.push(name);
    Json(json!({ "success": true, "message": "Name updated successfully." })).into_response()
}

async fn user_data(State(wp): State<SharedWordPress>) -> Response {
    match wp.lock().unwrap().user_data.clone() {
        Some(data) => Json(data).into_response(),
        None => wp_error(StatusCode::FORBIDDEN, "jwt_auth_invalid_token", "Expired token"),
    }
}

/// Spawns a stand-in for the `exam-app/v1` REST namespace.
/// Returns its base URL and a handle on its state.
pub async fn spawn_wordpress() -> (String, SharedWordPress) {
    let wp: SharedWordPress = Arc::new(Mutex::new(WordPressState::default()));

    let app = Router::new()
        .route("/app-config", get(app_config))
        .route("/submit-result", post(submit_result))
        .route("/user-results", get(user_results))
        .route("/result/{test_id}", get(single_result))
        .route("/certificate-data/{test_id}", get(certificate_data))
        .route("/update-name", post(update_name))
        .route("/get-user-data", get(user_data))
        .with_state(wp.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://127.0.0.1:{}", port), wp)
}

pub struct TestApp {
    pub address: String,
    pub store: Arc<dyn KeyValueStore>,
    pub state: AppState,
    pub wordpress: SharedWordPress,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn login(&self, token: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "token": token }))
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// Spawns the portal on a random port, wired to a fresh fake WordPress and
/// an in-memory SQLite store.
pub async fn spawn_app_with(catalog_source: CatalogSource) -> TestApp {
    let (wp_base, wordpress) = spawn_wordpress().await;

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        wp_api_base: wp_base,
        jwt_secret: None,
        catalog_source,
        session_check_interval_secs: 300,
        remote_timeout_secs: 5,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        static_dir: None,
        rust_log: "error".to_string(),
    };

    let store: Arc<dyn KeyValueStore> =
        Arc::new(SqliteStore::in_memory().await.expect("Failed to open test storage"));
    let state = AppState::new(config.clone(), store.clone()).expect("Failed to build state");
    state
        .catalog
        .load(config.catalog_source, &state.remote)
        .await
        .expect("Failed to load catalog");

    let app = routes::create_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        store,
        state,
        wordpress,
        client: reqwest::Client::new(),
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(CatalogSource::Bundled).await
}

pub fn user(id: &str, is_admin: bool) -> User {
    User {
        id: id.to_string(),
        name: "Jordan Smith".to_string(),
        email: "jordan@example.com".to_string(),
        is_admin,
    }
}

pub fn payload(user: User, paid: &[&str], exp: i64) -> TokenPayload {
    TokenPayload {
        iss: Some("https://www.coding-online.net".to_string()),
        iat: Some(now_secs()),
        exp: Some(exp),
        user,
        paid_exam_ids: paid.iter().map(|s| s.to_string()).collect(),
        exam_prices: None,
    }
}

/// A token like the one WordPress puts in the `#token=` redirect.
pub fn token_for(user: User, paid: &[&str]) -> String {
    sign_token(&payload(user, paid, now_secs() + 3_600), SIGNING_KEY).unwrap()
}

pub fn remote_result(test_id: &str, user_id: &str, exam_id: &str, score: f64, timestamp: i64) -> Value {
    json!({
        "testId": test_id,
        "userId": user_id,
        "examId": exam_id,
        "answers": [],
        "score": score,
        "correctCount": 0,
        "totalQuestions": 100,
        "timestamp": timestamp
    })
}

/// Waits for the background push of `test_id` to settle.
pub async fn wait_for_sync(app: &TestApp, test_id: &str) -> Value {
    for _ in 0..100 {
        let body: Value = app
            .client
            .get(app.url(&format!("/api/results/{}/sync", test_id)))
            .send()
            .await
            .expect("Failed to execute request")
            .json()
            .await
            .expect("Failed to parse sync status");
        if body["sync"]["status"] != "pending" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("sync of {} never settled", test_id);
}
