//! Wisp HTTP REST API
//!
//! Axum-based HTTP server exposing users, test results, professionals,
//! sessions, chat messages and plans over JSON.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to an
//! inner function returning `(StatusCode, serde_json::Value)`. The inner
//! functions take a [`Gateway`] and are tested directly against the
//! in-memory store.
//!
//! Endpoints:
//! - GET  /                     - liveness message
//! - GET  /test                 - store diagnostics
//! - GET  /plans                - subscription plans, seeded when empty
//! - POST /users                - create a user
//! - POST /results              - store a test result
//! - GET  /results/:user_id     - a user's test results
//! - GET  /professionals        - directory listing, seeded when empty
//! - POST /sessions             - book a session
//! - GET  /sessions/:user_id    - a user's sessions
//! - POST /messages             - append a chat message
//! - GET  /messages/:user_id    - a user's chat history
//!
//! Seeding has no lock: concurrent first reads of an empty plan or
//! professional collection can each insert a default set.

use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use wisp_core::config::HttpConfig;
use wisp_core::models::{
    parse_entity, Entity, FieldError, Message, Plan, Professional, Session, TestResult, Timestamp,
    User,
};
use wisp_core::{owner_filter, seed, ConnectionHealth, Document, Gateway, Record, StoreError};

/// Per-owner listing caps.
pub const RESULTS_LIMIT: i64 = 50;
pub const SESSIONS_LIMIT: i64 = 50;
pub const MESSAGES_LIMIT: i64 = 100;
pub const PROFESSIONALS_LIMIT: i64 = 50;

/// Store error text in `/test` is cut to this many characters.
const ERROR_PREVIEW_CHARS: usize = 80;

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub gateway: Gateway,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/test", get(diagnostics_handler))
        .route("/plans", get(plans_handler))
        .route("/users", post(create_user_handler))
        .route("/results", post(create_result_handler))
        .route("/results/:user_id", get(list_results_handler))
        .route("/professionals", get(professionals_handler))
        .route("/sessions", post(create_session_handler))
        .route("/sessions/:user_id", get(list_sessions_handler))
        .route("/messages", post(create_message_handler))
        .route("/messages/:user_id", get(list_messages_handler))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Any origin, method and header, with credentials.
pub fn cors_layer() -> CorsLayer {
    // Wildcards are rejected alongside credentials, so mirror the request instead.
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    gateway: Gateway,
    http: &HttpConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = http.socket_addr();
    let state = Arc::new(HttpState { gateway });

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Wisp HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Error bodies
// ============================================================================

/// Standard HTTP error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Vec<FieldError>>,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            status: "error".to_string(),
            detail: None,
        }
    }

    pub fn validation(detail: Vec<FieldError>) -> Self {
        Self {
            error: "validation failed".to_string(),
            status: "error".to_string(),
            detail: Some(detail),
        }
    }
}

fn validation_failed(collection: &str, detail: Vec<FieldError>) -> (StatusCode, Value) {
    tracing::debug!(collection, errors = detail.len(), "Rejected invalid request body");
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        json!(ErrorResponse::validation(detail)),
    )
}

fn storage_failed(collection: &str, err: &StoreError) -> (StatusCode, Value) {
    let status = match err {
        StoreError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::error!(collection, error = %err, "Store operation failed");
    (status, json!(ErrorResponse::new(err.to_string())))
}

/// A body that was not JSON at all, reported like any other validation error.
fn unreadable_body(collection: &str, rejection: JsonRejection) -> (StatusCode, Value) {
    validation_failed(
        collection,
        vec![FieldError::new("body", rejection.body_text())],
    )
}

fn set_flag(present: bool) -> &'static str {
    if present {
        "✅ Set"
    } else {
        "❌ Not Set"
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

// ============================================================================
// Inner (directly testable) functions
// ============================================================================

/// Liveness message (pure, no IO).
pub fn root_inner() -> Value {
    json!({ "message": "Wisp backend is live" })
}

/// Diagnostic report. Store failures are folded into status strings; this
/// endpoint always answers 200.
pub async fn diagnostics_inner(gateway: &Gateway) -> Value {
    let report = gateway.health_check().await;

    let (database, connection_status, collections) = match report.connection {
        ConnectionHealth::Uninitialized => (
            "⚠️  Available but not initialized".to_string(),
            "Not Connected",
            Vec::new(),
        ),
        ConnectionHealth::Connected { collections } => (
            "✅ Connected & Working".to_string(),
            "Connected",
            collections,
        ),
        ConnectionHealth::Erroring(msg) => (
            format!(
                "⚠️  Connected but Error: {}",
                truncate_chars(&msg, ERROR_PREVIEW_CHARS)
            ),
            "Not Connected",
            Vec::new(),
        ),
    };

    json!({
        "backend": if report.reachable { "✅ Running" } else { "❌ Not Running" },
        "database": database,
        "database_url": set_flag(report.config.database_url),
        "database_name": set_flag(report.config.database_name),
        "connection_status": connection_status,
        "collections": collections,
    })
}

async fn insert_record<T: Entity>(gateway: &Gateway, record: &T) -> (StatusCode, Value) {
    match gateway.insert(T::COLLECTION, record).await {
        Ok(id) => {
            tracing::info!(collection = T::COLLECTION, %id, "Created record");
            (StatusCode::OK, json!({ "id": id }))
        }
        Err(e) => storage_failed(T::COLLECTION, &e),
    }
}

/// Validate `body` as `T` and insert it. Nothing touches the store when
/// validation fails.
pub async fn create_inner<T: Entity>(gateway: &Gateway, body: Value) -> (StatusCode, Value) {
    match parse_entity::<T>(body) {
        Ok(record) => insert_record(gateway, &record).await,
        Err(detail) => validation_failed(T::COLLECTION, detail),
    }
}

/// Like [`create_inner`], stamping `taken_at` with the current UTC time
/// when the client omitted it.
pub async fn create_result_inner(gateway: &Gateway, body: Value) -> (StatusCode, Value) {
    let mut result = match parse_entity::<TestResult>(body) {
        Ok(r) => r,
        Err(detail) => return validation_failed(TestResult::COLLECTION, detail),
    };
    result.stamp_if_missing(Timestamp::now());
    insert_record(gateway, &result).await
}

/// Records owned by `user_id`, capped at `limit`, with `id` normalized.
pub async fn list_by_owner_inner(
    gateway: &Gateway,
    collection: &str,
    user_id: &str,
    limit: i64,
) -> (StatusCode, Value) {
    match gateway
        .query(collection, owner_filter(user_id), Some(limit))
        .await
    {
        Ok(records) => {
            let items: Vec<Value> = records.into_iter().map(Record::into_item).collect();
            (StatusCode::OK, json!({ "items": items }))
        }
        Err(e) => storage_failed(collection, &e),
    }
}

/// Plans listing. An empty collection is seeded with the default tiers,
/// which are returned as inserted. Otherwise stored documents are rebuilt
/// field by field and any that do not decode are skipped.
pub async fn plans_inner(gateway: &Gateway) -> (StatusCode, Value) {
    let existing = match gateway.query(Plan::COLLECTION, Document::new(), None).await {
        Ok(records) => records,
        Err(e) => return storage_failed(Plan::COLLECTION, &e),
    };

    if existing.is_empty() {
        let defaults = seed::default_plans();
        for plan in &defaults {
            if let Err(e) = gateway.insert(Plan::COLLECTION, plan).await {
                return storage_failed(Plan::COLLECTION, &e);
            }
        }
        tracing::info!(count = defaults.len(), "Seeded default plans");
        return (StatusCode::OK, json!(defaults));
    }

    let total = existing.len();
    let plans: Vec<Plan> = existing
        .iter()
        .filter_map(|r| Plan::from_document(&r.fields))
        .collect();
    if plans.len() < total {
        tracing::warn!(skipped = total - plans.len(), "Skipped malformed plan documents");
    }
    (StatusCode::OK, json!(plans))
}

/// Professionals listing. An empty collection is seeded with the default
/// directory; those records come back from memory with the ids the store
/// just assigned, not from a second read.
pub async fn professionals_inner(gateway: &Gateway) -> (StatusCode, Value) {
    let existing = match gateway
        .query(
            Professional::COLLECTION,
            Document::new(),
            Some(PROFESSIONALS_LIMIT),
        )
        .await
    {
        Ok(records) => records,
        Err(e) => return storage_failed(Professional::COLLECTION, &e),
    };

    let items: Vec<Value> = if existing.is_empty() {
        let mut seeded = Vec::new();
        for professional in seed::default_professionals() {
            let id = match gateway.insert(Professional::COLLECTION, &professional).await {
                Ok(id) => id,
                Err(e) => return storage_failed(Professional::COLLECTION, &e),
            };
            let mut item = json!(professional);
            item["id"] = Value::String(id);
            seeded.push(item);
        }
        tracing::info!(count = seeded.len(), "Seeded default professionals");
        seeded
    } else {
        existing.into_iter().map(Record::into_item).collect()
    };

    (StatusCode::OK, json!({ "items": items }))
}

// ============================================================================
// Axum handler wrappers (thin, delegate to inner functions)
// ============================================================================

type Payload = std::result::Result<Json<Value>, JsonRejection>;

async fn create_from_payload<T: Entity>(gateway: &Gateway, payload: Payload) -> (StatusCode, Value) {
    match payload {
        Ok(Json(body)) => create_inner::<T>(gateway, body).await,
        Err(rejection) => unreadable_body(T::COLLECTION, rejection),
    }
}

pub async fn root_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(root_inner()))
}

pub async fn diagnostics_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(diagnostics_inner(&state.gateway).await))
}

pub async fn plans_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = plans_inner(&state.gateway).await;
    (status, Json(body))
}

pub async fn create_user_handler(
    State(state): State<Arc<HttpState>>,
    payload: Payload,
) -> impl IntoResponse {
    let (status, body) = create_from_payload::<User>(&state.gateway, payload).await;
    (status, Json(body))
}

pub async fn create_result_handler(
    State(state): State<Arc<HttpState>>,
    payload: Payload,
) -> impl IntoResponse {
    let (status, body) = match payload {
        Ok(Json(body)) => create_result_inner(&state.gateway, body).await,
        Err(rejection) => unreadable_body(TestResult::COLLECTION, rejection),
    };
    (status, Json(body))
}

pub async fn list_results_handler(
    State(state): State<Arc<HttpState>>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let (status, body) =
        list_by_owner_inner(&state.gateway, TestResult::COLLECTION, &user_id, RESULTS_LIMIT).await;
    (status, Json(body))
}

pub async fn professionals_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = professionals_inner(&state.gateway).await;
    (status, Json(body))
}

pub async fn create_session_handler(
    State(state): State<Arc<HttpState>>,
    payload: Payload,
) -> impl IntoResponse {
    let (status, body) = create_from_payload::<Session>(&state.gateway, payload).await;
    (status, Json(body))
}

pub async fn list_sessions_handler(
    State(state): State<Arc<HttpState>>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let (status, body) =
        list_by_owner_inner(&state.gateway, Session::COLLECTION, &user_id, SESSIONS_LIMIT).await;
    (status, Json(body))
}

pub async fn create_message_handler(
    State(state): State<Arc<HttpState>>,
    payload: Payload,
) -> impl IntoResponse {
    let (status, body) = create_from_payload::<Message>(&state.gateway, payload).await;
    (status, Json(body))
}

pub async fn list_messages_handler(
    State(state): State<Arc<HttpState>>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let (status, body) =
        list_by_owner_inner(&state.gateway, Message::COLLECTION, &user_id, MESSAGES_LIMIT).await;
    (status, Json(body))
}

// ============================================================================
// Unit Tests: call inner functions directly against the in-memory store
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wisp_core::{ConfigPresence, DocumentStore, MemoryStore};

    fn make_gateway() -> (Arc<MemoryStore>, Gateway) {
        let store = Arc::new(MemoryStore::new());
        let presence = ConfigPresence {
            database_url: true,
            database_name: true,
        };
        (store.clone(), Gateway::new(store, presence))
    }

    #[test]
    fn test_root_inner_pure() {
        assert_eq!(root_inner()["message"], "Wisp backend is live");
    }

    #[test]
    fn test_truncate_chars_counts_characters_not_bytes() {
        let s = "é".repeat(100);
        assert_eq!(truncate_chars(&s, ERROR_PREVIEW_CHARS).chars().count(), 80);
        assert_eq!(truncate_chars("short", ERROR_PREVIEW_CHARS), "short");
    }

    #[tokio::test]
    async fn test_create_user_returns_id() {
        let (store, gateway) = make_gateway();
        let (status, body) = create_inner::<User>(
            &gateway,
            json!({"name": "Noa", "email": "noa@example.com"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["id"].is_string());
        assert_eq!(store.len(User::COLLECTION), 1);
    }

    #[tokio::test]
    async fn test_create_user_missing_email_touches_nothing() {
        let (store, gateway) = make_gateway();
        let (status, body) = create_inner::<User>(&gateway, json!({"name": "Noa"})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["status"], "error");
        assert_eq!(body["detail"][0]["field"], "email");
        assert_eq!(store.insert_count(), 0);
    }

    #[tokio::test]
    async fn test_create_result_stamps_taken_at() {
        let (store, gateway) = make_gateway();
        let (status, _) = create_result_inner(
            &gateway,
            json!({
                "user_id": "u1",
                "answers": ["red"],
                "archetype": "Spark",
                "summary": "Bright",
                "score_map": {"energy": 3}
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let docs = store
            .find(TestResult::COLLECTION, &Document::new(), None)
            .await
            .unwrap();
        let stamped = docs[0].body["taken_at"].as_str().unwrap();
        assert!(!stamped.is_empty());
    }

    #[tokio::test]
    async fn test_list_by_owner_empty_is_ok() {
        let (_store, gateway) = make_gateway();
        let (status, body) =
            list_by_owner_inner(&gateway, Session::COLLECTION, "nobody", SESSIONS_LIMIT).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"], json!([]));
    }

    #[tokio::test]
    async fn test_list_by_owner_caps_results() {
        let (_store, gateway) = make_gateway();
        for i in 0..(MESSAGES_LIMIT + 5) {
            let (status, _) = create_inner::<Message>(
                &gateway,
                json!({"user_id": "chatty", "role": "user", "content": format!("m{}", i)}),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }
        let (_, body) =
            list_by_owner_inner(&gateway, Message::COLLECTION, "chatty", MESSAGES_LIMIT).await;
        let items = body["items"].as_array().unwrap();
        assert_eq!(items.len() as i64, MESSAGES_LIMIT);
        assert_eq!(items[0]["content"], "m0");
    }

    #[tokio::test]
    async fn test_plans_seed_once_then_read_back() {
        let (store, gateway) = make_gateway();

        let (status, first) = plans_inner(&gateway).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first.as_array().unwrap().len(), 3);
        assert_eq!(store.len(Plan::COLLECTION), 3);

        let (_, second) = plans_inner(&gateway).await;
        assert_eq!(second, first);
        assert_eq!(store.len(Plan::COLLECTION), 3, "second read must not reseed");
    }

    #[tokio::test]
    async fn test_plans_skip_malformed_documents() {
        let (_store, gateway) = make_gateway();
        gateway
            .insert(Plan::COLLECTION, &json!({"id": "legacy", "name": "Legacy"}))
            .await
            .unwrap();
        gateway
            .insert(
                Plan::COLLECTION,
                &json!({"id": "team", "name": "Team", "price": 49.0, "interval": "year", "features": []}),
            )
            .await
            .unwrap();

        let (status, body) = plans_inner(&gateway).await;
        assert_eq!(status, StatusCode::OK);
        let plans = body.as_array().unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0]["id"], "team");
        assert_eq!(plans[0]["interval"], "year");
    }

    #[tokio::test]
    async fn test_professionals_seeded_items_carry_store_ids() {
        let (store, gateway) = make_gateway();
        let (status, body) = professionals_inner(&gateway).await;
        assert_eq!(status, StatusCode::OK);

        let items = body["items"].as_array().unwrap();
        assert_eq!(items.len(), 3);
        let stored = store
            .find(Professional::COLLECTION, &Document::new(), None)
            .await
            .unwrap();
        for (item, doc) in items.iter().zip(&stored) {
            assert_eq!(item["id"], doc.id.to_string());
            assert_eq!(item["rating"], 4.8);
        }
    }

    #[tokio::test]
    async fn test_degraded_gateway_returns_503() {
        let gateway = Gateway::uninitialized(ConfigPresence::default());

        let (status, body) = plans_inner(&gateway).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "error");

        let (status, _) = create_inner::<Message>(
            &gateway,
            json!({"user_id": "u1", "role": "user", "content": "hi"}),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) =
            list_by_owner_inner(&gateway, Message::COLLECTION, "u1", MESSAGES_LIMIT).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_diagnostics_uninitialized() {
        let gateway = Gateway::uninitialized(ConfigPresence {
            database_url: false,
            database_name: true,
        });
        let body = diagnostics_inner(&gateway).await;
        assert_eq!(body["backend"], "✅ Running");
        assert_eq!(body["database"], "⚠️  Available but not initialized");
        assert_eq!(body["database_url"], "❌ Not Set");
        assert_eq!(body["database_name"], "✅ Set");
        assert_eq!(body["connection_status"], "Not Connected");
        assert_eq!(body["collections"], json!([]));
    }

    #[tokio::test]
    async fn test_diagnostics_connected_and_erroring() {
        let (store, gateway) = make_gateway();
        create_inner::<User>(&gateway, json!({"name": "A", "email": "a@example.com"})).await;

        let body = diagnostics_inner(&gateway).await;
        assert_eq!(body["database"], "✅ Connected & Working");
        assert_eq!(body["connection_status"], "Connected");
        assert_eq!(body["collections"], json!(["user"]));

        store.fail_collection_listing("x".repeat(200));
        let body = diagnostics_inner(&gateway).await;
        let database = body["database"].as_str().unwrap();
        assert!(database.starts_with("⚠️  Connected but Error: "));
        let detail = database.trim_start_matches("⚠️  Connected but Error: ");
        assert!(detail.chars().count() <= ERROR_PREVIEW_CHARS);
        assert_eq!(body["connection_status"], "Not Connected");
    }
}
