//! End-to-end checks of the gateway and API client against a local axum
//! server standing in for the pedidos backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};

use pedidos_client::net::orders::PedidoFilters;
use pedidos_client::net::types::{PedidoEstado, Prioridad, UserUpdate};
use pedidos_client::state::storage::{FileStorage, KeyValueStore, MemoryStorage};
use pedidos_client::{ApiClient, ApiError, AuthGateway, ClientConfig, Role, SessionStore};

const TOKEN: &str = "tok-1";

// =============================================================================
// MOCK SERVER
// =============================================================================

#[derive(Clone, Default)]
struct Mock {
    me_hits: Arc<AtomicUsize>,
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    changes: Arc<Mutex<Vec<(i64, Value)>>>,
    admin_calls: Arc<Mutex<Vec<Recorded>>>,
    user_list: Arc<Mutex<Option<Value>>>,
}

/// One request seen by the user-admin and statistics routes.
#[derive(Clone, Debug, PartialEq)]
struct Recorded {
    method: &'static str,
    path: String,
    bearer: bool,
    body: Value,
}

impl Mock {
    fn record(&self, method: &'static str, path: String, headers: &HeaderMap, body: Value) {
        self.admin_calls.lock().unwrap().push(Recorded { method, path, bearer: authorized(headers), body });
    }

    fn admin_calls(&self) -> Vec<Recorded> {
        self.admin_calls.lock().unwrap().clone()
    }
}

fn identity_json(name: &str) -> Value {
    json!({
        "id": 7,
        "email": "a@b.com",
        "full_name": name,
        "role": "staff",
        "is_active": true,
        "created_at": "2024-05-01T10:00:00Z"
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

fn denied() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "token expired" }))).into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] == "secret1" {
        Json(json!({ "access_token": TOKEN, "user": identity_json("Ana") })).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "bad credentials" }))).into_response()
    }
}

async fn register() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "<html>upstream exploded</html>").into_response()
}

async fn me(State(mock): State<Mock>, headers: HeaderMap) -> Response {
    mock.me_hits.fetch_add(1, Ordering::SeqCst);
    if authorized(&headers) { Json(identity_json("Ana Server")).into_response() } else { denied() }
}

async fn update_me(State(mock): State<Mock>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    mock.me_hits.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return denied();
    }
    let name = body["full_name"].as_str().unwrap_or_default().to_uppercase();
    Json(identity_json(&name)).into_response()
}

async fn pedidos(State(mock): State<Mock>, headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> Response {
    if !authorized(&headers) {
        return (StatusCode::FORBIDDEN, Json(json!({ "detail": "Not enough permissions" }))).into_response();
    }
    mock.queries.lock().unwrap().push(query);
    Json(json!({
        "pedidos": [{
            "id": 41,
            "estado": "pendiente_confirmacion",
            "prioridad": "alta",
            "resumen_items": "2x empanadas",
            "telegram_username": "cliente",
            "fecha_creacion": "2024-05-02T09:30:00Z"
        }]
    }))
    .into_response()
}

async fn cambiar_estado(State(mock): State<Mock>, Path(id): Path<i64>, Json(body): Json<Value>) -> StatusCode {
    mock.changes.lock().unwrap().push((id, body));
    StatusCode::OK
}

fn user_json(id: i64, email: &str, active: bool) -> Value {
    json!({
        "id": id,
        "email": email,
        "full_name": null,
        "role": "user",
        "is_active": active,
        "created_at": "2024-05-03T10:00:00Z"
    })
}

async fn list_users(State(mock): State<Mock>, headers: HeaderMap) -> Response {
    mock.record("GET", "/api/users/".to_owned(), &headers, Value::Null);
    let listing = mock.user_list.lock().unwrap().clone();
    let body = listing.unwrap_or_else(|| json!([identity_json("Ana"), user_json(8, "b@b.com", false)]));
    Json(body).into_response()
}

async fn get_user(State(mock): State<Mock>, Path(id): Path<String>, headers: HeaderMap) -> Response {
    mock.record("GET", format!("/api/users/{id}"), &headers, Value::Null);
    match id.parse::<i64>() {
        Ok(8) => Json(user_json(8, "b@b.com", false)).into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({ "detail": "User not found" }))).into_response(),
    }
}

async fn put_user(State(mock): State<Mock>, Path(id): Path<String>, headers: HeaderMap, Json(body): Json<Value>) -> StatusCode {
    mock.record("PUT", format!("/api/users/{id}"), &headers, body);
    StatusCode::OK
}

async fn patch_user(State(mock): State<Mock>, Path(id): Path<String>, headers: HeaderMap, Json(body): Json<Value>) -> StatusCode {
    mock.record("PATCH", format!("/api/users/{id}"), &headers, body);
    StatusCode::OK
}

async fn put_password(State(mock): State<Mock>, Path(id): Path<String>, headers: HeaderMap, Json(body): Json<Value>) -> StatusCode {
    mock.record("PUT", format!("/api/users/{id}/password"), &headers, body);
    StatusCode::OK
}

async fn estadisticas(State(mock): State<Mock>, headers: HeaderMap) -> Response {
    mock.record("GET", "/api/telegram/estadisticas".to_owned(), &headers, Value::Null);
    Json(json!({
        "total_pedidos": 5,
        "pedidos_por_estado": { "confirmado": 3, "cancelado": 2 }
    }))
    .into_response()
}

async fn spawn(mock: Mock) -> String {
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/users/me", get(me).put(update_me))
        .route("/api/telegram/pedidos", get(pedidos))
        .route("/api/telegram/pedidos/{id}/cambiar-estado", post(cambiar_estado))
        .route("/api/telegram/estadisticas", get(estadisticas))
        .route("/api/users/", get(list_users))
        .route("/api/users/{id}", get(get_user).put(put_user).patch(patch_user))
        .route("/api/users/{id}/password", put(put_password))
        .with_state(mock);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn gateway(mock: &Mock, storage: Arc<dyn KeyValueStore>) -> AuthGateway<ApiClient> {
    let base = spawn(mock.clone()).await;
    let config = ClientConfig::with_api_url(&base, "unused.json").unwrap();
    let session = SessionStore::new(storage);
    session.restore();
    AuthGateway::new(ApiClient::new(&config).unwrap(), session)
}

// =============================================================================
// AUTH
// =============================================================================

#[tokio::test]
async fn login_success_stores_identity_and_token() {
    let mock = Mock::default();
    let gw = gateway(&mock, Arc::new(MemoryStorage::new())).await;

    gw.login("a@b.com", "secret1").await.unwrap();

    let session = gw.session().current();
    assert_eq!(session.token(), Some(TOKEN));
    assert_eq!(session.role(), Some(Role::Staff));
    assert_eq!(session.identity().map(|i| i.id.as_str()), Some("7"));
}

#[tokio::test]
async fn login_rejected_reports_detail_and_keeps_session_empty() {
    let mock = Mock::default();
    let gw = gateway(&mock, Arc::new(MemoryStorage::new())).await;

    let err = gw.login("a@b.com", "wrong").await.unwrap_err();

    assert_eq!(err, ApiError::Unauthorized("bad credentials".into()));
    assert!(!gw.session().current().is_authenticated());
}

#[tokio::test]
async fn unreadable_error_body_falls_back_to_default_message() {
    let mock = Mock::default();
    let gw = gateway(&mock, Arc::new(MemoryStorage::new())).await;

    let err = gw.register("a@b.com", "secret1", None).await.unwrap_err();

    assert_eq!(err, ApiError::Unknown { status: Some(500), message: "registration failed".into() });
    assert!(!gw.session().current().is_authenticated());
}

#[tokio::test]
async fn profile_calls_without_token_never_reach_the_server() {
    let mock = Mock::default();
    let gw = gateway(&mock, Arc::new(MemoryStorage::new())).await;

    assert!(gw.update_profile(Some("Ana"), "a@b.com").await.unwrap_err().requires_reauth());
    assert!(gw.refresh_profile().await.unwrap_err().requires_reauth());
    assert_eq!(mock.me_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn update_profile_adopts_server_representation() {
    let mock = Mock::default();
    let gw = gateway(&mock, Arc::new(MemoryStorage::new())).await;
    gw.login("a@b.com", "secret1").await.unwrap();

    let identity = gw.update_profile(Some("  ana  "), "a@b.com").await.unwrap();

    assert_eq!(identity.display_name.as_deref(), Some("ANA"));
    assert_eq!(gw.session().current().identity(), Some(&identity));
    assert_eq!(gw.session().current().token(), Some(TOKEN));
}

#[tokio::test]
async fn session_survives_a_restart_through_the_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let mock = Mock::default();

    let gw = gateway(&mock, Arc::new(FileStorage::new(&path))).await;
    gw.login("a@b.com", "secret1").await.unwrap();
    let before = gw.session().current();

    let restarted = SessionStore::new(Arc::new(FileStorage::new(&path)));
    let after = restarted.restore();
    assert_eq!(after.identity(), before.identity());
    assert_eq!(after.token(), Some(TOKEN));

    let refreshed = AuthGateway::new(gw.backend().clone(), restarted);
    let identity = refreshed.refresh_profile().await.unwrap();
    assert_eq!(identity.display_name.as_deref(), Some("Ana Server"));
}

// =============================================================================
// ORDERS
// =============================================================================

#[tokio::test]
async fn order_list_sends_filters_and_decodes_page() {
    let mock = Mock::default();
    let gw = gateway(&mock, Arc::new(MemoryStorage::new())).await;
    let filters = PedidoFilters {
        estado: Some(PedidoEstado::PendienteConfirmacion),
        prioridad: Some(Prioridad::Alta),
        fecha_desde: Some(pedidos_client::net::orders::parse_filter_date("2024-05-01").unwrap()),
        ..PedidoFilters::default()
    };

    let pedidos = gw.backend().list_pedidos(TOKEN, &filters).await.unwrap();

    assert_eq!(pedidos.len(), 1);
    assert_eq!(pedidos[0].id, 41);
    assert_eq!(pedidos[0].customer(), "cliente");
    let queries = mock.queries.lock().unwrap();
    let query = &queries[0];
    assert_eq!(query["estado"], "pendiente_confirmacion");
    assert_eq!(query["prioridad"], "alta");
    assert_eq!(query["fecha_desde"], "2024-05-01T00:00:00.000Z");
    assert_eq!(query["limit"], "100");
    assert!(!query.contains_key("fecha_hasta"));
}

#[tokio::test]
async fn order_list_forbidden_gets_role_message() {
    let mock = Mock::default();
    let gw = gateway(&mock, Arc::new(MemoryStorage::new())).await;

    let err = gw.backend().list_pedidos("someone-else", &PedidoFilters::default()).await.unwrap_err();

    assert!(matches!(err, ApiError::Forbidden(ref m) if m.contains("admin or staff")));
}

#[tokio::test]
async fn cambiar_estado_posts_new_state() {
    let mock = Mock::default();
    let gw = gateway(&mock, Arc::new(MemoryStorage::new())).await;

    gw.backend().cambiar_estado(TOKEN, 41, PedidoEstado::Confirmado).await.unwrap();

    let changes = mock.changes.lock().unwrap();
    assert_eq!(changes.as_slice(), &[(41, json!({ "nuevo_estado": "confirmado" }))]);
}

#[tokio::test]
async fn estadisticas_sends_bearer_and_decodes_counts() {
    let mock = Mock::default();
    let gw = gateway(&mock, Arc::new(MemoryStorage::new())).await;

    let stats = gw.backend().estadisticas(TOKEN).await.unwrap();

    assert_eq!(stats.total_pedidos, 5);
    assert_eq!(stats.count(PedidoEstado::Confirmado), 3);
    assert_eq!(stats.count(PedidoEstado::EnPreparacion), 0);
    let calls = mock.admin_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!((calls[0].method, calls[0].path.as_str(), calls[0].bearer), ("GET", "/api/telegram/estadisticas", true));
}

// =============================================================================
// USERS
// =============================================================================

#[tokio::test]
async fn user_list_decodes_array_with_bearer() {
    let mock = Mock::default();
    let gw = gateway(&mock, Arc::new(MemoryStorage::new())).await;

    let users = gw.backend().list_users(TOKEN).await.unwrap();

    assert_eq!(users.iter().map(|u| u.id.as_str()).collect::<Vec<_>>(), vec!["7", "8"]);
    assert!(!users[1].active);
    let calls = mock.admin_calls();
    assert_eq!((calls[0].method, calls[0].path.as_str(), calls[0].bearer), ("GET", "/api/users/", true));
}

#[tokio::test]
async fn user_list_that_is_not_an_array_becomes_empty() {
    let mock = Mock::default();
    *mock.user_list.lock().unwrap() = Some(json!({ "items": [identity_json("Ana")] }));
    let gw = gateway(&mock, Arc::new(MemoryStorage::new())).await;

    assert!(gw.backend().list_users(TOKEN).await.unwrap().is_empty());
}

#[tokio::test]
async fn get_user_decodes_and_missing_user_is_validation() {
    let mock = Mock::default();
    let gw = gateway(&mock, Arc::new(MemoryStorage::new())).await;

    let user = gw.backend().get_user(TOKEN, "8").await.unwrap();
    assert_eq!(user.email, "b@b.com");

    let err = gw.backend().get_user(TOKEN, "99").await.unwrap_err();
    assert_eq!(err, ApiError::Validation("User not found".into()));
}

#[tokio::test]
async fn update_user_puts_full_record() {
    let mock = Mock::default();
    let gw = gateway(&mock, Arc::new(MemoryStorage::new())).await;
    let update = UserUpdate { email: "b@b.com".into(), full_name: "Beto".into(), role: Role::Staff, is_active: true };

    gw.backend().update_user(TOKEN, "8", &update).await.unwrap();

    assert_eq!(
        mock.admin_calls(),
        vec![Recorded {
            method: "PUT",
            path: "/api/users/8".into(),
            bearer: true,
            body: json!({ "email": "b@b.com", "full_name": "Beto", "role": "staff", "is_active": true }),
        }]
    );
}

#[tokio::test]
async fn set_user_active_patches_only_the_flag() {
    let mock = Mock::default();
    let gw = gateway(&mock, Arc::new(MemoryStorage::new())).await;

    gw.backend().set_user_active(TOKEN, "8", false).await.unwrap();

    assert_eq!(
        mock.admin_calls(),
        vec![Recorded { method: "PATCH", path: "/api/users/8".into(), bearer: true, body: json!({ "is_active": false }) }]
    );
}

#[tokio::test]
async fn change_user_password_puts_new_password() {
    let mock = Mock::default();
    let gw = gateway(&mock, Arc::new(MemoryStorage::new())).await;

    gw.backend().change_user_password(TOKEN, "8", "nueva123").await.unwrap();

    assert_eq!(
        mock.admin_calls(),
        vec![Recorded {
            method: "PUT",
            path: "/api/users/8/password".into(),
            bearer: true,
            body: json!({ "new_password": "nueva123" }),
        }]
    );
}
