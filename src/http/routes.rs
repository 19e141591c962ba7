//! HTTP route definitions

use axum::{
    extract::{Extension, Query, State},
    http::{header, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::http::middleware::{require_auth, sign_token, AuthenticatedUser};
use crate::store::{AccountError, NewAccount, PlayerSummary};
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.client_origin);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/api/signup", post(signup_handler))
        .route("/api/login", post(login_handler))
        .route("/api/get-security-question", post(security_question_handler))
        .route("/api/reset-password", post(reset_password_handler))
        .route("/api/users", get(users_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/update-score", post(update_score_handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS for the configured origins (comma-separated, `*` for any)
fn cors_layer(client_origin: &str) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if client_origin.trim() == "*" {
        return base.allow_origin(AllowOrigin::any());
    }

    let allowed_origins: Vec<header::HeaderValue> = client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    base.allow_origin(allowed_origins).allow_credentials(true)
}

/// Trimmed, non-empty field or `None`
fn required(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_sessions: usize,
    active_players: usize,
    store: &'static str,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_sessions: state.sessions.active_sessions(),
        active_players: state.sessions.active_players(),
        store: state.account_store.backend_name(),
    })
}

// ============================================================================
// Account endpoints
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignupRequest {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    avatar_id: Option<u32>,
    #[serde(default)]
    security_question: Option<String>,
    #[serde(default)]
    security_answer: Option<String>,
}

#[derive(Serialize)]
struct SignupResponse {
    message: &'static str,
    id: Uuid,
}

async fn signup_handler(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<Json<SignupResponse>, AppError> {
    let (Some(username), Some(password), Some(question), Some(answer)) = (
        required(&req.username),
        req.password.as_deref().filter(|s| !s.is_empty()),
        required(&req.security_question),
        required(&req.security_answer),
    ) else {
        return Err(AppError::BadRequest("All fields are required".to_string()));
    };

    let account = state
        .account_store
        .signup(NewAccount {
            username: username.to_string(),
            password: password.to_string(),
            avatar_id: req.avatar_id,
            security_question: question.to_string(),
            security_answer: answer.to_string(),
        })
        .await?;

    Ok(Json(SignupResponse {
        message: "User created successfully",
        id: account.id,
    }))
}

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Serialize)]
struct LoginResponse {
    message: &'static str,
    user: PlayerSummary,
    token: String,
}

async fn login_handler(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let (Some(username), Some(password)) = (
        required(&req.username),
        req.password.as_deref().filter(|s| !s.is_empty()),
    ) else {
        return Err(AppError::BadRequest(
            "Username and password are required".to_string(),
        ));
    };

    let account = state.account_store.login(username, password).await?;
    let token = sign_token(
        account.id,
        &account.username,
        state.config.session_ttl_secs,
        &state.config.session_secret,
    )
    .map_err(|e| AppError::Internal(e.to_string()))?;

    info!(user_id = %account.id, "Login successful");

    Ok(Json(LoginResponse {
        message: "Login successful",
        user: account.summary(),
        token,
    }))
}

#[derive(Deserialize)]
struct SecurityQuestionRequest {
    #[serde(default)]
    username: Option<String>,
}

#[derive(Serialize)]
struct SecurityQuestionResponse {
    question: String,
}

async fn security_question_handler(
    State(state): State<AppState>,
    Json(req): Json<SecurityQuestionRequest>,
) -> Result<Json<SecurityQuestionResponse>, AppError> {
    let username = required(&req.username)
        .ok_or_else(|| AppError::BadRequest("Username is required".to_string()))?;

    let question = state.account_store.security_question(username).await?;
    Ok(Json(SecurityQuestionResponse { question }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordRequest {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    new_password: Option<String>,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn reset_password_handler(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let (Some(username), Some(answer), Some(new_password)) = (
        required(&req.username),
        required(&req.answer),
        req.new_password.as_deref().filter(|s| !s.is_empty()),
    ) else {
        return Err(AppError::BadRequest("All fields are required".to_string()));
    };

    state
        .account_store
        .reset_password(username, answer, new_password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password reset successfully",
    }))
}

// ============================================================================
// Score endpoints
// ============================================================================

#[derive(Deserialize)]
struct UpdateScoreRequest {
    score: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateScoreResponse {
    message: &'static str,
    new_high_score: u32,
}

async fn update_score_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(req): Json<UpdateScoreRequest>,
) -> Result<Json<UpdateScoreResponse>, AppError> {
    let update = state
        .account_store
        .record_score(auth.user_id, req.score)
        .await?;

    Ok(Json(UpdateScoreResponse {
        message: if update.updated {
            "Score updated"
        } else {
            "Score not higher"
        },
        new_high_score: update.new_high_score,
    }))
}

#[derive(Deserialize)]
struct UsersQuery {
    #[serde(default)]
    key: Option<String>,
}

#[derive(Serialize)]
struct UsersResponse {
    message: &'static str,
    total_players: usize,
    data: Vec<PlayerSummary>,
}

async fn users_handler(
    State(state): State<AppState>,
    Query(query): Query<UsersQuery>,
) -> Result<Json<UsersResponse>, AppError> {
    if query.key.as_deref() != Some(state.config.admin_key.as_str()) {
        warn!("Player listing requested with wrong admin key");
        return Err(AppError::Forbidden("Access Denied: Incorrect Admin Key".to_string()));
    }

    let data = state.account_store.leaderboard().await?;
    Ok(Json(UsersResponse {
        message: "success",
        total_players: data.len(),
        data,
    }))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::UsernameTaken => AppError::BadRequest(err.to_string()),
            AccountError::NotFound => AppError::NotFound(err.to_string()),
            AccountError::InvalidCredentials | AccountError::WrongAnswer => {
                AppError::Unauthorized(err.to_string())
            }
            AccountError::Backend(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Internal(msg) => {
                warn!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::test_config;
    use crate::store::AccountStore;

    fn app() -> Router {
        build_router(AppState::with_store(test_config(), AccountStore::in_memory()))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn signup(app: &Router, username: &str) -> (StatusCode, Value) {
        send(
            app,
            post_json(
                "/api/signup",
                json!({
                    "username": username,
                    "password": "pw",
                    "avatarId": 3,
                    "securityQuestion": "city",
                    "securityAnswer": "Pune"
                }),
            ),
        )
        .await
    }

    async fn login(app: &Router, username: &str, password: &str) -> (StatusCode, Value) {
        send(
            app,
            post_json(
                "/api/login",
                json!({ "username": username, "password": password }),
            ),
        )
        .await
    }

    #[tokio::test]
    async fn health_reports_store() {
        let app = app();
        let (status, body) = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["store"], "memory");
        assert_eq!(body["active_sessions"], 0);
    }

    #[tokio::test]
    async fn signup_and_login_flow() {
        let app = app();

        let (status, body) = signup(&app, "alice").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User created successfully");

        let (status, body) = signup(&app, "alice").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Username already exists");

        let (status, body) = login(&app, "alice", "pw").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["username"], "alice");
        assert_eq!(body["user"]["avatar_id"], 3);
        assert_eq!(body["user"]["highest_score"], 0);
        assert!(body["token"].as_str().is_some());

        let (status, body) = login(&app, "alice", "nope").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");
    }

    #[tokio::test]
    async fn missing_fields_are_bad_requests() {
        let app = app();
        let (status, body) = send(
            &app,
            post_json("/api/signup", json!({ "username": "x", "password": "y" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "All fields are required");

        let (status, _) = send(&app, post_json("/api/login", json!({ "username": "x" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, post_json("/api/get-security-question", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn password_recovery_flow() {
        let app = app();
        signup(&app, "bob").await;

        let (status, body) = send(
            &app,
            post_json("/api/get-security-question", json!({ "username": "bob" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["question"], "city");

        let (status, _) = send(
            &app,
            post_json("/api/get-security-question", json!({ "username": "ghost" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            post_json(
                "/api/reset-password",
                json!({ "username": "bob", "answer": "Delhi", "newPassword": "pw2" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Incorrect security answer");

        let (status, _) = send(
            &app,
            post_json(
                "/api/reset-password",
                json!({ "username": "bob", "answer": "pune", "newPassword": "pw2" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        assert_eq!(login(&app, "bob", "pw2").await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn update_score_requires_token_and_only_rises() {
        let app = app();
        signup(&app, "carol").await;
        let (_, body) = login(&app, "carol", "pw").await;
        let token = body["token"].as_str().unwrap().to_string();

        let (status, _) = send(&app, post_json("/api/update-score", json!({ "score": 10 }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let scored = |score: u32| {
            Request::post("/api/update-score")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::from(json!({ "score": score }).to_string()))
                .unwrap()
        };

        let (status, body) = send(&app, scored(42)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Score updated");
        assert_eq!(body["newHighScore"], 42);

        let (_, body) = send(&app, scored(7)).await;
        assert_eq!(body["message"], "Score not higher");
        assert_eq!(body["newHighScore"], 42);
    }

    #[tokio::test]
    async fn users_listing_needs_admin_key() {
        let app = app();
        signup(&app, "dan").await;

        let (status, _) = send(
            &app,
            Request::get("/api/users?key=guess").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &app,
            Request::get("/api/users?key=admin").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_players"], 1);
        assert_eq!(body["data"][0]["username"], "dan");
    }
}
