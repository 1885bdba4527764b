use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use application::{
    AuthenticateUserRequest, Identity, RegisterUserRequest, StatsSnapshot, UpdateProfileRequest,
    UserDto,
};

use crate::{error::ApiError, state::AppState, websocket::websocket_upgrade};

#[derive(Debug, Deserialize)]
struct RegisterPayload {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct UpdateProfilePayload {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PurgeMessagesPayload {
    #[serde(default)]
    confirm: bool,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    user: UserDto,
}

#[derive(Debug, Serialize)]
struct DeletedResponse {
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct PurgeResponse {
    ok: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register_user))
        .route("/auth/login", post(login_user))
        .route(
            "/users/me",
            get(current_user).put(update_profile).delete(delete_account),
        )
        .route("/stats", get(stats))
        .route("/messages", delete(purge_messages))
        .route("/ws", get(websocket_upgrade))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

/// 从 Authorization 头提取 bearer 凭据并完成身份校验
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Identity, ApiError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing authorization header"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("Invalid authorization header format"))?;

    Ok(state.verifier.verify(token).await?)
}

async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let user = state
        .user_service
        .register(RegisterUserRequest {
            username: payload.username,
            password: payload.password,
        })
        .await?;

    let token = state.token_issuer.issue(&user)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: UserDto::from(user),
        }),
    ))
}

async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = state
        .user_service
        .authenticate(AuthenticateUserRequest {
            username: payload.username,
            password: payload.password,
        })
        .await?;

    let token = state.token_issuer.issue(&user)?;

    Ok(Json(AuthResponse {
        token,
        user: UserDto::from(user),
    }))
}

async fn current_user(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserDto>, ApiError> {
    let identity = authenticate(&state, &headers).await?;
    let user = state.user_service.get_profile(identity.user_id.into()).await?;
    Ok(Json(UserDto::from(user)))
}

async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<Json<UserDto>, ApiError> {
    let identity = authenticate(&state, &headers).await?;
    let user = state
        .user_service
        .update_profile(
            identity.user_id.into(),
            UpdateProfileRequest {
                username: payload.username,
                password: payload.password,
            },
        )
        .await?;
    Ok(Json(UserDto::from(user)))
}

async fn delete_account(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DeletedResponse>, ApiError> {
    let identity = authenticate(&state, &headers).await?;
    state
        .user_service
        .delete_account(identity.user_id.into())
        .await?;
    Ok(Json(DeletedResponse {
        message: "User deleted",
    }))
}

async fn stats(State(state): State<AppState>) -> Result<Json<StatsSnapshot>, ApiError> {
    Ok(Json(state.stats_service.overview().await?))
}

/// 管理端批量清空聊天历史。需要已认证的调用者，
/// 且请求体中必须显式携带 `confirm: true`。
async fn purge_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<PurgeMessagesPayload>,
) -> Result<Json<PurgeResponse>, ApiError> {
    let identity = authenticate(&state, &headers).await?;

    state.coordinator.purge_history(payload.confirm).await?;

    tracing::info!(user_id = %identity.user_id, "聊天历史已被管理操作清空");
    Ok(Json(PurgeResponse { ok: true }))
}
