use crate::error::GateError;
use crate::state::AppState;
use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::Value;
use std::sync::Arc;

/// 请求体上限
pub const MAX_BODY_BYTES: usize = 16 * 1024;

/// 登录码申请
///
/// - 204: 允许并已发送登录码
/// - 400: 缺少邮箱 (空值或非字符串)
/// - 401: 不在允许列表中
/// - 500: 其他错误，包括无法解析、为 `null` 或超过上限的请求体，以及超时
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Body,
) -> Result<StatusCode, GateError> {
    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| GateError::InvalidBody(e.to_string()))?;
    let payload: Value =
        serde_json::from_slice(&bytes).map_err(|e| GateError::InvalidBody(e.to_string()))?;
    if payload.is_null() {
        return Err(GateError::InvalidBody("body is null".into()));
    }

    let email = match payload.get("email").and_then(Value::as_str) {
        Some(email) if !email.is_empty() => email,
        _ => return Err(GateError::EmailMissing),
    };

    tokio::time::timeout(state.login_timeout, send_code(&state, email))
        .await
        .map_err(|_| GateError::Timeout(state.login_timeout))??;

    tracing::info!(email = %email, "Magic code sent");
    Ok(StatusCode::NO_CONTENT)
}

async fn send_code(state: &AppState, email: &str) -> Result<(), GateError> {
    if !state.allow_list.is_allowed(email).await? {
        return Err(GateError::EmailNotAllowed);
    }
    state.mailer.send_magic_code(email).await
}
