use super::dto::{ChatRequest, MessageResponse, SmtpSettings};
use super::error::ApiError;
use super::state::AppState;
use super::ACCOUNT_HEADER;
use crate::tools::{catalogue, tool_definitions, ToolDefinition};
use crate::types::{ChatReply, DashboardStats};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::Json;
use tracing::{debug, info, warn};

/// Account bound to the request via the `x-account-id` header.
///
/// The header is trusted as-is: it is a placeholder for real authentication,
/// so the server must only be reachable by a trusted frontend until a
/// session or token check replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountId(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for AccountId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACCOUNT_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {ACCOUNT_HEADER} header")))?;
        raw.to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .map(AccountId)
            .ok_or_else(|| ApiError::Unauthorized(format!("invalid {ACCOUNT_HEADER} header")))
    }
}

/// Reject ids that name no account.
pub(super) async fn require_account(state: &AppState, AccountId(id): AccountId) -> Result<i64, ApiError> {
    match state.db.lock().await.get_account(id)? {
        Some(_) => Ok(id),
        None => Err(ApiError::NotFound(format!("account {id} not found"))),
    }
}

pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Welcome to PersonaLens API".to_string(),
    })
}

pub async fn chat_handler(
    State(state): State<AppState>,
    account: AccountId,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let account_id = require_account(&state, account).await?;
    let Json(ChatRequest { message, history }) = payload?;

    if message.trim().is_empty() {
        warn!("Rejecting /chat request with empty message");
        return Err(ApiError::BadRequest("message cannot be empty".to_string()));
    }

    info!(account_id, history = history.len(), "Received /chat request");
    let reply = state.chat.run_turn(account_id, &message, &history).await?;
    debug!(tool = reply.tool_result.is_some(), "Chat turn completed");
    Ok(Json(reply))
}

pub async fn stats_handler(
    State(state): State<AppState>,
    account: AccountId,
) -> Result<Json<DashboardStats>, ApiError> {
    let account_id = require_account(&state, account).await?;
    let stats = state.db.lock().await.dashboard_stats(account_id)?;
    Ok(Json(stats))
}

pub async fn smtp_settings_handler(
    State(state): State<AppState>,
    account: AccountId,
    payload: Result<Json<SmtpSettings>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let account_id = require_account(&state, account).await?;
    let Json(settings) = payload?;
    state.db.lock().await.set_smtp_credentials(
        account_id,
        settings.smtp_email.as_deref(),
        settings.smtp_password.as_deref(),
    )?;
    info!(account_id, "SMTP settings updated");
    Ok(Json(MessageResponse {
        message: "SMTP settings updated successfully".to_string(),
    }))
}

pub async fn tools_handler() -> Json<Vec<ToolDefinition>> {
    let tools = tool_definitions();
    debug!(tool_count = tools.len(), "Serving /tools request");
    Json(tools)
}

pub async fn tool_handler(
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<ToolDefinition>, ApiError> {
    let Path(name) = path?;
    catalogue::find(&name)
        .map(|spec| Json(ToolDefinition::from(spec)))
        .ok_or_else(|| ApiError::NotFound(format!("Tool '{name}' not found")))
}
