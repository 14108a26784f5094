use super::AppState;
use crate::components::calendar_sync::{SyncOutcome, SyncReport};
use crate::components::groupme_relay::GroupMeCallback;
use crate::error::BotResult;
use crate::guild::{find_role, RoleInfo, EVERYONE_ROLE};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

#[derive(Debug, Deserialize)]
pub struct RolesQuery {
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleManageRequest {
    user_id: Option<String>,
    role_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role_name: Option<String>,
}

impl RoleResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            user_id: None,
            role_name: None,
        }
    }

    fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRolesResponse {
    success: bool,
    user_id: String,
    username: String,
    display_name: String,
    roles: Vec<RoleInfo>,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    started: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<SyncReport>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    token: Option<String>,
}

#[derive(Clone, Copy)]
enum RoleAction {
    Add,
    Remove,
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(RoleResponse::failure("Internal server error")),
    )
        .into_response()
}

fn user_not_found(user_id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(RoleResponse::failure("User not found in guild").with_user(user_id)),
    )
        .into_response()
}

/// Non-numeric ids cannot belong to a member
fn parse_user_id(user_id: &str) -> Option<u64> {
    user_id.trim().parse::<u64>().ok().filter(|id| *id != 0)
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let bot = state
        .bot_tag
        .read()
        .await
        .clone()
        .unwrap_or_else(|| "Not logged in".to_string());

    Json(json!({
        "status": "ok",
        "bot": bot,
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

/// `GET /roles?userId=`
pub async fn get_roles(State(state): State<AppState>, Query(query): Query<RolesQuery>) -> Response {
    let Some(user_id) = query.user_id.filter(|id| !id.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(RoleResponse::failure("userId query parameter is required")),
        )
            .into_response();
    };

    match lookup_roles(&state, &user_id).await {
        Ok(response) => response,
        Err(e) => {
            error!("Error fetching user roles: {}", e);
            internal_error()
        }
    }
}

async fn lookup_roles(state: &AppState, user_id: &str) -> BotResult<Response> {
    let Some(member) = (match parse_user_id(user_id) {
        Some(id) => state.gateway.member(id).await?,
        None => None,
    }) else {
        return Ok(user_not_found(user_id));
    };

    let roles: Vec<RoleInfo> = state
        .gateway
        .roles()
        .await?
        .into_iter()
        .filter(|role| member.has_role(role.id) && role.name != EVERYONE_ROLE)
        .collect();

    Ok(Json(UserRolesResponse {
        success: true,
        user_id: member.id.to_string(),
        username: member.username,
        display_name: member.display_name,
        roles,
    })
    .into_response())
}

/// `PUT /roles/manage`
pub async fn add_role(
    State(state): State<AppState>,
    payload: Result<Json<RoleManageRequest>, JsonRejection>,
) -> Response {
    manage_role(state, payload, RoleAction::Add).await
}

/// `DELETE /roles/manage`
pub async fn remove_role(
    State(state): State<AppState>,
    payload: Result<Json<RoleManageRequest>, JsonRejection>,
) -> Response {
    manage_role(state, payload, RoleAction::Remove).await
}

async fn manage_role(
    state: AppState,
    payload: Result<Json<RoleManageRequest>, JsonRejection>,
    action: RoleAction,
) -> Response {
    let request = payload.ok().map(|Json(request)| request);
    let (Some(user_id), Some(role_name)) = (
        request
            .as_ref()
            .and_then(|r| r.user_id.clone())
            .filter(|v| !v.trim().is_empty()),
        request
            .as_ref()
            .and_then(|r| r.role_name.clone())
            .filter(|v| !v.trim().is_empty()),
    ) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(RoleResponse::failure("userId and roleName are required")),
        )
            .into_response();
    };

    match apply_role_change(&state, &user_id, &role_name, action).await {
        Ok(response) => response,
        Err(e) => {
            match action {
                RoleAction::Add => error!("Error adding role: {}", e),
                RoleAction::Remove => error!("Error removing role: {}", e),
            }
            internal_error()
        }
    }
}

async fn apply_role_change(
    state: &AppState,
    user_id: &str,
    role_name: &str,
    action: RoleAction,
) -> BotResult<Response> {
    let Some(member) = (match parse_user_id(user_id) {
        Some(id) => state.gateway.member(id).await?,
        None => None,
    }) else {
        return Ok(user_not_found(user_id));
    };

    let roles = state.gateway.roles().await?;
    let Some(role) = find_role(&roles, role_name) else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(
                RoleResponse::failure(format!("Role '{}' not found in guild", role_name))
                    .with_user(member.id.to_string()),
            ),
        )
            .into_response());
    };

    let message = match action {
        RoleAction::Add if member.has_role(role.id) => {
            format!("User already has the {} role", role_name)
        }
        RoleAction::Remove if !member.has_role(role.id) => {
            format!("User doesn't have the {} role", role_name)
        }
        RoleAction::Add => {
            state.gateway.add_role(member.id, role.id).await?;
            info!(
                "Added {} role to user {} ({})",
                role_name, member.tag, member.id
            );
            format!("Successfully added {} role", role_name)
        }
        RoleAction::Remove => {
            state.gateway.remove_role(member.id, role.id).await?;
            info!(
                "Removed {} role from user {} ({})",
                role_name, member.tag, member.id
            );
            format!("Successfully removed {} role", role_name)
        }
    };

    Ok(Json(RoleResponse {
        success: true,
        message,
        user_id: Some(member.id.to_string()),
        role_name: Some(role_name.to_string()),
    })
    .into_response())
}

/// `POST /calendar/sync`
pub async fn trigger_calendar_sync(State(state): State<AppState>) -> Response {
    let Some(handle) = state.components.calendar_sync().await else {
        return sync_response(
            StatusCode::SERVICE_UNAVAILABLE,
            false,
            "Calendar sync not configured. Set CALENDAR_ICS_URL and GUILD_ID.",
            None,
        );
    };

    match handle.trigger().await {
        Ok(SyncOutcome::Completed(report)) => sync_response(
            StatusCode::OK,
            true,
            "Calendar sync triggered.",
            Some(report),
        ),
        Ok(SyncOutcome::AlreadyRunning) => sync_response(
            StatusCode::CONFLICT,
            false,
            "Calendar sync already in progress.",
            None,
        ),
        Ok(SyncOutcome::Stopped) => sync_response(
            StatusCode::SERVICE_UNAVAILABLE,
            false,
            "Calendar sync has been stopped.",
            None,
        ),
        Err(e) => {
            error!("Manual calendar sync failed: {}", e);
            sync_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                false,
                "Manual calendar sync failed.",
                None,
            )
        }
    }
}

fn sync_response(
    status: StatusCode,
    started: bool,
    message: &str,
    report: Option<SyncReport>,
) -> Response {
    (
        status,
        Json(SyncResponse {
            started,
            message: message.to_string(),
            report,
        }),
    )
        .into_response()
}

/// `POST /groupme/callback`
pub async fn groupme_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    payload: Result<Json<GroupMeCallback>, JsonRejection>,
) -> Response {
    if let Some(expected) = state.callback_token.as_deref() {
        if query.token.as_deref() != Some(expected) {
            warn!("Rejected GroupMe callback with a missing or wrong token");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "success": false, "message": "Unauthorized" })),
            )
                .into_response();
        }
    }

    let Some(relay) = state.components.relay().await else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "success": false, "message": "Relay not configured" })),
        )
            .into_response();
    };

    let Ok(Json(callback)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": "Invalid callback payload" })),
        )
            .into_response();
    };

    match relay.forward_to_discord(state.gateway.as_ref(), &callback).await {
        Ok(relayed) => Json(json!({ "success": true, "relayed": relayed })).into_response(),
        Err(e) => {
            error!("Failed to relay GroupMe message: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": "Internal server error" })),
            )
                .into_response()
        }
    }
}
