//! Slack "Add to Slack" / "Sign in with Slack" callback.
//!
//! Exchanges the authorization code, records the workspace install and the
//! installing user, then redirects the browser back to the web app. Every
//! failure lands on `/auth/signin?error=...` so the frontend can show it.

use axum::{
    extract::{Query, State},
    http::Uri,
    response::Redirect,
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::{info, warn};

use jargon_jar_core::domain::workspace::WorkspaceInstall;
use jargon_jar_slack::api::OAuthAccessRequest;

use crate::app::{new_correlation_id, AppState};

pub const SIGNIN_PATH: &str = "/auth/signin";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/slack/callback", get(callback))
        .route("/auth/callback", get(callback))
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallbackFailure {
    NoCode,
    Configuration,
    Exchange,
    TeamInfo,
    UserInfo,
    SaveWorkspace,
    SaveUser,
}

impl CallbackFailure {
    fn message(self) -> &'static str {
        match self {
            Self::NoCode => "No code provided",
            Self::Configuration => "Server configuration error",
            Self::Exchange => "Failed to exchange code",
            Self::TeamInfo => "Failed to get team info",
            Self::UserInfo => "Failed to get user info",
            Self::SaveWorkspace => "Failed to save workspace",
            Self::SaveUser => "Failed to save user",
        }
    }
}

fn signin_redirect(base_url: &str, failure: CallbackFailure) -> Redirect {
    let query = serde_urlencoded::to_string([("error", failure.message())]).unwrap_or_default();
    Redirect::temporary(&format!("{base_url}{SIGNIN_PATH}?{query}"))
}

async fn callback(
    State(state): State<AppState>,
    uri: Uri,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    let correlation_id = new_correlation_id();
    let base_url = state.oauth.public_base_url.trim_end_matches('/').to_owned();

    match complete_install(&state, &base_url, uri.path(), query, &correlation_id).await {
        Ok(()) => Redirect::temporary(&format!("{base_url}/")),
        Err(failure) => {
            warn!(
                event_name = "oauth.callback.failed",
                correlation_id = %correlation_id,
                reason = failure.message(),
                "slack oauth callback failed"
            );
            signin_redirect(&base_url, failure)
        }
    }
}

async fn complete_install(
    state: &AppState,
    base_url: &str,
    path: &str,
    query: CallbackQuery,
    correlation_id: &str,
) -> Result<(), CallbackFailure> {
    if let Some(error) = query.error.as_deref() {
        info!(
            event_name = "oauth.callback.denied",
            correlation_id,
            error,
            "slack reported an authorization error"
        );
    }
    let code = query.code.filter(|code| !code.is_empty()).ok_or(CallbackFailure::NoCode)?;
    info!(
        event_name = "oauth.callback.received",
        correlation_id,
        state = query.state.as_deref().unwrap_or(""),
        "slack oauth callback received"
    );

    let (Some(client_id), Some(client_secret)) =
        (state.oauth.client_id.clone(), state.oauth.client_secret.clone())
    else {
        return Err(CallbackFailure::Configuration);
    };

    let access = state
        .slack
        .oauth_access(OAuthAccessRequest {
            client_id,
            client_secret,
            code,
            redirect_uri: format!("{base_url}{path}"),
        })
        .await
        .map_err(|error| {
            warn!(event_name = "oauth.exchange.failed", correlation_id, error = %error, "code exchange failed");
            CallbackFailure::Exchange
        })?;

    let client = state.slack.with_token(&access.access_token);
    let team = client.team_info().await.map_err(|error| {
        warn!(event_name = "oauth.team_info.failed", correlation_id, error = %error, "team.info failed");
        CallbackFailure::TeamInfo
    })?;
    let user_info = client.users_info(&access.authed_user_id).await.map_err(|error| {
        warn!(event_name = "oauth.user_info.failed", correlation_id, error = %error, "users.info failed");
        CallbackFailure::UserInfo
    })?;

    let workspace = state
        .repos
        .workspaces
        .upsert_install(WorkspaceInstall {
            slack_id: access.team_id.clone(),
            name: access.team_name.clone().unwrap_or_else(|| team.name.clone()),
            domain: team.domain.clone(),
            bot_token: access.access_token.clone(),
            user_token: access.user_token.clone(),
        })
        .await
        .map_err(|error| {
            warn!(event_name = "oauth.workspace.save_failed", correlation_id, error = %error, "workspace upsert failed");
            CallbackFailure::SaveWorkspace
        })?;

    let user = state
        .repos
        .users
        .upsert(user_info.into_profile(workspace.id.clone()))
        .await
        .map_err(|error| {
            warn!(event_name = "oauth.user.save_failed", correlation_id, error = %error, "user upsert failed");
            CallbackFailure::SaveUser
        })?;

    info!(
        event_name = "oauth.install.completed",
        correlation_id,
        workspace_id = %workspace.id.0,
        team_id = %workspace.slack_id,
        user_id = %user.id.0,
        "workspace installed"
    );
    Ok(())
}
