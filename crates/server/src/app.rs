use std::sync::Arc;

use axum::{http::StatusCode, Json, Router};
use secrecy::SecretString;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use jargon_jar_core::config::AppConfig;
use jargon_jar_core::errors::InterfaceError;
use jargon_jar_db::{DbPool, Repositories};
use jargon_jar_slack::api::SlackApiFactory;
use jargon_jar_slack::commands::CommandRouter;
use jargon_jar_slack::interactions::InteractionDispatcher;
use jargon_jar_slack::FailureKind;

use crate::{api, health, oauth, slack_routes};

#[derive(Clone)]
pub struct OAuthSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub public_base_url: String,
}

#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub slack: Arc<dyn SlackApiFactory>,
    pub commands: Arc<CommandRouter>,
    pub interactions: Arc<InteractionDispatcher>,
    pub signing_secret: SecretString,
    pub oauth: OAuthSettings,
}

impl AppState {
    pub fn new(config: &AppConfig, repos: Repositories, slack: Arc<dyn SlackApiFactory>) -> Self {
        Self {
            commands: Arc::new(CommandRouter::new(
                repos.clone(),
                slack.clone(),
                config.slack.unknown_subcommand_policy,
            )),
            interactions: Arc::new(InteractionDispatcher::new(repos.clone(), slack.clone())),
            signing_secret: config.slack.signing_secret.clone(),
            oauth: OAuthSettings {
                client_id: config.slack.client_id.clone(),
                client_secret: config.slack.client_secret.clone(),
                public_base_url: config.public_base_url(),
            },
            repos,
            slack,
        }
    }
}

/// Every route the server exposes, health included.
pub fn router(state: AppState, db_pool: DbPool) -> Router {
    Router::new()
        .merge(slack_routes::router())
        .merge(oauth::router())
        .merge(api::router())
        .with_state(state)
        .merge(health::router(db_pool))
        .layer(TraceLayer::new_for_http())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into(), correlation_id: None }
    }
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

pub fn failure(kind: FailureKind, message: impl Into<String>) -> ApiError {
    let status = match kind {
        FailureKind::BadRequest => StatusCode::BAD_REQUEST,
        FailureKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorBody::new(message)))
}

/// Client errors echo their message; server errors only expose the generic text.
pub fn interface_failure(error: InterfaceError) -> ApiError {
    let status = match &error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = if status.is_client_error() {
        error.message().to_owned()
    } else {
        error.user_message().to_owned()
    };
    (
        status,
        Json(ErrorBody { error: message, correlation_id: Some(error.correlation_id().to_owned()) }),
    )
}

pub fn new_correlation_id() -> String {
    format!("req-{}", uuid::Uuid::new_v4().simple())
}
