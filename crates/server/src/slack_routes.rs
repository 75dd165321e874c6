use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

use jargon_jar_slack::commands::{CommandOutcome, SlashCommandPayload};
use jargon_jar_slack::signature::{verify_request, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use jargon_jar_slack::FailureKind;

use crate::app::{failure, new_correlation_id, AppState, ErrorBody};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/slack/commands", post(slash_command))
        .route("/api/slack/interactions", post(interaction))
}

#[derive(Debug, Default, Deserialize)]
struct InteractionForm {
    payload: Option<String>,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn verify(state: &AppState, headers: &HeaderMap, body: &[u8], correlation_id: &str) -> bool {
    let verified = verify_request(
        state.signing_secret.expose_secret(),
        header(headers, TIMESTAMP_HEADER),
        header(headers, SIGNATURE_HEADER),
        body,
        Utc::now().timestamp(),
    );
    if !verified {
        warn!(
            event_name = "slack.request.signature_rejected",
            correlation_id,
            "rejecting request with missing, stale or invalid signature"
        );
    }
    verified
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(ErrorBody::new("Invalid request signature"))).into_response()
}

async fn slash_command(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let correlation_id = new_correlation_id();
    if !verify(&state, &headers, &body, &correlation_id) {
        return unauthorized();
    }

    let payload: SlashCommandPayload = match serde_urlencoded::from_bytes(&body) {
        Ok(payload) => payload,
        Err(error) => {
            return failure(FailureKind::BadRequest, format!("Malformed command body: {error}"))
                .into_response();
        }
    };

    match state.commands.route(&payload, &correlation_id).await {
        Ok(CommandOutcome::Acknowledged) => StatusCode::OK.into_response(),
        Ok(CommandOutcome::NotInstalled { text }) => {
            Json(json!({ "response_type": "ephemeral", "text": text })).into_response()
        }
        Err(command_error) => {
            if command_error.kind() == FailureKind::Internal {
                error!(
                    event_name = "slack.command.failed",
                    correlation_id = %correlation_id,
                    error = %command_error,
                    "slash command failed"
                );
                return failure(FailureKind::Internal, "An unexpected error occurred.")
                    .into_response();
            }
            failure(command_error.kind(), command_error.to_string()).into_response()
        }
    }
}

async fn interaction(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let correlation_id = new_correlation_id();
    if !verify(&state, &headers, &body, &correlation_id) {
        return unauthorized();
    }

    let form: InteractionForm = serde_urlencoded::from_bytes(&body).unwrap_or_default();
    match state.interactions.dispatch(form.payload.as_deref(), &correlation_id).await {
        Ok(response) => Json(response.to_json()).into_response(),
        Err(interaction_error) => {
            if interaction_error.kind() == FailureKind::Internal {
                error!(
                    event_name = "slack.interaction.failed",
                    correlation_id = %correlation_id,
                    error = %interaction_error,
                    "interaction failed"
                );
            }
            failure(interaction_error.kind(), interaction_error.public_message()).into_response()
        }
    }
}
