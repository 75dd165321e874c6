//! JSON routes used by the web frontend: term lookup/creation and leaderboards.

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info};

use jargon_jar_core::domain::jargon::{normalize_term, JargonTerm, JargonTermId, NewJargonTerm};
use jargon_jar_core::domain::money::parse_positive_amount;
use jargon_jar_core::domain::user::UserId;
use jargon_jar_core::domain::workspace::WorkspaceId;
use jargon_jar_core::{
    ApplicationError, InterfaceError, TermUsageStats, TimePeriod, UserChargeStats,
};

use jargon_jar_slack::FailureKind;

use crate::app::{failure, interface_failure, new_correlation_id, ApiError, AppState};

pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 10;
pub const MAX_LEADERBOARD_LIMIT: u32 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/jargon/exists", get(term_exists))
        .route("/api/jargon/create", post(create_term))
        .route("/api/leaderboard/users/frequency", get(user_leaderboard))
        .route("/api/leaderboard/jargon/frequency", get(term_leaderboard))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TermSummary {
    pub id: JargonTermId,
    pub term: String,
    pub description: Option<String>,
    pub default_cost: Decimal,
}

impl From<JargonTerm> for TermSummary {
    fn from(term: JargonTerm) -> Self {
        Self {
            id: term.id,
            term: term.term,
            description: term.description,
            default_cost: term.default_cost,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ExistsQuery {
    pub term: Option<String>,
    pub workspace_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateTermRequest {
    pub term: Option<String>,
    pub description: Option<String>,
    /// Accepted as either a JSON number or a numeric string.
    pub default_cost: Option<Value>,
    pub created_by: Option<String>,
    pub workspace_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub workspace_id: Option<String>,
    pub limit: Option<u32>,
    pub time_period: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_owned()).filter(|value| !value.is_empty())
}

fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT).clamp(1, MAX_LEADERBOARD_LIMIT)
}

fn parse_cost(value: Option<&Value>) -> Option<Decimal> {
    let raw = match value? {
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        _ => return None,
    };
    parse_positive_amount(&raw).ok()
}

fn application_failure(error: ApplicationError, correlation_id: &str, operation: &str) -> ApiError {
    let mapped = error.into_interface(correlation_id);
    if matches!(
        mapped,
        InterfaceError::Internal { .. } | InterfaceError::ServiceUnavailable { .. }
    ) {
        error!(
            event_name = "api.request.failed",
            correlation_id,
            operation,
            error = %mapped,
            "api request failed"
        );
    }
    interface_failure(mapped)
}

async fn term_exists(
    State(state): State<AppState>,
    Query(query): Query<ExistsQuery>,
) -> Result<Json<Value>, ApiError> {
    let (Some(term), Some(workspace_id)) = (present(query.term), present(query.workspace_id))
    else {
        return Err(failure(FailureKind::BadRequest, "Missing required parameters"));
    };
    let correlation_id = new_correlation_id();

    let found = state
        .repos
        .jargon_terms
        .find_visible_by_name(&WorkspaceId(workspace_id), &term)
        .await
        .map_err(|error| application_failure(error.into(), &correlation_id, "jargon.exists"))?;

    Ok(Json(match found {
        None => json!({ "exists": false }),
        Some(term) => {
            let summary = TermSummary::from(term);
            json!({
                "exists": true,
                "id": summary.id,
                "term": summary.term,
                "description": summary.description,
                "default_cost": summary.default_cost,
            })
        }
    }))
}

async fn create_term(
    State(state): State<AppState>,
    Json(request): Json<CreateTermRequest>,
) -> Result<Json<Value>, ApiError> {
    let term = request.term.as_deref().and_then(normalize_term);
    let workspace_id = present(request.workspace_id);
    let (Some(term), Some(workspace_id), Some(_)) = (term, workspace_id, request.default_cost.as_ref())
    else {
        return Err(failure(FailureKind::BadRequest, "Missing required fields"));
    };
    let Some(default_cost) = parse_cost(request.default_cost.as_ref()) else {
        return Err(failure(FailureKind::BadRequest, "default_cost must be a positive amount"));
    };
    let correlation_id = new_correlation_id();
    let workspace_id = WorkspaceId(workspace_id);
    let fail = |error: ApplicationError| application_failure(error, &correlation_id, "jargon.create");

    let workspace = state
        .repos
        .workspaces
        .find_by_id(&workspace_id)
        .await
        .map_err(|error| fail(error.into()))?;
    if workspace.is_none() {
        return Err(fail(ApplicationError::NotFound("Workspace not found".to_owned())));
    }

    if state
        .repos
        .jargon_terms
        .find_visible_by_name(&workspace_id, &term)
        .await
        .map_err(|error| fail(error.into()))?
        .is_some()
    {
        return Err(fail(ApplicationError::Conflict("Jargon term already exists".to_owned())));
    }

    // Unknown creators are dropped rather than failing the foreign key.
    let created_by = match present(request.created_by) {
        Some(id) => state
            .repos
            .users
            .find_by_id(&UserId(id))
            .await
            .map_err(|error| fail(error.into()))?
            .map(|user| user.id),
        None => None,
    };

    let created = state
        .repos
        .jargon_terms
        .insert(NewJargonTerm {
            term,
            description: present(request.description),
            default_cost,
            created_by,
            workspace_id: Some(workspace_id),
        })
        .await
        .map_err(|error| match ApplicationError::from(error) {
            ApplicationError::Conflict(_) => {
                fail(ApplicationError::Conflict("Jargon term already exists".to_owned()))
            }
            other => fail(other),
        })?;

    info!(
        event_name = "api.jargon.created",
        correlation_id = %correlation_id,
        term_id = %created.id.0,
        "jargon term created"
    );
    Ok(Json(json!({
        "success": true,
        "message": "Jargon term created successfully",
        "term": TermSummary::from(created),
    })))
}

#[derive(Debug, Serialize)]
struct Leaderboard<T> {
    data: Vec<T>,
}

async fn user_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Leaderboard<UserChargeStats>>, ApiError> {
    let Some(workspace_id) = present(query.workspace_id) else {
        return Err(failure(FailureKind::BadRequest, "workspace_id is required"));
    };
    let correlation_id = new_correlation_id();

    let data = state
        .repos
        .charges
        .top_charged_users(&WorkspaceId(workspace_id), clamp_limit(query.limit))
        .await
        .map_err(|error| {
            application_failure(error.into(), &correlation_id, "leaderboard.users")
        })?;
    Ok(Json(Leaderboard { data }))
}

async fn term_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Leaderboard<TermUsageStats>>, ApiError> {
    let Some(workspace_id) = present(query.workspace_id) else {
        return Err(failure(FailureKind::BadRequest, "workspace_id is required"));
    };
    let period = match query.time_period.as_deref() {
        None => TimePeriod::All,
        Some(raw) => TimePeriod::parse(raw).ok_or_else(|| {
            failure(FailureKind::BadRequest, "time_period must be one of all, week, month")
        })?,
    };
    let correlation_id = new_correlation_id();

    let data = state
        .repos
        .charges
        .top_terms(&WorkspaceId(workspace_id), period.since(Utc::now()), clamp_limit(query.limit))
        .await
        .map_err(|error| {
            application_failure(error.into(), &correlation_id, "leaderboard.jargon")
        })?;
    Ok(Json(Leaderboard { data }))
}
