use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use jargon_jar_core::domain::charge::{Charge, NewCharge, TermUsageStats, UserChargeStats};
use jargon_jar_core::domain::jargon::{JargonTerm, JargonTermId, NewJargonTerm};
use jargon_jar_core::domain::user::{User, UserId, UserProfile};
use jargon_jar_core::domain::workspace::{Workspace, WorkspaceId, WorkspaceInstall};
use jargon_jar_core::errors::ApplicationError;

use crate::DbPool;

pub mod charge;
pub mod jargon;
pub mod memory;
pub mod user;
pub mod workspace;

pub use charge::SqlChargeRepository;
pub use jargon::SqlJargonTermRepository;
pub use memory::InMemoryStore;
pub use user::SqlUserRepository;
pub use workspace::SqlWorkspaceRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict(message) => Self::Conflict(message),
            other => Self::Persistence(other.to_string()),
        }
    }
}

#[async_trait]
pub trait WorkspaceRepository: Send + Sync {
    async fn find_by_id(&self, id: &WorkspaceId) -> Result<Option<Workspace>, RepositoryError>;

    async fn find_by_slack_id(&self, slack_id: &str)
        -> Result<Option<Workspace>, RepositoryError>;

    /// Inserts the workspace or refreshes name, domain and tokens for a known team.
    async fn upsert_install(&self, install: WorkspaceInstall)
        -> Result<Workspace, RepositoryError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;

    async fn find_by_slack_id(
        &self,
        workspace_id: &WorkspaceId,
        slack_id: &str,
    ) -> Result<Option<User>, RepositoryError>;

    /// Insert-or-update keyed on `(slack_id, workspace_id)`.
    async fn upsert(&self, profile: UserProfile) -> Result<User, RepositoryError>;
}

#[async_trait]
pub trait JargonTermRepository: Send + Sync {
    async fn find_by_id(&self, id: &JargonTermId) -> Result<Option<JargonTerm>, RepositoryError>;

    /// Workspace terms plus global terms, ordered by term.
    async fn list_visible(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<JargonTerm>, RepositoryError>;

    /// Visible terms whose name contains `query`, case-insensitively.
    async fn search_visible(
        &self,
        workspace_id: &WorkspaceId,
        query: &str,
        limit: u32,
    ) -> Result<Vec<JargonTerm>, RepositoryError>;

    /// Case-insensitive exact match among visible terms. Workspace terms win over global ones.
    async fn find_visible_by_name(
        &self,
        workspace_id: &WorkspaceId,
        term: &str,
    ) -> Result<Option<JargonTerm>, RepositoryError>;

    /// Fails with [`RepositoryError::Conflict`] when the scope already holds the term.
    async fn insert(&self, term: NewJargonTerm) -> Result<JargonTerm, RepositoryError>;
}

#[async_trait]
pub trait ChargeRepository: Send + Sync {
    async fn insert(&self, charge: NewCharge) -> Result<Charge, RepositoryError>;

    /// Newest first.
    async fn list_for_workspace(
        &self,
        workspace_id: &WorkspaceId,
        limit: u32,
    ) -> Result<Vec<Charge>, RepositoryError>;

    async fn top_charged_users(
        &self,
        workspace_id: &WorkspaceId,
        limit: u32,
    ) -> Result<Vec<UserChargeStats>, RepositoryError>;

    async fn top_terms(
        &self,
        workspace_id: &WorkspaceId,
        since: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<TermUsageStats>, RepositoryError>;
}

/// The datastore gateway handed to request handlers.
#[derive(Clone)]
pub struct Repositories {
    pub workspaces: Arc<dyn WorkspaceRepository>,
    pub users: Arc<dyn UserRepository>,
    pub jargon_terms: Arc<dyn JargonTermRepository>,
    pub charges: Arc<dyn ChargeRepository>,
}

impl Repositories {
    pub fn sql(pool: DbPool) -> Self {
        Self {
            workspaces: Arc::new(SqlWorkspaceRepository::new(pool.clone())),
            users: Arc::new(SqlUserRepository::new(pool.clone())),
            jargon_terms: Arc::new(SqlJargonTermRepository::new(pool.clone())),
            charges: Arc::new(SqlChargeRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(InMemoryStore::default()))
    }

    pub fn from_store(store: Arc<InMemoryStore>) -> Self {
        Self {
            workspaces: store.clone(),
            users: store.clone(),
            jargon_terms: store.clone(),
            charges: store,
        }
    }
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn encode_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

pub(crate) fn parse_decimal(column: &str, value: &str) -> Result<Decimal, RepositoryError> {
    value.trim().parse::<Decimal>().map_err(|error| {
        RepositoryError::Decode(format!("invalid decimal in `{column}`: `{value}` ({error})"))
    })
}

/// Sums a `GROUP_CONCAT(amount)` column exactly.
pub(crate) fn sum_amounts(column: &str, value: Option<String>) -> Result<Decimal, RepositoryError> {
    let Some(joined) = value else {
        return Ok(Decimal::ZERO);
    };
    joined
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .try_fold(Decimal::ZERO, |total, part| Ok(total + parse_decimal(column, part)?))
}

pub(crate) fn conflict_on_unique(error: sqlx::Error, message: &str) -> RepositoryError {
    match &error {
        sqlx::Error::Database(database) if database.is_unique_violation() => {
            RepositoryError::Conflict(message.to_string())
        }
        _ => RepositoryError::Database(error),
    }
}
