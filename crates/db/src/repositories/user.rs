use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use jargon_jar_core::domain::user::{User, UserId, UserProfile};
use jargon_jar_core::domain::workspace::WorkspaceId;

use super::{encode_timestamp, new_id, parse_timestamp, RepositoryError, UserRepository};
use crate::DbPool;

const USER_COLUMNS: &str = "id, slack_id, email, display_name, avatar_url, workspace_id, created_at";

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(user_from_row).transpose()
    }

    async fn find_by_slack_id(
        &self,
        workspace_id: &WorkspaceId,
        slack_id: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE slack_id = ? AND workspace_id = ?"
        ))
        .bind(slack_id)
        .bind(&workspace_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(user_from_row).transpose()
    }

    async fn upsert(&self, profile: UserProfile) -> Result<User, RepositoryError> {
        sqlx::query(
            "INSERT INTO users (
                id, slack_id, email, display_name, avatar_url, workspace_id, created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(slack_id, workspace_id) DO UPDATE SET
                email = COALESCE(excluded.email, users.email),
                display_name = excluded.display_name,
                avatar_url = COALESCE(excluded.avatar_url, users.avatar_url)",
        )
        .bind(new_id())
        .bind(&profile.slack_id)
        .bind(&profile.email)
        .bind(&profile.display_name)
        .bind(&profile.avatar_url)
        .bind(&profile.workspace_id.0)
        .bind(encode_timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        self.find_by_slack_id(&profile.workspace_id, &profile.slack_id).await?.ok_or_else(|| {
            RepositoryError::Decode(format!("user `{}` missing after upsert", profile.slack_id))
        })
    }
}

fn user_from_row(row: SqliteRow) -> Result<User, RepositoryError> {
    Ok(User {
        id: UserId(row.try_get("id")?),
        slack_id: row.try_get("slack_id")?,
        email: row.try_get("email")?,
        display_name: row.try_get("display_name")?,
        avatar_url: row.try_get("avatar_url")?,
        workspace_id: WorkspaceId(row.try_get("workspace_id")?),
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
