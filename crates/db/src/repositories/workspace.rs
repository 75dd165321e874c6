use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use sqlx::{sqlite::SqliteRow, Row};

use jargon_jar_core::domain::workspace::{Workspace, WorkspaceId, WorkspaceInstall};

use super::{encode_timestamp, new_id, parse_timestamp, RepositoryError, WorkspaceRepository};
use crate::DbPool;

const WORKSPACE_COLUMNS: &str =
    "id, slack_id, name, domain, bot_token, user_token, created_at, updated_at";

pub struct SqlWorkspaceRepository {
    pool: DbPool,
}

impl SqlWorkspaceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl WorkspaceRepository for SqlWorkspaceRepository {
    async fn find_by_id(&self, id: &WorkspaceId) -> Result<Option<Workspace>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {WORKSPACE_COLUMNS} FROM workspaces WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(workspace_from_row).transpose()
    }

    async fn find_by_slack_id(
        &self,
        slack_id: &str,
    ) -> Result<Option<Workspace>, RepositoryError> {
        let row =
            sqlx::query(&format!("SELECT {WORKSPACE_COLUMNS} FROM workspaces WHERE slack_id = ?"))
                .bind(slack_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(workspace_from_row).transpose()
    }

    async fn upsert_install(
        &self,
        install: WorkspaceInstall,
    ) -> Result<Workspace, RepositoryError> {
        let now = encode_timestamp(Utc::now());
        sqlx::query(
            "INSERT INTO workspaces (
                id, slack_id, name, domain, bot_token, user_token, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(slack_id) DO UPDATE SET
                name = excluded.name,
                domain = excluded.domain,
                bot_token = excluded.bot_token,
                user_token = excluded.user_token,
                updated_at = excluded.updated_at",
        )
        .bind(new_id())
        .bind(&install.slack_id)
        .bind(&install.name)
        .bind(&install.domain)
        .bind(install.bot_token.expose_secret())
        .bind(install.user_token.as_ref().map(|token| token.expose_secret().to_string()))
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.find_by_slack_id(&install.slack_id).await?.ok_or_else(|| {
            RepositoryError::Decode(format!(
                "workspace `{}` missing after upsert",
                install.slack_id
            ))
        })
    }
}

fn workspace_from_row(row: SqliteRow) -> Result<Workspace, RepositoryError> {
    let bot_token: String = row.try_get("bot_token")?;
    let user_token: Option<String> = row.try_get("user_token")?;

    Ok(Workspace {
        id: WorkspaceId(row.try_get("id")?),
        slack_id: row.try_get("slack_id")?,
        name: row.try_get("name")?,
        domain: row.try_get("domain")?,
        bot_token: SecretString::from(bot_token),
        user_token: user_token.map(SecretString::from),
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use secrecy::{ExposeSecret, SecretString};

    use jargon_jar_core::domain::workspace::WorkspaceInstall;

    use super::SqlWorkspaceRepository;
    use crate::repositories::WorkspaceRepository;
    use crate::{connect_with_settings, migrations};

    fn install(token: &str) -> WorkspaceInstall {
        WorkspaceInstall {
            slack_id: "T0001".to_string(),
            name: "Acme".to_string(),
            domain: Some("acme".to_string()),
            bot_token: SecretString::from(token.to_string()),
            user_token: None,
        }
    }

    #[tokio::test]
    async fn upsert_install_refreshes_tokens_without_new_row() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let repo = SqlWorkspaceRepository::new(pool.clone());

        let first = repo.upsert_install(install("xoxb-old")).await.expect("first install");
        let second = repo.upsert_install(install("xoxb-new")).await.expect("reinstall");

        assert_eq!(first.id, second.id);
        assert_eq!(second.bot_token.expose_secret(), "xoxb-new");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM workspaces")
            .fetch_one(&pool)
            .await
            .expect("count workspaces");
        assert_eq!(count, 1);

        let by_id = repo.find_by_id(&first.id).await.expect("find by id");
        assert_eq!(by_id.map(|workspace| workspace.slack_id), Some("T0001".to_string()));
    }

    #[tokio::test]
    async fn unknown_team_is_none() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let repo = SqlWorkspaceRepository::new(pool);

        assert!(repo.find_by_slack_id("T404").await.expect("lookup").is_none());
    }
}
