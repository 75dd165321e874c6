use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use jargon_jar_core::domain::jargon::{JargonTerm, JargonTermId, NewJargonTerm};
use jargon_jar_core::domain::user::UserId;
use jargon_jar_core::domain::workspace::WorkspaceId;

use super::{
    conflict_on_unique, encode_timestamp, new_id, parse_decimal, parse_timestamp,
    JargonTermRepository, RepositoryError,
};
use crate::DbPool;

const TERM_COLUMNS: &str =
    "id, term, description, default_cost, created_by, workspace_id, created_at";

pub struct SqlJargonTermRepository {
    pool: DbPool,
}

impl SqlJargonTermRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl JargonTermRepository for SqlJargonTermRepository {
    async fn find_by_id(&self, id: &JargonTermId) -> Result<Option<JargonTerm>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {TERM_COLUMNS} FROM jargon_terms WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(term_from_row).transpose()
    }

    async fn list_visible(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<JargonTerm>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {TERM_COLUMNS}
             FROM jargon_terms
             WHERE workspace_id = ? OR workspace_id IS NULL
             ORDER BY lower(term) ASC, term ASC"
        ))
        .bind(&workspace_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(term_from_row).collect()
    }

    async fn search_visible(
        &self,
        workspace_id: &WorkspaceId,
        query: &str,
        limit: u32,
    ) -> Result<Vec<JargonTerm>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {TERM_COLUMNS}
             FROM jargon_terms
             WHERE (workspace_id = ? OR workspace_id IS NULL)
               AND instr(lower(term), lower(?)) > 0
             ORDER BY lower(term) ASC, term ASC
             LIMIT ?"
        ))
        .bind(&workspace_id.0)
        .bind(query.trim())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(term_from_row).collect()
    }

    async fn find_visible_by_name(
        &self,
        workspace_id: &WorkspaceId,
        term: &str,
    ) -> Result<Option<JargonTerm>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {TERM_COLUMNS}
             FROM jargon_terms
             WHERE (workspace_id = ? OR workspace_id IS NULL)
               AND lower(term) = lower(?)
             ORDER BY workspace_id IS NULL ASC
             LIMIT 1"
        ))
        .bind(&workspace_id.0)
        .bind(term.trim())
        .fetch_optional(&self.pool)
        .await?;

        row.map(term_from_row).transpose()
    }

    async fn insert(&self, term: NewJargonTerm) -> Result<JargonTerm, RepositoryError> {
        let created = JargonTerm {
            id: JargonTermId(new_id()),
            term: term.term.trim().to_string(),
            description: term.description,
            default_cost: term.default_cost,
            created_by: term.created_by,
            workspace_id: term.workspace_id,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO jargon_terms (
                id, term, description, default_cost, created_by, workspace_id, created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&created.id.0)
        .bind(&created.term)
        .bind(&created.description)
        .bind(created.default_cost.to_string())
        .bind(created.created_by.as_ref().map(|id| id.0.clone()))
        .bind(created.workspace_id.as_ref().map(|id| id.0.clone()))
        .bind(encode_timestamp(created.created_at))
        .execute(&self.pool)
        .await
        .map_err(|error| {
            conflict_on_unique(error, &format!("jargon term `{}` already exists", created.term))
        })?;

        Ok(created)
    }
}

fn term_from_row(row: SqliteRow) -> Result<JargonTerm, RepositoryError> {
    let default_cost: String = row.try_get("default_cost")?;

    Ok(JargonTerm {
        id: JargonTermId(row.try_get("id")?),
        term: row.try_get("term")?,
        description: row.try_get("description")?,
        default_cost: parse_decimal("default_cost", &default_cost)?,
        created_by: row.try_get::<Option<String>, _>("created_by")?.map(UserId),
        workspace_id: row.try_get::<Option<String>, _>("workspace_id")?.map(WorkspaceId),
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
