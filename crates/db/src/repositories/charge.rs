use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use jargon_jar_core::domain::charge::{
    Charge, ChargeId, NewCharge, TermUsageStats, UserChargeStats,
};
use jargon_jar_core::domain::jargon::JargonTermId;
use jargon_jar_core::domain::user::UserId;
use jargon_jar_core::domain::workspace::WorkspaceId;

use super::{
    encode_timestamp, new_id, parse_decimal, parse_timestamp, sum_amounts, ChargeRepository,
    RepositoryError,
};
use crate::DbPool;

pub struct SqlChargeRepository {
    pool: DbPool,
}

impl SqlChargeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ChargeRepository for SqlChargeRepository {
    async fn insert(&self, charge: NewCharge) -> Result<Charge, RepositoryError> {
        let created = Charge {
            id: ChargeId(new_id()),
            charging_user_id: charge.charging_user_id,
            charged_user_id: charge.charged_user_id,
            jargon_term_id: charge.jargon_term_id,
            amount: charge.amount,
            channel_id: charge.channel_id,
            workspace_id: charge.workspace_id,
            is_automatic: charge.is_automatic,
            message_text: charge.message_text,
            message_ts: charge.message_ts,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO charges (
                id,
                charging_user_id,
                charged_user_id,
                jargon_term_id,
                amount,
                channel_id,
                workspace_id,
                is_automatic,
                message_text,
                message_ts,
                created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&created.id.0)
        .bind(&created.charging_user_id.0)
        .bind(&created.charged_user_id.0)
        .bind(&created.jargon_term_id.0)
        .bind(created.amount.to_string())
        .bind(&created.channel_id)
        .bind(&created.workspace_id.0)
        .bind(created.is_automatic)
        .bind(&created.message_text)
        .bind(&created.message_ts)
        .bind(encode_timestamp(created.created_at))
        .execute(&self.pool)
        .await?;

        Ok(created)
    }

    async fn list_for_workspace(
        &self,
        workspace_id: &WorkspaceId,
        limit: u32,
    ) -> Result<Vec<Charge>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                id,
                charging_user_id,
                charged_user_id,
                jargon_term_id,
                amount,
                channel_id,
                workspace_id,
                is_automatic,
                message_text,
                message_ts,
                created_at
             FROM charges
             WHERE workspace_id = ?
             ORDER BY created_at DESC, id ASC
             LIMIT ?",
        )
        .bind(&workspace_id.0)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(charge_from_row).collect()
    }

    async fn top_charged_users(
        &self,
        workspace_id: &WorkspaceId,
        limit: u32,
    ) -> Result<Vec<UserChargeStats>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                u.id AS user_id,
                u.display_name AS display_name,
                u.avatar_url AS avatar_url,
                COUNT(c.id) AS charge_count,
                GROUP_CONCAT(c.amount, ',') AS amounts
             FROM charges c
             JOIN users u ON u.id = c.charged_user_id
             WHERE c.workspace_id = ?
             GROUP BY u.id, u.display_name, u.avatar_url
             ORDER BY charge_count DESC, u.display_name ASC
             LIMIT ?",
        )
        .bind(&workspace_id.0)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(UserChargeStats {
                    user_id: UserId(row.try_get("user_id")?),
                    display_name: row.try_get("display_name")?,
                    avatar_url: row.try_get("avatar_url")?,
                    charge_count: row.try_get("charge_count")?,
                    total_amount: sum_amounts("amounts", row.try_get("amounts")?)?,
                })
            })
            .collect()
    }

    async fn top_terms(
        &self,
        workspace_id: &WorkspaceId,
        since: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<TermUsageStats>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                t.id AS term_id,
                t.term AS term,
                t.description AS description,
                COUNT(c.id) AS usage_count,
                GROUP_CONCAT(c.amount, ',') AS amounts
             FROM charges c
             JOIN jargon_terms t ON t.id = c.jargon_term_id
             WHERE c.workspace_id = ?1
               AND (?2 IS NULL OR c.created_at >= ?2)
             GROUP BY t.id, t.term, t.description
             ORDER BY usage_count DESC, lower(t.term) ASC
             LIMIT ?3",
        )
        .bind(&workspace_id.0)
        .bind(since.map(encode_timestamp))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(TermUsageStats {
                    term_id: JargonTermId(row.try_get("term_id")?),
                    term: row.try_get("term")?,
                    description: row.try_get("description")?,
                    usage_count: row.try_get("usage_count")?,
                    total_amount: sum_amounts("amounts", row.try_get("amounts")?)?,
                })
            })
            .collect()
    }
}

fn charge_from_row(row: SqliteRow) -> Result<Charge, RepositoryError> {
    let amount: String = row.try_get("amount")?;

    Ok(Charge {
        id: ChargeId(row.try_get("id")?),
        charging_user_id: UserId(row.try_get("charging_user_id")?),
        charged_user_id: UserId(row.try_get("charged_user_id")?),
        jargon_term_id: JargonTermId(row.try_get("jargon_term_id")?),
        amount: parse_decimal("amount", &amount)?,
        channel_id: row.try_get("channel_id")?,
        workspace_id: WorkspaceId(row.try_get("workspace_id")?),
        is_automatic: row.try_get("is_automatic")?,
        message_text: row.try_get("message_text")?,
        message_ts: row.try_get("message_ts")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
