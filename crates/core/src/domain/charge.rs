use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::jargon::JargonTermId;
use super::user::UserId;
use super::workspace::WorkspaceId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChargeId(pub String);

/// A recorded fine. Rows are never updated after insert.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    pub id: ChargeId,
    pub charging_user_id: UserId,
    pub charged_user_id: UserId,
    pub jargon_term_id: JargonTermId,
    pub amount: Decimal,
    pub channel_id: String,
    pub workspace_id: WorkspaceId,
    pub is_automatic: bool,
    pub message_text: Option<String>,
    pub message_ts: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewCharge {
    pub charging_user_id: UserId,
    pub charged_user_id: UserId,
    pub jargon_term_id: JargonTermId,
    pub amount: Decimal,
    pub channel_id: String,
    pub workspace_id: WorkspaceId,
    pub is_automatic: bool,
    pub message_text: Option<String>,
    pub message_ts: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePeriod {
    #[default]
    All,
    Week,
    Month,
}

impl TimePeriod {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            _ => None,
        }
    }

    /// Lower bound on `created_at` for this period, `None` for all time.
    pub fn since(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::All => None,
            Self::Week => Some(now - chrono::Duration::days(7)),
            Self::Month => Some(now - chrono::Duration::days(30)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserChargeStats {
    pub user_id: UserId,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub charge_count: i64,
    pub total_amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TermUsageStats {
    pub term_id: JargonTermId,
    pub term: String,
    pub description: Option<String>,
    pub usage_count: i64,
    pub total_amount: Decimal,
}
