use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::workspace::WorkspaceId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub slack_id: String,
    pub email: Option<String>,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub workspace_id: WorkspaceId,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub slack_id: String,
    pub email: Option<String>,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub workspace_id: WorkspaceId,
}

pub const UNKNOWN_USER_NAME: &str = "Unknown User";

/// Picks the name shown on leaderboards: display name, then real name.
pub fn preferred_display_name(display_name: Option<&str>, real_name: Option<&str>) -> String {
    [display_name, real_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_USER_NAME)
        .to_string()
}

/// Largest avatar Slack offers, falling back through the smaller sizes.
pub fn preferred_avatar(candidates: &[Option<&str>]) -> Option<String> {
    candidates.iter().flatten().find(|url| !url.is_empty()).map(|url| (*url).to_string())
}
