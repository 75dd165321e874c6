use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceId(pub String);

/// A Slack team that installed the app. Tokens never leave the process in logs.
#[derive(Clone, Debug)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub slack_id: String,
    pub name: String,
    pub domain: Option<String>,
    pub bot_token: SecretString,
    pub user_token: Option<SecretString>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields written when a team installs (or re-installs) the app.
#[derive(Clone, Debug)]
pub struct WorkspaceInstall {
    pub slack_id: String,
    pub name: String,
    pub domain: Option<String>,
    pub bot_token: SecretString,
    pub user_token: Option<SecretString>,
}
