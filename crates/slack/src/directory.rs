use thiserror::Error;
use tracing::debug;

use jargon_jar_core::domain::user::User;
use jargon_jar_core::domain::workspace::WorkspaceId;
use jargon_jar_db::{Repositories, RepositoryError};

use crate::api::{SlackApiError, SlackWebApi};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Slack(#[from] SlackApiError),
}

/// Returns the stored user for `slack_id`, creating it from `users.info` on first sight.
///
/// Concurrent first sightings collapse onto the `(slack_id, workspace_id)` upsert.
pub async fn find_or_create_user(
    repos: &Repositories,
    slack: &dyn SlackWebApi,
    workspace_id: &WorkspaceId,
    slack_id: &str,
) -> Result<User, DirectoryError> {
    if let Some(user) = repos.users.find_by_slack_id(workspace_id, slack_id).await? {
        return Ok(user);
    }

    debug!(event_name = "slack.user.fetch", slack_user_id = slack_id, "user not stored yet");
    let info = slack.users_info(slack_id).await?;
    let user = repos.users.upsert(info.into_profile(workspace_id.clone())).await?;
    Ok(user)
}
