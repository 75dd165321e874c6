use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use jargon_jar_core::config::UnknownSubcommandPolicy;
use jargon_jar_db::{Repositories, RepositoryError};

use crate::api::{SlackApiFactory, SlackWebApi};
use crate::blocks::{self, MessageTemplate};
use crate::modals::{
    add_term_modal, charge_modal, AddTermModalMetadata, ChargeModal, ChargeModalMetadata,
    JargonSelection,
};
use crate::FailureKind;

pub const DEFAULT_COMMAND: &str = "/jargon";

/// Form fields Slack posts for a slash command. Only the ones we read.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SlashCommandPayload {
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub text: String,
    pub user_id: Option<String>,
    pub trigger_id: Option<String>,
    pub channel_id: Option<String>,
    pub team_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JarCommand {
    Charge,
    AddTerm,
    Help,
    Unknown { verb: String },
}

/// Classifies on the first whitespace token of the command text, case-insensitively.
pub fn classify_jar_command(text: &str) -> JarCommand {
    let verb = text.split_whitespace().next().unwrap_or_default().to_ascii_lowercase();
    match verb.as_str() {
        "" | "charge" => JarCommand::Charge,
        "new" | "add-term" | "addterm" => JarCommand::AddTerm,
        "help" => JarCommand::Help,
        _ => JarCommand::Unknown { verb },
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Empty 200; the real reply went out through the Web API.
    Acknowledged,
    /// The team never installed the app, so there is no bot token to reply with.
    NotInstalled { text: &'static str },
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl CommandError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MissingField(_) => FailureKind::BadRequest,
            Self::Repository(_) => FailureKind::Internal,
        }
    }
}

struct Invocation<'a> {
    command: &'a str,
    user_id: &'a str,
    trigger_id: &'a str,
    channel_id: &'a str,
    team_id: &'a str,
}

impl<'a> Invocation<'a> {
    fn from_payload(payload: &'a SlashCommandPayload) -> Result<Self, CommandError> {
        Ok(Self {
            command: match payload.command.trim() {
                "" => DEFAULT_COMMAND,
                command => command,
            },
            trigger_id: required(payload.trigger_id.as_deref(), "trigger_id")?,
            channel_id: required(payload.channel_id.as_deref(), "channel_id")?,
            team_id: required(payload.team_id.as_deref(), "team_id")?,
            user_id: required(payload.user_id.as_deref(), "user_id")?,
        })
    }
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, CommandError> {
    value.map(str::trim).filter(|value| !value.is_empty()).ok_or(CommandError::MissingField(field))
}

pub struct CommandRouter {
    repos: Repositories,
    slack: Arc<dyn SlackApiFactory>,
    unknown_policy: UnknownSubcommandPolicy,
}

impl CommandRouter {
    pub fn new(
        repos: Repositories,
        slack: Arc<dyn SlackApiFactory>,
        unknown_policy: UnknownSubcommandPolicy,
    ) -> Self {
        Self { repos, slack, unknown_policy }
    }

    pub async fn route(
        &self,
        payload: &SlashCommandPayload,
        correlation_id: &str,
    ) -> Result<CommandOutcome, CommandError> {
        let invocation = Invocation::from_payload(payload)?;
        let command = match classify_jar_command(&payload.text) {
            JarCommand::Unknown { .. }
                if self.unknown_policy == UnknownSubcommandPolicy::FallbackToCharge =>
            {
                JarCommand::Charge
            }
            command => command,
        };

        info!(
            event_name = "slack.command.received",
            correlation_id,
            team_id = invocation.team_id,
            channel_id = invocation.channel_id,
            command = ?command,
            "routing slash command"
        );

        let Some(workspace) = self.repos.workspaces.find_by_slack_id(invocation.team_id).await?
        else {
            warn!(
                event_name = "slack.command.not_installed",
                correlation_id,
                team_id = invocation.team_id,
                "slash command from a team without an install"
            );
            return Ok(CommandOutcome::NotInstalled { text: blocks::not_installed_text() });
        };
        let client = self.slack.with_token(&workspace.bot_token);

        match command {
            JarCommand::Charge => {
                let terms = self.repos.jargon_terms.list_visible(&workspace.id).await?;
                let metadata = ChargeModalMetadata {
                    workspace_id: workspace.id.0.clone(),
                    channel_id: invocation.channel_id.to_string(),
                    charging_user_id: invocation.user_id.to_string(),
                };
                let view = charge_modal(ChargeModal {
                    terms: &terms,
                    metadata: &metadata,
                    selection: JargonSelection::Nothing,
                    selected_user: None,
                });
                if let Err(error) = client.views_open(invocation.trigger_id, &view).await {
                    warn!(event_name = "slack.command.modal_failed", correlation_id, %error);
                }
            }
            JarCommand::AddTerm => {
                let view = add_term_modal(&AddTermModalMetadata {
                    workspace_id: workspace.id.0.clone(),
                    channel_id: invocation.channel_id.to_string(),
                    charging_user_id: Some(invocation.user_id.to_string()),
                    parent_view_id: None,
                    selected_user: None,
                });
                if let Err(error) = client.views_open(invocation.trigger_id, &view).await {
                    warn!(event_name = "slack.command.modal_failed", correlation_id, %error);
                }
            }
            JarCommand::Help => {
                let message = blocks::help_message(invocation.command);
                reply_ephemeral(client.as_ref(), &invocation, &message, correlation_id).await;
            }
            JarCommand::Unknown { verb } => {
                let message = blocks::unknown_command_message(invocation.command, &verb);
                reply_ephemeral(client.as_ref(), &invocation, &message, correlation_id).await;
            }
        }

        Ok(CommandOutcome::Acknowledged)
    }
}

async fn reply_ephemeral(
    client: &dyn SlackWebApi,
    invocation: &Invocation<'_>,
    message: &MessageTemplate,
    correlation_id: &str,
) {
    if let Err(error) =
        client.post_ephemeral(invocation.channel_id, invocation.user_id, message).await
    {
        warn!(event_name = "slack.command.ephemeral_failed", correlation_id, %error);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use jargon_jar_core::config::UnknownSubcommandPolicy;
    use jargon_jar_db::Repositories;

    use super::{
        classify_jar_command, CommandError, CommandOutcome, CommandRouter, JarCommand,
        SlashCommandPayload,
    };
    use crate::modals::{decode_metadata, ChargeModalMetadata};
    use crate::testing::{install_workspace, RecordingSlackApi, SlackCall};
    use crate::FailureKind;

    fn payload(text: &str) -> SlashCommandPayload {
        SlashCommandPayload {
            command: "/jargon".to_owned(),
            text: text.to_owned(),
            user_id: Some("U1".to_owned()),
            trigger_id: Some("trigger-1".to_owned()),
            channel_id: Some("C1".to_owned()),
            team_id: Some("T1".to_owned()),
        }
    }

    async fn router(policy: UnknownSubcommandPolicy) -> (CommandRouter, RecordingSlackApi) {
        let repos = Repositories::in_memory();
        install_workspace(&repos, "T1").await.expect("install workspace");
        let slack = RecordingSlackApi::new();
        (CommandRouter::new(repos, Arc::new(slack.clone()), policy), slack)
    }

    #[test]
    fn classifies_aliases_case_insensitively() {
        assert_eq!(classify_jar_command(""), JarCommand::Charge);
        assert_eq!(classify_jar_command("  CHARGE @bob"), JarCommand::Charge);
        assert_eq!(classify_jar_command("new"), JarCommand::AddTerm);
        assert_eq!(classify_jar_command("add-term synergy"), JarCommand::AddTerm);
        assert_eq!(classify_jar_command("AddTerm"), JarCommand::AddTerm);
        assert_eq!(classify_jar_command("Help"), JarCommand::Help);
        assert_eq!(
            classify_jar_command("stats week"),
            JarCommand::Unknown { verb: "stats".to_owned() }
        );
    }

    #[tokio::test]
    async fn charge_opens_modal_with_metadata() {
        let (router, slack) = router(UnknownSubcommandPolicy::FallbackToCharge).await;

        let outcome = router.route(&payload("charge"), "req-1").await.expect("route");

        assert_eq!(outcome, CommandOutcome::Acknowledged);
        let calls = slack.calls();
        assert_eq!(calls.len(), 1);
        let SlackCall::ViewsOpen { trigger_id, view } = &calls[0] else {
            panic!("expected views.open, got {calls:?}");
        };
        assert_eq!(trigger_id, "trigger-1");
        assert_eq!(view.callback_id, "charge_modal");
        let metadata: ChargeModalMetadata =
            decode_metadata(&view.private_metadata).expect("metadata");
        assert_eq!(metadata.channel_id, "C1");
        assert_eq!(metadata.charging_user_id, "U1");
        assert_eq!(slack.tokens(), vec!["xoxb-T1".to_owned()]);
    }

    #[tokio::test]
    async fn add_term_aliases_open_add_term_modal() {
        for text in ["new", "add-term", "addterm"] {
            let (router, slack) = router(UnknownSubcommandPolicy::FallbackToCharge).await;
            router.route(&payload(text), "req-2").await.expect("route");

            let calls = slack.calls_to("views.open");
            assert_eq!(calls.len(), 1, "{text}");
            let SlackCall::ViewsOpen { view, .. } = &calls[0] else {
                panic!("expected views.open");
            };
            assert_eq!(view.callback_id, "add_jargon_modal", "{text}");
        }
    }

    #[tokio::test]
    async fn help_posts_single_ephemeral() {
        let (router, slack) = router(UnknownSubcommandPolicy::FallbackToCharge).await;

        router.route(&payload("help"), "req-3").await.expect("route");

        let calls = slack.calls();
        assert_eq!(calls.len(), 1);
        let SlackCall::PostEphemeral { channel, user, message } = &calls[0] else {
            panic!("expected chat.postEphemeral, got {calls:?}");
        };
        assert_eq!((channel.as_str(), user.as_str()), ("C1", "U1"));
        assert!(message.fallback_text.contains("help"));
    }

    #[tokio::test]
    async fn unknown_subcommand_follows_policy() {
        let (fallback, fallback_slack) = router(UnknownSubcommandPolicy::FallbackToCharge).await;
        fallback.route(&payload("bogus"), "req-4").await.expect("route");
        assert_eq!(fallback_slack.calls_to("views.open").len(), 1);

        let (reject, reject_slack) = router(UnknownSubcommandPolicy::Reject).await;
        reject.route(&payload("bogus"), "req-5").await.expect("route");
        let calls = reject_slack.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(
            &calls[0],
            SlackCall::PostEphemeral { message, .. } if message.fallback_text.contains("bogus")
        ));
    }

    #[tokio::test]
    async fn missing_team_id_is_bad_request_without_slack_calls() {
        let (router, slack) = router(UnknownSubcommandPolicy::FallbackToCharge).await;
        let mut request = payload("charge");
        request.team_id = None;

        let error = router.route(&request, "req-6").await.expect_err("team id required");

        assert!(matches!(error, CommandError::MissingField("team_id")));
        assert_eq!(error.kind(), FailureKind::BadRequest);
        assert!(slack.calls().is_empty());
    }

    #[tokio::test]
    async fn uninstalled_team_gets_install_hint() {
        let (router, slack) = router(UnknownSubcommandPolicy::FallbackToCharge).await;
        let mut request = payload("charge");
        request.team_id = Some("T-OTHER".to_owned());

        let outcome = router.route(&request, "req-7").await.expect("route");

        assert!(matches!(outcome, CommandOutcome::NotInstalled { .. }));
        assert!(slack.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_modal_open_is_still_acknowledged() {
        let repos = Repositories::in_memory();
        install_workspace(&repos, "T1").await.expect("install workspace");
        let slack = RecordingSlackApi::new().failing("views.open");
        let router = CommandRouter::new(
            repos,
            Arc::new(slack.clone()),
            UnknownSubcommandPolicy::FallbackToCharge,
        );

        let outcome = router.route(&payload(""), "req-8").await.expect("route");

        assert_eq!(outcome, CommandOutcome::Acknowledged);
        assert_eq!(slack.calls_to("views.open").len(), 1);
    }
}
