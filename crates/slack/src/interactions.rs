//! Interaction webhook: payload model and dispatch.
//!
//! Slack posts every modal submission, button click, select change and
//! typeahead query to one endpoint as a JSON `payload` form field. The
//! dispatcher parses it into [`InteractionPayload`], routes on type plus
//! `callback_id` / `action_id`, and returns the JSON body Slack expects.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use jargon_jar_core::domain::workspace::{Workspace, WorkspaceId};
use jargon_jar_db::{Repositories, RepositoryError};

use crate::api::{SlackApiFactory, SlackWebApi};
use crate::blocks::{ModalView, OptionObject};
use crate::directory::DirectoryError;
use crate::modals::{
    add_term_modal, charge_modal, decode_metadata, suggestion_options, AddTermModalMetadata,
    ChargeModal, ChargeModalMetadata, JargonSelection, ADD_JARGON_MODAL_CALLBACK_ID,
    ADD_NEW_JARGON_ACTION, CHARGE_MODAL_CALLBACK_ID, JARGON_SELECT, NEW_TERM_VALUE,
    SUGGESTION_TERM_LIMIT, USER_BLOCK, USER_SELECT,
};
use crate::recorder::ChargeRecorder;
use crate::terms::TermRegistrar;
use crate::FailureKind;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TeamRef {
    pub id: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserRef {
    pub id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SelectedOption {
    pub value: String,
}

/// One `state.values[block_id][action_id]` entry. Which field is set depends on the element type.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StateValue {
    #[serde(default)]
    pub selected_user: Option<String>,
    #[serde(default)]
    pub selected_option: Option<SelectedOption>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ViewState {
    #[serde(default)]
    pub values: HashMap<String, HashMap<String, StateValue>>,
}

impl ViewState {
    pub fn get(&self, block_id: &str, action_id: &str) -> Option<&StateValue> {
        self.values.get(block_id).and_then(|actions| actions.get(action_id))
    }

    pub fn selected_user(&self, block_id: &str, action_id: &str) -> Option<&str> {
        self.get(block_id, action_id)
            .and_then(|value| value.selected_user.as_deref())
            .filter(|user| !user.is_empty())
    }

    pub fn selected_option(&self, block_id: &str, action_id: &str) -> Option<&str> {
        self.get(block_id, action_id)
            .and_then(|value| value.selected_option.as_ref())
            .map(|option| option.value.as_str())
            .filter(|value| !value.is_empty())
    }

    /// Trimmed text input, `None` when absent or blank.
    pub fn text(&self, block_id: &str, action_id: &str) -> Option<&str> {
        self.get(block_id, action_id)
            .and_then(|value| value.value.as_deref())
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ViewPayload {
    pub id: String,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub callback_id: String,
    #[serde(default)]
    pub private_metadata: String,
    #[serde(default)]
    pub state: ViewState,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ViewSubmission {
    #[serde(default)]
    pub team: Option<TeamRef>,
    pub user: UserRef,
    pub view: ViewPayload,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BlockAction {
    pub action_id: String,
    #[serde(default)]
    pub block_id: Option<String>,
    #[serde(default)]
    pub selected_option: Option<SelectedOption>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BlockActions {
    #[serde(default)]
    pub team: Option<TeamRef>,
    pub user: UserRef,
    #[serde(default)]
    pub trigger_id: Option<String>,
    #[serde(default)]
    pub view: Option<ViewPayload>,
    #[serde(default)]
    pub actions: Vec<BlockAction>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BlockSuggestion {
    #[serde(default)]
    pub team: Option<TeamRef>,
    pub user: UserRef,
    pub action_id: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub view: Option<ViewPayload>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionPayload {
    ViewSubmission(ViewSubmission),
    BlockActions(BlockActions),
    BlockSuggestion(BlockSuggestion),
    ViewClosed,
    #[serde(other)]
    Unknown,
}

/// Parses the raw `payload` form field.
pub fn parse_payload(raw: Option<&str>) -> Result<InteractionPayload, InteractionError> {
    let raw = raw.filter(|raw| !raw.trim().is_empty()).ok_or(InteractionError::MissingPayload)?;
    let value: Value = serde_json::from_str(raw)
        .map_err(|error| InteractionError::Malformed(error.to_string()))?;
    let kind = value.get("type").and_then(Value::as_str).unwrap_or_default().to_owned();
    let payload = serde_json::from_value(value)
        .map_err(|error| InteractionError::Malformed(error.to_string()))?;
    match payload {
        InteractionPayload::Unknown => Err(InteractionError::UnknownType(kind)),
        payload => Ok(payload),
    }
}

/// Body returned to Slack on the interaction request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InteractionResponse {
    Ack,
    Errors(BTreeMap<String, String>),
    Update(ModalView),
    Push(ModalView),
    Options(Vec<OptionObject>),
}

impl InteractionResponse {
    pub fn error(block_id: &str, message: impl Into<String>) -> Self {
        Self::Errors(BTreeMap::from([(block_id.to_owned(), message.into())]))
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Ack => json!({}),
            Self::Errors(errors) => json!({ "response_action": "errors", "errors": errors }),
            Self::Update(view) => json!({ "response_action": "update", "view": view }),
            Self::Push(view) => json!({ "response_action": "push", "view": view }),
            Self::Options(options) => json!({ "options": options }),
        }
    }
}

#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("missing `payload` form field")]
    MissingPayload,
    #[error("malformed interaction payload: {0}")]
    Malformed(String),
    #[error("Unknown interaction type")]
    UnknownType(String),
    #[error("unexpected view callback `{0}`")]
    UnexpectedCallback(String),
    #[error("invalid private metadata: {0}")]
    InvalidMetadata(String),
    #[error("Could not retrieve workspace info")]
    WorkspaceNotFound,
    #[error("Could not identify users involved in the charge.")]
    UserResolution(#[source] DirectoryError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl InteractionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Repository(_) => FailureKind::Internal,
            _ => FailureKind::BadRequest,
        }
    }

    /// Message safe to put in the HTTP error body.
    pub fn public_message(&self) -> String {
        match self {
            Self::Repository(_) => "An unexpected error occurred.".to_owned(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for InteractionError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidMetadata(value.to_string())
    }
}

/// Resolved request scope shared by the submission handlers.
pub struct InteractionContext<'a> {
    pub workspace: &'a Workspace,
    pub client: &'a dyn SlackWebApi,
    /// Slack id of the person who triggered the interaction.
    pub user_id: &'a str,
    pub correlation_id: &'a str,
}

pub struct InteractionDispatcher {
    repos: Repositories,
    slack: Arc<dyn SlackApiFactory>,
    recorder: ChargeRecorder,
    terms: TermRegistrar,
}

impl InteractionDispatcher {
    pub fn new(repos: Repositories, slack: Arc<dyn SlackApiFactory>) -> Self {
        Self {
            recorder: ChargeRecorder::new(repos.clone()),
            terms: TermRegistrar::new(repos.clone()),
            repos,
            slack,
        }
    }

    pub async fn dispatch(
        &self,
        raw_payload: Option<&str>,
        correlation_id: &str,
    ) -> Result<InteractionResponse, InteractionError> {
        let payload = parse_payload(raw_payload).map_err(|error| {
            warn!(event_name = "slack.interaction.rejected", correlation_id, %error);
            error
        })?;

        match payload {
            InteractionPayload::ViewSubmission(submission) => {
                self.view_submission(submission, correlation_id).await
            }
            InteractionPayload::BlockActions(actions) => {
                self.block_actions(actions, correlation_id).await
            }
            InteractionPayload::BlockSuggestion(suggestion) => {
                self.block_suggestion(suggestion, correlation_id).await
            }
            InteractionPayload::ViewClosed => {
                debug!(event_name = "slack.interaction.view_closed", correlation_id);
                Ok(InteractionResponse::Ack)
            }
            InteractionPayload::Unknown => {
                Err(InteractionError::UnknownType(String::from("unknown")))
            }
        }
    }

    async fn view_submission(
        &self,
        submission: ViewSubmission,
        correlation_id: &str,
    ) -> Result<InteractionResponse, InteractionError> {
        let callback_id = submission.view.callback_id.as_str();
        if callback_id != CHARGE_MODAL_CALLBACK_ID && callback_id != ADD_JARGON_MODAL_CALLBACK_ID {
            return Err(InteractionError::UnexpectedCallback(callback_id.to_owned()));
        }

        info!(
            event_name = "slack.interaction.view_submission",
            correlation_id,
            callback_id,
            user_id = %submission.user.id,
            "handling modal submission"
        );

        let workspace = self
            .workspace_for(submission.team.as_ref(), &submission.view.private_metadata)
            .await?;
        let client = self.slack.with_token(&workspace.bot_token);
        let context = InteractionContext {
            workspace: &workspace,
            client: client.as_ref(),
            user_id: &submission.user.id,
            correlation_id,
        };

        if callback_id == CHARGE_MODAL_CALLBACK_ID {
            self.recorder.record(&context, &submission.view).await
        } else {
            self.terms.register(&context, &submission.view).await
        }
    }

    async fn block_actions(
        &self,
        payload: BlockActions,
        correlation_id: &str,
    ) -> Result<InteractionResponse, InteractionError> {
        let Some(action) = payload.actions.first() else {
            return Ok(InteractionResponse::Ack);
        };

        match action.action_id.as_str() {
            JARGON_SELECT => self.rerender_charge_modal(&payload, action, correlation_id).await,
            ADD_NEW_JARGON_ACTION => self.push_add_term_modal(&payload, correlation_id).await,
            other => {
                debug!(
                    event_name = "slack.interaction.action_ignored",
                    correlation_id,
                    action_id = other,
                    block_id = action.block_id.as_deref().unwrap_or_default(),
                    "no handler for block action"
                );
                Ok(InteractionResponse::Ack)
            }
        }
    }

    async fn rerender_charge_modal(
        &self,
        payload: &BlockActions,
        action: &BlockAction,
        correlation_id: &str,
    ) -> Result<InteractionResponse, InteractionError> {
        let view = payload
            .view
            .as_ref()
            .ok_or_else(|| InteractionError::Malformed("jargon_select without a view".to_owned()))?;
        let metadata: ChargeModalMetadata = decode_metadata(&view.private_metadata)?;
        let workspace = self.workspace_for(payload.team.as_ref(), &view.private_metadata).await?;
        let terms = self.repos.jargon_terms.list_visible(&workspace.id).await?;

        let selected = action.selected_option.as_ref().map(|option| option.value.as_str());
        let selection = match selected {
            Some(NEW_TERM_VALUE) => JargonSelection::NewTerm,
            Some(term_id) => terms
                .iter()
                .find(|term| term.id.0 == term_id)
                .map_or(JargonSelection::Nothing, JargonSelection::Existing),
            None => JargonSelection::Nothing,
        };
        let updated = charge_modal(ChargeModal {
            terms: &terms,
            metadata: &metadata,
            selection,
            selected_user: view.state.selected_user(USER_BLOCK, USER_SELECT),
        });

        let client = self.slack.with_token(&workspace.bot_token);
        if let Err(error) = client.views_update(&view.id, view.hash.as_deref(), &updated).await {
            warn!(
                event_name = "slack.interaction.modal_update_failed",
                correlation_id,
                view_id = %view.id,
                %error
            );
        }
        Ok(InteractionResponse::Ack)
    }

    async fn push_add_term_modal(
        &self,
        payload: &BlockActions,
        correlation_id: &str,
    ) -> Result<InteractionResponse, InteractionError> {
        let view = payload
            .view
            .as_ref()
            .ok_or_else(|| InteractionError::Malformed("add_new_jargon without a view".to_owned()))?;
        let trigger_id = payload.trigger_id.as_deref().ok_or_else(|| {
            InteractionError::Malformed("add_new_jargon without a trigger_id".to_owned())
        })?;
        let parent: ChargeModalMetadata = decode_metadata(&view.private_metadata)?;
        let workspace = self.workspace_for(payload.team.as_ref(), &view.private_metadata).await?;

        let modal = add_term_modal(&AddTermModalMetadata {
            workspace_id: parent.workspace_id,
            channel_id: parent.channel_id,
            charging_user_id: Some(parent.charging_user_id),
            parent_view_id: Some(view.id.clone()),
            selected_user: view.state.selected_user(USER_BLOCK, USER_SELECT).map(str::to_owned),
        });
        let client = self.slack.with_token(&workspace.bot_token);
        if let Err(error) = client.views_push(trigger_id, &modal).await {
            warn!(event_name = "slack.interaction.modal_push_failed", correlation_id, %error);
        }
        Ok(InteractionResponse::Ack)
    }

    async fn block_suggestion(
        &self,
        payload: BlockSuggestion,
        correlation_id: &str,
    ) -> Result<InteractionResponse, InteractionError> {
        if payload.action_id != JARGON_SELECT {
            debug!(
                event_name = "slack.interaction.suggestion_ignored",
                correlation_id,
                action_id = %payload.action_id
            );
            return Ok(InteractionResponse::Options(Vec::new()));
        }

        let metadata = payload.view.as_ref().map(|view| view.private_metadata.as_str());
        let workspace =
            self.workspace_for(payload.team.as_ref(), metadata.unwrap_or_default()).await?;
        let terms = self
            .repos
            .jargon_terms
            .search_visible(&workspace.id, payload.value.trim(), SUGGESTION_TERM_LIMIT as u32)
            .await?;
        Ok(InteractionResponse::Options(suggestion_options(&terms)))
    }

    /// Team id from the payload wins; modal metadata is the fallback for payloads without a team.
    async fn workspace_for(
        &self,
        team: Option<&TeamRef>,
        private_metadata: &str,
    ) -> Result<Workspace, InteractionError> {
        let found = match team.map(|team| team.id.as_str()).filter(|id| !id.is_empty()) {
            Some(team_id) => self.repos.workspaces.find_by_slack_id(team_id).await?,
            None => match metadata_workspace_id(private_metadata) {
                Some(id) => self.repos.workspaces.find_by_id(&id).await?,
                None => None,
            },
        };
        found.ok_or(InteractionError::WorkspaceNotFound)
    }
}

fn metadata_workspace_id(private_metadata: &str) -> Option<WorkspaceId> {
    let value: Value = serde_json::from_str(private_metadata).ok()?;
    value.get("workspace_id").and_then(Value::as_str).map(|id| WorkspaceId(id.to_owned()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use jargon_jar_core::domain::jargon::NewJargonTerm;
    use jargon_jar_db::Repositories;
    use rust_decimal::Decimal;

    use super::{parse_payload, InteractionDispatcher, InteractionError, InteractionResponse};
    use crate::blocks::{Block, Element};
    use crate::modals::{
        add_term_modal, decode_metadata, AddTermModalMetadata, ChargeModalMetadata,
        NEW_TERM_BLOCK, NEW_TERM_VALUE, TERM_INFO_BLOCK,
    };
    use crate::testing::{
        block_action_payload, block_suggestion_payload, charge_modal_for, install_workspace,
        view_submission_payload, RecordingSlackApi, SlackCall,
    };
    use crate::FailureKind;

    async fn setup() -> (InteractionDispatcher, Repositories, RecordingSlackApi) {
        let repos = Repositories::in_memory();
        install_workspace(&repos, "T1").await.expect("install workspace");
        let slack = RecordingSlackApi::new();
        (InteractionDispatcher::new(repos.clone(), Arc::new(slack.clone())), repos, slack)
    }

    #[test]
    fn missing_and_malformed_payloads_are_bad_requests() {
        assert!(matches!(parse_payload(None), Err(InteractionError::MissingPayload)));
        assert!(matches!(parse_payload(Some("  ")), Err(InteractionError::MissingPayload)));
        let malformed = parse_payload(Some("{not json")).expect_err("malformed");
        assert!(matches!(malformed, InteractionError::Malformed(_)));
        assert_eq!(malformed.kind(), FailureKind::BadRequest);
    }

    #[test]
    fn unknown_type_reports_public_message() {
        let error = parse_payload(Some(r#"{"type":"shortcut"}"#)).expect_err("unknown type");
        assert!(matches!(&error, InteractionError::UnknownType(kind) if kind == "shortcut"));
        assert_eq!(error.public_message(), "Unknown interaction type");
    }

    #[test]
    fn responses_serialize_to_slack_shapes() {
        assert_eq!(InteractionResponse::Ack.to_json(), json!({}));
        assert_eq!(
            InteractionResponse::error("user_block", "Please select a user.").to_json(),
            json!({ "response_action": "errors", "errors": { "user_block": "Please select a user." } })
        );
        let view = add_term_modal(&AddTermModalMetadata {
            workspace_id: "ws".to_owned(),
            channel_id: "C1".to_owned(),
            charging_user_id: None,
            parent_view_id: None,
            selected_user: None,
        });
        let push = InteractionResponse::Push(view).to_json();
        assert_eq!(push["response_action"], "push");
        assert_eq!(push["view"]["callback_id"], "add_jargon_modal");
    }

    #[tokio::test]
    async fn view_closed_is_acknowledged_without_side_effects() {
        let (dispatcher, _, slack) = setup().await;

        let response = dispatcher
            .dispatch(Some(r#"{"type":"view_closed","team":{"id":"T1"},"user":{"id":"U1"}}"#), "req-1")
            .await
            .expect("dispatch");

        assert_eq!(response, InteractionResponse::Ack);
        assert!(slack.calls().is_empty());
    }

    #[tokio::test]
    async fn unexpected_callback_is_bad_request() {
        let (dispatcher, _, _) = setup().await;
        let mut view = add_term_modal(&AddTermModalMetadata {
            workspace_id: "ws".to_owned(),
            channel_id: "C1".to_owned(),
            charging_user_id: None,
            parent_view_id: None,
            selected_user: None,
        });
        view.callback_id = "mystery_modal".to_owned();
        let payload = view_submission_payload("T1", "U1", "V1", &view, json!({}));

        let error = dispatcher.dispatch(Some(&payload), "req-2").await.expect_err("rejected");
        assert!(matches!(error, InteractionError::UnexpectedCallback(ref id) if id == "mystery_modal"));
    }

    #[tokio::test]
    async fn unknown_team_cannot_submit() {
        let (dispatcher, repos, _) = setup().await;
        let view = charge_modal_for(&repos, "T1", "C1", "U1").await.expect("charge modal");
        let payload = view_submission_payload("T-GONE", "U1", "V1", &view, json!({}));

        let error = dispatcher.dispatch(Some(&payload), "req-3").await.expect_err("no workspace");
        assert!(matches!(error, InteractionError::WorkspaceNotFound));
        assert_eq!(error.public_message(), "Could not retrieve workspace info");
    }

    #[tokio::test]
    async fn selecting_a_term_updates_the_open_modal() {
        let (dispatcher, repos, slack) = setup().await;
        let workspace = install_workspace(&repos, "T1").await.expect("workspace");
        let term = repos
            .jargon_terms
            .insert(NewJargonTerm {
                term: "synergy".to_owned(),
                description: Some("Working together, loudly".to_owned()),
                default_cost: Decimal::new(5, 0),
                created_by: None,
                workspace_id: Some(workspace.id.clone()),
            })
            .await
            .expect("insert term");
        let view = charge_modal_for(&repos, "T1", "C1", "U1").await.expect("charge modal");
        let payload = block_action_payload(
            "T1",
            "U1",
            "V-OPEN",
            &view,
            "jargon_select",
            Some(&term.id.0),
            json!({ "user_block": { "user_select": { "selected_user": "U2" } } }),
        );

        let response = dispatcher.dispatch(Some(&payload), "req-4").await.expect("dispatch");

        assert_eq!(response, InteractionResponse::Ack);
        let calls = slack.calls_to("views.update");
        assert_eq!(calls.len(), 1);
        let SlackCall::ViewsUpdate { view_id, hash, view } = &calls[0] else {
            panic!("expected views.update");
        };
        assert_eq!(view_id, "V-OPEN");
        assert_eq!(hash.as_deref(), Some("hash-V-OPEN"));
        let Some(Block::Context { elements, .. }) = view.block(TERM_INFO_BLOCK) else {
            panic!("term info block expected");
        };
        assert!(elements[0].text().contains("$5.00"));
        let Some(Block::Input { element: Element::UsersSelect { initial_user, .. }, .. }) =
            view.block("user_block")
        else {
            panic!("user block expected");
        };
        assert_eq!(initial_user.as_deref(), Some("U2"));
    }

    #[tokio::test]
    async fn selecting_sentinel_reveals_new_term_input() {
        let (dispatcher, repos, slack) = setup().await;
        let view = charge_modal_for(&repos, "T1", "C1", "U1").await.expect("charge modal");
        let payload = block_action_payload(
            "T1",
            "U1",
            "V-OPEN",
            &view,
            "jargon_select",
            Some(NEW_TERM_VALUE),
            json!({}),
        );

        dispatcher.dispatch(Some(&payload), "req-5").await.expect("dispatch");

        let calls = slack.calls_to("views.update");
        let SlackCall::ViewsUpdate { view, .. } = &calls[0] else {
            panic!("expected views.update");
        };
        assert!(view.block(NEW_TERM_BLOCK).is_some());
    }

    #[tokio::test]
    async fn add_new_jargon_pushes_exactly_one_modal_with_parent_view() {
        let (dispatcher, repos, slack) = setup().await;
        let view = charge_modal_for(&repos, "T1", "C1", "U1").await.expect("charge modal");
        let payload =
            block_action_payload("T1", "U1", "V-PARENT", &view, "add_new_jargon", None, json!({}));

        let response = dispatcher.dispatch(Some(&payload), "req-6").await.expect("dispatch");

        assert_eq!(response, InteractionResponse::Ack);
        let calls = slack.calls();
        assert_eq!(calls.len(), 1);
        let SlackCall::ViewsPush { view, .. } = &calls[0] else {
            panic!("expected views.push, got {calls:?}");
        };
        assert_eq!(view.callback_id, "add_jargon_modal");
        let metadata: AddTermModalMetadata = decode_metadata(&view.private_metadata).expect("meta");
        assert_eq!(metadata.parent_view_id.as_deref(), Some("V-PARENT"));
        assert_eq!(metadata.charging_user_id.as_deref(), Some("U1"));
        assert_eq!(metadata.selected_user, None);
    }

    #[tokio::test]
    async fn add_new_jargon_remembers_the_user_picked_in_the_parent() {
        let (dispatcher, repos, slack) = setup().await;
        let view = charge_modal_for(&repos, "T1", "C1", "U1").await.expect("charge modal");
        let payload = block_action_payload(
            "T1",
            "U1",
            "V-PARENT",
            &view,
            "add_new_jargon",
            None,
            json!({ "user_block": { "user_select": { "selected_user": "U2" } } }),
        );

        dispatcher.dispatch(Some(&payload), "req-6b").await.expect("dispatch");

        let pushes = slack.calls_to("views.push");
        let [SlackCall::ViewsPush { view, .. }] = pushes.as_slice() else {
            panic!("expected one views.push, got {pushes:?}");
        };
        let metadata: AddTermModalMetadata = decode_metadata(&view.private_metadata).expect("meta");
        assert_eq!(metadata.selected_user.as_deref(), Some("U2"));
    }

    #[tokio::test]
    async fn other_block_actions_are_acknowledged() {
        let (dispatcher, repos, slack) = setup().await;
        let view = charge_modal_for(&repos, "T1", "C1", "U1").await.expect("charge modal");
        let payload =
            block_action_payload("T1", "U1", "V1", &view, "user_select", None, json!({}));

        let response = dispatcher.dispatch(Some(&payload), "req-7").await.expect("dispatch");

        assert_eq!(response, InteractionResponse::Ack);
        assert!(slack.calls().is_empty());
    }

    #[tokio::test]
    async fn suggestions_filter_by_substring_and_scope() {
        let (dispatcher, repos, _) = setup().await;
        let workspace = install_workspace(&repos, "T1").await.expect("workspace");
        let other = install_workspace(&repos, "T2").await.expect("other workspace");
        for (term, scope) in [
            ("Synergy", None),
            ("synergize", Some(workspace.id.clone())),
            ("synergetic", Some(other.id.clone())),
            ("leverage", None),
        ] {
            repos
                .jargon_terms
                .insert(NewJargonTerm {
                    term: term.to_owned(),
                    description: None,
                    default_cost: Decimal::ONE,
                    created_by: None,
                    workspace_id: scope,
                })
                .await
                .expect("insert term");
        }

        let payload = block_suggestion_payload("T1", "U1", "jargon_select", "SYNERG");
        let response = dispatcher.dispatch(Some(&payload), "req-8").await.expect("dispatch");

        let InteractionResponse::Options(options) = response else {
            panic!("expected options");
        };
        let labels: Vec<_> = options.iter().map(|option| option.text.text().to_owned()).collect();
        assert_eq!(labels, vec!["synergize ($1.00)", "Synergy ($1.00)", "➕ Add a new term"]);
    }

    #[tokio::test]
    async fn charge_metadata_round_trips_through_block_actions() {
        let (_, repos, _) = setup().await;
        let view = charge_modal_for(&repos, "T1", "C9", "U3").await.expect("charge modal");
        let metadata: ChargeModalMetadata = decode_metadata(&view.private_metadata).expect("meta");
        assert_eq!(metadata.channel_id, "C9");
        assert_eq!(metadata.charging_user_id, "U3");
    }
}
