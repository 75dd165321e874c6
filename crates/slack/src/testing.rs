//! In-process stand-in for the Slack Web API.
//!
//! Every call is recorded so tests can assert on exactly what would have been
//! sent to Slack. One recorder backs both the factory and every client it hands out.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use jargon_jar_core::domain::workspace::{Workspace, WorkspaceInstall};
use jargon_jar_db::{Repositories, RepositoryError};

use crate::api::{
    OAuthAccess, OAuthAccessRequest, PostedMessage, SlackApiError, SlackApiFactory,
    SlackTeamInfo, SlackUserInfo, SlackWebApi, ViewHandle,
};
use crate::blocks::{MessageTemplate, ModalView};
use crate::modals::{charge_modal, ChargeModal, ChargeModalMetadata, JargonSelection};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackCall {
    ViewsOpen { trigger_id: String, view: ModalView },
    ViewsUpdate { view_id: String, hash: Option<String>, view: ModalView },
    ViewsPush { trigger_id: String, view: ModalView },
    PostMessage { channel: String, message: MessageTemplate },
    PostEphemeral { channel: String, user: String, message: MessageTemplate },
    UsersInfo { user_id: String },
    TeamInfo,
    OAuthAccess { code: String, redirect_uri: String },
}

impl SlackCall {
    pub fn method(&self) -> &'static str {
        match self {
            Self::ViewsOpen { .. } => "views.open",
            Self::ViewsUpdate { .. } => "views.update",
            Self::ViewsPush { .. } => "views.push",
            Self::PostMessage { .. } => "chat.postMessage",
            Self::PostEphemeral { .. } => "chat.postEphemeral",
            Self::UsersInfo { .. } => "users.info",
            Self::TeamInfo => "team.info",
            Self::OAuthAccess { .. } => "oauth.v2.access",
        }
    }
}

#[derive(Clone, Debug)]
pub struct OAuthGrant {
    pub access_token: String,
    pub user_token: Option<String>,
    pub authed_user_id: String,
    pub team_id: String,
    pub team_name: Option<String>,
}

#[derive(Default)]
struct RecorderState {
    calls: Vec<SlackCall>,
    tokens: Vec<String>,
    users: HashMap<String, SlackUserInfo>,
    team: Option<SlackTeamInfo>,
    grant: Option<OAuthGrant>,
    failing: HashSet<&'static str>,
    next_view: u32,
}

#[derive(Clone, Default)]
pub struct RecordingSlackApi {
    state: Arc<Mutex<RecorderState>>,
}

impl RecordingSlackApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user: SlackUserInfo) -> Self {
        self.lock().users.insert(user.id.clone(), user);
        self
    }

    pub fn with_team(self, team: SlackTeamInfo) -> Self {
        self.lock().team = Some(team);
        self
    }

    pub fn with_oauth_grant(self, grant: OAuthGrant) -> Self {
        self.lock().grant = Some(grant);
        self
    }

    /// Makes every call to `method` (e.g. `"chat.postMessage"`) fail with `fatal_error`.
    pub fn failing(self, method: &'static str) -> Self {
        self.lock().failing.insert(method);
        self
    }

    pub fn calls(&self) -> Vec<SlackCall> {
        self.lock().calls.clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<SlackCall> {
        self.lock().calls.iter().filter(|call| call.method() == method).cloned().collect()
    }

    /// Bot tokens handed to [`SlackApiFactory::with_token`], in order.
    pub fn tokens(&self) -> Vec<String> {
        self.lock().tokens.clone()
    }

    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: SlackCall) -> Result<(), SlackApiError> {
        let mut state = self.lock();
        let method = call.method();
        state.calls.push(call);
        if state.failing.contains(method) {
            return Err(SlackApiError::Api { method, error: "fatal_error".to_string() });
        }
        Ok(())
    }

    fn next_view(&self) -> ViewHandle {
        let mut state = self.lock();
        state.next_view += 1;
        ViewHandle {
            id: format!("V-FAKE-{}", state.next_view),
            hash: Some(format!("hash-{}", state.next_view)),
        }
    }
}

#[async_trait]
impl SlackWebApi for RecordingSlackApi {
    async fn views_open(
        &self,
        trigger_id: &str,
        view: &ModalView,
    ) -> Result<ViewHandle, SlackApiError> {
        self.record(SlackCall::ViewsOpen { trigger_id: trigger_id.to_string(), view: view.clone() })?;
        Ok(self.next_view())
    }

    async fn views_update(
        &self,
        view_id: &str,
        hash: Option<&str>,
        view: &ModalView,
    ) -> Result<ViewHandle, SlackApiError> {
        self.record(SlackCall::ViewsUpdate {
            view_id: view_id.to_string(),
            hash: hash.map(str::to_string),
            view: view.clone(),
        })?;
        Ok(ViewHandle { id: view_id.to_string(), hash: hash.map(str::to_string) })
    }

    async fn views_push(
        &self,
        trigger_id: &str,
        view: &ModalView,
    ) -> Result<ViewHandle, SlackApiError> {
        self.record(SlackCall::ViewsPush { trigger_id: trigger_id.to_string(), view: view.clone() })?;
        Ok(self.next_view())
    }

    async fn post_message(
        &self,
        channel: &str,
        message: &MessageTemplate,
    ) -> Result<PostedMessage, SlackApiError> {
        self.record(SlackCall::PostMessage {
            channel: channel.to_string(),
            message: message.clone(),
        })?;
        Ok(PostedMessage { channel: channel.to_string(), ts: "1700000000.000100".to_string() })
    }

    async fn post_ephemeral(
        &self,
        channel: &str,
        user: &str,
        message: &MessageTemplate,
    ) -> Result<(), SlackApiError> {
        self.record(SlackCall::PostEphemeral {
            channel: channel.to_string(),
            user: user.to_string(),
            message: message.clone(),
        })
    }

    async fn users_info(&self, user_id: &str) -> Result<SlackUserInfo, SlackApiError> {
        self.record(SlackCall::UsersInfo { user_id: user_id.to_string() })?;
        self.lock().users.get(user_id).cloned().ok_or_else(|| SlackApiError::Api {
            method: "users.info",
            error: "user_not_found".to_string(),
        })
    }

    async fn team_info(&self) -> Result<SlackTeamInfo, SlackApiError> {
        self.record(SlackCall::TeamInfo)?;
        self.lock()
            .team
            .clone()
            .ok_or_else(|| SlackApiError::Api { method: "team.info", error: "team_not_found".to_string() })
    }
}

#[async_trait]
impl SlackApiFactory for RecordingSlackApi {
    fn with_token(&self, token: &SecretString) -> Arc<dyn SlackWebApi> {
        self.lock().tokens.push(token.expose_secret().to_string());
        Arc::new(self.clone())
    }

    async fn oauth_access(
        &self,
        request: OAuthAccessRequest,
    ) -> Result<OAuthAccess, SlackApiError> {
        self.record(SlackCall::OAuthAccess {
            code: request.code.clone(),
            redirect_uri: request.redirect_uri.clone(),
        })?;
        let grant = self.lock().grant.clone().ok_or_else(|| SlackApiError::Api {
            method: "oauth.v2.access",
            error: "invalid_code".to_string(),
        })?;
        Ok(OAuthAccess {
            access_token: SecretString::from(grant.access_token),
            user_token: grant.user_token.map(SecretString::from),
            authed_user_id: grant.authed_user_id,
            team_id: grant.team_id,
            team_name: grant.team_name,
        })
    }
}

/// Stores a workspace for `team_id` with bot token `xoxb-{team_id}`.
pub async fn install_workspace(
    repos: &Repositories,
    team_id: &str,
) -> Result<Workspace, RepositoryError> {
    repos
        .workspaces
        .upsert_install(WorkspaceInstall {
            slack_id: team_id.to_string(),
            name: format!("Team {team_id}"),
            domain: Some(team_id.to_ascii_lowercase()),
            bot_token: SecretString::from(format!("xoxb-{team_id}")),
            user_token: None,
        })
        .await
}

/// The charge modal `/jargon` would open for `team_id`, installing the team if needed.
pub async fn charge_modal_for(
    repos: &Repositories,
    team_id: &str,
    channel_id: &str,
    user_id: &str,
) -> Result<ModalView, RepositoryError> {
    let workspace = install_workspace(repos, team_id).await?;
    let terms = repos.jargon_terms.list_visible(&workspace.id).await?;
    Ok(charge_modal(ChargeModal {
        terms: &terms,
        metadata: &ChargeModalMetadata {
            workspace_id: workspace.id.0.clone(),
            channel_id: channel_id.to_string(),
            charging_user_id: user_id.to_string(),
        },
        selection: JargonSelection::Nothing,
        selected_user: None,
    }))
}

fn view_json(view_id: &str, view: &ModalView, values: Value) -> Value {
    json!({
        "id": view_id,
        "hash": format!("hash-{view_id}"),
        "type": "modal",
        "callback_id": view.callback_id,
        "private_metadata": view.private_metadata,
        "state": { "values": values }
    })
}

/// A `view_submission` payload as Slack would post it for `view` with `values` as its state.
pub fn view_submission_payload(
    team_id: &str,
    user_id: &str,
    view_id: &str,
    view: &ModalView,
    values: Value,
) -> String {
    json!({
        "type": "view_submission",
        "team": { "id": team_id },
        "user": { "id": user_id },
        "trigger_id": "trigger-submit",
        "view": view_json(view_id, view, values)
    })
    .to_string()
}

pub fn block_action_payload(
    team_id: &str,
    user_id: &str,
    view_id: &str,
    view: &ModalView,
    action_id: &str,
    selected_value: Option<&str>,
    values: Value,
) -> String {
    let mut action = json!({ "action_id": action_id, "block_id": "block", "type": "static_select" });
    if let Some(selected) = selected_value {
        action["selected_option"] = json!({ "value": selected });
    }
    json!({
        "type": "block_actions",
        "team": { "id": team_id },
        "user": { "id": user_id },
        "trigger_id": "trigger-action",
        "view": view_json(view_id, view, values),
        "actions": [action]
    })
    .to_string()
}

pub fn block_suggestion_payload(team_id: &str, user_id: &str, action_id: &str, value: &str) -> String {
    json!({
        "type": "block_suggestion",
        "team": { "id": team_id },
        "user": { "id": user_id },
        "action_id": action_id,
        "block_id": "jargon_block",
        "value": value
    })
    .to_string()
}
