//! Turns a submitted charge modal into a stored charge.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::{info, warn};

use jargon_jar_core::domain::charge::NewCharge;
use jargon_jar_core::domain::jargon::{JargonTerm, JargonTermId, NewJargonTerm};
use jargon_jar_core::domain::money::{parse_amount, parse_positive_amount};
use jargon_jar_core::domain::user::User;
use jargon_jar_db::{Repositories, RepositoryError};

use crate::blocks::{charge_confirmation_text, resolution_failure_message, MessageTemplate};
use crate::directory::{find_or_create_user, DirectoryError};
use crate::interactions::{InteractionContext, InteractionError, InteractionResponse, ViewPayload, ViewState};
use crate::modals::{
    decode_metadata, ChargeModalMetadata, AMOUNT_BLOCK, AMOUNT_INPUT, DESCRIPTION_BLOCK,
    DESCRIPTION_INPUT, JARGON_BLOCK, JARGON_SELECT, NEW_TERM_BLOCK, NEW_TERM_INPUT,
    NEW_TERM_VALUE, USER_BLOCK, USER_SELECT,
};

pub const SELECT_USER_ERROR: &str = "Please select a user.";
pub const SELECT_TERM_ERROR: &str = "Please select a jargon term.";
pub const NAME_NEW_TERM_ERROR: &str = "Please enter the new jargon term.";
pub const NEW_TERM_AMOUNT_ERROR: &str = "Please enter a positive amount for the new term.";
pub const INVALID_AMOUNT_ERROR: &str = "Invalid charge amount.";
pub const MISSING_TERM_ERROR: &str = "That jargon term no longer exists.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TermChoice {
    Existing(JargonTermId),
    New { name: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChargeForm {
    pub charged_user: String,
    pub term: TermChoice,
    /// Explicit amount; `None` means "use the term's default cost".
    pub amount: Option<Decimal>,
    pub description: Option<String>,
}

/// Checks every field and reports all problems at once, keyed by block id.
pub fn validate_charge_form(state: &ViewState) -> Result<ChargeForm, BTreeMap<String, String>> {
    let mut errors = BTreeMap::new();

    let charged_user = state.selected_user(USER_BLOCK, USER_SELECT);
    if charged_user.is_none() {
        errors.insert(USER_BLOCK.to_owned(), SELECT_USER_ERROR.to_owned());
    }

    let term = match state.selected_option(JARGON_BLOCK, JARGON_SELECT) {
        None => {
            errors.insert(JARGON_BLOCK.to_owned(), SELECT_TERM_ERROR.to_owned());
            None
        }
        Some(NEW_TERM_VALUE) => match state.text(NEW_TERM_BLOCK, NEW_TERM_INPUT) {
            Some(name) => Some(TermChoice::New { name: name.to_owned() }),
            None => {
                errors.insert(NEW_TERM_BLOCK.to_owned(), NAME_NEW_TERM_ERROR.to_owned());
                None
            }
        },
        Some(term_id) => Some(TermChoice::Existing(JargonTermId(term_id.to_owned()))),
    };

    let raw_amount = state.text(AMOUNT_BLOCK, AMOUNT_INPUT).unwrap_or_default();
    let creating_term = state.selected_option(JARGON_BLOCK, JARGON_SELECT) == Some(NEW_TERM_VALUE);
    let amount = if creating_term {
        match parse_positive_amount(raw_amount) {
            Ok(amount) => Some(amount),
            Err(_) => {
                errors.insert(AMOUNT_BLOCK.to_owned(), NEW_TERM_AMOUNT_ERROR.to_owned());
                None
            }
        }
    } else {
        match parse_amount(raw_amount) {
            Ok(Some(amount)) if amount < Decimal::ZERO => {
                errors.insert(AMOUNT_BLOCK.to_owned(), INVALID_AMOUNT_ERROR.to_owned());
                None
            }
            Ok(amount) => amount,
            Err(_) => {
                errors.insert(AMOUNT_BLOCK.to_owned(), INVALID_AMOUNT_ERROR.to_owned());
                None
            }
        }
    };

    match (charged_user, term) {
        (Some(charged_user), Some(term)) if errors.is_empty() => Ok(ChargeForm {
            charged_user: charged_user.to_owned(),
            term,
            amount,
            description: state.text(DESCRIPTION_BLOCK, DESCRIPTION_INPUT).map(str::to_owned),
        }),
        _ => Err(errors),
    }
}

pub struct ChargeRecorder {
    repos: Repositories,
}

impl ChargeRecorder {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Validates, resolves both users, creates the term if asked to, writes one charge
    /// and announces it in the originating channel.
    ///
    /// Nothing is deduplicated: submitting the same state twice records two charges.
    pub async fn record(
        &self,
        context: &InteractionContext<'_>,
        view: &ViewPayload,
    ) -> Result<InteractionResponse, InteractionError> {
        let metadata: ChargeModalMetadata = decode_metadata(&view.private_metadata)?;
        let form = match validate_charge_form(&view.state) {
            Ok(form) => form,
            Err(errors) => return Ok(InteractionResponse::Errors(errors)),
        };

        let charging = self.resolve_user(context, &metadata, context.user_id).await?;
        let charged = self.resolve_user(context, &metadata, &form.charged_user).await?;

        let term = match &form.term {
            TermChoice::Existing(term_id) => {
                match self.repos.jargon_terms.find_by_id(term_id).await? {
                    Some(term) if term.is_visible_to(&context.workspace.id) => term,
                    _ => return Ok(InteractionResponse::error(JARGON_BLOCK, MISSING_TERM_ERROR)),
                }
            }
            TermChoice::New { name } => {
                match self.create_term(context, name, &form, &charging).await? {
                    Ok(term) => term,
                    Err(response) => return Ok(response),
                }
            }
        };

        let amount = form.amount.unwrap_or(term.default_cost);
        let charge = self
            .repos
            .charges
            .insert(NewCharge {
                charging_user_id: charging.id.clone(),
                charged_user_id: charged.id.clone(),
                jargon_term_id: term.id.clone(),
                amount,
                channel_id: metadata.channel_id.clone(),
                workspace_id: context.workspace.id.clone(),
                is_automatic: false,
                message_text: form.description.clone(),
                message_ts: None,
            })
            .await?;

        info!(
            event_name = "jargon.charge.recorded",
            correlation_id = context.correlation_id,
            charge_id = %charge.id.0,
            workspace_id = %context.workspace.id.0,
            term = %term.term,
            amount = %amount,
            "charge recorded"
        );

        let confirmation = MessageTemplate::text_only(charge_confirmation_text(
            &charging.slack_id,
            &charged.slack_id,
            amount,
            &term.term,
        ));
        if let Err(error) = context.client.post_message(&metadata.channel_id, &confirmation).await {
            warn!(
                event_name = "jargon.charge.confirmation_failed",
                correlation_id = context.correlation_id,
                channel_id = %metadata.channel_id,
                %error
            );
        }

        Ok(InteractionResponse::Ack)
    }

    async fn resolve_user(
        &self,
        context: &InteractionContext<'_>,
        metadata: &ChargeModalMetadata,
        slack_id: &str,
    ) -> Result<User, InteractionError> {
        match find_or_create_user(&self.repos, context.client, &context.workspace.id, slack_id)
            .await
        {
            Ok(user) => Ok(user),
            Err(DirectoryError::Repository(error)) => Err(error.into()),
            Err(error) => {
                warn!(
                    event_name = "jargon.charge.user_unresolved",
                    correlation_id = context.correlation_id,
                    slack_user_id = slack_id,
                    %error
                );
                let notice = resolution_failure_message(&format!(
                    "I couldn't look up <@{slack_id}> in this workspace."
                ));
                if let Err(notify_error) = context
                    .client
                    .post_ephemeral(&metadata.channel_id, context.user_id, &notice)
                    .await
                {
                    warn!(
                        event_name = "jargon.charge.notice_failed",
                        correlation_id = context.correlation_id,
                        error = %notify_error
                    );
                }
                Err(InteractionError::UserResolution(error))
            }
        }
    }

    /// Inner `Err` is an inline validation response for a name that already exists.
    async fn create_term(
        &self,
        context: &InteractionContext<'_>,
        name: &str,
        form: &ChargeForm,
        creator: &User,
    ) -> Result<Result<JargonTerm, InteractionResponse>, InteractionError> {
        if let Some(existing) =
            self.repos.jargon_terms.find_visible_by_name(&context.workspace.id, name).await?
        {
            return Ok(Err(duplicate_term_response(NEW_TERM_BLOCK, &existing.term)));
        }

        let inserted = self
            .repos
            .jargon_terms
            .insert(NewJargonTerm {
                term: name.to_owned(),
                description: form.description.clone(),
                default_cost: form.amount.unwrap_or_default(),
                created_by: Some(creator.id.clone()),
                workspace_id: Some(context.workspace.id.clone()),
            })
            .await;
        match inserted {
            Ok(term) => {
                info!(
                    event_name = "jargon.term.created",
                    correlation_id = context.correlation_id,
                    term_id = %term.id.0,
                    term = %term.term,
                    "term created from charge modal"
                );
                Ok(Ok(term))
            }
            Err(RepositoryError::Conflict(_)) => Ok(Err(duplicate_term_response(NEW_TERM_BLOCK, name))),
            Err(error) => Err(error.into()),
        }
    }
}

pub fn duplicate_term_response(block_id: &str, term: &str) -> InteractionResponse {
    InteractionResponse::error(block_id, format!("\"{term}\" is already in the jar."))
}
