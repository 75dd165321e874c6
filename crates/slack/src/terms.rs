use std::collections::BTreeMap;

use tracing::{info, warn};

use jargon_jar_core::domain::jargon::{normalize_term, NewJargonTerm};
use jargon_jar_core::domain::money::parse_positive_amount;
use jargon_jar_db::{Repositories, RepositoryError};

use crate::blocks::{term_announcement_text, MessageTemplate};
use crate::directory::{find_or_create_user, DirectoryError};
use crate::interactions::{
    InteractionContext, InteractionError, InteractionResponse, ViewPayload,
};
use crate::modals::{
    charge_modal, decode_metadata, AddTermModalMetadata, ChargeModal, ChargeModalMetadata,
    JargonSelection, COST_BLOCK, COST_INPUT, TERM_BLOCK, TERM_DESCRIPTION_BLOCK,
    TERM_DESCRIPTION_INPUT, TERM_INPUT,
};
use crate::recorder::duplicate_term_response;

pub const TERM_NAME_ERROR: &str = "Please enter a jargon term.";
pub const TERM_COST_ERROR: &str = "Please enter a positive default cost.";

/// Handles the add-term modal.
pub struct TermRegistrar {
    repos: Repositories,
}

impl TermRegistrar {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn register(
        &self,
        context: &InteractionContext<'_>,
        view: &ViewPayload,
    ) -> Result<InteractionResponse, InteractionError> {
        let metadata: AddTermModalMetadata = decode_metadata(&view.private_metadata)?;
        let state = &view.state;

        let mut errors = BTreeMap::new();
        let name = state.text(TERM_BLOCK, TERM_INPUT).and_then(normalize_term);
        if name.is_none() {
            errors.insert(TERM_BLOCK.to_owned(), TERM_NAME_ERROR.to_owned());
        }
        let cost = parse_positive_amount(state.text(COST_BLOCK, COST_INPUT).unwrap_or_default());
        if cost.is_err() {
            errors.insert(COST_BLOCK.to_owned(), TERM_COST_ERROR.to_owned());
        }
        let (Some(name), Ok(cost)) = (name, cost) else {
            return Ok(InteractionResponse::Errors(errors));
        };
        let workspace_id = &context.workspace.id;

        if let Some(existing) = self.repos.jargon_terms.find_visible_by_name(workspace_id, &name).await? {
            return Ok(duplicate_term_response(TERM_BLOCK, &existing.term));
        }

        let creator =
            match find_or_create_user(&self.repos, context.client, workspace_id, context.user_id)
                .await
            {
                Ok(user) => Some(user.id),
                Err(DirectoryError::Repository(error)) => return Err(error.into()),
                Err(error) => {
                    warn!(
                        event_name = "jargon.term.creator_unresolved",
                        correlation_id = context.correlation_id,
                        %error
                    );
                    None
                }
            };

        let term = match self
            .repos
            .jargon_terms
            .insert(NewJargonTerm {
                term: name.clone(),
                description: state
                    .text(TERM_DESCRIPTION_BLOCK, TERM_DESCRIPTION_INPUT)
                    .map(str::to_owned),
                default_cost: cost,
                created_by: creator,
                workspace_id: Some(workspace_id.clone()),
            })
            .await
        {
            Ok(term) => term,
            Err(RepositoryError::Conflict(_)) => {
                return Ok(duplicate_term_response(TERM_BLOCK, &name));
            }
            Err(error) => return Err(error.into()),
        };

        info!(
            event_name = "jargon.term.created",
            correlation_id = context.correlation_id,
            term_id = %term.id.0,
            term = %term.term,
            "term added from add-term modal"
        );

        let announcement = MessageTemplate::text_only(term_announcement_text(
            context.user_id,
            &term.term,
            term.default_cost,
        ));
        if let Err(error) = context.client.post_message(&metadata.channel_id, &announcement).await {
            warn!(
                event_name = "jargon.term.announcement_failed",
                correlation_id = context.correlation_id,
                %error
            );
        }

        if let Some(parent_view_id) = metadata.parent_view_id.as_deref() {
            let terms = match self.repos.jargon_terms.list_visible(workspace_id).await {
                Ok(terms) => terms,
                Err(error) => {
                    warn!(
                        event_name = "jargon.term.parent_refresh_failed",
                        correlation_id = context.correlation_id,
                        parent_view_id,
                        %error
                    );
                    return Ok(InteractionResponse::Ack);
                }
            };
            let parent = charge_modal(ChargeModal {
                terms: &terms,
                metadata: &ChargeModalMetadata {
                    workspace_id: metadata.workspace_id.clone(),
                    channel_id: metadata.channel_id.clone(),
                    charging_user_id: metadata
                        .charging_user_id
                        .clone()
                        .unwrap_or_else(|| context.user_id.to_owned()),
                },
                selection: JargonSelection::Existing(&term),
                selected_user: metadata.selected_user.as_deref(),
            });
            if let Err(error) = context.client.views_update(parent_view_id, None, &parent).await {
                warn!(
                    event_name = "jargon.term.parent_refresh_failed",
                    correlation_id = context.correlation_id,
                    parent_view_id,
                    %error
                );
            }
        }

        Ok(InteractionResponse::Ack)
    }
}
