//! Block Kit views for the charge and add-term modals.
//!
//! Everything here is pure: callers fetch the catalogue and hand it in.

use serde::{Deserialize, Serialize};

use jargon_jar_core::domain::jargon::JargonTerm;
use jargon_jar_core::domain::money::format_usd;

use crate::blocks::{
    Block, ButtonElement, ButtonStyle, Element, ModalView, OptionObject, TextObject,
};

pub const CHARGE_MODAL_CALLBACK_ID: &str = "charge_modal";
pub const ADD_JARGON_MODAL_CALLBACK_ID: &str = "add_jargon_modal";

pub const USER_BLOCK: &str = "user_block";
pub const USER_SELECT: &str = "user_select";
pub const JARGON_BLOCK: &str = "jargon_block";
pub const JARGON_SELECT: &str = "jargon_select";
pub const TERM_INFO_BLOCK: &str = "term_info_block";
pub const NEW_TERM_BLOCK: &str = "new_term_block";
pub const NEW_TERM_INPUT: &str = "new_term_input";
pub const AMOUNT_BLOCK: &str = "amount_block";
pub const AMOUNT_INPUT: &str = "amount_input";
pub const DESCRIPTION_BLOCK: &str = "description_block";
pub const DESCRIPTION_INPUT: &str = "description_input";
pub const ACTIONS_BLOCK: &str = "actions_block";
pub const ADD_NEW_JARGON_ACTION: &str = "add_new_jargon";

pub const TERM_BLOCK: &str = "term_block";
pub const TERM_INPUT: &str = "term_input";
pub const TERM_DESCRIPTION_BLOCK: &str = "term_description_block";
pub const TERM_DESCRIPTION_INPUT: &str = "term_description_input";
pub const COST_BLOCK: &str = "cost_block";
pub const COST_INPUT: &str = "cost_input";

/// Option value meaning "I want to type a term that is not in the list".
pub const NEW_TERM_VALUE: &str = "new_term";

/// Static selects accept at most this many options.
pub const STATIC_SELECT_OPTION_LIMIT: usize = 100;
/// Suggestion responses leave room for the sentinel within the same limit.
pub const SUGGESTION_TERM_LIMIT: usize = STATIC_SELECT_OPTION_LIMIT - 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeModalMetadata {
    pub workspace_id: String,
    pub channel_id: String,
    /// Slack id of the person filing the charge.
    pub charging_user_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTermModalMetadata {
    pub workspace_id: String,
    pub channel_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charging_user_id: Option<String>,
    /// View id of the charge modal this one was pushed over.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_view_id: Option<String>,
    /// User picked in the parent modal before the push.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_user: Option<String>,
}

pub fn encode_metadata<T: Serialize>(metadata: &T) -> String {
    serde_json::to_string(metadata).unwrap_or_default()
}

pub fn decode_metadata<T: for<'de> Deserialize<'de>>(raw: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(raw)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JargonSelection<'a> {
    Nothing,
    Existing(&'a JargonTerm),
    NewTerm,
}

pub struct ChargeModal<'a> {
    pub terms: &'a [JargonTerm],
    pub metadata: &'a ChargeModalMetadata,
    pub selection: JargonSelection<'a>,
    pub selected_user: Option<&'a str>,
}

pub fn term_option(term: &JargonTerm) -> OptionObject {
    let option = OptionObject::new(
        format!("{} ({})", term.term, format_usd(term.default_cost)),
        term.id.0.clone(),
    );
    match &term.description {
        Some(description) => option.description(description),
        None => option,
    }
}

pub fn new_term_option() -> OptionObject {
    OptionObject::new("➕ Add a new term", NEW_TERM_VALUE)
}

/// Typeahead options: up to [`SUGGESTION_TERM_LIMIT`] terms followed by the sentinel.
pub fn suggestion_options(terms: &[JargonTerm]) -> Vec<OptionObject> {
    terms
        .iter()
        .take(SUGGESTION_TERM_LIMIT)
        .map(term_option)
        .chain(std::iter::once(new_term_option()))
        .collect()
}

pub fn charge_modal(input: ChargeModal<'_>) -> ModalView {
    let initial_option = match input.selection {
        JargonSelection::Nothing => None,
        JargonSelection::Existing(term) => Some(term_option(term)),
        JargonSelection::NewTerm => Some(new_term_option()),
    };

    let jargon_element = if input.terms.len() + 1 > STATIC_SELECT_OPTION_LIMIT {
        Element::ExternalSelect {
            action_id: JARGON_SELECT.to_string(),
            placeholder: TextObject::plain("Search jargon terms"),
            min_query_length: 0,
            initial_option,
        }
    } else {
        Element::StaticSelect {
            action_id: JARGON_SELECT.to_string(),
            placeholder: TextObject::plain("Select jargon term"),
            options: input
                .terms
                .iter()
                .map(term_option)
                .chain(std::iter::once(new_term_option()))
                .collect(),
            initial_option,
        }
    };

    let mut blocks = vec![
        Block::Input {
            block_id: USER_BLOCK.to_string(),
            label: TextObject::plain("Who used jargon?"),
            element: Element::UsersSelect {
                action_id: USER_SELECT.to_string(),
                placeholder: TextObject::plain("Select a user"),
                initial_user: input.selected_user.map(str::to_string),
            },
            optional: false,
            dispatch_action: false,
        },
        Block::Input {
            block_id: JARGON_BLOCK.to_string(),
            label: TextObject::plain("What jargon was used?"),
            element: jargon_element,
            optional: false,
            dispatch_action: true,
        },
    ];

    let amount_placeholder = match input.selection {
        JargonSelection::Existing(term) => {
            format!("Leave blank to use {}", format_usd(term.default_cost))
        }
        JargonSelection::NewTerm => "Default cost for the new term, e.g. 5.00".to_string(),
        JargonSelection::Nothing => "Leave blank to use the term's default cost".to_string(),
    };

    match input.selection {
        JargonSelection::Existing(term) => blocks.push(Block::Context {
            block_id: TERM_INFO_BLOCK.to_string(),
            elements: vec![TextObject::mrkdwn(term_info_text(term))],
        }),
        JargonSelection::NewTerm => blocks.push(Block::Input {
            block_id: NEW_TERM_BLOCK.to_string(),
            label: TextObject::plain("New jargon term"),
            element: Element::PlainTextInput {
                action_id: NEW_TERM_INPUT.to_string(),
                placeholder: Some(TextObject::plain("e.g. circle back")),
                multiline: false,
                initial_value: None,
            },
            optional: false,
            dispatch_action: false,
        }),
        JargonSelection::Nothing => {}
    }

    blocks.push(Block::Input {
        block_id: AMOUNT_BLOCK.to_string(),
        label: TextObject::plain("Charge amount ($)"),
        element: Element::PlainTextInput {
            action_id: AMOUNT_INPUT.to_string(),
            placeholder: Some(TextObject::plain(amount_placeholder)),
            multiline: false,
            initial_value: None,
        },
        optional: !matches!(input.selection, JargonSelection::NewTerm),
        dispatch_action: false,
    });
    blocks.push(Block::Input {
        block_id: DESCRIPTION_BLOCK.to_string(),
        label: TextObject::plain("Description"),
        element: Element::PlainTextInput {
            action_id: DESCRIPTION_INPUT.to_string(),
            placeholder: Some(TextObject::plain("What was said? (optional)")),
            multiline: true,
            initial_value: None,
        },
        optional: true,
        dispatch_action: false,
    });
    blocks.push(Block::Actions {
        block_id: ACTIONS_BLOCK.to_string(),
        elements: vec![Element::Button(
            ButtonElement::new(ADD_NEW_JARGON_ACTION, "Add New Jargon").style(ButtonStyle::Primary),
        )],
    });

    ModalView {
        kind: "modal",
        callback_id: CHARGE_MODAL_CALLBACK_ID.to_string(),
        title: TextObject::plain("Create a Charge"),
        submit: Some(TextObject::plain("Submit")),
        close: Some(TextObject::plain("Cancel")),
        blocks,
        private_metadata: encode_metadata(input.metadata),
    }
}

pub fn add_term_modal(metadata: &AddTermModalMetadata) -> ModalView {
    ModalView {
        kind: "modal",
        callback_id: ADD_JARGON_MODAL_CALLBACK_ID.to_string(),
        title: TextObject::plain("Add Jargon Term"),
        submit: Some(TextObject::plain("Add Term")),
        close: Some(TextObject::plain("Cancel")),
        blocks: vec![
            Block::Input {
                block_id: TERM_BLOCK.to_string(),
                label: TextObject::plain("Jargon term"),
                element: Element::PlainTextInput {
                    action_id: TERM_INPUT.to_string(),
                    placeholder: Some(TextObject::plain("e.g. synergy")),
                    multiline: false,
                    initial_value: None,
                },
                optional: false,
                dispatch_action: false,
            },
            Block::Input {
                block_id: TERM_DESCRIPTION_BLOCK.to_string(),
                label: TextObject::plain("Description"),
                element: Element::PlainTextInput {
                    action_id: TERM_DESCRIPTION_INPUT.to_string(),
                    placeholder: Some(TextObject::plain("What does it mean?")),
                    multiline: true,
                    initial_value: None,
                },
                optional: true,
                dispatch_action: false,
            },
            Block::Input {
                block_id: COST_BLOCK.to_string(),
                label: TextObject::plain("Default cost ($)"),
                element: Element::PlainTextInput {
                    action_id: COST_INPUT.to_string(),
                    placeholder: Some(TextObject::plain("e.g. 5.00")),
                    multiline: false,
                    initial_value: None,
                },
                optional: false,
                dispatch_action: false,
            },
        ],
        private_metadata: encode_metadata(metadata),
    }
}

fn term_info_text(term: &JargonTerm) -> String {
    let cost = format!("*Default cost:* {}", format_usd(term.default_cost));
    match term.description.as_deref().map(str::trim).filter(|text| !text.is_empty()) {
        Some(description) => format!("{cost}\n{description}"),
        None => cost,
    }
}
