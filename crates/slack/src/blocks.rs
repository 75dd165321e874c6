use rust_decimal::Decimal;
use serde::Serialize;

use jargon_jar_core::domain::money::format_usd;

/// Slack caps option text and option descriptions at 75 characters.
pub const OPTION_TEXT_LIMIT: usize = 75;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String, emoji: bool },
    #[serde(rename = "mrkdwn")]
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into(), emoji: true }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text, .. } | Self::Mrkdwn { text } => text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OptionObject {
    pub text: TextObject,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<TextObject>,
}

impl OptionObject {
    pub fn new(text: impl AsRef<str>, value: impl Into<String>) -> Self {
        Self {
            text: TextObject::plain(truncate_chars(text.as_ref(), OPTION_TEXT_LIMIT)),
            value: value.into(),
            description: None,
        }
    }

    pub fn description(mut self, description: impl AsRef<str>) -> Self {
        let description = description.as_ref().trim();
        if !description.is_empty() {
            self.description =
                Some(TextObject::plain(truncate_chars(description, OPTION_TEXT_LIMIT)));
        }
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            text: TextObject::plain(label),
            style: None,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Button(ButtonElement),
    UsersSelect {
        action_id: String,
        placeholder: TextObject,
        #[serde(skip_serializing_if = "Option::is_none")]
        initial_user: Option<String>,
    },
    StaticSelect {
        action_id: String,
        placeholder: TextObject,
        options: Vec<OptionObject>,
        #[serde(skip_serializing_if = "Option::is_none")]
        initial_option: Option<OptionObject>,
    },
    ExternalSelect {
        action_id: String,
        placeholder: TextObject,
        min_query_length: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        initial_option: Option<OptionObject>,
    },
    PlainTextInput {
        action_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<TextObject>,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        multiline: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        initial_value: Option<String>,
    },
}

impl Element {
    pub fn action_id(&self) -> &str {
        match self {
            Self::Button(button) => &button.action_id,
            Self::UsersSelect { action_id, .. }
            | Self::StaticSelect { action_id, .. }
            | Self::ExternalSelect { action_id, .. }
            | Self::PlainTextInput { action_id, .. } => action_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        block_id: String,
        text: TextObject,
    },
    Actions {
        block_id: String,
        elements: Vec<Element>,
    },
    Context {
        block_id: String,
        elements: Vec<TextObject>,
    },
    Input {
        block_id: String,
        label: TextObject,
        element: Element,
        optional: bool,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        dispatch_action: bool,
    },
}

impl Block {
    pub fn block_id(&self) -> &str {
        match self {
            Self::Section { block_id, .. }
            | Self::Actions { block_id, .. }
            | Self::Context { block_id, .. }
            | Self::Input { block_id, .. } => block_id,
        }
    }
}

/// A `type: modal` view as accepted by `views.open`, `views.update` and `views.push`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModalView {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub callback_id: String,
    pub title: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit: Option<TextObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close: Option<TextObject>,
    pub blocks: Vec<Block>,
    pub private_metadata: String,
}

impl ModalView {
    pub fn block(&self, block_id: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.block_id() == block_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

impl MessageTemplate {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self { fallback_text: text.into(), blocks: Vec::new() }
    }
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

pub fn help_message(command: &str) -> MessageTemplate {
    MessageBuilder::new("Jargon Jar help")
        .section("help.summary", |section| {
            section.mrkdwn(format!(
                "*Jargon Jar commands*\n\
                 • `{command}` or `{command} charge`: charge someone for using jargon\n\
                 • `{command} new`: add a new jargon term to the jar\n\
                 • `{command} help`: show this message"
            ));
        })
        .build()
}

pub fn unknown_command_message(command: &str, verb: &str) -> MessageTemplate {
    MessageBuilder::new(format!("Unknown command `{command} {verb}`"))
        .section("help.unknown", |section| {
            section.mrkdwn(format!(
                ":warning: I don't know `{command} {verb}`. Try `{command} help`."
            ));
        })
        .build()
}

/// Sent to the person who submitted a charge we could not attribute.
pub fn resolution_failure_message(detail: &str) -> MessageTemplate {
    MessageBuilder::new("Your charge was not recorded")
        .section("charge.failed", |section| {
            section.mrkdwn(format!(":warning: Your charge was not recorded: {detail}"));
        })
        .build()
}

pub fn not_installed_text() -> &'static str {
    "Jargon Jar isn't installed in this workspace yet. Ask an admin to add it to Slack first."
}

pub fn charge_confirmation_text(
    charging_slack_id: &str,
    charged_slack_id: &str,
    amount: Decimal,
    term: &str,
) -> String {
    format!(
        ":dollar: <@{charging_slack_id}> just charged <@{charged_slack_id}> {} for using \"{term}\"! Add it to the jar! :money_with_wings:",
        format_usd(amount)
    )
}

pub fn term_announcement_text(creator_slack_id: &str, term: &str, default_cost: Decimal) -> String {
    format!(
        ":new: <@{creator_slack_id}> added \"{term}\" to the jargon jar (default charge {}).",
        format_usd(default_cost)
    )
}

pub fn truncate_chars(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let mut truncated: String = value.chars().take(limit.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{
        charge_confirmation_text, help_message, truncate_chars, Block, ButtonElement, ButtonStyle,
        Element, OptionObject, TextObject,
    };

    #[test]
    fn text_objects_use_slack_type_names() {
        let plain = serde_json::to_value(TextObject::plain("hi")).expect("serialize");
        assert_eq!(plain, json!({"type": "plain_text", "text": "hi", "emoji": true}));

        let markdown = serde_json::to_value(TextObject::mrkdwn("*hi*")).expect("serialize");
        assert_eq!(markdown, json!({"type": "mrkdwn", "text": "*hi*"}));
    }

    #[test]
    fn input_block_serializes_element_tags() {
        let block = Block::Input {
            block_id: "amount_block".to_string(),
            label: TextObject::plain("Amount"),
            element: Element::PlainTextInput {
                action_id: "amount_input".to_string(),
                placeholder: None,
                multiline: false,
                initial_value: None,
            },
            optional: true,
            dispatch_action: false,
        };

        let value = serde_json::to_value(&block).expect("serialize");
        assert_eq!(value["type"], "input");
        assert_eq!(value["element"]["type"], "plain_text_input");
        assert_eq!(value["optional"], true);
        assert!(value.get("dispatch_action").is_none());
        assert!(value["element"].get("multiline").is_none());
    }

    #[test]
    fn buttons_carry_their_type() {
        let actions = Block::Actions {
            block_id: "actions_block".to_string(),
            elements: vec![Element::Button(
                ButtonElement::new("add_new_jargon", "Add New Jargon").style(ButtonStyle::Primary),
            )],
        };

        let value = serde_json::to_value(&actions).expect("serialize");
        assert_eq!(value["elements"][0]["type"], "button");
        assert_eq!(value["elements"][0]["style"], "primary");
        assert_eq!(value["elements"][0]["action_id"], "add_new_jargon");
        assert_eq!(value["elements"][0].as_object().map(|button| button.len()), Some(4));
    }

    #[test]
    fn option_text_is_truncated_to_slack_limit() {
        let option = OptionObject::new("x".repeat(100), "id").description("y".repeat(90));
        assert_eq!(option.text.text().chars().count(), 75);
        assert_eq!(option.description.map(|text| text.text().chars().count()), Some(75));
        assert_eq!(truncate_chars("short", 75), "short");
    }

    #[test]
    fn confirmation_text_formats_amount() {
        let text = charge_confirmation_text("U1", "U2", Decimal::new(5, 0), "synergy");
        assert_eq!(
            text,
            ":dollar: <@U1> just charged <@U2> $5.00 for using \"synergy\"! Add it to the jar! :money_with_wings:"
        );
    }

    #[test]
    fn help_lists_every_subcommand() {
        let help = help_message("/jargon");
        let Block::Section { text, .. } = &help.blocks[0] else {
            panic!("help should start with a section");
        };
        for needle in ["`/jargon charge`", "`/jargon new`", "`/jargon help`"] {
            assert!(text.text().contains(needle), "help should mention {needle}");
        }
    }
}
