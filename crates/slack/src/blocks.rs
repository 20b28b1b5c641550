//! Typed Block Kit surfaces: messages, modals and their elements.

use serde::Serialize;

/// Slack rejects messages with more blocks than this.
pub const MAX_MESSAGE_BLOCKS: usize = 50;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    #[serde(rename = "mrkdwn")]
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text } | Self::Mrkdwn { text } => text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConfirmDialog {
    pub title: TextObject,
    pub text: TextObject,
    pub confirm: TextObject,
    pub deny: TextObject,
}

impl ConfirmDialog {
    pub fn new(
        title: impl Into<String>,
        text: impl Into<String>,
        confirm: impl Into<String>,
        deny: impl Into<String>,
    ) -> Self {
        Self {
            title: TextObject::plain(title),
            text: TextObject::mrkdwn(text),
            confirm: TextObject::plain(confirm),
            deny: TextObject::plain(deny),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm: Option<ConfirmDialog>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            text: TextObject::plain(label),
            style: None,
            value: None,
            confirm: None,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn confirm(mut self, confirm: ConfirmDialog) -> Self {
        self.confirm = Some(confirm);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub text: TextObject,
    pub value: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self { text: TextObject::plain(label), value: value.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StaticSelect {
    pub action_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<TextObject>,
    pub options: Vec<SelectOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_option: Option<SelectOption>,
}

impl StaticSelect {
    pub fn new(action_id: impl Into<String>, options: Vec<SelectOption>) -> Self {
        Self { action_id: action_id.into(), placeholder: None, options, initial_option: None }
    }

    pub fn placeholder(mut self, text: impl Into<String>) -> Self {
        self.placeholder = Some(TextObject::plain(text));
        self
    }

    /// Preselects the option whose value is `value`; unknown values leave the
    /// select empty because Slack rejects an `initial_option` outside `options`.
    pub fn initial_value(mut self, value: &str) -> Self {
        self.initial_option = self.options.iter().find(|option| option.value == value).cloned();
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DatePicker {
    pub action_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<TextObject>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TimePicker {
    pub action_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<TextObject>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlainTextInput {
    pub action_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<TextObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
}

impl PlainTextInput {
    pub fn new(action_id: impl Into<String>) -> Self {
        Self { action_id: action_id.into(), placeholder: None, initial_value: None, max_length: None }
    }

    pub fn placeholder(mut self, text: impl Into<String>) -> Self {
        self.placeholder = Some(TextObject::plain(text));
        self
    }

    pub fn initial_value(mut self, value: impl Into<String>) -> Self {
        self.initial_value = Some(value.into());
        self
    }

    pub fn max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Button(ButtonElement),
    StaticSelect(StaticSelect),
    Datepicker(DatePicker),
    Timepicker(TimePicker),
    PlainTextInput(PlainTextInput),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InputBlock {
    pub block_id: String,
    pub label: TextObject,
    pub element: Element,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<TextObject>,
}

impl InputBlock {
    pub fn new(block_id: impl Into<String>, label: impl Into<String>, element: Element) -> Self {
        Self {
            block_id: block_id.into(),
            label: TextObject::plain(label),
            element,
            optional: false,
            hint: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(TextObject::plain(hint));
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<TextObject>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        fields: Vec<TextObject>,
    },
    Divider,
    Context {
        #[serde(skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        elements: Vec<TextObject>,
    },
    Actions {
        #[serde(skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        elements: Vec<Element>,
    },
    Input(InputBlock),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    InChannel,
    Ephemeral,
}

/// Message body posted to a `response_url` or returned from a slash command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_type: Option<ResponseType>,
    #[serde(rename = "text")]
    pub fallback_text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    response_type: Option<ResponseType>,
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { response_type: None, fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    pub fn section<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(builder.build());
        self
    }

    pub fn divider(mut self) -> Self {
        self.blocks.push(Block::Divider);
        self
    }

    pub fn actions<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        let mut builder = ActionsBuilder::default();
        build(&mut builder);
        self.blocks
            .push(Block::Actions { block_id: Some(block_id.into()), elements: builder.build() });
        self
    }

    pub fn context<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: None, elements: builder.build() });
        self
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate {
            response_type: self.response_type,
            fallback_text: self.fallback_text,
            blocks: self.blocks,
        }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
    fields: Vec<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    pub fn field(&mut self, text: impl Into<String>) -> &mut Self {
        self.fields.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Block {
        let text = match (self.text, self.fields.is_empty()) {
            (Some(text), _) => Some(text),
            (None, true) => Some(TextObject::plain(" ")),
            (None, false) => None,
        };
        Block::Section { block_id: None, text, fields: self.fields }
    }
}

#[derive(Default)]
pub struct ActionsBuilder {
    elements: Vec<Element>,
}

impl ActionsBuilder {
    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.elements.push(Element::Button(button));
        self
    }

    fn build(self) -> Vec<Element> {
        self.elements
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Modal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModalView {
    #[serde(rename = "type")]
    pub kind: ViewKind,
    pub callback_id: String,
    pub title: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit: Option<TextObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close: Option<TextObject>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub private_metadata: String,
    pub blocks: Vec<Block>,
}

pub struct ModalBuilder {
    view: ModalView,
}

impl ModalBuilder {
    pub fn new(callback_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            view: ModalView {
                kind: ViewKind::Modal,
                callback_id: callback_id.into(),
                title: TextObject::plain(title),
                submit: None,
                close: None,
                private_metadata: String::new(),
                blocks: Vec::new(),
            },
        }
    }

    pub fn submit(mut self, label: impl Into<String>) -> Self {
        self.view.submit = Some(TextObject::plain(label));
        self
    }

    pub fn close(mut self, label: impl Into<String>) -> Self {
        self.view.close = Some(TextObject::plain(label));
        self
    }

    pub fn private_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.view.private_metadata = metadata.into();
        self
    }

    pub fn input(mut self, input: InputBlock) -> Self {
        self.view.blocks.push(Block::Input(input));
        self
    }

    pub fn build(self) -> ModalView {
        self.view
    }
}
