//! Block Kit description tree.
//!
//! Views are built as plain data and serialized with serde into the JSON Slack expects, so
//! composition code never depends on a transport.

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        emoji: Option<bool>,
    },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into(), emoji: None }
    }

    pub fn plain_emoji(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into(), emoji: Some(true) }
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
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self { action_id: action_id.into(), text: TextObject::plain(label), style: None, value: None }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OptionObject {
    pub text: TextObject,
    pub value: String,
}

impl OptionObject {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self { text: TextObject::plain(label), value: value.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StaticSelectElement {
    pub action_id: String,
    pub options: Vec<OptionObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_option: Option<OptionObject>,
}

impl StaticSelectElement {
    pub fn new(action_id: impl Into<String>) -> Self {
        Self { action_id: action_id.into(), options: Vec::new(), initial_option: None }
    }

    pub fn option(mut self, option: OptionObject) -> Self {
        self.options.push(option);
        self
    }

    pub fn initial_option(mut self, option: Option<OptionObject>) -> Self {
        self.initial_option = option;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImageElement {
    pub image_url: String,
    pub alt_text: String,
}

impl ImageElement {
    pub fn new(image_url: impl Into<String>, alt_text: impl Into<String>) -> Self {
        Self { image_url: image_url.into(), alt_text: alt_text.into() }
    }
}

/// Interactive or decorative element placed in an actions block or a section accessory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockElement {
    Button(ButtonElement),
    StaticSelect(StaticSelectElement),
    Image(ImageElement),
}

impl BlockElement {
    pub fn action_id(&self) -> Option<&str> {
        match self {
            Self::Button(button) => Some(&button.action_id),
            Self::StaticSelect(select) => Some(&select.action_id),
            Self::Image(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContextElement {
    Image {
        image_url: String,
        alt_text: String,
    },
    Mrkdwn {
        text: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        block_id: String,
        text: TextObject,
        #[serde(skip_serializing_if = "Option::is_none")]
        accessory: Option<BlockElement>,
    },
    Divider {
        block_id: String,
    },
    Actions {
        block_id: String,
        elements: Vec<BlockElement>,
    },
    Context {
        block_id: String,
        elements: Vec<ContextElement>,
    },
}

impl Block {
    pub fn block_id(&self) -> &str {
        match self {
            Self::Section { block_id, .. }
            | Self::Divider { block_id }
            | Self::Actions { block_id, .. }
            | Self::Context { block_id, .. } => block_id,
        }
    }

    pub fn is_divider(&self) -> bool {
        matches!(self, Self::Divider { .. })
    }

    /// Action ids of every interactive element in this block, accessory included.
    pub fn action_ids(&self) -> Vec<&str> {
        match self {
            Self::Section { accessory: Some(element), .. } => {
                element.action_id().into_iter().collect()
            }
            Self::Actions { elements, .. } => {
                elements.iter().filter_map(BlockElement::action_id).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Acknowledgement body: a fallback text plus optional blocks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    #[serde(rename = "text")]
    pub fallback_text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
}

impl MessageTemplate {
    pub fn text(text: impl Into<String>) -> Self {
        Self { fallback_text: text.into(), blocks: Vec::new() }
    }

    pub fn with_blocks(fallback_text: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Home,
    Modal,
}

/// A surface payload for `views.publish`, `views.open` or `views.update`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct View {
    #[serde(rename = "type")]
    pub kind: ViewKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<TextObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_on_close: Option<bool>,
    pub blocks: Vec<Block>,
}

impl View {
    pub fn home(blocks: Vec<Block>) -> Self {
        Self { kind: ViewKind::Home, callback_id: None, title: None, notify_on_close: None, blocks }
    }

    pub fn modal(callback_id: impl Into<String>, title: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self {
            kind: ViewKind::Modal,
            callback_id: Some(callback_id.into()),
            title: Some(TextObject::plain_emoji(title)),
            notify_on_close: Some(false),
            blocks,
        }
    }
}

#[derive(Default)]
pub struct BlocksBuilder {
    blocks: Vec<Block>,
}

impl BlocksBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        let (text, accessory) = builder.build();
        self.blocks.push(Block::Section { block_id: block_id.into(), text, accessory });
        self
    }

    pub fn divider(mut self, block_id: impl Into<String>) -> Self {
        self.blocks.push(Block::Divider { block_id: block_id.into() });
        self
    }

    pub fn actions<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        let mut builder = ActionsBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Actions { block_id: block_id.into(), elements: builder.build() });
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

    pub fn extend(mut self, blocks: impl IntoIterator<Item = Block>) -> Self {
        self.blocks.extend(blocks);
        self
    }

    pub fn build(self) -> Vec<Block> {
        self.blocks
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
    accessory: Option<BlockElement>,
}

impl SectionBuilder {
    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    pub fn accessory(&mut self, element: BlockElement) -> &mut Self {
        self.accessory = Some(element);
        self
    }

    fn build(self) -> (TextObject, Option<BlockElement>) {
        (self.text.unwrap_or_else(|| TextObject::plain("")), self.accessory)
    }
}

#[derive(Default)]
pub struct ActionsBuilder {
    elements: Vec<BlockElement>,
}

impl ActionsBuilder {
    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.elements.push(BlockElement::Button(button));
        self
    }

    fn build(self) -> Vec<BlockElement> {
        self.elements
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<ContextElement>,
}

impl ContextBuilder {
    pub fn image(&mut self, image_url: impl Into<String>, alt_text: impl Into<String>) -> &mut Self {
        self.elements
            .push(ContextElement::Image { image_url: image_url.into(), alt_text: alt_text.into() });
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(ContextElement::Mrkdwn { text: text.into() });
        self
    }

    fn build(self) -> Vec<ContextElement> {
        self.elements
    }
}
