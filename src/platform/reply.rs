//! Renderable message model shared by commands, pagination and the gateway adapter.

/// Custom id of the "previous page" navigation button.
pub const PREVIOUS_ID: &str = "previous";
/// Custom id of the "next page" navigation button.
pub const NEXT_ID: &str = "next";
/// Custom id of the inert page indicator.
pub const PAGE_NUMBER_ID: &str = "page_number";

/// A message body: content, embeds, button rows and visibility.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
    pub components: Vec<ActionRow>,
    pub ephemeral: bool,
}

impl Reply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new().content(content)
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn row(mut self, row: ActionRow) -> Self {
        self.components.push(row);
        self
    }

    pub fn ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }

    pub fn has_components(&self) -> bool {
        self.components.iter().any(|row| !row.buttons.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<u32>,
    pub thumbnail: Option<String>,
    pub image: Option<String>,
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail = Some(url.into());
        self
    }

    pub fn image(mut self, url: impl Into<String>) -> Self {
        self.image = Some(url.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionRow {
    pub buttons: Vec<Button>,
}

impl ActionRow {
    pub fn new(buttons: Vec<Button>) -> Self {
        Self { buttons }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Success,
    Danger,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub custom_id: String,
    pub label: String,
    pub style: ButtonStyle,
    pub disabled: bool,
    pub emoji: Option<String>,
}

impl Button {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>, style: ButtonStyle) -> Self {
        Self {
            custom_id: custom_id.into(),
            label: label.into(),
            style,
            disabled: false,
            emoji: None,
        }
    }

    pub fn primary(label: impl Into<String>, custom_id: impl Into<String>) -> Self {
        Self::new(custom_id, label, ButtonStyle::Primary)
    }

    pub fn secondary(label: impl Into<String>, custom_id: impl Into<String>) -> Self {
        Self::new(custom_id, label, ButtonStyle::Secondary)
    }

    pub fn success(label: impl Into<String>, custom_id: impl Into<String>) -> Self {
        Self::new(custom_id, label, ButtonStyle::Success)
    }

    pub fn danger(label: impl Into<String>, custom_id: impl Into<String>) -> Self {
        Self::new(custom_id, label, ButtonStyle::Danger)
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }

    pub fn previous_page(disabled: bool) -> Self {
        Self::secondary("Previous Page", PREVIOUS_ID).disabled(disabled)
    }

    pub fn next_page(disabled: bool) -> Self {
        Self::secondary("Next Page", NEXT_ID).disabled(disabled)
    }

    pub fn page_indicator(page: usize, total: usize) -> Self {
        Self::primary(format!("Page {} / {}", page + 1, total), PAGE_NUMBER_ID)
    }
}

/// Copy of `rows` with every button disabled.
pub fn disable_all_components(rows: &[ActionRow]) -> Vec<ActionRow> {
    rows.iter()
        .map(|row| ActionRow {
            buttons: row
                .buttons
                .iter()
                .cloned()
                .map(|button| button.disabled(true))
                .collect(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextInputStyle {
    Short,
    Paragraph,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextInput {
    pub custom_id: String,
    pub label: String,
    pub style: TextInputStyle,
    pub placeholder: Option<String>,
    pub required: bool,
}

impl TextInput {
    pub fn paragraph(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            custom_id: custom_id.into(),
            label: label.into(),
            style: TextInputStyle::Paragraph,
            placeholder: None,
            required: true,
        }
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }
}

/// A modal prompt. The gateway assigns the custom id when it is sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalSpec {
    pub title: String,
    pub inputs: Vec<TextInput>,
}

impl ModalSpec {
    pub fn new(title: impl Into<String>, inputs: Vec<TextInput>) -> Self {
        Self {
            title: title.into(),
            inputs,
        }
    }
}
