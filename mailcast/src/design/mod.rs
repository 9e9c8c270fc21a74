//! Email design documents
//!
//! The structured row/column/block tree that the editor produces and the
//! renderer consumes. The whole document is replaced atomically whenever
//! a template is saved; nothing here mutates in place.
//!
//! `Block` is a closed tagged union: adding a block kind is a
//! compile-time-checked extension point in the renderer. Documents
//! written by newer editors may carry block types this build does not
//! know; those deserialize to [`Block::Unknown`] and render to nothing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Document-wide visual settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalSettings {
    pub background_color: String,
    /// Content width in pixels
    pub content_width: u32,
    pub font_family: String,
    pub text_color: String,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            background_color: "#f4f4f4".to_string(),
            content_width: 600,
            font_family: "Arial, Helvetica, sans-serif".to_string(),
            text_color: "#333333".to_string(),
        }
    }
}

/// Padding box, rendered as `top right bottom left` in pixels
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Padding {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Padding {
    /// Uniform padding on all sides
    #[must_use]
    pub const fn uniform(px: u32) -> Self {
        Self {
            top: px,
            right: px,
            bottom: px,
            left: px,
        }
    }
}

/// Horizontal alignment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    #[must_use]
    pub const fn as_css(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

/// Opaque row identity, stable across reorder and duplicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowId(Uuid);

impl RowId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RowId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Column layout presets with fixed width ratios
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RowLayout {
    /// Single full-width column
    #[default]
    Single,
    /// Two equal columns
    TwoEqual,
    /// Narrow left column (1/3) with wide right column (2/3)
    ThirdTwoThirds,
    /// Wide left column (2/3) with narrow right column (1/3)
    TwoThirdsThird,
    /// Three equal columns
    ThreeEqual,
}

impl RowLayout {
    /// Column width percentages for this preset
    #[must_use]
    pub fn ratios(self) -> &'static [f32] {
        match self {
            Self::Single => &[100.0],
            Self::TwoEqual => &[50.0, 50.0],
            Self::ThirdTwoThirds => &[33.33, 66.67],
            Self::TwoThirdsThird => &[66.67, 33.33],
            Self::ThreeEqual => &[33.33, 33.33, 33.34],
        }
    }
}

/// A horizontal band of 1-3 columns
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    #[serde(default)]
    pub id: RowId,
    #[serde(default)]
    pub layout: RowLayout,
    #[serde(default)]
    pub padding: Padding,
    #[serde(default)]
    pub background_color: Option<String>,
    pub columns: Vec<Column>,
}

/// A vertical stack of blocks inside a row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Column {
    #[serde(default)]
    pub blocks: Vec<Block>,
}

/// Border style for dividers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl BorderStyle {
    #[must_use]
    pub const fn as_css(self) -> &'static str {
        match self {
            Self::Solid => "solid",
            Self::Dashed => "dashed",
            Self::Dotted => "dotted",
        }
    }
}

/// A social network link in a socials block
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLink {
    pub network: String,
    pub url: String,
    /// Icon image; root-relative URLs are resolved against the base URL
    pub icon_url: Option<String>,
}

/// Leaf content node of a column
///
/// Each variant carries its own style attributes. The serialized form is
/// internally tagged (`"type": "button"`), matching the editor's document
/// format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Block {
    Heading {
        text: String,
        #[serde(default = "default_heading_level")]
        level: u8,
        #[serde(default)]
        color: Option<String>,
        #[serde(default)]
        align: Alignment,
        #[serde(default)]
        padding: Padding,
    },
    Paragraph {
        text: String,
        #[serde(default)]
        color: Option<String>,
        #[serde(default = "default_font_size")]
        font_size: u32,
        #[serde(default)]
        align: Alignment,
        #[serde(default)]
        padding: Padding,
    },
    Button {
        text: String,
        url: String,
        #[serde(default = "default_button_background")]
        background_color: String,
        #[serde(default = "default_button_text_color")]
        text_color: String,
        #[serde(default)]
        border_radius: u32,
        #[serde(default)]
        align: Alignment,
        #[serde(default)]
        padding: Padding,
    },
    Image {
        url: String,
        #[serde(default)]
        alt: String,
        /// Width in pixels; full column width when absent
        #[serde(default)]
        width: Option<u32>,
        #[serde(default)]
        align: Alignment,
        #[serde(default)]
        padding: Padding,
    },
    List {
        items: Vec<String>,
        #[serde(default)]
        ordered: bool,
        #[serde(default)]
        color: Option<String>,
        #[serde(default)]
        padding: Padding,
    },
    Divider {
        #[serde(default = "default_divider_color")]
        color: String,
        #[serde(default = "default_divider_thickness")]
        thickness: u32,
        /// Width as a percentage of the column
        #[serde(default = "default_divider_width")]
        width_percent: u32,
        #[serde(default)]
        style: BorderStyle,
        #[serde(default)]
        align: Alignment,
        #[serde(default)]
        padding: Padding,
    },
    Spacer {
        #[serde(default = "default_spacer_height")]
        height: u32,
    },
    ProductLine {
        name: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        price: Option<String>,
        #[serde(default)]
        image_url: Option<String>,
        #[serde(default)]
        padding: Padding,
    },
    Socials {
        links: Vec<SocialLink>,
        #[serde(default)]
        align: Alignment,
        #[serde(default)]
        padding: Padding,
    },
    /// Block type this build does not recognize; renders to nothing
    #[serde(other)]
    Unknown,
}

fn default_heading_level() -> u8 {
    1
}

fn default_font_size() -> u32 {
    16
}

fn default_button_background() -> String {
    "#007bff".to_string()
}

fn default_button_text_color() -> String {
    "#ffffff".to_string()
}

fn default_divider_color() -> String {
    "#dddddd".to_string()
}

fn default_divider_thickness() -> u32 {
    1
}

fn default_divider_width() -> u32 {
    100
}

fn default_spacer_height() -> u32 {
    20
}

/// The complete design of an email template
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailDesignDocument {
    #[serde(default)]
    pub settings: GlobalSettings,
    #[serde(default)]
    pub rows: Vec<Row>,
}
