//! Grid data model
//!
//! Mirrors the subset of the Sheets v4 `CellData`/`GridData` JSON shapes the
//! pipeline reads and writes. Unknown format fields are carried through
//! verbatim so copied cells keep borders, number formats and wrapping.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

//==============================================================================
// Cell values
//==============================================================================

/// A user-entered cell value (`ExtendedValue` on the wire).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExtendedValue {
    NumberValue(f64),
    StringValue(String),
    BoolValue(bool),
    FormulaValue(String),
    ErrorValue(Value),
}

impl ExtendedValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ExtendedValue::StringValue(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_formula(&self) -> Option<&str> {
        match self {
            ExtendedValue::FormulaValue(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, ExtendedValue::FormulaValue(_))
    }
}

//==============================================================================
// Formats
//==============================================================================

/// RGB colour. Sheets omits zero components, so every channel is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Color {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub red: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub green: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blue: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f32>,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(red: f32, green: f32, blue: f32) -> Self {
        Self {
            red: Some(red),
            green: Some(green),
            blue: Some(blue),
            alpha: None,
        }
    }

    /// True when no channel is present at all (an empty `{}` object).
    pub fn is_unset(&self) -> bool {
        self.red.is_none() && self.green.is_none() && self.blue.is_none()
    }

    pub fn is_white(&self) -> bool {
        self.red.unwrap_or(0.0) == 1.0
            && self.green.unwrap_or(0.0) == 1.0
            && self.blue.unwrap_or(0.0) == 1.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFormat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TextFormat {
    pub fn link_uri(&self) -> Option<&str> {
        self.link.as_ref().and_then(|l| l.uri.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellFormat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horizontal_alignment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical_alignment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_format: Option<TextFormat>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CellFormat {
    pub fn background(color: Color) -> Self {
        Self {
            background_color: Some(color),
            ..Default::default()
        }
    }

    /// Drop every background field, including the theme-aware style variant.
    pub fn without_background(mut self) -> Self {
        self.background_color = None;
        self.extra.remove("backgroundColorStyle");
        self
    }

    pub fn has_colored_background(&self) -> bool {
        self.background_color
            .map(|c| !c.is_unset() && !c.is_white())
            .unwrap_or(false)
    }

    pub fn link_uri(&self) -> Option<&str> {
        self.text_format.as_ref().and_then(TextFormat::link_uri)
    }
}

//==============================================================================
// Rich text runs
//==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFormatRun {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<TextFormat>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichLinkProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chip {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rich_link_properties: Option<RichLinkProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChipRun {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chip: Option<Chip>,
}

//==============================================================================
// Cells, rows, grids
//==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_entered_value: Option<ExtendedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_entered_format: Option<CellFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_format: Option<CellFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hyperlink: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text_format_runs: Vec<TextFormatRun>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chip_runs: Vec<ChipRun>,
}

impl CellData {
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            formatted_value: Some(value.clone()),
            user_entered_value: Some(ExtendedValue::StringValue(value)),
            ..Default::default()
        }
    }

    pub fn number(value: f64) -> Self {
        Self {
            user_entered_value: Some(ExtendedValue::NumberValue(value)),
            formatted_value: Some(format_number(value)),
            ..Default::default()
        }
    }

    pub fn formula(formula: impl Into<String>) -> Self {
        Self {
            user_entered_value: Some(ExtendedValue::FormulaValue(formula.into())),
            ..Default::default()
        }
    }

    pub fn with_background(mut self, color: Color) -> Self {
        let mut format = self.user_entered_format.take().unwrap_or_default();
        format.background_color = Some(color);
        self.user_entered_format = Some(format);
        self
    }

    pub fn with_hyperlink(mut self, url: impl Into<String>) -> Self {
        self.hyperlink = Some(url.into());
        self
    }

    /// Entered string value, falling back to the rendered display string.
    pub fn plain_text(&self) -> &str {
        self.user_entered_value
            .as_ref()
            .and_then(ExtendedValue::as_str)
            .or(self.formatted_value.as_deref())
            .unwrap_or("")
    }

    /// Value as a formatted-value view would render it.
    pub fn display_text(&self) -> String {
        if let Some(ref formatted) = self.formatted_value {
            return formatted.clone();
        }
        match self.user_entered_value {
            Some(ExtendedValue::StringValue(ref s)) => s.clone(),
            Some(ExtendedValue::NumberValue(n)) => format_number(n),
            Some(ExtendedValue::BoolValue(b)) => if b { "TRUE" } else { "FALSE" }.to_string(),
            _ => String::new(),
        }
    }
}

/// Render a number without a trailing `.0` for integral values.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowData {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<CellData>,
}

impl RowData {
    pub fn new(values: Vec<CellData>) -> Self {
        Self { values }
    }

    pub fn cell(&self, col: usize) -> Option<&CellData> {
        self.values.get(col)
    }

    /// Lowercased text of every cell, space separated.
    pub fn row_text(&self) -> String {
        self.values
            .iter()
            .map(CellData::plain_text)
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pixel_size: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridData {
    #[serde(default)]
    pub row_data: Vec<RowData>,
    #[serde(default)]
    pub column_metadata: Vec<DimensionProperties>,
}

//==============================================================================
// Spreadsheet metadata
//==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetMetadata {
    pub title: String,
    pub sheets: Vec<SheetProperties>,
}

impl SpreadsheetMetadata {
    pub fn tab(&self, title: &str) -> Option<&SheetProperties> {
        self.sheets.iter().find(|s| s.title == title)
    }
}
