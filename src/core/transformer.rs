//! Cell transformation
//!
//! Turns one source cell into its output cell: hyperlinks become
//! `=HYPERLINK()` formulas, prices in the price column get the category
//! markup, header category labels can be renamed, and everything else is
//! copied verbatim.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::config::{MenuConfig, Upcharge};
use crate::types::{CellData, ExtendedValue};

/// Extensions stripped from link display text.
const MEDIA_EXTENSIONS: &[&str] = &[
    ".heic", ".mov", ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".mp4", ".avi",
];

fn price_noise() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^0-9.\-]").ok()).as_ref()
}

//==============================================================================
// Hyperlinks
//==============================================================================

/// Where a cell's link was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSource {
    Chip,
    Cell,
    TextRun,
    Format,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellLink {
    /// The cell already holds a `=HYPERLINK(` formula; keep it as is.
    Formula(String),
    Url {
        url: String,
        text: Option<String>,
        source: LinkSource,
    },
    None,
}

impl CellLink {
    pub fn is_none(&self) -> bool {
        matches!(self, CellLink::None)
    }
}

fn find_url(cell: &CellData) -> Option<(String, LinkSource)> {
    let chip = cell.chip_runs.iter().find_map(|run| {
        run.chip
            .as_ref()
            .and_then(|c| c.rich_link_properties.as_ref())
            .and_then(|p| p.uri.clone())
    });
    if let Some(url) = chip {
        return Some((url, LinkSource::Chip));
    }

    if let Some(url) = cell.hyperlink.clone().filter(|u| !u.is_empty()) {
        return Some((url, LinkSource::Cell));
    }

    let run = cell
        .text_format_runs
        .iter()
        .find_map(|r| r.format.as_ref().and_then(|f| f.link_uri()).map(str::to_string));
    if let Some(url) = run {
        return Some((url, LinkSource::TextRun));
    }

    [&cell.user_entered_format, &cell.effective_format]
        .into_iter()
        .flatten()
        .find_map(|f| f.link_uri())
        .map(|url| (url.to_string(), LinkSource::Format))
}

/// Strip one known media extension from the end, case-insensitively.
pub fn strip_media_extension(text: &str) -> &str {
    let lower = text.to_ascii_lowercase();
    MEDIA_EXTENSIONS
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map(|ext| &text[..text.len() - ext.len()])
        .unwrap_or(text)
}

/// Locate a link in `cell` (chip, cell hyperlink, text run, then format).
pub fn extract_link(cell: &CellData) -> CellLink {
    let url = find_url(cell);

    if let Some(ExtendedValue::FormulaValue(ref f)) = cell.user_entered_value {
        if f.trim_start().to_uppercase().starts_with("=HYPERLINK(") {
            return CellLink::Formula(f.clone());
        }
    }

    let Some((url, source)) = url else {
        return CellLink::None;
    };

    let text = cell
        .user_entered_value
        .as_ref()
        .and_then(ExtendedValue::as_str)
        .filter(|s| !s.is_empty())
        .or(cell.formatted_value.as_deref())
        .filter(|s| !s.is_empty())
        .map(|t| strip_media_extension(t).to_string());

    debug!("Found hyperlink ({:?}): url={}, text={:?}", source, url, text);
    CellLink::Url { url, text, source }
}

/// `=HYPERLINK("url","text")` with embedded quotes doubled.
pub fn hyperlink_formula(url: &str, text: &str) -> String {
    format!(
        "=HYPERLINK(\"{}\",\"{}\")",
        url.replace('"', "\"\""),
        text.replace('"', "\"\"")
    )
}

//==============================================================================
// Prices
//==============================================================================

/// Numeric base price of a cell: numbers directly, strings after stripping
/// everything but digits, `.` and `-`.
pub fn base_price(cell: &CellData) -> Option<f64> {
    match cell.user_entered_value.as_ref()? {
        ExtendedValue::NumberValue(n) => Some(*n),
        ExtendedValue::StringValue(s) if s.chars().any(|c| c.is_ascii_digit()) => {
            let cleaned = price_noise()?.replace_all(s, "");
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    }
}

/// Adjusted price for `base` under `category`, or `None` when no rule applies.
pub fn adjust_price(base: f64, category: &str, config: &MenuConfig) -> Option<f64> {
    if let Some(rule) = config.conditional_for(category) {
        return rule.apply(base);
    }
    match config.upcharge_for(category)? {
        Upcharge::Flat(amount) => Some(base + amount),
        Upcharge::Conditional => None,
    }
}

//==============================================================================
// Cells
//==============================================================================

/// Row-level context for one cell.
#[derive(Debug, Clone, Copy)]
pub struct CellContext<'a> {
    pub source_col: usize,
    pub is_header: bool,
    pub category: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformedCell {
    pub cell: CellData,
    pub hyperlink: bool,
    pub price_adjusted: bool,
}

/// Compute the output cell for `source`.
pub fn transform_cell(config: &MenuConfig, ctx: CellContext<'_>, source: &CellData) -> TransformedCell {
    let link = extract_link(source);
    let mut value: Option<ExtendedValue> = None;
    let mut hyperlink = false;
    let mut price_adjusted = false;

    if ctx.source_col == config.price_column && link.is_none() {
        if let (Some(category), Some(base)) = (ctx.category, base_price(source)) {
            if let Some(adjusted) = adjust_price(base, category, config) {
                debug!(
                    "Adjusting price {} -> {} for category '{}'",
                    base, adjusted, category
                );
                value = Some(ExtendedValue::NumberValue(adjusted));
                price_adjusted = true;
            }
        }
    }

    if value.is_none() {
        value = match link {
            CellLink::Url {
                ref url,
                text: Some(ref text),
                ..
            } => {
                hyperlink = true;
                Some(ExtendedValue::FormulaValue(hyperlink_formula(url, text)))
            }
            CellLink::Formula(ref f) => {
                hyperlink = true;
                Some(ExtendedValue::FormulaValue(f.clone()))
            }
            _ => None,
        };
    }

    if value.is_none() && ctx.is_header && ctx.source_col == config.category_column {
        value = config
            .rename_category(source.plain_text())
            .map(|label| ExtendedValue::StringValue(label.to_string()));
    }

    if value.is_none() {
        value = source.user_entered_value.clone();
    }

    let format = source.user_entered_format.clone().map(|f| {
        if ctx.is_header {
            f
        } else {
            f.without_background()
        }
    });

    TransformedCell {
        cell: CellData {
            user_entered_value: value,
            user_entered_format: format,
            ..Default::default()
        },
        hyperlink,
        price_adjusted,
    }
}
