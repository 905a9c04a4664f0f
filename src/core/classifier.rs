//! Row classification and category tracking
//!
//! Rows are scanned in order. Category headers (rows whose first cell has a
//! coloured background) open a section; data rows inherit whatever section
//! is open. [`classify_row`] is a pure step function over [`CategoryState`]
//! so the scan can be tested without a full grid.

use tracing::debug;

use crate::config::MenuConfig;
use crate::types::{CellData, ExtendedValue, RowData};

/// State carried across the row scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryState {
    /// Lowercased pricing category of the open section.
    pub current: Option<String>,
    /// Whether rows in the open section are emitted (filtered menus only).
    pub keep: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Header of a section that did not match the filter keywords.
    FilteredHeader,
    /// Matching category header; updates state but is not output in filtered menus.
    ConsumedHeader,
    /// Data row inside a section that is not kept.
    FilteredSection,
    /// Data row without a usable price.
    NoPrice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowDecision {
    Emit {
        is_header: bool,
        category: Option<String>,
    },
    Skip(SkipReason),
}

impl RowDecision {
    pub fn is_emit(&self) -> bool {
        matches!(self, RowDecision::Emit { .. })
    }
}

/// First cell carries a non-white background in its entered or effective format.
pub fn is_category_header(row: &RowData) -> bool {
    row.cell(0)
        .map(|cell| {
            [&cell.user_entered_format, &cell.effective_format]
                .into_iter()
                .flatten()
                .any(|f| f.has_colored_background())
        })
        .unwrap_or(false)
}

/// Price cell holds a number, or a string with a digit, and no formula.
pub fn has_price(cell: Option<&CellData>) -> bool {
    match cell.and_then(|c| c.user_entered_value.as_ref()) {
        Some(ExtendedValue::NumberValue(_)) => true,
        Some(ExtendedValue::StringValue(s)) => s.chars().any(|c| c.is_ascii_digit()),
        _ => false,
    }
}

/// Classify one row and return the state for the next one.
///
/// `index` is relative to the extracted region (0 = first row after
/// `skip_rows`).
pub fn classify_row(
    config: &MenuConfig,
    state: CategoryState,
    index: usize,
    row: &RowData,
) -> (CategoryState, RowDecision) {
    let is_header = is_category_header(row);

    if config.filter_enabled {
        if config.preserve_header_row && index == 0 {
            debug!("Row {}: preserving header row", index + 1);
            let category = state.current.clone();
            return (state, RowDecision::Emit { is_header, category });
        }

        if is_header {
            let row_text = row.row_text();
            return match config.matching_keyword(&row_text) {
                Some(keyword) => {
                    let category = config
                        .match_category(&row_text)
                        .unwrap_or_else(|| keyword.to_lowercase());
                    debug!(
                        "Row {}: category header '{}' - keeping section",
                        index + 1,
                        category
                    );
                    (
                        CategoryState {
                            current: Some(category),
                            keep: true,
                        },
                        RowDecision::Skip(SkipReason::ConsumedHeader),
                    )
                }
                None => {
                    debug!("Row {}: category header without keywords - skipping section", index + 1);
                    (CategoryState::default(), RowDecision::Skip(SkipReason::FilteredHeader))
                }
            };
        }

        if !state.keep {
            return (state, RowDecision::Skip(SkipReason::FilteredSection));
        }
        if !has_price(row.cell(config.price_column)) {
            return (state, RowDecision::Skip(SkipReason::NoPrice));
        }
        let category = state.current.clone();
        return (state, RowDecision::Emit { is_header: false, category });
    }

    if is_header {
        let text = row
            .cell(config.category_column)
            .map(CellData::plain_text)
            .unwrap_or("");
        let current = config.match_category(text);
        if let Some(ref category) = current {
            debug!("Row {}: detected category '{}'", index + 1, category);
        }
        let state = CategoryState {
            current: current.clone(),
            keep: state.keep,
        };
        return (
            state,
            RowDecision::Emit {
                is_header: true,
                category: current,
            },
        );
    }

    if !has_price(row.cell(config.price_column)) {
        return (state, RowDecision::Skip(SkipReason::NoPrice));
    }
    let category = state.current.clone();
    (state, RowDecision::Emit { is_header: false, category })
}

/// One emitted row: its source index within the extract and its compact output index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRow {
    pub source_index: usize,
    pub output_index: usize,
    pub is_header: bool,
    pub category: Option<String>,
}

/// Scan `rows[..limit]` and return the emitted rows in order.
pub fn classify_rows(config: &MenuConfig, rows: &[RowData], limit: usize) -> Vec<ClassifiedRow> {
    let mut state = CategoryState::default();
    let mut emitted = Vec::new();

    for (index, row) in rows.iter().take(limit).enumerate() {
        if row.values.is_empty() {
            continue;
        }
        let (next, decision) = classify_row(config, state, index, row);
        state = next;
        if let RowDecision::Emit { is_header, category } = decision {
            emitted.push(ClassifiedRow {
                source_index: index,
                output_index: emitted.len(),
                is_header,
                category,
            });
        }
    }

    emitted
}
