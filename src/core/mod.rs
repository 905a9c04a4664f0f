//! Sheet transformation pipeline
//!
//! extract → classify rows → transform cells → lay out operations.

pub mod classifier;
pub mod extractor;
pub mod layout;
pub mod operations;
pub mod transformer;

use tracing::info;

use crate::config::{Branding, MenuConfig};
use classifier::classify_rows;
use extractor::SourceExtract;
use layout::{data_row, header_block};
use operations::{Dimension, WriteOperation};
use transformer::{transform_cell, CellContext};

pub use classifier::{CategoryState, RowDecision};
pub use extractor::extract;

/// Counters reported after composing a menu.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformStats {
    pub rows_emitted: usize,
    pub hyperlinks: usize,
    pub prices_adjusted: usize,
}

/// Ordered operation list for one target tab.
#[derive(Debug, Clone, Default)]
pub struct Composition {
    pub operations: Vec<WriteOperation>,
    pub stats: TransformStats,
}

/// Build every write for `extract` onto tab `sheet_id`.
///
/// Order: branding block, data cells row by row, then column widths.
pub fn compose(
    config: &MenuConfig,
    branding: &Branding,
    extract: &SourceExtract,
    sheet_id: i64,
) -> Composition {
    let mut operations = header_block(sheet_id, config.layout, branding);
    let mut stats = TransformStats::default();

    let rows = &extract.grid.row_data;
    let limit = extract.truncate_row.min(rows.len());
    let emitted = classify_rows(config, rows, limit);
    stats.rows_emitted = emitted.len();

    for row in &emitted {
        let source = &rows[row.source_index];
        let target_row = data_row(row.output_index);
        let mut target_col = 0;

        for (source_col, cell) in source.values.iter().enumerate() {
            if config.columns_to_remove.contains(&source_col) {
                continue;
            }
            let ctx = CellContext {
                source_col,
                is_header: row.is_header,
                category: row.category.as_deref(),
            };
            let out = transform_cell(config, ctx, cell);
            if out.hyperlink {
                stats.hyperlinks += 1;
            }
            if out.price_adjusted {
                stats.prices_adjusted += 1;
            }
            operations.push(WriteOperation::set_cell(sheet_id, target_row, target_col, out.cell));
            target_col += 1;
        }
    }

    let mut target_col = 0;
    for (source_col, meta) in extract.grid.column_metadata.iter().enumerate() {
        if config.columns_to_remove.contains(&source_col) {
            continue;
        }
        if let Some(px) = meta.pixel_size {
            operations.push(WriteOperation::resize(
                sheet_id,
                Dimension::Columns,
                target_col..target_col + 1,
                px,
            ));
        }
        target_col += 1;
    }

    info!(
        "Composed {} operations: {} rows, {} hyperlinks converted, {} prices adjusted",
        operations.len(),
        stats.rows_emitted,
        stats.hyperlinks,
        stats.prices_adjusted
    );

    Composition { operations, stats }
}
