//! Output layout
//!
//! The target tab starts with a fixed branding block ([`HEADER_ROWS`] rows):
//!
//! ```text
//! row 0   spacer
//! row 1   logo (merged across the logo span)
//! row 2   spacer
//! row 3-5 contact lines (merged, centered)
//! row 6-7 spacer
//! ```
//!
//! Transformed data starts right below it.

use crate::config::{Branding, Layout};
use crate::core::operations::{Dimension, GridRange, WriteOperation};
use crate::types::{CellData, CellFormat, Color, ExtendedValue, TextFormat};

pub const HEADER_ROWS: usize = 8;

const LOGO_ROW: usize = 1;
const CONTACT_FIRST_ROW: usize = 3;
const LOGO_COLUMN_PX: u32 = 220;
const LOGO_ROW_PX: u32 = 300;
/// Fills reach column Z.
const FILL_END_COL: usize = 26;

fn centered(color: Color) -> CellFormat {
    CellFormat {
        background_color: Some(color),
        horizontal_alignment: Some("CENTER".to_string()),
        vertical_alignment: Some("MIDDLE".to_string()),
        ..Default::default()
    }
}

/// Unmerge the whole row, then merge it across `span`. Safe to re-run.
fn remerge(sheet_id: i64, row: usize, span: (usize, usize)) -> [WriteOperation; 2] {
    [
        WriteOperation::unmerge(GridRange::rows(sheet_id, row..row + 1)),
        WriteOperation::merge(GridRange::block(sheet_id, row..row + 1, span.0..span.1)),
    ]
}

/// Operations that draw the branding block.
pub fn header_block(sheet_id: i64, layout: Layout, branding: &Branding) -> Vec<WriteOperation> {
    let span = layout.logo_span();
    let brand = branding.brand_color;
    let mut ops = Vec::new();

    ops.extend(remerge(sheet_id, LOGO_ROW, span));
    ops.push(WriteOperation::resize(
        sheet_id,
        Dimension::Columns,
        span.0..span.1,
        LOGO_COLUMN_PX,
    ));
    ops.push(WriteOperation::set_cell_fields(
        sheet_id,
        LOGO_ROW,
        span.0,
        CellData {
            user_entered_value: Some(ExtendedValue::FormulaValue(format!(
                "=IMAGE(\"{}\", 3)",
                branding.logo_url.replace('"', "\"\"")
            ))),
            user_entered_format: Some(centered(brand)),
            ..Default::default()
        },
        "userEnteredValue,userEnteredFormat",
    ));

    for (i, line) in branding.contact_lines.iter().enumerate() {
        let row = CONTACT_FIRST_ROW + i;
        if row >= HEADER_ROWS {
            break;
        }
        let mut format = centered(brand);
        format.text_format = Some(TextFormat {
            bold: Some(line.bold),
            font_size: Some(if line.bold { 14 } else { 12 }),
            ..Default::default()
        });
        ops.extend(remerge(sheet_id, row, span));
        ops.push(WriteOperation::set_cell_fields(
            sheet_id,
            row,
            span.0,
            CellData {
                user_entered_value: Some(ExtendedValue::StringValue(line.text.replace("**", ""))),
                user_entered_format: Some(format),
                ..Default::default()
            },
            "userEnteredValue,userEnteredFormat",
        ));
    }

    match layout {
        Layout::Left => {
            // Brand colour across the span on the spacer rows, white beyond it.
            for rows in [0..1, 2..3, 6..HEADER_ROWS] {
                ops.push(WriteOperation::fill(
                    GridRange::block(sheet_id, rows, span.0..span.1),
                    brand,
                ));
            }
            ops.push(WriteOperation::fill(
                GridRange::block(sheet_id, 0..HEADER_ROWS, span.1..FILL_END_COL),
                Color::WHITE,
            ));
        }
        Layout::Offset => {
            for rows in [0..1, 6..HEADER_ROWS] {
                ops.push(WriteOperation::fill(
                    GridRange::block(sheet_id, rows, 0..FILL_END_COL),
                    Color::WHITE,
                ));
            }
        }
    }

    ops.push(WriteOperation::fill(
        GridRange::block(sheet_id, LOGO_ROW..LOGO_ROW + 1, span.0..span.1),
        brand,
    ));
    ops.push(WriteOperation::resize(
        sheet_id,
        Dimension::Rows,
        LOGO_ROW..LOGO_ROW + 1,
        LOGO_ROW_PX,
    ));

    ops
}

/// Target row of a data row given its compact output index.
pub fn data_row(output_index: usize) -> usize {
    output_index + HEADER_ROWS
}
