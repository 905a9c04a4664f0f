//! Write operations
//!
//! Each [`WriteOperation`] is one self-contained `batchUpdate` request. The
//! enum serializes to exactly the request JSON the Sheets API expects, e.g.
//! `{"mergeCells": {"range": {...}, "mergeType": "MERGE_ALL"}}`.

use serde::{Deserialize, Serialize};

use crate::types::{CellData, CellFormat, DimensionProperties, RowData};

/// Half-open grid range on one tab. Missing bounds are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRange {
    pub sheet_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_row_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_row_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_column_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_column_index: Option<usize>,
}

impl GridRange {
    pub fn rows(sheet_id: i64, rows: std::ops::Range<usize>) -> Self {
        Self {
            sheet_id,
            start_row_index: Some(rows.start),
            end_row_index: Some(rows.end),
            ..Default::default()
        }
    }

    pub fn block(
        sheet_id: i64,
        rows: std::ops::Range<usize>,
        cols: std::ops::Range<usize>,
    ) -> Self {
        Self {
            sheet_id,
            start_row_index: Some(rows.start),
            end_row_index: Some(rows.end),
            start_column_index: Some(cols.start),
            end_column_index: Some(cols.end),
        }
    }

    pub fn cell(sheet_id: i64, row: usize, col: usize) -> Self {
        Self::block(sheet_id, row..row + 1, col..col + 1)
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        let within = |v: usize, start: Option<usize>, end: Option<usize>| {
            start.map_or(true, |s| v >= s) && end.map_or(true, |e| v < e)
        };
        within(row, self.start_row_index, self.end_row_index)
            && within(col, self.start_column_index, self.end_column_index)
    }

    pub fn intersects(&self, other: &GridRange) -> bool {
        let overlap = |a0: Option<usize>, a1: Option<usize>, b0: Option<usize>, b1: Option<usize>| {
            let start = a0.unwrap_or(0).max(b0.unwrap_or(0));
            let end = a1.unwrap_or(usize::MAX).min(b1.unwrap_or(usize::MAX));
            start < end
        };
        self.sheet_id == other.sheet_id
            && overlap(
                self.start_row_index,
                self.end_row_index,
                other.start_row_index,
                other.end_row_index,
            )
            && overlap(
                self.start_column_index,
                self.end_column_index,
                other.start_column_index,
                other.end_column_index,
            )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Dimension {
    Rows,
    Columns,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionRange {
    pub sheet_id: i64,
    pub dimension: Dimension,
    pub start_index: usize,
    pub end_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergeType {
    MergeAll,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateCells {
    pub range: GridRange,
    pub rows: Vec<RowData>,
    pub fields: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeCells {
    pub range: GridRange,
    pub merge_type: MergeType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmergeCells {
    pub range: GridRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatCell {
    pub range: GridRange,
    pub cell: CellData,
    pub fields: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateDimensionProperties {
    pub range: DimensionRange,
    pub properties: DimensionProperties,
    pub fields: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WriteOperation {
    UpdateCells(UpdateCells),
    MergeCells(MergeCells),
    UnmergeCells(UnmergeCells),
    RepeatCell(RepeatCell),
    UpdateDimensionProperties(UpdateDimensionProperties),
}

impl WriteOperation {
    /// Replace one cell entirely (`fields: "*"`).
    pub fn set_cell(sheet_id: i64, row: usize, col: usize, cell: CellData) -> Self {
        Self::set_cell_fields(sheet_id, row, col, cell, "*")
    }

    pub fn set_cell_fields(
        sheet_id: i64,
        row: usize,
        col: usize,
        cell: CellData,
        fields: &str,
    ) -> Self {
        WriteOperation::UpdateCells(UpdateCells {
            range: GridRange::cell(sheet_id, row, col),
            rows: vec![RowData::new(vec![cell])],
            fields: fields.to_string(),
        })
    }

    pub fn merge(range: GridRange) -> Self {
        WriteOperation::MergeCells(MergeCells {
            range,
            merge_type: MergeType::MergeAll,
        })
    }

    pub fn unmerge(range: GridRange) -> Self {
        WriteOperation::UnmergeCells(UnmergeCells { range })
    }

    /// Paint a background colour across `range`.
    pub fn fill(range: GridRange, color: crate::types::Color) -> Self {
        WriteOperation::RepeatCell(RepeatCell {
            range,
            cell: CellData {
                user_entered_format: Some(CellFormat::background(color)),
                ..Default::default()
            },
            fields: "userEnteredFormat.backgroundColor".to_string(),
        })
    }

    pub fn resize(
        sheet_id: i64,
        dimension: Dimension,
        span: std::ops::Range<usize>,
        pixel_size: u32,
    ) -> Self {
        WriteOperation::UpdateDimensionProperties(UpdateDimensionProperties {
            range: DimensionRange {
                sheet_id,
                dimension,
                start_index: span.start,
                end_index: span.end,
            },
            properties: DimensionProperties {
                pixel_size: Some(pixel_size),
            },
            fields: "pixelSize".to_string(),
        })
    }

    /// The single cell written by an `UpdateCells` operation, with its position.
    pub fn as_cell_update(&self) -> Option<(usize, usize, &CellData)> {
        match self {
            WriteOperation::UpdateCells(u) => {
                let row = u.range.start_row_index?;
                let col = u.range.start_column_index?;
                let cell = u.rows.first()?.values.first()?;
                Some((row, col, cell))
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            WriteOperation::UpdateCells(_) => "updateCells",
            WriteOperation::MergeCells(_) => "mergeCells",
            WriteOperation::UnmergeCells(_) => "unmergeCells",
            WriteOperation::RepeatCell(_) => "repeatCell",
            WriteOperation::UpdateDimensionProperties(_) => "updateDimensionProperties",
        }
    }
}
