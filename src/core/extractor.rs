//! Grid extraction
//!
//! Reads the source tab, finds where the usable region ends, and fetches
//! rich cell data for exactly that region.

use tracing::{debug, info, warn};

use crate::config::MenuConfig;
use crate::error::{SyncError, SyncResult};
use crate::sheets::SheetsService;
use crate::types::GridData;

/// Bounded slice of the source sheet.
///
/// `grid.row_data[i]` and `values[i]` both describe source row
/// `skip_rows + i`.
#[derive(Debug, Clone, Default)]
pub struct SourceExtract {
    pub grid: GridData,
    pub values: Vec<Vec<String>>,
    pub skip_rows: usize,
    /// Exclusive upper bound, in source row indices.
    pub truncate_row: usize,
    /// Marker that ended the region, `None` when the default was used.
    pub marker: Option<String>,
}

impl SourceExtract {
    pub fn row_count(&self) -> usize {
        self.values.len()
    }
}

/// Row index and marker of the first marker hit at or after `skip_rows`.
pub fn find_truncation_row<'m>(
    values: &[Vec<String>],
    skip_rows: usize,
    markers: &'m [String],
) -> Option<(usize, &'m str)> {
    let markers: Vec<(String, &str)> = markers
        .iter()
        .filter(|m| !m.trim().is_empty())
        .map(|m| (m.to_uppercase(), m.as_str()))
        .collect();

    values
        .iter()
        .enumerate()
        .skip(skip_rows)
        .find_map(|(row_idx, row)| {
            row.iter().find_map(|cell| {
                let cell = cell.trim().to_uppercase();
                markers
                    .iter()
                    .find(|(upper, _)| cell.contains(upper.as_str()))
                    .map(|(_, original)| (row_idx, *original))
            })
        })
}

/// Truncation row for `config`, falling back to its default row count.
pub fn truncation_for(values: &[Vec<String>], config: &MenuConfig) -> (usize, Option<String>) {
    match find_truncation_row(values, config.skip_rows, &config.truncate_markers) {
        Some((row, marker)) => {
            info!(
                "Found truncation marker '{}' at row {}, truncating here",
                marker,
                row + 1
            );
            (row, Some(marker.to_string()))
        }
        None => {
            // The fallback ignores the real sheet length; surface it loudly.
            warn!(
                "No truncation marker found in {} rows, using default truncation at row {}",
                values.len(),
                config.default_truncate_row
            );
            for (i, row) in values.iter().take(10).enumerate() {
                debug!("Row {}: {:?}", i + 1, row.iter().take(3).collect::<Vec<_>>());
            }
            (config.default_truncate_row, None)
        }
    }
}

/// Fetch the bounded source region for `config`.
pub fn extract<S: SheetsService + ?Sized>(
    service: &S,
    config: &MenuConfig,
) -> SyncResult<SourceExtract> {
    let metadata = service.fetch_metadata(&config.source_sheet_id)?;
    if metadata.tab(&config.source_sheet_tab).is_none() {
        return Err(SyncError::MissingTab {
            spreadsheet: config.source_sheet_id.clone(),
            tab: config.source_sheet_tab.clone(),
        });
    }

    let values = service.fetch_values(&config.source_sheet_id, &config.source_sheet_tab)?;
    let (truncate_row, marker) = truncation_for(&values, config);

    let skip_rows = config.skip_rows;
    let start = skip_rows.min(truncate_row);
    let grid = if start < truncate_row {
        service.fetch_grid(
            &config.source_sheet_id,
            &config.source_sheet_tab,
            start..truncate_row,
        )?
    } else {
        GridData::default()
    };

    let bounded_end = truncate_row.min(values.len());
    let plain = if start < bounded_end {
        values[start..bounded_end].to_vec()
    } else {
        Vec::new()
    };

    info!(
        "Extracted {} rows (skipped {}, truncated at {})",
        plain.len(),
        skip_rows,
        truncate_row
    );

    Ok(SourceExtract {
        grid,
        values: plain,
        skip_rows,
        truncate_row,
        marker,
    })
}
