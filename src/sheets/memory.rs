//! In-memory spreadsheet store
//!
//! Behaves like the remote service closely enough for the pipeline: batches
//! are applied atomically, merges and dimension sizes are tracked, and
//! failures can be scripted per `apply_batch` call.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::{Mutex, MutexGuard};

use super::{RemoteError, RemoteResult, SheetsService};
use crate::core::operations::{Dimension, GridRange, WriteOperation};
use crate::types::{
    CellData, DimensionProperties, GridData, RowData, SheetProperties, SpreadsheetMetadata,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryTab {
    pub sheet_id: i64,
    pub title: String,
    pub rows: Vec<RowData>,
    pub column_metadata: Vec<DimensionProperties>,
    pub merges: Vec<GridRange>,
    pub column_widths: BTreeMap<usize, u32>,
    pub row_heights: BTreeMap<usize, u32>,
}

impl MemoryTab {
    pub fn cell(&self, row: usize, col: usize) -> Option<&CellData> {
        self.rows.get(row).and_then(|r| r.values.get(col))
    }

    fn cell_mut(&mut self, row: usize, col: usize) -> &mut CellData {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, RowData::default);
        }
        let values = &mut self.rows[row].values;
        if values.len() <= col {
            values.resize_with(col + 1, CellData::default);
        }
        &mut values[col]
    }

    fn width(&self) -> usize {
        self.rows.iter().map(|r| r.values.len()).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySpreadsheet {
    pub id: String,
    pub title: String,
    pub tabs: Vec<MemoryTab>,
}

impl MemorySpreadsheet {
    pub fn tab(&self, title: &str) -> Option<&MemoryTab> {
        self.tabs.iter().find(|t| t.title == title)
    }

    fn tab_by_id_mut(&mut self, sheet_id: i64) -> RemoteResult<&mut MemoryTab> {
        self.tabs
            .iter_mut()
            .find(|t| t.sheet_id == sheet_id)
            .ok_or_else(|| RemoteError::Permanent(format!("No grid with id: {}", sheet_id)))
    }
}

#[derive(Debug, Default)]
struct Inner {
    spreadsheets: BTreeMap<String, MemorySpreadsheet>,
    next_id: u64,
    batch_calls: usize,
    scripted: BTreeMap<usize, RemoteError>,
    batch_sizes: Vec<usize>,
    cleared: Vec<(String, String)>,
}

impl Inner {
    fn get(&self, id: &str) -> RemoteResult<&MemorySpreadsheet> {
        self.spreadsheets
            .get(id)
            .ok_or_else(|| RemoteError::Permanent(format!("Requested entity was not found: {}", id)))
    }

    fn get_mut(&mut self, id: &str) -> RemoteResult<&mut MemorySpreadsheet> {
        self.spreadsheets
            .get_mut(id)
            .ok_or_else(|| RemoteError::Permanent(format!("Requested entity was not found: {}", id)))
    }

    fn create(&mut self, title: &str, tabs: &[String]) -> String {
        self.next_id += 1;
        let id = format!("mem-{}", self.next_id);
        let titles: Vec<String> = if tabs.is_empty() {
            vec!["Sheet1".to_string()]
        } else {
            tabs.to_vec()
        };
        let tabs = titles
            .into_iter()
            .enumerate()
            .map(|(i, title)| MemoryTab {
                sheet_id: if i == 0 { 0 } else { 1000 + i as i64 },
                title,
                ..Default::default()
            })
            .collect();
        self.spreadsheets.insert(
            id.clone(),
            MemorySpreadsheet {
                id: id.clone(),
                title: title.to_string(),
                tabs,
            },
        );
        id
    }
}

#[derive(Debug, Default)]
pub struct InMemorySheets {
    inner: Mutex<Inner>,
}

impl InMemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicked test thread must not wedge the store.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    //--------------------------------------------------------------------------
    // Test setup
    //--------------------------------------------------------------------------

    pub fn create_spreadsheet(&self, title: &str, tabs: &[&str]) -> String {
        let tabs: Vec<String> = tabs.iter().map(|t| t.to_string()).collect();
        self.lock().create(title, &tabs)
    }

    /// Register a spreadsheet under a fixed id (e.g. a configured source id).
    pub fn insert_spreadsheet(&self, id: &str, title: &str) {
        self.lock().spreadsheets.insert(
            id.to_string(),
            MemorySpreadsheet {
                id: id.to_string(),
                title: title.to_string(),
                tabs: Vec::new(),
            },
        );
    }

    /// Add (or replace) a tab with rows; returns its sheet id.
    pub fn put_tab(&self, id: &str, title: &str, rows: Vec<RowData>) -> RemoteResult<i64> {
        let mut inner = self.lock();
        let sheet = inner
            .spreadsheets
            .get_mut(id)
            .ok_or_else(|| RemoteError::Permanent(format!("Requested entity was not found: {}", id)))?;
        if let Some(tab) = sheet.tabs.iter_mut().find(|t| t.title == title) {
            tab.rows = rows;
            return Ok(tab.sheet_id);
        }
        let sheet_id = if sheet.tabs.is_empty() {
            0
        } else {
            1000 + sheet.tabs.len() as i64
        };
        sheet.tabs.push(MemoryTab {
            sheet_id,
            title: title.to_string(),
            rows,
            ..Default::default()
        });
        Ok(sheet_id)
    }

    pub fn set_column_metadata(&self, id: &str, tab: &str, widths: &[Option<u32>]) {
        let mut inner = self.lock();
        if let Some(t) = inner
            .spreadsheets
            .get_mut(id)
            .and_then(|s| s.tabs.iter_mut().find(|t| t.title == tab))
        {
            t.column_metadata = widths
                .iter()
                .map(|w| DimensionProperties { pixel_size: *w })
                .collect();
        }
    }

    pub fn rename(&self, id: &str, title: &str) {
        if let Some(s) = self.lock().spreadsheets.get_mut(id) {
            s.title = title.to_string();
        }
    }

    pub fn remove(&self, id: &str) {
        self.lock().spreadsheets.remove(id);
    }

    /// Fail the next unscripted `apply_batch` call with `error`.
    pub fn fail_next_batch(&self, error: RemoteError) {
        let mut inner = self.lock();
        let mut at = inner.batch_calls;
        while inner.scripted.contains_key(&at) {
            at += 1;
        }
        inner.scripted.insert(at, error);
    }

    /// Fail the `n`th `apply_batch` call from now (0 = next).
    pub fn fail_batch_at(&self, n: usize, error: RemoteError) {
        let mut inner = self.lock();
        let at = inner.batch_calls + n;
        inner.scripted.insert(at, error);
    }

    //--------------------------------------------------------------------------
    // Inspection
    //--------------------------------------------------------------------------

    pub fn spreadsheet(&self, id: &str) -> Option<MemorySpreadsheet> {
        self.lock().spreadsheets.get(id).cloned()
    }

    pub fn tab(&self, id: &str, title: &str) -> Option<MemoryTab> {
        self.spreadsheet(id).and_then(|s| s.tab(title).cloned())
    }

    pub fn spreadsheet_count(&self) -> usize {
        self.lock().spreadsheets.len()
    }

    /// Sizes of successfully applied batches, in order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.lock().batch_sizes.clone()
    }

    pub fn cleared_ranges(&self) -> Vec<(String, String)> {
        self.lock().cleared.clone()
    }
}

fn bounded(start: Option<usize>, end: Option<usize>, extent: usize) -> Range<usize> {
    start.unwrap_or(0)..end.unwrap_or(extent)
}

fn apply_one(sheet: &mut MemorySpreadsheet, op: &WriteOperation) -> RemoteResult<()> {
    match op {
        WriteOperation::UpdateCells(u) => {
            let tab = sheet.tab_by_id_mut(u.range.sheet_id)?;
            let row0 = u.range.start_row_index.unwrap_or(0);
            let col0 = u.range.start_column_index.unwrap_or(0);
            for (r, row) in u.rows.iter().enumerate() {
                for (c, cell) in row.values.iter().enumerate() {
                    let target = tab.cell_mut(row0 + r, col0 + c);
                    if u.fields == "*" {
                        *target = cell.clone();
                        continue;
                    }
                    if u.fields.contains("userEnteredValue") {
                        target.user_entered_value = cell.user_entered_value.clone();
                    }
                    if u.fields.contains("userEnteredFormat") {
                        target.user_entered_format = cell.user_entered_format.clone();
                    }
                }
            }
        }
        WriteOperation::RepeatCell(rc) => {
            let tab = sheet.tab_by_id_mut(rc.range.sheet_id)?;
            let rows = bounded(rc.range.start_row_index, rc.range.end_row_index, tab.rows.len());
            let cols = bounded(
                rc.range.start_column_index,
                rc.range.end_column_index,
                tab.width(),
            );
            let color = rc
                .cell
                .user_entered_format
                .as_ref()
                .and_then(|f| f.background_color);
            for r in rows {
                for c in cols.clone() {
                    let target = tab.cell_mut(r, c);
                    let mut format = target.user_entered_format.take().unwrap_or_default();
                    format.background_color = color;
                    target.user_entered_format = Some(format);
                }
            }
        }
        WriteOperation::MergeCells(m) => {
            let tab = sheet.tab_by_id_mut(m.range.sheet_id)?;
            if tab.merges.iter().any(|r| r.intersects(&m.range)) {
                return Err(RemoteError::Permanent(
                    "You can't merge cells that are already merged".to_string(),
                ));
            }
            tab.merges.push(m.range);
        }
        WriteOperation::UnmergeCells(u) => {
            let tab = sheet.tab_by_id_mut(u.range.sheet_id)?;
            tab.merges.retain(|r| !r.intersects(&u.range));
        }
        WriteOperation::UpdateDimensionProperties(d) => {
            let tab = sheet.tab_by_id_mut(d.range.sheet_id)?;
            let Some(px) = d.properties.pixel_size else {
                return Ok(());
            };
            let sizes = match d.range.dimension {
                Dimension::Columns => &mut tab.column_widths,
                Dimension::Rows => &mut tab.row_heights,
            };
            for i in d.range.start_index..d.range.end_index {
                sizes.insert(i, px);
            }
        }
    }
    Ok(())
}

/// Tab title from an A1 range (`'My Tab'!A:ZZ`), `None` for unqualified ranges.
fn range_tab(range: &str) -> Option<String> {
    let (tab, _) = range.rsplit_once('!')?;
    let tab = tab
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .map(|t| t.replace("''", "'"))
        .unwrap_or_else(|| tab.to_string());
    Some(tab)
}

impl SheetsService for InMemorySheets {
    fn fetch_values(&self, spreadsheet_id: &str, tab: &str) -> RemoteResult<Vec<Vec<String>>> {
        let inner = self.lock();
        let sheet = inner.get(spreadsheet_id)?;
        let tab = sheet
            .tab(tab)
            .ok_or_else(|| RemoteError::Permanent(format!("Unable to parse range: {}", tab)))?;
        Ok(tab
            .rows
            .iter()
            .map(|r| r.values.iter().take(26).map(CellData::display_text).collect())
            .collect())
    }

    fn fetch_grid(
        &self,
        spreadsheet_id: &str,
        tab: &str,
        rows: Range<usize>,
    ) -> RemoteResult<GridData> {
        let inner = self.lock();
        let sheet = inner.get(spreadsheet_id)?;
        let tab = sheet
            .tab(tab)
            .ok_or_else(|| RemoteError::Permanent(format!("Unable to parse range: {}", tab)))?;
        let end = rows.end.min(tab.rows.len());
        let start = rows.start.min(end);
        Ok(GridData {
            row_data: tab.rows[start..end]
                .iter()
                .map(|r| RowData::new(r.values.iter().take(26).cloned().collect()))
                .collect(),
            column_metadata: tab.column_metadata.clone(),
        })
    }

    fn fetch_metadata(&self, spreadsheet_id: &str) -> RemoteResult<SpreadsheetMetadata> {
        let inner = self.lock();
        let sheet = inner.get(spreadsheet_id)?;
        Ok(SpreadsheetMetadata {
            title: sheet.title.clone(),
            sheets: sheet
                .tabs
                .iter()
                .map(|t| SheetProperties {
                    sheet_id: t.sheet_id,
                    title: t.title.clone(),
                })
                .collect(),
        })
    }

    fn search_by_title(&self, title: &str) -> RemoteResult<Option<String>> {
        Ok(self
            .lock()
            .spreadsheets
            .values()
            .find(|s| s.title == title)
            .map(|s| s.id.clone()))
    }

    fn create_resource(&self, title: &str, tabs: &[String]) -> RemoteResult<String> {
        Ok(self.lock().create(title, tabs))
    }

    fn clear_range(&self, spreadsheet_id: &str, range: &str) -> RemoteResult<()> {
        let mut inner = self.lock();
        let sheet = inner.get_mut(spreadsheet_id)?;
        let tab = match range_tab(range) {
            Some(title) => sheet
                .tabs
                .iter_mut()
                .find(|t| t.title == title)
                .ok_or_else(|| RemoteError::Permanent(format!("Unable to parse range: {}", range)))?,
            None => sheet
                .tabs
                .first_mut()
                .ok_or_else(|| RemoteError::Permanent("Spreadsheet has no sheets".to_string()))?,
        };
        for row in &mut tab.rows {
            for cell in &mut row.values {
                cell.user_entered_value = None;
                cell.formatted_value = None;
            }
        }
        inner
            .cleared
            .push((spreadsheet_id.to_string(), range.to_string()));
        Ok(())
    }

    fn apply_batch(&self, spreadsheet_id: &str, operations: &[WriteOperation]) -> RemoteResult<()> {
        let mut inner = self.lock();
        let call = inner.batch_calls;
        inner.batch_calls += 1;
        if let Some(err) = inner.scripted.remove(&call) {
            return Err(err);
        }

        let mut working = inner.get(spreadsheet_id)?.clone();
        for op in operations {
            apply_one(&mut working, op)?;
        }
        inner.spreadsheets.insert(spreadsheet_id.to_string(), working);
        inner.batch_sizes.push(operations.len());
        Ok(())
    }

    fn update_title(&self, spreadsheet_id: &str, title: &str) -> RemoteResult<()> {
        let mut inner = self.lock();
        inner.get_mut(spreadsheet_id)?.title = title.to_string();
        Ok(())
    }
}
