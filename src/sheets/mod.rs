//! Spreadsheet service seam
//!
//! Everything the sync needs from the remote side goes through
//! [`SheetsService`]. Two back ends exist: an HTTP client for the Sheets and
//! Drive APIs and an in-memory store used by tests.

pub mod google;
pub mod memory;

use std::ops::Range;

use thiserror::Error;

use crate::core::operations::WriteOperation;
use crate::types::{GridData, SpreadsheetMetadata};

pub use google::GoogleSheets;
pub use memory::InMemorySheets;

pub type RemoteResult<T> = Result<T, RemoteError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Quota exhaustion; worth one retry after a cooldown.
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("{0}")]
    Permanent(String),
}

impl RemoteError {
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::RateLimited(_))
    }
}

/// Remote spreadsheet operations.
///
/// Grid fetches are split in two: a cheap formatted-value read of the whole
/// `A:Z` range, used to find the truncation row, then a rich read of just the
/// rows that survive.
pub trait SheetsService {
    /// Formatted values of `tab!A:Z`, one `Vec` per row.
    fn fetch_values(&self, spreadsheet_id: &str, tab: &str) -> RemoteResult<Vec<Vec<String>>>;

    /// Rich cell data for the half-open 0-based row range of `tab`, columns A:Z.
    fn fetch_grid(&self, spreadsheet_id: &str, tab: &str, rows: Range<usize>)
        -> RemoteResult<GridData>;

    fn fetch_metadata(&self, spreadsheet_id: &str) -> RemoteResult<SpreadsheetMetadata>;

    fn search_by_title(&self, title: &str) -> RemoteResult<Option<String>>;

    /// Create a spreadsheet, optionally with named tabs, returning its id.
    fn create_resource(&self, title: &str, tabs: &[String]) -> RemoteResult<String>;

    /// Clear values in an A1 range such as `'THCA'!A:ZZ`.
    fn clear_range(&self, spreadsheet_id: &str, range: &str) -> RemoteResult<()>;

    /// Apply operations atomically, in order.
    fn apply_batch(&self, spreadsheet_id: &str, operations: &[WriteOperation]) -> RemoteResult<()>;

    fn update_title(&self, spreadsheet_id: &str, title: &str) -> RemoteResult<()>;
}

/// Quote a tab title for use in an A1 range.
pub fn quote_tab(tab: &str) -> String {
    format!("'{}'", tab.replace('\'', "''"))
}
