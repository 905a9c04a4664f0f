//! Menusync - republish vendor product sheets as branded menu sheets
//!
//! A vendor keeps its price list in a spreadsheet. This library reads that
//! sheet, keeps the priced rows (optionally only those under matching category
//! headers), applies per-category upcharges, turns media URLs into hyperlinks,
//! and writes the result below a branding block into a target spreadsheet.
//!
//! # Features
//!
//! - Truncation at a marker row, with a fixed fallback row
//! - Category tracking from coloured header rows
//! - Flat and threshold-based price adjustment
//! - Chunked batch writes with a single rate-limit retry
//! - Target resolution by cached id, title search, or creation
//! - Interval scheduler
//!
//! # Example
//!
//! ```no_run
//! use menusync::config::MenuRegistry;
//! use menusync::sheets::GoogleSheets;
//! use menusync::sync::{StateStore, SyncOrchestrator};
//!
//! let registry = MenuRegistry::builtin();
//! let sheets = GoogleSheets::new("ya29.access-token")?;
//! let orchestrator = SyncOrchestrator::new(&sheets, &registry, StateStore::new("logs"));
//!
//! for (menu, ok) in orchestrator.sync_all() {
//!     println!("{}: {}", menu, if ok { "ok" } else { "failed" });
//! }
//! # Ok::<(), menusync::sheets::RemoteError>(())
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod scheduler;
pub mod sheets;
pub mod sync;
pub mod types;
pub mod writer;

// Re-export commonly used types
pub use config::{MenuConfig, MenuRegistry};
pub use error::{SyncError, SyncResult};
pub use sheets::{RemoteError, SheetsService};
pub use sync::{SyncOrchestrator, SyncPhase};
