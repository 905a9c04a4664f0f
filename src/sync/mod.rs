//! Sync orchestration
//!
//! One pass per menu moves through
//! `Idle → Extracting → ResolvingTarget → Writing → Recording → Idle`.
//! Any error ends the pass in `Failed`; the failure is logged with the phase
//! it happened in and reported to the caller as `false`. A failed pass never
//! touches the last-sync record.

pub mod state;

use std::fmt;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::config::{MenuConfig, MenuRegistry};
use crate::core::{compose, extract, Composition, TransformStats};
use crate::error::{SyncError, SyncResult};
use crate::sheets::{quote_tab, SheetsService};
use crate::writer::{BatchWriter, WriteSummary};

pub use state::{StateStore, SyncState};

/// State key under which consolidated passes are recorded.
pub const CONSOLIDATED_KEY: &str = "consolidated";

/// Columns cleared on the target tab before each write.
const CLEAR_COLUMNS: &str = "A:ZZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Extracting,
    ResolvingTarget,
    Writing,
    Recording,
    Failed,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Extracting => "extracting",
            SyncPhase::ResolvingTarget => "resolving target",
            SyncPhase::Writing => "writing",
            SyncPhase::Recording => "recording",
            SyncPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A failed pass and the phase it failed in.
#[derive(Debug, Error)]
#[error("{phase} failed: {source}")]
pub struct PassError {
    pub phase: SyncPhase,
    #[source]
    pub source: SyncError,
}

fn during<E: Into<SyncError>>(phase: SyncPhase) -> impl FnOnce(E) -> PassError {
    move |e| PassError {
        phase,
        source: e.into(),
    }
}

/// Where a menu's output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSheetHandle {
    pub spreadsheet_id: String,
    pub sheet_id: i64,
    pub tab_title: String,
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    pub menu: String,
    pub target: TargetSheetHandle,
    pub stats: TransformStats,
    pub summary: WriteSummary,
}

pub struct SyncOrchestrator<'a, S: SheetsService + ?Sized> {
    service: &'a S,
    registry: &'a MenuRegistry,
    state: StateStore,
    writer: BatchWriter,
}

impl<'a, S: SheetsService + ?Sized> SyncOrchestrator<'a, S> {
    pub fn new(service: &'a S, registry: &'a MenuRegistry, state: StateStore) -> Self {
        Self {
            service,
            registry,
            state,
            writer: BatchWriter::default(),
        }
    }

    pub fn with_writer(mut self, writer: BatchWriter) -> Self {
        self.writer = writer;
        self
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn registry(&self) -> &MenuRegistry {
        self.registry
    }

    //==========================================================================
    // Single menu
    //==========================================================================

    /// Run one full pass for `menu`.
    pub fn run_pass(&self, menu: &str) -> Result<SyncReport, PassError> {
        let config = self.registry.get(menu).map_err(during(SyncPhase::Idle))?;
        let span = info_span!("sync", menu = %config.id, run = %Uuid::new_v4());
        let _guard = span.enter();

        info!("Extracting from {} / {}", config.source_sheet_id, config.source_sheet_tab);
        let source = extract(self.service, config).map_err(during(SyncPhase::Extracting))?;

        let target = self
            .resolve_target(config)
            .map_err(during(SyncPhase::ResolvingTarget))?;
        info!("Writing to {} ('{}')", target.spreadsheet_id, target.tab_title);

        let range = format!("{}!{}", quote_tab(&target.tab_title), CLEAR_COLUMNS);
        self.service
            .clear_range(&target.spreadsheet_id, &range)
            .map_err(during(SyncPhase::Writing))?;
        let composition = compose(config, self.registry.branding(), &source, target.sheet_id);
        let summary = self
            .writer
            .write(self.service, &target.spreadsheet_id, &composition.operations)
            .map_err(during(SyncPhase::Writing))?;

        self.state
            .record_sync(&config.id, Utc::now())
            .map_err(during(SyncPhase::Recording))?;
        info!("✓ {} synced", config.name);

        Ok(SyncReport {
            menu: config.id.clone(),
            target,
            stats: composition.stats,
            summary,
        })
    }

    /// Run a pass and report success; failures are logged, never raised.
    pub fn sync_menu(&self, menu: &str) -> bool {
        match self.run_pass(menu) {
            Ok(_) => true,
            Err(e) => {
                error!(menu = %menu, phase = %e.phase, "Sync failed: {}", e.source);
                false
            }
        }
    }

    /// Sync every menu in order. One failure does not stop the rest.
    pub fn sync_all(&self) -> Vec<(String, bool)> {
        self.registry
            .ids()
            .into_iter()
            .map(|id| {
                let ok = self.sync_menu(&id);
                (id, ok)
            })
            .collect()
    }

    /// Extract and compose without writing anything.
    ///
    /// Operations target sheet id 0 since no target is resolved.
    pub fn preview(&self, menu: &str) -> SyncResult<Composition> {
        let config = self.registry.get(menu)?;
        let source = extract(self.service, config)?;
        Ok(compose(config, self.registry.branding(), &source, 0))
    }

    /// Preview each menu in turn. One failure does not stop the rest.
    pub fn preview_each(&self, menus: &[String]) -> Vec<(String, SyncResult<Composition>)> {
        menus
            .iter()
            .map(|id| {
                let preview = self.preview(id);
                if let Err(e) = &preview {
                    error!(menu = %id, "Preview failed: {}", e);
                }
                (id.clone(), preview)
            })
            .collect()
    }

    pub fn last_sync(&self, menu: &str) -> SyncResult<Option<chrono::DateTime<Utc>>> {
        self.state.last_sync(menu)
    }

    /// Cached id (if its title still matches), else search by name, else create.
    pub fn resolve_target(&self, config: &MenuConfig) -> SyncResult<TargetSheetHandle> {
        let title = &config.target_sheet_name;

        let cached = self.state.target(&config.id)?.and_then(|id| {
            match self.service.fetch_metadata(&id) {
                Ok(meta) if &meta.title == title => Some((id, meta)),
                Ok(meta) => {
                    warn!("Cached target {} is now titled '{}', searching again", id, meta.title);
                    None
                }
                Err(e) => {
                    warn!("Cached target {} is unavailable ({}), searching again", id, e);
                    None
                }
            }
        });

        let (id, metadata) = match cached {
            Some(found) => found,
            None => {
                let id = match self.service.search_by_title(title)? {
                    Some(id) => {
                        info!("Found existing target '{}'", title);
                        id
                    }
                    None => {
                        info!("Creating target '{}'", title);
                        self.service.create_resource(title, &[])?
                    }
                };
                let metadata = self.service.fetch_metadata(&id)?;
                self.state.set_target(&config.id, &id)?;
                (id, metadata)
            }
        };

        let tab = metadata.sheets.into_iter().next().ok_or_else(|| SyncError::MissingTab {
            spreadsheet: id.clone(),
            tab: "<first sheet>".to_string(),
        })?;
        Ok(TargetSheetHandle {
            spreadsheet_id: id,
            sheet_id: tab.sheet_id,
            tab_title: tab.title,
        })
    }

    //==========================================================================
    // Consolidated sheet
    //==========================================================================

    /// Write every configured menu into its own tab of the consolidated
    /// spreadsheet, then retitle it with today's date.
    pub fn sync_consolidated(&self) -> bool {
        let span = info_span!("sync", menu = CONSOLIDATED_KEY, run = %Uuid::new_v4());
        let _guard = span.enter();

        let spreadsheet_id = match self.resolve_consolidated() {
            Ok(id) => id,
            Err(e) => {
                error!(phase = %SyncPhase::ResolvingTarget, "Consolidated sync failed: {}", e);
                return false;
            }
        };

        let mut all_ok = true;
        for tab in &self.registry.consolidated().tabs {
            if let Err(e) = self.write_consolidated_tab(&spreadsheet_id, &tab.menu, &tab.title) {
                error!(
                    menu = %tab.menu,
                    phase = %e.phase,
                    "Consolidated tab '{}' failed: {}",
                    tab.title,
                    e.source
                );
                all_ok = false;
            }
        }

        let title = self.registry.consolidated().current_title();
        if let Err(e) = self.service.update_title(&spreadsheet_id, &title) {
            error!("Failed to retitle consolidated sheet: {}", e);
            return false;
        }
        if all_ok {
            if let Err(e) = self.state.record_sync(CONSOLIDATED_KEY, Utc::now()) {
                error!(phase = %SyncPhase::Recording, "Consolidated sync failed: {}", e);
                return false;
            }
            info!("✓ Consolidated sheet '{}' synced", title);
        }
        all_ok
    }

    fn resolve_consolidated(&self) -> SyncResult<String> {
        if let Some(id) = self.state.consolidated()? {
            match self.service.fetch_metadata(&id) {
                Ok(_) => return Ok(id),
                Err(e) => warn!("Cached consolidated sheet {} is unavailable ({})", id, e),
            }
        }

        let config = self.registry.consolidated();
        let title = config.current_title();
        let id = match self.service.search_by_title(&title)? {
            Some(id) => id,
            None => {
                info!("Creating consolidated sheet '{}'", title);
                let tabs: Vec<String> = config.tabs.iter().map(|t| t.title.clone()).collect();
                self.service.create_resource(&title, &tabs)?
            }
        };
        self.state.set_consolidated(&id)?;
        Ok(id)
    }

    fn write_consolidated_tab(
        &self,
        spreadsheet_id: &str,
        menu: &str,
        tab_title: &str,
    ) -> Result<WriteSummary, PassError> {
        let config = self.registry.get(menu).map_err(during(SyncPhase::Idle))?;
        let source = extract(self.service, config).map_err(during(SyncPhase::Extracting))?;

        let metadata = self
            .service
            .fetch_metadata(spreadsheet_id)
            .map_err(during(SyncPhase::ResolvingTarget))?;
        let tab = metadata.tab(tab_title).ok_or_else(|| PassError {
            phase: SyncPhase::ResolvingTarget,
            source: SyncError::MissingTab {
                spreadsheet: spreadsheet_id.to_string(),
                tab: tab_title.to_string(),
            },
        })?;

        let range = format!("{}!{}", quote_tab(tab_title), CLEAR_COLUMNS);
        self.service
            .clear_range(spreadsheet_id, &range)
            .map_err(during(SyncPhase::Writing))?;
        let composition = compose(config, self.registry.branding(), &source, tab.sheet_id);
        self.writer
            .write(self.service, spreadsheet_id, &composition.operations)
            .map_err(during(SyncPhase::Writing))
    }
}
