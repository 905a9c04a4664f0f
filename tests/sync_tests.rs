//! Orchestrator tests: target resolution, state recording, failure isolation

use menusync::config::{builtin_branding, builtin_consolidated, builtin_menus, MenuRegistry};
use menusync::sheets::{InMemorySheets, RemoteError, SheetsService};
use menusync::sync::{StateStore, SyncOrchestrator, SyncPhase, CONSOLIDATED_KEY};
use menusync::types::{CellData, Color, ExtendedValue, RowData};
use menusync::writer::BatchWriter;
use std::time::Duration;
use tempfile::TempDir;

const GREEN: Color = Color::rgb(0.4, 0.7, 0.3);

fn registry() -> MenuRegistry {
    let mut menus = builtin_menus();
    for menu in &mut menus {
        menu.source_sheet_id = format!("src-{}", menu.id);
    }
    MenuRegistry::new(menus, builtin_consolidated(), builtin_branding()).unwrap()
}

fn row(cells: &[CellData]) -> RowData {
    RowData::new(cells.to_vec())
}

/// THCA-shaped source: header, one product at 100 in column H, marker.
fn seed_thca(sheets: &InMemorySheets) {
    let header = {
        let mut c = vec![CellData::text(""); 8];
        c[0] = CellData::text("Indoor Exotics").with_background(GREEN);
        c[1] = CellData::text("Indoor Exotics");
        c
    };
    let product = {
        let mut c = vec![CellData::text(""); 8];
        c[1] = CellData::text("Gelato");
        c[7] = CellData::number(100.0);
        c
    };
    sheets.insert_spreadsheet("src-thca", "THCA vendor");
    sheets.put_tab(
        "src-thca",
        "THCA",
        vec![
            row(&header),
            row(&product),
            row(&[CellData::text("FOR COA and MEDIA REFERENCE ONLY")]),
        ],
    )
    .unwrap();
}

/// Titan-shaped source: 5 junk rows, an Indoor section, an Outdoor section.
fn seed_titan(sheets: &InMemorySheets) {
    let mut rows: Vec<RowData> = (0..5).map(|i| row(&[CellData::text(format!("junk {}", i))])).collect();
    rows.push(row(&[
        CellData::text("Product"),
        CellData::text("Type"),
        CellData::text("Price"),
    ]));
    rows.push(row(&[
        CellData::text("Indoor").with_background(GREEN),
        CellData::text("Indoor"),
        CellData::text(""),
    ]));
    rows.push(row(&[CellData::text("Runtz"), CellData::text("Indoor"), CellData::number(200.0)]));
    rows.push(row(&[
        CellData::text("Outdoor").with_background(GREEN),
        CellData::text("Outdoor"),
        CellData::text(""),
    ]));
    rows.push(row(&[CellData::text("Dirt"), CellData::text("Outdoor"), CellData::number(50.0)]));
    rows.push(row(&[CellData::text("POLICIES")]));
    sheets.insert_spreadsheet("src-titan", "Titan vendor");
    sheets.put_tab("src-titan", "Sheet3", rows).unwrap();
}

fn orchestrator<'a>(
    sheets: &'a InMemorySheets,
    registry: &'a MenuRegistry,
    dir: &TempDir,
) -> SyncOrchestrator<'a, InMemorySheets> {
    SyncOrchestrator::new(sheets, registry, StateStore::new(dir.path()))
        .with_writer(BatchWriter::with_timing(Duration::ZERO, Duration::ZERO))
}

fn number_at(sheets: &InMemorySheets, id: &str, tab: &str, r: usize, c: usize) -> Option<f64> {
    let tab = sheets.tab(id, tab)?;
    match tab.cell(r, c)?.user_entered_value {
        Some(ExtendedValue::NumberValue(n)) => Some(n),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// TARGET RESOLUTION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_first_sync_creates_target_and_writes_menu() {
    let registry = registry();
    let sheets = InMemorySheets::new();
    seed_thca(&sheets);
    let dir = TempDir::new().unwrap();
    let sync = orchestrator(&sheets, &registry, &dir);

    let report = sync.run_pass("thca").unwrap();
    let target = &report.target;
    let meta = sheets.fetch_metadata(&target.spreadsheet_id).unwrap();
    assert_eq!(meta.title, "Exotic Flowers Only BULK THCa Menu");

    // Header block is 8 rows; the product is output row 1; price column H is E.
    assert_eq!(
        number_at(&sheets, &target.spreadsheet_id, &target.tab_title, 9, 4),
        Some(175.0)
    );
    assert_eq!(
        sheets.cleared_ranges(),
        vec![(target.spreadsheet_id.clone(), "'Sheet1'!A:ZZ".to_string())]
    );
}

#[test]
fn test_existing_target_is_found_by_title() {
    let registry = registry();
    let sheets = InMemorySheets::new();
    seed_thca(&sheets);
    let existing = sheets.create_spreadsheet("Exotic Flowers Only BULK THCa Menu", &["Menu"]);
    let dir = TempDir::new().unwrap();
    let sync = orchestrator(&sheets, &registry, &dir);

    let report = sync.run_pass("thca").unwrap();
    assert_eq!(report.target.spreadsheet_id, existing);
    assert_eq!(report.target.tab_title, "Menu");
    assert_eq!(sync.state().target("thca").unwrap(), Some(existing));
}

#[test]
fn test_renamed_cached_target_is_replaced() {
    let registry = registry();
    let sheets = InMemorySheets::new();
    seed_thca(&sheets);
    let dir = TempDir::new().unwrap();
    let sync = orchestrator(&sheets, &registry, &dir);

    let first = sync.run_pass("thca").unwrap().target.spreadsheet_id;
    sheets.rename(&first, "Somebody else's sheet");
    let second = sync.run_pass("thca").unwrap().target.spreadsheet_id;

    assert_ne!(first, second);
    assert_eq!(sync.state().target("thca").unwrap(), Some(second));
}

#[test]
fn test_deleted_cached_target_is_recreated() {
    let registry = registry();
    let sheets = InMemorySheets::new();
    seed_thca(&sheets);
    let dir = TempDir::new().unwrap();
    let sync = orchestrator(&sheets, &registry, &dir);

    let first = sync.run_pass("thca").unwrap().target.spreadsheet_id;
    sheets.remove(&first);
    assert!(sync.sync_menu("thca"));
    assert_ne!(sync.state().target("thca").unwrap(), Some(first));
}

// ═══════════════════════════════════════════════════════════════════════════
// FAILURES
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_failed_pass_keeps_previous_record() {
    let registry = registry();
    let sheets = InMemorySheets::new();
    seed_thca(&sheets);
    let dir = TempDir::new().unwrap();
    let sync = orchestrator(&sheets, &registry, &dir);

    assert!(sync.sync_menu("thca"));
    let recorded = sync.last_sync("thca").unwrap();
    assert!(recorded.is_some());

    sheets.fail_next_batch(RemoteError::Permanent("Invalid requests[0]".to_string()));
    let err = sync.run_pass("thca").unwrap_err();
    assert_eq!(err.phase, SyncPhase::Writing);
    assert_eq!(sync.last_sync("thca").unwrap(), recorded);
}

#[test]
fn test_rate_limit_is_retried_once() {
    let registry = registry();
    let sheets = InMemorySheets::new();
    seed_thca(&sheets);
    let dir = TempDir::new().unwrap();
    let sync = orchestrator(&sheets, &registry, &dir);

    sheets.fail_next_batch(RemoteError::RateLimited("429".to_string()));
    let report = sync.run_pass("thca").unwrap();
    assert_eq!(report.summary.retries, 1);

    sheets.fail_batch_at(0, RemoteError::RateLimited("429".to_string()));
    sheets.fail_batch_at(1, RemoteError::RateLimited("429".to_string()));
    assert!(!sync.sync_menu("thca"));
}

#[test]
fn test_missing_source_fails_in_extracting() {
    let registry = registry();
    let sheets = InMemorySheets::new();
    let dir = TempDir::new().unwrap();
    let sync = orchestrator(&sheets, &registry, &dir);

    let err = sync.run_pass("titan").unwrap_err();
    assert_eq!(err.phase, SyncPhase::Extracting);
    assert_eq!(sheets.spreadsheet_count(), 0);
}

#[test]
fn test_sync_all_is_independent_per_menu() {
    let registry = registry();
    let sheets = InMemorySheets::new();
    seed_titan(&sheets);
    let dir = TempDir::new().unwrap();
    let sync = orchestrator(&sheets, &registry, &dir);

    let results = sync.sync_all();
    assert_eq!(
        results,
        vec![("thca".to_string(), false), ("titan".to_string(), true)]
    );
    assert_eq!(sync.last_sync("thca").unwrap(), None);
    assert!(sync.last_sync("titan").unwrap().is_some());
}

#[test]
fn test_preview_each_continues_past_failures() {
    let registry = registry();
    let sheets = InMemorySheets::new();
    seed_titan(&sheets);
    let dir = TempDir::new().unwrap();
    let sync = orchestrator(&sheets, &registry, &dir);

    let previews = sync.preview_each(&registry.ids());
    assert_eq!(previews.len(), 2);
    assert_eq!(previews[0].0, "thca");
    assert!(previews[0].1.is_err());
    assert_eq!(previews[1].0, "titan");
    assert_eq!(previews[1].1.as_ref().unwrap().stats.rows_emitted, 2);
    assert_eq!(sheets.spreadsheet_count(), 1);
    assert!(sheets.batch_sizes().is_empty());
    assert_eq!(sync.last_sync("titan").unwrap(), None);
}

#[test]
fn test_titan_filter_and_preserved_header() {
    let registry = registry();
    let sheets = InMemorySheets::new();
    seed_titan(&sheets);
    let dir = TempDir::new().unwrap();
    let sync = orchestrator(&sheets, &registry, &dir);

    let report = sync.run_pass("titan").unwrap();
    assert_eq!(report.stats.rows_emitted, 2);
    let target = report.target;
    let tab = sheets.tab(&target.spreadsheet_id, &target.tab_title).unwrap();
    assert_eq!(tab.cell(8, 0).unwrap().plain_text(), "Product");
    assert_eq!(tab.cell(9, 0).unwrap().plain_text(), "Runtz");
    assert_eq!(
        number_at(&sheets, &target.spreadsheet_id, &target.tab_title, 9, 2),
        Some(275.0)
    );
    assert!(tab.cell(10, 0).map_or(true, |c| c.plain_text().is_empty()));
}

#[test]
fn test_rerun_is_idempotent_on_merges() {
    let registry = registry();
    let sheets = InMemorySheets::new();
    seed_titan(&sheets);
    let dir = TempDir::new().unwrap();
    let sync = orchestrator(&sheets, &registry, &dir);

    let first = sync.run_pass("titan").unwrap().target;
    let second = sync.run_pass("titan").unwrap().target;
    assert_eq!(first, second);
    let tab = sheets.tab(&second.spreadsheet_id, &second.tab_title).unwrap();
    assert_eq!(tab.merges.len(), 4);
}

// ═══════════════════════════════════════════════════════════════════════════
// CONSOLIDATED
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_consolidated_sheet_has_tab_per_menu() {
    let registry = registry();
    let sheets = InMemorySheets::new();
    seed_thca(&sheets);
    seed_titan(&sheets);
    let dir = TempDir::new().unwrap();
    let sync = orchestrator(&sheets, &registry, &dir);

    assert!(sync.sync_consolidated());
    let id = sync.state().consolidated().unwrap().unwrap();
    let sheet = sheets.spreadsheet(&id).unwrap();
    assert_eq!(sheet.title, registry.consolidated().current_title());
    assert!(sheet.title.starts_with("Exotic Flowers Only Menu (Updated "));
    assert_eq!(number_at(&sheets, &id, "THCA", 9, 4), Some(175.0));
    assert_eq!(number_at(&sheets, &id, "Titan Botanicals", 9, 2), Some(275.0));
    assert!(sync.last_sync(CONSOLIDATED_KEY).unwrap().is_some());

    // Second pass reuses the cached sheet.
    let count = sheets.spreadsheet_count();
    assert!(sync.sync_consolidated());
    assert_eq!(sheets.spreadsheet_count(), count);
}

#[test]
fn test_consolidated_tab_failure_does_not_stop_others() {
    let registry = registry();
    let sheets = InMemorySheets::new();
    seed_titan(&sheets);
    let dir = TempDir::new().unwrap();
    let sync = orchestrator(&sheets, &registry, &dir);

    assert!(!sync.sync_consolidated());
    let id = sync.state().consolidated().unwrap().unwrap();
    assert_eq!(number_at(&sheets, &id, "Titan Botanicals", 9, 2), Some(275.0));
    assert_eq!(sync.last_sync(CONSOLIDATED_KEY).unwrap(), None);
}

#[test]
fn test_consolidated_missing_tab_is_reported() {
    let registry = registry();
    let sheets = InMemorySheets::new();
    seed_thca(&sheets);
    seed_titan(&sheets);
    let title = registry.consolidated().current_title();
    let id = sheets.create_spreadsheet(&title, &["THCA"]);
    let dir = TempDir::new().unwrap();
    let sync = orchestrator(&sheets, &registry, &dir);

    assert!(!sync.sync_consolidated());
    assert_eq!(sync.state().consolidated().unwrap(), Some(id.clone()));
    assert_eq!(number_at(&sheets, &id, "THCA", 9, 4), Some(175.0));
}
