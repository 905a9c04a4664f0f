//! End-to-end pipeline tests against the in-memory back end

use menusync::config::{
    builtin_branding, builtin_menus, CategoryUpcharge, ConditionalPricing, Layout, MenuConfig,
};
use menusync::core::classifier::classify_rows;
use menusync::core::layout::{data_row, HEADER_ROWS};
use menusync::core::operations::WriteOperation;
use menusync::core::{compose, extract};
use menusync::sheets::InMemorySheets;
use menusync::types::{CellData, Color, ExtendedValue, RowData};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

const SOURCE: &str = "source-1";
const GREEN: Color = Color::rgb(0.4, 0.7, 0.3);

fn header(label: &str, width: usize) -> RowData {
    let mut cells = vec![CellData::text(""); width];
    cells[0] = CellData::text(label).with_background(GREEN);
    cells[1] = CellData::text(label).with_background(GREEN);
    RowData::new(cells)
}

fn product(name: &str, price_col: usize, price: f64, width: usize) -> RowData {
    let mut cells = vec![CellData::text(""); width];
    cells[0] = CellData::text(name);
    cells[1] = CellData::text(name);
    cells[price_col] = CellData::number(price);
    RowData::new(cells)
}

fn seed(rows: Vec<RowData>, config: &MenuConfig) -> InMemorySheets {
    let sheets = InMemorySheets::new();
    sheets.insert_spreadsheet(SOURCE, "Vendor sheet");
    sheets.put_tab(SOURCE, &config.source_sheet_tab, rows).unwrap();
    sheets
}

fn thca() -> MenuConfig {
    let mut config = builtin_menus().remove(0);
    config.source_sheet_id = SOURCE.to_string();
    config
}

fn filtered(keywords: &[&str]) -> MenuConfig {
    MenuConfig {
        id: "test".to_string(),
        name: "Test Menu".to_string(),
        source_sheet_id: SOURCE.to_string(),
        source_sheet_tab: "Sheet1".to_string(),
        target_sheet_name: "Test Target".to_string(),
        truncate_markers: vec!["POLICIES".to_string()],
        skip_rows: 0,
        default_truncate_row: 60,
        columns_to_remove: Default::default(),
        price_column: 2,
        category_column: 1,
        category_upcharge: vec![CategoryUpcharge::flat("indoor", 75.0)],
        conditional_pricing: BTreeMap::new(),
        category_name_mapping: Vec::new(),
        row_filter_keywords: keywords.iter().map(|k| k.to_string()).collect(),
        filter_enabled: true,
        preserve_header_row: false,
        layout: Layout::Left,
    }
}

fn cell_at(ops: &[WriteOperation], row: usize, col: usize) -> Option<&CellData> {
    ops.iter()
        .filter_map(WriteOperation::as_cell_update)
        .find(|(r, c, _)| *r == row && *c == col)
        .map(|(_, _, cell)| cell)
}

fn number(cell: Option<&CellData>) -> Option<f64> {
    match cell?.user_entered_value {
        Some(ExtendedValue::NumberValue(n)) => Some(n),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// EXTRACTION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_missing_marker_falls_back_to_default_row() {
    let mut config = thca();
    config.skip_rows = 2;
    let rows = (0..70)
        .map(|i| product(&format!("Strain {}", i), 7, 100.0, 8))
        .collect();
    let sheets = seed(rows, &config);

    let source = extract(&sheets, &config).unwrap();
    assert_eq!(source.marker, None);
    assert_eq!(source.truncate_row, 60);
    assert_eq!(source.values.len(), 58);
    assert_eq!(source.grid.row_data.len(), 58);
    assert_eq!(source.values[0][0], "Strain 2");
    assert_eq!(source.values[57][0], "Strain 59");
}

#[test]
fn test_marker_row_ends_extraction() {
    let config = thca();
    let mut rows: Vec<RowData> = (0..10).map(|i| product(&format!("S{}", i), 7, 90.0, 8)).collect();
    rows.push(RowData::new(vec![CellData::text("for coa and media reference only")]));
    rows.extend((0..5).map(|i| product(&format!("After {}", i), 7, 90.0, 8)));
    let sheets = seed(rows, &config);

    let source = extract(&sheets, &config).unwrap();
    assert_eq!(source.truncate_row, 10);
    assert_eq!(source.marker.as_deref(), Some("FOR COA and MEDIA REFERENCE ONLY"));
    assert_eq!(source.row_count(), 10);
}

#[test]
fn test_missing_source_tab_is_configuration_error() {
    let config = thca();
    let sheets = InMemorySheets::new();
    sheets.insert_spreadsheet(SOURCE, "Vendor sheet");
    sheets.put_tab(SOURCE, "Other", vec![]).unwrap();

    let err = extract(&sheets, &config).unwrap_err();
    assert!(err.is_configuration());
}

// ═══════════════════════════════════════════════════════════════════════════
// PRICING
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_indoor_exotics_upcharge_applied() {
    let config = thca();
    let rows = vec![
        header("Indoor Exotics", 8),
        product("Gelato", 7, 100.0, 8),
        RowData::new(vec![CellData::text("FOR COA")]),
    ];
    let sheets = seed(rows, &config);
    let source = extract(&sheets, &config).unwrap();
    let composition = compose(&config, &builtin_branding(), &source, 0);

    // Column H lands in output column E once A, F and G are dropped.
    let price_col = config.output_column(7).unwrap();
    assert_eq!(price_col, 4);
    assert_eq!(number(cell_at(&composition.operations, data_row(1), price_col)), Some(175.0));
    assert_eq!(composition.stats.rows_emitted, 2);
    assert_eq!(composition.stats.prices_adjusted, 1);
}

#[test]
fn test_conditional_pricing_scenarios() {
    let mut config = filtered(&["Light Assist"]);
    config.category_upcharge.clear();
    config.conditional_pricing.insert(
        "light assist".to_string(),
        ConditionalPricing {
            threshold: 50.0,
            under_threshold_price: Some(40.0),
            under_threshold_markup: None,
            over_threshold_markup: Some(25.0),
        },
    );
    let rows = vec![
        header("Light Assist", 4),
        product("Cheap", 2, 45.0, 4),
        product("Dear", 2, 80.0, 4),
        product("Edge", 2, 50.0, 4),
    ];
    let sheets = seed(rows, &config);
    let source = extract(&sheets, &config).unwrap();
    let ops = compose(&config, &builtin_branding(), &source, 0).operations;

    // The matching header itself is consumed, so data starts at output row 0.
    assert_eq!(number(cell_at(&ops, data_row(0), 2)), Some(40.0));
    assert_eq!(number(cell_at(&ops, data_row(1), 2)), Some(105.0));
    assert_eq!(number(cell_at(&ops, data_row(2), 2)), Some(40.0));
}

#[test]
fn test_composition_is_deterministic() {
    let config = thca();
    let rows = vec![header("Smalls", 8), product("Runtz", 7, 300.0, 8)];
    let sheets = seed(rows, &config);
    let source = extract(&sheets, &config).unwrap();

    let first = compose(&config, &builtin_branding(), &source, 7);
    let second = compose(&config, &builtin_branding(), &source, 7);
    assert_eq!(first.operations, second.operations);
    assert_eq!(number(cell_at(&first.operations, data_row(1), 4)), Some(425.0));
}

// ═══════════════════════════════════════════════════════════════════════════
// FILTERING
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_filter_keeps_only_matching_sections() {
    let config = filtered(&["Indoor"]);
    let rows = vec![
        header("Indoor", 4),
        product("A", 2, 10.0, 4),
        product("B", 2, 20.0, 4),
        product("C", 2, 30.0, 4),
        header("Outdoor", 4),
        product("D", 2, 40.0, 4),
        product("E", 2, 50.0, 4),
    ];
    let sheets = seed(rows, &config);
    let source = extract(&sheets, &config).unwrap();

    let emitted = classify_rows(&config, &source.grid.row_data, source.truncate_row);
    let names: Vec<_> = emitted
        .iter()
        .map(|r| source.values[r.source_index][0].clone())
        .collect();
    assert_eq!(names, vec!["A", "B", "C"]);
    let indices: Vec<_> = emitted.iter().map(|r| r.output_index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert!(emitted
        .iter()
        .all(|r| r.category.as_deref() == Some("indoor")));
}

#[test]
fn test_preserved_header_row_is_kept() {
    let mut config = filtered(&["Indoor"]);
    config.preserve_header_row = true;
    let rows = vec![
        RowData::new(vec![CellData::text("Strain"), CellData::text("Type"), CellData::text("Price")]),
        header("Indoor", 4),
        product("A", 2, 10.0, 4),
        header("Outdoor", 4),
        product("B", 2, 20.0, 4),
    ];
    let sheets = seed(rows, &config);
    let source = extract(&sheets, &config).unwrap();
    let composition = compose(&config, &builtin_branding(), &source, 0);

    assert_eq!(composition.stats.rows_emitted, 2);
    let first = cell_at(&composition.operations, HEADER_ROWS, 0).unwrap();
    assert_eq!(first.plain_text(), "Strain");
    assert_eq!(number(cell_at(&composition.operations, HEADER_ROWS + 1, 2)), Some(85.0));
}

#[test]
fn test_rows_without_price_are_dropped_and_output_is_compact() {
    let config = thca();
    let mut blank = product("Sold out", 7, 0.0, 8);
    blank.values[7] = CellData::text("");
    let rows = vec![
        header("Micros", 8),
        product("One", 7, 50.0, 8),
        blank,
        product("Two", 7, 60.0, 8),
    ];
    let sheets = seed(rows, &config);
    let source = extract(&sheets, &config).unwrap();
    let ops = compose(&config, &builtin_branding(), &source, 0).operations;

    assert_eq!(number(cell_at(&ops, data_row(1), 4)), Some(150.0));
    assert_eq!(number(cell_at(&ops, data_row(2), 4)), Some(160.0));
    assert!(cell_at(&ops, data_row(3), 0).is_none());
}

// ═══════════════════════════════════════════════════════════════════════════
// LINKS AND LAYOUT
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_media_link_becomes_hyperlink_formula() {
    let config = thca();
    let mut row = product("Zkittlez", 7, 100.0, 9);
    row.values[8] = CellData::text("zkittlez.mp4").with_hyperlink("https://drive.example/v/1");
    let sheets = seed(vec![header("Indoor Exotics", 9), row], &config);
    let source = extract(&sheets, &config).unwrap();
    let composition = compose(&config, &builtin_branding(), &source, 0);

    let cell = cell_at(&composition.operations, data_row(1), config.output_column(8).unwrap()).unwrap();
    assert_eq!(
        cell.user_entered_value.as_ref().and_then(ExtendedValue::as_formula),
        Some("=HYPERLINK(\"https://drive.example/v/1\",\"zkittlez\")")
    );
    assert_eq!(composition.stats.hyperlinks, 1);
}

#[test]
fn test_data_rows_lose_background_headers_keep_it() {
    let config = thca();
    let mut row = product("Gelato", 7, 100.0, 8);
    // Column A drives header detection; B still carries a fill.
    row.values[1] = CellData::text("Gelato").with_background(GREEN);
    let sheets = seed(vec![header("Smalls", 8), row], &config);
    let source = extract(&sheets, &config).unwrap();
    let ops = compose(&config, &builtin_branding(), &source, 0).operations;

    let header_cell = cell_at(&ops, data_row(0), 0).unwrap();
    assert!(header_cell.user_entered_format.as_ref().unwrap().has_colored_background());
    let data_cell = cell_at(&ops, data_row(1), 0).unwrap();
    let format = data_cell.user_entered_format.as_ref().unwrap();
    assert_eq!(format.background_color, None);
}

#[test]
fn test_column_widths_follow_compacted_columns() {
    let config = thca();
    let sheets = seed(vec![header("Smalls", 8), product("A", 7, 1.0, 8)], &config);
    sheets.set_column_metadata(
        SOURCE,
        &config.source_sheet_tab,
        &[Some(10), Some(110), Some(120), Some(130), Some(140), Some(150), Some(160), Some(170)],
    );
    let source = extract(&sheets, &config).unwrap();
    let ops = compose(&config, &builtin_branding(), &source, 0).operations;

    let widths: Vec<(usize, u32)> = ops
        .iter()
        .skip_while(|op| op.as_cell_update().is_none())
        .filter_map(|op| match op {
            WriteOperation::UpdateDimensionProperties(d) => {
                Some((d.range.start_index, d.properties.pixel_size.unwrap_or(0)))
            }
            _ => None,
        })
        .filter(|(_, px)| *px != 300)
        .collect();
    assert!(widths.ends_with(&[(0, 110), (1, 120), (2, 130), (3, 140), (4, 170)]));
}
