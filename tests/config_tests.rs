//! Registry loading and validation from YAML

use menusync::config::{Layout, MenuRegistry, Upcharge};
use menusync::error::SyncError;
use std::fs;
use tempfile::TempDir;

const REGISTRY: &str = r#"
menus:
  - id: flower
    name: Flower Menu
    source_sheet_id: abc123
    source_sheet_tab: Inventory
    target_sheet_name: Flower Menu (Public)
    truncate_markers: ["END OF LIST"]
    skip_rows: 2
    columns_to_remove: [0, 4]
    price_column: 3
    category_column: 1
    category_upcharge:
      - category: indoor
        upcharge: 50
      - category: light assist
        upcharge: conditional
    conditional_pricing:
      light assist:
        threshold: 50
        under_threshold_price: 40
        over_threshold_markup: 25
    category_name_mapping:
      - from: Greenhouse
        to: Light Assist
    row_filter_keywords: [Indoor, Light Assist]
    filter_enabled: true
    preserve_header_row: true
    layout: left
"#;

fn write_registry(content: &str) -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("menus.yaml");
    fs::write(&path, content).unwrap();
    (dir, path)
}

#[test]
fn test_load_registry_from_file() {
    let (_dir, path) = write_registry(REGISTRY);
    let registry = MenuRegistry::load(&path).unwrap();

    assert_eq!(registry.ids(), vec!["flower"]);
    let menu = registry.get("flower").unwrap();
    assert_eq!(menu.skip_rows, 2);
    assert_eq!(menu.default_truncate_row, 60);
    assert_eq!(menu.layout, Layout::Left);
    assert_eq!(menu.upcharge_for("Light Assist"), Some(Upcharge::Conditional));
    assert_eq!(menu.conditional_for("light assist").unwrap().apply(80.0), Some(105.0));
    assert_eq!(menu.match_category("Greenhouse Mix"), Some("light assist".to_string()));
    assert_eq!(menu.output_column(3), Some(2));
}

#[test]
fn test_defaults_fill_consolidated_and_branding() {
    let registry = MenuRegistry::from_yaml(REGISTRY).unwrap();
    let consolidated = registry.consolidated();
    assert_eq!(consolidated.tabs.len(), 1);
    assert_eq!(consolidated.tabs[0].menu, "flower");
    assert_eq!(consolidated.tabs[0].title, "Flower Menu");
    assert_eq!(registry.branding().contact_lines.len(), 3);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = MenuRegistry::load(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, SyncError::Io(_)));
}

#[test]
fn test_load_or_builtin_without_path() {
    let registry = MenuRegistry::load_or_builtin(None).unwrap();
    assert_eq!(registry.ids(), vec!["thca", "titan"]);
}

#[test]
fn test_conditional_without_rules_is_rejected() {
    let yaml = REGISTRY.replace("light assist:\n        threshold", "other:\n        threshold");
    let err = MenuRegistry::from_yaml(&yaml).unwrap_err();
    assert!(err.to_string().contains("no conditional_pricing entry"), "{}", err);
}

#[test]
fn test_removed_price_column_is_rejected() {
    let yaml = REGISTRY.replace("columns_to_remove: [0, 4]", "columns_to_remove: [0, 3]");
    let err = MenuRegistry::from_yaml(&yaml).unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("price_column"));
}

#[test]
fn test_filter_requires_keywords() {
    let yaml = REGISTRY.replace("row_filter_keywords: [Indoor, Light Assist]", "row_filter_keywords: []");
    assert!(MenuRegistry::from_yaml(&yaml).is_err());
}

#[test]
fn test_duplicate_and_reserved_ids_are_rejected() {
    let twice = format!("{}{}", REGISTRY, &REGISTRY["\nmenus:\n".len()..]);
    let err = MenuRegistry::from_yaml(&twice).unwrap_err();
    assert!(err.to_string().contains("duplicate"), "{}", err);

    let reserved = REGISTRY.replace("id: flower", "id: all");
    assert!(MenuRegistry::from_yaml(&reserved).is_err());
}

#[test]
fn test_bad_upcharge_is_yaml_error() {
    let yaml = REGISTRY.replace("upcharge: 50", "upcharge: plenty");
    assert!(matches!(MenuRegistry::from_yaml(&yaml).unwrap_err(), SyncError::Yaml(_)));
}

#[test]
fn test_consolidated_tab_must_name_a_menu() {
    let yaml = format!(
        "{}consolidated:\n  name_template: \"Menu {{date}}\"\n  tabs:\n    - menu: ghost\n      title: Ghost\n",
        REGISTRY
    );
    let err = MenuRegistry::from_yaml(&yaml).unwrap_err();
    assert!(err.to_string().contains("ghost"));
}
