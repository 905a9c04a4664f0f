//! Built-in menus

use std::collections::{BTreeMap, BTreeSet};

use super::{
    Branding, CategoryUpcharge, ConsolidatedConfig, ConsolidatedTab, ContactLine, Layout,
    MenuConfig, DEFAULT_TRUNCATE_ROW,
};
use crate::types::Color;

/// Light brand blue, matched to the logo background.
pub const BRAND_BLUE: Color = Color::rgb(0.62, 0.88, 0.91);

pub fn builtin_menus() -> Vec<MenuConfig> {
    vec![thca(), titan()]
}

fn thca() -> MenuConfig {
    MenuConfig {
        id: "thca".to_string(),
        name: "THCA Menu".to_string(),
        source_sheet_id: "17OnrxwCf7EYjY27QM1FokRHmjkERYWSMSDg5sxscc7c".to_string(),
        source_sheet_tab: "THCA".to_string(),
        target_sheet_name: "Exotic Flowers Only BULK THCa Menu".to_string(),
        truncate_markers: [
            "FOR COA and MEDIA REFERENCE ONLY",
            "FOR COA",
            "COA and MEDIA REFERENCE",
            "MEDIA REFERENCE ONLY",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
        skip_rows: 0,
        default_truncate_row: DEFAULT_TRUNCATE_ROW,
        // A, F, G
        columns_to_remove: BTreeSet::from([0, 5, 6]),
        price_column: 7,
        category_column: 1,
        category_upcharge: vec![
            CategoryUpcharge::flat("indoor exotics", 75.0),
            CategoryUpcharge::flat("commercial ins", 150.0),
            CategoryUpcharge::flat("high end deps", 100.0),
            CategoryUpcharge::flat("standard deps", 100.0),
            CategoryUpcharge::flat("smalls", 125.0),
            CategoryUpcharge::flat("micros", 100.0),
            CategoryUpcharge::flat("partial pounds only left", 100.0),
        ],
        conditional_pricing: BTreeMap::new(),
        category_name_mapping: Vec::new(),
        row_filter_keywords: Vec::new(),
        filter_enabled: false,
        preserve_header_row: false,
        layout: Layout::Offset,
    }
}

fn titan() -> MenuConfig {
    MenuConfig {
        id: "titan".to_string(),
        name: "Titan Botanicals Menu".to_string(),
        source_sheet_id: "1yRDjDAtTN1i5TCt7u56FGOjNd4JplCfiUOzcbOKSQ7A".to_string(),
        source_sheet_tab: "Sheet3".to_string(),
        target_sheet_name: "Exotic Flowers Only - Titan Botanicals Menu".to_string(),
        truncate_markers: ["POLICIES", "****** POLICIES", "POLICIES ******"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        skip_rows: 5,
        default_truncate_row: DEFAULT_TRUNCATE_ROW,
        columns_to_remove: BTreeSet::new(),
        price_column: 2,
        category_column: 1,
        category_upcharge: vec![
            CategoryUpcharge::flat("indoor", 75.0),
            CategoryUpcharge::flat("light assist", 25.0),
        ],
        conditional_pricing: BTreeMap::new(),
        category_name_mapping: Vec::new(),
        row_filter_keywords: vec!["Indoor".to_string(), "Light Assist".to_string()],
        filter_enabled: true,
        // Column headers on the first row after the skipped block
        preserve_header_row: true,
        layout: Layout::Left,
    }
}

pub fn builtin_consolidated() -> ConsolidatedConfig {
    ConsolidatedConfig {
        name_template: "Exotic Flowers Only Menu (Updated {date})".to_string(),
        tabs: vec![
            ConsolidatedTab {
                menu: "thca".to_string(),
                title: "THCA".to_string(),
            },
            ConsolidatedTab {
                menu: "titan".to_string(),
                title: "Titan Botanicals".to_string(),
            },
        ],
    }
}

pub fn builtin_branding() -> Branding {
    Branding {
        logo_url: "https://i.imgur.com/zCVuc8e.png".to_string(),
        contact_lines: vec![
            ContactLine {
                text: "Bulk Discounts Available".to_string(),
                bold: true,
            },
            ContactLine {
                text: "exoticflowersonly@gmail.com".to_string(),
                bold: false,
            },
            ContactLine {
                text: "205-974-1701".to_string(),
                bold: false,
            },
        ],
        brand_color: BRAND_BLUE,
    }
}
