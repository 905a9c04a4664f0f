//! Menu configuration registry
//!
//! Each menu is a typed record describing where its source lives, which
//! columns survive, and how prices are marked up per category. The registry
//! ships with built-in menus and can be replaced by a YAML file.

mod menus;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};
use crate::types::Color;

pub use menus::{builtin_branding, builtin_consolidated, builtin_menus};

/// Source range is always `A:Z`.
pub const SOURCE_COLUMNS: usize = 26;

/// Rows used when no truncation marker is found.
pub const DEFAULT_TRUNCATE_ROW: usize = 60;

fn default_truncate_row() -> usize {
    DEFAULT_TRUNCATE_ROW
}

//==============================================================================
// Pricing rules
//==============================================================================

/// Flat add-on for a category, or a pointer to its conditional rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UpchargeRepr", into = "UpchargeRepr")]
pub enum Upcharge {
    Flat(f64),
    Conditional,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum UpchargeRepr {
    Amount(f64),
    Word(String),
}

impl TryFrom<UpchargeRepr> for Upcharge {
    type Error = String;

    fn try_from(repr: UpchargeRepr) -> Result<Self, Self::Error> {
        match repr {
            UpchargeRepr::Amount(n) => Ok(Upcharge::Flat(n)),
            UpchargeRepr::Word(w) if w.eq_ignore_ascii_case("conditional") => {
                Ok(Upcharge::Conditional)
            }
            UpchargeRepr::Word(w) => Err(format!(
                "upcharge must be a number or \"conditional\", got \"{}\"",
                w
            )),
        }
    }
}

impl From<Upcharge> for UpchargeRepr {
    fn from(u: Upcharge) -> Self {
        match u {
            Upcharge::Flat(n) => UpchargeRepr::Amount(n),
            Upcharge::Conditional => UpchargeRepr::Word("conditional".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryUpcharge {
    pub category: String,
    pub upcharge: Upcharge,
}

impl CategoryUpcharge {
    pub fn flat(category: &str, amount: f64) -> Self {
        Self {
            category: category.to_string(),
            upcharge: Upcharge::Flat(amount),
        }
    }
}

/// Threshold rules for one category.
///
/// At or under `threshold` the price is replaced by `under_threshold_price`
/// or marked up by `under_threshold_markup`; above it `over_threshold_markup`
/// is added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionalPricing {
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub under_threshold_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub under_threshold_markup: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub over_threshold_markup: Option<f64>,
}

impl ConditionalPricing {
    /// First matching clause wins; `None` when no clause applies.
    pub fn apply(&self, base: f64) -> Option<f64> {
        if base <= self.threshold {
            if let Some(price) = self.under_threshold_price {
                return Some(price);
            }
            if let Some(markup) = self.under_threshold_markup {
                return Some(base + markup);
            }
            None
        } else {
            self.over_threshold_markup.map(|markup| base + markup)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameMapping {
    pub from: String,
    pub to: String,
}

//==============================================================================
// Layout and branding
//==============================================================================

/// Where the logo/contact block sits relative to the product columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Columns A–E, flush with a narrow product list.
    Left,
    /// Columns D–H.
    #[default]
    Offset,
}

impl Layout {
    /// Half-open column span `[start, end)` of the branding block.
    pub fn logo_span(self) -> (usize, usize) {
        match self {
            Layout::Left => (0, 5),
            Layout::Offset => (3, 8),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactLine {
    pub text: String,
    #[serde(default)]
    pub bold: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branding {
    pub logo_url: String,
    pub contact_lines: Vec<ContactLine>,
    pub brand_color: Color,
}

impl Default for Branding {
    fn default() -> Self {
        builtin_branding()
    }
}

//==============================================================================
// Menu config
//==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuConfig {
    pub id: String,
    pub name: String,
    pub source_sheet_id: String,
    pub source_sheet_tab: String,
    pub target_sheet_name: String,
    pub truncate_markers: Vec<String>,
    #[serde(default)]
    pub skip_rows: usize,
    #[serde(default = "default_truncate_row")]
    pub default_truncate_row: usize,
    #[serde(default)]
    pub columns_to_remove: BTreeSet<usize>,
    pub price_column: usize,
    pub category_column: usize,
    #[serde(default)]
    pub category_upcharge: Vec<CategoryUpcharge>,
    #[serde(default)]
    pub conditional_pricing: BTreeMap<String, ConditionalPricing>,
    #[serde(default)]
    pub category_name_mapping: Vec<NameMapping>,
    #[serde(default)]
    pub row_filter_keywords: Vec<String>,
    #[serde(default)]
    pub filter_enabled: bool,
    #[serde(default)]
    pub preserve_header_row: bool,
    #[serde(default)]
    pub layout: Layout,
}

impl MenuConfig {
    /// Check the invariants every pipeline stage relies on.
    pub fn validate(&self) -> SyncResult<()> {
        let fail = |msg: String| Err(SyncError::Config(format!("menu '{}': {}", self.id, msg)));

        if self.id.trim().is_empty() {
            return Err(SyncError::Config("menu id must not be empty".to_string()));
        }
        if self.truncate_markers.iter().all(|m| m.trim().is_empty()) {
            return fail("at least one truncate marker is required".to_string());
        }
        for (label, col) in [
            ("price_column", self.price_column),
            ("category_column", self.category_column),
        ] {
            if col >= SOURCE_COLUMNS {
                return fail(format!("{} {} is outside columns A:Z", label, col));
            }
            if self.columns_to_remove.contains(&col) {
                return fail(format!("{} {} is listed in columns_to_remove", label, col));
            }
        }
        if let Some(col) = self.columns_to_remove.iter().find(|c| **c >= SOURCE_COLUMNS) {
            return fail(format!("removed column {} is outside columns A:Z", col));
        }
        if self.filter_enabled && self.row_filter_keywords.is_empty() {
            return fail("filter_enabled requires row_filter_keywords".to_string());
        }
        for rule in &self.category_upcharge {
            if rule.upcharge == Upcharge::Conditional && self.conditional_for(&rule.category).is_none()
            {
                return fail(format!(
                    "category '{}' is conditional but has no conditional_pricing entry",
                    rule.category
                ));
            }
        }
        for (category, rule) in &self.conditional_pricing {
            if rule.under_threshold_price.is_some() && rule.under_threshold_markup.is_some() {
                return fail(format!(
                    "conditional pricing for '{}' sets both under_threshold_price and under_threshold_markup",
                    category
                ));
            }
        }
        Ok(())
    }

    /// Resolve a category label from header text.
    ///
    /// Name-mapping entries are tried first and yield the mapped label; then
    /// the upcharge table keys, then conditional-pricing keys. Matching is a
    /// case-folded substring test, first hit wins.
    pub fn match_category(&self, text: &str) -> Option<String> {
        let text = text.trim().to_lowercase();
        if text.is_empty() {
            return None;
        }
        if let Some(mapping) = self
            .category_name_mapping
            .iter()
            .find(|m| text.contains(&m.from.to_lowercase()))
        {
            return Some(mapping.to.to_lowercase());
        }
        if let Some(rule) = self
            .category_upcharge
            .iter()
            .find(|r| text.contains(&r.category.to_lowercase()))
        {
            return Some(rule.category.to_lowercase());
        }
        self.conditional_pricing
            .keys()
            .find(|k| text.contains(&k.to_lowercase()))
            .map(|k| k.to_lowercase())
    }

    /// Output label for a category-column cell on a header row, if renamed.
    pub fn rename_category(&self, text: &str) -> Option<&str> {
        let text = text.trim().to_lowercase();
        if text.is_empty() {
            return None;
        }
        self.category_name_mapping
            .iter()
            .find(|m| text.contains(&m.from.to_lowercase()))
            .map(|m| m.to.as_str())
    }

    /// First filter keyword contained in `row_text` (already lowercased).
    pub fn matching_keyword(&self, row_text: &str) -> Option<&str> {
        self.row_filter_keywords
            .iter()
            .find(|k| row_text.contains(&k.to_lowercase()))
            .map(String::as_str)
    }

    pub fn upcharge_for(&self, category: &str) -> Option<Upcharge> {
        self.category_upcharge
            .iter()
            .find(|r| r.category.eq_ignore_ascii_case(category))
            .map(|r| r.upcharge)
    }

    pub fn conditional_for(&self, category: &str) -> Option<&ConditionalPricing> {
        self.conditional_pricing
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(category))
            .map(|(_, v)| v)
    }

    /// Output column of a source column, or `None` when it is removed.
    pub fn output_column(&self, source_col: usize) -> Option<usize> {
        if self.columns_to_remove.contains(&source_col) {
            return None;
        }
        Some(source_col - self.columns_to_remove.range(..source_col).count())
    }
}

//==============================================================================
// Consolidated sheet
//==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedTab {
    pub menu: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedConfig {
    /// `{date}` is replaced by e.g. `August 21`.
    pub name_template: String,
    pub tabs: Vec<ConsolidatedTab>,
}

impl ConsolidatedConfig {
    pub fn title_for<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        let date = at.format("%B %-d").to_string();
        self.name_template.replace("{date}", &date)
    }

    pub fn current_title(&self) -> String {
        self.title_for(&Local::now())
    }

    /// Built-in title template with one tab per menu, titled by menu name.
    pub fn for_menus(menus: &[MenuConfig]) -> Self {
        Self {
            tabs: menus
                .iter()
                .map(|m| ConsolidatedTab {
                    menu: m.id.clone(),
                    title: m.name.clone(),
                })
                .collect(),
            ..builtin_consolidated()
        }
    }
}

//==============================================================================
// Registry
//==============================================================================

#[derive(Debug, Deserialize)]
struct RegistryFile {
    menus: Vec<MenuConfig>,
    #[serde(default)]
    consolidated: Option<ConsolidatedConfig>,
    #[serde(default)]
    branding: Option<Branding>,
}

#[derive(Debug, Clone)]
pub struct MenuRegistry {
    menus: Vec<MenuConfig>,
    consolidated: ConsolidatedConfig,
    branding: Branding,
}

impl MenuRegistry {
    pub fn new(
        menus: Vec<MenuConfig>,
        consolidated: ConsolidatedConfig,
        branding: Branding,
    ) -> SyncResult<Self> {
        let mut seen = BTreeSet::new();
        for menu in &menus {
            menu.validate()?;
            if !seen.insert(menu.id.as_str()) {
                return Err(SyncError::Config(format!("duplicate menu id '{}'", menu.id)));
            }
            if menu.id == "all" {
                return Err(SyncError::Config("'all' is reserved and cannot be a menu id".to_string()));
            }
        }
        if let Some(tab) = consolidated.tabs.iter().find(|t| !seen.contains(t.menu.as_str())) {
            return Err(SyncError::Config(format!(
                "consolidated tab '{}' refers to unknown menu '{}'",
                tab.title, tab.menu
            )));
        }
        Ok(Self {
            menus,
            consolidated,
            branding,
        })
    }

    pub fn builtin() -> Self {
        Self {
            menus: builtin_menus(),
            consolidated: builtin_consolidated(),
            branding: builtin_branding(),
        }
    }

    pub fn from_yaml(content: &str) -> SyncResult<Self> {
        let file: RegistryFile = serde_yaml::from_str(content)?;
        let consolidated = file
            .consolidated
            .unwrap_or_else(|| ConsolidatedConfig::for_menus(&file.menus));
        Self::new(
            file.menus,
            consolidated,
            file.branding.unwrap_or_else(builtin_branding),
        )
    }

    pub fn load(path: &Path) -> SyncResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Registry from `path` when given, else the built-in one.
    pub fn load_or_builtin(path: Option<&Path>) -> SyncResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::builtin()),
        }
    }

    pub fn get(&self, id: &str) -> SyncResult<&MenuConfig> {
        self.menus.iter().find(|m| m.id == id).ok_or_else(|| SyncError::UnknownMenu {
            id: id.to_string(),
            available: self.ids(),
        })
    }

    pub fn ids(&self) -> Vec<String> {
        self.menus.iter().map(|m| m.id.clone()).collect()
    }

    pub fn menus(&self) -> &[MenuConfig] {
        &self.menus
    }

    pub fn consolidated(&self) -> &ConsolidatedConfig {
        &self.consolidated
    }

    pub fn branding(&self) -> &Branding {
        &self.branding
    }

    /// Expand a `--menu` selector (`all` or a single id) to menu ids.
    pub fn select(&self, selector: &str) -> SyncResult<Vec<String>> {
        if selector == "all" {
            Ok(self.ids())
        } else {
            self.get(selector).map(|m| vec![m.id.clone()])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu() -> MenuConfig {
        builtin_menus().remove(0)
    }

    #[test]
    fn test_builtin_registry_is_valid() {
        let registry = MenuRegistry::builtin();
        for menu in registry.menus() {
            menu.validate().unwrap();
        }
        assert_eq!(registry.ids(), vec!["thca", "titan"]);
    }

    #[test]
    fn test_unknown_menu_lists_available() {
        let err = MenuRegistry::builtin().get("nope").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("nope"));
        assert!(msg.contains("thca, titan"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_price_column_cannot_be_removed() {
        let mut m = menu();
        m.columns_to_remove.insert(m.price_column);
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_output_column_skips_removed() {
        let m = menu(); // removes 0, 5, 6
        assert_eq!(m.output_column(0), None);
        assert_eq!(m.output_column(1), Some(0));
        assert_eq!(m.output_column(4), Some(3));
        assert_eq!(m.output_column(5), None);
        assert_eq!(m.output_column(7), Some(4));
    }

    #[test]
    fn test_match_category_prefers_mapping() {
        let mut m = menu();
        m.category_name_mapping.push(NameMapping {
            from: "Exotic Indoor".to_string(),
            to: "Indoor Exotics".to_string(),
        });
        assert_eq!(m.match_category("  EXOTIC INDOOR  "), Some("indoor exotics".to_string()));
        assert_eq!(m.match_category("Smalls (1oz)"), Some("smalls".to_string()));
        assert_eq!(m.match_category("Pre-rolls"), None);
        assert_eq!(m.match_category(""), None);
    }

    #[test]
    fn test_conditional_apply() {
        let rule = ConditionalPricing {
            threshold: 50.0,
            under_threshold_price: Some(40.0),
            under_threshold_markup: None,
            over_threshold_markup: Some(25.0),
        };
        assert_eq!(rule.apply(45.0), Some(40.0));
        assert_eq!(rule.apply(50.0), Some(40.0));
        assert_eq!(rule.apply(80.0), Some(105.0));
    }

    #[test]
    fn test_upcharge_parses_number_or_conditional() {
        let yaml = "- category: a\n  upcharge: 75\n- category: b\n  upcharge: conditional\n";
        let rules: Vec<CategoryUpcharge> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rules[0].upcharge, Upcharge::Flat(75.0));
        assert_eq!(rules[1].upcharge, Upcharge::Conditional);

        let bad = "- category: c\n  upcharge: lots\n";
        assert!(serde_yaml::from_str::<Vec<CategoryUpcharge>>(bad).is_err());
    }

    #[test]
    fn test_consolidated_title_uses_month_day() {
        let cfg = builtin_consolidated();
        let at = chrono::Utc.with_ymd_and_hms(2025, 8, 21, 12, 0, 0).unwrap();
        assert_eq!(cfg.title_for(&at), "Exotic Flowers Only Menu (Updated August 21)");
    }

    #[test]
    fn test_select_all_and_single() {
        let registry = MenuRegistry::builtin();
        assert_eq!(registry.select("all").unwrap().len(), 2);
        assert_eq!(registry.select("titan").unwrap(), vec!["titan"]);
        assert!(registry.select("bogus").is_err());
    }
}
