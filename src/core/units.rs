//! Equipment unit registry and unit folder resolution
//!
//! Units are identified by a short name (e.g. `F301`) and mapped to a folder on
//! the equipment drive:
//! `{drive}/{unit_paths[minesite][model_base]}/{unit} - {serial}`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::config::Config;
use crate::core::error::{GtError, Result};
use crate::core::store::Store;

/// A registered equipment unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    #[serde(rename = "Unit")]
    pub unit: String,
    #[serde(rename = "Serial")]
    pub serial: String,
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "ModelBase")]
    pub model_base: String,
    #[serde(rename = "MineSite")]
    pub minesite: String,
}

/// In-memory snapshot of the `Units` table
///
/// Loaded once per command and shared read-only across worker threads.
#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
    units: Vec<Unit>,
    index: HashMap<String, usize>,
    path_expr: Option<Regex>,
}

impl UnitRegistry {
    pub fn new(mut units: Vec<Unit>) -> Self {
        units.sort_by(|a, b| a.unit.cmp(&b.unit));

        let index = units
            .iter()
            .enumerate()
            .map(|(i, u)| (u.unit.clone(), i))
            .collect();

        // longest names first so F3010 isn't shadowed by F301
        let mut names: Vec<&str> = units.iter().map(|u| u.unit.as_str()).collect();
        names.sort_by_key(|n| std::cmp::Reverse(n.len()));
        let path_expr = if names.is_empty() {
            None
        } else {
            let alternation = names
                .iter()
                .map(|n| regex::escape(n))
                .collect::<Vec<_>>()
                .join("|");
            Regex::new(&format!("({})", alternation)).ok()
        };

        Self {
            units,
            index,
            path_expr,
        }
    }

    /// Load all units from the store
    pub fn load(store: &Store) -> Result<Self> {
        Ok(Self::new(store.units()?))
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn exists(&self, unit: &str) -> bool {
        self.index.contains_key(unit)
    }

    pub fn get(&self, unit: &str) -> Option<&Unit> {
        self.index.get(unit).map(|&i| &self.units[i])
    }

    /// Look up a unit, failing with [`GtError::UnitNotFound`]
    pub fn require(&self, unit: &str) -> Result<&Unit> {
        self.get(unit)
            .ok_or_else(|| GtError::UnitNotFound(unit.to_string()))
    }

    /// All units, optionally filtered by minesite and model (substring)
    pub fn all(&self, minesite: Option<&str>, model: Option<&str>) -> Vec<&Unit> {
        self.units
            .iter()
            .filter(|u| minesite.map_or(true, |m| u.minesite == m))
            .filter(|u| model.map_or(true, |m| u.model.contains(m)))
            .collect()
    }

    /// Unit from serial number, only when exactly one unit matches
    pub fn unit_from_serial(&self, serial: &str, model: Option<&str>, minesite: Option<&str>) -> Option<String> {
        let serial = serial.trim();
        let model = model.map(|m| m.replace('\'', ""));

        let matches: Vec<&Unit> = self
            .units
            .iter()
            .filter(|u| u.serial == serial)
            .filter(|u| model.as_deref().map_or(true, |m| u.model.contains(m)))
            .filter(|u| minesite.map_or(true, |m| u.minesite.contains(m)))
            .collect();

        match matches.as_slice() {
            [single] => Some(single.unit.clone()),
            _ => None,
        }
    }

    /// First space-separated token of `s` that is a known unit
    pub fn unit_from_str(&self, s: &str) -> Option<String> {
        s.split(' ')
            .find(|item| self.exists(item))
            .map(str::to_string)
    }

    /// First known unit appearing anywhere in the path
    pub fn unit_from_path(&self, p: &Path) -> Option<String> {
        let found = self
            .path_expr
            .as_ref()
            .and_then(|expr| expr.find(&p.to_string_lossy()).map(|m| m.as_str().to_string()));

        if found.is_none() {
            tracing::warn!("Couldn't find unit in path: {}", p.display());
        }
        found
    }
}

/// Minesite whose configured equipment folder contains `p`
pub fn minesite_from_path(p: &Path, config: &Config) -> Option<String> {
    if !p.starts_with(&config.drive) {
        return None;
    }

    let found = config
        .equip_paths()
        .find(|(base, _)| p.starts_with(base))
        .map(|(_, minesite)| minesite.to_string());

    if found.is_none() {
        tracing::warn!("Couldn't get minesite in path: {}", p.display());
    }
    found
}

/// Paths to a unit's folders on the equipment drive
#[derive(Debug, Clone)]
pub struct UnitFolder {
    pub unit: String,
    pub p_unit: PathBuf,
    pub p_dls: PathBuf,
}

impl UnitFolder {
    pub fn new(unit: &Unit, config: &Config) -> Result<Self> {
        let rel = config
            .unit_path(&unit.minesite, &unit.model_base)
            .ok_or_else(|| GtError::NoUnitPath {
                minesite: unit.minesite.clone(),
                model_base: unit.model_base.clone(),
            })?;

        let p_unit = config
            .drive
            .join(rel)
            .join(format!("{} - {}", unit.unit, unit.serial));
        let p_dls = p_unit.join("Downloads");

        Ok(Self {
            unit: unit.unit.clone(),
            p_unit,
            p_dls,
        })
    }

    /// Resolve a unit by name through the registry
    pub fn from_name(unit: &str, registry: &UnitRegistry, config: &Config) -> Result<Self> {
        Self::new(registry.require(unit)?, config)
    }

    /// Download folder for a given year
    pub fn p_dls_year(&self, year: i32) -> PathBuf {
        self.p_dls.join(year.to_string())
    }
}

/// Remove Suncor's leading zeros, e.g. `F0301` -> `F301`
///
/// Only the first applicable rule is applied, and only when followed by a digit.
pub fn fix_suncor_unit(unit: &str) -> String {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    let rules = RULES.get_or_init(|| {
        [(r"^F0(\d)", "F$1"), (r"^03(\d)", "3$1"), (r"^2(\d)", "02$1")]
            .into_iter()
            .filter_map(|(expr, repl)| Regex::new(expr).ok().map(|r| (r, repl)))
            .collect()
    });

    for (expr, repl) in rules {
        if expr.is_match(unit) {
            return expr.replace(unit, *repl).to_string();
        }
    }
    unit.to_string()
}

/// Normalize customer unit strings from availability exports
///
/// Strips leading zeros then keeps the part before " ", "-(" or "/",
/// e.g. `F0301 - SMR` -> `F301`.
pub fn fix_customer_unit(unit: &str) -> String {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    let rules = RULES.get_or_init(|| {
        [(r"^F0", "F"), (r"^03", "3"), (r"^02", "2"), (r"^06", "6")]
            .into_iter()
            .filter_map(|(expr, repl)| Regex::new(expr).ok().map(|r| (r, repl)))
            .collect()
    });

    let mut unit = unit.trim().to_string();
    for (expr, repl) in rules {
        unit = expr.replace(&unit, *repl).to_string();
    }

    for token in [" ", "-(", "/"] {
        if let Some(first) = unit.split(token).next() {
            unit = first.to_string();
        }
    }
    unit
}

/// Expand an inclusive range like `F317-F330` or `317-330` (prefix `F`)
pub fn parse_unit_range(s: &str) -> Option<Vec<String>> {
    static EXPR: OnceLock<Option<Regex>> = OnceLock::new();
    let expr = EXPR
        .get_or_init(|| Regex::new(r"^([A-Za-z]*)(\d+)\s*-\s*([A-Za-z]*)(\d+)$").ok())
        .as_ref()?;

    let caps = expr.captures(s.trim())?;
    let prefix = if caps[1].is_empty() { "F" } else { &caps[1] };
    let start: u32 = caps[2].parse().ok()?;
    let end: u32 = caps[4].parse().ok()?;

    if end < start {
        return None;
    }
    Some((start..=end).map(|n| format!("{}{}", prefix, n)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(name: &str, serial: &str, model: &str, minesite: &str) -> Unit {
        Unit {
            unit: name.to_string(),
            serial: serial.to_string(),
            model: model.to_string(),
            model_base: "980E".to_string(),
            minesite: minesite.to_string(),
        }
    }

    fn registry() -> UnitRegistry {
        UnitRegistry::new(vec![
            unit("F301", "A40017", "980E-4", "FortHills"),
            unit("F302", "A40018", "980E-4", "FortHills"),
            unit("F3010", "A40099", "980E-5", "FortHills"),
            unit("301", "A40017", "930E-4", "BaseMine"),
        ])
    }

    #[test]
    fn test_from_serial_requires_single_match() {
        let reg = registry();
        assert_eq!(reg.unit_from_serial("A40018", None, None), Some("F302".to_string()));
        // serial shared across minesites is ambiguous without a filter
        assert_eq!(reg.unit_from_serial("A40017", None, None), None);
        assert_eq!(
            reg.unit_from_serial("A40017", Some("980E"), None),
            Some("F301".to_string())
        );
        assert_eq!(
            reg.unit_from_serial("A40017", None, Some("Base")),
            Some("301".to_string())
        );
        assert_eq!(reg.unit_from_serial("ZZZ", None, None), None);
    }

    #[test]
    fn test_from_str_tokens() {
        let reg = registry();
        assert_eq!(reg.unit_from_str("F302 - 2021-01-01 - DLS"), Some("F302".to_string()));
        assert_eq!(reg.unit_from_str("downloads 2021"), None);
    }

    #[test]
    fn test_from_path_prefers_longest() {
        let reg = registry();
        let p = Path::new("/p/980E Trucks/F3010 - A40099/Downloads/x.csv");
        assert_eq!(reg.unit_from_path(p), Some("F3010".to_string()));
        let p = Path::new("/p/980E Trucks/F301 - A40017/Downloads/x.csv");
        assert_eq!(reg.unit_from_path(p), Some("F301".to_string()));
    }

    #[test]
    fn test_all_filters() {
        let reg = registry();
        assert_eq!(reg.all(Some("FortHills"), None).len(), 3);
        assert_eq!(reg.all(None, Some("930")).len(), 1);
        assert_eq!(reg.all(None, None).len(), 4);
    }

    #[test]
    fn test_unit_folder_paths() {
        let mut config = Config::default();
        config.drive = PathBuf::from("/drive");
        let reg = registry();

        let uf = UnitFolder::from_name("F301", &reg, &config).unwrap();
        assert_eq!(
            uf.p_unit,
            PathBuf::from("/drive/Fort Hills/02. Equipment Files/1. 980E Trucks/F301 - A40017")
        );
        assert_eq!(uf.p_dls, uf.p_unit.join("Downloads"));
        assert_eq!(uf.p_dls_year(2021), uf.p_dls.join("2021"));

        assert!(matches!(
            UnitFolder::from_name("F999", &reg, &config),
            Err(GtError::UnitNotFound(_))
        ));
        assert!(matches!(
            UnitFolder::from_name("301", &reg, &config),
            Err(GtError::NoUnitPath { .. })
        ));
    }

    #[test]
    fn test_minesite_from_path() {
        let mut config = Config::default();
        config.drive = PathBuf::from("/drive");
        let p = Path::new("/drive/Fort Hills/02. Equipment Files/1. 980E Trucks/F301 - A/x.csv");
        assert_eq!(minesite_from_path(p, &config), Some("FortHills".to_string()));
        assert_eq!(minesite_from_path(Path::new("/home/x.csv"), &config), None);
    }

    #[test]
    fn test_fix_suncor_unit() {
        assert_eq!(fix_suncor_unit("F0301"), "F301");
        assert_eq!(fix_suncor_unit("0312"), "312");
        assert_eq!(fix_suncor_unit("299"), "0299");
        assert_eq!(fix_suncor_unit("F0-1"), "F0-1");
        assert_eq!(fix_suncor_unit("F301"), "F301");
    }

    #[test]
    fn test_fix_customer_unit() {
        assert_eq!(fix_customer_unit("F0301 - SMR"), "F301");
        assert_eq!(fix_customer_unit("0612-(A)"), "612");
        assert_eq!(fix_customer_unit("F302/F303"), "F302");
    }

    #[test]
    fn test_parse_unit_range() {
        assert_eq!(
            parse_unit_range("F317-F319"),
            Some(vec!["F317".to_string(), "F318".to_string(), "F319".to_string()])
        );
        assert_eq!(parse_unit_range("301-302").unwrap(), vec!["F301", "F302"]);
        assert_eq!(parse_unit_range("330-317"), None);
        assert_eq!(parse_unit_range("F301"), None);
    }
}
