//! Shared helper functions for CLI commands

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use miette::{bail, Result};

use crate::cli::GlobalOpts;
use crate::core::units::parse_unit_range;
use crate::core::{Config, Store, UnitRegistry};

/// Config, database and unit registry for one command
pub struct Session {
    pub config: Config,
    pub store: Store,
    pub registry: UnitRegistry,
}

impl Session {
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let config = load_config(global)?;
        tracing::debug!("database: {}", config.database.display());

        let store = Store::open(&config.database)?;
        let registry = UnitRegistry::load(&store)?;

        Ok(Self {
            config,
            store,
            registry,
        })
    }
}

/// Load the config, applying `--db`
pub fn load_config(global: &GlobalOpts) -> Result<Config> {
    let mut config = Config::load(global.config.as_deref())?;
    if let Some(db) = &global.db {
        config.database = db.clone();
    }
    Ok(config)
}

/// Clap value parser for `YYYY-MM-DD`
pub fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}', expected YYYY-MM-DD", s))
}

/// Midnight of `since`, or of today minus the configured lookback
pub fn since_or_default(since: Option<NaiveDate>, config: &Config) -> NaiveDateTime {
    since
        .unwrap_or_else(|| Local::now().date_naive() - Duration::days(config.lookback_days))
        .and_time(chrono::NaiveTime::MIN)
}

/// Units selected by name or range, narrowed by minesite and model
///
/// With neither names nor range, every registered unit matching the filters
/// is selected.
pub fn resolve_units(
    registry: &UnitRegistry,
    units: &[String],
    range: Option<&str>,
    minesite: Option<&str>,
    model: Option<&str>,
) -> Result<Vec<String>> {
    let requested: Option<Vec<String>> = match range {
        Some(r) => match parse_unit_range(r) {
            Some(names) => Some(names),
            None => bail!("Invalid unit range '{}', expected e.g. F301-F310", r),
        },
        None if !units.is_empty() => Some(units.iter().map(|u| u.trim().to_string()).collect()),
        None => None,
    };

    let selected: Vec<String> = match requested {
        Some(names) => {
            let mut found = Vec::with_capacity(names.len());
            for name in names {
                match registry.get(&name) {
                    Some(u)
                        if minesite.map_or(true, |m| u.minesite == m)
                            && model.map_or(true, |m| u.model.contains(m)) =>
                    {
                        found.push(name)
                    }
                    Some(_) => tracing::debug!("{} filtered out by minesite/model", name),
                    None if range.is_some() => tracing::debug!("{} not registered, skipping", name),
                    None => return Err(crate::core::GtError::UnitNotFound(name).into()),
                }
            }
            found
        }
        None => registry
            .all(minesite, model)
            .into_iter()
            .map(|u| u.unit.clone())
            .collect(),
    };

    if selected.is_empty() {
        bail!("No units selected");
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Unit;

    fn registry() -> UnitRegistry {
        let unit = |name: &str, model: &str, minesite: &str| Unit {
            unit: name.to_string(),
            serial: format!("S{}", name),
            model: model.to_string(),
            model_base: "980E".to_string(),
            minesite: minesite.to_string(),
        };
        UnitRegistry::new(vec![
            unit("F301", "980E-4", "FortHills"),
            unit("F302", "980E-5", "FortHills"),
            unit("F303", "980E-4", "FortHills"),
            unit("301", "930E-4", "BaseMine"),
        ])
    }

    #[test]
    fn test_resolve_all_with_filters() {
        let reg = registry();
        let units = resolve_units(&reg, &[], None, Some("FortHills"), Some("-4")).unwrap();
        assert_eq!(units, vec!["F301", "F303"]);
    }

    #[test]
    fn test_resolve_range_skips_unregistered() {
        let reg = registry();
        let units = resolve_units(&reg, &[], Some("F302-F305"), None, None).unwrap();
        assert_eq!(units, vec!["F302", "F303"]);
    }

    #[test]
    fn test_resolve_unknown_name_errors() {
        let reg = registry();
        assert!(resolve_units(&reg, &["F999".to_string()], None, None, None).is_err());
        assert!(resolve_units(&reg, &[], Some("bogus"), None, None).is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2021-03-04"), Ok(NaiveDate::from_ymd_opt(2021, 3, 4).unwrap()));
        assert!(parse_date("03/04/2021").is_err());
    }
}
