//! Runtime settings.
//!
//! Resolution order: CLI flag, then environment (a `.env` file is loaded first),
//! then the built-in default.

use std::path::PathBuf;

use crate::domain::DEFAULT_CRITICAL_LABEL;

pub const ENV_SOURCE: &str = "INCIDENT_SOURCE";
pub const ENV_SHEET: &str = "INCIDENT_SHEET";
pub const ENV_DB: &str = "INCIDENT_DB";
pub const ENV_CRITICAL_LABEL: &str = "INCIDENT_CRITICAL_LABEL";

pub const DEFAULT_SOURCE: &str = "Dashboard_Securite.xlsx";
pub const DEFAULT_SHEET: &str = "Données";
pub const DEFAULT_DB: &str = "securite.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub source: PathBuf,
    pub sheet: String,
    pub db: PathBuf,
    pub critical_label: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: PathBuf::from(DEFAULT_SOURCE),
            sheet: DEFAULT_SHEET.to_string(),
            db: PathBuf::from(DEFAULT_DB),
            critical_label: DEFAULT_CRITICAL_LABEL.to_string(),
        }
    }
}

impl Settings {
    /// Defaults overridden by the process environment (and `.env`).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();
        Self {
            source: var(ENV_SOURCE).map(PathBuf::from).unwrap_or(defaults.source),
            sheet: var(ENV_SHEET).unwrap_or(defaults.sheet),
            db: var(ENV_DB).map(PathBuf::from).unwrap_or(defaults.db),
            critical_label: var(ENV_CRITICAL_LABEL).unwrap_or(defaults.critical_label),
        }
    }

    /// Apply command-line overrides.
    pub fn with_overrides(
        mut self,
        source: Option<PathBuf>,
        sheet: Option<String>,
        db: Option<PathBuf>,
        critical_label: Option<String>,
    ) -> Self {
        if let Some(source) = source {
            self.source = source;
        }
        if let Some(sheet) = sheet {
            self.sheet = sheet;
        }
        if let Some(db) = db {
            self.db = db;
        }
        if let Some(label) = critical_label {
            self.critical_label = label;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn environment_overrides_defaults() {
        let env: HashMap<&str, &str> = [(ENV_DB, "/tmp/x.db"), (ENV_SHEET, "  "), (ENV_CRITICAL_LABEL, "Vol")]
            .into_iter()
            .collect();
        let s = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(s.db, PathBuf::from("/tmp/x.db"));
        // Blank values fall back to the default.
        assert_eq!(s.sheet, DEFAULT_SHEET);
        assert_eq!(s.critical_label, "Vol");
        assert_eq!(s.source, PathBuf::from(DEFAULT_SOURCE));
    }

    #[test]
    fn flags_win_over_environment() {
        let s = Settings::default().with_overrides(None, None, Some(PathBuf::from("other.db")), None);
        assert_eq!(s.db, PathBuf::from("other.db"));
        assert_eq!(s.sheet, DEFAULT_SHEET);
    }
}
