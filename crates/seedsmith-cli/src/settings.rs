use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use seedsmith_seed::{AllocatorOptions, Locale, SeedDefaults};

use crate::error::CliResult;

pub const DEFAULT_SETTINGS_FILE: &str = "seedsmith.toml";
pub const PRODUCTION_ENV: &str = "prod";

/// Contents of `seedsmith.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub database_url: Option<String>,
    pub environment: String,
    pub num_rows: Option<u64>,
    pub skip_truncate: Option<bool>,
    pub seeder_path: PathBuf,
    pub locale: Locale,
    /// Fixed RNG seed for reproducible data.
    pub seed: Option<u64>,
    pub max_rows_per_statement: Option<usize>,
    pub max_attempts_per_row: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: None,
            environment: "dev".to_string(),
            num_rows: None,
            skip_truncate: None,
            seeder_path: PathBuf::from("seeders"),
            locale: Locale::default(),
            seed: None,
            max_rows_per_statement: None,
            max_attempts_per_row: None,
        }
    }
}

impl Settings {
    /// Read `path` if it exists, then apply environment overrides.
    pub fn load(path: &Path) -> CliResult<Self> {
        let settings = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            debug!(event = "settings_loaded", path = %path.display());
            Self::parse(&content)?
        } else {
            debug!(event = "settings_missing", path = %path.display());
            Self::default()
        };
        Ok(settings.with_env(|key| std::env::var(key).ok()))
    }

    pub fn parse(content: &str) -> CliResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// `SEEDSMITH_DATABASE_URL` beats `DATABASE_URL`; `SEEDSMITH_ENV`
    /// replaces the environment name.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("SEEDSMITH_DATABASE_URL").or_else(|| lookup("DATABASE_URL")) {
            self.database_url = Some(url);
        }
        if let Some(env) = lookup("SEEDSMITH_ENV") {
            self.environment = env;
        }
        self
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case(PRODUCTION_ENV)
    }

    pub fn seed_defaults(&self) -> SeedDefaults {
        let mut allocator = AllocatorOptions::default();
        if let Some(max) = self.max_attempts_per_row {
            allocator.max_attempts_per_row = max;
        }
        SeedDefaults {
            row_count: self.num_rows,
            skip_truncate: self.skip_truncate,
            max_rows_per_statement: self.max_rows_per_statement,
            allocator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_key() {
        let settings = Settings::parse(
            r#"
            database_url = "sqlite://seed.db"
            environment = "test"
            num_rows = 25
            skip_truncate = true
            seeder_path = "db/seeders"
            locale = "pt_BR"
            seed = 42
            max_rows_per_statement = 500
            max_attempts_per_row = 10
            "#,
        )
        .unwrap();

        assert_eq!(settings.database_url.as_deref(), Some("sqlite://seed.db"));
        assert_eq!(settings.locale, Locale::PtBr);
        assert_eq!(settings.seeder_path, PathBuf::from("db/seeders"));

        let defaults = settings.seed_defaults();
        assert_eq!(defaults.row_count, Some(25));
        assert_eq!(defaults.skip_truncate, Some(true));
        assert_eq!(defaults.max_rows_per_statement, Some(500));
        assert_eq!(defaults.allocator.max_attempts_per_row, 10);
    }

    #[test]
    fn empty_file_yields_defaults() {
        let settings = Settings::parse("").unwrap();
        assert_eq!(settings, Settings::default());
        assert!(!settings.is_production());
        assert_eq!(settings.seed_defaults().row_count, None);
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(Settings::parse("rows = 3").is_err());
    }

    #[test]
    fn environment_variables_override_file() {
        let settings = Settings::parse("database_url = \"sqlite::memory:\"")
            .unwrap()
            .with_env(|key| match key {
                "DATABASE_URL" => Some("mysql://fallback".to_string()),
                "SEEDSMITH_DATABASE_URL" => Some("postgres://primary".to_string()),
                "SEEDSMITH_ENV" => Some("PROD".to_string()),
                _ => None,
            });

        assert_eq!(settings.database_url.as_deref(), Some("postgres://primary"));
        assert!(settings.is_production());
    }

    #[test]
    fn missing_file_loads_defaults() {
        let settings = Settings::load(Path::new("/nonexistent/seedsmith.toml")).unwrap();
        assert_eq!(settings.seeder_path, PathBuf::from("seeders"));
    }
}
