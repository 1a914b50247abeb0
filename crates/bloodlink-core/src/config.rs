//! Library configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub eligibility: EligibilityPolicy,
}

/// Document store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// SQLite file path. Empty means in-memory.
    #[serde(default)]
    pub path: String,
    /// How long a writer waits on a competing transaction.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: String::new(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

/// Donation eligibility thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityPolicy {
    /// Minimum days between two donations
    #[serde(default = "default_min_interval_days")]
    pub min_interval_days: i64,
    /// Minimum body weight in kg
    #[serde(default = "default_min_weight_kg")]
    pub min_weight_kg: f64,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            min_interval_days: default_min_interval_days(),
            min_weight_kg: default_min_weight_kg(),
        }
    }
}

/// Longest wait window accepted from configuration.
pub const MAX_INTERVAL_DAYS: i64 = 3_650;

impl EligibilityPolicy {
    /// Reject thresholds that would make eligibility meaningless.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if !(0..=MAX_INTERVAL_DAYS).contains(&self.min_interval_days) {
            return Err(config::ConfigError::Message(format!(
                "eligibility.min_interval_days must be between 0 and {}, got {}",
                MAX_INTERVAL_DAYS, self.min_interval_days
            )));
        }
        if !self.min_weight_kg.is_finite() || self.min_weight_kg < 0.0 {
            return Err(config::ConfigError::Message(format!(
                "eligibility.min_weight_kg must be a finite non-negative number, got {}",
                self.min_weight_kg
            )));
        }
        Ok(())
    }
}

const fn default_busy_timeout_ms() -> u64 {
    5_000
}

const fn default_min_interval_days() -> i64 {
    56
}

const fn default_min_weight_kg() -> f64 {
    25.0
}

impl Settings {
    /// Load settings from files and environment variables.
    ///
    /// Sources, later ones winning:
    /// 1. `config/bloodlink.toml` (optional)
    /// 2. Environment variables with `BLOODLINK__` prefix (e.g. `BLOODLINK__STORE__PATH`)
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::build(config::File::with_name("config/bloodlink").required(false), "BLOODLINK")
    }

    /// Load settings from a specific file, still honoring environment overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        Self::build(config::File::from(path.as_ref()), "BLOODLINK")
    }

    fn build<S>(file: S, env_prefix: &str) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(env_prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Self = config.try_deserialize()?;
        settings.eligibility.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.eligibility.min_interval_days, 56);
        assert_eq!(settings.eligibility.min_weight_kg, 25.0);
        assert_eq!(settings.store.busy_timeout_ms, 5_000);
        assert!(settings.store.path.is_empty());
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[store]\npath = \"/tmp/bloodlink.db\"\n\n[eligibility]\nmin_weight_kg = 20.0").unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.store.path, "/tmp/bloodlink.db");
        assert_eq!(settings.store.busy_timeout_ms, 5_000);
        assert_eq!(settings.eligibility.min_weight_kg, 20.0);
        assert_eq!(settings.eligibility.min_interval_days, 56);
    }

    fn settings_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_env_overrides_file_and_defaults() {
        // Unique prefix keeps parallel tests from seeing these variables.
        std::env::set_var("BLOODLINK_ENV_TEST__ELIGIBILITY__MIN_INTERVAL_DAYS", "90");
        std::env::set_var("BLOODLINK_ENV_TEST__STORE__BUSY_TIMEOUT_MS", "250");

        let file = settings_file("[eligibility]\nmin_interval_days = 30\nmin_weight_kg = 20.0\n");
        let result = Settings::build(config::File::from(file.path()), "BLOODLINK_ENV_TEST");

        std::env::remove_var("BLOODLINK_ENV_TEST__ELIGIBILITY__MIN_INTERVAL_DAYS");
        std::env::remove_var("BLOODLINK_ENV_TEST__STORE__BUSY_TIMEOUT_MS");

        let settings = result.unwrap();
        assert_eq!(settings.eligibility.min_interval_days, 90);
        assert_eq!(settings.store.busy_timeout_ms, 250);
        assert_eq!(settings.eligibility.min_weight_kg, 20.0);
        assert!(settings.store.path.is_empty());
    }

    #[test]
    fn test_rejects_out_of_range_policy() {
        for contents in [
            "[eligibility]\nmin_interval_days = 200000000\n",
            "[eligibility]\nmin_interval_days = -1\n",
            "[eligibility]\nmin_weight_kg = -5.0\n",
        ] {
            let file = settings_file(contents);
            let result = Settings::from_file(file.path());
            assert!(
                matches!(result, Err(config::ConfigError::Message(_))),
                "accepted {:?}",
                contents
            );
        }

        let edge = EligibilityPolicy {
            min_interval_days: MAX_INTERVAL_DAYS,
            min_weight_kg: 0.0,
        };
        assert!(edge.validate().is_ok());
        let nan = EligibilityPolicy {
            min_weight_kg: f64::NAN,
            ..EligibilityPolicy::default()
        };
        assert!(nan.validate().is_err());
    }
}
