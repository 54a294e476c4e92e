//! Configuration de l'application, lue depuis l'environnement (et `.env`)

use std::{env, path::PathBuf};

use chrono::Duration;
use log::LevelFilter;
use thiserror::Error;

const DEV_SECRET: &str = "development-secret-change-me";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid value for {var}: {value:?}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_file: PathBuf,
    pub log_file: PathBuf,
    pub log_level: LevelFilter,
    pub token_secret: String,
    pub token_ttl_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_file: "database.json".into(),
            log_file: "hospital.log".into(),
            log_level: LevelFilter::Info,
            token_secret: DEV_SECRET.to_string(),
            token_ttl_days: 7,
        }
    }
}

impl Config {
    /// Charge `.env` s'il existe, puis lit les variables `HOSPITAL_*`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Construit la configuration à partir d'une source de variables
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(path) = lookup("HOSPITAL_DB_FILE") {
            config.db_file = non_empty("HOSPITAL_DB_FILE", path)?.into();
        }
        if let Some(path) = lookup("HOSPITAL_LOG_FILE") {
            config.log_file = non_empty("HOSPITAL_LOG_FILE", path)?.into();
        }
        if let Some(level) = lookup("HOSPITAL_LOG_LEVEL") {
            config.log_level = level.trim().parse().map_err(|_| ConfigError {
                var: "HOSPITAL_LOG_LEVEL",
                value: level,
            })?;
        }
        if let Some(secret) = lookup("HOSPITAL_TOKEN_SECRET") {
            config.token_secret = non_empty("HOSPITAL_TOKEN_SECRET", secret)?;
        }
        if let Some(days) = lookup("HOSPITAL_TOKEN_TTL_DAYS") {
            config.token_ttl_days = match days.trim().parse::<i64>() {
                Ok(days) if days > 0 => days,
                _ => {
                    return Err(ConfigError {
                        var: "HOSPITAL_TOKEN_TTL_DAYS",
                        value: days,
                    })
                }
            };
        }

        Ok(config)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::days(self.token_ttl_days)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.token_secret == DEV_SECRET
    }
}

fn non_empty(var: &'static str, value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError { var, value })
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.db_file, PathBuf::from("database.json"));
        assert_eq!(config.log_level, LevelFilter::Info);
        assert_eq!(config.token_ttl(), Duration::days(7));
        assert!(config.uses_dev_secret());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("HOSPITAL_DB_FILE", "/tmp/hospital.json"),
            ("HOSPITAL_LOG_LEVEL", "debug"),
            ("HOSPITAL_TOKEN_SECRET", "s3cret"),
            ("HOSPITAL_TOKEN_TTL_DAYS", "1"),
        ]))
        .unwrap();

        assert_eq!(config.db_file, PathBuf::from("/tmp/hospital.json"));
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert_eq!(config.token_secret, "s3cret");
        assert!(!config.uses_dev_secret());
        assert_eq!(config.token_ttl(), Duration::days(1));
    }

    #[test]
    fn test_bad_values_name_the_variable() {
        let err = Config::from_lookup(lookup(&[("HOSPITAL_TOKEN_TTL_DAYS", "-3")])).unwrap_err();
        assert_eq!(err.var, "HOSPITAL_TOKEN_TTL_DAYS");

        let err = Config::from_lookup(lookup(&[("HOSPITAL_LOG_LEVEL", "loud")])).unwrap_err();
        assert_eq!(err.var, "HOSPITAL_LOG_LEVEL");

        let err = Config::from_lookup(lookup(&[("HOSPITAL_TOKEN_SECRET", " ")])).unwrap_err();
        assert!(err.to_string().contains("HOSPITAL_TOKEN_SECRET"));
    }
}
