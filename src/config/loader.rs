//! Configuration loading from disk and environment.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{DatabaseConfig, TelemetryConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "TELEMETRY_CONFIG";

/// Used when neither the CLI nor the environment names a file.
pub const DEFAULT_CONFIG_PATH: &str = "telemetry.toml";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve the config path: explicit argument, then `$TELEMETRY_CONFIG`, then the default.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load, apply environment overrides, and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<TelemetryConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&content, |key| std::env::var(key).ok())?;

    tracing::debug!(path = %path.display(), "Configuration file parsed");
    Ok(config)
}

/// Parse TOML text, overlay environment values read through `env`, and validate.
pub fn parse_config<F>(content: &str, env: F) -> Result<TelemetryConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: TelemetryConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, env);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay environment variables on top of file values.
///
/// `POSTGRES_HOST` alone is enough to enable the database section.
pub fn apply_env_overrides<F>(config: &mut TelemetryConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(bind) = env("TELEMETRY_BIND_ADDRESS") {
        config.listener.bind_address = bind;
    }

    let host = env("POSTGRES_HOST");
    if config.database.is_none() && host.is_none() {
        return;
    }

    let db = config.database.get_or_insert_with(DatabaseConfig::default);
    if let Some(host) = host {
        db.host = host;
    }
    if let Some(port) = env("POSTGRES_PORT") {
        match port.parse() {
            Ok(port) => db.port = port,
            Err(_) => tracing::warn!(value = %port, "Ignoring invalid POSTGRES_PORT"),
        }
    }
    if let Some(user) = env("POSTGRES_USER") {
        db.user = user;
    }
    if let Some(password) = env("POSTGRES_PASSWORD") {
        db.password = password;
    }
    if let Some(database) = env("POSTGRES_DATABASE") {
        db.database = database;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_enables_database() {
        let config = parse_config(
            "",
            env_from(&[
                ("POSTGRES_HOST", "pg.internal"),
                ("POSTGRES_PORT", "5432"),
                ("POSTGRES_USER", "reader"),
            ]),
        )
        .unwrap();

        let db = config.database.unwrap();
        assert_eq!(db.host, "pg.internal");
        assert_eq!(db.port, 5432);
        assert_eq!(db.user, "reader");
    }

    #[test]
    fn test_no_database_without_host() {
        let config = parse_config("", env_from(&[("POSTGRES_USER", "reader")])).unwrap();
        assert!(config.database.is_none());
    }

    #[test]
    fn test_invalid_port_keeps_file_value() {
        let config = parse_config(
            "[database]\nport = 6000\n",
            env_from(&[("POSTGRES_PORT", "not-a-port")]),
        )
        .unwrap();
        assert_eq!(config.database.unwrap().port, 6000);
    }

    #[test]
    fn test_validation_errors_surface() {
        let err = parse_config(
            "[providers]\n\"1\" = \"not a url\"\n",
            env_from(&[]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("Validation failed"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
