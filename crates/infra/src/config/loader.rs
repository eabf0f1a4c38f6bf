//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Probe the standard locations for a config file
//! 2. Parse it by extension (`.toml` or `.json`); missing fields take their
//!    defaults, and no file at all means all defaults
//! 3. Apply `WAVELINK_*` environment overrides
//! 4. Validate the result
//!
//! ## Environment Variables
//! Every field can be overridden by its upper-cased name with the
//! `WAVELINK_` prefix, e.g. `WAVELINK_MAX_RECONNECT_ATTEMPTS=8` or
//! `WAVELINK_REQUEST_TIMEOUT_MS=5000`.
//!
//! ## File Locations
//! The loader probes the following names, in order, in the current working
//! directory, then its parent and grandparent, then next to the executable:
//! `wavelink.toml`, `wavelink.json`, `config.toml`, `config.json`.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use wavelink_domain::constants::ENV_PREFIX;
use wavelink_domain::{ChannelConfig, Result, WavelinkError};

const FILE_NAMES: [&str; 4] = ["wavelink.toml", "wavelink.json", "config.toml", "config.json"];

/// Load configuration from the first config file found (if any), then
/// apply environment overrides and validate.
///
/// # Errors
/// Returns `WavelinkError::Config` if a file exists but cannot be read or
/// parsed, an override is malformed, or validation fails.
pub fn load() -> Result<ChannelConfig> {
    let mut config = match probe_config_paths() {
        Some(path) => read_config(&path)?,
        None => {
            tracing::debug!("No config file found, using defaults");
            ChannelConfig::default()
        }
    };

    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations and fails when
/// nothing is found. Environment overrides are applied on top.
///
/// # Errors
/// Returns `WavelinkError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Validation fails
pub fn load_from_file(path: Option<PathBuf>) -> Result<ChannelConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(WavelinkError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            WavelinkError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    let mut config = read_config(&config_path)?;
    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<ChannelConfig> {
    tracing::info!(path = %path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| WavelinkError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<ChannelConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| WavelinkError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| WavelinkError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(WavelinkError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend(cwd.ancestors().take(3).map(Path::to_path_buf));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots.iter().find_map(|root| find_config_in(root))
}

/// First standard config file name present directly in `dir`
pub fn find_config_in(dir: &Path) -> Option<PathBuf> {
    FILE_NAMES.iter().map(|name| dir.join(name)).find(|path| path.is_file())
}

/// Apply `WAVELINK_*` overrides from the process environment.
///
/// # Errors
/// Returns `WavelinkError::Config` naming the variable if a value does not
/// parse.
pub fn apply_env_overrides(config: &mut ChannelConfig) -> Result<()> {
    apply_overrides(config, |key| std::env::var(key).ok())
}

/// Apply overrides from an arbitrary lookup keyed by full variable name.
pub fn apply_overrides<F>(config: &mut ChannelConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    override_field(&lookup, "base_reconnect_delay_ms", &mut config.base_reconnect_delay_ms)?;
    override_field(&lookup, "max_reconnect_delay_ms", &mut config.max_reconnect_delay_ms)?;
    override_field(&lookup, "max_reconnect_attempts", &mut config.max_reconnect_attempts)?;
    override_field(&lookup, "max_request_retries", &mut config.max_request_retries)?;
    override_field(&lookup, "base_retry_delay_ms", &mut config.base_retry_delay_ms)?;
    override_field(&lookup, "request_timeout_ms", &mut config.request_timeout_ms)?;
    override_field(
        &lookup,
        "credential_expiry_leeway_secs",
        &mut config.credential_expiry_leeway_secs,
    )?;
    override_field(&lookup, "error_log_capacity", &mut config.error_log_capacity)?;
    Ok(())
}

fn override_field<F, T>(lookup: &F, field: &str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let key = format!("{ENV_PREFIX}{}", field.to_ascii_uppercase());
    let Some(raw) = lookup(&key) else {
        return Ok(());
    };

    *target = raw
        .trim()
        .parse()
        .map_err(|e| WavelinkError::Config(format!("Invalid value for {key}: {e}")))?;
    tracing::debug!(key = %key, "Applied environment override");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_overrides_replace_only_named_fields() {
        let mut config = ChannelConfig::default();
        apply_overrides(
            &mut config,
            lookup(&[
                ("WAVELINK_MAX_RECONNECT_ATTEMPTS", "8"),
                ("WAVELINK_REQUEST_TIMEOUT_MS", " 2500 "),
            ]),
        )
        .unwrap();

        assert_eq!(config.max_reconnect_attempts, 8);
        assert_eq!(config.request_timeout_ms, 2500);
        assert_eq!(config.base_reconnect_delay_ms, ChannelConfig::default().base_reconnect_delay_ms);
    }

    #[test]
    fn test_malformed_override_names_the_variable() {
        let mut config = ChannelConfig::default();
        let err = apply_overrides(&mut config, lookup(&[("WAVELINK_ERROR_LOG_CAPACITY", "lots")]))
            .unwrap_err();

        match err {
            WavelinkError::Config(message) => {
                assert!(message.contains("WAVELINK_ERROR_LOG_CAPACITY"));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_by_extension() {
        let toml = parse_config("max_request_retries = 1\n", Path::new("wavelink.toml")).unwrap();
        assert_eq!(toml.max_request_retries, 1);

        let json = parse_config(r#"{"max_request_retries": 2}"#, Path::new("config.json")).unwrap();
        assert_eq!(json.max_request_retries, 2);

        let err = parse_config("", Path::new("config.yaml")).unwrap_err();
        assert!(matches!(err, WavelinkError::Config(_)));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = parse_config("max_request_retries = [", Path::new("wavelink.toml")).unwrap_err();
        match err {
            WavelinkError::Config(message) => assert!(message.contains("TOML")),
            other => panic!("expected config error, got {other:?}"),
        }
    }
}
