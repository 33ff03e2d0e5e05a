use std::str::FromStr;

use crate::error::ConfigError;

/// Read an env var, treating unset and blank values as absent.
pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.trim().is_empty() => Ok(None),
        Ok(val) => Ok(Some(val.trim().to_string())),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "not valid unicode".to_string(),
        }),
    }
}

/// Parse an optional env var, falling back to `default` when unset.
pub(crate) fn parse_optional_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_env(key)?.unwrap_or(default))
}

/// Parse an env var into `T`, `None` when unset.
pub(crate) fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)?
        .map(|s| {
            s.parse::<T>().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("'{s}': {e}"),
            })
        })
        .transpose()
}

/// Parse a boolean env var. Accepts `true/false`, `1/0`, `yes/no`, `on/off`.
pub(crate) fn parse_bool_env(key: &str, default: bool) -> Result<bool, ConfigError> {
    match optional_env(key)? {
        None => Ok(default),
        Some(s) => match s.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("must be 'true' or 'false', got '{s}'"),
            }),
        },
    }
}
