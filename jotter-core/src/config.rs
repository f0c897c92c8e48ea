//! Environment parsing helpers shared by the service configs.
//!
//! An unset or blank variable yields the default. A set variable that does
//! not parse is a `ConfigError`, never a silent fallback.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.filter(|s| !s.trim().is_empty())
}

/// Parse an optional raw value for `field`, falling back to `default`.
pub fn parse_or<T>(field: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match non_blank(raw) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            field: field.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

/// Read and parse the environment variable `field`.
pub fn env_or<T>(field: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    parse_or(field, std::env::var(field).ok(), default)
}

/// Read a whole number of seconds from the environment variable `field`.
pub fn env_secs(field: &str, default: Duration) -> Result<Duration, ConfigError> {
    env_or(field, default.as_secs()).map(Duration::from_secs)
}

/// Read a boolean flag. `true`/`1` and `false`/`0` are accepted, in any case.
pub fn env_flag(field: &str, default: bool) -> Result<bool, ConfigError> {
    parse_flag(field, std::env::var(field).ok(), default)
}

fn parse_flag(field: &str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match non_blank(raw) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                field: field.to_string(),
                value: raw.clone(),
                reason: "expected true or false".to_string(),
            }),
        },
    }
}

/// Reject a zero duration for `field`.
pub fn require_positive(field: &str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: format!("{:?}", value),
            reason: "must be greater than 0".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_and_blank_use_default() {
        assert_eq!(parse_or::<u16>("PORT", None, 5432).unwrap(), 5432);
        assert_eq!(parse_or::<u16>("PORT", Some("  ".to_string()), 5432).unwrap(), 5432);
    }

    #[test]
    fn test_valid_value_is_parsed() {
        assert_eq!(parse_or::<u16>("PORT", Some(" 6380 ".to_string()), 0).unwrap(), 6380);
    }

    #[test]
    fn test_unparsable_value_is_rejected() {
        let err = parse_or::<u16>("JOTTER_DB_PORT", Some("abc".to_string()), 5432).unwrap_err();
        let ConfigError::InvalidValue { field, value, .. } = err;
        assert_eq!(field, "JOTTER_DB_PORT");
        assert_eq!(value, "abc");
    }

    #[test]
    fn test_flag_parsing() {
        assert!(parse_flag("F", Some("TRUE".to_string()), false).unwrap());
        assert!(!parse_flag("F", Some("0".to_string()), true).unwrap());
        assert!(parse_flag("F", None, true).unwrap());
        assert!(parse_flag("F", Some("maybe".to_string()), true).is_err());
    }

    #[test]
    fn test_zero_duration_rejected() {
        assert!(require_positive("JOTTER_CACHE_TTL_SECS", Duration::ZERO).is_err());
        assert!(require_positive("JOTTER_CACHE_TTL_SECS", Duration::from_secs(1)).is_ok());
    }
}
