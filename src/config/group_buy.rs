//! Group-buy rules loaded from config.toml
//!
//! The `[group_buy]` table of the configuration file sets the target size of
//! new pools, the default discount, the advertised pool duration and how long
//! issued vouchers stay valid. Every key is optional.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    /// Rules applied to new pools
    #[serde(default)]
    pub group_buy: GroupBuySettings,
}

/// Rules applied when pools are opened and completed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GroupBuySettings {
    /// Number of members at which a new pool completes
    pub target_count: u32,
    /// Discount used when the opener does not choose one, in percent
    pub default_discount_rate: i32,
    /// Hours between opening a pool and its advertised end time
    pub pool_duration_hours: i64,
    /// Calendar months a voucher stays valid
    pub voucher_validity_months: u32,
}

impl Default for GroupBuySettings {
    fn default() -> Self {
        Self {
            target_count: 5,
            default_discount_rate: 20,
            pool_duration_hours: 24,
            voucher_validity_months: 3,
        }
    }
}

impl GroupBuySettings {
    /// Checks that every value is usable.
    ///
    /// # Errors
    /// Returns [`Error::Config`] naming the first invalid key.
    pub fn validate(&self) -> Result<()> {
        if self.target_count == 0 {
            return Err(config_error("target_count must be at least 1"));
        }
        if i32::try_from(self.target_count).is_err() {
            return Err(config_error("target_count is too large"));
        }
        if !(0..=100).contains(&self.default_discount_rate) {
            return Err(config_error("default_discount_rate must be between 0 and 100"));
        }
        if self.pool_duration_hours <= 0 {
            return Err(config_error("pool_duration_hours must be positive"));
        }
        if self.voucher_validity_months == 0 {
            return Err(config_error("voucher_validity_months must be at least 1"));
        }
        Ok(())
    }
}

fn config_error(message: &str) -> Error {
    Error::Config {
        message: message.to_string(),
    }
}

/// Parses and validates configuration from TOML text.
///
/// # Errors
/// Returns an error if the TOML is malformed or a value is out of range.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.group_buy.validate()?;
    Ok(config)
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A value is out of range
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;
    parse_config(&contents)
}

/// Loads configuration from `GROUPBUY_CONFIG` (default `./config.toml`),
/// falling back to the built-in defaults when the file does not exist.
///
/// # Errors
/// Returns an error if the file exists but cannot be parsed or validated.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var("GROUPBUY_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    if !Path::new(&path).exists() {
        warn!("{} not found, using default group-buy settings", path);
        return Ok(AppConfig::default());
    }
    load_config(path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_group_buy_config() {
        let toml_str = r"
            [group_buy]
            target_count = 3
            default_discount_rate = 15
            pool_duration_hours = 48
            voucher_validity_months = 6
        ";

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.group_buy.target_count, 3);
        assert_eq!(config.group_buy.default_discount_rate, 15);
        assert_eq!(config.group_buy.pool_duration_hours, 48);
        assert_eq!(config.group_buy.voucher_validity_months, 6);
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let config = parse_config("[group_buy]\ntarget_count = 2\n").unwrap();
        assert_eq!(config.group_buy.target_count, 2);
        assert_eq!(config.group_buy.default_discount_rate, 20);
        assert_eq!(config.group_buy.pool_duration_hours, 24);

        let empty = parse_config("").unwrap();
        assert_eq!(empty.group_buy, GroupBuySettings::default());
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            parse_config("[group_buy]\ntarget_count = 0\n"),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            parse_config("[group_buy]\ndefault_discount_rate = 120\n"),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            parse_config("[group_buy\n"),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("definitely/not/here.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
