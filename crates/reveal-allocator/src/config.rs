//! # Reveal Configuration
//!
//! Deployment parameters of one allocator instance.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RV_OWNER` | `0x00..01` | Privileged caller (pool init, owner reveal) |
//! | `RV_ALLOCATOR_ADDRESS` | `0x00..0a` | Identity presented to the registry mirror |
//! | `RV_ORACLE_ADDRESS` | `0x00..0b` | Only caller allowed to deliver randomness |
//! | `RV_KEY_HASH` | zero | Oracle key hash |
//! | `RV_SUBSCRIPTION_ID` | `1` | Oracle subscription |
//! | `RV_REQUEST_CONFIRMATIONS` | `3` | Confirmations before fulfillment |
//! | `RV_CALLBACK_GAS_LIMIT` | `2500000` | Fulfillment gas budget |
//! | `RV_MAX_SUPPLY` | `10000` | Upper bound for the pool size |
//! | `RV_MAX_BATCH_SIZE` | `100` | Items per reveal request |
//! | `RV_INDEX_BASE` | `0` | First pool index (`0` or `1`) |

use crate::domain::pool::IndexBase;
use crate::domain::value_objects::{Address, Hash};
use std::env;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid value for {name}: {value:?}")]
    InvalidVar {
        /// Variable name.
        name: &'static str,
        /// Value that failed to parse.
        value: String,
    },

    /// A required address is the zero address.
    #[error("{0} must not be the zero address")]
    ZeroAddress(&'static str),

    /// A limit is zero.
    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),
}

/// Parameters forwarded to the randomness oracle with every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleRequestParams {
    /// Key hash selecting the oracle's proving key.
    pub key_hash: Hash,
    /// Billing subscription.
    pub subscription_id: u64,
    /// Confirmations the oracle waits before fulfilling.
    pub request_confirmations: u16,
    /// Gas budget for the fulfillment callback.
    pub callback_gas_limit: u32,
}

impl Default for OracleRequestParams {
    fn default() -> Self {
        Self {
            key_hash: Hash::ZERO,
            subscription_id: 1,
            request_confirmations: 3,
            callback_gas_limit: 2_500_000,
        }
    }
}

/// Complete allocator configuration.
#[derive(Debug, Clone)]
pub struct RevealConfig {
    /// Privileged caller.
    pub owner: Address,
    /// Identity of this allocator towards the registry mirror.
    pub allocator_address: Address,
    /// Only address allowed to call `on_fulfill`.
    pub oracle_address: Address,
    /// Oracle request parameters.
    pub oracle: OracleRequestParams,
    /// Declared total supply of distinct content variants.
    pub max_supply: u64,
    /// Maximum items per reveal request.
    pub max_batch_size: usize,
    /// First index of the pool range.
    pub index_base: IndexBase,
    /// Re-check domain invariants after every commit.
    pub check_invariants: bool,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            owner: address_from_low_byte(0x01),
            allocator_address: address_from_low_byte(0x0a),
            oracle_address: address_from_low_byte(0x0b),
            oracle: OracleRequestParams::default(),
            max_supply: 10_000,
            max_batch_size: 100,
            index_base: IndexBase::Zero,
            check_invariants: cfg!(debug_assertions),
        }
    }
}

impl RevealConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// `InvalidVar` for unparsable values, or any [`validate`](Self::validate) error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// `InvalidVar` for unparsable values, or any [`validate`](Self::validate) error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("RV_OWNER") {
            config.owner = parse_address("RV_OWNER", &v)?;
        }
        if let Some(v) = lookup("RV_ALLOCATOR_ADDRESS") {
            config.allocator_address = parse_address("RV_ALLOCATOR_ADDRESS", &v)?;
        }
        if let Some(v) = lookup("RV_ORACLE_ADDRESS") {
            config.oracle_address = parse_address("RV_ORACLE_ADDRESS", &v)?;
        }
        if let Some(v) = lookup("RV_KEY_HASH") {
            config.oracle.key_hash = Hash::from_hex(&v).ok_or(ConfigError::InvalidVar {
                name: "RV_KEY_HASH",
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup("RV_SUBSCRIPTION_ID") {
            config.oracle.subscription_id = parse_number("RV_SUBSCRIPTION_ID", &v)?;
        }
        if let Some(v) = lookup("RV_REQUEST_CONFIRMATIONS") {
            config.oracle.request_confirmations = parse_number("RV_REQUEST_CONFIRMATIONS", &v)?;
        }
        if let Some(v) = lookup("RV_CALLBACK_GAS_LIMIT") {
            config.oracle.callback_gas_limit = parse_number("RV_CALLBACK_GAS_LIMIT", &v)?;
        }
        if let Some(v) = lookup("RV_MAX_SUPPLY") {
            config.max_supply = parse_number("RV_MAX_SUPPLY", &v)?;
        }
        if let Some(v) = lookup("RV_MAX_BATCH_SIZE") {
            config.max_batch_size = parse_number("RV_MAX_BATCH_SIZE", &v)?;
        }
        if let Some(v) = lookup("RV_INDEX_BASE") {
            config.index_base = match v.trim() {
                "0" => IndexBase::Zero,
                "1" => IndexBase::One,
                _ => {
                    return Err(ConfigError::InvalidVar {
                        name: "RV_INDEX_BASE",
                        value: v.clone(),
                    })
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration before the coordinator is built.
    ///
    /// # Errors
    ///
    /// `ZeroAddress` for an unset owner or oracle, `ZeroLimit` for zero limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.owner.is_zero() {
            return Err(ConfigError::ZeroAddress("owner"));
        }
        if self.oracle_address.is_zero() {
            return Err(ConfigError::ZeroAddress("oracle_address"));
        }
        if self.max_supply == 0 {
            return Err(ConfigError::ZeroLimit("max_supply"));
        }
        if self.max_batch_size == 0 {
            return Err(ConfigError::ZeroLimit("max_batch_size"));
        }
        if self.oracle.callback_gas_limit == 0 {
            return Err(ConfigError::ZeroLimit("callback_gas_limit"));
        }
        Ok(())
    }
}

fn address_from_low_byte(byte: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = byte;
    Address::new(bytes)
}

fn parse_address(name: &'static str, value: &str) -> Result<Address, ConfigError> {
    Address::from_hex(value.trim()).ok_or_else(|| ConfigError::InvalidVar {
        name,
        value: value.to_string(),
    })
}

fn parse_number<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidVar {
        name,
        value: value.to_string(),
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_is_valid() {
        assert!(RevealConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = RevealConfig::from_lookup(lookup_from(&[
            ("RV_OWNER", "0x00000000000000000000000000000000000000aa"),
            ("RV_MAX_SUPPLY", "10"),
            ("RV_MAX_BATCH_SIZE", " 4 "),
            ("RV_INDEX_BASE", "1"),
            ("RV_SUBSCRIPTION_ID", "77"),
        ]))
        .unwrap();

        assert_eq!(config.owner.0[19], 0xaa);
        assert_eq!(config.max_supply, 10);
        assert_eq!(config.max_batch_size, 4);
        assert_eq!(config.index_base, IndexBase::One);
        assert_eq!(config.oracle.subscription_id, 77);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = RevealConfig::from_lookup(lookup_from(&[("RV_MAX_SUPPLY", "ten")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidVar {
                name: "RV_MAX_SUPPLY",
                value: "ten".to_string()
            }
        );

        let err = RevealConfig::from_lookup(lookup_from(&[("RV_INDEX_BASE", "2")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { name: "RV_INDEX_BASE", .. }));
    }

    #[test]
    fn test_validate_zero_values() {
        let err = RevealConfig::from_lookup(lookup_from(&[(
            "RV_OWNER",
            "0x0000000000000000000000000000000000000000",
        )]))
        .unwrap_err();
        assert_eq!(err, ConfigError::ZeroAddress("owner"));

        let config = RevealConfig {
            max_batch_size: 0,
            ..RevealConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroLimit("max_batch_size")));
    }
}
