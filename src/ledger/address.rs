//! Validated account addresses and transfer amounts

use crate::crypto::validate_address;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Strings shorter than this are rejected before the format check runs
pub const MIN_ADDRESS_LEN: usize = 5;

/// Predicate deciding whether a string is a well-formed address
pub trait AddressFormat: Send + Sync {
    fn is_valid(&self, raw: &str) -> bool;
}

/// Base58Check addresses: version byte, public key hash and a 4-byte checksum
#[derive(Debug, Clone, Copy, Default)]
pub struct Base58Check;

impl AddressFormat for Base58Check {
    fn is_valid(&self, raw: &str) -> bool {
        validate_address(raw)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("address is not valid")]
pub struct InvalidAddress;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("must be a positive integer")]
pub struct InvalidAmount;

/// An address that passed validation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Validate `raw`; the length check short-circuits the format predicate
    pub fn parse(raw: &str, format: &dyn AddressFormat) -> Result<Self, InvalidAddress> {
        if raw.len() < MIN_ADDRESS_LEN || !format.is_valid(raw) {
            return Err(InvalidAddress);
        }
        Ok(Self(raw.to_string()))
    }

    /// Wrap an address produced by the key store itself
    pub(crate) fn from_trusted(raw: String) -> Self {
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accept strictly positive amounts only
pub fn parse_amount(raw: i64) -> Result<u64, InvalidAmount> {
    u64::try_from(raw)
        .ok()
        .filter(|&amount| amount > 0)
        .ok_or(InvalidAmount)
}
