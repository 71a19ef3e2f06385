//! Deployment addresses
//!
//! Addresses are accepted in any casing that is either uniform or a valid
//! EIP-55 checksum, and are always stored checksummed.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::collections::BTreeMap;
use std::fmt;

/// A 20-byte account address in EIP-55 checksummed form
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Parse and checksum-normalize an address.
    ///
    /// Mixed-case input must already carry a correct checksum; all-lowercase
    /// and all-uppercase input is accepted as-is.
    pub fn parse(input: &str) -> std::result::Result<Self, String> {
        let hex = input
            .strip_prefix("0x")
            .ok_or_else(|| format!("`{input}` does not start with 0x"))?;

        if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("`{input}` is not 40 hexadecimal digits"));
        }

        let checksummed = to_checksum(hex);
        let uniform = hex == hex.to_ascii_lowercase() || hex == hex.to_ascii_uppercase();
        if !uniform && checksummed[2..] != *hex {
            return Err(format!(
                "`{input}` has an invalid checksum (expected {checksummed})"
            ));
        }

        Ok(Self(checksummed))
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

fn to_checksum(hex: &str) -> String {
    let lower = hex.to_ascii_lowercase();
    let hash = Keccak256::digest(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Address as written in configuration or artifacts, before validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAddress {
    Single(String),
    /// Chain id (decimal string key) to address
    PerChain(BTreeMap<String, String>),
}

/// A validated deployment address, either on one chain or keyed by chain id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AddressSpec {
    Single(Address),
    PerChain(BTreeMap<u64, Address>),
}

impl AddressSpec {
    pub fn parse(raw: &RawAddress) -> std::result::Result<Self, String> {
        match raw {
            RawAddress::Single(address) => Address::parse(address).map(AddressSpec::Single),
            RawAddress::PerChain(entries) => {
                if entries.is_empty() {
                    return Err("chain id map is empty".to_string());
                }

                let mut parsed = BTreeMap::new();
                for (chain_id, address) in entries {
                    let id = chain_id
                        .trim()
                        .parse::<u64>()
                        .ok()
                        .filter(|id| *id > 0)
                        .ok_or_else(|| format!("`{chain_id}` is not a valid chain id"))?;
                    parsed.insert(id, Address::parse(address)?);
                }
                Ok(AddressSpec::PerChain(parsed))
            }
        }
    }

    pub fn is_multichain(&self) -> bool {
        matches!(self, AddressSpec::PerChain(_))
    }
}
