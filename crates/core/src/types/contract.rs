use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Abi, AddressSpec, RawAddress};

/// A contract as supplied by configuration or by a plugin, before validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDefinition {
    pub name: String,
    pub abi: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<RawAddress>,
}

impl ContractDefinition {
    pub fn new(name: impl Into<String>, abi: Value) -> Self {
        Self {
            name: name.into(),
            abi,
            address: None,
        }
    }

    pub fn with_address(mut self, address: RawAddress) -> Self {
        self.address = Some(address);
        self
    }
}

/// Identifier names rendered for a contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractMeta {
    pub abi_name: String,
    pub address_name: Option<String>,
    pub config_name: Option<String>,
}

/// A resolved contract with its pre-rendered source fragment.
///
/// Never mutated after resolution; a changed definition produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contract {
    pub name: String,
    pub abi: Abi,
    pub address: Option<AddressSpec>,
    pub content: String,
    pub meta: ContractMeta,
}
