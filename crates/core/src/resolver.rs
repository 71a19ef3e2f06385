//! Contract resolution
//!
//! Turns a raw [`ContractDefinition`] into a validated [`Contract`] with its
//! source fragment rendered. Resolution is pure: the same definition always
//! renders byte-identical output.

use crate::{
    error::{Error, Result},
    types::{Abi, AddressSpec, Contract, ContractDefinition, ContractMeta},
};
use tracing::debug;

/// Validate a definition and render its constants.
///
/// `is_typescript` controls whether constants carry an `as const` suffix.
pub fn resolve(definition: &ContractDefinition, is_typescript: bool) -> Result<Contract> {
    let abi = Abi::parse(&definition.abi).map_err(|violations| Error::InvalidAbi {
        contract: definition.name.clone(),
        violations,
    })?;

    let address = definition
        .address
        .as_ref()
        .map(AddressSpec::parse)
        .transpose()
        .map_err(|reason| Error::InvalidAddress {
            contract: definition.name.clone(),
            reason,
        })?;

    let base = identifier_base(&definition.name);
    let meta = ContractMeta {
        abi_name: format!("{base}ABI"),
        address_name: address.as_ref().map(|_| format!("{base}Address")),
        config_name: address.as_ref().map(|_| format!("{base}Config")),
    };

    let content = render(&abi, address.as_ref(), &meta, is_typescript)?;
    debug!("Resolved contract {} as {}", definition.name, meta.abi_name);

    Ok(Contract {
        name: definition.name.clone(),
        abi,
        address,
        content,
        meta,
    })
}

fn render(
    abi: &Abi,
    address: Option<&AddressSpec>,
    meta: &ContractMeta,
    is_typescript: bool,
) -> Result<String> {
    let suffix = if is_typescript { " as const" } else { "" };
    let docs = address.map(render_docs);
    let abi_json = serde_json::to_string_pretty(abi)?;

    let mut content = String::new();
    if let Some(ref docs) = docs {
        content.push_str(docs);
    }
    content.push_str(&format!(
        "export const {} = {abi_json}{suffix}\n",
        meta.abi_name
    ));

    if let (Some(address), Some(address_name), Some(config_name), Some(docs)) =
        (address, &meta.address_name, &meta.config_name, &docs)
    {
        content.push('\n');
        content.push_str(docs);
        content.push_str(&format!(
            "export const {address_name} = {}{suffix}\n",
            render_address(address)
        ));
        content.push('\n');
        content.push_str(docs);
        content.push_str(&format!(
            "export const {config_name} = {{ address: {address_name}, abi: {} }}{suffix}\n",
            meta.abi_name
        ));
    }

    Ok(content)
}

fn render_address(address: &AddressSpec) -> String {
    match address {
        AddressSpec::Single(address) => format!("'{address}'"),
        AddressSpec::PerChain(addresses) => {
            let mut out = String::from("{\n");
            for (chain_id, address) in addresses {
                out.push_str(&format!("  {chain_id}: '{address}',\n"));
            }
            out.push('}');
            out
        }
    }
}

fn render_docs(address: &AddressSpec) -> String {
    match address {
        AddressSpec::Single(address) => format!("/**\n * Deployed at {address}\n */\n"),
        AddressSpec::PerChain(addresses) => {
            let mut out = String::from("/**\n * Deployments:\n");
            for (chain_id, address) in addresses {
                out.push_str(&format!(" * - chain {chain_id}: {address}\n"));
            }
            out.push_str(" */\n");
            out
        }
    }
}

/// Derive the identifier base for a contract name by camel-casing it.
///
/// Words split on non-alphanumeric characters, on lower-to-upper transitions
/// and at the end of an uppercase run: `ERC20Token` becomes `erc20Token`,
/// `my-token` becomes `myToken`.
pub fn identifier_base(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_ascii_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next = chars.get(i + 1).copied();
            let after_lower = prev.is_ascii_lowercase() || prev.is_ascii_digit();
            let ends_acronym =
                prev.is_ascii_uppercase() && next.is_some_and(|n| n.is_ascii_lowercase());
            if after_lower || ends_acronym {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    let mut out = String::new();
    for (i, word) in words.iter().enumerate() {
        let lower = word.to_ascii_lowercase();
        if i == 0 {
            out.push_str(&lower);
        } else {
            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                out.push(first.to_ascii_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }

    // Identifiers cannot start with a digit
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawAddress;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn token_abi() -> serde_json::Value {
        json!([{
            "type": "function",
            "name": "totalSupply",
            "stateMutability": "view",
            "inputs": [],
            "outputs": [{ "name": "", "type": "uint256" }]
        }])
    }

    #[test]
    fn test_identifier_base() {
        assert_eq!(identifier_base("Token"), "token");
        assert_eq!(identifier_base("ERC20Token"), "erc20Token");
        assert_eq!(identifier_base("my-token"), "myToken");
        assert_eq!(identifier_base("my_token contract"), "myTokenContract");
        assert_eq!(identifier_base("WETH9"), "weth9");
        assert_eq!(identifier_base("UniswapV3Pool"), "uniswapV3Pool");
        assert_eq!(identifier_base("1inch"), "_1inch");
        assert_eq!(identifier_base("---"), "_");
    }

    #[test]
    fn test_resolve_without_address() {
        let definition = ContractDefinition::new("Counter", token_abi());
        let contract = resolve(&definition, true).unwrap();

        assert_eq!(contract.meta.abi_name, "counterABI");
        assert!(contract.meta.address_name.is_none());
        assert!(contract.content.starts_with("export const counterABI = ["));
        assert!(contract.content.trim_end().ends_with("] as const"));
        assert!(!contract.content.contains("Address"));
        assert!(!contract.content.contains("/**"));
    }

    #[test]
    fn test_resolve_single_address() {
        let definition = ContractDefinition::new("Token", token_abi()).with_address(
            RawAddress::Single("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed".to_string()),
        );
        let contract = resolve(&definition, true).unwrap();

        assert!(contract.content.contains(
            "export const tokenAddress = '0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed' as const"
        ));
        assert!(contract.content.contains(
            "export const tokenConfig = { address: tokenAddress, abi: tokenABI } as const"
        ));
        assert!(
            contract
                .content
                .contains(" * Deployed at 0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed")
        );
        assert_eq!(contract.meta.config_name.as_deref(), Some("tokenConfig"));
    }

    #[test]
    fn test_resolve_multichain_address_javascript() {
        let definition = ContractDefinition::new("Token", token_abi()).with_address(
            RawAddress::PerChain(BTreeMap::from([
                ("1".to_string(), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".to_string()),
                ("10".to_string(), "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359".to_string()),
            ])),
        );
        let contract = resolve(&definition, false).unwrap();

        assert!(contract.content.contains("export const tokenAddress = {\n  1: '0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed',\n  10: '0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359',\n}\n"));
        assert!(contract.content.contains(" * - chain 10: 0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359"));
        assert!(!contract.content.contains("as const"));
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let definition = ContractDefinition::new("Token", token_abi())
            .with_address(RawAddress::Single("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".to_string()));
        let first = resolve(&definition, true).unwrap();
        let second = resolve(&definition, true).unwrap();
        assert_eq!(first.content, second.content);
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_abi_error() {
        let definition = ContractDefinition::new("Broken", json!([{ "type": "function" }]));
        let err = resolve(&definition, true).unwrap_err();
        match err {
            Error::InvalidAbi { contract, violations } => {
                assert_eq!(contract, "Broken");
                assert_eq!(violations.len(), 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_address_error() {
        let definition = ContractDefinition::new("Token", token_abi())
            .with_address(RawAddress::Single("0xABC".to_string()));
        assert!(matches!(
            resolve(&definition, true),
            Err(Error::InvalidAddress { .. })
        ));
    }
}
