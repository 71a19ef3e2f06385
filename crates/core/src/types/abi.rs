//! Interface descriptors (JSON ABIs)
//!
//! An ABI is accepted as raw JSON and validated item by item. Every schema
//! violation is reported with the JSON path it was found at, so a single
//! failed resolution lists everything that needs fixing.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

static SOLIDITY_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(address|bool|string|function|tuple|bytes|int|uint)([0-9]*)((?:\[[0-9]*\])*)$")
        .expect("solidity type pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    Pure,
    View,
    Nonpayable,
    Payable,
}

/// A function, event or error parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "internalType", default, skip_serializing_if = "Option::is_none")]
    pub internal_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<Param>,
    #[serde(default)]
    pub outputs: Vec<Param>,
    #[serde(rename = "stateMutability", default, skip_serializing_if = "Option::is_none")]
    pub state_mutability: Option<StateMutability>,
    // Pre-0.4.16 compilers emit these instead of stateMutability
    #[serde(default, skip_serializing)]
    pub constant: Option<bool>,
    #[serde(default, skip_serializing)]
    pub payable: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<Param>,
    #[serde(default)]
    pub anonymous: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomError {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<Param>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constructor {
    #[serde(default)]
    pub inputs: Vec<Param>,
    #[serde(rename = "stateMutability", default, skip_serializing_if = "Option::is_none")]
    pub state_mutability: Option<StateMutability>,
    #[serde(default, skip_serializing)]
    pub payable: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fallback {
    #[serde(rename = "stateMutability", default, skip_serializing_if = "Option::is_none")]
    pub state_mutability: Option<StateMutability>,
    #[serde(default, skip_serializing)]
    pub payable: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receive {
    #[serde(rename = "stateMutability")]
    pub state_mutability: StateMutability,
}

/// One entry of an ABI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AbiItem {
    Function(Function),
    Event(Event),
    Error(CustomError),
    Constructor(Constructor),
    Fallback(Fallback),
    Receive(Receive),
}

/// A validated interface descriptor
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Abi(Vec<AbiItem>);

impl Abi {
    /// Validate raw JSON against the interface-descriptor schema.
    ///
    /// Returns every violation found rather than stopping at the first one.
    pub fn parse(value: &Value) -> std::result::Result<Self, Vec<String>> {
        let Some(entries) = value.as_array() else {
            return Err(vec!["$: expected an array of ABI items".to_string()]);
        };

        let mut items = Vec::with_capacity(entries.len());
        let mut violations = Vec::new();

        for (index, entry) in entries.iter().enumerate() {
            let path = format!("[{index}]");
            match serde_json::from_value::<AbiItem>(entry.clone()) {
                Ok(mut item) => {
                    item.normalize();
                    item.check(&path, &mut violations);
                    items.push(item);
                }
                Err(e) => violations.push(format!("{path}: {e}")),
            }
        }

        if violations.is_empty() {
            Ok(Self(items))
        } else {
            Err(violations)
        }
    }

    pub fn items(&self) -> &[AbiItem] {
        &self.0
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.0.iter().filter_map(|item| match item {
            AbiItem::Function(f) => Some(f),
            _ => None,
        })
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.0.iter().filter_map(|item| match item {
            AbiItem::Event(e) => Some(e),
            _ => None,
        })
    }
}

impl AbiItem {
    /// Fill in `stateMutability` from legacy `constant`/`payable` flags
    fn normalize(&mut self) {
        match self {
            AbiItem::Function(f) if f.state_mutability.is_none() => {
                f.state_mutability = match (f.constant, f.payable) {
                    (_, Some(true)) => Some(StateMutability::Payable),
                    (Some(true), _) => Some(StateMutability::View),
                    (Some(false), _) | (_, Some(false)) => Some(StateMutability::Nonpayable),
                    (None, None) => None,
                };
            }
            AbiItem::Constructor(c) if c.state_mutability.is_none() => {
                c.state_mutability = Some(if c.payable == Some(true) {
                    StateMutability::Payable
                } else {
                    StateMutability::Nonpayable
                });
            }
            AbiItem::Fallback(f) if f.state_mutability.is_none() => {
                f.state_mutability = Some(if f.payable == Some(true) {
                    StateMutability::Payable
                } else {
                    StateMutability::Nonpayable
                });
            }
            _ => {}
        }
    }

    fn check(&self, path: &str, violations: &mut Vec<String>) {
        match self {
            AbiItem::Function(f) => {
                check_name(&f.name, path, violations);
                if f.state_mutability.is_none() {
                    violations.push(format!("{path}.stateMutability: missing"));
                }
                check_params(&f.inputs, &format!("{path}.inputs"), violations);
                check_params(&f.outputs, &format!("{path}.outputs"), violations);
            }
            AbiItem::Event(e) => {
                check_name(&e.name, path, violations);
                check_params(&e.inputs, &format!("{path}.inputs"), violations);
            }
            AbiItem::Error(e) => {
                check_name(&e.name, path, violations);
                check_params(&e.inputs, &format!("{path}.inputs"), violations);
            }
            AbiItem::Constructor(c) => {
                if matches!(
                    c.state_mutability,
                    Some(StateMutability::Pure | StateMutability::View)
                ) {
                    violations.push(format!(
                        "{path}.stateMutability: constructor must be payable or nonpayable"
                    ));
                }
                check_params(&c.inputs, &format!("{path}.inputs"), violations);
            }
            AbiItem::Fallback(f) => {
                if matches!(
                    f.state_mutability,
                    Some(StateMutability::Pure | StateMutability::View)
                ) {
                    violations.push(format!(
                        "{path}.stateMutability: fallback must be payable or nonpayable"
                    ));
                }
            }
            AbiItem::Receive(r) => {
                if r.state_mutability != StateMutability::Payable {
                    violations.push(format!("{path}.stateMutability: receive must be payable"));
                }
            }
        }
    }
}

fn check_name(name: &str, path: &str, violations: &mut Vec<String>) {
    if name.trim().is_empty() {
        violations.push(format!("{path}.name: must not be empty"));
    }
}

fn check_params(params: &[Param], path: &str, violations: &mut Vec<String>) {
    for (index, param) in params.iter().enumerate() {
        let param_path = format!("{path}[{index}]");
        if let Err(reason) = check_type(&param.kind) {
            violations.push(format!("{param_path}.type: {reason}"));
            continue;
        }

        if param.kind.starts_with("tuple") {
            if param.components.is_empty() {
                violations.push(format!("{param_path}.components: tuple requires components"));
            }
            check_params(
                &param.components,
                &format!("{param_path}.components"),
                violations,
            );
        }
    }
}

/// Check a Solidity type string such as `uint256`, `bytes32[]` or `tuple[2][]`
pub fn check_type(kind: &str) -> std::result::Result<(), String> {
    let captures = SOLIDITY_TYPE
        .captures(kind)
        .ok_or_else(|| format!("`{kind}` is not a Solidity type"))?;

    let base = &captures[1];
    let size = &captures[2];
    if size.is_empty() {
        return Ok(());
    }

    let bits: u32 = size
        .parse()
        .map_err(|_| format!("`{kind}` has an invalid size"))?;
    let valid = match base {
        "bytes" => (1..=32).contains(&bits),
        "int" | "uint" => (8..=256).contains(&bits) && bits % 8 == 0,
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(format!("`{kind}` has an invalid size"))
    }
}
