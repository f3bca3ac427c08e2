//! # Interface model
//!
//! Typed view of a Solidity JSON ABI and of the project file that groups
//! several contracts:
//!
//! ```json
//! {
//!     "HeroCore": { "ADDRESS": "0x5F75...", "ABI": [ ... ] },
//!     "ERC20":    { "ADDRESS": null,        "ABI": [ ... ] }
//! }
//! ```
//!
//! A `null` address puts the contract in custom-contract mode: the bindings take
//! the target address on every call.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use crate::errors::{ConfigurationError, GenerationError};

/// Kind of an ABI entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Function,
    Event,
    Constructor,
    Fallback,
    Receive,
    Error,
}

impl EntryKind {
    fn parse(kind: &str) -> Option<Self> {
        match kind {
            "function" => Some(Self::Function),
            "event" => Some(Self::Event),
            "constructor" => Some(Self::Constructor),
            "fallback" => Some(Self::Fallback),
            "receive" => Some(Self::Receive),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Whether a call only reads or can alter remote state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutability {
    View,
    Pure,
    NonPayable,
    Payable,
}

impl Mutability {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "view" => Some(Self::View),
            "pure" => Some(Self::Pure),
            "nonpayable" => Some(Self::NonPayable),
            "payable" => Some(Self::Payable),
            _ => None,
        }
    }

    /// Transactions are the calls that can alter state.
    pub fn is_transaction(self) -> bool {
        matches!(self, Self::NonPayable | Self::Payable)
    }
}

/// One typed parameter (input, output or event field).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub abi_type: String,
    pub components: Vec<Param>,
    pub indexed: bool,
}

impl Param {
    /// Canonical type used in signatures, e.g. `(address,uint256)[]` for `tuple[]`.
    pub fn canonical_type(&self) -> String {
        if let Some(suffix) = self.abi_type.strip_prefix("tuple") {
            let inner: Vec<String> = self.components.iter().map(Param::canonical_type).collect();
            return format!("({}){}", inner.join(","), suffix);
        }
        canonical_elementary(&self.abi_type)
    }
}

fn canonical_elementary(abi_type: &str) -> String {
    let split = abi_type.find('[').unwrap_or(abi_type.len());
    let (base, suffix) = abi_type.split_at(split);
    let base = match base {
        "uint" => "uint256",
        "int" => "int256",
        "byte" => "bytes1",
        other => other,
    };
    format!("{}{}", base, suffix)
}

/// One entry of a contract interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceEntry {
    pub kind: EntryKind,
    pub name: Option<String>,
    pub mutability: Option<Mutability>,
    pub inputs: Vec<Param>,
    pub outputs: Vec<Param>,
}

impl InterfaceEntry {
    /// `name(type1,type2)` as used for selector hashing.
    pub fn signature(&self) -> String {
        let types: Vec<String> = self.inputs.iter().map(Param::canonical_type).collect();
        format!("{}({})", self.name.as_deref().unwrap_or_default(), types.join(","))
    }
}

#[derive(Debug, Deserialize)]
struct RawParam {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type", default)]
    abi_type: Option<String>,
    #[serde(default)]
    components: Vec<RawParam>,
    #[serde(default)]
    indexed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    state_mutability: Option<String>,
    #[serde(default)]
    constant: Option<bool>,
    #[serde(default)]
    payable: Option<bool>,
    #[serde(default)]
    inputs: Vec<RawParam>,
    #[serde(default)]
    outputs: Vec<RawParam>,
}

fn convert_params(
    raw: Vec<RawParam>,
    contract: &str,
    index: usize,
) -> Result<Vec<Param>, GenerationError> {
    raw.into_iter()
        .map(|p| {
            let abi_type = p.abi_type.ok_or_else(|| GenerationError::MissingField {
                contract: contract.to_string(),
                index,
                field: "type",
            })?;
            Ok(Param {
                name: p.name.unwrap_or_default(),
                abi_type,
                components: convert_params(p.components, contract, index)?,
                indexed: p.indexed,
            })
        })
        .collect()
}

/// Parses one raw JSON entry. `contract` and `index` only feed error messages.
pub fn parse_entry(value: &Value, contract: &str, index: usize) -> Result<InterfaceEntry, GenerationError> {
    let raw: RawEntry = serde_json::from_value(value.clone()).map_err(|e| GenerationError::Malformed {
        contract: contract.to_string(),
        index,
        reason: e.to_string(),
    })?;

    // The ABI format defaults a missing `type` to "function".
    let kind_str = raw.kind.as_deref().unwrap_or("function");
    let kind = EntryKind::parse(kind_str).ok_or_else(|| GenerationError::UnknownKind {
        contract: contract.to_string(),
        index,
        kind: kind_str.to_string(),
    })?;

    let mutability = match (&raw.state_mutability, kind) {
        (Some(m), _) => Some(Mutability::parse(m).ok_or_else(|| GenerationError::UnknownMutability {
            contract: contract.to_string(),
            index,
            mutability: m.clone(),
        })?),
        // Pre-0.4.16 ABIs only carry `constant` / `payable`.
        (None, EntryKind::Function) => match (raw.constant, raw.payable) {
            (Some(true), _) => Some(Mutability::View),
            (_, Some(true)) => Some(Mutability::Payable),
            (Some(false), _) | (_, Some(false)) => Some(Mutability::NonPayable),
            (None, None) => {
                return Err(GenerationError::MissingField {
                    contract: contract.to_string(),
                    index,
                    field: "stateMutability",
                })
            }
        },
        (None, _) => None,
    };

    Ok(InterfaceEntry {
        kind,
        name: raw.name.filter(|n| !n.is_empty()),
        mutability,
        inputs: convert_params(raw.inputs, contract, index)?,
        outputs: convert_params(raw.outputs, contract, index)?,
    })
}

/// One contract of a project: optional fixed address plus its raw ABI.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractSource {
    #[serde(rename = "ADDRESS", default)]
    pub address: Option<String>,
    #[serde(rename = "ABI")]
    pub abi: Vec<Value>,
}

impl ContractSource {
    /// Custom-contract mode: no fixed address, one transient handle per call.
    pub fn is_custom_contract(&self) -> bool {
        self.address.as_deref().map_or(true, |a| a.trim().is_empty())
    }

    pub fn entries(&self, contract: &str) -> Result<Vec<InterfaceEntry>, GenerationError> {
        self.abi
            .iter()
            .enumerate()
            .map(|(i, v)| parse_entry(v, contract, i))
            .collect()
    }

    /// The ABI as JSON text, one entry per line, object keys sorted.
    pub fn abi_json(&self) -> String {
        let lines: Vec<String> = self.abi.iter().map(|v| sorted_keys(v).to_string()).collect();
        format!("[\n    {}\n]", lines.join(",\n    "))
    }
}

/// Rebuilds objects with their keys in sorted order, whatever map ordering
/// `serde_json` was compiled with.
fn sorted_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            Value::Object(keys.into_iter().map(|k| (k.clone(), sorted_keys(&map[k]))).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted_keys).collect()),
        other => other.clone(),
    }
}

/// Named collection of contracts; order follows the source file.
#[derive(Debug, Clone)]
pub struct ProjectSource {
    pub name: String,
    pub contracts: IndexMap<String, ContractSource>,
}

impl ProjectSource {
    pub fn from_json_str(name: &str, json: &str) -> Result<Self, ConfigurationError> {
        let contracts: IndexMap<String, ContractSource> = serde_json::from_str(json)?;
        Ok(Self {
            name: name.to_string(),
            contracts,
        })
    }

    pub fn from_json_file(name: &str, path: &Path) -> Result<Self, ConfigurationError> {
        if !path.exists() {
            return Err(ConfigurationError::MissingSource {
                project: name.to_string(),
                path: path.to_path_buf(),
            });
        }
        let json = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(name, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_function_entry() {
        let v = json!({
            "type": "function",
            "name": "transfer",
            "stateMutability": "nonpayable",
            "inputs": [{"name": "to", "type": "address"}, {"name": "amount", "type": "uint256"}],
            "outputs": [{"name": "", "type": "bool"}]
        });
        let entry = parse_entry(&v, "Token", 0).unwrap();
        assert_eq!(entry.kind, EntryKind::Function);
        assert_eq!(entry.mutability, Some(Mutability::NonPayable));
        assert_eq!(entry.signature(), "transfer(address,uint256)");
        assert_eq!(entry.outputs.len(), 1);
    }

    #[test]
    fn test_legacy_constant_flag() {
        let v = json!({"type": "function", "name": "owner", "constant": true, "inputs": [], "outputs": []});
        let entry = parse_entry(&v, "Legacy", 3).unwrap();
        assert_eq!(entry.mutability, Some(Mutability::View));
    }

    #[test]
    fn test_missing_mutability_is_generation_error() {
        let v = json!({"type": "function", "name": "owner", "inputs": []});
        let err = parse_entry(&v, "Broken", 2).unwrap_err();
        assert_eq!(
            err,
            GenerationError::MissingField {
                contract: "Broken".into(),
                index: 2,
                field: "stateMutability"
            }
        );
    }

    #[test]
    fn test_missing_param_type_is_generation_error() {
        let v = json!({"type": "function", "name": "f", "stateMutability": "view", "inputs": [{"name": "x"}]});
        assert!(matches!(
            parse_entry(&v, "Broken", 0),
            Err(GenerationError::MissingField { field: "type", .. })
        ));
    }

    #[test]
    fn test_tuple_canonical_type() {
        let v = json!({
            "type": "function", "name": "submit", "stateMutability": "nonpayable",
            "inputs": [{"name": "orders", "type": "tuple[]", "components": [
                {"name": "maker", "type": "address"}, {"name": "amount", "type": "uint"}
            ]}]
        });
        let entry = parse_entry(&v, "Book", 0).unwrap();
        assert_eq!(entry.signature(), "submit((address,uint256)[])");
    }

    #[test]
    fn test_project_preserves_contract_order() {
        let json = r#"{
            "Zeta": {"ADDRESS": "0x0000000000000000000000000000000000000001", "ABI": []},
            "Alpha": {"ADDRESS": null, "ABI": []}
        }"#;
        let project = ProjectSource::from_json_str("Demo", json).unwrap();
        let names: Vec<&str> = project.contracts.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
        assert!(!project.contracts["Zeta"].is_custom_contract());
        assert!(project.contracts["Alpha"].is_custom_contract());
    }

    #[test]
    fn test_abi_json_sorts_keys() {
        let source: ContractSource = serde_json::from_value(json!({
            "ADDRESS": null,
            "ABI": [{"type": "function", "name": "f", "stateMutability": "view",
                     "inputs": [{"type": "uint256", "name": "x"}], "outputs": []}]
        }))
        .unwrap();
        assert_eq!(
            source.abi_json(),
            "[\n    {\"inputs\":[{\"name\":\"x\",\"type\":\"uint256\"}],\"name\":\"f\",\"outputs\":[],\"stateMutability\":\"view\",\"type\":\"function\"}\n]"
        );
    }

    #[test]
    fn test_missing_project_file() {
        let err = ProjectSource::from_json_file("Demo", Path::new("/nonexistent/abis.json")).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingSource { .. }));
    }
}
