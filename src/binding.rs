//! # Binding Synthesizer
//!
//! Derives a language-neutral description of every binding from normalized
//! interface entries. Rendering the description into source text is the job of
//! [`crate::emitter`]; nothing in this module formats code.
//!
//! Per function the synthesizer decides:
//!
//! - **Call kind**: `nonpayable`/`payable` functions are transactions that take
//!   credentials and return a `TxOutcome`; `view`/`pure` functions are reads
//!   that take no credentials and return the decoded value.
//! - **Parameter and return types** via [`crate::type_mapping`].
//! - **Target**: a fixed, pre-bound contract, or (custom-contract mode) an
//!   address supplied on every call.
//! - **Selector**: the 4-byte function selector, computed here so generated
//!   code never looks functions up by name.
//! - **Method name**: overloads keep one binding each; later overloads get a
//!   numeric suffix (`safe_transfer_from`, `safe_transfer_from_1`) and names
//!   taken by the generated struct itself are prefixed with `_`.

use ethers::types::Address;
use log::{debug, info};
use std::collections::{BTreeSet, HashSet};
use std::str::FromStr;

use crate::errors::{ConfigurationError, GenerationError};
use crate::interface::{ContractSource, EntryKind, ProjectSource};
use crate::normalizer::{
    canonical_identifier, escape_reserved, to_camel_case, to_snake_case, CanonicalBinding, Normalizer,
};
use crate::type_mapping::{map_abi_type, OutputShape, RustType};

/// Names of the parameters generated bindings add in front of the ABI inputs.
pub const CREDENTIALS_PARAM: &str = "cred";
pub const CONTRACT_ADDRESS_PARAM: &str = "contract_address";
pub const VALUE_PARAM: &str = "value";

/// Methods every generated contract struct defines besides its bindings.
pub const RESERVED_METHODS: &[&str] = &["new", "contract"];

/// What a generated method does when called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Direct call, decoded result.
    Read,
    /// Signed, submitted and confirmed through the lifecycle manager.
    Transaction { payable: bool },
}

impl CallKind {
    pub fn is_transaction(self) -> bool {
        matches!(self, Self::Transaction { .. })
    }
}

/// Which contract instance a method talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallTarget {
    /// The handle bound at construction.
    Fixed,
    /// A transient handle built from a `contract_address` argument.
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamBinding {
    pub ident: String,
    pub abi_type: String,
    pub rust_type: RustType,
}

/// Everything an emitter needs to render one method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionBinding {
    pub identifier: String,
    pub abi_name: String,
    pub signature: String,
    pub selector: [u8; 4],
    pub kind: CallKind,
    pub target: CallTarget,
    pub params: Vec<ParamBinding>,
    pub output: OutputShape,
}

impl FunctionBinding {
    pub fn requires_credentials(&self) -> bool {
        self.kind.is_transaction()
    }
}

/// Bindings for one contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContractBindings {
    pub name: String,
    pub module_name: String,
    pub type_name: String,
    pub address: Option<Address>,
    pub abi_json: String,
    pub target: CallTarget,
    pub functions: Vec<FunctionBinding>,
    /// Event names declared by the ABI, in ABI order.
    pub events: Vec<String>,
}

impl ContractBindings {
    pub fn is_custom_contract(&self) -> bool {
        self.target == CallTarget::Custom
    }
}

/// Bindings for a whole project plus the aggregate that instantiates them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectBindings {
    pub project_name: String,
    pub aggregate_type_name: String,
    pub aggregate_module_name: String,
    pub contracts: Vec<ContractBindings>,
}

/// Any failure while synthesizing a project.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// `DFK` -> `Dfk`, `evo` -> `Evo`.
fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Renames ABI inputs that would shadow the parameters bindings add.
fn avoid_generated_names(ident: String, kind: CallKind, target: CallTarget) -> String {
    let clashes = (kind.is_transaction() && ident == CREDENTIALS_PARAM)
        || (target == CallTarget::Custom && ident == CONTRACT_ADDRESS_PARAM)
        || (kind == CallKind::Transaction { payable: true } && ident == VALUE_PARAM);
    if clashes {
        format!("_{}", ident)
    } else {
        ident
    }
}

/// Gives every binding of a contract a distinct method name, in ABI order.
fn assign_method_names(functions: &mut [FunctionBinding]) {
    let mut taken: HashSet<String> = RESERVED_METHODS.iter().map(|m| m.to_string()).collect();
    for f in functions.iter_mut() {
        let base = if RESERVED_METHODS.contains(&f.identifier.as_str()) {
            format!("_{}", f.identifier)
        } else {
            f.identifier.clone()
        };
        let mut candidate = base.clone();
        let mut suffix = 1;
        while !taken.insert(candidate.clone()) {
            candidate = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        if candidate != f.identifier {
            debug!("[CODEGEN] {} bound as {}", f.signature, candidate);
            f.identifier = candidate;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    normalizer: Normalizer,
    custom_contracts: BTreeSet<String>,
}

impl Synthesizer {
    pub fn new(normalizer: Normalizer) -> Self {
        Self {
            normalizer,
            custom_contracts: BTreeSet::new(),
        }
    }

    /// Contracts bound in custom-contract mode even when their source has an
    /// address. Names match the project file's contract keys.
    pub fn with_custom_contracts<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_contracts.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn synthesize_function(
        &self,
        contract: &str,
        binding: &CanonicalBinding,
        target: CallTarget,
    ) -> Result<FunctionBinding, GenerationError> {
        let unsupported = |abi_type: &str| GenerationError::UnsupportedType {
            contract: contract.to_string(),
            function: binding.original_name.clone(),
            abi_type: abi_type.to_string(),
        };

        let kind = if binding.is_transaction() {
            CallKind::Transaction {
                payable: binding.mutability == crate::interface::Mutability::Payable,
            }
        } else {
            CallKind::Read
        };

        let params = binding
            .params
            .iter()
            .map(|spec| {
                let rust_type = map_abi_type(&spec.param.abi_type).ok_or_else(|| unsupported(&spec.param.abi_type))?;
                Ok(ParamBinding {
                    ident: avoid_generated_names(spec.ident.clone(), kind, target),
                    abi_type: spec.param.abi_type.clone(),
                    rust_type,
                })
            })
            .collect::<Result<Vec<_>, GenerationError>>()?;

        let outputs = binding
            .outputs
            .iter()
            .map(|p| map_abi_type(&p.abi_type).ok_or_else(|| unsupported(&p.abi_type)))
            .collect::<Result<Vec<_>, GenerationError>>()?;

        Ok(FunctionBinding {
            identifier: binding.identifier.clone(),
            abi_name: binding.original_name.clone(),
            signature: binding.signature.clone(),
            selector: ethers::utils::id(&binding.signature),
            kind,
            target,
            params,
            output: OutputShape::from_types(outputs),
        })
    }

    pub fn synthesize_contract(&self, name: &str, source: &ContractSource) -> Result<ContractBindings, SynthesisError> {
        let address = match source.address.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            Some(raw) => Some(Address::from_str(raw).map_err(|_| ConfigurationError::InvalidAddress {
                contract: name.to_string(),
                value: raw.to_string(),
            })?),
            None => None,
        };
        let target = if address.is_none() || self.custom_contracts.contains(name) {
            CallTarget::Custom
        } else {
            CallTarget::Fixed
        };

        let entries = source.entries(name)?;
        let mut functions = self
            .normalizer
            .normalize(&entries)
            .iter()
            .map(|b| self.synthesize_function(name, b, target))
            .collect::<Result<Vec<_>, GenerationError>>()?;
        assign_method_names(&mut functions);
        let events = entries
            .iter()
            .filter(|e| e.kind == EntryKind::Event)
            .filter_map(|e| e.name.clone())
            .collect();

        debug!(
            "[CODEGEN] {}: {} bindings from {} entries ({} mode)",
            name,
            functions.len(),
            entries.len(),
            if target == CallTarget::Custom { "custom-contract" } else { "fixed" }
        );

        Ok(ContractBindings {
            name: name.to_string(),
            module_name: canonical_identifier(name),
            type_name: to_camel_case(name),
            address,
            abi_json: source.abi_json(),
            target,
            functions,
            events,
        })
    }

    pub fn synthesize_project(&self, project: &ProjectSource) -> Result<ProjectBindings, SynthesisError> {
        let contracts = project
            .contracts
            .iter()
            .map(|(name, source)| self.synthesize_contract(name, source))
            .collect::<Result<Vec<_>, _>>()?;

        let short = capitalize(&project.name);
        info!(
            "[CODEGEN] Synthesized {} contracts for project {}",
            contracts.len(),
            project.name
        );
        Ok(ProjectBindings {
            project_name: project.name.clone(),
            aggregate_type_name: format!("All{}Contracts", short),
            aggregate_module_name: escape_reserved(format!("all_{}_contracts", to_snake_case(&short))),
            contracts,
        })
    }
}
