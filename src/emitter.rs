//! # Binding emitter
//!
//! Renders [`ProjectBindings`] into source files. The [`BindingEmitter`] trait
//! is the seam for other target languages; [`RustEmitter`] produces one module
//! per contract plus an aggregate struct that instantiates every contract
//! against a shared endpoint:
//!
//! ```text
//! <out>/<project>/mod.rs
//! <out>/<project>/all_<project>_contracts.rs
//! <out>/<project>/contracts/mod.rs
//! <out>/<project>/contracts/<contract>.rs
//! ```
//!
//! Output is a pure function of the bindings: identical input renders
//! byte-identical files.

use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::binding::{
    CallKind, CallTarget, ContractBindings, FunctionBinding, ProjectBindings, CONTRACT_ADDRESS_PARAM,
    CREDENTIALS_PARAM, VALUE_PARAM,
};
use crate::normalizer::to_snake_case;
use crate::type_mapping::OutputShape;

const INDENT: &str = "    ";

/// One rendered file, relative to the project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub relative_path: PathBuf,
    pub contents: String,
}

pub trait BindingEmitter {
    fn file_extension(&self) -> &'static str;

    fn emit_contract(&self, contract: &ContractBindings) -> String;

    fn emit_aggregate(&self, project: &ProjectBindings) -> String;

    /// Module index files (`mod.rs` and friends). Empty for languages without them.
    fn emit_indexes(&self, _project: &ProjectBindings) -> Vec<GeneratedFile> {
        Vec::new()
    }

    fn render_project(&self, project: &ProjectBindings) -> Vec<GeneratedFile> {
        let ext = self.file_extension();
        let mut files: Vec<GeneratedFile> = project
            .contracts
            .iter()
            .map(|c| GeneratedFile {
                relative_path: Path::new("contracts").join(format!("{}.{}", c.module_name, ext)),
                contents: self.emit_contract(c),
            })
            .collect();
        files.push(GeneratedFile {
            relative_path: PathBuf::from(format!("{}.{}", project.aggregate_module_name, ext)),
            contents: self.emit_aggregate(project),
        });
        files.extend(self.emit_indexes(project));
        files
    }
}

/// Line buffer with indentation.
#[derive(Default)]
struct Code {
    buf: String,
}

impl Code {
    fn line(&mut self, depth: usize, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..depth {
                self.buf.push_str(INDENT);
            }
            self.buf.push_str(text);
        }
        self.buf.push('\n');
    }

    fn blank(&mut self) {
        self.buf.push('\n');
    }

    fn finish(self) -> String {
        self.buf
    }
}

/// Raw string literal that survives any `"#` sequence inside the ABI.
fn raw_string_literal(text: &str) -> String {
    let mut hashes = 1;
    while text.contains(&format!("\"{}", "#".repeat(hashes))) {
        hashes += 1;
    }
    let fence = "#".repeat(hashes);
    format!("r{}\"{}\"{}", fence, text, fence)
}

fn selector_literal(selector: &[u8; 4]) -> String {
    let bytes: Vec<String> = selector.iter().map(|b| format!("0x{:02x}", b)).collect();
    format!("[{}]", bytes.join(", "))
}

/// Emits Rust modules that depend on this crate's runtime.
#[derive(Debug, Clone)]
pub struct RustEmitter {
    /// Path of the runtime crate as seen from generated code.
    pub runtime_crate: String,
}

impl Default for RustEmitter {
    fn default() -> Self {
        Self {
            runtime_crate: "abi_wrapper_sdk".to_string(),
        }
    }
}

impl RustEmitter {
    pub fn new(runtime_crate: impl Into<String>) -> Self {
        Self {
            runtime_crate: runtime_crate.into(),
        }
    }

    fn signature(&self, f: &FunctionBinding) -> String {
        let mut inputs = vec!["&self".to_string()];
        if let CallKind::Transaction { payable } = f.kind {
            inputs.push(format!("{}: &Credentials", CREDENTIALS_PARAM));
            if payable {
                inputs.push(format!("{}: U256", VALUE_PARAM));
            }
        }
        if f.target == CallTarget::Custom {
            inputs.push(format!("{}: Address", CONTRACT_ADDRESS_PARAM));
        }
        inputs.extend(f.params.iter().map(|p| format!("{}: {}", p.ident, p.rust_type)));

        let returns = match f.kind {
            CallKind::Transaction { .. } => "Result<TxOutcome, TxError>".to_string(),
            CallKind::Read => format!("Result<{}, CallError>", f.output),
        };
        format!("pub async fn {}({}) -> {}", f.identifier, inputs.join(", "), returns)
    }

    fn function(&self, code: &mut Code, f: &FunctionBinding) {
        let mutability = match f.kind {
            CallKind::Read => "read-only",
            CallKind::Transaction { payable: true } => "payable transaction",
            CallKind::Transaction { payable: false } => "transaction",
        };
        code.line(1, format!("/// `{}`, {}.", f.signature, mutability));
        code.line(1, format!("{} {{", self.signature(f)));

        let handle = match f.target {
            CallTarget::Fixed => "self.contract.bound()?".to_string(),
            CallTarget::Custom => {
                code.line(2, format!("let contract = self.contract.at({});", CONTRACT_ADDRESS_PARAM));
                "contract".to_string()
            }
        };
        let tokens: Vec<String> = f.params.iter().map(|p| format!("{}.into_token()", p.ident)).collect();
        let args = format!("{}, vec![{}]", selector_literal(&f.selector), tokens.join(", "));

        let body = match (f.kind, &f.output) {
            (CallKind::Read, OutputShape::Unit) => format!("{}.call_tokens({}).await.map(|_| ())", handle, args),
            (CallKind::Read, _) => format!("{}.call({}).await", handle, args),
            (CallKind::Transaction { payable }, _) => {
                let value = if payable { VALUE_PARAM } else { "U256::zero()" };
                format!("{}.send({}, {}, {}).await", handle, CREDENTIALS_PARAM, args, value)
            }
        };
        code.line(2, body);
        code.line(1, "}");
    }
}

impl BindingEmitter for RustEmitter {
    fn file_extension(&self) -> &'static str {
        "rs"
    }

    fn emit_contract(&self, contract: &ContractBindings) -> String {
        let mut code = Code::default();
        code.line(0, format!("//! Bindings for the `{}` contract.", contract.name));
        code.line(0, "//!");
        code.line(0, "//! Generated from the contract ABI. Regenerate instead of editing.");
        code.blank();
        code.line(0, "#![allow(clippy::too_many_arguments)]");
        code.blank();
        code.line(0, format!("use {}::prelude::*;", self.runtime_crate));
        code.blank();
        match contract.address {
            Some(address) => code.line(
                0,
                format!("pub const CONTRACT_ADDRESS: Option<&str> = Some(\"{:?}\");", address),
            ),
            None => code.line(0, "pub const CONTRACT_ADDRESS: Option<&str> = None;"),
        }
        code.blank();
        code.line(0, format!("pub const ABI: &str = {};", raw_string_literal(&contract.abi_json)));
        code.blank();
        let events: Vec<String> = contract.events.iter().map(|e| format!("{:?}", e)).collect();
        code.line(0, "/// Event names, usable as a `parse_events` filter.");
        code.line(0, format!("pub const EVENTS: &[&str] = &[{}];", events.join(", ")));
        code.blank();
        code.line(0, format!("pub struct {} {{", contract.type_name));
        code.line(1, "contract: WrapperContract,");
        code.line(0, "}");
        code.blank();
        code.line(0, format!("impl {} {{", contract.type_name));
        code.line(1, "pub fn new(runtime: Arc<ContractRuntime>) -> Result<Self, ConfigurationError> {");
        code.line(2, "Ok(Self {");
        code.line(
            3,
            format!(
                "contract: WrapperContract::new(\"{}\", runtime, ABI, CONTRACT_ADDRESS)?,",
                contract.name
            ),
        );
        code.line(2, "})");
        code.line(1, "}");
        code.blank();
        code.line(1, "/// Underlying handle: event parsing, receipts, raw calls.");
        code.line(1, "pub fn contract(&self) -> &WrapperContract {");
        code.line(2, "&self.contract");
        code.line(1, "}");
        for f in &contract.functions {
            code.blank();
            self.function(&mut code, f);
        }
        code.line(0, "}");
        code.finish()
    }

    fn emit_aggregate(&self, project: &ProjectBindings) -> String {
        let mut code = Code::default();
        code.line(
            0,
            format!("//! Every `{}` contract against one shared endpoint.", project.project_name),
        );
        code.line(0, "//!");
        code.line(0, "//! Generated. Regenerate instead of editing.");
        code.blank();
        code.line(0, format!("use {}::prelude::*;", self.runtime_crate));
        code.blank();
        for c in &project.contracts {
            code.line(0, format!("use super::contracts::{}::{};", c.module_name, c.type_name));
        }
        code.blank();
        code.line(0, format!("pub struct {} {{", project.aggregate_type_name));
        code.line(1, "pub endpoint: String,");
        for c in &project.contracts {
            code.line(1, format!("pub {}: {},", c.module_name, c.type_name));
        }
        code.line(0, "}");
        code.blank();
        code.line(0, format!("impl {} {{", project.aggregate_type_name));
        code.line(1, "pub fn new(endpoint: &str) -> Result<Self, ConfigurationError> {");
        code.line(2, "Self::with_context(&RuntimeContext::default(), endpoint)");
        code.line(1, "}");
        code.blank();
        code.line(1, "/// Connects to `rpc.endpoint` with the fee policy and transaction settings.");
        code.line(1, "pub fn from_settings(settings: &Settings) -> Result<Self, ConfigurationError> {");
        code.line(2, "Self::with_context(&RuntimeContext::from_settings(settings), &settings.rpc.endpoint)");
        code.line(1, "}");
        code.blank();
        code.line(1, "/// Shares the context's connection pool, nonce cache and fee policy.");
        code.line(
            1,
            "pub fn with_context(context: &RuntimeContext, endpoint: &str) -> Result<Self, ConfigurationError> {",
        );
        code.line(2, "let runtime = context.runtime(endpoint)?;");
        code.line(2, "Ok(Self {");
        code.line(3, "endpoint: endpoint.to_string(),");
        for c in &project.contracts {
            code.line(3, format!("{}: {}::new(Arc::clone(&runtime))?,", c.module_name, c.type_name));
        }
        code.line(2, "})");
        code.line(1, "}");
        code.line(0, "}");
        code.finish()
    }

    fn emit_indexes(&self, project: &ProjectBindings) -> Vec<GeneratedFile> {
        let mut contracts_mod = Code::default();
        for c in &project.contracts {
            contracts_mod.line(0, format!("pub mod {};", c.module_name));
        }
        if !project.contracts.is_empty() {
            contracts_mod.blank();
        }
        for c in &project.contracts {
            contracts_mod.line(0, format!("pub use {}::{};", c.module_name, c.type_name));
        }

        let mut root_mod = Code::default();
        root_mod.line(0, "pub mod contracts;");
        root_mod.line(0, format!("pub mod {};", project.aggregate_module_name));
        root_mod.blank();
        root_mod.line(
            0,
            format!(
                "pub use {}::{};",
                project.aggregate_module_name, project.aggregate_type_name
            ),
        );

        vec![
            GeneratedFile {
                relative_path: Path::new("contracts").join("mod.rs"),
                contents: contracts_mod.finish(),
            },
            GeneratedFile {
                relative_path: PathBuf::from("mod.rs"),
                contents: root_mod.finish(),
            },
        ]
    }
}

/// Writes a project under `out_dir/<project>`, replacing any previous output.
pub fn write_project<E: BindingEmitter>(
    emitter: &E,
    project: &ProjectBindings,
    out_dir: &Path,
) -> std::io::Result<Vec<PathBuf>> {
    let project_dir = out_dir.join(to_snake_case(&project.project_name));
    if project_dir.exists() {
        fs::remove_dir_all(&project_dir)?;
    }
    fs::create_dir_all(project_dir.join("contracts"))?;

    let mut written = Vec::new();
    for file in emitter.render_project(project) {
        let path = project_dir.join(&file.relative_path);
        fs::write(&path, file.contents)?;
        written.push(path);
    }
    info!(
        "[CODEGEN] Wrote {} wrapper files for {} at {:?}",
        written.len(),
        project.project_name,
        project_dir
    );
    Ok(written)
}
