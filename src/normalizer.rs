// src/normalizer.rs
//
// Filters raw interface entries and canonicalizes names into Rust identifiers.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::interface::{EntryKind, InterfaceEntry, Mutability, Param};

static SNAKE_CASE_RE_1: Lazy<Regex> = Lazy::new(|| Regex::new(r"(.)([A-Z][a-z]+)").unwrap());
static SNAKE_CASE_RE_2: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap());

/// Strict and reserved Rust keywords across editions, plus `Self`.
const RUST_RESERVED_WORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "self", "Self", "static", "struct", "super", "trait", "true", "try", "type", "typeof",
    "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Which entries are excluded as access-control boilerplate.
///
/// OpenZeppelin-style role management adds a handful of functions
/// (`grantRole`, `hasRole`, `getRoleAdmin`, ...) that clients rarely call. This
/// policy is the only place that decision is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessControlPolicy {
    pub enabled: bool,
    pub marker: String,
}

impl Default for AccessControlPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            marker: "role".to_string(),
        }
    }
}

impl AccessControlPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// True when `name` case-insensitively contains the marker.
    pub fn excludes(&self, name: &str) -> bool {
        self.enabled && !self.marker.is_empty() && name.to_lowercase().contains(&self.marker.to_lowercase())
    }
}

/// A parameter after name canonicalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub ident: String,
    pub param: Param,
}

/// A callable entry that survived filtering, with canonical names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalBinding {
    pub identifier: String,
    pub original_name: String,
    pub signature: String,
    pub mutability: Mutability,
    pub params: Vec<ParamSpec>,
    pub outputs: Vec<Param>,
}

impl CanonicalBinding {
    pub fn is_transaction(&self) -> bool {
        self.mutability.is_transaction()
    }
}

/// `balanceOf` -> `balance_of`, `getHTTPResponse` -> `get_http_response`.
pub fn to_snake_case(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    let name = SNAKE_CASE_RE_1.replace_all(name, "${1}_${2}");
    SNAKE_CASE_RE_2.replace_all(&name, "${1}_${2}").to_lowercase()
}

/// `hero_core` -> `HeroCore`; an existing capital stays as is (`ERC20` -> `ERC20`).
pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = true;
    for c in name.chars() {
        if c == '_' || c == '-' || c == ' ' {
            upper_next = true;
            continue;
        }
        if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub fn is_reserved_word(ident: &str) -> bool {
    RUST_RESERVED_WORDS.contains(&ident)
}

/// Prefixes `_` to identifiers that are Rust keywords.
pub fn escape_reserved(ident: String) -> String {
    if is_reserved_word(&ident) {
        format!("_{}", ident)
    } else {
        ident
    }
}

/// Snake-case plus reserved-word escaping.
pub fn canonical_identifier(name: &str) -> String {
    escape_reserved(to_snake_case(name))
}

/// a, b, ..., z, aa, ab, ...
fn placeholder(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'a' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// Replaces blank names with placeholder letters in order. Non-blank names
/// pass through and never consume a letter; letters already taken by a
/// non-blank name are skipped so every name stays unique.
pub fn assign_placeholders(names: &[String]) -> Vec<String> {
    let mut next = 0usize;
    names
        .iter()
        .map(|name| {
            if !name.is_empty() {
                return name.clone();
            }
            loop {
                let candidate = placeholder(next);
                next += 1;
                if !names.contains(&candidate) {
                    return candidate;
                }
            }
        })
        .collect()
}

/// Filters and canonicalizes interface entries.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    policy: AccessControlPolicy,
}

impl Normalizer {
    pub fn new(policy: AccessControlPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AccessControlPolicy {
        &self.policy
    }

    /// Keeps named, callable, non-access-control functions in their original
    /// order. No deduplication: overloads keep the same identifier.
    pub fn normalize(&self, entries: &[InterfaceEntry]) -> Vec<CanonicalBinding> {
        entries.iter().filter_map(|entry| self.normalize_entry(entry)).collect()
    }

    fn normalize_entry(&self, entry: &InterfaceEntry) -> Option<CanonicalBinding> {
        if entry.kind != EntryKind::Function {
            return None;
        }
        let name = entry.name.as_deref()?;
        if self.policy.excludes(name) {
            debug!("[CODEGEN] Skipping access-control function {}", name);
            return None;
        }
        let mutability = entry.mutability?;

        let raw_names: Vec<String> = entry
            .inputs
            .iter()
            .map(|p| canonical_identifier(&p.name))
            .collect();
        let params = assign_placeholders(&raw_names)
            .into_iter()
            .zip(entry.inputs.iter())
            .map(|(ident, param)| ParamSpec {
                ident,
                param: param.clone(),
            })
            .collect();

        Some(CanonicalBinding {
            identifier: canonical_identifier(name),
            original_name: name.to_string(),
            signature: entry.signature(),
            mutability,
            params,
            outputs: entry.outputs.clone(),
        })
    }
}
