// src/type_mapping.rs
//
// Solidity ABI type strings -> Rust type expressions used by generated bindings.
//
// Trailing bracket groups (`[]`, `[3]`) are stripped and counted; the base type
// is then wrapped in that many `Vec<...>` layers.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static BRACKET_PAIR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\d*\]$").unwrap());

/// Base (non-array) Rust type for an ABI elementary type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Address,
    Bool,
    String,
    Bytes,
    FixedBytes(usize),
    Uint,
    Int,
    /// Structs are passed as raw tokens.
    Tuple,
}

impl BaseType {
    pub fn parse(abi_type: &str) -> Option<Self> {
        match abi_type {
            "address" => Some(Self::Address),
            "bool" => Some(Self::Bool),
            "string" => Some(Self::String),
            "bytes" => Some(Self::Bytes),
            "byte" => Some(Self::FixedBytes(1)),
            "function" => Some(Self::FixedBytes(24)),
            "tuple" => Some(Self::Tuple),
            t if t.starts_with("bytes") => match t["bytes".len()..].parse::<usize>() {
                Ok(n) if (1..=32).contains(&n) => Some(Self::FixedBytes(n)),
                _ => None,
            },
            t if t.starts_with("uint") => valid_width(&t["uint".len()..]).then_some(Self::Uint),
            t if t.starts_with("int") => valid_width(&t["int".len()..]).then_some(Self::Int),
            _ => None,
        }
    }
}

fn valid_width(bits: &str) -> bool {
    if bits.is_empty() {
        return true;
    }
    matches!(bits.parse::<usize>(), Ok(n) if n % 8 == 0 && (8..=256).contains(&n))
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address => write!(f, "Address"),
            Self::Bool => write!(f, "bool"),
            Self::String => write!(f, "String"),
            Self::Bytes => write!(f, "Bytes"),
            Self::FixedBytes(n) => write!(f, "[u8; {}]", n),
            Self::Uint => write!(f, "U256"),
            Self::Int => write!(f, "I256"),
            Self::Tuple => write!(f, "Token"),
        }
    }
}

/// A base type wrapped in `depth` nested sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RustType {
    pub base: BaseType,
    pub depth: usize,
}

impl fmt::Display for RustType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.depth {
            write!(f, "Vec<")?;
        }
        write!(f, "{}", self.base)?;
        for _ in 0..self.depth {
            write!(f, ">")?;
        }
        Ok(())
    }
}

/// Splits `uint256[][3]` into (`uint256`, 2).
pub fn strip_array_suffixes(abi_type: &str) -> (&str, usize) {
    let mut base = abi_type;
    let mut depth = 0;
    while let Some(m) = BRACKET_PAIR_RE.find(base) {
        base = &base[..m.start()];
        depth += 1;
    }
    (base, depth)
}

/// Maps an ABI type string to a Rust type, or `None` for unsupported types
/// such as `fixed128x18`.
pub fn map_abi_type(abi_type: &str) -> Option<RustType> {
    let (base, depth) = strip_array_suffixes(abi_type.trim());
    BaseType::parse(base).map(|base| RustType { base, depth })
}

/// Shape of a function's return value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OutputShape {
    Unit,
    Single(RustType),
    Tuple(Vec<RustType>),
}

impl OutputShape {
    pub fn from_types(types: Vec<RustType>) -> Self {
        match types.len() {
            0 => Self::Unit,
            1 => Self::Single(types[0]),
            _ => Self::Tuple(types),
        }
    }
}

impl fmt::Display for OutputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => write!(f, "()"),
            Self::Single(t) => write!(f, "{}", t),
            Self::Tuple(types) => {
                let parts: Vec<String> = types.iter().map(RustType::to_string).collect();
                write!(f, "({})", parts.join(", "))
            }
        }
    }
}
