use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::fee_strategy::FeePolicyKind;
use crate::normalizer::AccessControlPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct RpcSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8545".to_string()
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeeSettings {
    #[serde(default)]
    pub policy: FeePolicyKind,
    #[serde(default = "default_max_fee_gwei")]
    pub max_fee_gwei: u64,
    #[serde(default = "default_max_priority_fee_gwei")]
    pub max_priority_fee_gwei: u64,
    /// Added to the pending block's gas used under the legacy policy.
    #[serde(default = "default_legacy_margin_gwei")]
    pub legacy_margin_gwei: u64,
}

fn default_max_fee_gwei() -> u64 {
    50
}
fn default_max_priority_fee_gwei() -> u64 {
    3
}
fn default_legacy_margin_gwei() -> u64 {
    50
}

impl Default for FeeSettings {
    fn default() -> Self {
        Self {
            policy: FeePolicyKind::default(),
            max_fee_gwei: default_max_fee_gwei(),
            max_priority_fee_gwei: default_max_priority_fee_gwei(),
            legacy_margin_gwei: default_legacy_margin_gwei(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TransactionSettings {
    #[serde(default = "default_confirmation_timeout_seconds")]
    pub confirmation_timeout_seconds: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_false")]
    pub force_nonce_refresh: bool,
    #[serde(default = "default_max_stale_nonce_retries")]
    pub max_stale_nonce_retries: u32,
    #[serde(default = "default_retry_backoff_base_ms")]
    pub retry_backoff_base_ms: u64,
    #[serde(default = "default_retry_backoff_max_ms")]
    pub retry_backoff_max_ms: u64,
    #[serde(default = "default_retry_jitter")]
    pub retry_jitter: f64,
}

fn default_false() -> bool {
    false
}
fn default_true() -> bool {
    true
}
fn default_confirmation_timeout_seconds() -> u64 {
    30
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_max_stale_nonce_retries() -> u32 {
    3
}
fn default_retry_backoff_base_ms() -> u64 {
    200
}
fn default_retry_backoff_max_ms() -> u64 {
    5000
}
fn default_retry_jitter() -> f64 {
    0.2
}

impl Default for TransactionSettings {
    fn default() -> Self {
        Self {
            confirmation_timeout_seconds: default_confirmation_timeout_seconds(),
            poll_interval_ms: default_poll_interval_ms(),
            force_nonce_refresh: default_false(),
            max_stale_nonce_retries: default_max_stale_nonce_retries(),
            retry_backoff_base_ms: default_retry_backoff_base_ms(),
            retry_backoff_max_ms: default_retry_backoff_max_ms(),
            retry_jitter: default_retry_jitter(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneratorSettings {
    #[serde(default = "default_true")]
    pub exclude_access_control: bool,
    #[serde(default = "default_access_control_marker")]
    pub access_control_marker: String,
    /// Directory holding `<project>.json` interface files.
    #[serde(default = "default_abi_dir")]
    pub abi_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Crate path generated code imports the runtime from.
    #[serde(default = "default_runtime_crate")]
    pub runtime_crate: String,
    /// Contracts bound in custom-contract mode even when they have an address.
    #[serde(default)]
    pub custom_contracts: Vec<String>,
}

fn default_access_control_marker() -> String {
    "role".to_string()
}
fn default_abi_dir() -> PathBuf {
    PathBuf::from("abis")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("generated")
}
fn default_runtime_crate() -> String {
    "abi_wrapper_sdk".to_string()
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            exclude_access_control: default_true(),
            access_control_marker: default_access_control_marker(),
            abi_dir: default_abi_dir(),
            output_dir: default_output_dir(),
            runtime_crate: default_runtime_crate(),
            custom_contracts: Vec::new(),
        }
    }
}

impl GeneratorSettings {
    pub fn access_control_policy(&self) -> AccessControlPolicy {
        AccessControlPolicy {
            enabled: self.exclude_access_control,
            marker: self.access_control_marker.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub rpc: RpcSettings,
    #[serde(default)]
    pub fees: FeeSettings,
    #[serde(default)]
    pub transactions: TransactionSettings,
    #[serde(default)]
    pub generator: GeneratorSettings,
}

impl Settings {
    /// Loads `AbiWrapper.toml` from the working directory if present, then
    /// applies the `ABI_WRAPPER_*` environment overrides.
    pub fn new() -> Result<Self, ConfigError> {
        Self::load("AbiWrapper", false)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(path, true)
    }

    fn load(name: &str, required: bool) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(name).required(required))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;

        if let Ok(endpoint) = env::var("ABI_WRAPPER_RPC_URL") {
            let trimmed = endpoint.trim();
            if !trimmed.is_empty() {
                settings.rpc.endpoint = trimmed.to_string();
            }
        }
        if let Ok(raw) = env::var("ABI_WRAPPER_FEE_POLICY") {
            match raw.trim().to_lowercase().as_str() {
                "dynamic" => settings.fees.policy = FeePolicyKind::Dynamic,
                "legacy" => settings.fees.policy = FeePolicyKind::Legacy,
                "" => {}
                other => {
                    return Err(ConfigError::Message(format!(
                        "ABI_WRAPPER_FEE_POLICY must be dynamic or legacy, got {}",
                        other
                    )))
                }
            }
        }

        if let Ok(dir) = env::var("ABI_WRAPPER_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                settings.generator.output_dir = PathBuf::from(dir.trim());
            }
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.fees.policy, FeePolicyKind::Dynamic);
        assert_eq!(settings.fees.max_fee_gwei, 50);
        assert_eq!(settings.fees.max_priority_fee_gwei, 3);
        assert_eq!(settings.transactions.confirmation_timeout_seconds, 30);
        assert_eq!(settings.transactions.poll_interval_ms, 1000);
        assert!(!settings.transactions.force_nonce_refresh);
        assert_eq!(settings.generator.access_control_policy(), AccessControlPolicy::default());
        assert!(settings.generator.custom_contracts.is_empty());
        assert_eq!(settings.rpc.endpoint, "http://127.0.0.1:8545");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[fees]\npolicy = \"legacy\"\nlegacy_margin_gwei = 10\n\n[generator]\nexclude_access_control = false\ncustom_contracts = [\"Pair\"]"
        )
        .unwrap();

        let settings = Settings::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(settings.fees.policy, FeePolicyKind::Legacy);
        assert_eq!(settings.fees.legacy_margin_gwei, 10);
        assert_eq!(settings.fees.max_fee_gwei, 50);
        assert!(!settings.generator.access_control_policy().enabled);
        assert_eq!(settings.transactions.max_stale_nonce_retries, 3);
        assert_eq!(settings.generator.custom_contracts, vec!["Pair".to_string()]);
    }
}
