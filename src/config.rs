//! Runtime configuration
//!
//! Where the toolchain assets live and how long things may take. Parsed from
//! JSON; every field has a default so `{}` is a valid config.

use crate::stage::StdinPolicy;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Malformed configuration
#[derive(Debug, Error)]
#[error("invalid config: {0}")]
pub struct ConfigError(#[from] serde_json::Error);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IdeConfig {
    /// Prefix for static assets (empty = same origin root)
    pub base_url: String,
    pub compiler_binary: String,
    pub linker_binary: String,
    pub sysroot_archive: String,
    /// Deadline for the compile and link stages
    pub stage_timeout_ms: u64,
    /// Deadline for the user's program
    pub run_timeout_ms: u64,
    pub stdin_timeout_ms: u64,
    /// Line fed to the program when no input arrives
    pub stdin_default: String,
}

impl Default for IdeConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            compiler_binary: "clang.wasm".to_string(),
            linker_binary: "wasm-ld.wasm".to_string(),
            sysroot_archive: "clang-fs.tar.gz".to_string(),
            stage_timeout_ms: 120_000,
            run_timeout_ms: 30_000,
            stdin_timeout_ms: 30_000,
            stdin_default: String::new(),
        }
    }
}

impl IdeConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// `base_url` and `name` joined by exactly one `/`
    pub fn asset_url(&self, name: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            name.trim_start_matches('/')
        )
    }

    pub fn compiler_url(&self) -> String {
        self.asset_url(&self.compiler_binary)
    }

    pub fn linker_url(&self) -> String {
        self.asset_url(&self.linker_binary)
    }

    pub fn sysroot_url(&self) -> String {
        self.asset_url(&self.sysroot_archive)
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_millis(self.stage_timeout_ms)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_millis(self.run_timeout_ms)
    }

    pub fn stdin_policy(&self) -> StdinPolicy {
        StdinPolicy {
            timeout: Duration::from_millis(self.stdin_timeout_ms),
            default_response: self.stdin_default.clone(),
        }
    }
}
