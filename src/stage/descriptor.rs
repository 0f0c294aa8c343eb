//! Stage descriptors and results
//!
//! A descriptor is everything one process invocation needs: which binary,
//! its argv and environment, the filesystem it starts from, and how long it
//! may run. A result is what comes back: exit code, the filesystem the
//! process left behind, and everything it wrote to stderr.

use crate::vfs::FsSnapshot;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

/// MIME type browsers require for streaming WebAssembly compilation
pub const WASM_MIME: &str = "application/wasm";

/// A module payload ready to hand to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableModule {
    bytes: Rc<[u8]>,
    mime_type: &'static str,
}

impl ExecutableModule {
    pub fn new(bytes: impl Into<Rc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: WASM_MIME,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }
}

/// Where a stage's binary comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinarySource {
    /// Fetched at launch
    Uri(String),
    /// Already in memory (e.g. a module the linker just produced)
    Module(ExecutableModule),
}

/// One process invocation
///
/// By toolchain convention `argv[0]` is the process name. [`StageDescriptor::new`]
/// sets it up that way, but nothing enforces it afterwards.
#[derive(Debug, Clone)]
pub struct StageDescriptor {
    pub binary: BinarySource,
    pub process_name: String,
    pub argv: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub input: FsSnapshot,
    /// `None` means no deadline
    pub timeout: Option<Duration>,
}

impl StageDescriptor {
    /// Descriptor with `argv = [process_name]`, empty env and filesystem
    pub fn new(binary: BinarySource, process_name: &str) -> Self {
        Self {
            binary,
            process_name: process_name.to_string(),
            argv: vec![process_name.to_string()],
            env: BTreeMap::new(),
            input: FsSnapshot::new(),
            timeout: None,
        }
    }

    /// Append arguments after the existing argv
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn input(mut self, snapshot: FsSnapshot) -> Self {
        self.input = snapshot;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Outcome of a process that ran to completion
#[derive(Debug, Clone)]
pub struct StageResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Filesystem as the process left it
    pub output: FsSnapshot,
    /// Everything written to stderr (lossy UTF-8)
    pub stderr: String,
}

impl StageResult {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}
