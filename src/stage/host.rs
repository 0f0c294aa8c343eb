//! The WASI host contract
//!
//! The host is the external piece that actually instantiates a module and
//! services its WASI imports against a snapshot. This crate only defines
//! what it needs from one:
//!
//! ```text
//! start(module, { args, env, fs, stdout, stderr, stdin, cancel })
//!     -> Future<Result<{ exit_code, fs }, HostError>>
//! ```
//!
//! - `stdout` / `stderr` are called with bytes as the process produces them
//! - `stdin` answers line requests; it never blocks forever
//! - `cancel` fires when the stage times out or the user cancels; the host
//!   should tear the process down and may resolve with [`HostError::Killed`]

use super::cancel::CancelToken;
use super::descriptor::ExecutableModule;
use super::error::HostError;
use super::stdin::StdinBridge;
use crate::vfs::FsSnapshot;
use futures::future::LocalBoxFuture;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Destination for process output
pub trait OutputSink {
    fn write(&self, bytes: &[u8]);
}

impl<F: Fn(&[u8])> OutputSink for F {
    fn write(&self, bytes: &[u8]) {
        self(bytes)
    }
}

/// Sink that keeps everything written to it
#[derive(Debug, Default)]
pub struct CaptureSink {
    bytes: RefCell<Vec<u8>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured output as lossy UTF-8
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.borrow()).into_owned()
    }

    /// Drain the captured output
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.bytes.borrow_mut());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl OutputSink for CaptureSink {
    fn write(&self, bytes: &[u8]) {
        self.bytes.borrow_mut().extend_from_slice(bytes);
    }
}

/// Everything the host receives besides the module
pub struct HostOptions {
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub fs: FsSnapshot,
    pub stdout: Rc<dyn OutputSink>,
    pub stderr: Rc<dyn OutputSink>,
    pub stdin: StdinBridge,
    pub cancel: CancelToken,
}

/// Normal process termination
#[derive(Debug, Clone)]
pub struct HostExit {
    pub exit_code: i32,
    pub fs: FsSnapshot,
}

/// An engine able to run WASI command modules
pub trait WasiHost {
    fn start(
        &self,
        module: ExecutableModule,
        options: HostOptions,
    ) -> LocalBoxFuture<'static, Result<HostExit, HostError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_sink() {
        let sink = CaptureSink::new();
        sink.write(b"Hello, ");
        sink.write(b"world!\n");
        assert_eq!(sink.contents(), "Hello, world!\n");
        assert_eq!(sink.take(), "Hello, world!\n");
        assert_eq!(sink.contents(), "");
    }

    #[test]
    fn test_closure_sink() {
        let seen = RefCell::new(Vec::new());
        let sink = |bytes: &[u8]| seen.borrow_mut().extend_from_slice(bytes);
        sink.write(b"abc");
        assert_eq!(&*seen.borrow(), b"abc");
    }
}
