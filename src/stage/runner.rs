//! Stage runner
//!
//! Runs one process: resolve the binary, check it is a module, hand it to
//! the host with the descriptor's argv/env/filesystem, and wait. The stage
//! deadline and the cancel token cover the whole sequence, fetch included.
//!
//! stdout goes straight to the caller's sink as the host produces it; stderr
//! is buffered and returned on the [`StageResult`]. A nonzero exit code comes
//! back as a normal result. Only launch failures, aborts, timeouts and
//! cancellation are errors.

use super::cancel::{CancelToken, Cancellable, Cancelled};
use super::descriptor::{BinarySource, ExecutableModule, StageDescriptor, StageResult};
use super::error::{RunnerResult, StageError};
use super::host::{CaptureSink, HostOptions, OutputSink, WasiHost};
use super::module::validate_module;
use super::stdin::StdinBridge;
use super::timer::{Elapsed, Timer, with_deadline};
use crate::console_log;
use crate::fetch::Fetcher;
use std::rc::Rc;

/// Executes stage descriptors against a WASI host
#[derive(Clone)]
pub struct StageRunner {
    host: Rc<dyn WasiHost>,
    fetcher: Rc<dyn Fetcher>,
    timer: Rc<dyn Timer>,
    stdin: StdinBridge,
}

impl StageRunner {
    pub fn new(
        host: Rc<dyn WasiHost>,
        fetcher: Rc<dyn Fetcher>,
        timer: Rc<dyn Timer>,
        stdin: StdinBridge,
    ) -> Self {
        Self {
            host,
            fetcher,
            timer,
            stdin,
        }
    }

    /// Timer used for stage deadlines
    pub fn timer(&self) -> &dyn Timer {
        self.timer.as_ref()
    }

    /// Run one stage to completion
    ///
    /// `cancel` is passed through to the host. If the descriptor's timeout
    /// elapses first, the token is cancelled and the stage fails with
    /// [`StageError::TimedOut`].
    pub async fn run(
        &self,
        descriptor: StageDescriptor,
        stdout: Rc<dyn OutputSink>,
        cancel: &CancelToken,
    ) -> RunnerResult<StageResult> {
        let StageDescriptor {
            binary,
            process_name,
            argv,
            env,
            input,
            timeout,
        } = descriptor;

        if cancel.is_cancelled() {
            return Err(StageError::Cancelled {
                process: process_name,
            });
        }

        console_log!("[stage] Starting {} ({} args)", process_name, argv.len());

        let process = process_name.as_str();
        let stderr = Rc::new(CaptureSink::new());
        let options = HostOptions {
            args: argv,
            env,
            fs: input,
            stdout,
            stderr: stderr.clone(),
            stdin: self.stdin.clone(),
            cancel: cancel.clone(),
        };

        // Fetching the binary counts against the deadline too
        let launched = async move {
            let module = self.resolve(process, binary).await?;
            self.host
                .start(module, options)
                .await
                .map_err(|e| StageError::from_host(process, e))
        };

        let outcome =
            with_deadline(self.timer.as_ref(), timeout, Cancellable::new(launched, cancel)).await;
        let exit = match outcome {
            Ok(Ok(result)) => result?,
            Ok(Err(Cancelled)) => {
                return Err(StageError::Cancelled {
                    process: process_name,
                });
            }
            Err(Elapsed) => {
                cancel.cancel();
                let after_ms = timeout.map(|t| t.as_millis() as u64).unwrap_or(0);
                console_log!("[stage] {} timed out after {} ms", process_name, after_ms);
                return Err(StageError::TimedOut {
                    process: process_name,
                    after_ms,
                });
            }
        };

        console_log!("[stage] {} exited with code {}", process_name, exit.exit_code);

        Ok(StageResult {
            exit_code: exit.exit_code,
            output: exit.fs,
            stderr: stderr.take(),
        })
    }

    /// Turn a binary source into a checked module
    async fn resolve(&self, process: &str, binary: BinarySource) -> RunnerResult<ExecutableModule> {
        let launch = |reason: String| StageError::Launch {
            process: process.to_string(),
            reason,
        };

        let module = match binary {
            BinarySource::Uri(uri) => {
                let bytes = self
                    .fetcher
                    .fetch(&uri)
                    .await
                    .map_err(|e| launch(e.to_string()))?;
                ExecutableModule::new(bytes)
            }
            BinarySource::Module(module) => module,
        };

        validate_module(module.bytes()).map_err(launch)?;
        Ok(module)
    }
}
