//! Pipeline orchestrator
//!
//! Drives one compile, link and run sequence. The orchestrator is the only
//! owner of the filesystem between stages: each stage gets a snapshot by
//! value and the orchestrator decides what the next one sees.
//!
//! ```text
//! project files ──┐
//!                 ├─ merge ─> clang ─> wasm-ld ─> /program.wasm ─> program
//! sysroot tar ────┘   (snapshot)  (snapshot)            (snapshot)
//! ```
//!
//! One run at a time. A run holds a [`CancelToken`] for its whole duration;
//! while it is held every other `run` call is rejected before any stage
//! starts. Dropping a run future mid-flight cancels the token and marks the
//! run failed in the stage it was in.

use super::error::{PipelineError, PipelineResult};
use super::project::ProjectFiles;
use super::state::{PipelineState, StageKind};
use super::toolchain::{
    COMPILER_PROCESS, EXECUTABLE_PATH, LINKER_PROCESS, PROGRAM_PROCESS, compile_args, link_args,
};
use crate::archive::ArchiveLoader;
use crate::config::IdeConfig;
use crate::console_log;
use crate::stage::{
    BinarySource, CancelToken, Cancellable, Cancelled, Elapsed, ExecutableModule, OutputSink,
    StageDescriptor, StageResult, StageRunner, with_deadline,
};
use crate::vfs::{FsSnapshot, merge_all};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// How a completed run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded,
    /// A stage exited nonzero
    Failed { stage: StageKind, exit_code: i32 },
}

/// Exit code and stderr of one stage that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSummary {
    pub stage: StageKind,
    pub exit_code: i32,
    pub stderr: String,
}

/// Everything a finished run leaves behind
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Stages that ran, in order
    pub stages: Vec<StageSummary>,
    /// Filesystem as the last stage left it
    pub output_fs: FsSnapshot,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::Succeeded
    }

    pub fn stage(&self, stage: StageKind) -> Option<&StageSummary> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

/// Compile, link and run driver
pub struct Pipeline {
    config: IdeConfig,
    runner: StageRunner,
    loader: ArchiveLoader,
    clock: fn() -> f64,
    state: Cell<PipelineState>,
    history: RefCell<Vec<PipelineState>>,
    active: RefCell<Option<CancelToken>>,
}

/// Releases the run slot when a run ends, however it ends
struct RunGuard<'a> {
    pipeline: &'a Pipeline,
    token: CancelToken,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.token.cancel();
        // Still busy only if the run future was dropped before it finished
        if let Some(stage) = self.pipeline.state.get().active_stage() {
            console_log!("[pipeline] Run dropped during {}", stage);
            self.pipeline.transition(PipelineState::Failed(stage));
        }
        self.pipeline.active.borrow_mut().take();
    }
}

impl Pipeline {
    pub fn new(config: IdeConfig, runner: StageRunner, loader: ArchiveLoader) -> Self {
        Self {
            config,
            runner,
            loader,
            clock: crate::vfs::now_ms,
            state: Cell::new(PipelineState::Idle),
            history: RefCell::new(Vec::new()),
            active: RefCell::new(None),
        }
    }

    /// Replace the clock used to stamp project files
    pub fn with_clock(mut self, clock: fn() -> f64) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &IdeConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.state.get()
    }

    /// States entered by the most recent run, in order
    pub fn history(&self) -> Vec<PipelineState> {
        self.history.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.active.borrow().is_some()
    }

    /// Cancel the in-flight run, if any
    ///
    /// The current stage fails with `StageError::Cancelled` and the run lands
    /// in `Failed`.
    pub fn cancel(&self) {
        if let Some(token) = self.active.borrow().as_ref() {
            console_log!("[pipeline] Cancelling run in {}", self.state.get());
            token.cancel();
        }
    }

    /// Compile, link and run the project
    ///
    /// stdout of every stage streams into `output`. When a stage fails its
    /// stderr is written there too and later stages are skipped. A stage
    /// that exits nonzero is an `Ok` report with a failed outcome; errors
    /// are reserved for runs that could not complete a stage at all.
    pub async fn run(
        &self,
        project: &ProjectFiles,
        output: Rc<dyn OutputSink>,
    ) -> PipelineResult<RunReport> {
        let guard = self.acquire()?;

        self.history.borrow_mut().clear();
        self.transition(PipelineState::Compiling);

        match self.execute(project, &output, &guard.token).await {
            Ok(report) => Ok(report),
            Err(err) => {
                console_log!("[pipeline] Run failed: {}", err);
                output.write(format!("{}\n", err).as_bytes());
                let stage = err.stage().unwrap_or(StageKind::Compile);
                self.transition(PipelineState::Failed(stage));
                Err(err)
            }
        }
    }

    fn acquire(&self) -> PipelineResult<RunGuard<'_>> {
        let mut active = self.active.borrow_mut();
        if active.is_some() {
            console_log!("[pipeline] Run rejected: already {}", self.state.get());
            return Err(PipelineError::RunAlreadyInProgress);
        }
        let token = CancelToken::new();
        *active = Some(token.clone());
        Ok(RunGuard {
            pipeline: self,
            token,
        })
    }

    fn transition(&self, next: PipelineState) {
        let current = self.state.get();
        debug_assert!(
            current.can_transition_to(next),
            "illegal transition {} -> {}",
            current,
            next
        );
        console_log!("[pipeline] {} -> {}", current, next);
        self.state.set(next);
        self.history.borrow_mut().push(next);
    }

    async fn execute(
        &self,
        project: &ProjectFiles,
        output: &Rc<dyn OutputSink>,
        cancel: &CancelToken,
    ) -> PipelineResult<RunReport> {
        // Taken before the first await so edits made mid-run are not seen
        let user_files = project.to_snapshot((self.clock)())?;
        let sysroot = self.load_sysroot(cancel).await?;
        // Archive last: a user file at a sysroot path is overridden
        let seeded = merge_all([&user_files, &sysroot]);

        let mut stages = Vec::with_capacity(3);

        let compile = StageDescriptor::new(
            BinarySource::Uri(self.config.compiler_url()),
            COMPILER_PROCESS,
        )
        .args(compile_args())
        .input(seeded)
        .timeout(self.config.stage_timeout());
        let compiled = self.stage(StageKind::Compile, compile, output, cancel).await?;
        if let Some(report) = self.settle(StageKind::Compile, &compiled, &mut stages, output) {
            return Ok(report);
        }

        self.transition(PipelineState::Linking);
        let link = StageDescriptor::new(BinarySource::Uri(self.config.linker_url()), LINKER_PROCESS)
            .args(link_args())
            .input(compiled.output)
            .timeout(self.config.stage_timeout());
        let linked = self.stage(StageKind::Link, link, output, cancel).await?;
        if let Some(report) = self.settle(StageKind::Link, &linked, &mut stages, output) {
            return Ok(report);
        }

        let executable = linked
            .output
            .get(EXECUTABLE_PATH)
            .ok_or_else(|| PipelineError::MissingArtifact {
                stage: StageKind::Link,
                path: EXECUTABLE_PATH.to_string(),
            })?;
        let module = ExecutableModule::new(executable.content().as_bytes().to_vec());

        self.transition(PipelineState::Running);
        let program = StageDescriptor::new(BinarySource::Module(module), PROGRAM_PROCESS)
            .input(linked.output)
            .timeout(self.config.run_timeout());
        let ran = self.stage(StageKind::Run, program, output, cancel).await?;
        if let Some(report) = self.settle(StageKind::Run, &ran, &mut stages, output) {
            return Ok(report);
        }

        self.transition(PipelineState::Succeeded);
        Ok(RunReport {
            outcome: RunOutcome::Succeeded,
            stages,
            output_fs: ran.output,
        })
    }

    /// Fetch and extract the sysroot under the stage deadline and the run's token
    async fn load_sysroot(&self, cancel: &CancelToken) -> PipelineResult<FsSnapshot> {
        let uri = self.config.sysroot_url();
        let timeout = self.config.stage_timeout();
        let load = Cancellable::new(self.loader.load(&uri), cancel);

        match with_deadline(self.runner.timer(), Some(timeout), load).await {
            Ok(Ok(sysroot)) => Ok(sysroot?),
            Ok(Err(Cancelled)) => Err(PipelineError::Cancelled),
            Err(Elapsed) => {
                cancel.cancel();
                Err(PipelineError::SysrootTimedOut {
                    after_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    async fn stage(
        &self,
        stage: StageKind,
        descriptor: StageDescriptor,
        output: &Rc<dyn OutputSink>,
        cancel: &CancelToken,
    ) -> PipelineResult<StageResult> {
        self.runner
            .run(descriptor, output.clone(), cancel)
            .await
            .map_err(|source| PipelineError::Stage { stage, source })
    }

    /// Record a finished stage; on nonzero exit surface stderr and end the run
    fn settle(
        &self,
        stage: StageKind,
        result: &StageResult,
        stages: &mut Vec<StageSummary>,
        output: &Rc<dyn OutputSink>,
    ) -> Option<RunReport> {
        stages.push(StageSummary {
            stage,
            exit_code: result.exit_code,
            stderr: result.stderr.clone(),
        });

        if result.is_success() {
            return None;
        }

        output.write(result.stderr.as_bytes());
        self.transition(PipelineState::Failed(stage));
        Some(RunReport {
            outcome: RunOutcome::Failed {
                stage,
                exit_code: result.exit_code,
            },
            stages: std::mem::take(stages),
            output_fs: result.output.clone(),
        })
    }
}
