//! Pipeline error types

use super::state::StageKind;
use crate::archive::ArchiveError;
use crate::stage::StageError;
use crate::vfs::RecordError;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Reasons a run stops without a stage exit code
///
/// A stage exiting nonzero is not one of these; see
/// [`RunOutcome::Failed`](super::RunOutcome::Failed).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Another run holds the pipeline
    #[error("a run is already in progress")]
    RunAlreadyInProgress,

    /// A project file could not become a record
    #[error("invalid project file: {0}")]
    Project(#[from] RecordError),

    /// The sysroot archive could not be loaded
    #[error("sysroot: {0}")]
    Sysroot(#[from] ArchiveError),

    /// The sysroot download outlived the stage timeout
    #[error("sysroot: timed out after {after_ms} ms")]
    SysrootTimedOut { after_ms: u64 },

    /// The run was cancelled between stages
    #[error("run cancelled")]
    Cancelled,

    /// A stage could not run to completion
    #[error("{stage} stage: {source}")]
    Stage {
        stage: StageKind,
        #[source]
        source: StageError,
    },

    /// A stage succeeded but did not produce what the next one needs
    #[error("{stage} stage produced no {path}")]
    MissingArtifact { stage: StageKind, path: String },
}

impl PipelineError {
    /// The stage the run was in when this error stopped it
    pub fn stage(&self) -> Option<StageKind> {
        match self {
            PipelineError::RunAlreadyInProgress => None,
            PipelineError::Project(_)
            | PipelineError::Sysroot(_)
            | PipelineError::SysrootTimedOut { .. }
            | PipelineError::Cancelled => Some(StageKind::Compile),
            PipelineError::Stage { stage, .. } | PipelineError::MissingArtifact { stage, .. } => {
                Some(*stage)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::MissingArtifact {
            stage: StageKind::Link,
            path: "/program.wasm".into(),
        };
        assert_eq!(err.to_string(), "link stage produced no /program.wasm");

        let err = PipelineError::Stage {
            stage: StageKind::Compile,
            source: StageError::Cancelled {
                process: "clang".into(),
            },
        };
        assert_eq!(err.to_string(), "compile stage: clang: cancelled");
    }

    #[test]
    fn test_error_stage() {
        assert_eq!(PipelineError::RunAlreadyInProgress.stage(), None);
        let err = PipelineError::Sysroot(ArchiveError::Format("empty archive".into()));
        assert_eq!(err.stage(), Some(StageKind::Compile));
        let err = PipelineError::SysrootTimedOut { after_ms: 20 };
        assert_eq!(err.stage(), Some(StageKind::Compile));
        assert_eq!(err.to_string(), "sysroot: timed out after 20 ms");
    }
}
