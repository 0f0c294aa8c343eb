//! Error types for stage execution
//!
//! A nonzero exit code is not an error here. It is reported on
//! [`StageResult`](super::StageResult) and left for the pipeline to judge.

use thiserror::Error;

pub type RunnerResult<T> = Result<T, StageError>;

/// What the external WASI host can report besides a normal exit
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The module could not be compiled or instantiated
    #[error("launch failed: {0}")]
    Launch(String),
    /// The host terminated the process abnormally
    #[error("killed: {0}")]
    Killed(String),
}

/// Fatal stage errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    /// Binary could not be fetched, was not a module, or failed to start
    #[error("{process}: could not launch: {reason}")]
    Launch { process: String, reason: String },

    /// The host killed the process
    #[error("{process}: execution aborted: {reason}")]
    Aborted { process: String, reason: String },

    /// The stage ran past its deadline and was cancelled
    #[error("{process}: timed out after {after_ms} ms")]
    TimedOut { process: String, after_ms: u64 },

    /// The stage was cancelled by the caller
    #[error("{process}: cancelled")]
    Cancelled { process: String },
}

impl StageError {
    pub(crate) fn from_host(process: &str, err: HostError) -> Self {
        match err {
            HostError::Launch(reason) => StageError::Launch {
                process: process.to_string(),
                reason,
            },
            HostError::Killed(reason) => StageError::Aborted {
                process: process.to_string(),
                reason,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StageError::Launch {
            process: "clang".into(),
            reason: "fetch /clang.wasm failed: HTTP 404".into(),
        };
        assert_eq!(
            err.to_string(),
            "clang: could not launch: fetch /clang.wasm failed: HTTP 404"
        );

        let err = StageError::TimedOut {
            process: "program".into(),
            after_ms: 30000,
        };
        assert!(err.to_string().contains("30000"));
    }

    #[test]
    fn test_host_error_mapping() {
        let err = StageError::from_host("wasm-ld", HostError::Killed("worker terminated".into()));
        assert_eq!(
            err,
            StageError::Aborted {
                process: "wasm-ld".into(),
                reason: "worker terminated".into()
            }
        );

        let err = StageError::from_host("clang", HostError::Launch("bad module".into()));
        assert!(matches!(err, StageError::Launch { .. }));
    }
}
