//! Pipeline state machine
//!
//! ```text
//! Idle -> Compiling -> Linking -> Running -> Succeeded
//!            |            |          |
//!            +------------+----------+--> Failed(stage)
//! ```
//!
//! Succeeded and Failed are terminal for one run; both accept a new run.

use std::fmt;

/// The three stages, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Compile,
    Link,
    Run,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Compile => write!(f, "compile"),
            StageKind::Link => write!(f, "link"),
            StageKind::Run => write!(f, "run"),
        }
    }
}

/// Where a run is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    Compiling,
    Linking,
    Running,
    Succeeded,
    /// Stopped during the given stage
    Failed(StageKind),
}

impl PipelineState {
    /// The active state for a stage
    pub fn for_stage(stage: StageKind) -> Self {
        match stage {
            StageKind::Compile => PipelineState::Compiling,
            StageKind::Link => PipelineState::Linking,
            StageKind::Run => PipelineState::Running,
        }
    }

    /// The stage a busy state is in
    pub fn active_stage(&self) -> Option<StageKind> {
        match self {
            PipelineState::Compiling => Some(StageKind::Compile),
            PipelineState::Linking => Some(StageKind::Link),
            PipelineState::Running => Some(StageKind::Run),
            _ => None,
        }
    }

    /// A run is in flight
    pub fn is_busy(&self) -> bool {
        self.active_stage().is_some()
    }

    /// Whether `self -> next` is a legal transition
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;
        match (*self, next) {
            (Idle | Succeeded | Failed(_), Compiling) => true,
            (Compiling, Linking) | (Linking, Running) | (Running, Succeeded) => true,
            (Compiling, Failed(StageKind::Compile))
            | (Linking, Failed(StageKind::Link))
            | (Running, Failed(StageKind::Run)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "idle"),
            PipelineState::Compiling => write!(f, "compiling"),
            PipelineState::Linking => write!(f, "linking"),
            PipelineState::Running => write!(f, "running"),
            PipelineState::Succeeded => write!(f, "succeeded"),
            PipelineState::Failed(stage) => write!(f, "failed ({})", stage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PipelineState::*;

    #[test]
    fn test_happy_path_transitions() {
        let path = [Idle, Compiling, Linking, Running, Succeeded];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_no_skipping_stages() {
        assert!(!Idle.can_transition_to(Linking));
        assert!(!Compiling.can_transition_to(Running));
        assert!(!Compiling.can_transition_to(Succeeded));
    }

    #[test]
    fn test_failure_matches_stage() {
        assert!(Linking.can_transition_to(Failed(StageKind::Link)));
        assert!(!Linking.can_transition_to(Failed(StageKind::Compile)));
    }

    #[test]
    fn test_terminal_states_accept_new_run() {
        assert!(Succeeded.can_transition_to(Compiling));
        assert!(Failed(StageKind::Run).can_transition_to(Compiling));
        assert!(!Running.can_transition_to(Compiling));
    }

    #[test]
    fn test_busy() {
        assert!(Compiling.is_busy());
        assert!(!Idle.is_busy());
        assert!(!Failed(StageKind::Compile).is_busy());
    }

    #[test]
    fn test_active_stage() {
        assert_eq!(Linking.active_stage(), Some(StageKind::Link));
        assert_eq!(Running.active_stage(), Some(StageKind::Run));
        assert_eq!(Succeeded.active_stage(), None);
        for stage in [StageKind::Compile, StageKind::Link, StageKind::Run] {
            assert_eq!(PipelineState::for_stage(stage).active_stage(), Some(stage));
        }
    }
}
