use std::fmt;

/// Lifecycle of a playback session.
///
/// `Idle -> Preparing -> Loading -> Draining -> Idle`. Pausing is tracked
/// separately and can overlap any of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    /// Downloading; tracks are not known yet.
    Preparing,
    /// Tracks are known and samples are being queued.
    Loading,
    /// Every segment is queued and end of stream has been signaled; the
    /// sink is consuming what is left.
    Draining,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Preparing => "preparing",
            PipelineState::Loading => "loading",
            PipelineState::Draining => "draining",
        }
    }

    /// A download or demux worker may still be running.
    pub fn is_active(&self) -> bool {
        matches!(self, PipelineState::Preparing | PipelineState::Loading)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_preparing_and_loading_are_active() {
        assert!(!PipelineState::Idle.is_active());
        assert!(PipelineState::Preparing.is_active());
        assert!(PipelineState::Loading.is_active());
        assert!(!PipelineState::Draining.is_active());
        assert_eq!(PipelineState::default(), PipelineState::Idle);
        assert_eq!(PipelineState::Draining.to_string(), "draining");
    }
}
