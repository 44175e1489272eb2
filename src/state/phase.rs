/// Pipeline phase definitions for the shutdown sequence
///
/// Phases only move forward, one step at a time.
use std::fmt;

/// Current phase of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelinePhase {
    /// Both stages accept work
    Running,

    /// The page stage is stopping; the review stage keeps consuming
    DrainingPages,

    /// Every page worker has exited; the review stage is stopping
    DrainingReviews,

    /// Every worker has exited
    Stopped,
}

impl PipelinePhase {
    /// Returns the phase that follows this one, if any
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Running => Some(Self::DrainingPages),
            Self::DrainingPages => Some(Self::DrainingReviews),
            Self::DrainingReviews => Some(Self::Stopped),
            Self::Stopped => None,
        }
    }

    /// Returns true if moving from `self` to `to` is allowed
    pub fn can_transition_to(&self, to: Self) -> bool {
        self.next() == Some(to)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::DrainingPages => "draining_pages",
            Self::DrainingReviews => "draining_reviews",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
