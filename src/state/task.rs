//! Task and outcome definitions for the two pipeline stages

use std::fmt;

/// A listing page number. Issued once by the page source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageTask(pub u32);

impl PageTask {
    pub fn number(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PageTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A review identifier discovered on a listing page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemTask(pub String);

impl ItemTask {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a task was given up on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbandonReason {
    /// The request never produced a response
    Transport(String),

    /// The resource does not exist (HTTP 404)
    NotFound,

    /// Any other non-success status
    Status(u16),

    /// The body could not be turned into a result
    Extract(String),

    /// The record could not be written
    Persist(String),

    /// The downstream queue has no receivers left
    QueueClosed,
}

impl fmt::Display for AbandonReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {}", e),
            Self::NotFound => write!(f, "not found"),
            Self::Status(code) => write!(f, "HTTP {}", code),
            Self::Extract(e) => write!(f, "extraction failed: {}", e),
            Self::Persist(e) => write!(f, "persist failed: {}", e),
            Self::QueueClosed => write!(f, "review queue closed"),
        }
    }
}

/// How one drawn task was resolved by the worker that drew it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Work done; `attempts` counts empty-content retries plus the final attempt
    Completed { attempts: u32 },

    /// Given up on; the worker moves on to its next task
    Abandoned { reason: AbandonReason, attempts: u32 },

    /// The page source has no more pages; the worker stops drawing
    Exhausted,

    /// Cancellation arrived while the task was waiting (retry sleep or enqueue)
    Cancelled { attempts: u32 },
}

impl TaskOutcome {
    /// Returns true if the worker must stop drawing tasks after this outcome
    ///
    /// A cancelled task does not stop the worker by itself; the stage's draw
    /// policy decides whether it keeps drawing after cancellation.
    pub fn stops_worker(&self) -> bool {
        matches!(self, Self::Exhausted)
    }

    /// Number of fetch attempts made for the task
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Completed { attempts }
            | Self::Abandoned { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
            Self::Exhausted => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Abandoned { .. } => "abandoned",
            Self::Exhausted => "exhausted",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abandoned { reason, .. } => write!(f, "abandoned ({})", reason),
            other => f.write_str(other.as_str()),
        }
    }
}
