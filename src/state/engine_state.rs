/// Lifecycle states of the crawl engine
///
/// The engine moves `Idle -> Running -> (Draining | ShuttingDown) -> Stopped`.
/// `Draining` is the orderly end of a crawl (frontier exhausted or seen ceiling
/// reached); `ShuttingDown` is entered when an interrupt arrives.
use std::fmt;

/// Represents the current state of the crawl engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    /// Constructed, frontier not yet loaded
    Idle,

    /// Dispatching batches
    Running,

    /// Crawl finished on its own; writing the final checkpoint
    Draining,

    /// Interrupted; in-flight work abandoned, checkpoint being written
    ShuttingDown,

    /// Terminal
    Stopped,
}

impl EngineState {
    /// Returns true if the engine may move from `self` to `next`
    pub fn can_transition_to(&self, next: EngineState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Running, Self::Draining)
                | (Self::Running, Self::ShuttingDown)
                | (Self::Draining, Self::Stopped)
                | (Self::ShuttingDown, Self::Stopped)
        )
    }

    /// Returns true if this is the terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Returns true while the engine is winding down
    pub fn is_stopping(&self) -> bool {
        matches!(self, Self::Draining | Self::ShuttingDown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::ShuttingDown => "shutting_down",
            Self::Stopped => "stopped",
        }
    }

    /// Returns all engine states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Idle,
            Self::Running,
            Self::Draining,
            Self::ShuttingDown,
            Self::Stopped,
        ]
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
