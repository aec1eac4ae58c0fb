/// Engine lifecycle state definitions
///
/// A run moves `Idle → Running → Draining → Stopped`. A stopped engine returns
/// to `Idle` before it can run again.
use std::fmt;

/// Represents the current lifecycle state of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    /// No run has started, or the previous run was reset
    Idle,

    /// Dispatching requests from the frontier
    Running,

    /// No new dispatch; waiting for in-flight tasks to finish
    Draining,

    /// Stages closed and final stats emitted
    Stopped,
}

impl EngineState {
    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: EngineState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Running, Self::Draining)
                | (Self::Draining, Self::Stopped)
                | (Self::Stopped, Self::Idle)
        )
    }

    /// Returns true while a run is in progress
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Draining)
    }

    /// Returns true if new requests may be dispatched
    pub fn accepts_dispatch(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Running => 1,
            Self::Draining => 2,
            Self::Stopped => 3,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Draining,
            3 => Self::Stopped,
            _ => Self::Idle,
        }
    }

    /// Returns all lifecycle states in order
    pub fn all_states() -> [Self; 4] {
        [Self::Idle, Self::Running, Self::Draining, Self::Stopped]
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
