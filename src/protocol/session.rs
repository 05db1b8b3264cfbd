//! Session lifecycle states.

use std::fmt;

/// Session state machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No connection yet, or the last connect attempt failed
    #[default]
    Unconnected,
    /// Socket open, handshake in progress
    Handshaking,
    /// Handshake done, loops running
    Active,
    /// Shutdown requested, loops winding down
    Stopping,
    /// Loops exited and socket closed (terminal)
    Stopped,
}

impl SessionState {
    /// Check whether moving to `next` is a legal transition.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (Self::Unconnected, Self::Handshaking)
                | (Self::Handshaking, Self::Active | Self::Unconnected | Self::Stopped)
                | (Self::Active, Self::Stopping)
                | (Self::Stopping, Self::Stopped)
        )
    }

    /// Sends are accepted only in this state.
    pub fn is_active(self) -> bool {
        self == SessionState::Active
    }

    /// Terminal state reached.
    pub fn is_stopped(self) -> bool {
        self == SessionState::Stopped
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unconnected => "unconnected",
            SessionState::Handshaking => "handshaking",
            SessionState::Active => "active",
            SessionState::Stopping => "stopping",
            SessionState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}
