//! Session phases and the pure transition function.
//!
//! Every decision the session makes about where to go next lives in
//! [`transition`], so the whole retry policy can be tested without a
//! transport.

use std::fmt;

use crate::selector::DeliveryMode;

/// Lifecycle phase of a connection session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Connecting,
    Discovering,
    Selecting,
    Subscribed,
    Polling,
    Disconnected,
    Retrying,
    Completed,
    Failed,
}

impl Phase {
    /// `Completed` and `Failed` end the session.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Discovering => "discovering",
            Self::Selecting => "selecting",
            Self::Subscribed => "subscribed",
            Self::Polling => "polling",
            Self::Disconnected => "disconnected",
            Self::Retrying => "retrying",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that happened while in a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Connected,
    ConnectFailed,
    Discovered,
    DiscoveryFailed,
    Selected(DeliveryMode),
    NoSuitableCharacteristic,
    /// Disconnect callback fired, liveness check failed, or the frame
    /// stream ended.
    LinkLost,
    /// The link of a lost connection has been released.
    LinkReleased,
    RetryElapsed,
    DeadlineReached,
}

/// Decide the next phase.
///
/// `deadline_passed` is whether the absolute session deadline has been
/// reached. Events that make no sense in `phase` leave it unchanged.
#[must_use]
pub fn transition(
    phase: Phase,
    event: SessionEvent,
    deadline_passed: bool,
    auto_reconnect: bool,
) -> Phase {
    use SessionEvent as E;

    if phase.is_terminal() {
        return phase;
    }
    if event == E::DeadlineReached {
        return Phase::Completed;
    }

    let may_retry = auto_reconnect && !deadline_passed;

    match (phase, event) {
        (Phase::Connecting, E::Connected) => Phase::Discovering,
        (Phase::Connecting, E::ConnectFailed) if may_retry => Phase::Retrying,
        (Phase::Connecting, E::ConnectFailed) => Phase::Failed,

        (Phase::Discovering, E::Discovered) => Phase::Selecting,
        (Phase::Discovering, E::DiscoveryFailed) => Phase::Failed,

        (Phase::Selecting, E::Selected(DeliveryMode::Notify)) => Phase::Subscribed,
        (Phase::Selecting, E::Selected(DeliveryMode::Poll)) => Phase::Polling,
        (Phase::Selecting, E::NoSuitableCharacteristic) => Phase::Failed,

        (Phase::Subscribed | Phase::Polling, E::LinkLost) => Phase::Disconnected,

        (Phase::Disconnected, E::LinkReleased) if deadline_passed => Phase::Completed,
        (Phase::Disconnected, E::LinkReleased) if auto_reconnect => Phase::Retrying,
        (Phase::Disconnected, E::LinkReleased) => Phase::Failed,

        (Phase::Retrying, E::RetryElapsed) => Phase::Connecting,

        (phase, _) => phase,
    }
}
