//! Replication activity levels and status.

use std::fmt;

/// The replication session's current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityLevel {
    /// No replication is running.
    Stopped,
    /// The endpoint is unreachable; the replicator waits to reconnect.
    Offline,
    /// The replicator is establishing a connection.
    Connecting,
    /// Connected with no documents left to transfer.
    Idle,
    /// Actively transferring documents.
    Busy,
}

impl ActivityLevel {
    /// Returns true while the replicator is making progress.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Busy)
    }

    /// Returns true for the levels that end a blocking start wait:
    /// converged (`Idle`), unreachable (`Offline`) or terminated
    /// (`Stopped`).
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Idle | Self::Offline | Self::Stopped)
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Offline => "offline",
            Self::Connecting => "connecting",
            Self::Idle => "idle",
            Self::Busy => "busy",
        };
        f.write_str(name)
    }
}

/// An error reported by the replication collaborator alongside a status.
///
/// Observed through the status listener for diagnostics only; it never
/// alters the session's state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusError {
    /// Collaborator-assigned error code.
    pub code: i32,
    /// Human-readable detail.
    pub message: String,
}

/// A point-in-time reading of the replication collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicatorStatus {
    /// Current activity level.
    pub activity: ActivityLevel,
    /// Error reported with this status, if any.
    pub error: Option<StatusError>,
}

impl ReplicatorStatus {
    /// A status at `activity` with no error.
    #[must_use]
    pub fn at(activity: ActivityLevel) -> Self {
        Self {
            activity,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names() {
        assert_eq!(ActivityLevel::Stopped.to_string(), "stopped");
        assert_eq!(ActivityLevel::Offline.to_string(), "offline");
        assert_eq!(ActivityLevel::Connecting.to_string(), "connecting");
        assert_eq!(ActivityLevel::Idle.to_string(), "idle");
        assert_eq!(ActivityLevel::Busy.to_string(), "busy");
    }

    #[test]
    fn settled_levels_end_the_start_wait() {
        assert!(ActivityLevel::Idle.is_settled());
        assert!(ActivityLevel::Offline.is_settled());
        assert!(ActivityLevel::Stopped.is_settled());
        assert!(!ActivityLevel::Connecting.is_settled());
        assert!(!ActivityLevel::Busy.is_settled());

        assert!(ActivityLevel::Connecting.is_active());
        assert!(ActivityLevel::Busy.is_active());
        assert!(!ActivityLevel::Idle.is_active());
    }
}
