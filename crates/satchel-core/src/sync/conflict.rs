//! Conflict resolution policy
//!
//! The engine asks the policy two questions: whether a local save may go
//! ahead given the remote's current stamp, and whether an incoming remote
//! snapshot should replace local state. Swapping the policy changes how
//! concurrent sessions reconcile without touching the inventory model.

use crate::types::Timestamp;

/// What to do with a pending local save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveDecision {
    /// Write the local value
    Write,
    /// Drop the local value and adopt the remote one
    Adopt,
}

/// What to do with an incoming remote snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncomingDecision {
    /// Replace local state with the snapshot
    Apply,
    /// Our own echo: keep local state, record the stamp
    RecordOnly,
    /// Older than what we hold: drop it
    Ignore,
}

pub trait ConflictPolicy: Send + Sync {
    /// Decide a save; `local` is the newest remote stamp this session has seen
    fn before_save(&self, local: Timestamp, remote: Timestamp) -> SaveDecision;

    /// Decide an incoming snapshot
    fn on_incoming(&self, local: Timestamp, incoming: Timestamp, self_origin: bool)
        -> IncomingDecision;
}

/// Whole-value last-write-wins on the store's timestamps
///
/// A save is abandoned only when the remote is strictly newer. Incoming
/// snapshots at the same stamp are applied, so ties resolve to the remote.
#[derive(Debug, Clone, Copy, Default)]
pub struct LastWriteWins;

impl ConflictPolicy for LastWriteWins {
    fn before_save(&self, local: Timestamp, remote: Timestamp) -> SaveDecision {
        if remote > local {
            SaveDecision::Adopt
        } else {
            SaveDecision::Write
        }
    }

    fn on_incoming(
        &self,
        local: Timestamp,
        incoming: Timestamp,
        self_origin: bool,
    ) -> IncomingDecision {
        if self_origin {
            IncomingDecision::RecordOnly
        } else if incoming < local {
            IncomingDecision::Ignore
        } else {
            IncomingDecision::Apply
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_adopts_only_strictly_newer_remote() {
        let policy = LastWriteWins;
        assert_eq!(policy.before_save(10, 11), SaveDecision::Adopt);
        assert_eq!(policy.before_save(10, 10), SaveDecision::Write);
        assert_eq!(policy.before_save(10, 0), SaveDecision::Write);
    }

    #[test]
    fn test_incoming_decisions() {
        let policy = LastWriteWins;
        assert_eq!(policy.on_incoming(10, 12, true), IncomingDecision::RecordOnly);
        assert_eq!(policy.on_incoming(10, 9, false), IncomingDecision::Ignore);
        assert_eq!(policy.on_incoming(10, 10, false), IncomingDecision::Apply);
        assert_eq!(policy.on_incoming(10, 11, false), IncomingDecision::Apply);
    }
}
