//! Core types and lifecycle events for callout

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::number::PhoneNumber;

/// The control channel a call is dispatched through
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Direct device-shell control (ADB)
    Local,
    /// Remote webhook-triggered automation
    Remote,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelKind::Local => write!(f, "local"),
            ChannelKind::Remote => write!(f, "remote"),
        }
    }
}

/// Lifecycle status of a call attempt
///
/// Transitions are forward-only: `Pending → Initiated → Ringing → {Ended | Failed}`,
/// with `Failed` reachable from any non-terminal state. `Ended` and `Failed` are
/// terminal and mutually exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    /// Created, nothing dispatched yet
    Pending,
    /// The initiate command was accepted by the channel
    Initiated,
    /// Holding the call open for the ring window
    Ringing,
    /// Completed the full lifecycle (a terminated call still counts as Ended)
    Ended,
    /// Terminal failure; the channel never held a call for this attempt
    Failed,
}

impl AttemptStatus {
    /// Returns true for the two terminal states
    pub fn is_terminal(&self) -> bool {
        matches!(self, AttemptStatus::Ended | AttemptStatus::Failed)
    }

    /// Whether the state machine permits moving from `self` to `next`
    pub fn can_advance_to(&self, next: AttemptStatus) -> bool {
        use AttemptStatus::*;
        matches!(
            (self, next),
            (Pending, Initiated)
                | (Pending, Failed)
                | (Initiated, Ringing)
                | (Initiated, Failed)
                | (Ringing, Ended)
                | (Ringing, Failed)
        )
    }
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AttemptStatus::Pending => "pending",
            AttemptStatus::Initiated => "initiated",
            AttemptStatus::Ringing => "ringing",
            AttemptStatus::Ended => "ended",
            AttemptStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// One pass of the dispatch lifecycle for a single number
///
/// Created at dispatch start, mutated through its status transitions by the
/// dispatcher, terminal at [`AttemptStatus::Ended`] or [`AttemptStatus::Failed`].
/// A retry creates a fresh attempt sharing the same [`PhoneNumber`]; an attempt
/// is never reused.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallAttempt {
    /// The number this attempt dials
    pub number: PhoneNumber,
    /// Which channel variant drove the attempt
    pub channel: ChannelKind,
    /// Current lifecycle status
    pub status: AttemptStatus,
    /// Failure reason, set only when `status` is `Failed`
    pub error: Option<String>,
    /// When the attempt was created
    pub started_at: DateTime<Utc>,
}

impl CallAttempt {
    /// Create a fresh attempt in the `Pending` state
    pub fn new(number: PhoneNumber, channel: ChannelKind) -> Self {
        Self {
            number,
            channel,
            status: AttemptStatus::Pending,
            error: None,
            started_at: Utc::now(),
        }
    }

    /// Advance to the next state if the transition is legal
    ///
    /// Returns false (and leaves the attempt unchanged) for backward or
    /// out-of-terminal transitions.
    pub fn advance(&mut self, next: AttemptStatus) -> bool {
        if self.status.can_advance_to(next) {
            self.status = next;
            true
        } else {
            false
        }
    }

    /// Mark the attempt failed with a reason, from any non-terminal state
    pub fn fail(&mut self, reason: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = AttemptStatus::Failed;
        self.error = Some(reason.into());
        true
    }
}

/// Event emitted during the dispatch lifecycle
///
/// Consumers subscribe via [`crate::CallDispatcher::subscribe`] or
/// [`crate::BatchRunner::subscribe`]; an embedding application typically
/// prints these to its console. The library itself never prints.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A dispatch attempt started for a number
    AttemptStarted {
        /// Raw number as read from the source list
        number: String,
        /// Canonical dialable form
        canonical: String,
        /// Channel the attempt goes through
        channel: ChannelKind,
    },

    /// A number failed validation and was skipped without any channel call
    SkippedInvalid {
        /// The raw number that failed validation
        number: String,
    },

    /// The channel accepted the initiate command
    Initiated {
        /// Raw number
        number: String,
    },

    /// The call is being held open for the ring window
    Ringing {
        /// Raw number
        number: String,
        /// Configured hold window in milliseconds
        hold_ms: u64,
    },

    /// The end-call command failed but the attempt still completed
    ///
    /// The call may have ended naturally on-device; command failure is not
    /// proof a call was still active.
    TerminationWarning {
        /// Raw number
        number: String,
        /// The termination error text
        error: String,
    },

    /// The attempt completed its full lifecycle
    Ended {
        /// Raw number
        number: String,
    },

    /// The attempt failed terminally
    Failed {
        /// Raw number
        number: String,
        /// Failure reason
        error: String,
    },

    /// The pre-batch reachability probe failed
    ProbeFailed {
        /// Probe error text
        error: String,
    },

    /// The batch aborted early because the channel became unreachable
    BatchAborted {
        /// The connectivity error that triggered the abort
        error: String,
    },

    /// The batch finished (normally or via abort)
    BatchComplete {
        /// Final counts for the run
        summary: BatchSummary,
    },
}

/// Final counts for one batch run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Attempts that completed the full lifecycle
    pub ended: u32,
    /// Attempts that failed terminally after reaching the channel
    pub failed: u32,
    /// Numbers rejected by validation, never dispatched to the channel
    pub skipped_invalid: u32,
    /// True when the run stopped before exhausting the list
    pub aborted: bool,
}

impl BatchSummary {
    /// Total numbers that produced a terminal outcome or skip
    pub fn processed(&self) -> u32 {
        self.ended + self.failed + self.skipped_invalid
    }
}
