/// Request phase definitions for tracking a single in-flight fetch
///
/// Every fetch walks `Idle -> Requesting -> StreamingBody -> Done`, or ends
/// early in one of the failure phases.
use std::fmt;

/// Represents the current phase of one slot's request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestPhase {
    // ===== Active Phases =====
    /// Slot claimed a URL but no request has been sent yet
    Idle,

    /// GET sent, waiting for response headers
    Requesting,

    /// Response accepted, body being read and decoded
    StreamingBody,

    // ===== Terminal Success Phase =====
    /// Whole body received and decoded
    Done,

    // ===== Terminal Failure Phases =====
    /// The fetch exceeded the configured maximum time
    TimedOut,

    /// Connection failure, protocol error, or non-2xx status
    Failed,

    /// The crawl was aborted while this request was active
    Cancelled,
}

impl RequestPhase {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Done | Self::TimedOut | Self::Failed | Self::Cancelled
        )
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: RequestPhase) -> bool {
        match (self, next) {
            (Self::Idle, Self::Requesting | Self::Cancelled) => true,
            (
                Self::Requesting,
                Self::StreamingBody | Self::TimedOut | Self::Failed | Self::Cancelled,
            ) => true,
            (
                Self::StreamingBody,
                Self::Done | Self::TimedOut | Self::Failed | Self::Cancelled,
            ) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Requesting => "requesting",
            Self::StreamingBody => "streaming_body",
            Self::Done => "done",
            Self::TimedOut => "timed_out",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns all possible request phases
    pub fn all_phases() -> Vec<Self> {
        vec![
            Self::Idle,
            Self::Requesting,
            Self::StreamingBody,
            Self::Done,
            Self::TimedOut,
            Self::Failed,
            Self::Cancelled,
        ]
    }
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
