//! Error enums for each subsystem boundary (§7).
//!
//! Matches the teacher's layering of one small `thiserror` enum per seam
//! rather than a single crate-wide catch-all, with `#[from]` conversions
//! where a lower-layer failure is always a cause of the higher-layer one.

use std::fmt;

/// The socket adapter's failure mode. Opaque beyond a human-readable reason:
/// the transport implementation (external collaborator, §6.1) is the only
/// thing that knows what actually went wrong on the wire.
#[derive(Debug, Clone, thiserror::Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Why cancellation happened, carried through as the terminal reason for a
/// cancelled scope (§7 item 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// `close()` was called, or the caller's deadline expired.
    Closed,
    /// A per-call deadline (connect/send/heartbeat) elapsed.
    DeadlineElapsed,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Closed => write!(f, "session closed"),
            CancelReason::DeadlineElapsed => write!(f, "deadline elapsed"),
        }
    }
}

/// Failure of [`crate::connector::connect`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("connect cancelled: {0}")]
    Cancelled(CancelReason),
    #[error("gateway rejected connection with status {0}")]
    Rejected(u8),
    #[error("socket inbound closed before a connect response arrived")]
    InboundClosed,
}

/// Failure of [`crate::send::send`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum SendError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("send cancelled: {0}")]
    Cancelled(CancelReason),
    #[error("gateway rejected the frame with status {0}")]
    Rejected(u8),
    #[error("ack channel closed")]
    AckChannelClosed,
}

/// Why the heartbeat supervisor gave up (§4.4). Always terminal to the
/// session when it occurs.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HeartbeatError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("heartbeat probe cancelled: {0}")]
    Cancelled(CancelReason),
    #[error("heartbeat response did not arrive within the response timeout")]
    TimedOut,
    #[error("gateway reported a non-normal connection state")]
    NonNormalState,
}

/// Why [`crate::demux::serve`] returned (§4.5's state table). The disconnect
/// request/response cases both collapse to `Disconnected`: the spec's state
/// table gives them the same next state ("Terminal (normal)") and does not
/// distinguish who initiated the teardown.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TerminalReason {
    #[error("session cancelled: {0}")]
    Cancelled(CancelReason),
    #[error("heartbeat did not succeed")]
    HeartbeatFailed,
    #[error("socket inbound closed")]
    SocketClosed,
    #[error("tunnel disconnected")]
    Disconnected,
}

/// Top-level error returned by the session lifecycle API (§6.2).
#[derive(Debug, Clone, thiserror::Error)]
pub enum TunnelError {
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error(transparent)]
    Send(#[from] SendError),
}
