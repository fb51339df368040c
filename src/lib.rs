//! A client endpoint for a connection-oriented tunnel to a fieldbus gateway.
//!
//! # Uses
//!
//! - Applications that need a reliable, sequenced channel to a gateway
//!   device over an unreliable framed transport, without hand-rolling their
//!   own retransmission and liveness bookkeeping.
//!
//! This crate owns the tunnel's session state machine: connection
//! establishment with retry, sequenced reliable delivery with
//! retransmission, demultiplexing of inbound traffic to the right
//! consumer, and an idle-triggered heartbeat that detects a silently dead
//! peer. It does not own the wire format or the transport itself; both are
//! supplied by the embedding application through the [`Socket`] trait.
//!
//! # Organization
//! - [`SessionHandle`] and [`InboundReceiver`] are the entry points most
//!   callers need.
//! - [`Frame`] and [`ApplicationFrame`] describe what crosses the wire.
//! - [`TunnelConfig`] describes the three timing parameters the core reacts
//!   to.
//!
//! # Session structure
//!
//! Establishing a tunnel produces a [`SessionHandle`] (a cheap, cloneable
//! reference to the session) and an [`InboundReceiver`] (the stream of
//! decoded application frames from the gateway). One clone of the handle
//! should be spawned as its own task running [`SessionHandle::run`]; the
//! rest are used to `send` and eventually `close`.

pub mod config;
pub mod connector;
pub mod demux;
pub mod error;
pub mod frame;
pub mod heartbeat;
pub mod lifecycle;
pub mod send;
pub mod session;
pub mod shutdown;
pub mod socket;

pub use config::TunnelConfig;
pub use error::{CancelReason, ConnectError, HeartbeatError, SendError, TerminalReason, TransportError, TunnelError};
pub use frame::{ApplicationFrame, ConnectStatus, ConnectionState, Frame};
pub use lifecycle::{InboundReceiver, SessionHandle};
pub use session::TunnelSession;
pub use shutdown::Cancel;
pub use socket::Socket;
