//! The frame variants the [`Socket`](crate::socket::Socket) adapter carries.
//!
//! Encoding these to and from gateway datagrams is the collaborator's job
//! (§1 of the design); this module only names the shapes the session core
//! switches on.

/// An opaque payload carried over the tunnel. Its internal structure belongs
/// to the fieldbus application layer, not to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApplicationFrame(pub Vec<u8>);

impl From<Vec<u8>> for ApplicationFrame {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Outcome carried in a connection response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStatus {
    Ok,
    Busy,
    Rejected(u8),
}

/// Outcome carried in a connection-state (heartbeat) response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Normal,
    Other(u8),
}

impl ConnectionState {
    pub fn is_normal(self) -> bool {
        matches!(self, ConnectionState::Normal)
    }
}

/// A single protocol message exchanged with the gateway.
///
/// Variants prefixed `Connect`/`Disconnect`/`ConnectionState` manage the
/// tunnel itself; `Tunnel*` variants carry application traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Outbound: request to establish a tunnel.
    ConnectRequest,
    /// Inbound: gateway's answer to a connect request.
    ConnectResponse { channel_id: u8, status: ConnectStatus },
    /// Outbound: liveness probe.
    ConnectionStateRequest { channel_id: u8 },
    /// Inbound: answer to a liveness probe.
    ConnectionStateResponse { channel_id: u8, state: ConnectionState },
    /// Either direction: request to tear the tunnel down.
    DisconnectRequest { channel_id: u8 },
    /// Either direction: answer to a disconnect request.
    DisconnectResponse { channel_id: u8, status: u8 },
    /// Either direction: one sequenced application frame.
    TunnelRequest {
        channel_id: u8,
        seq_number: u8,
        payload: ApplicationFrame,
    },
    /// Either direction: acknowledgement of a [`Frame::TunnelRequest`].
    TunnelResponse {
        channel_id: u8,
        seq_number: u8,
        status: u8,
    },
}
