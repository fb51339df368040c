//! The [`Socket`] adapter trait (§6.1) — the collaborator layer.
//!
//! This crate never encodes or decodes gateway datagrams; it only ever moves
//! [`Frame`] values through a `Socket` implementation supplied by the
//! embedding application. The `mock` submodule provides an in-memory
//! implementation used by this crate's own tests.

use crate::error::TransportError;
use crate::frame::Frame;
use async_trait::async_trait;

/// A type-safe handle to the framed datagram transport.
///
/// Implementations must tolerate concurrent calls to [`Socket::send`] from
/// multiple tasks (the send path, the heartbeat supervisor, the connector,
/// and the disconnect-reply path may all send around the same time); the
/// inbound side (`recv`) is polled by exactly one task, the receive
/// demultiplexer.
#[async_trait]
pub trait Socket: Send + Sync {
    /// Encodes and transmits a single protocol frame.
    async fn send(&self, frame: Frame) -> Result<(), TransportError>;

    /// Yields the next decoded inbound frame, or `None` once the transport
    /// has permanently closed. Callers must stop polling after the first
    /// `None`.
    async fn recv(&self) -> Option<Frame>;

    /// Releases transport resources. Idempotent.
    async fn close(&self);
}

#[cfg(any(test, feature = "test-support"))]
pub mod mock {
    //! An in-memory [`Socket`] for tests: two channels stand in for the
    //! datagram substrate, one per direction, so a test can script exactly
    //! what the "gateway" sends and observe exactly what the client sends.

    use super::*;
    use tokio::sync::{mpsc, Mutex};

    /// The gateway-facing half of a [`MockSocket`] pair, used by tests to
    /// drive inbound traffic and observe outbound traffic.
    pub struct MockGateway {
        pub to_client: mpsc::Sender<Frame>,
        pub from_client: mpsc::Receiver<Frame>,
    }

    impl MockGateway {
        /// Delivers a frame to the client as if the gateway had sent it.
        pub async fn deliver(&self, frame: Frame) {
            self.to_client
                .send(frame)
                .await
                .expect("test client still listening");
        }

        /// Closes the inbound side, simulating a dead transport.
        pub fn hang_up(self) {
            drop(self.to_client);
        }

        /// Awaits the next frame the client sent, panicking on timeout so
        /// tests fail fast instead of hanging.
        pub async fn next_sent(&mut self) -> Frame {
            tokio::time::timeout(std::time::Duration::from_secs(5), self.from_client.recv())
                .await
                .expect("client did not send within the test timeout")
                .expect("client socket dropped")
        }
    }

    /// An in-process [`Socket`] backed by channels rather than a real
    /// transport.
    pub struct MockSocket {
        outbound: mpsc::Sender<Frame>,
        inbound: Mutex<mpsc::Receiver<Frame>>,
    }

    impl MockSocket {
        /// Builds a connected pair: the returned `MockSocket` is what the
        /// session holds, the returned `MockGateway` is the test's remote
        /// control over it.
        pub fn pair() -> (Self, MockGateway) {
            let (to_client, client_inbound) = mpsc::channel(32);
            let (to_gateway, from_client) = mpsc::channel(32);
            (
                Self {
                    outbound: to_gateway,
                    inbound: Mutex::new(client_inbound),
                },
                MockGateway {
                    to_client,
                    from_client,
                },
            )
        }
    }

    #[async_trait]
    impl Socket for MockSocket {
        async fn send(&self, frame: Frame) -> Result<(), TransportError> {
            self.outbound
                .send(frame)
                .await
                .map_err(|_| TransportError::new("mock gateway dropped"))
        }

        async fn recv(&self) -> Option<Frame> {
            self.inbound.lock().await.recv().await
        }

        async fn close(&self) {
            // Channels close on drop; nothing to do eagerly here.
        }
    }
}
