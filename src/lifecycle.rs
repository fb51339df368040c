//! The public session API (§4.6, §6.2): the thin shell that wires the
//! connector, send path, and demultiplexer into something an embedding
//! application can hold onto.

use crate::config::TunnelConfig;
use crate::connector;
use crate::demux;
use crate::error::{TerminalReason, TunnelError};
use crate::frame::ApplicationFrame;
use crate::session::TunnelSession;
use crate::shutdown::Cancel;
use crate::socket::Socket;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

/// Capacity of the queue handed to the external consumer. Not a rendezvous
/// like the internal ack/heartbeat channels: a slow consumer should be able
/// to fall a few frames behind without stalling the demultiplexer's other
/// duties, at the cost of eventually back-pressuring the gateway's sender.
const INBOUND_QUEUE_CAPACITY: usize = 32;

/// A finite stream of inbound application frames. Closes when the session
/// terminates.
pub struct InboundReceiver(mpsc::Receiver<ApplicationFrame>);

impl InboundReceiver {
    pub async fn recv(&mut self) -> Option<ApplicationFrame> {
        self.0.recv().await
    }
}

/// The writer ends `demux::serve` owns for the lifetime of the run. Held
/// separately from `TunnelSession` itself (see that type's doc comment) and
/// handed to whichever `SessionHandle` clone actually calls `run`, so they
/// drop — closing `ack_rendezvous` and `inbound_queue` — when that task
/// ends, not whenever the last `SessionHandle` clone happens to be dropped.
struct DemuxInputs {
    ack_tx: mpsc::Sender<crate::session::AckFrame>,
    inbound_tx: mpsc::Sender<ApplicationFrame>,
}

/// The user-facing view of an open tunnel. Cheap to clone: every clone
/// shares the same underlying session, so one clone can be moved into
/// `run` while others remain to call `send`/`close`.
///
/// `demux_inputs` is taken exactly once, by whichever clone's `run` call
/// gets there first; see [`DemuxInputs`].
#[derive(Clone)]
pub struct SessionHandle {
    session: Arc<TunnelSession>,
    demux_inputs: Arc<Mutex<Option<DemuxInputs>>>,
}

impl SessionHandle {
    /// Establishes a tunnel over `socket` and returns a handle plus its
    /// inbound frame stream.
    ///
    /// `deadline` bounds the connect handshake only; once open, the session
    /// has no overall lifetime limit beyond its own cancellation.
    pub async fn open(
        socket: Box<dyn Socket>,
        config: TunnelConfig,
        deadline: Duration,
    ) -> Result<(Self, InboundReceiver), TunnelError> {
        let config = config.validated();
        let channel_id = connector::connect(socket.as_ref(), config, deadline).await?;

        // Capacity 1: a rendezvous, matching `SendSlot`'s receiving half.
        let (ack_tx, ack_rx) = mpsc::channel(1);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_CAPACITY);
        let cancel = Cancel::new();
        let session = Arc::new(TunnelSession::new(channel_id, config, socket, cancel, ack_rx));
        info!(channel_id, "tunnel session opened");

        Ok((
            Self {
                session,
                demux_inputs: Arc::new(Mutex::new(Some(DemuxInputs { ack_tx, inbound_tx }))),
            },
            InboundReceiver(inbound_rx),
        ))
    }

    /// Runs the receive demultiplexer until the session ends. Meant to be
    /// driven on its own task (`tokio::spawn(handle.clone().run())`),
    /// leaving this handle free for `send`/`close`.
    ///
    /// # Panics
    ///
    /// Panics if called more than once (across any clone of this handle):
    /// the demultiplexer is meant to run exactly once per session, and its
    /// writer ends can only be handed out a single time.
    pub async fn run(self) -> TerminalReason {
        let inputs = self
            .demux_inputs
            .lock()
            .await
            .take()
            .expect("SessionHandle::run called more than once for the same session");
        demux::serve(self.session, inputs.ack_tx, inputs.inbound_tx).await
    }

    /// Sends one application frame reliably, bounded by `response_timeout`.
    pub async fn send(&self, frame: ApplicationFrame) -> Result<(), TunnelError> {
        let deadline = self.session.config.response_timeout;
        crate::send::send(&self.session, frame, deadline).await?;
        Ok(())
    }

    /// Triggers cancellation. Idempotent and non-blocking; `run` will return
    /// a cancellation terminal reason and the inbound queue will close.
    pub fn close(&self) {
        self.session.cancel.cancel();
    }

    pub fn channel_id(&self) -> u8 {
        self.session.channel_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{ConnectStatus, Frame};
    use crate::socket::mock::MockSocket;

    #[tokio::test]
    async fn open_connects_and_assigns_channel() {
        let (socket, mut gateway) = MockSocket::pair();
        let opening = tokio::spawn(async move {
            SessionHandle::open(Box::new(socket), TunnelConfig::default(), Duration::from_secs(2)).await
        });

        assert_eq!(gateway.next_sent().await, Frame::ConnectRequest);
        gateway
            .deliver(Frame::ConnectResponse { channel_id: 4, status: ConnectStatus::Ok })
            .await;

        let (handle, _inbound) = opening.await.unwrap().unwrap();
        assert_eq!(handle.channel_id(), 4);
    }

    #[tokio::test]
    async fn close_before_run_makes_run_return_cancelled() {
        let (socket, mut gateway) = MockSocket::pair();
        let opening = tokio::spawn(async move {
            SessionHandle::open(Box::new(socket), TunnelConfig::default(), Duration::from_secs(2)).await
        });
        gateway.next_sent().await;
        gateway
            .deliver(Frame::ConnectResponse { channel_id: 1, status: ConnectStatus::Ok })
            .await;
        let (handle, _inbound) = opening.await.unwrap().unwrap();

        handle.close();
        let reason = handle.run().await;
        assert_eq!(reason, crate::error::TerminalReason::Cancelled(crate::error::CancelReason::Closed));
    }

    #[tokio::test]
    async fn inbound_frames_reach_the_consumer() {
        let (socket, mut gateway) = MockSocket::pair();
        let opening = tokio::spawn(async move {
            SessionHandle::open(Box::new(socket), TunnelConfig::default(), Duration::from_secs(2)).await
        });
        gateway.next_sent().await;
        gateway
            .deliver(Frame::ConnectResponse { channel_id: 1, status: ConnectStatus::Ok })
            .await;
        let (handle, mut inbound) = opening.await.unwrap().unwrap();

        let running = tokio::spawn(handle.run());
        gateway
            .deliver(Frame::TunnelRequest {
                channel_id: 1,
                seq_number: 0,
                payload: ApplicationFrame(b"payload".to_vec()),
            })
            .await;
        gateway.next_sent().await; // the ack

        let frame = inbound.recv().await.unwrap();
        assert_eq!(frame, ApplicationFrame(b"payload".to_vec()));

        gateway.deliver(Frame::DisconnectRequest { channel_id: 1 }).await;
        running.await.unwrap();
    }

    /// Exercises the bug a prior revision had: a retained clone of the
    /// handle must not keep the inbound queue open after `run` completes.
    #[tokio::test]
    async fn inbound_queue_closes_even_with_a_handle_clone_outliving_run() {
        let (socket, mut gateway) = MockSocket::pair();
        let opening = tokio::spawn(async move {
            SessionHandle::open(Box::new(socket), TunnelConfig::default(), Duration::from_secs(2)).await
        });
        gateway.next_sent().await;
        gateway
            .deliver(Frame::ConnectResponse { channel_id: 1, status: ConnectStatus::Ok })
            .await;
        let (handle, mut inbound) = opening.await.unwrap().unwrap();
        let retained = handle.clone();

        let running = tokio::spawn(handle.run());
        retained.close();
        running.await.unwrap();

        // `retained` is still alive here; the queue must close anyway.
        assert!(
            tokio::time::timeout(Duration::from_secs(1), inbound.recv())
                .await
                .expect("inbound queue did not close in time")
                .is_none()
        );
    }
}
