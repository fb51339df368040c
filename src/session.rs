//! [`TunnelSession`], the top-level entity (§3).

use crate::config::TunnelConfig;
use crate::frame::ConnectionState;
use crate::shutdown::Cancel;
use crate::socket::Socket;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::{mpsc, Mutex};

/// One acknowledgement handed from the demultiplexer to whichever `send`
/// call is currently awaiting one.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AckFrame {
    pub seq_number: u8,
    pub status: u8,
}

/// `send`'s private view of the at-most-one-inflight invariant (§3 invariant
/// 2): the sequence counter and the receiving half of the ack rendezvous are
/// locked together for the duration of one call, which is what makes "hold
/// the send mutex for the whole call" actually enforce "one send in flight".
pub(crate) struct SendSlot {
    pub send_seq: u8,
    pub ack_rx: mpsc::Receiver<AckFrame>,
}

/// The state backing an open tunnel. Shared via `Arc` between the
/// long-running demultiplexer task and every `send`/`close` caller.
///
/// Deliberately does **not** hold the writer ends of `ack_rendezvous` or
/// `inbound_queue`: those are owned exclusively by the receive
/// demultiplexer (§3 invariant 5, §4.5, §9 "the demultiplexer owns the
/// writer end"), and this struct is shared far more widely than the
/// demultiplexer task — every `SessionHandle` clone holds an `Arc` to it.
/// If the senders lived here, the channels would stay open for as long as
/// any clone existed, not just for as long as the demultiplexer ran. See
/// [`crate::demux::serve`] and [`crate::lifecycle::SessionHandle`].
pub struct TunnelSession {
    pub(crate) channel_id: u8,
    pub(crate) config: TunnelConfig,
    pub(crate) socket: Box<dyn Socket>,
    pub(crate) cancel: Cancel,

    /// `recv_seq` is mutated exclusively by the receive demultiplexer task;
    /// the atomic only exists so the field can live behind the shared `Arc`
    /// without a task-specific side channel. `Ordering::Relaxed` is safe
    /// because there is a single writer and no other field's visibility
    /// depends on it.
    pub(crate) recv_seq: AtomicU8,

    pub(crate) send_slot: Mutex<SendSlot>,

    pub(crate) heartbeat_tx: mpsc::Sender<ConnectionState>,
    pub(crate) heartbeat_rx: Mutex<mpsc::Receiver<ConnectionState>>,
}

impl TunnelSession {
    /// `ack_rx` is supplied by the caller rather than created here: its
    /// matching `ack_tx` is owned by the receive demultiplexer, not by this
    /// struct (see the type-level doc comment).
    pub(crate) fn new(
        channel_id: u8,
        config: TunnelConfig,
        socket: Box<dyn Socket>,
        cancel: Cancel,
        ack_rx: mpsc::Receiver<AckFrame>,
    ) -> Self {
        // Capacity 1: a rendezvous, not a queue — a second response arriving
        // before the first is drained means something is stale and should
        // be dropped, not buffered (§4.5).
        let (heartbeat_tx, heartbeat_rx) = mpsc::channel(1);
        Self {
            channel_id,
            config,
            socket,
            cancel,
            recv_seq: AtomicU8::new(0),
            send_slot: Mutex::new(SendSlot { send_seq: 0, ack_rx }),
            heartbeat_tx,
            heartbeat_rx: Mutex::new(heartbeat_rx),
        }
    }

    pub fn channel_id(&self) -> u8 {
        self.channel_id
    }

    pub fn config(&self) -> TunnelConfig {
        self.config
    }

    pub(crate) fn recv_seq(&self) -> u8 {
        self.recv_seq.load(Ordering::Relaxed)
    }

    pub(crate) fn advance_recv_seq(&self) {
        let current = self.recv_seq();
        self.recv_seq.store(current.wrapping_add(1), Ordering::Relaxed);
    }
}
