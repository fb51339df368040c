//! The receive demultiplexer: the single long-running task that owns the
//! socket's inbound sequence and drives the whole session (§4.5).

use crate::error::{CancelReason, HeartbeatError, TerminalReason};
use crate::frame::{ApplicationFrame, Frame};
use crate::heartbeat;
use crate::session::{AckFrame, TunnelSession};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Runs until the session ends for any reason and reports why.
///
/// `ack_tx` and `inbound_tx` are owned by this function, not by `session`:
/// this is what makes it the sole writer into `ack_rendezvous` and
/// `inbound_queue`, and what closes both exactly once, regardless of how
/// many `SessionHandle` clones (each holding its own `Arc` to `session`)
/// are still alive when this function returns (§3 invariant 5, §4.5, §9).
pub async fn serve(
    session: Arc<TunnelSession>,
    ack_tx: mpsc::Sender<AckFrame>,
    inbound_tx: mpsc::Sender<ApplicationFrame>,
) -> TerminalReason {
    let span = tracing::info_span!("demux", channel_id = session.channel_id);
    let _enter = span.enter();

    let mut idle = tokio::time::interval(session.config.heartbeat_delay);
    idle.tick().await; // consume the immediate first tick.

    // `Some` while a heartbeat supervisor is outstanding. Its resolution to
    // `Ok(failure)` is a fatal indication; resolution to `Err` (sender
    // dropped without sending) means the probe succeeded silently.
    let mut heartbeat_timeout: Option<oneshot::Receiver<HeartbeatError>> = None;

    loop {
        tokio::select! {
            _ = session.cancel.cancelled() => {
                info!("session cancelled");
                return TerminalReason::Cancelled(CancelReason::Closed);
            }

            result = async {
                match heartbeat_timeout.as_mut() {
                    Some(rx) => rx.await,
                    None => std::future::pending().await,
                }
            } => {
                match result {
                    Ok(failure) => {
                        warn!(%failure, "heartbeat supervisor reported failure");
                        return TerminalReason::HeartbeatFailed;
                    }
                    Err(_) => {
                        debug!("heartbeat succeeded");
                        heartbeat_timeout = None;
                        idle.reset();
                    }
                }
            }

            _ = idle.tick(), if heartbeat_timeout.is_none() => {
                debug!("no inbound traffic for heartbeat_delay, probing liveness");
                let (tx, rx) = oneshot::channel();
                heartbeat_timeout = Some(rx);
                tokio::spawn(heartbeat::supervise(session.clone(), tx));
            }

            frame = session.socket.recv() => {
                match frame {
                    None => {
                        warn!("socket inbound closed");
                        return TerminalReason::SocketClosed;
                    }
                    Some(frame) => {
                        idle.reset();
                        if let Some(reason) = handle_frame(&session, frame, &ack_tx, &inbound_tx).await {
                            return reason;
                        }
                    }
                }
            }
        }
    }
}

/// Dispatches one inbound frame. Returns `Some` when the frame ends the
/// session (disconnect request/response on the matching channel).
async fn handle_frame(
    session: &Arc<TunnelSession>,
    frame: Frame,
    ack_tx: &mpsc::Sender<AckFrame>,
    inbound_tx: &mpsc::Sender<ApplicationFrame>,
) -> Option<TerminalReason> {
    match frame {
        Frame::DisconnectRequest { channel_id } => {
            if channel_id != session.channel_id {
                warn!(channel_id, "disconnect request for foreign channel");
                return None;
            }
            if let Err(err) = session
                .socket
                .send(Frame::DisconnectResponse { channel_id, status: 0 })
                .await
            {
                warn!(%err, "failed to send disconnect response");
            }
            info!("disconnected by gateway request");
            Some(TerminalReason::Disconnected)
        }

        Frame::DisconnectResponse { channel_id, .. } => {
            if channel_id != session.channel_id {
                warn!(channel_id, "disconnect response for foreign channel");
                return None;
            }
            info!("disconnected, response received");
            Some(TerminalReason::Disconnected)
        }

        Frame::TunnelRequest { channel_id, seq_number, payload } => {
            if channel_id != session.channel_id {
                warn!(channel_id, "tunnel request for foreign channel, not acking");
                return None;
            }

            if seq_number == session.recv_seq() {
                session.advance_recv_seq();
                spawn_detached_send(inbound_tx.clone(), payload, session.cancel.clone(), None);
            } else {
                debug!(seq_number, expected = session.recv_seq(), "dropping duplicate or out-of-order frame");
            }

            if let Err(err) = session
                .socket
                .send(Frame::TunnelResponse { channel_id, seq_number, status: 0 })
                .await
            {
                warn!(%err, "failed to ack tunnel request");
            }
            None
        }

        Frame::TunnelResponse { channel_id, seq_number, status } => {
            if channel_id != session.channel_id {
                warn!(channel_id, "tunnel response for foreign channel");
                return None;
            }
            spawn_detached_send(
                ack_tx.clone(),
                AckFrame { seq_number, status },
                session.cancel.clone(),
                Some(session.config.resend_interval),
            );
            None
        }

        Frame::ConnectionStateResponse { channel_id, state } => {
            if channel_id != session.channel_id {
                warn!(channel_id, "connection-state response for foreign channel");
                return None;
            }
            spawn_detached_send(
                session.heartbeat_tx.clone(),
                state,
                session.cancel.clone(),
                Some(session.config.resend_interval),
            );
            None
        }

        _other => None,
    }
}

/// Hands a value to a rendezvous channel without blocking the demultiplexer.
/// Races the send against cancellation and, if given, a deadline; a message
/// nobody claims in time is simply dropped (§4.5 "Why detached handoffs").
fn spawn_detached_send<T: Send + 'static>(
    tx: tokio::sync::mpsc::Sender<T>,
    value: T,
    cancel: crate::shutdown::Cancel,
    deadline: Option<std::time::Duration>,
) {
    tokio::spawn(async move {
        let send = tx.send(value);
        let outcome = match deadline {
            Some(deadline) => {
                tokio::select! {
                    result = send => Some(result),
                    _ = cancel.cancelled() => None,
                    _ = tokio::time::sleep(deadline) => None,
                }
            }
            None => {
                tokio::select! {
                    result = send => Some(result),
                    _ = cancel.cancelled() => None,
                }
            }
        };
        if let Some(Err(_)) = outcome {
            debug!("detached handoff dropped: receiver gone");
        } else if outcome.is_none() {
            debug!("detached handoff dropped: stale");
        }
    });
}
