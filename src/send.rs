//! The outbound send path (§4.3).

use crate::error::{CancelReason, SendError};
use crate::frame::{ApplicationFrame, Frame};
use crate::session::{AckFrame, TunnelSession};
use tracing::{debug, warn};

/// Serialises one application frame reliably: retransmits on `resend_interval`
/// until a matching acknowledgement arrives, `cancel` fires, or `deadline`
/// elapses.
///
/// Holds the session's send mutex for the whole call, which is what
/// guarantees at most one send is ever awaiting an acknowledgement (§3
/// invariant 2, §5 "Locking").
pub async fn send(
    session: &TunnelSession,
    frame: ApplicationFrame,
    deadline: std::time::Duration,
) -> Result<(), SendError> {
    let mut slot = session.send_slot.lock().await;
    let span = tracing::info_span!("send", channel_id = session.channel_id, seq = slot.send_seq);
    let _enter = span.enter();

    let seq_number = slot.send_seq;
    let request = Frame::TunnelRequest {
        channel_id: session.channel_id,
        seq_number,
        payload: frame,
    };
    session.socket.send(request.clone()).await?;

    let mut resend = tokio::time::interval(session.config.resend_interval);
    resend.tick().await; // consume the immediate first tick; we already sent above.

    let attempt = async {
        loop {
            tokio::select! {
                _ = resend.tick() => {
                    debug!("retransmitting unacknowledged frame");
                    session.socket.send(request.clone()).await?;
                }
                ack = slot.ack_rx.recv() => {
                    match ack {
                        None => return Err(SendError::AckChannelClosed),
                        Some(AckFrame { seq_number: acked_seq, status }) => {
                            if acked_seq != seq_number {
                                debug!(acked_seq, expected = seq_number, "ignoring stale ack");
                                continue;
                            }
                            slot.send_seq = slot.send_seq.wrapping_add(1);
                            if status == 0 {
                                return Ok(());
                            } else {
                                warn!(status, "gateway rejected frame");
                                return Err(SendError::Rejected(status));
                            }
                        }
                    }
                }
            }
        }
    };

    tokio::select! {
        result = attempt => result,
        _ = session.cancel.cancelled() => Err(SendError::Cancelled(CancelReason::Closed)),
        _ = tokio::time::sleep(deadline) => Err(SendError::Cancelled(CancelReason::DeadlineElapsed)),
    }
}
