//! The [`connect`] handshake (§4.2).

use crate::error::{CancelReason, ConnectError};
use crate::frame::{ConnectStatus, Frame};
use crate::socket::Socket;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Drives connection-request retransmission until a response accepts,
/// rejects, or `deadline` elapses.
///
/// Returns the gateway-assigned channel id on success. The caller (see
/// [`crate::lifecycle::SessionHandle::open`]) is responsible for building
/// the [`TunnelSession`](crate::session::TunnelSession) around that id and
/// the socket this function borrowed.
pub async fn connect(
    socket: &dyn Socket,
    config: crate::config::TunnelConfig,
    deadline: Duration,
) -> Result<u8, ConnectError> {
    let span = tracing::info_span!("connect");
    let _enter = span.enter();

    socket.send(Frame::ConnectRequest).await?;
    let mut resend = tokio::time::interval(config.resend_interval);
    resend.tick().await; // the first tick fires immediately; we already sent above.

    let attempt = async {
        loop {
            tokio::select! {
                _ = resend.tick() => {
                    debug!("resending connect request");
                    socket.send(Frame::ConnectRequest).await?;
                }
                frame = socket.recv() => {
                    match frame {
                        None => {
                            warn!("socket inbound closed before a connect response arrived");
                            return Err(ConnectError::InboundClosed);
                        }
                        Some(Frame::ConnectResponse { channel_id, status }) => {
                            match status {
                                ConnectStatus::Ok => {
                                    info!(channel_id, "connected");
                                    return Ok(channel_id);
                                }
                                ConnectStatus::Busy => {
                                    debug!("gateway busy, continuing to retry");
                                    continue;
                                }
                                ConnectStatus::Rejected(code) => {
                                    warn!(status = code, "gateway rejected connection");
                                    return Err(ConnectError::Rejected(code));
                                }
                            }
                        }
                        Some(_other) => continue,
                    }
                }
            }
        }
    };

    match tokio::time::timeout(deadline, attempt).await {
        Ok(result) => result,
        Err(_elapsed) => Err(ConnectError::Cancelled(CancelReason::DeadlineElapsed)),
    }
}
