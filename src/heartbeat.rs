//! The heartbeat/liveness probe and its supervision (§4.4).

use crate::error::{CancelReason, HeartbeatError};
use crate::frame::{ConnectionState, Frame};
use crate::session::TunnelSession;
use tracing::{debug, warn};

/// Runs one liveness round-trip: sends a connection-state request, retransmits
/// at `resend_interval` until the demultiplexer hands back a matching
/// response on the session's heartbeat rendezvous, or `session.cancel` fires.
///
/// Unbounded in time by itself — [`supervise`] applies the `response_timeout`
/// deadline.
pub async fn probe(session: &TunnelSession) -> Result<(), HeartbeatError> {
    session
        .socket
        .send(Frame::ConnectionStateRequest { channel_id: session.channel_id })
        .await?;

    let mut resend = tokio::time::interval(session.config.resend_interval);
    resend.tick().await; // consume the immediate first tick; we already sent above.
    let mut heartbeat_rx = session.heartbeat_rx.lock().await;

    let attempt = async {
        loop {
            tokio::select! {
                _ = resend.tick() => {
                    debug!("retransmitting heartbeat probe");
                    session
                        .socket
                        .send(Frame::ConnectionStateRequest { channel_id: session.channel_id })
                        .await?;
                }
                state = heartbeat_rx.recv() => {
                    return match state {
                        None => Err(HeartbeatError::Cancelled(CancelReason::Closed)),
                        Some(ConnectionState::Normal) => Ok(()),
                        Some(other) => {
                            warn!(?other, "non-normal connection state");
                            Err(HeartbeatError::NonNormalState)
                        }
                    };
                }
            }
        }
    };

    tokio::select! {
        result = attempt => result,
        _ = session.cancel.cancelled() => Err(HeartbeatError::Cancelled(CancelReason::Closed)),
    }
}

/// Wraps [`probe`] in the `response_timeout` deadline and reports the
/// outcome. Intended to be spawned detached by the receive demultiplexer
/// (§4.5 item 3); the `notify` send races against `session.cancel` so a
/// leaked supervisor task can never block forever (§4.4 "Supervision").
pub async fn supervise(session: std::sync::Arc<TunnelSession>, notify: tokio::sync::oneshot::Sender<HeartbeatError>) {
    let span = tracing::info_span!("heartbeat", channel_id = session.channel_id);
    let _enter = span.enter();

    let outcome = tokio::time::timeout(session.config.response_timeout, probe(&session)).await;
    let failure = match outcome {
        Ok(Ok(())) => {
            debug!("heartbeat ok");
            return;
        }
        Ok(Err(err)) => err,
        Err(_elapsed) => HeartbeatError::TimedOut,
    };

    warn!(%failure, "heartbeat failed, notifying demultiplexer");
    tokio::select! {
        _ = notify.send(failure) => {}
        _ = session.cancel.cancelled() => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TunnelConfig;
    use crate::shutdown::Cancel;
    use crate::socket::mock::MockSocket;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn test_session(socket: MockSocket, config: TunnelConfig) -> std::sync::Arc<TunnelSession> {
        let (_ack_tx, ack_rx) = mpsc::channel(1);
        std::sync::Arc::new(TunnelSession::new(7, config, Box::new(socket), Cancel::new(), ack_rx))
    }

    #[tokio::test]
    async fn normal_state_succeeds() {
        let (socket, mut gateway) = MockSocket::pair();
        let session = test_session(
            socket,
            TunnelConfig { resend_interval: Duration::from_millis(20), ..Default::default() },
        );
        let session_clone = session.clone();
        let probing = tokio::spawn(async move { probe(&session_clone).await });

        assert_eq!(gateway.next_sent().await, Frame::ConnectionStateRequest { channel_id: 7 });
        session.heartbeat_tx.send(ConnectionState::Normal).await.unwrap();
        probing.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn non_normal_state_fails() {
        let (socket, _gateway) = MockSocket::pair();
        let session = test_session(socket, TunnelConfig::default());
        session.heartbeat_tx.send(ConnectionState::Other(2)).await.unwrap();
        let err = probe(&session).await.unwrap_err();
        assert!(matches!(err, HeartbeatError::NonNormalState));
    }

    #[tokio::test]
    async fn supervise_reports_timeout_when_no_response_arrives() {
        let (socket, _gateway) = MockSocket::pair();
        let session = test_session(
            socket,
            TunnelConfig {
                resend_interval: Duration::from_millis(10),
                response_timeout: Duration::from_millis(40),
                ..Default::default()
            },
        );
        let (tx, rx) = tokio::sync::oneshot::channel();
        supervise(session, tx).await;
        let failure = rx.await.unwrap();
        assert!(matches!(failure, HeartbeatError::TimedOut));
    }

    #[tokio::test]
    async fn supervise_sends_nothing_on_success() {
        let (socket, mut gateway) = MockSocket::pair();
        let session = test_session(
            socket,
            TunnelConfig { resend_interval: Duration::from_millis(10), ..Default::default() },
        );
        let session_clone = session.clone();
        let (tx, rx) = tokio::sync::oneshot::channel();
        let supervising = tokio::spawn(async move { supervise(session_clone, tx).await });
        gateway.next_sent().await;
        session.heartbeat_tx.send(ConnectionState::Normal).await.unwrap();
        supervising.await.unwrap();
        assert!(rx.await.is_err());
    }
}
