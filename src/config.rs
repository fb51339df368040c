//! Config validation (§4.1, §6.3).

use std::time::Duration;

const DEFAULT_RESEND_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_HEARTBEAT_DELAY: Duration = Duration::from_secs(10);
const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Timing parameters for a [`TunnelSession`](crate::session::TunnelSession).
///
/// All three fields are guaranteed strictly positive once obtained through
/// [`TunnelConfig::validated`]; the raw, possibly-zero values an embedding
/// application gathers from a file or environment (parsing that file is out
/// of scope, §1) should be wrapped and passed through that constructor
/// rather than built directly when any field might be non-positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TunnelConfig {
    /// Period between retransmissions of any unacknowledged request.
    pub resend_interval: Duration,
    /// Idle time in the demultiplexer before issuing a liveness probe.
    pub heartbeat_delay: Duration,
    /// Overall deadline for connect, for a single liveness probe, and for a
    /// single send.
    pub response_timeout: Duration,
}

impl TunnelConfig {
    /// Clamps every non-positive field to its documented default.
    pub fn validated(self) -> Self {
        Self {
            resend_interval: clamp(self.resend_interval, DEFAULT_RESEND_INTERVAL),
            heartbeat_delay: clamp(self.heartbeat_delay, DEFAULT_HEARTBEAT_DELAY),
            response_timeout: clamp(self.response_timeout, DEFAULT_RESPONSE_TIMEOUT),
        }
    }
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            resend_interval: DEFAULT_RESEND_INTERVAL,
            heartbeat_delay: DEFAULT_HEARTBEAT_DELAY,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }
}

fn clamp(value: Duration, default: Duration) -> Duration {
    if value.is_zero() {
        default
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_fields_fall_back_to_defaults() {
        let config = TunnelConfig {
            resend_interval: Duration::ZERO,
            heartbeat_delay: Duration::ZERO,
            response_timeout: Duration::ZERO,
        }
        .validated();
        assert_eq!(config, TunnelConfig::default());
    }

    #[test]
    fn positive_fields_pass_through_unchanged() {
        let config = TunnelConfig {
            resend_interval: Duration::from_millis(50),
            heartbeat_delay: Duration::from_secs(1),
            response_timeout: Duration::from_secs(2),
        };
        assert_eq!(config.validated(), config);
    }

    #[test]
    fn fields_are_validated_independently() {
        let config = TunnelConfig {
            resend_interval: Duration::from_millis(50),
            heartbeat_delay: Duration::ZERO,
            response_timeout: Duration::from_secs(2),
        }
        .validated();
        assert_eq!(config.resend_interval, Duration::from_millis(50));
        assert_eq!(config.heartbeat_delay, DEFAULT_HEARTBEAT_DELAY);
        assert_eq!(config.response_timeout, Duration::from_secs(2));
    }
}
