use std::time::Duration;

/// RTT estimate base (RFC 3261 §17.1.1.1).
pub const T1: Duration = Duration::from_millis(500);
/// Cap on the non-INVITE/INVITE retransmit interval.
pub const T2: Duration = Duration::from_secs(4);
/// Maximum duration a message could remain in the network.
pub const T4: Duration = Duration::from_secs(5);
/// Timer B/F: overall time a client transaction waits for a final response
/// before giving up.
pub const TRANSACTION_TIMEOUT: Duration = Duration::from_secs(32);

/// The next retransmit interval: UDP retransmission doubles up to `T2`.
pub fn next_retransmit_interval(current: Duration) -> Duration {
    std::cmp::min(current * 2, T2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retransmit_interval_doubles_then_caps_at_t2() {
        let mut interval = T1;
        for _ in 0..10 {
            interval = next_retransmit_interval(interval);
        }
        assert_eq!(interval, T2);
    }
}
