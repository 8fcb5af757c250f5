//! TCP reachability probe
//!
//! ZMQ `connect` succeeds immediately even when nothing listens on the other
//! end, so a capture host's presence is checked with a raw TCP connect
//! before any socket is set up.

use crate::common::{TransportError, TransportResult};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;

/// Attempt a raw TCP connection to `address:port`
///
/// Returns `Ok(())` once any resolved address accepts the connection and
/// `TransportError::Unreachable` otherwise. The connection is closed
/// immediately. A zero `timeout` falls back to one second so a silent
/// host can never hang the caller.
pub fn probe(address: &str, port: u16, timeout: Duration) -> TransportResult<()> {
    let timeout = if timeout.is_zero() {
        Duration::from_secs(1)
    } else {
        timeout
    };
    let target = format!("{}:{}", address, port);

    let candidates = (address, port)
        .to_socket_addrs()
        .map_err(|e| TransportError::Unreachable {
            address: target.clone(),
            reason: format!("cannot resolve: {}", e),
        })?;

    let mut last_error = String::from("no addresses resolved");
    for socket_addr in candidates {
        match TcpStream::connect_timeout(&socket_addr, timeout) {
            Ok(_stream) => {
                debug!("[PROBE] {} accepted a connection", socket_addr);
                return Ok(());
            }
            Err(e) => last_error = e.to_string(),
        }
    }

    Err(TransportError::Unreachable {
        address: target,
        reason: last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_probe_listening_port() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        assert!(probe("127.0.0.1", port, Duration::from_millis(500)).is_ok());
    }

    #[test]
    fn test_probe_closed_port() {
        // Bind then drop to get a port with no listener
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let result = probe("127.0.0.1", port, Duration::from_millis(500));
        match result {
            Err(TransportError::Unreachable { address, .. }) => {
                assert_eq!(address, format!("127.0.0.1:{}", port));
            }
            other => panic!("expected Unreachable, got {:?}", other),
        }
    }

    #[test]
    fn test_probe_unresolvable_host() {
        let result = probe("host.invalid", 50020, Duration::from_millis(200));
        assert!(matches!(result, Err(TransportError::Unreachable { .. })));
    }
}
