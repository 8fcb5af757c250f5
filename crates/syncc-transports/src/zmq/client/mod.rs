//! ZMQ client-side socket patterns
//!
//! Each client keeps its socket in a `Mutex<Option<_>>`: `None` until
//! `start`, and again after `stop`.

pub mod publisher;
pub mod req;
pub mod sub;

pub use publisher::ZmqPub;
pub use req::ZmqReq;
pub use sub::ZmqSub;

use crate::common::{TransportError, TransportResult};

/// Create a socket, apply `configure`, then connect it to `address`.
///
/// Linger is always 0 so closing never waits on an absent host.
fn connect_socket<F>(
    context: &zmq::Context,
    kind: zmq::SocketType,
    address: &str,
    configure: F,
) -> TransportResult<zmq::Socket>
where
    F: FnOnce(&zmq::Socket) -> TransportResult<()>,
{
    let socket = context.socket(kind)?;
    socket.set_linger(0)?;
    configure(&socket)?;
    socket
        .connect(address)
        .map_err(|e| TransportError::ConnectFailed(format!("{}: {}", address, e)))?;
    Ok(socket)
}

/// Wait until `socket` has a message, up to `timeout_ms` (0 = forever)
fn wait_readable(socket: &zmq::Socket, timeout_ms: u64) -> TransportResult<()> {
    if timeout_ms == 0 {
        return Ok(());
    }
    let timeout = i64::try_from(timeout_ms).map_err(|_| {
        TransportError::InvalidConfig(format!("timeout of {} ms is too large", timeout_ms))
    })?;

    let mut items = [socket.as_poll_item(zmq::POLLIN)];
    zmq::poll(&mut items, timeout)?;
    if items[0].is_readable() {
        Ok(())
    } else {
        Err(TransportError::Timeout)
    }
}
