//! TCP plumbing shared by the listener and outgoing connections

use crate::error::Result;
use securemesh_protocol::{BoxedTransport, Wire};
use socket2::{SockRef, TcpKeepalive};
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

const KEEPALIVE_TIME: Duration = Duration::from_secs(60);

/// Connect to `host:port` and wrap the stream in a wire
pub async fn dial(host: &str, port: u16) -> Result<Wire<BoxedTransport>> {
    let stream = TcpStream::connect((host, port)).await?;
    tune(&stream);
    Ok(Wire::boxed(stream))
}

/// Enable keepalive and disable Nagle on a connected socket
pub fn tune(stream: &TcpStream) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Cannot set TCP_NODELAY: {}", e);
    }

    let keepalive = TcpKeepalive::new().with_time(KEEPALIVE_TIME);
    if let Err(e) = SockRef::from(stream).set_tcp_keepalive(&keepalive) {
        debug!("Cannot enable TCP keepalive: {}", e);
    }
}
