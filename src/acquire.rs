//! Header Acquisition
//!
//! Produces the raw buffer handed to the parser: a single read from
//! standard input, or a single receive on the first connection accepted on
//! a listening socket. The whole header is expected in one read.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::BytesMut;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::proxy::MAX_HEADER_SIZE;

/// Where the header bytes come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Stdin,
    Listen(SocketAddr),
}

/// Errors that can occur while acquiring the header bytes
#[derive(Debug)]
pub enum AcquireError {
    /// Timeout waiting for the header
    Timeout,
    /// IO error on stdin or the socket
    Io(std::io::Error),
}

impl std::fmt::Display for AcquireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcquireError::Timeout => write!(f, "timed out waiting for PROXY header"),
            AcquireError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for AcquireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AcquireError::Io(e) => Some(e),
            AcquireError::Timeout => None,
        }
    }
}

impl From<std::io::Error> for AcquireError {
    fn from(e: std::io::Error) -> Self {
        AcquireError::Io(e)
    }
}

/// Acquire one buffer of at most `MAX_HEADER_SIZE` bytes from `source`
pub async fn acquire(source: Source, limit: Option<Duration>) -> Result<BytesMut, AcquireError> {
    let fut = async {
        match source {
            Source::Stdin => read_once(&mut tokio::io::stdin(), MAX_HEADER_SIZE).await,
            Source::Listen(addr) => {
                let listener = bind_listener(addr)?;
                receive_once(&listener, MAX_HEADER_SIZE).await
            }
        }
    };

    match limit {
        Some(duration) => timeout(duration, fut)
            .await
            .map_err(|_| AcquireError::Timeout)?,
        None => fut.await,
    }
}

/// Perform exactly one read of up to `max` bytes
pub async fn read_once<R: AsyncRead + Unpin>(
    reader: &mut R,
    max: usize,
) -> Result<BytesMut, AcquireError> {
    let mut buf = BytesMut::zeroed(max);
    let n = reader.read(&mut buf).await?;
    buf.truncate(n);
    debug!("Read {} bytes", n);
    Ok(buf)
}

/// Bind a listening socket with SO_REUSEADDR and a backlog of one
pub fn bind_listener(addr: SocketAddr) -> Result<TcpListener, AcquireError> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1)?;
    socket.set_nonblocking(true)?;

    let listener = TcpListener::from_std(socket.into())?;
    info!("Listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Accept a single connection and read from it once
pub async fn receive_once(listener: &TcpListener, max: usize) -> Result<BytesMut, AcquireError> {
    let (mut stream, peer) = listener.accept().await?;
    info!(%peer, "Accepted connection");

    let buf = read_once(&mut stream, max).await?;
    info!("Read {} bytes in recv", buf.len());
    Ok(buf)
}
