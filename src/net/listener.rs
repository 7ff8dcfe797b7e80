//! Listener abstraction and accept loop.
//!
//! # Responsibilities
//! - Abstract the transport behind a `Listener` trait (TCP in production)
//! - Bind to the configured address
//! - Accept connections and hand them to the server loop one at a time
//! - Survive accept errors (log, back off, retry)

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::config::ListenerConfig;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::resilience::backoff::AcceptBackoff;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The configured address is not a socket address.
    #[error("invalid bind address {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },
    /// Failed to bind to address.
    #[error("failed to bind: {0}")]
    Bind(#[source] io::Error),
}

/// A source of bidirectional byte-stream connections.
pub trait Listener: Send + 'static {
    /// The connection type produced by `accept`.
    type Conn: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Wait for the next connection.
    fn accept(&mut self) -> impl Future<Output = io::Result<(Self::Conn, SocketAddr)>> + Send;
}

impl Listener for TcpListener {
    type Conn = TcpStream;

    fn accept(&mut self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        TcpListener::accept(self)
    }
}

/// Bind a TCP listener to the configured address.
pub async fn bind(config: &ListenerConfig) -> Result<TcpListener, ListenerError> {
    let addr: SocketAddr = config
        .bind_address
        .parse()
        .map_err(|source| ListenerError::Address {
            address: config.bind_address.clone(),
            source,
        })?;

    let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
    let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

    tracing::info!(address = %local_addr, "Listener bound");
    Ok(listener)
}

/// A connection handed from the accept loop to the server loop.
#[derive(Debug)]
pub struct Accepted<C> {
    pub conn: C,
    pub remote: SocketAddr,
}

/// Accept connections until shutdown, sending each one over `handoff`.
///
/// The next accept only starts once the previous connection was handed off.
/// Cancellation is checked between accept calls; an accept already in flight is
/// not interrupted. Dropping `handoff` on return closes the channel so the
/// receiver observes completion.
pub async fn accept_loop<L: Listener>(
    mut listener: L,
    handoff: mpsc::Sender<Accepted<L::Conn>>,
    shutdown: ShutdownSignal,
    backoff: AcceptBackoff,
) {
    let mut failures: u32 = 0;

    while !shutdown.is_triggered() {
        match listener.accept().await {
            Ok((conn, remote)) => {
                failures = 0;
                metrics::record_accepted();
                tracing::debug!(remote = %remote, "Connection accepted");

                if handoff.send(Accepted { conn, remote }).await.is_err() {
                    tracing::debug!("Server loop gone, stopping accept loop");
                    break;
                }
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                metrics::record_accept_error();
                tracing::error!(error = %e, consecutive_failures = failures, "Error accepting connection");

                let delay = backoff.delay(failures);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    tracing::debug!("Accept loop finished");
}
