//! Connection acceptance and request dispatch.
//!
//! # Responsibilities
//! - Run the accept loop and the server loop until cancellation
//! - Spawn one worker per accepted connection
//! - Decode, route and invoke the handler inside a panic boundary
//! - Close every connection on every path
//! - Optionally drain in-flight workers on shutdown

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::config::ServerConfig;
use crate::http::decoder::decode;
use crate::http::request::Request;
use crate::http::response::ResponseWriter;
use crate::lifecycle::ShutdownSignal;
use crate::net::{accept_loop, Accepted, ConnectionTracker, Listener};
use crate::observability::metrics;
use crate::resilience::backoff::AcceptBackoff;
use crate::routing::{HandlerFn, Registry};

/// HTTP server: a frozen handler registry plus the settings the loops need.
pub struct HttpServer {
    registry: Arc<Registry>,
    server_name: Arc<str>,
    backoff: AcceptBackoff,
    drain_timeout: Option<Duration>,
    tracker: ConnectionTracker,
}

impl HttpServer {
    /// Create a server. The registry is read-only from here on.
    pub fn new(config: &ServerConfig, registry: Registry) -> Self {
        let drain_timeout = match config.http.drain_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Self {
            registry: Arc::new(registry),
            server_name: Arc::from(config.http.server_name.as_str()),
            backoff: AcceptBackoff::from_config(&config.listener),
            drain_timeout,
            tracker: ConnectionTracker::new(),
        }
    }

    /// Serve connections from `listener` until `shutdown` fires or the accept loop ends.
    ///
    /// Workers are not awaited unless a drain timeout is configured.
    #[tracing::instrument(name = "server", skip_all)]
    pub async fn run<L: Listener>(self, listener: L, mut shutdown: ShutdownSignal) {
        let (handoff_tx, mut handoff_rx) = mpsc::channel(1);
        tokio::spawn(
            accept_loop(listener, handoff_tx, shutdown.clone(), self.backoff).in_current_span(),
        );

        tracing::info!(handlers = self.registry.len(), "HTTP server starting");

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, stopping server loop");
                    break;
                }
                accepted = handoff_rx.recv() => match accepted {
                    Some(accepted) => self.spawn_worker(accepted),
                    None => {
                        tracing::info!("Accept loop closed, stopping server loop");
                        break;
                    }
                },
            }
        }

        if let Some(timeout) = self.drain_timeout {
            tracing::info!(
                in_flight = self.tracker.active_count(),
                timeout_secs = timeout.as_secs(),
                "Draining in-flight connections"
            );
            if tokio::time::timeout(timeout, self.tracker.wait_idle()).await.is_err() {
                tracing::warn!(
                    remaining = self.tracker.active_count(),
                    "Drain timeout elapsed with connections still in flight"
                );
            }
        }

        tracing::info!("HTTP server stopped");
    }

    fn spawn_worker<C>(&self, accepted: Accepted<C>)
    where
        C: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let guard = self.tracker.track();
        let span = tracing::info_span!(
            "connection",
            connection_id = %guard.id(),
            remote = %accepted.remote,
        );
        let registry = Arc::clone(&self.registry);
        let server_name = Arc::clone(&self.server_name);

        tokio::spawn(
            async move {
                serve_connection(&registry, server_name, accepted.conn).await;
                drop(guard);
            }
            .instrument(span),
        );
    }
}

/// Handle one connection: decode, dispatch, close.
///
/// A decode failure closes the connection without writing anything.
pub async fn serve_connection<C>(registry: &Registry, server_name: Arc<str>, conn: C)
where
    C: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    tracing::debug!("Handling new connection");

    let (read_half, write_half) = tokio::io::split(conn);
    let mut reader = BufReader::new(read_half);

    let request = match decode(&mut reader).await {
        Ok(request) => request,
        Err(e) => {
            metrics::record_decode_error();
            tracing::warn!(error = %e, start_line = e.is_start_line(), "Error decoding request");
            return;
        }
    };

    let mut writer = ResponseWriter::new(write_half, server_name);
    let start = Instant::now();
    dispatch(registry, &request, &mut writer).await;
    metrics::record_request(writer.status(), start);

    if let Err(e) = writer.close().await {
        tracing::debug!(error = %e, "Error closing connection");
    }
}

/// Route `request` and run its handler behind a panic boundary.
///
/// Unknown routes get the built-in 404 handler; a panicking handler is followed by the
/// built-in 500 handler.
pub async fn dispatch(registry: &Registry, request: &Request, writer: &mut ResponseWriter) {
    let handler: &HandlerFn = match registry.lookup(&request.method, &request.path) {
        Some(handler) => &**handler,
        None => {
            tracing::debug!(method = %request.method, path = %request.path, "No handler registered");
            &not_found
        }
    };

    let outcome = AssertUnwindSafe(async { handler(&mut *writer, request).await })
        .catch_unwind()
        .await;

    if let Err(panic) = outcome {
        metrics::record_handler_panic();
        tracing::error!(
            method = %request.method,
            path = %request.path,
            panic = panic_message(&*panic),
            "Handler panicked"
        );
        internal_error(writer, request).await;
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

fn not_found<'a>(writer: &'a mut ResponseWriter, _request: &'a Request) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        if let Err(e) = writer.set_status(404).await {
            tracing::warn!(error = %e, "Error writing not found response");
        }
    })
}

fn internal_error<'a>(writer: &'a mut ResponseWriter, _request: &'a Request) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        if let Err(e) = writer.set_status(500).await {
            tracing::warn!(error = %e, "Error writing internal server error response");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use std::future::Future;
    use std::io;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
    use tokio::sync::Notify;
    use tokio::task::JoinHandle;

    const SERVER_NAME: &str = "test-server";

    /// Hands out in-memory connections pushed by the test.
    struct ChannelListener {
        rx: mpsc::UnboundedReceiver<DuplexStream>,
    }

    impl Listener for ChannelListener {
        type Conn = DuplexStream;

        fn accept(
            &mut self,
        ) -> impl Future<Output = io::Result<(DuplexStream, SocketAddr)>> + Send {
            async move {
                match self.rx.recv().await {
                    Some(conn) => Ok((conn, "127.0.0.1:40000".parse().unwrap())),
                    None => std::future::pending().await,
                }
            }
        }
    }

    struct Running {
        conns: mpsc::UnboundedSender<DuplexStream>,
        shutdown: Shutdown,
        handle: JoinHandle<()>,
    }

    impl Running {
        async fn exchange(&self, request: &[u8]) -> Vec<u8> {
            let (mut client, server) = duplex(4096);
            self.conns.send(server).unwrap();
            client.write_all(request).await.unwrap();

            let mut out = Vec::new();
            client.read_to_end(&mut out).await.unwrap();
            out
        }

        async fn stop(self) {
            self.shutdown.trigger();
            tokio::time::timeout(Duration::from_secs(5), self.handle)
                .await
                .expect("run should return after shutdown")
                .unwrap();
        }
    }

    fn start(registry: Registry, mut config: ServerConfig) -> Running {
        config.http.server_name = SERVER_NAME.into();
        let (conns, rx) = mpsc::unbounded_channel();
        let shutdown = Shutdown::new();
        let server = HttpServer::new(&config, registry);
        let handle = tokio::spawn(server.run(ChannelListener { rx }, shutdown.subscribe()));
        Running {
            conns,
            shutdown,
            handle,
        }
    }

    fn echo_registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register("POST", "/echo", |w, r| {
                Box::pin(async move {
                    w.write(&r.payload).await.unwrap();
                })
            })
            .unwrap();
        registry
            .register("GET", "/panic", |_, _| {
                Box::pin(async {
                    panic!("unit test");
                })
            })
            .unwrap();
        registry
    }

    fn request(method: &str, path: &str) -> Request {
        Request {
            method: method.into(),
            protocol_version: "HTTP/1.1".into(),
            path: path.into(),
            ..Default::default()
        }
    }

    async fn dispatched(registry: &Registry, request: &Request) -> String {
        let (mut client, server) = duplex(4096);
        let mut writer = ResponseWriter::new(server, Arc::from(SERVER_NAME));
        dispatch(registry, request, &mut writer).await;
        drop(writer);

        let mut out = String::new();
        client.read_to_string(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn dispatch_runs_registered_handler() {
        let mut registry = Registry::new();
        registry
            .register("POST", "/test", |w, _| {
                Box::pin(async move {
                    w.write(b"unit test").await.unwrap();
                })
            })
            .unwrap();

        let out = dispatched(&registry, &request("POST", "/test")).await;

        assert_eq!(
            out,
            "HTTP/1.1 200 OK\r\nContent-Length: 9\r\nContent-Type: application/x-www-form-urlencoded\r\n\
             Connection: Keep-Alive\r\nServer: test-server\r\n\r\nunit test"
        );
    }

    #[tokio::test]
    async fn dispatch_unknown_route_is_not_found() {
        let registry = echo_registry();

        let out = dispatched(&registry, &request("POST", "/nonexistent")).await;

        assert_eq!(out, "HTTP/1.1 404 Not Found\r\n");
    }

    #[tokio::test]
    async fn dispatch_panicking_handler_is_internal_error() {
        let registry = echo_registry();

        let out = dispatched(&registry, &request("GET", "/panic")).await;

        assert_eq!(out, "HTTP/1.1 500 Internal Server Error\r\n");
    }

    #[tokio::test]
    async fn panic_before_future_is_built_is_caught() {
        let mut registry = Registry::new();
        registry
            .register("GET", "/eager", |_, _| panic!("before the future"))
            .unwrap();

        let out = dispatched(&registry, &request("GET", "/eager")).await;

        assert_eq!(out, "HTTP/1.1 500 Internal Server Error\r\n");
    }

    #[test]
    fn panic_messages() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(&*boxed), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*boxed), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(&*boxed), "non-string panic payload");
    }

    #[tokio::test]
    async fn echo_round_trip() {
        let running = start(echo_registry(), ServerConfig::default());

        let out = running
            .exchange(b"POST /echo HTTP/1.1\r\nContent-Length: 16\r\n\r\n{\"test\":\"value\"}")
            .await;
        let out = String::from_utf8(out).unwrap();

        assert!(out.starts_with("HTTP/1.1 200 OK\r\nContent-Length: 16\r\n"));
        assert!(out.ends_with("\r\n\r\n{\"test\":\"value\"}"));
        running.stop().await;
    }

    #[tokio::test]
    async fn unknown_route_gets_bare_not_found() {
        let running = start(echo_registry(), ServerConfig::default());

        let out = running
            .exchange(b"POST / HTTP/1.1\r\n Host: localhost:4221\r\nContent-Length: 16\r\n\r\n{\"test\":\"value\"}")
            .await;

        assert_eq!(out, b"HTTP/1.1 404 Not Found\r\n");
        running.stop().await;
    }

    #[tokio::test]
    async fn panic_does_not_stop_later_connections() {
        let running = start(echo_registry(), ServerConfig::default());

        let first = running.exchange(b"GET /panic HTTP/1.1\r\n\r\n").await;
        assert_eq!(first, b"HTTP/1.1 500 Internal Server Error\r\n");

        let second = running
            .exchange(b"POST /echo HTTP/1.1\r\nContent-Length: 2\r\n\r\nok")
            .await;
        assert!(second.starts_with(b"HTTP/1.1 200 OK\r\n"));
        assert!(second.ends_with(b"\r\n\r\nok"));
        running.stop().await;
    }

    #[tokio::test]
    async fn decode_failure_closes_without_response() {
        let running = start(echo_registry(), ServerConfig::default());

        let (mut client, server) = duplex(4096);
        running.conns.send(server).unwrap();
        client.write_all(b"GARBAGE").await.unwrap();
        client.shutdown().await.unwrap();

        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        assert!(out.is_empty());
        running.stop().await;
    }

    #[tokio::test]
    async fn run_returns_on_shutdown_without_connections() {
        let running = start(Registry::new(), ServerConfig::default());
        running.stop().await;
    }

    #[tokio::test]
    async fn drain_waits_for_in_flight_handler() {
        let started = Arc::new(Notify::new());
        let finished = Arc::new(AtomicBool::new(false));

        let mut registry = Registry::new();
        let (started_tx, finished_tx) = (Arc::clone(&started), Arc::clone(&finished));
        registry
            .register("GET", "/slow", move |w, _| {
                let started = Arc::clone(&started_tx);
                let finished = Arc::clone(&finished_tx);
                Box::pin(async move {
                    started.notify_one();
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    let _ = w.set_status(204).await;
                    finished.store(true, Ordering::SeqCst);
                })
            })
            .unwrap();

        let mut config = ServerConfig::default();
        config.http.drain_timeout_secs = 5;
        let running = start(registry, config);

        let (mut client, server) = duplex(4096);
        running.conns.send(server).unwrap();
        client.write_all(b"GET /slow HTTP/1.1\r\n\r\n").await.unwrap();
        started.notified().await;

        running.stop().await;
        assert!(finished.load(Ordering::SeqCst));
    }
}
