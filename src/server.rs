//! CLI server: accept loop and per-connection session loop.
//!
//! # Responsibilities
//! - Accept connections within the connection limit
//! - Run one task per connection owning its `Session`
//! - Send the auth challenge on connect, then read, dispatch and answer one
//!   line at a time
//! - Stop accepting on shutdown and wait for open sessions to drain

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, BufReader};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tracing::Instrument;

use crate::config::ListenerConfig;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{ConnectionPermit, Listener, ListenerError};
use crate::protocol::{write_response, Response, ResponseStatus};
use crate::session::{Dispatcher, Session};

/// Accepts CLI connections and runs their sessions.
pub struct BridgeServer {
    dispatcher: Arc<Dispatcher>,
    max_line_bytes: usize,
    shutdown_grace: Duration,
    tracker: ConnectionTracker,
}

impl BridgeServer {
    pub fn new(config: &ListenerConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            max_line_bytes: config.max_line_bytes,
            shutdown_grace: Duration::from_secs(config.shutdown_grace_secs),
            tracker: ConnectionTracker::new(),
        }
    }

    /// Tracker for the sessions this server spawns.
    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Accept connections until `shutdown` fires, then drain open sessions.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, "CLI server starting");
        }

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        self.spawn_session(stream, peer, permit, shutdown.resubscribe());
                    }
                    Err(ListenerError::Accept(e)) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                    Err(e) => return Err(e),
                },
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signalled, no longer accepting connections");
                    break;
                }
            }
        }

        if !self.tracker.wait_for_drain(self.shutdown_grace).await {
            tracing::warn!(
                open_sessions = self.tracker.active_count(),
                "Sessions still open after shutdown grace period"
            );
        }
        tracing::info!("CLI server stopped");
        Ok(())
    }

    fn spawn_session(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        permit: ConnectionPermit,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let guard = self.tracker.track();
        let dispatcher = Arc::clone(&self.dispatcher);
        let max_line_bytes = self.max_line_bytes;
        let span = tracing::info_span!(
            "connection",
            connection_id = %guard.id(),
            peer_addr = %peer
        );

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "Failed to set TCP_NODELAY");
        }

        tokio::spawn(
            async move {
                let mut session = Session::new(guard.id());
                tracing::info!("CLI session opened");

                match serve_connection(stream, &dispatcher, &mut session, max_line_bytes, &mut shutdown)
                    .await
                {
                    Ok(()) => tracing::info!("CLI session closed"),
                    Err(e) => tracing::warn!(error = %e, "CLI session ended by transport error"),
                }

                drop(guard);
                drop(permit);
            }
            .instrument(span),
        );
    }
}

/// Outcome of reading one request line.
#[derive(Debug, PartialEq, Eq)]
enum LineRead {
    Line,
    TooLong,
    Eof,
}

/// Run the CLI protocol over `stream` until the peer disconnects, sends
/// `quit`, exceeds the line limit, or shutdown fires.
pub async fn serve_connection<S>(
    stream: S,
    dispatcher: &Dispatcher,
    session: &mut Session,
    max_line_bytes: usize,
    shutdown: &mut broadcast::Receiver<()>,
) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    write_response(&mut writer, &dispatcher.greet(session)).await?;

    loop {
        line.clear();
        let read = tokio::select! {
            read = read_request_line(&mut reader, &mut line, max_line_bytes) => read?,
            _ = shutdown.recv() => {
                tracing::debug!("Closing session for shutdown");
                return Ok(());
            }
        };

        match read {
            LineRead::Eof => return Ok(()),
            LineRead::TooLong => {
                tracing::warn!(max_line_bytes, "Request line too long, closing");
                let response = Response::new(ResponseStatus::Comms, "Request too long.");
                write_response(&mut writer, &response).await?;
                return Ok(());
            }
            LineRead::Line => {}
        }

        let response = dispatcher.handle_line(session, &line).await;
        write_response(&mut writer, &response).await?;

        if response.status == ResponseStatus::Close {
            return Ok(());
        }
    }
}

/// Read one LF-terminated line into `buf`, without the LF (or CRLF).
/// A final line without LF before EOF is still returned as a line. The limit
/// applies to the content, not the line terminator.
async fn read_request_line<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max_line_bytes: usize,
) -> std::io::Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    let limit = max_line_bytes as u64 + 2;
    let read = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
    if read == 0 {
        return Ok(LineRead::Eof);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }

    if buf.len() > max_line_bytes {
        Ok(LineRead::TooLong)
    } else {
        Ok(LineRead::Line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ControlPlane, ForwardOutcome, ForwardRequest};
    use crate::net::connection::ConnectionId;
    use crate::session::auth::{SecretError, SecretSource};
    use crate::session::DispatcherSettings;
    use async_trait::async_trait;
    use tokio::io::AsyncWriteExt;

    struct NoBackend;

    #[async_trait]
    impl ControlPlane for NoBackend {
        async fn forward(&self, _request: ForwardRequest) -> ForwardOutcome {
            ForwardOutcome::Failed
        }
    }

    struct NoSecret;

    #[async_trait]
    impl SecretSource for NoSecret {
        async fn load(&self) -> Result<Vec<u8>, SecretError> {
            Ok(b"secret\n".to_vec())
        }
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(
            DispatcherSettings {
                proxy_name: "varnish".to_string(),
                varnish_version: "4.1.1".to_string(),
            },
            Arc::new(NoBackend),
            Arc::new(NoSecret),
        )
    }

    async fn run_script(input: &[u8], max_line_bytes: usize) -> String {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let dispatcher = dispatcher();
        let (_tx, mut shutdown) = broadcast::channel(1);

        let (mut client_read, mut client_write) = tokio::io::split(client);
        client_write.write_all(input).await.unwrap();
        client_write.shutdown().await.unwrap();

        let mut session = Session::new(ConnectionId::new());
        serve_connection(server, &dispatcher, &mut session, max_line_bytes, &mut shutdown)
            .await
            .unwrap();

        let mut output = String::new();
        client_read.read_to_string(&mut output).await.unwrap();
        output
    }

    #[tokio::test]
    async fn greets_then_answers_each_line() {
        let output = run_script(b"ping\r\nFOO\n", 1024).await;
        let status_lines: Vec<&str> = output
            .lines()
            .filter(|l| l.len() == 12 && l.as_bytes()[3] == b' ')
            .collect();
        assert!(output.starts_with("107 32      \n"));
        assert!(output.contains("\n200 "));
        assert!(output.ends_with("101 31      \nall commands are in lower-case.\n"));
        assert_eq!(status_lines.len(), 3);
    }

    #[tokio::test]
    async fn final_line_without_newline_is_handled() {
        let output = run_script(b"quit", 1024).await;
        assert!(output.ends_with("500 22      \nClosing CLI connection\n"));
    }

    #[tokio::test]
    async fn quit_stops_reading() {
        let output = run_script(b"quit\nping\n", 1024).await;
        assert!(output.ends_with("Closing CLI connection\n"));
        assert!(!output.contains("PONG"));
    }

    #[tokio::test]
    async fn oversized_line_is_a_comms_error() {
        let mut input = vec![b'a'; 64];
        input.push(b'\n');
        let output = run_script(&input, 16).await;
        assert!(output.ends_with("400 17      \nRequest too long.\n"));
    }

    async fn read_one(input: &[u8], max_line_bytes: usize) -> (LineRead, Vec<u8>) {
        let mut reader = BufReader::new(input);
        let mut line = Vec::new();
        let read = read_request_line(&mut reader, &mut line, max_line_bytes)
            .await
            .unwrap();
        (read, line)
    }

    #[tokio::test]
    async fn line_limit_excludes_terminator() {
        assert_eq!(read_one(b"abcd\n", 4).await, (LineRead::Line, b"abcd".to_vec()));
        assert_eq!(read_one(b"abcd\r\n", 4).await, (LineRead::Line, b"abcd".to_vec()));
        assert_eq!(read_one(b"abcde\n", 4).await.0, LineRead::TooLong);
        assert_eq!(read_one(b"abcde\r\n", 4).await.0, LineRead::TooLong);
        assert_eq!(read_one(b"abcdefgh", 4).await.0, LineRead::TooLong);
    }

    #[tokio::test]
    async fn trailing_carriage_return_before_eof_is_dropped() {
        assert_eq!(read_one(b"ping\r", 16).await, (LineRead::Line, b"ping".to_vec()));
        assert_eq!(read_one(b"", 16).await.0, LineRead::Eof);
    }

    #[tokio::test]
    async fn crlf_line_at_limit_is_answered() {
        let output = run_script(b"quit\r\n", 4).await;
        assert!(output.ends_with("500 22      \nClosing CLI connection\n"));
    }

    #[tokio::test]
    async fn shutdown_ends_idle_session() {
        let (client, server) = tokio::io::duplex(1024);
        let dispatcher = dispatcher();
        let (tx, mut shutdown) = broadcast::channel(1);
        let mut session = Session::new(ConnectionId::new());

        let serve = serve_connection(server, &dispatcher, &mut session, 1024, &mut shutdown);
        let trigger = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            tx.send(()).unwrap();
        };
        let (result, ()) = tokio::join!(serve, trigger);
        assert!(result.is_ok());
        drop(client);
    }
}
