//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use varnish_cli_bridge::config::BridgeConfig;
use varnish_cli_bridge::lifecycle::startup::build_dispatcher;
use varnish_cli_bridge::net::listener::Listener;
use varnish_cli_bridge::session::auth::expected_response;
use varnish_cli_bridge::{BridgeServer, Shutdown};

/// One HTTP request received by the mock backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Mock control-plane API answering every request with a fixed response.
pub struct MockBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockBackend {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}/api/state", self.addr)
    }
}

/// Start a mock backend that records requests and replies with `status`.
pub async fn start_mock_backend(status: u16, body: &'static str) -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = requests.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let recorded = recorded.clone();
                    tokio::spawn(async move {
                        let mut reader = BufReader::new(socket);
                        if let Some(request) = read_http_request(&mut reader).await {
                            recorded.lock().unwrap().push(request);
                        }
                        let reason = match status {
                            200 => "OK",
                            401 => "Unauthorized",
                            500 => "Internal Server Error",
                            503 => "Service Unavailable",
                            _ => "Unknown",
                        };
                        let response = format!(
                            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            reason,
                            body.len(),
                            body
                        );
                        let mut socket = reader.into_inner();
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockBackend { addr, requests }
}

async fn read_http_request(reader: &mut BufReader<TcpStream>) -> Option<RecordedRequest> {
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await.ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await.ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        let (name, value) = line.split_once(':')?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    let length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await.ok()?;

    Some(RecordedRequest {
        method,
        path,
        headers,
        body: String::from_utf8(body).ok()?,
    })
}

/// A running bridge. Dropping it stops the server.
pub struct TestBridge {
    pub addr: SocketAddr,
    _shutdown: Shutdown,
}

/// Start a bridge on an ephemeral port against `api_endpoint`.
pub async fn start_bridge(api_endpoint: &str, secret_file: &Path) -> TestBridge {
    let mut config = BridgeConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.listener.shutdown_grace_secs = 1;
    config.auth.secret_file = secret_file.to_string_lossy().into_owned();
    config.api.endpoint = api_endpoint.to_string();
    config.api.username = "ops".to_string();
    config.api.password = "pw".to_string();
    config.api.proxy_name = "edge".to_string();
    config.api.timeout_secs = 5;

    let dispatcher = Arc::new(build_dispatcher(&config).unwrap());
    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = BridgeServer::new(&config.listener, dispatcher);
    tokio::spawn(server.run(listener, shutdown.subscribe()));

    TestBridge {
        addr,
        _shutdown: shutdown,
    }
}

/// Line-oriented Varnish CLI client.
pub struct CliClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl CliClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Read one framed response, checking the status line layout.
    pub async fn read_response(&mut self) -> (u16, String) {
        let mut status_line = String::new();
        self.reader.read_line(&mut status_line).await.unwrap();
        assert_eq!(status_line.len(), 13, "status line {:?}", status_line);

        let code: u16 = status_line[..3].trim().parse().unwrap();
        let length: usize = status_line[4..12].trim().parse().unwrap();

        let mut body = vec![0u8; length + 1];
        self.reader.read_exact(&mut body).await.unwrap();
        assert_eq!(body.pop(), Some(b'\n'));
        (code, String::from_utf8(body).unwrap())
    }

    pub async fn send(&mut self, line: &str) -> (u16, String) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
        self.read_response().await
    }

    /// Answer `challenge` using `secret`.
    pub async fn authenticate(&mut self, challenge: &str, secret: &[u8]) -> (u16, String) {
        let answer = expected_response(challenge, secret);
        self.send(&format!("auth {}", answer)).await
    }

    /// True once the server has closed the connection.
    pub async fn is_closed(&mut self) -> bool {
        let mut buf = [0u8; 1];
        matches!(self.reader.read(&mut buf).await, Ok(0))
    }
}

/// Write `secret` to a fresh temp directory, returning both.
pub fn secret_file(secret: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("secret");
    std::fs::write(&path, secret).unwrap();
    (dir, path)
}
