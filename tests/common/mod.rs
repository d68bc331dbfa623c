//! Shared helpers for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use h1serve::config::ServerConfig;
use h1serve::http::{EchoDispatcher, HttpServer};
use h1serve::lifecycle::Shutdown;
use h1serve::net::{tls, Listener};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A running echo server on an ephemeral port.
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<std::io::Result<()>>,
}

#[allow(dead_code)]
impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = tokio::time::timeout(Duration::from_secs(5), self.handle).await;
    }
}

/// Config with timeouts generous enough for a loaded CI machine.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.timeouts.send_ms = 2_000;
    config.timeouts.receive_ms = 2_000;
    config.timeouts.shutdown_secs = 2;
    config
}

pub async fn start_server(config: ServerConfig) -> TestServer {
    let tcp = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = tcp.local_addr().unwrap();
    let listener = Listener::from_tcp(tcp, config.listener.max_connections).unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let mut server = HttpServer::new(config.clone(), EchoDispatcher);
    if let Some(tls_config) = &config.listener.tls {
        server = server.with_tls(tls::acceptor_from_config(tls_config).unwrap());
    }
    let handle = tokio::spawn(server.run(listener, rx));
    TestServer { addr, shutdown, handle }
}

/// Write `request` on a fresh connection and read until the server closes.
#[allow(dead_code)]
pub async fn raw_exchange(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut out = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut out))
        .await
        .expect("server did not close the connection")
        .unwrap();
    String::from_utf8_lossy(&out).into_owned()
}

/// Read until `out` ends with `suffix`.
#[allow(dead_code)]
pub async fn read_until(stream: &mut TcpStream, suffix: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 4096];
    while !out.ends_with(suffix) {
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .expect("timed out waiting for response")
            .unwrap();
        assert!(n > 0, "connection closed early: {}", String::from_utf8_lossy(&out));
        out.extend_from_slice(&buf[..n]);
    }
    out
}
