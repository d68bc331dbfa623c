mod common;

use std::io::Write;
use std::time::Duration;

use common::{start_server, test_config};
use h1serve::config::TlsConfig;
use tempfile::NamedTempFile;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Self-signed PEM pair for `localhost`, kept alive by the returned files.
fn self_signed() -> (NamedTempFile, NamedTempFile) {
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let mut cert_file = NamedTempFile::new().unwrap();
    cert_file.write_all(cert.pem().as_bytes()).unwrap();
    let mut key_file = NamedTempFile::new().unwrap();
    key_file.write_all(key_pair.serialize_pem().as_bytes()).unwrap();
    (cert_file, key_file)
}

fn tls_config(cert: &NamedTempFile, key: &NamedTempFile) -> h1serve::ServerConfig {
    let mut config = test_config();
    config.timeouts.tls_handshake_ms = 2_000;
    config.listener.tls = Some(TlsConfig {
        cert_path: cert.path().display().to_string(),
        key_path: key.path().display().to_string(),
    });
    config
}

#[tokio::test]
async fn requests_are_served_over_tls() {
    let (cert, key) = self_signed();
    let server = start_server(tls_config(&cert, &key)).await;
    let client = reqwest::Client::builder()
        .use_rustls_tls()
        .danger_accept_invalid_certs(true)
        .build()
        .unwrap();

    let url = format!("https://{}/secure?x=1", server.addr);
    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.starts_with("GET /secure?x=1 HTTP/1.1\n"), "{}", body);
    assert!(body.contains("query x=1\n"));

    let again = client.get(&url).send().await.unwrap().text().await.unwrap();
    assert!(again.starts_with("GET /secure?x=1 HTTP/1.1\n"));

    server.stop().await;
}

#[tokio::test]
async fn plaintext_client_gets_no_http_response() {
    let (cert, key) = self_signed();
    let server = start_server(tls_config(&cert, &key)).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream.write_all(b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n").await.unwrap();
    let mut wire = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut wire))
        .await
        .expect("server kept the connection open");
    // A reset is as good as a clean close here.
    if read.is_ok() {
        assert!(!String::from_utf8_lossy(&wire).contains("HTTP/1.1"));
    }

    server.stop().await;
}
