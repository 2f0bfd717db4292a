//! Shared helpers for the integration tests.
//!
//! The PEM material under `tests/fixtures/` is a throwaway test CA with a
//! server certificate (CN=localhost, SAN DNS:localhost/IP:127.0.0.1) and a
//! client certificate signed by it, plus a private key that matches none of
//! them. The cooperating client side of each test drives the `openssl`
//! crate directly.

#![allow(dead_code)]

use std::net::{SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use openssl::ssl::{
    HandshakeError, SslConnector, SslFiletype, SslMethod, SslStream, SslVerifyMode,
};

use securetcp::logger::Logger;

/// Path of a PEM fixture under `tests/fixtures/`.
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Logger that collects every line for later assertions.
pub fn capture_logger() -> (Logger, Arc<Mutex<Vec<String>>>) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&lines);
    let logger = Logger::new(move |line| captured.lock().unwrap().push(line.to_string()));
    (logger, lines)
}

/// True when any captured line contains `needle`.
pub fn logged(lines: &Arc<Mutex<Vec<String>>>, needle: &str) -> bool {
    lines.lock().unwrap().iter().any(|line| line.contains(needle))
}

/// TLS client that performs no server verification.
pub fn connect_client(addr: SocketAddr) -> SslStream<TcpStream> {
    try_connect_client(addr).expect("client handshake failed")
}

/// Same as [`connect_client`] but surfaces the handshake outcome.
pub fn try_connect_client(
    addr: SocketAddr,
) -> Result<SslStream<TcpStream>, HandshakeError<TcpStream>> {
    let connector = SslConnector::builder(SslMethod::tls_client())
        .unwrap()
        .build();
    let stream = TcpStream::connect(addr).unwrap();

    let mut config = connector.configure().unwrap();
    config.set_verify(SslVerifyMode::NONE);
    config.set_verify_hostname(false);
    config.connect("localhost", stream)
}

/// TLS client that requires server authentication against the test CA.
pub fn try_connect_verifying_client(
    addr: SocketAddr,
) -> Result<SslStream<TcpStream>, HandshakeError<TcpStream>> {
    let mut builder = SslConnector::builder(SslMethod::tls_client()).unwrap();
    builder.set_ca_file(fixture("ca-cert.pem")).unwrap();
    let connector = builder.build();

    let stream = TcpStream::connect(addr).unwrap();
    connector.connect("localhost", stream)
}

/// TLS client that opens the TCP connection immediately but waits `delay`
/// before starting its side of the handshake.
pub fn try_connect_client_delayed(
    addr: SocketAddr,
    delay: std::time::Duration,
) -> Result<SslStream<TcpStream>, HandshakeError<TcpStream>> {
    let stream = TcpStream::connect(addr).unwrap();
    std::thread::sleep(delay);

    let connector = SslConnector::builder(SslMethod::tls_client())
        .unwrap()
        .build();
    let mut config = connector.configure().unwrap();
    config.set_verify(SslVerifyMode::NONE);
    config.set_verify_hostname(false);
    config.connect("localhost", stream)
}

/// TLS client that presents the given client certificate, with server
/// verification disabled.
pub fn try_connect_client_with_cert(
    addr: SocketAddr,
    cert: &Path,
    key: &Path,
) -> Result<SslStream<TcpStream>, HandshakeError<TcpStream>> {
    let mut builder = SslConnector::builder(SslMethod::tls_client()).unwrap();
    builder.set_certificate_file(cert, SslFiletype::PEM).unwrap();
    builder.set_private_key_file(key, SslFiletype::PEM).unwrap();
    let connector = builder.build();

    let stream = TcpStream::connect(addr).unwrap();
    let mut config = connector.configure().unwrap();
    config.set_verify(SslVerifyMode::NONE);
    config.set_verify_hostname(false);
    config.connect("localhost", stream)
}
