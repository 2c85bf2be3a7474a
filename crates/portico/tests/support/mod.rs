//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use rcgen::{Certificate, CertificateParams, DnType, KeyPair};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_rustls::LazyConfigAcceptor;
use url::Url;

use portico::{Bundle, DialerConfig};

pub struct TestCa {
    pub cert: Certificate,
    pub key: KeyPair,
}

/// Generate a self-signed CA for a test.
pub fn test_ca(cn: &str) -> TestCa {
    let mut params = CertificateParams::default();
    params.distinguished_name.push(DnType::CommonName, cn);
    params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
    let key = KeyPair::generate().expect("generate ca key");
    let cert = params.self_signed(&key).expect("self-sign ca");
    TestCa { cert, key }
}

/// Issue a server certificate for `hostname`, signed by `ca`.
pub fn issue_server_identity(
    ca: &TestCa,
    hostname: &str,
) -> (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>) {
    let params = CertificateParams::new(vec![hostname.to_string()]).expect("leaf params");
    let key = KeyPair::generate().expect("generate leaf key");
    let cert = params.signed_by(&key, &ca.cert, &ca.key).expect("sign leaf");
    let key_der = PrivatePkcs8KeyDer::from(key.serialize_der());
    (vec![cert.der().clone()], PrivateKeyDer::Pkcs8(key_der))
}

/// A bundle trusting `ca`, verifying backend chains against `verify_hostname`.
pub fn bundle_with(ca: &TestCa, verify_hostname: &str) -> Bundle {
    Bundle::builder()
        .root_certs_pem(ca.cert.pem())
        .host("metadata.portico.test")
        .port(30443)
        .verify_hostname(verify_hostname)
        .build()
        .expect("bundle")
}

/// A config pointed at a mock metadata server.
pub fn config_for(mock_uri: &str) -> DialerConfig {
    let url = Url::parse(&format!("{mock_uri}/metadata")).expect("metadata url");
    DialerConfig::new().metadata_url(url)
}

/// The JSON document a healthy metadata endpoint serves.
pub fn metadata_body(proxy_address: &str, contact_points: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "version": 1,
        "region": "eu-west-1",
        "contact_info": {
            "type": "sni_proxy",
            "local_dc": "dc1",
            "sni_proxy_address": proxy_address,
            "contact_points": contact_points,
        }
    })
}

/// Spawn a TLS server that records the SNI of every ClientHello it sees,
/// then completes the handshake with the given certificate regardless of
/// the name offered — the behavior of an SNI-routing ingress.
pub async fn spawn_sni_server(
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .expect("protocol versions")
        .with_no_client_auth()
        .with_single_cert(chain, key)
        .expect("server certificate");
    let config = Arc::new(config);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            let config = Arc::clone(&config);
            let tx = tx.clone();
            tokio::spawn(async move {
                let acceptor = LazyConfigAcceptor::new(rustls::server::Acceptor::default(), tcp);
                let Ok(start) = acceptor.await else { return };
                if let Some(name) = start.client_hello().server_name() {
                    let _ = tx.send(name.to_owned());
                }
                if let Ok(mut stream) = start.into_stream(config).await {
                    // hold the connection until the client hangs up
                    let _ = stream.read(&mut [0u8; 1]).await;
                }
            });
        }
    });

    (addr, rx)
}
