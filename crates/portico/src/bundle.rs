//! Credential bundle material.

use std::sync::Arc;

use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::RootCertStore;

use portico_core::{PorticoError, Result};

/// Immutable credential material for one database.
///
/// Carries the private root of trust used for both the metadata endpoint
/// and the proxied node connections, an optional client certificate for
/// mutual TLS, the metadata service coordinates, and the logical hostname
/// expected in backend certificates. The archive format this material
/// ships in is the caller's concern; the builder takes already-extracted
/// PEM bytes and every parse failure surfaces here, at construction.
#[derive(Debug)]
pub struct Bundle {
    roots_der: Vec<CertificateDer<'static>>,
    root_store: Arc<RootCertStore>,
    client_identity: Option<ClientIdentity>,
    host: String,
    port: u16,
    verify_hostname: String,
}

impl Bundle {
    /// Create a builder for assembling a bundle from PEM material.
    #[must_use]
    pub fn builder() -> BundleBuilder {
        BundleBuilder::new()
    }

    /// Host of the metadata service.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port of the metadata service.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Hostname expected in backend certificates.
    ///
    /// This is the identity chains are verified against; the SNI value
    /// offered during a dial is a routing token and takes no part in
    /// verification.
    #[must_use]
    pub fn verify_hostname(&self) -> &str {
        &self.verify_hostname
    }

    /// The bundle's trust anchors as a built root store.
    #[must_use]
    pub fn root_store(&self) -> Arc<RootCertStore> {
        Arc::clone(&self.root_store)
    }

    pub(crate) fn roots_der(&self) -> &[CertificateDer<'static>] {
        &self.roots_der
    }

    pub(crate) const fn client_identity(&self) -> Option<&ClientIdentity> {
        self.client_identity.as_ref()
    }
}

/// Client certificate chain and key, parsed once at bundle construction.
#[derive(Debug)]
pub(crate) struct ClientIdentity {
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
    pem: Vec<u8>,
}

impl ClientIdentity {
    fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self> {
        let chain = parse_certificates(cert_pem)?;
        if chain.is_empty() {
            return Err(PorticoError::Bundle(
                "no client certificates found in PEM input".into(),
            ));
        }
        let key = PrivateKeyDer::from_pem_slice(key_pem)
            .map_err(|e| PorticoError::Bundle(format!("unable to parse client key: {e}")))?;

        // reqwest wants the identity as one PEM document
        let mut pem = Vec::with_capacity(cert_pem.len() + key_pem.len() + 1);
        pem.extend_from_slice(cert_pem);
        pem.push(b'\n');
        pem.extend_from_slice(key_pem);

        Ok(Self { chain, key, pem })
    }

    pub(crate) fn chain(&self) -> &[CertificateDer<'static>] {
        &self.chain
    }

    pub(crate) const fn key(&self) -> &PrivateKeyDer<'static> {
        &self.key
    }

    pub(crate) fn pem(&self) -> &[u8] {
        &self.pem
    }
}

/// Builder for a [`Bundle`].
#[derive(Debug, Default)]
pub struct BundleBuilder {
    root_certs_pem: Option<Vec<u8>>,
    client_cert_pem: Option<Vec<u8>>,
    client_key_pem: Option<Vec<u8>>,
    host: Option<String>,
    port: Option<u16>,
    verify_hostname: Option<String>,
}

impl BundleBuilder {
    /// Create an empty builder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            root_certs_pem: None,
            client_cert_pem: None,
            client_key_pem: None,
            host: None,
            port: None,
            verify_hostname: None,
        }
    }

    /// Set the PEM-encoded root certificates (required).
    #[must_use]
    pub fn root_certs_pem(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.root_certs_pem = Some(pem.into());
        self
    }

    /// Set the PEM-encoded client certificate chain.
    ///
    /// Must be provided together with [`client_key_pem`](Self::client_key_pem).
    #[must_use]
    pub fn client_cert_pem(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.client_cert_pem = Some(pem.into());
        self
    }

    /// Set the PEM-encoded client private key.
    #[must_use]
    pub fn client_key_pem(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.client_key_pem = Some(pem.into());
        self
    }

    /// Set the metadata service host (required).
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the metadata service port (required).
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the hostname expected in backend certificates.
    ///
    /// Defaults to the metadata host.
    #[must_use]
    pub fn verify_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.verify_hostname = Some(hostname.into());
        self
    }

    /// Build the bundle, parsing and validating all credential material.
    pub fn build(self) -> Result<Bundle> {
        let host = self
            .host
            .filter(|h| !h.is_empty())
            .ok_or_else(|| PorticoError::Bundle("metadata host is required".into()))?;
        let port = self
            .port
            .ok_or_else(|| PorticoError::Bundle("metadata port is required".into()))?;
        let roots_pem = self
            .root_certs_pem
            .ok_or_else(|| PorticoError::Bundle("root certificates are required".into()))?;

        let roots_der = parse_certificates(&roots_pem)?;
        if roots_der.is_empty() {
            return Err(PorticoError::Bundle(
                "no root certificates found in PEM input".into(),
            ));
        }
        let mut root_store = RootCertStore::empty();
        for cert in &roots_der {
            root_store
                .add(cert.clone())
                .map_err(|e| PorticoError::Bundle(format!("root certificate rejected: {e}")))?;
        }

        let client_identity = match (self.client_cert_pem, self.client_key_pem) {
            (Some(cert_pem), Some(key_pem)) => Some(ClientIdentity::from_pem(&cert_pem, &key_pem)?),
            (None, None) => None,
            _ => {
                return Err(PorticoError::Bundle(
                    "client certificate and key must be provided together".into(),
                ))
            }
        };

        let verify_hostname = self.verify_hostname.unwrap_or_else(|| host.clone());

        Ok(Bundle {
            roots_der,
            root_store: Arc::new(root_store),
            client_identity,
            host,
            port,
            verify_hostname,
        })
    }
}

fn parse_certificates(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>> {
    CertificateDer::pem_slice_iter(pem)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| PorticoError::Bundle(format!("unable to parse certificates: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, DnType, KeyPair};

    fn test_root_pem() -> String {
        let mut params = CertificateParams::default();
        params.distinguished_name.push(DnType::CommonName, "test root");
        params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        let key = KeyPair::generate().unwrap();
        params.self_signed(&key).unwrap().pem()
    }

    #[test]
    fn test_build_with_roots_only() {
        let bundle = Bundle::builder()
            .root_certs_pem(test_root_pem())
            .host("db.example.com")
            .port(30443)
            .build()
            .unwrap();

        assert_eq!(bundle.host(), "db.example.com");
        assert_eq!(bundle.port(), 30443);
        assert_eq!(bundle.verify_hostname(), "db.example.com");
        assert!(bundle.client_identity().is_none());
        assert_eq!(bundle.roots_der().len(), 1);
        assert_eq!(bundle.root_store().len(), 1);
    }

    #[test]
    fn test_verify_hostname_override() {
        let bundle = Bundle::builder()
            .root_certs_pem(test_root_pem())
            .host("metadata.example.com")
            .port(30443)
            .verify_hostname("cluster.example.com")
            .build()
            .unwrap();

        assert_eq!(bundle.verify_hostname(), "cluster.example.com");
    }

    #[test]
    fn test_missing_roots_is_rejected() {
        let err = Bundle::builder()
            .host("db.example.com")
            .port(30443)
            .build()
            .unwrap_err();
        assert!(matches!(err, PorticoError::Bundle(_)));
    }

    #[test]
    fn test_garbage_pem_is_rejected() {
        let err = Bundle::builder()
            .root_certs_pem("not a certificate")
            .host("db.example.com")
            .port(30443)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("root certificates"));
    }

    #[test]
    fn test_partial_client_identity_is_rejected() {
        let key = KeyPair::generate().unwrap();
        let err = Bundle::builder()
            .root_certs_pem(test_root_pem())
            .client_key_pem(key.serialize_pem())
            .host("db.example.com")
            .port(30443)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("together"));
    }

    #[test]
    fn test_client_identity_round_trip() {
        let mut ca_params = CertificateParams::default();
        ca_params.distinguished_name.push(DnType::CommonName, "test root");
        ca_params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        let ca_key = KeyPair::generate().unwrap();
        let ca_cert = ca_params.self_signed(&ca_key).unwrap();

        let client_params = CertificateParams::new(vec!["client.example.com".into()]).unwrap();
        let client_key = KeyPair::generate().unwrap();
        let client_cert = client_params.signed_by(&client_key, &ca_cert, &ca_key).unwrap();

        let bundle = Bundle::builder()
            .root_certs_pem(ca_cert.pem())
            .client_cert_pem(client_cert.pem())
            .client_key_pem(client_key.serialize_pem())
            .host("db.example.com")
            .port(30443)
            .build()
            .unwrap();

        let identity = bundle.client_identity().unwrap();
        assert_eq!(identity.chain().len(), 1);
        assert!(!identity.pem().is_empty());
    }
}
