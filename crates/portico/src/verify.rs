//! Manual certificate chain verification.
//!
//! The SNI value offered during a dial is an opaque routing token the
//! ingress consumes, not a name present in the backend certificate, so
//! the transport's hostname-matching verification cannot apply. Chain
//! acceptance is decided here instead: against the bundle's trust anchors
//! and its logical hostname, independent of whatever name was offered on
//! the wire.

use std::fmt;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, RootCertStore, SignatureScheme};

use portico_core::{PorticoError, Result};

use crate::bundle::Bundle;

/// Accepts or rejects a presented peer certificate chain.
///
/// Implementations take the chain as presented (end entity first, issuers
/// following) and the evaluation time; they never see a socket, so they
/// can be exercised directly in tests.
pub trait PeerVerifier: fmt::Debug + Send + Sync {
    /// Verify the presented chain, returning an error to reject the
    /// connection attempt.
    fn verify_peer(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> Result<()>;
}

/// Verifies chains against pinned trust anchors and a fixed hostname.
///
/// The presented intermediates form the candidate pool for path building;
/// the end entity must chain to one of the anchors and carry the expected
/// hostname, evaluated at the supplied time.
#[derive(Debug)]
pub struct AnchoredVerifier {
    webpki: Arc<WebPkiServerVerifier>,
    expected_name: ServerName<'static>,
}

impl AnchoredVerifier {
    /// Build a verifier from the bundle's trust anchors and logical hostname.
    pub fn new(bundle: &Bundle) -> Result<Self> {
        Self::with_roots(bundle.root_store(), bundle.verify_hostname())
    }

    /// Build a verifier from explicit trust anchors and an expected hostname.
    pub fn with_roots(roots: Arc<RootCertStore>, expected_hostname: &str) -> Result<Self> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let webpki = WebPkiServerVerifier::builder_with_provider(roots, provider)
            .build()
            .map_err(|e| PorticoError::Bundle(format!("unable to build chain verifier: {e}")))?;
        let expected_name = ServerName::try_from(expected_hostname.to_owned()).map_err(|e| {
            PorticoError::Bundle(format!(
                "invalid verification hostname {expected_hostname}: {e}"
            ))
        })?;
        Ok(Self {
            webpki,
            expected_name,
        })
    }
}

impl PeerVerifier for AnchoredVerifier {
    fn verify_peer(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> Result<()> {
        self.webpki
            .verify_server_cert(end_entity, intermediates, &self.expected_name, &[], now)
            .map(|_| ())
            .map_err(|e| PorticoError::Verification(e.to_string()))
    }
}

/// Bridges a [`PeerVerifier`] into rustls.
///
/// The `server_name` rustls hands over is the SNI routing token and is
/// discarded; signature checks stay with the provider's algorithms.
#[derive(Debug)]
pub(crate) struct SniOverrideVerifier {
    inner: Arc<dyn PeerVerifier>,
}

impl SniOverrideVerifier {
    pub(crate) fn new(inner: Arc<dyn PeerVerifier>) -> Self {
        Self { inner }
    }
}

impl ServerCertVerifier for SniOverrideVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        self.inner
            .verify_peer(end_entity, intermediates, now)
            .map(|()| ServerCertVerified::assertion())
            .map_err(|e| rustls::Error::General(e.to_string()))
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &rustls::crypto::ring::default_provider().signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &rustls::crypto::ring::default_provider().signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
