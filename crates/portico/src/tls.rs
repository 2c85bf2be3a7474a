//! Client TLS configuration for connections through the ingress.

use std::sync::Arc;

use rustls::ClientConfig;

use portico_core::{PorticoError, Result};

use crate::bundle::Bundle;
use crate::verify::{PeerVerifier, SniOverrideVerifier};

/// Build the client configuration shared by every dial.
///
/// Certificate acceptance is delegated entirely to `verifier`; the SNI
/// value is supplied per connection at handshake time. When the bundle
/// carries a client identity the configuration authenticates with it.
pub(crate) fn build_client_config(
    bundle: &Bundle,
    verifier: Arc<dyn PeerVerifier>,
) -> Result<ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let builder = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| PorticoError::Config(format!("unable to set protocol versions: {e}")))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(SniOverrideVerifier::new(verifier)));

    let config = match bundle.client_identity() {
        Some(identity) => builder
            .with_client_auth_cert(identity.chain().to_vec(), identity.key().clone_key())
            .map_err(|e| PorticoError::Bundle(format!("client certificate rejected: {e}")))?,
        None => builder.with_no_client_auth(),
    };

    Ok(config)
}
