//! Connection establishment through the SNI ingress.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use rustls::pki_types::ServerName;
use tokio::net::{lookup_host, TcpStream};
use tokio::time::timeout;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

use portico_core::{NodeRef, PorticoError, ProxyContacts, Result};

use crate::alloc::ContactAllocator;
use crate::bundle::Bundle;
use crate::config::DialerConfig;
use crate::metadata::MetadataResolver;
use crate::tls::build_client_config;
use crate::verify::{AnchoredVerifier, PeerVerifier};

/// An established, verified connection through the ingress.
///
/// Ownership transfers to the caller on return; the dialer keeps no
/// reference to it.
#[derive(Debug)]
pub struct DialedConnection {
    /// The encrypted stream to the backend node
    pub stream: TlsStream<TcpStream>,

    /// Identity that was offered as SNI
    pub node_identity: String,

    /// Ingress replica the connection runs through
    pub ingress_addr: SocketAddr,

    /// Always true: the stream is multiplexed through a shared proxy, so
    /// drivers must not coalesce it with direct-addressed connections
    pub disable_coalesce: bool,
}

/// Capability handed to a driver for opening node connections.
#[async_trait]
pub trait NodeDialer: Send + Sync {
    /// Open a verified, encrypted connection for the given node.
    async fn dial(&self, node: &NodeRef) -> Result<DialedConnection>;
}

/// Dials backend nodes through a shared TLS-terminating SNI ingress.
///
/// Cheap to clone; clones share the metadata cache and the allocation
/// counter, so a driver's pool workers can dial concurrently through one
/// dialer. Dial futures are cancel-safe: dropping one aborts whatever
/// network step was in flight.
#[derive(Clone)]
pub struct IngressDialer {
    inner: Arc<DialerInner>,
}

struct DialerInner {
    bundle: Bundle,
    config: DialerConfig,
    resolver: MetadataResolver,
    allocator: ContactAllocator,
    connector: TlsConnector,
}

impl IngressDialer {
    /// Create a dialer with default configuration.
    pub fn new(bundle: Bundle) -> Result<Self> {
        Self::builder(bundle).build()
    }

    /// Create a builder for custom configuration.
    #[must_use]
    pub fn builder(bundle: Bundle) -> IngressDialerBuilder {
        IngressDialerBuilder::new(bundle)
    }

    /// The credential bundle this dialer was constructed with.
    #[must_use]
    pub fn bundle(&self) -> &Bundle {
        &self.inner.bundle
    }

    /// Authentication mechanisms the deployment accepts, for
    /// session-assembly glue.
    #[must_use]
    pub fn allowed_auth_mechanisms(&self) -> &[String] {
        &self.inner.config.allowed_auth_mechanisms
    }

    /// Resolved proxy coordinates, fetching them on first use.
    pub async fn proxy_contacts(&self) -> Result<ProxyContacts> {
        self.inner.resolver.resolve().await
    }

    /// Drop the cached metadata so the next dial re-resolves.
    ///
    /// The cache otherwise never expires; see [`MetadataResolver`].
    pub async fn refresh_topology(&self) {
        self.inner.resolver.invalidate().await;
    }

    /// Open a verified, encrypted connection for `node`.
    ///
    /// Resolves metadata (cached after the first call), picks an ingress
    /// replica at random, connects, and handshakes with SNI set to the
    /// node's identity. A request without a `host_id` is assigned the next
    /// identity from the contact ring; a request that names one uses
    /// exactly that identity and leaves the ring untouched. Nothing is
    /// retried internally.
    pub async fn dial(&self, node: &NodeRef) -> Result<DialedConnection> {
        let inner = &self.inner;

        let contacts = inner.resolver.resolve().await?;
        let ingress_addr = select_ingress_addr(&contacts.sni_proxy_address).await?;

        let tcp = timeout(inner.config.connect_timeout, TcpStream::connect(ingress_addr))
            .await
            .map_err(|_| PorticoError::Timeout {
                operation: format!("tcp connect to {ingress_addr}"),
                limit: inner.config.connect_timeout,
            })?
            .map_err(|source| PorticoError::Connect {
                address: ingress_addr.to_string(),
                source,
            })?;

        let node_identity = match node.host_id.as_deref() {
            Some(id) => id.to_owned(),
            None => inner
                .allocator
                .allocate(&contacts.contact_points)
                .ok_or_else(|| PorticoError::NoContactPoints {
                    url: inner.resolver.url().to_owned(),
                })?
                .to_owned(),
        };

        debug!(identity = %node_identity, ingress = %ingress_addr, "dialing through ingress");

        let server_name =
            ServerName::try_from(node_identity.clone()).map_err(|e| PorticoError::Handshake {
                identity: node_identity.clone(),
                address: ingress_addr.to_string(),
                message: format!("invalid server name: {e}"),
            })?;

        // verification runs inside the handshake; a rejected chain closes
        // the connection with the verifier's error in the message
        let stream = timeout(
            inner.config.handshake_timeout,
            inner.connector.connect(server_name, tcp),
        )
        .await
        .map_err(|_| PorticoError::Timeout {
            operation: format!("tls handshake with {node_identity}"),
            limit: inner.config.handshake_timeout,
        })?
        .map_err(|e| PorticoError::Handshake {
            identity: node_identity.clone(),
            address: ingress_addr.to_string(),
            message: e.to_string(),
        })?;

        Ok(DialedConnection {
            stream,
            node_identity,
            ingress_addr,
            disable_coalesce: true,
        })
    }
}

#[async_trait]
impl NodeDialer for IngressDialer {
    async fn dial(&self, node: &NodeRef) -> Result<DialedConnection> {
        Self::dial(self, node).await
    }
}

/// Resolve the ingress name and pick one replica uniformly at random,
/// spreading connections across proxy replicas instead of pinning the
/// first answer.
async fn select_ingress_addr(proxy_address: &str) -> Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = lookup_host(proxy_address)
        .await
        .map_err(|e| PorticoError::AddressResolution {
            address: proxy_address.to_owned(),
            message: e.to_string(),
        })?
        .collect();

    if addrs.is_empty() {
        return Err(PorticoError::AddressResolution {
            address: proxy_address.to_owned(),
            message: "no addresses returned".into(),
        });
    }

    let pick = rand::thread_rng().gen_range(0..addrs.len());
    Ok(addrs[pick])
}

/// Builder for an [`IngressDialer`].
pub struct IngressDialerBuilder {
    bundle: Bundle,
    config: DialerConfig,
    verifier: Option<Arc<dyn PeerVerifier>>,
}

impl IngressDialerBuilder {
    fn new(bundle: Bundle) -> Self {
        Self {
            bundle,
            config: DialerConfig::default(),
            verifier: None,
        }
    }

    /// Set the dialer configuration.
    #[must_use]
    pub fn config(mut self, config: DialerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the chain verifier.
    ///
    /// Defaults to an [`AnchoredVerifier`] over the bundle's trust anchors
    /// and logical hostname.
    #[must_use]
    pub fn verifier(mut self, verifier: Arc<dyn PeerVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Build the dialer.
    pub fn build(self) -> Result<IngressDialer> {
        self.config.validate()?;

        let verifier = match self.verifier {
            Some(verifier) => verifier,
            None => Arc::new(AnchoredVerifier::new(&self.bundle)?),
        };
        let resolver = MetadataResolver::new(&self.bundle, &self.config)?;
        let tls_config = build_client_config(&self.bundle, verifier)?;
        let connector = TlsConnector::from(Arc::new(tls_config));

        Ok(IngressDialer {
            inner: Arc::new(DialerInner {
                bundle: self.bundle,
                config: self.config,
                resolver,
                allocator: ContactAllocator::new(),
                connector,
            }),
        })
    }
}
