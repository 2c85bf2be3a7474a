//! Resolution and caching of ingress metadata.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{timeout, Instant};
use tracing::debug;

use portico_core::{IngressMetadata, PorticoError, ProxyContacts, Result};

use crate::bundle::Bundle;
use crate::config::DialerConfig;

/// Resolves the ingress address and contact identities, once.
///
/// The first call fetches `GET /metadata` over HTTPS authenticated with
/// the bundle's trust anchors; the result is cached for the resolver's
/// lifetime. The cache carries no TTL: a deployment that must follow
/// topology changes either calls [`invalidate`](Self::invalidate) or
/// constructs a new dialer. The mutex guards the whole read-or-populate
/// step, so concurrent first callers wait for a single fetch instead of
/// issuing their own.
pub struct MetadataResolver {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
    preferred_offset: Option<usize>,
    cached: Mutex<Option<ProxyContacts>>,
}

impl MetadataResolver {
    /// Build a resolver for the bundle's metadata endpoint.
    pub fn new(bundle: &Bundle, config: &DialerConfig) -> Result<Self> {
        let url = config.metadata_url.as_ref().map_or_else(
            || format!("https://{}:{}/metadata", bundle.host(), bundle.port()),
            ToString::to_string,
        );

        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .tls_built_in_root_certs(false);
        for der in bundle.roots_der() {
            let cert = reqwest::Certificate::from_der(der.as_ref()).map_err(|e| {
                PorticoError::Bundle(format!("root certificate rejected by HTTP client: {e}"))
            })?;
            builder = builder.add_root_certificate(cert);
        }
        if let Some(identity) = bundle.client_identity() {
            let identity = reqwest::Identity::from_pem(identity.pem()).map_err(|e| {
                PorticoError::Bundle(format!("client identity rejected by HTTP client: {e}"))
            })?;
            builder = builder.identity(identity);
        }
        let http = builder
            .build()
            .map_err(|e| PorticoError::Config(format!("unable to build metadata HTTP client: {e}")))?;

        Ok(Self {
            http,
            url,
            timeout: config.metadata_timeout,
            preferred_offset: config.preferred_contact_offset,
            cached: Mutex::new(None),
        })
    }

    /// Endpoint the resolver queries.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Resolve the proxy coordinates, fetching at most once.
    pub async fn resolve(&self) -> Result<ProxyContacts> {
        let mut cached = self.cached.lock().await;
        if let Some(contacts) = cached.as_ref() {
            return Ok(contacts.clone());
        }

        let contacts = self.fetch().await?;
        *cached = Some(contacts.clone());
        Ok(contacts)
    }

    /// Drop the cached value so the next [`resolve`](Self::resolve)
    /// fetches again.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn fetch(&self) -> Result<ProxyContacts> {
        let started = Instant::now();
        debug!(url = %self.url, "fetching ingress metadata");

        let response = timeout(self.timeout, self.http.get(&self.url).send())
            .await
            .map_err(|_| self.timeout_error("metadata fetch"))?
            .map_err(|e| PorticoError::Metadata {
                url: self.url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();

        // The body read gets whatever budget the request left over, so a
        // peer that accepts the request and then stalls surfaces as a
        // timeout instead of hanging until the socket gives up.
        let remaining = self.timeout.saturating_sub(started.elapsed());
        let body = timeout(remaining, response.text())
            .await
            .map_err(|_| self.timeout_error("metadata body read"))?
            .map_err(|e| PorticoError::Metadata {
                url: self.url.clone(),
                message: format!("error reading response body: {e}, http status: {status}"),
            })?;

        if !status.is_success() {
            return Err(PorticoError::Metadata {
                url: self.url.clone(),
                message: format!("unexpected http status {status}: {body}"),
            });
        }

        let metadata: IngressMetadata =
            serde_json::from_str(&body).map_err(|source| PorticoError::MetadataDecode {
                url: self.url.clone(),
                source,
            })?;

        let info = metadata.contact_info;
        if info.sni_proxy_address.is_empty() {
            return Err(PorticoError::Metadata {
                url: self.url.clone(),
                message: "metadata did not include an sni proxy address".into(),
            });
        }
        if info.contact_points.is_empty() {
            return Err(PorticoError::NoContactPoints {
                url: self.url.clone(),
            });
        }

        let mut contact_points = info.contact_points;
        debug!(
            ingress = %info.sni_proxy_address,
            region = %metadata.region,
            contact_points = ?contact_points,
            "ingress metadata resolved"
        );

        if let Some(offset) = self.preferred_offset {
            promote_preferred(&mut contact_points, offset);
            debug!(offset, contact_points = ?contact_points, "contact points reordered");
        }

        Ok(ProxyContacts {
            sni_proxy_address: info.sni_proxy_address,
            contact_points,
        })
    }

    fn timeout_error(&self, operation: &str) -> PorticoError {
        PorticoError::Timeout {
            operation: format!("{operation} from {}", self.url),
            limit: self.timeout,
        }
    }
}

/// Sort the contact points and swap the entry at `offset` into the second
/// position. Drivers consume the first entry for protocol discovery only,
/// so the second slot steers which backend acts as the initial
/// coordinator.
fn promote_preferred(contact_points: &mut [String], offset: usize) {
    if contact_points.len() < 2 {
        return;
    }
    contact_points.sort_unstable();
    let idx = offset % contact_points.len();
    contact_points.swap(idx, 1);
}
