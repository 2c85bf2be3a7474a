//! Wire schema of the ingress metadata endpoint and the resolved value
//! derived from it.

use serde::Deserialize;

/// Document served at `GET /metadata` by the ingress.
///
/// Only `contact_info` is load-bearing for the dialer; the version and
/// region tags are carried for diagnostics.
#[derive(Debug, Clone, Deserialize)]
pub struct IngressMetadata {
    /// Schema version of the document
    #[serde(default)]
    pub version: i64,

    /// Region the ingress serves
    #[serde(default)]
    pub region: String,

    /// Proxy coordinates and the advertised backend identities
    pub contact_info: ContactInfo,
}

/// Contact-info object inside [`IngressMetadata`].
#[derive(Debug, Clone, Deserialize)]
pub struct ContactInfo {
    /// Type tag of the contact-info entry
    #[serde(rename = "type", default)]
    pub type_name: String,

    /// Datacenter the contact points belong to
    #[serde(default)]
    pub local_dc: String,

    /// `host:port` of the SNI ingress
    #[serde(default)]
    pub sni_proxy_address: String,

    /// Backend identities reachable through the ingress
    #[serde(default)]
    pub contact_points: Vec<String>,
}

/// Resolved and post-processed proxy coordinates.
///
/// Produced once per resolver instance and shared by every connection
/// request issued through the owning dialer. Never mutated after it is
/// first populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyContacts {
    /// `host:port` of the SNI ingress
    pub sni_proxy_address: String,

    /// Backend identities, in allocation (ring) order
    pub contact_points: Vec<String>,
}
