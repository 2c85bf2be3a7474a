use std::io;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for portico operations
pub type Result<T> = std::result::Result<T, PorticoError>;

/// Errors that can occur while resolving ingress metadata or dialing
/// through the ingress
#[derive(Error, Debug)]
pub enum PorticoError {
    /// Credential material is malformed or unusable. Raised at
    /// construction time and expected to be treated as fatal.
    #[error("invalid credential bundle: {0}")]
    Bundle(String),

    /// Construction-time configuration is invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// The metadata request failed or returned a non-success status
    #[error("metadata request to {url} failed: {message}")]
    Metadata {
        /// Endpoint that was queried
        url: String,
        /// Underlying cause, including HTTP status and body where known
        message: String,
    },

    /// The metadata response body was not the expected shape
    #[error("unable to decode metadata response from {url}: {source}")]
    MetadataDecode {
        /// Endpoint that was queried
        url: String,
        /// Decode failure
        #[source]
        source: serde_json::Error,
    },

    /// The metadata service advertised no contact points
    #[error("metadata from {url} advertised no contact points")]
    NoContactPoints {
        /// Endpoint that was queried
        url: String,
    },

    /// The ingress hostname did not resolve to a usable address
    #[error("unable to resolve ingress address {address}: {message}")]
    AddressResolution {
        /// The host:port string taken from the metadata
        address: String,
        /// Underlying cause
        message: String,
    },

    /// TCP connection to the ingress failed
    #[error("error connecting to ingress {address}: {source}")]
    Connect {
        /// Address the connection was attempted against
        address: String,
        /// Socket-level cause
        #[source]
        source: io::Error,
    },

    /// TLS negotiation with a backend node failed
    #[error("error connecting to node {identity} through ingress {address}: {message}")]
    Handshake {
        /// Identity offered as SNI
        identity: String,
        /// Ingress address the handshake ran against
        address: String,
        /// Underlying cause
        message: String,
    },

    /// The presented certificate chain was rejected
    #[error("peer certificate chain rejected: {0}")]
    Verification(String),

    /// An operation exceeded its deadline
    #[error("{operation} timed out after {limit:?}")]
    Timeout {
        /// The operation that timed out
        operation: String,
        /// The deadline that was exceeded
        limit: Duration,
    },
}

impl PorticoError {
    /// Returns true if the error is a deadline expiry
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns true if the error is a certificate verification rejection
    #[must_use]
    pub const fn is_verification(&self) -> bool {
        matches!(self, Self::Verification(_))
    }

    /// Returns true if a fresh dial attempt could plausibly succeed.
    ///
    /// Bundle and configuration errors are permanent; everything tied to a
    /// single attempt (network, timeout, handshake) is worth retrying by
    /// the calling driver. This library never retries internally.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Bundle(_) | Self::Config(_) | Self::Verification(_))
    }
}
