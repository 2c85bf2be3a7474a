//! Dialer configuration types.

use std::time::Duration;

use url::Url;

use portico_core::{PorticoError, Result};

/// Default deadline for the one-time metadata fetch
const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(10);

/// Default deadline for TCP connection establishment
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default deadline for the TLS handshake
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// SASL mechanisms accepted by default when session glue asks the dialer
/// which authenticators the deployment allows
const DEFAULT_AUTH_MECHANISMS: [&str; 2] = [
    "org.apache.cassandra.auth.PasswordAuthenticator",
    "com.datastax.bdp.cassandra.auth.DseAuthenticator",
];

/// Configuration for an [`IngressDialer`](crate::IngressDialer)
#[derive(Debug, Clone)]
pub struct DialerConfig {
    /// Deadline covering the metadata request and body read
    pub metadata_timeout: Duration,

    /// Deadline for opening the TCP connection to the ingress
    pub connect_timeout: Duration,

    /// Deadline for the TLS handshake with the backend node
    pub handshake_timeout: Duration,

    /// When set, contact points are sorted and the entry at this offset is
    /// swapped into the second position. Drivers consume the first entry
    /// for protocol discovery only, so the second slot steers which
    /// backend acts as the initial coordinator.
    pub preferred_contact_offset: Option<usize>,

    /// Complete URL of the metadata document, overriding the endpoint
    /// derived from the bundle (useful for testing against a local server)
    pub metadata_url: Option<Url>,

    /// Authentication mechanisms the deployment accepts, enumerated here
    /// at construction instead of living in process-wide constants.
    /// Session-assembly glue reads this when wiring its authenticator.
    pub allowed_auth_mechanisms: Vec<String>,
}

impl Default for DialerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DialerConfig {
    /// Create a configuration with default settings
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata_timeout: DEFAULT_METADATA_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            preferred_contact_offset: None,
            metadata_url: None,
            allowed_auth_mechanisms: DEFAULT_AUTH_MECHANISMS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }

    /// Set the metadata fetch deadline
    #[must_use]
    pub const fn metadata_timeout(mut self, timeout: Duration) -> Self {
        self.metadata_timeout = timeout;
        self
    }

    /// Set the TCP connect deadline
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the TLS handshake deadline
    #[must_use]
    pub const fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Steer the contact point at `offset` (after sorting) into the
    /// second position of the resolved list
    #[must_use]
    pub const fn preferred_contact_offset(mut self, offset: usize) -> Self {
        self.preferred_contact_offset = Some(offset);
        self
    }

    /// Override the metadata document URL
    #[must_use]
    pub fn metadata_url(mut self, url: Url) -> Self {
        self.metadata_url = Some(url);
        self
    }

    /// Replace the accepted authentication mechanisms
    #[must_use]
    pub fn allowed_auth_mechanisms<I, S>(mut self, mechanisms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_auth_mechanisms = mechanisms.into_iter().map(Into::into).collect();
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.metadata_timeout.is_zero() {
            return Err(PorticoError::Config("metadata timeout must be non-zero".into()));
        }
        if self.connect_timeout.is_zero() {
            return Err(PorticoError::Config("connect timeout must be non-zero".into()));
        }
        if self.handshake_timeout.is_zero() {
            return Err(PorticoError::Config("handshake timeout must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DialerConfig::default();
        assert_eq!(config.metadata_timeout, Duration::from_secs(10));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.handshake_timeout, Duration::from_secs(10));
        assert_eq!(config.preferred_contact_offset, None);
        assert!(config.metadata_url.is_none());
        assert_eq!(config.allowed_auth_mechanisms.len(), 2);
        assert!(config.allowed_auth_mechanisms[0].contains("PasswordAuthenticator"));
    }

    #[test]
    fn test_builder_setters() {
        let config = DialerConfig::new()
            .metadata_timeout(Duration::from_secs(3))
            .preferred_contact_offset(2)
            .allowed_auth_mechanisms(["com.example.auth.TokenAuthenticator"]);

        assert_eq!(config.metadata_timeout, Duration::from_secs(3));
        assert_eq!(config.preferred_contact_offset, Some(2));
        assert_eq!(
            config.allowed_auth_mechanisms,
            vec!["com.example.auth.TokenAuthenticator".to_string()]
        );
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let config = DialerConfig::new().connect_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }
}
