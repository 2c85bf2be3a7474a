//! Secure dialer for databases behind a shared SNI-terminating ingress.
//!
//! Managed database deployments often place every backend node behind one
//! TLS-terminating proxy that routes on the Server Name Indication value
//! rather than the destination address. This crate provides the client
//! side of that arrangement:
//!
//! - [`MetadataResolver`] discovers and caches the proxy address and the
//!   advertised backend identities from the deployment's metadata service
//! - [`ContactAllocator`] assigns identities round-robin to requests that
//!   do not already carry one
//! - [`AnchoredVerifier`] verifies peer chains against the bundle's trust
//!   anchors and logical hostname, since the SNI value is a routing token
//!   rather than a certificate name
//! - [`IngressDialer`] ties those together and hands the driver an
//!   established, verified connection
//!
//! # Example
//!
//! ```rust,ignore
//! use portico::{Bundle, IngressDialer, NodeRef};
//!
//! let bundle = Bundle::builder()
//!     .root_certs_pem(root_pem)
//!     .client_cert_pem(cert_pem)
//!     .client_key_pem(key_pem)
//!     .host("db.example.com")
//!     .port(30443)
//!     .build()?;
//!
//! let dialer = IngressDialer::new(bundle)?;
//! let conn = dialer.dial(&NodeRef::any()).await?;
//! ```

#![doc(html_root_url = "https://docs.rs/portico/0.2.0")]

mod alloc;
mod bundle;
pub mod compat;
mod config;
mod dialer;
mod metadata;
mod tls;
mod verify;

pub use alloc::ContactAllocator;
pub use bundle::{Bundle, BundleBuilder};
pub use config::DialerConfig;
pub use dialer::{DialedConnection, IngressDialer, IngressDialerBuilder, NodeDialer};
pub use metadata::MetadataResolver;
pub use verify::{AnchoredVerifier, PeerVerifier};

pub use portico_core::{
    ContactInfo, IngressMetadata, NodeRef, PorticoError, ProxyContacts, Result,
};
