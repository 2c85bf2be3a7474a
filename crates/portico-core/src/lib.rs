//! Core types and errors for the portico SNI ingress dialer.
//!
//! This crate provides the foundational types used across the portico
//! library:
//!
//! - **Types**: the metadata wire schema, resolved proxy coordinates, and
//!   dial request descriptors
//! - **Errors**: comprehensive error handling with [`PorticoError`]
//!
//! # Example
//!
//! ```rust,ignore
//! use portico_core::{NodeRef, ProxyContacts, Result};
//!
//! fn next_request(contacts: &ProxyContacts) -> Result<NodeRef> {
//!     println!("ingress: {}", contacts.sni_proxy_address);
//!     Ok(NodeRef::any())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/portico-core/0.2.0")]

mod error;
pub mod types;

pub use error::{PorticoError, Result};
pub use types::*;
