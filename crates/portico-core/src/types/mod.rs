//! Data types shared across the portico crates.

mod metadata;
mod node;

pub use metadata::{ContactInfo, IngressMetadata, ProxyContacts};
pub use node::NodeRef;
