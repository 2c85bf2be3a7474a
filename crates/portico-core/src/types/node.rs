//! Dial request descriptor.

/// Reference to the logical node a connection is requested for.
///
/// A driver that already knows which backend it wants (reconnecting to a
/// previously discovered host, for example) sets `host_id`; the dialer
/// then uses exactly that identity as SNI and skips allocation. A request
/// without a `host_id` is assigned the next identity from the contact ring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeRef {
    /// Backend identity to dial, when already known
    pub host_id: Option<String>,
}

impl NodeRef {
    /// A request for any backend; the dialer picks the identity.
    #[must_use]
    pub const fn any() -> Self {
        Self { host_id: None }
    }

    /// A request pinned to a specific backend identity.
    #[must_use]
    pub fn with_host_id(host_id: impl Into<String>) -> Self {
        Self {
            host_id: Some(host_id.into()),
        }
    }
}
