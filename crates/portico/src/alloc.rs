//! Round-robin assignment of backend identities.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Hands out backend identities in a fixed cyclic order.
///
/// The counter is post-incremented, so the first allocation returns the
/// first entry and every entry is covered once before any repeats. The
/// increment is a single atomic; allocation never blocks and is safe
/// under arbitrary concurrent callers.
#[derive(Debug, Default)]
pub struct ContactAllocator {
    next: AtomicUsize,
}

impl ContactAllocator {
    /// Create an allocator starting at the first entry
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicUsize::new(0),
        }
    }

    /// Next identity from the ring, or `None` when the slice is empty.
    ///
    /// Resolution guarantees a non-empty contact list before allocation
    /// is ever reached; the `None` arm exists so the invariant lives in
    /// one place instead of being assumed here.
    pub fn allocate<'a>(&self, contact_points: &'a [String]) -> Option<&'a str> {
        if contact_points.is_empty() {
            return None;
        }
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        Some(contact_points[n % contact_points.len()].as_str())
    }
}
