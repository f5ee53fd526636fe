//! Kernel object identifiers.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Kernel-wide object identifier.
///
/// Assigned once per object (endpoint pair side, session) and stable for
/// the object's lifetime. Clones of a shared reference keep the ID of the
/// object they reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process-wide ID counter. IDs start at 1; 0 is never assigned.
static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Assign the next kernel-wide object ID.
pub(crate) fn next_object_id() -> ObjectId {
    ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
}
