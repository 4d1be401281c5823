//! Shared, type-erased context payloads
//!
//! The context stores values of arbitrary type behind one handle type.
//! Ownership is shared: cloning a handle extends the payload's lifetime
//! beyond the context entry that produced it, and the payload's own
//! `Drop` runs exactly once when the last handle goes away. There is no
//! separate cleanup callback and no way to over- or under-release.

use std::any::Any;
use std::sync::Arc;

use crate::perf::{self, PerfCounter};

/// A shared handle to a type-erased payload.
///
/// Clone to retain, drop to release. `ref_count` is advisory (it can be
/// stale the moment it is read) and exists for tests and diagnostics.
///
/// # Thread safety
///
/// Payloads must be `Send + Sync`: handles may be cloned out of the
/// context and handed to other threads, and the `Arc` count is the only
/// synchronization on the payload's lifetime.
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
}

impl Value {
    /// Wrap a payload. The new handle is the sole owner.
    pub fn new<T: Any + Send + Sync>(data: T) -> Self {
        perf::increment(PerfCounter::ValuesCreated);
        Value {
            inner: Arc::new(data),
        }
    }

    /// Borrow the payload as `T`, or `None` if the payload is a
    /// different type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Consume this handle and return the payload by value.
    ///
    /// If other handles are still alive the payload is cloned; otherwise
    /// it is moved out. `None` if the payload is not a `T`.
    pub fn take<T: Any + Send + Sync + Clone>(self) -> Option<T> {
        let typed = self.inner.downcast::<T>().ok()?;
        Some(Arc::unwrap_or_clone(typed))
    }

    /// Current number of live handles. Advisory only.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Value")
            .field("ref_count", &self.ref_count())
            .finish()
    }
}
