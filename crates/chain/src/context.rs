//! Shared key/value context
//!
//! The context is the only communication channel between events: each
//! phase reads one key and writes the next. Entries keep insertion
//! order, keys are unique, and the store is bounded both by entry count
//! and by accounted memory. A single mutex guards the entry table and
//! the memory counter; every operation holds it for its full duration.

use std::sync::Mutex;

use subtle::{Choice, ConstantTimeEq};
use tracing::trace;

use crate::error::ErrorCode;
use crate::perf::{self, PerfCounter};
use crate::value::Value;

/// Maximum number of context entries.
pub const MAX_CONTEXT_ENTRIES: usize = 512;

/// Maximum accounted context memory in bytes (10 MiB).
pub const MAX_CONTEXT_MEMORY: usize = 10_485_760;

/// Maximum length of a context key in bytes.
pub const MAX_KEY_LENGTH: usize = 256;

struct Entry {
    key: String,
    value: Value,
}

struct Entries {
    items: Vec<Entry>,
    total_memory_bytes: usize,
}

/// Insertion-ordered, mutex-guarded, memory-capped key/value store.
pub struct Context {
    inner: Mutex<Entries>,
}

/// Fixed overhead accounted for the context itself; the memory counter
/// resets to this baseline on [`Context::clear`].
fn baseline() -> usize {
    std::mem::size_of::<Context>()
}

/// Accounted overhead of one entry: key bytes (plus terminator, to keep
/// the accounting identical across ports) and the entry structure.
fn entry_overhead(key: &str) -> usize {
    key.len() + 1 + std::mem::size_of::<Entry>()
}

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Context {
            inner: Mutex::new(Entries {
                items: Vec::with_capacity(8),
                total_memory_bytes: baseline(),
            }),
        }
    }

    /// Install `value` under `key`, replacing any existing value.
    ///
    /// Cap checks happen before any side effect: an over-long (or empty)
    /// key, a full entry table, or an insertion that would exceed the
    /// memory cap leaves the context untouched.
    pub fn set(&self, key: &str, value: Value) -> Result<(), ErrorCode> {
        if key.is_empty() || key.len() > MAX_KEY_LENGTH {
            return Err(ErrorCode::KeyTooLong);
        }

        let mut inner = self.inner.lock().unwrap();

        let additional = entry_overhead(key);
        if inner.total_memory_bytes + additional > MAX_CONTEXT_MEMORY {
            return Err(ErrorCode::MemoryLimitExceeded);
        }

        if let Some(entry) = inner.items.iter_mut().find(|e| e.key == key) {
            // Replacement: the old value is released here; accounting is
            // unchanged because the key bytes stay the same.
            entry.value = value;
        } else {
            if inner.items.len() >= MAX_CONTEXT_ENTRIES {
                return Err(ErrorCode::CapacityExceeded);
            }
            inner.items.push(Entry {
                key: key.to_string(),
                value,
            });
            inner.total_memory_bytes += additional;
        }

        trace!(key, "context set");
        perf::increment(PerfCounter::ContextSets);
        Ok(())
    }

    /// Retrieve a retained handle to the value under `key`.
    ///
    /// The returned handle keeps the payload alive independently of the
    /// entry; dropping it releases that reference.
    pub fn get(&self, key: &str) -> Result<Value, ErrorCode> {
        let inner = self.inner.lock().unwrap();
        let entry = inner
            .items
            .iter()
            .find(|e| e.key == key)
            .ok_or(ErrorCode::NotFound)?;
        perf::increment(PerfCounter::ContextGets);
        Ok(entry.value.clone())
    }

    /// Borrow the value under `key` without retaining it.
    ///
    /// The closure runs under the context lock, so the borrow is valid
    /// exactly as long as the entry is guaranteed to live.
    pub fn with<R>(&self, key: &str, f: impl FnOnce(&Value) -> R) -> Result<R, ErrorCode> {
        let inner = self.inner.lock().unwrap();
        let entry = inner
            .items
            .iter()
            .find(|e| e.key == key)
            .ok_or(ErrorCode::NotFound)?;
        perf::increment(PerfCounter::ContextGets);
        Ok(f(&entry.value))
    }

    /// Check whether `key` exists.
    ///
    /// With `constant_time` the walk visits every entry even after a
    /// match and compares key bytes with a constant-time primitive.
    /// Unequal key lengths still return early inside the comparison, so
    /// key lengths are observable; key contents are not.
    pub fn has(&self, key: &str, constant_time: bool) -> bool {
        let inner = self.inner.lock().unwrap();
        if constant_time {
            let mut found = Choice::from(0u8);
            for entry in &inner.items {
                found |= entry.key.as_bytes().ct_eq(key.as_bytes());
            }
            bool::from(found)
        } else {
            inner.items.iter().any(|e| e.key == key)
        }
    }

    /// Remove the entry under `key`, releasing its value.
    ///
    /// Later entries shift left so insertion order is preserved.
    pub fn remove(&self, key: &str) -> Result<(), ErrorCode> {
        let mut inner = self.inner.lock().unwrap();
        let idx = inner
            .items
            .iter()
            .position(|e| e.key == key)
            .ok_or(ErrorCode::NotFound)?;
        let entry = inner.items.remove(idx);
        inner.total_memory_bytes = inner
            .total_memory_bytes
            .saturating_sub(entry_overhead(&entry.key));
        trace!(key, "context remove");
        perf::increment(PerfCounter::ContextRemoves);
        Ok(())
    }

    /// Number of live entries.
    pub fn count(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    /// Accounted memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        self.inner.lock().unwrap().total_memory_bytes
    }

    /// Release every entry and reset the memory counter to the baseline.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.items.clear();
        inner.total_memory_bytes = baseline();
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct DropProbe(Arc<AtomicUsize>);

    impl Drop for DropProbe {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_set_get_roundtrip() {
        let ctx = Context::new();
        ctx.set("source_code", Value::new(String::from("func main")))
            .unwrap();

        let value = ctx.get("source_code").unwrap();
        assert_eq!(value.downcast_ref::<String>().unwrap(), "func main");
        assert_eq!(ctx.count(), 1);
    }

    #[test]
    fn test_get_missing_key() {
        let ctx = Context::new();
        assert_eq!(ctx.get("nothing").unwrap_err(), ErrorCode::NotFound);
    }

    #[test]
    fn test_replace_releases_old_value_once() {
        let drops = Arc::new(AtomicUsize::new(0));
        let ctx = Context::new();

        ctx.set("k", Value::new(DropProbe(drops.clone()))).unwrap();
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        ctx.set("k", Value::new(String::from("replacement"))).unwrap();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.count(), 1);
    }

    #[test]
    fn test_key_too_long() {
        let ctx = Context::new();
        let long_key = "k".repeat(MAX_KEY_LENGTH + 1);
        assert_eq!(
            ctx.set(&long_key, Value::new(0i64)).unwrap_err(),
            ErrorCode::KeyTooLong
        );
        assert_eq!(
            ctx.set("", Value::new(0i64)).unwrap_err(),
            ErrorCode::KeyTooLong
        );
    }

    #[test]
    fn test_entry_cap() {
        let ctx = Context::new();
        for i in 0..MAX_CONTEXT_ENTRIES {
            ctx.set(&format!("key{i}"), Value::new(i)).unwrap();
        }
        assert_eq!(
            ctx.set("one-too-many", Value::new(0i64)).unwrap_err(),
            ErrorCode::CapacityExceeded
        );
        // Prior entries are intact.
        assert_eq!(ctx.count(), MAX_CONTEXT_ENTRIES);
        assert!(ctx.has("key0", false));
    }

    #[test]
    fn test_remove_preserves_order() {
        let ctx = Context::new();
        ctx.set("a", Value::new(1i64)).unwrap();
        ctx.set("b", Value::new(2i64)).unwrap();
        ctx.set("c", Value::new(3i64)).unwrap();

        ctx.remove("b").unwrap();
        assert_eq!(ctx.count(), 2);
        assert!(ctx.has("a", false));
        assert!(!ctx.has("b", false));
        assert!(ctx.has("c", false));

        assert_eq!(ctx.remove("b").unwrap_err(), ErrorCode::NotFound);
    }

    #[test]
    fn test_memory_accounting() {
        let ctx = Context::new();
        let base = ctx.memory_usage();

        ctx.set("alpha", Value::new(1i64)).unwrap();
        ctx.set("beta", Value::new(2i64)).unwrap();
        let expected = base + entry_overhead("alpha") + entry_overhead("beta");
        assert_eq!(ctx.memory_usage(), expected);

        ctx.remove("alpha").unwrap();
        assert_eq!(ctx.memory_usage(), base + entry_overhead("beta"));

        ctx.clear();
        assert_eq!(ctx.memory_usage(), base);
        assert_eq!(ctx.count(), 0);
    }

    #[test]
    fn test_replace_does_not_grow_accounting() {
        let ctx = Context::new();
        ctx.set("k", Value::new(1i64)).unwrap();
        let usage = ctx.memory_usage();
        ctx.set("k", Value::new(2i64)).unwrap();
        assert_eq!(ctx.memory_usage(), usage);
    }

    #[test]
    fn test_has_both_modes() {
        let ctx = Context::new();
        ctx.set("present", Value::new(0i64)).unwrap();

        assert!(ctx.has("present", false));
        assert!(ctx.has("present", true));
        assert!(!ctx.has("absent", false));
        assert!(!ctx.has("absent", true));
    }

    #[test]
    fn test_value_outlives_entry_when_retained() {
        let drops = Arc::new(AtomicUsize::new(0));
        let ctx = Context::new();
        ctx.set("k", Value::new(DropProbe(drops.clone()))).unwrap();

        let retained = ctx.get("k").unwrap();
        ctx.remove("k").unwrap();
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        drop(retained);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
