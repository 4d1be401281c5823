//! Event-chain runtime
//!
//! A generic middleware-wrapped pipeline: named events execute in
//! registration order, each wrapped by an onion of middleware layers,
//! threading a shared key/value [`Context`] between them. Failures are
//! aggregated into a [`ChainResult`] under a configurable
//! fault-tolerance policy.
//!
//! # Example
//!
//! ```
//! use coretiny_chain::{Chain, Context, EventResult, FaultMode, FnEvent, Value};
//!
//! let mut chain = Chain::new(FaultMode::Strict);
//! chain
//!     .add_event(Box::new(FnEvent::new("Seed", |ctx: &Context| {
//!         ctx.set("greeting", Value::new(String::from("hello"))).unwrap();
//!         EventResult::success()
//!     })))
//!     .unwrap();
//!
//! let result = chain.execute();
//! assert!(result.success);
//! assert!(chain.context().has("greeting", false));
//! ```

pub mod chain;
pub mod context;
pub mod error;
pub mod event;
pub mod perf;
pub mod result;
pub mod signal;
pub mod value;

pub use chain::{Chain, FailureHandler, FaultMode, MAX_EVENTS, MAX_MIDDLEWARE};
pub use context::{Context, MAX_CONTEXT_ENTRIES, MAX_CONTEXT_MEMORY, MAX_KEY_LENGTH};
pub use error::ErrorCode;
pub use event::{ChainableEvent, FnEvent, MAX_NAME_LENGTH, Middleware, Next};
pub use perf::{PERF_COUNTER_COUNT, PerfCounter};
pub use result::{ChainResult, DetailLevel, EventResult, FailureInfo, MAX_ERROR_LENGTH};
pub use value::Value;

/// Library version string.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Initialize process-global runtime state (the perf-stats registry).
/// Idempotent; call once before the first chain executes if perf
/// counters are wanted.
pub fn initialize() {
    perf::init();
    perf::reset();
}

/// Tear down process-global runtime state. Counters are zeroed; the
/// registry itself lives until process exit.
pub fn cleanup() {
    perf::reset();
}
