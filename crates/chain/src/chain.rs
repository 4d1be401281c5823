//! Chain assembly and execution
//!
//! A chain owns its events, its middleware stack, and its context.
//! Registration happens once, before the first execution, through
//! `&mut self` methods; execution takes `&self` so a chain can be shared
//! (for example behind an `Arc`) once it is fully assembled. Events run
//! strictly in registration order on a single call stack.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::context::Context;
use crate::error::ErrorCode;
use crate::event::{ChainableEvent, Middleware, Next};
use crate::perf::{self, PerfCounter};
use crate::result::{ChainResult, DetailLevel, EventResult, FailureInfo};

/// Maximum number of events per chain.
pub const MAX_EVENTS: usize = 1024;

/// Maximum number of middleware layers per chain.
pub const MAX_MIDDLEWARE: usize = 16;

/// Policy deciding whether execution continues after an event fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultMode {
    /// Stop on the first failure.
    #[default]
    Strict,
    /// Record failures and keep going.
    Lenient,
    /// Same continuation behavior as `Lenient`; a separate policy so
    /// hosts can distinguish "review later" from "fire and forget".
    BestEffort,
    /// Ask the registered failure handler; stop if none is registered.
    Custom,
}

/// Handler consulted in [`FaultMode::Custom`]; returns whether execution
/// should continue past the failed event.
pub type FailureHandler = dyn Fn(&dyn ChainableEvent, &EventResult) -> bool + Send + Sync;

/// A pipeline of events wrapped by middleware, with one shared context.
pub struct Chain {
    events: Vec<Box<dyn ChainableEvent>>,
    middlewares: Vec<Box<dyn Middleware>>,
    context: Context,
    fault_mode: FaultMode,
    detail_level: DetailLevel,
    failure_handler: Option<Box<FailureHandler>>,
    is_executing: AtomicBool,
    signal_interrupted: Arc<AtomicBool>,
}

impl Chain {
    /// Create an empty chain with full error detail.
    pub fn new(fault_mode: FaultMode) -> Self {
        Self::with_detail(fault_mode, DetailLevel::Full)
    }

    /// Create an empty chain with an explicit error detail level.
    pub fn with_detail(fault_mode: FaultMode, detail_level: DetailLevel) -> Self {
        Chain {
            events: Vec::new(),
            middlewares: Vec::new(),
            context: Context::new(),
            fault_mode,
            detail_level,
            failure_handler: None,
            is_executing: AtomicBool::new(false),
            signal_interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Append an event. Events execute in registration order.
    pub fn add_event(&mut self, event: Box<dyn ChainableEvent>) -> Result<(), ErrorCode> {
        if self.events.len() >= MAX_EVENTS {
            return Err(ErrorCode::CapacityExceeded);
        }
        self.events.push(event);
        Ok(())
    }

    /// Append a middleware layer.
    ///
    /// The first-registered middleware is the outermost layer: it runs
    /// first and sees every later layer and the event wrapped inside its
    /// continuation.
    pub fn use_middleware(&mut self, middleware: Box<dyn Middleware>) -> Result<(), ErrorCode> {
        if self.middlewares.len() >= MAX_MIDDLEWARE {
            return Err(ErrorCode::CapacityExceeded);
        }
        self.middlewares.push(middleware);
        Ok(())
    }

    /// Install the handler consulted in [`FaultMode::Custom`].
    pub fn set_failure_handler(
        &mut self,
        handler: impl Fn(&dyn ChainableEvent, &EventResult) -> bool + Send + Sync + 'static,
    ) {
        self.failure_handler = Some(Box::new(handler));
    }

    /// The chain's shared context.
    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn fault_mode(&self) -> FaultMode {
        self.fault_mode
    }

    pub fn detail_level(&self) -> DetailLevel {
        self.detail_level
    }

    /// Flag a host may set from a signal handler. The runtime never
    /// polls it; middleware that cares reads [`was_interrupted`]
    /// (or the flag directly) and short-circuits.
    ///
    /// [`was_interrupted`]: Self::was_interrupted
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.signal_interrupted.clone()
    }

    pub fn was_interrupted(&self) -> bool {
        self.signal_interrupted.load(Ordering::SeqCst)
    }

    /// Execute every event in order, each wrapped by the middleware
    /// onion, applying the fault-tolerance policy to failures.
    ///
    /// Re-entrant calls (a middleware or event invoking `execute` on the
    /// chain that is running it) return immediately with
    /// `success: false` and no recorded failures; the outer execution is
    /// unaffected.
    pub fn execute(&self) -> ChainResult {
        if self
            .is_executing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return ChainResult {
                success: false,
                failures: Vec::new(),
            };
        }

        perf::increment(PerfCounter::ChainsExecuted);

        let mut result = ChainResult {
            success: true,
            failures: Vec::new(),
        };

        for event in &self.events {
            debug!(event = event.name(), "executing event");
            perf::increment(PerfCounter::EventsExecuted);

            let event_result = Next::new(&self.middlewares, event.as_ref()).run(&self.context);

            if event_result.is_failure() {
                perf::increment(PerfCounter::EventFailures);
                warn!(
                    event = event.name(),
                    code = event_result.error_code.code(),
                    message = %event_result.error_message,
                    "event failed"
                );

                let should_continue = match self.fault_mode {
                    FaultMode::Strict => false,
                    FaultMode::Lenient | FaultMode::BestEffort => true,
                    FaultMode::Custom => match &self.failure_handler {
                        Some(handler) => handler(event.as_ref(), &event_result),
                        None => false,
                    },
                };

                let error_message = match self.detail_level {
                    DetailLevel::Full => event_result.error_message,
                    DetailLevel::Minimal => {
                        format!("Error code: {}", event_result.error_code.code())
                    }
                };
                result.failures.push(FailureInfo {
                    event_name: event.name().to_string(),
                    error_message,
                    error_code: event_result.error_code,
                });

                if !should_continue {
                    result.success = false;
                    break;
                }
            }
        }

        self.is_executing.store(false, Ordering::Release);

        if !result.failures.is_empty() && self.fault_mode == FaultMode::Strict {
            result.success = false;
        }

        result
    }
}
