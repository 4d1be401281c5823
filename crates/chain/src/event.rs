//! Events and middleware
//!
//! An event is one named phase of a chain. Middleware wraps every event
//! uniformly, onion style: the first-registered middleware is the
//! outermost layer. Each layer receives a [`Next`] continuation; calling
//! it runs the rest of the onion and finally the event itself, skipping
//! it short-circuits the event entirely. `Next` is consumed by value, so
//! a layer cannot invoke its continuation twice.

use crate::context::Context;
use crate::perf::{self, PerfCounter};
use crate::result::EventResult;

/// Maximum length of an event or middleware name in bytes; longer names
/// are truncated at construction.
pub const MAX_NAME_LENGTH: usize = 256;

/// Clamp a name to [`MAX_NAME_LENGTH`] bytes on a char boundary.
pub(crate) fn clamp_name(name: &str) -> String {
    if name.len() <= MAX_NAME_LENGTH {
        return name.to_string();
    }
    let mut end = MAX_NAME_LENGTH;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].to_string()
}

/// A single named phase in a chain.
///
/// Events read and write the shared context; the context is the only
/// channel between phases. State an event needs beyond the context is
/// captured in the implementing type itself.
pub trait ChainableEvent: Send + Sync {
    fn name(&self) -> &str;
    fn execute(&self, context: &Context) -> EventResult;
}

/// Adapter turning a closure into a [`ChainableEvent`].
pub struct FnEvent<F> {
    name: String,
    f: F,
}

impl<F> FnEvent<F>
where
    F: Fn(&Context) -> EventResult + Send + Sync,
{
    pub fn new(name: &str, f: F) -> Self {
        FnEvent {
            name: clamp_name(name),
            f,
        }
    }
}

impl<F> ChainableEvent for FnEvent<F>
where
    F: Fn(&Context) -> EventResult + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, context: &Context) -> EventResult {
        (self.f)(context)
    }
}

/// A wrapper layer around every event of a chain.
///
/// A middleware may inspect or mutate the context before calling `next`,
/// transform the result `next` returns (success into failure or the
/// reverse), or skip `next` and synthesize a result of its own. The
/// runtime records whatever result comes back without second-guessing it.
pub trait Middleware: Send + Sync {
    fn name(&self) -> &str;
    fn handle(&self, event: &dyn ChainableEvent, context: &Context, next: Next<'_>) -> EventResult;
}

/// Continuation for the remaining middleware layers and the event.
///
/// Consumed by [`run`](Next::run); dropping it without calling leaves
/// the event unexecuted.
pub struct Next<'a> {
    remaining: &'a [Box<dyn Middleware>],
    event: &'a dyn ChainableEvent,
}

impl<'a> Next<'a> {
    pub(crate) fn new(remaining: &'a [Box<dyn Middleware>], event: &'a dyn ChainableEvent) -> Self {
        Next { remaining, event }
    }

    /// Run the rest of the pipeline and return its result.
    pub fn run(self, context: &Context) -> EventResult {
        match self.remaining.split_first() {
            None => self.event.execute(context),
            Some((layer, rest)) => {
                perf::increment(PerfCounter::MiddlewareInvocations);
                layer.handle(self.event, context, Next::new(rest, self.event))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_event_executes() {
        let event = FnEvent::new("Probe", |_ctx: &Context| EventResult::success());
        assert_eq!(event.name(), "Probe");
        let ctx = Context::new();
        assert!(event.execute(&ctx).success);
    }

    #[test]
    fn test_name_truncation() {
        let long = "n".repeat(MAX_NAME_LENGTH * 2);
        let event = FnEvent::new(&long, |_ctx: &Context| EventResult::success());
        assert_eq!(event.name().len(), MAX_NAME_LENGTH);
    }
}
