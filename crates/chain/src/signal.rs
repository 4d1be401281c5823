//! Signal wiring for the chain interrupt flag
//!
//! The runtime never installs handlers on its own and never polls the
//! flag; this module only connects a Unix signal to a chain's
//! `signal_interrupted` flag. The handler is async-signal-safe: it does
//! nothing but set an atomic flag. Middleware that wants cooperative
//! cancellation reads the flag and short-circuits with a failure.

#![cfg(unix)]

use std::io;

use signal_hook::SigId;

use crate::chain::Chain;

/// Arrange for `signal` (e.g. `signal_hook::consts::SIGINT`) to set the
/// chain's interrupt flag.
///
/// The registration lives for the rest of the process; the returned
/// [`SigId`] can be passed to `signal_hook::low_level::unregister` to
/// undo it.
pub fn register_interrupt(signal: i32, chain: &Chain) -> io::Result<SigId> {
    signal_hook::flag::register(signal, chain.interrupt_flag())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::FaultMode;

    #[test]
    fn test_register_and_raise() {
        let chain = Chain::new(FaultMode::Strict);
        let id = register_interrupt(signal_hook::consts::SIGUSR1, &chain).unwrap();
        assert!(!chain.was_interrupted());

        signal_hook::low_level::raise(signal_hook::consts::SIGUSR1).unwrap();
        assert!(chain.was_interrupted());

        signal_hook::low_level::unregister(id);
    }
}
