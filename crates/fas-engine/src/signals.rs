//! SIGINT / SIGTERM handling for the supervisor.
//!
//! The handlers are installed without `SA_RESTART`, so a signal arriving
//! while the supervisor is blocked in a semaphore wait makes that wait
//! return early. The drain loop then sees the stop flag on its next
//! iteration. Generators install no handlers.

use std::ffi::c_int;
use std::sync::atomic::{AtomicBool, Ordering};

use nix::errno::Errno;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn request_stop(_: c_int) {
    STOP_REQUESTED.store(true, Ordering::SeqCst);
}

/// Install the stop handler for SIGINT and SIGTERM and return the flag it
/// sets.
#[allow(unsafe_code)]
pub fn install_stop_handlers() -> Result<&'static AtomicBool, Errno> {
    let action = SigAction::new(
        SigHandler::Handler(request_stop),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for sig in [Signal::SIGINT, Signal::SIGTERM] {
        // SAFETY: the handler only stores to an atomic, which is
        // async-signal-safe.
        unsafe {
            signal::sigaction(sig, &action)?;
        }
    }
    tracing::debug!("stop handlers installed for SIGINT and SIGTERM");
    Ok(&STOP_REQUESTED)
}
