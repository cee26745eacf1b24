//! Install event emitter port.
//!
//! Lets the install manager emit events without coupling to how they are
//! delivered (in-process hub, channel, GUI bridge).

use crate::events::InstallEvent;

/// Port for emitting install events.
///
/// `emit` is called after the manager has released its state lock. It should
/// not block for long.
pub trait InstallEventEmitterPort: Send + Sync {
    /// Emit an install event.
    fn emit(&self, event: InstallEvent);
}
