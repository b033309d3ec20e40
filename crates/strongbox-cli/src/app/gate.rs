//! Presence check standing in for a platform biometric prompt.

use dialoguer::Confirm;
use strongbox_core::BiometricGate;
use tracing::debug;

/// Asks the person at the terminal to confirm before the key is released.
/// Without a TTY there is nobody to ask, so the gate denies.
#[derive(Debug, Clone, Copy)]
pub struct PresenceGate {
    interactive: bool,
}

impl PresenceGate {
    pub fn new(interactive: bool) -> Self {
        Self { interactive }
    }
}

impl BiometricGate for PresenceGate {
    fn permit(&self) -> bool {
        if !self.interactive {
            debug!("presence check denied: no terminal");
            return false;
        }
        Confirm::new()
            .with_prompt("Biometric lock is on. Confirm you are present to unlock")
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}
