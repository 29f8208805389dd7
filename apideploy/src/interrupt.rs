use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use thiserror::Error;

/// A flag shared between the process's Ctrl-C handler and a running batch.
///
/// The batch checks it between changes, so a request that is already in flight
/// is allowed to complete.
#[derive(Clone, Debug, Default)]
pub struct InterruptState {
    interrupted: Arc<AtomicBool>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("interrupted before the change was sent")]
pub struct InterruptedError {}

impl InterruptState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_interrupted(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    pub fn check_interrupted(&self) -> Result<(), InterruptedError> {
        if self.is_interrupted() {
            Err(InterruptedError {})
        } else {
            Ok(())
        }
    }
}

pub fn set_up_process_interrupt_handler() -> anyhow::Result<InterruptState> {
    let interrupt_state = InterruptState::new();
    let handler_state = interrupt_state.clone();
    ctrlc::set_handler(move || {
        handler_state.set_interrupted();
    })
    .map_err(|e| anyhow::anyhow!("error setting interrupt handler: {}", e))?;
    Ok(interrupt_state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let state = InterruptState::new();
        let other = state.clone();
        assert_eq!(state.check_interrupted(), Ok(()));
        other.set_interrupted();
        assert!(state.is_interrupted());
        assert_eq!(state.check_interrupted(), Err(InterruptedError {}));
    }
}
