use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative stop signal, checked between ticks. A tick is atomic; there
/// is no mid-tick cancellation.
pub trait RunControl {
    fn should_stop(&self) -> bool;
}

/// Control that never stops, for historical runs driven to data exhaustion.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopControl;

impl RunControl for NoopControl {
    fn should_stop(&self) -> bool {
        false
    }
}

impl RunControl for AtomicBool {
    fn should_stop(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}
