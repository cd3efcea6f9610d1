//! Cooperative shutdown flag shared by the capture loop and the voice worker

use parking_lot::RwLock;
use std::sync::Arc;

/// Cloneable stop flag; once triggered it stays triggered
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    stopped: Arc<RwLock<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        *self.stopped.write() = true;
    }

    pub fn is_triggered(&self) -> bool {
        *self.stopped.read()
    }
}
