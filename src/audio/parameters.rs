// Atomic parameters - Lock-free scalars shared between control and voice threads

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Thread-safe f32 stored as its bit pattern
///
/// Clones share the same value, so one side can hand a clone to a playback thread
/// and keep writing to its own copy.
#[derive(Clone)]
pub struct AtomicF32 {
    inner: Arc<AtomicU32>,
}

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self {
            inner: Arc::new(AtomicU32::new(value.to_bits())),
        }
    }

    pub fn set(&self, value: f32) {
        self.inner.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.inner.load(Ordering::Relaxed))
    }
}

impl Default for AtomicF32 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl fmt::Debug for AtomicF32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicF32").field(&self.get()).finish()
    }
}
