//! Cooperative cancellation for job workers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::{LongboxError, Result};

/// A cancellation token shared between a job worker and its controller.
///
/// Clones observe the same flag; cancelling any clone cancels all of them.
/// Workers poll the token between issues, so cancellation takes effect at the
/// next issue boundary rather than mid-write.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Check cancellation, returning [`LongboxError::Cancelled`] if requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(LongboxError::Cancelled)
        } else {
            Ok(())
        }
    }
}
