//! Callbacks out of a batch run and the cancellation signal into it

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::errors::DomainError;
use super::types::{InputItem, OutputItem};

/// Receives progress, per-item errors and the final result of a batch run.
///
/// Callbacks are invoked from the orchestrator's task and must not block.
pub trait BatchObserver: Send + Sync {
    /// Overall progress in `[0, 1]`, non-decreasing within a run
    fn on_progress(&self, fraction: f64);

    /// An item was rejected or could not be processed; it is still part of the result
    fn on_error(&self, error: &DomainError, item: &InputItem);

    /// Fired exactly once per run
    fn on_complete(&self, items: &[OutputItem]);
}

/// Observer that only writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl BatchObserver for LoggingObserver {
    fn on_progress(&self, fraction: f64) {
        log::info!("Batch progress: {:.0}%", fraction * 100.0);
    }

    fn on_error(&self, error: &DomainError, item: &InputItem) {
        log::error!("{}: {}", item.name, error);
    }

    fn on_complete(&self, items: &[OutputItem]) {
        log::info!("Batch complete: {} item(s)", items.len());
    }
}

/// Polled between archives and between documents
pub trait CancellationSignal: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

impl CancellationSignal for CancellationToken {
    fn is_cancelled(&self) -> bool {
        CancellationToken::is_cancelled(self)
    }
}

impl CancellationSignal for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::SeqCst)
    }
}

impl<T: CancellationSignal + ?Sized> CancellationSignal for Arc<T> {
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}

/// A signal that never fires
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverCancelled;

impl CancellationSignal for NeverCancelled {
    fn is_cancelled(&self) -> bool {
        false
    }
}
