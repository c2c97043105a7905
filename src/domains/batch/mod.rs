// Declare submodules for the batch domain
pub mod types;
pub mod progress;
pub mod observer;
pub mod orchestrator;

pub use types::{
    ArchiveStats, BatchResult, InputItem, ItemReport, ItemSource, ItemState, ItemStatus, OutputItem,
};
pub use progress::ProgressAggregator;
pub use observer::{BatchObserver, CancellationSignal, LoggingObserver, NeverCancelled};
pub use orchestrator::BatchOrchestrator;
