// Public modules
pub mod config;
pub mod domains;
pub mod errors;

pub use config::ProcessorConfig;
pub use domains::batch::{
    BatchObserver, BatchOrchestrator, BatchResult, CancellationSignal, InputItem, ItemStatus,
    LoggingObserver, NeverCancelled, OutputItem,
};
pub use domains::compression::QualitySetting;
pub use errors::{DomainError, DomainResult, ServiceError, ServiceResult};
pub use tokio_util::sync::CancellationToken;

/// Initialize logging. Safe to call more than once.
///
/// Without `RUST_LOG` the level defaults to `debug` in debug builds and `info` otherwise.
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        #[cfg(debug_assertions)]
        std::env::set_var("RUST_LOG", "debug");
        #[cfg(not(debug_assertions))]
        std::env::set_var("RUST_LOG", "info");
    }

    let _ = env_logger::try_init();
}
