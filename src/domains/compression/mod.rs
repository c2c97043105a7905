// Declare submodules for the compression domain
pub mod types;
pub mod compressors;
pub mod worker;
pub mod client;

pub use types::{CompressionJob, JobOutcome, QualitySetting, SkipReason};
pub use compressors::Compressor;
pub use compressors::pdf_compressor::GhostscriptCompressor;
pub use worker::{EngineHandle, EngineMessage};
pub use client::CompressionClient;
