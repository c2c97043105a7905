//! Top-level driver for one batch of input items

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::ProcessorConfig;
use crate::domains::archive::{ArchiveScanner, EntryOutcome, ResultAssembler};
use crate::domains::compression::{
    CompressionClient, CompressionJob, Compressor, GhostscriptCompressor, JobOutcome,
};
use crate::errors::{DomainError, DomainResult};
use super::observer::{BatchObserver, CancellationSignal};
use super::progress::ProgressAggregator;
use super::types::{
    ArchiveStats, BatchResult, InputItem, ItemSource, ItemState, ItemStatus, OutputItem,
};

const ZIP_MIME_TYPE: &str = "application/zip";

/// Runs archives through scanner, compression client and assembler, one at a time.
pub struct BatchOrchestrator {
    config: ProcessorConfig,
    scanner: ArchiveScanner,
    client: CompressionClient,
    assembler: ResultAssembler,
}

/// How far one archive got
enum ArchiveRun {
    Assembled { bytes: Vec<u8>, stats: ArchiveStats },
    Skipped,
    /// Cancellation was seen before a document. Replacements already produced for
    /// this archive are dropped and the original is returned whole, so a cancelled
    /// archive is never a mix of compressed and uncompressed documents.
    Cancelled,
}

struct RunContext<'a> {
    progress: ProgressAggregator,
    observer: &'a dyn BatchObserver,
    cancel: &'a dyn CancellationSignal,
}

impl RunContext<'_> {
    fn advance(&mut self, index: usize, item: &InputItem, state: ItemState) {
        if let Some(previous) = self.progress.state(index) {
            log::debug!("{}: {} -> {}", item.name, previous, state);
        }
        if let Some(value) = self.progress.update(index, state) {
            self.observer.on_progress(value);
        }
    }
}

impl BatchOrchestrator {
    /// Orchestrator backed by the Ghostscript engine.
    pub fn new(config: ProcessorConfig) -> Self {
        let compressor = Arc::new(GhostscriptCompressor::new(config.ghostscript_path.clone()));
        Self::with_compressor(config, compressor)
    }

    pub fn with_compressor(config: ProcessorConfig, compressor: Arc<dyn Compressor>) -> Self {
        Self {
            scanner: ArchiveScanner::new(&config),
            client: CompressionClient::new(compressor),
            assembler: ResultAssembler::new(config.compression_level),
            config,
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Jobs that reached the engine over the orchestrator's lifetime.
    pub fn jobs_dispatched(&self) -> u64 {
        self.client.jobs_dispatched()
    }

    /// Process a batch. Every input yields exactly one output, in input order.
    pub async fn run(
        &mut self,
        items: &[InputItem],
        observer: &dyn BatchObserver,
        cancel: &dyn CancellationSignal,
    ) -> BatchResult {
        let run_id = Uuid::new_v4();
        log::info!("Batch {} started with {} item(s)", run_id, items.len());

        let mut ctx = RunContext {
            progress: ProgressAggregator::new(items.len()),
            observer,
            cancel,
        };
        let mut outputs: Vec<Option<OutputItem>> = items.iter().map(|_| None).collect();

        for (index, item) in items.iter().enumerate() {
            if !item.is_archive() {
                outputs[index] = Some(OutputItem::unchanged(item, ItemStatus::PassedThrough));
                ctx.advance(index, item, ItemState::PassThrough);
            }
        }

        let mut cancelled = false;
        for (index, item) in items.iter().enumerate() {
            if outputs[index].is_some() {
                continue;
            }

            if cancelled || ctx.cancel.is_cancelled() {
                cancelled = true;
                ctx.advance(index, item, ItemState::Cancelled);
                outputs[index] = Some(OutputItem::unchanged(item, ItemStatus::Cancelled));
                continue;
            }

            let output = match self.process_archive(index, item, &mut ctx).await {
                Ok(ArchiveRun::Assembled { bytes, stats }) => {
                    ctx.advance(index, item, ItemState::Done);
                    OutputItem {
                        name: format!("{}{}", self.config.output_prefix, item.name),
                        mime_type: ZIP_MIME_TYPE.to_string(),
                        source: ItemSource::Memory(Arc::new(bytes)),
                        status: ItemStatus::Compressed,
                        error: None,
                        stats: Some(stats),
                    }
                }
                Ok(ArchiveRun::Skipped) => {
                    ctx.advance(index, item, ItemState::Done);
                    OutputItem::unchanged(item, ItemStatus::Skipped)
                }
                Ok(ArchiveRun::Cancelled) => {
                    cancelled = true;
                    ctx.advance(index, item, ItemState::Cancelled);
                    OutputItem::unchanged(item, ItemStatus::Cancelled)
                }
                Err(error) => {
                    let (state, status) = match error {
                        DomainError::InvalidArchive { .. } => (ItemState::Invalid, ItemStatus::Invalid),
                        _ => {
                            log::error!("Failed to process archive {}: {}", item.name, error);
                            (ItemState::Failed, ItemStatus::Failed)
                        }
                    };
                    ctx.observer.on_error(&error, item);
                    ctx.advance(index, item, state);
                    OutputItem::unchanged(item, status).with_error(error)
                }
            };
            outputs[index] = Some(output);
        }

        if let Some(value) = ctx.progress.flush() {
            observer.on_progress(value);
        }

        let items: Vec<OutputItem> = outputs.into_iter().flatten().collect();
        log::info!(
            "Batch {} finished: {} item(s){}",
            run_id,
            items.len(),
            if cancelled { ", cancelled" } else { "" }
        );
        observer.on_complete(&items);

        BatchResult {
            run_id,
            items,
            cancelled,
        }
    }

    async fn process_archive(
        &mut self,
        index: usize,
        item: &InputItem,
        ctx: &mut RunContext<'_>,
    ) -> DomainResult<ArchiveRun> {
        let started_at = Utc::now();
        log::info!("Processing archive {} ({} bytes)", item.name, item.size);

        if item.size > self.config.max_input_bytes {
            return Err(DomainError::Archive(format!(
                "Archive too large for in-memory processing: {} bytes > {} bytes",
                item.size, self.config.max_input_bytes
            )));
        }

        let bytes = item.read_bytes().await?;
        let opened = self.scanner.open(bytes).await?;
        ctx.advance(index, item, ItemState::Opened);

        let archive = self.scanner.validate(opened)?;
        ctx.advance(index, item, ItemState::Validated);

        if self.config.skip_compression {
            log::info!("Validated {} ({} entries), compression skipped", item.name, archive.len());
            return Ok(ArchiveRun::Skipped);
        }

        let mut stats = ArchiveStats::new(archive.size_bytes(), started_at);
        stats.entries = archive.len();

        let total = self.scanner.count_documents(&archive);
        stats.documents_found = total;
        ctx.advance(index, item, ItemState::Counted { documents: total });

        let quality = self.config.quality;
        let mut outcomes = Vec::with_capacity(archive.len());
        let mut done = 0;

        for entry in archive.entries() {
            if !entry.is_document() {
                outcomes.push(EntryOutcome::Unchanged);
                continue;
            }

            if ctx.cancel.is_cancelled() {
                log::info!(
                    "Cancellation requested, abandoning {} after {}/{} documents",
                    item.name,
                    done,
                    total
                );
                return Ok(ArchiveRun::Cancelled);
            }

            let job = CompressionJob::for_entry(&entry.path, entry.data.clone(), quality);
            let outcome = match self.client.process(job).await {
                JobOutcome::Compressed(data) => {
                    stats.documents_compressed += 1;
                    EntryOutcome::Replaced(data)
                }
                JobOutcome::Skipped { reason, .. } => {
                    log::debug!("{} in {} left as is ({:?})", entry.path, item.name, reason);
                    stats.documents_skipped += 1;
                    EntryOutcome::Unchanged
                }
                JobOutcome::Failed { error, .. } => {
                    log::debug!("Keeping original {} in {}: {}", entry.path, item.name, error);
                    stats.documents_failed += 1;
                    EntryOutcome::Unchanged
                }
            };
            outcomes.push(outcome);

            done += 1;
            ctx.advance(index, item, ItemState::Compressing { done, total });
        }

        ctx.advance(index, item, ItemState::Assembling);
        let output = self.assembler.assemble(archive, outcomes).await?;
        stats.finish(output.len());

        log::info!(
            "Archive {} done: {} -> {} bytes, {}/{} documents compressed, {} failed",
            item.name,
            stats.original_size,
            stats.output_size,
            stats.documents_compressed,
            stats.documents_found,
            stats.documents_failed
        );

        Ok(ArchiveRun::Assembled { bytes: output, stats })
    }

    /// Compress one standalone document.
    ///
    /// Files the engine does not take come back as `Skipped`. Engine failures
    /// fall back to the original bytes with status `Failed`; only an unreadable
    /// input is returned as an error.
    pub async fn compress_document(&mut self, item: &InputItem) -> DomainResult<OutputItem> {
        let started_at = Utc::now();
        if !self.client.accepts(&item.mime_type, &item.name) {
            log::debug!("{} ({}) is not a document the engine takes", item.name, item.mime_type);
            return Ok(OutputItem::unchanged(item, ItemStatus::Skipped));
        }

        let data = item.read_bytes().await?;
        let job = CompressionJob::for_entry(&item.name, data.as_ref().clone(), self.config.quality);

        let output = match self.client.process(job).await {
            JobOutcome::Compressed(bytes) => {
                let mut stats = ArchiveStats::new(data.len(), started_at);
                stats.entries = 1;
                stats.documents_found = 1;
                stats.documents_compressed = 1;
                stats.finish(bytes.len());

                OutputItem {
                    name: format!("{}{}", self.config.output_prefix, item.name),
                    mime_type: item.mime_type.clone(),
                    source: ItemSource::Memory(Arc::new(bytes)),
                    status: ItemStatus::Compressed,
                    error: None,
                    stats: Some(stats),
                }
            }
            JobOutcome::Skipped { reason, .. } => {
                log::debug!("{} left as is ({:?})", item.name, reason);
                OutputItem::unchanged(item, ItemStatus::Skipped)
            }
            JobOutcome::Failed { error, .. } => {
                log::warn!("Compression failed for {}, returning original: {}", item.name, error);
                OutputItem::unchanged(item, ItemStatus::Failed).with_error(error)
            }
        };

        Ok(output)
    }
}
