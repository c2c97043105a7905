//! One compression round trip per document against the engine boundary

use std::sync::Arc;
use std::time::Instant;

use crate::errors::{DomainError, DomainResult};
use super::compressors::{get_extension, Compressor};
use super::types::{CompressionJob, JobOutcome, SkipReason};
use super::worker::EngineHandle;

/// Drives the engine one job at a time.
///
/// Calls take `&mut self`, so a client can never have two jobs outstanding.
pub struct CompressionClient {
    compressor: Arc<dyn Compressor>,
    jobs_dispatched: u64,
}

impl CompressionClient {
    pub fn new(compressor: Arc<dyn Compressor>) -> Self {
        Self {
            compressor,
            jobs_dispatched: 0,
        }
    }

    /// Number of jobs that actually reached the engine.
    pub fn jobs_dispatched(&self) -> u64 {
        self.jobs_dispatched
    }

    /// Whether the engine takes a standalone file with this MIME type and name.
    pub fn accepts(&self, mime_type: &str, filename: &str) -> bool {
        self.compressor.can_handle(mime_type, get_extension(filename))
    }

    /// Content sniff against the engine's document signature.
    pub fn matches_signature(&self, data: &[u8]) -> bool {
        let signature = self.compressor.signature();
        data.len() >= signature.len() && data.starts_with(signature)
    }

    /// Raw round trip: acquire a fresh engine context, run the job, release the context.
    ///
    /// The context is released on both success and failure before this returns.
    pub async fn compress(&mut self, job: CompressionJob) -> DomainResult<Vec<u8>> {
        let basename = job.basename.clone();
        let mut engine = EngineHandle::acquire(self.compressor.clone())?;
        self.jobs_dispatched += 1;
        log::debug!("Dispatching {} to engine worker {}", basename, engine.id());

        let result = engine.submit(job).await;

        if let Err(e) = engine.release().await {
            log::warn!("Engine context for {} was not released cleanly: {}", basename, e);
        }

        match result {
            Ok(compressed) if compressed.is_empty() => Err(DomainError::Compression(format!(
                "Engine returned an empty document for {}",
                basename
            ))),
            other => other,
        }
    }

    /// Process one document: bypass for quality `none`, skip documents whose
    /// content does not match the signature, and fall back to the original
    /// bytes when the engine fails.
    pub async fn process(&mut self, job: CompressionJob) -> JobOutcome {
        if job.quality.bypasses_engine() {
            return JobOutcome::Skipped {
                data: job.data,
                reason: SkipReason::QualityNone,
            };
        }

        if !self.matches_signature(&job.data) {
            log::debug!("{} does not look like a document, passing through", job.basename);
            return JobOutcome::Skipped {
                data: job.data,
                reason: SkipReason::SignatureMismatch,
            };
        }

        let original = job.data.clone();
        let basename = job.basename.clone();
        let start = Instant::now();

        match self.compress(job).await {
            Ok(compressed) => {
                log::debug!(
                    "Compressed {}: {} bytes -> {} bytes in {}ms",
                    basename,
                    original.len(),
                    compressed.len(),
                    start.elapsed().as_millis()
                );
                JobOutcome::Compressed(compressed)
            }
            Err(error) => {
                log::debug!("Compression failed for {}, keeping original: {}", basename, error);
                JobOutcome::Failed { data: original, error }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use crate::domains::compression::types::QualitySetting;

    struct Shrinker {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Compressor for Shrinker {
        fn can_handle(&self, mime_type: &str, extension: Option<&str>) -> bool {
            mime_type == "application/pdf" || extension == Some("pdf")
        }

        fn signature(&self) -> &'static [u8] {
            b"%PDF"
        }

        async fn compress(&self, _workspace: &Path, job: CompressionJob) -> DomainResult<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if job.basename.starts_with("broken") {
                return Err(DomainError::Compression("engine rejected document".to_string()));
            }
            if job.basename.starts_with("empty") {
                return Ok(Vec::new());
            }
            Ok(b"%PDF-small".to_vec())
        }

        fn compressor_name(&self) -> &'static str {
            "Shrinker"
        }
    }

    fn client() -> (CompressionClient, Arc<Shrinker>) {
        let shrinker = Arc::new(Shrinker { calls: AtomicUsize::new(0) });
        (CompressionClient::new(shrinker.clone()), shrinker)
    }

    fn job(name: &str, data: &[u8], quality: QualitySetting) -> CompressionJob {
        CompressionJob::for_entry(name, data.to_vec(), quality)
    }

    #[tokio::test]
    async fn test_successful_round_trip() {
        let (mut client, shrinker) = client();
        let outcome = client.process(job("docs/a.pdf", b"%PDF-1.7 big body", QualitySetting::Ebook)).await;
        assert!(matches!(outcome, JobOutcome::Compressed(ref data) if data == b"%PDF-small"));
        assert_eq!(shrinker.calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.jobs_dispatched(), 1);
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_original() {
        let (mut client, _) = client();
        let outcome = client.process(job("broken.pdf", b"%PDF-1.7 body", QualitySetting::Screen)).await;
        match outcome {
            JobOutcome::Failed { data, error } => {
                assert_eq!(data, b"%PDF-1.7 body".to_vec());
                assert!(error.is_entry_level());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_result_is_a_failure() {
        let (mut client, _) = client();
        let outcome = client.process(job("empty.pdf", b"%PDF-1.7 body", QualitySetting::Ebook)).await;
        assert!(matches!(outcome, JobOutcome::Failed { .. }));
        assert_eq!(outcome.bytes(), b"%PDF-1.7 body");
    }

    #[tokio::test]
    async fn test_signature_mismatch_skips_engine() {
        let (mut client, shrinker) = client();
        let outcome = client.process(job("fake.pdf", b"PK\x03\x04 not a pdf", QualitySetting::Ebook)).await;
        assert!(matches!(outcome, JobOutcome::Skipped { reason: SkipReason::SignatureMismatch, .. }));
        assert_eq!(outcome.bytes(), b"PK\x03\x04 not a pdf");
        assert_eq!(shrinker.calls.load(Ordering::SeqCst), 0);

        let short = client.process(job("tiny.pdf", b"%P", QualitySetting::Ebook)).await;
        assert!(matches!(short, JobOutcome::Skipped { reason: SkipReason::SignatureMismatch, .. }));
    }

    #[test]
    fn test_accepts_by_engine_rules() {
        let (client, _) = client();
        assert!(client.accepts("application/pdf", "report.pdf"));
        assert!(!client.accepts("text/plain", "notes.txt"));
    }

    #[tokio::test]
    async fn test_quality_none_is_byte_identical() {
        let (mut client, shrinker) = client();
        let input = b"%PDF-1.4 exact bytes \x00\xff".to_vec();
        let outcome = client.process(job("a.pdf", &input, QualitySetting::None)).await;
        assert!(matches!(outcome, JobOutcome::Skipped { reason: SkipReason::QualityNone, .. }));
        assert_eq!(outcome.into_bytes(), input);
        assert_eq!(shrinker.calls.load(Ordering::SeqCst), 0);
        assert_eq!(client.jobs_dispatched(), 0);
    }
}
