//! Isolated worker context for the document engine
//!
//! The engine keeps mutable state for exactly one job lifecycle. Every job gets
//! its own worker task and scratch workspace: `EngineHandle::acquire` spawns it,
//! `submit` runs the single job over a request/response channel, and `release`
//! tears the worker down and removes the workspace.

use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult};
use super::compressors::Compressor;
use super::types::CompressionJob;

/// Messages accepted by an engine worker
#[derive(Debug)]
pub enum EngineMessage {
    /// Run the one job this worker exists for
    Run {
        job: CompressionJob,
        response: oneshot::Sender<DomainResult<Vec<u8>>>,
    },
    /// Tear the worker down
    Shutdown {
        response: oneshot::Sender<()>,
    },
}

/// Worker task state, owned by the spawned task
struct EngineWorker {
    id: Uuid,
    compressor: Arc<dyn Compressor>,
    workspace: TempDir,
    receiver: mpsc::Receiver<EngineMessage>,
}

impl EngineWorker {
    async fn run(mut self) {
        let mut jobs_run = 0usize;
        let mut shutdown_response: Option<oneshot::Sender<()>> = None;

        while let Some(message) = self.receiver.recv().await {
            match message {
                EngineMessage::Run { job, response } => {
                    let result = if jobs_run > 0 {
                        Err(DomainError::Engine(format!(
                            "Engine worker {} already ran its job; acquire a fresh context",
                            self.id
                        )))
                    } else {
                        jobs_run += 1;
                        log::debug!(
                            "Engine worker {} running {} on {} ({} bytes)",
                            self.id,
                            self.compressor.compressor_name(),
                            job.basename,
                            job.data.len()
                        );
                        self.compressor.compress(self.workspace.path(), job).await
                    };
                    let _ = response.send(result);
                }
                EngineMessage::Shutdown { response } => {
                    shutdown_response = Some(response);
                    break;
                }
            }
        }

        if let Err(e) = self.workspace.close() {
            log::warn!("Engine worker {} could not remove its workspace: {}", self.id, e);
        }
        log::debug!("Engine worker {} shut down", self.id);

        if let Some(response) = shutdown_response {
            let _ = response.send(());
        }
    }
}

/// Exclusive handle on one live engine context
pub struct EngineHandle {
    id: Uuid,
    sender: mpsc::Sender<EngineMessage>,
    handle: JoinHandle<()>,
}

impl EngineHandle {
    /// Create a fresh workspace and spawn the worker that owns it.
    pub fn acquire(compressor: Arc<dyn Compressor>) -> DomainResult<Self> {
        let workspace = tempfile::Builder::new()
            .prefix("pdfzip-engine-")
            .tempdir()
            .map_err(|e| DomainError::Engine(format!("Failed to create engine workspace: {}", e)))?;

        let id = Uuid::new_v4();
        let (sender, receiver) = mpsc::channel(1);
        let worker = EngineWorker {
            id,
            compressor,
            workspace,
            receiver,
        };
        let handle = tokio::spawn(worker.run());
        log::debug!("Acquired engine worker {}", id);

        Ok(Self { id, sender, handle })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Dispatch the job and suspend until the worker answers.
    pub async fn submit(&mut self, job: CompressionJob) -> DomainResult<Vec<u8>> {
        let (tx, rx) = oneshot::channel();

        self.sender.send(EngineMessage::Run { job, response: tx })
            .await
            .map_err(|_| DomainError::Engine("Failed to send job to engine worker".to_string()))?;

        rx.await.map_err(|_| DomainError::Engine("Engine worker stopped before answering".to_string()))?
    }

    /// Shut the worker down and wait for it to exit.
    pub async fn release(self) -> DomainResult<()> {
        let (tx, rx) = oneshot::channel();

        // A worker that already died has nothing left to confirm
        if self.sender.send(EngineMessage::Shutdown { response: tx }).await.is_ok() {
            let _ = rx.await;
        }
        drop(self.sender);

        self.handle
            .await
            .map_err(|e| DomainError::Engine(format!("Failed to join engine worker {}: {}", self.id, e)))?;
        log::debug!("Released engine worker {}", self.id);
        Ok(())
    }
}
