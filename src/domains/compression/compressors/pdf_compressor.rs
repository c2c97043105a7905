//! PDF compression implementation

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tokio::task;

use crate::errors::{DomainError, DomainResult};
use super::Compressor;
use crate::domains::compression::types::CompressionJob;

/// Magic number at the start of every PDF file
pub const PDF_SIGNATURE: &[u8; 4] = b"%PDF";

/// PDF compressor using external tools (gs)
pub struct GhostscriptCompressor {
    ghostscript_path: String,
}

impl GhostscriptCompressor {
    pub fn new(ghostscript_path: Option<String>) -> Self {
        Self {
            ghostscript_path: ghostscript_path.unwrap_or_else(|| "gs".to_string()),
        }
    }
}

/// Build the Ghostscript argument list for one document.
pub fn ghostscript_args(settings: &str, input: &Path, output: &Path) -> Vec<String> {
    vec![
        "-sDEVICE=pdfwrite".to_string(),
        "-dCompatibilityLevel=1.4".to_string(),
        format!("-dPDFSETTINGS={}", settings),
        "-dNOPAUSE".to_string(),
        "-dQUIET".to_string(),
        "-dBATCH".to_string(),
        format!("-sOutputFile={}", output.to_string_lossy()),
        input.to_string_lossy().into_owned(),
    ]
}

/// File name safe to create inside the job workspace.
fn workspace_file_name<'a>(name: &'a str, fallback: &'a str) -> &'a str {
    if name.is_empty() || name == "." || name == ".." || name.contains(|c: char| c == '/' || c == '\\') {
        fallback
    } else {
        name
    }
}

/// Input and output locations of one job; the output uses the job's requested name.
fn staging_paths(workspace: &Path, job: &CompressionJob) -> (PathBuf, PathBuf) {
    let input_path = workspace.join(workspace_file_name(&job.basename, "input.pdf"));
    let output_name = job.output_name();
    let output_path = workspace.join(workspace_file_name(&output_name, "compressed_input.pdf"));
    (input_path, output_path)
}

#[async_trait]
impl Compressor for GhostscriptCompressor {
    fn can_handle(&self, mime_type: &str, extension: Option<&str>) -> bool {
        mime_type == mime::APPLICATION_PDF.essence_str()
            || extension.map(|ext| ext.eq_ignore_ascii_case("pdf")).unwrap_or(false)
    }

    fn signature(&self) -> &'static [u8] {
        PDF_SIGNATURE
    }

    async fn compress(&self, workspace: &Path, job: CompressionJob) -> DomainResult<Vec<u8>> {
        let settings = match job.quality.pdf_settings() {
            Some(settings) => settings,
            None => return Ok(job.data),
        };
        let ghostscript_path = self.ghostscript_path.clone();

        let (input_path, output_path) = staging_paths(workspace, &job);

        // Run Ghostscript in a blocking task
        task::spawn_blocking(move || -> DomainResult<Vec<u8>> {
            std::fs::write(&input_path, &job.data)
                .map_err(|e| DomainError::Engine(format!("Failed to stage input document: {}", e)))?;

            let output = Command::new(&ghostscript_path)
                .args(ghostscript_args(settings, &input_path, &output_path))
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .output()
                .map_err(|e| DomainError::Engine(format!("Failed to execute ghostscript: {}", e)))?;

            if !output.status.success() {
                let error = String::from_utf8_lossy(&output.stderr);
                return Err(DomainError::Compression(format!("Ghostscript error: {}", error.trim())));
            }

            let compressed = std::fs::read(&output_path)
                .map_err(|e| DomainError::Compression(format!("Failed to read compressed PDF: {}", e)))?;

            if compressed.is_empty() {
                return Err(DomainError::Compression("Ghostscript produced an empty document".to_string()));
            }

            Ok(compressed)
        }).await.map_err(|e| DomainError::Engine(format!("Task join error: {}", e)))?
    }

    fn compressor_name(&self) -> &'static str {
        "GhostscriptCompressor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::compression::types::QualitySetting;

    #[test]
    fn test_ghostscript_args() {
        let args = ghostscript_args("/screen", Path::new("/tmp/w/in.pdf"), Path::new("/tmp/w/compressed_in.pdf"));
        assert_eq!(args[0], "-sDEVICE=pdfwrite");
        assert!(args.contains(&"-dPDFSETTINGS=/screen".to_string()));
        assert!(args.contains(&"-dCompatibilityLevel=1.4".to_string()));
        assert_eq!(args[args.len() - 2], "-sOutputFile=/tmp/w/compressed_in.pdf");
        assert_eq!(args[args.len() - 1], "/tmp/w/in.pdf");
    }

    #[test]
    fn test_workspace_file_name() {
        assert_eq!(workspace_file_name("report.pdf", "input.pdf"), "report.pdf");
        assert_eq!(workspace_file_name("..", "input.pdf"), "input.pdf");
        assert_eq!(workspace_file_name("a/b.pdf", "input.pdf"), "input.pdf");
        assert_eq!(workspace_file_name("", "input.pdf"), "input.pdf");
    }

    #[test]
    fn test_staging_paths_use_requested_output_name() {
        let workspace = Path::new("/tmp/w");
        let job = CompressionJob::for_entry("docs/report.pdf", vec![], QualitySetting::Ebook);
        let (input, output) = staging_paths(workspace, &job);
        assert_eq!(input, workspace.join("report.pdf"));
        assert_eq!(output, workspace.join(job.output_name()));

        let odd = CompressionJob {
            data: vec![],
            basename: "..".to_string(),
            quality: QualitySetting::Ebook,
        };
        let (input, output) = staging_paths(workspace, &odd);
        assert_eq!(input, workspace.join("input.pdf"));
        assert_eq!(output, workspace.join("compressed_.."));
        assert_ne!(input, output);
    }

    #[test]
    fn test_can_handle() {
        let compressor = GhostscriptCompressor::new(None);
        assert!(compressor.can_handle("application/pdf", None));
        assert!(compressor.can_handle("application/octet-stream", Some("PDF")));
        assert!(!compressor.can_handle("text/plain", Some("txt")));
        assert_eq!(compressor.signature(), b"%PDF");
    }

    #[tokio::test]
    async fn test_quality_none_returns_input() {
        let workspace = tempfile::tempdir().unwrap();
        let compressor = GhostscriptCompressor::new(Some("/nonexistent/gs".to_string()));
        let job = CompressionJob {
            data: b"%PDF-1.7 body".to_vec(),
            basename: "doc.pdf".to_string(),
            quality: QualitySetting::None,
        };
        let out = compressor.compress(workspace.path(), job).await.unwrap();
        assert_eq!(out, b"%PDF-1.7 body".to_vec());
    }

    #[tokio::test]
    async fn test_missing_binary_is_engine_error() {
        let workspace = tempfile::tempdir().unwrap();
        let compressor = GhostscriptCompressor::new(Some("/nonexistent/definitely-not-gs".to_string()));
        let job = CompressionJob {
            data: b"%PDF-1.4".to_vec(),
            basename: "doc.pdf".to_string(),
            quality: QualitySetting::Ebook,
        };
        let result = compressor.compress(workspace.path(), job).await;
        assert!(matches!(result, Err(DomainError::Engine(_))));
    }
}
