//! Document engines the compression client can drive

pub mod pdf_compressor;

use async_trait::async_trait;
use std::path::Path;
use crate::errors::DomainResult;
use super::types::CompressionJob;

/// Common trait for all document engines
///
/// An engine only ever sees one job at a time, inside a scratch workspace that
/// belongs to that job alone and is removed once the job is released.
#[async_trait]
pub trait Compressor: Send + Sync {
    /// Check if this compressor can handle the given file
    fn can_handle(&self, mime_type: &str, extension: Option<&str>) -> bool;

    /// Leading bytes every document accepted by this compressor starts with
    fn signature(&self) -> &'static [u8];

    /// Compress one document inside `workspace`
    async fn compress(&self, workspace: &Path, job: CompressionJob) -> DomainResult<Vec<u8>>;

    /// Get the compressor type name for logging
    fn compressor_name(&self) -> &'static str;
}

/// Utility function to get file extension from filename
pub fn get_extension(filename: &str) -> Option<&str> {
    Path::new(filename).extension().and_then(|ext| ext.to_str())
}

/// Case-insensitive extension match against a list of extensions (without dots)
pub fn has_extension(filename: &str, extensions: &[String]) -> bool {
    match get_extension(filename) {
        Some(ext) => extensions.iter().any(|candidate| candidate.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

/// Utility function to guess MIME type from extension
pub fn guess_mime_type(filename: &str) -> &'static str {
    match get_extension(filename).unwrap_or("").to_lowercase().as_str() {
        // Documents
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "rtf" => "application/rtf",

        // Text files
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "xml" => "application/xml",
        "csv" => "text/csv",
        "md" => "text/markdown",

        // Images
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",

        // Archives
        "zip" => "application/zip",
        "rar" => "application/x-rar-compressed",
        "7z" => "application/x-7z-compressed",
        "tar" => "application/x-tar",
        "gz" => "application/gzip",

        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_matching() {
        let exts = vec!["pdf".to_string()];
        assert!(has_extension("docs/report.pdf", &exts));
        assert!(has_extension("docs/REPORT.PDF", &exts));
        assert!(!has_extension("docs/report.pdf.txt", &exts));
        assert!(!has_extension("docs/pdf", &exts));
        assert!(!has_extension("docs/", &exts));
    }

    #[test]
    fn test_guess_mime_type() {
        assert_eq!(guess_mime_type("a.PDF"), "application/pdf");
        assert_eq!(guess_mime_type("bundle.zip"), "application/zip");
        assert_eq!(guess_mime_type("noext"), "application/octet-stream");
    }
}
