//! Type definitions for the compression domain.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::errors::{DomainError, ValidationError};

/// Quality profiles understood by the document engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualitySetting {
    /// Lowest fidelity, smallest output (72 DPI)
    Screen,

    /// Balanced fidelity and size (150 DPI)
    #[default]
    Ebook,

    /// Print-grade fidelity (300 DPI)
    Printer,

    /// Highest fidelity, keeps editing metadata
    Prepress,

    /// Bypass the engine entirely
    None,
}

impl QualitySetting {
    pub const ALL: [QualitySetting; 5] = [
        QualitySetting::Screen,
        QualitySetting::Ebook,
        QualitySetting::Printer,
        QualitySetting::Prepress,
        QualitySetting::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QualitySetting::Screen => "screen",
            QualitySetting::Ebook => "ebook",
            QualitySetting::Printer => "printer",
            QualitySetting::Prepress => "prepress",
            QualitySetting::None => "none",
        }
    }

    /// Value for Ghostscript's `-dPDFSETTINGS`, `None` when compression is bypassed.
    pub fn pdf_settings(&self) -> Option<&'static str> {
        match self {
            QualitySetting::Screen => Some("/screen"),
            QualitySetting::Ebook => Some("/ebook"),
            QualitySetting::Printer => Some("/printer"),
            QualitySetting::Prepress => Some("/prepress"),
            QualitySetting::None => None,
        }
    }

    pub fn bypasses_engine(&self) -> bool {
        *self == QualitySetting::None
    }
}

impl fmt::Display for QualitySetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualitySetting {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().trim_start_matches('/').to_lowercase();
        QualitySetting::ALL
            .into_iter()
            .find(|quality| quality.as_str() == id)
            .ok_or_else(|| DomainError::Validation(ValidationError::invalid_value(
                "quality",
                &format!("unknown quality setting: {}", s),
            )))
    }
}

/// One round trip worth of work for the engine
#[derive(Debug, Clone)]
pub struct CompressionJob {
    pub data: Vec<u8>,
    pub basename: String,
    pub quality: QualitySetting,
}

impl CompressionJob {
    /// Build a job from an archive-relative entry path, keeping only its last segment.
    pub fn for_entry(path: &str, data: Vec<u8>, quality: QualitySetting) -> Self {
        Self {
            data,
            basename: basename_of(path),
            quality,
        }
    }

    /// Name the engine should write its result under.
    pub fn output_name(&self) -> String {
        format!("compressed_{}", self.basename)
    }
}

/// Last path segment, with a stable fallback for names that have none.
pub fn basename_of(path: &str) -> String {
    path.rsplit(|c: char| c == '/' || c == '\\')
        .find(|segment| !segment.is_empty())
        .unwrap_or("unknown.pdf")
        .to_string()
}

/// Why a document reached the output without going through the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// Content does not carry the document signature
    SignatureMismatch,
    /// Quality `none` was requested
    QualityNone,
}

/// Result of handing one document to the compression client
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Compressed(Vec<u8>),
    Skipped { data: Vec<u8>, reason: SkipReason },
    Failed { data: Vec<u8>, error: DomainError },
}

impl JobOutcome {
    pub fn bytes(&self) -> &[u8] {
        match self {
            JobOutcome::Compressed(data) => data,
            JobOutcome::Skipped { data, .. } => data,
            JobOutcome::Failed { data, .. } => data,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            JobOutcome::Compressed(data) => data,
            JobOutcome::Skipped { data, .. } => data,
            JobOutcome::Failed { data, .. } => data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_parsing() {
        assert_eq!("ebook".parse::<QualitySetting>().unwrap(), QualitySetting::Ebook);
        assert_eq!("/screen".parse::<QualitySetting>().unwrap(), QualitySetting::Screen);
        assert_eq!("PREPRESS".parse::<QualitySetting>().unwrap(), QualitySetting::Prepress);
        assert_eq!("none".parse::<QualitySetting>().unwrap(), QualitySetting::None);
        assert!("ultra".parse::<QualitySetting>().is_err());
    }

    #[test]
    fn test_pdf_settings() {
        assert_eq!(QualitySetting::default(), QualitySetting::Ebook);
        assert_eq!(QualitySetting::Printer.pdf_settings(), Some("/printer"));
        assert_eq!(QualitySetting::None.pdf_settings(), None);
        assert!(QualitySetting::None.bypasses_engine());
    }

    #[test]
    fn test_job_basename() {
        let job = CompressionJob::for_entry("reports/2024/q1.pdf", vec![], QualitySetting::Ebook);
        assert_eq!(job.basename, "q1.pdf");
        assert_eq!(job.output_name(), "compressed_q1.pdf");
        assert_eq!(basename_of("top.pdf"), "top.pdf");
        assert_eq!(basename_of("a\\b\\c.pdf"), "c.pdf");
        assert_eq!(basename_of(""), "unknown.pdf");
    }
}
