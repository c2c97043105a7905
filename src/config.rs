//! Processor configuration: defaults, `.env`/environment overrides and JSON.

use serde::Deserialize;
use std::env;
use std::str::FromStr;

use crate::domains::compression::types::QualitySetting;
use crate::errors::{ServiceError, ServiceResult, ValidationError};

pub const DEFAULT_MAX_NAME_LENGTH: usize = 200;
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 9;
pub const DEFAULT_OUTPUT_PREFIX: &str = "compressed_";
/// 2GB, the most we are willing to hold in memory for one archive
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 2048 * 1024 * 1024;
pub const DEFAULT_MAX_EXTRACTED_BYTES: u64 = 4096 * 1024 * 1024;

/// Settings for one batch run
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    pub quality: QualitySetting,
    pub max_name_length: usize,
    pub document_extensions: Vec<String>,
    pub compression_level: i32,
    pub skip_compression: bool,
    pub output_prefix: String,
    pub max_input_bytes: u64,
    pub max_extracted_bytes: u64,
    pub ghostscript_path: Option<String>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            quality: QualitySetting::default(),
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
            document_extensions: vec!["pdf".to_string()],
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            skip_compression: false,
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            max_extracted_bytes: DEFAULT_MAX_EXTRACTED_BYTES,
            ghostscript_path: None,
        }
    }
}

impl ProcessorConfig {
    /// Defaults, overridden by a `.env` file and `PDFZIP_*` environment variables.
    pub fn from_env() -> ServiceResult<Self> {
        dotenv::dotenv().ok();
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    pub fn from_json(json: &str) -> ServiceResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ServiceError::Configuration(format!("Invalid configuration JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from any key lookup, then validate.
    pub fn with_overrides<F>(mut self, lookup: F) -> ServiceResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("PDFZIP_QUALITY") {
            self.quality = QualitySetting::from_str(&value)
                .map_err(|e| ServiceError::Configuration(e.to_string()))?;
        }
        if let Some(value) = lookup("PDFZIP_MAX_NAME_LENGTH") {
            self.max_name_length = parse_value("PDFZIP_MAX_NAME_LENGTH", &value)?;
        }
        if let Some(value) = lookup("PDFZIP_COMPRESSION_LEVEL") {
            self.compression_level = parse_value("PDFZIP_COMPRESSION_LEVEL", &value)?;
        }
        if let Some(value) = lookup("PDFZIP_SKIP_COMPRESSION") {
            self.skip_compression = parse_value("PDFZIP_SKIP_COMPRESSION", &value)?;
        }
        if let Some(value) = lookup("PDFZIP_OUTPUT_PREFIX") {
            self.output_prefix = value;
        }
        if let Some(value) = lookup("PDFZIP_MAX_INPUT_BYTES") {
            self.max_input_bytes = parse_value("PDFZIP_MAX_INPUT_BYTES", &value)?;
        }
        if let Some(value) = lookup("PDFZIP_MAX_EXTRACTED_BYTES") {
            self.max_extracted_bytes = parse_value("PDFZIP_MAX_EXTRACTED_BYTES", &value)?;
        }
        if let Some(value) = lookup("PDFZIP_GHOSTSCRIPT_PATH") {
            self.ghostscript_path = Some(value);
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> ServiceResult<()> {
        if self.max_name_length == 0 {
            return Err(invalid(ValidationError::range("max_name_length", 1, usize::MAX)));
        }
        if !(0..=9).contains(&self.compression_level) {
            return Err(invalid(ValidationError::range("compression_level", 0, 9)));
        }
        if self.document_extensions.iter().all(|ext| ext.trim().is_empty()) {
            return Err(invalid(ValidationError::required("document_extensions")));
        }
        if self.max_input_bytes == 0 {
            return Err(invalid(ValidationError::range("max_input_bytes", 1, u64::MAX)));
        }
        Ok(())
    }
}

fn invalid(error: ValidationError) -> ServiceError {
    ServiceError::Configuration(error.to_string())
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> ServiceResult<T> {
    value.trim().parse::<T>().map_err(|_| {
        invalid(ValidationError::invalid_value(key, &format!("cannot parse '{}'", value)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ProcessorConfig::default();
        assert_eq!(config.quality, QualitySetting::Ebook);
        assert_eq!(config.max_name_length, 200);
        assert_eq!(config.compression_level, 9);
        assert_eq!(config.output_prefix, "compressed_");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = ProcessorConfig::default()
            .with_overrides(lookup(&[
                ("PDFZIP_QUALITY", "/screen"),
                ("PDFZIP_MAX_NAME_LENGTH", "120"),
                ("PDFZIP_SKIP_COMPRESSION", "true"),
                ("PDFZIP_GHOSTSCRIPT_PATH", "/opt/gs/bin/gs"),
            ]))
            .unwrap();
        assert_eq!(config.quality, QualitySetting::Screen);
        assert_eq!(config.max_name_length, 120);
        assert!(config.skip_compression);
        assert_eq!(config.ghostscript_path.as_deref(), Some("/opt/gs/bin/gs"));
    }

    #[test]
    fn test_bad_overrides_are_configuration_errors() {
        let bad_level = ProcessorConfig::default()
            .with_overrides(lookup(&[("PDFZIP_COMPRESSION_LEVEL", "12")]));
        assert!(matches!(bad_level, Err(ServiceError::Configuration(_))));

        let bad_number = ProcessorConfig::default()
            .with_overrides(lookup(&[("PDFZIP_MAX_NAME_LENGTH", "lots")]));
        assert!(matches!(bad_number, Err(ServiceError::Configuration(_))));

        let bad_quality = ProcessorConfig::default()
            .with_overrides(lookup(&[("PDFZIP_QUALITY", "ultra")]));
        assert!(matches!(bad_quality, Err(ServiceError::Configuration(_))));
    }

    #[test]
    fn test_from_json() {
        let config = ProcessorConfig::from_json(r#"{"quality": "prepress", "document_extensions": ["pdf", "ai"]}"#).unwrap();
        assert_eq!(config.quality, QualitySetting::Prepress);
        assert_eq!(config.document_extensions, vec!["pdf", "ai"]);
        assert_eq!(config.max_name_length, 200);

        assert!(ProcessorConfig::from_json(r#"{"max_name_length": 0}"#).is_err());
        assert!(ProcessorConfig::from_json("not json").is_err());
    }
}
