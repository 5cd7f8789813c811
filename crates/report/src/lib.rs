//! Report - render-and-convert pipeline
//!
//! This crate provides:
//! - The format registry (which extensions are markup, which need conversion)
//! - The conversion dispatcher and conversion modes (real / bypass)
//! - Pipeline configuration loaded from JSON
//! - The `execute` call surface over host collaborators
//!
//! # Example
//!
//! ```ignore
//! use report::{Report, ReportConfig};
//!
//! let report = Report::from_config("res.user", &ReportConfig::default(), store, provider)?;
//! let result = report.execute(&[1], data)?;
//! assert_eq!(result.format_tag, "pdf");
//! ```

pub mod config;
pub mod dispatch;
pub mod format;
pub mod mode;
mod report;
pub mod store;

pub use config::{FormatConfig, ReportConfig};
pub use dispatch::{dispatch, ConversionResult};
pub use format::{Format, FormatRegistry};
pub use mode::{bypass_enabled, set_bypass, ConversionMode, BYPASS_ENV};
pub use report::{render_and_convert, Report, ReportDefinition};
pub use store::{DefinitionStore, MemoryDefinitionStore, MemoryRecordProvider, RecordProvider};

// Re-export the collaborating crates' public types
pub use pdf_convert::{ConvertError, Converter, EngineConfig, ExternalEngine};
pub use template::{
    Escape, ExecutionContext, JsonRecord, OutputCategory, Record, RecordId, RenderedDocument,
    TemplateError,
};

use thiserror::Error;

/// Errors that can occur while executing a report
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Unsupported report format: {0}")]
    UnsupportedFormat(String),

    #[error("Report definition not found: {0}")]
    DefinitionNotFound(String),

    #[error("Record error: {0}")]
    RecordError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Template error: {0}")]
    TemplateError(#[from] TemplateError),

    #[error("Conversion error: {0}")]
    ConvertError(#[from] ConvertError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for report operations
pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_error_converts() {
        let err: ReportError = TemplateError::Encoding { offset: 0 }.into();
        assert!(matches!(err, ReportError::TemplateError(_)));
        assert!(err.to_string().starts_with("Template error:"));
    }

    #[test]
    fn test_unsupported_format_message() {
        let err = ReportError::UnsupportedFormat("odt".to_string());
        assert_eq!(err.to_string(), "Unsupported report format: odt");
    }
}
