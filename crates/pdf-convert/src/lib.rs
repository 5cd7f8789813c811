//! PDF Convert - markup to paginated documents
//!
//! This crate provides:
//! - The [`Converter`] capability used by the report dispatcher
//! - [`ExternalEngine`], an out-of-process engine binding (wkhtmltopdf style)
//! - A minimal one-page PDF used as the bypass payload
//! - Page inspection of produced PDFs
//!
//! # Example
//!
//! ```ignore
//! use pdf_convert::{Converter, EngineConfig, ExternalEngine};
//!
//! let engine = ExternalEngine::new(EngineConfig::wkhtmltopdf());
//! let pdf = engine.convert(b"<h1>Hello</h1>")?;
//! assert_eq!(pdf_convert::page_count(&pdf)?, 1);
//! ```

mod engine;
mod stub;

pub use engine::{EngineConfig, ExternalEngine};
pub use stub::{blank_pdf, page_count};

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during conversion
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Conversion engine `{program}` not found: {reason}")]
    EngineNotFound { program: String, reason: String },

    #[error("Conversion engine failed ({status}): {diagnostics}")]
    Engine { status: String, diagnostics: String },

    #[error("Conversion engine timed out after {0:?}")]
    Timeout(Duration),

    #[error("PDF parsing error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Turns rendered markup into a binary document
///
/// Implementations must not retry on failure.
pub trait Converter: Send + Sync {
    /// Convert markup bytes into the target binary format
    fn convert(&self, markup: &[u8]) -> Result<Vec<u8>>;

    /// Payload returned instead of converting when conversion is bypassed
    fn placeholder(&self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
}
