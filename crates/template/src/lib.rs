//! Template Engine - markup templates rendered against record data
//!
//! This crate provides:
//! - Execution context (record handles, data map, ambient variables)
//! - A restricted expression evaluator (`records[0].name`, `data['key']`)
//! - `{{ ... }}` template rendering with output-driven escaping
//!
//! # Example
//!
//! ```ignore
//! use template::{render, Escape, ExecutionContext};
//!
//! let ctx = ExecutionContext::new().with_data(data);
//! let html = render(b"<h1>Hello, {{data['name']}}!</h1>", &ctx, Escape::Html)?;
//! ```

pub mod context;
pub mod escape;
pub mod expression;
mod renderer;

pub use context::{ExecutionContext, JsonRecord, Record, RecordId};
pub use escape::{escape_html, Escape};
pub use expression::{value_to_string, Expression, Segment};
pub use renderer::{render, render_document, OutputCategory, RenderedDocument, TemplateRenderer};

use thiserror::Error;

/// Errors that can occur during template processing
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template is not valid UTF-8 (invalid byte at offset {offset})")]
    Encoding { offset: usize },

    #[error("Unresolved reference `{segment}` in expression `{expression}`")]
    UnresolvedReference { expression: String, segment: String },

    #[error("Template syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },
}

impl TemplateError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        TemplateError::Syntax {
            line,
            message: message.into(),
        }
    }
}

/// Result type for template operations
pub type Result<T> = std::result::Result<T, TemplateError>;
