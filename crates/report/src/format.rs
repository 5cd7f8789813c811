//! Known output formats
//!
//! A format is markup when it has no converter and binary when one is bound.
//! Adding a binary target means binding another converter, the dispatch
//! logic does not change.

use crate::config::ReportConfig;
use crate::{ReportError, Result};
use pdf_convert::{Converter, ExternalEngine};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use template::{Escape, OutputCategory};

/// One registered output format
#[derive(Clone)]
pub struct Format {
    escape: Escape,
    converter: Option<Arc<dyn Converter>>,
}

impl Format {
    /// Markup format, returned as rendered
    pub fn markup(escape: Escape) -> Self {
        Self {
            escape,
            converter: None,
        }
    }

    /// Binary format converted by `converter`
    pub fn binary(escape: Escape, converter: Arc<dyn Converter>) -> Self {
        Self {
            escape,
            converter: Some(converter),
        }
    }

    pub fn category(&self) -> OutputCategory {
        if self.converter.is_some() {
            OutputCategory::Binary
        } else {
            OutputCategory::Markup
        }
    }

    pub fn escape(&self) -> Escape {
        self.escape
    }

    /// Bound converter (binary formats only)
    pub fn converter(&self) -> Option<&dyn Converter> {
        self.converter.as_deref()
    }
}

impl fmt::Debug for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Format")
            .field("category", &self.category())
            .field("escape", &self.escape)
            .finish()
    }
}

/// Extension → format lookup
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    formats: BTreeMap<String, Format>,
}

impl FormatRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configuration, binding an [`ExternalEngine`]
    /// to every binary format
    pub fn from_config(config: &ReportConfig) -> Result<Self> {
        config.validate()?;

        let mut registry = Self::new();
        for (extension, format) in &config.formats {
            let entry = match (&format.engine, format.category) {
                (Some(engine), OutputCategory::Binary) => Format::binary(
                    format.escape,
                    Arc::new(ExternalEngine::new(engine.clone())),
                ),
                (None, OutputCategory::Markup) => Format::markup(format.escape),
                _ => {
                    return Err(ReportError::ConfigError(format!(
                        "format '{}' has an inconsistent engine binding",
                        extension
                    )))
                }
            };
            registry.register(extension.clone(), entry);
        }
        Ok(registry)
    }

    /// Register or replace a format
    pub fn register(&mut self, extension: impl Into<String>, format: Format) {
        self.formats.insert(extension.into(), format);
    }

    /// Register or replace a format (fluent API)
    pub fn with_format(mut self, extension: impl Into<String>, format: Format) -> Self {
        self.register(extension, format);
        self
    }

    /// Look up a format; unknown extensions are a configuration error
    pub fn get(&self, extension: &str) -> Result<&Format> {
        self.formats
            .get(extension)
            .ok_or_else(|| ReportError::UnsupportedFormat(extension.to_string()))
    }

    /// Registered extensions in sorted order
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.formats.keys().map(String::as_str)
    }
}
