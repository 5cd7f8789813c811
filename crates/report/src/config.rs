//! Pipeline configuration

use crate::mode::ConversionMode;
use crate::{ReportError, Result};
use pdf_convert::EngineConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use template::{Escape, OutputCategory};

/// Root configuration
///
/// ```json
/// {
///   "formats": {
///     "html": { "category": "markup", "escape": "html" },
///     "pdf": {
///       "category": "binary",
///       "engine": { "program": "wkhtmltopdf", "options": { "page-size": "A4" } }
///     }
///   },
///   "conversion": "real"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportConfig {
    /// Known output formats by extension
    #[serde(default = "default_formats")]
    pub formats: BTreeMap<String, FormatConfig>,

    /// Conversion mode for calls that don't pass one (process default when unset)
    #[serde(default)]
    pub conversion: Option<ConversionMode>,
}

/// One output format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FormatConfig {
    pub category: OutputCategory,

    #[serde(default)]
    pub escape: Escape,

    /// Engine binding, required for binary formats
    #[serde(default)]
    pub engine: Option<EngineConfig>,
}

impl FormatConfig {
    /// Markup format returned as rendered
    pub fn markup(escape: Escape) -> Self {
        Self {
            category: OutputCategory::Markup,
            escape,
            engine: None,
        }
    }

    /// Binary format converted by `engine`
    pub fn binary(engine: EngineConfig) -> Self {
        Self {
            category: OutputCategory::Binary,
            escape: Escape::Html,
            engine: Some(engine),
        }
    }
}

fn default_formats() -> BTreeMap<String, FormatConfig> {
    BTreeMap::from([
        ("html".to_string(), FormatConfig::markup(Escape::Html)),
        ("txt".to_string(), FormatConfig::markup(Escape::None)),
        (
            "pdf".to_string(),
            FormatConfig::binary(EngineConfig::wkhtmltopdf()),
        ),
    ])
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            formats: default_formats(),
            conversion: None,
        }
    }
}

impl ReportConfig {
    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check that every binary format has an engine and no markup format has one
    pub fn validate(&self) -> Result<()> {
        for (extension, format) in &self.formats {
            match (format.category, &format.engine) {
                (OutputCategory::Binary, None) => {
                    return Err(ReportError::ConfigError(format!(
                        "binary format '{}' has no engine",
                        extension
                    )));
                }
                (OutputCategory::Markup, Some(_)) => {
                    return Err(ReportError::ConfigError(format!(
                        "markup format '{}' must not declare an engine",
                        extension
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}
