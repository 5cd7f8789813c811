//! Report execution

use crate::config::ReportConfig;
use crate::dispatch::{dispatch, ConversionResult};
use crate::format::FormatRegistry;
use crate::mode::ConversionMode;
use crate::store::{DefinitionStore, RecordProvider};
use crate::{ReportError, Result};
use serde_json::{Map, Value};
use std::sync::Arc;
use template::{render_document, ExecutionContext, RecordId};

/// A stored report: template plus declared output extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDefinition {
    /// Report name used for lookup
    pub name: String,
    /// Model whose records the report is executed on
    pub model: String,
    /// Template source (UTF-8)
    pub template: Vec<u8>,
    /// Declared output extension (`html`, `pdf`...)
    pub extension: String,
}

impl ReportDefinition {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        template: impl Into<Vec<u8>>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            template: template.into(),
            extension: extension.into(),
        }
    }
}

/// Render a definition against a context and route it to its output
///
/// Unknown extensions fail before anything is rendered.
pub fn render_and_convert(
    registry: &FormatRegistry,
    definition: &ReportDefinition,
    context: &ExecutionContext,
    mode: ConversionMode,
) -> Result<ConversionResult> {
    let format = registry.get(&definition.extension)?;
    let document = render_document(
        &definition.template,
        context,
        format.category(),
        format.escape(),
    )?;
    dispatch(registry, document, &definition.extension, mode)
}

/// A named report bound to its collaborators
pub struct Report {
    name: String,
    registry: FormatRegistry,
    mode: Option<ConversionMode>,
    store: Arc<dyn DefinitionStore>,
    provider: Arc<dyn RecordProvider>,
}

impl Report {
    /// Create a report with the default format registry
    pub fn new(
        name: impl Into<String>,
        store: Arc<dyn DefinitionStore>,
        provider: Arc<dyn RecordProvider>,
    ) -> Result<Self> {
        Self::from_config(name, &ReportConfig::default(), store, provider)
    }

    /// Create a report from configuration
    pub fn from_config(
        name: impl Into<String>,
        config: &ReportConfig,
        store: Arc<dyn DefinitionStore>,
        provider: Arc<dyn RecordProvider>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            registry: FormatRegistry::from_config(config)?,
            mode: config.conversion,
            store,
            provider,
        })
    }

    /// Replace the format registry
    pub fn with_registry(mut self, registry: FormatRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Fix the conversion mode for calls that don't pass one
    pub fn with_mode(mut self, mode: ConversionMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Mode used by [`Report::execute`]
    pub fn mode(&self) -> ConversionMode {
        self.mode.unwrap_or_else(ConversionMode::process_default)
    }

    /// Execute the report on `record_ids` with extra `data`
    ///
    /// Returns `(format_tag, payload)` as a [`ConversionResult`].
    pub fn execute(&self, record_ids: &[RecordId], data: Map<String, Value>) -> Result<ConversionResult> {
        self.execute_with_mode(record_ids, data, self.mode())
    }

    /// Execute with an explicit conversion mode
    pub fn execute_with_mode(
        &self,
        record_ids: &[RecordId],
        data: Map<String, Value>,
        mode: ConversionMode,
    ) -> Result<ConversionResult> {
        let definition = self
            .store
            .definition(&self.name)
            .ok_or_else(|| ReportError::DefinitionNotFound(self.name.clone()))?;

        // Fail on unknown formats before touching records
        self.registry.get(&definition.extension)?;

        let records = self.provider.records(&definition.model, record_ids)?;
        let mut context = ExecutionContext::new().with_records(records).with_data(data);
        context.extend_ambient(self.provider.ambient());

        let result = render_and_convert(&self.registry, &definition, &context, mode)?;
        tracing::info!(
            report = %self.name,
            format = %result.format_tag,
            records = record_ids.len(),
            bytes = result.payload.len(),
            ?mode,
            "Report executed"
        );
        Ok(result)
    }
}
