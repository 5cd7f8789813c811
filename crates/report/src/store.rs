//! Host collaborators
//!
//! The pipeline never owns report definitions or records. It reaches them
//! through these traits; the in-memory implementations back tests and
//! simple embeddings.

use crate::report::ReportDefinition;
use crate::{ReportError, Result};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use template::{JsonRecord, Record, RecordId};

/// Supplies report definitions by report name
pub trait DefinitionStore: Send + Sync {
    fn definition(&self, report_name: &str) -> Option<ReportDefinition>;
}

/// Resolves record ids into record handles and supplies ambient variables
pub trait RecordProvider: Send + Sync {
    /// Records of `model` in the order of `ids`
    fn records(&self, model: &str, ids: &[RecordId]) -> Result<Vec<Box<dyn Record>>>;

    /// Ambient variables (user, company, preferences...) merged into every render
    fn ambient(&self) -> Map<String, Value> {
        Map::new()
    }
}

/// Definitions held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryDefinitionStore {
    definitions: HashMap<String, ReportDefinition>,
}

impl MemoryDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition under its own name
    pub fn with_definition(mut self, definition: ReportDefinition) -> Self {
        self.definitions
            .insert(definition.name.clone(), definition);
        self
    }
}

impl DefinitionStore for MemoryDefinitionStore {
    fn definition(&self, report_name: &str) -> Option<ReportDefinition> {
        self.definitions.get(report_name).cloned()
    }
}

/// JSON records held in memory, grouped by model
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordProvider {
    models: HashMap<String, BTreeMap<RecordId, Value>>,
    ambient: Map<String, Value>,
}

impl MemoryRecordProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record to `model`
    pub fn with_record(mut self, model: &str, id: RecordId, fields: Value) -> Self {
        self.models
            .entry(model.to_string())
            .or_default()
            .insert(id, fields);
        self
    }

    /// Add an ambient variable
    pub fn with_ambient(mut self, name: impl Into<String>, value: Value) -> Self {
        self.ambient.insert(name.into(), value);
        self
    }
}

impl RecordProvider for MemoryRecordProvider {
    fn records(&self, model: &str, ids: &[RecordId]) -> Result<Vec<Box<dyn Record>>> {
        let table = self.models.get(model);
        ids.iter()
            .map(|id| {
                table
                    .and_then(|t| t.get(id))
                    .map(|fields| Box::new(JsonRecord::new(*id, fields.clone())) as Box<dyn Record>)
                    .ok_or_else(|| {
                        ReportError::RecordError(format!("{}({}) does not exist", model, id))
                    })
            })
            .collect()
    }

    fn ambient(&self) -> Map<String, Value> {
        self.ambient.clone()
    }
}
