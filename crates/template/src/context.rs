//! Execution context for a single render
//!
//! The context owns the record handles and data map that expressions can
//! reach. It is built per invocation and dropped when the call returns.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a host record
pub type RecordId = i64;

/// Root name for the ordered record handles
pub const RECORDS_ROOT: &str = "records";

/// Root name for the caller-supplied data map
pub const DATA_ROOT: &str = "data";

/// An opaque record handle supplied by the host application
///
/// Only attribute lookup is exposed to templates. Attribute values are
/// plain JSON so that further `.field` / `[n]` steps can walk into them.
pub trait Record {
    /// Host identifier of the record
    fn id(&self) -> RecordId;

    /// Look up an attribute by name, `None` if the record has no such attribute
    fn attribute(&self, name: &str) -> Option<Value>;

    /// Text shown when the record itself is substituted (`{{records[0]}}`)
    fn display_name(&self) -> String {
        self.id().to_string()
    }
}

/// Record backed by a JSON object
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRecord {
    id: RecordId,
    fields: Map<String, Value>,
}

impl JsonRecord {
    /// Create a record from an id and a JSON object
    ///
    /// Non-object values produce a record without attributes.
    pub fn new(id: RecordId, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self { id, fields }
    }

    /// Set a single attribute (fluent API)
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

impl Record for JsonRecord {
    fn id(&self) -> RecordId {
        self.id
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        if name == "id" {
            return Some(Value::from(self.id));
        }
        self.fields.get(name).cloned()
    }

    fn display_name(&self) -> String {
        ["rec_name", "name"]
            .iter()
            .find_map(|key| self.fields.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// Record handles and key/value data available to expressions
#[derive(Default)]
pub struct ExecutionContext {
    records: Vec<Box<dyn Record>>,
    data: Map<String, Value>,
    ambient: BTreeMap<String, Value>,
}

impl ExecutionContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the record set
    pub fn with_records(mut self, records: Vec<Box<dyn Record>>) -> Self {
        self.records = records;
        self
    }

    /// Append one record to the record set
    pub fn with_record(mut self, record: impl Record + 'static) -> Self {
        self.records.push(Box::new(record));
        self
    }

    /// Replace the data map
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    /// Register an ambient variable (e.g. `user`, `company`)
    ///
    /// `records` and `data` always resolve to the record set and data map,
    /// so ambient variables with those names are unreachable.
    pub fn with_ambient(mut self, name: impl Into<String>, value: Value) -> Self {
        self.ambient.insert(name.into(), value);
        self
    }

    /// Merge several ambient variables at once
    pub fn extend_ambient(&mut self, vars: Map<String, Value>) {
        self.ambient.extend(vars);
    }

    /// Ordered record handles
    pub fn records(&self) -> &[Box<dyn Record>] {
        &self.records
    }

    /// Record at `index`
    pub fn record(&self, index: usize) -> Option<&dyn Record> {
        self.records.get(index).map(|r| &**r)
    }

    /// Caller-supplied data map
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Ambient variable by name
    pub fn ambient(&self, name: &str) -> Option<&Value> {
        self.ambient.get(name)
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<RecordId> = self.records.iter().map(|r| r.id()).collect();
        f.debug_struct("ExecutionContext")
            .field("records", &ids)
            .field("data", &self.data)
            .field("ambient", &self.ambient)
            .finish()
    }
}
