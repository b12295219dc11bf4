//! Response normalization: loosely-typed model output → schema-complete record.
//!
//! Each schema registers a default per top-level group. A response is
//! rewritten to canonical key names, merged group by group against those
//! defaults, deserialized into its typed record, and finally passed through
//! the schema's consistency rules. Missing leaves never fail; only a group
//! without a registered default does, and that is a programming error.

pub mod confidence;
pub mod merge;
pub mod schemas;
pub mod variants;

pub use confidence::*;
pub use merge::*;
pub use schemas::*;
pub use variants::*;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("schema {schema} has no registered default for group {group}")]
    SchemaDefaultMissing {
        schema: &'static str,
        group: &'static str,
    },

    #[error("merged {schema} record does not match its type: {source}")]
    Shape {
        schema: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

// ═══════════════════════════════════════════════════════════
// Schema registry
// ═══════════════════════════════════════════════════════════

/// A target record shape with its documented defaults and rules.
pub trait RecordSchema {
    type Record: Serialize + DeserializeOwned;

    fn name(&self) -> &'static str;

    /// Top-level groups, in merge order.
    fn groups(&self) -> &'static [&'static str];

    /// Registered default for `group`; `None` means the schema is incomplete.
    fn group_default(&self, group: &str) -> Option<Value>;

    /// Known alternate response shapes, tried in order.
    fn variants(&self) -> &'static [ResponseVariant] {
        &[]
    }

    /// JSON pointers of confidence-like integer fields.
    fn confidence_fields(&self) -> &'static [&'static str] {
        &[]
    }

    /// Cross-field consistency rules, applied after merging.
    fn enforce(&self, _record: &mut Self::Record) {}
}

/// A fully-populated record ready for the rendering and cache collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord<T> {
    pub schema: String,
    pub variant: String,
    pub produced_at: DateTime<Utc>,
    pub record: T,
}

// ═══════════════════════════════════════════════════════════
// Normalizer
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct ResponseNormalizer<S> {
    schema: S,
    default_confidence: u32,
}

impl<S: RecordSchema> ResponseNormalizer<S> {
    pub fn new(schema: S) -> Self {
        Self {
            schema,
            default_confidence: DEFAULT_CONFIDENCE,
        }
    }

    pub fn with_default_confidence(mut self, default_confidence: u32) -> Self {
        self.default_confidence = default_confidence.min(MAX_CONFIDENCE);
        self
    }

    pub fn schema(&self) -> &S {
        &self.schema
    }

    pub fn normalize(&self, response: &Value) -> Result<CanonicalRecord<S::Record>, NormalizeError> {
        let schema_name = self.schema.name();
        let (variant, response) = canonicalize(response, self.schema.variants());

        let mut merged = Map::new();
        for &group in self.schema.groups() {
            let Some(default) = self.schema.group_default(group) else {
                tracing::error!(
                    schema = schema_name,
                    group,
                    "No default registered for schema group"
                );
                return Err(NormalizeError::SchemaDefaultMissing {
                    schema: schema_name,
                    group,
                });
            };
            merged.insert(
                group.to_string(),
                merge_with_default(&default, response.get(group)),
            );
        }
        let mut merged = Value::Object(merged);

        // Confidence fields never overlap the fields touched by `enforce`.
        for &pointer in self.schema.confidence_fields() {
            let coerced = coerce_confidence(response.pointer(pointer), self.default_confidence);
            if let Some(slot) = merged.pointer_mut(pointer) {
                *slot = Value::from(coerced);
            }
        }

        let mut record: S::Record =
            serde_json::from_value(merged).map_err(|source| NormalizeError::Shape {
                schema: schema_name,
                source,
            })?;
        self.schema.enforce(&mut record);

        Ok(CanonicalRecord {
            schema: schema_name.to_string(),
            variant: variant.to_string(),
            produced_at: Utc::now(),
            record,
        })
    }

    /// The documented full default: the record produced for an empty response.
    pub fn default_record(&self) -> Result<S::Record, NormalizeError> {
        self.normalize(&Value::Object(Map::new()))
            .map(|canonical| canonical.record)
    }
}
