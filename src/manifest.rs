//! Per-environment deployment manifests.
//!
//! A manifest is a flat JSON document written by the deployment pipeline
//! (`dynamodb_table_names`, `redis_endpoint`, `api_gateway_stage_invoke_url`,
//! ...). Checks are key-presence only; no schema validation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::ComplianceError;

/// One environment's deployment manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    name: String,
    data: Map<String, JsonValue>,
}

impl Manifest {
    /// Parse from JSON text. The top level must be an object.
    pub fn from_json(name: impl Into<String>, text: &str) -> Result<Self, ComplianceError> {
        let name = name.into();
        let value: JsonValue = serde_json::from_str(text)
            .map_err(|e| ComplianceError::ManifestError(format!("{name}: {e}")))?;
        match value {
            JsonValue::Object(data) => Ok(Manifest { name, data }),
            other => Err(ComplianceError::ManifestError(format!(
                "{name}: expected a JSON object, got {other}"
            ))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.data.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }
}
