//! Flattened environment variable files (`terraform.tfvars`).

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::types::{AttributeMap, Value};

/// A flat name -> value mapping loaded from a tfvars file.
///
/// Values are stored in scalar access mode: a single-element sequence
/// standing in for a scalar is unwrapped at load time, so typed getters see
/// plain scalars.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TfVars {
    vars: AttributeMap,
}

impl TfVars {
    pub fn new(vars: AttributeMap) -> Self {
        let vars = vars
            .into_iter()
            .map(|(name, value)| {
                let value = value.as_scalar().clone();
                (name, value)
            })
            .collect();
        TfVars { vars }
    }

    pub fn from_document(document: &Document) -> Self {
        TfVars::new(document.attrs().clone())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.vars.iter()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
