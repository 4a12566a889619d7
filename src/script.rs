//! Opaque shell-script text for substring membership checks.
//!
//! Deployment and health-check scripts are collaborators outside the
//! document model: they are never parsed or executed, only probed for
//! literal command names (`set -e`, `update-function-code`, `aws s3`).

use serde::{Deserialize, Serialize};

/// The text of one deployment or health-check script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptText {
    name: String,
    text: String,
}

impl ScriptText {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        ScriptText {
            name: name.into(),
            text: text.into(),
        }
    }

    /// The logical script name used in violation messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Exact substring membership.
    pub fn contains(&self, term: &str) -> bool {
        self.text.contains(term)
    }

    /// Case-insensitive substring membership.
    pub fn contains_ci(&self, term: &str) -> bool {
        self.text.to_lowercase().contains(&term.to_lowercase())
    }

    /// Whether any of the terms appears (case-sensitive).
    pub fn contains_any(&self, terms: &[String]) -> bool {
        terms.iter().any(|term| self.contains(term))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPLOY_SNIPPET: &str = r#"#!/bin/bash
set -e

aws s3 cp "$PACKAGE" "s3://$ARTIFACT_BUCKET/$KEY"
aws lambda update-function-code --function-name "$FUNCTION" --s3-key "$KEY"
"#;

    #[test]
    fn test_contains_literal_commands() {
        let script = ScriptText::new("deploy.sh", DEPLOY_SNIPPET);
        assert!(script.contains("set -e"));
        assert!(script.contains("update-function-code"));
        assert!(script.contains("aws s3"));
        assert!(!script.contains("jq"));
    }

    #[test]
    fn test_contains_ci() {
        let script = ScriptText::new("deploy.sh", DEPLOY_SNIPPET);
        assert!(script.contains_ci("AWS S3"));
        assert!(!script.contains_ci("terraform apply"));
    }

    #[test]
    fn test_contains_any() {
        let script = ScriptText::new("deploy.sh", DEPLOY_SNIPPET);
        assert!(script.contains_any(&["s3 cp".to_string(), "s3 sync".to_string()]));
        assert!(!script.contains_any(&["curl".to_string(), "wget".to_string()]));
    }
}
