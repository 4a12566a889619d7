//! The main compliance engine handle.
//!
//! Holds the injected rule [`Catalog`] and evaluates it against documents,
//! environment variable sets, scripts, and manifests. Every rule is a pure,
//! single-shot evaluation; no failure suppresses evaluation of the others.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::document::Document;
use crate::error::ComplianceError;
use crate::manifest::Manifest;
use crate::rules::{self, Catalog};
use crate::script::ScriptText;
use crate::tfvars::TfVars;
use crate::types::{Outcome, Violation};

/// The result of evaluating one named rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub rule: String,
    pub outcome: Outcome,
}

/// Ordered rule outcomes for one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub outcomes: Vec<RuleOutcome>,
}

impl Report {
    /// Whether no rule produced a hard violation. Advisories and skips do
    /// not affect compliance.
    pub fn is_compliant(&self) -> bool {
        !self.outcomes.iter().any(|o| o.outcome.is_violation())
    }

    /// Every hard violation, in evaluation order.
    pub fn violations(&self) -> Vec<&Violation> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.outcome {
                Outcome::Violation { violation } => Some(violation),
                _ => None,
            })
            .collect()
    }

    /// Record a rule that could not run because its input file is absent.
    pub fn skip(&mut self, rule: impl Into<String>, reason: impl Into<String>) {
        self.outcomes.push(RuleOutcome {
            rule: rule.into(),
            outcome: Outcome::Skipped {
                reason: reason.into(),
            },
        });
    }

    pub fn extend(&mut self, other: Report) {
        self.outcomes.extend(other.outcomes);
    }

    fn push(&mut self, rule: &str, outcome: Outcome) {
        match &outcome {
            Outcome::Pass => debug!(event = "Rule", phase = "Result", rule = rule, result = "pass"),
            Outcome::Skipped { reason } => {
                info!(
                    event = "Rule",
                    phase = "Result",
                    rule = rule,
                    result = "skipped",
                    reason = reason.as_str()
                );
            }
            Outcome::Advisory { violation } => {
                info!(
                    event = "Rule",
                    phase = "Result",
                    rule = rule,
                    result = "advisory",
                    violation = %violation
                );
            }
            Outcome::Violation { violation } => {
                warn!(
                    event = "Rule",
                    phase = "Result",
                    rule = rule,
                    result = "violation",
                    violation = %violation
                );
            }
        }
        self.outcomes.push(RuleOutcome {
            rule: rule.to_string(),
            outcome,
        });
    }

    fn push_violations(&mut self, rule: &str, violations: Vec<Violation>) {
        if violations.is_empty() {
            self.push(rule, Outcome::Pass);
            return;
        }
        for violation in violations {
            self.push(rule, Outcome::Violation { violation });
        }
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.outcome)).count()
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let passed = self.count(|o| matches!(o, Outcome::Pass));
        let violations = self.count(Outcome::is_violation);
        let advisories = self.count(|o| matches!(o, Outcome::Advisory { .. }));
        let skipped = self.count(|o| matches!(o, Outcome::Skipped { .. }));
        write!(
            f,
            "{} rules: {passed} passed, {violations} violations, {advisories} advisories, {skipped} skipped",
            self.outcomes.len()
        )
    }
}

/// The main engine handle. Cheap to clone via its owned catalog.
#[derive(Debug, Clone)]
pub struct ComplianceEngine {
    catalog: Catalog,
}

impl ComplianceEngine {
    pub fn new(catalog: Catalog) -> Self {
        ComplianceEngine { catalog }
    }

    /// Build an engine from a JSON catalog document.
    pub fn from_json(text: &str) -> Result<Self, ComplianceError> {
        Ok(ComplianceEngine::new(Catalog::from_json(text)?))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Evaluate every resource rule (and the required tag set) against one
    /// parsed document.
    pub fn check_document(&self, document: &Document) -> Report {
        let mut report = Report::default();

        for rule in &self.catalog.resource_rules {
            report.push_violations(&rule.id, rules::eval_resource_rule(rule, document));
        }

        if !self.catalog.required_tags.is_empty() {
            report.push_violations(
                "required-tags",
                rules::eval_required_tags(&self.catalog.required_tags, document),
            );
        }

        report
    }

    /// Evaluate the cross-environment differential rules against two
    /// flattened tfvars maps.
    pub fn check_environments(&self, test: &TfVars, production: &TfVars) -> Report {
        let mut report = Report::default();
        for rule in &self.catalog.differential_rules {
            report.push(&rule.id, rules::eval_differential_rule(rule, test, production));
        }
        report
    }

    /// Evaluate the script rules that target this script's logical name.
    pub fn check_script(&self, script: &ScriptText) -> Report {
        let mut report = Report::default();
        for rule in &self.catalog.script_rules {
            if rule.script != script.name() {
                continue;
            }
            report.push_violations(&rule.id, rules::eval_script_rule(rule, script));
        }
        report
    }

    /// Check the deployment manifest for the required keys.
    pub fn check_manifest(&self, manifest: &Manifest) -> Report {
        let mut report = Report::default();
        let violations: Vec<Violation> = self
            .catalog
            .manifest_keys
            .iter()
            .filter(|key| !manifest.has_key(key))
            .map(|key| Violation::MissingKey {
                document: manifest.name().to_string(),
                key: key.clone(),
            })
            .collect();
        report.push_violations("manifest-keys", violations);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_document;
    use crate::types::{AttributeMap, Value};

    const CATALOG: &str = r#"{
        "resource_rules": [
            {
                "id": "dynamodb-tables-exist",
                "block_type": "aws_dynamodb_table",
                "name": "tables",
                "check": { "op": "exists" }
            },
            {
                "id": "dynamodb-pitr-enabled",
                "block_type": "aws_dynamodb_table",
                "check": {
                    "op": "equals",
                    "field": "point_in_time_recovery.0.enabled",
                    "expected": true
                }
            },
            {
                "id": "dynamodb-sse-enabled",
                "block_type": "aws_dynamodb_table",
                "check": {
                    "op": "equals",
                    "field": "server_side_encryption.0.enabled",
                    "expected": true
                }
            },
            {
                "id": "log-group-retention-from-var",
                "block_type": "aws_cloudwatch_log_group",
                "check": {
                    "op": "references",
                    "field": "retention_in_days",
                    "reference": "var.log_retention_days"
                }
            },
            {
                "id": "iam-dynamodb-policies-scoped",
                "kind": "data",
                "block_type": "aws_iam_policy_document",
                "check": {
                    "op": "no_wildcard",
                    "field": "resources",
                    "within": "statement",
                    "forbidden": ["s3:*"]
                }
            }
        ],
        "differential_rules": [
            { "id": "log-retention-shorter-in-test", "key": "log_retention_days", "cmp": "lt" },
            { "id": "vpc-cidr-differs", "key": "vpc_cidr", "cmp": "ne" },
            { "id": "vpc-cidr-disjoint", "key": "vpc_cidr", "cmp": "cidr_disjoint" },
            {
                "id": "api-burst-at-least-rate",
                "key": "api_throttling_burst_limit",
                "other_key": "api_throttling_rate_limit",
                "cmp": "ge",
                "enforce": false
            }
        ],
        "script_rules": [
            {
                "id": "deploy-script-contract",
                "script": "deploy.sh",
                "all_of": ["set -e", "update-function-code"],
                "any_of": ["aws s3", "s3 cp"]
            }
        ],
        "manifest_keys": [
            "dynamodb_table_names",
            "redis_endpoint",
            "timestream_database_name",
            "api_gateway_stage_invoke_url"
        ],
        "required_tags": ["Project", "Environment", "Owner", "CostCenter", "ManagedBy"]
    }"#;

    const COMPLIANT_TF: &str = r#"
resource "aws_dynamodb_table" "tables" {
  for_each     = local.tables
  name         = "${var.project}-${var.environment}-${each.key}"
  billing_mode = "PAY_PER_REQUEST"

  point_in_time_recovery {
    enabled = true
  }

  server_side_encryption {
    enabled     = true
    kms_key_arn = var.kms_key_arn
  }
}

resource "aws_cloudwatch_log_group" "lambda" {
  name              = "/aws/lambda/${var.project}-${var.environment}"
  retention_in_days = var.log_retention_days
}

data "aws_iam_policy_document" "dynamodb_access" {
  statement {
    actions = ["dynamodb:GetItem"]
    resources = [
      var.dynamodb_table_arns,
      "${var.dynamodb_table_arns}/index/*",
    ]
  }
}
"#;

    fn engine() -> ComplianceEngine {
        ComplianceEngine::from_json(CATALOG).unwrap()
    }

    fn tfvars(pairs: &[(&str, Value)]) -> TfVars {
        let mut map = AttributeMap::new();
        for (key, value) in pairs {
            map.insert(key.to_string(), value.clone());
        }
        TfVars::new(map)
    }

    #[test]
    fn test_compliant_document() {
        let document = parse_document(COMPLIANT_TF).unwrap();
        let report = engine().check_document(&document);
        assert!(report.is_compliant(), "unexpected: {report}");
    }

    #[test]
    fn test_pitr_disabled_is_reported() {
        let document = parse_document(
            r#"
resource "aws_dynamodb_table" "tables" {
  point_in_time_recovery {
    enabled = false
  }
  server_side_encryption {
    enabled = true
  }
}
"#,
        )
        .unwrap();
        let report = engine().check_document(&document);
        assert!(!report.is_compliant());
        let violations = report.violations();
        assert!(violations.iter().any(|v| matches!(
            v,
            Violation::UnexpectedValue { resource, field, .. }
                if resource == "aws_dynamodb_table.tables"
                    && field == "point_in_time_recovery.0.enabled"
        )));
    }

    #[test]
    fn test_wildcard_policy_is_reported() {
        let document = parse_document(
            r#"
resource "aws_dynamodb_table" "tables" {
  point_in_time_recovery {
    enabled = true
  }
  server_side_encryption {
    enabled = true
  }
}

data "aws_iam_policy_document" "dynamodb_access" {
  statement {
    resources = ["*"]
  }
}
"#,
        )
        .unwrap();
        let report = engine().check_document(&document);
        assert!(report.violations().iter().any(|v| matches!(
            v,
            Violation::WildcardViolation { .. }
        )));
    }

    #[test]
    fn test_environment_differentiation() {
        let test = tfvars(&[
            ("log_retention_days", Value::Int(30)),
            ("vpc_cidr", Value::String("10.1.0.0/16".to_string())),
            ("api_throttling_burst_limit", Value::Int(20)),
            ("api_throttling_rate_limit", Value::Int(10)),
        ]);
        let production = tfvars(&[
            ("log_retention_days", Value::Int(90)),
            ("vpc_cidr", Value::String("10.2.0.0/16".to_string())),
            ("api_throttling_burst_limit", Value::Int(200)),
            ("api_throttling_rate_limit", Value::Int(100)),
        ]);

        let report = engine().check_environments(&test, &production);
        assert!(report.is_compliant(), "unexpected: {report}");
    }

    #[test]
    fn test_burst_below_rate_surfaces_as_advisory() {
        let test = tfvars(&[
            ("log_retention_days", Value::Int(30)),
            ("vpc_cidr", Value::String("10.1.0.0/16".to_string())),
            ("api_throttling_burst_limit", Value::Int(5)),
            ("api_throttling_rate_limit", Value::Int(100)),
        ]);
        let production = tfvars(&[
            ("log_retention_days", Value::Int(90)),
            ("vpc_cidr", Value::String("10.2.0.0/16".to_string())),
            ("api_throttling_burst_limit", Value::Int(200)),
            ("api_throttling_rate_limit", Value::Int(100)),
        ]);

        let report = engine().check_environments(&test, &production);
        // The burst/rate inversion is reported, but the rule is unenforced
        // and must not fail the report.
        assert!(report.is_compliant(), "unexpected: {report}");
        let outcome = report
            .outcomes
            .iter()
            .find(|o| o.rule == "api-burst-at-least-rate")
            .expect("burst rule evaluated");
        assert!(matches!(outcome.outcome, Outcome::Advisory { .. }));
    }

    #[test]
    fn test_swapped_retention_fails() {
        let test = tfvars(&[
            ("log_retention_days", Value::Int(90)),
            ("vpc_cidr", Value::String("10.1.0.0/16".to_string())),
            ("api_throttling_burst_limit", Value::Int(20)),
            ("api_throttling_rate_limit", Value::Int(10)),
        ]);
        let production = tfvars(&[
            ("log_retention_days", Value::Int(30)),
            ("vpc_cidr", Value::String("10.2.0.0/16".to_string())),
            ("api_throttling_burst_limit", Value::Int(200)),
            ("api_throttling_rate_limit", Value::Int(100)),
        ]);

        let report = engine().check_environments(&test, &production);
        assert!(!report.is_compliant());
        assert_eq!(report.violations().len(), 1);
    }

    #[test]
    fn test_script_contract() {
        let script = ScriptText::new(
            "deploy.sh",
            "#!/bin/bash\nset -e\naws s3 cp pkg.zip s3://bucket/\naws lambda update-function-code\n",
        );
        let report = engine().check_script(&script);
        assert!(report.is_compliant());

        let other = ScriptText::new("health-check.sh", "curl -fsS $URL");
        let report = engine().check_script(&other);
        assert!(report.outcomes.is_empty());
    }

    #[test]
    fn test_manifest_keys() {
        let manifest = Manifest::from_json(
            "deployment-manifest.json",
            r#"{
                "dynamodb_table_names": [],
                "redis_endpoint": "host",
                "timestream_database_name": "db",
                "api_gateway_stage_invoke_url": "https://example"
            }"#,
        )
        .unwrap();
        assert!(engine().check_manifest(&manifest).is_compliant());

        let partial = Manifest::from_json("deployment-manifest.json", r#"{"redis_endpoint": "host"}"#).unwrap();
        let report = engine().check_manifest(&partial);
        assert_eq!(report.violations().len(), 3);
    }

    #[test]
    fn test_skip_is_not_a_violation() {
        let mut report = Report::default();
        report.skip("dynamodb-tables-exist", "modules/dynamodb/main.tf not present");
        assert!(report.is_compliant());
        assert_eq!(report.to_string(), "1 rules: 0 passed, 0 violations, 0 advisories, 1 skipped");
    }

    #[test]
    fn test_report_summary_snapshot() {
        let document = parse_document(COMPLIANT_TF).unwrap();
        let report = engine().check_document(&document);
        insta::assert_snapshot!(
            report.to_string(),
            @"6 rules: 6 passed, 0 violations, 0 advisories, 0 skipped"
        );
    }

    #[test]
    fn test_report_serialization() {
        let mut report = Report::default();
        report.skip("vpc-cidr-differs", "tfvars not present");
        let serialized = serde_json::to_value(&report).unwrap();
        let deserialized: Report = serde_json::from_value(serialized).unwrap();
        assert_eq!(report, deserialized);
    }
}
