//! The compliance rule catalog and per-rule evaluation.
//!
//! Expectations are not hardcoded next to the checks: they arrive as a
//! serde-loaded [`Catalog`] document injected into the engine, so the
//! expected tables, buckets, references and thresholds are first-class,
//! versioned inputs.

use serde::{Deserialize, Serialize};
use strum_macros::Display as StrumDisplay;
use tracing::debug;

use crate::cidr::Cidr;
use crate::document::Document;
use crate::error::ComplianceError;
use crate::script::ScriptText;
use crate::tfvars::TfVars;
use crate::types::{BlockKind, Outcome, Value, Violation};

/// The full set of expectations for one deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub resource_rules: Vec<ResourceRule>,
    #[serde(default)]
    pub differential_rules: Vec<DifferentialRule>,
    #[serde(default)]
    pub script_rules: Vec<ScriptRule>,
    #[serde(default)]
    pub manifest_keys: Vec<String>,
    #[serde(default)]
    pub required_tags: Vec<String>,
}

impl Catalog {
    pub fn from_json(text: &str) -> Result<Self, ComplianceError> {
        Ok(serde_json::from_str(text)?)
    }

    /// The expectation catalog shipped with the crate, covering the trading
    /// platform's tables, topics, buckets, functions, secrets, dashboards,
    /// alarms and environment differentiation rules. Deployments override it
    /// by loading their own document.
    pub fn builtin() -> Result<Self, ComplianceError> {
        Catalog::from_json(include_str!("../data/catalog.json"))
    }
}

/// A predicate over one extracted (kind, type) mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRule {
    pub id: String,
    #[serde(default = "default_kind")]
    pub kind: BlockKind,
    /// Resource/data type, e.g. `aws_dynamodb_table`. Ignored for kinds
    /// that carry no type label (`locals`, `variable`, ...).
    #[serde(default)]
    pub block_type: String,
    /// Logical name to check. `None` applies the check to every extracted
    /// entry (and, for `exists`, requires at least one).
    #[serde(default)]
    pub name: Option<String>,
    pub check: Check,
}

fn default_kind() -> BlockKind {
    BlockKind::Resource
}

/// The check applied to each targeted entry.
///
/// `field` is a dotted path into the entry's attributes; numeric segments
/// index into nested-block sequences, so `point_in_time_recovery.0.enabled`
/// reaches inside the first `point_in_time_recovery` block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Check {
    Exists,
    HasAttribute {
        field: String,
    },
    Equals {
        field: String,
        expected: serde_json::Value,
    },
    References {
        field: String,
        reference: String,
    },
    /// The one rule family with a real security invariant: a policy
    /// statement's resource list must not collapse to `"*"` or carry a
    /// service-wide wildcard, and may be required to go through a tagged
    /// variable reference instead.
    NoWildcard {
        field: String,
        /// Nested block holding the statements, e.g. `statement`.
        #[serde(default)]
        within: Option<String>,
        /// Service-wide wildcard fragments, e.g. `s3:*`.
        #[serde(default)]
        forbidden: Vec<String>,
        #[serde(default)]
        must_reference: Option<String>,
    },
}

/// Ordering or inequality between homologous keys of two environments, or,
/// when `other_key` is set, between two keys inside each environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifferentialRule {
    pub id: String,
    pub key: String,
    /// When set, `key cmp other_key` is checked within the test and the
    /// production maps separately instead of comparing `key` across them.
    #[serde(default)]
    pub other_key: Option<String>,
    pub cmp: Comparison,
    /// Rules whose enforcement is known to be vacuous in the source suite
    /// stay advisory until their intent is clarified.
    #[serde(default = "default_true")]
    pub enforce: bool,
}

fn default_true() -> bool {
    true
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, StrumDisplay,
)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "disjoint from")]
    CidrDisjoint,
}

/// Literal command/substring requirements against one script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptRule {
    pub id: String,
    /// Logical script name this rule applies to, e.g. `deploy.sh`.
    pub script: String,
    /// Every term must appear.
    #[serde(default)]
    pub all_of: Vec<String>,
    /// At least one term must appear.
    #[serde(default)]
    pub any_of: Vec<String>,
}

/// Dotted-path lookup into an entry's attributes. Numeric segments index
/// into sequences (the explicit one-level-indexed access mode).
pub(crate) fn lookup_path<'a>(attrs: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = attrs;
    for segment in path.split('.') {
        current = match segment.parse::<usize>() {
            Ok(idx) => current.index(idx)?,
            Err(_) => current.get(segment)?,
        };
    }
    Some(current)
}

/// Evaluate one resource rule against a document. Empty result means pass.
pub fn eval_resource_rule(rule: &ResourceRule, document: &Document) -> Vec<Violation> {
    let extracted = document.extract(rule.kind, &rule.block_type);
    let type_label = if rule.block_type.is_empty() {
        rule.kind.to_string()
    } else {
        rule.block_type.clone()
    };

    debug!(
        event = "Rule",
        phase = "Evaluate",
        rule = rule.id.as_str(),
        kind = %rule.kind,
        block_type = type_label.as_str(),
        entries = extracted.len()
    );

    let mut violations = Vec::new();

    match &rule.name {
        Some(name) => match extracted.get(name) {
            Some(entry) => {
                check_entry(&rule.check, &type_label, name, entry, &mut violations);
            }
            None => violations.push(Violation::MissingResource {
                block_type: type_label,
                name: name.clone(),
            }),
        },
        None => {
            if extracted.is_empty() && matches!(rule.check, Check::Exists) {
                violations.push(Violation::MissingResource {
                    block_type: type_label.clone(),
                    name: "*".to_string(),
                });
            }
            for (name, entry) in &extracted {
                check_entry(&rule.check, &type_label, name, entry, &mut violations);
            }
        }
    }

    violations
}

fn check_entry(
    check: &Check,
    type_label: &str,
    name: &str,
    entry: &Value,
    violations: &mut Vec<Violation>,
) {
    let resource = format!("{type_label}.{name}");

    match check {
        Check::Exists => {}
        Check::HasAttribute { field } => {
            if lookup_path(entry, field).is_none() {
                violations.push(Violation::MissingAttribute {
                    resource,
                    field: field.clone(),
                });
            }
        }
        Check::Equals { field, expected } => match lookup_path(entry, field) {
            None => violations.push(Violation::MissingAttribute {
                resource,
                field: field.clone(),
            }),
            Some(actual) => {
                if !actual.matches_json(expected) {
                    violations.push(Violation::UnexpectedValue {
                        resource,
                        field: field.clone(),
                        actual: actual.to_string(),
                        expected: expected.to_string(),
                    });
                }
            }
        },
        Check::References { field, reference } => match lookup_path(entry, field) {
            None => violations.push(Violation::MissingAttribute {
                resource,
                field: field.clone(),
            }),
            Some(actual) => {
                if !actual.references(reference) {
                    violations.push(Violation::UnexpectedValue {
                        resource,
                        field: field.clone(),
                        actual: actual.to_string(),
                        expected: format!("a reference to {reference}"),
                    });
                }
            }
        },
        Check::NoWildcard {
            field,
            within,
            forbidden,
            must_reference,
        } => {
            let scopes: Vec<&Value> = match within {
                Some(block) => entry
                    .get(block)
                    .and_then(Value::as_sequence)
                    .map(|items| items.iter().collect())
                    .unwrap_or_default(),
                None => vec![entry],
            };
            for scope in scopes {
                check_wildcard(
                    &resource,
                    field,
                    forbidden,
                    must_reference.as_deref(),
                    scope,
                    violations,
                );
            }
        }
    }
}

fn check_wildcard(
    resource: &str,
    field: &str,
    forbidden: &[String],
    must_reference: Option<&str>,
    scope: &Value,
    violations: &mut Vec<Violation>,
) {
    let Some(value) = scope.get(field) else {
        violations.push(Violation::MissingAttribute {
            resource: resource.to_string(),
            field: field.to_string(),
        });
        return;
    };

    let elements: Vec<&Value> = match value.as_sequence() {
        Some(items) => items.iter().collect(),
        None => vec![value],
    };

    for element in &elements {
        if element.is_wildcard() {
            violations.push(Violation::WildcardViolation {
                policy: resource.to_string(),
                field: field.to_string(),
                detail: "resource list collapses to the literal wildcard \"*\"".to_string(),
            });
            continue;
        }
        let text = match element {
            Value::String(s) => Some(s.as_str()),
            Value::Template(t) => Some(t.raw.as_str()),
            _ => None,
        };
        if let Some(text) = text {
            let lowered = text.to_lowercase();
            for pattern in forbidden {
                if lowered.contains(&pattern.to_lowercase()) {
                    violations.push(Violation::WildcardViolation {
                        policy: resource.to_string(),
                        field: field.to_string(),
                        detail: format!("service-wide wildcard '{pattern}' in {text:?}"),
                    });
                }
            }
        }
    }

    // A scoped ARN list via variable interpolation is compliant even though
    // the runtime value is never evaluated.
    if let Some(reference) = must_reference {
        if !value.references(reference) {
            violations.push(Violation::UnexpectedValue {
                resource: resource.to_string(),
                field: field.to_string(),
                actual: value.to_string(),
                expected: format!("a reference to {reference}"),
            });
        }
    }
}

/// Evaluate one cross-environment differential rule.
pub fn eval_differential_rule(
    rule: &DifferentialRule,
    test: &TfVars,
    production: &TfVars,
) -> Outcome {
    let violation = differential_violation(rule, test, production);

    match violation {
        None => Outcome::Pass,
        Some(violation) if rule.enforce => Outcome::Violation { violation },
        Some(violation) => Outcome::Advisory { violation },
    }
}

fn differential_violation(
    rule: &DifferentialRule,
    test: &TfVars,
    production: &TfVars,
) -> Option<Violation> {
    if let Some(other_key) = &rule.other_key {
        return [("test", test), ("production", production)]
            .into_iter()
            .find_map(|(environment, vars)| {
                intra_environment_violation(rule, other_key, environment, vars)
            });
    }

    let Some(test_value) = test.get(&rule.key) else {
        return Some(Violation::MissingKey {
            document: "test tfvars".to_string(),
            key: rule.key.clone(),
        });
    };
    let Some(prod_value) = production.get(&rule.key) else {
        return Some(Violation::MissingKey {
            document: "production tfvars".to_string(),
            key: rule.key.clone(),
        });
    };

    match comparison_failed(rule.cmp, test_value, prod_value) {
        None => Some(Violation::UnexpectedValue {
            resource: "tfvars".to_string(),
            field: rule.key.clone(),
            actual: format!("{test_value} / {prod_value}"),
            expected: "numeric values in both environments".to_string(),
        }),
        Some(false) => None,
        Some(true) => Some(Violation::DifferentialViolation {
            key: rule.key.clone(),
            test: test_value.to_string(),
            production: prod_value.to_string(),
            expected: rule.cmp.to_string(),
        }),
    }
}

/// Check `key cmp other_key` inside one environment's variable map.
fn intra_environment_violation(
    rule: &DifferentialRule,
    other_key: &str,
    environment: &str,
    vars: &TfVars,
) -> Option<Violation> {
    let document = format!("{environment} tfvars");
    let Some(lhs) = vars.get(&rule.key) else {
        return Some(Violation::MissingKey {
            document,
            key: rule.key.clone(),
        });
    };
    let Some(rhs) = vars.get(other_key) else {
        return Some(Violation::MissingKey {
            document,
            key: other_key.to_string(),
        });
    };

    match comparison_failed(rule.cmp, lhs, rhs) {
        None => Some(Violation::UnexpectedValue {
            resource: document,
            field: rule.key.clone(),
            actual: format!("{lhs} / {rhs}"),
            expected: "numeric values for both keys".to_string(),
        }),
        Some(false) => None,
        Some(true) => Some(Violation::UnexpectedValue {
            resource: document,
            field: rule.key.clone(),
            actual: lhs.to_string(),
            expected: format!("{} {other_key} ({rhs})", rule.cmp),
        }),
    }
}

/// Whether `lhs cmp rhs` fails. `None` means a numeric comparison was asked
/// of non-numeric values.
fn comparison_failed(cmp: Comparison, lhs: &Value, rhs: &Value) -> Option<bool> {
    match cmp {
        Comparison::Ne => Some(lhs == rhs),
        Comparison::CidrDisjoint => {
            let parsed = lhs
                .as_str()
                .and_then(|s| s.parse::<Cidr>().ok())
                .zip(rhs.as_str().and_then(|s| s.parse::<Cidr>().ok()));
            Some(match parsed {
                Some((a, b)) => a == b || a.overlaps(&b),
                None => true,
            })
        }
        Comparison::Lt | Comparison::Le | Comparison::Ge => {
            let (a, b) = (lhs.as_f64()?, rhs.as_f64()?);
            Some(match cmp {
                Comparison::Lt => !(a < b),
                Comparison::Le => !(a <= b),
                Comparison::Ge => !(a >= b),
                _ => unreachable!(),
            })
        }
    }
}

/// Evaluate one script rule. Empty result means pass.
pub fn eval_script_rule(rule: &ScriptRule, script: &ScriptText) -> Vec<Violation> {
    let mut violations = Vec::new();

    for term in &rule.all_of {
        if !script.contains(term) {
            violations.push(Violation::MissingCommand {
                script: script.name().to_string(),
                command: term.clone(),
            });
        }
    }

    if !rule.any_of.is_empty() && !script.contains_any(&rule.any_of) {
        violations.push(Violation::MissingCommand {
            script: script.name().to_string(),
            command: rule.any_of.join(" | "),
        });
    }

    violations
}

/// Check the provider-level default tags against the required tag set.
///
/// Documents without provider blocks are not tag-bearing and produce no
/// violations.
pub fn eval_required_tags(required: &[String], document: &Document) -> Vec<Violation> {
    let providers = document.providers();
    let mut violations = Vec::new();

    for (name, attrs) in &providers {
        let resource = format!("provider.{name}");
        let tags = lookup_path(attrs, "default_tags.0.tags");
        match tags {
            None => violations.push(Violation::MissingAttribute {
                resource,
                field: "default_tags".to_string(),
            }),
            Some(tags) => {
                for tag in required {
                    if tags.get(tag).is_none() {
                        violations.push(Violation::MissingAttribute {
                            resource: resource.clone(),
                            field: format!("default_tags.tags.{tag}"),
                        });
                    }
                }
            }
        }
    }

    violations
}
