//! Violation and outcome types produced by rule evaluation.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// A single configuration defect, qualified with enough context to locate
/// it in the HCL source without re-running the parser interactively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    MissingResource {
        block_type: String,
        name: String,
    },
    MissingAttribute {
        resource: String,
        field: String,
    },
    UnexpectedValue {
        resource: String,
        field: String,
        actual: String,
        expected: String,
    },
    WildcardViolation {
        policy: String,
        field: String,
        detail: String,
    },
    DifferentialViolation {
        key: String,
        test: String,
        production: String,
        expected: String,
    },
    MissingKey {
        document: String,
        key: String,
    },
    MissingCommand {
        script: String,
        command: String,
    },
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Violation::MissingResource { block_type, name } => {
                write!(f, "{block_type}.{name} is not defined")
            }
            Violation::MissingAttribute { resource, field } => {
                write!(f, "{resource} is missing attribute '{field}'")
            }
            Violation::UnexpectedValue {
                resource,
                field,
                actual,
                expected,
            } => write!(
                f,
                "{resource}.{field} is {actual}, expected {expected}"
            ),
            Violation::WildcardViolation {
                policy,
                field,
                detail,
            } => write!(
                f,
                "{policy}.{field} grants unscoped access: {detail}"
            ),
            Violation::DifferentialViolation {
                key,
                test,
                production,
                expected,
            } => write!(
                f,
                "'{key}' violates environment differentiation: test={test}, production={production}, expected test {expected} production"
            ),
            Violation::MissingKey { document, key } => {
                write!(f, "{document} is missing key '{key}'")
            }
            Violation::MissingCommand { script, command } => {
                write!(f, "{script} does not invoke '{command}'")
            }
        }
    }
}

/// The result of evaluating one rule.
///
/// `Advisory` marks rules whose enforcement is known to be vacuous in the
/// source configuration suite and is carried as reporting-only pending
/// clarification of intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    Skipped { reason: String },
    Advisory { violation: Violation },
    Violation { violation: Violation },
}

impl Outcome {
    pub fn is_violation(&self) -> bool {
        matches!(self, Outcome::Violation { .. })
    }
}
