//! Tagged, unresolved Terraform expression references.
//!
//! An attribute value like `var.log_retention_days` or
//! `aws_kms_key.main.arn` is not evaluated by this crate. It is kept as a
//! tagged reference so rules can match on the tag and name instead of doing
//! substring scans over raw expression text.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumString};

/// The namespace a reference resolves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Var,
    Local,
    Data,
    Module,
    Each,
    Count,
    Path,
    Terraform,
    /// A managed resource reference, e.g. `aws_kms_key.main.arn`. The
    /// resource type is kept in the reference root.
    Resource,
}

/// One unresolved expression reference, e.g. `var.kms_key_arn`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    root: String,
    path: Vec<String>,
}

impl Reference {
    pub fn new(root: impl Into<String>, path: Vec<String>) -> Self {
        Reference {
            root: root.into(),
            path,
        }
    }

    /// The first traversal segment (`var`, `local`, `aws_kms_key`, ...).
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The logical name being referenced: `var.kms_key_arn` -> `kms_key_arn`.
    pub fn name(&self) -> Option<&str> {
        self.path.first().map(String::as_str)
    }

    pub fn kind(&self) -> ReferenceKind {
        ReferenceKind::from_str(&self.root).unwrap_or(ReferenceKind::Resource)
    }

    /// Match against a dotted query such as `var.dynamodb_table_arns`.
    ///
    /// The query matches when it is a prefix of the full dotted form, so
    /// `var.dynamodb_table_arns` matches a reference to
    /// `var.dynamodb_table_arns[0]` or a longer traversal through it.
    pub fn matches(&self, query: &str) -> bool {
        let dotted = self.to_string();
        dotted == query
            || dotted
                .strip_prefix(query)
                .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
    }
}

impl Display for Reference {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.path.is_empty() {
            return write!(f, "{}", self.root);
        }
        write!(f, "{}.{}", self.root, self.path.iter().join("."))
    }
}
