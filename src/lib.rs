// src/lib.rs
pub use engine::{ComplianceEngine, Report, RuleOutcome};
pub use error::ComplianceError;
pub use rules::Catalog;
pub use types::{Outcome, Violation};

pub mod cidr;
pub mod document;
mod engine;
mod error;
pub mod loader;
pub mod manifest;
pub mod naming;
pub mod rules;
pub mod script;
pub mod tfvars;
pub mod types;

#[cfg(test)]
mod tests;
