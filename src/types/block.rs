//! Top-level HCL block kinds recognized by the normalizer.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// The kind of a top-level Terraform block.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Resource,
    Data,
    Locals,
    Variable,
    Output,
    Provider,
    Terraform,
    Module,
}

impl BlockKind {
    /// How many labels a well-formed block of this kind carries.
    pub fn label_count(&self) -> usize {
        match self {
            BlockKind::Resource | BlockKind::Data => 2,
            BlockKind::Variable | BlockKind::Output | BlockKind::Provider | BlockKind::Module => 1,
            BlockKind::Locals | BlockKind::Terraform => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use yare::parameterized;

    #[parameterized(
        resource = { "resource", BlockKind::Resource, 2 },
        data = { "data", BlockKind::Data, 2 },
        locals = { "locals", BlockKind::Locals, 0 },
        variable = { "variable", BlockKind::Variable, 1 },
        output = { "output", BlockKind::Output, 1 },
        provider = { "provider", BlockKind::Provider, 1 },
    )]
    fn test_block_kind_from_str(ident: &str, expected: BlockKind, labels: usize) {
        let kind = BlockKind::from_str(ident).unwrap();
        assert_eq!(kind, expected);
        assert_eq!(kind.label_count(), labels);
        assert_eq!(kind.to_string(), ident);
    }

    #[test]
    fn test_unknown_block_kind_is_rejected() {
        assert!(BlockKind::from_str("moved").is_err());
    }
}
