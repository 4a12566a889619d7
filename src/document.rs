//! Parsed Terraform documents and the shape normalizer.
//!
//! A [`Document`] keeps the top-level block groups in file order. The
//! extraction methods merge every group of a given kind/type into one flat
//! name -> attributes mapping, last-write-wins on name collision. Absence of
//! a kind or type yields an empty mapping; whether that is acceptable is a
//! rule-level concern, not a parse-level one.

use std::str::FromStr;

use hcl_edit::structure::{Block, BlockLabel, Body, Structure};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{AttributeMap, BlockKind, Value};

/// One top-level block as parsed, prior to normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockGroup {
    pub kind: BlockKind,
    pub labels: Vec<String>,
    pub attrs: AttributeMap,
}

/// An ordered sequence of top-level block groups from one HCL file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    groups: Vec<BlockGroup>,
    /// Top-level attribute assignments (tfvars-style files).
    attrs: AttributeMap,
}

impl Document {
    pub(crate) fn from_body(body: &Body) -> Self {
        let mut groups = Vec::new();
        let mut attrs = AttributeMap::new();

        for structure in body.iter() {
            match structure {
                Structure::Attribute(attribute) => {
                    attrs.insert(
                        attribute.key.as_str().to_string(),
                        Value::from_expr(&attribute.value),
                    );
                }
                Structure::Block(block) => match BlockKind::from_str(block.ident.as_str()) {
                    Ok(kind) => groups.push(BlockGroup {
                        kind,
                        labels: block_labels(block),
                        attrs: body_to_map(&block.body),
                    }),
                    Err(_) => {
                        debug!(
                            event = "Parse",
                            phase = "Normalize",
                            ident = block.ident.as_str(),
                            "skipping unrecognized top-level block"
                        );
                    }
                },
            }
        }

        Document { groups, attrs }
    }

    /// The raw block groups, in file order.
    pub fn groups(&self) -> &[BlockGroup] {
        &self.groups
    }

    /// Top-level attribute assignments (empty for ordinary `.tf` files).
    pub fn attrs(&self) -> &AttributeMap {
        &self.attrs
    }

    /// All `resource` blocks of one type, merged into name -> attributes.
    pub fn resources(&self, resource_type: &str) -> AttributeMap {
        self.typed_blocks(BlockKind::Resource, resource_type)
    }

    /// All `data` blocks of one type, merged into name -> attributes.
    pub fn data_sources(&self, data_type: &str) -> AttributeMap {
        self.typed_blocks(BlockKind::Data, data_type)
    }

    /// Every `locals` block merged into one flat mapping.
    pub fn locals(&self) -> AttributeMap {
        let mut merged = AttributeMap::new();
        for group in self.groups_of(BlockKind::Locals) {
            for (name, value) in &group.attrs {
                merged.insert(name.clone(), value.clone());
            }
        }
        merged
    }

    /// Every `variable` block merged into name -> attributes.
    pub fn variables(&self) -> AttributeMap {
        self.labeled_blocks(BlockKind::Variable)
    }

    /// Every `output` block merged into name -> attributes.
    pub fn outputs(&self) -> AttributeMap {
        self.labeled_blocks(BlockKind::Output)
    }

    /// Every `provider` block merged into name -> attributes.
    pub fn providers(&self) -> AttributeMap {
        self.labeled_blocks(BlockKind::Provider)
    }

    /// Extract the normalized mapping for a (kind, type) pair.
    ///
    /// For `resource` and `data`, `block_type` selects the resource type
    /// (e.g. `aws_dynamodb_table`). Single-label and label-free kinds ignore
    /// it. The document is never mutated; extracting twice yields
    /// structurally equal results.
    pub fn extract(&self, kind: BlockKind, block_type: &str) -> AttributeMap {
        match kind {
            BlockKind::Resource | BlockKind::Data => self.typed_blocks(kind, block_type),
            BlockKind::Locals | BlockKind::Terraform => {
                let mut merged = AttributeMap::new();
                for group in self.groups_of(kind) {
                    for (name, value) in &group.attrs {
                        merged.insert(name.clone(), value.clone());
                    }
                }
                merged
            }
            BlockKind::Variable | BlockKind::Output | BlockKind::Provider | BlockKind::Module => {
                self.labeled_blocks(kind)
            }
        }
    }

    fn groups_of(&self, kind: BlockKind) -> impl Iterator<Item = &BlockGroup> {
        self.groups.iter().filter(move |group| group.kind == kind)
    }

    fn typed_blocks(&self, kind: BlockKind, block_type: &str) -> AttributeMap {
        let mut merged = AttributeMap::new();
        for group in self.groups_of(kind) {
            let [first, second] = group.labels.as_slice() else {
                continue;
            };
            if first != block_type {
                continue;
            }
            merged.insert(second.clone(), Value::Mapping(group.attrs.clone()));
        }
        merged
    }

    fn labeled_blocks(&self, kind: BlockKind) -> AttributeMap {
        let mut merged = AttributeMap::new();
        for group in self.groups_of(kind) {
            let Some(name) = group.labels.first() else {
                continue;
            };
            merged.insert(name.clone(), Value::Mapping(group.attrs.clone()));
        }
        merged
    }
}

/// Convenience wrapper over [`Document::extract`].
pub fn extract(document: &Document, kind: BlockKind, block_type: &str) -> AttributeMap {
    document.extract(kind, block_type)
}

fn block_labels(block: &Block) -> Vec<String> {
    block
        .labels
        .iter()
        .map(|label| match label {
            BlockLabel::String(literal) => literal.value().to_string(),
            BlockLabel::Ident(ident) => ident.as_str().to_string(),
        })
        .collect()
}

/// Flatten a block body into an attribute mapping.
///
/// Attributes map directly; nested blocks accumulate under their identifier
/// as a sequence of mappings (so `point_in_time_recovery { enabled = true }`
/// reads back as `point_in_time_recovery[0].enabled`). Labeled nested blocks
/// (e.g. `dynamic "tag"`) nest one mapping level per label.
fn body_to_map(body: &Body) -> AttributeMap {
    let mut map = AttributeMap::new();

    for structure in body.iter() {
        match structure {
            Structure::Attribute(attribute) => {
                map.insert(
                    attribute.key.as_str().to_string(),
                    Value::from_expr(&attribute.value),
                );
            }
            Structure::Block(block) => {
                let mut entry = Value::Mapping(body_to_map(&block.body));
                for label in block_labels(block).into_iter().rev() {
                    let mut wrapper = AttributeMap::new();
                    wrapper.insert(label, entry);
                    entry = Value::Mapping(wrapper);
                }

                match map.get_mut(block.ident.as_str()) {
                    Some(Value::Sequence(existing)) => existing.push(entry),
                    _ => {
                        map.insert(
                            block.ident.as_str().to_string(),
                            Value::Sequence(vec![entry]),
                        );
                    }
                }
            }
        }
    }

    map
}
