//! Data model types for normalized documents and rule outcomes.
//!
//! The normalizer converts HCL into these shapes:
//! - attribute values become [`Value`] (explicit scalar / sequence / mapping)
//! - unresolved expressions become tagged [`Reference`]s, never raw text
//! - nested blocks become sequences of mappings, indexed explicitly

mod block;
mod reference;
mod value;
mod violation;

pub use block::BlockKind;
pub use reference::{Reference, ReferenceKind};
pub use value::{AttributeMap, Template, Value};
pub use violation::{Outcome, Violation};
