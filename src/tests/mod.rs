//! Crate-level property tests.

mod properties;
