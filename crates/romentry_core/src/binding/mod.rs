//! Control-to-record binding layer.
//!
//! # Responsibility
//! - Build the field registry from control naming conventions.
//! - Convert between native control values and record values.
//! - Compute weight-normalized derived values.
//!
//! # Invariants
//! - Naming rules are data (`registry::PREFIX_RULES`), resolved once per form.
//! - Codec dispatch is static per control type.

pub mod codec;
pub mod derived;
pub mod registry;
