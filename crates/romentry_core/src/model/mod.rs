//! Domain model for the measurement form.
//!
//! # Responsibility
//! - Define record values and the flat record snapshot.
//! - Define toolkit-independent control declarations and native values.
//!
//! # Invariants
//! - Records only ever hold `Value` scalars, never nested data.

pub mod control;
pub mod value;
