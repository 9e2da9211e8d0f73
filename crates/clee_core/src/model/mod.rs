//! Domain model for tablets, structural spans, catalog signs and comments.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep identifier-shape rules (UID grammar, sign names) in one place.
//!
//! # Invariants
//! - Every object is identified by an immutable hierarchical UID string.
//! - Containment is given by `child` facts, never inferred from UID prefixes.

pub mod comment;
pub mod fact;
pub mod sign;
pub mod uid;
