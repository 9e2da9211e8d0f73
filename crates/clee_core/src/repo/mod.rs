//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define lookup contracts over facts, the sign catalog and comments.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Facts and catalog rows are read-only for services.
//! - The comment insert is the only write reachable from services.

pub mod comment_repo;
pub mod fact_repo;
pub mod sign_repo;
