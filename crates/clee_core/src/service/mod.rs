//! Core use-case services.
//!
//! # Responsibility
//! - Derive closures, line records and tables from repository lookups.
//! - Orchestrate entity resolution and the comment write.
//! - Keep CLI layers decoupled from storage details.

pub mod closure;
pub mod comment_service;
pub mod describe_service;
pub mod line_assembler;
pub mod resolver;
pub mod table_renderer;
