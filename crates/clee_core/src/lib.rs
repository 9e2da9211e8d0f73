//! Core engine for CLEE, the tablet transliteration workbench.
//! This crate is the single source of truth for closure, layout and
//! reference-resolution rules.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::comment::{CommentId, CommentRecord, NewComment};
pub use model::fact::{Fact, MembershipEdge};
pub use model::sign::{SignEntry, SignId};
pub use model::uid::{ObjectKind, SpanDimension};
pub use repo::comment_repo::{CommentRepository, ObjectMatch, SqliteCommentRepository};
pub use repo::fact_repo::{FactRepository, RepoError, RepoResult, SqliteFactRepository};
pub use repo::sign_repo::{SignRepository, SqliteSignRepository};
pub use service::closure::{compute_closure, AncestorMap, Closure, ClosureEngine};
pub use service::comment_service::{
    CommentOutcome, CommentRequest, CommentService, CommentServiceError,
};
pub use service::describe_service::{DescribeError, DescribeService, DescribeTarget};
pub use service::line_assembler::{LineAssembler, LineRecord};
pub use service::resolver::{Confirmer, EntityResolver, ResolveError, ResolvedLinks};
pub use service::table_renderer::{render_table, RenderOptions};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
