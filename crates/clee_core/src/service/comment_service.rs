//! Comment use-case service.
//!
//! # Responsibility
//! - Validate comment input and explicit links.
//! - Run entity resolution, then persist the comment with confirmed links.
//!
//! # Invariants
//! - Nothing is written unless resolution succeeds; the insert itself is a
//!   single immediate transaction.
//! - Empty comment text is rejected before any question is asked.

use crate::model::comment::{CommentId, CommentRecord, NewComment};
use crate::model::sign::SignId;
use crate::repo::comment_repo::{CommentRepository, ObjectMatch};
use crate::repo::fact_repo::{FactRepository, RepoError};
use crate::repo::sign_repo::SignRepository;
use crate::service::resolver::{
    Confirmer, EntityResolver, ResolveError, ResolveRequest, ResolvedLinks,
};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for comment use-cases.
#[derive(Debug)]
pub enum CommentServiceError {
    EmptyComment,
    Resolve(ResolveError),
    Repo(RepoError),
}

impl CommentServiceError {
    /// Whether the operator declined a required confirmation.
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Resolve(ResolveError::Aborted))
    }
}

impl Display for CommentServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyComment => write!(f, "empty comment"),
            Self::Resolve(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CommentServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::EmptyComment => None,
            Self::Resolve(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<ResolveError> for CommentServiceError {
    fn from(value: ResolveError) -> Self {
        match value {
            ResolveError::Repo(err) => Self::Repo(err),
            other => Self::Resolve(other),
        }
    }
}

impl From<RepoError> for CommentServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Comment text plus operator-supplied links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentRequest {
    pub body: String,
    /// Object identifiers, matched case-insensitively.
    pub explicit_objects: Vec<String>,
    /// Catalog sign names.
    pub explicit_signs: Vec<String>,
}

/// Result of a recorded comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentOutcome {
    pub comment_id: CommentId,
    pub links: ResolvedLinks,
}

/// Comment service facade over repository implementations.
pub struct CommentService<F: FactRepository, S: SignRepository, C: CommentRepository> {
    resolver: EntityResolver<F, S>,
    comments: C,
}

impl<F, S, C> CommentService<F, S, C>
where
    F: FactRepository,
    S: SignRepository,
    C: CommentRepository,
{
    pub fn new(facts: F, signs: S, comments: C) -> Self {
        Self {
            resolver: EntityResolver::new(facts, signs),
            comments,
        }
    }

    /// Resolves links for `request`, confirms them through `confirmer` and
    /// stores the comment.
    pub fn add_comment(
        &self,
        request: &CommentRequest,
        confirmer: &mut dyn Confirmer,
    ) -> Result<CommentOutcome, CommentServiceError> {
        let body = request.body.trim();
        if body.is_empty() {
            return Err(CommentServiceError::EmptyComment);
        }

        let links = self.resolver.resolve(
            ResolveRequest {
                text: body,
                explicit_objects: &request.explicit_objects,
                explicit_signs: &request.explicit_signs,
            },
            confirmer,
        )?;

        let comment = NewComment {
            body: body.to_string(),
            object_uids: links.object_uids.clone(),
            sign_ids: links.sign_ids.clone(),
        };
        let comment_id = self.comments.insert_comment(&comment).map_err(|err| {
            error!("event=comment_insert module=comment status=error error={err}");
            err
        })?;
        info!(
            "event=comment_insert module=comment status=ok comment_id={} objects={} signs={}",
            comment_id,
            comment.object_uids.len(),
            comment.sign_ids.len()
        );

        Ok(CommentOutcome { comment_id, links })
    }

    /// Comments linked to `uid` or anything under it.
    pub fn comments_in_scope(&self, uid: &str) -> Result<Vec<CommentRecord>, CommentServiceError> {
        Ok(self.comments.comments_for_object(uid, ObjectMatch::Scope)?)
    }

    pub fn comments_for_object(&self, uid: &str) -> Result<Vec<CommentRecord>, CommentServiceError> {
        Ok(self.comments.comments_for_object(uid, ObjectMatch::Exact)?)
    }

    pub fn comments_for_sign(&self, sign_id: SignId) -> Result<Vec<CommentRecord>, CommentServiceError> {
        Ok(self.comments.comments_for_sign(sign_id)?)
    }
}
