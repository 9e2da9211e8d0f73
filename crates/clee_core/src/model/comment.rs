//! Comment read/write models.

use crate::model::sign::SignId;
use serde::{Deserialize, Serialize};

/// Stable comment row identifier.
pub type CommentId = i64;

/// Comment as read back with its links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub comment_id: CommentId,
    pub body: String,
    /// Linked object UIDs in link order.
    pub object_uids: Vec<String>,
    /// Catalog names of linked signs.
    pub sign_names: Vec<String>,
}

/// Comment insert request; links must already be confirmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewComment {
    pub body: String,
    pub object_uids: Vec<String>,
    pub sign_ids: Vec<SignId>,
}
