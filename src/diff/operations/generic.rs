//! Operations whose SQL shape is uniform across object kinds: ownership
//! changes, renames and comments.

use crate::catalog::id::DbObjectId;

/// `ALTER <object_type> <identifier> OWNER TO <owner>;`
#[derive(Debug, Clone)]
pub struct OwnerOperation {
    /// SQL noun, e.g. "TABLE", "MATERIALIZED VIEW".
    pub object_type: String,
    /// Fully quoted identifier, including argument lists for functions.
    pub identifier: String,
    pub owner: String,
    pub object_id: DbObjectId,
}

/// `ALTER <object_type> <old_identifier> RENAME TO <new_name>;`
///
/// Carries the renamed object's *new* key so dependents of the new name
/// order after the rename.
#[derive(Debug, Clone)]
pub struct RenameOperation {
    pub object_type: String,
    pub old_identifier: String,
    pub new_name: String,
    pub object_id: DbObjectId,
}

/// `COMMENT ON <object_type> <identifier> IS <text | NULL>;`
#[derive(Debug, Clone)]
pub struct CommentStep {
    pub object_type: String,
    pub identifier: String,
    /// None clears the comment.
    pub comment: Option<String>,
    /// The commented object; the step's own id wraps this in Comment{}.
    pub object_id: DbObjectId,
}
