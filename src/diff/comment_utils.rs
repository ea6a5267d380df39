//! Shared helpers for comment and ownership deltas.

use crate::catalog::id::DbObjectId;
use crate::diff::operations::{CommentStep, MigrationStep, OwnerOperation};

/// Emit a comment step when the description changed, including transitions
/// to and from empty (cleared with IS NULL).
pub fn diff_comment(
    object_type: &str,
    identifier: &str,
    object_id: DbObjectId,
    old: &Option<String>,
    new: &Option<String>,
) -> Option<MigrationStep> {
    if old == new {
        return None;
    }
    Some(MigrationStep::Comment(CommentStep {
        object_type: object_type.to_string(),
        identifier: identifier.to_string(),
        comment: new.clone(),
        object_id,
    }))
}

/// Comment step for a freshly created object, if it has one.
pub fn comment_on_create(
    object_type: &str,
    identifier: &str,
    object_id: DbObjectId,
    comment: &Option<String>,
) -> Option<MigrationStep> {
    comment.as_ref().map(|comment| {
        MigrationStep::Comment(CommentStep {
            object_type: object_type.to_string(),
            identifier: identifier.to_string(),
            comment: Some(comment.clone()),
            object_id,
        })
    })
}

/// Emit an ownership step when the owner changed (or was just declared on
/// the desired side).
pub fn diff_owner(
    object_type: &str,
    identifier: &str,
    object_id: DbObjectId,
    old: &Option<String>,
    new: &Option<String>,
) -> Option<MigrationStep> {
    match (old, new) {
        (old, Some(new_owner)) if old.as_ref() != Some(new_owner) => {
            Some(MigrationStep::Owner(OwnerOperation {
                object_type: object_type.to_string(),
                identifier: identifier.to_string(),
                owner: new_owner.clone(),
                object_id,
            }))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_id() -> DbObjectId {
        DbObjectId::Table {
            schema: "public".into(),
            name: "t".into(),
        }
    }

    #[test]
    fn test_comment_set_and_clear() {
        let set = diff_comment("TABLE", "t", table_id(), &None, &Some("hi".into()));
        assert!(set.is_some());

        let clear = diff_comment("TABLE", "t", table_id(), &Some("hi".into()), &None);
        match clear {
            Some(MigrationStep::Comment(step)) => assert!(step.comment.is_none()),
            _ => panic!("expected comment step"),
        }

        assert!(diff_comment("TABLE", "t", table_id(), &None, &None).is_none());
    }

    #[test]
    fn test_owner_unchanged_is_silent() {
        let owner = Some("alice".to_string());
        assert!(diff_owner("TABLE", "t", table_id(), &owner, &owner).is_none());
        assert!(diff_owner("TABLE", "t", table_id(), &owner, &None).is_none());
        assert!(diff_owner("TABLE", "t", table_id(), &None, &owner).is_some());
    }
}
