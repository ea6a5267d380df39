//! SQL rendering for the generic owner / rename / comment operations

use crate::catalog::id::DbObjectId;
use crate::diff::operations::{CommentStep, OwnerOperation, RenameOperation};
use crate::render::{RenderedSql, SqlRenderer, render_comment_sql};

impl SqlRenderer for OwnerOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        vec![RenderedSql::new(format!(
            "ALTER {} {} OWNER TO {};",
            self.object_type,
            self.identifier,
            crate::render::quote_ident(&self.owner)
        ))]
    }

    fn db_object_id(&self) -> DbObjectId {
        self.object_id.clone()
    }
}

impl SqlRenderer for RenameOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        vec![RenderedSql::new(format!(
            "ALTER {} {} RENAME TO {};",
            self.object_type,
            self.old_identifier,
            crate::render::quote_ident(&self.new_name)
        ))]
    }

    fn db_object_id(&self) -> DbObjectId {
        self.object_id.clone()
    }
}

impl SqlRenderer for CommentStep {
    fn to_sql(&self) -> Vec<RenderedSql> {
        vec![render_comment_sql(
            &self.object_type,
            &self.identifier,
            self.comment.as_deref(),
        )]
    }

    fn db_object_id(&self) -> DbObjectId {
        DbObjectId::Comment {
            object_id: Box::new(self.object_id.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_owner() {
        let op = OwnerOperation {
            object_type: "TABLE".to_string(),
            identifier: "\"public\".\"films\"".to_string(),
            owner: "alice".to_string(),
            object_id: DbObjectId::Table {
                schema: "public".into(),
                name: "films".into(),
            },
        };
        assert_eq!(
            op.to_sql()[0].sql,
            "ALTER TABLE \"public\".\"films\" OWNER TO \"alice\";"
        );
    }

    #[test]
    fn test_render_rename() {
        let op = RenameOperation {
            object_type: "TABLE".to_string(),
            old_identifier: "\"public\".\"t1\"".to_string(),
            new_name: "t2".to_string(),
            object_id: DbObjectId::Table {
                schema: "public".into(),
                name: "t2".into(),
            },
        };
        assert_eq!(
            op.to_sql()[0].sql,
            "ALTER TABLE \"public\".\"t1\" RENAME TO \"t2\";"
        );
    }

    #[test]
    fn test_comment_step_wraps_object_id() {
        let op = CommentStep {
            object_type: "TABLE".to_string(),
            identifier: "\"public\".\"t1\"".to_string(),
            comment: Some("a table".to_string()),
            object_id: DbObjectId::Table {
                schema: "public".into(),
                name: "t1".into(),
            },
        };
        assert!(matches!(op.db_object_id(), DbObjectId::Comment { .. }));
        assert_eq!(
            op.to_sql()[0].sql,
            "COMMENT ON TABLE \"public\".\"t1\" IS 'a table';"
        );
    }
}
