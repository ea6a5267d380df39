//! SQL rendering for view and materialized-view operations

use crate::catalog::id::DbObjectId;
use crate::catalog::view::View;
use crate::diff::operations::ViewOperation;
use crate::render::{RenderedSql, SqlRenderer, qualified};

fn render_create(view: &View, or_replace: bool) -> String {
    let keyword = match (view.materialized, or_replace) {
        (true, _) => "CREATE MATERIALIZED VIEW",
        (false, true) => "CREATE OR REPLACE VIEW",
        (false, false) => "CREATE VIEW",
    };
    let definition = view.definition.trim_end().trim_end_matches(';');
    format!(
        "{} {} AS\n{};",
        keyword,
        qualified(&view.schema, &view.name),
        definition
    )
}

impl SqlRenderer for ViewOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            ViewOperation::Create { view } => vec![RenderedSql::new(render_create(view, false))],
            ViewOperation::Replace { view } => vec![RenderedSql::new(render_create(view, true))],
            ViewOperation::Drop {
                schema,
                name,
                materialized,
            } => {
                let keyword = if *materialized {
                    "DROP MATERIALIZED VIEW"
                } else {
                    "DROP VIEW"
                };
                vec![RenderedSql::destructive(format!(
                    "{} {};",
                    keyword,
                    qualified(schema, name)
                ))]
            }
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            ViewOperation::Create { view } | ViewOperation::Replace { view } => view.id(),
            ViewOperation::Drop {
                schema,
                name,
                materialized,
            } => {
                if *materialized {
                    DbObjectId::MaterializedView {
                        schema: schema.clone(),
                        name: name.clone(),
                    }
                } else {
                    DbObjectId::View {
                        schema: schema.clone(),
                        name: name.clone(),
                    }
                }
            }
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(self, ViewOperation::Drop { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_view(materialized: bool) -> View {
        View {
            schema: "public".into(),
            name: "v1".into(),
            definition: " SELECT t1.c1\n   FROM t1;".into(),
            materialized,
            tablespace: None,
            owner: None,
            comment: None,
            oldname: None,
            depends_on: vec![],
        }
    }

    #[test]
    fn test_create_view_strips_trailing_semicolon() {
        let op = ViewOperation::Create {
            view: Box::new(make_view(false)),
        };
        let sql = &op.to_sql()[0].sql;
        assert!(sql.starts_with("CREATE VIEW \"public\".\"v1\" AS"));
        assert!(sql.ends_with("FROM t1;"));
        assert!(!sql.ends_with(";;"));
    }

    #[test]
    fn test_replace_view() {
        let op = ViewOperation::Replace {
            view: Box::new(make_view(false)),
        };
        assert!(op.to_sql()[0].sql.starts_with("CREATE OR REPLACE VIEW"));
    }

    #[test]
    fn test_materialized_view() {
        let op = ViewOperation::Create {
            view: Box::new(make_view(true)),
        };
        assert!(op.to_sql()[0].sql.starts_with("CREATE MATERIALIZED VIEW"));

        let drop = ViewOperation::Drop {
            schema: "public".into(),
            name: "v1".into(),
            materialized: true,
        };
        assert_eq!(
            drop.to_sql()[0].sql,
            "DROP MATERIALIZED VIEW \"public\".\"v1\";"
        );
    }
}
