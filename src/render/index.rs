//! SQL rendering for index operations

use crate::catalog::id::DbObjectId;
use crate::catalog::index::Index;
use crate::diff::operations::IndexOperation;
use crate::render::{RenderedSql, SqlRenderer, qualified, quote_ident};

/// Render CREATE INDEX. The structured form is used for plain-column
/// indexes; anything with expressions falls back to the verbatim
/// pg_get_indexdef definition.
pub fn render_create_index(index: &Index) -> String {
    match &index.columns {
        Some(columns) => {
            let unique = if index.unique { "UNIQUE " } else { "" };
            let method = if index.method != "btree" {
                format!(" USING {}", index.method)
            } else {
                String::new()
            };
            let column_list = columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ");
            let mut sql = format!(
                "CREATE {}INDEX {} ON {}{} ({})",
                unique,
                quote_ident(&index.name),
                qualified(&index.schema, &index.table),
                method,
                column_list
            );
            if let Some(tablespace) = &index.tablespace {
                sql.push_str(&format!(" TABLESPACE {}", quote_ident(tablespace)));
            }
            sql.push(';');
            sql
        }
        None => {
            let mut definition = index.definition.trim_end().to_string();
            if !definition.ends_with(';') {
                definition.push(';');
            }
            definition
        }
    }
}

impl SqlRenderer for IndexOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            IndexOperation::Create { index } => {
                vec![RenderedSql::new(render_create_index(index))]
            }
            IndexOperation::Drop { schema, name } => vec![RenderedSql::destructive(format!(
                "DROP INDEX {};",
                qualified(schema, name)
            ))],
            IndexOperation::SetTablespace {
                schema,
                name,
                tablespace,
            } => vec![RenderedSql::new(format!(
                "ALTER INDEX {} SET TABLESPACE {};",
                qualified(schema, name),
                quote_ident(tablespace)
            ))],
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            IndexOperation::Create { index } => index.id(),
            IndexOperation::Drop { schema, name }
            | IndexOperation::SetTablespace { schema, name, .. } => DbObjectId::Index {
                schema: schema.clone(),
                name: name.clone(),
            },
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(self, IndexOperation::Drop { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_index(columns: Option<Vec<String>>) -> Index {
        Index {
            schema: "public".into(),
            name: "ix".into(),
            table: "t".into(),
            definition: "CREATE INDEX ix ON public.t USING btree (lower(c))".into(),
            columns,
            unique: false,
            method: "btree".into(),
            tablespace: None,
            comment: None,
            oldname: None,
            depends_on: vec![],
        }
    }

    #[test]
    fn test_plain_column_index_renders_structured() {
        let index = make_index(Some(vec!["c".to_string()]));
        assert_eq!(
            render_create_index(&index),
            "CREATE INDEX \"ix\" ON \"public\".\"t\" (\"c\");"
        );
    }

    #[test]
    fn test_expression_index_uses_verbatim_definition() {
        let index = make_index(None);
        assert_eq!(
            render_create_index(&index),
            "CREATE INDEX ix ON public.t USING btree (lower(c));"
        );
    }

    #[test]
    fn test_drop_index() {
        let op = IndexOperation::Drop {
            schema: "public".into(),
            name: "ix".into(),
        };
        assert_eq!(op.to_sql()[0].sql, "DROP INDEX \"public\".\"ix\";");
    }
}
