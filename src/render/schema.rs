//! SQL rendering for schema operations

use crate::catalog::id::DbObjectId;
use crate::diff::operations::SchemaOperation;
use crate::render::{RenderedSql, SqlRenderer, quote_ident};

impl SqlRenderer for SchemaOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            SchemaOperation::Create { schema } => {
                let mut sql = format!("CREATE SCHEMA {}", quote_ident(&schema.name));
                if let Some(owner) = &schema.owner {
                    sql.push_str(&format!(" AUTHORIZATION {}", quote_ident(owner)));
                }
                sql.push(';');
                vec![RenderedSql::new(sql)]
            }
            SchemaOperation::Drop { name } => vec![RenderedSql::destructive(format!(
                "DROP SCHEMA {};",
                quote_ident(name)
            ))],
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            SchemaOperation::Create { schema } => DbObjectId::Schema {
                name: schema.name.clone(),
            },
            SchemaOperation::Drop { name } => DbObjectId::Schema { name: name.clone() },
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(self, SchemaOperation::Drop { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::schema::Schema;

    #[test]
    fn test_create_schema_with_owner() {
        let op = SchemaOperation::Create {
            schema: Box::new(Schema {
                name: "s1".to_string(),
                owner: Some("alice".to_string()),
                comment: None,
                oldname: None,
            }),
        };
        assert_eq!(
            op.to_sql()[0].sql,
            "CREATE SCHEMA \"s1\" AUTHORIZATION \"alice\";"
        );
    }

    #[test]
    fn test_drop_schema() {
        let op = SchemaOperation::Drop {
            name: "s1".to_string(),
        };
        let rendered = op.to_sql();
        assert_eq!(rendered[0].sql, "DROP SCHEMA \"s1\";");
        assert_eq!(rendered[0].safety, crate::render::Safety::Destructive);
    }
}
