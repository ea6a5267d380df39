//! SQL rendering for constraint operations

use crate::catalog::constraint::{Constraint, ConstraintType};
use crate::catalog::id::DbObjectId;
use crate::diff::operations::ConstraintOperation;
use crate::render::{RenderedSql, SqlRenderer, qualified, quote_ident};

fn column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render `ALTER TABLE ... ADD CONSTRAINT ...` for any constraint kind.
pub fn render_add_constraint(constraint: &Constraint) -> String {
    let body = match &constraint.constraint_type {
        ConstraintType::Check { expression, .. } => {
            let expression = expression.trim();
            if expression.starts_with("CHECK") {
                expression.to_string()
            } else if expression.starts_with('(') {
                format!("CHECK {}", expression)
            } else {
                format!("CHECK ({})", expression)
            }
        }
        ConstraintType::PrimaryKey { columns } => {
            format!("PRIMARY KEY ({})", column_list(columns))
        }
        ConstraintType::Unique { columns } => {
            format!("UNIQUE ({})", column_list(columns))
        }
        ConstraintType::ForeignKey {
            columns,
            referenced_schema,
            referenced_table,
            referenced_columns,
            on_delete,
            on_update,
            deferrable,
        } => {
            let mut body = format!(
                "FOREIGN KEY ({}) REFERENCES {} ({})",
                column_list(columns),
                qualified(referenced_schema, referenced_table),
                column_list(referenced_columns)
            );
            if let Some(action) = on_delete {
                body.push_str(&format!(" ON DELETE {}", action.to_uppercase()));
            }
            if let Some(action) = on_update {
                body.push_str(&format!(" ON UPDATE {}", action.to_uppercase()));
            }
            if *deferrable {
                body.push_str(" DEFERRABLE");
            }
            body
        }
    };

    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} {};",
        qualified(&constraint.schema, &constraint.table),
        quote_ident(&constraint.name),
        body
    )
}

impl SqlRenderer for ConstraintOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            ConstraintOperation::Create(constraint) => {
                vec![RenderedSql::new(render_add_constraint(constraint))]
            }
            ConstraintOperation::Drop {
                schema,
                table,
                name,
            } => vec![RenderedSql::destructive(format!(
                "ALTER TABLE {} DROP CONSTRAINT {};",
                qualified(schema, table),
                quote_ident(name)
            ))],
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            ConstraintOperation::Create(constraint) => constraint.id(),
            ConstraintOperation::Drop {
                schema,
                table,
                name,
            } => DbObjectId::Constraint {
                schema: schema.clone(),
                table: table.clone(),
                name: name.clone(),
            },
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(self, ConstraintOperation::Drop { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_constraint(constraint_type: ConstraintType) -> Constraint {
        Constraint {
            schema: "public".to_string(),
            table: "t1".to_string(),
            name: "c1".to_string(),
            constraint_type,
            comment: None,
            depends_on: vec![],
        }
    }

    #[test]
    fn test_render_primary_key() {
        let mut constraint = make_constraint(ConstraintType::PrimaryKey {
            columns: vec!["c1".to_string()],
        });
        constraint.name = "t1_pkey".to_string();
        assert_eq!(
            render_add_constraint(&constraint),
            "ALTER TABLE \"public\".\"t1\" ADD CONSTRAINT \"t1_pkey\" PRIMARY KEY (\"c1\");"
        );
    }

    #[test]
    fn test_render_foreign_key_with_actions() {
        let constraint = make_constraint(ConstraintType::ForeignKey {
            columns: vec!["c2".to_string()],
            referenced_schema: "s1".to_string(),
            referenced_table: "t2".to_string(),
            referenced_columns: vec!["c21".to_string()],
            on_delete: Some("restrict".to_string()),
            on_update: Some("set null".to_string()),
            deferrable: false,
        });
        let sql = render_add_constraint(&constraint);
        assert!(sql.contains("FOREIGN KEY (\"c2\") REFERENCES \"s1\".\"t2\" (\"c21\")"));
        assert!(sql.contains("ON DELETE RESTRICT"));
        assert!(sql.contains("ON UPDATE SET NULL"));
    }

    #[test]
    fn test_render_check_keeps_parenthesized_expression() {
        let constraint = make_constraint(ConstraintType::Check {
            expression: "(c2 > 123)".to_string(),
            columns: vec!["c2".to_string()],
        });
        assert_eq!(
            render_add_constraint(&constraint),
            "ALTER TABLE \"public\".\"t1\" ADD CONSTRAINT \"c1\" CHECK (c2 > 123);"
        );
    }

    #[test]
    fn test_render_check_wraps_bare_expression() {
        let constraint = make_constraint(ConstraintType::Check {
            expression: "c2 > 123".to_string(),
            columns: vec!["c2".to_string()],
        });
        assert!(render_add_constraint(&constraint).contains("CHECK (c2 > 123)"));
    }

    #[test]
    fn test_drop_constraint() {
        let op = ConstraintOperation::Drop {
            schema: "public".to_string(),
            table: "t1".to_string(),
            name: "t1_pkey".to_string(),
        };
        let rendered = op.to_sql();
        assert_eq!(
            rendered[0].sql,
            "ALTER TABLE \"public\".\"t1\" DROP CONSTRAINT \"t1_pkey\";"
        );
        assert_eq!(rendered[0].safety, crate::render::Safety::Destructive);
    }
}
