//! SQL rendering for sequence operations

use crate::catalog::id::DbObjectId;
use crate::catalog::sequence::Sequence;
use crate::diff::operations::SequenceOperation;
use crate::render::{RenderedSql, SqlRenderer, qualified, quote_ident};

fn attribute_clauses(sequence: &Sequence) -> Vec<String> {
    let mut clauses = Vec::new();
    if sequence.data_type != "bigint" && sequence.data_type != "int8" {
        clauses.push(format!("AS {}", sequence.data_type));
    }
    if sequence.increment != 1 {
        clauses.push(format!("INCREMENT BY {}", sequence.increment));
    }
    clauses.push(format!("MINVALUE {}", sequence.min_value));
    clauses.push(format!("MAXVALUE {}", sequence.max_value));
    clauses.push(format!("START WITH {}", sequence.start_value));
    if sequence.cache_value != 1 {
        clauses.push(format!("CACHE {}", sequence.cache_value));
    }
    if sequence.cycle {
        clauses.push("CYCLE".to_string());
    }
    clauses
}

impl SqlRenderer for SequenceOperation {
    fn to_sql(&self) -> Vec<RenderedSql> {
        match self {
            SequenceOperation::Create { sequence } => {
                let clauses = attribute_clauses(sequence);
                vec![RenderedSql::new(format!(
                    "CREATE SEQUENCE {}\n    {};",
                    qualified(&sequence.schema, &sequence.name),
                    clauses.join("\n    ")
                ))]
            }
            SequenceOperation::Drop { schema, name } => vec![RenderedSql::destructive(format!(
                "DROP SEQUENCE {};",
                qualified(schema, name)
            ))],
            SequenceOperation::Alter { sequence } => {
                let clauses = attribute_clauses(sequence);
                vec![RenderedSql::new(format!(
                    "ALTER SEQUENCE {}\n    {};",
                    qualified(&sequence.schema, &sequence.name),
                    clauses.join("\n    ")
                ))]
            }
            SequenceOperation::AlterOwnership {
                schema,
                name,
                owned_by,
            } => {
                let target = match owned_by {
                    Some(owned_by) => {
                        let parts: Vec<String> = owned_by
                            .splitn(3, '.')
                            .map(quote_ident)
                            .collect();
                        parts.join(".")
                    }
                    None => "NONE".to_string(),
                };
                vec![RenderedSql::new(format!(
                    "ALTER SEQUENCE {} OWNED BY {};",
                    qualified(schema, name),
                    target
                ))]
            }
        }
    }

    fn db_object_id(&self) -> DbObjectId {
        match self {
            SequenceOperation::Create { sequence } | SequenceOperation::Alter { sequence } => {
                DbObjectId::Sequence {
                    schema: sequence.schema.clone(),
                    name: sequence.name.clone(),
                }
            }
            SequenceOperation::Drop { schema, name }
            | SequenceOperation::AlterOwnership { schema, name, .. } => DbObjectId::Sequence {
                schema: schema.clone(),
                name: name.clone(),
            },
        }
    }

    fn is_destructive(&self) -> bool {
        matches!(self, SequenceOperation::Drop { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_sequence() -> Sequence {
        Sequence {
            schema: "public".into(),
            name: "t1_c1_seq".into(),
            data_type: "integer".into(),
            start_value: 1,
            min_value: 1,
            max_value: 2147483647,
            increment: 1,
            cache_value: 1,
            cycle: false,
            owned_by: None,
            owner: None,
            comment: None,
            oldname: None,
            depends_on: vec![],
        }
    }

    #[test]
    fn test_create_sequence() {
        let op = SequenceOperation::Create {
            sequence: Box::new(make_sequence()),
        };
        let sql = &op.to_sql()[0].sql;
        assert!(sql.starts_with("CREATE SEQUENCE \"public\".\"t1_c1_seq\""));
        assert!(sql.contains("AS integer"));
        assert!(sql.contains("START WITH 1"));
        assert!(!sql.contains("CYCLE"));
    }

    #[test]
    fn test_alter_ownership() {
        let op = SequenceOperation::AlterOwnership {
            schema: "public".into(),
            name: "t1_c1_seq".into(),
            owned_by: Some("public.t1.c1".into()),
        };
        assert_eq!(
            op.to_sql()[0].sql,
            "ALTER SEQUENCE \"public\".\"t1_c1_seq\" OWNED BY \"public\".\"t1\".\"c1\";"
        );
    }

    #[test]
    fn test_alter_ownership_none() {
        let op = SequenceOperation::AlterOwnership {
            schema: "public".into(),
            name: "s".into(),
            owned_by: None,
        };
        assert!(op.to_sql()[0].sql.ends_with("OWNED BY NONE;"));
    }
}
