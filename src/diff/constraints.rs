use crate::catalog::constraint::Constraint;
use crate::diff::comment_utils::{comment_on_create, diff_comment};
use crate::diff::operations::{ConstraintOperation, MigrationStep};
use crate::render::{qualified, quote_ident};

fn constraint_identifier(constraint: &Constraint) -> String {
    format!(
        "{} ON {}",
        quote_ident(&constraint.name),
        qualified(&constraint.schema, &constraint.table)
    )
}

pub fn diff(old: Option<&Constraint>, new: Option<&Constraint>) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let mut steps = vec![MigrationStep::Constraint(ConstraintOperation::Create(
                n.clone(),
            ))];
            steps.extend(comment_on_create(
                "CONSTRAINT",
                &constraint_identifier(n),
                n.id(),
                &n.comment,
            ));
            steps
        }
        (Some(o), None) => vec![MigrationStep::Constraint(ConstraintOperation::Drop {
            schema: o.schema.clone(),
            table: o.table.clone(),
            name: o.name.clone(),
        })],
        (Some(o), Some(n)) => {
            let mut steps = Vec::new();
            if o.constraint_type != n.constraint_type {
                steps.push(MigrationStep::Constraint(ConstraintOperation::Drop {
                    schema: o.schema.clone(),
                    table: o.table.clone(),
                    name: o.name.clone(),
                }));
                steps.push(MigrationStep::Constraint(ConstraintOperation::Create(
                    n.clone(),
                )));
            }
            steps.extend(diff_comment(
                "CONSTRAINT",
                &constraint_identifier(n),
                n.id(),
                &o.comment,
                &n.comment,
            ));
            steps
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::constraint::ConstraintType;

    fn make_pk(columns: Vec<&str>) -> Constraint {
        Constraint {
            schema: "public".into(),
            table: "t1".into(),
            name: "t1_pkey".into(),
            constraint_type: ConstraintType::PrimaryKey {
                columns: columns.into_iter().map(String::from).collect(),
            },
            comment: None,
            depends_on: vec![],
        }
    }

    #[test]
    fn test_identical_constraints_produce_nothing() {
        let pk = make_pk(vec!["id"]);
        assert!(diff(Some(&pk), Some(&pk)).is_empty());
    }

    #[test]
    fn test_changed_columns_recreate() {
        let old = make_pk(vec!["id"]);
        let new = make_pk(vec!["id", "version"]);
        let steps = diff(Some(&old), Some(&new));
        assert_eq!(steps.len(), 2);
        assert!(steps[0].is_drop());
        assert!(steps[1].is_create());
    }

    #[test]
    fn test_fk_create_is_relationship_step() {
        let fk = Constraint {
            schema: "public".into(),
            table: "t1".into(),
            name: "t1_c2_fkey".into(),
            constraint_type: ConstraintType::ForeignKey {
                columns: vec!["c2".into()],
                referenced_schema: "s1".into(),
                referenced_table: "t2".into(),
                referenced_columns: vec!["c21".into()],
                on_delete: None,
                on_update: None,
                deferrable: false,
            },
            comment: None,
            depends_on: vec![],
        };
        let steps = diff(None, Some(&fk));
        assert!(steps[0].is_relationship());
    }
}
