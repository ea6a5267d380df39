use crate::catalog::index::Index;
use crate::diff::comment_utils::{comment_on_create, diff_comment};
use crate::diff::operations::{IndexOperation, MigrationStep, RenameOperation};
use crate::render::qualified;

pub fn rename_step(old: &Index, new: &Index) -> MigrationStep {
    MigrationStep::Rename(RenameOperation {
        object_type: "INDEX".to_string(),
        old_identifier: qualified(&old.schema, &old.name),
        new_name: new.name.clone(),
        object_id: new.id(),
    })
}

/// Compare everything that shapes the index itself; tablespace moves are
/// expressible in place and compared separately.
fn definition_equal(o: &Index, n: &Index) -> bool {
    match (&o.columns, &n.columns) {
        (Some(old_cols), Some(new_cols)) => {
            old_cols == new_cols && o.unique == n.unique && o.method == n.method
        }
        _ => o.definition == n.definition,
    }
}

pub fn diff(old: Option<&Index>, new: Option<&Index>) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let mut steps = vec![MigrationStep::Index(IndexOperation::Create {
                index: Box::new(n.clone()),
            })];
            steps.extend(comment_on_create(
                "INDEX",
                &qualified(&n.schema, &n.name),
                n.id(),
                &n.comment,
            ));
            steps
        }
        (Some(o), None) => vec![MigrationStep::Index(IndexOperation::Drop {
            schema: o.schema.clone(),
            name: o.name.clone(),
        })],
        (Some(o), Some(n)) => {
            let mut steps = Vec::new();
            if !definition_equal(o, n) {
                steps.push(MigrationStep::Index(IndexOperation::Drop {
                    schema: o.schema.clone(),
                    name: o.name.clone(),
                }));
                steps.push(MigrationStep::Index(IndexOperation::Create {
                    index: Box::new(n.clone()),
                }));
            } else if o.tablespace != n.tablespace {
                if let Some(tablespace) = &n.tablespace {
                    steps.push(MigrationStep::Index(IndexOperation::SetTablespace {
                        schema: n.schema.clone(),
                        name: n.name.clone(),
                        tablespace: tablespace.clone(),
                    }));
                }
            }
            steps.extend(diff_comment(
                "INDEX",
                &qualified(&n.schema, &n.name),
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

    fn make_index(unique: bool) -> Index {
        Index {
            schema: "public".into(),
            name: "ix".into(),
            table: "t".into(),
            definition: "CREATE INDEX ix ON public.t USING btree (c)".into(),
            columns: Some(vec!["c".into()]),
            unique,
            method: "btree".into(),
            tablespace: None,
            comment: None,
            oldname: None,
            depends_on: vec![],
        }
    }

    #[test]
    fn test_identical_indexes_produce_nothing() {
        let ix = make_index(false);
        assert!(diff(Some(&ix), Some(&ix)).is_empty());
    }

    #[test]
    fn test_uniqueness_change_recreates() {
        let steps = diff(Some(&make_index(false)), Some(&make_index(true)));
        assert_eq!(steps.len(), 2);
        assert!(steps[0].is_drop());
        assert!(steps[1].is_create());
    }
}
