use crate::catalog::view::View;
use crate::diff::comment_utils::{comment_on_create, diff_comment, diff_owner};
use crate::diff::operations::{MigrationStep, RenameOperation, ViewOperation};
use crate::render::qualified;

fn object_type(view: &View) -> &'static str {
    if view.materialized {
        "MATERIALIZED VIEW"
    } else {
        "VIEW"
    }
}

pub fn rename_step(old: &View, new: &View) -> MigrationStep {
    MigrationStep::Rename(RenameOperation {
        object_type: object_type(new).to_string(),
        old_identifier: qualified(&old.schema, &old.name),
        new_name: new.name.clone(),
        object_id: new.id(),
    })
}

pub fn diff(old: Option<&View>, new: Option<&View>) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let identifier = qualified(&n.schema, &n.name);
            let mut steps = vec![MigrationStep::View(ViewOperation::Create {
                view: Box::new(n.clone()),
            })];
            steps.extend(diff_owner(object_type(n), &identifier, n.id(), &None, &n.owner));
            steps.extend(comment_on_create(
                object_type(n),
                &identifier,
                n.id(),
                &n.comment,
            ));
            steps
        }
        (Some(o), None) => vec![MigrationStep::View(ViewOperation::Drop {
            schema: o.schema.clone(),
            name: o.name.clone(),
            materialized: o.materialized,
        })],
        (Some(o), Some(n)) => {
            let mut steps = Vec::new();
            if o.definition.trim() != n.definition.trim() {
                if n.materialized {
                    // no CREATE OR REPLACE for materialized views
                    steps.push(MigrationStep::View(ViewOperation::Drop {
                        schema: o.schema.clone(),
                        name: o.name.clone(),
                        materialized: true,
                    }));
                    steps.push(MigrationStep::View(ViewOperation::Create {
                        view: Box::new(n.clone()),
                    }));
                } else {
                    steps.push(MigrationStep::View(ViewOperation::Replace {
                        view: Box::new(n.clone()),
                    }));
                }
            }
            let identifier = qualified(&n.schema, &n.name);
            steps.extend(diff_owner(
                object_type(n),
                &identifier,
                n.id(),
                &o.owner,
                &n.owner,
            ));
            steps.extend(diff_comment(
                object_type(n),
                &identifier,
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

    fn make_view(definition: &str, materialized: bool) -> View {
        View {
            schema: "public".into(),
            name: "v1".into(),
            definition: definition.into(),
            materialized,
            tablespace: None,
            owner: None,
            comment: None,
            oldname: None,
            depends_on: vec![],
        }
    }

    #[test]
    fn test_definition_change_replaces_plain_view() {
        let old = make_view("SELECT 1", false);
        let new = make_view("SELECT 2", false);
        let steps = diff(Some(&old), Some(&new));
        assert_eq!(steps.len(), 1);
        assert!(matches!(
            &steps[0],
            MigrationStep::View(ViewOperation::Replace { .. })
        ));
    }

    #[test]
    fn test_definition_change_recreates_materialized_view() {
        let old = make_view("SELECT 1", true);
        let new = make_view("SELECT 2", true);
        let steps = diff(Some(&old), Some(&new));
        assert_eq!(steps.len(), 2);
        assert!(steps[0].is_drop());
        assert!(steps[1].is_create());
    }
}
