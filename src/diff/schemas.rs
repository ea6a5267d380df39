use crate::catalog::schema::Schema;
use crate::diff::comment_utils::{comment_on_create, diff_comment, diff_owner};
use crate::diff::operations::{MigrationStep, RenameOperation, SchemaOperation};
use crate::render::quote_ident;

pub fn rename_step(old: &Schema, new: &Schema) -> MigrationStep {
    MigrationStep::Rename(RenameOperation {
        object_type: "SCHEMA".to_string(),
        old_identifier: quote_ident(&old.name),
        new_name: new.name.clone(),
        object_id: new.id(),
    })
}

pub fn diff(old: Option<&Schema>, new: Option<&Schema>) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            // the built-in public schema always exists
            if n.name == "public" {
                return Vec::new();
            }
            let mut steps = vec![MigrationStep::Schema(SchemaOperation::Create {
                schema: Box::new(n.clone()),
            })];
            steps.extend(comment_on_create(
                "SCHEMA",
                &quote_ident(&n.name),
                n.id(),
                &n.comment,
            ));
            steps
        }
        (Some(o), None) => {
            if o.name == "public" {
                return Vec::new();
            }
            vec![MigrationStep::Schema(SchemaOperation::Drop {
                name: o.name.clone(),
            })]
        }
        (Some(o), Some(n)) => {
            let mut steps = Vec::new();
            let identifier = quote_ident(&n.name);
            steps.extend(diff_owner("SCHEMA", &identifier, n.id(), &o.owner, &n.owner));
            steps.extend(diff_comment(
                "SCHEMA",
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

    fn make_schema(name: &str) -> Schema {
        Schema {
            name: name.to_string(),
            owner: None,
            comment: None,
            oldname: None,
        }
    }

    #[test]
    fn test_public_schema_is_never_created_or_dropped() {
        let public = make_schema("public");
        assert!(diff(None, Some(&public)).is_empty());
        assert!(diff(Some(&public), None).is_empty());
    }

    #[test]
    fn test_create_schema() {
        let s1 = make_schema("s1");
        let steps = diff(None, Some(&s1));
        assert_eq!(steps.len(), 1);
        assert!(matches!(
            &steps[0],
            MigrationStep::Schema(SchemaOperation::Create { .. })
        ));
    }

    #[test]
    fn test_comment_change_only() {
        let old = make_schema("s1");
        let mut new = make_schema("s1");
        new.comment = Some("app schema".to_string());
        let steps = diff(Some(&old), Some(&new));
        assert_eq!(steps.len(), 1);
        assert!(matches!(&steps[0], MigrationStep::Comment(_)));
    }
}
