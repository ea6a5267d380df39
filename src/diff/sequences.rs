use crate::catalog::sequence::Sequence;
use crate::diff::comment_utils::{comment_on_create, diff_comment, diff_owner};
use crate::diff::operations::{MigrationStep, RenameOperation, SequenceOperation};
use crate::render::qualified;

pub fn rename_step(old: &Sequence, new: &Sequence) -> MigrationStep {
    MigrationStep::Rename(RenameOperation {
        object_type: "SEQUENCE".to_string(),
        old_identifier: qualified(&old.schema, &old.name),
        new_name: new.name.clone(),
        object_id: new.id(),
    })
}

fn attributes_equal(o: &Sequence, n: &Sequence) -> bool {
    o.data_type == n.data_type
        && o.start_value == n.start_value
        && o.min_value == n.min_value
        && o.max_value == n.max_value
        && o.increment == n.increment
        && o.cache_value == n.cache_value
        && o.cycle == n.cycle
}

pub fn diff(old: Option<&Sequence>, new: Option<&Sequence>) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let identifier = qualified(&n.schema, &n.name);
            let mut steps = vec![MigrationStep::Sequence(SequenceOperation::Create {
                sequence: Box::new(n.clone()),
            })];
            if n.owned_by.is_some() {
                steps.push(MigrationStep::Sequence(SequenceOperation::AlterOwnership {
                    schema: n.schema.clone(),
                    name: n.name.clone(),
                    owned_by: n.owned_by.clone(),
                }));
            }
            steps.extend(diff_owner("SEQUENCE", &identifier, n.id(), &None, &n.owner));
            steps.extend(comment_on_create(
                "SEQUENCE",
                &identifier,
                n.id(),
                &n.comment,
            ));
            steps
        }
        (Some(o), None) => vec![MigrationStep::Sequence(SequenceOperation::Drop {
            schema: o.schema.clone(),
            name: o.name.clone(),
        })],
        (Some(o), Some(n)) => {
            let mut steps = Vec::new();
            if !attributes_equal(o, n) {
                steps.push(MigrationStep::Sequence(SequenceOperation::Alter {
                    sequence: Box::new(n.clone()),
                }));
            }
            if o.owned_by != n.owned_by {
                steps.push(MigrationStep::Sequence(SequenceOperation::AlterOwnership {
                    schema: n.schema.clone(),
                    name: n.name.clone(),
                    owned_by: n.owned_by.clone(),
                }));
            }
            let identifier = qualified(&n.schema, &n.name);
            steps.extend(diff_owner(
                "SEQUENCE",
                &identifier,
                n.id(),
                &o.owner,
                &n.owner,
            ));
            steps.extend(diff_comment(
                "SEQUENCE",
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

    fn make_sequence() -> Sequence {
        Sequence {
            schema: "public".into(),
            name: "seq".into(),
            data_type: "bigint".into(),
            start_value: 1,
            min_value: 1,
            max_value: i64::MAX,
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
    fn test_identical_sequences_produce_nothing() {
        let seq = make_sequence();
        assert!(diff(Some(&seq), Some(&seq)).is_empty());
    }

    #[test]
    fn test_increment_change_alters() {
        let old = make_sequence();
        let mut new = make_sequence();
        new.increment = 10;
        let steps = diff(Some(&old), Some(&new));
        assert_eq!(steps.len(), 1);
        assert!(matches!(
            &steps[0],
            MigrationStep::Sequence(SequenceOperation::Alter { .. })
        ));
    }

    #[test]
    fn test_owned_sequence_create_emits_ownership_step() {
        let mut seq = make_sequence();
        seq.owned_by = Some("public.t1.c1".into());
        let steps = diff(None, Some(&seq));
        assert_eq!(steps.len(), 2);
        assert!(matches!(
            &steps[1],
            MigrationStep::Sequence(SequenceOperation::AlterOwnership { .. })
        ));
        assert!(steps[1].is_relationship());
    }
}
