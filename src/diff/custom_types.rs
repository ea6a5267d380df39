use crate::catalog::custom_type::{CustomType, TypeDefinition};
use crate::diff::comment_utils::{comment_on_create, diff_comment, diff_owner};
use crate::diff::operations::{MigrationStep, TypeOperation};
use crate::render::qualified;

pub fn diff(old: Option<&CustomType>, new: Option<&CustomType>) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let identifier = qualified(&n.schema, &n.name);
            let mut steps = vec![MigrationStep::Type(TypeOperation::Create {
                type_: Box::new(n.clone()),
            })];
            steps.extend(diff_owner("TYPE", &identifier, n.id(), &None, &n.owner));
            steps.extend(comment_on_create("TYPE", &identifier, n.id(), &n.comment));
            steps
        }
        (Some(o), None) => vec![MigrationStep::Type(TypeOperation::Drop {
            schema: o.schema.clone(),
            name: o.name.clone(),
        })],
        (Some(o), Some(n)) => {
            let mut steps = Vec::new();

            match (&o.definition, &n.definition) {
                (
                    TypeDefinition::Enum { labels: old_labels },
                    TypeDefinition::Enum { labels: new_labels },
                ) if old_labels != new_labels => {
                    // label additions are expressible in place; anything
                    // that removes or reorders existing labels is not
                    match enum_additions(old_labels, new_labels) {
                        Some(additions) => {
                            for (value, before) in additions {
                                steps.push(MigrationStep::Type(TypeOperation::AddEnumValue {
                                    schema: n.schema.clone(),
                                    name: n.name.clone(),
                                    value,
                                    before,
                                }));
                            }
                        }
                        None => {
                            steps.push(MigrationStep::Type(TypeOperation::Drop {
                                schema: o.schema.clone(),
                                name: o.name.clone(),
                            }));
                            steps.push(MigrationStep::Type(TypeOperation::Create {
                                type_: Box::new(n.clone()),
                            }));
                        }
                    }
                }
                (old_def, new_def) if old_def != new_def => {
                    steps.push(MigrationStep::Type(TypeOperation::Drop {
                        schema: o.schema.clone(),
                        name: o.name.clone(),
                    }));
                    steps.push(MigrationStep::Type(TypeOperation::Create {
                        type_: Box::new(n.clone()),
                    }));
                }
                _ => {}
            }

            let identifier = qualified(&n.schema, &n.name);
            steps.extend(diff_owner("TYPE", &identifier, n.id(), &o.owner, &n.owner));
            steps.extend(diff_comment(
                "TYPE",
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

/// If new_labels is old_labels with values inserted (order preserved),
/// return the insertions as (value, before-label) pairs. None when the
/// change cannot be expressed as additions.
fn enum_additions(
    old_labels: &[String],
    new_labels: &[String],
) -> Option<Vec<(String, Option<String>)>> {
    let mut additions = Vec::new();
    let mut old_iter = old_labels.iter().peekable();

    for (pos, label) in new_labels.iter().enumerate() {
        match old_iter.peek() {
            Some(old_label) if *old_label == label => {
                old_iter.next();
            }
            _ => {
                // insert before the next surviving old label
                let before = new_labels[pos + 1..]
                    .iter()
                    .find(|l| old_labels.contains(l))
                    .cloned();
                additions.push((label.clone(), before));
            }
        }
    }

    // all old labels must survive in order
    if old_iter.next().is_some() {
        return None;
    }
    Some(additions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_enum_append() {
        let additions = enum_additions(&labels(&["a", "b"]), &labels(&["a", "b", "c"])).unwrap();
        assert_eq!(additions, vec![("c".to_string(), None)]);
    }

    #[test]
    fn test_enum_insert_in_middle() {
        let additions = enum_additions(&labels(&["a", "c"]), &labels(&["a", "b", "c"])).unwrap();
        assert_eq!(additions, vec![("b".to_string(), Some("c".to_string()))]);
    }

    #[test]
    fn test_enum_removal_requires_recreate() {
        assert!(enum_additions(&labels(&["a", "b"]), &labels(&["a"])).is_none());
    }

    #[test]
    fn test_enum_reorder_requires_recreate() {
        assert!(enum_additions(&labels(&["a", "b"]), &labels(&["b", "a"])).is_none());
    }
}
