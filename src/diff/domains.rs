use crate::catalog::domain::Domain;
use crate::diff::comment_utils::{comment_on_create, diff_comment, diff_owner};
use crate::diff::operations::{DomainOperation, MigrationStep};
use crate::render::qualified;

pub fn diff(old: Option<&Domain>, new: Option<&Domain>) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let identifier = qualified(&n.schema, &n.name);
            let mut steps = vec![MigrationStep::Domain(DomainOperation::Create {
                domain: Box::new(n.clone()),
            })];
            steps.extend(diff_owner("DOMAIN", &identifier, n.id(), &None, &n.owner));
            steps.extend(comment_on_create("DOMAIN", &identifier, n.id(), &n.comment));
            steps
        }
        (Some(o), None) => vec![MigrationStep::Domain(DomainOperation::Drop {
            schema: o.schema.clone(),
            name: o.name.clone(),
        })],
        (Some(o), Some(n)) => {
            let mut steps = Vec::new();

            if o.data_type != n.data_type {
                // a base type change cannot be altered in place
                steps.push(MigrationStep::Domain(DomainOperation::Drop {
                    schema: o.schema.clone(),
                    name: o.name.clone(),
                }));
                steps.push(MigrationStep::Domain(DomainOperation::Create {
                    domain: Box::new(n.clone()),
                }));
                return steps;
            }

            if o.default != n.default {
                steps.push(MigrationStep::Domain(DomainOperation::SetDefault {
                    schema: n.schema.clone(),
                    name: n.name.clone(),
                    default: n.default.clone(),
                }));
            }
            if o.not_null != n.not_null {
                steps.push(MigrationStep::Domain(DomainOperation::SetNotNull {
                    schema: n.schema.clone(),
                    name: n.name.clone(),
                    not_null: n.not_null,
                }));
            }

            for old_check in &o.check_constraints {
                if !n.check_constraints.iter().any(|c| c == old_check) {
                    steps.push(MigrationStep::Domain(DomainOperation::DropCheck {
                        schema: n.schema.clone(),
                        name: n.name.clone(),
                        check_name: old_check.name.clone(),
                    }));
                }
            }
            for new_check in &n.check_constraints {
                if !o.check_constraints.iter().any(|c| c == new_check) {
                    steps.push(MigrationStep::Domain(DomainOperation::AddCheck {
                        schema: n.schema.clone(),
                        name: n.name.clone(),
                        check: new_check.clone(),
                    }));
                }
            }

            let identifier = qualified(&n.schema, &n.name);
            steps.extend(diff_owner("DOMAIN", &identifier, n.id(), &o.owner, &n.owner));
            steps.extend(diff_comment(
                "DOMAIN",
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
    use crate::catalog::domain::DomainCheck;

    fn make_domain() -> Domain {
        Domain {
            schema: "public".into(),
            name: "us_postal".into(),
            data_type: "text".into(),
            not_null: false,
            default: None,
            check_constraints: vec![],
            owner: None,
            comment: None,
            depends_on: vec![],
        }
    }

    #[test]
    fn test_check_addition() {
        let old = make_domain();
        let mut new = make_domain();
        new.check_constraints.push(DomainCheck {
            name: "us_postal_check".into(),
            expression: "(VALUE ~ '^\\d{5}$')".into(),
        });

        let steps = diff(Some(&old), Some(&new));
        assert_eq!(steps.len(), 1);
        assert!(matches!(
            &steps[0],
            MigrationStep::Domain(DomainOperation::AddCheck { .. })
        ));
    }

    #[test]
    fn test_base_type_change_recreates() {
        let old = make_domain();
        let mut new = make_domain();
        new.data_type = "varchar(10)".into();

        let steps = diff(Some(&old), Some(&new));
        assert_eq!(steps.len(), 2);
        assert!(matches!(
            &steps[0],
            MigrationStep::Domain(DomainOperation::Drop { .. })
        ));
        assert!(matches!(
            &steps[1],
            MigrationStep::Domain(DomainOperation::Create { .. })
        ));
    }
}
