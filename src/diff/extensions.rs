use crate::catalog::extension::Extension;
use crate::catalog::language::Language;
use crate::diff::comment_utils::{comment_on_create, diff_comment};
use crate::diff::operations::{ExtensionOperation, LanguageOperation, MigrationStep};
use crate::render::quote_ident;

pub fn diff(old: Option<&Extension>, new: Option<&Extension>) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let mut steps = vec![MigrationStep::Extension(ExtensionOperation::Create {
                extension: Box::new(n.clone()),
            })];
            steps.extend(comment_on_create(
                "EXTENSION",
                &quote_ident(&n.name),
                n.id(),
                &n.comment,
            ));
            steps
        }
        (Some(o), None) => vec![MigrationStep::Extension(ExtensionOperation::Drop {
            name: o.name.clone(),
        })],
        (Some(o), Some(n)) => {
            let mut steps = Vec::new();
            if let (Some(old_version), Some(new_version)) = (&o.version, &n.version) {
                if old_version != new_version {
                    steps.push(MigrationStep::Extension(ExtensionOperation::Update {
                        name: n.name.clone(),
                        version: new_version.clone(),
                    }));
                }
            }
            steps.extend(diff_comment(
                "EXTENSION",
                &quote_ident(&n.name),
                n.id(),
                &o.comment,
                &n.comment,
            ));
            steps
        }
        _ => Vec::new(),
    }
}

pub fn diff_language(old: Option<&Language>, new: Option<&Language>) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let mut steps = vec![MigrationStep::Language(LanguageOperation::Create {
                language: Box::new(n.clone()),
            })];
            steps.extend(comment_on_create(
                "LANGUAGE",
                &quote_ident(&n.name),
                n.id(),
                &n.comment,
            ));
            steps
        }
        (Some(o), None) => vec![MigrationStep::Language(LanguageOperation::Drop {
            name: o.name.clone(),
        })],
        (Some(o), Some(n)) => diff_comment(
            "LANGUAGE",
            &quote_ident(&n.name),
            n.id(),
            &o.comment,
            &n.comment,
        )
        .into_iter()
        .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_bump_emits_update() {
        let old = Extension {
            name: "pgcrypto".into(),
            schema: "public".into(),
            version: Some("1.2".into()),
            comment: None,
            depends_on: vec![],
        };
        let mut new = old.clone();
        new.version = Some("1.3".into());

        let steps = diff(Some(&old), Some(&new));
        assert_eq!(steps.len(), 1);
        assert!(matches!(
            &steps[0],
            MigrationStep::Extension(ExtensionOperation::Update { version, .. }) if version == "1.3"
        ));
    }
}
