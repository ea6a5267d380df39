use crate::catalog::table::Table;
use crate::diff::columns;
use crate::diff::comment_utils::{comment_on_create, diff_comment, diff_owner};
use crate::diff::operations::{ColumnAction, MigrationStep, RenameOperation, TableOperation};
use crate::render::{qualified, quote_ident};
use std::collections::BTreeMap;
use tracing::warn;

pub fn rename_step(old: &Table, new: &Table) -> MigrationStep {
    MigrationStep::Rename(RenameOperation {
        object_type: "TABLE".to_string(),
        old_identifier: qualified(&old.schema, &old.name),
        new_name: new.name.clone(),
        object_id: new.id(),
    })
}

fn column_identifier(table: &Table, column: &str) -> String {
    format!(
        "{}.{}",
        qualified(&table.schema, &table.name),
        quote_ident(column)
    )
}

pub fn diff(old: Option<&Table>, new: Option<&Table>) -> Vec<MigrationStep> {
    match (old, new) {
        (None, Some(n)) => {
            let mut steps = vec![MigrationStep::Table(TableOperation::Create {
                table: Box::new(n.clone()),
            })];

            let identifier = qualified(&n.schema, &n.name);
            steps.extend(diff_owner(
                "TABLE",
                &identifier,
                n.id(),
                &None,
                &n.owner,
            ));
            steps.extend(comment_on_create("TABLE", &identifier, n.id(), &n.comment));
            for col in &n.columns {
                steps.extend(comment_on_create(
                    "COLUMN",
                    &column_identifier(n, &col.name),
                    n.id(),
                    &col.comment,
                ));
            }

            steps
        }
        (Some(o), None) => {
            vec![MigrationStep::Table(TableOperation::Drop {
                schema: o.schema.clone(),
                name: o.name.clone(),
            })]
        }
        (Some(o), Some(n)) => {
            let mut actions = diff_columns(o, n);

            if o.unlogged != n.unlogged {
                actions.push(if n.unlogged {
                    ColumnAction::SetUnlogged
                } else {
                    ColumnAction::SetLogged
                });
            }

            if o.tablespace != n.tablespace {
                actions.push(ColumnAction::SetTablespace {
                    tablespace: n.tablespace.clone(),
                });
            }

            for parent in &n.inherits {
                if !o.inherits.contains(parent) {
                    actions.push(ColumnAction::Inherit {
                        parent: parent.clone(),
                    });
                }
            }
            for parent in &o.inherits {
                if !n.inherits.contains(parent) {
                    actions.push(ColumnAction::NoInherit {
                        parent: parent.clone(),
                    });
                }
            }

            if o.partition_by != n.partition_by {
                warn!(
                    "partition key of {}.{} differs; Postgres cannot change a partition key \
                     in place, change is not actioned",
                    n.schema, n.name
                );
            }

            let old_options: BTreeMap<&str, &str> = o
                .options
                .iter()
                .filter_map(|opt| opt.split_once('='))
                .collect();
            let new_options: BTreeMap<&str, &str> = n
                .options
                .iter()
                .filter_map(|opt| opt.split_once('='))
                .collect();
            for (key, value) in &new_options {
                if old_options.get(key) != Some(value) {
                    actions.push(ColumnAction::SetOption {
                        option: format!("{}={}", key, value),
                    });
                }
            }
            for key in old_options.keys() {
                if !new_options.contains_key(key) {
                    actions.push(ColumnAction::ResetOption {
                        option: (*key).to_string(),
                    });
                }
            }

            let mut steps = Vec::new();
            if !actions.is_empty() {
                steps.push(MigrationStep::Table(TableOperation::Alter {
                    schema: n.schema.clone(),
                    name: n.name.clone(),
                    actions,
                }));
            }

            let identifier = qualified(&n.schema, &n.name);
            steps.extend(diff_owner(
                "TABLE",
                &identifier,
                n.id(),
                &o.owner,
                &n.owner,
            ));
            steps.extend(diff_comment(
                "TABLE",
                &identifier,
                n.id(),
                &o.comment,
                &n.comment,
            ));

            // column comment transitions, paired by (possibly renamed) name
            let old_by_name: BTreeMap<&str, &crate::catalog::table::Column> =
                o.columns.iter().map(|c| (c.name.as_str(), c)).collect();
            for new_col in &n.columns {
                let old_col = old_by_name.get(new_col.name.as_str()).or_else(|| {
                    new_col
                        .oldname
                        .as_deref()
                        .and_then(|oldname| old_by_name.get(oldname))
                });
                if let Some(old_col) = old_col {
                    steps.extend(diff_comment(
                        "COLUMN",
                        &column_identifier(n, &new_col.name),
                        n.id(),
                        &old_col.comment,
                        &new_col.comment,
                    ));
                } else {
                    steps.extend(comment_on_create(
                        "COLUMN",
                        &column_identifier(n, &new_col.name),
                        n.id(),
                        &new_col.comment,
                    ));
                }
            }

            steps
        }
        _ => Vec::new(),
    }
}

/// Pair columns by name (honoring per-column oldname renames) and emit the
/// resulting actions. A pure reordering of identical columns produces no
/// DDL, only a warning: Postgres cannot reorder columns.
fn diff_columns(o: &Table, n: &Table) -> Vec<ColumnAction> {
    let old_by_name: BTreeMap<String, &crate::catalog::table::Column> =
        o.columns.iter().map(|c| (c.name.clone(), c)).collect();
    let new_by_name: BTreeMap<String, &crate::catalog::table::Column> =
        n.columns.iter().map(|c| (c.name.clone(), c)).collect();

    let mut actions = Vec::new();
    let mut consumed_old: Vec<String> = Vec::new();

    // renames first so later actions address the new name
    let mut renamed_pairs: Vec<(&crate::catalog::table::Column, &crate::catalog::table::Column)> =
        Vec::new();
    for new_col in &n.columns {
        if old_by_name.contains_key(&new_col.name) {
            continue;
        }
        if let Some(oldname) = &new_col.oldname {
            if let Some(old_col) = old_by_name.get(oldname) {
                if !new_by_name.contains_key(oldname) {
                    actions.push(ColumnAction::Rename {
                        old: oldname.clone(),
                        new: new_col.name.clone(),
                    });
                    renamed_pairs.push((*old_col, new_col));
                    consumed_old.push(oldname.clone());
                }
            }
        }
    }

    for (old_col, new_col) in &renamed_pairs {
        // compare attributes as if the rename already happened
        let mut old_as_renamed = (*old_col).clone();
        old_as_renamed.name = new_col.name.clone();
        actions.extend(columns::diff(Some(&old_as_renamed), Some(*new_col)));
    }

    // adds and in-place changes, in desired order
    for new_col in &n.columns {
        if renamed_pairs.iter().any(|(_, nc)| nc.name == new_col.name) {
            continue;
        }
        actions.extend(columns::diff(
            old_by_name.get(&new_col.name).copied(),
            Some(new_col),
        ));
    }

    // drops for survivors of neither pairing
    for old_col in &o.columns {
        if !new_by_name.contains_key(&old_col.name) && !consumed_old.contains(&old_col.name) {
            actions.extend(columns::diff(Some(old_col), None));
        }
    }

    // position-only changes are detectable but not actionable
    let old_survivors: Vec<&str> = o
        .columns
        .iter()
        .filter(|c| new_by_name.contains_key(&c.name))
        .map(|c| c.name.as_str())
        .collect();
    let new_survivors: Vec<&str> = n
        .columns
        .iter()
        .filter(|c| old_by_name.contains_key(&c.name))
        .map(|c| c.name.as_str())
        .collect();
    if old_survivors != new_survivors {
        warn!(
            "column order of {}.{} differs from the catalog; Postgres cannot reorder columns, \
             order change alone is not actioned",
            n.schema, n.name
        );
    }

    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::id::DbObjectId;
    use crate::catalog::table::{Column, make_test_column};

    fn make_table(name: &str, columns: Vec<Column>) -> Table {
        Table::new(
            "public".to_string(),
            name.to_string(),
            columns,
            vec![DbObjectId::Schema {
                name: "public".to_string(),
            }],
        )
    }

    #[test]
    fn test_create_table() {
        let table = make_table(
            "users",
            vec![
                make_test_column("id", "integer", true),
                make_test_column("name", "text", false),
            ],
        );
        let steps = diff(None, Some(&table));
        assert_eq!(steps.len(), 1);
        assert!(matches!(
            &steps[0],
            MigrationStep::Table(TableOperation::Create { .. })
        ));
    }

    #[test]
    fn test_drop_table() {
        let table = make_table("users", vec![make_test_column("id", "integer", true)]);
        let steps = diff(Some(&table), None);
        assert!(matches!(
            &steps[0],
            MigrationStep::Table(TableOperation::Drop { .. })
        ));
    }

    #[test]
    fn test_add_column() {
        let old = make_table("t", vec![make_test_column("c1", "integer", false)]);
        let new = make_table(
            "t",
            vec![
                make_test_column("c1", "integer", false),
                make_test_column("c2", "text", false),
            ],
        );
        let steps = diff(Some(&old), Some(&new));
        assert_eq!(steps.len(), 1);
        match &steps[0] {
            MigrationStep::Table(TableOperation::Alter { actions, .. }) => {
                assert_eq!(actions.len(), 1);
                assert!(matches!(&actions[0], ColumnAction::Add { column } if column.name == "c2"));
            }
            other => panic!("expected Alter, got {:?}", other),
        }
    }

    #[test]
    fn test_identical_tables_produce_nothing() {
        let table = make_table(
            "t",
            vec![
                make_test_column("a", "integer", false),
                make_test_column("b", "integer", false),
            ],
        );
        assert!(diff(Some(&table), Some(&table)).is_empty());
    }

    #[test]
    fn test_reorder_of_identical_columns_emits_nothing() {
        let old = make_table(
            "t",
            vec![
                make_test_column("a", "integer", false),
                make_test_column("b", "integer", false),
            ],
        );
        let new = make_table(
            "t",
            vec![
                make_test_column("b", "integer", false),
                make_test_column("a", "integer", false),
            ],
        );
        assert!(diff(Some(&old), Some(&new)).is_empty());
    }

    #[test]
    fn test_reordered_column_with_type_change_still_alters() {
        // pairing is by name, never position: b's type change must surface
        // even though both columns moved
        let old = make_table(
            "t",
            vec![
                make_test_column("a", "integer", false),
                make_test_column("b", "integer", false),
            ],
        );
        let new = make_table(
            "t",
            vec![
                make_test_column("b", "text", false),
                make_test_column("a", "integer", false),
            ],
        );
        let steps = diff(Some(&old), Some(&new));
        assert_eq!(steps.len(), 1);
        match &steps[0] {
            MigrationStep::Table(TableOperation::Alter { actions, .. }) => {
                assert!(actions.iter().any(|a| matches!(
                    a,
                    ColumnAction::AlterType { name, new_type } if name == "b" && new_type == "text"
                )));
            }
            other => panic!("expected Alter, got {:?}", other),
        }
    }

    #[test]
    fn test_column_rename_via_oldname() {
        let old = make_table("t", vec![make_test_column("old_col", "integer", false)]);
        let mut renamed = make_test_column("new_col", "integer", false);
        renamed.oldname = Some("old_col".to_string());
        let new = make_table("t", vec![renamed]);

        let steps = diff(Some(&old), Some(&new));
        assert_eq!(steps.len(), 1);
        match &steps[0] {
            MigrationStep::Table(TableOperation::Alter { actions, .. }) => {
                assert_eq!(actions.len(), 1);
                assert!(matches!(
                    &actions[0],
                    ColumnAction::Rename { old, new } if old == "old_col" && new == "new_col"
                ));
            }
            other => panic!("expected Alter, got {:?}", other),
        }
    }

    #[test]
    fn test_table_rename_step() {
        let old = make_table("t1", vec![make_test_column("c", "integer", false)]);
        let mut new = make_table("t2", vec![make_test_column("c", "integer", false)]);
        new.oldname = Some("t1".to_string());

        let step = rename_step(&old, &new);
        match step {
            MigrationStep::Rename(op) => {
                assert_eq!(op.old_identifier, "\"public\".\"t1\"");
                assert_eq!(op.new_name, "t2");
            }
            other => panic!("expected Rename, got {:?}", other),
        }
    }
}
