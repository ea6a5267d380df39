//! Cascade expansion.
//!
//! A column type change fails when a type-specific dependent object is in
//! the way (index, view, FK constraint, trigger, function over the row
//! type). This pass synthesizes DROP + CREATE pairs for such dependents so
//! the scheduler can sequence the DROP before the ALTER and the CREATE
//! after it. It also filters drops that Postgres performs implicitly.

use crate::catalog::constraint::ConstraintType;
use crate::catalog::{Catalog, id::DbObjectId};
use crate::diff::operations::{
    ColumnAction, MigrationStep, OperationKind, RuleOperation, SequenceOperation, TableOperation,
    TriggerOperation,
};
use std::collections::{HashMap, HashSet};

pub fn expand(
    steps: Vec<MigrationStep>,
    old_catalog: &Catalog,
    new_catalog: &Catalog,
) -> Vec<MigrationStep> {
    let mut extra_steps: Vec<MigrationStep> = Vec::new();

    let mut drop_counts: HashMap<DbObjectId, usize> = HashMap::new();
    let mut create_counts: HashMap<DbObjectId, usize> = HashMap::new();
    for step in &steps {
        let id = step.id();
        if step.operation_kind() == OperationKind::Drop {
            *drop_counts.entry(id).or_insert(0) += 1;
        } else {
            *create_counts.entry(id).or_insert(0) += 1;
        }
    }

    // objects being dropped and recreated pull their dependents along
    let mut recreate_roots: HashSet<DbObjectId> = HashSet::new();
    for id in drop_counts.keys() {
        if create_counts.get(id).copied().unwrap_or(0) > 0 {
            recreate_roots.insert(id.clone());
        }
    }

    let mut visited: HashSet<DbObjectId> = HashSet::new();
    for root in &recreate_roots {
        collect_dependents(root, old_catalog, &mut visited);
    }

    let mut cascaded_ids: HashSet<DbObjectId> = HashSet::new();
    for id in visited {
        if drop_counts.get(&id).copied().unwrap_or(0) > 0 {
            continue;
        }
        if let Some((drop, create)) = old_catalog.synthesize_drop_create(&id, new_catalog) {
            extra_steps.push(drop);
            extra_steps.push(create);
            cascaded_ids.insert(id);
        }
    }

    // column type changes: cascade the dependents the ALTER would hit
    let changed_columns = columns_with_type_changes(&steps);
    if !changed_columns.is_empty() {
        for (table_key, columns) in &changed_columns {
            let table_id = DbObjectId::Table {
                schema: table_key.0.clone(),
                name: table_key.1.clone(),
            };
            if let Some(dependents) = old_catalog.reverse_deps.get(&table_id) {
                for dep in dependents {
                    if cascaded_ids.contains(dep)
                        || drop_counts.get(dep).copied().unwrap_or(0) > 0
                    {
                        continue;
                    }
                    let affected = match dep {
                        DbObjectId::Index { schema, name } => old_catalog
                            .find_index(schema, name)
                            .map(|index| index_touches_columns(index, columns))
                            .unwrap_or(false),
                        DbObjectId::View { .. } | DbObjectId::MaterializedView { .. } => true,
                        DbObjectId::Function { .. } | DbObjectId::Trigger { .. } => true,
                        // FK constraints handled below, both sides
                        _ => false,
                    };
                    if affected {
                        if let Some((drop, create)) =
                            old_catalog.synthesize_drop_create(dep, new_catalog)
                        {
                            extra_steps.push(drop);
                            extra_steps.push(create);
                            cascaded_ids.insert(dep.clone());
                        }
                    }
                }
            }
        }

        // FK constraints can sit on the other side of the reference
        for constraint_id in fk_constraints_affected(&changed_columns, old_catalog) {
            if cascaded_ids.contains(&constraint_id)
                || drop_counts.get(&constraint_id).copied().unwrap_or(0) > 0
            {
                continue;
            }
            if let Some((drop, create)) =
                old_catalog.synthesize_drop_create(&constraint_id, new_catalog)
            {
                extra_steps.push(drop);
                extra_steps.push(create);
                cascaded_ids.insert(constraint_id);
            }
        }
    }

    let mut all = steps;
    all.extend(extra_steps);

    let all = filter_cascaded_alters(all, &cascaded_ids);
    let all = filter_table_child_drops(all, old_catalog);
    let all = filter_owned_sequence_drops(all, old_catalog);
    filter_revokes_on_dropped_objects(all)
}

/// Dropping an object takes its ACL with it; a REVOKE afterwards would
/// target a missing object.
fn filter_revokes_on_dropped_objects(steps: Vec<MigrationStep>) -> Vec<MigrationStep> {
    let dropped: HashSet<DbObjectId> = steps
        .iter()
        .filter(|step| step.operation_kind() == OperationKind::Drop)
        .map(|step| step.id())
        .collect();
    if dropped.is_empty() {
        return steps;
    }

    steps
        .into_iter()
        .filter(|step| match step {
            MigrationStep::Grant(crate::diff::operations::GrantOperation::Revoke { grant }) => {
                !dropped.contains(&grant.object.db_object_id())
            }
            _ => true,
        })
        .collect()
}

fn collect_dependents(id: &DbObjectId, catalog: &Catalog, out: &mut HashSet<DbObjectId>) {
    if out.insert(id.clone()) {
        if let Some(deps) = catalog.reverse_deps.get(id) {
            for dep in deps {
                collect_dependents(dep, catalog, out);
            }
        }
    }
}

fn index_touches_columns(
    index: &crate::catalog::index::Index,
    columns: &HashSet<String>,
) -> bool {
    match &index.columns {
        Some(cols) => cols.iter().any(|c| columns.contains(c)),
        // expression index: check the raw definition text
        None => columns.iter().any(|c| index.definition.contains(c.as_str())),
    }
}

/// (schema, table) -> column names whose type is changing.
fn columns_with_type_changes(
    steps: &[MigrationStep],
) -> HashMap<(String, String), HashSet<String>> {
    let mut result: HashMap<(String, String), HashSet<String>> = HashMap::new();
    for step in steps {
        if let MigrationStep::Table(TableOperation::Alter {
            schema,
            name,
            actions,
        }) = step
        {
            for action in actions {
                if let ColumnAction::AlterType { name: col_name, .. } = action {
                    result
                        .entry((schema.clone(), name.clone()))
                        .or_default()
                        .insert(col_name.clone());
                }
            }
        }
    }
    result
}

/// FK constraints referencing or referenced-by a type-changed column must
/// be recreated; both sides must have compatible types.
fn fk_constraints_affected(
    changed: &HashMap<(String, String), HashSet<String>>,
    old_catalog: &Catalog,
) -> HashSet<DbObjectId> {
    let mut affected = HashSet::new();
    for constraint in &old_catalog.constraints {
        if let ConstraintType::ForeignKey {
            columns,
            referenced_schema,
            referenced_table,
            referenced_columns,
            ..
        } = &constraint.constraint_type
        {
            let local_key = (constraint.schema.clone(), constraint.table.clone());
            if let Some(changing) = changed.get(&local_key) {
                if columns.iter().any(|c| changing.contains(c)) {
                    affected.insert(constraint.id());
                    continue;
                }
            }
            let ref_key = (referenced_schema.clone(), referenced_table.clone());
            if let Some(changing) = changed.get(&ref_key) {
                if referenced_columns.iter().any(|c| changing.contains(c)) {
                    affected.insert(constraint.id());
                }
            }
        }
    }
    affected
}

/// ALTERs on an object being cascaded with DROP + CREATE are redundant and
/// would run against a missing object.
fn filter_cascaded_alters(
    steps: Vec<MigrationStep>,
    cascaded_ids: &HashSet<DbObjectId>,
) -> Vec<MigrationStep> {
    if cascaded_ids.is_empty() {
        return steps;
    }
    steps
        .into_iter()
        .filter(|step| {
            !(step.operation_kind() == OperationKind::Alter && cascaded_ids.contains(&step.id()))
        })
        .collect()
}

/// Dropping a table drops its constraints, indexes, triggers and rules;
/// explicit drops for them would fail.
fn filter_table_child_drops(steps: Vec<MigrationStep>, old_catalog: &Catalog) -> Vec<MigrationStep> {
    let tables_being_dropped: HashSet<(String, String)> = steps
        .iter()
        .filter_map(|step| match step {
            MigrationStep::Table(TableOperation::Drop { schema, name }) => {
                Some((schema.clone(), name.clone()))
            }
            _ => None,
        })
        .collect();
    if tables_being_dropped.is_empty() {
        return steps;
    }

    steps
        .into_iter()
        .filter(|step| {
            let owning_table = match step {
                MigrationStep::Constraint(crate::diff::operations::ConstraintOperation::Drop {
                    schema,
                    table,
                    ..
                }) => Some((schema.clone(), table.clone())),
                MigrationStep::Trigger(TriggerOperation::Drop { schema, table, .. }) => {
                    Some((schema.clone(), table.clone()))
                }
                MigrationStep::Rule(RuleOperation::Drop { schema, table, .. }) => {
                    Some((schema.clone(), table.clone()))
                }
                MigrationStep::Index(crate::diff::operations::IndexOperation::Drop {
                    schema,
                    name,
                }) => old_catalog
                    .find_index(schema, name)
                    .map(|index| (index.schema.clone(), index.table.clone())),
                _ => None,
            };
            match owning_table {
                Some(table) => !tables_being_dropped.contains(&table),
                None => true,
            }
        })
        .collect()
}

/// A sequence owned by a column goes away with the column (or table); an
/// explicit DROP SEQUENCE afterwards would fail.
fn filter_owned_sequence_drops(
    steps: Vec<MigrationStep>,
    old_catalog: &Catalog,
) -> Vec<MigrationStep> {
    let tables_being_dropped: HashSet<(String, String)> = steps
        .iter()
        .filter_map(|step| match step {
            MigrationStep::Table(TableOperation::Drop { schema, name }) => {
                Some((schema.clone(), name.clone()))
            }
            _ => None,
        })
        .collect();

    let columns_being_dropped: HashSet<(String, String, String)> = steps
        .iter()
        .filter_map(|step| match step {
            MigrationStep::Table(TableOperation::Alter {
                schema,
                name,
                actions,
            }) => Some(actions.iter().filter_map(move |action| match action {
                ColumnAction::Drop { name: col } => {
                    Some((schema.clone(), name.clone(), col.clone()))
                }
                _ => None,
            })),
            _ => None,
        })
        .flatten()
        .collect();

    if tables_being_dropped.is_empty() && columns_being_dropped.is_empty() {
        return steps;
    }

    let mut implicit: HashSet<(String, String)> = HashSet::new();
    for seq in &old_catalog.sequences {
        if let Some(owned_by) = &seq.owned_by {
            let mut parts = owned_by.splitn(3, '.');
            if let (Some(schema), Some(table), Some(column)) =
                (parts.next(), parts.next(), parts.next())
            {
                let table_key = (schema.to_string(), table.to_string());
                let column_key = (schema.to_string(), table.to_string(), column.to_string());
                if tables_being_dropped.contains(&table_key)
                    || columns_being_dropped.contains(&column_key)
                {
                    implicit.insert((seq.schema.clone(), seq.name.clone()));
                }
            }
        }
    }

    steps
        .into_iter()
        .filter(|step| match step {
            MigrationStep::Sequence(SequenceOperation::Drop { schema, name }) => {
                !implicit.contains(&(schema.clone(), name.clone()))
            }
            _ => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_with_type_changes_collects_names() {
        let steps = vec![MigrationStep::Table(TableOperation::Alter {
            schema: "public".into(),
            name: "t".into(),
            actions: vec![
                ColumnAction::AlterType {
                    name: "c".into(),
                    new_type: "text".into(),
                },
                ColumnAction::SetNotNull { name: "d".into() },
            ],
        })];
        let changed = columns_with_type_changes(&steps);
        let cols = changed.get(&("public".into(), "t".into())).unwrap();
        assert!(cols.contains("c"));
        assert!(!cols.contains("d"));
    }
}
