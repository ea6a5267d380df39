pub mod cascade;
pub mod casts;
pub mod columns;
pub mod comment_utils;
pub mod constraints;
pub mod custom_types;
pub mod domains;
pub mod extensions;
pub mod foreign;
pub mod functions;
pub mod grants;
pub mod indexes;
pub mod operations;
pub mod schemas;
pub mod sequences;
pub mod tables;
pub mod text_search;
pub mod triggers;
pub mod views;

use crate::catalog::id::DbObjectId;
use crate::catalog::utils::is_system_schema;
use crate::catalog::{
    Catalog, aggregate::Aggregate, cast::Cast, collation::Collation, constraint::Constraint,
    conversion::Conversion, custom_type::CustomType, domain::Domain, event_trigger::EventTrigger,
    extension::Extension, function::Function, index::Index, language::Language,
    operator::Operator, operator::OperatorClass, operator::OperatorFamily, rule::Rule,
    sequence::Sequence, table::Table, view::View,
};
use crate::diff::operations::MigrationStep;
use anyhow::{Result, bail};
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Diff two linked catalogs into an unordered list of change records.
///
/// Fails only on directive errors (an `oldname` naming an object of a
/// different kind); everything else degrades per the pairing rules.
pub fn diff_all(old: &Catalog, new: &Catalog) -> Result<Vec<MigrationStep>> {
    info!("Diffing catalogs...");
    check_rename_kinds(old, new)?;

    let mut out = Vec::new();

    out.extend(diff_list_renamed(
        &old.schemas,
        &new.schemas,
        |s| s.id(),
        |s| {
            s.oldname
                .as_ref()
                .map(|oldname| DbObjectId::Schema {
                    name: oldname.clone(),
                })
        },
        schemas::rename_step,
        schemas::diff,
    ));

    out.extend(diff_list(
        &old.extensions,
        &new.extensions,
        Extension::id,
        extensions::diff,
    ));

    out.extend(diff_list(
        &old.languages,
        &new.languages,
        Language::id,
        extensions::diff_language,
    ));

    out.extend(diff_list(
        &old.collations,
        &new.collations,
        Collation::id,
        casts::diff_collation,
    ));

    out.extend(diff_list(
        &old.conversions,
        &new.conversions,
        Conversion::id,
        casts::diff_conversion,
    ));

    out.extend(diff_list(&old.casts, &new.casts, Cast::id, casts::diff));

    out.extend(diff_list(
        &old.event_triggers,
        &new.event_triggers,
        EventTrigger::id,
        casts::diff_event_trigger,
    ));

    out.extend(diff_list(
        &old.types,
        &new.types,
        CustomType::id,
        custom_types::diff,
    ));

    out.extend(diff_list(
        &old.domains,
        &new.domains,
        Domain::id,
        domains::diff,
    ));

    out.extend(diff_list_renamed(
        &old.sequences,
        &new.sequences,
        Sequence::id,
        |s| {
            s.oldname.as_ref().map(|oldname| DbObjectId::Sequence {
                schema: s.schema.clone(),
                name: oldname.clone(),
            })
        },
        sequences::rename_step,
        sequences::diff,
    ));

    out.extend(diff_list_renamed(
        &old.tables,
        &new.tables,
        Table::id,
        |t| {
            t.oldname.as_ref().map(|oldname| DbObjectId::Table {
                schema: t.schema.clone(),
                name: oldname.clone(),
            })
        },
        tables::rename_step,
        tables::diff,
    ));

    out.extend(diff_list(
        &old.constraints,
        &new.constraints,
        Constraint::id,
        constraints::diff,
    ));

    out.extend(diff_list_renamed(
        &old.indexes,
        &new.indexes,
        Index::id,
        |i| {
            i.oldname.as_ref().map(|oldname| DbObjectId::Index {
                schema: i.schema.clone(),
                name: oldname.clone(),
            })
        },
        indexes::rename_step,
        indexes::diff,
    ));

    out.extend(diff_list(
        &old.triggers,
        &new.triggers,
        |t| t.id(),
        triggers::diff,
    ));

    out.extend(diff_list(&old.rules, &new.rules, Rule::id, triggers::diff_rule));

    out.extend(diff_list_renamed(
        &old.views,
        &new.views,
        View::id,
        |v| {
            v.oldname.as_ref().map(|oldname| {
                if v.materialized {
                    DbObjectId::MaterializedView {
                        schema: v.schema.clone(),
                        name: oldname.clone(),
                    }
                } else {
                    DbObjectId::View {
                        schema: v.schema.clone(),
                        name: oldname.clone(),
                    }
                }
            })
        },
        views::rename_step,
        views::diff,
    ));

    out.extend(diff_list_renamed(
        &old.functions,
        &new.functions,
        Function::id,
        |f| {
            f.oldname.as_ref().map(|oldname| DbObjectId::Function {
                schema: f.schema.clone(),
                name: oldname.clone(),
                arguments: f.arguments.clone(),
            })
        },
        functions::rename_step,
        functions::diff,
    ));

    out.extend(diff_list(
        &old.aggregates,
        &new.aggregates,
        Aggregate::id,
        functions::diff_aggregate,
    ));

    out.extend(diff_list(
        &old.operators,
        &new.operators,
        Operator::id,
        functions::diff_operator,
    ));

    out.extend(diff_list(
        &old.operator_classes,
        &new.operator_classes,
        OperatorClass::id,
        functions::diff_operator_class,
    ));

    out.extend(diff_list(
        &old.operator_families,
        &new.operator_families,
        OperatorFamily::id,
        functions::diff_operator_family,
    ));

    out.extend(diff_list(
        &old.ts_parsers,
        &new.ts_parsers,
        |p| p.id(),
        text_search::diff_parser,
    ));
    out.extend(diff_list(
        &old.ts_templates,
        &new.ts_templates,
        |t| t.id(),
        text_search::diff_template,
    ));
    out.extend(diff_list(
        &old.ts_dictionaries,
        &new.ts_dictionaries,
        |d| d.id(),
        text_search::diff_dictionary,
    ));
    out.extend(diff_list(
        &old.ts_configurations,
        &new.ts_configurations,
        |c| c.id(),
        text_search::diff_configuration,
    ));

    out.extend(diff_list(
        &old.foreign_data_wrappers,
        &new.foreign_data_wrappers,
        |w| w.id(),
        foreign::diff_wrapper,
    ));
    out.extend(diff_list(
        &old.foreign_servers,
        &new.foreign_servers,
        |s| s.id(),
        foreign::diff_server,
    ));
    out.extend(diff_list(
        &old.user_mappings,
        &new.user_mappings,
        |m| m.id(),
        foreign::diff_user_mapping,
    ));
    out.extend(diff_list(
        &old.foreign_tables,
        &new.foreign_tables,
        |t| t.id(),
        foreign::diff_foreign_table,
    ));

    out.extend(grants::diff_grants(&old.grants, &new.grants));

    info!("Diff complete");
    Ok(out)
}

/// `oldname` must name an object of the same kind. Relations (tables,
/// views, sequences, indexes) share a namespace in Postgres, so a stale
/// directive is likely to hit a different relation kind.
fn check_rename_kinds(old: &Catalog, new: &Catalog) -> Result<()> {
    let relation_kind = |schema: &str, name: &str| -> Option<&'static str> {
        if old.find_table(schema, name).is_some() {
            Some("table")
        } else if let Some(view) = old.find_view(schema, name) {
            Some(if view.materialized {
                "materialized view"
            } else {
                "view"
            })
        } else if old.sequences.iter().any(|s| s.schema == schema && s.name == name) {
            Some("sequence")
        } else if old.find_index(schema, name).is_some() {
            Some("index")
        } else {
            None
        }
    };

    for table in &new.tables {
        if let Some(oldname) = &table.oldname {
            match relation_kind(&table.schema, oldname) {
                Some("table") | None => {}
                Some(other) => bail!(
                    "table {}.{}: oldname {:?} refers to a {}, not a table",
                    table.schema,
                    table.name,
                    oldname,
                    other
                ),
            }
        }
    }
    for view in &new.views {
        if let Some(oldname) = &view.oldname {
            let expected = if view.materialized {
                "materialized view"
            } else {
                "view"
            };
            match relation_kind(&view.schema, oldname) {
                None => {}
                Some(kind) if kind == expected => {}
                Some(other) => bail!(
                    "view {}.{}: oldname {:?} refers to a {}, not a {}",
                    view.schema,
                    view.name,
                    oldname,
                    other,
                    expected
                ),
            }
        }
    }
    for sequence in &new.sequences {
        if let Some(oldname) = &sequence.oldname {
            match relation_kind(&sequence.schema, oldname) {
                Some("sequence") | None => {}
                Some(other) => bail!(
                    "sequence {}.{}: oldname {:?} refers to a {}, not a sequence",
                    sequence.schema,
                    sequence.name,
                    oldname,
                    other
                ),
            }
        }
    }
    Ok(())
}

pub fn diff_list<T, I: Eq + Ord + Clone, R>(
    old: &[T],
    new: &[T],
    id_of: impl Fn(&T) -> I,
    diff_fn: impl Fn(Option<&T>, Option<&T>) -> Vec<R>,
) -> Vec<R> {
    let mut old_map = BTreeMap::new();
    let mut new_map = BTreeMap::new();
    for o in old {
        old_map.insert(id_of(o), o);
    }
    for n in new {
        new_map.insert(id_of(n), n);
    }

    let all_ids: BTreeSet<_> = old_map.keys().chain(new_map.keys()).cloned().collect();

    all_ids
        .into_iter()
        .flat_map(|id| diff_fn(old_map.get(&id).cloned(), new_map.get(&id).cloned()))
        .collect()
}

/// Rename-aware pairing. A desired object carrying an `oldname` that
/// matches an existing key of the same kind pairs with that object and
/// yields a rename step first; an `oldname` with no match degrades to a
/// plain create. The directive is one-shot: it never round-trips out.
pub fn diff_list_renamed<T, I: Eq + Ord + Clone>(
    old: &[T],
    new: &[T],
    id_of: impl Fn(&T) -> I,
    oldkey_of: impl Fn(&T) -> Option<I>,
    rename_step: impl Fn(&T, &T) -> MigrationStep,
    diff_fn: impl Fn(Option<&T>, Option<&T>) -> Vec<MigrationStep>,
) -> Vec<MigrationStep> {
    let mut old_map = BTreeMap::new();
    let mut new_map = BTreeMap::new();
    for o in old {
        old_map.insert(id_of(o), o);
    }
    for n in new {
        new_map.insert(id_of(n), n);
    }

    let mut out = Vec::new();
    let mut renamed_old_keys: BTreeSet<I> = BTreeSet::new();
    let mut renamed_pairs: Vec<(&T, &T)> = Vec::new();

    for n in new {
        let new_key = id_of(n);
        if old_map.contains_key(&new_key) {
            continue; // already exists under its own name
        }
        if let Some(old_key) = oldkey_of(n) {
            if let Some(o) = old_map.get(&old_key) {
                out.push(rename_step(*o, n));
                renamed_old_keys.insert(old_key);
                renamed_pairs.push((*o, n));
            }
        }
    }

    for (o, n) in &renamed_pairs {
        out.extend(diff_fn(Some(*o), Some(*n)));
    }

    let renamed_new_keys: BTreeSet<I> = renamed_pairs.iter().map(|(_, n)| id_of(*n)).collect();

    let all_ids: BTreeSet<_> = old_map.keys().chain(new_map.keys()).cloned().collect();
    for id in all_ids {
        if renamed_old_keys.contains(&id) || renamed_new_keys.contains(&id) {
            continue;
        }
        out.extend(diff_fn(
            old_map.get(&id).cloned(),
            new_map.get(&id).cloned(),
        ));
    }

    out
}

/// Order the plan: every DROP first (dependents before dependees), then
/// primary creations/alterations, then relationship steps (FKs, sequence
/// ownership) that close cycles.
pub fn diff_order(
    steps: Vec<MigrationStep>,
    old_catalog: &Catalog,
    new_catalog: &Catalog,
) -> Result<Vec<MigrationStep>> {
    info!("Ordering migration steps...");
    let mut drop_steps = Vec::new();
    let mut primary_steps = Vec::new();
    let mut relationship_steps = Vec::new();

    for step in steps {
        if step.is_drop() {
            drop_steps.push(step);
        } else if step.is_relationship() {
            relationship_steps.push(step);
        } else {
            primary_steps.push(step);
        }
    }

    let mut ordered = order_drops(drop_steps, old_catalog)?;
    ordered.extend(order_creates(primary_steps, new_catalog)?);
    ordered.extend(order_creates(relationship_steps, new_catalog)?);
    Ok(ordered)
}

/// Toposort DROP steps so dependents go before the objects they depend on.
fn order_drops(steps: Vec<MigrationStep>, old_catalog: &Catalog) -> Result<Vec<MigrationStep>> {
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let mut id_to_indices: BTreeMap<DbObjectId, Vec<usize>> = BTreeMap::new();
    let mut node_indices = Vec::new();

    for (i, step) in steps.iter().enumerate() {
        let idx = graph.add_node(i);
        node_indices.push(idx);
        id_to_indices.entry(step.id()).or_default().push(i);
    }

    for (i, step) in steps.iter().enumerate() {
        if let Some(deps) = old_catalog.forward_deps.get(&step.id()) {
            for dep in deps {
                if let Some(indices) = id_to_indices.get(dep) {
                    for &dep_i in indices {
                        // this step depends on dep, so it drops first
                        graph.add_edge(node_indices[i], node_indices[dep_i], ());
                    }
                }
            }
        }
    }

    toposorted(graph, node_indices, steps)
}

/// Toposort non-DROP steps with create-style edges: every step comes after
/// the steps of the objects it depends on.
fn order_creates(steps: Vec<MigrationStep>, new_catalog: &Catalog) -> Result<Vec<MigrationStep>> {
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let mut id_to_indices: BTreeMap<DbObjectId, Vec<usize>> = BTreeMap::new();
    let mut node_indices = Vec::new();

    for (i, step) in steps.iter().enumerate() {
        let idx = graph.add_node(i);
        node_indices.push(idx);
        id_to_indices.entry(step.id()).or_default().push(i);
    }

    let mut missing_deps: Vec<(DbObjectId, DbObjectId)> = Vec::new();

    for (i, step) in steps.iter().enumerate() {
        // comments order after their object's steps
        if let DbObjectId::Comment { object_id } = &step.id() {
            if let Some(indices) = id_to_indices.get(object_id.as_ref()) {
                for &dep_i in indices {
                    if dep_i != i {
                        graph.add_edge(node_indices[dep_i], node_indices[i], ());
                    }
                }
            }
            continue;
        }

        let catalog_deps = new_catalog.forward_deps.get(&step.id());
        if let Some(deps) = catalog_deps {
            for dep in deps {
                if let Some(indices) = id_to_indices.get(dep) {
                    for &dep_i in indices {
                        if dep_i != i {
                            graph.add_edge(node_indices[dep_i], node_indices[i], ());
                        }
                    }
                } else if !new_catalog.contains_id(dep) {
                    missing_deps.push((step.id(), dep.clone()));
                }
            }
        } else {
            // Fallback for dynamically generated steps (REVOKEs for
            // defaults) that aren't in the catalog's forward_deps.
            for dep in &step.dependencies() {
                if let Some(indices) = id_to_indices.get(dep) {
                    for &dep_i in indices {
                        if dep_i != i {
                            graph.add_edge(node_indices[dep_i], node_indices[i], ());
                        }
                    }
                } else if !new_catalog.contains_id(dep) {
                    missing_deps.push((step.id(), dep.clone()));
                }
            }
        }
    }

    for (object_id, missing_dep) in &missing_deps {
        if let Some(schema) = missing_dep.schema() {
            if is_system_schema(schema) {
                continue;
            }
        }
        warn!(
            "{:?} depends on {:?} which is not in the catalog (may be filtered by config)",
            object_id, missing_dep
        );
    }

    // within one id: renames first, then creates, then everything else
    let mut rename_indices: BTreeMap<DbObjectId, Vec<usize>> = BTreeMap::new();
    let mut create_indices: BTreeMap<DbObjectId, Vec<usize>> = BTreeMap::new();
    let mut other_indices: BTreeMap<DbObjectId, Vec<usize>> = BTreeMap::new();
    for (i, step) in steps.iter().enumerate() {
        let id = step.id();
        if matches!(step, MigrationStep::Rename(_)) {
            rename_indices.entry(id).or_default().push(i);
        } else if step.is_create() {
            create_indices.entry(id).or_default().push(i);
        } else {
            other_indices.entry(id).or_default().push(i);
        }
    }
    for (id, renames) in &rename_indices {
        for targets in [create_indices.get(id), other_indices.get(id)]
            .into_iter()
            .flatten()
        {
            for &rename_i in renames {
                for &target_i in targets {
                    graph.add_edge(node_indices[rename_i], node_indices[target_i], ());
                }
            }
        }
    }
    for (id, creates) in &create_indices {
        if let Some(others) = other_indices.get(id) {
            for &create_i in creates {
                for &other_i in others {
                    graph.add_edge(node_indices[create_i], node_indices[other_i], ());
                }
            }
        }
    }

    // extensions go before every non-schema creation: objects may use
    // extension-provided types without an explicit edge
    let extension_creates: Vec<usize> = steps
        .iter()
        .enumerate()
        .filter_map(|(i, step)| {
            (matches!(step, MigrationStep::Extension(_)) && step.is_create()).then_some(i)
        })
        .collect();
    let non_extension_creates: Vec<usize> = steps
        .iter()
        .enumerate()
        .filter_map(|(i, step)| {
            (!matches!(step, MigrationStep::Extension(_) | MigrationStep::Schema(_))
                && step.is_create())
            .then_some(i)
        })
        .collect();
    for &ext_i in &extension_creates {
        for &obj_i in &non_extension_creates {
            graph.add_edge(node_indices[ext_i], node_indices[obj_i], ());
        }
    }

    toposorted(graph, node_indices, steps)
}

fn toposorted(
    graph: DiGraph<usize, ()>,
    node_indices: Vec<petgraph::graph::NodeIndex>,
    steps: Vec<MigrationStep>,
) -> Result<Vec<MigrationStep>> {
    let index_to_step_idx: BTreeMap<_, _> = node_indices
        .iter()
        .enumerate()
        .map(|(i, &node)| (node, i))
        .collect();

    let sorted = toposort(&graph, None).map_err(|cycle| {
        let node = cycle.node_id();
        if let Some(&step_idx) = index_to_step_idx.get(&node) {
            let step = &steps[step_idx];
            anyhow::anyhow!(
                "Dependency cycle detected involving {} operation on {:?}. \
                 Check for circular references between database objects.",
                step.kind_name(),
                step.id()
            )
        } else {
            anyhow::anyhow!("Dependency cycle detected in migration ordering.")
        }
    })?;

    Ok(sorted
        .into_iter()
        .filter_map(|node| index_to_step_idx.get(&node).map(|&i| steps[i].clone()))
        .collect())
}
