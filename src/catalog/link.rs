//! Desired-side dependency linker.
//!
//! A catalog loaded from YAML has no pg_depend records to draw on, so edges
//! are derived from model content instead: column types, FK references,
//! trigger functions, and so on. Edges to objects absent from the model
//! (built-in types, system functions) are simply not created.
use std::collections::BTreeMap;

use super::Catalog;
use super::constraint::ConstraintType;
use super::id::DbObjectId;

/// Candidate spellings under which a schema-qualified object may appear in
/// textual references (column types, function names).
fn name_candidates(schema: &str, name: &str) -> Vec<String> {
    let mut candidates = vec![
        format!("{}.{}", schema, name),
        format!("\"{}\".\"{}\"", schema, name),
    ];
    if schema == "public" {
        candidates.push(name.to_string());
    }
    candidates
}

fn strip_type_decoration(data_type: &str) -> &str {
    let mut base = data_type.trim();
    while let Some(stripped) = base.strip_suffix("[]") {
        base = stripped.trim();
    }
    // drop a typmod suffix like varchar(20)
    if let Some(idx) = base.find('(') {
        if base.ends_with(')') {
            base = base[..idx].trim();
        }
    }
    base
}

struct Lookup {
    types: BTreeMap<String, DbObjectId>,
    functions: BTreeMap<(String, String), Vec<DbObjectId>>,
}

impl Lookup {
    fn build(catalog: &Catalog) -> Self {
        let mut types = BTreeMap::new();
        for t in &catalog.types {
            for candidate in name_candidates(&t.schema, &t.name) {
                types.insert(candidate, t.id());
            }
        }
        for d in &catalog.domains {
            for candidate in name_candidates(&d.schema, &d.name) {
                types.insert(candidate, d.id());
            }
        }

        let mut functions: BTreeMap<(String, String), Vec<DbObjectId>> = BTreeMap::new();
        for f in &catalog.functions {
            functions
                .entry((f.schema.clone(), f.name.clone()))
                .or_default()
                .push(f.id());
        }

        Self { types, functions }
    }

    fn type_dep(&self, data_type: &str) -> Option<DbObjectId> {
        self.types.get(strip_type_decoration(data_type)).cloned()
    }

    /// Resolve "schema.name" (with optional argument list) to a function id.
    /// An exact argument match wins; a lone overload matches by name.
    fn function_dep(&self, qualified: &str, arguments: &str) -> Option<DbObjectId> {
        let (schema, name) = qualified.split_once('.')?;
        let overloads = self
            .functions
            .get(&(schema.to_string(), name.to_string()))?;
        overloads
            .iter()
            .find(|id| {
                matches!(id, DbObjectId::Function { arguments: a, .. } if a == arguments)
            })
            .or_else(|| (overloads.len() == 1).then(|| &overloads[0]))
            .cloned()
    }
}

fn push_unique(deps: &mut Vec<DbObjectId>, dep: DbObjectId) {
    if !deps.contains(&dep) {
        deps.push(dep);
    }
}

/// Walk the model once and insert every derivable edge, then rebuild the
/// forward/reverse maps. Idempotent.
pub fn resolve(catalog: &mut Catalog) {
    let lookup = Lookup::build(catalog);

    // tables: schema, inheritance parents, column types, column sequences
    for table in &mut catalog.tables {
        let mut new_deps = vec![DbObjectId::Schema {
            name: table.schema.clone(),
        }];
        for parent in table.inherits.iter().chain(table.partition_of.iter()) {
            if let Some((schema, name)) = parent.split_once('.') {
                push_unique(
                    &mut new_deps,
                    DbObjectId::Table {
                        schema: schema.to_string(),
                        name: name.to_string(),
                    },
                );
            }
        }
        for column in &mut table.columns {
            if let Some(dep) = lookup.type_dep(&column.data_type) {
                push_unique(&mut column.depends_on, dep);
            }
            if let Some(default) = &column.default {
                if let Some(seq) = parse_nextval(default) {
                    push_unique(&mut column.depends_on, seq);
                }
            }
        }
        for dep in new_deps {
            table.push_dependency(dep);
        }
    }

    // sequences
    for seq in &mut catalog.sequences {
        push_unique(
            &mut seq.depends_on,
            DbObjectId::Schema {
                name: seq.schema.clone(),
            },
        );
    }

    // constraints: table, plus referenced table and its PK/unique key for FKs
    let pk_lookup: Vec<(String, String, Vec<String>, DbObjectId)> = catalog
        .constraints
        .iter()
        .filter_map(|c| match &c.constraint_type {
            ConstraintType::PrimaryKey { columns } | ConstraintType::Unique { columns } => Some((
                c.schema.clone(),
                c.table.clone(),
                columns.clone(),
                c.id(),
            )),
            _ => None,
        })
        .collect();

    for constraint in &mut catalog.constraints {
        push_unique(
            &mut constraint.depends_on,
            DbObjectId::Table {
                schema: constraint.schema.clone(),
                name: constraint.table.clone(),
            },
        );
        if let ConstraintType::ForeignKey {
            referenced_schema,
            referenced_table,
            referenced_columns,
            ..
        } = &constraint.constraint_type
        {
            push_unique(
                &mut constraint.depends_on,
                DbObjectId::Table {
                    schema: referenced_schema.clone(),
                    name: referenced_table.clone(),
                },
            );
            if let Some((_, _, _, key_id)) = pk_lookup.iter().find(|(s, t, cols, _)| {
                s == referenced_schema && t == referenced_table && cols == referenced_columns
            }) {
                push_unique(&mut constraint.depends_on, key_id.clone());
            }
        }
    }

    // indexes
    for index in &mut catalog.indexes {
        push_unique(
            &mut index.depends_on,
            DbObjectId::Table {
                schema: index.schema.clone(),
                name: index.table.clone(),
            },
        );
    }

    // triggers: table + function
    for trigger in &mut catalog.triggers {
        push_unique(
            &mut trigger.depends_on,
            DbObjectId::Table {
                schema: trigger.schema.clone(),
                name: trigger.table_name.clone(),
            },
        );
        if let Some(dep) = lookup.function_dep(&trigger.function, &trigger.function_arguments) {
            push_unique(&mut trigger.depends_on, dep);
        }
    }

    // rules
    for rule in &mut catalog.rules {
        push_unique(
            &mut rule.depends_on,
            DbObjectId::Table {
                schema: rule.schema.clone(),
                name: rule.table_name.clone(),
            },
        );
    }

    // views: schema edge; relation hints come from the loader's depends_on
    for view in &mut catalog.views {
        push_unique(
            &mut view.depends_on,
            DbObjectId::Schema {
                name: view.schema.clone(),
            },
        );
    }

    // functions: schema, language, user-defined argument/return types
    let language_names: Vec<String> = catalog.languages.iter().map(|l| l.name.clone()).collect();
    for function in &mut catalog.functions {
        push_unique(
            &mut function.depends_on,
            DbObjectId::Schema {
                name: function.schema.clone(),
            },
        );
        if language_names.contains(&function.language) {
            push_unique(
                &mut function.depends_on,
                DbObjectId::Language {
                    name: function.language.clone(),
                },
            );
        }
        let mut type_refs: Vec<String> = function
            .arguments
            .split(',')
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if let Some(returns) = &function.returns {
            type_refs.push(
                returns
                    .trim_start_matches("SETOF ")
                    .trim()
                    .to_string(),
            );
        }
        for type_ref in type_refs {
            if let Some(dep) = lookup.type_dep(&type_ref) {
                push_unique(&mut function.depends_on, dep);
            }
        }
    }

    // aggregates: schema, state/final/combine functions, state type
    for aggregate in &mut catalog.aggregates {
        push_unique(
            &mut aggregate.depends_on,
            DbObjectId::Schema {
                name: aggregate.schema.clone(),
            },
        );
        for func in [
            Some(&aggregate.sfunc),
            aggregate.finalfunc.as_ref(),
            aggregate.combinefunc.as_ref(),
        ]
        .into_iter()
        .flatten()
        {
            if let Some(dep) = lookup.function_dep(func, "") {
                push_unique(&mut aggregate.depends_on, dep);
            }
        }
        if let Some(dep) = lookup.type_dep(&aggregate.stype) {
            push_unique(&mut aggregate.depends_on, dep);
        }
    }

    // operators: schema, function, operand types
    for operator in &mut catalog.operators {
        push_unique(
            &mut operator.depends_on,
            DbObjectId::Schema {
                name: operator.schema.clone(),
            },
        );
        if let Some(dep) = lookup.function_dep(&operator.function, "") {
            push_unique(&mut operator.depends_on, dep);
        }
        for operand in [operator.left.as_ref(), operator.right.as_ref()]
            .into_iter()
            .flatten()
        {
            if let Some(dep) = lookup.type_dep(operand) {
                push_unique(&mut operator.depends_on, dep);
            }
        }
    }

    // operator classes / families
    for opclass in &mut catalog.operator_classes {
        push_unique(
            &mut opclass.depends_on,
            DbObjectId::Schema {
                name: opclass.schema.clone(),
            },
        );
        if let Some(family) = &opclass.family {
            push_unique(
                &mut opclass.depends_on,
                DbObjectId::OperatorFamily {
                    schema: opclass.schema.clone(),
                    name: family.clone(),
                    method: opclass.method.clone(),
                },
            );
        }
    }
    for opfamily in &mut catalog.operator_families {
        push_unique(
            &mut opfamily.depends_on,
            DbObjectId::Schema {
                name: opfamily.schema.clone(),
            },
        );
    }

    // domains: schema + base type
    for domain in &mut catalog.domains {
        push_unique(
            &mut domain.depends_on,
            DbObjectId::Schema {
                name: domain.schema.clone(),
            },
        );
        if let Some(dep) = lookup.type_dep(&domain.data_type) {
            push_unique(&mut domain.depends_on, dep);
        }
    }

    // types: schema (+ range subtype)
    for custom_type in &mut catalog.types {
        push_unique(
            &mut custom_type.depends_on,
            DbObjectId::Schema {
                name: custom_type.schema.clone(),
            },
        );
        if let super::custom_type::TypeDefinition::Range { subtype, .. } =
            &custom_type.definition
        {
            if let Some(dep) = lookup.type_dep(subtype) {
                if dep != custom_type.id() {
                    push_unique(&mut custom_type.depends_on, dep);
                }
            }
        }
    }

    // schema-bound leaf kinds
    for collation in &mut catalog.collations {
        push_unique(
            &mut collation.depends_on,
            DbObjectId::Schema {
                name: collation.schema.clone(),
            },
        );
    }
    for conversion in &mut catalog.conversions {
        push_unique(
            &mut conversion.depends_on,
            DbObjectId::Schema {
                name: conversion.schema.clone(),
            },
        );
    }

    // casts: both endpoint types plus the cast function
    for cast in &mut catalog.casts {
        if let Some(dep) = lookup.type_dep(&cast.source) {
            push_unique(&mut cast.depends_on, dep);
        }
        if let Some(dep) = lookup.type_dep(&cast.target) {
            push_unique(&mut cast.depends_on, dep);
        }
        if let (Some(func), Some(args)) = (&cast.function, &cast.function_arguments) {
            if let Some(dep) = lookup.function_dep(func, args) {
                push_unique(&mut cast.depends_on, dep);
            }
        }
    }

    // event triggers
    for et in &mut catalog.event_triggers {
        if let Some(dep) = lookup.function_dep(&et.function, "") {
            push_unique(&mut et.depends_on, dep);
        }
    }

    // text search
    for parser in &mut catalog.ts_parsers {
        push_unique(
            &mut parser.depends_on,
            DbObjectId::Schema {
                name: parser.schema.clone(),
            },
        );
    }
    for template in &mut catalog.ts_templates {
        push_unique(
            &mut template.depends_on,
            DbObjectId::Schema {
                name: template.schema.clone(),
            },
        );
    }
    for dictionary in &mut catalog.ts_dictionaries {
        push_unique(
            &mut dictionary.depends_on,
            DbObjectId::Schema {
                name: dictionary.schema.clone(),
            },
        );
        if let Some((tschema, tname)) = dictionary.template.split_once('.') {
            push_unique(
                &mut dictionary.depends_on,
                DbObjectId::TextSearchTemplate {
                    schema: tschema.to_string(),
                    name: tname.to_string(),
                },
            );
        }
    }
    for config in &mut catalog.ts_configurations {
        push_unique(
            &mut config.depends_on,
            DbObjectId::Schema {
                name: config.schema.clone(),
            },
        );
        if let Some((pschema, pname)) = config.parser.split_once('.') {
            push_unique(
                &mut config.depends_on,
                DbObjectId::TextSearchParser {
                    schema: pschema.to_string(),
                    name: pname.to_string(),
                },
            );
        }
    }

    // foreign data: server -> wrapper, mapping -> server, table -> server
    for server in &mut catalog.foreign_servers {
        push_unique(
            &mut server.depends_on,
            DbObjectId::ForeignDataWrapper {
                name: server.wrapper.clone(),
            },
        );
    }
    for mapping in &mut catalog.user_mappings {
        push_unique(
            &mut mapping.depends_on,
            DbObjectId::ForeignServer {
                name: mapping.server.clone(),
            },
        );
    }
    for ftable in &mut catalog.foreign_tables {
        push_unique(
            &mut ftable.depends_on,
            DbObjectId::Schema {
                name: ftable.schema.clone(),
            },
        );
        push_unique(
            &mut ftable.depends_on,
            DbObjectId::ForeignServer {
                name: ftable.server.clone(),
            },
        );
    }

    // grants point at their object
    for grant in &mut catalog.grants {
        let dep = grant.object.db_object_id();
        push_unique(&mut grant.depends_on, dep);
    }

    // drop edges to objects the model doesn't contain (built-ins, filtered)
    let snapshot = catalog.clone();
    prune_unresolved(catalog, &snapshot);

    catalog.rebuild_dependency_maps();
}

/// Remove dependency edges whose target is not in the model. A desired-side
/// model legitimately references built-ins that are never modeled.
fn prune_unresolved(catalog: &mut Catalog, snapshot: &Catalog) {
    fn retain(deps: &mut Vec<DbObjectId>, snapshot: &Catalog) {
        deps.retain(|dep| snapshot.contains_id(dep));
    }

    for t in &mut catalog.tables {
        for c in &mut t.columns {
            retain(&mut c.depends_on, snapshot);
        }
        t.update_all_dependencies();
    }
    for c in &mut catalog.constraints {
        retain(&mut c.depends_on, snapshot);
    }
    for i in &mut catalog.indexes {
        retain(&mut i.depends_on, snapshot);
    }
    for t in &mut catalog.triggers {
        retain(&mut t.depends_on, snapshot);
    }
    for r in &mut catalog.rules {
        retain(&mut r.depends_on, snapshot);
    }
    for v in &mut catalog.views {
        retain(&mut v.depends_on, snapshot);
    }
    for f in &mut catalog.functions {
        retain(&mut f.depends_on, snapshot);
    }
    for a in &mut catalog.aggregates {
        retain(&mut a.depends_on, snapshot);
    }
    for s in &mut catalog.sequences {
        retain(&mut s.depends_on, snapshot);
    }
    for d in &mut catalog.domains {
        retain(&mut d.depends_on, snapshot);
    }
    for t in &mut catalog.types {
        retain(&mut t.depends_on, snapshot);
    }
    for o in &mut catalog.operators {
        retain(&mut o.depends_on, snapshot);
    }
    for o in &mut catalog.operator_classes {
        retain(&mut o.depends_on, snapshot);
    }
    for o in &mut catalog.operator_families {
        retain(&mut o.depends_on, snapshot);
    }
    for c in &mut catalog.casts {
        retain(&mut c.depends_on, snapshot);
    }
    for e in &mut catalog.event_triggers {
        retain(&mut e.depends_on, snapshot);
    }
    for c in &mut catalog.collations {
        retain(&mut c.depends_on, snapshot);
    }
    for c in &mut catalog.conversions {
        retain(&mut c.depends_on, snapshot);
    }
    for p in &mut catalog.ts_parsers {
        retain(&mut p.depends_on, snapshot);
    }
    for d in &mut catalog.ts_dictionaries {
        retain(&mut d.depends_on, snapshot);
    }
    for t in &mut catalog.ts_templates {
        retain(&mut t.depends_on, snapshot);
    }
    for c in &mut catalog.ts_configurations {
        retain(&mut c.depends_on, snapshot);
    }
    for s in &mut catalog.foreign_servers {
        retain(&mut s.depends_on, snapshot);
    }
    for m in &mut catalog.user_mappings {
        retain(&mut m.depends_on, snapshot);
    }
    for t in &mut catalog.foreign_tables {
        retain(&mut t.depends_on, snapshot);
    }
    for g in &mut catalog.grants {
        retain(&mut g.depends_on, snapshot);
    }
}

/// Extract the sequence referenced by a nextval('...'::regclass) default.
fn parse_nextval(default: &str) -> Option<DbObjectId> {
    let rest = default.trim().strip_prefix("nextval('")?;
    let end = rest.find('\'')?;
    let mut target = rest[..end].to_string();
    target = target.replace('"', "");
    let (schema, name) = match target.split_once('.') {
        Some((s, n)) => (s.to_string(), n.to_string()),
        None => ("public".to_string(), target),
    };
    Some(DbObjectId::Sequence { schema, name })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nextval() {
        assert_eq!(
            parse_nextval("nextval('t1_c1_seq'::regclass)"),
            Some(DbObjectId::Sequence {
                schema: "public".into(),
                name: "t1_c1_seq".into()
            })
        );
        assert_eq!(
            parse_nextval("nextval('app.orders_id_seq'::regclass)"),
            Some(DbObjectId::Sequence {
                schema: "app".into(),
                name: "orders_id_seq".into()
            })
        );
        assert_eq!(parse_nextval("42"), None);
    }

    #[test]
    fn test_strip_type_decoration() {
        assert_eq!(strip_type_decoration("integer[]"), "integer");
        assert_eq!(strip_type_decoration("character varying(20)"), "character varying");
        assert_eq!(strip_type_decoration("public.mood"), "public.mood");
        assert_eq!(strip_type_decoration("public.mood[][]"), "public.mood");
    }
}
