//! Catalog → YAML mapping.
//!
//! The mapping is built over `serde_yaml::Value` with explicit sorted
//! insertion so two runs over one catalog are byte-identical; relying on
//! the serialization library's iteration order would be a bug. Map keys
//! combine kind and identifier (`table films`,
//! `function foo(integer, text)`, `cast (text AS integer)`).

use anyhow::{Context, Result};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::catalog::comments::Commentable;
use crate::catalog::constraint::ConstraintType;
use crate::catalog::custom_type::TypeDefinition;
use crate::catalog::grant::Grant;
use crate::catalog::id::DbObjectId;
use crate::catalog::table::Column;
use crate::catalog::{Catalog, sequence::Sequence};

#[derive(Debug, Clone)]
pub struct EmitOptions {
    pub include_owner: bool,
    pub include_privileges: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            include_owner: true,
            include_privileges: true,
        }
    }
}

fn vstr(s: &str) -> Value {
    Value::String(s.to_string())
}

fn insert(map: &mut Mapping, key: &str, value: Value) {
    map.insert(vstr(key), value);
}

/// Strip trailing whitespace per line so multi-line fields emit in literal
/// block style.
pub fn clean_text(text: &str) -> String {
    if !text.contains('\n') {
        return text.to_string();
    }
    let mut cleaned = text
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n");
    if text.ends_with('\n') {
        cleaned.push('\n');
    }
    cleaned
}

struct Emitter<'a> {
    catalog: &'a Catalog,
    options: &'a EmitOptions,
    grants_by_object: BTreeMap<DbObjectId, Vec<&'a Grant>>,
}

impl<'a> Emitter<'a> {
    fn new(catalog: &'a Catalog, options: &'a EmitOptions) -> Self {
        let mut grants_by_object: BTreeMap<DbObjectId, Vec<&Grant>> = BTreeMap::new();
        for grant in &catalog.grants {
            grants_by_object
                .entry(grant.object.db_object_id())
                .or_default()
                .push(grant);
        }
        Self {
            catalog,
            options,
            grants_by_object,
        }
    }

    fn common_attrs(
        &self,
        map: &mut Mapping,
        owner: &Option<String>,
        object: &impl Commentable,
        id: &DbObjectId,
    ) {
        if self.options.include_owner {
            if let Some(owner) = owner {
                insert(map, "owner", vstr(owner));
            }
        }
        if self.options.include_privileges {
            if let Some(privileges) = self.privileges_value(id) {
                insert(map, "privileges", privileges);
            }
        }
        if let Some(comment) = object.comment() {
            insert(map, "description", vstr(&clean_text(comment)));
        }
    }

    fn privileges_value(&self, id: &DbObjectId) -> Option<Value> {
        let grants = self.grants_by_object.get(id)?;
        let mut sorted: Vec<&&Grant> = grants.iter().collect();
        sorted.sort_by_key(|g| (g.grantee.as_str().to_string(), g.with_grant_option));

        let mut entries = Vec::new();
        for grant in sorted {
            let all = grant.object.all_privileges();
            let covers_all = all
                .iter()
                .all(|p| grant.privileges.iter().any(|g| g.eq_ignore_ascii_case(p)));
            let privs: Value = if covers_all {
                Value::Sequence(vec![vstr("all")])
            } else {
                Value::Sequence(
                    grant
                        .privileges
                        .iter()
                        .map(|p| vstr(&p.to_lowercase()))
                        .collect(),
                )
            };
            let mut entry = Mapping::new();
            if grant.with_grant_option {
                let mut inner = Mapping::new();
                insert(&mut inner, "privileges", privs);
                insert(&mut inner, "grantable", Value::Bool(true));
                entry.insert(vstr(grant.grantee.as_str()), Value::Mapping(inner));
            } else {
                entry.insert(vstr(grant.grantee.as_str()), privs);
            }
            entries.push(Value::Mapping(entry));
        }
        if entries.is_empty() {
            None
        } else {
            Some(Value::Sequence(entries))
        }
    }

    fn column_value(&self, column: &Column) -> Value {
        let mut attrs = Mapping::new();
        if column.not_null {
            insert(&mut attrs, "not_null", Value::Bool(true));
        }
        insert(&mut attrs, "type", vstr(&column.data_type));
        if let Some(collation) = &column.collation {
            insert(&mut attrs, "collation", vstr(collation));
        }
        if let Some(default) = &column.default {
            insert(&mut attrs, "default", vstr(default));
        }
        if let Some(identity) = &column.identity {
            insert(&mut attrs, "identity", vstr(identity));
        }
        if let Some(generated) = &column.generated {
            insert(&mut attrs, "generated", vstr(generated));
        }
        if let Some(statistics) = column.statistics {
            insert(&mut attrs, "statistics", Value::Number(statistics.into()));
        }
        if let Some(storage) = &column.storage {
            insert(&mut attrs, "storage", vstr(storage));
        }
        if let Some(comment) = &column.comment {
            insert(&mut attrs, "description", vstr(&clean_text(comment)));
        }

        let mut entry = Mapping::new();
        entry.insert(vstr(&column.name), Value::Mapping(attrs));
        Value::Mapping(entry)
    }

    fn sequence_value(&self, sequence: &Sequence) -> Value {
        let mut map = Mapping::new();
        insert(&mut map, "data_type", vstr(&sequence.data_type));
        insert(
            &mut map,
            "start_value",
            Value::Number(sequence.start_value.into()),
        );
        insert(
            &mut map,
            "min_value",
            Value::Number(sequence.min_value.into()),
        );
        insert(
            &mut map,
            "max_value",
            Value::Number(sequence.max_value.into()),
        );
        insert(
            &mut map,
            "increment_by",
            Value::Number(sequence.increment.into()),
        );
        if sequence.cache_value != 1 {
            insert(&mut map, "cache", Value::Number(sequence.cache_value.into()));
        }
        if sequence.cycle {
            insert(&mut map, "cycle", Value::Bool(true));
        }
        if let Some(owned_by) = &sequence.owned_by {
            insert(&mut map, "owned_by", vstr(owned_by));
        }
        self.common_attrs(&mut map, &sequence.owner, sequence, &sequence.id());
        Value::Mapping(map)
    }

    fn table_value(&self, table: &crate::catalog::table::Table) -> Value {
        let mut map = Mapping::new();

        let columns: Vec<Value> = table
            .columns
            .iter()
            .map(|c| self.column_value(c))
            .collect();
        insert(&mut map, "columns", Value::Sequence(columns));

        // constraints nest under the table, sorted by name within kind
        let mut primary_key = Mapping::new();
        let mut check_constraints = Mapping::new();
        let mut unique_constraints = Mapping::new();
        let mut foreign_keys = Mapping::new();
        let mut table_constraints: Vec<&crate::catalog::constraint::Constraint> = self
            .catalog
            .constraints
            .iter()
            .filter(|c| c.schema == table.schema && c.table == table.name)
            .collect();
        table_constraints.sort_by_key(|c| c.name.clone());

        for constraint in table_constraints {
            let mut attrs = Mapping::new();
            match &constraint.constraint_type {
                ConstraintType::PrimaryKey { columns } => {
                    insert(
                        &mut attrs,
                        "columns",
                        Value::Sequence(columns.iter().map(|c| vstr(c)).collect()),
                    );
                    if let Some(comment) = &constraint.comment {
                        insert(&mut attrs, "description", vstr(comment));
                    }
                    primary_key.insert(vstr(&constraint.name), Value::Mapping(attrs));
                }
                ConstraintType::Check {
                    expression,
                    columns,
                } => {
                    if !columns.is_empty() {
                        insert(
                            &mut attrs,
                            "columns",
                            Value::Sequence(columns.iter().map(|c| vstr(c)).collect()),
                        );
                    }
                    insert(&mut attrs, "expression", vstr(expression));
                    if let Some(comment) = &constraint.comment {
                        insert(&mut attrs, "description", vstr(comment));
                    }
                    check_constraints.insert(vstr(&constraint.name), Value::Mapping(attrs));
                }
                ConstraintType::Unique { columns } => {
                    insert(
                        &mut attrs,
                        "columns",
                        Value::Sequence(columns.iter().map(|c| vstr(c)).collect()),
                    );
                    if let Some(comment) = &constraint.comment {
                        insert(&mut attrs, "description", vstr(comment));
                    }
                    unique_constraints.insert(vstr(&constraint.name), Value::Mapping(attrs));
                }
                ConstraintType::ForeignKey {
                    columns,
                    referenced_schema,
                    referenced_table,
                    referenced_columns,
                    on_delete,
                    on_update,
                    deferrable,
                } => {
                    insert(
                        &mut attrs,
                        "columns",
                        Value::Sequence(columns.iter().map(|c| vstr(c)).collect()),
                    );
                    let mut references = Mapping::new();
                    insert(&mut references, "schema", vstr(referenced_schema));
                    insert(&mut references, "table", vstr(referenced_table));
                    insert(
                        &mut references,
                        "columns",
                        Value::Sequence(referenced_columns.iter().map(|c| vstr(c)).collect()),
                    );
                    insert(&mut attrs, "references", Value::Mapping(references));
                    if let Some(on_delete) = on_delete {
                        insert(&mut attrs, "on_delete", vstr(on_delete));
                    }
                    if let Some(on_update) = on_update {
                        insert(&mut attrs, "on_update", vstr(on_update));
                    }
                    if *deferrable {
                        insert(&mut attrs, "deferrable", Value::Bool(true));
                    }
                    if let Some(comment) = &constraint.comment {
                        insert(&mut attrs, "description", vstr(comment));
                    }
                    foreign_keys.insert(vstr(&constraint.name), Value::Mapping(attrs));
                }
            }
        }

        if !primary_key.is_empty() {
            insert(&mut map, "primary_key", Value::Mapping(primary_key));
        }
        if !check_constraints.is_empty() {
            insert(&mut map, "check_constraints", Value::Mapping(check_constraints));
        }
        if !unique_constraints.is_empty() {
            insert(
                &mut map,
                "unique_constraints",
                Value::Mapping(unique_constraints),
            );
        }
        if !foreign_keys.is_empty() {
            insert(&mut map, "foreign_keys", Value::Mapping(foreign_keys));
        }

        let mut indexes = Mapping::new();
        let mut table_indexes: Vec<&crate::catalog::index::Index> = self
            .catalog
            .indexes
            .iter()
            .filter(|i| i.schema == table.schema && i.table == table.name)
            .collect();
        table_indexes.sort_by_key(|i| i.name.clone());
        for index in table_indexes {
            let mut attrs = Mapping::new();
            match &index.columns {
                Some(columns) => {
                    insert(
                        &mut attrs,
                        "columns",
                        Value::Sequence(columns.iter().map(|c| vstr(c)).collect()),
                    );
                }
                None => {
                    insert(&mut attrs, "definition", vstr(&clean_text(&index.definition)));
                }
            }
            if index.unique {
                insert(&mut attrs, "unique", Value::Bool(true));
            }
            if index.method != "btree" {
                insert(&mut attrs, "access_method", vstr(&index.method));
            }
            if let Some(tablespace) = &index.tablespace {
                insert(&mut attrs, "tablespace", vstr(tablespace));
            }
            if let Some(comment) = &index.comment {
                insert(&mut attrs, "description", vstr(comment));
            }
            indexes.insert(vstr(&index.name), Value::Mapping(attrs));
        }
        if !indexes.is_empty() {
            insert(&mut map, "indexes", Value::Mapping(indexes));
        }

        let mut triggers = Mapping::new();
        let mut table_triggers: Vec<&crate::catalog::triggers::Trigger> = self
            .catalog
            .triggers
            .iter()
            .filter(|t| t.schema == table.schema && t.table_name == table.name)
            .collect();
        table_triggers.sort_by_key(|t| t.name.clone());
        for trigger in table_triggers {
            let mut attrs = Mapping::new();
            insert(&mut attrs, "timing", vstr(&trigger.timing));
            insert(
                &mut attrs,
                "events",
                Value::Sequence(trigger.events.iter().map(|e| vstr(e)).collect()),
            );
            insert(&mut attrs, "level", vstr(&trigger.level));
            insert(&mut attrs, "procedure", vstr(&trigger.function));
            if let Some(condition) = &trigger.condition {
                insert(&mut attrs, "condition", vstr(condition));
            }
            if let Some(comment) = &trigger.comment {
                insert(&mut attrs, "description", vstr(comment));
            }
            triggers.insert(vstr(&trigger.name), Value::Mapping(attrs));
        }
        if !triggers.is_empty() {
            insert(&mut map, "triggers", Value::Mapping(triggers));
        }

        let mut rules = Mapping::new();
        let mut table_rules: Vec<&crate::catalog::rule::Rule> = self
            .catalog
            .rules
            .iter()
            .filter(|r| r.schema == table.schema && r.table_name == table.name)
            .collect();
        table_rules.sort_by_key(|r| r.name.clone());
        for rule in table_rules {
            let mut attrs = Mapping::new();
            insert(&mut attrs, "definition", vstr(&clean_text(&rule.definition)));
            if let Some(comment) = &rule.comment {
                insert(&mut attrs, "description", vstr(comment));
            }
            rules.insert(vstr(&rule.name), Value::Mapping(attrs));
        }
        if !rules.is_empty() {
            insert(&mut map, "rules", Value::Mapping(rules));
        }

        // sequences owned by this table's columns serialize here
        let mut owned_sequences: Vec<&Sequence> = self
            .catalog
            .sequences
            .iter()
            .filter(|s| {
                s.owning_table()
                    .map(|(schema, name)| schema == table.schema && name == table.name)
                    .unwrap_or(false)
            })
            .collect();
        owned_sequences.sort_by_key(|s| s.name.clone());
        for sequence in owned_sequences {
            insert(
                &mut map,
                &format!("sequence {}", sequence.name),
                self.sequence_value(sequence),
            );
        }

        if table.unlogged {
            insert(&mut map, "unlogged", Value::Bool(true));
        }
        if let Some(tablespace) = &table.tablespace {
            insert(&mut map, "tablespace", vstr(tablespace));
        }
        if !table.inherits.is_empty() {
            insert(
                &mut map,
                "inherits",
                Value::Sequence(table.inherits.iter().map(|p| vstr(p)).collect()),
            );
        }
        if let Some(partition_by) = &table.partition_by {
            insert(&mut map, "partition_by", vstr(partition_by));
        }
        if let Some(partition_of) = &table.partition_of {
            insert(&mut map, "partition_of", vstr(partition_of));
        }
        if let Some(partition_bound) = &table.partition_bound {
            insert(&mut map, "partition_bound", vstr(partition_bound));
        }
        if !table.options.is_empty() {
            insert(
                &mut map,
                "options",
                Value::Sequence(table.options.iter().map(|o| vstr(o)).collect()),
            );
        }

        self.common_attrs(&mut map, &table.owner, table, &table.id());
        Value::Mapping(map)
    }

    /// Sorted `(kind, name) -> value` entries for one schema's children.
    fn schema_children(&self, schema_name: &str) -> BTreeMap<(String, String), Value> {
        let mut children: BTreeMap<(String, String), Value> = BTreeMap::new();

        for collation in self.catalog.collations.iter().filter(|c| c.schema == schema_name) {
            let mut map = Mapping::new();
            if let Some(lc_collate) = &collation.lc_collate {
                insert(&mut map, "lc_collate", vstr(lc_collate));
            }
            if let Some(lc_ctype) = &collation.lc_ctype {
                insert(&mut map, "lc_ctype", vstr(lc_ctype));
            }
            if let Some(provider) = &collation.provider {
                insert(&mut map, "provider", vstr(provider));
            }
            self.common_attrs(&mut map, &collation.owner, collation, &collation.id());
            children.insert(
                ("collation".into(), collation.name.clone()),
                Value::Mapping(map),
            );
        }

        for conversion in self.catalog.conversions.iter().filter(|c| c.schema == schema_name) {
            let mut map = Mapping::new();
            insert(&mut map, "source_encoding", vstr(&conversion.source_encoding));
            insert(&mut map, "dest_encoding", vstr(&conversion.dest_encoding));
            insert(&mut map, "function", vstr(&conversion.function));
            if conversion.default {
                insert(&mut map, "default", Value::Bool(true));
            }
            self.common_attrs(&mut map, &conversion.owner, conversion, &conversion.id());
            children.insert(
                ("conversion".into(), conversion.name.clone()),
                Value::Mapping(map),
            );
        }

        for custom_type in self.catalog.types.iter().filter(|t| t.schema == schema_name) {
            let mut map = Mapping::new();
            match &custom_type.definition {
                TypeDefinition::Enum { labels } => {
                    insert(
                        &mut map,
                        "labels",
                        Value::Sequence(labels.iter().map(|l| vstr(l)).collect()),
                    );
                }
                TypeDefinition::Composite { attributes } => {
                    let attrs: Vec<Value> = attributes
                        .iter()
                        .map(|a| {
                            let mut inner = Mapping::new();
                            insert(&mut inner, "type", vstr(&a.data_type));
                            if let Some(collation) = &a.collation {
                                insert(&mut inner, "collation", vstr(collation));
                            }
                            let mut entry = Mapping::new();
                            entry.insert(vstr(&a.name), Value::Mapping(inner));
                            Value::Mapping(entry)
                        })
                        .collect();
                    insert(&mut map, "attributes", Value::Sequence(attrs));
                }
                TypeDefinition::Range {
                    subtype,
                    subtype_opclass,
                    canonical,
                    subtype_diff,
                } => {
                    insert(&mut map, "subtype", vstr(subtype));
                    if let Some(opclass) = subtype_opclass {
                        insert(&mut map, "subtype_opclass", vstr(opclass));
                    }
                    if let Some(canonical) = canonical {
                        insert(&mut map, "canonical", vstr(canonical));
                    }
                    if let Some(diff) = subtype_diff {
                        insert(&mut map, "subtype_diff", vstr(diff));
                    }
                }
                TypeDefinition::Base {
                    input,
                    output,
                    internallength,
                    alignment,
                    storage,
                } => {
                    insert(&mut map, "input", vstr(input));
                    insert(&mut map, "output", vstr(output));
                    if let Some(len) = internallength {
                        insert(&mut map, "internallength", vstr(len));
                    }
                    if let Some(alignment) = alignment {
                        insert(&mut map, "alignment", vstr(alignment));
                    }
                    if let Some(storage) = storage {
                        insert(&mut map, "storage", vstr(storage));
                    }
                }
            }
            self.common_attrs(&mut map, &custom_type.owner, custom_type, &custom_type.id());
            children.insert(
                ("type".into(), custom_type.name.clone()),
                Value::Mapping(map),
            );
        }

        for domain in self.catalog.domains.iter().filter(|d| d.schema == schema_name) {
            let mut map = Mapping::new();
            insert(&mut map, "type", vstr(&domain.data_type));
            if domain.not_null {
                insert(&mut map, "not_null", Value::Bool(true));
            }
            if let Some(default) = &domain.default {
                insert(&mut map, "default", vstr(default));
            }
            if !domain.check_constraints.is_empty() {
                let mut checks = Mapping::new();
                for check in &domain.check_constraints {
                    let mut inner = Mapping::new();
                    insert(&mut inner, "expression", vstr(&check.expression));
                    checks.insert(vstr(&check.name), Value::Mapping(inner));
                }
                insert(&mut map, "check_constraints", Value::Mapping(checks));
            }
            self.common_attrs(&mut map, &domain.owner, domain, &domain.id());
            children.insert(("domain".into(), domain.name.clone()), Value::Mapping(map));
        }

        // standalone sequences; owned ones nest under their table
        for sequence in self
            .catalog
            .sequences
            .iter()
            .filter(|s| s.schema == schema_name && s.owning_table().is_none())
        {
            children.insert(
                ("sequence".into(), sequence.name.clone()),
                self.sequence_value(sequence),
            );
        }

        for table in self.catalog.tables.iter().filter(|t| t.schema == schema_name) {
            children.insert(("table".into(), table.name.clone()), self.table_value(table));
        }

        for view in self.catalog.views.iter().filter(|v| v.schema == schema_name) {
            let mut map = Mapping::new();
            insert(&mut map, "definition", vstr(&clean_text(&view.definition)));
            if view.materialized {
                if let Some(tablespace) = &view.tablespace {
                    insert(&mut map, "tablespace", vstr(tablespace));
                }
            }
            self.common_attrs(&mut map, &view.owner, view, &view.id());
            let kind = if view.materialized {
                "materialized view"
            } else {
                "view"
            };
            children.insert((kind.into(), view.name.clone()), Value::Mapping(map));
        }

        for function in self.catalog.functions.iter().filter(|f| f.schema == schema_name) {
            let mut map = Mapping::new();
            insert(&mut map, "language", vstr(&function.language));
            if !function.parameters.is_empty() {
                insert(&mut map, "params", vstr(&function.parameters));
            }
            if let Some(returns) = &function.returns {
                insert(&mut map, "returns", vstr(returns));
            }
            insert(&mut map, "source", vstr(&clean_text(&function.source)));
            if function.kind == crate::catalog::function::FunctionKind::Procedure {
                insert(&mut map, "procedure", Value::Bool(true));
            }
            if let Some(volatility) = &function.volatility {
                insert(&mut map, "volatility", vstr(volatility));
            }
            if function.strict {
                insert(&mut map, "strict", Value::Bool(true));
            }
            if function.security_definer {
                insert(&mut map, "security_definer", Value::Bool(true));
            }
            self.common_attrs(&mut map, &function.owner, function, &function.id());
            children.insert(
                (
                    "function".into(),
                    format!("{}({})", function.name, function.arguments),
                ),
                Value::Mapping(map),
            );
        }

        for aggregate in self.catalog.aggregates.iter().filter(|a| a.schema == schema_name) {
            let mut map = Mapping::new();
            insert(&mut map, "sfunc", vstr(&aggregate.sfunc));
            insert(&mut map, "stype", vstr(&aggregate.stype));
            if let Some(finalfunc) = &aggregate.finalfunc {
                insert(&mut map, "finalfunc", vstr(finalfunc));
            }
            if let Some(combinefunc) = &aggregate.combinefunc {
                insert(&mut map, "combinefunc", vstr(combinefunc));
            }
            if let Some(initcond) = &aggregate.initcond {
                insert(&mut map, "initcond", vstr(initcond));
            }
            self.common_attrs(&mut map, &aggregate.owner, aggregate, &aggregate.id());
            children.insert(
                (
                    "aggregate".into(),
                    format!("{}({})", aggregate.name, aggregate.arguments),
                ),
                Value::Mapping(map),
            );
        }

        for operator in self.catalog.operators.iter().filter(|o| o.schema == schema_name) {
            let mut map = Mapping::new();
            insert(&mut map, "function", vstr(&operator.function));
            if let Some(left) = &operator.left {
                insert(&mut map, "leftarg", vstr(left));
            }
            if let Some(right) = &operator.right {
                insert(&mut map, "rightarg", vstr(right));
            }
            if let Some(commutator) = &operator.commutator {
                insert(&mut map, "commutator", vstr(commutator));
            }
            if let Some(negator) = &operator.negator {
                insert(&mut map, "negator", vstr(negator));
            }
            if let Some(restrict) = &operator.restrict {
                insert(&mut map, "restrict", vstr(restrict));
            }
            if let Some(join) = &operator.join {
                insert(&mut map, "join", vstr(join));
            }
            self.common_attrs(&mut map, &operator.owner, operator, &operator.id());
            children.insert(
                (
                    "operator".into(),
                    format!(
                        "{}({}, {})",
                        operator.name,
                        operator.left.as_deref().unwrap_or("NONE"),
                        operator.right.as_deref().unwrap_or("NONE")
                    ),
                ),
                Value::Mapping(map),
            );
        }

        for opclass in self.catalog.operator_classes.iter().filter(|o| o.schema == schema_name) {
            let mut map = Mapping::new();
            insert(&mut map, "type", vstr(&opclass.type_name));
            insert(&mut map, "access_method", vstr(&opclass.method));
            if opclass.default {
                insert(&mut map, "default", Value::Bool(true));
            }
            if let Some(family) = &opclass.family {
                insert(&mut map, "family", vstr(family));
            }
            if !opclass.operators.is_empty() {
                insert(
                    &mut map,
                    "operators",
                    Value::Sequence(opclass.operators.iter().map(|o| vstr(o)).collect()),
                );
            }
            if !opclass.functions.is_empty() {
                insert(
                    &mut map,
                    "functions",
                    Value::Sequence(opclass.functions.iter().map(|f| vstr(f)).collect()),
                );
            }
            self.common_attrs(&mut map, &opclass.owner, opclass, &opclass.id());
            children.insert(
                (
                    "operator class".into(),
                    format!("{} using {}", opclass.name, opclass.method),
                ),
                Value::Mapping(map),
            );
        }

        for opfamily in self.catalog.operator_families.iter().filter(|o| o.schema == schema_name) {
            let mut map = Mapping::new();
            insert(&mut map, "access_method", vstr(&opfamily.method));
            self.common_attrs(&mut map, &opfamily.owner, opfamily, &opfamily.id());
            children.insert(
                (
                    "operator family".into(),
                    format!("{} using {}", opfamily.name, opfamily.method),
                ),
                Value::Mapping(map),
            );
        }

        for parser in self.catalog.ts_parsers.iter().filter(|p| p.schema == schema_name) {
            let mut map = Mapping::new();
            insert(&mut map, "start", vstr(&parser.start));
            insert(&mut map, "gettoken", vstr(&parser.gettoken));
            insert(&mut map, "end", vstr(&parser.end));
            insert(&mut map, "lextypes", vstr(&parser.lextypes));
            if let Some(headline) = &parser.headline {
                insert(&mut map, "headline", vstr(headline));
            }
            if let Some(comment) = &parser.comment {
                insert(&mut map, "description", vstr(comment));
            }
            children.insert(
                ("text search parser".into(), parser.name.clone()),
                Value::Mapping(map),
            );
        }

        for dictionary in self.catalog.ts_dictionaries.iter().filter(|d| d.schema == schema_name) {
            let mut map = Mapping::new();
            insert(&mut map, "template", vstr(&dictionary.template));
            if let Some(options) = &dictionary.options {
                insert(&mut map, "options", vstr(options));
            }
            self.common_attrs(&mut map, &dictionary.owner, dictionary, &dictionary.id());
            children.insert(
                ("text search dictionary".into(), dictionary.name.clone()),
                Value::Mapping(map),
            );
        }

        for template in self.catalog.ts_templates.iter().filter(|t| t.schema == schema_name) {
            let mut map = Mapping::new();
            if let Some(init) = &template.init {
                insert(&mut map, "init", vstr(init));
            }
            insert(&mut map, "lexize", vstr(&template.lexize));
            if let Some(comment) = &template.comment {
                insert(&mut map, "description", vstr(comment));
            }
            children.insert(
                ("text search template".into(), template.name.clone()),
                Value::Mapping(map),
            );
        }

        for config in self.catalog.ts_configurations.iter().filter(|c| c.schema == schema_name) {
            let mut map = Mapping::new();
            insert(&mut map, "parser", vstr(&config.parser));
            self.common_attrs(&mut map, &config.owner, config, &config.id());
            children.insert(
                ("text search configuration".into(), config.name.clone()),
                Value::Mapping(map),
            );
        }

        for ftable in self.catalog.foreign_tables.iter().filter(|t| t.schema == schema_name) {
            let mut map = Mapping::new();
            let columns: Vec<Value> = ftable
                .columns
                .iter()
                .map(|c| self.column_value(c))
                .collect();
            insert(&mut map, "columns", Value::Sequence(columns));
            insert(&mut map, "server", vstr(&ftable.server));
            if !ftable.options.is_empty() {
                let mut options = Mapping::new();
                for (key, value) in &ftable.options {
                    insert(&mut options, key, vstr(value));
                }
                insert(&mut map, "options", Value::Mapping(options));
            }
            self.common_attrs(&mut map, &ftable.owner, ftable, &ftable.id());
            children.insert(
                ("foreign table".into(), ftable.name.clone()),
                Value::Mapping(map),
            );
        }

        children
    }

    fn emit(&self) -> Mapping {
        let mut root = Mapping::new();

        // database-wide objects first, each kind sorted by name
        for extension in &self.catalog.extensions {
            let mut map = Mapping::new();
            insert(&mut map, "schema", vstr(&extension.schema));
            if let Some(version) = &extension.version {
                insert(&mut map, "version", vstr(version));
            }
            if let Some(comment) = &extension.comment {
                insert(&mut map, "description", vstr(comment));
            }
            insert(&mut root, &format!("extension {}", extension.name), Value::Mapping(map));
        }

        for language in &self.catalog.languages {
            let mut map = Mapping::new();
            if language.trusted {
                insert(&mut map, "trusted", Value::Bool(true));
            }
            self.common_attrs(&mut map, &language.owner, language, &language.id());
            insert(&mut root, &format!("language {}", language.name), Value::Mapping(map));
        }

        for cast in &self.catalog.casts {
            let mut map = Mapping::new();
            if let Some(function) = &cast.function {
                let arguments = cast.function_arguments.as_deref().unwrap_or("");
                insert(&mut map, "function", vstr(&format!("{}({})", function, arguments)));
            }
            if let Some(context) = &cast.context {
                insert(&mut map, "context", vstr(context));
            }
            if let Some(method) = &cast.method {
                insert(&mut map, "method", vstr(method));
            }
            if let Some(comment) = &cast.comment {
                insert(&mut map, "description", vstr(comment));
            }
            insert(
                &mut root,
                &format!("cast ({} AS {})", cast.source, cast.target),
                Value::Mapping(map),
            );
        }

        for event_trigger in &self.catalog.event_triggers {
            let mut map = Mapping::new();
            insert(&mut map, "event", vstr(&event_trigger.event));
            if !event_trigger.tags.is_empty() {
                insert(
                    &mut map,
                    "tags",
                    Value::Sequence(event_trigger.tags.iter().map(|t| vstr(t)).collect()),
                );
            }
            insert(&mut map, "procedure", vstr(&event_trigger.function));
            if !event_trigger.enabled {
                insert(&mut map, "enabled", Value::Bool(false));
            }
            self.common_attrs(
                &mut map,
                &event_trigger.owner,
                event_trigger,
                &event_trigger.id(),
            );
            insert(
                &mut root,
                &format!("event trigger {}", event_trigger.name),
                Value::Mapping(map),
            );
        }

        for wrapper in &self.catalog.foreign_data_wrappers {
            let mut map = Mapping::new();
            if let Some(handler) = &wrapper.handler {
                insert(&mut map, "handler", vstr(handler));
            }
            if let Some(validator) = &wrapper.validator {
                insert(&mut map, "validator", vstr(validator));
            }
            if !wrapper.options.is_empty() {
                let mut options = Mapping::new();
                for (key, value) in &wrapper.options {
                    insert(&mut options, key, vstr(value));
                }
                insert(&mut map, "options", Value::Mapping(options));
            }
            self.common_attrs(&mut map, &wrapper.owner, wrapper, &wrapper.id());
            insert(
                &mut root,
                &format!("foreign data wrapper {}", wrapper.name),
                Value::Mapping(map),
            );
        }

        for server in &self.catalog.foreign_servers {
            let mut map = Mapping::new();
            insert(&mut map, "wrapper", vstr(&server.wrapper));
            if let Some(server_type) = &server.server_type {
                insert(&mut map, "type", vstr(server_type));
            }
            if let Some(version) = &server.version {
                insert(&mut map, "version", vstr(version));
            }
            if !server.options.is_empty() {
                let mut options = Mapping::new();
                for (key, value) in &server.options {
                    insert(&mut options, key, vstr(value));
                }
                insert(&mut map, "options", Value::Mapping(options));
            }
            self.common_attrs(&mut map, &server.owner, server, &server.id());
            insert(&mut root, &format!("server {}", server.name), Value::Mapping(map));
        }

        for mapping in &self.catalog.user_mappings {
            let mut map = Mapping::new();
            if !mapping.options.is_empty() {
                let mut options = Mapping::new();
                for (key, value) in &mapping.options {
                    insert(&mut options, key, vstr(value));
                }
                insert(&mut map, "options", Value::Mapping(options));
            }
            insert(
                &mut root,
                &format!("user mapping for {} server {}", mapping.user, mapping.server),
                Value::Mapping(map),
            );
        }

        // schemas sorted by name; children sorted by (kind, name)
        let mut schemas: Vec<&crate::catalog::schema::Schema> =
            self.catalog.schemas.iter().collect();
        schemas.sort_by_key(|s| s.name.clone());
        for schema in schemas {
            let mut map = Mapping::new();
            self.common_attrs(&mut map, &schema.owner, schema, &schema.id());
            for ((kind, name), value) in self.schema_children(&schema.name) {
                insert(&mut map, &format!("{} {}", kind, name), value);
            }
            insert(&mut root, &format!("schema {}", schema.name), Value::Mapping(map));
        }

        root
    }
}

/// Produce the full deterministic mapping for a catalog.
pub fn catalog_to_mapping(catalog: &Catalog, options: &EmitOptions) -> Value {
    Value::Mapping(Emitter::new(catalog, options).emit())
}

pub fn mapping_to_string(mapping: &Value) -> Result<String> {
    Ok(serde_yaml::to_string(mapping)?)
}

/// Lower-case the identifier, replace anything but alphanumerics and `_`
/// with `_`, truncate to `max_len`.
pub fn filename_slug(ident: &str, max_len: usize) -> String {
    let slug: String = ident
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    slug.chars().take(max_len).collect()
}

/// Kind nouns as filename prefixes ("foreign data wrapper" -> "foreign_data_wrapper").
fn kind_slug(kind: &str) -> String {
    kind.replace(' ', "_")
}

/// Base name for a function-ish identifier: everything before the argument
/// list, so overloads share a file.
fn base_name(ident: &str) -> &str {
    match ident.find('(') {
        Some(idx) => ident[..idx].trim_end(),
        None => ident,
    }
}

/// Write the mapping as one file per object under `root`, with a
/// `database.<dbname>.yaml` index. Files present in the previous index but
/// not rewritten are deleted.
pub fn write_multiple(
    mapping: &Value,
    root: &Path,
    dbname: &str,
    max_ident_len: usize,
) -> Result<()> {
    let top = mapping
        .as_mapping()
        .context("top-level YAML mapping expected")?;

    // path -> accumulated mapping content
    let mut files: BTreeMap<PathBuf, Mapping> = BTreeMap::new();

    for (key, value) in top {
        let key_str = key.as_str().context("non-string top-level key")?;
        let (kind, ident) = split_object_key(key_str);

        if kind == "schema" {
            let schema_slug = filename_slug(&ident, max_ident_len);
            let schema_dir = PathBuf::from(format!("schema.{}", schema_slug));

            let mut schema_attrs = Mapping::new();
            let mut child_entries: Vec<(String, String, Value)> = Vec::new();
            if let Some(schema_map) = value.as_mapping() {
                for (child_key, child_value) in schema_map {
                    let child_key_str = child_key.as_str().unwrap_or_default();
                    if is_object_key(child_key_str) {
                        let (child_kind, child_ident) = split_object_key(child_key_str);
                        child_entries.push((child_kind, child_ident, child_value.clone()));
                    } else {
                        schema_attrs.insert(child_key.clone(), child_value.clone());
                    }
                }
            }

            let schema_file = PathBuf::from(format!("schema.{}.yaml", schema_slug));
            let entry = files.entry(schema_file).or_default();
            let mut wrapper = Mapping::new();
            wrapper.insert(vstr(key_str), Value::Mapping(schema_attrs));
            merge_mapping(entry, &wrapper);

            for (child_kind, child_ident, child_value) in child_entries {
                let file_name = format!(
                    "{}.{}.yaml",
                    kind_slug(&child_kind),
                    filename_slug(base_name(&child_ident), max_ident_len)
                );
                let path = schema_dir.join(file_name);
                let entry = files.entry(path).or_default();
                let mut inner = Mapping::new();
                inner.insert(
                    vstr(&format!("{} {}", child_kind, child_ident)),
                    child_value,
                );
                let mut wrapper = Mapping::new();
                wrapper.insert(vstr(key_str), Value::Mapping(inner));
                merge_mapping(entry, &wrapper);
            }
        } else {
            let file_name = format!(
                "{}.{}.yaml",
                kind_slug(&kind),
                filename_slug(base_name(&ident), max_ident_len)
            );
            let entry = files.entry(PathBuf::from(file_name)).or_default();
            let mut wrapper = Mapping::new();
            wrapper.insert(vstr(key_str), value.clone());
            merge_mapping(entry, &wrapper);
        }
    }

    // delete files listed in the previous index but not written this run
    let index_path = root.join(format!("database.{}.yaml", dbname));
    let previous: Vec<PathBuf> = match fs::read_to_string(&index_path) {
        Ok(content) => serde_yaml::from_str::<BTreeMap<String, Vec<String>>>(&content)
            .ok()
            .and_then(|m| m.get("files").cloned())
            .unwrap_or_default()
            .into_iter()
            .map(PathBuf::from)
            .collect(),
        Err(_) => Vec::new(),
    };

    fs::create_dir_all(root)?;
    for (path, content) in &files {
        let full = root.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, serde_yaml::to_string(&Value::Mapping(content.clone()))?)
            .with_context(|| format!("writing {}", full.display()))?;
    }

    for stale in previous {
        if !files.contains_key(&stale) {
            let full = root.join(&stale);
            if full.exists() {
                info!("removing stale file {}", full.display());
                let _ = fs::remove_file(&full);
            }
        }
    }

    let file_list: Vec<String> = files
        .keys()
        .map(|p| p.to_string_lossy().to_string())
        .collect();
    let mut index = BTreeMap::new();
    index.insert("files".to_string(), file_list);
    fs::write(&index_path, serde_yaml::to_string(&index)?)?;

    Ok(())
}

fn merge_mapping(target: &mut Mapping, source: &Mapping) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(Value::Mapping(existing)), Value::Mapping(incoming)) => {
                merge_mapping(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Keys of the form "<kind> <identifier>". Attribute keys (owner,
/// description, columns, ...) are single words.
pub fn is_object_key(key: &str) -> bool {
    const KINDS: &[&str] = &[
        "schema",
        "extension",
        "language",
        "collation",
        "conversion",
        "cast",
        "event trigger",
        "type",
        "domain",
        "sequence",
        "table",
        "view",
        "materialized view",
        "function",
        "aggregate",
        "operator class",
        "operator family",
        "operator",
        "text search parser",
        "text search dictionary",
        "text search template",
        "text search configuration",
        "foreign data wrapper",
        "server",
        "user mapping",
        "foreign table",
    ];
    KINDS
        .iter()
        .any(|kind| key.starts_with(kind) && key.len() > kind.len() && key.as_bytes()[kind.len()] == b' ')
}

/// Split "<kind> <identifier>" into its parts, matching the longest kind.
pub fn split_object_key(key: &str) -> (String, String) {
    const MULTI_WORD: &[&str] = &[
        "event trigger",
        "materialized view",
        "operator class",
        "operator family",
        "text search parser",
        "text search dictionary",
        "text search template",
        "text search configuration",
        "foreign data wrapper",
        "foreign table",
        "user mapping",
    ];
    for kind in MULTI_WORD {
        if let Some(rest) = key.strip_prefix(kind) {
            if let Some(ident) = rest.strip_prefix(' ') {
                return (kind.to_string(), ident.to_string());
            }
        }
    }
    match key.split_once(' ') {
        Some((kind, ident)) => (kind.to_string(), ident.to_string()),
        None => (key.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_strips_trailing_whitespace() {
        assert_eq!(clean_text("a  \nb\t\n"), "a\nb\n");
        assert_eq!(clean_text("single line  "), "single line  ");
    }

    #[test]
    fn test_filename_slug() {
        assert_eq!(filename_slug("Films & Reviews", 32), "films___reviews");
        assert_eq!(filename_slug("a_very_long_identifier_name_beyond", 10), "a_very_lon");
    }

    #[test]
    fn test_split_object_key() {
        assert_eq!(
            split_object_key("table films"),
            ("table".to_string(), "films".to_string())
        );
        assert_eq!(
            split_object_key("function foo(integer, text)"),
            ("function".to_string(), "foo(integer, text)".to_string())
        );
        assert_eq!(
            split_object_key("materialized view totals"),
            ("materialized view".to_string(), "totals".to_string())
        );
        assert_eq!(
            split_object_key("cast (text AS integer)"),
            ("cast".to_string(), "(text AS integer)".to_string())
        );
    }

    #[test]
    fn test_is_object_key() {
        assert!(is_object_key("table films"));
        assert!(is_object_key("text search parser p1"));
        assert!(!is_object_key("owner"));
        assert!(!is_object_key("description"));
        assert!(!is_object_key("columns"));
    }

    #[test]
    fn test_base_name_for_overloads() {
        assert_eq!(base_name("foo(integer, text)"), "foo");
        assert_eq!(base_name("foo"), "foo");
    }
}
