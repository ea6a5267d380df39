use crate::catalog::id::{DbObjectId, DependsOn};
use crate::diff::operations::{
    ConstraintOperation, FunctionOperation, IndexOperation, MigrationStep, TriggerOperation,
    ViewOperation,
};
use anyhow::Result;
use sqlx::PgPool;
use std::collections::BTreeMap;

pub mod aggregate;
pub mod cast;
pub mod collation;
pub mod comments;
pub mod constraint;
pub mod conversion;
pub mod custom_type;
pub mod domain;
pub mod event_trigger;
pub mod extension;
pub mod foreign;
pub mod function;
pub mod grant;
pub mod id;
pub mod index;
pub mod language;
pub mod link;
pub mod operator;
pub mod rule;
pub mod schema;
pub mod sequence;
pub mod table;
pub mod text_search;
pub mod triggers;
pub mod utils;
pub mod view;

/// The complete in-memory model of a database schema.
///
/// Every object lives in its own typed table; cross-object references are
/// `DbObjectId` edges in `forward_deps`/`reverse_deps`, so cycles between
/// tables (mutual FKs) cause no ownership problems.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub schemas: Vec<schema::Schema>,
    pub extensions: Vec<extension::Extension>,
    pub languages: Vec<language::Language>,
    pub collations: Vec<collation::Collation>,
    pub conversions: Vec<conversion::Conversion>,
    pub casts: Vec<cast::Cast>,
    pub event_triggers: Vec<event_trigger::EventTrigger>,
    pub types: Vec<custom_type::CustomType>,
    pub domains: Vec<domain::Domain>,
    pub sequences: Vec<sequence::Sequence>,
    pub tables: Vec<table::Table>,
    pub constraints: Vec<constraint::Constraint>,
    pub indexes: Vec<index::Index>,
    pub triggers: Vec<triggers::Trigger>,
    pub rules: Vec<rule::Rule>,
    pub views: Vec<view::View>,
    pub functions: Vec<function::Function>,
    pub aggregates: Vec<aggregate::Aggregate>,
    pub operators: Vec<operator::Operator>,
    pub operator_classes: Vec<operator::OperatorClass>,
    pub operator_families: Vec<operator::OperatorFamily>,
    pub ts_parsers: Vec<text_search::TsParser>,
    pub ts_dictionaries: Vec<text_search::TsDictionary>,
    pub ts_templates: Vec<text_search::TsTemplate>,
    pub ts_configurations: Vec<text_search::TsConfiguration>,
    pub foreign_data_wrappers: Vec<foreign::ForeignDataWrapper>,
    pub foreign_servers: Vec<foreign::ForeignServer>,
    pub user_mappings: Vec<foreign::UserMapping>,
    pub foreign_tables: Vec<foreign::ForeignTable>,
    pub grants: Vec<grant::Grant>,

    pub forward_deps: BTreeMap<DbObjectId, Vec<DbObjectId>>,
    pub reverse_deps: BTreeMap<DbObjectId, Vec<DbObjectId>>,
}

impl Catalog {
    /// Load the full catalog over one connection so every query sees the
    /// same search_path (pg_get_function_identity_arguments output depends
    /// on it).
    pub async fn load(pool: &PgPool) -> Result<Self> {
        let mut conn = pool.acquire().await?;

        sqlx::query("SET search_path = public, pg_catalog")
            .execute(&mut *conn)
            .await?;

        let version = utils::fetch_server_version(&mut conn).await?;

        let schemas = schema::fetch(&mut conn).await?;
        let extensions = extension::fetch(&mut conn).await?;
        let languages = language::fetch(&mut conn).await?;
        let collations = collation::fetch(&mut conn, version).await?;
        let conversions = conversion::fetch(&mut conn).await?;
        let casts = cast::fetch(&mut conn).await?;
        let event_triggers = event_trigger::fetch(&mut conn).await?;
        let types = custom_type::fetch(&mut conn).await?;
        let domains = domain::fetch(&mut conn).await?;
        let sequences = sequence::fetch(&mut conn).await?;
        let tables = table::fetch(&mut conn, version).await?;
        let constraints = constraint::fetch(&mut conn).await?;
        let indexes = index::fetch(&mut conn).await?;
        let triggers = triggers::fetch(&mut conn).await?;
        let rules = rule::fetch(&mut conn).await?;
        let views = view::fetch(&mut conn).await?;
        let functions = function::fetch(&mut conn, version).await?;
        let aggregates = aggregate::fetch(&mut conn, version).await?;
        let operators = operator::fetch_operators(&mut conn).await?;
        let operator_classes = operator::fetch_operator_classes(&mut conn).await?;
        let operator_families = operator::fetch_operator_families(&mut conn).await?;
        let ts_parsers = text_search::fetch_parsers(&mut conn).await?;
        let ts_dictionaries = text_search::fetch_dictionaries(&mut conn).await?;
        let ts_templates = text_search::fetch_templates(&mut conn).await?;
        let ts_configurations = text_search::fetch_configurations(&mut conn).await?;
        let foreign_data_wrappers = foreign::fetch_wrappers(&mut conn).await?;
        let foreign_servers = foreign::fetch_servers(&mut conn).await?;
        let user_mappings = foreign::fetch_user_mappings(&mut conn).await?;
        let foreign_tables = foreign::fetch_foreign_tables(&mut conn).await?;
        let grants = grant::fetch(&mut conn).await?;

        let mut catalog = Self {
            schemas,
            extensions,
            languages,
            collations,
            conversions,
            casts,
            event_triggers,
            types,
            domains,
            sequences,
            tables,
            constraints,
            indexes,
            triggers,
            rules,
            views,
            functions,
            aggregates,
            operators,
            operator_classes,
            operator_families,
            ts_parsers,
            ts_dictionaries,
            ts_templates,
            ts_configurations,
            foreign_data_wrappers,
            foreign_servers,
            user_mappings,
            foreign_tables,
            grants,
            forward_deps: BTreeMap::new(),
            reverse_deps: BTreeMap::new(),
        };
        catalog.rebuild_dependency_maps();
        Ok(catalog)
    }

    /// Rebuild forward/reverse dependency maps from every object's
    /// `depends_on` edges.
    pub fn rebuild_dependency_maps(&mut self) {
        let mut forward: BTreeMap<DbObjectId, Vec<DbObjectId>> = BTreeMap::new();
        let mut reverse: BTreeMap<DbObjectId, Vec<DbObjectId>> = BTreeMap::new();

        fn insert_deps<T: DependsOn>(
            items: &[T],
            fwd: &mut BTreeMap<DbObjectId, Vec<DbObjectId>>,
            rev: &mut BTreeMap<DbObjectId, Vec<DbObjectId>>,
        ) {
            for item in items {
                let id = item.id();
                let deps = item.depends_on();
                fwd.insert(id.clone(), deps.to_vec());

                for dep in deps {
                    rev.entry(dep.clone()).or_default().push(id.clone());
                }
            }
        }

        insert_deps(&self.extensions, &mut forward, &mut reverse);
        insert_deps(&self.languages, &mut forward, &mut reverse);
        insert_deps(&self.collations, &mut forward, &mut reverse);
        insert_deps(&self.conversions, &mut forward, &mut reverse);
        insert_deps(&self.casts, &mut forward, &mut reverse);
        insert_deps(&self.event_triggers, &mut forward, &mut reverse);
        insert_deps(&self.types, &mut forward, &mut reverse);
        insert_deps(&self.domains, &mut forward, &mut reverse);
        insert_deps(&self.sequences, &mut forward, &mut reverse);
        insert_deps(&self.tables, &mut forward, &mut reverse);
        insert_deps(&self.constraints, &mut forward, &mut reverse);
        insert_deps(&self.indexes, &mut forward, &mut reverse);
        insert_deps(&self.triggers, &mut forward, &mut reverse);
        insert_deps(&self.rules, &mut forward, &mut reverse);
        insert_deps(&self.views, &mut forward, &mut reverse);
        insert_deps(&self.functions, &mut forward, &mut reverse);
        insert_deps(&self.aggregates, &mut forward, &mut reverse);
        insert_deps(&self.operators, &mut forward, &mut reverse);
        insert_deps(&self.operator_classes, &mut forward, &mut reverse);
        insert_deps(&self.operator_families, &mut forward, &mut reverse);
        insert_deps(&self.ts_parsers, &mut forward, &mut reverse);
        insert_deps(&self.ts_dictionaries, &mut forward, &mut reverse);
        insert_deps(&self.ts_templates, &mut forward, &mut reverse);
        insert_deps(&self.ts_configurations, &mut forward, &mut reverse);
        insert_deps(&self.foreign_data_wrappers, &mut forward, &mut reverse);
        insert_deps(&self.foreign_servers, &mut forward, &mut reverse);
        insert_deps(&self.user_mappings, &mut forward, &mut reverse);
        insert_deps(&self.foreign_tables, &mut forward, &mut reverse);
        insert_deps(&self.grants, &mut forward, &mut reverse);

        self.forward_deps = forward;
        self.reverse_deps = reverse;
    }

    pub fn find_table(&self, schema: &str, name: &str) -> Option<&table::Table> {
        self.tables
            .iter()
            .find(|t| t.schema == schema && t.name == name)
    }

    pub fn find_view(&self, schema: &str, name: &str) -> Option<&view::View> {
        self.views
            .iter()
            .find(|v| v.schema == schema && v.name == name)
    }

    pub fn find_index(&self, schema: &str, name: &str) -> Option<&index::Index> {
        self.indexes
            .iter()
            .find(|i| i.schema == schema && i.name == name)
    }

    pub fn find_constraint(
        &self,
        schema: &str,
        table: &str,
        name: &str,
    ) -> Option<&constraint::Constraint> {
        self.constraints
            .iter()
            .find(|c| c.schema == schema && c.table == table && c.name == name)
    }

    pub fn find_function(
        &self,
        schema: &str,
        name: &str,
        arguments: &str,
    ) -> Option<&function::Function> {
        self.functions
            .iter()
            .find(|f| f.schema == schema && f.name == name && f.arguments == arguments)
    }

    pub fn find_trigger(
        &self,
        schema: &str,
        table: &str,
        name: &str,
    ) -> Option<&triggers::Trigger> {
        self.triggers
            .iter()
            .find(|t| t.schema == schema && t.table_name == table && t.name == name)
    }

    /// Synthesize DROP and CREATE steps for cascading an object around a
    /// conflicting ALTER (classic case: a column type change blocked by a
    /// type-specific index). Returns None when the object kind doesn't
    /// cascade or the object is gone from the new catalog.
    pub fn synthesize_drop_create(
        &self,
        id: &DbObjectId,
        new_catalog: &Catalog,
    ) -> Option<(MigrationStep, MigrationStep)> {
        match id {
            DbObjectId::View { schema, name } | DbObjectId::MaterializedView { schema, name } => {
                let old_view = self.find_view(schema, name)?;
                let view = new_catalog.find_view(schema, name)?;
                let drop = MigrationStep::View(ViewOperation::Drop {
                    schema: schema.clone(),
                    name: name.clone(),
                    materialized: old_view.materialized,
                });
                let create = MigrationStep::View(ViewOperation::Create {
                    view: Box::new(view.clone()),
                });
                Some((drop, create))
            }

            DbObjectId::Index { schema, name } => {
                let index = new_catalog.find_index(schema, name)?;
                let drop = MigrationStep::Index(IndexOperation::Drop {
                    schema: schema.clone(),
                    name: name.clone(),
                });
                let create = MigrationStep::Index(IndexOperation::Create {
                    index: Box::new(index.clone()),
                });
                Some((drop, create))
            }

            DbObjectId::Constraint {
                schema,
                table,
                name,
            } => {
                let constraint = new_catalog.find_constraint(schema, table, name)?;
                let drop = MigrationStep::Constraint(ConstraintOperation::Drop {
                    schema: schema.clone(),
                    table: table.clone(),
                    name: name.clone(),
                });
                let create =
                    MigrationStep::Constraint(ConstraintOperation::Create(constraint.clone()));
                Some((drop, create))
            }

            DbObjectId::Function {
                schema,
                name,
                arguments,
            } => {
                let old_func = self.find_function(schema, name, arguments)?;
                let new_func = new_catalog.find_function(schema, name, arguments)?;
                let drop = MigrationStep::Function(FunctionOperation::Drop {
                    schema: schema.clone(),
                    name: name.clone(),
                    arguments: arguments.clone(),
                    kind: old_func.kind,
                });
                let create = MigrationStep::Function(FunctionOperation::Create {
                    function: Box::new(new_func.clone()),
                });
                Some((drop, create))
            }

            DbObjectId::Trigger {
                schema,
                table,
                name,
            } => {
                let trigger = new_catalog.find_trigger(schema, table, name)?;
                let drop = MigrationStep::Trigger(TriggerOperation::Drop {
                    schema: schema.clone(),
                    table: table.clone(),
                    name: name.clone(),
                });
                let create = MigrationStep::Trigger(TriggerOperation::Create {
                    trigger: Box::new(trigger.clone()),
                });
                Some((drop, create))
            }

            // Other kinds either cannot depend on table columns or are
            // handled by the regular diff path.
            _ => None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains_id(&self, id: &DbObjectId) -> bool {
        match id {
            DbObjectId::Schema { name } => self.schemas.iter().any(|s| &s.name == name),
            DbObjectId::Extension { name } => self.extensions.iter().any(|e| &e.name == name),
            DbObjectId::Language { name } => self.languages.iter().any(|l| &l.name == name),
            DbObjectId::Collation { schema, name } => self
                .collations
                .iter()
                .any(|c| &c.schema == schema && &c.name == name),
            DbObjectId::Conversion { schema, name } => self
                .conversions
                .iter()
                .any(|c| &c.schema == schema && &c.name == name),
            DbObjectId::Cast { source, target } => self
                .casts
                .iter()
                .any(|c| &c.source == source && &c.target == target),
            DbObjectId::EventTrigger { name } => {
                self.event_triggers.iter().any(|e| &e.name == name)
            }
            DbObjectId::Type { schema, name } => self
                .types
                .iter()
                .any(|t| &t.schema == schema && &t.name == name),
            DbObjectId::Domain { schema, name } => self
                .domains
                .iter()
                .any(|d| &d.schema == schema && &d.name == name),
            DbObjectId::Sequence { schema, name } => self
                .sequences
                .iter()
                .any(|s| &s.schema == schema && &s.name == name),
            DbObjectId::Table { schema, name } => self
                .tables
                .iter()
                .any(|t| &t.schema == schema && &t.name == name),
            DbObjectId::Column {
                schema,
                table,
                column,
            } => self
                .find_table(schema, table)
                .map(|t| t.columns.iter().any(|c| &c.name == column))
                .unwrap_or(false),
            DbObjectId::Constraint {
                schema,
                table,
                name,
            } => self.find_constraint(schema, table, name).is_some(),
            DbObjectId::Index { schema, name } => self.find_index(schema, name).is_some(),
            DbObjectId::Trigger {
                schema,
                table,
                name,
            } => self.find_trigger(schema, table, name).is_some(),
            DbObjectId::Rule {
                schema,
                table,
                name,
            } => self
                .rules
                .iter()
                .any(|r| &r.schema == schema && &r.table_name == table && &r.name == name),
            DbObjectId::View { schema, name } => self
                .views
                .iter()
                .any(|v| &v.schema == schema && &v.name == name && !v.materialized),
            DbObjectId::MaterializedView { schema, name } => self
                .views
                .iter()
                .any(|v| &v.schema == schema && &v.name == name && v.materialized),
            DbObjectId::Function {
                schema,
                name,
                arguments,
            } => self.find_function(schema, name, arguments).is_some(),
            DbObjectId::Aggregate {
                schema,
                name,
                arguments,
            } => self
                .aggregates
                .iter()
                .any(|a| &a.schema == schema && &a.name == name && &a.arguments == arguments),
            DbObjectId::Operator {
                schema,
                name,
                left,
                right,
            } => self.operators.iter().any(|o| {
                &o.schema == schema && &o.name == name && &o.left == left && &o.right == right
            }),
            DbObjectId::OperatorClass {
                schema,
                name,
                method,
            } => self
                .operator_classes
                .iter()
                .any(|o| &o.schema == schema && &o.name == name && &o.method == method),
            DbObjectId::OperatorFamily {
                schema,
                name,
                method,
            } => self
                .operator_families
                .iter()
                .any(|o| &o.schema == schema && &o.name == name && &o.method == method),
            DbObjectId::TextSearchParser { schema, name } => self
                .ts_parsers
                .iter()
                .any(|p| &p.schema == schema && &p.name == name),
            DbObjectId::TextSearchDictionary { schema, name } => self
                .ts_dictionaries
                .iter()
                .any(|d| &d.schema == schema && &d.name == name),
            DbObjectId::TextSearchTemplate { schema, name } => self
                .ts_templates
                .iter()
                .any(|t| &t.schema == schema && &t.name == name),
            DbObjectId::TextSearchConfiguration { schema, name } => self
                .ts_configurations
                .iter()
                .any(|c| &c.schema == schema && &c.name == name),
            DbObjectId::ForeignDataWrapper { name } => {
                self.foreign_data_wrappers.iter().any(|w| &w.name == name)
            }
            DbObjectId::ForeignServer { name } => {
                self.foreign_servers.iter().any(|s| &s.name == name)
            }
            DbObjectId::UserMapping { user, server } => self
                .user_mappings
                .iter()
                .any(|u| &u.user == user && &u.server == server),
            DbObjectId::ForeignTable { schema, name } => self
                .foreign_tables
                .iter()
                .any(|t| &t.schema == schema && &t.name == name),
            DbObjectId::Grant { id } => self.grants.iter().any(|g| &g.id() == id),
            DbObjectId::Comment { object_id } => self.contains_id(object_id),
        }
    }
}
