//! Fetch user-defined types: enums, composites, ranges and base types.
use anyhow::Result;
use sqlx::Row;
use sqlx::postgres::PgConnection;
use tracing::info;

use super::comments::Commentable;
use super::id::{DbObjectId, DependsOn};
use super::utils::is_system_schema;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeAttribute {
    pub name: String,
    pub data_type: String,
    pub collation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDefinition {
    Enum {
        labels: Vec<String>,
    },
    Composite {
        attributes: Vec<CompositeAttribute>,
    },
    Range {
        subtype: String,
        subtype_opclass: Option<String>,
        canonical: Option<String>,
        subtype_diff: Option<String>,
    },
    Base {
        input: String,
        output: String,
        internallength: Option<String>,
        alignment: Option<String>,
        storage: Option<String>,
    },
}

impl TypeDefinition {
    pub fn kind(&self) -> &'static str {
        match self {
            TypeDefinition::Enum { .. } => "enum",
            TypeDefinition::Composite { .. } => "composite",
            TypeDefinition::Range { .. } => "range",
            TypeDefinition::Base { .. } => "base",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CustomType {
    pub schema: String,
    pub name: String,
    pub definition: TypeDefinition,
    pub owner: Option<String>,
    pub comment: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl CustomType {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::Type {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }
}

impl DependsOn for CustomType {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for CustomType {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

pub async fn fetch(conn: &mut PgConnection) -> Result<Vec<CustomType>> {
    info!("Fetching types...");
    let rows = sqlx::query(
        r#"
        SELECT
            n.nspname AS schema_name,
            t.typname AS type_name,
            t.typtype::text AS typtype,
            r.rolname AS owner,
            d.description AS comment,
            ARRAY(
                SELECT e.enumlabel
                FROM pg_enum e
                WHERE e.enumtypid = t.oid
                ORDER BY e.enumsortorder
            ) AS enum_labels,
            ARRAY(
                SELECT a.attname || E'\x01' ||
                       pg_catalog.format_type(a.atttypid, a.atttypmod) || E'\x01' ||
                       COALESCE(
                           CASE WHEN a.attcollation <> at.typcollation
                                THEN coll.collname END, '')
                FROM pg_attribute a
                JOIN pg_type at ON a.atttypid = at.oid
                LEFT JOIN pg_collation coll ON a.attcollation = coll.oid
                WHERE a.attrelid = t.typrelid
                  AND a.attnum > 0
                  AND NOT a.attisdropped
                ORDER BY a.attnum
            ) AS composite_attrs,
            st.typname AS range_subtype,
            sn.nspname AS range_subtype_schema,
            opc.opcname AS range_opclass,
            NULLIF(rng.rngcanonical::text, '-') AS range_canonical,
            NULLIF(rng.rngsubdiff::text, '-') AS range_subdiff,
            t.typinput::text AS type_input,
            t.typoutput::text AS type_output,
            CASE WHEN t.typlen > 0 THEN t.typlen::text
                 WHEN t.typlen = -1 THEN 'variable' END AS internallength,
            CASE t.typalign::text
                WHEN 'c' THEN 'char' WHEN 's' THEN 'int2'
                WHEN 'i' THEN 'int4' WHEN 'd' THEN 'double'
            END AS alignment,
            CASE t.typstorage::text
                WHEN 'p' THEN 'plain' WHEN 'e' THEN 'external'
                WHEN 'x' THEN 'extended' WHEN 'm' THEN 'main'
            END AS storage
        FROM pg_type t
        JOIN pg_namespace n ON t.typnamespace = n.oid
        JOIN pg_roles r ON t.typowner = r.oid
        LEFT JOIN pg_description d ON d.objoid = t.oid AND d.objsubid = 0
        LEFT JOIN pg_range rng ON rng.rngtypid = t.oid
        LEFT JOIN pg_type st ON rng.rngsubtype = st.oid
        LEFT JOIN pg_namespace sn ON st.typnamespace = sn.oid
        LEFT JOIN pg_opclass opc ON rng.rngsubopc = opc.oid AND NOT opc.opcdefault
        WHERE t.typtype IN ('e', 'c', 'r', 'b')
          AND n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND NOT EXISTS (
              SELECT 1 FROM pg_depend dep
              WHERE dep.objid = t.oid AND dep.deptype = 'e'
          )
          -- composites: only stand-alone CREATE TYPE, not table row types
          AND (t.typtype <> 'c' OR EXISTS (
              SELECT 1 FROM pg_class c
              WHERE c.oid = t.typrelid AND c.relkind = 'c'
          ))
          -- base types: skip array companion types
          AND (t.typtype <> 'b' OR t.typcategory <> 'A')
        ORDER BY n.nspname, t.typname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut types = Vec::new();
    for row in rows {
        let schema: String = row.try_get("schema_name")?;
        let name: String = row.try_get("type_name")?;
        let typtype: String = row.try_get("typtype")?;

        let mut depends_on = vec![DbObjectId::Schema {
            name: schema.clone(),
        }];

        let definition = match typtype.as_str() {
            "e" => TypeDefinition::Enum {
                labels: row.try_get("enum_labels")?,
            },
            "c" => {
                let raw_attrs: Vec<String> = row.try_get("composite_attrs")?;
                let attributes = raw_attrs
                    .iter()
                    .filter_map(|raw| {
                        let mut parts = raw.splitn(3, '\x01');
                        let name = parts.next()?.to_string();
                        let data_type = parts.next()?.to_string();
                        let collation = parts.next().filter(|c| !c.is_empty());
                        Some(CompositeAttribute {
                            name,
                            data_type,
                            collation: collation.map(|c| c.to_string()),
                        })
                    })
                    .collect();
                TypeDefinition::Composite { attributes }
            }
            "r" => {
                let subtype_schema: Option<String> = row.try_get("range_subtype_schema")?;
                let subtype: String = row
                    .try_get::<Option<String>, _>("range_subtype")?
                    .unwrap_or_default();
                if let Some(ss) = &subtype_schema {
                    if !is_system_schema(ss) {
                        depends_on.push(DbObjectId::Type {
                            schema: ss.clone(),
                            name: subtype.clone(),
                        });
                    }
                }
                TypeDefinition::Range {
                    subtype,
                    subtype_opclass: row.try_get("range_opclass")?,
                    canonical: row.try_get("range_canonical")?,
                    subtype_diff: row.try_get("range_subdiff")?,
                }
            }
            _ => TypeDefinition::Base {
                input: row.try_get("type_input")?,
                output: row.try_get("type_output")?,
                internallength: row.try_get("internallength")?,
                alignment: row.try_get("alignment")?,
                storage: row.try_get("storage")?,
            },
        };

        types.push(CustomType {
            schema,
            name,
            definition,
            owner: row.try_get("owner")?,
            comment: row.try_get("comment")?,
            depends_on,
        });
    }

    Ok(types)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_kind_tags() {
        assert_eq!(TypeDefinition::Enum { labels: vec![] }.kind(), "enum");
        assert_eq!(
            TypeDefinition::Composite { attributes: vec![] }.kind(),
            "composite"
        );
        assert_eq!(
            TypeDefinition::Range {
                subtype: "numeric".into(),
                subtype_opclass: None,
                canonical: None,
                subtype_diff: None
            }
            .kind(),
            "range"
        );
    }
}
