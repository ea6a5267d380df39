//! Fetch sequences. Identity-column sequences (deptype 'i') are internal to
//! their column and never modeled standalone; SERIAL-owned sequences are
//! modeled and serialized under their owning table.
use anyhow::Result;
use sqlx::Row;
use sqlx::postgres::PgConnection;
use tracing::info;

use super::comments::Commentable;
use super::id::{DbObjectId, DependsOn};

#[derive(Debug, Clone)]
pub struct Sequence {
    pub schema: String,
    pub name: String,
    pub data_type: String,
    pub start_value: i64,
    pub min_value: i64,
    pub max_value: i64,
    pub increment: i64,
    pub cache_value: i64,
    pub cycle: bool,
    /// For SERIAL columns: "schema.table.column".
    pub owned_by: Option<String>,
    pub owner: Option<String>,
    pub comment: Option<String>,
    pub oldname: Option<String>,
    pub depends_on: Vec<DbObjectId>,
}

impl Sequence {
    pub fn id(&self) -> DbObjectId {
        DbObjectId::Sequence {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }

    /// (schema, table) of the owning column, when owned.
    pub fn owning_table(&self) -> Option<(String, String)> {
        let owned_by = self.owned_by.as_ref()?;
        let mut parts = owned_by.splitn(3, '.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(schema), Some(table), Some(_column)) => {
                Some((schema.to_string(), table.to_string()))
            }
            _ => None,
        }
    }
}

impl DependsOn for Sequence {
    fn id(&self) -> DbObjectId {
        self.id()
    }

    fn depends_on(&self) -> &[DbObjectId] {
        &self.depends_on
    }
}

impl Commentable for Sequence {
    fn comment(&self) -> &Option<String> {
        &self.comment
    }
}

pub async fn fetch(conn: &mut PgConnection) -> Result<Vec<Sequence>> {
    info!("Fetching sequences...");
    let rows = sqlx::query(
        r#"
        SELECT
            n.nspname AS schema_name,
            c.relname AS sequence_name,
            COALESCE(t.typname, 'bigint') AS data_type,
            COALESCE(seq.seqstart, 1) AS start_value,
            COALESCE(seq.seqmin, 1) AS min_value,
            COALESCE(seq.seqmax, 9223372036854775807) AS max_value,
            COALESCE(seq.seqincrement, 1) AS increment_by,
            COALESCE(seq.seqcache, 1) AS cache_value,
            COALESCE(seq.seqcycle, false) AS cycle,
            CASE
                WHEN d.objid IS NOT NULL AND d.refobjid IS NOT NULL THEN
                    ref_n.nspname || '.' || ref_c.relname || '.' || ref_a.attname
            END AS owned_by,
            r.rolname AS owner,
            comment_d.description AS comment
        FROM pg_class c
        JOIN pg_namespace n ON c.relnamespace = n.oid
        JOIN pg_roles r ON c.relowner = r.oid
        LEFT JOIN pg_sequence seq ON seq.seqrelid = c.oid
        LEFT JOIN pg_type t ON seq.seqtypid = t.oid
        LEFT JOIN pg_depend d ON d.objid = c.oid
            AND d.classid = 'pg_class'::regclass
            AND d.objsubid = 0
            AND d.refclassid = 'pg_class'::regclass
            AND d.refobjsubid > 0
            AND d.deptype = 'a'
        LEFT JOIN pg_class ref_c ON d.refobjid = ref_c.oid
        LEFT JOIN pg_namespace ref_n ON ref_c.relnamespace = ref_n.oid
        LEFT JOIN pg_attribute ref_a ON ref_a.attrelid = ref_c.oid AND ref_a.attnum = d.refobjsubid
        LEFT JOIN pg_description comment_d ON comment_d.objoid = c.oid AND comment_d.objsubid = 0
        WHERE c.relkind = 'S'
            AND n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
            -- identity sequences are internal to their column
            AND NOT EXISTS (
                SELECT 1 FROM pg_depend idep
                WHERE idep.objid = c.oid AND idep.deptype = 'i'
            )
            AND NOT EXISTS (
                SELECT 1 FROM pg_depend ext_dep
                WHERE ext_dep.objid = c.oid AND ext_dep.deptype = 'e'
            )
        ORDER BY n.nspname, c.relname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            let schema: String = row.try_get("schema_name")?;
            Ok(Sequence {
                depends_on: vec![DbObjectId::Schema {
                    name: schema.clone(),
                }],
                schema,
                name: row.try_get("sequence_name")?,
                data_type: row.try_get("data_type")?,
                start_value: row.try_get("start_value")?,
                min_value: row.try_get("min_value")?,
                max_value: row.try_get("max_value")?,
                increment: row.try_get("increment_by")?,
                cache_value: row.try_get("cache_value")?,
                cycle: row.try_get("cycle")?,
                owned_by: row.try_get("owned_by")?,
                owner: row.try_get("owner")?,
                comment: row.try_get("comment")?,
                oldname: None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owning_table_parse() {
        let seq = Sequence {
            schema: "public".into(),
            name: "t1_c1_seq".into(),
            data_type: "integer".into(),
            start_value: 1,
            min_value: 1,
            max_value: i64::MAX,
            increment: 1,
            cache_value: 1,
            cycle: false,
            owned_by: Some("public.t1.c1".into()),
            owner: None,
            comment: None,
            oldname: None,
            depends_on: vec![],
        };
        assert_eq!(
            seq.owning_table(),
            Some(("public".to_string(), "t1".to_string()))
        );
    }
}
