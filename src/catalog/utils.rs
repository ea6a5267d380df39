use anyhow::Result;
use sqlx::Row;
use sqlx::postgres::PgConnection;

/// Schemas whose contents are never part of the user-visible model.
pub fn is_system_schema(schema: &str) -> bool {
    schema == "pg_catalog"
        || schema == "information_schema"
        || schema == "pg_toast"
        || schema.starts_with("pg_temp_")
        || schema.starts_with("pg_toast_temp_")
}

/// Minimum supported server version (9.4).
pub const MIN_SERVER_VERSION: i32 = 90400;

/// Read the numeric server version once per run.
///
/// Version gates in the per-kind queries (identity columns, partitioned
/// tables, generated columns) branch on this number.
pub async fn fetch_server_version(conn: &mut PgConnection) -> Result<i32> {
    let row = sqlx::query("SHOW server_version_num")
        .fetch_one(&mut *conn)
        .await?;
    let version: String = row.try_get(0)?;
    let version: i32 = version.trim().parse()?;
    if version < MIN_SERVER_VERSION {
        anyhow::bail!(
            "server version {} is not supported (9.4 or later required)",
            version
        );
    }
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_system_schema() {
        assert!(is_system_schema("pg_catalog"));
        assert!(is_system_schema("information_schema"));
        assert!(is_system_schema("pg_toast"));
        assert!(is_system_schema("pg_temp_3"));
        assert!(!is_system_schema("public"));
        assert!(!is_system_schema("app"));
    }
}
