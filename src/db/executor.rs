//! Plan output and execution.
//!
//! Plain mode renders statements to a writer; execute mode sends them over
//! the live connection inside a single transaction, rolling back on the
//! first failure or on ctrl-c. Partial application is never exposed.

use anyhow::{Context, Result, bail};
use sqlx::PgPool;
use tracing::info;

use crate::diff::operations::{MigrationStep, SqlRenderer};

/// Render the ordered plan as a SQL script.
pub fn render_script(steps: &[MigrationStep], single_transaction: bool) -> String {
    let mut script = String::new();
    if single_transaction {
        script.push_str("BEGIN;\n\n");
    }
    for step in steps {
        for rendered in step.to_sql() {
            script.push_str(&rendered.sql);
            script.push_str("\n\n");
        }
    }
    if single_transaction {
        script.push_str("COMMIT;\n");
    }
    script
}

/// Execute the plan inside one transaction. Any statement failure rolls
/// everything back and reports the failing statement.
pub async fn execute(pool: &PgPool, steps: &[MigrationStep]) -> Result<()> {
    let statements: Vec<String> = steps
        .iter()
        .flat_map(|step| step.to_sql())
        .map(|rendered| rendered.sql)
        .collect();

    if statements.is_empty() {
        info!("nothing to execute");
        return Ok(());
    }

    let mut tx = pool.begin().await.context("could not begin transaction")?;

    let total = statements.len();
    for (i, statement) in statements.iter().enumerate() {
        let run = sqlx::raw_sql(statement.as_str()).execute(&mut *tx);
        tokio::select! {
            result = run => {
                if let Err(e) = result {
                    // dropping tx rolls the transaction back
                    bail!(
                        "statement {}/{} failed, rolling back: {}\n  {}",
                        i + 1,
                        total,
                        e,
                        statement
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => {
                bail!("interrupted, rolling back after {}/{} statements", i, total);
            }
        }
    }

    tx.commit().await.context("could not commit transaction")?;
    info!("applied {} statements", total);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::schema::Schema;
    use crate::diff::operations::SchemaOperation;

    fn schema_step(name: &str) -> MigrationStep {
        MigrationStep::Schema(SchemaOperation::Create {
            schema: Box::new(Schema {
                name: name.to_string(),
                owner: None,
                comment: None,
                oldname: None,
            }),
        })
    }

    #[test]
    fn test_render_script_plain() {
        let script = render_script(&[schema_step("s1")], false);
        assert_eq!(script, "CREATE SCHEMA \"s1\";\n\n");
    }

    #[test]
    fn test_render_script_transactional() {
        let script = render_script(&[schema_step("s1")], true);
        assert!(script.starts_with("BEGIN;\n"));
        assert!(script.ends_with("COMMIT;\n"));
        assert!(script.contains("CREATE SCHEMA \"s1\";"));
    }
}
