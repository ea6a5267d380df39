//! Shared command-line arguments for the three binaries.

use anyhow::Result;
use clap::Args;

use crate::config::ObjectFilter;
use crate::db::connection::ConnectionParams;

#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Database server host
    #[arg(short = 'H', long = "host", env = "PGHOST", default_value = "localhost")]
    pub host: String,

    /// Database server port
    #[arg(short = 'p', long = "port", env = "PGPORT", default_value_t = 5432)]
    pub port: u16,

    /// Database user name
    #[arg(short = 'U', long = "username", env = "PGUSER")]
    pub username: Option<String>,

    /// Prompt for the password before connecting
    #[arg(short = 'W', long = "password")]
    pub prompt_password: bool,
}

impl ConnectionArgs {
    /// Resolve the final connection parameters. PGPASSWORD is honored
    /// unless `-W` asks for an interactive prompt.
    pub fn params(&self, dbname: &str) -> Result<ConnectionParams> {
        let password = if self.prompt_password {
            Some(
                dialoguer::Password::new()
                    .with_prompt("Password")
                    .interact()?,
            )
        } else {
            std::env::var("PGPASSWORD").ok()
        };

        Ok(ConnectionParams {
            host: self.host.clone(),
            port: self.port,
            user: self.username.clone(),
            password,
            dbname: dbname.to_string(),
        })
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Process only the named schema (repeatable)
    #[arg(short = 'n', long = "schema")]
    pub schemas: Vec<String>,

    /// Do not process the named schema (repeatable)
    #[arg(short = 'N', long = "exclude-schema")]
    pub exclude_schemas: Vec<String>,

    /// Process only the named table (repeatable)
    #[arg(short = 't', long = "table")]
    pub tables: Vec<String>,

    /// Do not process the named table (repeatable)
    #[arg(short = 'T', long = "exclude-table")]
    pub exclude_tables: Vec<String>,
}

impl FilterArgs {
    /// Merge CLI filters over the config-file filter; CLI wins per axis.
    pub fn merge_into(&self, base: &ObjectFilter) -> ObjectFilter {
        ObjectFilter {
            include_schemas: if self.schemas.is_empty() {
                base.include_schemas.clone()
            } else {
                self.schemas.clone()
            },
            exclude_schemas: if self.exclude_schemas.is_empty() {
                base.exclude_schemas.clone()
            } else {
                self.exclude_schemas.clone()
            },
            include_tables: if self.tables.is_empty() {
                base.include_tables.clone()
            } else {
                self.tables.clone()
            },
            exclude_tables: if self.exclude_tables.is_empty() {
                base.exclude_tables.clone()
            } else {
                self.exclude_tables.clone()
            },
        }
    }
}

/// Logging setup shared by the binaries: everything on stderr so SQL and
/// YAML on stdout stay clean.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("warn")
        }))
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_filter_overrides_config() {
        let base = ObjectFilter {
            include_schemas: vec!["from_config".into()],
            exclude_tables: vec!["hidden".into()],
            ..Default::default()
        };
        let args = FilterArgs {
            schemas: vec!["from_cli".into()],
            ..Default::default()
        };
        let merged = args.merge_into(&base);
        assert_eq!(merged.include_schemas, vec!["from_cli"]);
        assert_eq!(merged.exclude_tables, vec!["hidden"]);
    }
}
