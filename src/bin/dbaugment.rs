//! Augment a database schema with audit columns and print the result as
//! YAML.

use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use std::io::Write;
use std::path::PathBuf;

use pgyaml::augment;
use pgyaml::catalog::Catalog;
use pgyaml::cli::{ConnectionArgs, FilterArgs, init_tracing};
use pgyaml::config;
use pgyaml::db::connection::connect_with_retry;
use pgyaml::schema_generator::{EmitOptions, catalog_to_mapping, mapping_to_string};
use pgyaml::schema_loader::load_spec_value;

#[derive(Parser)]
#[command(
    name = "dbaugment",
    author,
    version,
    about = "Augment a PostgreSQL schema with audit columns and triggers"
)]
struct Cli {
    /// Database to augment
    #[arg(env = "PGDATABASE")]
    dbname: String,

    /// Augmentation spec file; `-` or absent reads stdin
    spec: Option<PathBuf>,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(flatten)]
    filter: FilterArgs,

    /// Configuration file
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let cfg = config::load(None, cli.config.as_deref())?;
    let filter = cli.filter.merge_into(&cfg.filter);

    let spec_value = match &cfg.augmenter {
        Some(augmenter) if cli.spec.is_none() => augmenter.clone(),
        _ => load_spec_value(cli.spec.as_deref())?,
    };

    let params = cli.connection.params(&cli.dbname)?;
    let pool = connect_with_retry(&params.url()).await?;
    let catalog = Catalog::load(&pool).await?;
    let mut catalog = config::apply_filter(&catalog, &filter);

    augment::apply(&mut catalog, &spec_value)?;

    let mapping = catalog_to_mapping(&catalog, &EmitOptions::default());
    let yaml = mapping_to_string(&mapping)?;
    std::io::stdout().write_all(yaml.as_bytes())?;

    Ok(())
}
