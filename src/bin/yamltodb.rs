//! Diff a YAML schema description against a live database and emit (or
//! execute) the reconciling DDL.

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

use pgyaml::catalog::Catalog;
use pgyaml::cli::{ConnectionArgs, FilterArgs, init_tracing};
use pgyaml::config;
use pgyaml::db::connection::connect_with_retry;
use pgyaml::db::executor::{execute, render_script};
use pgyaml::diff::{cascade, diff_all, diff_order};
use pgyaml::schema_loader::{load_repo_value, load_spec_value, mapping_to_catalog};

#[derive(Parser)]
#[command(
    name = "yamltodb",
    author,
    version,
    about = "Generate DDL to bring a PostgreSQL database up to a YAML description"
)]
struct Cli {
    /// Database to compare against
    #[arg(env = "PGDATABASE")]
    dbname: String,

    /// YAML spec file; `-` or absent reads stdin
    spec: Option<PathBuf>,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(flatten)]
    filter: FilterArgs,

    /// Write the generated SQL to this file instead of stdout
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Configuration file
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Repository path for multiple-files input
    #[arg(short = 'r', long = "repository", default_value = ".")]
    repository: PathBuf,

    /// Read the spec from one file per object under the repository path
    #[arg(short = 'm', long = "multiple-files")]
    multiple_files: bool,

    /// Wrap the generated statements in BEGIN/COMMIT
    #[arg(short = '1', long = "single-transaction")]
    single_transaction: bool,

    /// Execute the generated statements against the database
    #[arg(short = 'u', long = "update")]
    update: bool,

    /// Generate the inverse plan (experimental)
    #[arg(long = "revert")]
    revert: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let cfg = config::load(Some(&cli.repository), cli.config.as_deref())?;
    let filter = cli.filter.merge_into(&cfg.filter);

    let spec_value = if cli.multiple_files || cfg.multiple_files {
        load_repo_value(&cli.repository, &cli.dbname)?
    } else {
        load_spec_value(cli.spec.as_deref())?
    };
    let desired = mapping_to_catalog(&spec_value)?;
    let desired = config::apply_filter(&desired, &filter);

    let params = cli.connection.params(&cli.dbname)?;
    let pool = connect_with_retry(&params.url()).await?;
    let current = Catalog::load(&pool).await?;
    let current = config::apply_filter(&current, &filter);

    // revert swaps the sides: the plan that undoes the forward plan
    let (from, to): (&Catalog, &Catalog) = if cli.revert {
        warn!("--revert is experimental; the inverse plan is best-effort");
        (&desired, &current)
    } else {
        (&current, &desired)
    };

    let steps = diff_all(from, to)?;
    let steps = cascade::expand(steps, from, to);
    let steps = diff_order(steps, from, to)?;

    if cli.update {
        // single-transaction semantics are the default in execute mode
        execute(&pool, &steps).await?;
    } else {
        let script = render_script(&steps, cli.single_transaction);
        match &cli.output {
            Some(path) => std::fs::write(path, script)
                .with_context(|| format!("cannot write {}", path.display()))?,
            None => std::io::stdout().write_all(script.as_bytes())?,
        }
    }

    Ok(())
}
