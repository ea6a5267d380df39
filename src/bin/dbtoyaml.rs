//! Extract a live database schema into declarative YAML.

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::io::Write;
use std::path::PathBuf;

use pgyaml::catalog::Catalog;
use pgyaml::cli::{ConnectionArgs, FilterArgs, init_tracing};
use pgyaml::config;
use pgyaml::db::connection::connect_with_retry;
use pgyaml::schema_generator::{EmitOptions, catalog_to_mapping, mapping_to_string, write_multiple};

#[derive(Parser)]
#[command(
    name = "dbtoyaml",
    author,
    version,
    about = "Extract a PostgreSQL database schema to YAML"
)]
struct Cli {
    /// Database to extract
    #[arg(env = "PGDATABASE")]
    dbname: String,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(flatten)]
    filter: FilterArgs,

    /// Write output to this file instead of stdout
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Configuration file
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Repository path for multiple-files output
    #[arg(short = 'r', long = "repository", default_value = ".")]
    repository: PathBuf,

    /// Do not include object ownership
    #[arg(short = 'O', long = "no-owner")]
    no_owner: bool,

    /// Do not include access privileges
    #[arg(short = 'x', long = "no-privileges")]
    no_privileges: bool,

    /// Write one file per object under the repository path
    #[arg(short = 'm', long = "multiple-files")]
    multiple_files: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let cfg = config::load(Some(&cli.repository), cli.config.as_deref())?;
    let filter = cli.filter.merge_into(&cfg.filter);

    let params = cli.connection.params(&cli.dbname)?;
    let pool = connect_with_retry(&params.url()).await?;
    let catalog = Catalog::load(&pool).await?;
    let catalog = config::apply_filter(&catalog, &filter);

    let options = EmitOptions {
        include_owner: !(cli.no_owner || cfg.no_owner),
        include_privileges: !(cli.no_privileges || cfg.no_privileges),
    };
    let mapping = catalog_to_mapping(&catalog, &options);

    if cli.multiple_files || cfg.multiple_files {
        write_multiple(
            &mapping,
            &cli.repository,
            &cli.dbname,
            config::max_ident_len(),
        )?;
    } else {
        let yaml = mapping_to_string(&mapping)?;
        match &cli.output {
            Some(path) => std::fs::write(path, yaml)
                .with_context(|| format!("cannot write {}", path.display()))?,
            None => std::io::stdout().write_all(yaml.as_bytes())?,
        }
    }

    Ok(())
}
