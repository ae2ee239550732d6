use clap::{Parser, Subcommand};
use hearthbook::{Bootstrapper, Catalog, PgStore, SchemaStore};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod config;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Bootstrap the household finance schema in Postgres.
#[derive(Parser, Debug)]
#[command(name = "hearthbook", version, about, long_about = None)]
struct Cli {
    /// Config file to use instead of searching for .config/hearthbook.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dotenv file to load DB_* variables from
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the namespaces and tables that are missing (default)
    Bootstrap,
    /// Print the DDL a bootstrap would run, in order, without connecting
    Plan,
    /// Show which namespaces and tables exist
    Status,
    /// Dump the catalog
    Schema,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult {
    load_env_file(cli.env_file.as_deref())?;
    let catalog = hearthbook::catalog::household()?;

    match cli.command.unwrap_or(Commands::Bootstrap) {
        Commands::Bootstrap => bootstrap(&catalog, cli.config.as_deref()).await,
        Commands::Plan => plan(&catalog),
        Commands::Status => status(&catalog, cli.config.as_deref()).await,
        Commands::Schema => {
            print_schema(&catalog);
            Ok(())
        }
    }
}

/// Load `.env` if present, or the given file, which must exist.
fn load_env_file(path: Option<&Path>) -> CliResult {
    match path {
        Some(path) => {
            dotenvy::from_path(path)
                .map_err(|e| format!("failed to load {}: {}", path.display(), e))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }
    Ok(())
}

fn connection_config(
    explicit: Option<&Path>,
) -> Result<(tokio_postgres::Config, String), Box<dyn std::error::Error>> {
    let (db, path) = config::load(explicit)?;
    if let Some(path) = &path {
        tracing::debug!(path = %path.display(), "loaded config file");
    }
    let pg = db.to_pg_config()?;
    Ok((pg, db.endpoint()))
}

async fn bootstrap(catalog: &Catalog, explicit: Option<&Path>) -> CliResult {
    let (pg, endpoint) = connection_config(explicit)?;
    tracing::info!(database = %endpoint, "bootstrapping");

    let report = hearthbook::bootstrap(&pg, catalog).await?;

    if report.is_noop() {
        println!("{} already up to date", "✓".green());
    } else {
        println!(
            "{} created {} namespace(s) and {} table(s)",
            "✓".green(),
            report.namespaces.created.len(),
            report.tables_created.len()
        );
        for table in &report.tables_created {
            println!("  {} {}", "+".green(), table);
        }
    }
    if !report.tables_present.is_empty() {
        println!(
            "  {} table(s) already present",
            report.tables_present.len().dimmed()
        );
    }
    Ok(())
}

fn plan(catalog: &Catalog) -> CliResult {
    let plan = Bootstrapper::new(catalog).plan()?;
    print!("{}", plan.to_sql());
    Ok(())
}

async fn status(catalog: &Catalog, explicit: Option<&Path>) -> CliResult {
    let plan = Bootstrapper::new(catalog).plan()?;
    let (pg, endpoint) = connection_config(explicit)?;

    let mut store = PgStore::connect(&pg)
        .await
        .map_err(hearthbook::Error::Connect)?;
    println!("{}", endpoint.bold());

    let mut missing = 0;
    let result: CliResult = async {
        for namespace in &plan.namespaces {
            let exists = store.namespace_exists(namespace).await?;
            missing += usize::from(!exists);
            print_status(&format!("schema {}", namespace), exists);
        }
        for table in &plan.tables {
            let exists = store.table_exists(&table.name).await?;
            missing += usize::from(!exists);
            print_status(&format!("  table {}", table.name), exists);
        }
        Ok(())
    }
    .await;
    store.close().await;
    result?;

    println!();
    if missing == 0 {
        println!("{} everything is present", "✓".green());
    } else {
        println!(
            "{} {} object(s) missing, run `hearthbook bootstrap`",
            "!".yellow(),
            missing
        );
    }
    Ok(())
}

fn print_status(label: &str, exists: bool) {
    if exists {
        println!("  {:<40} {}", label, "present".green());
    } else {
        println!("  {:<40} {}", label, "missing".yellow());
    }
}

fn print_schema(catalog: &Catalog) {
    println!("Schema ({} tables):", catalog.len());
    println!();
    for table in catalog.iter_tables() {
        println!("  {} ({} columns)", table.name.bold(), table.columns.len());
        if let Some(doc) = &table.doc {
            println!("    {}", doc.dimmed());
        }
        for col in &table.columns {
            let mut attrs = Vec::new();
            if col.primary_key {
                attrs.push("PK");
            }
            if col.identity {
                attrs.push("IDENTITY");
            }
            if !col.nullable {
                attrs.push("NOT NULL");
            }

            let attrs_str = if attrs.is_empty() {
                String::new()
            } else {
                format!(" [{}]", attrs.join(", "))
            };

            println!("    {}: {}{}", col.name, col.pg_type, attrs_str);
        }

        for fk in &table.foreign_keys {
            println!(
                "    FK: {} -> {}.{}",
                fk.columns.join(", "),
                fk.references_table,
                fk.references_columns.join(", ")
            );
        }
        for check in &table.check_constraints {
            println!("    CHECK {}: {}", check.name, check.expr);
        }
        println!();
    }
}
