//! dashkit: compile Explorer query configs to SQL
//!
//! # Usage
//!
//! ```bash
//! # Print the SQL for a widget's query config
//! dashkit sql widget.json
//!
//! # Pin relative dates to a fixed instant
//! dashkit sql widget.json --now 2015-06-01T12:00:00Z
//!
//! # Show how the config was resolved
//! dashkit explain widget.json
//! ```

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use dashkit::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dashkit")]
#[command(author = "Dashkit Contributors")]
#[command(version)]
#[command(about = "Compile Explorer query configs into BigQuery SQL", long_about = None)]
#[command(after_help = "EXAMPLES:
    dashkit sql widget.json
    dashkit sql - < widget.json
    dashkit explain widget.json --format json")]
struct Cli {
    /// Settings file (defaults to ./dashkit.toml, then the user config dir)
    #[arg(long, global = true, env = "DASHKIT_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SQL for a query config
    Sql {
        /// Query config JSON file, or '-' for stdin
        input: String,

        /// Anchor relative dates at this RFC 3339 instant instead of server time
        #[arg(long)]
        now: Option<String>,
    },
    /// Show the resolved columns, predicates and aggregations
    Explain {
        /// Query config JSON file, or '-' for stdin
        input: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// List supported aggregation tokens
    Aggregations,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "dashkit=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Sql { input, now } => {
            let service = build_service(cli, now.as_deref())?;
            let model = read_model(input)?;
            let sql = service.get_sql(&model)?;
            println!("{}", sql);
        }
        Commands::Explain { input, format } => {
            let service = build_service(cli, None)?;
            let model = read_model(input)?;
            explain(&service, &model, format)?;
        }
        Commands::Aggregations => show_aggregations()?,
    }
    Ok(())
}

fn build_service(cli: &Cli, now: Option<&str>) -> Result<QueryBuilderService> {
    let config = match &cli.config {
        Some(path) => ExplorerConfig::load(path)?,
        None => ExplorerConfig::discover()?,
    };
    let service = QueryBuilderService::with_config(config);

    match now {
        Some(text) => {
            let now: DateTime<Utc> = DateTime::parse_from_rfc3339(text)
                .with_context(|| format!("--now must be an RFC 3339 timestamp, got '{}'", text))?
                .with_timezone(&Utc);
            Ok(service.with_clock(FixedClock(now)))
        }
        None => Ok(service),
    }
}

fn read_model(input: &str) -> Result<QueryConfigModel> {
    let content = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(input).with_context(|| format!("failed to read {}", input))?
    };
    Ok(QueryConfigModel::from_json(&content)?)
}

fn explain(service: &QueryBuilderService, model: &QueryConfigModel, format: &OutputFormat) -> Result<()> {
    let plan = service.explain(model)?;

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let props = &plan.properties;
    println!("{}", "Query Plan".cyan().bold());
    println!();

    println!("  {}", "Columns:".dimmed());
    for filter in props.columns() {
        match filter.alias() {
            Some(alias) => println!("    • {} {}", alias.white(), filter.field().to_sql().dimmed()),
            None => println!("    • {}", filter.field().to_sql().white()),
        }
    }

    let predicates: Vec<String> = props.predicates().filter_map(|f| f.to_condition_sql()).collect();
    if !predicates.is_empty() {
        println!("  {}", "Predicates:".dimmed());
        for predicate in predicates {
            println!("    • {}", predicate.yellow());
        }
    }

    if props.aggregations.is_empty() {
        println!("  {} {}", "Aggregations:".dimmed(), "(row level)".white());
    } else {
        let tokens: Vec<String> = props.aggregations.iter().map(|a| a.token()).collect();
        println!("  {} {}", "Aggregations:".dimmed(), tokens.join(", ").cyan());
    }

    if !plan.sort_fields.is_empty() {
        println!("  {} {}", "Order:".dimmed(), plan.sort_fields.join(", ").white());
    }

    println!();
    println!("{}", "Generated SQL:".green().bold());
    println!("  {}", service.get_sql(model)?.white());
    Ok(())
}

fn show_aggregations() -> Result<()> {
    println!("{}", "Supported Aggregations".cyan().bold());
    println!();
    println!(
        "{:10} {:12} {}",
        "Token".white().bold(),
        "Column".white().bold(),
        "SQL".white().bold()
    );
    println!("{}", "─".repeat(60).dimmed());

    let value = Expr::Named("value".to_string());
    let p50: Aggregation = "50%".parse()?;
    for agg in Aggregation::NAMED.iter().chain(std::iter::once(&p50)) {
        println!(
            "{:10} {:12} {}",
            agg.token().cyan().bold(),
            agg.alias().yellow(),
            dashkit::transpiler::builder::aggregate_sql(agg, &value).dimmed()
        );
    }
    println!();
    println!(
        "{}",
        "Any percentile 0%..100% with up to 4 decimals is accepted, e.g. '99.9%' or '.01%'.".dimmed()
    );
    Ok(())
}
