use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use viewgraph::config::{CliOverrides, CompilerConfig};
use viewgraph::endpoint::EndpointCatalog;
use viewgraph::result_tree::SparqlJsonRowSource;
use viewgraph::sparql_query_generator::QueryStrategy;

/// viewgraph - compile view requests to SPARQL and coalesce their results
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Compiler settings file (YAML); defaults come from VIEWGRAPH_* variables
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Limit applied when a request gives none
    #[arg(long, global = true)]
    soft_limit: Option<u64>,

    /// Ceiling on results per request
    #[arg(long, global = true)]
    hard_limit: Option<u64>,

    /// Variable carrying the entity identifier
    #[arg(long, global = true)]
    root_variable: Option<String>,

    /// Force a query strategy (flat | nested)
    #[arg(long, global = true, value_parser = parse_strategy)]
    strategy: Option<QueryStrategy>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the SPARQL query for an endpoint request
    Compile {
        #[command(flatten)]
        target: Target,

        /// Request parameter, repeatable (e.g. --param severity=3 --param _sort=-severity)
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// Coalesce SPARQL JSON results into one JSON tree per line
    Coalesce {
        #[command(flatten)]
        target: Target,

        /// Alternative view of the endpoint the results were produced for
        #[arg(long)]
        view: Option<String>,

        /// SPARQL 1.1 JSON results file
        #[arg(long)]
        results: PathBuf,
    },
    /// List the endpoints of a configuration file
    Endpoints {
        /// View and endpoint configuration (YAML or JSON)
        #[arg(long)]
        config: PathBuf,
    },
}

#[derive(Args)]
struct Target {
    /// View and endpoint configuration (YAML or JSON)
    #[arg(long)]
    config: PathBuf,

    /// Endpoint name
    #[arg(long)]
    endpoint: String,
}

impl From<&Cli> for CliOverrides {
    fn from(cli: &Cli) -> Self {
        CliOverrides {
            soft_limit: cli.soft_limit,
            hard_limit: cli.hard_limit,
            root_variable: cli.root_variable.clone(),
            strategy: cli.strategy,
        }
    }
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got `{}`", raw))
}

fn parse_strategy(raw: &str) -> Result<QueryStrategy, String> {
    serde_yaml::from_str(raw).map_err(|_| format!("unknown strategy `{}` (expected flat or nested)", raw))
}

fn load_catalog(config_path: &Path, settings: &CompilerConfig) -> anyhow::Result<EndpointCatalog> {
    EndpointCatalog::from_yaml_file(config_path, settings)
        .with_context(|| format!("loading {}", config_path.display()))
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let base = match &cli.settings {
        Some(path) => CompilerConfig::from_yaml_file(path)
            .with_context(|| format!("reading settings {}", path.display()))?,
        None => CompilerConfig::from_env().context("reading VIEWGRAPH_* settings")?,
    };
    let settings = base.merge(CliOverrides::from(&cli)).context("invalid settings")?;
    log::debug!("Compiler settings: {:?}", settings);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Compile { target, params } => {
            let catalog = load_catalog(&target.config, &settings)?;
            let endpoint = catalog
                .get(&target.endpoint)
                .ok_or_else(|| anyhow!("no endpoint named `{}`", target.endpoint))?;
            let query = endpoint
                .compile(&params)
                .with_context(|| format!("compiling request for `{}`", target.endpoint))?;
            write!(out, "{}", query)?;
        }
        Command::Coalesce {
            target,
            view,
            results,
        } => {
            let catalog = load_catalog(&target.config, &settings)?;
            let endpoint = catalog
                .get(&target.endpoint)
                .ok_or_else(|| anyhow!("no endpoint named `{}`", target.endpoint))?;
            let source = SparqlJsonRowSource::from_file(&results)?;
            let mut count = 0usize;
            for tree in endpoint.coalesce(view.as_deref(), source)? {
                let tree = tree.context("coalescing results")?;
                writeln!(out, "{}", serde_json::to_string(&tree)?)?;
                count += 1;
            }
            log::info!("Wrote {} result tree(s)", count);
        }
        Command::Endpoints { config } => {
            let catalog = load_catalog(&config, &settings)?;
            let names: Vec<&str> = catalog.names().collect();
            if names.is_empty() {
                bail!("{} defines no endpoints", config.display());
            }
            for name in names {
                if let Some(endpoint) = catalog.get(name) {
                    match endpoint.comment() {
                        Some(comment) => writeln!(out, "{}\t{}", name, comment)?,
                        None => writeln!(out, "{}", name)?,
                    }
                }
            }
        }
    }
    Ok(())
}

fn main() {
    // Initialize logger - defaults to WARN level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
