use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use nullspace::core::records::load_records;
use nullspace::{ExperimentPipeline, NullspaceConfig};

#[derive(Parser)]
#[command(name = "nullspace")]
#[command(about = "Index, search and graph NASA bioscience experiment records")]
#[command(version)]
struct Cli {
    /// JSON array of experiment records.
    #[arg(long, global = true)]
    records: Option<PathBuf>,

    /// Optional TOML or JSON config file; NULLSPACE_* variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Rank records against a free-text query")]
    Search {
        #[arg(default_value = "")]
        query: String,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        organism: Option<String>,
    },
    #[command(about = "Print the knowledge graph as {nodes, edges}")]
    Graph,
    #[command(about = "Nearest experiments to a record")]
    Related {
        id: String,

        #[arg(long)]
        k: Option<usize>,
    },
    #[command(about = "Summary, keywords, entities and neighbors of one record")]
    Details { id: String },
    #[command(about = "Corpus statistics")]
    Stats,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nullspace=info")))
        .init();

    let cli = Cli::parse();

    let config = NullspaceConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let records_path = cli
        .records
        .context("--records <file.json> is required")?;
    let records = load_records(&records_path)
        .with_context(|| format!("reading records from {}", records_path.display()))?;

    let pipeline = ExperimentPipeline::from_config(config)?;
    let report = pipeline.build(records).await?;
    for rejected in &report.rejected {
        tracing::warn!("Skipped record #{} ({}): {}", rejected.position, rejected.id, rejected.reason);
    }

    match cli.command {
        Commands::Search {
            query,
            limit,
            organism,
        } => {
            let results = match organism {
                Some(organism) => pipeline.search_filtered(&query, &organism, limit).await?,
                None => pipeline.search(&query, limit).await?,
            };
            print_json(&results)
        }
        Commands::Graph => print_json(&pipeline.graph()?.to_payload()),
        Commands::Related { id, k } => print_json(&pipeline.related(&id, k)?),
        Commands::Details { id } => print_json(&pipeline.details(&id)?),
        Commands::Stats => print_json(&pipeline.stats()?),
    }
}
