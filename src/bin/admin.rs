//! ltm-admin: diagnostics CLI for operating a long-term memory engine
//! deployment out of band from the agent process that embeds it.

use clap::{Parser, Subcommand};

use ltm_engine::error::Result;
use ltm_engine::memory::MemoryAdapter;
use ltm_engine::ontology;
use ltm_engine::store::config::ManagerConfig;
use ltm_engine::store::manager::StoreManager;

#[derive(Parser)]
#[command(name = "ltm-admin")]
#[command(about = "Diagnostics CLI for the long-term memory engine")]
#[command(version)]
struct Cli {
    /// Base directory containing every session's store.
    #[arg(long, env = "LTM_BASE_PATH")]
    base_path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open (creating if necessary) a session's store and report its path.
    Open {
        session_id: String,
    },
    /// Report a session store's health.
    Health {
        session_id: String,
    },
    /// Print aggregate statistics for a session.
    Stats {
        session_id: String,
    },
    /// Force-reload the ontology into a session's store.
    ReloadOntology {
        session_id: String,
    },
    /// List classes, individuals, or properties defined by the loaded ontology.
    Ontology {
        session_id: String,
        #[arg(value_enum)]
        what: OntologyPart,
    },
    /// List every currently open session.
    ListOpen,
}

#[derive(Clone, clap::ValueEnum)]
enum OntologyPart {
    Classes,
    Individuals,
    Properties,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut config = ManagerConfig::from_env()?;
    if let Some(base_path) = cli.base_path {
        config.base_path = shellexpand::tilde(&base_path).to_string().into();
    }
    let manager = StoreManager::new(config)?;

    match cli.command {
        Commands::Open { session_id } => {
            manager.get_or_create(&session_id).await?;
            println!("opened session '{session_id}' under {}", manager.base_path().display());
        }

        Commands::Health { session_id } => {
            manager.get_or_create(&session_id).await?;
            match manager.health(&session_id).await {
                Ok(_) => println!("healthy"),
                Err(e) => println!("unhealthy: {e}"),
            }
        }

        Commands::Stats { session_id } => {
            let store = manager.get_or_create(&session_id).await?;
            let adapter = MemoryAdapter::new();
            let stats = ltm_engine::memory::get_stats(&adapter, &store, &session_id)?;
            println!("total_count: {}", stats.total_count);
            println!("superseded_count: {}", stats.superseded_count);
            println!("with_evidence: {}", stats.with_evidence);
            println!("with_rationale: {}", stats.with_rationale);
            for (memory_type, count) in &stats.by_type {
                println!("by_type[{memory_type}]: {count}");
            }
            for (band, count) in &stats.by_confidence {
                println!("by_confidence[{}]: {count}", band.as_str());
            }
        }

        Commands::ReloadOntology { session_id } => {
            let store = manager.get_or_create(&session_id).await?;
            ontology::reload(&store)?;
            println!("ontology reloaded for session '{session_id}'");
        }

        Commands::Ontology { session_id, what } => {
            let store = manager.get_or_create(&session_id).await?;
            let names = match what {
                OntologyPart::Classes => ontology::list_classes(&store)?,
                OntologyPart::Individuals => ontology::list_individuals(&store)?,
                OntologyPart::Properties => ontology::list_properties(&store)?,
            };
            for name in names {
                println!("{name}");
            }
        }

        Commands::ListOpen => {
            for session_id in manager.list_open().await {
                println!("{session_id}");
            }
        }
    }

    manager.close_all().await;
    Ok(())
}
