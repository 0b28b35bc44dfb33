//! sonarsearch-query: run one query against the configured datasets.

use clap::{Args, Parser, Subcommand};
use sonarsearch::{EngineConfig, Page, SearchService};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sonarsearch-query")]
#[command(version = "0.1.0")]
#[command(about = "Query sorted forward and reverse DNS datasets", long_about = None)]
struct Cli {
    /// YAML config file (CROBAT_* environment variables override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Paging {
    /// 1-based page number
    #[arg(short, long)]
    page: Option<usize>,

    /// Results per page
    #[arg(short, long)]
    limit: Option<usize>,
}

impl Paging {
    fn page(&self) -> Page {
        Page::from_params(self.page, self.limit)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Hostnames under a registered domain
    Subdomains {
        domain: String,
        #[command(flatten)]
        paging: Paging,
    },

    /// Suffix variants of a domain label
    Tlds {
        domain: String,
        #[command(flatten)]
        paging: Paging,
    },

    /// Hostnames under a domain label across all suffixes
    All {
        domain: String,
        #[command(flatten)]
        paging: Paging,
    },

    /// Hostnames recorded for an IPv4 address
    Reverse {
        ip: String,
        #[command(flatten)]
        paging: Paging,
    },

    /// Hostnames recorded for an IPv4 CIDR block
    Range {
        cidr: String,
        #[command(flatten)]
        paging: Paging,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match cli.config {
        Some(ref path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    }
    .with_env()?;

    let service = SearchService::from_config(&config)?;

    let output = match cli.command {
        Commands::Subdomains { domain, paging } => {
            serde_json::to_string_pretty(&service.subdomains(&domain, paging.page())?)?
        }
        Commands::Tlds { domain, paging } => {
            serde_json::to_string_pretty(&service.tlds(&domain, paging.page())?)?
        }
        Commands::All { domain, paging } => {
            serde_json::to_string_pretty(&service.all(&domain, paging.page())?)?
        }
        Commands::Reverse { ip, paging } => {
            serde_json::to_string_pretty(&service.reverse_lookup(&ip, paging.page())?)?
        }
        Commands::Range { cidr, paging } => {
            serde_json::to_string_pretty(&service.reverse_range(&cidr, paging.page())?)?
        }
    };

    println!("{}", output);
    Ok(())
}
