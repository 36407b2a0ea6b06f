//! # Policy MCP CLI (`policy-mcp`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `policy-mcp serve` | Run the MCP server (stdio or streamable HTTP + debug routes) |
//! | `policy-mcp search "<query>"` | Print search results as JSON |
//! | `policy-mcp get <id>` | Print one chunk as JSON |
//!
//! Configuration comes from the environment (and `./.env`); see
//! [`policy_mcp::config`]. Logs go to stderr, filtered by `POLICY_MCP_LOG`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use policy_mcp::config::{Config, Transport};
use policy_mcp::models::{GetResponse, SearchRequest, DEFAULT_LIMIT};
use policy_mcp::repository::Repository;
use policy_mcp::{mcp, server};

/// Policy document retrieval over a Qdrant index, exposed as MCP tools.
#[derive(Parser)]
#[command(name = "policy-mcp", version)]
struct Cli {
    /// Load environment variables from this file instead of `./.env`.
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server.
    ///
    /// With the streamable-http transport the same listener also serves
    /// `/health`, `/debug/search` and `/debug/chunk/{id}`.
    Serve {
        /// Override `MCP_TRANSPORT`.
        #[arg(long, value_enum)]
        transport: Option<TransportArg>,

        /// Override `MCP_HOST:MCP_PORT`, e.g. `127.0.0.1:8000`.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Search policy chunks and print `{ "items": [...] }`.
    Search {
        query: String,

        #[arg(long)]
        doctype: Option<String>,

        #[arg(long)]
        department: Option<String>,

        /// Inclusive lower bound on the revision date (ISO-8601).
        #[arg(long)]
        revised_after: Option<String>,

        /// Clamped to 1..=50.
        #[arg(long, default_value_t = DEFAULT_LIMIT, allow_hyphen_values = true)]
        limit: i64,
    },

    /// Fetch one chunk by id and print `{ "item": ... }`.
    Get { id: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum TransportArg {
    Stdio,
    StreamableHttp,
}

impl From<TransportArg> for Transport {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Stdio => Transport::Stdio,
            TransportArg::StreamableHttp => Transport::StreamableHttp,
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("POLICY_MCP_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut cfg = match &cli.env_file {
        Some(path) => Config::from_env_file(path)?,
        None => Config::from_env()?,
    };

    let repo = Arc::new(Repository::connect(&cfg).await?);

    match cli.command {
        Commands::Serve { transport, bind } => {
            if let Some(transport) = transport {
                cfg.server.transport = transport.into();
            }
            if let Some(bind) = bind {
                let (host, port) = bind
                    .rsplit_once(':')
                    .ok_or_else(|| anyhow::anyhow!("--bind must be HOST:PORT, got '{}'", bind))?;
                cfg.server.host = host.to_string();
                cfg.server.port = port
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid port in --bind: '{}'", port))?;
            }
            match cfg.server.transport {
                Transport::Stdio => mcp::serve_stdio(repo).await?,
                Transport::StreamableHttp => server::run_server(&cfg.server, repo).await?,
            }
        }
        Commands::Search {
            query,
            doctype,
            department,
            revised_after,
            limit,
        } => {
            let request = SearchRequest {
                query,
                doctype,
                department,
                revised_after,
                limit,
            };
            let response = repo.search(&request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Get { id } => {
            let item = repo.get_by_key(&id).await?;
            println!("{}", serde_json::to_string_pretty(&GetResponse { item })?);
        }
    }

    Ok(())
}
