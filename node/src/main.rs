use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, error};
use tracing_subscriber::EnvFilter;
use anyhow::{Result, Context};

use axie_ledger::UserId;
use axie_node::{Node, NodeConfig};

#[derive(Parser, Debug)]
#[command(name = "axie-node")]
#[command(about = "Axie ledger node", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "./data", global = true)]
    data_dir: PathBuf,

    /// How long a purchase waits for a locked account before failing
    #[arg(long, default_value = "1000", global = true)]
    lock_timeout_ms: i64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the purchase endpoint
    Serve {
        #[arg(short, long, default_value = "127.0.0.1:8080")]
        listen: SocketAddr,

        /// Grace period for in-flight requests after a shutdown signal
        #[arg(long, default_value = "30")]
        shutdown_timeout_secs: u64,
    },
    /// Create the balance record for a user
    Provision {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        balance: i64,
    },
    /// Print a user's balance and holdings
    Account {
        #[arg(short, long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = NodeConfig {
        data_dir: args.data_dir,
        lock_timeout_ms: args.lock_timeout_ms,
        ..NodeConfig::default()
    };

    match args.command {
        Command::Serve { listen, shutdown_timeout_secs } => {
            config.listen_addr = listen;
            config.shutdown_timeout = Duration::from_secs(shutdown_timeout_secs);

            info!("Starting Axie ledger node");
            info!("Listen address: {}", config.listen_addr);
            info!("Data directory: {:?}", config.data_dir);

            let node = Node::new(config)?;
            if let Err(e) = node.start().await {
                error!("Node failed: {}", e);
                return Err(e);
            }
        }
        Command::Provision { user, balance } => {
            let user = UserId::new(user).context("User id must not be empty")?;
            let node = Node::new(config)?;
            node.executor().open_account(&user, balance)?;
            info!("Provisioned {} with balance {}", user, balance);
        }
        Command::Account { user } => {
            let user = UserId::new(user).context("User id must not be empty")?;
            let node = Node::new(config)?;
            let account = node.executor().account(&user)?;
            println!("{}", serde_json::to_string_pretty(&account)?);
        }
    }

    Ok(())
}
