//! Ledger node
//!
//! Serves the HTTP gateway or runs a single ledger operation from the
//! command line.

use clap::{Parser, Subcommand};
use ledger_gateway::api::{create_router, ApiState};
use ledger_gateway::cli::{self, CliContext};
use ledger_gateway::config::{
    GatewayConfig, NodeId, DEFAULT_DATA_DIR, DEFAULT_DIFFICULTY, DEFAULT_LISTEN_ADDR,
};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ledger-node")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "HTTP gateway and CLI for a local UTXO ledger", long_about = None)]
struct Cli {
    /// Node identity selecting the ledger and wallet files
    #[arg(long, env = "NODE_ID")]
    node_id: NodeId,

    /// Data directory for ledger and wallet storage
    #[arg(short, long, env = "LEDGER_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Mining difficulty (number of leading zero bits)
    #[arg(long, env = "LEDGER_DIFFICULTY", default_value_t = DEFAULT_DIFFICULTY)]
    difficulty: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Address to listen on
        #[arg(short, long, env = "LEDGER_LISTEN_ADDR", default_value_t = DEFAULT_LISTEN_ADDR)]
        listen: SocketAddr,
    },

    /// Create a blockchain and send the genesis reward to ADDRESS
    #[command(name = "createblockchain")]
    CreateBlockchain {
        #[arg(short, long)]
        address: String,
    },

    /// Get the balance of ADDRESS
    #[command(name = "getbalance")]
    GetBalance {
        #[arg(short, long)]
        address: String,
    },

    /// Send AMOUNT of coins from FROM to TO
    Send {
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        to: String,

        #[arg(short, long, allow_negative_numbers = true)]
        amount: i64,

        /// Mine a block immediately instead of queueing the transaction
        #[arg(short, long)]
        mine: bool,
    },

    /// Print the blocks in the chain
    #[command(name = "printchain")]
    PrintChain,

    /// Create a new wallet
    #[command(name = "createwallet")]
    CreateWallet,

    /// List the addresses in the wallet file
    #[command(name = "listaddresses")]
    ListAddresses,

    /// Rebuild the spendable-output index
    #[command(name = "reindexutxo")]
    ReindexUtxo,
}

fn main() {
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = GatewayConfig::new(cli.node_id, cli.data_dir).with_difficulty(cli.difficulty)?;

    let mut ctx = CliContext::new(config.clone());

    match cli.command {
        Commands::Serve { listen } => {
            return run_server(config.with_listen_addr(listen));
        }

        Commands::CreateBlockchain { address } => {
            cli::cmd_create_blockchain(&mut ctx, &address)?;
        }

        Commands::GetBalance { address } => {
            cli::cmd_get_balance(&ctx, &address)?;
        }

        Commands::Send {
            from,
            to,
            amount,
            mine,
        } => {
            cli::cmd_send(&mut ctx, &from, &to, amount, mine)?;
        }

        Commands::PrintChain => {
            cli::cmd_print_chain(&ctx)?;
        }

        Commands::CreateWallet => {
            cli::cmd_create_wallet(&mut ctx)?;
        }

        Commands::ListAddresses => {
            cli::cmd_list_addresses(&ctx)?;
        }

        Commands::ReindexUtxo => {
            cli::cmd_reindex_utxo(&mut ctx)?;
        }
    }

    Ok(())
}

fn run_server(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        let addr = config.listen_addr;
        let node_id = config.node_id.clone();
        let data_dir = config.data_dir.clone();

        let app = create_router(ApiState::new(config));
        let listener = tokio::net::TcpListener::bind(addr).await?;

        println!("🚀 Ledger gateway listening on http://{}", addr);
        println!("   📁 Node {} in {:?}", node_id, data_dir);
        println!();
        println!("📖 Available endpoints:");
        println!("   POST /ping                        - Health check");
        println!("   GET  /createwallet                - Create wallet");
        println!("   GET  /listaddresses               - List wallet addresses");
        println!("   GET  /printchain                  - All blocks, newest first");
        println!("   GET  /createblockchain?address=   - Create blockchain");
        println!("   GET  /getbalance?address=         - Get balance");
        println!("   POST /send                        - Send coins");
        println!("   GET  /reindexutxo                 - Rebuild UTXO index");
        println!();

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                tokio::signal::ctrl_c().await.ok();
                println!("\n📴 Shutting down API server...");
            })
            .await?;

        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
