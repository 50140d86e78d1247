//! CLI commands for the ledger node
//!
//! Each command mirrors one HTTP operation and runs against the same
//! file-backed ledger and key store, with the same input validation.

use crate::api::validation::transfer;
use crate::config::GatewayConfig;
use crate::core::Transaction;
use crate::ledger::{
    Address, Base58Check, FileKeyStore, FileLedger, KeyStore, LedgerBackend,
};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Collaborators a CLI invocation works with
pub struct CliContext {
    pub config: GatewayConfig,
    pub ledger: FileLedger,
    pub key_store: FileKeyStore,
}

impl CliContext {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            ledger: FileLedger::from_config(&config),
            key_store: FileKeyStore::from_config(&config),
            config,
        }
    }
}

fn parse_address(raw: &str) -> CliResult<Address> {
    Address::parse(raw, &Base58Check).map_err(|e| format!("{raw}: {e}").into())
}

/// Create the chain and build its index
pub fn cmd_create_blockchain(ctx: &mut CliContext, address: &str) -> CliResult<()> {
    let address = parse_address(address)?;
    let node = &ctx.config.node_id;

    let chain = ctx.ledger.init(node, &address)?;
    let tx_count = ctx.ledger.rebuild_index(&chain)?;

    println!("✅ Blockchain created!");
    println!("   📁 Node: {}", node);
    println!("   🧱 Genesis block hash: {}", chain.tip().hash);
    println!("   💰 Reward sent to: {}", address);
    println!("   📇 Indexed transactions: {}", tx_count);

    Ok(())
}

/// Get the balance of an address
pub fn cmd_get_balance(ctx: &CliContext, address: &str) -> CliResult<u64> {
    let address = parse_address(address)?;
    let balance = ctx.ledger.balance_of(&ctx.config.node_id, &address)?;

    println!("💰 Balance of {}: {}", address, balance);

    Ok(balance)
}

/// Send coins, mining a block right away if `mine` is set
pub fn cmd_send(
    ctx: &mut CliContext,
    from: &str,
    to: &str,
    amount: i64,
    mine: bool,
) -> CliResult<Transaction> {
    let transfer = transfer(from, to, amount, mine, &Base58Check)?;
    let tx = ctx.ledger.send(&ctx.config.node_id, &transfer)?;

    println!("📤 Transaction created:");
    println!("   ID: {}", tx.id);
    println!("   From: {}", transfer.from);
    println!("   To: {}", transfer.to);
    println!("   Amount: {} coins", transfer.amount);

    if mine {
        println!("\n✅ Transaction mined into a new block");
    } else {
        println!("\n✅ Transaction queued");
        println!("   It will be included in the next mined block.");
    }

    Ok(tx)
}

/// Print every block from the tip back to genesis
pub fn cmd_print_chain(ctx: &CliContext) -> CliResult<()> {
    let chain = ctx.ledger.open(&ctx.config.node_id)?;

    for block in chain.iter() {
        println!("🧱 Block #{}", block.height);
        println!("   ├─ Hash: {}", block.hash);
        println!("   ├─ Prev. hash: {}", block.prev_hash);
        println!("   ├─ Nonce: {}", block.nonce);
        println!(
            "   ├─ Time: {}",
            block.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
        println!("   ├─ PoW: {}", block.is_valid_pow());
        println!("   └─ Transactions:");
        for tx in &block.transactions {
            println!(
                "      └─ {} ({} in, {} out, {} coins)",
                tx.id,
                tx.inputs.len(),
                tx.outputs.len(),
                tx.total_output()
            );
        }
        println!();
    }

    Ok(())
}

/// Create a new wallet
pub fn cmd_create_wallet(ctx: &mut CliContext) -> CliResult<Address> {
    let address = ctx.key_store.create_address(&ctx.config.node_id)?;

    println!("🔐 New wallet created!");
    println!("   📍 Address: {}", address);

    Ok(address)
}

/// List the addresses of all wallets
pub fn cmd_list_addresses(ctx: &CliContext) -> CliResult<Vec<Address>> {
    let addresses = ctx.key_store.list_addresses(&ctx.config.node_id)?;

    if addresses.is_empty() {
        println!("📭 No wallets found. Create one with: ledger-node createwallet");
        return Ok(addresses);
    }

    println!("📋 Wallets:");
    for address in &addresses {
        println!("   {}", address);
    }

    Ok(addresses)
}

/// Rebuild the spendable-output index
pub fn cmd_reindex_utxo(ctx: &mut CliContext) -> CliResult<usize> {
    let chain = ctx.ledger.open(&ctx.config.node_id)?;
    let tx_count = ctx.ledger.rebuild_index(&chain)?;

    println!(
        "✅ Done! There are {} transactions in the UTXO set.",
        tx_count
    );

    Ok(tx_count)
}
