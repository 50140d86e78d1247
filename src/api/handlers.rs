//! REST API handlers for ledger operations

use crate::api::error::{ErrorReport, GatewayError};
use crate::api::validation::{address_param, send_command, AddressQuery, SendBody};
use crate::config::GatewayConfig;
use crate::core::{Block, Transaction};
use crate::ledger::{
    Address, AddressFormat, Base58Check, FileKeyStore, FileLedger, KeyStore, LedgerBackend,
    LedgerError,
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

const FINISHED: &str = "Finished!";

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<GatewayConfig>,
    pub ledger: Arc<RwLock<Box<dyn LedgerBackend>>>,
    pub key_store: Arc<RwLock<Box<dyn KeyStore>>>,
    pub address_format: Arc<dyn AddressFormat>,
}

impl ApiState {
    /// State backed by the JSON-file ledger and key store under `config.data_dir`
    pub fn new(config: GatewayConfig) -> Self {
        let ledger = FileLedger::from_config(&config);
        let key_store = FileKeyStore::from_config(&config);
        Self::with_backends(
            config,
            Box::new(ledger),
            Box::new(key_store),
            Arc::new(Base58Check),
        )
    }

    pub fn with_backends(
        config: GatewayConfig,
        ledger: Box<dyn LedgerBackend>,
        key_store: Box<dyn KeyStore>,
        address_format: Arc<dyn AddressFormat>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            ledger: Arc::new(RwLock::new(ledger)),
            key_store: Arc::new(RwLock::new(key_store)),
            address_format,
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn finished() -> Self {
        Self {
            message: FINISHED.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AddressResponse {
    pub address: Address,
}

#[derive(Debug, Serialize)]
pub struct AddressListResponse {
    pub addresses: Vec<Address>,
}

#[derive(Debug, Serialize)]
pub struct ChainResponse {
    /// Newest first, ending with genesis
    pub blocks: Vec<Block>,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: u64,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub message: String,
    pub transaction: Transaction,
}

#[derive(Debug, Serialize)]
pub struct ReindexResponse {
    pub message: String,
    #[serde(rename = "txCount")]
    pub tx_count: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// Run a collaborator call on the blocking pool while holding `guard`
///
/// The guard is released when the call returns, whether or not the caller
/// is still waiting for the response.
async fn run_blocking<G, T, F>(guard: G, call: F) -> Result<T, ErrorReport>
where
    G: Send + 'static,
    T: Send + 'static,
    F: FnOnce(G) -> Result<T, LedgerError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || call(guard))
        .await
        .map_err(|e| GatewayError::Collaborator(format!("ledger task failed: {e}")))?
        .map_err(ErrorReport::from)
}

/// POST /ping - Liveness check
pub async fn ping() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "pong".to_string(),
    })
}

/// GET /createwallet - Create a wallet for this node
pub async fn create_wallet(
    State(state): State<ApiState>,
) -> Result<Json<AddressResponse>, ErrorReport> {
    let node = state.config.node_id.clone();
    let key_store = state.key_store.clone().write_owned().await;

    let address = run_blocking(key_store, move |mut keys| keys.create_address(&node)).await?;

    Ok(Json(AddressResponse { address }))
}

/// GET /listaddresses - List wallet addresses of this node
pub async fn list_addresses(
    State(state): State<ApiState>,
) -> Result<Json<AddressListResponse>, ErrorReport> {
    let node = state.config.node_id.clone();
    let key_store = state.key_store.clone().read_owned().await;

    let addresses = run_blocking(key_store, move |keys| keys.list_addresses(&node)).await?;

    Ok(Json(AddressListResponse { addresses }))
}

/// GET /printchain - Every block from the tip back to genesis
pub async fn print_chain(
    State(state): State<ApiState>,
) -> Result<Json<ChainResponse>, ErrorReport> {
    let node = state.config.node_id.clone();
    let ledger = state.ledger.clone().read_owned().await;

    let blocks = run_blocking(ledger, move |ledger| {
        let chain = ledger.open(&node)?;

        let mut blocks = Vec::with_capacity(chain.len());
        for block in chain.iter() {
            blocks.push(block.clone());
            if block.is_genesis() {
                break;
            }
        }
        Ok(blocks)
    })
    .await?;

    Ok(Json(ChainResponse { blocks }))
}

/// GET /createblockchain?address= - Create the chain and build its index
pub async fn create_blockchain(
    State(state): State<ApiState>,
    query: Result<Query<AddressQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, ErrorReport> {
    let address = address_param(query, state.address_format.as_ref())?;
    let node = state.config.node_id.clone();
    let ledger = state.ledger.clone().write_owned().await;

    // Creation and indexing share one write guard: nobody sees the chain
    // before its index exists.
    run_blocking(ledger, move |mut ledger| {
        let chain = ledger.init(&node, &address)?;
        ledger.rebuild_index(&chain)
    })
    .await?;

    Ok(Json(MessageResponse::finished()))
}

/// GET /getbalance?address= - Unspent value of an address
pub async fn get_balance(
    State(state): State<ApiState>,
    query: Result<Query<AddressQuery>, QueryRejection>,
) -> Result<Json<BalanceResponse>, ErrorReport> {
    let address = address_param(query, state.address_format.as_ref())?;
    let node = state.config.node_id.clone();
    let ledger = state.ledger.clone().read_owned().await;

    let balance = run_blocking(ledger, move |ledger| ledger.balance_of(&node, &address)).await?;

    Ok(Json(BalanceResponse { balance }))
}

/// POST /send - Transfer funds, mining a block if `mine` is set
pub async fn send(
    State(state): State<ApiState>,
    body: Result<Json<SendBody>, JsonRejection>,
) -> Result<Json<SendResponse>, ErrorReport> {
    let transfer = send_command(body, state.address_format.as_ref())?;
    let node = state.config.node_id.clone();
    let ledger = state.ledger.clone().write_owned().await;

    let transaction =
        run_blocking(ledger, move |mut ledger| ledger.send(&node, &transfer)).await?;

    Ok(Json(SendResponse {
        message: FINISHED.to_string(),
        transaction,
    }))
}

/// GET /reindexutxo - Rebuild the spendable-output index
pub async fn reindex_utxo(
    State(state): State<ApiState>,
) -> Result<Json<ReindexResponse>, ErrorReport> {
    let node = state.config.node_id.clone();
    let ledger = state.ledger.clone().write_owned().await;

    let tx_count = run_blocking(ledger, move |mut ledger| {
        let chain = ledger.open(&node)?;
        ledger.rebuild_index(&chain)
    })
    .await?;

    Ok(Json(ReindexResponse {
        message: FINISHED.to_string(),
        tx_count,
    }))
}
