//! REST API module
//!
//! HTTP gateway to the node's ledger and wallets. Every route answers with
//! either its JSON payload or `{"error": [..]}` and status 400.
//!
//! # Endpoints
//!
//! - `POST /ping` - Liveness check
//! - `GET /createwallet` - Create a wallet
//! - `GET /listaddresses` - List wallet addresses
//! - `GET /printchain` - All blocks, newest first
//! - `GET /createblockchain?address=` - Create the chain and its index
//! - `GET /getbalance?address=` - Balance of an address
//! - `POST /send` - Transfer `{from, to, amount, mine?}`
//! - `GET /reindexutxo` - Rebuild the spendable-output index

pub mod error;
pub mod handlers;
pub mod routes;
pub mod validation;

pub use error::{aggregate_errors, ErrorReport, GatewayError};
pub use handlers::ApiState;
pub use routes::create_router;
