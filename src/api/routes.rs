//! REST API routes configuration

use crate::api::error::aggregate_errors;
use crate::api::handlers::{self, ApiState};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    // Configure CORS for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ping", post(handlers::ping))
        // Wallet endpoints
        .route("/createwallet", get(handlers::create_wallet))
        .route("/listaddresses", get(handlers::list_addresses))
        // Chain endpoints
        .route("/printchain", get(handlers::print_chain))
        .route("/createblockchain", get(handlers::create_blockchain))
        .route("/getbalance", get(handlers::get_balance))
        .route("/send", post(handlers::send))
        .route("/reindexutxo", get(handlers::reindex_utxo))
        .with_state(state)
        .layer(middleware::from_fn(aggregate_errors))
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GatewayConfig, NodeId};
    use crate::core::{Blockchain, Transaction, BLOCK_REWARD};
    use crate::ledger::{
        Address, AddressFormat, Base58Check, FileKeyStore, FileLedger, LedgerBackend,
        LedgerError, Transfer,
    };
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const DIFFICULTY: u32 = 4;

    fn config(dir: &TempDir) -> GatewayConfig {
        GatewayConfig::new(NodeId::new("3000").unwrap(), dir.path())
            .with_difficulty(DIFFICULTY)
            .unwrap()
    }

    fn file_app(dir: &TempDir) -> Router {
        create_router(ApiState::new(config(dir)))
    }

    /// Counts write calls and never succeeds at them
    struct RecordingLedger {
        writes: Arc<AtomicUsize>,
    }

    impl LedgerBackend for RecordingLedger {
        fn open(&self, node: &NodeId) -> Result<Blockchain, LedgerError> {
            Err(LedgerError::NotFound(node.clone()))
        }

        fn init(&mut self, _node: &NodeId, _genesis: &Address) -> Result<Blockchain, LedgerError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::AlreadyExists)
        }

        fn rebuild_index(&mut self, _chain: &Blockchain) -> Result<usize, LedgerError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        }

        fn balance_of(&self, _node: &NodeId, _address: &Address) -> Result<u64, LedgerError> {
            Ok(0)
        }

        fn send(&mut self, _node: &NodeId, _transfer: &Transfer) -> Result<Transaction, LedgerError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::InvalidInput("recorded".to_string()))
        }
    }

    struct AcceptAll;

    impl AddressFormat for AcceptAll {
        fn is_valid(&self, _raw: &str) -> bool {
            true
        }
    }

    fn recording_app(dir: &TempDir) -> (Router, Arc<AtomicUsize>) {
        let writes = Arc::new(AtomicUsize::new(0));
        let state = ApiState::with_backends(
            config(dir),
            Box::new(RecordingLedger {
                writes: writes.clone(),
            }),
            Box::new(FileKeyStore::new(dir.path())),
            Arc::new(AcceptAll),
        );
        (create_router(state), writes)
    }

    async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
        call(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        call(app, request).await
    }

    async fn new_wallet(app: &Router) -> String {
        let (status, body) = get(app, "/createwallet").await;
        assert_eq!(status, StatusCode::OK);
        body["address"].as_str().unwrap().to_string()
    }

    async fn balance(app: &Router, address: &str) -> u64 {
        let (status, body) = get(app, &format!("/getbalance?address={address}")).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["balance"].as_u64().unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let dir = tempfile::tempdir().unwrap();
        let app = file_app(&dir);

        let request = Request::builder()
            .method("POST")
            .uri("/ping")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "message": "pong" }));
    }

    #[tokio::test]
    async fn test_wallets_created_and_listed() {
        let dir = tempfile::tempdir().unwrap();
        let app = file_app(&dir);

        let first = new_wallet(&app).await;
        let second = new_wallet(&app).await;
        assert!(Address::parse(&first, &Base58Check).is_ok());

        let (status, body) = get(&app, "/listaddresses").await;
        assert_eq!(status, StatusCode::OK);

        let mut expected = vec![first, second];
        expected.sort();
        assert_eq!(body, json!({ "addresses": expected }));
    }

    #[tokio::test]
    async fn test_create_then_balance() {
        let dir = tempfile::tempdir().unwrap();
        let app = file_app(&dir);
        let owner = new_wallet(&app).await;

        let (status, body) = get(&app, &format!("/createblockchain?address={owner}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "message": "Finished!" }));

        assert_eq!(balance(&app, &owner).await, BLOCK_REWARD);
    }

    #[tokio::test]
    async fn test_create_twice_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let app = file_app(&dir);
        let owner = new_wallet(&app).await;
        let uri = format!("/createblockchain?address={owner}");

        assert_eq!(get(&app, &uri).await.0, StatusCode::OK);
        let (status, body) = get(&app, &uri).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": ["Blockchain already exists"] }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_create() {
        let dir = tempfile::tempdir().unwrap();
        let app = file_app(&dir);
        let owner = new_wallet(&app).await;
        let uri = format!("/createblockchain?address={owner}");

        let (a, b) = tokio::join!(get(&app, &uri), get(&app, &uri));

        let mut statuses = vec![a.0, b.0];
        statuses.sort();
        assert_eq!(statuses, vec![StatusCode::OK, StatusCode::BAD_REQUEST]);

        let failed = if a.0 == StatusCode::OK { b.1 } else { a.1 };
        assert_eq!(failed, json!({ "error": ["Blockchain already exists"] }));

        let (_, chain) = get(&app, "/printchain").await;
        assert_eq!(chain["blocks"].as_array().unwrap().len(), 1);
        assert_eq!(balance(&app, &owner).await, BLOCK_REWARD);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reads_see_send_whole_or_not_at_all() {
        let dir = tempfile::tempdir().unwrap();
        let app = file_app(&dir);
        let from = new_wallet(&app).await;
        let to = new_wallet(&app).await;
        get(&app, &format!("/createblockchain?address={from}")).await;

        let send = {
            let app = app.clone();
            let body = json!({ "from": from, "to": to, "amount": 10, "mine": true });
            tokio::spawn(async move { post_json(&app, "/send", body).await })
        };

        let reads: Vec<_> = (0..8)
            .map(|_| {
                let app = app.clone();
                let uri = format!("/getbalance?address={to}");
                tokio::spawn(async move { (get(&app, &uri).await, get(&app, "/printchain").await) })
            })
            .collect();

        let (status, body) = send.await.unwrap();
        assert_eq!(status, StatusCode::OK, "{body}");

        for read in reads {
            let ((balance_status, balance), (chain_status, chain)) = read.await.unwrap();

            assert_eq!(balance_status, StatusCode::OK, "{balance}");
            assert!(
                matches!(balance["balance"].as_u64(), Some(0) | Some(10)),
                "{balance}"
            );

            assert_eq!(chain_status, StatusCode::OK, "{chain}");
            let blocks = chain["blocks"].as_array().unwrap().len();
            assert!(blocks == 1 || blocks == 2, "{blocks} blocks");
        }

        assert_eq!(balance(&app, &to).await, 10);
    }

    #[tokio::test]
    async fn test_print_fresh_chain() {
        let dir = tempfile::tempdir().unwrap();
        let app = file_app(&dir);
        let owner = new_wallet(&app).await;
        get(&app, &format!("/createblockchain?address={owner}")).await;

        let (status, body) = get(&app, "/printchain").await;

        assert_eq!(status, StatusCode::OK);
        let blocks = body["blocks"].as_array().unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0]["prev_hash"], "");
    }

    #[tokio::test]
    async fn test_reindex_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let app = file_app(&dir);
        let owner = new_wallet(&app).await;
        get(&app, &format!("/createblockchain?address={owner}")).await;

        let (status, first) = get(&app, "/reindexutxo").await;
        assert_eq!(status, StatusCode::OK);
        let (_, second) = get(&app, "/reindexutxo").await;

        assert_eq!(first, json!({ "message": "Finished!", "txCount": 1 }));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_send_and_mine() {
        let dir = tempfile::tempdir().unwrap();
        let app = file_app(&dir);
        let from = new_wallet(&app).await;
        let to = new_wallet(&app).await;
        get(&app, &format!("/createblockchain?address={from}")).await;

        let (status, body) = post_json(
            &app,
            "/send",
            json!({ "from": from, "to": to, "amount": 10, "mine": true }),
        )
        .await;

        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["message"], "Finished!");
        assert!(body["transaction"]["id"].is_string());

        assert_eq!(balance(&app, &to).await, 10);
        // The sender also collects the reward for the block it mined
        assert_eq!(balance(&app, &from).await, BLOCK_REWARD - 10 + BLOCK_REWARD);

        let (_, chain) = get(&app, "/printchain").await;
        assert_eq!(chain["blocks"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_send_queued() {
        let dir = tempfile::tempdir().unwrap();
        let app = file_app(&dir);
        let from = new_wallet(&app).await;
        let to = new_wallet(&app).await;
        get(&app, &format!("/createblockchain?address={from}")).await;

        let (status, _) =
            post_json(&app, "/send", json!({ "from": from, "to": to, "amount": 5 })).await;
        assert_eq!(status, StatusCode::OK);

        assert_eq!(balance(&app, &to).await, 0);
        let (_, chain) = get(&app, "/printchain").await;
        assert_eq!(chain["blocks"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_send_insufficient_funds() {
        let dir = tempfile::tempdir().unwrap();
        let app = file_app(&dir);
        let from = new_wallet(&app).await;
        let to = new_wallet(&app).await;
        get(&app, &format!("/createblockchain?address={from}")).await;

        let (status, body) = post_json(
            &app,
            "/send",
            json!({ "from": from, "to": to, "amount": 1000, "mine": true }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "error": ["Not enough funds: have 20, need 1000"] })
        );
    }

    #[tokio::test]
    async fn test_negative_amount_never_writes() {
        let dir = tempfile::tempdir().unwrap();
        let (app, writes) = recording_app(&dir);

        let (status, body) = post_json(
            &app,
            "/send",
            json!({ "from": "AAAAA", "to": "BBBBB", "amount": -5 }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": ["amount: must be a positive integer"] }));
        assert_eq!(writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_bodies_never_write() {
        let dir = tempfile::tempdir().unwrap();
        let (app, writes) = recording_app(&dir);

        for body in [
            json!({ "from": "AAAAA", "amount": 10 }),
            json!({ "to": "BBBBB", "amount": 10 }),
            json!({ "from": "AAAAA", "to": "BBBBB" }),
            json!({ "from": "AAAAA", "to": "BBBBB", "amount": "10" }),
            json!([]),
        ] {
            let (status, response) = post_json(&app, "/send", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(response["error"].as_array().unwrap().len(), 1);
        }

        let request = Request::builder()
            .method("POST")
            .uri("/send")
            .body(Body::from("from=AAAAA"))
            .unwrap();
        assert_eq!(call(&app, request).await.0, StatusCode::BAD_REQUEST);

        assert_eq!(writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_send_reports_all_domain_errors() {
        let dir = tempfile::tempdir().unwrap();
        let app = file_app(&dir);

        let (status, body) = post_json(
            &app,
            "/send",
            json!({ "from": "AAAAA", "to": "BB", "amount": 0, "mine": true }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "error": [
                "from: address is not valid",
                "to: address is not valid",
                "amount: must be a positive integer"
            ] })
        );
    }

    #[tokio::test]
    async fn test_collaborator_error_passed_through() {
        let dir = tempfile::tempdir().unwrap();
        let (app, writes) = recording_app(&dir);

        let (status, body) = post_json(
            &app,
            "/send",
            json!({ "from": "AAAAA", "to": "BBBBB", "amount": 5 }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": ["recorded"] }));
        assert_eq!(writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_address_query_validation() {
        let dir = tempfile::tempdir().unwrap();
        let app = file_app(&dir);

        let (status, body) = get(&app, "/getbalance?address=AAAAA").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": ["address is not valid"] }));

        let (status, body) = get(&app, "/createblockchain").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"].as_array().unwrap().len(), 1);

        // Nothing was created by the rejected request
        let (status, _) = get(&app, "/printchain").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_balance_without_chain() {
        let dir = tempfile::tempdir().unwrap();
        let app = file_app(&dir);
        let owner = new_wallet(&app).await;

        let (status, body) = get(&app, &format!("/getbalance?address={owner}")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message = body["error"][0].as_str().unwrap();
        assert!(message.starts_with("No existing blockchain found"));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let dir = tempfile::tempdir().unwrap();
        let app = file_app(&dir);

        let (status, _) = get(&app, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_file_ledger_is_the_default_backend() {
        let dir = tempfile::tempdir().unwrap();
        let app = file_app(&dir);
        let owner = new_wallet(&app).await;
        get(&app, &format!("/createblockchain?address={owner}")).await;

        let ledger = FileLedger::new(dir.path(), DIFFICULTY);
        let chain = ledger.open(&NodeId::new("3000").unwrap()).unwrap();
        assert_eq!(chain.len(), 1);
    }
}
