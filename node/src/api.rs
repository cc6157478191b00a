//! # REST + WebSocket API
//!
//! Builds the axum router for the ledger service. All handlers share
//! [`AppState`] through axum's `State` extractor and delegate to the wallet
//! operations in [`crate::ops`].
//!
//! ## Endpoints
//!
//! | Method | Path                                | Description                    |
//! |--------|-------------------------------------|--------------------------------|
//! | GET    | `/health`                           | Liveness probe                 |
//! | GET    | `/wallets`                          | Wallets, `?provenance=` `?email=` |
//! | GET    | `/wallets/:provenance/:external_id` | One wallet                     |
//! | POST   | `/credits`                          | Credit (opens wallet if new)   |
//! | POST   | `/debits`                           | Debit                          |
//! | POST   | `/payments`                         | Debit sender, credit recipient |
//! | POST   | `/rpc`                              | JSON-RPC 2.0 gateway           |
//! | GET    | `/ws`                               | Live `WalletEvent` stream      |
//!
//! Errors come back as `{"error": ..., "kind": ...}` with 400, 404, 409 or
//! 503.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use indie_ledger::{Provenance, Wallet};

use crate::ops::{
    ApiError, ApiResult, AppState, CreditRequest, CreditResponse, DebitRequest, IdentityParams,
    PaymentRequest, PaymentResponse,
};
use crate::rpc::rpc_handler;

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`]. Requests running longer than
/// `request_timeout` are abandoned with 408.
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/wallets", get(list_wallets_handler))
        .route("/wallets/:provenance/:external_id", get(wallet_handler))
        .route("/credits", post(credit_handler))
        .route("/debits", post(debit_handler))
        .route("/payments", post(payment_handler))
        .route("/rpc", post(rpc_handler))
        .route("/ws", get(ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(cors),
        )
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`. Does not touch the store.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "ok", "version": state.version })),
    )
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    provenance: Option<String>,
    email: Option<String>,
}

/// `GET /wallets`, in storage key order. `?email=` narrows the list to the
/// wallet registered to that address, if any.
async fn list_wallets_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Wallet>>> {
    let provenance = query
        .provenance
        .as_deref()
        .map(str::parse::<Provenance>)
        .transpose()?;

    let Some(email) = query.email else {
        return Ok(Json(state.list(provenance).await?));
    };
    let wallets = match state.find_by_email(email).await {
        Ok(wallet) => vec![wallet],
        Err(ApiError::EmailNotFound(_)) => Vec::new(),
        Err(e) => return Err(e),
    };
    Ok(Json(
        wallets
            .into_iter()
            .filter(|w| provenance.map_or(true, |p| w.provenance == p))
            .collect(),
    ))
}

/// `GET /wallets/:provenance/:external_id`.
async fn wallet_handler(
    State(state): State<AppState>,
    Path((provenance, external_id)): Path<(String, String)>,
) -> ApiResult<Json<Wallet>> {
    let identity = IdentityParams {
        provenance,
        external_id,
    }
    .identity()?;
    Ok(Json(state.lookup(identity).await?))
}

/// `POST /credits`. 201 when the credit opened the wallet, 200 otherwise.
async fn credit_handler(
    State(state): State<AppState>,
    Json(req): Json<CreditRequest>,
) -> ApiResult<(StatusCode, Json<CreditResponse>)> {
    let resp = state.credit(req).await?;
    let status = if resp.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(resp)))
}

/// `POST /debits`.
async fn debit_handler(
    State(state): State<AppState>,
    Json(req): Json<DebitRequest>,
) -> ApiResult<Json<Wallet>> {
    Ok(Json(state.debit(req).await?))
}

/// `POST /payments`.
async fn payment_handler(
    State(state): State<AppState>,
    Json(req): Json<PaymentRequest>,
) -> ApiResult<Json<PaymentResponse>> {
    Ok(Json(state.pay(req).await?))
}

/// `GET /ws`: WebSocket upgrade for live balance changes.
///
/// Push-only. Client messages are ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let mut rx = state.event_tx.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(ev) => {
                        let payload = match serde_json::to_string(&ev) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!("failed to serialize ws event: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("ws subscriber lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::LedgerMetrics;
    use crate::ops::{ErrorResponse, WalletEvent};
    use crate::rpc::JsonRpcResponse;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use indie_ledger::{Ledger, SledBalanceStore};
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Builds an `AppState` over an in-memory store.
    fn test_app_state() -> AppState {
        let store = SledBalanceStore::open_temporary().expect("temp store");
        let (event_tx, _) = broadcast::channel(64);
        AppState {
            version: "0.1.0-test".into(),
            ledger: Arc::new(Ledger::new(store)),
            metrics: Arc::new(LedgerMetrics::new().expect("metrics")),
            event_tx,
        }
    }

    fn router(state: &AppState) -> Router {
        create_router(state.clone(), Duration::from_secs(5))
    }

    /// Sends a GET request and returns the (status, body_bytes).
    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    /// Sends a POST request with JSON body and returns (status, body_bytes).
    async fn post_json(
        router: &Router,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    fn chat_user(id: &str, name: &str) -> serde_json::Value {
        serde_json::json!({
            "provenance": "chat",
            "id": id,
            "username": name,
            "discriminator": "0007",
        })
    }

    async fn credit(
        router: &Router,
        id: &str,
        name: &str,
        amount: serde_json::Value,
    ) -> StatusCode {
        let body = serde_json::json!({ "recipient": chat_user(id, name), "amount": amount });
        post_json(router, "/credits", body).await.0
    }

    fn error_kind(body: &[u8]) -> String {
        serde_json::from_slice::<ErrorResponse>(body).unwrap().kind
    }

    async fn rpc(router: &Router, method: &str, params: serde_json::Value) -> JsonRpcResponse {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });
        let (status, body) = post_json(router, "/rpc", body).await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice(&body).unwrap()
    }

    // -- REST ----------------------------------------------------------------

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let state = test_app_state();
        let (status, body) = get(&router(&state), "/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], "0.1.0-test");
    }

    #[tokio::test]
    async fn first_credit_is_created_then_updated() {
        let state = test_app_state();
        let router = router(&state);

        assert_eq!(credit(&router, "1", "ana", 100.into()).await, StatusCode::CREATED);
        assert_eq!(credit(&router, "1", "ana", "5".into()).await, StatusCode::OK);

        let (status, body) = get(&router, "/wallets/chat/1").await;
        assert_eq!(status, StatusCode::OK);
        let wallet: Wallet = serde_json::from_slice(&body).unwrap();
        assert_eq!(wallet.balance, 105);
        assert_eq!(
            wallet.avatar_reference.as_deref(),
            Some("https://cdn.discordapp.com/embed/avatars/2.png")
        );

        assert_eq!(state.metrics.credits_total.get(), 2);
        assert_eq!(state.metrics.wallets_created_total.get(), 1);
    }

    #[tokio::test]
    async fn invalid_amounts_are_bad_requests() {
        let state = test_app_state();
        let router = router(&state);

        for amount in [
            serde_json::json!(0),
            serde_json::json!(-5),
            serde_json::json!(2.5),
            serde_json::json!("ten"),
        ] {
            let body = serde_json::json!({ "recipient": chat_user("1", "ana"), "amount": amount });
            let (status, body) = post_json(&router, "/credits", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(error_kind(&body), "invalid_amount");
        }

        let (status, _) = get(&router, "/wallets/chat/1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn lookup_of_missing_wallet_is_404() {
        let state = test_app_state();
        let (status, body) = get(&router(&state), "/wallets/forge/nobody").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error_kind(&body), "not_found");
    }

    #[tokio::test]
    async fn unknown_provenance_is_400() {
        let state = test_app_state();
        let (status, body) = get(&router(&state), "/wallets/myspace/1").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_kind(&body), "invalid_params");
    }

    #[tokio::test]
    async fn debit_rejections_map_to_status() {
        let state = test_app_state();
        let router = router(&state);
        credit(&router, "1", "ana", 10.into()).await;

        let overdraw = serde_json::json!({ "provenance": "chat", "external_id": "1", "amount": 50 });
        let (status, body) = post_json(&router, "/debits", overdraw).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error_kind(&body), "insufficient_funds");

        let ghost = serde_json::json!({ "provenance": "chat", "external_id": "2", "amount": 1 });
        let (status, body) = post_json(&router, "/debits", ghost).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error_kind(&body), "unknown_identity");

        let ok = serde_json::json!({ "provenance": "chat", "external_id": "1", "amount": 4 });
        let (status, body) = post_json(&router, "/debits", ok).await;
        assert_eq!(status, StatusCode::OK);
        let wallet: Wallet = serde_json::from_slice(&body).unwrap();
        assert_eq!(wallet.balance, 6);

        assert_eq!(state.metrics.debits_total.get(), 1);
        assert_eq!(state.metrics.debit_rejections_total.get(), 2);
    }

    #[tokio::test]
    async fn list_filters_by_provenance() {
        let state = test_app_state();
        let router = router(&state);
        credit(&router, "1", "ana", 1.into()).await;
        credit(&router, "2", "bo", 1.into()).await;
        let forge = serde_json::json!({
            "recipient": {
                "provenance": "forge",
                "id": "1",
                "login": "ana-dev",
                "name": "Ana",
                "email": "ana@example.com",
                "avatar_url": "https://forge.example/ana.png"
            },
            "amount": 3
        });
        post_json(&router, "/credits", forge).await;

        let (_, body) = get(&router, "/wallets").await;
        let all: Vec<Wallet> = serde_json::from_slice(&body).unwrap();
        assert_eq!(all.len(), 3);

        let (_, body) = get(&router, "/wallets?provenance=forge").await;
        let forge_only: Vec<Wallet> = serde_json::from_slice(&body).unwrap();
        assert_eq!(forge_only.len(), 1);
        assert_eq!(forge_only[0].handle.as_deref(), Some("ana-dev"));
    }

    #[tokio::test]
    async fn list_narrows_by_email() {
        let state = test_app_state();
        let router = router(&state);
        credit(&router, "1", "ana", 1.into()).await;
        let forge = serde_json::json!({
            "recipient": {
                "provenance": "forge",
                "id": "1",
                "login": "ana-dev",
                "name": "Ana",
                "email": "ana@example.com",
                "avatar_url": "https://forge.example/ana.png"
            },
            "amount": 3
        });
        post_json(&router, "/credits", forge).await;

        let (status, body) = get(&router, "/wallets?email=ana@example.com").await;
        assert_eq!(status, StatusCode::OK);
        let found: Vec<Wallet> = serde_json::from_slice(&body).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].provenance, Provenance::CodeForge);
        assert_eq!(found[0].balance, 3);

        let (_, body) = get(&router, "/wallets?email=ana@example.com&provenance=chat").await;
        let none: Vec<Wallet> = serde_json::from_slice(&body).unwrap();
        assert!(none.is_empty());

        let (status, body) = get(&router, "/wallets?email=bo@example.com").await;
        assert_eq!(status, StatusCode::OK);
        let none: Vec<Wallet> = serde_json::from_slice(&body).unwrap();
        assert!(none.is_empty());
    }

    // -- Payments ------------------------------------------------------------

    #[tokio::test]
    async fn payment_moves_coins() {
        let state = test_app_state();
        let router = router(&state);
        credit(&router, "1", "ana", 100.into()).await;

        let body = serde_json::json!({
            "sender": { "provenance": "chat", "external_id": "1" },
            "recipient": chat_user("2", "bo"),
            "amount": 40
        });
        let (status, body) = post_json(&router, "/payments", body).await;
        assert_eq!(status, StatusCode::OK);

        let resp: PaymentResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.sender.balance, 60);
        assert_eq!(resp.recipient.balance, 40);
        assert_eq!(state.metrics.payments_total.get(), 1);
    }

    #[tokio::test]
    async fn failed_payment_never_credits_recipient() {
        let state = test_app_state();
        let router = router(&state);
        credit(&router, "1", "ana", 10.into()).await;

        let body = serde_json::json!({
            "sender": { "provenance": "chat", "external_id": "1" },
            "recipient": chat_user("2", "bo"),
            "amount": 11
        });
        let (status, body) = post_json(&router, "/payments", body).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error_kind(&body), "insufficient_funds");

        let (status, _) = get(&router, "/wallets/chat/2").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(state.metrics.payments_failed_total.get(), 1);
    }

    #[tokio::test]
    async fn failed_recipient_credit_refunds_sender() {
        let state = test_app_state();
        let router = router(&state);
        credit(&router, "2", "bo", i64::MAX.into()).await;
        credit(&router, "2", "bo", i64::MAX.into()).await;
        credit(&router, "1", "ana", 10.into()).await;

        let body = serde_json::json!({
            "sender": { "provenance": "chat", "external_id": "1" },
            "recipient": chat_user("2", "bo"),
            "amount": 2
        });
        let (status, body) = post_json(&router, "/payments", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_kind(&body), "invalid_amount");

        let (_, body) = get(&router, "/wallets/chat/1").await;
        let sender: Wallet = serde_json::from_slice(&body).unwrap();
        assert_eq!(sender.balance, 10);
        assert_eq!(sender.display_name.as_deref(), Some("ana"));

        let (_, body) = get(&router, "/wallets/chat/2").await;
        let recipient: Wallet = serde_json::from_slice(&body).unwrap();
        assert_eq!(recipient.balance, u64::MAX - 1);

        assert_eq!(state.metrics.payments_failed_total.get(), 1);
        assert_eq!(state.metrics.payments_total.get(), 0);
    }

    #[tokio::test]
    async fn abandoned_payment_still_settles() {
        let state = test_app_state();
        let router = router(&state);
        credit(&router, "1", "ana", 100.into()).await;
        let mut rx = state.event_tx.subscribe();

        let req: PaymentRequest = serde_json::from_value(serde_json::json!({
            "sender": { "provenance": "chat", "external_id": "1" },
            "recipient": chat_user("2", "bo"),
            "amount": 40
        }))
        .unwrap();
        let caller = tokio::spawn({
            let state = state.clone();
            async move { state.pay(req).await }
        });

        // Walk away as soon as the sender has been charged.
        let wait = Duration::from_secs(5);
        loop {
            let event = tokio::time::timeout(wait, rx.recv()).await.unwrap().unwrap();
            if matches!(event, WalletEvent::Debited { .. }) {
                break;
            }
        }
        caller.abort();

        loop {
            let event = tokio::time::timeout(wait, rx.recv()).await.unwrap().unwrap();
            if matches!(event, WalletEvent::Payment { .. }) {
                break;
            }
        }

        let (_, body) = get(&router, "/wallets/chat/1").await;
        let sender: Wallet = serde_json::from_slice(&body).unwrap();
        let (_, body) = get(&router, "/wallets/chat/2").await;
        let recipient: Wallet = serde_json::from_slice(&body).unwrap();
        assert_eq!(sender.balance, 60);
        assert_eq!(recipient.balance, 40);
        assert_eq!(sender.balance + recipient.balance, 100);
        assert_eq!(state.metrics.payments_total.get(), 1);
    }

    #[tokio::test]
    async fn paying_yourself_is_rejected() {
        let state = test_app_state();
        let router = router(&state);
        credit(&router, "1", "ana", 10.into()).await;

        let body = serde_json::json!({
            "sender": { "provenance": "chat", "external_id": "1" },
            "recipient": chat_user("1", "ana"),
            "amount": 5
        });
        let (status, body) = post_json(&router, "/payments", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_kind(&body), "self_transfer");

        let (_, body) = get(&router, "/wallets/chat/1").await;
        let wallet: Wallet = serde_json::from_slice(&body).unwrap();
        assert_eq!(wallet.balance, 10);
    }

    #[tokio::test]
    async fn mutations_are_broadcast() {
        let state = test_app_state();
        let mut rx = state.event_tx.subscribe();
        let router = router(&state);

        credit(&router, "1", "ana", 7.into()).await;

        match rx.recv().await.unwrap() {
            WalletEvent::Credited {
                identity,
                amount,
                balance,
                created,
                ..
            } => {
                assert_eq!(identity, "chat:1");
                assert_eq!(amount, 7);
                assert_eq!(balance, 7);
                assert!(created);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    // -- JSON-RPC ------------------------------------------------------------

    #[tokio::test]
    async fn rpc_credit_then_lookup() {
        let state = test_app_state();
        let router = router(&state);

        let resp = rpc(
            &router,
            "creditWallet",
            serde_json::json!({ "recipient": chat_user("9", "cy"), "amount": "12" }),
        )
        .await;
        assert!(resp.error.is_none());
        let result: CreditResponse = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert!(result.created);

        let resp = rpc(
            &router,
            "lookupWallet",
            serde_json::json!({ "provenance": "chat", "externalId": "9" }),
        )
        .await;
        let wallet: Wallet = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(wallet.balance, 12);
    }

    #[tokio::test]
    async fn rpc_find_wallet_by_email() {
        let state = test_app_state();
        let router = router(&state);
        let forge = serde_json::json!({
            "provenance": "forge",
            "id": "583231",
            "login": "octocat",
            "name": "The Octocat",
            "email": "octocat@forge.dev",
            "avatar_url": "https://forge.example/octocat.png"
        });
        rpc(
            &router,
            "creditWallet",
            serde_json::json!({ "recipient": forge, "amount": 25 }),
        )
        .await;

        let resp = rpc(
            &router,
            "findWalletByEmail",
            serde_json::json!({ "email": "octocat@forge.dev" }),
        )
        .await;
        let wallet: Wallet = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(wallet.external_id, "583231");
        assert_eq!(wallet.balance, 25);

        let resp = rpc(
            &router,
            "findWalletByEmail",
            serde_json::json!({ "email": "ghost@forge.dev" }),
        )
        .await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, -32001);
        assert_eq!(err.data.unwrap()["kind"], "not_found");
    }

    #[tokio::test]
    async fn rpc_error_codes() {
        let state = test_app_state();
        let router = router(&state);
        credit(&router, "1", "ana", 5.into()).await;

        let resp = rpc(
            &router,
            "debitWallet",
            serde_json::json!({ "provenance": "chat", "external_id": "1", "amount": 6 }),
        )
        .await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, -32002);
        assert_eq!(err.data.unwrap()["kind"], "insufficient_funds");

        let resp = rpc(
            &router,
            "lookupWallet",
            serde_json::json!({ "provenance": "chat", "external_id": "404" }),
        )
        .await;
        assert_eq!(resp.error.unwrap().code, -32001);

        let resp = rpc(
            &router,
            "debitWallet",
            serde_json::json!({ "provenance": "chat", "external_id": "1", "amount": 0 }),
        )
        .await;
        assert_eq!(resp.error.unwrap().code, -32602);

        let resp = rpc(&router, "creditWallet", serde_json::json!({ "amount": 1 })).await;
        assert_eq!(resp.error.unwrap().code, -32602);

        let resp = rpc(&router, "mintCoins", serde_json::json!({})).await;
        assert_eq!(resp.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn rpc_pay_wallet() {
        let state = test_app_state();
        let router = router(&state);
        credit(&router, "1", "ana", 30.into()).await;

        let resp = rpc(
            &router,
            "payWallet",
            serde_json::json!({
                "sender": { "provenance": "chat", "external_id": "1" },
                "recipient": chat_user("2", "bo"),
                "amount": 30
            }),
        )
        .await;
        let result: PaymentResponse = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(result.sender.balance, 0);
        assert_eq!(result.recipient.balance, 30);
    }

    #[tokio::test]
    async fn rpc_invalid_envelope() {
        let state = test_app_state();
        let router = router(&state);

        let (_, body) = post_json(
            &router,
            "/rpc",
            serde_json::json!({ "jsonrpc": "1.0", "method": "lookupWallet", "id": 20 }),
        )
        .await;
        let resp: JsonRpcResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.error.unwrap().code, -32600);
        assert_eq!(resp.id, serde_json::json!(20));

        let (_, body) = post_json(&router, "/rpc", serde_json::json!([1, 2, 3])).await;
        let resp: JsonRpcResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.error.unwrap().code, -32600);
    }
}
