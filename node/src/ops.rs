//! # Wallet Operations
//!
//! The operations behind both the REST routes and the JSON-RPC methods.
//! Each one runs its ledger call on the blocking pool, records metrics and
//! publishes a [`WalletEvent`] when a balance changed.
//!
//! ## Payments
//!
//! ```text
//! validate ─→ debit sender ─┬─ ok ──→ credit recipient ─┬─ ok ──→ done
//!                           │                           └─ err ─→ refund sender
//!                           └─ err ─→ report, recipient untouched
//! ```
//!
//! The whole sequence runs on a spawned task, so an abandoned request
//! cannot stop it between the debit and the credit.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::broadcast;

use indie_ledger::{
    Amount, Identity, IdentityError, Ledger, LedgerError, LedgerResult, Profile, Provenance,
    RawAmount, SledBalanceStore, Wallet,
};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone: everything is behind `Arc` or is a channel handle.
#[derive(Clone)]
pub struct AppState {
    /// Reported by `/health`.
    pub version: String,
    pub ledger: Arc<Ledger<SledBalanceStore>>,
    pub metrics: SharedMetrics,
    /// Live balance changes for `/ws` subscribers.
    pub event_tx: broadcast::Sender<WalletEvent>,
}

/// Balance changes pushed to WebSocket subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WalletEvent {
    #[serde(rename = "wallet_credited")]
    Credited {
        identity: String,
        amount: u64,
        balance: u64,
        created: bool,
        timestamp: i64,
    },
    #[serde(rename = "wallet_debited")]
    Debited {
        identity: String,
        amount: u64,
        balance: u64,
        timestamp: i64,
    },
    #[serde(rename = "payment")]
    Payment {
        sender: String,
        recipient: String,
        amount: u64,
        timestamp: i64,
    },
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Everything a wallet operation can fail with, as seen by API clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("no wallet for {0}")]
    NotFound(Identity),

    #[error("no wallet registered to {0}")]
    EmailNotFound(String),

    #[error("sender and recipient are the same wallet")]
    SelfTransfer,

    #[error("invalid params: {0}")]
    InvalidParams(String),
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        ApiError::InvalidParams(err.to_string())
    }
}

impl ApiError {
    /// Stable snake_case tag sent as `kind` on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Ledger(e) => e.kind(),
            ApiError::NotFound(_) | ApiError::EmailNotFound(_) => "not_found",
            ApiError::SelfTransfer => "self_transfer",
            ApiError::InvalidParams(_) => "invalid_params",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Ledger(LedgerError::InvalidAmount(_))
            | ApiError::SelfTransfer
            | ApiError::InvalidParams(_) => StatusCode::BAD_REQUEST,
            ApiError::Ledger(LedgerError::UnknownIdentity(_))
            | ApiError::NotFound(_)
            | ApiError::EmailNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Ledger(LedgerError::InsufficientFunds { .. }) => StatusCode::CONFLICT,
            ApiError::Ledger(LedgerError::StoreUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// JSON-RPC error code.
    pub fn rpc_code(&self) -> i32 {
        match self {
            ApiError::Ledger(LedgerError::InvalidAmount(_))
            | ApiError::SelfTransfer
            | ApiError::InvalidParams(_) => -32602,
            ApiError::Ledger(LedgerError::UnknownIdentity(_))
            | ApiError::NotFound(_)
            | ApiError::EmailNotFound(_) => -32001,
            ApiError::Ledger(LedgerError::InsufficientFunds { .. }) => -32002,
            ApiError::Ledger(LedgerError::StoreUnavailable(_)) => -32003,
        }
    }
}

/// Error body returned by REST endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
            kind: self.kind().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// A wallet address on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityParams {
    pub provenance: String,
    #[serde(alias = "externalId")]
    pub external_id: String,
}

impl IdentityParams {
    pub fn identity(&self) -> ApiResult<Identity> {
        let provenance: Provenance = self.provenance.parse()?;
        Ok(Identity::new(provenance, self.external_id.clone())?)
    }
}

/// Params of `findWalletByEmail`.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailParams {
    pub email: String,
}

/// Body of `POST /credits` and params of `creditWallet`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreditRequest {
    pub recipient: Profile,
    pub amount: RawAmount,
}

/// Body of `POST /debits` and params of `debitWallet`.
#[derive(Debug, Clone, Deserialize)]
pub struct DebitRequest {
    pub provenance: String,
    #[serde(alias = "externalId")]
    pub external_id: String,
    pub amount: RawAmount,
}

impl DebitRequest {
    pub fn identity(&self) -> ApiResult<Identity> {
        IdentityParams {
            provenance: self.provenance.clone(),
            external_id: self.external_id.clone(),
        }
        .identity()
    }
}

/// Body of `POST /payments` and params of `payWallet`.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub sender: IdentityParams,
    pub recipient: Profile,
    pub amount: RawAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditResponse {
    /// `true` when this credit opened the wallet.
    pub created: bool,
    pub wallet: Wallet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub amount: u64,
    pub sender: Wallet,
    pub recipient: Wallet,
}

fn parse_amount(raw: RawAmount) -> ApiResult<Amount> {
    Amount::try_from(raw).map_err(|e| ApiError::Ledger(e.into()))
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

impl AppState {
    /// Runs a ledger call on the blocking pool. sled flushes to disk on
    /// every mutation, which must not stall the async workers.
    async fn with_ledger<T, F>(&self, op: F) -> ApiResult<T>
    where
        F: FnOnce(&Ledger<SledBalanceStore>) -> LedgerResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let ledger = Arc::clone(&self.ledger);
        let result = tokio::task::spawn_blocking(move || op(ledger.as_ref()))
            .await
            .map_err(|e| LedgerError::StoreUnavailable(format!("ledger task failed: {e}")))?;

        if let Err(LedgerError::StoreUnavailable(reason)) = &result {
            self.metrics.store_errors_total.inc();
            tracing::warn!(%reason, "balance store unavailable");
        }
        Ok(result?)
    }

    fn publish(&self, event: WalletEvent) {
        // No subscribers is not an error.
        let _ = self.event_tx.send(event);
    }

    pub async fn lookup(&self, identity: Identity) -> ApiResult<Wallet> {
        let key = identity.clone();
        self.with_ledger(move |ledger| ledger.lookup(&key))
            .await?
            .ok_or(ApiError::NotFound(identity))
    }

    pub async fn find_by_email(&self, email: String) -> ApiResult<Wallet> {
        let key = email.clone();
        self.with_ledger(move |ledger| ledger.find_by_email(&key))
            .await?
            .ok_or(ApiError::EmailNotFound(email))
    }

    pub async fn list(&self, provenance: Option<Provenance>) -> ApiResult<Vec<Wallet>> {
        self.with_ledger(move |ledger| ledger.wallets(provenance)).await
    }

    pub async fn credit(&self, req: CreditRequest) -> ApiResult<CreditResponse> {
        let amount = parse_amount(req.amount)?;
        self.credit_profile(&req.recipient, amount).await
    }

    async fn credit_profile(
        &self,
        recipient: &Profile,
        amount: Amount,
    ) -> ApiResult<CreditResponse> {
        let identity = recipient.identity()?;
        let snapshot = recipient.snapshot();

        let started = Instant::now();
        let key = identity.clone();
        let outcome = self
            .with_ledger(move |ledger| ledger.credit(&key, amount, &snapshot))
            .await?;
        self.metrics
            .mutation_latency_seconds
            .observe(started.elapsed().as_secs_f64());

        let created = outcome.is_new();
        let wallet = outcome.into_wallet();
        self.metrics.credits_total.inc();
        if created {
            self.metrics.wallets_created_total.inc();
        }
        self.publish(WalletEvent::Credited {
            identity: identity.to_string(),
            amount: amount.get(),
            balance: wallet.balance,
            created,
            timestamp: now_millis(),
        });

        Ok(CreditResponse { created, wallet })
    }

    pub async fn debit(&self, req: DebitRequest) -> ApiResult<Wallet> {
        let identity = req.identity()?;
        let amount = parse_amount(req.amount)?;
        self.debit_identity(identity, amount).await
    }

    async fn debit_identity(&self, identity: Identity, amount: Amount) -> ApiResult<Wallet> {
        let started = Instant::now();
        let key = identity.clone();
        let result = self
            .with_ledger(move |ledger| ledger.debit(&key, amount))
            .await;
        self.metrics
            .mutation_latency_seconds
            .observe(started.elapsed().as_secs_f64());

        match result {
            Ok(wallet) => {
                self.metrics.debits_total.inc();
                self.publish(WalletEvent::Debited {
                    identity: identity.to_string(),
                    amount: amount.get(),
                    balance: wallet.balance,
                    timestamp: now_millis(),
                });
                Ok(wallet)
            }
            Err(
                e @ ApiError::Ledger(
                    LedgerError::InsufficientFunds { .. } | LedgerError::UnknownIdentity(_),
                ),
            ) => {
                self.metrics.debit_rejections_total.inc();
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Moves `amount` from the sender to the recipient. The recipient is
    /// credited only after the sender's debit succeeded.
    ///
    /// Settlement runs on its own task. Dropping the returned future (a
    /// request timeout, a closed connection) detaches from it but never
    /// cancels it, so a debited amount always reaches the recipient or
    /// goes back to the sender.
    pub async fn pay(&self, req: PaymentRequest) -> ApiResult<PaymentResponse> {
        let state = self.clone();
        tokio::spawn(async move { state.settle(req).await })
            .await
            .map_err(|e| LedgerError::StoreUnavailable(format!("payment task failed: {e}")))?
    }

    async fn settle(&self, req: PaymentRequest) -> ApiResult<PaymentResponse> {
        let result = self.try_pay(req).await;
        match &result {
            Ok(_) => self.metrics.payments_total.inc(),
            Err(e) => {
                self.metrics.payments_failed_total.inc();
                tracing::info!(kind = e.kind(), error = %e, "payment failed");
            }
        }
        result
    }

    async fn try_pay(&self, req: PaymentRequest) -> ApiResult<PaymentResponse> {
        let sender = req.sender.identity()?;
        let recipient = req.recipient.identity()?;
        let amount = parse_amount(req.amount)?;
        if sender == recipient {
            return Err(ApiError::SelfTransfer);
        }

        let debited = self.debit_identity(sender.clone(), amount).await?;

        let credited = self.credit_profile(&req.recipient, amount).await;

        match credited {
            Ok(credit) => {
                self.publish(WalletEvent::Payment {
                    sender: sender.to_string(),
                    recipient: recipient.to_string(),
                    amount: amount.get(),
                    timestamp: now_millis(),
                });
                tracing::info!(
                    sender = %sender,
                    recipient = %recipient,
                    amount = amount.get(),
                    "payment settled"
                );
                Ok(PaymentResponse {
                    amount: amount.get(),
                    sender: debited,
                    recipient: credit.wallet,
                })
            }
            Err(e) => {
                self.refund(&sender, amount, &debited).await;
                Err(e)
            }
        }
    }

    /// Puts a debited amount back after the matching credit failed.
    async fn refund(&self, sender: &Identity, amount: Amount, debited: &Wallet) {
        let key = sender.clone();
        let profile = debited.profile();
        match self
            .with_ledger(move |ledger| ledger.credit(&key, amount, &profile))
            .await
        {
            Ok(_) => tracing::warn!(sender = %sender, amount = amount.get(), "payment refunded"),
            Err(e) => tracing::error!(
                sender = %sender,
                amount = amount.get(),
                error = %e,
                "payment refund failed; sender balance is short by the amount"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_mapping_matches_wire_contract() {
        let cases: Vec<(ApiError, StatusCode, i32, &str)> = vec![
            (
                LedgerError::InvalidAmount("0".into()).into(),
                StatusCode::BAD_REQUEST,
                -32602,
                "invalid_amount",
            ),
            (
                LedgerError::InsufficientFunds {
                    available: 1,
                    requested: 2,
                }
                .into(),
                StatusCode::CONFLICT,
                -32002,
                "insufficient_funds",
            ),
            (
                LedgerError::UnknownIdentity(Identity::chat("1").unwrap()).into(),
                StatusCode::NOT_FOUND,
                -32001,
                "unknown_identity",
            ),
            (
                LedgerError::StoreUnavailable("io".into()).into(),
                StatusCode::SERVICE_UNAVAILABLE,
                -32003,
                "store_unavailable",
            ),
            (
                ApiError::NotFound(Identity::forge("2").unwrap()),
                StatusCode::NOT_FOUND,
                -32001,
                "not_found",
            ),
            (
                ApiError::EmailNotFound("octo@forge.dev".into()),
                StatusCode::NOT_FOUND,
                -32001,
                "not_found",
            ),
            (
                ApiError::SelfTransfer,
                StatusCode::BAD_REQUEST,
                -32602,
                "self_transfer",
            ),
        ];

        for (err, status, code, kind) in cases {
            assert_eq!(err.status(), status, "{err}");
            assert_eq!(err.rpc_code(), code, "{err}");
            assert_eq!(err.kind(), kind);
        }
    }

    #[test]
    fn identity_params_reject_bad_input() {
        let bad_platform = IdentityParams {
            provenance: "myspace".into(),
            external_id: "1".into(),
        };
        assert!(matches!(
            bad_platform.identity(),
            Err(ApiError::InvalidParams(_))
        ));

        let empty = IdentityParams {
            provenance: "chat".into(),
            external_id: "".into(),
        };
        assert!(matches!(empty.identity(), Err(ApiError::InvalidParams(_))));
    }

    #[test]
    fn debit_request_accepts_camel_case_id() {
        let req: DebitRequest = serde_json::from_value(serde_json::json!({
            "provenance": "forge",
            "externalId": "99",
            "amount": "15"
        }))
        .unwrap();
        assert_eq!(req.identity().unwrap(), Identity::forge("99").unwrap());
        assert_eq!(parse_amount(req.amount).unwrap().get(), 15);
    }
}
