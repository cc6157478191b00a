//! # JSON-RPC 2.0 Gateway
//!
//! `POST /rpc` exposes the wallet operations to bots that prefer a single
//! endpoint. Params are named objects with the same shape as the REST
//! bodies.
//!
//! | Method         | Params                               | Result            |
//! |----------------|--------------------------------------|-------------------|
//! | `lookupWallet` | `{provenance, external_id}`          | wallet            |
//! | `findWalletByEmail` | `{email}`                       | wallet            |
//! | `creditWallet` | `{recipient, amount}`                | `{created, wallet}` |
//! | `debitWallet`  | `{provenance, external_id, amount}`  | wallet            |
//! | `payWallet`    | `{sender, recipient, amount}`        | `{amount, sender, recipient}` |
//!
//! Protocol errors use the reserved codes. Ledger errors carry `kind` in
//! `data`.

use axum::{extract::State, Json};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ops::{
    ApiError, AppState, CreditRequest, DebitRequest, EmailParams, IdentityParams, PaymentRequest,
};

const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Must be "2.0".
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<serde_json::Value>,
    /// Echoed back in the response.
    #[serde(default)]
    pub id: serde_json::Value,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: serde_json::Value,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl From<ApiError> for JsonRpcError {
    fn from(err: ApiError) -> Self {
        Self {
            code: err.rpc_code(),
            message: err.to_string(),
            data: Some(serde_json::json!({ "kind": err.kind() })),
        }
    }
}

impl JsonRpcResponse {
    fn reply(id: serde_json::Value, outcome: Result<serde_json::Value, JsonRpcError>) -> Self {
        let (result, error) = match outcome {
            Ok(v) => (Some(v), None),
            Err(e) => (None, Some(e)),
        };
        Self {
            jsonrpc: "2.0".into(),
            result,
            error,
            id,
        }
    }
}

fn params<T: DeserializeOwned>(params: Option<serde_json::Value>) -> Result<T, JsonRpcError> {
    let value = params.unwrap_or(serde_json::Value::Null);
    serde_json::from_value(value)
        .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid params: {e}")))
}

fn to_result<T: Serialize>(outcome: Result<T, ApiError>) -> Result<serde_json::Value, JsonRpcError> {
    let value = outcome.map_err(JsonRpcError::from)?;
    serde_json::to_value(value)
        .map_err(|e| JsonRpcError::new(INTERNAL_ERROR, format!("Internal error: {e}")))
}

/// `POST /rpc`.
///
/// The body is taken as raw JSON so a malformed envelope still gets a
/// JSON-RPC error instead of an HTTP rejection.
pub async fn rpc_handler(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Json<JsonRpcResponse> {
    let req: JsonRpcRequest = match serde_json::from_value(body) {
        Ok(req) => req,
        Err(e) => {
            return Json(JsonRpcResponse::reply(
                serde_json::Value::Null,
                Err(JsonRpcError::new(
                    INVALID_REQUEST,
                    format!("Invalid Request: {e}"),
                )),
            ))
        }
    };

    if req.jsonrpc != "2.0" {
        return Json(JsonRpcResponse::reply(
            req.id,
            Err(JsonRpcError::new(
                INVALID_REQUEST,
                "Invalid Request: jsonrpc must be \"2.0\"",
            )),
        ));
    }

    tracing::debug!(method = %req.method, "rpc call");
    let outcome = dispatch(&state, &req.method, req.params).await;
    Json(JsonRpcResponse::reply(req.id, outcome))
}

async fn dispatch(
    state: &AppState,
    method: &str,
    raw: Option<serde_json::Value>,
) -> Result<serde_json::Value, JsonRpcError> {
    match method {
        "lookupWallet" => {
            let p: IdentityParams = params(raw)?;
            let identity = p.identity().map_err(JsonRpcError::from)?;
            to_result(state.lookup(identity).await)
        }
        "findWalletByEmail" => {
            let p: EmailParams = params(raw)?;
            to_result(state.find_by_email(p.email).await)
        }
        "creditWallet" => {
            let p: CreditRequest = params(raw)?;
            to_result(state.credit(p).await)
        }
        "debitWallet" => {
            let p: DebitRequest = params(raw)?;
            to_result(state.debit(p).await)
        }
        "payWallet" => {
            let p: PaymentRequest = params(raw)?;
            to_result(state.pay(p).await)
        }
        other => Err(JsonRpcError::new(
            METHOD_NOT_FOUND,
            format!("Method not found: {other}"),
        )),
    }
}
