use alloy::primitives::{keccak256, Address, SignatureError as AlloySignatureError, B256, U256};
use axum::{
    body::Body,
    extract::rejection::JsonRejection,
    http::{Response, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    error::CustodyError,
    primitives::{
        jsonrpc::{JsonRpcError, JsonRpcErrorResponse},
        CallContext,
    },
    system::Call,
};

/// Header carrying `<address>:<signature>` on mutating requests.
pub const SIGNATURE_HEADER: &str = "x-custody-signature";

/// Header carrying the signer's nonce on mutating requests, as a decimal integer.
pub const NONCE_HEADER: &str = "x-custody-nonce";

/// Returns the service version.
pub const GET_VERSION_METHOD: &str = "custody_getVersion";

/// Deposits an asset and mints its receipt to the signer.
pub const DEPOSIT_METHOD: &str = "custody_deposit";

/// Burns receipts of the signer and releases the underlying.
pub const WITHDRAW_METHOD: &str = "custody_withdraw";

/// Runs any call as the signer.
pub const EXECUTE_METHOD: &str = "custody_execute";

/// Receipt balance of a holder.
pub const BALANCE_OF_METHOD: &str = "custody_balanceOf";

/// Solvency report of an asset.
pub const TOTAL_ASSETS_METHOD: &str = "custody_totalAssets";

/// Every accepted asset and its receipt.
pub const WRAPPED_TOKENS_METHOD: &str = "custody_wrappedTokens";

/// Strategy slots of an asset.
pub const STRATEGIES_METHOD: &str = "custody_strategies";

/// The nonce the next signed request of an address must carry.
pub const GET_NONCE_METHOD: &str = "custody_getNonce";

pub(super) const MAX_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(6);

/// Error type for the custody API.
#[derive(Debug, Error)]
pub enum CustodyApiError {
    /// The call reverted.
    #[error(transparent)]
    Custody(#[from] CustodyError),
    /// Internal server error.
    #[error("Internal server error")]
    Internal,
    /// Missing signature.
    #[error("Missing '{SIGNATURE_HEADER}' header")]
    NoSignature,
    /// The signature does not recover to the claimed signer.
    #[error("Invalid signature")]
    InvalidSignature,
    /// Malformed or missing authentication header.
    #[error("Malformed authentication header")]
    MalformedHeader,
    /// Signature error.
    #[error(transparent)]
    Signature(#[from] AlloySignatureError),
    /// Unknown method.
    #[error("Unknown method")]
    UnknownMethod,
    /// Invalid JSON.
    #[error(transparent)]
    InvalidJson(#[from] serde_json::Error),
    /// Invalid JSON-RPC request params.
    #[error("Invalid JSON-RPC request params: {0}")]
    InvalidParams(String),
    /// The request body is not a JSON-RPC request.
    #[error(transparent)]
    RejectedJson(#[from] JsonRejection),
}

impl From<CustodyApiError> for JsonRpcError {
    fn from(err: CustodyApiError) -> Self {
        // Reference: https://www.jsonrpc.org/specification#error_object
        //
        // Custom codes:
        // -32001: the call reverted, `data` carries the error tag and whether it is retryable
        // -32002: missing signature header
        // -32003: signature does not recover to the claimed signer
        // -32004: signature could not be parsed or recovered
        // -32005: malformed signature header
        match err {
            CustodyApiError::Custody(err) => Self::new(-32001, err.to_string())
                .with_data(json!({ "tag": err.to_tag_str(), "retryable": err.is_retryable() })),
            CustodyApiError::NoSignature => Self::new(-32002, err.to_string()),
            CustodyApiError::InvalidSignature => Self::new(-32003, err.to_string()),
            CustodyApiError::Signature(err) => Self::new(-32004, err.to_string()),
            CustodyApiError::MalformedHeader => Self::new(-32005, err.to_string()),
            CustodyApiError::InvalidJson(err) => {
                Self::new(-32600, format!("Invalid request: {err}"))
            }
            CustodyApiError::UnknownMethod => Self::new(-32601, err.to_string()),
            CustodyApiError::InvalidParams(err) => Self::new(-32602, err),
            CustodyApiError::Internal => Self::new(-32603, err.to_string()),
            CustodyApiError::RejectedJson(err) => Self::new(-32604, err.to_string()),
        }
    }
}

impl From<&CustodyApiError> for StatusCode {
    fn from(err: &CustodyApiError) -> Self {
        match err {
            CustodyApiError::NoSignature
            | CustodyApiError::InvalidSignature
            | CustodyApiError::Signature(_)
            | CustodyApiError::MalformedHeader => Self::UNAUTHORIZED,
            CustodyApiError::Custody(_)
            | CustodyApiError::UnknownMethod
            | CustodyApiError::InvalidParams(_)
            | CustodyApiError::RejectedJson(_)
            | CustodyApiError::InvalidJson(_) => Self::BAD_REQUEST,
            CustodyApiError::Internal => Self::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CustodyApiError {
    fn into_response(self) -> Response<Body> {
        let status_code = StatusCode::from(&self);
        let err = JsonRpcError::from(self);
        let json = Json(JsonRpcErrorResponse::new(err));

        (status_code, json).into_response()
    }
}

/// The digest a mutating request is signed over: `keccak256(method || nonce || params)`, with the
/// nonce as 8 big-endian bytes and the params array serialized as JSON.
///
/// Each signer's nonce is consumed by the first request carrying it, so a captured request cannot
/// be replayed.
pub fn request_digest(
    method: &str,
    nonce: u64,
    params: &[Value],
) -> Result<B256, CustodyApiError> {
    let mut preimage = method.as_bytes().to_vec();
    preimage.extend(nonce.to_be_bytes());
    preimage.extend(serde_json::to_vec(params)?);
    Ok(keccak256(preimage))
}

/// Parameters of `custody_deposit` and `custody_withdraw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAmount {
    /// The asset, or the native sentinel.
    pub asset: Address,
    /// Amount, in the asset's smallest unit.
    pub amount: U256,
}

/// Read-only questions answered by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    /// Receipt balance of `holder` for `asset`.
    BalanceOf {
        /// The asset.
        asset: Address,
        /// The receipt holder.
        holder: Address,
    },
    /// Solvency report of `asset`.
    TotalAssets(Address),
    /// Every accepted asset and its receipt.
    WrappedTokens,
    /// Strategy slots of `asset`.
    Strategies(Address),
    /// Next nonce of a signer.
    Nonce(Address),
}

/// The custody API.
#[async_trait::async_trait]
pub trait CustodyApi {
    /// Implements `custody_deposit`, `custody_withdraw` and `custody_execute`: runs `call`
    /// atomically in the context of the authenticated signer, consuming its `nonce`.
    async fn execute(
        &self,
        ctx: CallContext,
        nonce: u64,
        call: Call,
    ) -> Result<Value, CustodyApiError>;

    /// Implements the read-only methods.
    async fn query(&self, query: Query) -> Result<Value, CustodyApiError>;
}
