use std::sync::Arc;

use alloy::primitives::{Address, U256};
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    response::Html,
    Json,
};
use axum_extra::extract::WithRejection;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, error, info, instrument};

use crate::{
    api::spec::{
        AssetAmount, CustodyApi, CustodyApiError, Query, BALANCE_OF_METHOD, DEPOSIT_METHOD,
        EXECUTE_METHOD, GET_NONCE_METHOD, GET_VERSION_METHOD, STRATEGIES_METHOD,
        TOTAL_ASSETS_METHOD, WITHDRAW_METHOD, WRAPPED_TOKENS_METHOD,
    },
    common::CUSTODY_VERSION,
    primitives::{
        jsonrpc::{JsonRpcRequest, JsonRpcResponse, JsonRpcSuccessResponse},
        CallContext, ETH_ADDRESS,
    },
    system::Call,
};

use super::{headers::verify_signer, CustodyApiInner};

/// Handler function for the root JSON-RPC path.
#[instrument(skip_all, name = "POST /rpc", fields(method = %payload.method))]
pub async fn rpc_entrypoint(
    headers: HeaderMap,
    State(api): State<Arc<CustodyApiInner>>,
    WithRejection(Json(payload), _): WithRejection<Json<JsonRpcRequest>, CustodyApiError>,
) -> Result<Json<JsonRpcResponse>, CustodyApiError> {
    debug!("Received new request");

    let result = match payload.method.as_str() {
        GET_VERSION_METHOD => json!(CUSTODY_VERSION.to_string()),

        DEPOSIT_METHOD => {
            let (signer, nonce) = verify_signer(&headers, &payload)?;
            let AssetAmount { asset, amount } = param(&payload, 0)?;

            // Native deposits carry exactly the deposited amount as value.
            let value = if asset == ETH_ADDRESS { amount } else { U256::ZERO };
            let ctx = CallContext::new(signer).with_value(value);

            info!(%signer, nonce, %asset, %amount, "New deposit request");
            api.execute(ctx, nonce, Call::Deposit { asset, amount }).await?
        }

        WITHDRAW_METHOD => {
            let (signer, nonce) = verify_signer(&headers, &payload)?;
            let AssetAmount { asset, amount } = param(&payload, 0)?;

            info!(%signer, nonce, %asset, %amount, "New withdrawal request");
            api.execute(CallContext::new(signer), nonce, Call::Withdraw { asset, amount }).await?
        }

        EXECUTE_METHOD => {
            let (signer, nonce) = verify_signer(&headers, &payload)?;
            let call: Call = param(&payload, 0)?;
            let value: U256 = optional_param(&payload, 1)?.unwrap_or_default();

            info!(%signer, nonce, method = call.name(), %value, "New call");
            api.execute(CallContext::new(signer).with_value(value), nonce, call).await?
        }

        BALANCE_OF_METHOD => {
            let asset: Address = param(&payload, 0)?;
            let holder: Address = param(&payload, 1)?;
            api.query(Query::BalanceOf { asset, holder }).await?
        }

        TOTAL_ASSETS_METHOD => api.query(Query::TotalAssets(param(&payload, 0)?)).await?,

        WRAPPED_TOKENS_METHOD => api.query(Query::WrappedTokens).await?,

        STRATEGIES_METHOD => api.query(Query::Strategies(param(&payload, 0)?)).await?,

        GET_NONCE_METHOD => api.query(Query::Nonce(param(&payload, 0)?)).await?,

        other => {
            error!("Unknown method: {}", other);
            return Err(CustodyApiError::UnknownMethod);
        }
    };

    Ok(Json(JsonRpcSuccessResponse::new(result).with_id(payload.id).into()))
}

/// Parses the parameter at `index`.
fn param<T: DeserializeOwned>(payload: &JsonRpcRequest, index: usize) -> Result<T, CustodyApiError> {
    optional_param(payload, index)?
        .ok_or_else(|| CustodyApiError::InvalidParams(format!("missing param {index}")))
}

/// Parses the parameter at `index`, if present.
fn optional_param<T: DeserializeOwned>(
    payload: &JsonRpcRequest,
    index: usize,
) -> Result<Option<T>, CustodyApiError> {
    let Some(value) = payload.param(index) else {
        return Ok(None);
    };

    serde_json::from_value::<T>(value)
        .map(Some)
        .map_err(|err| CustodyApiError::InvalidParams(format!("param {index}: {err}")))
        .inspect_err(|err| error!(?err, "Failed to parse params"))
}

/// Not found fallback
pub async fn not_found(req: Request<Body>) -> Html<&'static str> {
    error!(uri = ?req.uri(), "Route not found");
    Html("404 - Not Found")
}

/// Status handler
pub async fn status() -> Html<&'static str> {
    Html("OK")
}
