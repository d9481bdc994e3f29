use std::str::FromStr;

use alloy::primitives::{Address, PrimitiveSignature as Signature};
use axum::http::HeaderMap;
use tracing::error;

use crate::{
    api::spec::{request_digest, CustodyApiError, NONCE_HEADER, SIGNATURE_HEADER},
    primitives::jsonrpc::JsonRpcRequest,
};

/// Extracts the signer and signature ([SIGNATURE_HEADER]) from the HTTP headers.
#[inline]
pub fn auth_from_headers(headers: &HeaderMap) -> Result<(Address, Signature), CustodyApiError> {
    let auth = headers.get(SIGNATURE_HEADER).ok_or(CustodyApiError::NoSignature)?;
    let auth = auth.to_str().map_err(|_| CustodyApiError::MalformedHeader)?;

    let (address, sig) = auth.split_once(':').ok_or(CustodyApiError::MalformedHeader)?;
    let address = Address::from_str(address).map_err(|_| CustodyApiError::MalformedHeader)?;
    let sig = Signature::from_str(sig).map_err(|_| CustodyApiError::InvalidSignature)?;

    Ok((address, sig))
}

/// Extracts the signer's nonce ([NONCE_HEADER]) from the HTTP headers.
#[inline]
pub fn nonce_from_headers(headers: &HeaderMap) -> Result<u64, CustodyApiError> {
    let nonce = headers.get(NONCE_HEADER).ok_or(CustodyApiError::MalformedHeader)?;
    let nonce = nonce.to_str().map_err(|_| CustodyApiError::MalformedHeader)?;

    nonce.parse().map_err(|_| CustodyApiError::MalformedHeader)
}

/// Authenticates a request, returning the address its signature recovers to and the nonce it
/// was signed with.
pub fn verify_signer(
    headers: &HeaderMap,
    payload: &JsonRpcRequest,
) -> Result<(Address, u64), CustodyApiError> {
    let (signer, signature) = auth_from_headers(headers)
        .inspect_err(|e| error!("Failed to extract signature from headers: {:?}", e))?;
    let nonce = nonce_from_headers(headers)?;

    let digest = request_digest(&payload.method, nonce, &payload.params)?;
    let recovered_signer = signature.recover_address_from_prehash(&digest)?;

    if recovered_signer != signer {
        error!(%recovered_signer, %signer, "Recovered signer does not match the provided signer");
        return Err(CustodyApiError::InvalidSignature);
    }

    Ok((recovered_signer, nonce))
}
