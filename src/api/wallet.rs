use super::AppState;
use crate::{
    chains::{parse_chain_id, ChainDescriptor, ChainId, CHAINS},
    error::{AppError, Result},
    models::ApiResponse,
    services::chain_data::{GasEstimate, WalletContext},
};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

/// GET /api/v1/chains
pub async fn list_chains() -> Json<ApiResponse<Vec<&'static ChainDescriptor>>> {
    Json(ApiResponse::success(CHAINS.iter().collect()))
}

/// GET /api/v1/gas/{chain}
pub async fn get_gas(
    State(state): State<AppState>,
    Path(chain): Path<String>,
) -> Result<Json<ApiResponse<GasEstimate>>> {
    let chain = parse_chain_id(&chain)
        .ok_or_else(|| AppError::NotFound(format!("Unknown chain: {}", chain)))?;
    let gwei = state.fetcher.get_gas_price(chain).await?;
    Ok(Json(ApiResponse::success(
        crate::services::chain_data::gas_estimate_for(chain, gwei),
    )))
}

#[derive(Debug, Deserialize)]
pub struct WalletContextRequest {
    pub address: String,
    /// Chain aliases; omitted or empty means all six.
    #[serde(default)]
    pub chains: Vec<String>,
}

fn is_well_formed_address(raw: &str) -> bool {
    raw.len() == 42
        && raw.starts_with("0x")
        && raw[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

/// POST /api/v1/wallet/context
///
/// Returns the raw per-chain context; the chat path reduces the same
/// data to a summary before prompting.
pub async fn wallet_context(
    State(state): State<AppState>,
    Json(payload): Json<WalletContextRequest>,
) -> Result<Json<ApiResponse<WalletContext>>> {
    let address = payload.address.trim().to_lowercase();
    if !is_well_formed_address(&address) {
        return Err(AppError::BadRequest(format!(
            "Invalid wallet address: {}",
            payload.address
        )));
    }

    let chains: Vec<ChainId> = if payload.chains.is_empty() {
        ChainId::all()
    } else {
        let mut resolved = Vec::with_capacity(payload.chains.len());
        for raw in &payload.chains {
            let chain = parse_chain_id(raw)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown chain: {}", raw)))?;
            if !resolved.contains(&chain) {
                resolved.push(chain);
            }
        }
        resolved
    };

    let context = state.fetcher.get_wallet_context(&address, &chains).await;
    Ok(Json(ApiResponse::success(context)))
}
