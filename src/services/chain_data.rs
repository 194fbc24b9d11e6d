use crate::{
    chains::ChainId,
    config::Config,
    constants::{GAS_TIER_BASE_FEE, GAS_TIER_FAST, GAS_TIER_SLOW, GAS_TIER_STANDARD, WEI_PER_GWEI},
    error::{AppError, Result},
};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct TokenBalance {
    pub contract_address: String,
    pub token_balance: String,
}

/// One chain's slice of a wallet context. A failed chain degrades to the
/// Error variant instead of aborting its siblings.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ChainContext {
    Data {
        chain: ChainId,
        native_wei: String,
        native_symbol: String,
        tokens: Vec<TokenBalance>,
    },
    Error {
        chain: ChainId,
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletContext {
    pub address: String,
    pub per_chain: Vec<ChainContext>,
}

/// Gas estimate with display tiers. The tiers are fixed multipliers over
/// the standard value, not real mempool data.
#[derive(Debug, Clone, Serialize)]
pub struct GasEstimate {
    pub chain: ChainId,
    pub standard_gwei: f64,
    pub slow: u64,
    pub standard: u64,
    pub fast: u64,
    pub base_fee: u64,
}

/// Abstract contract over the third-party blockchain-data provider.
#[async_trait]
pub trait BlockchainFetcher: Send + Sync {
    /// Current gas price in Gwei, rounded to 2 decimal places.
    async fn get_gas_price(&self, chain: ChainId) -> Result<f64>;

    /// Native balance plus token holdings across the requested chains.
    /// Never fails as a whole: each chain either yields data or an error
    /// entry.
    async fn get_wallet_context(&self, address: &str, chains: &[ChainId]) -> WalletContext;
}

/// Rounds half away from zero, matching `f64::round`.
pub fn round_dp(value: f64, dp: u32) -> f64 {
    let factor = 10_f64.powi(dp as i32);
    (value * factor).round() / factor
}

/// Parses a `0x`-prefixed (or bare) hex integer string.
pub fn parse_hex_u128(raw: &str) -> Result<u128> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() {
        return Err(AppError::UpstreamData("empty hex quantity".to_string()));
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| AppError::UpstreamData(format!("invalid hex quantity {}: {}", raw, e)))
}

/// Wei to Gwei, rounded to 2 decimal places.
pub fn wei_to_gwei(wei: u128) -> f64 {
    round_dp(wei as f64 / WEI_PER_GWEI, 2)
}

/// Wei-equivalent units to a native amount, rounded to 6 decimal places.
pub fn wei_to_native(wei: u128, decimals: u8) -> f64 {
    let base = 10_f64.powi(decimals as i32);
    round_dp(wei as f64 / base, 6)
}

/// Display form with trailing zeros preserved, e.g. `1.500000`.
pub fn format_native(value: f64) -> String {
    format!("{:.6}", value)
}

pub fn gas_estimate_for(chain: ChainId, standard_gwei: f64) -> GasEstimate {
    GasEstimate {
        chain,
        standard_gwei,
        slow: (standard_gwei * GAS_TIER_SLOW).round() as u64,
        standard: (standard_gwei * GAS_TIER_STANDARD).round() as u64,
        fast: (standard_gwei * GAS_TIER_FAST).round() as u64,
        base_fee: (standard_gwei * GAS_TIER_BASE_FEE).round() as u64,
    }
}

/// JSON-RPC fetcher against the configured provider (Alchemy-style
/// per-chain subdomains).
pub struct RpcProviderFetcher {
    http: reqwest::Client,
    config: Config,
}

impl RpcProviderFetcher {
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.rpc_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    async fn rpc_call(
        &self,
        chain: ChainId,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let url = self.config.rpc_url_for(chain.descriptor().rpc_subdomain);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::UpstreamData(format!("{} transport failed: {}", method, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamData(format!(
                "{} returned {}",
                method, status
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::UpstreamData(format!("{} decode failed: {}", method, e)))?;

        if let Some(err) = payload.get("error") {
            return Err(AppError::UpstreamData(format!(
                "{} rpc error: {}",
                method, err
            )));
        }
        payload
            .get("result")
            .cloned()
            .ok_or_else(|| AppError::UpstreamData(format!("{} returned no result", method)))
    }

    async fn fetch_chain_data(&self, address: &str, chain: ChainId) -> Result<ChainContext> {
        let balance_result = self
            .rpc_call(
                chain,
                "eth_getBalance",
                serde_json::json!([address, "latest"]),
            )
            .await?;
        let native_wei = balance_result
            .as_str()
            .ok_or_else(|| AppError::UpstreamData("eth_getBalance result is not a string".to_string()))?
            .to_string();

        let tokens_result = self
            .rpc_call(
                chain,
                "alchemy_getTokenBalances",
                serde_json::json!([address, "erc20"]),
            )
            .await?;
        let tokens = tokens_result
            .get("tokenBalances")
            .and_then(|v| v.as_array())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let contract = entry.get("contractAddress")?.as_str()?;
                        let balance = entry.get("tokenBalance")?.as_str()?;
                        // Zero balances are noise; the provider returns them
                        // for previously-held tokens.
                        if parse_hex_u128(balance).ok()? == 0 {
                            return None;
                        }
                        Some(TokenBalance {
                            contract_address: contract.to_string(),
                            token_balance: balance.to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ChainContext::Data {
            chain,
            native_wei,
            native_symbol: chain.descriptor().symbol.to_string(),
            tokens,
        })
    }
}

#[async_trait]
impl BlockchainFetcher for RpcProviderFetcher {
    async fn get_gas_price(&self, chain: ChainId) -> Result<f64> {
        let result = self
            .rpc_call(chain, "eth_gasPrice", serde_json::json!([]))
            .await?;
        let raw = result
            .as_str()
            .ok_or_else(|| AppError::UpstreamData("eth_gasPrice result is not a string".to_string()))?;
        Ok(wei_to_gwei(parse_hex_u128(raw)?))
    }

    async fn get_wallet_context(&self, address: &str, chains: &[ChainId]) -> WalletContext {
        let mut per_chain = Vec::with_capacity(chains.len());
        // Sequential by design; one chain at a time, failures isolated.
        for chain in chains {
            match self.fetch_chain_data(address, *chain).await {
                Ok(data) => per_chain.push(data),
                Err(err) => {
                    tracing::warn!(
                        "wallet context fetch failed chain={:?} address={}: {}",
                        chain,
                        address,
                        err
                    );
                    per_chain.push(ChainContext::Error {
                        chain: *chain,
                        error: err.to_string(),
                    });
                }
            }
        }
        WalletContext {
            address: address.to_string(),
            per_chain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_gwei_converts_exactly() {
        // 0x3B9ACA00 = 1,000,000,000 wei
        let wei = parse_hex_u128("0x3B9ACA00").unwrap();
        assert_eq!(wei, 1_000_000_000);
        assert_eq!(wei_to_gwei(wei), 1.0);
    }

    #[test]
    fn gas_tiers_round_half_away_from_zero() {
        let estimate = gas_estimate_for(ChainId::Ethereum, 1.0);
        assert_eq!(estimate.slow, 1); // round(0.8)
        assert_eq!(estimate.standard, 1);
        assert_eq!(estimate.fast, 1); // round(1.2)
        assert_eq!(estimate.base_fee, 1); // round(0.9)

        // base fee hits an exact .5 boundary at standard = 5
        let estimate = gas_estimate_for(ChainId::Ethereum, 5.0);
        assert_eq!(estimate.slow, 4);
        assert_eq!(estimate.fast, 6);
        assert_eq!(estimate.base_fee, 5); // round(4.5) = 5, half away from zero
    }

    #[test]
    fn native_balance_keeps_six_decimal_places() {
        let value = wei_to_native(1_500_000_000_000_000_000, 18);
        assert_eq!(value, 1.5);
        assert_eq!(format_native(value), "1.500000");
    }

    #[test]
    fn hex_parsing_accepts_prefixed_and_bare_digits() {
        assert_eq!(parse_hex_u128("0x0").unwrap(), 0);
        assert_eq!(parse_hex_u128("ff").unwrap(), 255);
        assert!(parse_hex_u128("0x").is_err());
        assert!(parse_hex_u128("0xzz").is_err());
    }

    #[test]
    fn gwei_rounds_to_two_decimal_places() {
        // 1,234,567,890 wei = 1.23456789 Gwei
        assert_eq!(wei_to_gwei(1_234_567_890), 1.23);
        assert_eq!(wei_to_gwei(1_238_000_000), 1.24);
    }
}
