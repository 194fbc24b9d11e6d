use crate::constants::DEFAULT_HEALTH_CHECK_INTERVAL_SECS;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Blockchain data provider
    pub rpc_provider_domain: String,
    pub rpc_api_key: String,
    pub rpc_timeout_secs: u64,

    // Language model
    pub llm_api_key: Option<String>,
    pub llm_api_base: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,

    // Supervisor
    pub health_check_interval_secs: u64,

    // CORS
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            rpc_provider_domain: env::var("RPC_PROVIDER_DOMAIN")
                .unwrap_or_else(|_| "g.alchemy.com".to_string()),
            rpc_api_key: env::var("RPC_API_KEY")?,
            rpc_timeout_secs: env::var("RPC_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,

            llm_api_key: env::var("LLM_API_KEY").ok(),
            llm_api_base: env::var("LLM_API_BASE")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            llm_timeout_secs: env::var("LLM_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()?,

            health_check_interval_secs: env::var("HEALTH_CHECK_INTERVAL_SECS")
                .unwrap_or_else(|_| DEFAULT_HEALTH_CHECK_INTERVAL_SECS.to_string())
                .parse()?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string()),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rpc_api_key.trim().is_empty() {
            anyhow::bail!("RPC_API_KEY is empty");
        }
        if self.rpc_provider_domain.trim().is_empty() {
            anyhow::bail!("RPC_PROVIDER_DOMAIN is empty");
        }
        if self.llm_api_base.trim().is_empty() {
            anyhow::bail!("LLM_API_BASE is empty");
        }

        if self.llm_api_key.is_none() {
            tracing::warn!("LLM_API_KEY is not set; chat will run in fallback mode");
        }
        if self.health_check_interval_secs < 5 {
            tracing::warn!(
                "HEALTH_CHECK_INTERVAL_SECS={} is aggressive; probes may overlap heavily",
                self.health_check_interval_secs
            );
        }
        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; requests may be blocked");
        }

        Ok(())
    }

    /// JSON-RPC endpoint for one chain, e.g.
    /// `https://eth-mainnet.g.alchemy.com/v2/<key>`.
    pub fn rpc_url_for(&self, subdomain: &str) -> String {
        format!(
            "https://{}.{}/v2/{}",
            subdomain,
            self.rpc_provider_domain.trim_matches('/'),
            self.rpc_api_key
        )
    }
}
