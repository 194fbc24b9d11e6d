use crate::{
    chains::{format_chain_catalog, ChainId},
    constants::MAX_PROMPT_CHARS,
    services::{
        chain_data::{
            format_native, gas_estimate_for, parse_hex_u128, wei_to_native, BlockchainFetcher,
            ChainContext, WalletContext,
        },
        classifier::{classify, Intent, IntentCategory},
        supervisor::AiSupervisor,
    },
};
use serde::Serialize;
use std::sync::Arc;

const FORCED_FALLBACK_REASON: &str = "Fallback forced by operator command";

/// Final result of one chat turn. Infallible by construction: every code
/// path terminates in response text plus status flags.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    #[serde(rename = "response")]
    pub text: String,
    pub used_model: bool,
    pub fallback_active: bool,
    pub last_error: Option<String>,
}

/// Per-chain reduction of a raw wallet context, built once per
/// data-bearing chat turn and discarded afterwards.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ChainSummary {
    Data {
        chain: ChainId,
        native_symbol: String,
        native_approx: f64,
        token_count: usize,
    },
    Error {
        chain: ChainId,
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletContextSummary {
    pub address: String,
    pub per_chain: Vec<ChainSummary>,
}

/// Reduces raw per-chain results to `{ symbol, approx balance, token
/// count }` entries. Chains that failed upstream keep their error field;
/// unparseable balances degrade the same way instead of aborting.
pub fn summarize_wallet_context(context: &WalletContext) -> WalletContextSummary {
    let per_chain = context
        .per_chain
        .iter()
        .map(|entry| match entry {
            ChainContext::Data {
                chain,
                native_wei,
                native_symbol,
                tokens,
            } => match parse_hex_u128(native_wei) {
                Ok(wei) => ChainSummary::Data {
                    chain: *chain,
                    native_symbol: native_symbol.clone(),
                    native_approx: wei_to_native(wei, chain.descriptor().decimals),
                    token_count: tokens.len(),
                },
                Err(err) => ChainSummary::Error {
                    chain: *chain,
                    error: err.to_string(),
                },
            },
            ChainContext::Error { chain, error } => ChainSummary::Error {
                chain: *chain,
                error: error.clone(),
            },
        })
        .collect();

    WalletContextSummary {
        address: context.address.clone(),
        per_chain,
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn build_grounded_prompt(message: &str, summary: &WalletContextSummary) -> String {
    let serialized = serde_json::to_string(summary).unwrap_or_else(|_| "{}".to_string());
    let grounding = truncate_chars(&serialized, MAX_PROMPT_CHARS);
    format!(
        "You are a blockchain wallet assistant. Answer the user's question using only \
         the wallet data below.\n\
         User message: {}\n\
         Wallet data (JSON): {}\n\
         Report only the approximate native balance and the token count per chain. \
         Do not enumerate token contract addresses. Do not speculate about prices.",
        message, grounding
    )
}

/// Maps a message to an intent and produces the final response text,
/// delegating to the language model when the supervisor reports a live
/// connection and to the canned catalog otherwise.
pub struct ChatService {
    supervisor: Arc<AiSupervisor>,
    fetcher: Arc<dyn BlockchainFetcher>,
}

impl ChatService {
    pub fn new(supervisor: Arc<AiSupervisor>, fetcher: Arc<dyn BlockchainFetcher>) -> Self {
        Self {
            supervisor,
            fetcher,
        }
    }

    pub async fn classify_and_respond(&self, message: &str) -> ChatOutcome {
        let intent = classify(message);
        tracing::debug!("classified message category={:?}", intent.category);

        let (text, used_model) = match intent.category {
            IntentCategory::SystemStatus => (self.system_status_text().await, false),
            IntentCategory::McpStatus => (self.mcp_status_text().await, false),
            IntentCategory::Restart => (self.restart_text().await, false),
            IntentCategory::ForceFallback => {
                self.supervisor
                    .enable_fallback_mode(FORCED_FALLBACK_REASON)
                    .await;
                (
                    "Fallback mode is now active. Chat responses will come from the \
                     built-in catalog until the next restart."
                        .to_string(),
                    false,
                )
            }
            IntentCategory::Gas => (self.gas_text(&intent).await, false),
            IntentCategory::Chain => (chain_card_text(&intent), false),
            IntentCategory::ChainInfo => (
                format!("Supported chains: {}.", format_chain_catalog()),
                false,
            ),
            IntentCategory::Balance | IntentCategory::Portfolio | IntentCategory::Nft => {
                self.wallet_text(message, &intent).await
            }
            IntentCategory::GeneralChat => self.general_chat_text(message).await,
        };

        let status = self.supervisor.get_status().await;
        ChatOutcome {
            text,
            used_model,
            fallback_active: status.fallback_active,
            last_error: status.last_error,
        }
    }

    async fn system_status_text(&self) -> String {
        let status = self.supervisor.get_status().await;
        let mode = if status.connected {
            "connected to the language model"
        } else if status.fallback_active {
            "running in fallback mode"
        } else {
            "not yet started"
        };
        format!(
            "System status: {}. Connection attempts: {}/{}. Retries: {}/{}. Last error: {}.",
            mode,
            status.connection_attempts,
            status.max_connection_attempts,
            status.retry_count,
            status.max_retries,
            status.last_error.as_deref().unwrap_or("none")
        )
    }

    async fn mcp_status_text(&self) -> String {
        let status = self.supervisor.get_status().await;
        format!(
            "MCP status: connected: {}, fallback_active: {}, last_error: {}",
            status.connected,
            status.fallback_active,
            status.last_error.as_deref().unwrap_or("none")
        )
    }

    async fn restart_text(&self) -> String {
        if self.supervisor.restart().await {
            "MCP connection restarted successfully.".to_string()
        } else {
            let status = self.supervisor.get_status().await;
            format!(
                "MCP restart failed; fallback mode remains active. Last error: {}.",
                status.last_error.as_deref().unwrap_or("unknown")
            )
        }
    }

    async fn gas_text(&self, intent: &Intent) -> String {
        let chain = intent.chain.unwrap_or(ChainId::Ethereum);
        let name = chain.descriptor().display_name.to_uppercase();
        match self.fetcher.get_gas_price(chain).await {
            Ok(gwei) if gwei > 0.0 => {
                let estimate = gas_estimate_for(chain, gwei);
                format!(
                    "Gas price on {}: {} Gwei (slow {} / fast {} / base fee {}). \
                     Tier values are estimates derived from the standard price.",
                    name, estimate.standard, estimate.slow, estimate.fast, estimate.base_fee
                )
            }
            Ok(_) => format!("Gas data for {} is unavailable right now.", name),
            Err(err) => {
                tracing::warn!("gas fetch failed chain={:?}: {}", chain, err);
                format!("Gas data for {} is unavailable right now.", name)
            }
        }
    }

    async fn wallet_text(&self, message: &str, intent: &Intent) -> (String, bool) {
        let Some(address) = intent.address.as_deref() else {
            // Classifier only emits wallet categories with an address, but
            // degrade rather than panic if that ever changes.
            return self.general_chat_text(message).await;
        };
        let chains = if intent.multi_chain {
            ChainId::all()
        } else {
            vec![intent.chain.unwrap_or(ChainId::Ethereum)]
        };

        let context = self.fetcher.get_wallet_context(address, &chains).await;
        let summary = summarize_wallet_context(&context);

        if self.supervisor.is_connected().await {
            // ask_model may flip the supervisor into fallback; the canned
            // path below then picks that up.
            if let Some(text) = self.ask_model(&build_grounded_prompt(message, &summary)).await {
                return (text, true);
            }
        }
        // The fetched data is still good; show it raw instead of dropping
        // it on the floor.
        let text = format!(
            "{}\n\n{}",
            wallet_digest(&summary),
            self.fallback_text(message).await
        );
        (text, false)
    }

    async fn general_chat_text(&self, message: &str) -> (String, bool) {
        if self.supervisor.is_connected().await {
            if let Some(text) = self.ask_model(message).await {
                return (text, true);
            }
        }
        (self.fallback_text(message).await, false)
    }

    /// One guarded model call. Any failure degrades to fallback mode and
    /// returns None so the caller can take the canned path.
    async fn ask_model(&self, prompt: &str) -> Option<String> {
        match self.supervisor.generate(prompt).await {
            Ok(text) => Some(text),
            Err(err) => {
                tracing::warn!("model call failed mid-chat: {}", err);
                None
            }
        }
    }

    /// Canned response catalog, selected by sub-keyword. Always echoes the
    /// literal user message back for transparency.
    async fn fallback_text(&self, message: &str) -> String {
        let lower = message.to_lowercase();
        let body = if lower.contains("help") {
            "I can check wallet balances, summarize portfolios, count NFTs and tokens, \
             report gas prices, and list supported chains. Ask me about an address or a chain."
                .to_string()
        } else if lower.contains("supported") || lower.contains("chains") {
            format!("Supported chains: {}.", format_chain_catalog())
        } else if lower.contains("status") {
            self.system_status_text().await
        } else {
            "The AI assistant is currently offline, but I can still help with wallet \
             balances, portfolio summaries, gas prices, and chain info."
                .to_string()
        };
        format!("{}\n\nYou said: \"{}\"", body, message)
    }
}

/// Plain-text per-chain listing used when the model cannot phrase the
/// answer. Native amounts keep the 6-decimal display form.
fn wallet_digest(summary: &WalletContextSummary) -> String {
    let lines: Vec<String> = summary
        .per_chain
        .iter()
        .map(|entry| match entry {
            ChainSummary::Data {
                chain,
                native_symbol,
                native_approx,
                token_count,
            } => format!(
                "{}: {} {} and {} tokens",
                chain.descriptor().display_name,
                format_native(*native_approx),
                native_symbol,
                token_count
            ),
            ChainSummary::Error { chain, error } => format!(
                "{}: data unavailable ({})",
                chain.descriptor().display_name,
                error
            ),
        })
        .collect();
    format!("Wallet {}:\n{}", summary.address, lines.join("\n"))
}

fn chain_card_text(intent: &Intent) -> String {
    let chain = intent.chain.unwrap_or(ChainId::Ethereum);
    let descriptor = chain.descriptor();
    format!(
        "{}: native token {} with {} decimals. Ask about gas, a wallet address, \
         or say \"supported chains\" for the full list.",
        descriptor.display_name, descriptor.symbol, descriptor.decimals
    )
}
