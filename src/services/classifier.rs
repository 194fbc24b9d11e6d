use crate::chains::{match_chain_in_text, ChainId};

/// Semantic category of an incoming chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentCategory {
    Balance,
    Portfolio,
    Nft,
    Gas,
    Chain,
    ChainInfo,
    SystemStatus,
    McpStatus,
    Restart,
    ForceFallback,
    GeneralChat,
}

/// Classification result, produced fresh per message and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub category: IntentCategory,
    pub chain: Option<ChainId>,
    pub address: Option<String>,
    pub multi_chain: bool,
}

impl Intent {
    fn bare(category: IntentCategory) -> Self {
        Self {
            category,
            chain: None,
            address: None,
            multi_chain: false,
        }
    }
}

const PORTFOLIO_KEYWORDS: &[&str] = &["portfolio", "holdings", "assets", "net worth"];
const NFT_KEYWORDS: &[&str] = &["nft", "collectible"];
const BALANCE_KEYWORDS: &[&str] = &["wallet", "balance", "analyze", "analysis", "check"];
const MULTI_CHAIN_PHRASES: &[&str] = &["all chains", "multi-chain", "multichain", "across all", "every chain"];
const GAS_KEYWORDS: &[&str] = &["gas", "fee", "gwei"];
const CHAIN_INFO_KEYWORDS: &[&str] = &["chains", "chain info", "supported chains", "blockchain info", "chain"];

/// Ordered keyword groups applied when a message carries an address.
/// First matching group wins; a message matching none defaults to Balance.
/// The order is part of the contract, not an accident of code layout.
const ADDRESS_RULES: [(&[&str], IntentCategory); 3] = [
    (PORTFOLIO_KEYWORDS, IntentCategory::Portfolio),
    (NFT_KEYWORDS, IntentCategory::Nft),
    (BALANCE_KEYWORDS, IntentCategory::Balance),
];

fn contains_any_keyword(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}

/// Extracts the first `0x` + 40-hex-char address from already-lowercased
/// text. Mirrors regex semantics: longer hex runs (tx hashes) still yield
/// their first 40 characters.
fn extract_address(lower: &str) -> Option<String> {
    let bytes = lower.as_bytes();
    let mut search_from = 0;
    while let Some(found) = lower[search_from..].find("0x") {
        let start = search_from + found;
        let hex_start = start + 2;
        let hex_len = bytes[hex_start.min(bytes.len())..]
            .iter()
            .take_while(|b| b.is_ascii_hexdigit())
            .count();
        if hex_len >= 40 {
            return Some(lower[start..hex_start + 40].to_string());
        }
        search_from = hex_start.max(start + 1);
    }
    None
}

/// Maps a raw user message to an Intent. Ordered, first-match-wins,
/// case-insensitive substring matching; unmatched messages always resolve
/// to GeneralChat.
pub fn classify(message: &str) -> Intent {
    let lower = message.to_lowercase();

    // Operational commands bypass everything, model included.
    if lower.contains("system status") {
        return Intent::bare(IntentCategory::SystemStatus);
    }
    if lower.contains("mcp status") {
        return Intent::bare(IntentCategory::McpStatus);
    }
    if lower.contains("restart mcp") {
        return Intent::bare(IntentCategory::Restart);
    }
    if lower.contains("force fallback") {
        return Intent::bare(IntentCategory::ForceFallback);
    }

    if let Some(address) = extract_address(&lower) {
        let category = ADDRESS_RULES
            .iter()
            .find(|(keywords, _)| contains_any_keyword(&lower, keywords))
            .map(|(_, category)| *category)
            .unwrap_or(IntentCategory::Balance);
        // Intentional asymmetry: portfolio and NFT queries default to
        // multi-chain framing, balance queries do not.
        let multi_chain = contains_any_keyword(&lower, MULTI_CHAIN_PHRASES)
            || matches!(category, IntentCategory::Portfolio | IntentCategory::Nft);
        return Intent {
            category,
            chain: None,
            address: Some(address),
            multi_chain,
        };
    }

    if let Some(chain) = match_chain_in_text(&lower) {
        // A named chain plus gas keywords is a gas query for that chain;
        // a named chain alone is a single-chain info query.
        if contains_any_keyword(&lower, GAS_KEYWORDS) {
            return Intent {
                category: IntentCategory::Gas,
                chain: Some(chain),
                address: None,
                multi_chain: false,
            };
        }
        return Intent {
            category: IntentCategory::Chain,
            chain: Some(chain),
            address: None,
            multi_chain: false,
        };
    }

    if contains_any_keyword(&lower, GAS_KEYWORDS) {
        return Intent {
            category: IntentCategory::Gas,
            chain: Some(ChainId::Ethereum),
            address: None,
            multi_chain: false,
        };
    }

    if contains_any_keyword(&lower, CHAIN_INFO_KEYWORDS) {
        return Intent::bare(IntentCategory::ChainInfo);
    }

    Intent::bare(IntentCategory::GeneralChat)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "0xAbCdEf0123456789aBcDeF0123456789abcdef01";

    #[test]
    fn address_with_portfolio_keyword_is_multi_chain_portfolio() {
        let intent = classify(&format!("show my portfolio for {}", ADDR));
        assert_eq!(intent.category, IntentCategory::Portfolio);
        assert!(intent.multi_chain);
        assert_eq!(intent.address.as_deref(), Some(ADDR.to_lowercase().as_str()));
    }

    #[test]
    fn address_without_category_keyword_defaults_to_balance() {
        let intent = classify(&format!("{} please", ADDR));
        assert_eq!(intent.category, IntentCategory::Balance);
        assert!(!intent.multi_chain);
    }

    #[test]
    fn balance_query_across_all_chains_sets_multi_chain() {
        let intent = classify(&format!("Check wallet {} across all chains", ADDR));
        assert_eq!(intent.category, IntentCategory::Balance);
        assert!(intent.multi_chain);
        assert_eq!(intent.address.as_deref(), Some(ADDR.to_lowercase().as_str()));
    }

    #[test]
    fn nft_query_defaults_to_multi_chain() {
        let intent = classify(&format!("any nfts in {}?", ADDR));
        assert_eq!(intent.category, IntentCategory::Nft);
        assert!(intent.multi_chain);
    }

    #[test]
    fn portfolio_beats_nft_and_balance_by_rule_order() {
        let intent = classify(&format!("portfolio and nft balance of {}", ADDR));
        assert_eq!(intent.category, IntentCategory::Portfolio);
    }

    #[test]
    fn gas_query_with_named_chain_resolves_that_chain() {
        let intent = classify("Show gas price on Ethereum");
        assert_eq!(intent.category, IntentCategory::Gas);
        assert_eq!(intent.chain, Some(ChainId::Ethereum));
    }

    #[test]
    fn gas_query_without_chain_defaults_to_ethereum() {
        let intent = classify("how much are fees right now?");
        assert_eq!(intent.category, IntentCategory::Gas);
        assert_eq!(intent.chain, Some(ChainId::Ethereum));
    }

    #[test]
    fn named_chain_without_gas_keywords_is_a_chain_query() {
        let intent = classify("tell me about polygon");
        assert_eq!(intent.category, IntentCategory::Chain);
        assert_eq!(intent.chain, Some(ChainId::Polygon));
    }

    #[test]
    fn chain_listing_keywords_yield_chain_info() {
        let intent = classify("which chains are supported?");
        assert_eq!(intent.category, IntentCategory::ChainInfo);
    }

    #[test]
    fn operational_commands_short_circuit_classification() {
        assert_eq!(classify("system status").category, IntentCategory::SystemStatus);
        assert_eq!(classify("MCP STATUS please").category, IntentCategory::McpStatus);
        assert_eq!(classify("restart mcp now").category, IntentCategory::Restart);
        assert_eq!(classify("force fallback").category, IntentCategory::ForceFallback);
    }

    #[test]
    fn unmatched_messages_resolve_to_general_chat() {
        let intent = classify("hello there");
        assert_eq!(intent.category, IntentCategory::GeneralChat);
        assert!(intent.address.is_none());
        assert!(intent.chain.is_none());
    }

    #[test]
    fn short_hex_runs_are_not_addresses() {
        let intent = classify("is 0xdeadbeef a real account");
        assert!(intent.address.is_none());
        assert_eq!(intent.category, IntentCategory::GeneralChat);
    }

    #[test]
    fn tx_hash_yields_its_first_forty_hex_chars() {
        // 64-hex run: regex-style matching takes the first 40 characters.
        let hash = "0x1111111111111111111111111111111111111111aaaaaaaaaaaaaaaaaaaaaaaa";
        let intent = classify(&format!("balance behind {}", hash));
        assert_eq!(
            intent.address.as_deref(),
            Some("0x1111111111111111111111111111111111111111")
        );
    }
}
