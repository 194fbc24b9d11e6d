use serde::{Deserialize, Serialize};

/// The six chains the service proxies. The catalog is fixed at compile
/// time; nothing mutates it after startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainId {
    Ethereum,
    Polygon,
    Arbitrum,
    Base,
    Avalanche,
    Optimism,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainDescriptor {
    pub id: ChainId,
    pub display_name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
    /// Provider subdomain used to build the per-chain JSON-RPC URL.
    #[serde(skip)]
    pub rpc_subdomain: &'static str,
    /// Message substrings that resolve to this chain. Checked in catalog
    /// order, so "op" stays last: it is a short substring and earlier
    /// entries must get first pick. Reordering this table changes
    /// classification results.
    #[serde(skip)]
    pub aliases: &'static [&'static str],
}

pub static CHAINS: [ChainDescriptor; 6] = [
    ChainDescriptor {
        id: ChainId::Ethereum,
        display_name: "Ethereum",
        symbol: "ETH",
        decimals: 18,
        rpc_subdomain: "eth-mainnet",
        aliases: &["ethereum", "eth"],
    },
    ChainDescriptor {
        id: ChainId::Polygon,
        display_name: "Polygon",
        symbol: "MATIC",
        decimals: 18,
        rpc_subdomain: "polygon-mainnet",
        aliases: &["polygon", "matic"],
    },
    ChainDescriptor {
        id: ChainId::Arbitrum,
        display_name: "Arbitrum",
        symbol: "ETH",
        decimals: 18,
        rpc_subdomain: "arb-mainnet",
        aliases: &["arbitrum", "arb"],
    },
    ChainDescriptor {
        id: ChainId::Base,
        display_name: "Base",
        symbol: "ETH",
        decimals: 18,
        rpc_subdomain: "base-mainnet",
        aliases: &["base"],
    },
    ChainDescriptor {
        id: ChainId::Avalanche,
        display_name: "Avalanche",
        symbol: "AVAX",
        decimals: 18,
        rpc_subdomain: "avax-mainnet",
        aliases: &["avalanche", "avax"],
    },
    ChainDescriptor {
        id: ChainId::Optimism,
        display_name: "Optimism",
        symbol: "ETH",
        decimals: 18,
        rpc_subdomain: "opt-mainnet",
        aliases: &["optimism", "op"],
    },
];

impl ChainId {
    pub fn all() -> Vec<ChainId> {
        CHAINS.iter().map(|c| c.id).collect()
    }

    pub fn descriptor(&self) -> &'static ChainDescriptor {
        CHAINS
            .iter()
            .find(|c| c.id == *self)
            .expect("every ChainId has a catalog entry")
    }
}

/// Resolves a chain mentioned anywhere in already-lowercased text.
/// First catalog entry with a matching alias wins.
pub fn match_chain_in_text(lower: &str) -> Option<ChainId> {
    for chain in &CHAINS {
        for alias in chain.aliases {
            if lower.contains(alias) {
                return Some(chain.id);
            }
        }
    }
    None
}

/// Parses an explicit chain identifier (path segment or request field).
pub fn parse_chain_id(raw: &str) -> Option<ChainId> {
    let normalized = raw.trim().to_ascii_lowercase();
    CHAINS
        .iter()
        .find(|c| c.aliases.contains(&normalized.as_str()))
        .map(|c| c.id)
}

/// Human-readable comma-joined catalog used by chain-info responses.
pub fn format_chain_catalog() -> String {
    CHAINS
        .iter()
        .map(|c| format!("{} ({})", c.display_name, c.symbol))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ethereum_is_matched_before_other_chains() {
        let chain = match_chain_in_text("what about ethereum gas");
        assert_eq!(chain, Some(ChainId::Ethereum));
    }

    #[test]
    fn op_alias_only_wins_when_nothing_else_matches() {
        // "op" appears inside "optimism" but also inside unrelated words;
        // catalog order keeps specific chains ahead of it.
        assert_eq!(match_chain_in_text("price on optimism"), Some(ChainId::Optimism));
        assert_eq!(
            match_chain_in_text("arbitrum opens today"),
            Some(ChainId::Arbitrum)
        );
    }

    #[test]
    fn parse_chain_id_accepts_aliases() {
        assert_eq!(parse_chain_id("MATIC"), Some(ChainId::Polygon));
        assert_eq!(parse_chain_id(" avax "), Some(ChainId::Avalanche));
        assert_eq!(parse_chain_id("solana"), None);
    }

    #[test]
    fn catalog_formats_all_six_chains() {
        let formatted = format_chain_catalog();
        assert!(formatted.contains("Ethereum (ETH)"));
        assert!(formatted.contains("Avalanche (AVAX)"));
        assert_eq!(formatted.matches(", ").count(), 5);
    }
}
