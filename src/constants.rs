// Application constants

pub const API_VERSION: &str = "v1";

// Supervisor defaults
pub const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u64 = 30;
pub const MAX_RETRIES: u32 = 3;
pub const MAX_CONNECTION_ATTEMPTS: u32 = 5;

// Prompt assembly
pub const MAX_PROMPT_CHARS: usize = 60_000;

// Gas display tiers (multipliers over the standard estimate; not mempool data)
pub const GAS_TIER_SLOW: f64 = 0.8;
pub const GAS_TIER_STANDARD: f64 = 1.0;
pub const GAS_TIER_FAST: f64 = 1.2;
pub const GAS_TIER_BASE_FEE: f64 = 0.9;

// Unit conversions
pub const WEI_PER_GWEI: f64 = 1_000_000_000.0;

// Probe message sent on start() and on every health-check tick
pub const PROBE_MESSAGE: &str = "Reply with OK if you can process requests.";
