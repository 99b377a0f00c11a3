use crate::domain::topup::DEFAULT_BONUS_PERCENT;
use crate::domain::wallet::ConsumePriority;
use serde::Deserialize;

pub const DEFAULT_CURRENCY: &str = "KWD";
pub const DEFAULT_GRACE_DAYS: u32 = 3;
pub const DEFAULT_MAX_COMMIT_RETRIES: u32 = 8;

/// Environment variable holding the log filter for the binary.
pub const LOG_ENV_VAR: &str = "ORDERWALLET_LOG";

/// Tunables of the wallet engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// ISO code written on every ledger entry.
    pub currency: String,
    /// Bonus credits granted on top-ups, as a percentage of the paid credits.
    pub bonus_percent: i64,
    /// Grace length given to wallets opened by a top-up.
    pub grace_days_after_exhausted: u32,
    /// Priority given to wallets opened by a top-up.
    pub default_consume_priority: ConsumePriority,
    /// How many times a commit is re-run after losing an optimistic race.
    pub max_commit_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            bonus_percent: DEFAULT_BONUS_PERCENT,
            grace_days_after_exhausted: DEFAULT_GRACE_DAYS,
            default_consume_priority: ConsumePriority::BonusFirst,
            max_commit_retries: DEFAULT_MAX_COMMIT_RETRIES,
        }
    }
}
