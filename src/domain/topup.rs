use serde::Serialize;

pub const DEFAULT_BONUS_PERCENT: i64 = 15;

/// Credits bought by a deposit.
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
pub struct TopupQuote {
    pub paid_orders: u64,
    pub bonus_orders: u64,
}

impl TopupQuote {
    /// `None` when the two pools together do not fit in a counter.
    pub fn total_orders(&self) -> Option<u64> {
        self.paid_orders.checked_add(self.bonus_orders)
    }
}

/// Converts a deposit into paid and bonus order credits.
///
/// The unit fee is floored to 1 fils, negative amounts and negative bonus
/// percentages count as zero. All divisions truncate. The bonus is computed in
/// 128 bits and only saturates when it cannot be represented at all.
pub fn compute_topup(amount_fils: i64, unit_fee_fils: i64, bonus_percent: i64) -> TopupQuote {
    let unit_fee = unit_fee_fils.max(1) as u64;
    let paid_orders = amount_fils.max(0) as u64 / unit_fee;
    let bonus = u128::from(paid_orders) * bonus_percent.max(0) as u128 / 100;
    let bonus_orders = u64::try_from(bonus).unwrap_or(u64::MAX);
    TopupQuote {
        paid_orders,
        bonus_orders,
    }
}
