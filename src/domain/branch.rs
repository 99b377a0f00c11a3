use serde::{Deserialize, Serialize};

/// Branch configuration as kept by the branch catalogue.
///
/// The per-order fee is stored loosely (it may be missing or a float in the
/// source records); `BranchFee::from_record` normalizes it.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct BranchRecord {
    #[serde(alias = "branch")]
    pub branch_id: String,
    #[serde(alias = "vendor")]
    pub vendor_id: String,
    #[serde(alias = "fee")]
    pub order_fee_fils: Option<f64>,
}

/// Largest fee a branch can charge per order, so fees stay representable as
/// signed ledger amounts.
pub const MAX_FEE_FILS: u64 = i64::MAX as u64;

/// Resolved per-order fee in fils. Zero means "not configured".
#[derive(Debug, Serialize, PartialEq, Eq, Clone)]
pub struct BranchFee {
    pub fee_fils: u64,
    pub vendor_id: String,
}

impl BranchFee {
    pub fn from_record(record: &BranchRecord) -> Self {
        let fee_fils = match record.order_fee_fils {
            Some(fee) if fee.is_finite() && fee > 0.0 => (fee.floor() as u64).min(MAX_FEE_FILS),
            _ => 0,
        };
        Self {
            fee_fils,
            vendor_id: record.vendor_id.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.fee_fils > 0
    }

    pub fn signed_fils(&self) -> i64 {
        i64::try_from(self.fee_fils).unwrap_or(i64::MAX)
    }
}
