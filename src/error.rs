use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WalletError>;

/// Stable failure codes surfaced to the order-acceptance workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BranchNotFound,
    PlatformFeeNotSet,
    WalletNotFound,
    OrderingLocked,
    WalletExhausted,
    InsufficientOrders,
    TopupTooSmall,
    Conflict,
    ValidationError,
    StoreError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BranchNotFound => "BRANCH_NOT_FOUND",
            ErrorCode::PlatformFeeNotSet => "PLATFORM_FEE_NOT_SET",
            ErrorCode::WalletNotFound => "WALLET_NOT_FOUND",
            ErrorCode::OrderingLocked => "ORDERING_LOCKED",
            ErrorCode::WalletExhausted => "WALLET_EXHAUSTED",
            ErrorCode::InsufficientOrders => "INSUFFICIENT_ORDERS",
            ErrorCode::TopupTooSmall => "TOPUP_TOO_SMALL",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::StoreError => "STORE_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("branch {0} not found")]
    BranchNotFound(String),
    #[error("per-order platform fee is not configured for branch {0}")]
    PlatformFeeNotSet(String),
    #[error("no wallet exists for branch {0}")]
    WalletNotFound(String),
    #[error("ordering is locked for branch {0}")]
    OrderingLocked(String),
    #[error("order credits exhausted for branch {0}")]
    WalletExhausted(String),
    #[error("no paid or bonus order credits left for branch {0}")]
    InsufficientOrders(String),
    #[error("top-up of {amount_fils} fils buys no order credits at {unit_fee_fils} fils per order")]
    TopupTooSmall { amount_fils: i64, unit_fee_fils: u64 },
    #[error("concurrent update conflict: {0}")]
    Conflict(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Store error: {0}")]
    StoreError(String),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDBError(#[from] rocksdb::Error),
}

impl WalletError {
    pub fn code(&self) -> ErrorCode {
        match self {
            WalletError::BranchNotFound(_) => ErrorCode::BranchNotFound,
            WalletError::PlatformFeeNotSet(_) => ErrorCode::PlatformFeeNotSet,
            WalletError::WalletNotFound(_) => ErrorCode::WalletNotFound,
            WalletError::OrderingLocked(_) => ErrorCode::OrderingLocked,
            WalletError::WalletExhausted(_) => ErrorCode::WalletExhausted,
            WalletError::InsufficientOrders(_) => ErrorCode::InsufficientOrders,
            WalletError::TopupTooSmall { .. } => ErrorCode::TopupTooSmall,
            WalletError::Conflict(_) => ErrorCode::Conflict,
            WalletError::ValidationError(_) | WalletError::CsvError(_) => {
                ErrorCode::ValidationError
            }
            WalletError::IoError(_) | WalletError::StoreError(_) => ErrorCode::StoreError,
            #[cfg(feature = "storage-rocksdb")]
            WalletError::RocksDBError(_) => ErrorCode::StoreError,
        }
    }

    /// Failures the order workflow should treat as a rejected order rather than
    /// a system fault.
    pub fn is_business_failure(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::OrderingLocked
                | ErrorCode::WalletExhausted
                | ErrorCode::InsufficientOrders
                | ErrorCode::PlatformFeeNotSet
                | ErrorCode::TopupTooSmall
        )
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(e: serde_json::Error) -> Self {
        WalletError::StoreError(format!("Serialization error: {}", e))
    }
}
