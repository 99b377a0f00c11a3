use crate::domain::branch::BranchFee;
use crate::domain::ports::BranchDirectoryBox;
use crate::error::{Result, WalletError};

/// Looks up the per-order fee and owning vendor of a branch.
pub struct FeeResolver {
    directory: BranchDirectoryBox,
}

impl FeeResolver {
    pub fn new(directory: BranchDirectoryBox) -> Self {
        Self { directory }
    }

    /// Fails with `BRANCH_NOT_FOUND` for unknown branches. A missing or
    /// malformed fee resolves to 0.
    pub async fn resolve(&self, branch_id: &str) -> Result<BranchFee> {
        let record = self
            .directory
            .branch(branch_id)
            .await?
            .ok_or_else(|| WalletError::BranchNotFound(branch_id.to_string()))?;
        Ok(BranchFee::from_record(&record))
    }
}
