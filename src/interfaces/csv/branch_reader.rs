use crate::domain::branch::BranchRecord;
use crate::error::{Result, WalletError};
use std::io::Read;

/// Reads the branch catalogue (`branch,vendor,fee`) from CSV.
///
/// An empty fee column is kept as "not configured".
pub fn read_branches<R: Read>(source: R) -> Result<Vec<BranchRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);
    reader
        .deserialize()
        .map(|row| row.map_err(WalletError::from))
        .collect()
}
