// Token ledger interface - the fungible-asset surface every component moves value through

use crate::message::AssetId;
use alloy_primitives::{Address, U256};
use thiserror::Error;

/// Errors that can occur during ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient balance of {asset} for {holder}: available {available}, required {required}")]
    InsufficientBalance {
        asset: AssetId,
        holder: Address,
        available: U256,
        required: U256,
    },

    #[error("Insufficient allowance of {asset} from {owner} to {spender}: available {available}, required {required}")]
    InsufficientAllowance {
        asset: AssetId,
        owner: Address,
        spender: Address,
        available: U256,
        required: U256,
    },

    #[error("Balance would overflow")]
    BalanceOverflow,

    #[error("No open checkpoint")]
    NoCheckpoint,

    #[error("Deserialization failed")]
    DeserializationFailed,
}

impl LedgerError {
    /// True for balance and allowance shortfalls
    pub fn is_insufficient_funds(&self) -> bool {
        matches!(
            self,
            Self::InsufficientBalance { .. } | Self::InsufficientAllowance { .. }
        )
    }
}

/// Fungible-asset ledger for a single chain.
///
/// Mutations made after [`TokenLedger::checkpoint`] are undone by
/// [`TokenLedger::rollback`] or kept by [`TokenLedger::commit`]. Checkpoints
/// nest.
pub trait TokenLedger: Send {
    fn balance_of(&self, asset: &AssetId, holder: &Address) -> U256;

    fn allowance(&self, asset: &AssetId, owner: &Address, spender: &Address) -> U256;

    /// Set (not add to) the amount `spender` may move out of `owner`
    fn approve(
        &mut self,
        asset: &AssetId,
        owner: &Address,
        spender: &Address,
        amount: U256,
    ) -> Result<(), LedgerError>;

    fn transfer(
        &mut self,
        asset: &AssetId,
        from: &Address,
        to: &Address,
        amount: U256,
    ) -> Result<(), LedgerError>;

    /// Move `amount` out of `from` on behalf of `spender`, consuming allowance
    fn transfer_from(
        &mut self,
        asset: &AssetId,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: U256,
    ) -> Result<(), LedgerError>;

    fn checkpoint(&mut self);

    fn commit(&mut self) -> Result<(), LedgerError>;

    fn rollback(&mut self) -> Result<(), LedgerError>;
}

/// Run `f` as one unit of work: every ledger mutation it makes is kept on
/// success and undone on failure.
pub fn atomically<T, E, F>(ledger: &mut dyn TokenLedger, f: F) -> Result<T, E>
where
    F: FnOnce(&mut dyn TokenLedger) -> Result<T, E>,
    E: From<LedgerError>,
{
    ledger.checkpoint();
    match f(&mut *ledger) {
        Ok(value) => {
            ledger.commit()?;
            Ok(value)
        }
        Err(err) => {
            ledger.rollback()?;
            Err(err)
        }
    }
}
