// In-memory ledger - one instance per simulated chain

use super::token::{LedgerError, TokenLedger};
use crate::message::AssetId;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Balances and allowances, cloned wholesale for each checkpoint
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Book {
    balances: BTreeMap<(AssetId, Address), U256>,
    allowances: BTreeMap<(AssetId, Address, Address), U256>,
}

/// Ledger statistics
#[derive(Clone, Debug, Default)]
pub struct LedgerStats {
    pub accounts: usize,
    pub allowances: usize,
    pub checkpoint_depth: usize,
}

/// A complete [`TokenLedger`] held in memory.
///
/// Serializes to bytes for persistence; open checkpoints are not persisted.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InMemoryLedger {
    book: Book,
    #[serde(skip)]
    checkpoints: Vec<Book>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` of `asset` out of thin air for `to`
    pub fn mint(&mut self, asset: &AssetId, to: &Address, amount: U256) -> Result<(), LedgerError> {
        let balance = self.balance_of(asset, to);
        let updated = balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        self.book.balances.insert((*asset, *to), updated);
        Ok(())
    }

    /// Sum of all balances of `asset`
    pub fn total_supply(&self, asset: &AssetId) -> U256 {
        self.book
            .balances
            .iter()
            .filter(|((a, _), _)| a == asset)
            .fold(U256::ZERO, |acc, (_, v)| acc.saturating_add(*v))
    }

    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            accounts: self.book.balances.len(),
            allowances: self.book.allowances.len(),
            checkpoint_depth: self.checkpoints.len(),
        }
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        postcard::to_allocvec(self).unwrap_or_default()
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        postcard::from_bytes(bytes).map_err(|_| LedgerError::DeserializationFailed)
    }

    fn debit(
        &mut self,
        asset: &AssetId,
        holder: &Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        let available = self.balance_of(asset, holder);
        let remaining = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                asset: *asset,
                holder: *holder,
                available,
                required: amount,
            })?;
        self.book.balances.insert((*asset, *holder), remaining);
        Ok(())
    }
}

impl TokenLedger for InMemoryLedger {
    fn balance_of(&self, asset: &AssetId, holder: &Address) -> U256 {
        self.book
            .balances
            .get(&(*asset, *holder))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    fn allowance(&self, asset: &AssetId, owner: &Address, spender: &Address) -> U256 {
        self.book
            .allowances
            .get(&(*asset, *owner, *spender))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    fn approve(
        &mut self,
        asset: &AssetId,
        owner: &Address,
        spender: &Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        self.book
            .allowances
            .insert((*asset, *owner, *spender), amount);
        Ok(())
    }

    fn transfer(
        &mut self,
        asset: &AssetId,
        from: &Address,
        to: &Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        // Check the credit side first so a failed transfer leaves no trace
        let credited = self
            .balance_of(asset, to)
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;

        self.debit(asset, from, amount)?;

        if from == to {
            // Debit already applied to the same slot; restore it
            return self.mint(asset, to, amount);
        }

        self.book.balances.insert((*asset, *to), credited);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        asset: &AssetId,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        let available = self.allowance(asset, from, spender);
        let remaining = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientAllowance {
                asset: *asset,
                owner: *from,
                spender: *spender,
                available,
                required: amount,
            })?;

        self.transfer(asset, from, to, amount)?;
        self.book
            .allowances
            .insert((*asset, *from, *spender), remaining);
        Ok(())
    }

    fn checkpoint(&mut self) {
        self.checkpoints.push(self.book.clone());
    }

    fn commit(&mut self) -> Result<(), LedgerError> {
        self.checkpoints
            .pop()
            .map(|_| ())
            .ok_or(LedgerError::NoCheckpoint)
    }

    fn rollback(&mut self) -> Result<(), LedgerError> {
        self.book = self.checkpoints.pop().ok_or(LedgerError::NoCheckpoint)?;
        Ok(())
    }
}
