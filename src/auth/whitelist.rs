// Whitelists - which remote gateways we may address, and which remote senders we accept

use crate::message::ChainSelector;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WhitelistError {
    #[error("Destination chain {0} is not whitelisted")]
    UnknownDestination(ChainSelector),

    #[error("Receiver {actual} does not match whitelisted gateway {expected} on chain {destination}")]
    ReceiverMismatch {
        destination: ChainSelector,
        expected: Address,
        actual: Address,
    },

    #[error("Sender {sender} on chain {source_chain} is not whitelisted")]
    UnknownSource {
        source_chain: ChainSelector,
        sender: Address,
    },
}

// ============================================================================
// DESTINATION WHITELIST
// ============================================================================

/// Maps each destination chain to the only gateway we may send to there.
///
/// A missing entry means sending to that chain is forbidden.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationWhitelist {
    entries: BTreeMap<ChainSelector, Address>,
}

impl DestinationWhitelist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the gateway for a chain, returning the previous one
    pub fn upsert(&mut self, destination: ChainSelector, gateway: Address) -> Option<Address> {
        self.entries.insert(destination, gateway)
    }

    pub fn remove(&mut self, destination: ChainSelector) -> Option<Address> {
        self.entries.remove(&destination)
    }

    pub fn get(&self, destination: ChainSelector) -> Option<&Address> {
        self.entries.get(&destination)
    }

    /// Ensure `receiver` is exactly the whitelisted gateway for `destination`
    pub fn check(
        &self,
        destination: ChainSelector,
        receiver: &Address,
    ) -> Result<(), WhitelistError> {
        let expected = self
            .entries
            .get(&destination)
            .ok_or(WhitelistError::UnknownDestination(destination))?;

        if expected != receiver {
            return Err(WhitelistError::ReceiverMismatch {
                destination,
                expected: *expected,
                actual: *receiver,
            });
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChainSelector, &Address)> {
        self.entries.iter()
    }
}

// ============================================================================
// SOURCE WHITELIST
// ============================================================================

/// Set of (origin chain, origin sender) pairs a gateway accepts
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceWhitelist {
    entries: BTreeSet<(ChainSelector, Address)>,
}

impl SourceWhitelist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow a pair; returns false if it was already allowed
    pub fn allow(&mut self, source_chain: ChainSelector, sender: Address) -> bool {
        self.entries.insert((source_chain, sender))
    }

    /// Revoke a pair; returns false if it was not present
    pub fn remove(&mut self, source_chain: ChainSelector, sender: &Address) -> bool {
        self.entries.remove(&(source_chain, *sender))
    }

    pub fn is_allowed(&self, source_chain: ChainSelector, sender: &Address) -> bool {
        self.entries.contains(&(source_chain, *sender))
    }

    pub fn check(
        &self,
        source_chain: ChainSelector,
        sender: &Address,
    ) -> Result<(), WhitelistError> {
        if !self.is_allowed(source_chain, sender) {
            return Err(WhitelistError::UnknownSource {
                source_chain,
                sender: *sender,
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(ChainSelector, Address)> {
        self.entries.iter()
    }
}
