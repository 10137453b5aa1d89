// Mock transport for testing dispatchers without a router

use super::traits::{Transport, TransportError};
use crate::ledger::{atomically, TokenLedger};
use crate::message::{ChainSelector, Message, MessageId};
use alloy_primitives::{Address, U256};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

/// Mock implementation of [`Transport`].
///
/// Charges `base_fee + gas_limit` so fees track the requested gas limit.
/// Collects payment like a real router and records every accepted message.
pub struct MockTransport {
    address: Address,
    chain: ChainSelector,
    supported: HashSet<ChainSelector>,
    base_fee: U256,
    default_gas_limit: u64,
    failure_message: Option<String>,
    sequence: AtomicU64,
    sent: Mutex<Vec<(MessageId, Message)>>,
}

impl MockTransport {
    /// Create a mock that supports no destinations
    pub fn new(address: Address) -> Self {
        Self {
            address,
            chain: ChainSelector::new(1),
            supported: HashSet::new(),
            base_fee: U256::from(1_000u64),
            default_gas_limit: 200_000,
            failure_message: None,
            sequence: AtomicU64::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn with_chain(mut self, destination: ChainSelector) -> Self {
        self.supported.insert(destination);
        self
    }

    pub fn with_base_fee(mut self, fee: U256) -> Self {
        self.base_fee = fee;
        self
    }

    /// Reject every send with a message
    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure_message = Some(message.to_string());
        self
    }

    /// Messages accepted so far
    pub fn sent(&self) -> Vec<(MessageId, Message)> {
        self.sent.lock().clone()
    }
}

impl Transport for MockTransport {
    fn address(&self) -> Address {
        self.address
    }

    fn source_chain(&self) -> ChainSelector {
        self.chain
    }

    fn is_chain_supported(&self, destination: ChainSelector) -> bool {
        self.supported.contains(&destination)
    }

    fn get_fee(&self, message: &Message, gas_limit: Option<u64>) -> Result<U256, TransportError> {
        if !self.is_chain_supported(message.destination()) {
            return Err(TransportError::UnsupportedDestination(message.destination()));
        }
        let gas = gas_limit.unwrap_or(self.default_gas_limit);
        self.base_fee
            .checked_add(U256::from(gas))
            .ok_or(TransportError::FeeOverflow)
    }

    fn send(
        &self,
        ledger: &mut dyn TokenLedger,
        sender: &Address,
        message: Message,
        gas_limit: Option<u64>,
    ) -> Result<MessageId, TransportError> {
        let fee = self.get_fee(&message, gas_limit)?;

        if let Some(reason) = &self.failure_message {
            return Err(TransportError::Rejected(reason.clone()));
        }

        let pool = self.address;
        atomically(ledger, |ledger| -> Result<(), TransportError> {
            ledger.transfer_from(message.fee_token(), &pool, sender, &pool, fee)?;
            ledger.transfer_from(message.token(), &pool, sender, &pool, message.amount())?;
            Ok(())
        })?;

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let message_id = MessageId::compute(self.chain, sender, sequence, &message);
        self.sent.lock().push((message_id, message));

        Ok(message_id)
    }
}
