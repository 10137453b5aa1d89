// LocalTransport - In-process router
// Prices messages per lane, collects payment into its pool, and queues envelopes for the relayer

use super::traits::{Envelope, Transport, TransportError};
use crate::ledger::{atomically, TokenLedger};
use crate::message::{AssetId, ChainSelector, Message, MessageId, TokenAmount};
use alloy_primitives::{Address, U256};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::debug;

/// Gas limit used when the sender does not override it
pub const DEFAULT_GAS_LIMIT: u64 = 200_000;

/// Upper bound on a per-message gas limit
pub const MAX_GAS_LIMIT: u64 = 3_000_000;

/// Largest payload a lane accepts by default
pub const MAX_PAYLOAD_LEN: usize = 30_000;

// ============================================================================
// LANE CONFIG
// ============================================================================

/// Pricing and token mapping for one destination chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneConfig {
    /// Chain this lane delivers to
    pub destination: ChainSelector,
    /// Flat fee charged on every message
    pub base_fee: U256,
    /// Fee charged per unit of gas reserved for execution
    pub gas_price: U256,
    /// Fee charged per payload byte
    pub fee_per_payload_byte: U256,
    /// Flat fee added when the message carries tokens
    pub token_transfer_fee: U256,
    pub default_gas_limit: u64,
    pub max_gas_limit: u64,
    pub max_payload_len: usize,
    /// Source-chain asset -> destination-chain asset
    pub token_map: BTreeMap<AssetId, AssetId>,
}

impl LaneConfig {
    pub fn new(destination: ChainSelector) -> Self {
        Self {
            destination,
            base_fee: U256::ZERO,
            gas_price: U256::ZERO,
            fee_per_payload_byte: U256::ZERO,
            token_transfer_fee: U256::ZERO,
            default_gas_limit: DEFAULT_GAS_LIMIT,
            max_gas_limit: MAX_GAS_LIMIT,
            max_payload_len: MAX_PAYLOAD_LEN,
            token_map: BTreeMap::new(),
        }
    }

    pub fn with_base_fee(mut self, fee: U256) -> Self {
        self.base_fee = fee;
        self
    }

    pub fn with_gas_price(mut self, price: U256) -> Self {
        self.gas_price = price;
        self
    }

    pub fn with_fee_per_payload_byte(mut self, fee: U256) -> Self {
        self.fee_per_payload_byte = fee;
        self
    }

    pub fn with_token_transfer_fee(mut self, fee: U256) -> Self {
        self.token_transfer_fee = fee;
        self
    }

    pub fn with_default_gas_limit(mut self, limit: u64) -> Self {
        self.default_gas_limit = limit;
        self
    }

    pub fn with_max_gas_limit(mut self, limit: u64) -> Self {
        self.max_gas_limit = limit;
        self
    }

    pub fn with_max_payload_len(mut self, len: usize) -> Self {
        self.max_payload_len = len;
        self
    }

    /// Map a source-chain asset onto its destination-chain counterpart
    pub fn map_token(mut self, source: AssetId, destination: AssetId) -> Self {
        self.token_map.insert(source, destination);
        self
    }

    pub fn mapped_token(&self, source: &AssetId) -> Option<&AssetId> {
        self.token_map.get(source)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.default_gas_limit == 0 {
            return Err(TransportError::InvalidConfig(
                "default_gas_limit must be > 0".to_string(),
            ));
        }
        if self.default_gas_limit > self.max_gas_limit {
            return Err(TransportError::InvalidConfig(
                "default_gas_limit cannot exceed max_gas_limit".to_string(),
            ));
        }
        if self.max_payload_len == 0 {
            return Err(TransportError::InvalidConfig(
                "max_payload_len must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Price a message on this lane; returns the fee and the gas limit used.
    ///
    /// The fee never decreases as the gas limit grows.
    pub fn quote(
        &self,
        message: &Message,
        gas_limit: Option<u64>,
    ) -> Result<(U256, u64), TransportError> {
        let gas = gas_limit.unwrap_or(self.default_gas_limit);
        if gas > self.max_gas_limit {
            return Err(TransportError::GasLimitTooHigh {
                requested: gas,
                max: self.max_gas_limit,
            });
        }

        let size = message.payload().len();
        if size > self.max_payload_len {
            return Err(TransportError::PayloadTooLarge {
                size,
                max: self.max_payload_len,
            });
        }

        let carries_tokens = !message.amount().is_zero();
        if carries_tokens && self.mapped_token(message.token()).is_none() {
            return Err(TransportError::UnsupportedToken {
                token: *message.token(),
                destination: self.destination,
            });
        }

        let execution = self
            .gas_price
            .checked_mul(U256::from(gas))
            .ok_or(TransportError::FeeOverflow)?;
        let data = self
            .fee_per_payload_byte
            .checked_mul(U256::from(size))
            .ok_or(TransportError::FeeOverflow)?;
        let tokens = if carries_tokens {
            self.token_transfer_fee
        } else {
            U256::ZERO
        };

        let fee = self
            .base_fee
            .checked_add(execution)
            .and_then(|f| f.checked_add(data))
            .and_then(|f| f.checked_add(tokens))
            .ok_or(TransportError::FeeOverflow)?;

        Ok((fee, gas))
    }
}

// ============================================================================
// LOCAL TRANSPORT
// ============================================================================

#[derive(Debug, Default)]
struct Outbox {
    sequence: u64,
    pending: VecDeque<Envelope>,
}

/// In-process transport for one source chain.
///
/// Payments land in the transport's own account (its pool). Accepted messages
/// wait in an outbox until a relayer takes them.
pub struct LocalTransport {
    address: Address,
    chain: ChainSelector,
    fee_token: AssetId,
    lanes: HashMap<ChainSelector, LaneConfig>,
    outbox: Mutex<Outbox>,
}

impl LocalTransport {
    pub fn new(address: Address, chain: ChainSelector, fee_token: AssetId) -> Self {
        Self {
            address,
            chain,
            fee_token,
            lanes: HashMap::new(),
            outbox: Mutex::new(Outbox::default()),
        }
    }

    /// Register (or replace) a lane
    pub fn add_lane(&mut self, lane: LaneConfig) -> Result<(), TransportError> {
        lane.validate()?;
        self.lanes.insert(lane.destination, lane);
        Ok(())
    }

    pub fn lane(&self, destination: ChainSelector) -> Option<&LaneConfig> {
        self.lanes.get(&destination)
    }

    pub fn fee_token(&self) -> &AssetId {
        &self.fee_token
    }

    /// Number of envelopes awaiting delivery
    pub fn pending_count(&self) -> usize {
        self.outbox.lock().pending.len()
    }

    /// Remove and return every envelope awaiting delivery, oldest first
    pub fn take_pending(&self) -> Vec<Envelope> {
        self.outbox.lock().pending.drain(..).collect()
    }

    fn priced_lane(
        &self,
        message: &Message,
        gas_limit: Option<u64>,
    ) -> Result<(&LaneConfig, U256, u64), TransportError> {
        let lane = self
            .lanes
            .get(&message.destination())
            .ok_or(TransportError::UnsupportedDestination(message.destination()))?;

        if message.fee_token() != &self.fee_token {
            return Err(TransportError::UnsupportedFeeToken(*message.fee_token()));
        }

        let (fee, gas) = lane.quote(message, gas_limit)?;
        Ok((lane, fee, gas))
    }
}

impl Transport for LocalTransport {
    fn address(&self) -> Address {
        self.address
    }

    fn source_chain(&self) -> ChainSelector {
        self.chain
    }

    fn is_chain_supported(&self, destination: ChainSelector) -> bool {
        self.lanes.contains_key(&destination)
    }

    fn get_fee(&self, message: &Message, gas_limit: Option<u64>) -> Result<U256, TransportError> {
        let (_, fee, gas) = self.priced_lane(message, gas_limit)?;
        debug!(destination = %message.destination(), gas, %fee, "Quoted fee");
        Ok(fee)
    }

    fn send(
        &self,
        ledger: &mut dyn TokenLedger,
        sender: &Address,
        message: Message,
        gas_limit: Option<u64>,
    ) -> Result<MessageId, TransportError> {
        let (lane, fee, gas) = self.priced_lane(&message, gas_limit)?;
        let pool = self.address;

        let token_amounts = atomically(ledger, |ledger| -> Result<_, TransportError> {
            ledger.transfer_from(&self.fee_token, &pool, sender, &pool, fee)?;

            let mut token_amounts = Vec::new();
            if !message.amount().is_zero() {
                ledger.transfer_from(message.token(), &pool, sender, &pool, message.amount())?;

                let mapped = lane
                    .mapped_token(message.token())
                    .ok_or(TransportError::UnsupportedToken {
                        token: *message.token(),
                        destination: lane.destination,
                    })?;
                token_amounts.push(TokenAmount::new(*mapped, message.amount()));
            }
            Ok(token_amounts)
        })?;

        let mut outbox = self.outbox.lock();
        outbox.sequence += 1;
        let sequence = outbox.sequence;
        let message_id = MessageId::compute(self.chain, sender, sequence, &message);

        outbox.pending.push_back(Envelope::new(
            message_id,
            sequence,
            self.chain,
            *sender,
            message.destination(),
            *message.receiver(),
            message.payload().to_vec(),
            token_amounts,
            gas,
            fee,
        ));

        debug!(%message_id, sequence, destination = %message.destination(), "Message queued");
        Ok(message_id)
    }
}
