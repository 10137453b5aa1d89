// Transport Traits and Core Types
// Defines the abstract Transport trait and the envelope it carries between chains

use crate::ledger::{LedgerError, TokenLedger};
use crate::message::{AssetId, ChainSelector, InboundMessage, Message, MessageId, TokenAmount};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// TRANSPORT ERROR
// ============================================================================

/// Errors raised by a transport while quoting or accepting a message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Destination chain {0} is not supported")]
    UnsupportedDestination(ChainSelector),

    #[error("Token {token} cannot be bridged to chain {destination}")]
    UnsupportedToken {
        token: AssetId,
        destination: ChainSelector,
    },

    #[error("Fee token {0} is not accepted")]
    UnsupportedFeeToken(AssetId),

    #[error("Payload too large: {size} bytes exceeds {max}")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Gas limit {requested} exceeds lane maximum {max}")]
    GasLimitTooHigh { requested: u64, max: u64 },

    #[error("Fee computation overflowed")]
    FeeOverflow,

    #[error("Payment failed: {0}")]
    Payment(#[from] LedgerError),

    #[error("Message rejected: {0}")]
    Rejected(String),

    #[error("Transport unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// ============================================================================
// TRANSPORT TRAIT
// ============================================================================

/// Cross-chain delivery substrate.
///
/// `send` collects the fee and the bridged tokens from `sender` (who must have
/// approved [`Transport::address`]) and queues the message for delivery.
pub trait Transport: Send + Sync {
    /// Account that pulls fees and tokens on the source chain, and that
    /// invokes gateways on the destination chain
    fn address(&self) -> Address;

    /// Chain this transport accepts messages on
    fn source_chain(&self) -> ChainSelector;

    fn is_chain_supported(&self, destination: ChainSelector) -> bool;

    /// Quote the fee for `message`. `None` uses the transport's default gas limit.
    fn get_fee(&self, message: &Message, gas_limit: Option<u64>) -> Result<U256, TransportError>;

    fn send(
        &self,
        ledger: &mut dyn TokenLedger,
        sender: &Address,
        message: Message,
        gas_limit: Option<u64>,
    ) -> Result<MessageId, TransportError>;
}

// ============================================================================
// ENVELOPE
// ============================================================================

/// A message accepted by the transport and awaiting delivery
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    message_id: MessageId,
    sequence: u64,
    source_chain: ChainSelector,
    sender: Address,
    destination: ChainSelector,
    receiver: Address,
    payload: Vec<u8>,
    /// Bridged tokens, already mapped to destination-chain assets
    token_amounts: Vec<TokenAmount>,
    gas_limit: u64,
    fee: U256,
}

impl Envelope {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        message_id: MessageId,
        sequence: u64,
        source_chain: ChainSelector,
        sender: Address,
        destination: ChainSelector,
        receiver: Address,
        payload: Vec<u8>,
        token_amounts: Vec<TokenAmount>,
        gas_limit: u64,
        fee: U256,
    ) -> Self {
        Self {
            message_id,
            sequence,
            source_chain,
            sender,
            destination,
            receiver,
            payload,
            token_amounts,
            gas_limit,
            fee,
        }
    }

    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn source_chain(&self) -> ChainSelector {
        self.source_chain
    }

    pub fn sender(&self) -> &Address {
        &self.sender
    }

    pub fn destination(&self) -> ChainSelector {
        self.destination
    }

    pub fn receiver(&self) -> &Address {
        &self.receiver
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn token_amounts(&self) -> &[TokenAmount] {
        &self.token_amounts
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    pub fn fee(&self) -> U256 {
        self.fee
    }

    /// The form handed to the destination gateway
    pub fn to_inbound(&self) -> InboundMessage {
        InboundMessage::new(
            self.message_id,
            self.source_chain,
            self.sender,
            self.payload.clone(),
            self.token_amounts.clone(),
        )
    }
}
