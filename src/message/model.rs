// Core message types shared by the dispatcher, transport and gateway

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

const MESSAGE_ID_DOMAIN: &[u8] = b"chainbridge:message:";

// ============================================================================
// CHAIN SELECTOR
// ============================================================================

/// Opaque identifier of a remote chain, assigned by the transport operator.
///
/// Selectors are never reused for a different chain, so they are safe to
/// persist as whitelist keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChainSelector(u64);

impl ChainSelector {
    /// Ethereum Sepolia testnet
    pub const SEPOLIA: Self = Self(16_015_286_601_757_825_753);
    /// Polygon Mumbai testnet
    pub const MUMBAI: Self = Self(12_532_609_583_862_916_517);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ChainSelector {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ChainSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ASSET ID
// ============================================================================

/// Address of a fungible token contract.
///
/// Kept distinct from plain account addresses so a token can never be passed
/// where a beneficiary or gateway is expected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(Address);

impl AssetId {
    pub const fn new(address: Address) -> Self {
        Self(address)
    }

    /// Get the token contract address
    pub const fn address(&self) -> Address {
        self.0
    }
}

impl From<Address> for AssetId {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// MESSAGE ID
// ============================================================================

/// Unique identifier assigned by the transport when a message is accepted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId([u8; 32]);

impl MessageId {
    /// Derive the id for the `sequence`-th message accepted from `sender` on `source`
    pub fn compute(
        source: ChainSelector,
        sender: &Address,
        sequence: u64,
        message: &Message,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(MESSAGE_ID_DOMAIN);
        hasher.update(source.value().to_be_bytes());
        hasher.update(sender.as_slice());
        hasher.update(sequence.to_be_bytes());
        hasher.update(message.to_hashing_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

// ============================================================================
// TOKEN AMOUNT
// ============================================================================

/// An amount of a single token carried by a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    pub token: AssetId,
    pub amount: U256,
}

impl TokenAmount {
    pub fn new(token: AssetId, amount: U256) -> Self {
        Self { token, amount }
    }
}

// ============================================================================
// OUTBOUND MESSAGE
// ============================================================================

/// An outbound message as built by the dispatcher.
///
/// The payload is opaque at this layer. Once handed to the transport the
/// message is never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    destination: ChainSelector,
    receiver: Address,
    payload: Vec<u8>,
    token: AssetId,
    amount: U256,
    fee_token: AssetId,
}

impl Message {
    pub fn new(
        destination: ChainSelector,
        receiver: Address,
        payload: Vec<u8>,
        token: AssetId,
        amount: U256,
        fee_token: AssetId,
    ) -> Self {
        Self {
            destination,
            receiver,
            payload,
            token,
            amount,
            fee_token,
        }
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

    pub fn token(&self) -> &AssetId {
        &self.token
    }

    pub fn amount(&self) -> U256 {
        self.amount
    }

    pub fn fee_token(&self) -> &AssetId {
        &self.fee_token
    }

    /// The bridged token and amount as a single pair
    pub fn token_amount(&self) -> TokenAmount {
        TokenAmount::new(self.token, self.amount)
    }

    /// Deterministic byte layout used when deriving message ids
    pub fn to_hashing_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + 20 + 4 + self.payload.len() + 20 + 32 + 20);

        bytes.extend_from_slice(&self.destination.value().to_be_bytes());
        bytes.extend_from_slice(self.receiver.as_slice());

        // Length-prefixed payload
        bytes.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&self.payload);

        bytes.extend_from_slice(self.token.address().as_slice());
        bytes.extend_from_slice(&self.amount.to_be_bytes::<32>());
        bytes.extend_from_slice(self.fee_token.address().as_slice());

        bytes
    }
}

// ============================================================================
// INBOUND MESSAGE
// ============================================================================

/// A message as delivered to a gateway on the destination chain.
///
/// Token amounts are already expressed in destination-chain assets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    message_id: MessageId,
    source_chain: ChainSelector,
    sender: Address,
    payload: Vec<u8>,
    token_amounts: Vec<TokenAmount>,
}

impl InboundMessage {
    pub fn new(
        message_id: MessageId,
        source_chain: ChainSelector,
        sender: Address,
        payload: Vec<u8>,
        token_amounts: Vec<TokenAmount>,
    ) -> Self {
        Self {
            message_id,
            source_chain,
            sender,
            payload,
            token_amounts,
        }
    }

    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    pub fn source_chain(&self) -> ChainSelector {
        self.source_chain
    }

    pub fn sender(&self) -> &Address {
        &self.sender
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn token_amounts(&self) -> &[TokenAmount] {
        &self.token_amounts
    }
}
