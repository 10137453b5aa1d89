// Gateway - Destination-side entrypoint for transport deliveries
// Trusts only the transport, only whitelisted senders, and forwards bridged value to settlement

use crate::auth::{AdminAction, AuthError, AuthorizationPolicy, SourceWhitelist, WhitelistError};
use crate::ledger::{atomically, LedgerError, TokenLedger};
use crate::message::{
    AssetId, ChainSelector, CodecError, InboundMessage, MessageId, SettlementInstruction,
};
use crate::settlement::{Settlement, SwapError, SwapOrder};
use alloy_primitives::{Address, U256};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Settlement component shared between its owner and the gateway
pub type SharedSettlement = Arc<Mutex<dyn Settlement>>;

// ============================================================================
// GATEWAY EVENTS
// ============================================================================

/// Events emitted by the gateway
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayEvent {
    /// An inbound message was verified and its value paid out
    MessageSettled {
        message_id: MessageId,
        source_chain: ChainSelector,
        sender: Address,
        beneficiary: Address,
        token_in: AssetId,
        amount_in: U256,
        token_out: AssetId,
        amount_out: U256,
    },
    SourceWhitelisted {
        source_chain: ChainSelector,
        sender: Address,
    },
    SourceRemoved {
        source_chain: ChainSelector,
        sender: Address,
    },
    SwapperSet {
        token: AssetId,
        swapper: Address,
    },
}

// ============================================================================
// GATEWAY CONFIG
// ============================================================================

/// Configuration for the gateway
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// The gateway's own account; receives bridged tokens
    pub address: Address,
    /// The only caller allowed to deliver messages
    pub transport: Address,
    /// Reject message ids already settled here. Off by default: the
    /// transport guarantees exactly-once delivery.
    pub replay_protection: bool,
}

impl GatewayConfig {
    pub fn new(address: Address, transport: Address) -> Self {
        Self {
            address,
            transport,
            replay_protection: false,
        }
    }

    pub fn with_replay_protection(mut self, enabled: bool) -> Self {
        self.replay_protection = enabled;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.address == Address::ZERO {
            return Err(GatewayError::InvalidConfig(
                "address cannot be zero".to_string(),
            ));
        }
        if self.transport == Address::ZERO {
            return Err(GatewayError::InvalidConfig(
                "transport cannot be zero".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// GATEWAY STATE
// ============================================================================

/// Durable part of the gateway
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayState {
    pub sources: SourceWhitelist,
}

impl GatewayState {
    /// Serialize to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        postcard::to_allocvec(self).unwrap_or_default()
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GatewayError> {
        postcard::from_bytes(bytes).map_err(|_| GatewayError::DeserializationFailed)
    }
}

// ============================================================================
// GATEWAY STATS
// ============================================================================

/// Statistics about gateway deliveries
#[derive(Clone, Debug, Default)]
pub struct GatewayStats {
    pub messages_settled: u64,
    pub messages_rejected: u64,
}

// ============================================================================
// GATEWAY ERROR
// ============================================================================

/// Errors that can occur while administering the gateway or accepting a delivery
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Forbidden: {0}")]
    Forbidden(#[from] AuthError),

    #[error("Caller {caller} is not the trusted transport {transport}")]
    UntrustedCaller { caller: Address, transport: Address },

    #[error("Not whitelisted: {0}")]
    NotWhitelisted(#[from] WhitelistError),

    #[error("Malformed payload: {0}")]
    Decode(#[from] CodecError),

    #[error("Expected exactly one bridged token, got {0}")]
    InvalidTokenAmounts(usize),

    #[error("No settlement configured for {0}")]
    NoSettlement(AssetId),

    #[error("Settlement failed: {0}")]
    Swap(#[from] SwapError),

    #[error("Message {0} already processed")]
    AlreadyProcessed(MessageId),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Deserialization failed")]
    DeserializationFailed,
}

// ============================================================================
// GATEWAY
// ============================================================================

/// Receiver of cross-chain deliveries on the destination chain
pub struct Gateway {
    config: GatewayConfig,
    policy: Box<dyn AuthorizationPolicy>,
    sources: SourceWhitelist,
    /// Received asset -> settlement handling it
    swappers: HashMap<AssetId, SharedSettlement>,
    /// Settled message ids, tracked only with replay protection on
    processed: HashSet<MessageId>,
    /// Events queue
    events: Vec<GatewayEvent>,
    /// Statistics
    stats: GatewayStats,
}

impl Gateway {
    pub fn new(
        config: GatewayConfig,
        policy: Box<dyn AuthorizationPolicy>,
    ) -> Result<Self, GatewayError> {
        config.validate()?;

        Ok(Self {
            config,
            policy,
            sources: SourceWhitelist::new(),
            swappers: HashMap::new(),
            processed: HashSet::new(),
            events: Vec::new(),
            stats: GatewayStats::default(),
        })
    }

    pub fn address(&self) -> &Address {
        &self.config.address
    }

    pub fn transport(&self) -> &Address {
        &self.config.transport
    }

    pub fn sources(&self) -> &SourceWhitelist {
        &self.sources
    }

    pub fn is_source_allowed(&self, source_chain: ChainSelector, sender: &Address) -> bool {
        self.sources.is_allowed(source_chain, sender)
    }

    /// Address of the settlement configured for a received asset
    pub fn swapper_for(&self, token: &AssetId) -> Option<Address> {
        self.swappers.get(token).map(|s| s.lock().address())
    }

    // ========================================================================
    // ADMINISTRATION
    // ========================================================================

    /// Owner-only: accept messages from `sender` on `source_chain`
    pub fn whitelist_source(
        &mut self,
        caller: &Address,
        source_chain: ChainSelector,
        sender: Address,
    ) -> Result<(), GatewayError> {
        self.policy.authorize(caller, AdminAction::WhitelistSource)?;

        self.sources.allow(source_chain, sender);
        self.events.push(GatewayEvent::SourceWhitelisted {
            source_chain,
            sender,
        });

        info!(%source_chain, %sender, "Source whitelisted");
        Ok(())
    }

    /// Owner-only: stop accepting a pair; returns false if it was not whitelisted
    pub fn remove_source(
        &mut self,
        caller: &Address,
        source_chain: ChainSelector,
        sender: &Address,
    ) -> Result<bool, GatewayError> {
        self.policy.authorize(caller, AdminAction::RemoveSource)?;

        let removed = self.sources.remove(source_chain, sender);
        if removed {
            self.events.push(GatewayEvent::SourceRemoved {
                source_chain,
                sender: *sender,
            });
            info!(%source_chain, %sender, "Source removed");
        }
        Ok(removed)
    }

    /// Owner-only: route received `token` to `settlement`
    pub fn set_swapper(
        &mut self,
        caller: &Address,
        token: AssetId,
        settlement: SharedSettlement,
    ) -> Result<(), GatewayError> {
        self.policy.authorize(caller, AdminAction::SetSwapper)?;

        let swapper = settlement.lock().address();
        self.swappers.insert(token, settlement);
        self.events.push(GatewayEvent::SwapperSet { token, swapper });

        info!(%token, %swapper, "Swapper set");
        Ok(())
    }

    /// Owner-only: move the gateway's whole balance of `asset` to `beneficiary`
    pub fn withdraw_token(
        &mut self,
        caller: &Address,
        ledger: &mut dyn TokenLedger,
        asset: &AssetId,
        beneficiary: &Address,
    ) -> Result<U256, GatewayError> {
        self.policy.authorize(caller, AdminAction::WithdrawToken)?;

        let amount = ledger.balance_of(asset, &self.config.address);
        ledger.transfer(asset, &self.config.address, beneficiary, amount)?;

        info!(%asset, %beneficiary, %amount, "Token withdrawn");
        Ok(amount)
    }

    // ========================================================================
    // DELIVERY
    // ========================================================================

    /// Delivery entrypoint, invoked by the transport only.
    ///
    /// The bridged tokens must already be in the gateway's custody. They are
    /// forwarded to the settlement for that asset, which pays the beneficiary
    /// named in the payload. Returns the amount paid out. On any failure no
    /// ledger change made here survives.
    pub fn ccip_receive(
        &mut self,
        caller: &Address,
        ledger: &mut dyn TokenLedger,
        message: &InboundMessage,
    ) -> Result<U256, GatewayError> {
        match self.try_receive(caller, ledger, message) {
            Ok(amount_out) => {
                self.stats.messages_settled += 1;
                Ok(amount_out)
            }
            Err(err) => {
                self.stats.messages_rejected += 1;
                warn!(
                    message_id = %message.message_id(),
                    source_chain = %message.source_chain(),
                    sender = %message.sender(),
                    error = %err,
                    "Delivery rejected"
                );
                Err(err)
            }
        }
    }

    fn try_receive(
        &mut self,
        caller: &Address,
        ledger: &mut dyn TokenLedger,
        message: &InboundMessage,
    ) -> Result<U256, GatewayError> {
        if caller != &self.config.transport {
            return Err(GatewayError::UntrustedCaller {
                caller: *caller,
                transport: self.config.transport,
            });
        }

        let message_id = *message.message_id();
        if self.config.replay_protection && self.processed.contains(&message_id) {
            return Err(GatewayError::AlreadyProcessed(message_id));
        }

        self.sources
            .check(message.source_chain(), message.sender())?;

        let instruction = SettlementInstruction::decode(message.payload())?;

        let received = match message.token_amounts() {
            [single] => *single,
            other => return Err(GatewayError::InvalidTokenAmounts(other.len())),
        };

        let settlement = self
            .swappers
            .get(&received.token)
            .cloned()
            .ok_or(GatewayError::NoSettlement(received.token))?;

        let order = SwapOrder {
            token_in: received.token,
            amount_in: received.amount,
            token_out: instruction.target_asset,
            beneficiary: instruction.beneficiary,
            min_output: instruction.min_output,
        };

        let this = self.config.address;
        let amount_out = atomically(ledger, |ledger| -> Result<U256, GatewayError> {
            let mut settlement = settlement.lock();
            ledger.approve(&order.token_in, &this, &settlement.address(), order.amount_in)?;
            Ok(settlement.settle(&this, ledger, &order)?)
        })?;

        if self.config.replay_protection {
            self.processed.insert(message_id);
        }

        info!(
            %message_id,
            source_chain = %message.source_chain(),
            beneficiary = %order.beneficiary,
            amount_in = %order.amount_in,
            %amount_out,
            "Message settled"
        );

        self.events.push(GatewayEvent::MessageSettled {
            message_id,
            source_chain: message.source_chain(),
            sender: *message.sender(),
            beneficiary: order.beneficiary,
            token_in: order.token_in,
            amount_in: order.amount_in,
            token_out: order.token_out,
            amount_out,
        });

        Ok(amount_out)
    }

    // ========================================================================
    // STATE
    // ========================================================================

    /// Snapshot the durable state
    pub fn state(&self) -> GatewayState {
        GatewayState {
            sources: self.sources.clone(),
        }
    }

    /// Replace the durable state, e.g. after loading it from storage
    pub fn restore_state(&mut self, state: GatewayState) {
        self.sources = state.sources;
    }

    /// Poll for events (clears the event queue)
    pub fn poll_events(&mut self) -> Vec<GatewayEvent> {
        std::mem::take(&mut self.events)
    }

    /// Get statistics
    pub fn stats(&self) -> &GatewayStats {
        &self.stats
    }
}
