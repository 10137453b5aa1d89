// Dispatcher - Builds outbound messages and pays for their delivery
// Enforces the destination whitelist, prices fees, pulls payment, and hands messages to the transport

use crate::auth::{
    AdminAction, AuthError, AuthorizationPolicy, DestinationWhitelist, WhitelistError,
};
use crate::ledger::{atomically, LedgerError, TokenLedger};
use crate::message::{AssetId, ChainSelector, Message, MessageId};
use crate::transport::{Transport, TransportError};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// DISPATCHER EVENTS
// ============================================================================

/// Events emitted by the dispatcher, for off-chain indexers
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatcherEvent {
    /// Emitted exactly once per successful send
    MessageSent {
        message_id: MessageId,
        destination: ChainSelector,
        receiver: Address,
        payload: Vec<u8>,
        token: AssetId,
        amount: U256,
        fee_token: AssetId,
        fee: U256,
    },
    DestinationWhitelisted {
        destination: ChainSelector,
        gateway: Address,
    },
    DestinationRemoved {
        destination: ChainSelector,
    },
    FixedGasLimitChanged {
        limit: u64,
    },
}

// ============================================================================
// DISPATCHER CONFIG
// ============================================================================

/// Configuration for the dispatcher
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    /// The dispatcher's own account; holds custody between pull and send
    pub address: Address,
    /// Asset every fee is paid in
    pub fee_token: AssetId,
    /// Initial gas limit override, 0 for the transport default
    pub fixed_gas_limit: u64,
}

impl DispatcherConfig {
    pub fn new(address: Address, fee_token: AssetId) -> Self {
        Self {
            address,
            fee_token,
            fixed_gas_limit: 0,
        }
    }

    pub fn with_fixed_gas_limit(mut self, limit: u64) -> Self {
        self.fixed_gas_limit = limit;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), DispatcherError> {
        if self.address == Address::ZERO {
            return Err(DispatcherError::InvalidConfig(
                "address cannot be zero".to_string(),
            ));
        }
        if self.fee_token.address() == Address::ZERO {
            return Err(DispatcherError::InvalidConfig(
                "fee_token cannot be zero".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// DISPATCHER STATE
// ============================================================================

/// Durable part of the dispatcher
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherState {
    pub destinations: DestinationWhitelist,
    pub fixed_gas_limit: u64,
}

impl DispatcherState {
    /// Serialize to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        postcard::to_allocvec(self).unwrap_or_default()
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DispatcherError> {
        postcard::from_bytes(bytes).map_err(|_| DispatcherError::DeserializationFailed)
    }
}

// ============================================================================
// DISPATCHER STATS
// ============================================================================

/// Statistics about dispatcher operations
#[derive(Clone, Debug, Default)]
pub struct DispatcherStats {
    pub messages_sent: u64,
    pub messages_rejected: u64,
    pub total_fees_paid: U256,
}

// ============================================================================
// DISPATCHER ERROR
// ============================================================================

/// Errors that can occur while administering the dispatcher or sending
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatcherError {
    #[error("Forbidden: {0}")]
    Forbidden(#[from] AuthError),

    #[error("Not whitelisted: {0}")]
    NotWhitelisted(#[from] WhitelistError),

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(LedgerError),

    #[error("Bridged amount must be > 0")]
    ZeroAmount,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Ledger error: {0}")]
    Ledger(LedgerError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Deserialization failed")]
    DeserializationFailed,
}

impl From<LedgerError> for DispatcherError {
    fn from(err: LedgerError) -> Self {
        if err.is_insufficient_funds() {
            DispatcherError::InsufficientFunds(err)
        } else {
            DispatcherError::Ledger(err)
        }
    }
}

// ============================================================================
// DISPATCHER
// ============================================================================

/// Source-side sender of token-carrying messages
pub struct Dispatcher {
    config: DispatcherConfig,
    policy: Box<dyn AuthorizationPolicy>,
    transport: Arc<dyn Transport>,
    destinations: DestinationWhitelist,
    fixed_gas_limit: u64,
    /// Events queue
    events: Vec<DispatcherEvent>,
    /// Statistics
    stats: DispatcherStats,
}

impl Dispatcher {
    pub fn new(
        config: DispatcherConfig,
        policy: Box<dyn AuthorizationPolicy>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, DispatcherError> {
        config.validate()?;
        let fixed_gas_limit = config.fixed_gas_limit;

        Ok(Self {
            config,
            policy,
            transport,
            destinations: DestinationWhitelist::new(),
            fixed_gas_limit,
            events: Vec::new(),
            stats: DispatcherStats::default(),
        })
    }

    pub fn address(&self) -> &Address {
        &self.config.address
    }

    pub fn fee_token(&self) -> &AssetId {
        &self.config.fee_token
    }

    pub fn fixed_gas_limit(&self) -> u64 {
        self.fixed_gas_limit
    }

    pub fn destinations(&self) -> &DestinationWhitelist {
        &self.destinations
    }

    // ========================================================================
    // ADMINISTRATION
    // ========================================================================

    /// Owner-only: allow sending to `gateway` on `destination`
    pub fn whitelist_destination(
        &mut self,
        caller: &Address,
        destination: ChainSelector,
        gateway: Address,
    ) -> Result<(), DispatcherError> {
        self.policy
            .authorize(caller, AdminAction::WhitelistDestination)?;

        self.destinations.upsert(destination, gateway);
        self.events.push(DispatcherEvent::DestinationWhitelisted {
            destination,
            gateway,
        });

        info!(%destination, %gateway, "Destination whitelisted");
        Ok(())
    }

    /// Owner-only: forbid sending to `destination`; returns false if it was not whitelisted
    pub fn remove_destination(
        &mut self,
        caller: &Address,
        destination: ChainSelector,
    ) -> Result<bool, DispatcherError> {
        self.policy.authorize(caller, AdminAction::RemoveDestination)?;

        let removed = self.destinations.remove(destination).is_some();
        if removed {
            self.events
                .push(DispatcherEvent::DestinationRemoved { destination });
            info!(%destination, "Destination removed");
        }
        Ok(removed)
    }

    /// Owner-only: gas limit passed to fee quotes and sends; 0 restores the transport default
    pub fn set_fixed_gas_limit(
        &mut self,
        caller: &Address,
        limit: u64,
    ) -> Result<(), DispatcherError> {
        self.policy.authorize(caller, AdminAction::SetFixedGasLimit)?;

        self.fixed_gas_limit = limit;
        self.events
            .push(DispatcherEvent::FixedGasLimitChanged { limit });

        info!(limit, "Fixed gas limit set");
        Ok(())
    }

    /// Owner-only: move the dispatcher's whole balance of `asset` to `beneficiary`
    pub fn withdraw_token(
        &mut self,
        caller: &Address,
        ledger: &mut dyn TokenLedger,
        asset: &AssetId,
        beneficiary: &Address,
    ) -> Result<U256, DispatcherError> {
        self.policy.authorize(caller, AdminAction::WithdrawToken)?;

        let amount = ledger.balance_of(asset, &self.config.address);
        ledger.transfer(asset, &self.config.address, beneficiary, amount)?;

        info!(%asset, %beneficiary, %amount, "Token withdrawn");
        Ok(amount)
    }

    // ========================================================================
    // FEES
    // ========================================================================

    /// Quote the fee for a message under the current gas limit.
    ///
    /// Does not consult the whitelist; transport errors are returned as-is.
    pub fn fee_for(
        &self,
        destination: ChainSelector,
        receiver: Address,
        payload: &[u8],
        token: AssetId,
        amount: U256,
        fee_token: AssetId,
    ) -> Result<U256, DispatcherError> {
        let message = Message::new(
            destination,
            receiver,
            payload.to_vec(),
            token,
            amount,
            fee_token,
        );
        let fee = self.transport.get_fee(&message, self.gas_limit_override())?;

        debug!(%destination, %fee, gas_limit = self.fixed_gas_limit, "Fee quoted");
        Ok(fee)
    }

    // ========================================================================
    // SENDING
    // ========================================================================

    /// Send `amount` of `token` plus `payload` to the whitelisted gateway on `destination`.
    ///
    /// The caller pays the bridged amount and the fee (in the fee token) and
    /// must have approved the dispatcher for both. A zero amount is refused
    /// before anything is charged. Either every transfer and
    /// the transport submission happen, or none does.
    #[allow(clippy::too_many_arguments)]
    pub fn send_message_pay_link(
        &mut self,
        caller: &Address,
        ledger: &mut dyn TokenLedger,
        destination: ChainSelector,
        receiver: Address,
        payload: Vec<u8>,
        token: AssetId,
        amount: U256,
    ) -> Result<MessageId, DispatcherError> {
        let result = self.try_send(caller, ledger, destination, receiver, payload, token, amount);

        if let Err(err) = &result {
            self.stats.messages_rejected += 1;
            warn!(%destination, %receiver, error = %err, "Send rejected");
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn try_send(
        &mut self,
        caller: &Address,
        ledger: &mut dyn TokenLedger,
        destination: ChainSelector,
        receiver: Address,
        payload: Vec<u8>,
        token: AssetId,
        amount: U256,
    ) -> Result<MessageId, DispatcherError> {
        self.destinations.check(destination, &receiver)?;

        // The gateway settles exactly one non-empty token amount
        if amount.is_zero() {
            return Err(DispatcherError::ZeroAmount);
        }

        let fee_token = self.config.fee_token;
        let message = Message::new(destination, receiver, payload, token, amount, fee_token);
        let gas_limit = self.gas_limit_override();
        let fee = self.transport.get_fee(&message, gas_limit)?;

        let this = self.config.address;
        let router = self.transport.address();
        let transport = Arc::clone(&self.transport);
        let outbound = message.clone();

        let message_id = atomically(ledger, |ledger| -> Result<MessageId, DispatcherError> {
            ledger.transfer_from(&token, &this, caller, &this, amount)?;
            ledger.transfer_from(&fee_token, &this, caller, &this, fee)?;

            if token == fee_token {
                let total = amount.checked_add(fee).ok_or(LedgerError::BalanceOverflow)?;
                ledger.approve(&token, &this, &router, total)?;
            } else {
                ledger.approve(&token, &this, &router, amount)?;
                ledger.approve(&fee_token, &this, &router, fee)?;
            }

            Ok(transport.send(ledger, &this, outbound, gas_limit)?)
        })?;

        self.stats.messages_sent += 1;
        self.stats.total_fees_paid = self.stats.total_fees_paid.saturating_add(fee);

        info!(%message_id, %destination, %receiver, %token, %amount, %fee, "Message sent");

        self.events.push(DispatcherEvent::MessageSent {
            message_id,
            destination,
            receiver,
            payload: message.payload().to_vec(),
            token,
            amount,
            fee_token,
            fee,
        });

        Ok(message_id)
    }

    fn gas_limit_override(&self) -> Option<u64> {
        (self.fixed_gas_limit > 0).then_some(self.fixed_gas_limit)
    }

    // ========================================================================
    // STATE
    // ========================================================================

    /// Snapshot the durable state
    pub fn state(&self) -> DispatcherState {
        DispatcherState {
            destinations: self.destinations.clone(),
            fixed_gas_limit: self.fixed_gas_limit,
        }
    }

    /// Replace the durable state, e.g. after loading it from storage
    pub fn restore_state(&mut self, state: DispatcherState) {
        self.destinations = state.destinations;
        self.fixed_gas_limit = state.fixed_gas_limit;
    }

    /// Poll for events (clears the event queue)
    pub fn poll_events(&mut self) -> Vec<DispatcherEvent> {
        std::mem::take(&mut self.events)
    }

    /// Get statistics
    pub fn stats(&self) -> &DispatcherStats {
        &self.stats
    }
}
