// Bridge error taxonomy
// Every module error collapses into one of these kinds at the crate boundary

use crate::auth::{AuthError, WhitelistError};
use crate::dispatcher::DispatcherError;
use crate::gateway::GatewayError;
use crate::ledger::LedgerError;
use crate::message::CodecError;
use crate::relay::RelayerError;
use crate::settlement::SwapError;
use crate::storage::StoreError;
use crate::transport::TransportError;
use thiserror::Error;

/// Crate-level error kinds
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not whitelisted: {0}")]
    NotWhitelisted(String),

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Delivery failure: {0}")]
    DeliveryFailure(String),

    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    #[error("Swap failed: {0}")]
    SwapFailed(String),

    #[error("Message already processed: {0}")]
    AlreadyProcessed(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Only transient delivery problems are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DeliveryFailure(_))
    }
}

impl From<AuthError> for BridgeError {
    fn from(err: AuthError) -> Self {
        Self::Unauthorized(err.to_string())
    }
}

impl From<WhitelistError> for BridgeError {
    fn from(err: WhitelistError) -> Self {
        Self::NotWhitelisted(err.to_string())
    }
}

impl From<LedgerError> for BridgeError {
    fn from(err: LedgerError) -> Self {
        if err.is_insufficient_funds() {
            Self::InsufficientFunds(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl From<CodecError> for BridgeError {
    fn from(err: CodecError) -> Self {
        Self::DecodeFailure(err.to_string())
    }
}

impl From<TransportError> for BridgeError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Payment(ledger) => ledger.into(),
            TransportError::InvalidConfig(msg) => Self::InvalidConfig(msg),
            other => Self::DeliveryFailure(other.to_string()),
        }
    }
}

impl From<DispatcherError> for BridgeError {
    fn from(err: DispatcherError) -> Self {
        match err {
            DispatcherError::Forbidden(e) => e.into(),
            DispatcherError::NotWhitelisted(e) => e.into(),
            DispatcherError::InsufficientFunds(e) => Self::InsufficientFunds(e.to_string()),
            DispatcherError::ZeroAmount => Self::InvalidAmount(err.to_string()),
            DispatcherError::Transport(e) => e.into(),
            DispatcherError::Ledger(e) => e.into(),
            DispatcherError::InvalidConfig(msg) => Self::InvalidConfig(msg),
            DispatcherError::DeserializationFailed => Self::Internal(err.to_string()),
        }
    }
}

impl From<SwapError> for BridgeError {
    fn from(err: SwapError) -> Self {
        match err {
            SwapError::Forbidden(e) => e.into(),
            SwapError::Ledger(e) if e.is_insufficient_funds() => {
                Self::InsufficientFunds(e.to_string())
            }
            other => Self::SwapFailed(other.to_string()),
        }
    }
}

impl From<GatewayError> for BridgeError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Forbidden(e) => e.into(),
            GatewayError::UntrustedCaller { .. } => Self::Unauthorized(err.to_string()),
            GatewayError::NotWhitelisted(e) => e.into(),
            GatewayError::Decode(e) => e.into(),
            GatewayError::InvalidTokenAmounts(_) => Self::DecodeFailure(err.to_string()),
            GatewayError::NoSettlement(_) => Self::SwapFailed(err.to_string()),
            GatewayError::Swap(e) => e.into(),
            GatewayError::AlreadyProcessed(id) => Self::AlreadyProcessed(id.to_string()),
            GatewayError::Ledger(e) => e.into(),
            GatewayError::InvalidConfig(msg) => Self::InvalidConfig(msg),
            GatewayError::DeserializationFailed => Self::Internal(err.to_string()),
        }
    }
}

impl From<RelayerError> for BridgeError {
    fn from(err: RelayerError) -> Self {
        match err {
            RelayerError::AlreadyProcessed(id) => Self::AlreadyProcessed(id.to_string()),
            RelayerError::InvalidConfig(msg) => Self::InvalidConfig(msg),
            other => Self::DeliveryFailure(other.to_string()),
        }
    }
}

impl From<StoreError> for BridgeError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}
