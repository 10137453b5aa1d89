// Relayer - Delivery half of the transport
// Drains the transport outbox, delivers each envelope exactly once, and retries transient failures

use super::target::DeliveryTarget;
use crate::error::BridgeError;
use crate::message::{ChainSelector, MessageId};
use crate::transport::{Envelope, LocalTransport};
use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// DELIVERY STATUS
// ============================================================================

/// Where a message is in its lifecycle once the transport has accepted it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryStatus {
    /// Fee collected, waiting in the transport outbox
    FeeCharged,
    /// Taken by the relayer, delivery in progress
    InTransit,
    /// Delivered and paid out
    Settled,
    /// Refused by the destination; never replayed
    Rejected,
    /// Transient failures exhausted every retry; may be requeued
    Failed,
}

impl DeliveryStatus {
    /// No further delivery will be attempted
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Settled | Self::Rejected)
    }
}

// ============================================================================
// DELIVERY RECEIPT
// ============================================================================

/// Outcome of relaying one message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    message_id: MessageId,
    status: DeliveryStatus,
    attempts: u32,
    amount_out: Option<U256>,
    error: Option<String>,
    completed_at: DateTime<Utc>,
}

impl DeliveryReceipt {
    fn settled(message_id: MessageId, amount_out: U256, attempts: u32) -> Self {
        Self {
            message_id,
            status: DeliveryStatus::Settled,
            attempts,
            amount_out: Some(amount_out),
            error: None,
            completed_at: Utc::now(),
        }
    }

    fn unsettled(
        message_id: MessageId,
        status: DeliveryStatus,
        error: String,
        attempts: u32,
    ) -> Self {
        Self {
            message_id,
            status,
            attempts,
            amount_out: None,
            error: Some(error),
            completed_at: Utc::now(),
        }
    }

    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    pub fn status(&self) -> DeliveryStatus {
        self.status
    }

    pub fn is_settled(&self) -> bool {
        self.status == DeliveryStatus::Settled
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Amount paid to the beneficiary (if settled)
    pub fn amount_out(&self) -> Option<U256> {
        self.amount_out
    }

    /// Last error seen (if not settled)
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

// ============================================================================
// RELAYER EVENTS
// ============================================================================

/// Events emitted by the relayer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayerEvent {
    /// An envelope was taken from the outbox
    DeliveryStarted {
        message_id: MessageId,
        destination: ChainSelector,
    },
    /// The destination accepted and settled the message
    DeliverySettled {
        message_id: MessageId,
        amount_out: U256,
        attempts: u32,
    },
    /// The destination refused the message
    DeliveryRejected { message_id: MessageId, error: String },
    /// Every retry failed
    DeliveryFailed {
        message_id: MessageId,
        error: String,
        attempts: u32,
    },
}

// ============================================================================
// RELAYER CONFIG
// ============================================================================

/// Configuration for the relayer
#[derive(Clone, Debug)]
pub struct RelayerConfig {
    /// Maximum number of retry attempts after the first
    pub max_retries: u32,
    /// Delay between retries in milliseconds
    pub retry_delay_ms: u64,
    /// Timeout for one delivery attempt in seconds
    pub timeout_secs: u64,
}

impl RelayerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_delay_ms(mut self, ms: u64) -> Self {
        self.retry_delay_ms = ms;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), RelayerError> {
        if self.timeout_secs == 0 {
            return Err(RelayerError::InvalidConfig(
                "timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 500,
            timeout_secs: 30,
        }
    }
}

// ============================================================================
// RELAYER STATS
// ============================================================================

/// Statistics about relayed messages
#[derive(Clone, Debug, Default)]
pub struct RelayerStats {
    pub messages_relayed: u64,
    pub messages_settled: u64,
    pub messages_rejected: u64,
    pub messages_failed: u64,
    pub total_attempts: u64,
}

// ============================================================================
// RELAYER ERROR
// ============================================================================

/// Errors that keep the relayer from attempting a delivery
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayerError {
    #[error("No delivery target for receiver {receiver} on chain {destination}")]
    NoTarget {
        destination: ChainSelector,
        receiver: Address,
    },

    #[error("Message {0} already processed")]
    AlreadyProcessed(MessageId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// ============================================================================
// RELAYER
// ============================================================================

/// Moves envelopes from one transport's outbox to their destination targets
pub struct Relayer {
    config: RelayerConfig,
    transport: Arc<LocalTransport>,
    /// (destination chain, receiver) -> target
    targets: HashMap<(ChainSelector, Address), Arc<dyn DeliveryTarget>>,
    /// Ids that reached a final status; never delivered again
    processed: HashSet<MessageId>,
    statuses: HashMap<MessageId, DeliveryStatus>,
    receipts: HashMap<MessageId, DeliveryReceipt>,
    /// Envelopes whose retries ran out
    failed: Vec<Envelope>,
    /// Events queue
    events: Vec<RelayerEvent>,
    /// Statistics
    stats: RelayerStats,
}

impl Relayer {
    pub fn new(
        config: RelayerConfig,
        transport: Arc<LocalTransport>,
    ) -> Result<Self, RelayerError> {
        config.validate()?;

        Ok(Self {
            config,
            transport,
            targets: HashMap::new(),
            processed: HashSet::new(),
            statuses: HashMap::new(),
            receipts: HashMap::new(),
            failed: Vec::new(),
            events: Vec::new(),
            stats: RelayerStats::default(),
        })
    }

    /// Route messages for `receiver` on `destination` to `target`
    pub fn with_target(
        mut self,
        destination: ChainSelector,
        receiver: Address,
        target: Arc<dyn DeliveryTarget>,
    ) -> Self {
        self.add_target(destination, receiver, target);
        self
    }

    pub fn add_target(
        &mut self,
        destination: ChainSelector,
        receiver: Address,
        target: Arc<dyn DeliveryTarget>,
    ) {
        self.targets.insert((destination, receiver), target);
    }

    pub fn has_target(&self, destination: ChainSelector, receiver: &Address) -> bool {
        self.targets.contains_key(&(destination, *receiver))
    }

    pub fn is_processed(&self, message_id: &MessageId) -> bool {
        self.processed.contains(message_id)
    }

    pub fn status(&self, message_id: &MessageId) -> Option<DeliveryStatus> {
        self.statuses.get(message_id).copied()
    }

    pub fn receipt(&self, message_id: &MessageId) -> Option<&DeliveryReceipt> {
        self.receipts.get(message_id)
    }

    /// Number of envelopes whose retries ran out
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Forget receipts and statuses of settled or rejected messages.
    ///
    /// Processed ids are kept, so a pruned message is still never delivered
    /// twice. Returns the number of receipts dropped.
    pub fn prune_receipts(&mut self) -> usize {
        let before = self.receipts.len();
        self.statuses.retain(|_, status| !status.is_final());
        let statuses = &self.statuses;
        self.receipts.retain(|message_id, _| statuses.contains_key(message_id));

        let pruned = before - self.receipts.len();
        if pruned > 0 {
            debug!(pruned, "Pruned final delivery receipts");
        }
        pruned
    }

    /// Drain the transport outbox and deliver everything in it
    pub async fn relay_pending(&mut self) -> Vec<DeliveryReceipt> {
        let envelopes = self.transport.take_pending();
        let mut receipts = Vec::with_capacity(envelopes.len());

        for envelope in envelopes {
            self.statuses
                .entry(*envelope.message_id())
                .or_insert(DeliveryStatus::FeeCharged);

            match self.deliver(envelope.clone()).await {
                Ok(receipt) => receipts.push(receipt),
                Err(RelayerError::AlreadyProcessed(message_id)) => {
                    debug!(%message_id, "Skipping already processed message");
                }
                Err(err) => {
                    warn!(
                        message_id = %envelope.message_id(),
                        error = %err,
                        "Cannot relay message"
                    );
                    self.statuses
                        .insert(*envelope.message_id(), DeliveryStatus::Failed);
                    self.failed.push(envelope);
                }
            }
        }

        receipts
    }

    /// Retry every envelope whose earlier retries ran out
    pub async fn retry_failed(&mut self) -> Vec<DeliveryReceipt> {
        let envelopes = std::mem::take(&mut self.failed);
        let mut receipts = Vec::with_capacity(envelopes.len());

        for envelope in envelopes {
            match self.deliver(envelope.clone()).await {
                Ok(receipt) => receipts.push(receipt),
                Err(RelayerError::AlreadyProcessed(_)) => {}
                Err(_) => self.failed.push(envelope),
            }
        }

        receipts
    }

    /// Deliver one envelope, retrying transient failures.
    ///
    /// A message that settled or was rejected is never delivered again.
    pub async fn deliver(&mut self, envelope: Envelope) -> Result<DeliveryReceipt, RelayerError> {
        let message_id = *envelope.message_id();
        if self.processed.contains(&message_id) {
            return Err(RelayerError::AlreadyProcessed(message_id));
        }

        let target = self
            .targets
            .get(&(envelope.destination(), *envelope.receiver()))
            .cloned()
            .ok_or(RelayerError::NoTarget {
                destination: envelope.destination(),
                receiver: *envelope.receiver(),
            })?;

        self.statuses.insert(message_id, DeliveryStatus::InTransit);
        self.events.push(RelayerEvent::DeliveryStarted {
            message_id,
            destination: envelope.destination(),
        });
        self.stats.messages_relayed += 1;

        let mut attempts = 0u32;
        let last_error = loop {
            attempts += 1;
            self.stats.total_attempts += 1;

            let timeout = Duration::from_secs(self.config.timeout_secs);
            let error = match tokio::time::timeout(timeout, target.deliver(&envelope)).await {
                Ok(Ok(amount_out)) => {
                    return Ok(self.record_settled(message_id, amount_out, attempts));
                }
                Ok(Err(err)) => err,
                Err(_) => BridgeError::DeliveryFailure("Timeout".to_string()),
            };

            if !error.is_retryable() {
                return Ok(self.record_rejected(message_id, error, attempts));
            }

            if attempts > self.config.max_retries {
                break error;
            }

            debug!(%message_id, attempts, error = %error, "Delivery attempt failed, retrying");
            if self.config.retry_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
            }
        };

        warn!(%message_id, attempts, error = %last_error, "Delivery failed");
        self.stats.messages_failed += 1;
        self.statuses.insert(message_id, DeliveryStatus::Failed);
        self.events.push(RelayerEvent::DeliveryFailed {
            message_id,
            error: last_error.to_string(),
            attempts,
        });
        self.failed.push(envelope);

        let receipt = DeliveryReceipt::unsettled(
            message_id,
            DeliveryStatus::Failed,
            last_error.to_string(),
            attempts,
        );
        self.receipts.insert(message_id, receipt.clone());
        Ok(receipt)
    }

    /// Relay until `keep_running` is cleared, polling the outbox every `poll_interval`
    pub async fn run(&mut self, poll_interval: Duration, keep_running: Arc<AtomicBool>) {
        info!("Relayer started");
        while keep_running.load(Ordering::Acquire) {
            self.relay_pending().await;
            tokio::time::sleep(poll_interval).await;
        }
        info!(settled = self.stats.messages_settled, "Relayer stopped");
    }

    fn record_settled(
        &mut self,
        message_id: MessageId,
        amount_out: U256,
        attempts: u32,
    ) -> DeliveryReceipt {
        info!(%message_id, %amount_out, attempts, "Message delivered");

        self.processed.insert(message_id);
        self.statuses.insert(message_id, DeliveryStatus::Settled);
        self.stats.messages_settled += 1;
        self.events.push(RelayerEvent::DeliverySettled {
            message_id,
            amount_out,
            attempts,
        });

        let receipt = DeliveryReceipt::settled(message_id, amount_out, attempts);
        self.receipts.insert(message_id, receipt.clone());
        receipt
    }

    fn record_rejected(
        &mut self,
        message_id: MessageId,
        error: BridgeError,
        attempts: u32,
    ) -> DeliveryReceipt {
        warn!(%message_id, error = %error, "Message rejected by destination");

        self.processed.insert(message_id);
        self.statuses.insert(message_id, DeliveryStatus::Rejected);
        self.stats.messages_rejected += 1;
        self.events.push(RelayerEvent::DeliveryRejected {
            message_id,
            error: error.to_string(),
        });

        let receipt = DeliveryReceipt::unsettled(
            message_id,
            DeliveryStatus::Rejected,
            error.to_string(),
            attempts,
        );
        self.receipts.insert(message_id, receipt.clone());
        receipt
    }

    /// Poll for events (clears the event queue)
    pub fn poll_events(&mut self) -> Vec<RelayerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Get statistics
    pub fn stats(&self) -> &RelayerStats {
        &self.stats
    }
}
