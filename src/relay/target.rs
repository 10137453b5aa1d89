// Delivery targets - Where the relayer hands envelopes on the destination chain
// The gateway target releases pooled tokens and invokes the gateway as the transport

use crate::error::BridgeError;
use crate::gateway::Gateway;
use crate::ledger::{atomically, TokenLedger};
use crate::transport::Envelope;
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// DELIVERY TARGET TRAIT
// ============================================================================

/// Destination-chain endpoint for envelopes
#[async_trait]
pub trait DeliveryTarget: Send + Sync {
    /// Deliver one envelope; returns the amount paid out to the beneficiary
    async fn deliver(&self, envelope: &Envelope) -> Result<U256, BridgeError>;
}

// ============================================================================
// GATEWAY TARGET
// ============================================================================

/// Delivers to an in-process [`Gateway`] over a destination-chain ledger.
///
/// `pool` is the transport's account on the destination chain. It holds the
/// liquidity released to the gateway and is the gateway's trusted caller.
///
/// Delivery is synchronous and never yields, so it always runs to completion
/// and the relayer's per-attempt timeout cannot cut it short. The timeout only
/// bounds targets that await.
pub struct GatewayTarget<L: TokenLedger + 'static> {
    gateway: Arc<Mutex<Gateway>>,
    ledger: Arc<Mutex<L>>,
    pool: Address,
}

impl<L: TokenLedger + 'static> GatewayTarget<L> {
    pub fn new(gateway: Arc<Mutex<Gateway>>, ledger: Arc<Mutex<L>>, pool: Address) -> Self {
        Self {
            gateway,
            ledger,
            pool,
        }
    }

    fn deliver_now(&self, envelope: &Envelope) -> Result<U256, BridgeError> {
        let mut ledger = self.ledger.lock();
        let mut gateway = self.gateway.lock();

        let receiver = *gateway.address();
        let pool = self.pool;
        let inbound = envelope.to_inbound();

        atomically(&mut *ledger, |ledger| -> Result<U256, BridgeError> {
            for token_amount in envelope.token_amounts() {
                ledger.transfer(&token_amount.token, &pool, &receiver, token_amount.amount)?;
            }
            Ok(gateway.ccip_receive(&pool, ledger, &inbound)?)
        })
    }
}

#[async_trait]
impl<L: TokenLedger + 'static> DeliveryTarget for GatewayTarget<L> {
    async fn deliver(&self, envelope: &Envelope) -> Result<U256, BridgeError> {
        // Not moved to a blocking task: an abandoned attempt could still settle
        self.deliver_now(envelope)
    }
}

// ============================================================================
// MOCK DELIVERY TARGET
// ============================================================================

/// Mock implementation of DeliveryTarget for testing
pub struct MockDeliveryTarget {
    should_succeed: bool,
    failure: Option<BridgeError>,
    delay_ms: u64,
    failures_before_success: AtomicUsize,
    call_count: AtomicUsize,
}

impl MockDeliveryTarget {
    /// Create a new mock target (defaults to failure)
    pub fn new() -> Self {
        Self {
            should_succeed: false,
            failure: None,
            delay_ms: 0,
            failures_before_success: AtomicUsize::new(0),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn with_success(mut self) -> Self {
        self.should_succeed = true;
        self
    }

    /// Always fail with a transient delivery failure
    pub fn with_failure(mut self, message: &str) -> Self {
        self.should_succeed = false;
        self.failure = Some(BridgeError::DeliveryFailure(message.to_string()));
        self
    }

    /// Always fail with the given error
    pub fn with_rejection(mut self, error: BridgeError) -> Self {
        self.should_succeed = false;
        self.failure = Some(error);
        self
    }

    /// Add a delay before responding
    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    /// Fail N times, then succeed
    pub fn with_failures_then_success(mut self, failures: usize) -> Self {
        self.should_succeed = true;
        self.failures_before_success = AtomicUsize::new(failures);
        self
    }

    /// Number of delivery attempts seen so far
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn failure(&self) -> BridgeError {
        self.failure
            .clone()
            .unwrap_or_else(|| BridgeError::DeliveryFailure("Mock failure".to_string()))
    }
}

impl Default for MockDeliveryTarget {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliveryTarget for MockDeliveryTarget {
    async fn deliver(&self, envelope: &Envelope) -> Result<U256, BridgeError> {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }

        let call_num = self.call_count.fetch_add(1, Ordering::SeqCst);
        let failures_remaining = self.failures_before_success.load(Ordering::SeqCst);

        if failures_remaining > 0 && call_num < failures_remaining {
            return Err(self.failure());
        }

        if self.should_succeed {
            Ok(envelope
                .token_amounts()
                .iter()
                .fold(U256::ZERO, |total, t| total.saturating_add(t.amount)))
        } else {
            Err(self.failure())
        }
    }
}
