// Swapper - Exchanges bridged value for the beneficiary's target asset
// Invoked by the gateway with the received asset; pays out from its own liquidity

use super::pricing::{FixedRates, PricingStrategy, SwapRate};
use crate::auth::{AdminAction, AuthError, AuthorizationPolicy};
use crate::ledger::{atomically, LedgerError, TokenLedger};
use crate::message::AssetId;
use alloy_primitives::{Address, U256};
use thiserror::Error;
use tracing::{info, warn};

// ============================================================================
// SWAP ERROR
// ============================================================================

/// Errors that can occur while configuring or executing a swap
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SwapError {
    #[error("Forbidden: {0}")]
    Forbidden(#[from] AuthError),

    #[error("No swap configured from {token_in} to {token_out}")]
    NoSwapConfigured { token_in: AssetId, token_out: AssetId },

    #[error("Invalid rate: {0}")]
    InvalidRate(String),

    #[error("Cannot swap {0} for itself")]
    IdenticalTokens(AssetId),

    #[error("Swap amount overflowed")]
    Overflow,

    #[error("Insufficient liquidity of {token}: available {available}, required {required}")]
    InsufficientLiquidity {
        token: AssetId,
        available: U256,
        required: U256,
    },

    #[error("Output {amount_out} is below the minimum {min_output}")]
    SlippageExceeded { amount_out: U256, min_output: U256 },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Deserialization failed")]
    DeserializationFailed,
}

// ============================================================================
// SETTLEMENT TRAIT
// ============================================================================

/// One swap request from the gateway
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapOrder {
    pub token_in: AssetId,
    pub amount_in: U256,
    pub token_out: AssetId,
    pub beneficiary: Address,
    pub min_output: U256,
}

/// Destination-side component that turns received value into a payout.
///
/// `settle` pulls `amount_in` from `caller` (who must have approved
/// [`Settlement::address`]) and credits the beneficiary. It is all-or-nothing.
pub trait Settlement: Send {
    fn address(&self) -> Address;

    fn settle(
        &mut self,
        caller: &Address,
        ledger: &mut dyn TokenLedger,
        order: &SwapOrder,
    ) -> Result<U256, SwapError>;
}

// ============================================================================
// SWAPPER
// ============================================================================

/// Statistics about executed swaps
#[derive(Clone, Debug, Default)]
pub struct SwapperStats {
    pub swaps_executed: u64,
    pub swaps_failed: u64,
}

/// Settlement backed by a pricing strategy and the swapper's own balances
pub struct Swapper<P: PricingStrategy = FixedRates> {
    address: Address,
    policy: Box<dyn AuthorizationPolicy>,
    pricing: P,
    stats: SwapperStats,
}

impl Swapper<FixedRates> {
    /// Create a swapper with an empty fixed-rate table
    pub fn new(address: Address, policy: Box<dyn AuthorizationPolicy>) -> Self {
        Self::with_pricing(address, policy, FixedRates::new())
    }

    /// Owner-only: `amount_in_ref` of `token_in` buys `amount_out_ref` of `token_out`
    pub fn set_swap(
        &mut self,
        caller: &Address,
        token_in: AssetId,
        token_out: AssetId,
        amount_in_ref: U256,
        amount_out_ref: U256,
    ) -> Result<(), SwapError> {
        self.policy.authorize(caller, AdminAction::SetSwap)?;
        if token_in == token_out {
            return Err(SwapError::IdenticalTokens(token_in));
        }

        let rate = SwapRate::new(amount_in_ref, amount_out_ref)?;
        self.pricing.set(token_in, token_out, rate);

        info!(%token_in, %token_out, %amount_in_ref, %amount_out_ref, "Swap rate set");
        Ok(())
    }

    pub fn rates(&self) -> &FixedRates {
        &self.pricing
    }

    /// Replace the rate table, e.g. after loading it from storage
    pub fn restore_rates(&mut self, rates: FixedRates) {
        self.pricing = rates;
    }
}

impl<P: PricingStrategy> Swapper<P> {
    pub fn with_pricing(
        address: Address,
        policy: Box<dyn AuthorizationPolicy>,
        pricing: P,
    ) -> Self {
        Self {
            address,
            policy,
            pricing,
            stats: SwapperStats::default(),
        }
    }

    pub fn pricing(&self) -> &P {
        &self.pricing
    }

    /// Output the current pricing gives for `amount_in`
    pub fn quote(
        &self,
        token_in: &AssetId,
        token_out: &AssetId,
        amount_in: U256,
    ) -> Result<U256, SwapError> {
        self.pricing.quote(token_in, token_out, amount_in)
    }

    /// Owner-only: move the swapper's whole balance of `asset` to `beneficiary`
    pub fn withdraw_token(
        &mut self,
        caller: &Address,
        ledger: &mut dyn TokenLedger,
        asset: &AssetId,
        beneficiary: &Address,
    ) -> Result<U256, SwapError> {
        self.policy.authorize(caller, AdminAction::WithdrawToken)?;

        let amount = ledger.balance_of(asset, &self.address);
        ledger.transfer(asset, &self.address, beneficiary, amount)?;
        Ok(amount)
    }

    pub fn stats(&self) -> &SwapperStats {
        &self.stats
    }

    fn execute(
        &self,
        caller: &Address,
        ledger: &mut dyn TokenLedger,
        order: &SwapOrder,
    ) -> Result<U256, SwapError> {
        // Liquidity is measured after the pull, so the pair must be distinct
        if order.token_in == order.token_out {
            return Err(SwapError::IdenticalTokens(order.token_in));
        }

        let amount_out = self
            .pricing
            .quote(&order.token_in, &order.token_out, order.amount_in)?;

        if amount_out < order.min_output {
            return Err(SwapError::SlippageExceeded {
                amount_out,
                min_output: order.min_output,
            });
        }

        let this = self.address;
        atomically(ledger, |ledger| -> Result<U256, SwapError> {
            ledger.transfer_from(&order.token_in, &this, caller, &this, order.amount_in)?;

            let available = ledger.balance_of(&order.token_out, &this);
            if available < amount_out {
                return Err(SwapError::InsufficientLiquidity {
                    token: order.token_out,
                    available,
                    required: amount_out,
                });
            }

            ledger.transfer(&order.token_out, &this, &order.beneficiary, amount_out)?;
            Ok(amount_out)
        })
    }
}

impl<P: PricingStrategy> Settlement for Swapper<P> {
    fn address(&self) -> Address {
        self.address
    }

    fn settle(
        &mut self,
        caller: &Address,
        ledger: &mut dyn TokenLedger,
        order: &SwapOrder,
    ) -> Result<U256, SwapError> {
        match self.execute(caller, ledger, order) {
            Ok(amount_out) => {
                self.stats.swaps_executed += 1;
                info!(
                    token_in = %order.token_in,
                    amount_in = %order.amount_in,
                    token_out = %order.token_out,
                    %amount_out,
                    beneficiary = %order.beneficiary,
                    "Swap executed"
                );
                Ok(amount_out)
            }
            Err(err) => {
                self.stats.swaps_failed += 1;
                warn!(error = %err, "Swap failed");
                Err(err)
            }
        }
    }
}
