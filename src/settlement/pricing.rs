// Pricing strategies - how much of one asset a given amount of another buys

use super::SwapError;
use crate::message::AssetId;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prices a swap of `amount_in` of `token_in` into `token_out`
pub trait PricingStrategy: Send {
    fn quote(&self, token_in: &AssetId, token_out: &AssetId, amount_in: U256)
        -> Result<U256, SwapError>;
}

/// A fixed exchange rate expressed as a pair of reference amounts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRate {
    amount_in: U256,
    amount_out: U256,
}

impl SwapRate {
    /// `amount_in` of the input asset buys `amount_out` of the output asset
    pub fn new(amount_in: U256, amount_out: U256) -> Result<Self, SwapError> {
        if amount_in.is_zero() {
            return Err(SwapError::InvalidRate(
                "input reference amount must be > 0".to_string(),
            ));
        }
        Ok(Self {
            amount_in,
            amount_out,
        })
    }

    pub fn amount_in(&self) -> U256 {
        self.amount_in
    }

    pub fn amount_out(&self) -> U256 {
        self.amount_out
    }

    /// `amount * amount_out / amount_in`, truncated toward zero
    pub fn apply(&self, amount: U256) -> Result<U256, SwapError> {
        let scaled = amount
            .checked_mul(self.amount_out)
            .ok_or(SwapError::Overflow)?;
        Ok(scaled / self.amount_in)
    }
}

/// Owner-configured table of fixed rates, keyed by (input, output) asset
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedRates {
    rates: BTreeMap<(AssetId, AssetId), SwapRate>,
}

impl FixedRates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a rate, returning the previous one
    pub fn set(
        &mut self,
        token_in: AssetId,
        token_out: AssetId,
        rate: SwapRate,
    ) -> Option<SwapRate> {
        self.rates.insert((token_in, token_out), rate)
    }

    pub fn get(&self, token_in: &AssetId, token_out: &AssetId) -> Option<&SwapRate> {
        self.rates.get(&(*token_in, *token_out))
    }

    pub fn remove(&mut self, token_in: &AssetId, token_out: &AssetId) -> Option<SwapRate> {
        self.rates.remove(&(*token_in, *token_out))
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(AssetId, AssetId), &SwapRate)> {
        self.rates.iter()
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        postcard::to_allocvec(self).unwrap_or_default()
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SwapError> {
        postcard::from_bytes(bytes).map_err(|_| SwapError::DeserializationFailed)
    }
}

impl PricingStrategy for FixedRates {
    fn quote(
        &self,
        token_in: &AssetId,
        token_out: &AssetId,
        amount_in: U256,
    ) -> Result<U256, SwapError> {
        self.get(token_in, token_out)
            .ok_or(SwapError::NoSwapConfigured {
                token_in: *token_in,
                token_out: *token_out,
            })?
            .apply(amount_in)
    }
}
