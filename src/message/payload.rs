// Settlement instructions carried in the message payload
//
// Layout is the Solidity ABI encoding of (address, address, uint256):
// three 32-byte words, addresses left-padded with zeros.

use super::{AssetId, CodecError};
use alloy_primitives::{Address, U256};
use alloy_sol_types::SolType;

mod abi {
    alloy_sol_types::sol! {
        struct Instruction {
            address beneficiary;
            address targetAsset;
            uint256 minOutput;
        }
    }
}

/// Encoded size of an instruction
pub const INSTRUCTION_LEN: usize = 96;

/// What the destination side should do with the bridged value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettlementInstruction {
    /// Account credited with the swapped asset
    pub beneficiary: Address,
    /// Asset the bridged value is exchanged into
    pub target_asset: AssetId,
    /// Smallest acceptable output amount
    pub min_output: U256,
}

impl SettlementInstruction {
    pub fn new(beneficiary: Address, target_asset: AssetId, min_output: U256) -> Self {
        Self {
            beneficiary,
            target_asset,
            min_output,
        }
    }

    /// ABI-encode into the 96-byte payload form
    pub fn encode(&self) -> Vec<u8> {
        let value = abi::Instruction {
            beneficiary: self.beneficiary,
            targetAsset: self.target_asset.address(),
            minOutput: self.min_output,
        };
        <abi::Instruction as SolType>::abi_encode(&value)
    }

    /// Decode the leading three words of a payload.
    ///
    /// Anything after the first 96 bytes is ignored. Address words with
    /// non-zero padding are rejected.
    pub fn decode(payload: &[u8]) -> Result<Self, CodecError> {
        if payload.len() < INSTRUCTION_LEN {
            return Err(CodecError::PayloadTooShort {
                expected: INSTRUCTION_LEN,
                actual: payload.len(),
            });
        }

        let value = <abi::Instruction as SolType>::abi_decode(&payload[..INSTRUCTION_LEN], true)
            .map_err(|e| CodecError::DecodeError(e.to_string()))?;

        Ok(Self {
            beneficiary: value.beneficiary,
            target_asset: AssetId::new(value.targetAsset),
            min_output: value.minOutput,
        })
    }
}
