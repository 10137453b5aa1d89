// Payload Tests
// Tests for the ABI-encoded settlement instruction carried in messages

use alloy_primitives::{Address, U256};
use chainbridge::message::{AssetId, CodecError, SettlementInstruction, INSTRUCTION_LEN};

const BENEFICIARY: &str = "1cc86b9b67c93b8fa411554db761f68979e7995a";
const TARGET: &str = "f1e3a5842eeef51f2967b3f05d45dd4f4205ff40";

// (beneficiary, targetAsset, minOutput = 1000)
const ENCODED: &str = "0x\
    0000000000000000000000001cc86b9b67c93b8fa411554db761f68979e7995a\
    000000000000000000000000f1e3a5842eeef51f2967b3f05d45dd4f4205ff40\
    00000000000000000000000000000000000000000000000000000000000003e8";

fn encoded_bytes() -> Vec<u8> {
    hex::decode(ENCODED.trim_start_matches("0x")).unwrap()
}

fn address(hex_str: &str) -> Address {
    hex_str.parse().unwrap()
}

// ============================================================================
// DECODING
// ============================================================================

#[test]
fn test_decode_known_payload() {
    let instruction = SettlementInstruction::decode(&encoded_bytes()).unwrap();

    assert_eq!(instruction.beneficiary, address(BENEFICIARY));
    assert_eq!(instruction.target_asset, AssetId::new(address(TARGET)));
    assert_eq!(instruction.min_output, U256::from(1000));
}

#[test]
fn test_encode_matches_known_payload() {
    let instruction = SettlementInstruction::new(
        address(BENEFICIARY),
        AssetId::new(address(TARGET)),
        U256::from(1000),
    );

    assert_eq!(instruction.encode(), encoded_bytes());
}

#[test]
fn test_encoded_length_is_three_words() {
    let instruction = SettlementInstruction::new(
        Address::repeat_byte(1),
        AssetId::new(Address::repeat_byte(2)),
        U256::MAX,
    );

    assert_eq!(instruction.encode().len(), INSTRUCTION_LEN);
    assert_eq!(INSTRUCTION_LEN, 96);
}

#[test]
fn test_decode_ignores_trailing_bytes() {
    let mut bytes = encoded_bytes();
    bytes.extend_from_slice(&[0xff; 40]);

    let instruction = SettlementInstruction::decode(&bytes).unwrap();

    assert_eq!(instruction.min_output, U256::from(1000));
}

// ============================================================================
// MALFORMED PAYLOADS
// ============================================================================

#[test]
fn test_decode_rejects_short_payload() {
    let bytes = encoded_bytes();
    let result = SettlementInstruction::decode(&bytes[..95]);

    assert_eq!(
        result,
        Err(CodecError::PayloadTooShort {
            expected: 96,
            actual: 95
        })
    );
}

#[test]
fn test_decode_rejects_empty_payload() {
    assert!(matches!(
        SettlementInstruction::decode(&[]),
        Err(CodecError::PayloadTooShort { actual: 0, .. })
    ));
}

#[test]
fn test_decode_rejects_dirty_address_padding() {
    let mut bytes = encoded_bytes();
    bytes[0] = 0x01;

    assert!(matches!(
        SettlementInstruction::decode(&bytes),
        Err(CodecError::DecodeError(_))
    ));
}
