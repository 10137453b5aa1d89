// Store Tests
// Tests for the sled key-value store wrapper

use alloy_primitives::{Address, U256};
use chainbridge::auth::{DestinationWhitelist, SourceWhitelist};
use chainbridge::dispatcher::DispatcherState;
use chainbridge::gateway::GatewayState;
use chainbridge::ledger::{InMemoryLedger, TokenLedger};
use chainbridge::message::{AssetId, ChainSelector};
use chainbridge::settlement::{FixedRates, SwapRate};
use chainbridge::storage::{BridgeStore, StoreError};
use tempfile::TempDir;

fn token() -> AssetId {
    AssetId::new(Address::repeat_byte(0xaa))
}

// ============================================================================
// STORE CREATION AND BASIC OPERATIONS
// ============================================================================

#[test]
fn test_store_open_new() {
    let temp_dir = TempDir::new().unwrap();
    let store = BridgeStore::open(temp_dir.path()).unwrap();

    assert!(store.is_empty().unwrap());
}

#[test]
fn test_store_open_existing() {
    let temp_dir = TempDir::new().unwrap();

    {
        let store = BridgeStore::open(temp_dir.path()).unwrap();
        store.put_raw(b"test_key", b"test_value").unwrap();
        store.flush().unwrap();
    }

    // Reopen and verify
    {
        let store = BridgeStore::open(temp_dir.path()).unwrap();
        let value = store.get_raw(b"test_key").unwrap();
        assert_eq!(value, Some(b"test_value".to_vec()));
    }
}

#[test]
fn test_store_delete_and_overwrite() {
    let temp_dir = TempDir::new().unwrap();
    let store = BridgeStore::open(temp_dir.path()).unwrap();

    store.put_raw(b"key", b"value1").unwrap();
    store.put_raw(b"key", b"value2").unwrap();
    assert_eq!(store.get_raw(b"key").unwrap(), Some(b"value2".to_vec()));

    store.delete(b"key").unwrap();
    assert!(store.get_raw(b"key").unwrap().is_none());
}

#[test]
fn test_list_keys_with_prefix() {
    let temp_dir = TempDir::new().unwrap();
    let store = BridgeStore::open(temp_dir.path()).unwrap();

    store.put_raw(b"a:1", b"x").unwrap();
    store.put_raw(b"a:2", b"x").unwrap();
    store.put_raw(b"b:1", b"x").unwrap();

    assert_eq!(store.list_keys_with_prefix(b"a:").unwrap().len(), 2);
    assert_eq!(store.stats().unwrap().key_count, 3);
}

// ============================================================================
// OWNERSHIP
// ============================================================================

#[test]
fn test_owner_claimed_once() {
    let temp_dir = TempDir::new().unwrap();
    let first = Address::repeat_byte(1);
    let second = Address::repeat_byte(2);

    {
        let store = BridgeStore::open(temp_dir.path()).unwrap();
        assert_eq!(store.load_owner().unwrap(), None);
        assert_eq!(store.get_or_claim_owner(&first).unwrap(), first);
        store.flush().unwrap();
    }

    let store = BridgeStore::open(temp_dir.path()).unwrap();
    assert_eq!(store.get_or_claim_owner(&second).unwrap(), first);
    assert_eq!(store.load_owner().unwrap(), Some(first));
}

#[test]
fn test_owner_with_bad_length() {
    let temp_dir = TempDir::new().unwrap();
    let store = BridgeStore::open(temp_dir.path()).unwrap();

    store.put_raw(b"bridge:owner", &[1, 2, 3]).unwrap();

    assert!(matches!(
        store.load_owner(),
        Err(StoreError::DeserializationFailed(_))
    ));
}

// ============================================================================
// COMPONENT STATE
// ============================================================================

#[test]
fn test_component_state_persists_across_reopens() {
    let temp_dir = TempDir::new().unwrap();
    let gateway = Address::repeat_byte(0x6a);
    let sender = Address::repeat_byte(0xd1);

    let mut destinations = DestinationWhitelist::new();
    destinations.upsert(ChainSelector::MUMBAI, gateway);
    let dispatcher_state = DispatcherState {
        destinations,
        fixed_gas_limit: 250_000,
    };

    let mut sources = SourceWhitelist::new();
    sources.allow(ChainSelector::SEPOLIA, sender);
    let gateway_state = GatewayState { sources };

    let mut rates = FixedRates::new();
    rates.set(
        token(),
        AssetId::new(Address::repeat_byte(0xda)),
        SwapRate::new(U256::from(1000), U256::from(1)).unwrap(),
    );

    {
        let store = BridgeStore::open(temp_dir.path()).unwrap();
        store.save_dispatcher_state(&dispatcher_state).unwrap();
        store.save_gateway_state(&gateway_state).unwrap();
        store.save_swap_rates(&rates).unwrap();
        store.flush().unwrap();
    }

    let store = BridgeStore::open(temp_dir.path()).unwrap();
    assert_eq!(store.load_dispatcher_state().unwrap(), Some(dispatcher_state));
    assert_eq!(store.load_gateway_state().unwrap(), Some(gateway_state));
    assert_eq!(store.load_swap_rates().unwrap(), Some(rates));
}

#[test]
fn test_missing_state_is_none() {
    let temp_dir = TempDir::new().unwrap();
    let store = BridgeStore::open(temp_dir.path()).unwrap();

    assert!(store.load_dispatcher_state().unwrap().is_none());
    assert!(store.load_gateway_state().unwrap().is_none());
    assert!(store.load_swap_rates().unwrap().is_none());
    assert!(store.load_ledger("sepolia").unwrap().is_none());
}

#[test]
fn test_corrupt_state_reports_error() {
    let temp_dir = TempDir::new().unwrap();
    let store = BridgeStore::open(temp_dir.path()).unwrap();

    store.put_raw(b"dispatcher:state", &[0xff, 0xff, 0xff]).unwrap();

    assert!(matches!(
        store.load_dispatcher_state(),
        Err(StoreError::DeserializationFailed(_))
    ));
}

// ============================================================================
// LEDGER PERSISTENCE
// ============================================================================

#[test]
fn test_ledgers_saved_by_label() {
    let temp_dir = TempDir::new().unwrap();
    let holder = Address::repeat_byte(0x01);

    {
        let store = BridgeStore::open(temp_dir.path()).unwrap();
        let mut sepolia = InMemoryLedger::new();
        sepolia.mint(&token(), &holder, U256::from(42)).unwrap();
        store.save_ledger("sepolia", &sepolia).unwrap();
        store.save_ledger("mumbai", &InMemoryLedger::new()).unwrap();
        store.flush().unwrap();
    }

    let store = BridgeStore::open(temp_dir.path()).unwrap();
    let mut labels = store.ledger_labels().unwrap();
    labels.sort();
    assert_eq!(labels, vec!["mumbai".to_string(), "sepolia".to_string()]);

    let sepolia = store.load_ledger("sepolia").unwrap().unwrap();
    assert_eq!(sepolia.balance_of(&token(), &holder), U256::from(42));
}
