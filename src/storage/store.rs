// BridgeStore - Persistent key-value storage using sled
//
// Provides typed access for storing:
// - Operator that owns the bridge components
// - Dispatcher destination whitelist and gas limit
// - Gateway source whitelist
// - Swapper rate table
// - Labelled ledger snapshots

use crate::dispatcher::{DispatcherError, DispatcherState};
use crate::gateway::{GatewayError, GatewayState};
use crate::ledger::{InMemoryLedger, LedgerError};
use crate::settlement::{FixedRates, SwapError};
use alloy_primitives::Address;
use std::path::Path;
use thiserror::Error;

/// Key prefixes for organizing data
mod keys {
    pub const OWNER: &[u8] = b"bridge:owner";
    pub const DISPATCHER_STATE: &[u8] = b"dispatcher:state";
    pub const GATEWAY_STATE: &[u8] = b"gateway:state";
    pub const SWAP_RATES: &[u8] = b"swapper:rates";
    pub const LEDGER_PREFIX: &[u8] = b"ledger:";
}

/// Errors from storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open database: {0}")]
    OpenFailed(String),

    #[error("Database operation failed: {0}")]
    DatabaseError(String),

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("Flush failed: {0}")]
    FlushFailed(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::DatabaseError(err.to_string())
    }
}

/// Statistics about the storage
#[derive(Clone, Debug)]
pub struct StorageStats {
    /// Number of keys in the database
    pub key_count: usize,
    /// Approximate disk size in bytes
    pub disk_size_bytes: u64,
}

/// Persistent store for bridge configuration and balances
///
/// Writes are durable after `flush`.
pub struct BridgeStore {
    db: sled::Db,
}

impl BridgeStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::OpenFailed(e.to_string()))?;
        Ok(Self { db })
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.db.is_empty())
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db
            .flush()
            .map_err(|e| StoreError::FlushFailed(e.to_string()))?;
        Ok(())
    }

    pub fn stats(&self) -> Result<StorageStats, StoreError> {
        Ok(StorageStats {
            key_count: self.db.len(),
            disk_size_bytes: self.db.size_on_disk().unwrap_or(0),
        })
    }

    // ========================================================================
    // RAW KEY-VALUE OPERATIONS
    // ========================================================================

    pub fn put_raw(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.db.insert(key, value)?;
        Ok(())
    }

    pub fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    pub fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.db.remove(key)?;
        Ok(())
    }

    /// List all keys with a given prefix
    pub fn list_keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, StoreError> {
        let mut keys = Vec::new();
        for result in self.db.scan_prefix(prefix) {
            let (key, _) = result?;
            keys.push(key.to_vec());
        }
        Ok(keys)
    }

    // ========================================================================
    // OWNERSHIP
    // ========================================================================

    pub fn save_owner(&self, owner: &Address) -> Result<(), StoreError> {
        self.put_raw(keys::OWNER, owner.as_slice())
    }

    pub fn load_owner(&self) -> Result<Option<Address>, StoreError> {
        match self.get_raw(keys::OWNER)? {
            Some(bytes) => {
                if bytes.len() != 20 {
                    return Err(StoreError::DeserializationFailed(
                        "Invalid owner address length".to_string(),
                    ));
                }
                Ok(Some(Address::from_slice(&bytes)))
            }
            None => Ok(None),
        }
    }

    /// The stored owner, or `claimant` if the store has none yet
    pub fn get_or_claim_owner(&self, claimant: &Address) -> Result<Address, StoreError> {
        if let Some(owner) = self.load_owner()? {
            return Ok(owner);
        }

        self.save_owner(claimant)?;
        Ok(*claimant)
    }

    // ========================================================================
    // COMPONENT STATE
    // ========================================================================

    pub fn save_dispatcher_state(&self, state: &DispatcherState) -> Result<(), StoreError> {
        self.put_raw(keys::DISPATCHER_STATE, &state.to_bytes())
    }

    pub fn load_dispatcher_state(&self) -> Result<Option<DispatcherState>, StoreError> {
        match self.get_raw(keys::DISPATCHER_STATE)? {
            Some(bytes) => {
                let state = DispatcherState::from_bytes(&bytes).map_err(|e: DispatcherError| {
                    StoreError::DeserializationFailed(e.to_string())
                })?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    pub fn save_gateway_state(&self, state: &GatewayState) -> Result<(), StoreError> {
        self.put_raw(keys::GATEWAY_STATE, &state.to_bytes())
    }

    pub fn load_gateway_state(&self) -> Result<Option<GatewayState>, StoreError> {
        match self.get_raw(keys::GATEWAY_STATE)? {
            Some(bytes) => {
                let state = GatewayState::from_bytes(&bytes).map_err(|e: GatewayError| {
                    StoreError::DeserializationFailed(e.to_string())
                })?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    pub fn save_swap_rates(&self, rates: &FixedRates) -> Result<(), StoreError> {
        self.put_raw(keys::SWAP_RATES, &rates.to_bytes())
    }

    pub fn load_swap_rates(&self) -> Result<Option<FixedRates>, StoreError> {
        match self.get_raw(keys::SWAP_RATES)? {
            Some(bytes) => {
                let rates = FixedRates::from_bytes(&bytes)
                    .map_err(|e: SwapError| StoreError::DeserializationFailed(e.to_string()))?;
                Ok(Some(rates))
            }
            None => Ok(None),
        }
    }

    // ========================================================================
    // LEDGER PERSISTENCE
    // ========================================================================

    /// Save a ledger under a label, one per simulated chain
    pub fn save_ledger(&self, label: &str, ledger: &InMemoryLedger) -> Result<(), StoreError> {
        let key = [keys::LEDGER_PREFIX, label.as_bytes()].concat();
        self.put_raw(&key, &ledger.to_bytes())
    }

    pub fn load_ledger(&self, label: &str) -> Result<Option<InMemoryLedger>, StoreError> {
        let key = [keys::LEDGER_PREFIX, label.as_bytes()].concat();
        match self.get_raw(&key)? {
            Some(bytes) => {
                let ledger = InMemoryLedger::from_bytes(&bytes)
                    .map_err(|e: LedgerError| StoreError::DeserializationFailed(e.to_string()))?;
                Ok(Some(ledger))
            }
            None => Ok(None),
        }
    }

    /// Labels of every saved ledger
    pub fn ledger_labels(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .list_keys_with_prefix(keys::LEDGER_PREFIX)?
            .into_iter()
            .map(|key| String::from_utf8_lossy(&key[keys::LEDGER_PREFIX.len()..]).into_owned())
            .collect())
    }
}
