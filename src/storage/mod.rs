// Storage module - PERSISTENCE
// Handles persistent key-value storage using sled

mod store;

pub use store::{BridgeStore, StorageStats, StoreError};
