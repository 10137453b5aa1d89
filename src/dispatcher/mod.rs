// Dispatcher module - THE OUTBOUND SIDE
// Whitelisted, fee-paying sender of token-carrying cross-chain messages

mod sender;

pub use sender::{
    Dispatcher, DispatcherConfig, DispatcherError, DispatcherEvent, DispatcherState,
    DispatcherStats,
};
