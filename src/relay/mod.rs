// Relay module - DELIVERY
// Async service that carries accepted envelopes to destination gateways exactly once

mod relayer;
mod target;

pub use relayer::{
    DeliveryReceipt, DeliveryStatus, Relayer, RelayerConfig, RelayerError, RelayerEvent,
    RelayerStats,
};
pub use target::{DeliveryTarget, GatewayTarget, MockDeliveryTarget};
