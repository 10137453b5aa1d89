// Gateway module - THE INBOUND SIDE
// Accepts transport deliveries from whitelisted senders and hands bridged value to settlement

mod receiver;

pub use receiver::{
    Gateway, GatewayConfig, GatewayError, GatewayEvent, GatewayState, GatewayStats,
    SharedSettlement,
};
