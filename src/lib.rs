// chainbridge - Cross-chain token messaging
//
// Source side: the dispatcher pays a transport to carry a token and an
// instruction to a whitelisted gateway. Destination side: the gateway
// accepts deliveries only from the transport and from whitelisted senders,
// then hands the value to a settlement that pays the beneficiary.

pub mod auth;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod message;
pub mod relay;
pub mod settlement;
pub mod storage;
pub mod transport;

pub use error::BridgeError;
