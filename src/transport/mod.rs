// Transport module - THE WIRE (abstract)
// The cross-chain delivery substrate: fee quotation, payment collection and the outbound queue

mod local;
mod mock;
mod traits;

pub use traits::{
    // Core trait
    Transport,
    // Queued message
    Envelope,
    // Errors
    TransportError,
};

pub use local::{LaneConfig, LocalTransport, DEFAULT_GAS_LIMIT, MAX_GAS_LIMIT, MAX_PAYLOAD_LEN};

pub use mock::MockTransport;
