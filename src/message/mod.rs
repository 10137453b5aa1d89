// Message module - THE ENVELOPE
// Chain selectors, asset ids, outbound/inbound messages and their wire encodings

mod codec;
mod model;
mod payload;

pub use codec::{CodecError, MessageCodec};
pub use model::{AssetId, ChainSelector, InboundMessage, Message, MessageId, TokenAmount};
pub use payload::{SettlementInstruction, INSTRUCTION_LEN};
