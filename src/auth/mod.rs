// Auth module - WHO MAY DO WHAT
// Administrative authorization policies and the destination/source whitelists

mod policy;
mod whitelist;

pub use policy::{AdminAction, AuthError, AuthorizationPolicy, SingleOwner};
pub use whitelist::{DestinationWhitelist, SourceWhitelist, WhitelistError};
