// Authorization policy - checked at the start of every administrative operation

use alloy_primitives::Address;
use std::fmt;
use thiserror::Error;

/// Administrative operations guarded by an [`AuthorizationPolicy`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AdminAction {
    WhitelistDestination,
    RemoveDestination,
    SetFixedGasLimit,
    WhitelistSource,
    RemoveSource,
    SetSwapper,
    SetSwap,
    WithdrawToken,
}

impl fmt::Display for AdminAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WhitelistDestination => "whitelist destination",
            Self::RemoveDestination => "remove destination",
            Self::SetFixedGasLimit => "set fixed gas limit",
            Self::WhitelistSource => "whitelist source",
            Self::RemoveSource => "remove source",
            Self::SetSwapper => "set swapper",
            Self::SetSwap => "set swap",
            Self::WithdrawToken => "withdraw token",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Caller {caller} is not permitted to {action}")]
    NotPermitted { caller: Address, action: AdminAction },
}

/// Decides whether a caller may perform an administrative action.
///
/// Components receive their policy at construction, so tests can inject
/// doubles and deployments can swap in multi-party schemes.
pub trait AuthorizationPolicy: Send + Sync {
    fn authorize(&self, caller: &Address, action: AdminAction) -> Result<(), AuthError>;
}

/// A single designated owner may perform every administrative action
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SingleOwner {
    owner: Address,
}

impl SingleOwner {
    pub fn new(owner: Address) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }
}

impl AuthorizationPolicy for SingleOwner {
    fn authorize(&self, caller: &Address, action: AdminAction) -> Result<(), AuthError> {
        if caller != &self.owner {
            return Err(AuthError::NotPermitted {
                caller: *caller,
                action,
            });
        }
        Ok(())
    }
}
