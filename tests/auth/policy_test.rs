// Authorization Policy Tests
// Tests for owner-only administrative access

use alloy_primitives::Address;
use chainbridge::auth::{AdminAction, AuthError, AuthorizationPolicy, SingleOwner};

fn random_address() -> Address {
    Address::from(rand::random::<[u8; 20]>())
}

#[test]
fn test_owner_is_permitted_every_action() {
    let owner = random_address();
    let policy = SingleOwner::new(owner);

    for action in [
        AdminAction::WhitelistDestination,
        AdminAction::RemoveDestination,
        AdminAction::SetFixedGasLimit,
        AdminAction::WhitelistSource,
        AdminAction::RemoveSource,
        AdminAction::SetSwapper,
        AdminAction::SetSwap,
        AdminAction::WithdrawToken,
    ] {
        assert!(policy.authorize(&owner, action).is_ok());
    }
}

#[test]
fn test_stranger_is_rejected_with_action() {
    let owner = random_address();
    let stranger = random_address();
    let policy = SingleOwner::new(owner);

    let result = policy.authorize(&stranger, AdminAction::SetSwap);

    assert_eq!(
        result,
        Err(AuthError::NotPermitted {
            caller: stranger,
            action: AdminAction::SetSwap,
        })
    );
}

#[test]
fn test_owner_accessor() {
    let owner = random_address();
    assert_eq!(SingleOwner::new(owner).owner(), &owner);
}

#[test]
fn test_error_message_names_action() {
    let policy = SingleOwner::new(Address::repeat_byte(1));
    let err = policy
        .authorize(&Address::repeat_byte(2), AdminAction::WithdrawToken)
        .unwrap_err();

    assert!(err.to_string().contains("withdraw token"));
}

#[test]
fn test_policy_as_trait_object() {
    let owner = random_address();
    let policy: Box<dyn AuthorizationPolicy> = Box::new(SingleOwner::new(owner));

    assert!(policy
        .authorize(&owner, AdminAction::WhitelistDestination)
        .is_ok());
    assert!(policy
        .authorize(&Address::ZERO, AdminAction::WhitelistDestination)
        .is_err());
}
