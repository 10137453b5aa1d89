// Dispatcher Tests
// Tests for whitelisted, fee-paying message dispatch

use alloy_primitives::{Address, U256};
use chainbridge::auth::{AuthError, SingleOwner, WhitelistError};
use chainbridge::dispatcher::{
    Dispatcher, DispatcherConfig, DispatcherError, DispatcherEvent, DispatcherState,
};
use chainbridge::ledger::{InMemoryLedger, TokenLedger};
use chainbridge::message::{AssetId, ChainSelector, SettlementInstruction};
use chainbridge::transport::{
    LaneConfig, LocalTransport, MockTransport, Transport, TransportError,
};
use chainbridge::BridgeError;
use std::sync::Arc;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

const OWNER: Address = Address::repeat_byte(0x0f);
const CALLER: Address = Address::repeat_byte(0x01);
const DISPATCHER: Address = Address::repeat_byte(0xd1);
const ROUTER: Address = Address::repeat_byte(0x70);
const GATEWAY: Address = Address::repeat_byte(0x6a);

fn link() -> AssetId {
    AssetId::new(Address::repeat_byte(0x0a))
}

fn token() -> AssetId {
    AssetId::new(Address::repeat_byte(0x0b))
}

fn payload() -> Vec<u8> {
    SettlementInstruction::new(
        Address::repeat_byte(0xbe),
        AssetId::new(Address::repeat_byte(0xda)),
        U256::from(1),
    )
    .encode()
}

fn local_transport() -> Arc<LocalTransport> {
    let mut transport = LocalTransport::new(ROUTER, ChainSelector::SEPOLIA, link());
    transport
        .add_lane(
            LaneConfig::new(ChainSelector::MUMBAI)
                .with_base_fee(U256::from(10_000))
                .with_gas_price(U256::from(3))
                .map_token(token(), AssetId::new(Address::repeat_byte(0x0c))),
        )
        .unwrap();
    Arc::new(transport)
}

fn dispatcher_with(transport: Arc<dyn Transport>) -> Dispatcher {
    Dispatcher::new(
        DispatcherConfig::new(DISPATCHER, link()),
        Box::new(SingleOwner::new(OWNER)),
        transport,
    )
    .unwrap()
}

fn whitelisted_dispatcher(transport: Arc<dyn Transport>) -> Dispatcher {
    let mut dispatcher = dispatcher_with(transport);
    dispatcher
        .whitelist_destination(&OWNER, ChainSelector::MUMBAI, GATEWAY)
        .unwrap();
    dispatcher.poll_events();
    dispatcher
}

/// Caller funded and approved for `amount` of the token plus a generous fee allowance
fn funded_ledger(amount: u64) -> InMemoryLedger {
    let mut ledger = InMemoryLedger::new();
    ledger.mint(&link(), &CALLER, U256::from(100_000_000u64)).unwrap();
    ledger.mint(&token(), &CALLER, U256::from(10_000u64)).unwrap();
    ledger
        .approve(&link(), &CALLER, &DISPATCHER, U256::from(100_000_000u64))
        .unwrap();
    ledger
        .approve(&token(), &CALLER, &DISPATCHER, U256::from(amount))
        .unwrap();
    ledger
}

fn send(
    dispatcher: &mut Dispatcher,
    ledger: &mut InMemoryLedger,
    receiver: Address,
    amount: u64,
) -> Result<chainbridge::message::MessageId, DispatcherError> {
    dispatcher.send_message_pay_link(
        &CALLER,
        ledger,
        ChainSelector::MUMBAI,
        receiver,
        payload(),
        token(),
        U256::from(amount),
    )
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[test]
fn test_config_validation() {
    assert!(DispatcherConfig::new(DISPATCHER, link()).validate().is_ok());
    assert!(DispatcherConfig::new(Address::ZERO, link()).validate().is_err());
    assert!(DispatcherConfig::new(DISPATCHER, AssetId::new(Address::ZERO))
        .validate()
        .is_err());
}

#[test]
fn test_initial_gas_limit_from_config() {
    let dispatcher = Dispatcher::new(
        DispatcherConfig::new(DISPATCHER, link()).with_fixed_gas_limit(500_000),
        Box::new(SingleOwner::new(OWNER)),
        local_transport(),
    )
    .unwrap();

    assert_eq!(dispatcher.fixed_gas_limit(), 500_000);
}

// ============================================================================
// ADMINISTRATION
// ============================================================================

#[test]
fn test_whitelist_destination_owner_only() {
    let mut dispatcher = dispatcher_with(local_transport());

    let result = dispatcher.whitelist_destination(&CALLER, ChainSelector::MUMBAI, GATEWAY);

    assert!(matches!(
        result,
        Err(DispatcherError::Forbidden(AuthError::NotPermitted { .. }))
    ));
    assert!(dispatcher.destinations().is_empty());
}

#[test]
fn test_whitelist_destination_emits_event() {
    let mut dispatcher = dispatcher_with(local_transport());

    dispatcher
        .whitelist_destination(&OWNER, ChainSelector::MUMBAI, GATEWAY)
        .unwrap();

    assert_eq!(dispatcher.destinations().get(ChainSelector::MUMBAI), Some(&GATEWAY));
    assert_eq!(
        dispatcher.poll_events(),
        vec![DispatcherEvent::DestinationWhitelisted {
            destination: ChainSelector::MUMBAI,
            gateway: GATEWAY,
        }]
    );
    assert!(dispatcher.poll_events().is_empty());
}

#[test]
fn test_remove_destination() {
    let mut dispatcher = whitelisted_dispatcher(local_transport());

    assert!(matches!(
        dispatcher.remove_destination(&CALLER, ChainSelector::MUMBAI),
        Err(DispatcherError::Forbidden(_))
    ));
    assert!(dispatcher.remove_destination(&OWNER, ChainSelector::MUMBAI).unwrap());
    assert!(!dispatcher.remove_destination(&OWNER, ChainSelector::MUMBAI).unwrap());

    let mut ledger = funded_ledger(1000);
    assert!(matches!(
        send(&mut dispatcher, &mut ledger, GATEWAY, 1000),
        Err(DispatcherError::NotWhitelisted(WhitelistError::UnknownDestination(_)))
    ));
}

#[test]
fn test_set_fixed_gas_limit_owner_only() {
    let mut dispatcher = dispatcher_with(local_transport());

    assert!(dispatcher.set_fixed_gas_limit(&CALLER, 1).is_err());
    dispatcher.set_fixed_gas_limit(&OWNER, 300_000).unwrap();

    assert_eq!(dispatcher.fixed_gas_limit(), 300_000);
    assert_eq!(
        dispatcher.poll_events(),
        vec![DispatcherEvent::FixedGasLimitChanged { limit: 300_000 }]
    );
}

// ============================================================================
// FEES
// ============================================================================

#[test]
fn test_fee_for_is_positive() {
    let dispatcher = whitelisted_dispatcher(local_transport());

    let fee = dispatcher
        .fee_for(ChainSelector::MUMBAI, GATEWAY, &payload(), token(), U256::from(1000), link())
        .unwrap();

    assert!(fee > U256::ZERO);
}

#[test]
fn test_fee_is_monotonic_in_gas_limit() {
    let mut dispatcher = whitelisted_dispatcher(local_transport());

    let mut previous = U256::ZERO;
    for limit in [1u64, 100_000, 200_000, 900_000, 2_000_000] {
        dispatcher.set_fixed_gas_limit(&OWNER, limit).unwrap();
        let fee = dispatcher
            .fee_for(ChainSelector::MUMBAI, GATEWAY, &payload(), token(), U256::from(1000), link())
            .unwrap();
        assert!(fee >= previous, "fee dropped at gas limit {limit}");
        previous = fee;
    }
}

#[test]
fn test_zero_gas_limit_uses_transport_default() {
    let mut dispatcher = whitelisted_dispatcher(local_transport());
    let quote = |d: &Dispatcher| {
        d.fee_for(ChainSelector::MUMBAI, GATEWAY, &payload(), token(), U256::from(1000), link())
            .unwrap()
    };

    let default_fee = quote(&dispatcher);
    dispatcher.set_fixed_gas_limit(&OWNER, 200_000).unwrap();
    let explicit_fee = quote(&dispatcher);
    dispatcher.set_fixed_gas_limit(&OWNER, 0).unwrap();

    assert_eq!(default_fee, explicit_fee);
    assert_eq!(quote(&dispatcher), default_fee);
}

// ============================================================================
// SENDING
// ============================================================================

#[test]
fn test_send_to_mumbai_scenario() {
    let transport = local_transport();
    let mut dispatcher = whitelisted_dispatcher(transport.clone());
    let mut ledger = funded_ledger(1000);

    let fee = dispatcher
        .fee_for(ChainSelector::MUMBAI, GATEWAY, &payload(), token(), U256::from(1000), link())
        .unwrap();
    assert!(fee > U256::ZERO);

    let link_before = ledger.balance_of(&link(), &CALLER);
    let token_before = ledger.balance_of(&token(), &CALLER);

    let message_id = send(&mut dispatcher, &mut ledger, GATEWAY, 1000).unwrap();

    assert_eq!(ChainSelector::MUMBAI.value(), 12532609583862916517);
    assert_eq!(ledger.balance_of(&token(), &CALLER), token_before - U256::from(1000));
    assert_eq!(ledger.balance_of(&link(), &CALLER), link_before - fee);
    assert_eq!(
        dispatcher.poll_events(),
        vec![DispatcherEvent::MessageSent {
            message_id,
            destination: ChainSelector::MUMBAI,
            receiver: GATEWAY,
            payload: payload(),
            token: token(),
            amount: U256::from(1000),
            fee_token: link(),
            fee,
        }]
    );
    assert_eq!(transport.pending_count(), 1);
}

#[test]
fn test_send_moves_value_to_transport_pool() {
    let mut dispatcher = whitelisted_dispatcher(local_transport());
    let mut ledger = funded_ledger(1000);

    send(&mut dispatcher, &mut ledger, GATEWAY, 1000).unwrap();

    assert_eq!(ledger.balance_of(&token(), &ROUTER), U256::from(1000));
    assert_eq!(ledger.balance_of(&token(), &DISPATCHER), U256::ZERO);
    assert_eq!(ledger.balance_of(&link(), &DISPATCHER), U256::ZERO);
    assert_eq!(ledger.allowance(&token(), &DISPATCHER, &ROUTER), U256::ZERO);
    assert_eq!(ledger.allowance(&link(), &DISPATCHER, &ROUTER), U256::ZERO);
}

#[test]
fn test_send_unwhitelisted_destination_changes_nothing() {
    let mut dispatcher = dispatcher_with(local_transport());
    let mut ledger = funded_ledger(1000);
    let before = ledger.clone();

    let result = send(&mut dispatcher, &mut ledger, GATEWAY, 1000);

    assert!(matches!(result, Err(DispatcherError::NotWhitelisted(_))));
    assert_eq!(
        BridgeError::from(result.unwrap_err()),
        BridgeError::NotWhitelisted(
            WhitelistError::UnknownDestination(ChainSelector::MUMBAI).to_string()
        )
    );
    assert_eq!(
        ledger.balance_of(&token(), &CALLER),
        before.balance_of(&token(), &CALLER)
    );
    assert_eq!(
        ledger.balance_of(&link(), &CALLER),
        before.balance_of(&link(), &CALLER)
    );
    assert!(dispatcher.poll_events().is_empty());
    assert_eq!(dispatcher.stats().messages_rejected, 1);
}

#[test]
fn test_send_zero_amount_charges_nothing() {
    let transport = local_transport();
    let mut dispatcher = whitelisted_dispatcher(transport.clone());
    let mut ledger = funded_ledger(1000);

    let result = send(&mut dispatcher, &mut ledger, GATEWAY, 0);

    assert_eq!(result, Err(DispatcherError::ZeroAmount));
    assert!(matches!(
        BridgeError::from(DispatcherError::ZeroAmount),
        BridgeError::InvalidAmount(_)
    ));
    assert_eq!(ledger.balance_of(&link(), &CALLER), U256::from(100_000_000u64));
    assert_eq!(ledger.balance_of(&token(), &CALLER), U256::from(10_000));
    assert_eq!(ledger.balance_of(&link(), &ROUTER), U256::ZERO);
    assert_eq!(transport.pending_count(), 0);
    assert!(dispatcher.poll_events().is_empty());
}

#[test]
fn test_send_to_chain_without_route_is_delivery_failure() {
    let unrouted = ChainSelector::new(42);
    let mut dispatcher = dispatcher_with(local_transport());
    dispatcher
        .whitelist_destination(&OWNER, unrouted, GATEWAY)
        .unwrap();
    let mut ledger = funded_ledger(1000);

    let err = dispatcher
        .send_message_pay_link(
            &CALLER,
            &mut ledger,
            unrouted,
            GATEWAY,
            payload(),
            token(),
            U256::from(1000),
        )
        .unwrap_err();

    assert_eq!(
        err,
        DispatcherError::Transport(TransportError::UnsupportedDestination(unrouted))
    );
    assert!(matches!(BridgeError::from(err), BridgeError::DeliveryFailure(_)));
    assert_eq!(ledger.balance_of(&token(), &CALLER), U256::from(10_000));
}

#[test]
fn test_send_wrong_receiver_rejected() {
    let mut dispatcher = whitelisted_dispatcher(local_transport());
    let mut ledger = funded_ledger(1000);

    let result = send(&mut dispatcher, &mut ledger, Address::repeat_byte(0x66), 1000);

    assert!(matches!(
        result,
        Err(DispatcherError::NotWhitelisted(WhitelistError::ReceiverMismatch { .. }))
    ));
    assert_eq!(ledger.balance_of(&token(), &CALLER), U256::from(10_000));
}

#[test]
fn test_send_insufficient_token_allowance_rolls_back() {
    let mut dispatcher = whitelisted_dispatcher(local_transport());
    let mut ledger = funded_ledger(999);

    let result = send(&mut dispatcher, &mut ledger, GATEWAY, 1000);

    assert!(matches!(result, Err(DispatcherError::InsufficientFunds(_))));
    assert_eq!(ledger.balance_of(&token(), &CALLER), U256::from(10_000));
    assert_eq!(ledger.balance_of(&link(), &CALLER), U256::from(100_000_000u64));
    assert!(dispatcher.poll_events().is_empty());
}

#[test]
fn test_send_insufficient_fee_balance_rolls_back() {
    let mut dispatcher = whitelisted_dispatcher(local_transport());
    let mut ledger = InMemoryLedger::new();
    ledger.mint(&token(), &CALLER, U256::from(1000)).unwrap();
    ledger.mint(&link(), &CALLER, U256::from(1)).unwrap();
    ledger.approve(&token(), &CALLER, &DISPATCHER, U256::from(1000)).unwrap();
    ledger.approve(&link(), &CALLER, &DISPATCHER, U256::MAX).unwrap();

    let result = send(&mut dispatcher, &mut ledger, GATEWAY, 1000);

    assert!(matches!(result, Err(DispatcherError::InsufficientFunds(_))));
    assert_eq!(ledger.balance_of(&token(), &CALLER), U256::from(1000));
    assert_eq!(ledger.allowance(&token(), &CALLER, &DISPATCHER), U256::from(1000));
}

#[test]
fn test_send_transport_rejection_rolls_back() {
    let transport = Arc::new(
        MockTransport::new(ROUTER)
            .with_chain(ChainSelector::MUMBAI)
            .with_failure("lane paused"),
    );
    let mut dispatcher = whitelisted_dispatcher(transport);
    let mut ledger = funded_ledger(1000);

    let result = send(&mut dispatcher, &mut ledger, GATEWAY, 1000);

    assert!(matches!(result, Err(DispatcherError::Transport(_))));
    assert_eq!(ledger.balance_of(&token(), &CALLER), U256::from(10_000));
    assert_eq!(ledger.balance_of(&token(), &DISPATCHER), U256::ZERO);
}

#[test]
fn test_send_fee_token_as_bridged_token() {
    let mut dispatcher = whitelisted_dispatcher(Arc::new(
        MockTransport::new(ROUTER).with_chain(ChainSelector::MUMBAI),
    ));
    let mut ledger = InMemoryLedger::new();
    ledger.mint(&link(), &CALLER, U256::from(1_000_000)).unwrap();
    ledger.approve(&link(), &CALLER, &DISPATCHER, U256::MAX).unwrap();

    let fee = dispatcher
        .fee_for(ChainSelector::MUMBAI, GATEWAY, &payload(), link(), U256::from(500), link())
        .unwrap();
    dispatcher
        .send_message_pay_link(
            &CALLER,
            &mut ledger,
            ChainSelector::MUMBAI,
            GATEWAY,
            payload(),
            link(),
            U256::from(500),
        )
        .unwrap();

    assert_eq!(
        ledger.balance_of(&link(), &CALLER),
        U256::from(1_000_000) - U256::from(500) - fee
    );
    assert_eq!(ledger.balance_of(&link(), &ROUTER), U256::from(500) + fee);
}

#[test]
fn test_send_with_mock_records_message() {
    let transport = Arc::new(MockTransport::new(ROUTER).with_chain(ChainSelector::MUMBAI));
    let mut dispatcher = whitelisted_dispatcher(transport.clone());
    let mut ledger = funded_ledger(1000);

    let message_id = send(&mut dispatcher, &mut ledger, GATEWAY, 1000).unwrap();

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, message_id);
    assert_eq!(sent[0].1.receiver(), &GATEWAY);
    assert_eq!(dispatcher.stats().messages_sent, 1);
}

#[test]
fn test_gas_limit_override_reaches_fee() {
    let transport = Arc::new(MockTransport::new(ROUTER).with_chain(ChainSelector::MUMBAI));
    let mut dispatcher = whitelisted_dispatcher(transport);

    dispatcher.set_fixed_gas_limit(&OWNER, 1_000).unwrap();
    let low = dispatcher
        .fee_for(ChainSelector::MUMBAI, GATEWAY, &payload(), token(), U256::from(1), link())
        .unwrap();
    dispatcher.set_fixed_gas_limit(&OWNER, 5_000).unwrap();
    let high = dispatcher
        .fee_for(ChainSelector::MUMBAI, GATEWAY, &payload(), token(), U256::from(1), link())
        .unwrap();

    assert_eq!(high - low, U256::from(4_000));
}

// ============================================================================
// STATE AND WITHDRAWAL
// ============================================================================

#[test]
fn test_state_restore() {
    let mut dispatcher = whitelisted_dispatcher(local_transport());
    dispatcher.set_fixed_gas_limit(&OWNER, 123).unwrap();

    let bytes = dispatcher.state().to_bytes();
    let mut fresh = dispatcher_with(local_transport());
    fresh.restore_state(DispatcherState::from_bytes(&bytes).unwrap());

    assert_eq!(fresh.fixed_gas_limit(), 123);
    assert_eq!(fresh.destinations().get(ChainSelector::MUMBAI), Some(&GATEWAY));
}

#[test]
fn test_withdraw_token() {
    let mut dispatcher = dispatcher_with(local_transport());
    let mut ledger = InMemoryLedger::new();
    ledger.mint(&link(), &DISPATCHER, U256::from(77)).unwrap();

    assert!(matches!(
        dispatcher.withdraw_token(&CALLER, &mut ledger, &link(), &CALLER),
        Err(DispatcherError::Forbidden(_))
    ));

    let amount = dispatcher
        .withdraw_token(&OWNER, &mut ledger, &link(), &OWNER)
        .unwrap();

    assert_eq!(amount, U256::from(77));
    assert_eq!(ledger.balance_of(&link(), &OWNER), U256::from(77));
    assert_eq!(ledger.balance_of(&link(), &DISPATCHER), U256::ZERO);
}
