// bridge - Operator CLI for a chainbridge deployment
//
// Admin subcommands load component state from the store, apply one owner-only
// change as the operator, and save it back. `demo` runs a full Sepolia to
// Mumbai transfer in process.

use alloy_primitives::{address, Address, U256};
use chainbridge::auth::SingleOwner;
use chainbridge::dispatcher::{Dispatcher, DispatcherConfig};
use chainbridge::gateway::{Gateway, GatewayConfig, SharedSettlement};
use chainbridge::ledger::{InMemoryLedger, TokenLedger};
use chainbridge::message::{AssetId, ChainSelector, SettlementInstruction};
use chainbridge::relay::{GatewayTarget, Relayer, RelayerConfig};
use chainbridge::settlement::Swapper;
use chainbridge::storage::BridgeStore;
use chainbridge::transport::{LaneConfig, LocalTransport};
use chainbridge::BridgeError;
use clap::{Parser, Subcommand};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Dispatcher account used by admin commands and the demo
const DISPATCHER: Address = address!("6b1fe2a1a4f0f5e2b0b8d5c3a36d8f2c51b6d9e1");
/// Gateway account used by admin commands and the demo
const GATEWAY: Address = address!("a3c4b2d1e0f9a8b7c6d5e4f3a2b1c0d9e8f7a6b5");
/// Swapper account used by the demo
const SWAPPER: Address = address!("5e1f0a9b8c7d6e5f4a3b2c1d0e9f8a7b6c5d4e3f");
/// Router account on Sepolia; collects fees and locks bridged tokens
const SEPOLIA_ROUTER: Address = address!("0bf3de8c5d3e8a2b8ef9f1b0d5c0a0e6b3a7f4d2");
/// Router account on Mumbai; releases bridged tokens and calls the gateway
const MUMBAI_ROUTER: Address = address!("1035cabc275068e0f4b745a29cedf38e13af41b1");

/// LINK on Sepolia, the fee token
const LINK: Address = address!("779877a7b0d9e8603169ddbd7836e478b4624789");
/// CCIP-BnM on Sepolia
const BNM_SEPOLIA: Address = address!("fd57b4ddbf88a4e07ff4e34c487b99af2fe82a05");
/// CCIP-BnM on Mumbai
const BNM_MUMBAI: Address = address!("f1e3a5842eeef51f2967b3f05d45dd4f4205ff40");
/// DAI stand-in on Mumbai
const DAI_MUMBAI: Address = address!("1cc86b9b67c93b8fa411554db761f68979e7995a");

#[derive(Parser)]
#[command(name = "bridge", author, version, about)]
struct Cli {
    /// Directory for the persistent store
    #[arg(long, global = true, env = "BRIDGE_DATA_DIR", default_value = "./bridge-data")]
    data_dir: PathBuf,

    /// Account issuing admin calls; the first operator to touch a store owns it
    #[arg(long, global = true, env = "BRIDGE_OPERATOR", value_parser = parse_address,
          default_value = "0x00000000000000000000000000000000000000a1")]
    operator: Address,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Allow the dispatcher to send to a gateway on a chain
    WhitelistDestination {
        #[arg(long)]
        chain: u64,
        #[arg(long, value_parser = parse_address)]
        gateway: Address,
    },

    /// Forbid the dispatcher from sending to a chain
    RemoveDestination {
        #[arg(long)]
        chain: u64,
    },

    /// Set the dispatcher's fixed gas limit (0 for the transport default)
    SetGasLimit {
        #[arg(long)]
        limit: u64,
    },

    /// Accept messages from a sender on a source chain
    WhitelistSource {
        #[arg(long)]
        chain: u64,
        #[arg(long, value_parser = parse_address)]
        sender: Address,
    },

    /// Stop accepting messages from a sender on a source chain
    RemoveSource {
        #[arg(long)]
        chain: u64,
        #[arg(long, value_parser = parse_address)]
        sender: Address,
    },

    /// Set a fixed swap rate: amount-in of token-in buys amount-out of token-out
    SetSwap {
        #[arg(long, value_parser = parse_address)]
        token_in: Address,
        #[arg(long, value_parser = parse_address)]
        token_out: Address,
        #[arg(long)]
        amount_in: u128,
        #[arg(long)]
        amount_out: u128,
    },

    /// Print the stored configuration
    Show,

    /// Quote the fee for sending to the stored destination
    Quote {
        #[arg(long)]
        chain: u64,
        #[arg(long)]
        amount: u128,
        /// Flat fee per message, in fee-token base units
        #[arg(long, default_value_t = 50_000_000_000_000_000)]
        base_fee: u128,
        /// Fee per unit of gas, in fee-token base units
        #[arg(long, default_value_t = 100_000_000_000)]
        gas_price: u128,
    },

    /// Run an end-to-end transfer between two simulated chains
    Demo {
        /// CCIP-BnM to bridge
        #[arg(long, default_value_t = 1_000)]
        amount: u128,
        /// DAI paid per `amount` bridged
        #[arg(long, default_value_t = 1)]
        rate_out: u128,
    },
}

fn parse_address(value: &str) -> Result<Address, String> {
    value
        .parse::<Address>()
        .map_err(|e| format!("invalid address {value}: {e}"))
}

#[tokio::main]
async fn main() -> Result<(), BridgeError> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Command::Demo { amount, rate_out } => {
            let store = BridgeStore::open(&cli.data_dir)?;
            run_demo(&store, &cli.operator, U256::from(amount), U256::from(rate_out)).await
        }
        command => {
            let store = BridgeStore::open(&cli.data_dir)?;
            run_admin(&store, &cli.operator, command)?;
            store.flush()?;
            Ok(())
        }
    }
}

// ============================================================================
// ADMIN COMMANDS
// ============================================================================

fn load_dispatcher(store: &BridgeStore, owner: Address) -> Result<Dispatcher, BridgeError> {
    let transport = Arc::new(LocalTransport::new(
        SEPOLIA_ROUTER,
        ChainSelector::SEPOLIA,
        AssetId::new(LINK),
    ));
    let mut dispatcher = Dispatcher::new(
        DispatcherConfig::new(DISPATCHER, AssetId::new(LINK)),
        Box::new(SingleOwner::new(owner)),
        transport,
    )?;
    if let Some(state) = store.load_dispatcher_state()? {
        dispatcher.restore_state(state);
    }
    Ok(dispatcher)
}

fn load_gateway(store: &BridgeStore, owner: Address) -> Result<Gateway, BridgeError> {
    let mut gateway = Gateway::new(
        GatewayConfig::new(GATEWAY, MUMBAI_ROUTER),
        Box::new(SingleOwner::new(owner)),
    )?;
    if let Some(state) = store.load_gateway_state()? {
        gateway.restore_state(state);
    }
    Ok(gateway)
}

fn run_admin(
    store: &BridgeStore,
    operator: &Address,
    command: Command,
) -> Result<(), BridgeError> {
    let owner = store.get_or_claim_owner(operator)?;

    match command {
        Command::WhitelistDestination { chain, gateway } => {
            let mut dispatcher = load_dispatcher(store, owner)?;
            dispatcher.whitelist_destination(operator, ChainSelector::new(chain), gateway)?;
            store.save_dispatcher_state(&dispatcher.state())?;
        }
        Command::RemoveDestination { chain } => {
            let mut dispatcher = load_dispatcher(store, owner)?;
            if !dispatcher.remove_destination(operator, ChainSelector::new(chain))? {
                println!("chain {chain} was not whitelisted");
            }
            store.save_dispatcher_state(&dispatcher.state())?;
        }
        Command::SetGasLimit { limit } => {
            let mut dispatcher = load_dispatcher(store, owner)?;
            dispatcher.set_fixed_gas_limit(operator, limit)?;
            store.save_dispatcher_state(&dispatcher.state())?;
        }
        Command::WhitelistSource { chain, sender } => {
            let mut gateway = load_gateway(store, owner)?;
            gateway.whitelist_source(operator, ChainSelector::new(chain), sender)?;
            store.save_gateway_state(&gateway.state())?;
        }
        Command::RemoveSource { chain, sender } => {
            let mut gateway = load_gateway(store, owner)?;
            if !gateway.remove_source(operator, ChainSelector::new(chain), &sender)? {
                println!("{sender} on chain {chain} was not whitelisted");
            }
            store.save_gateway_state(&gateway.state())?;
        }
        Command::SetSwap {
            token_in,
            token_out,
            amount_in,
            amount_out,
        } => {
            let mut swapper = Swapper::new(SWAPPER, Box::new(SingleOwner::new(owner)));
            if let Some(rates) = store.load_swap_rates()? {
                swapper.restore_rates(rates);
            }
            swapper.set_swap(
                operator,
                AssetId::new(token_in),
                AssetId::new(token_out),
                U256::from(amount_in),
                U256::from(amount_out),
            )?;
            store.save_swap_rates(swapper.rates())?;
        }
        Command::Show => show(store, &owner)?,
        Command::Quote {
            chain,
            amount,
            base_fee,
            gas_price,
        } => quote(store, owner, ChainSelector::new(chain), amount, base_fee, gas_price)?,
        Command::Demo { .. } => {
            return Err(BridgeError::InvalidConfig(
                "demo is not an admin command".to_string(),
            ))
        }
    }

    Ok(())
}

fn show(store: &BridgeStore, owner: &Address) -> Result<(), BridgeError> {
    println!("owner: {owner}");

    let dispatcher = store.load_dispatcher_state()?.unwrap_or_default();
    println!("fixed gas limit: {}", dispatcher.fixed_gas_limit);
    println!("destinations:");
    for (chain, gateway) in dispatcher.destinations.iter() {
        println!("  {chain} -> {gateway}");
    }

    let gateway = store.load_gateway_state()?.unwrap_or_default();
    println!("sources:");
    for (chain, sender) in gateway.sources.iter() {
        println!("  {chain} / {sender}");
    }

    let rates = store.load_swap_rates()?.unwrap_or_default();
    println!("swap rates:");
    for ((token_in, token_out), rate) in rates.iter() {
        println!(
            "  {} {token_in} -> {} {token_out}",
            rate.amount_in(),
            rate.amount_out()
        );
    }

    let labels = store.ledger_labels()?;
    if !labels.is_empty() {
        println!("ledgers: {}", labels.join(", "));
    }
    Ok(())
}

fn quote(
    store: &BridgeStore,
    owner: Address,
    chain: ChainSelector,
    amount: u128,
    base_fee: u128,
    gas_price: u128,
) -> Result<(), BridgeError> {
    let state = store.load_dispatcher_state()?.unwrap_or_default();
    let receiver = state
        .destinations
        .get(chain)
        .copied()
        .ok_or_else(|| BridgeError::NotWhitelisted(format!("destination {chain}")))?;

    let mut transport =
        LocalTransport::new(SEPOLIA_ROUTER, ChainSelector::SEPOLIA, AssetId::new(LINK));
    transport.add_lane(
        LaneConfig::new(chain)
            .with_base_fee(U256::from(base_fee))
            .with_gas_price(U256::from(gas_price))
            .map_token(AssetId::new(BNM_SEPOLIA), AssetId::new(BNM_MUMBAI)),
    )?;

    let mut dispatcher = Dispatcher::new(
        DispatcherConfig::new(DISPATCHER, AssetId::new(LINK)),
        Box::new(SingleOwner::new(owner)),
        Arc::new(transport),
    )?;
    dispatcher.restore_state(state);

    let payload =
        SettlementInstruction::new(Address::ZERO, AssetId::new(DAI_MUMBAI), U256::ZERO).encode();
    let fee = dispatcher.fee_for(
        chain,
        receiver,
        &payload,
        AssetId::new(BNM_SEPOLIA),
        U256::from(amount),
        AssetId::new(LINK),
    )?;

    println!("fee: {fee} (LINK base units)");
    Ok(())
}

// ============================================================================
// DEMO
// ============================================================================

async fn run_demo(
    store: &BridgeStore,
    operator: &Address,
    amount: U256,
    rate_out: U256,
) -> Result<(), BridgeError> {
    let owner = *operator;
    let user = address!("00000000000000000000000000000000000000b0");
    let beneficiary = address!("00000000000000000000000000000000000000be");

    let link = AssetId::new(LINK);
    let bnm_sepolia = AssetId::new(BNM_SEPOLIA);
    let bnm_mumbai = AssetId::new(BNM_MUMBAI);
    let dai = AssetId::new(DAI_MUMBAI);

    // Source chain: the user holds LINK for fees and the token to bridge
    let mut sepolia = InMemoryLedger::new();
    sepolia.mint(&link, &user, U256::from(10_000_000_000_000_000_000u128))?;
    sepolia.mint(&bnm_sepolia, &user, amount)?;

    // Destination chain: the router holds released liquidity, the swapper holds DAI
    let mut mumbai = InMemoryLedger::new();
    mumbai.mint(&bnm_mumbai, &MUMBAI_ROUTER, amount)?;
    mumbai.mint(&dai, &SWAPPER, rate_out)?;
    let mumbai = Arc::new(Mutex::new(mumbai));

    let mut transport = LocalTransport::new(SEPOLIA_ROUTER, ChainSelector::SEPOLIA, link);
    transport.add_lane(
        LaneConfig::new(ChainSelector::MUMBAI)
            .with_base_fee(U256::from(50_000_000_000_000_000u128))
            .with_gas_price(U256::from(100_000_000_000u64))
            .map_token(bnm_sepolia, bnm_mumbai),
    )?;
    let transport = Arc::new(transport);

    let mut dispatcher = Dispatcher::new(
        DispatcherConfig::new(DISPATCHER, link),
        Box::new(SingleOwner::new(owner)),
        transport.clone(),
    )?;
    dispatcher.whitelist_destination(&owner, ChainSelector::MUMBAI, GATEWAY)?;

    let mut swapper = Swapper::new(SWAPPER, Box::new(SingleOwner::new(owner)));
    swapper.set_swap(&owner, bnm_mumbai, dai, amount, rate_out)?;
    let swapper: SharedSettlement = Arc::new(Mutex::new(swapper));

    let mut gateway = Gateway::new(
        GatewayConfig::new(GATEWAY, MUMBAI_ROUTER),
        Box::new(SingleOwner::new(owner)),
    )?;
    gateway.whitelist_source(&owner, ChainSelector::SEPOLIA, DISPATCHER)?;
    gateway.set_swapper(&owner, bnm_mumbai, swapper)?;
    let gateway = Arc::new(Mutex::new(gateway));

    // The user approves the dispatcher for the bridged amount and the fee
    let payload = SettlementInstruction::new(beneficiary, dai, rate_out).encode();
    let fee = dispatcher.fee_for(
        ChainSelector::MUMBAI,
        GATEWAY,
        &payload,
        bnm_sepolia,
        amount,
        link,
    )?;
    sepolia.approve(&link, &user, &DISPATCHER, fee)?;
    sepolia.approve(&bnm_sepolia, &user, &DISPATCHER, amount)?;

    let message_id = dispatcher.send_message_pay_link(
        &user,
        &mut sepolia,
        ChainSelector::MUMBAI,
        GATEWAY,
        payload,
        bnm_sepolia,
        amount,
    )?;
    info!(%message_id, %fee, "Demo message sent");

    let target = GatewayTarget::new(gateway.clone(), mumbai.clone(), MUMBAI_ROUTER);
    let mut relayer = Relayer::new(RelayerConfig::new(), transport)?.with_target(
        ChainSelector::MUMBAI,
        GATEWAY,
        Arc::new(target),
    );

    for receipt in relayer.relay_pending().await {
        println!(
            "message {} -> {:?} after {} attempt(s)",
            receipt.message_id(),
            receipt.status(),
            receipt.attempts()
        );
        if let Some(error) = receipt.error() {
            println!("  error: {error}");
        }
    }

    let mumbai = mumbai.lock();
    println!("fee paid: {fee} LINK base units");
    println!("beneficiary DAI: {}", mumbai.balance_of(&dai, &beneficiary));
    println!("swapper CCIP-BnM: {}", mumbai.balance_of(&bnm_mumbai, &SWAPPER));
    println!("user CCIP-BnM on Sepolia: {}", sepolia.balance_of(&bnm_sepolia, &user));

    store.save_ledger("sepolia", &sepolia)?;
    store.save_ledger("mumbai", &mumbai)?;
    store.flush()?;
    Ok(())
}
