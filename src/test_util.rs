use alloy::primitives::{Address, U256};

use crate::{
    primitives::{Asset, CallContext, ETH_ADDRESS},
    staking::StakingAdmin,
    strategy::{EthYield, PassiveHold, StableYield, StrategyKind, Venue},
    system::{Call, CallOutput},
    upgrade::{ComponentKind, Implementation},
    CustodyError, CustodySystem,
};

/// Fixed execution timestamp used across tests.
pub(crate) const NOW: u64 = 1_700_000_000;

pub(crate) const DEPLOYER: Address = Address::repeat_byte(0xde);
pub(crate) const OWNER: Address = Address::repeat_byte(0x01);
pub(crate) const STAKER: Address = Address::repeat_byte(0x02);
pub(crate) const ALICE: Address = Address::repeat_byte(0xa1);
pub(crate) const BOB: Address = Address::repeat_byte(0xb0);
pub(crate) const USDC: Address = Address::repeat_byte(0xcc);
pub(crate) const BRIDGE: Address = Address::repeat_byte(0xbb);
pub(crate) const L2_ETH: Address = Address::repeat_byte(0x2e);

/// `n` whole units of an 18-decimals asset.
pub(crate) fn eth(n: u64) -> U256 {
    U256::from(n) * U256::from(10).pow(U256::from(18))
}

/// `n` whole units of a 6-decimals asset.
pub(crate) fn usd(n: u64) -> U256 {
    U256::from(n) * U256::from(1_000_000)
}

pub(crate) fn ctx(caller: Address) -> CallContext {
    CallContext::new(caller).at(NOW)
}

pub(crate) fn passive_implementation() -> Implementation {
    Implementation {
        address: Address::repeat_byte(0x1f),
        kind: ComponentKind::Strategy(StrategyKind::PassiveHold),
        version: 1,
        layout: 1,
    }
}

/// A freshly deployed system accepting ETH and USDC, with the deposit manager set as the staking
/// manager's staker and the staker EOA as its depositor.
pub(crate) fn deployed() -> CustodySystem {
    let mut system = CustodySystem::deploy(
        &ctx(DEPLOYER),
        OWNER,
        STAKER,
        Some(Asset::token(USDC, 6)),
    )
    .unwrap();

    let deposit_manager = system.deposit_manager().address();
    system.execute(&ctx(OWNER), Call::StakingAdmin(StakingAdmin::SetStaker(deposit_manager))).unwrap();
    system.execute(&ctx(OWNER), Call::StakingAdmin(StakingAdmin::SetDepositor(STAKER))).unwrap();

    for holder in [ALICE, BOB, STAKER] {
        system.fund(ETH_ADDRESS, holder, eth(100)).unwrap();
        system.fund(USDC, holder, usd(100_000)).unwrap();
    }
    system
}

/// Deploys a strategy for `asset` and registers it, returning its address and slot index.
pub(crate) fn with_strategy(
    system: &mut CustodySystem,
    asset: Address,
    venue: Venue,
    activate: bool,
) -> (Address, usize) {
    let strategy = system.deploy_strategy(&ctx(DEPLOYER), OWNER, asset, venue).unwrap();
    let index = match system.execute(&ctx(OWNER), Call::AddStrategy { asset, strategy }).unwrap() {
        CallOutput::Slot(index) => index,
        other => panic!("unexpected output {other:?}"),
    };

    if activate {
        system.execute(&ctx(OWNER), Call::SetActiveStrategy { asset, index }).unwrap();
    }
    (strategy, index)
}

pub(crate) fn passive() -> Venue {
    Venue::PassiveHold(PassiveHold::default())
}

/// 5% APR, 10% liquid buffer, one day cooldown.
pub(crate) fn eth_yield() -> Venue {
    Venue::EthYield(EthYield::new(500, 1_000, 86_400))
}

/// 8% APR.
pub(crate) fn stable_yield() -> Venue {
    Venue::StableYield(StableYield::new(800))
}

/// Deposits `amount` of `asset` as `holder`, attaching value for the native asset.
pub(crate) fn deposit(
    system: &mut CustodySystem,
    holder: Address,
    asset: Address,
    amount: U256,
) -> Result<CallOutput, CustodyError> {
    let value = if asset == ETH_ADDRESS { amount } else { U256::ZERO };
    system.execute(&ctx(holder).with_value(value), Call::Deposit { asset, amount })
}

/// Serialized world, for byte-identical state comparisons.
pub(crate) fn state_of(system: &CustodySystem) -> String {
    serde_json::to_string(system.world()).unwrap()
}
