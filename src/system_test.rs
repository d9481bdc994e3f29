use alloy::primitives::{Address, U256};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    deposit::{DepositAdmin, DepositInit},
    primitives::{Asset, CallContext, Component, Role, ETH_ADDRESS},
    staking::{StakingAdmin, StakingInit},
    strategy::{StrategyAdmin, VenueEvent},
    system::{Call, CallOutput, InitPayload},
    test_util::{
        ctx, deployed, deposit, eth, eth_yield, passive, stable_yield, state_of, usd,
        with_strategy, ALICE, BOB, BRIDGE, L2_ETH, NOW, OWNER, STAKER, USDC,
    },
    upgrade::{ComponentKind, UpgradeError},
    CustodyError, CustodySystem,
};

fn supply(system: &CustodySystem, asset: Address) -> U256 {
    system.deposit_manager().wrapped_token(asset).unwrap().total_supply()
}

fn assert_conserved(system: &CustodySystem, asset: Address, now: u64) {
    assert_eq!(supply(system, asset), system.total_underlying(asset, now).unwrap());
}

/// Executes `call` expecting it to fail with `expected` and leave no trace.
fn assert_reverts(system: &mut CustodySystem, ctx: &CallContext, call: Call, expected: CustodyError) {
    let before = state_of(system);
    assert_eq!(system.execute(ctx, call), Err(expected));
    assert_eq!(state_of(system), before);
}

#[test]
fn test_supply_matches_underlying_over_random_sequences() {
    let mut system = deployed();
    with_strategy(&mut system, ETH_ADDRESS, passive(), true);
    system.execute(&ctx(OWNER), Call::SetAutoStake { enabled: true }).unwrap();

    let mut rng = StdRng::seed_from_u64(0x2545_f491);
    let (mut deposits, mut withdrawals, mut unstakes) = (0, 0, 0);

    for step in 0..300 {
        let holder = if rng.gen_bool(0.5) { ALICE } else { BOB };
        let amount = eth(rng.gen_range(1..=5));

        match rng.gen_range(0..4) {
            0 | 1 => {
                deposits += u32::from(deposit(&mut system, holder, ETH_ADDRESS, amount).is_ok());
            }
            2 => {
                let call = Call::Withdraw { asset: ETH_ADDRESS, amount };
                withdrawals += u32::from(system.execute(&ctx(holder), call).is_ok());
            }
            _ => {
                let call = Call::Unstake { asset: ETH_ADDRESS, amount };
                unstakes += u32::from(system.execute(&ctx(STAKER), call).is_ok());
            }
        }

        if step == 150 {
            system.execute(&ctx(OWNER), Call::SetAutoStake { enabled: false }).unwrap();
        }

        assert_conserved(&system, ETH_ADDRESS, NOW);
    }

    assert!(deposits > 0 && withdrawals > 0 && unstakes > 0, "{deposits} {withdrawals} {unstakes}");

    let holders = system.deposit_manager().balance_of(ETH_ADDRESS, ALICE).unwrap() +
        system.deposit_manager().balance_of(ETH_ADDRESS, BOB).unwrap();
    assert_eq!(holders, supply(&system, ETH_ADDRESS));
    assert_eq!(
        system.ledger().balance_of(ETH_ADDRESS, ALICE) +
            system.ledger().balance_of(ETH_ADDRESS, BOB) +
            holders,
        eth(200)
    );
}

#[test]
fn test_yield_venue_stays_backed_over_random_sequences() {
    let mut system = deployed();
    with_strategy(&mut system, ETH_ADDRESS, eth_yield(), true);
    system.execute(&ctx(OWNER), Call::SetAutoStake { enabled: true }).unwrap();

    let mut rng = StdRng::seed_from_u64(0x4f6c_dd1d);
    let (mut deposits, mut withdrawals, mut requests) = (0, 0, 0);
    let mut now = NOW;

    for _ in 0..300 {
        now += rng.gen_range(0..7_200);
        let holder = if rng.gen_bool(0.5) { ALICE } else { BOB };
        let amount = eth(rng.gen_range(1..=3));

        let (as_holder, as_staker) =
            (CallContext::new(holder).at(now), CallContext::new(STAKER).at(now));

        match rng.gen_range(0..5) {
            0 | 1 => {
                let call = Call::Deposit { asset: ETH_ADDRESS, amount };
                deposits += u32::from(system.execute(&as_holder.with_value(amount), call).is_ok());
            }
            2 => {
                let call = Call::Withdraw { asset: ETH_ADDRESS, amount };
                withdrawals += u32::from(system.execute(&as_holder, call).is_ok());
            }
            3 => {
                let call = Call::RequestUnstake { asset: ETH_ADDRESS, index: 0, amount };
                requests += u32::from(system.execute(&as_staker, call).is_ok());
            }
            _ => {
                let call = Call::Unstake { asset: ETH_ADDRESS, amount };
                let _ = system.execute(&as_staker, call);
            }
        }

        assert!(supply(&system, ETH_ADDRESS) <= system.total_underlying(ETH_ADDRESS, now).unwrap());
    }

    assert!(deposits > 0 && withdrawals > 0 && requests > 0, "{deposits} {withdrawals} {requests}");

    let harvest = Call::HarvestYield { asset: ETH_ADDRESS, to: OWNER };
    let harvested = match system.execute(&CallContext::new(OWNER).at(now), harvest).unwrap() {
        CallOutput::Amount(amount) => amount,
        other => panic!("unexpected output {other:?}"),
    };

    assert!(!harvested.is_zero());
    assert_conserved(&system, ETH_ADDRESS, now);
}

#[test]
fn test_set_active_strategy_is_idempotent() {
    let mut system = deployed();
    with_strategy(&mut system, ETH_ADDRESS, passive(), false);
    with_strategy(&mut system, ETH_ADDRESS, passive(), false);

    let call = Call::SetActiveStrategy { asset: ETH_ADDRESS, index: 1 };
    let mut once = system.clone();
    once.execute(&ctx(OWNER), call.clone()).unwrap();

    let mut twice = system;
    twice.execute(&ctx(OWNER), call.clone()).unwrap();
    twice.execute(&ctx(OWNER), call).unwrap();

    assert_eq!(state_of(&once), state_of(&twice));
    assert_eq!(twice.staking_manager().registry().active(ETH_ADDRESS).map(|(i, _)| i), Some(1));
}

#[test]
fn test_unregistered_strategy_never_becomes_active() {
    let mut system = deployed();
    let unregistered =
        system.deploy_strategy(&ctx(OWNER), OWNER, ETH_ADDRESS, passive()).unwrap();

    for index in 0..4 {
        assert_reverts(
            &mut system,
            &ctx(OWNER),
            Call::SetActiveStrategy { asset: ETH_ADDRESS, index },
            CustodyError::UnknownSlot { asset: ETH_ADDRESS, index },
        );
    }
    assert!(system.staking_manager().registry().active(ETH_ADDRESS).is_none());

    // Registering it for another asset does not make it a slot of this one either.
    assert_reverts(
        &mut system,
        &ctx(OWNER),
        Call::AddStrategy { asset: USDC, strategy: unregistered },
        CustodyError::StrategyAssetMismatch {
            strategy: unregistered,
            asset: USDC,
            underlying: ETH_ADDRESS,
        },
    );
}

#[test]
fn test_upgrade_round_trip_preserves_storage() {
    let mut system = deployed();
    let (strategy, _) = with_strategy(&mut system, ETH_ADDRESS, passive(), true);
    system.execute(&ctx(OWNER), Call::SetAutoStake { enabled: true }).unwrap();
    deposit(&mut system, ALICE, ETH_ADDRESS, eth(7)).unwrap();
    deposit(&mut system, BOB, USDC, usd(300)).unwrap();

    let targets = [
        (Component::DepositManager, ComponentKind::DepositManager),
        (Component::StakingManager, ComponentKind::StakingManager),
        (
            Component::Strategy(strategy),
            ComponentKind::Strategy(system.strategies().strategy(strategy).unwrap().kind()),
        ),
    ];

    let storage = |system: &CustodySystem| {
        serde_json::to_string(&(
            system.deposit_manager().storage(),
            system.staking_manager().storage(),
            system.strategies().strategy(strategy).unwrap().storage(),
            system.ledger(),
        ))
        .unwrap()
    };
    let before = storage(&system);

    for (target, kind) in targets {
        let implementation_a = match target {
            Component::DepositManager => system.deposit_manager().implementation(),
            Component::StakingManager => system.staking_manager().implementation(),
            Component::Strategy(address) => system.strategies().strategy(address).unwrap().implementation(),
        };
        let implementation_b = system.deploy_implementation(kind, 1, 1).address;

        for implementation in [implementation_a, implementation_b, implementation_a] {
            let output = system
                .execute(&ctx(OWNER), Call::Upgrade { target, implementation, init: None })
                .unwrap();
            assert!(matches!(output, CallOutput::Upgraded { to, .. } if to == implementation));
        }
    }

    assert_eq!(storage(&system), before);
    assert_eq!(system.deposit_manager().history().len(), 3);
    assert_conserved(&system, ETH_ADDRESS, NOW);
}

#[test]
fn test_upgrade_and_reinitialize() {
    let mut system = deployed();
    deposit(&mut system, ALICE, ETH_ADDRESS, eth(2)).unwrap();
    let wrapped_eth = system.deposit_manager().wrapped_eth();

    let v2 = system.deploy_implementation(ComponentKind::DepositManager, 2, 2);
    let init = DepositInit {
        owner: OWNER,
        staker: BOB,
        staking_manager: system.staking_manager().address(),
        usd_asset: Some(Asset::token(USDC, 6)),
    };
    let upgrade = Call::Upgrade {
        target: Component::DepositManager,
        implementation: v2.address,
        init: Some(InitPayload::DepositManager(init)),
    };

    system.execute(&ctx(OWNER), upgrade.clone()).unwrap();
    assert_eq!(system.deposit_manager().staker(), BOB);
    assert_eq!(system.deposit_manager().wrapped_eth(), wrapped_eth);
    assert_eq!(system.deposit_manager().balance_of(ETH_ADDRESS, ALICE), Ok(eth(2)));
    assert_eq!(system.deposit_manager().implementation(), v2.address);

    // Version 2 already initialized the storage.
    assert_reverts(
        &mut system,
        &ctx(OWNER),
        upgrade,
        UpgradeError::AlreadyInitialized { initialized: 2, version: 2 }.into(),
    );

    // Layouts only grow.
    let genesis = system.deposit_manager().history()[0].from;
    assert_reverts(
        &mut system,
        &ctx(OWNER),
        Call::Upgrade { target: Component::DepositManager, implementation: genesis, init: None },
        UpgradeError::IncompatibleLayout { current: 2, found: 1 }.into(),
    );
}

#[test]
fn test_upgrade_rejections_are_atomic() {
    let mut system = deployed();
    let staking_impl = system.staking_manager().implementation();
    let v2 = system.deploy_implementation(ComponentKind::DepositManager, 2, 1);

    assert_reverts(
        &mut system,
        &ctx(ALICE),
        Call::Upgrade { target: Component::DepositManager, implementation: v2.address, init: None },
        CustodyError::Unauthorized { caller: ALICE, role: Role::Owner },
    );

    assert_reverts(
        &mut system,
        &ctx(OWNER),
        Call::Upgrade { target: Component::DepositManager, implementation: staking_impl, init: None },
        UpgradeError::ComponentMismatch {
            implementation: staking_impl,
            found: ComponentKind::StakingManager,
        }
        .into(),
    );

    let unknown = Address::repeat_byte(0x42);
    assert_reverts(
        &mut system,
        &ctx(OWNER),
        Call::Upgrade { target: Component::StakingManager, implementation: unknown, init: None },
        UpgradeError::UnknownImplementation(unknown).into(),
    );

    assert_reverts(
        &mut system,
        &ctx(OWNER),
        Call::Upgrade {
            target: Component::DepositManager,
            implementation: v2.address,
            init: Some(InitPayload::StakingManager(StakingInit { owner: OWNER })),
        },
        UpgradeError::PayloadMismatch("DepositManager").into(),
    );
}

#[test]
fn test_deposit_without_active_strategy() {
    let mut system = deployed();

    assert_eq!(deposit(&mut system, ALICE, ETH_ADDRESS, eth(100)), Ok(CallOutput::Amount(eth(100))));
    assert_eq!(system.deposit_manager().balance_of(ETH_ADDRESS, ALICE), Ok(eth(100)));
    assert_eq!(system.deposit_manager().idle(ETH_ADDRESS), eth(100));

    // With auto-stake on, capital waits in staking custody instead.
    system.execute(&ctx(OWNER), Call::SetAutoStake { enabled: true }).unwrap();
    deposit(&mut system, BOB, ETH_ADDRESS, eth(10)).unwrap();
    assert_eq!(system.staking_manager().idle(ETH_ADDRESS), eth(10));

    assert_reverts(
        &mut system,
        &ctx(STAKER),
        Call::Stake { asset: ETH_ADDRESS, amount: eth(10) },
        CustodyError::NoActiveStrategy(ETH_ADDRESS),
    );
    assert_conserved(&system, ETH_ADDRESS, NOW);
}

#[test]
fn test_switching_active_strategy_routes_only_new_stake() {
    let mut system = deployed();
    let (first, _) = with_strategy(&mut system, ETH_ADDRESS, passive(), true);

    deposit(&mut system, ALICE, ETH_ADDRESS, eth(100)).unwrap();
    system.execute(&ctx(STAKER), Call::ForwardToStaking { asset: ETH_ADDRESS, amount: eth(70) }).unwrap();
    system.execute(&ctx(STAKER), Call::Stake { asset: ETH_ADDRESS, amount: eth(50) }).unwrap();

    let (second, index) = with_strategy(&mut system, ETH_ADDRESS, passive(), true);
    let output =
        system.execute(&ctx(STAKER), Call::Stake { asset: ETH_ADDRESS, amount: eth(20) }).unwrap();
    assert_eq!(output, CallOutput::Slot(index));

    let held = |system: &CustodySystem, strategy| system.strategies().total_assets(strategy, NOW).unwrap();
    assert_eq!(held(&system, first), eth(50));
    assert_eq!(held(&system, second), eth(20));

    system
        .execute(&ctx(STAKER), Call::Migrate { asset: ETH_ADDRESS, from: 0, to: 1, amount: eth(10) })
        .unwrap();
    assert_eq!(held(&system, first), eth(40));
    assert_eq!(held(&system, second), eth(30));

    let slots = system.strategy_slots(ETH_ADDRESS, NOW);
    assert_eq!(slots.len(), 2);
    assert!(!slots[0].active && slots[1].active);
    assert_eq!(slots[0].principal, eth(40));
    assert_conserved(&system, ETH_ADDRESS, NOW);
}

#[test]
fn test_duplicate_strategy_is_rejected() {
    let mut system = deployed();
    let (strategy, _) = with_strategy(&mut system, ETH_ADDRESS, passive(), false);

    assert_reverts(
        &mut system,
        &ctx(OWNER),
        Call::AddStrategy { asset: ETH_ADDRESS, strategy },
        CustodyError::DuplicateStrategy { asset: ETH_ADDRESS, strategy },
    );
    assert_eq!(system.staking_manager().registry().slot_count(ETH_ADDRESS), 1);
}

#[test]
fn test_failed_withdrawal_leaves_balances_untouched() {
    let mut system = deployed();
    let (strategy, _) = with_strategy(&mut system, ETH_ADDRESS, passive(), true);
    system.execute(&ctx(OWNER), Call::SetAutoStake { enabled: true }).unwrap();
    deposit(&mut system, ALICE, ETH_ADDRESS, eth(5)).unwrap();

    system.apply_venue_event(strategy, &VenueEvent::Halt, NOW).unwrap();

    assert_reverts(
        &mut system,
        &ctx(ALICE),
        Call::Withdraw { asset: ETH_ADDRESS, amount: eth(5) },
        CustodyError::WithdrawalUnavailable {
            asset: ETH_ADDRESS,
            requested: eth(5),
            reason: Box::new(CustodyError::InsufficientStrategyBalance {
                asset: ETH_ADDRESS,
                requested: eth(5),
                available: U256::ZERO,
            }),
        },
    );
    assert_eq!(system.deposit_manager().balance_of(ETH_ADDRESS, ALICE), Ok(eth(5)));

    let withdraw = Call::Withdraw { asset: ETH_ADDRESS, amount: eth(6) };
    assert_reverts(
        &mut system,
        &ctx(ALICE),
        withdraw,
        CustodyError::InsufficientBalance { requested: eth(6), available: eth(5) },
    );

    system.apply_venue_event(strategy, &VenueEvent::Resume, NOW).unwrap();
    system.execute(&ctx(ALICE), Call::Withdraw { asset: ETH_ADDRESS, amount: eth(5) }).unwrap();
    assert_eq!(system.ledger().balance_of(ETH_ADDRESS, ALICE), eth(100));
    assert_conserved(&system, ETH_ADDRESS, NOW);
}

#[test]
fn test_rejected_venue_deposit_reverts_user_deposit() {
    let mut system = deployed();
    let (strategy, _) = with_strategy(&mut system, ETH_ADDRESS, passive(), true);
    system.execute(&ctx(OWNER), Call::SetAutoStake { enabled: true }).unwrap();
    system
        .execute(
            &ctx(OWNER),
            Call::StrategyAdmin { strategy, call: StrategyAdmin::SetDepositCap(Some(eth(3))) },
        )
        .unwrap();

    deposit(&mut system, ALICE, ETH_ADDRESS, eth(2)).unwrap();

    let before = state_of(&system);
    let err = deposit(&mut system, ALICE, ETH_ADDRESS, eth(2)).unwrap_err();
    assert!(matches!(err, CustodyError::DepositRejected { strategy: s, .. } if s == strategy));
    assert_eq!(state_of(&system), before);
    assert_eq!(system.ledger().balance_of(ETH_ADDRESS, ALICE), eth(98));
}

#[test]
fn test_venue_callback_is_rejected_as_reentrancy() {
    let mut system = deployed();
    let (strategy, _) = with_strategy(&mut system, ETH_ADDRESS, passive(), true);
    system.execute(&ctx(OWNER), Call::SetAutoStake { enabled: true }).unwrap();
    deposit(&mut system, ALICE, ETH_ADDRESS, eth(1)).unwrap();

    let callback = Call::Withdraw { asset: ETH_ADDRESS, amount: eth(1) };
    system.attach_venue_callback(strategy, Some(callback)).unwrap();

    assert_reverts(
        &mut system,
        &ctx(ALICE).with_value(eth(1)),
        Call::Deposit { asset: ETH_ADDRESS, amount: eth(1) },
        CustodyError::ReentrancyDetected(Component::DepositManager),
    );

    // Calls that do not reach the venue are unaffected.
    system.execute(&ctx(ALICE), Call::Withdraw { asset: ETH_ADDRESS, amount: eth(1) }).unwrap();
    assert_conserved(&system, ETH_ADDRESS, NOW);
}

#[test]
fn test_withdrawal_pending_then_claimed() {
    let mut system = deployed();
    let (strategy, index) = with_strategy(&mut system, ETH_ADDRESS, eth_yield(), true);
    system.execute(&ctx(OWNER), Call::SetAutoStake { enabled: true }).unwrap();
    deposit(&mut system, ALICE, ETH_ADDRESS, eth(10)).unwrap();

    // Only the 10% liquid buffer is available synchronously.
    let err = system
        .execute(&ctx(ALICE), Call::Withdraw { asset: ETH_ADDRESS, amount: eth(5) })
        .unwrap_err();
    assert!(matches!(err, CustodyError::WithdrawalUnavailable { .. }));

    let output = system
        .execute(&ctx(STAKER), Call::RequestUnstake { asset: ETH_ADDRESS, index, amount: eth(5) })
        .unwrap();
    let ready_at = NOW + 86_400;
    assert_eq!(output, CallOutput::ReadyAt(Some(ready_at)));

    let err = system
        .execute(&ctx(STAKER), Call::UnstakeFrom { asset: ETH_ADDRESS, index, amount: eth(5) })
        .unwrap_err();
    assert_eq!(err, CustodyError::WithdrawalPending { strategy, ready_at: Some(ready_at) });
    assert!(err.is_retryable());

    let later = CallContext::new(ALICE).at(ready_at);
    system.execute(&later, Call::Withdraw { asset: ETH_ADDRESS, amount: eth(5) }).unwrap();
    assert_eq!(system.ledger().balance_of(ETH_ADDRESS, ALICE), eth(95));

    // Staking rewards accrued over the cooldown now back more than the receipts.
    assert!(system.total_underlying(ETH_ADDRESS, ready_at).unwrap() > supply(&system, ETH_ADDRESS));
}

#[test]
fn test_insolvent_venue_rejects_permanently() {
    let mut system = deployed();
    let (strategy, index) = with_strategy(&mut system, USDC, stable_yield(), true);
    system.execute(&ctx(OWNER), Call::SetAutoStake { enabled: true }).unwrap();
    deposit(&mut system, ALICE, USDC, usd(1_000)).unwrap();

    system.apply_venue_event(strategy, &VenueEvent::Utilization(usd(900)), NOW).unwrap();
    let err = system
        .execute(&ctx(STAKER), Call::UnstakeFrom { asset: USDC, index, amount: usd(500) })
        .unwrap_err();
    assert_eq!(err, CustodyError::WithdrawalPending { strategy, ready_at: None });

    system.apply_venue_event(strategy, &VenueEvent::Insolvency, NOW).unwrap();
    let err = system
        .execute(&ctx(STAKER), Call::UnstakeFrom { asset: USDC, index, amount: usd(50) })
        .unwrap_err();
    assert!(matches!(err, CustodyError::WithdrawalRejected { .. }));
    assert!(!err.is_retryable());

    let err = deposit(&mut system, BOB, USDC, usd(10)).unwrap_err();
    assert!(matches!(err, CustodyError::DepositRejected { .. }));

    assert_eq!(
        system.apply_venue_event(strategy, &VenueEvent::Loss(usd(1)), NOW),
        Ok(())
    );
    let passive_strategy = system.deploy_strategy(&ctx(OWNER), OWNER, USDC, passive()).unwrap();
    assert_eq!(
        system.apply_venue_event(passive_strategy, &VenueEvent::Insolvency, NOW),
        Err(CustodyError::UnsupportedVenueEvent { strategy: passive_strategy, event: "insolvency" })
    );
}

#[test]
fn test_venue_loss_does_not_freeze_custody() {
    let mut system = deployed();
    let (strategy, _) = with_strategy(&mut system, ETH_ADDRESS, passive(), true);
    system.execute(&ctx(OWNER), Call::SetAutoStake { enabled: true }).unwrap();
    deposit(&mut system, ALICE, ETH_ADDRESS, eth(10)).unwrap();

    system.apply_venue_event(strategy, &VenueEvent::Loss(eth(1)), NOW).unwrap();
    assert_eq!(system.total_underlying(ETH_ADDRESS, NOW), Ok(eth(9)));

    deposit(&mut system, BOB, ETH_ADDRESS, eth(3)).unwrap();
    system.execute(&ctx(BOB), Call::Withdraw { asset: ETH_ADDRESS, amount: eth(3) }).unwrap();

    // Nothing can mint against the shortfall.
    let harvest = Call::HarvestYield { asset: ETH_ADDRESS, to: OWNER };
    assert_eq!(system.execute(&ctx(OWNER), harvest), Ok(CallOutput::Amount(U256::ZERO)));
    assert_eq!(supply(&system, ETH_ADDRESS) - system.total_underlying(ETH_ADDRESS, NOW).unwrap(), eth(1));
}

#[test]
fn test_harvest_mints_accrued_yield() {
    let mut system = deployed();
    with_strategy(&mut system, USDC, stable_yield(), true);
    system.execute(&ctx(OWNER), Call::SetAutoStake { enabled: true }).unwrap();
    deposit(&mut system, ALICE, USDC, usd(10_000)).unwrap();

    let later = NOW + crate::strategy::venue::SECONDS_PER_YEAR / 2;
    let output = system
        .execute(&CallContext::new(OWNER).at(later), Call::HarvestYield { asset: USDC, to: BOB })
        .unwrap();

    assert_eq!(output, CallOutput::Amount(usd(400)));
    assert_eq!(system.deposit_manager().balance_of(USDC, BOB), Ok(usd(400)));
    assert_conserved(&system, USDC, later);

    let report = system.solvency_report(later);
    let usdc = report.iter().find(|r| r.asset == USDC).unwrap();
    assert_eq!(usdc.supply, usd(10_400));
    assert_eq!(usdc.underlying, usd(10_400));
    assert_eq!(usdc.symbol, "ewUSD");
}

#[test]
fn test_auto_stake_needs_operator_role() {
    let mut system = deployed();
    system.execute(&ctx(OWNER), Call::SetAutoStake { enabled: true }).unwrap();

    // Revoking the deposit manager's operator role would strand auto-staked deposits.
    assert_reverts(
        &mut system,
        &ctx(OWNER),
        Call::StakingAdmin(StakingAdmin::SetStaker(STAKER)),
        CustodyError::StakerUnset,
    );

    system.execute(&ctx(OWNER), Call::SetAutoStake { enabled: false }).unwrap();
    system.execute(&ctx(OWNER), Call::StakingAdmin(StakingAdmin::SetStaker(STAKER))).unwrap();
    assert_reverts(
        &mut system,
        &ctx(OWNER),
        Call::SetAutoStake { enabled: true },
        CustodyError::StakerUnset,
    );
}

#[test]
fn test_value_only_on_payable_calls() {
    let mut system = deployed();

    assert_reverts(
        &mut system,
        &ctx(OWNER).with_value(U256::from(1)),
        Call::SetAutoBridge { asset: ETH_ADDRESS, enabled: true },
        CustodyError::ValueMismatch { sent: U256::from(1), expected: U256::ZERO },
    );
    assert_reverts(
        &mut system,
        &ctx(ALICE).with_value(eth(1)),
        Call::Deposit { asset: USDC, amount: usd(1) },
        CustodyError::ValueMismatch { sent: eth(1), expected: U256::ZERO },
    );
}

#[test]
fn test_auto_bridge_through_executor() {
    let mut system = deployed();
    system.register_bridge(BRIDGE);

    for call in [
        Call::SetL1StandardBridge { bridge: BRIDGE },
        Call::DepositAdmin(DepositAdmin::SetL2Token { asset: ETH_ADDRESS, l2_token: L2_ETH }),
        Call::SetAutoBridge { asset: ETH_ADDRESS, enabled: true },
    ] {
        system.execute(&ctx(OWNER), call).unwrap();
    }

    deposit(&mut system, ALICE, ETH_ADDRESS, eth(4)).unwrap();

    let bridge = system.bridge(BRIDGE).unwrap();
    assert_eq!(bridge.deposits().len(), 1);
    assert_eq!(bridge.deposits()[0].to, ALICE);
    assert_eq!(system.deposit_manager().balance_of(ETH_ADDRESS, BRIDGE), Ok(eth(4)));
    assert_conserved(&system, ETH_ADDRESS, NOW);
}

#[test]
fn test_owner_only_administrative_surface() {
    let mut system = deployed();
    let (strategy, _) = with_strategy(&mut system, ETH_ADDRESS, passive(), false);
    let unauthorized = CustodyError::Unauthorized { caller: ALICE, role: Role::Owner };

    for call in [
        Call::AddStrategy { asset: ETH_ADDRESS, strategy },
        Call::SetActiveStrategy { asset: ETH_ADDRESS, index: 0 },
        Call::RemoveStrategy { asset: ETH_ADDRESS, index: 0 },
        Call::StakingAdmin(StakingAdmin::SetStaker(ALICE)),
        Call::SetAutoStake { enabled: true },
        Call::SetAutoBridge { asset: ETH_ADDRESS, enabled: true },
        Call::SetL1StandardBridge { bridge: BRIDGE },
        Call::DepositAdmin(DepositAdmin::TransferOwnership(ALICE)),
        Call::StrategyAdmin { strategy, call: StrategyAdmin::TransferOwnership(ALICE) },
        Call::HarvestYield { asset: ETH_ADDRESS, to: ALICE },
    ] {
        assert_reverts(&mut system, &ctx(ALICE), call, unauthorized.clone());
    }

    system
        .execute(&ctx(OWNER), Call::DepositAdmin(DepositAdmin::TransferOwnership(BOB)))
        .unwrap();
    system.execute(&ctx(BOB), Call::SetAutoBridge { asset: USDC, enabled: false }).unwrap();
    assert_reverts(
        &mut system,
        &ctx(OWNER),
        Call::SetAutoBridge { asset: USDC, enabled: false },
        CustodyError::Unauthorized { caller: OWNER, role: Role::Owner },
    );
}
