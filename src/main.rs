//! Leveraged Pools Settlement Simulation.
//!
//! Demonstrates the full settlement lifecycle including commit intake, the
//! front-running deferral, interval settlement sweeps, lazy aggregation,
//! claims, and delegated auto-claims.

use pools_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const HOUR: i64 = 3_600_000;

fn main() {
    println!("Leveraged Pools Settlement Engine Simulation");
    println!("Single Pool, Hourly Intervals, Full Lifecycle\n");

    scenario_1_basic_minting();
    scenario_2_value_transfer();
    scenario_3_burns_and_switches();
    scenario_4_front_running_deferral();
    scenario_5_auto_claims();
    scenario_6_lazy_aggregation();
    scenario_7_stress_test();

    println!("\nAll simulations completed successfully.");
}

/// Deposit, commit a mint on each side, settle one interval, claim.
fn scenario_1_basic_minting() {
    println!("Scenario 1: Basic Mint Lifecycle\n");

    let mut engine = Engine::new(EngineConfig::default());
    let pool = engine.create_pool(PoolConfig::eth_3x(), dec!(2000)).unwrap();

    let alice = UserId(1);
    let bob = UserId(2);

    engine.deposit(alice, Quote::new(dec!(10000)));
    engine.deposit(bob, Quote::new(dec!(10000)));

    println!("  Alice and Bob each deposit $10,000");
    println!("  Pool tracks ETH/USD at $2,000, 3x leverage\n");

    let long = engine
        .commit(Caller::User(alice), pool, CommitArgs::new(CommitType::LongMint, dec!(5000)))
        .unwrap();
    let short = engine
        .commit(Caller::User(bob), pool, CommitArgs::new(CommitType::ShortMint, dec!(5000)))
        .unwrap();

    println!("  Alice commits $5,000 long mint into interval {}", long.interval_id.value());
    println!("  Bob commits $5,000 short mint into interval {}", short.interval_id.value());

    let mut keeper = PoolKeeper::new();
    keeper.bind(
        pool,
        SpotOracle::with_price(Timestamp::from_millis(0), Price::new_unchecked(dec!(2000))),
    );

    engine.advance_time(HOUR);
    let result = keeper.perform_upkeep_single_pool(&mut engine, pool).unwrap();
    println!("  One hour passes, keeper settles {} interval(s)\n", result.intervals_settled);

    let alice_claim = engine.claim(Caller::User(alice), pool).unwrap();
    let bob_claim = engine.claim(Caller::User(bob), pool).unwrap();

    println!("  Alice claims {} long tokens", alice_claim.long_tokens.value());
    println!("  Bob claims {} short tokens", bob_claim.short_tokens.value());
    print_pool(&engine, pool);
    println!();
}

/// Leveraged value transfer between the sides as the tracked price moves.
fn scenario_2_value_transfer() {
    println!("Scenario 2: Leveraged Value Transfer\n");

    let mut engine = Engine::new(EngineConfig::default());
    let pool = engine.create_pool(PoolConfig::eth_3x(), dec!(2000)).unwrap();

    let alice = UserId(1);
    let bob = UserId(2);
    engine.deposit(alice, Quote::new(dec!(10000)));
    engine.deposit(bob, Quote::new(dec!(10000)));

    engine.commit(Caller::User(alice), pool, CommitArgs::new(CommitType::LongMint, dec!(10000))).unwrap();
    engine.commit(Caller::User(bob), pool, CommitArgs::new(CommitType::ShortMint, dec!(10000))).unwrap();

    let mut keeper = PoolKeeper::new();
    keeper.bind(
        pool,
        SpotOracle::with_price(Timestamp::from_millis(0), Price::new_unchecked(dec!(2000))),
    );

    engine.advance_time(HOUR);
    keeper.perform_upkeep_single_pool(&mut engine, pool).unwrap();

    println!("  Both sides seeded with $10,000 at $2,000");
    print_pool(&engine, pool);

    for (price, label) in [(dec!(2020), "+1.0%"), (dec!(1980), "-2.0%"), (dec!(2100), "+6.1%")] {
        engine.advance_time(HOUR);
        keeper
            .oracle_mut(pool)
            .unwrap()
            .set_price(engine.time(), Price::new_unchecked(price));
        keeper.perform_upkeep_single_pool(&mut engine, pool).unwrap();

        println!("\n  ETH moves to ${} ({})", price, label);
        print_pool(&engine, pool);
    }

    let pool_state = engine.get_pool(pool).unwrap();
    println!("\n  Total fees skimmed: ${}", pool_state.total_fees.value().round_dp(2));
    println!("  Fee account holds: ${}\n", engine.ledger().balance(Holder::FeeAccount, TokenId::Settlement).round_dp(2));
}

/// Burning back to settlement asset and switching sides without leaving the pool.
fn scenario_3_burns_and_switches() {
    println!("Scenario 3: Burns and Switches\n");

    let mut engine = Engine::new(EngineConfig::default());
    let mut config = PoolConfig::eth_3x();
    config.fee_rate = Decimal::ZERO;
    let pool = engine.create_pool(config, dec!(2000)).unwrap();

    let alice = UserId(1);
    let bob = UserId(2);
    engine.deposit(alice, Quote::new(dec!(8000)));
    engine.deposit(bob, Quote::new(dec!(8000)));

    engine.commit(Caller::User(alice), pool, CommitArgs::new(CommitType::LongMint, dec!(8000))).unwrap();
    engine.commit(Caller::User(bob), pool, CommitArgs::new(CommitType::ShortMint, dec!(8000))).unwrap();

    let mut keeper = PoolKeeper::new();
    keeper.bind(
        pool,
        SpotOracle::with_price(Timestamp::from_millis(0), Price::new_unchecked(dec!(2000))),
    );

    engine.advance_time(HOUR);
    keeper.perform_upkeep_single_pool(&mut engine, pool).unwrap();
    engine.claim(Caller::User(alice), pool).unwrap();
    engine.claim(Caller::User(bob), pool).unwrap();

    println!("  Alice holds {} long tokens, Bob holds {} short tokens",
        engine.token_balance(alice, pool, Side::Long).value(),
        engine.token_balance(bob, pool, Side::Short).value());

    engine.commit(Caller::User(alice), pool, CommitArgs::new(CommitType::LongBurn, dec!(3000))).unwrap();
    engine.commit(Caller::User(bob), pool, CommitArgs::new(CommitType::ShortBurnLongMint, dec!(2000))).unwrap();

    println!("  Alice commits a 3,000 token long burn");
    println!("  Bob switches 2,000 short tokens to the long side");

    engine.advance_time(HOUR);
    keeper.perform_upkeep_single_pool(&mut engine, pool).unwrap();

    let alice_claim = engine.claim(Caller::User(alice), pool).unwrap();
    let bob_claim = engine.claim(Caller::User(bob), pool).unwrap();

    println!("  Alice claims ${} of settlement asset", alice_claim.settlement.value());
    println!("  Bob claims {} long tokens", bob_claim.long_tokens.value());
    print_pool(&engine, pool);
    println!();
}

/// Commits near an interval boundary defer to the next interval.
fn scenario_4_front_running_deferral() {
    println!("Scenario 4: Front-Running Deferral\n");

    let mut engine = Engine::new(EngineConfig::default());
    let pool = engine.create_pool(PoolConfig::eth_3x(), dec!(2000)).unwrap();

    let alice = UserId(1);
    engine.deposit(alice, Quote::new(dec!(10000)));

    // 50 minutes in: outside the 5-minute window
    engine.set_time(Timestamp::from_millis(50 * 60 * 1000));
    let early = engine
        .commit(Caller::User(alice), pool, CommitArgs::new(CommitType::LongMint, dec!(1000)))
        .unwrap();
    println!("  Commit at :50 lands in interval {}", early.interval_id.value());

    // 58 minutes in: inside the window, deferred
    engine.set_time(Timestamp::from_millis(58 * 60 * 1000));
    let late = engine
        .commit(Caller::User(alice), pool, CommitArgs::new(CommitType::LongMint, dec!(1000)))
        .unwrap();
    println!("  Commit at :58 defers to interval {}", late.interval_id.value());

    engine.uncommit(Caller::User(alice), pool, late.commit_id).unwrap();
    println!("  Deferred commit cancelled before execution, $1,000 refunded");
    println!("  Alice settlement balance: ${}\n", engine.settlement_balance(alice).value());
}

/// Users escrow rewards so a bot can claim for them once intervals settle.
fn scenario_5_auto_claims() {
    println!("Scenario 5: Delegated Auto-Claims\n");

    let mut engine = Engine::new(EngineConfig::default());
    let pool = engine.create_pool(PoolConfig::eth_3x(), dec!(2000)).unwrap();

    let users = [UserId(1), UserId(2), UserId(3)];
    let bot = UserId(99);

    for user in users {
        engine.deposit(user, Quote::new(dec!(1000)));
        engine
            .commit(
                Caller::User(user),
                pool,
                CommitArgs::new(CommitType::LongMint, dec!(500)).with_claim_reward(dec!(5)),
            )
            .unwrap();
    }

    println!("  Three users commit $500 mints, each escrowing a $5 claim reward");

    let mut keeper = PoolKeeper::new();
    keeper.bind(
        pool,
        SpotOracle::with_price(Timestamp::from_millis(0), Price::new_unchecked(dec!(2000))),
    );
    engine.advance_time(HOUR);
    keeper.perform_upkeep_single_pool(&mut engine, pool).unwrap();

    let pairs: Vec<(UserId, PoolId)> = users.iter().map(|&u| (u, pool)).collect();
    let executed = engine.execute_claims(bot, &pairs);

    println!("  Bot executes {} claims after settlement", executed);
    println!("  Bot collected ${} in rewards", engine.settlement_balance(bot).value());
    for user in users {
        println!(
            "    User {} holds {} long tokens without claiming",
            user.0,
            engine.token_balance(user, pool, Side::Long).value()
        );
    }
    println!();
}

/// A long commit history folds a few intervals at a time, never unboundedly.
fn scenario_6_lazy_aggregation() {
    println!("Scenario 6: Lazy Aggregation\n");

    let mut engine = Engine::new(EngineConfig::default());
    let mut config = PoolConfig::eth_3x();
    config.fee_rate = Decimal::ZERO;
    let pool = engine.create_pool(config, dec!(2000)).unwrap();

    let alice = UserId(1);
    engine.deposit(alice, Quote::new(dec!(2000)));

    let mut keeper = PoolKeeper::new();
    keeper.bind(
        pool,
        SpotOracle::with_price(Timestamp::from_millis(0), Price::new_unchecked(dec!(2000))),
    );

    for _ in 0..12 {
        engine
            .commit(Caller::User(alice), pool, CommitArgs::new(CommitType::LongMint, dec!(100)))
            .unwrap();
        engine.advance_time(HOUR);
        keeper.perform_upkeep_single_pool(&mut engine, pool).unwrap();
    }

    println!("  Alice minted $100 in each of 12 settled intervals");
    println!("  Pool folds at most {} intervals per call\n", PoolConfig::eth_3x().max_iterations);

    loop {
        let folded = engine.update_aggregate_balance(pool, alice).unwrap();
        if folded == 0 {
            break;
        }
        let balance = engine.aggregate_balance(pool, alice).unwrap();
        println!("  Folded {} intervals, aggregate now {} long tokens", folded, balance.long_tokens.value());
    }

    let claim = engine.claim(Caller::User(alice), pool).unwrap();
    println!("  Final claim delivers {} long tokens\n", claim.long_tokens.value());
}

/// Many users, mixed commit types, a volatile price path.
fn scenario_7_stress_test() {
    println!("Scenario 7: Stress Test\n");

    let mut engine = Engine::new(EngineConfig::default());
    let pool = engine.create_pool(PoolConfig::eth_3x(), dec!(2000)).unwrap();

    let num_users: u64 = 20;
    let users: Vec<UserId> = (1..=num_users).map(UserId).collect();
    for (i, &user) in users.iter().enumerate() {
        let capital = dec!(500) + Decimal::from(i as u32) * dec!(250);
        engine.deposit(user, Quote::new(capital));
    }

    println!("  Created {} users with $500 to $5,250", num_users);

    let mut keeper = PoolKeeper::new();
    keeper.bind(
        pool,
        SpotOracle::with_price(Timestamp::from_millis(0), Price::new_unchecked(dec!(2000))),
    );

    let prices = [
        dec!(2020), dec!(2045), dec!(2010), dec!(1980), dec!(1950),
        dec!(1985), dec!(2060), dec!(2090), dec!(2000), dec!(1940),
        dec!(1890), dec!(1850), dec!(1880), dec!(1930), dec!(1975),
    ];

    let mut commit_count = 0;
    for (round, &price) in prices.iter().enumerate() {
        for (i, &user) in users.iter().enumerate() {
            if (round + i) % 3 == 0 {
                let commit_type = if i % 2 == 0 { CommitType::LongMint } else { CommitType::ShortMint };
                let amount = dec!(50) + Decimal::from(i as u32 % 5) * dec!(25);
                if engine.commit(Caller::User(user), pool, CommitArgs::new(commit_type, amount)).is_ok() {
                    commit_count += 1;
                }
            } else if (round + i) % 7 == 0 {
                let commit_type = if i % 2 == 0 { CommitType::LongBurn } else { CommitType::ShortBurnLongMint };
                let args = CommitArgs::new(commit_type, dec!(10)).from_aggregate();
                if engine.commit(Caller::User(user), pool, args).is_ok() {
                    commit_count += 1;
                }
            }
        }

        engine.advance_time(HOUR);
        keeper
            .oracle_mut(pool)
            .unwrap()
            .set_price(engine.time(), Price::new_unchecked(price));
        if keeper.check_upkeep(&engine, pool) {
            keeper.perform_upkeep_single_pool(&mut engine, pool).unwrap();
        }
    }

    let state = engine.get_pool(pool).unwrap();
    println!("  Executed {} commits over {} settled intervals", commit_count, state.last_settled_interval.value());
    println!("  Price range: $1,850 to $2,090, final ${}", state.last_settled_price.value());
    print_pool(&engine, pool);
    println!("  Total fees skimmed: ${}", state.total_fees.value().round_dp(2));
    println!("  Live commits still queued: {}", state.queue.live_count());

    let check = engine.check_invariants(pool).unwrap();
    println!("  Vault backing intact: {}", check.is_intact());
    println!("  Events generated: {}", engine.events().len());
}

fn print_pool(engine: &Engine, pool_id: PoolId) {
    let pool = engine.get_pool(pool_id).unwrap();
    let prices = pool.current_prices();
    println!(
        "    long ${} @ {} / token, short ${} @ {} / token",
        pool.side_balance(Side::Long).value().round_dp(2),
        prices.long_price.round_dp(4),
        pool.side_balance(Side::Short).value().round_dp(2),
        prices.short_price.round_dp(4),
    );
}
