//! habitpact walkthrough: the full life of a staked habit.
//!
//! Two users run the same habit for a few simulated days. Alice checks in
//! every day and her stakes come back as rewards, auto-staked into the
//! yield adapter; Bob skips every other day and forfeits those stakes to
//! the treasury. Days are driven by a manual clock so the whole scenario
//! runs instantly.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use habitpact_adapters::MockStakingRewards;
use habitpact_core::{
    Amount, HabitTracker, ManualClock, StakingAdapter, TrackerConfig, UserBalances, UserId, UNIT,
};

#[derive(Debug, Parser)]
#[command(name = "daily-settlement", version, about = "habitpact end-to-end walkthrough")]
struct Cli {
    /// Number of days to simulate.
    #[arg(long, default_value_t = 4)]
    days: u64,
    /// Stake per habit per day, in whole units.
    #[arg(long, default_value_t = 10)]
    stake: u64,
    /// Adapter yield per second per whole staked unit, in base units.
    #[arg(long, default_value_t = 35_000_000_000_000)]
    rate_per_second: u64,
}

fn units(amount: Amount) -> String {
    format!("{}.{:02}", amount / UNIT, amount % UNIT * 100 / UNIT)
}

fn separator() {
    println!("{}", "━".repeat(72).dimmed());
}

fn header(title: &str) {
    println!();
    println!("{}", "═".repeat(72).cyan());
    println!("  {}", title.cyan().bold());
    println!("{}", "═".repeat(72).cyan());
}

fn print_balances(label: &str, balances: &UserBalances) {
    println!(
        "  {} {label}: deposit {} | blocked {} | claimable {}",
        "├".dimmed(),
        units(balances.deposit).yellow(),
        units(balances.blocked).yellow(),
        units(balances.claimable).green(),
    );
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let alice = UserId::new("alice");
    let bob = UserId::new("bob");
    let owner = UserId::new("deployer");

    let clock = Arc::new(ManualClock::starting_at(1_700_000_000));
    let mut tracker = HabitTracker::with_clock(
        TrackerConfig::new(owner.clone(), UserId::new("treasury"))
            .with_stake_per_day(Amount::from(cli.stake) * UNIT),
        clock.clone(),
    )?;

    let adapter = Arc::new(MockStakingRewards::new(
        Amount::from(cli.rate_per_second),
        clock.clone(),
    )?);
    adapter.fund(1_000 * UNIT);
    tracker.set_staking_adapter(&owner, Some(adapter.clone()))?;

    header("Setup: deposits and habits");
    tracker.deposit(&alice, 100 * UNIT)?;
    tracker.deposit(&bob, 100 * UNIT)?;
    let alice_habit = tracker.create_habit(&alice, "Exercise")?;
    let bob_habit = tracker.create_habit(&bob, "Exercise")?;
    println!(
        "  {} both users deposited {} and created habit \"Exercise\"",
        "├".dimmed(),
        units(100 * UNIT).yellow()
    );
    print_balances("alice", &tracker.balances(&alice));
    print_balances("bob  ", &tracker.balances(&bob));

    header(&format!("{} days of funding, check-ins, settlement", cli.days));
    for day in 0..cli.days {
        let epoch = tracker.epoch_now();
        tracker.prepare_day(&alice, epoch)?;
        tracker.prepare_day(&bob, epoch)?;

        tracker.check_in(&alice, alice_habit, epoch)?;
        let bob_checked = day % 2 == 0;
        if bob_checked {
            tracker.check_in(&bob, bob_habit, epoch)?;
        }

        clock.advance_days(1);
        let alice_settled = tracker.settle_all(&alice, epoch, 16)?;
        let bob_settled = tracker.settle_all(&bob, epoch, 16)?;

        println!(
            "  {} day {}: alice {} ({} settled), bob {} ({} settled)",
            "├".dimmed(),
            day + 1,
            "checked in".green(),
            alice_settled,
            if bob_checked {
                "checked in".green()
            } else {
                "missed".red()
            },
            bob_settled,
        );
        separator();
    }

    header("Where the stakes went");
    print_balances("alice", &tracker.balances(&alice));
    print_balances("bob  ", &tracker.balances(&bob));
    println!(
        "  {} alice auto-staked rewards: {} (pending yield {})",
        "├".dimmed(),
        units(adapter.staked_amount(&alice)).green().bold(),
        units(adapter.pending_rewards(&alice)).green(),
    );
    println!(
        "  {} treasury received from forfeits: {}",
        "└".dimmed(),
        units(tracker.treasury_received()).red().bold(),
    );

    header("Claim everything");
    let alice_payout = tracker.claim_all(&alice)?;
    let bob_payout = tracker.claim_all(&bob)?;
    println!(
        "  {} alice claimed {} (principal + yield)",
        "├".dimmed(),
        units(alice_payout).green().bold()
    );
    println!(
        "  {} bob claimed {}",
        "├".dimmed(),
        units(bob_payout).green()
    );
    println!(
        "  {} {} events recorded in the tracker log",
        "└".dimmed(),
        tracker.events().len()
    );

    Ok(())
}
