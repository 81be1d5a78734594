//! inheritance-node — standalone demo binary for the inheritance module.
//!
//! Wires a `StateEngine` to the in-memory reference implementations of
//! every external module and walks it through a scripted dead-man-switch
//! scenario, narrating each step via `tracing`. There is no P2P or RPC
//! layer here — this binary exists to exercise the state machine end to
//! end, not to run a network.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use inheritance_core::actions::{Action, BeneficiaryInput};
use inheritance_core::types::Address;
use inheritance_external::memory::{
    MemoryAccountRegistry, MemoryBanRegistry, MemoryEquity, MemoryEscrow, MemoryLedger, MemoryLending, MemoryStaking,
};
use inheritance_external::ExternalModules;
use inheritance_query::{ActivityQuery, ClaimQuery, PlanQuery, TriggerQuery};
use inheritance_state::{StateDb, StateEngine};

const DAY: i64 = 24 * 3600;

#[derive(Parser, Debug)]
#[command(name = "inheritance-node", version, about = "Inheritance module demo node")]
struct Args {
    /// Directory for the persistent state database. If omitted, a
    /// throwaway temporary database is used instead.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    info!("inheritance-node demo starting");

    let db = match &args.data_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).with_context(|| format!("creating data dir {}", dir.display()))?;
            StateDb::open(dir).context("opening state database")?
        }
        None => StateDb::open_temp().context("opening temporary state database")?,
    };

    let owner = Address::from_seed(b"demo-owner");
    let first_beneficiary = Address::from_seed(b"demo-beneficiary-1");
    let second_beneficiary = Address::from_seed(b"demo-beneficiary-2");

    let ledger = MemoryLedger::new();
    ledger.set_balance(&owner, "uhodl", 10_000_000_000);
    let equity = MemoryEquity::new();
    equity.set_holding(&owner, 1, 1, 1_000);
    let staking = MemoryStaking::new();
    staking.set_stake(&owner, 500_000_000);

    let ext = ExternalModules {
        ledger: Box::new(ledger),
        equity: Box::new(equity),
        staking: Box::new(staking),
        lending: Box::new(MemoryLending::new()),
        escrow: Box::new(MemoryEscrow::new()),
        ban_registry: Box::new(MemoryBanRegistry::new()),
        account_registry: Box::new(MemoryAccountRegistry::new()),
    };
    let engine = StateEngine::new(db, ext);

    let mut now: i64 = 1_700_000_000;
    let mut height: u64 = 1;

    info!("creating a plan with two beneficiaries (60% / 40%)");
    let action = Action::CreatePlan {
        beneficiaries: vec![
            BeneficiaryInput { address: first_beneficiary.clone(), priority: 1, percentage_ppm: 600_000, specific_assets: vec![] },
            BeneficiaryInput { address: second_beneficiary.clone(), priority: 2, percentage_ppm: 400_000, specific_assets: vec![] },
        ],
        inactivity_period_secs: 365 * DAY,
        grace_period_secs: 30 * DAY,
        claim_window_secs: 180 * DAY,
        charity_address: None,
    };
    let events = engine.apply(&owner, &action, now, height)?;
    let plan_id = events
        .iter()
        .find_map(|e| match e {
            inheritance_core::events::Event::PlanCreated { plan_id, .. } => Some(*plan_id),
            _ => None,
        })
        .expect("CreatePlan always emits PlanCreated");
    info!("{}", PlanQuery::new(&engine.db).describe(plan_id)?);

    info!("simulating 366 days of owner silence");
    now += 366 * DAY;
    height += 1;
    let events = engine.apply(&first_beneficiary, &Action::TriggerSwitch { plan_id }, now, height)?;
    for e in &events {
        info!(?e, "event");
    }
    info!(
        seconds_remaining = TriggerQuery::new(&engine.db).seconds_until_expiry(plan_id, now)?.unwrap_or(-1),
        "grace period armed"
    );

    info!("advancing past the grace period");
    now += 30 * DAY;
    height += 1;
    let events = engine.run_end_of_block(now)?;
    for e in &events {
        info!(?e, "event");
    }

    info!("first beneficiary claims their share");
    let events = engine.apply(&first_beneficiary, &Action::ClaimAssets { plan_id }, now, height)?;
    for e in &events {
        info!(?e, "event");
    }

    info!("second beneficiary claims their share");
    height += 1;
    let events = engine.apply(&second_beneficiary, &Action::ClaimAssets { plan_id }, now, height)?;
    for e in &events {
        info!(?e, "event");
    }

    info!("{}", PlanQuery::new(&engine.db).describe(plan_id)?);
    for claim in ClaimQuery::new(&engine.db).all_for_plan(plan_id)? {
        info!(beneficiary = %claim.address, status = ?claim.status, "final claim state");
    }
    info!(
        last_seen = ActivityQuery::new(&engine.db).last_seen(&owner)?.unwrap_or(0),
        "owner's last recorded activity"
    );

    Ok(())
}
