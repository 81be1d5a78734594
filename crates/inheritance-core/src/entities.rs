use serde::{Deserialize, Serialize};

use crate::types::{Address, Balance, BlockTime, PlanId, Seconds};

// ── Params ────────────────────────────────────────────────────────────────────

/// Chain-wide configuration for the module. A singleton, set at
/// genesis and updatable only by the chain authority.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Params {
    pub min_inactivity_period_secs: Seconds,
    pub min_grace_period_secs: Seconds,
    pub min_claim_window_secs: Seconds,
    pub max_claim_window_secs: Seconds,
    pub ultra_long_inactivity_secs: Seconds,
    pub max_beneficiaries: u32,
    pub default_charity_address: Option<Address>,
    /// Added after genesis for networks that want claim-lock metrics surfaced
    /// without a schema migration.
    #[serde(default)]
    pub extension_data: Vec<u8>,
}

impl Params {
    pub fn defaults() -> Self {
        use crate::constants::*;
        Self {
            min_inactivity_period_secs: DEFAULT_MIN_INACTIVITY_PERIOD_SECS,
            min_grace_period_secs: DEFAULT_MIN_GRACE_PERIOD_SECS,
            min_claim_window_secs: DEFAULT_MIN_CLAIM_WINDOW_SECS,
            max_claim_window_secs: DEFAULT_MAX_CLAIM_WINDOW_SECS,
            ultra_long_inactivity_secs: DEFAULT_ULTRA_LONG_INACTIVITY_SECS,
            max_beneficiaries: DEFAULT_MAX_BENEFICIARIES,
            default_charity_address: None,
            extension_data: Vec::new(),
        }
    }
}

// ── Plan / Beneficiary ───────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum PlanStatus {
    Active,
    Triggered,
    Executing,
    Completed,
    Cancelled,
}

/// A single allocation transferred in full, ahead of the percentage step
/// allocation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SpecificAsset {
    Fungible { denom: String, amount: Balance },
    Equity { company_id: u64, class_id: u32, shares: u128 },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Beneficiary {
    pub address: Address,
    /// Strictly positive, unique within a plan, lower = earlier.
    pub priority: u32,
    /// Parts-per-million, in `[0, 1_000_000]`.
    pub percentage_ppm: u64,
    #[serde(default)]
    pub specific_assets: Vec<SpecificAsset>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Plan {
    pub plan_id: PlanId,
    pub owner: Address,
    pub beneficiaries: Vec<Beneficiary>,
    pub inactivity_period_secs: Seconds,
    pub grace_period_secs: Seconds,
    pub claim_window_secs: Seconds,
    pub charity_address: Option<Address>,
    pub status: PlanStatus,
    pub created_at: BlockTime,
    pub updated_at: BlockTime,
}

// ── SwitchTrigger ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TriggerStatus {
    Active,
    Expired,
    Cancelled,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SwitchTrigger {
    pub plan_id: PlanId,
    pub status: TriggerStatus,
    pub triggered_at: BlockTime,
    pub grace_period_end: BlockTime,
}

// ── BeneficiaryClaim ──────────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClaimStatus {
    Pending,
    Open,
    Processing,
    Claimed,
    Expired,
    Skipped,
}

/// Receipt of a single asset movement, accumulated on a claim for audit.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum TransferredAsset {
    Fungible { denom: String, amount: Balance, transferred_at: BlockTime },
    Equity { company_id: u64, class_id: u32, shares: u128, transferred_at: BlockTime },
    Staked { amount: Balance, transferred_at: BlockTime },
    LoanPosition { loan_id: u64, transferred_at: BlockTime },
    EscrowPosition { escrow_id: u64, transferred_at: BlockTime },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BeneficiaryClaim {
    pub plan_id: PlanId,
    pub address: Address,
    pub status: ClaimStatus,
    /// Copied from the plan at initialization; immutable thereafter.
    pub percentage_ppm: u64,
    pub priority: u32,
    pub claim_window_start: BlockTime,
    pub claim_window_end: BlockTime,
    pub claimed_at: Option<BlockTime>,
    #[serde(default)]
    pub transferred: Vec<TransferredAsset>,
}

// ── ActivityRecord ────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActivityType {
    Transfer,
    PlanMutation,
    Other,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub address: Address,
    pub block_time: BlockTime,
    pub block_height: u64,
    pub activity_type: ActivityType,
}

// ── LockedAssets ──────────────────────────────────────────────────────────────

/// Optional snapshot of the owner's holdings taken at trigger time, used only
/// for audit/display purposes; the authoritative balances always live in the
/// external ledger/equity/staking modules.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct LockedAssets {
    pub plan_id: PlanId,
    pub fungible: Vec<(String, Balance)>,
    pub equity: Vec<(u64, u32, u128)>,
    pub staked: Balance,
}
