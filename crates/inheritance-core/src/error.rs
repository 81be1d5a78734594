use thiserror::Error;

/// The module's full error taxonomy. Validation errors abort the
/// whole message; asset-transfer errors are collected and logged by the
/// caller instead of propagating here.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum InheritanceError {
    // ── Plan validation ──────────────────────────────────────────────────
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error("plan not found: {0}")]
    PlanNotFound(u64),

    #[error("unauthorized: caller is not the plan owner")]
    Unauthorized,

    #[error("invalid beneficiary: {0}")]
    InvalidBeneficiary(String),

    #[error("beneficiary is banned: {0}")]
    BeneficiaryBanned(String),

    #[error("owner is banned: {0}")]
    OwnerBanned(String),

    #[error("invalid inactivity period: minimum {min} seconds required")]
    InvalidInactivity { min: i64 },

    #[error("invalid grace period: minimum {min} seconds required")]
    InvalidGracePeriod { min: i64 },

    #[error("invalid claim window: must be between {min} and {max} seconds")]
    InvalidClaimWindow { min: i64, max: i64 },

    // ── Trigger ───────────────────────────────────────────────────────────
    #[error("trigger not found for plan {0}")]
    TriggerNotFound(u64),

    #[error("trigger grace period has not yet expired")]
    TriggerNotExpired,

    // ── Claim ─────────────────────────────────────────────────────────────
    #[error("claim not found for plan {plan_id}, beneficiary {addr}")]
    ClaimNotFound { plan_id: u64, addr: String },

    #[error("claim window is closed")]
    ClaimWindowClosed,

    #[error("claim has already been processed")]
    ClaimAlreadyProcessed,

    #[error("a claim is already in progress for plan {0}")]
    ClaimInProgress(u64),

    // ── Asset transfer ────────────────────────────────────────────────────
    #[error("insufficient assets to transfer")]
    InsufficientAssets,

    #[error("asset transfer failed: {0}")]
    AssetTransferFailed(String),

    #[error("invalid asset type: {0}")]
    InvalidAssetType(String),

    // ── Plan construction ─────────────────────────────────────────────────
    #[error("too many beneficiaries: maximum {max}, got {got}")]
    TooManyBeneficiaries { max: u32, got: u32 },

    #[error("invalid percentage: sum of beneficiary percentages must equal exactly 1 (got {got_ppm} / 1_000_000)")]
    InvalidPercentage { got_ppm: u64 },

    #[error("duplicate beneficiary priority: {0}")]
    DuplicatePriority(u32),

    // ── State machine guards ──────────────────────────────────────────────
    #[error("plan is already triggered")]
    PlanAlreadyTriggered,

    #[error("plan is not active")]
    PlanNotActive,

    #[error("plan cannot be modified in its current status")]
    CannotModifyPlan,

    #[error("owner is still active; inactivity period has not elapsed")]
    OwnerStillActive,

    #[error("maximum cascade depth reached")]
    MaxCascadeDepthReached,

    // ── Storage / codec ────────────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Other(String),
}
