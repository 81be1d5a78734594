use serde::Serialize;

use crate::entities::TransferredAsset;
use crate::types::{Address, Balance, BlockTime, PlanId};

/// The module's required event set. `StateEngine` methods return the
/// events a call produced alongside their `Result`, so a caller (or test) can
/// assert on them directly instead of scraping log output.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub enum Event {
    PlanCreated { plan_id: PlanId, owner: Address },
    PlanUpdated { plan_id: PlanId },
    PlanCancelled { plan_id: PlanId },
    PlanCompleted { plan_id: PlanId },

    SwitchTriggered { plan_id: PlanId, grace_period_end: BlockTime },
    SwitchCancelled { plan_id: PlanId, reason: CancelReason },
    GracePeriodExpired { plan_id: PlanId },

    ActivityRecorded { address: Address, block_time: BlockTime },

    ClaimWindowOpened { plan_id: PlanId, beneficiary: Address, window_start: BlockTime, window_end: BlockTime },
    ClaimWindowClosed { plan_id: PlanId, beneficiary: Address, reason: ClaimCloseReason },
    AssetsClaimed { plan_id: PlanId, beneficiary: Address, assets: Vec<TransferredAsset> },
    BeneficiarySkipped { plan_id: PlanId, beneficiary: Address, reason: SkipReason },
    AssetsToCharity { plan_id: PlanId, charity: Address },

    StakedAssetsTransferred { plan_id: PlanId, beneficiary: Address, amount: Balance },
    LoanPositionTransferred { plan_id: PlanId, beneficiary: Address, loan_id: u64 },
    EscrowPositionTransferred { plan_id: PlanId, beneficiary: Address, escrow_id: u64 },
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub enum CancelReason {
    ManualCancel,
    OwnerActivity,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub enum ClaimCloseReason {
    Expired,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub enum SkipReason {
    BeneficiaryBanned,
    ClaimWindowExpired,
}
