use serde::{Deserialize, Serialize};

use crate::types::{Address, PlanId, Seconds};

/// Every user-submitted message this module accepts. Authentication of
/// the sender (signature/nonce verification) is the host runtime's concern;
/// by the time an `Action` reaches the engine, `sender` has already been
/// proven to be whoever is named.
///
/// `RecordActivity` deliberately has no variant here: per the resolved open
/// question, activity recording is not a publicly dispatchable
/// message. It is driven only from the trusted hook in
/// `StateEngine::apply`, which already knows the authenticated sender.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum Action {
    CreatePlan {
        beneficiaries: Vec<BeneficiaryInput>,
        inactivity_period_secs: Seconds,
        grace_period_secs: Seconds,
        claim_window_secs: Seconds,
        charity_address: Option<Address>,
    },
    UpdatePlan {
        plan_id: PlanId,
        beneficiaries: Vec<BeneficiaryInput>,
        inactivity_period_secs: Seconds,
        grace_period_secs: Seconds,
        claim_window_secs: Seconds,
        charity_address: Option<Address>,
    },
    CancelPlan {
        plan_id: PlanId,
    },
    CancelTrigger {
        plan_id: PlanId,
    },
    /// Arms the dead-man switch once the owner's inactivity period has
    /// elapsed. Not owner-restricted: no authorization rule is given for
    /// this operation beyond the inactivity/ban checks it performs itself,
    /// so (as with a permissionless liveness-check message in a real chain
    /// module) any account may submit it — the guards inside the handler,
    /// not the sender, decide whether it succeeds.
    TriggerSwitch {
        plan_id: PlanId,
    },
    ClaimAssets {
        plan_id: PlanId,
    },
}

/// Wire-level shape of a beneficiary inside `CreatePlan`/`UpdatePlan`, kept
/// separate from `inheritance_core::entities::Beneficiary` because the input
/// carries no derived/runtime state.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BeneficiaryInput {
    pub address: Address,
    pub priority: u32,
    pub percentage_ppm: u64,
    #[serde(default)]
    pub specific_assets: Vec<crate::entities::SpecificAsset>,
}
