use inheritance_core::constants::MAX_PLANS_PER_QUERY;
use inheritance_core::entities::{BeneficiaryClaim, ClaimStatus, Plan, PlanStatus, SwitchTrigger, TriggerStatus};
use inheritance_core::error::InheritanceError;
use inheritance_core::types::{Address, BlockTime, PlanId};
use inheritance_state::StateDb;

/// Query helpers for inheritance plans.
pub struct PlanQuery<'a> {
    db: &'a StateDb,
}

impl<'a> PlanQuery<'a> {
    pub fn new(db: &'a StateDb) -> Self {
        Self { db }
    }

    pub fn get(&self, plan_id: PlanId) -> Result<Option<Plan>, InheritanceError> {
        self.db.get_plan(plan_id)
    }

    pub fn by_owner(&self, owner: &Address) -> Result<Vec<Plan>, InheritanceError> {
        self.db
            .plans_by_owner(owner)?
            .into_iter()
            .filter_map(|id| self.db.get_plan(id).transpose())
            .collect()
    }

    pub fn by_beneficiary(&self, addr: &Address) -> Result<Vec<Plan>, InheritanceError> {
        self.db
            .plans_by_beneficiary(addr)?
            .into_iter()
            .filter_map(|id| self.db.get_plan(id).transpose())
            .collect()
    }

    /// Bounded variant of [`Self::by_owner`]: stops after
    /// [`MAX_PLANS_PER_QUERY`] plans instead of materializing the owner's
    /// whole plan set. Prefer this for callers that only need a page.
    pub fn by_owner_page(&self, owner: &Address) -> Result<Vec<Plan>, InheritanceError> {
        self.db
            .plans_by_owner(owner)?
            .into_iter()
            .take(MAX_PLANS_PER_QUERY)
            .filter_map(|id| self.db.get_plan(id).transpose())
            .collect()
    }

    /// Bounded variant of [`Self::by_beneficiary`]; see
    /// [`Self::by_owner_page`].
    pub fn by_beneficiary_page(&self, addr: &Address) -> Result<Vec<Plan>, InheritanceError> {
        self.db
            .plans_by_beneficiary(addr)?
            .into_iter()
            .take(MAX_PLANS_PER_QUERY)
            .filter_map(|id| self.db.get_plan(id).transpose())
            .collect()
    }

    /// Human-readable one-line summary of a plan's current state.
    pub fn describe(&self, plan_id: PlanId) -> Result<String, InheritanceError> {
        let plan = self.db.get_plan(plan_id)?.ok_or(InheritanceError::PlanNotFound(plan_id))?;
        let status_str = match plan.status {
            PlanStatus::Active => "active, switch not armed".to_string(),
            PlanStatus::Triggered => "switch armed, grace period running".to_string(),
            PlanStatus::Executing => "grace period expired, claims in progress".to_string(),
            PlanStatus::Completed => "completed".to_string(),
            PlanStatus::Cancelled => "cancelled".to_string(),
        };
        Ok(format!(
            "Plan {} | owner: {} | {} beneficiaries | {}",
            plan.plan_id,
            plan.owner,
            plan.beneficiaries.len(),
            status_str
        ))
    }
}

/// Query helpers for switch triggers.
pub struct TriggerQuery<'a> {
    db: &'a StateDb,
}

impl<'a> TriggerQuery<'a> {
    pub fn new(db: &'a StateDb) -> Self {
        Self { db }
    }

    pub fn get(&self, plan_id: PlanId) -> Result<Option<SwitchTrigger>, InheritanceError> {
        self.db.get_trigger(plan_id)
    }

    pub fn is_active(&self, plan_id: PlanId) -> Result<bool, InheritanceError> {
        Ok(matches!(self.db.get_trigger(plan_id)?, Some(t) if t.status == TriggerStatus::Active))
    }

    /// Seconds remaining until the grace period elapses, or `None` if
    /// there is no active trigger. Negative once the deadline has passed
    /// but the end-of-block scheduler has not yet run.
    pub fn seconds_until_expiry(&self, plan_id: PlanId, now: BlockTime) -> Result<Option<i64>, InheritanceError> {
        Ok(match self.db.get_trigger(plan_id)? {
            Some(t) if t.status == TriggerStatus::Active => Some(t.grace_period_end - now),
            _ => None,
        })
    }
}

/// Query helpers for beneficiary claims.
pub struct ClaimQuery<'a> {
    db: &'a StateDb,
}

impl<'a> ClaimQuery<'a> {
    pub fn new(db: &'a StateDb) -> Self {
        Self { db }
    }

    pub fn get(&self, plan_id: PlanId, addr: &Address) -> Result<Option<BeneficiaryClaim>, InheritanceError> {
        self.db.get_claim(plan_id, addr)
    }

    pub fn all_for_plan(&self, plan_id: PlanId) -> Result<Vec<BeneficiaryClaim>, InheritanceError> {
        self.db.claims_for_plan(plan_id)
    }

    /// The claim currently accepting a claim submission, if any — the one
    /// whose window the cascade has opened.
    pub fn currently_open(&self, plan_id: PlanId) -> Result<Option<BeneficiaryClaim>, InheritanceError> {
        Ok(self
            .db
            .claims_for_plan(plan_id)?
            .into_iter()
            .find(|c| c.status == ClaimStatus::Open))
    }
}

/// Query helpers for the activity tracker.
pub struct ActivityQuery<'a> {
    db: &'a StateDb,
}

impl<'a> ActivityQuery<'a> {
    pub fn new(db: &'a StateDb) -> Self {
        Self { db }
    }

    pub fn last_seen(&self, addr: &Address) -> Result<Option<BlockTime>, InheritanceError> {
        Ok(self.db.get_activity(addr)?.map(|r| r.block_time))
    }

    pub fn is_inactive_for(&self, addr: &Address, period_secs: i64, now: BlockTime) -> Result<bool, InheritanceError> {
        Ok(match self.db.get_activity(addr)? {
            Some(r) => now - r.block_time >= period_secs,
            None => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inheritance_core::entities::{ActivityRecord, ActivityType};

    #[test]
    fn plan_query_by_owner_finds_created_plan() {
        let db = StateDb::open_temp().unwrap();
        let owner = Address::from_seed(b"owner");
        let plan = Plan {
            plan_id: 1,
            owner: owner.clone(),
            beneficiaries: vec![],
            inactivity_period_secs: 365 * 86400,
            grace_period_secs: 30 * 86400,
            claim_window_secs: 180 * 86400,
            charity_address: None,
            status: PlanStatus::Active,
            created_at: 0,
            updated_at: 0,
        };
        db.put_plan(&plan).unwrap();
        db.index_owner(&owner, 1).unwrap();

        let found = PlanQuery::new(&db).by_owner(&owner).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].plan_id, 1);
    }

    #[test]
    fn by_owner_page_caps_result_count() {
        let db = StateDb::open_temp().unwrap();
        let owner = Address::from_seed(b"owner");
        for i in 1..=3u64 {
            let plan = Plan {
                plan_id: i,
                owner: owner.clone(),
                beneficiaries: vec![],
                inactivity_period_secs: 365 * 86400,
                grace_period_secs: 30 * 86400,
                claim_window_secs: 180 * 86400,
                charity_address: None,
                status: PlanStatus::Active,
                created_at: 0,
                updated_at: 0,
            };
            db.put_plan(&plan).unwrap();
            db.index_owner(&owner, i).unwrap();
        }

        let page = PlanQuery::new(&db).by_owner_page(&owner).unwrap();
        assert_eq!(page.len(), 3);
        let all = PlanQuery::new(&db).by_owner(&owner).unwrap();
        assert_eq!(all.len(), page.len());
    }

    #[test]
    fn activity_query_reports_inactive_once_period_elapses() {
        let db = StateDb::open_temp().unwrap();
        let addr = Address::from_seed(b"owner");
        db.put_activity(&ActivityRecord { address: addr.clone(), block_time: 1_000, block_height: 1, activity_type: ActivityType::Other })
            .unwrap();

        let q = ActivityQuery::new(&db);
        assert!(!q.is_inactive_for(&addr, 500, 1_200).unwrap());
        assert!(q.is_inactive_for(&addr, 500, 1_600).unwrap());
    }
}
