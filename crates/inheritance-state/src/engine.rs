use tracing::{info, warn};

use inheritance_core::actions::Action;
use inheritance_core::constants::MAX_CASCADE_DEPTH;
use inheritance_core::entities::{
    ActivityRecord, ActivityType, Beneficiary, BeneficiaryClaim, ClaimStatus, LockedAssets, Plan,
    PlanStatus, SwitchTrigger, TriggerStatus,
};
use inheritance_core::error::InheritanceError;
use inheritance_core::events::{CancelReason, ClaimCloseReason, Event, SkipReason};
use inheritance_core::types::{Address, BlockTime, PlanId};
use inheritance_core::validate::validate_plan_fields;
use inheritance_external::ExternalModules;

use crate::asset::{transfer_all_to_charity, transfer_assets_for_claim};
use crate::db::StateDb;

/// Applies user actions and end-of-block transitions against a `StateDb`,
/// calling out to `ExternalModules` for every asset movement.
///
/// Each `apply`/`run_end_of_block` call is one deterministic step: it reads
/// and writes the db directly (no staged commit buffer), so a failed
/// operation simply returns before any further writes happen. Per-action
/// validation errors abort the whole call; per-asset transfer failures are
/// collected inside the asset handler and never reach here as `Err`.
pub struct StateEngine {
    pub db: StateDb,
    pub ext: ExternalModules,
}

impl StateEngine {
    pub fn new(db: StateDb, ext: ExternalModules) -> Self {
        Self { db, ext }
    }

    /// Dispatches one signed action, then runs the universal activity/
    /// auto-cancel hook for its sender. The hook runs after the
    /// action-specific logic so that `CancelTrigger`'s own cancellation is
    /// already reflected in the trigger status by the time the hook looks
    /// for active triggers to auto-cancel — it naturally finds nothing left
    /// to do for that plan and never emits a duplicate event.
    pub fn apply(
        &self,
        sender: &Address,
        action: &Action,
        now: BlockTime,
        block_height: u64,
    ) -> Result<Vec<Event>, InheritanceError> {
        let mut events = match action {
            Action::CreatePlan { .. } => self.create_plan(sender, action, now)?,
            Action::UpdatePlan { .. } => self.update_plan(sender, action, now)?,
            Action::CancelPlan { plan_id } => self.cancel_plan(sender, *plan_id, now)?,
            Action::CancelTrigger { plan_id } => self.cancel_trigger(sender, *plan_id, now)?,
            Action::TriggerSwitch { plan_id } => self.trigger_switch(*plan_id, now)?,
            Action::ClaimAssets { plan_id } => self.claim_assets(sender, *plan_id, now)?,
        };

        let activity_type = match action {
            Action::TriggerSwitch { .. } | Action::ClaimAssets { .. } => ActivityType::Other,
            _ => ActivityType::PlanMutation,
        };
        events.extend(self.record_activity(sender, activity_type, now, block_height)?);
        Ok(events)
    }

    /// Scans the time-ordered scheduler indices and the activity table for
    /// transitions that are due by block time, independent of any message.
    pub fn run_end_of_block(&self, now: BlockTime) -> Result<Vec<Event>, InheritanceError> {
        let mut events = Vec::new();

        for plan_id in self.db.due_triggers(now)? {
            events.extend(self.process_grace_period_expiry(plan_id, now)?);
        }
        for (plan_id, addr) in self.db.due_claims(now)? {
            events.extend(self.process_claim_window_expiry(plan_id, &addr, now)?);
        }
        events.extend(self.process_ultra_long_inactivity(now)?);

        Ok(events)
    }

    // ── Activity Tracker ──────────────────────────────────────────────────

    fn record_activity(
        &self,
        addr: &Address,
        activity_type: ActivityType,
        now: BlockTime,
        block_height: u64,
    ) -> Result<Vec<Event>, InheritanceError> {
        let record = ActivityRecord {
            address: addr.clone(),
            block_time: now,
            block_height,
            activity_type,
        };
        self.db.put_activity(&record)?;

        let mut events = vec![Event::ActivityRecorded { address: addr.clone(), block_time: now }];
        events.extend(self.auto_cancel_triggers_for_owner(addr, now)?);
        Ok(events)
    }

    fn auto_cancel_triggers_for_owner(&self, owner: &Address, now: BlockTime) -> Result<Vec<Event>, InheritanceError> {
        let mut events = Vec::new();
        for plan_id in self.db.plans_by_owner(owner)? {
            events.extend(self.cancel_trigger_if_active(plan_id, CancelReason::OwnerActivity, now)?);
        }
        Ok(events)
    }

    fn is_inactive(&self, owner: &Address, inactivity_period_secs: i64, now: BlockTime) -> Result<bool, InheritanceError> {
        Ok(match self.db.get_activity(owner)? {
            Some(rec) => now - rec.block_time >= inactivity_period_secs,
            None => false,
        })
    }

    // ── Plan Registry ─────────────────────────────────────────────────────

    fn create_plan(&self, sender: &Address, action: &Action, now: BlockTime) -> Result<Vec<Event>, InheritanceError> {
        let (beneficiaries, inactivity_period_secs, grace_period_secs, claim_window_secs, charity_address) = match action {
            Action::CreatePlan {
                beneficiaries,
                inactivity_period_secs,
                grace_period_secs,
                claim_window_secs,
                charity_address,
            } => (beneficiaries, *inactivity_period_secs, *grace_period_secs, *claim_window_secs, charity_address.clone()),
            _ => unreachable!("dispatched only for CreatePlan"),
        };

        if self.ext.ban_registry.is_address_banned(sender) {
            return Err(InheritanceError::OwnerBanned(sender.to_string()));
        }

        let params = self.db.get_params()?;
        validate_plan_fields(beneficiaries, inactivity_period_secs, grace_period_secs, claim_window_secs, &params)?;

        let plan_id = self.db.next_plan_id()?;
        let plan = Plan {
            plan_id,
            owner: sender.clone(),
            beneficiaries: beneficiaries.iter().map(to_beneficiary).collect(),
            inactivity_period_secs,
            grace_period_secs,
            claim_window_secs,
            charity_address,
            status: PlanStatus::Active,
            created_at: now,
            updated_at: now,
        };

        self.db.put_plan(&plan)?;
        self.db.index_owner(&plan.owner, plan_id)?;
        for b in &plan.beneficiaries {
            self.db.index_beneficiary(&b.address, plan_id)?;
        }

        info!(plan_id, owner = %sender, "plan created");
        Ok(vec![Event::PlanCreated { plan_id, owner: sender.clone() }])
    }

    fn update_plan(&self, sender: &Address, action: &Action, now: BlockTime) -> Result<Vec<Event>, InheritanceError> {
        let (plan_id, beneficiaries, inactivity_period_secs, grace_period_secs, claim_window_secs, charity_address) = match action {
            Action::UpdatePlan {
                plan_id,
                beneficiaries,
                inactivity_period_secs,
                grace_period_secs,
                claim_window_secs,
                charity_address,
            } => (*plan_id, beneficiaries, *inactivity_period_secs, *grace_period_secs, *claim_window_secs, charity_address.clone()),
            _ => unreachable!("dispatched only for UpdatePlan"),
        };

        let mut plan = self.db.get_plan(plan_id)?.ok_or(InheritanceError::PlanNotFound(plan_id))?;
        if plan.owner != *sender {
            return Err(InheritanceError::Unauthorized);
        }
        if plan.status != PlanStatus::Active {
            return Err(InheritanceError::CannotModifyPlan);
        }
        if self.ext.ban_registry.is_address_banned(sender) {
            return Err(InheritanceError::OwnerBanned(sender.to_string()));
        }

        let params = self.db.get_params()?;
        validate_plan_fields(beneficiaries, inactivity_period_secs, grace_period_secs, claim_window_secs, &params)?;

        for b in &plan.beneficiaries {
            self.db.unindex_beneficiary(&b.address, plan_id)?;
        }
        plan.beneficiaries = beneficiaries.iter().map(to_beneficiary).collect();
        plan.inactivity_period_secs = inactivity_period_secs;
        plan.grace_period_secs = grace_period_secs;
        plan.claim_window_secs = claim_window_secs;
        plan.charity_address = charity_address;
        plan.updated_at = now;
        for b in &plan.beneficiaries {
            self.db.index_beneficiary(&b.address, plan_id)?;
        }
        self.db.put_plan(&plan)?;

        info!(plan_id, "plan updated");
        Ok(vec![Event::PlanUpdated { plan_id }])
    }

    fn cancel_plan(&self, sender: &Address, plan_id: PlanId, now: BlockTime) -> Result<Vec<Event>, InheritanceError> {
        let mut plan = self.db.get_plan(plan_id)?.ok_or(InheritanceError::PlanNotFound(plan_id))?;
        if plan.owner != *sender {
            return Err(InheritanceError::Unauthorized);
        }
        if plan.status != PlanStatus::Active {
            return Err(InheritanceError::CannotModifyPlan);
        }
        plan.status = PlanStatus::Cancelled;
        plan.updated_at = now;
        self.db.put_plan(&plan)?;
        self.db.delete_locked_assets(plan_id)?;

        info!(plan_id, "plan cancelled");
        Ok(vec![Event::PlanCancelled { plan_id }])
    }

    // ── Trigger Engine ────────────────────────────────────────────────────

    fn trigger_switch(&self, plan_id: PlanId, now: BlockTime) -> Result<Vec<Event>, InheritanceError> {
        let mut plan = self.db.get_plan(plan_id)?.ok_or(InheritanceError::PlanNotFound(plan_id))?;
        if plan.status != PlanStatus::Active {
            return Err(InheritanceError::PlanAlreadyTriggered);
        }
        if self.ext.ban_registry.is_address_banned(&plan.owner) {
            return Err(InheritanceError::OwnerBanned(plan.owner.to_string()));
        }
        if !self.is_inactive(&plan.owner, plan.inactivity_period_secs, now)? {
            return Err(InheritanceError::OwnerStillActive);
        }
        if self.db.get_trigger(plan_id)?.is_some() {
            return Err(InheritanceError::PlanAlreadyTriggered);
        }

        let grace_period_end = now + plan.grace_period_secs;
        self.db.put_trigger(&SwitchTrigger {
            plan_id,
            status: TriggerStatus::Active,
            triggered_at: now,
            grace_period_end,
        })?;
        self.db.index_due_trigger(grace_period_end, plan_id)?;

        plan.status = PlanStatus::Triggered;
        plan.updated_at = now;
        self.db.put_plan(&plan)?;
        self.snapshot_locked_assets(&plan)?;

        info!(plan_id, grace_period_end, "switch triggered");
        Ok(vec![Event::SwitchTriggered { plan_id, grace_period_end }])
    }

    fn cancel_trigger(&self, sender: &Address, plan_id: PlanId, now: BlockTime) -> Result<Vec<Event>, InheritanceError> {
        let plan = self.db.get_plan(plan_id)?.ok_or(InheritanceError::PlanNotFound(plan_id))?;
        if plan.owner != *sender {
            return Err(InheritanceError::Unauthorized);
        }
        match self.db.get_trigger(plan_id)? {
            Some(t) if t.status == TriggerStatus::Active => {}
            _ => return Err(InheritanceError::TriggerNotFound(plan_id)),
        }
        self.cancel_trigger_if_active(plan_id, CancelReason::ManualCancel, now)
    }

    /// Shared by the explicit `CancelTrigger` message and the auto-cancel
    /// hook. A no-op (empty event list) if the trigger is already gone or
    /// not `Active` — this is what makes the hook idempotent against an
    /// explicit cancel that just ran in the same `apply` call.
    fn cancel_trigger_if_active(&self, plan_id: PlanId, reason: CancelReason, now: BlockTime) -> Result<Vec<Event>, InheritanceError> {
        let mut trigger = match self.db.get_trigger(plan_id)? {
            Some(t) if t.status == TriggerStatus::Active => t,
            _ => return Ok(Vec::new()),
        };
        trigger.status = TriggerStatus::Cancelled;
        self.db.put_trigger(&trigger)?;
        self.db.unindex_due_trigger(trigger.grace_period_end, plan_id)?;

        let mut plan = self.db.get_plan(plan_id)?.ok_or(InheritanceError::PlanNotFound(plan_id))?;
        plan.status = PlanStatus::Active;
        plan.updated_at = now;
        self.db.put_plan(&plan)?;
        self.db.delete_locked_assets(plan_id)?;

        info!(plan_id, ?reason, "switch cancelled");
        Ok(vec![Event::SwitchCancelled { plan_id, reason }])
    }

    fn process_grace_period_expiry(&self, plan_id: PlanId, now: BlockTime) -> Result<Vec<Event>, InheritanceError> {
        let mut trigger = match self.db.get_trigger(plan_id)? {
            Some(t) if t.status == TriggerStatus::Active => t,
            _ => return Ok(Vec::new()),
        };
        let grace_period_end = trigger.grace_period_end;
        trigger.status = TriggerStatus::Expired;
        self.db.put_trigger(&trigger)?;
        self.db.unindex_due_trigger(grace_period_end, plan_id)?;

        let mut plan = self.db.get_plan(plan_id)?.ok_or(InheritanceError::PlanNotFound(plan_id))?;
        plan.status = PlanStatus::Executing;
        plan.updated_at = now;
        self.db.put_plan(&plan)?;

        let mut events = vec![Event::GracePeriodExpired { plan_id }];
        events.extend(self.initialize_claims(&plan, grace_period_end)?);
        events.extend(self.check_plan_completion(plan_id, now)?);
        Ok(events)
    }

    // ── Claim Engine ──────────────────────────────────────────────────────

    /// Creates one `Pending` claim per beneficiary with the staggered
    /// window schedule, then opens (or ban-skips) the first in priority
    /// order right away.
    fn initialize_claims(&self, plan: &Plan, grace_period_end: BlockTime) -> Result<Vec<Event>, InheritanceError> {
        let mut sorted = plan.beneficiaries.clone();
        sorted.sort_by_key(|b| b.priority);

        for (idx, b) in sorted.iter().enumerate() {
            let window_start = grace_period_end + (idx as i64) * plan.claim_window_secs;
            let window_end = window_start + plan.claim_window_secs;
            self.db.put_claim(&BeneficiaryClaim {
                plan_id: plan.plan_id,
                address: b.address.clone(),
                status: ClaimStatus::Pending,
                percentage_ppm: b.percentage_ppm,
                priority: b.priority,
                claim_window_start: window_start,
                claim_window_end: window_end,
                claimed_at: None,
                transferred: Vec::new(),
            })?;
            self.db.index_due_claim(window_end, plan.plan_id, &b.address)?;
        }

        self.try_open_next(plan, grace_period_end, 0)
    }

    fn claim_assets(&self, sender: &Address, plan_id: PlanId, now: BlockTime) -> Result<Vec<Event>, InheritanceError> {
        if !self.db.try_acquire_claim_lock(plan_id)? {
            return Err(InheritanceError::ClaimInProgress(plan_id));
        }
        let result = self.claim_assets_locked(sender, plan_id, now);
        self.db.release_claim_lock(plan_id)?;
        result
    }

    fn claim_assets_locked(&self, sender: &Address, plan_id: PlanId, now: BlockTime) -> Result<Vec<Event>, InheritanceError> {
        let plan = self.db.get_plan(plan_id)?.ok_or(InheritanceError::PlanNotFound(plan_id))?;
        let mut claim = self
            .db
            .get_claim(plan_id, sender)?
            .ok_or_else(|| InheritanceError::ClaimNotFound { plan_id, addr: sender.to_string() })?;

        match claim.status {
            ClaimStatus::Pending | ClaimStatus::Open => {}
            ClaimStatus::Processing => return Err(InheritanceError::ClaimInProgress(plan_id)),
            ClaimStatus::Claimed | ClaimStatus::Expired | ClaimStatus::Skipped => {
                return Err(InheritanceError::ClaimAlreadyProcessed)
            }
        }
        if now < claim.claim_window_start || now > claim.claim_window_end {
            return Err(InheritanceError::ClaimWindowClosed);
        }
        if self.ext.ban_registry.is_address_banned(sender) {
            return Err(InheritanceError::BeneficiaryBanned(sender.to_string()));
        }

        // Closes the double-claim race at the store level, on top of the lock.
        claim.status = ClaimStatus::Processing;
        self.db.put_claim(&claim)?;

        let specific_assets = plan
            .beneficiaries
            .iter()
            .find(|b| b.address == *sender)
            .map(|b| b.specific_assets.clone())
            .unwrap_or_default();
        let outcome = transfer_assets_for_claim(&self.ext, &plan.owner, sender, claim.percentage_ppm, &specific_assets, now);
        if outcome.skipped_count > 0 {
            warn!(plan_id, beneficiary = %sender, skipped = outcome.skipped_count, "some asset transfers were skipped");
        }

        claim.status = ClaimStatus::Claimed;
        claim.claimed_at = Some(now);
        claim.transferred = outcome.transferred.clone();
        self.db.put_claim(&claim)?;
        self.db.unindex_due_claim(claim.claim_window_end, plan_id, sender)?;

        let mut events = vec![Event::AssetsClaimed { plan_id, beneficiary: sender.clone(), assets: outcome.transferred }];
        events.extend(self.try_open_next(&plan, now, 0)?);
        events.extend(self.check_plan_completion(plan_id, now)?);
        Ok(events)
    }

    fn process_claim_window_expiry(&self, plan_id: PlanId, addr: &Address, now: BlockTime) -> Result<Vec<Event>, InheritanceError> {
        let mut claim = match self.db.get_claim(plan_id, addr)? {
            Some(c) if matches!(c.status, ClaimStatus::Pending | ClaimStatus::Open) => c,
            _ => return Ok(Vec::new()),
        };
        let plan = self.db.get_plan(plan_id)?.ok_or(InheritanceError::PlanNotFound(plan_id))?;

        claim.status = ClaimStatus::Expired;
        self.db.put_claim(&claim)?;
        self.db.unindex_due_claim(claim.claim_window_end, plan_id, addr)?;

        let mut events =
            vec![Event::ClaimWindowClosed { plan_id, beneficiary: addr.clone(), reason: ClaimCloseReason::Expired }];
        events.extend(self.try_open_next(&plan, now, 0)?);
        events.extend(self.check_plan_completion(plan_id, now)?);
        Ok(events)
    }

    /// Finds the next `Pending` claim by priority ascending and either
    /// opens its window now, or — if its address is banned — marks it
    /// `Skipped` and recurses, bounded by `MAX_CASCADE_DEPTH`.
    ///
    /// If no `Pending` claim remains, the cascade has run its course: when
    /// every claim got there via `Claimed`, the happy path is complete and
    /// there is nothing left to route. But if any claim ended `Skipped` or
    /// `Expired`, that beneficiary's share was never transferred, so the
    /// remainder goes to charity instead of staying stranded with the owner.
    fn try_open_next(&self, plan: &Plan, now: BlockTime, depth: u32) -> Result<Vec<Event>, InheritanceError> {
        if depth >= MAX_CASCADE_DEPTH {
            return self.route_remainder_to_charity(plan, now);
        }

        let claims = self.db.claims_for_plan(plan.plan_id)?;
        let mut next = match claims.iter().find(|c| c.status == ClaimStatus::Pending) {
            Some(c) => c.clone(),
            None => {
                if claims.iter().any(|c| matches!(c.status, ClaimStatus::Skipped | ClaimStatus::Expired)) {
                    return self.route_remainder_to_charity(plan, now);
                }
                return Ok(Vec::new());
            }
        };

        if self.ext.ban_registry.is_address_banned(&next.address) {
            next.status = ClaimStatus::Skipped;
            self.db.put_claim(&next)?;
            self.db.unindex_due_claim(next.claim_window_end, plan.plan_id, &next.address)?;

            let mut events =
                vec![Event::BeneficiarySkipped { plan_id: plan.plan_id, beneficiary: next.address.clone(), reason: SkipReason::BeneficiaryBanned }];
            events.extend(self.try_open_next(plan, now, depth + 1)?);
            return Ok(events);
        }

        let old_end = next.claim_window_end;
        next.status = ClaimStatus::Open;
        next.claim_window_start = now;
        next.claim_window_end = now + plan.claim_window_secs;
        self.db.unindex_due_claim(old_end, plan.plan_id, &next.address)?;
        self.db.index_due_claim(next.claim_window_end, plan.plan_id, &next.address)?;
        self.db.put_claim(&next)?;

        Ok(vec![Event::ClaimWindowOpened {
            plan_id: plan.plan_id,
            beneficiary: next.address.clone(),
            window_start: next.claim_window_start,
            window_end: next.claim_window_end,
        }])
    }

    fn check_plan_completion(&self, plan_id: PlanId, now: BlockTime) -> Result<Vec<Event>, InheritanceError> {
        let claims = self.db.claims_for_plan(plan_id)?;
        if claims.is_empty() || !claims.iter().all(|c| matches!(c.status, ClaimStatus::Claimed | ClaimStatus::Expired | ClaimStatus::Skipped)) {
            return Ok(Vec::new());
        }
        let mut plan = self.db.get_plan(plan_id)?.ok_or(InheritanceError::PlanNotFound(plan_id))?;
        if plan.status == PlanStatus::Completed {
            return Ok(Vec::new());
        }
        plan.status = PlanStatus::Completed;
        plan.updated_at = now;
        self.db.put_plan(&plan)?;
        self.db.delete_locked_assets(plan_id)?;

        info!(plan_id, "plan completed");
        Ok(vec![Event::PlanCompleted { plan_id }])
    }

    // ── Charity Fallback ──────────────────────────────────────────────────

    fn resolve_charity_address(&self, plan: &Plan) -> Result<Address, InheritanceError> {
        if let Some(addr) = &plan.charity_address {
            return Ok(addr.clone());
        }
        if let Some(addr) = self.db.get_params()?.default_charity_address {
            return Ok(addr);
        }
        self.ext
            .account_registry
            .get_module_address("distribution")
            .ok_or_else(|| InheritanceError::Other("no charity address configured".into()))
    }

    fn route_remainder_to_charity(&self, plan: &Plan, _now: BlockTime) -> Result<Vec<Event>, InheritanceError> {
        let charity = self.resolve_charity_address(plan)?;
        transfer_all_to_charity(&self.ext, &plan.owner, &charity);
        info!(plan_id = plan.plan_id, charity = %charity, "remainder routed to charity");
        Ok(vec![Event::AssetsToCharity { plan_id: plan.plan_id, charity }])
    }

    fn snapshot_locked_assets(&self, plan: &Plan) -> Result<(), InheritanceError> {
        let fungible = self
            .ext
            .ledger
            .get_all_balances(&plan.owner)
            .unwrap_or_default()
            .into_iter()
            .map(|c| (c.denom, c.amount))
            .collect();
        let equity = self
            .ext
            .equity
            .get_all_holdings_by_address(&plan.owner)
            .unwrap_or_default()
            .into_iter()
            .map(|h| (h.company_id, h.class_id, h.shares))
            .collect();
        let staked = self.ext.staking.get_user_stake(&plan.owner).unwrap_or(0);
        self.db.put_locked_assets(&LockedAssets { plan_id: plan.plan_id, fungible, equity, staked })
    }

    // ── Ultra-long inactivity (end-of-block step 3) ──────────────────────

    fn process_ultra_long_inactivity(&self, now: BlockTime) -> Result<Vec<Event>, InheritanceError> {
        let params = self.db.get_params()?;
        let mut events = Vec::new();
        for record in self.db.iter_all_activity()? {
            if now - record.block_time < params.ultra_long_inactivity_secs {
                continue;
            }
            for plan_id in self.db.plans_by_owner(&record.address)? {
                let mut plan = match self.db.get_plan(plan_id)? {
                    Some(p) if p.status == PlanStatus::Active => p,
                    _ => continue,
                };
                events.extend(self.route_remainder_to_charity(&plan, now)?);
                plan.status = PlanStatus::Completed;
                plan.updated_at = now;
                self.db.put_plan(&plan)?;
                events.push(Event::PlanCompleted { plan_id });
            }
        }
        Ok(events)
    }
}

fn to_beneficiary(input: &inheritance_core::actions::BeneficiaryInput) -> Beneficiary {
    Beneficiary {
        address: input.address.clone(),
        priority: input.priority,
        percentage_ppm: input.percentage_ppm,
        specific_assets: input.specific_assets.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inheritance_core::actions::BeneficiaryInput;
    use inheritance_external::memory::{
        MemoryAccountRegistry, MemoryBanRegistry, MemoryEquity, MemoryEscrow, MemoryLedger, MemoryLending, MemoryStaking,
    };

    const DAY: i64 = 24 * 3600;

    fn fixture() -> (StateEngine, Address, Address, Address) {
        let owner = Address::from_seed(b"owner");
        let b1 = Address::from_seed(b"b1");
        let b2 = Address::from_seed(b"b2");

        let ledger = MemoryLedger::new();
        ledger.set_balance(&owner, "uhodl", 1_000_000);

        let ext = ExternalModules {
            ledger: Box::new(ledger),
            equity: Box::new(MemoryEquity::new()),
            staking: Box::new(MemoryStaking::new()),
            lending: Box::new(MemoryLending::new()),
            escrow: Box::new(MemoryEscrow::new()),
            ban_registry: Box::new(MemoryBanRegistry::new()),
            account_registry: Box::new(MemoryAccountRegistry::new()),
        };
        let engine = StateEngine::new(StateDb::open_temp().unwrap(), ext);
        (engine, owner, b1, b2)
    }

    fn create_happy_path_plan(engine: &StateEngine, owner: &Address, b1: &Address, b2: &Address, t0: i64) -> PlanId {
        let action = Action::CreatePlan {
            beneficiaries: vec![
                BeneficiaryInput { address: b1.clone(), priority: 1, percentage_ppm: 600_000, specific_assets: vec![] },
                BeneficiaryInput { address: b2.clone(), priority: 2, percentage_ppm: 400_000, specific_assets: vec![] },
            ],
            inactivity_period_secs: 365 * DAY,
            grace_period_secs: 30 * DAY,
            claim_window_secs: 180 * DAY,
            charity_address: None,
        };
        let events = engine.apply(owner, &action, t0, 1).unwrap();
        match &events[0] {
            Event::PlanCreated { plan_id, .. } => *plan_id,
            other => panic!("unexpected first event: {other:?}"),
        }
    }

    // Scenario 1: happy path end-to-end cascade and completion.
    #[test]
    fn happy_path_full_cascade() {
        let (engine, owner, b1, b2) = fixture();
        let t0 = 1_000_000;
        let plan_id = create_happy_path_plan(&engine, &owner, &b1, &b2, t0);

        let t_trigger = t0 + 366 * DAY;
        let events = engine.apply(&b1, &Action::TriggerSwitch { plan_id }, t_trigger, 2).unwrap();
        assert!(events.iter().any(|e| matches!(e, Event::SwitchTriggered { .. })));

        let t_grace_end = t_trigger + 30 * DAY;
        let events = engine.run_end_of_block(t_grace_end).unwrap();
        assert!(events.iter().any(|e| matches!(e, Event::ClaimWindowOpened { beneficiary, .. } if beneficiary == &b1)));

        let events = engine.apply(&b1, &Action::ClaimAssets { plan_id }, t_grace_end, 3).unwrap();
        let claimed = events.iter().find_map(|e| match e {
            Event::AssetsClaimed { beneficiary, assets, .. } if beneficiary == &b1 => Some(assets.clone()),
            _ => None,
        });
        assert!(matches!(
            claimed.unwrap().as_slice(),
            [inheritance_core::entities::TransferredAsset::Fungible { amount: 600_000, .. }]
        ));
        assert!(events.iter().any(|e| matches!(e, Event::ClaimWindowOpened { beneficiary, .. } if beneficiary == &b2)));

        let events = engine.apply(&b2, &Action::ClaimAssets { plan_id }, t_grace_end, 4).unwrap();
        let claimed = events.iter().find_map(|e| match e {
            Event::AssetsClaimed { beneficiary, assets, .. } if beneficiary == &b2 => Some(assets.clone()),
            _ => None,
        });
        assert!(matches!(
            claimed.unwrap().as_slice(),
            [inheritance_core::entities::TransferredAsset::Fungible { amount: 400_000, .. }]
        ));
        assert!(events.iter().any(|e| matches!(e, Event::PlanCompleted { plan_id: p } if *p == plan_id)));
    }

    // Scenario 2: any owner activity during grace discharges the trigger.
    #[test]
    fn owner_activity_during_grace_auto_cancels() {
        let (engine, owner, b1, b2) = fixture();
        let t0 = 1_000_000;
        let plan_id = create_happy_path_plan(&engine, &owner, &b1, &b2, t0);

        let t_trigger = t0 + 366 * DAY;
        engine.apply(&b1, &Action::TriggerSwitch { plan_id }, t_trigger, 2).unwrap();

        // Any further signed action from the owner — here, creating an
        // unrelated second plan — counts as activity and discharges the
        // switch on the first plan via the trailing auto-cancel hook.
        let t_activity = t_trigger + 14 * DAY;
        let action = Action::CreatePlan {
            beneficiaries: vec![BeneficiaryInput { address: b1.clone(), priority: 1, percentage_ppm: 1_000_000, specific_assets: vec![] }],
            inactivity_period_secs: 365 * DAY,
            grace_period_secs: 30 * DAY,
            claim_window_secs: 180 * DAY,
            charity_address: None,
        };
        let events = engine.apply(&owner, &action, t_activity, 3).unwrap();
        assert!(events.iter().any(
            |e| matches!(e, Event::SwitchCancelled { plan_id: p, reason: CancelReason::OwnerActivity } if *p == plan_id)
        ));

        let plan = engine.db.get_plan(plan_id).unwrap().unwrap();
        assert_eq!(plan.status, PlanStatus::Active);
    }

    /// Forwards to a shared `MemoryBanRegistry` so a test can keep banning
    /// addresses after the registry has already been boxed into an
    /// `ExternalModules`.
    struct SharedBanRegistry(std::sync::Arc<MemoryBanRegistry>);
    impl inheritance_external::BanRegistry for SharedBanRegistry {
        fn is_address_banned(&self, addr: &Address) -> bool {
            self.0.is_address_banned(addr)
        }
    }

    // Scenario 3: a banned owner cannot arm the switch.
    #[test]
    fn banned_owner_cannot_trigger() {
        let owner = Address::from_seed(b"owner");
        let b1 = Address::from_seed(b"b1");
        let b2 = Address::from_seed(b"b2");

        let ledger = MemoryLedger::new();
        ledger.set_balance(&owner, "uhodl", 1_000_000);
        let ban_registry = std::sync::Arc::new(MemoryBanRegistry::new());

        let ext = ExternalModules {
            ledger: Box::new(ledger),
            equity: Box::new(MemoryEquity::new()),
            staking: Box::new(MemoryStaking::new()),
            lending: Box::new(MemoryLending::new()),
            escrow: Box::new(MemoryEscrow::new()),
            ban_registry: Box::new(SharedBanRegistry(ban_registry.clone())),
            account_registry: Box::new(MemoryAccountRegistry::new()),
        };
        let engine = StateEngine::new(StateDb::open_temp().unwrap(), ext);

        let t0 = 1_000_000;
        let plan_id = create_happy_path_plan(&engine, &owner, &b1, &b2, t0);
        ban_registry.ban(&owner);

        let t_trigger = t0 + 366 * DAY;
        let err = engine.apply(&b1, &Action::TriggerSwitch { plan_id }, t_trigger, 2).unwrap_err();
        assert!(matches!(err, InheritanceError::OwnerBanned(_)));

        let plan = engine.db.get_plan(plan_id).unwrap().unwrap();
        assert_eq!(plan.status, PlanStatus::Active);
    }

    // Scenario 4: every beneficiary banned, cascade exhausts without ever
    // hitting MAX_CASCADE_DEPTH, remainder still routes to charity and the
    // plan reaches a terminal state instead of staying stranded.
    #[test]
    fn all_banned_beneficiaries_route_to_charity() {
        let owner = Address::from_seed(b"owner");
        let charity = Address::from_seed(b"charity");
        let b1 = Address::from_seed(b"b1");
        let b2 = Address::from_seed(b"b2");
        let b3 = Address::from_seed(b"b3");

        let ledger = MemoryLedger::new();
        ledger.set_balance(&owner, "uhodl", 1_000_000);
        let ban_registry = MemoryBanRegistry::new();
        ban_registry.ban(&b1);
        ban_registry.ban(&b2);
        ban_registry.ban(&b3);

        let ext = ExternalModules {
            ledger: Box::new(ledger),
            equity: Box::new(MemoryEquity::new()),
            staking: Box::new(MemoryStaking::new()),
            lending: Box::new(MemoryLending::new()),
            escrow: Box::new(MemoryEscrow::new()),
            ban_registry: Box::new(ban_registry),
            account_registry: Box::new(MemoryAccountRegistry::new()),
        };
        let engine = StateEngine::new(StateDb::open_temp().unwrap(), ext);

        let t0 = 1_000_000;
        let action = Action::CreatePlan {
            beneficiaries: vec![
                BeneficiaryInput { address: b1.clone(), priority: 1, percentage_ppm: 500_000, specific_assets: vec![] },
                BeneficiaryInput { address: b2.clone(), priority: 2, percentage_ppm: 300_000, specific_assets: vec![] },
                BeneficiaryInput { address: b3.clone(), priority: 3, percentage_ppm: 200_000, specific_assets: vec![] },
            ],
            inactivity_period_secs: 365 * DAY,
            grace_period_secs: 30 * DAY,
            claim_window_secs: 180 * DAY,
            charity_address: Some(charity.clone()),
        };
        let events = engine.apply(&owner, &action, t0, 1).unwrap();
        let plan_id = match &events[0] {
            Event::PlanCreated { plan_id, .. } => *plan_id,
            _ => unreachable!(),
        };

        let t_trigger = t0 + 366 * DAY;
        engine.apply(&owner, &Action::TriggerSwitch { plan_id }, t_trigger, 2).unwrap();

        let t_grace_end = t_trigger + 30 * DAY;
        let events = engine.run_end_of_block(t_grace_end).unwrap();

        let skipped = events.iter().filter(|e| matches!(e, Event::BeneficiarySkipped { .. })).count();
        assert_eq!(skipped, 3, "all three beneficiaries must be skipped as banned");
        assert!(events.iter().any(|e| matches!(e, Event::AssetsToCharity { charity: c, .. } if c == &charity)));
        assert!(events.iter().any(|e| matches!(e, Event::PlanCompleted { plan_id: p } if *p == plan_id)));

        let plan = engine.db.get_plan(plan_id).unwrap().unwrap();
        assert_eq!(plan.status, PlanStatus::Completed);
    }

    // Scenario 5: cascade depth bound routes an all-banned plan to charity
    // without an 11th recursive skip.
    #[test]
    fn cascade_depth_bound_routes_to_charity() {
        let owner = Address::from_seed(b"owner");
        let charity = Address::from_seed(b"charity");

        let ledger = MemoryLedger::new();
        ledger.set_balance(&owner, "uhodl", 1_100_000);
        let ban_registry = MemoryBanRegistry::new();

        let mut beneficiaries = Vec::new();
        for i in 0..11u32 {
            let addr = Address::from_seed(format!("ben{i}").as_bytes());
            ban_registry.ban(&addr);
            beneficiaries.push(BeneficiaryInput {
                address: addr,
                priority: i + 1,
                percentage_ppm: if i == 10 { 0 } else { 100_000 },
                specific_assets: vec![],
            });
        }

        let ext = ExternalModules {
            ledger: Box::new(ledger),
            equity: Box::new(MemoryEquity::new()),
            staking: Box::new(MemoryStaking::new()),
            lending: Box::new(MemoryLending::new()),
            escrow: Box::new(MemoryEscrow::new()),
            ban_registry: Box::new(ban_registry),
            account_registry: Box::new(MemoryAccountRegistry::new()),
        };
        let engine = StateEngine::new(StateDb::open_temp().unwrap(), ext);

        let t0 = 1_000_000;
        let action = Action::CreatePlan {
            beneficiaries,
            inactivity_period_secs: 365 * DAY,
            grace_period_secs: 30 * DAY,
            claim_window_secs: 180 * DAY,
            charity_address: Some(charity.clone()),
        };
        let events = engine.apply(&owner, &action, t0, 1).unwrap();
        let plan_id = match &events[0] {
            Event::PlanCreated { plan_id, .. } => *plan_id,
            _ => unreachable!(),
        };

        let t_trigger = t0 + 366 * DAY;
        engine.apply(&owner, &Action::TriggerSwitch { plan_id }, t_trigger, 2).unwrap();

        let t_grace_end = t_trigger + 30 * DAY;
        let events = engine.run_end_of_block(t_grace_end).unwrap();

        let skipped = events.iter().filter(|e| matches!(e, Event::BeneficiarySkipped { .. })).count();
        assert_eq!(skipped, 10, "cascade must stop after MAX_CASCADE_DEPTH skips");
        assert!(events.iter().any(|e| matches!(e, Event::AssetsToCharity { charity: c, .. } if c == &charity)));
    }

    // Scenario 6: overflow-safe percentage math, exercised through the claim path.
    #[test]
    fn overflow_safe_percentage_claim() {
        let owner = Address::from_seed(b"owner");
        let beneficiary = Address::from_seed(b"ben");

        let ledger = MemoryLedger::new();
        let huge: u128 = 2_000_000_000_000_000_000_000_000_000_000; // 2e30
        ledger.set_balance(&owner, "uhodl", huge);

        let ext = ExternalModules {
            ledger: Box::new(ledger),
            equity: Box::new(MemoryEquity::new()),
            staking: Box::new(MemoryStaking::new()),
            lending: Box::new(MemoryLending::new()),
            escrow: Box::new(MemoryEscrow::new()),
            ban_registry: Box::new(MemoryBanRegistry::new()),
            account_registry: Box::new(MemoryAccountRegistry::new()),
        };
        let engine = StateEngine::new(StateDb::open_temp().unwrap(), ext);

        let t0 = 1_000_000;
        let action = Action::CreatePlan {
            beneficiaries: vec![BeneficiaryInput {
                address: beneficiary.clone(),
                priority: 1,
                percentage_ppm: 1_000_000,
                specific_assets: vec![],
            }],
            inactivity_period_secs: 365 * DAY,
            grace_period_secs: 30 * DAY,
            claim_window_secs: 180 * DAY,
            charity_address: None,
        };
        let events = engine.apply(&owner, &action, t0, 1).unwrap();
        let plan_id = match &events[0] {
            Event::PlanCreated { plan_id, .. } => *plan_id,
            _ => unreachable!(),
        };

        let t_trigger = t0 + 366 * DAY;
        engine.apply(&owner, &Action::TriggerSwitch { plan_id }, t_trigger, 2).unwrap();
        let t_grace_end = t_trigger + 30 * DAY;
        engine.run_end_of_block(t_grace_end).unwrap();

        let events = engine.apply(&beneficiary, &Action::ClaimAssets { plan_id }, t_grace_end, 3).unwrap();
        let assets = events
            .iter()
            .find_map(|e| match e {
                Event::AssetsClaimed { assets, .. } => Some(assets.clone()),
                _ => None,
            })
            .unwrap();
        assert!(matches!(
            assets.as_slice(),
            [inheritance_core::entities::TransferredAsset::Fungible { amount: 2_000_000_000_000_000_000_000_000_000_000, .. }]
        ));
    }

    #[test]
    fn second_claim_on_claimed_plan_errors() {
        let (engine, owner, b1, b2) = fixture();
        let t0 = 1_000_000;
        let plan_id = create_happy_path_plan(&engine, &owner, &b1, &b2, t0);
        let t_trigger = t0 + 366 * DAY;
        engine.apply(&b1, &Action::TriggerSwitch { plan_id }, t_trigger, 2).unwrap();
        let t_grace_end = t_trigger + 30 * DAY;
        engine.run_end_of_block(t_grace_end).unwrap();
        engine.apply(&b1, &Action::ClaimAssets { plan_id }, t_grace_end, 3).unwrap();

        let err = engine.apply(&b1, &Action::ClaimAssets { plan_id }, t_grace_end, 4).unwrap_err();
        assert!(matches!(err, InheritanceError::ClaimAlreadyProcessed));
    }

    #[test]
    fn second_trigger_on_triggered_plan_errors() {
        let (engine, owner, b1, b2) = fixture();
        let t0 = 1_000_000;
        let plan_id = create_happy_path_plan(&engine, &owner, &b1, &b2, t0);
        let t_trigger = t0 + 366 * DAY;
        engine.apply(&b1, &Action::TriggerSwitch { plan_id }, t_trigger, 2).unwrap();

        let err = engine.apply(&b1, &Action::TriggerSwitch { plan_id }, t_trigger, 3).unwrap_err();
        assert!(matches!(err, InheritanceError::PlanAlreadyTriggered));
    }
}
