use std::path::Path;

use inheritance_core::entities::{
    ActivityRecord, BeneficiaryClaim, LockedAssets, Params, Plan, SwitchTrigger,
};
use inheritance_core::error::InheritanceError;
use inheritance_core::types::{Address, BlockTime, PlanId};

/// Persistent state database backed by sled (pure-Rust, no C dependencies).
///
/// Named trees, keyed per the typed prefixes in the data model:
///   plans          — planId be bytes        → bincode(Plan)
///   owner_index    — owner bytes || planId   → []  (membership set)
///   ben_index      — ben bytes || planId     → []
///   triggers       — planId be bytes         → bincode(SwitchTrigger)
///   claims         — planId be bytes || addr → bincode(BeneficiaryClaim)
///   locks          — planId be bytes         → []  (ClaimLock marker)
///   activity       — addr bytes              → bincode(ActivityRecord)
///   locked_assets  — planId be bytes         → bincode(LockedAssets)
///   due_triggers   — gracePeriodEnd be || planId → [] (scheduler index)
///   due_claims     — claimWindowEnd be || planId || addr → []
///   meta           — utf8 key bytes          → raw bytes (Params, counters)
pub struct StateDb {
    _db: sled::Db,
    plans: sled::Tree,
    owner_index: sled::Tree,
    ben_index: sled::Tree,
    triggers: sled::Tree,
    claims: sled::Tree,
    locks: sled::Tree,
    activity: sled::Tree,
    locked_assets: sled::Tree,
    due_triggers: sled::Tree,
    due_claims: sled::Tree,
    meta: sled::Tree,
}

fn storage_err(e: sled::Error) -> InheritanceError {
    InheritanceError::Storage(e.to_string())
}

fn ser<T: serde::Serialize>(v: &T) -> Result<Vec<u8>, InheritanceError> {
    bincode::serialize(v).map_err(|e| InheritanceError::Serialization(e.to_string()))
}

fn de<T: serde::de::DeserializeOwned>(b: &[u8]) -> Result<T, InheritanceError> {
    bincode::deserialize(b).map_err(|e| InheritanceError::Serialization(e.to_string()))
}

fn claim_key(plan_id: PlanId, addr: &Address) -> Vec<u8> {
    let mut k = plan_id.to_be_bytes().to_vec();
    k.extend_from_slice(addr.as_bytes());
    k
}

impl StateDb {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, InheritanceError> {
        let db = sled::open(path).map_err(storage_err)?;
        Ok(Self {
            plans: db.open_tree("plans").map_err(storage_err)?,
            owner_index: db.open_tree("owner_index").map_err(storage_err)?,
            ben_index: db.open_tree("ben_index").map_err(storage_err)?,
            triggers: db.open_tree("triggers").map_err(storage_err)?,
            claims: db.open_tree("claims").map_err(storage_err)?,
            locks: db.open_tree("locks").map_err(storage_err)?,
            activity: db.open_tree("activity").map_err(storage_err)?,
            locked_assets: db.open_tree("locked_assets").map_err(storage_err)?,
            due_triggers: db.open_tree("due_triggers").map_err(storage_err)?,
            due_claims: db.open_tree("due_claims").map_err(storage_err)?,
            meta: db.open_tree("meta").map_err(storage_err)?,
            _db: db,
        })
    }

    /// Open a throwaway temporary database (test/demo use).
    pub fn open_temp() -> Result<Self, InheritanceError> {
        let db = sled::Config::new().temporary(true).open().map_err(storage_err)?;
        Ok(Self {
            plans: db.open_tree("plans").map_err(storage_err)?,
            owner_index: db.open_tree("owner_index").map_err(storage_err)?,
            ben_index: db.open_tree("ben_index").map_err(storage_err)?,
            triggers: db.open_tree("triggers").map_err(storage_err)?,
            claims: db.open_tree("claims").map_err(storage_err)?,
            locks: db.open_tree("locks").map_err(storage_err)?,
            activity: db.open_tree("activity").map_err(storage_err)?,
            locked_assets: db.open_tree("locked_assets").map_err(storage_err)?,
            due_triggers: db.open_tree("due_triggers").map_err(storage_err)?,
            due_claims: db.open_tree("due_claims").map_err(storage_err)?,
            meta: db.open_tree("meta").map_err(storage_err)?,
            _db: db,
        })
    }

    // ── Params ────────────────────────────────────────────────────────────

    pub fn get_params(&self) -> Result<Params, InheritanceError> {
        match self.meta.get("params").map_err(storage_err)? {
            Some(b) => de(&b),
            None => Ok(Params::defaults()),
        }
    }

    pub fn set_params(&self, params: &Params) -> Result<(), InheritanceError> {
        self.meta.insert("params", ser(params)?).map_err(storage_err)?;
        Ok(())
    }

    // ── Plan counter ──────────────────────────────────────────────────────

    /// Allocate the next sequential plan id (stored in the meta tree).
    pub fn next_plan_id(&self) -> Result<PlanId, InheritanceError> {
        let key = "plan_counter";
        let current = match self.meta.get(key).map_err(storage_err)? {
            Some(b) => {
                let mut arr = [0u8; 8];
                arr.copy_from_slice(&b[..8]);
                u64::from_be_bytes(arr)
            }
            None => 0,
        };
        self.meta.insert(key, &(current + 1).to_be_bytes()).map_err(storage_err)?;
        Ok(current + 1)
    }

    // ── Plans ─────────────────────────────────────────────────────────────

    pub fn get_plan(&self, plan_id: PlanId) -> Result<Option<Plan>, InheritanceError> {
        match self.plans.get(plan_id.to_be_bytes()).map_err(storage_err)? {
            Some(b) => Ok(Some(de(&b)?)),
            None => Ok(None),
        }
    }

    pub fn put_plan(&self, plan: &Plan) -> Result<(), InheritanceError> {
        self.plans.insert(plan.plan_id.to_be_bytes(), ser(plan)?).map_err(storage_err)?;
        Ok(())
    }

    pub fn delete_plan(&self, plan_id: PlanId) -> Result<(), InheritanceError> {
        self.plans.remove(plan_id.to_be_bytes()).map_err(storage_err)?;
        Ok(())
    }

    // ── Owner / beneficiary indices ──────────────────────────────────────

    pub fn index_owner(&self, owner: &Address, plan_id: PlanId) -> Result<(), InheritanceError> {
        self.owner_index.insert(claim_key(plan_id, owner), b"".as_ref()).map_err(storage_err)?;
        Ok(())
    }

    pub fn unindex_owner(&self, owner: &Address, plan_id: PlanId) -> Result<(), InheritanceError> {
        self.owner_index.remove(claim_key(plan_id, owner)).map_err(storage_err)?;
        Ok(())
    }

    pub fn plans_by_owner(&self, owner: &Address) -> Result<Vec<PlanId>, InheritanceError> {
        self.plan_ids_by_prefix(&self.owner_index, owner)
    }

    pub fn index_beneficiary(&self, ben: &Address, plan_id: PlanId) -> Result<(), InheritanceError> {
        self.ben_index.insert(claim_key(plan_id, ben), b"".as_ref()).map_err(storage_err)?;
        Ok(())
    }

    pub fn unindex_beneficiary(&self, ben: &Address, plan_id: PlanId) -> Result<(), InheritanceError> {
        self.ben_index.remove(claim_key(plan_id, ben)).map_err(storage_err)?;
        Ok(())
    }

    pub fn plans_by_beneficiary(&self, ben: &Address) -> Result<Vec<PlanId>, InheritanceError> {
        self.plan_ids_by_prefix(&self.ben_index, ben)
    }

    fn plan_ids_by_prefix(&self, tree: &sled::Tree, addr: &Address) -> Result<Vec<PlanId>, InheritanceError> {
        let mut out = Vec::new();
        for item in tree.iter() {
            let (key, _) = item.map_err(storage_err)?;
            if key.len() < 40 {
                continue;
            }
            let mut plan_id_bytes = [0u8; 8];
            plan_id_bytes.copy_from_slice(&key[..8]);
            let key_addr = &key[8..40];
            if key_addr == addr.as_bytes() {
                out.push(u64::from_be_bytes(plan_id_bytes));
            }
        }
        Ok(out)
    }

    // ── Triggers ──────────────────────────────────────────────────────────

    pub fn get_trigger(&self, plan_id: PlanId) -> Result<Option<SwitchTrigger>, InheritanceError> {
        match self.triggers.get(plan_id.to_be_bytes()).map_err(storage_err)? {
            Some(b) => Ok(Some(de(&b)?)),
            None => Ok(None),
        }
    }

    pub fn put_trigger(&self, trigger: &SwitchTrigger) -> Result<(), InheritanceError> {
        self.triggers.insert(trigger.plan_id.to_be_bytes(), ser(trigger)?).map_err(storage_err)?;
        Ok(())
    }

    pub fn delete_trigger(&self, plan_id: PlanId) -> Result<(), InheritanceError> {
        self.triggers.remove(plan_id.to_be_bytes()).map_err(storage_err)?;
        Ok(())
    }

    pub fn index_due_trigger(&self, grace_period_end: BlockTime, plan_id: PlanId) -> Result<(), InheritanceError> {
        let key = due_key(grace_period_end, plan_id);
        self.due_triggers.insert(key, b"".as_ref()).map_err(storage_err)?;
        Ok(())
    }

    pub fn unindex_due_trigger(&self, grace_period_end: BlockTime, plan_id: PlanId) -> Result<(), InheritanceError> {
        let key = due_key(grace_period_end, plan_id);
        self.due_triggers.remove(key).map_err(storage_err)?;
        Ok(())
    }

    /// Plan ids whose trigger deadline is `<= now`, in deadline order.
    pub fn due_triggers(&self, now: BlockTime) -> Result<Vec<PlanId>, InheritanceError> {
        let mut out = Vec::new();
        for item in self.due_triggers.iter() {
            let (key, _) = item.map_err(storage_err)?;
            let (deadline, plan_id) = parse_due_key(&key);
            if deadline > now {
                break;
            }
            out.push(plan_id);
        }
        Ok(out)
    }

    // ── Claims ────────────────────────────────────────────────────────────

    pub fn get_claim(&self, plan_id: PlanId, addr: &Address) -> Result<Option<BeneficiaryClaim>, InheritanceError> {
        match self.claims.get(claim_key(plan_id, addr)).map_err(storage_err)? {
            Some(b) => Ok(Some(de(&b)?)),
            None => Ok(None),
        }
    }

    pub fn put_claim(&self, claim: &BeneficiaryClaim) -> Result<(), InheritanceError> {
        self.claims
            .insert(claim_key(claim.plan_id, &claim.address), ser(claim)?)
            .map_err(storage_err)?;
        Ok(())
    }

    /// All claims belonging to a plan, ordered by priority ascending.
    pub fn claims_for_plan(&self, plan_id: PlanId) -> Result<Vec<BeneficiaryClaim>, InheritanceError> {
        let prefix = plan_id.to_be_bytes();
        let mut out = Vec::new();
        for item in self.claims.scan_prefix(prefix) {
            let (_, b) = item.map_err(storage_err)?;
            out.push(de(&b)?);
        }
        out.sort_by_key(|c: &BeneficiaryClaim| c.priority);
        Ok(out)
    }

    pub fn index_due_claim(&self, claim_window_end: BlockTime, plan_id: PlanId, addr: &Address) -> Result<(), InheritanceError> {
        let key = due_claim_key(claim_window_end, plan_id, addr);
        self.due_claims.insert(key, b"".as_ref()).map_err(storage_err)?;
        Ok(())
    }

    pub fn unindex_due_claim(&self, claim_window_end: BlockTime, plan_id: PlanId, addr: &Address) -> Result<(), InheritanceError> {
        let key = due_claim_key(claim_window_end, plan_id, addr);
        self.due_claims.remove(key).map_err(storage_err)?;
        Ok(())
    }

    /// (planId, address) pairs whose claim window deadline is `<= now`.
    pub fn due_claims(&self, now: BlockTime) -> Result<Vec<(PlanId, Address)>, InheritanceError> {
        let mut out = Vec::new();
        for item in self.due_claims.iter() {
            let (key, _) = item.map_err(storage_err)?;
            let (deadline, plan_id, addr) = parse_due_claim_key(&key);
            if deadline > now {
                break;
            }
            out.push((plan_id, addr));
        }
        Ok(out)
    }

    // ── Claim lock ────────────────────────────────────────────────────────

    pub fn try_acquire_claim_lock(&self, plan_id: PlanId) -> Result<bool, InheritanceError> {
        let key = plan_id.to_be_bytes();
        let res = self
            .locks
            .compare_and_swap(key, None::<&[u8]>, Some(b"".as_ref()))
            .map_err(storage_err)?;
        Ok(res.is_ok())
    }

    pub fn release_claim_lock(&self, plan_id: PlanId) -> Result<(), InheritanceError> {
        self.locks.remove(plan_id.to_be_bytes()).map_err(storage_err)?;
        Ok(())
    }

    // ── Activity ──────────────────────────────────────────────────────────

    pub fn get_activity(&self, addr: &Address) -> Result<Option<ActivityRecord>, InheritanceError> {
        match self.activity.get(addr.as_bytes()).map_err(storage_err)? {
            Some(b) => Ok(Some(de(&b)?)),
            None => Ok(None),
        }
    }

    pub fn put_activity(&self, record: &ActivityRecord) -> Result<(), InheritanceError> {
        self.activity.insert(record.address.as_bytes(), ser(record)?).map_err(storage_err)?;
        Ok(())
    }

    /// All addresses with a recorded activity entry (used by the
    /// ultra-long-inactivity scheduler pass).
    pub fn iter_all_activity(&self) -> Result<Vec<ActivityRecord>, InheritanceError> {
        let mut out = Vec::new();
        for item in self.activity.iter() {
            let (_, b) = item.map_err(storage_err)?;
            out.push(de(&b)?);
        }
        Ok(out)
    }

    // ── Locked assets ─────────────────────────────────────────────────────

    pub fn get_locked_assets(&self, plan_id: PlanId) -> Result<Option<LockedAssets>, InheritanceError> {
        match self.locked_assets.get(plan_id.to_be_bytes()).map_err(storage_err)? {
            Some(b) => Ok(Some(de(&b)?)),
            None => Ok(None),
        }
    }

    pub fn put_locked_assets(&self, locked: &LockedAssets) -> Result<(), InheritanceError> {
        self.locked_assets.insert(locked.plan_id.to_be_bytes(), ser(locked)?).map_err(storage_err)?;
        Ok(())
    }

    pub fn delete_locked_assets(&self, plan_id: PlanId) -> Result<(), InheritanceError> {
        self.locked_assets.remove(plan_id.to_be_bytes()).map_err(storage_err)?;
        Ok(())
    }

    pub fn flush(&self) -> Result<(), InheritanceError> {
        self._db.flush().map_err(storage_err)?;
        Ok(())
    }
}

fn due_key(deadline: BlockTime, plan_id: PlanId) -> Vec<u8> {
    let mut k = (deadline as u64).to_be_bytes().to_vec();
    k.extend_from_slice(&plan_id.to_be_bytes());
    k
}

fn parse_due_key(key: &[u8]) -> (BlockTime, PlanId) {
    let mut deadline_bytes = [0u8; 8];
    deadline_bytes.copy_from_slice(&key[..8]);
    let mut plan_id_bytes = [0u8; 8];
    plan_id_bytes.copy_from_slice(&key[8..16]);
    (u64::from_be_bytes(deadline_bytes) as BlockTime, u64::from_be_bytes(plan_id_bytes))
}

fn due_claim_key(deadline: BlockTime, plan_id: PlanId, addr: &Address) -> Vec<u8> {
    let mut k = (deadline as u64).to_be_bytes().to_vec();
    k.extend_from_slice(&plan_id.to_be_bytes());
    k.extend_from_slice(addr.as_bytes());
    k
}

fn parse_due_claim_key(key: &[u8]) -> (BlockTime, PlanId, Address) {
    let mut deadline_bytes = [0u8; 8];
    deadline_bytes.copy_from_slice(&key[..8]);
    let mut plan_id_bytes = [0u8; 8];
    plan_id_bytes.copy_from_slice(&key[8..16]);
    let mut addr_bytes = [0u8; 32];
    addr_bytes.copy_from_slice(&key[16..48]);
    (
        u64::from_be_bytes(deadline_bytes) as BlockTime,
        u64::from_be_bytes(plan_id_bytes),
        Address::from_bytes(addr_bytes),
    )
}
