//! In-memory reference implementations of the external-module traits, used
//! by `inheritance-state`'s test suite and `inheritance-node`'s demo
//! scenarios. Not a production ledger/equity/staking implementation — those
//! live in the host chain.

use std::collections::HashMap;
use std::sync::Mutex;

use inheritance_core::error::InheritanceError;
use inheritance_core::types::{Address, Balance};

use crate::{
    AccountRegistry, BanRegistry, Coin, Equity, EquityHolding, Escrow, EscrowModule, EscrowStatus,
    Ledger, Lending, Loan, LoanStatus, Staking,
};

#[derive(Default)]
pub struct MemoryLedger {
    balances: Mutex<HashMap<(Address, String), Balance>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, addr: &Address, denom: &str, amount: Balance) {
        self.balances.lock().unwrap().insert((addr.clone(), denom.to_string()), amount);
    }
}

impl Ledger for MemoryLedger {
    fn get_all_balances(&self, addr: &Address) -> Result<Vec<Coin>, InheritanceError> {
        let map = self.balances.lock().unwrap();
        Ok(map
            .iter()
            .filter(|((a, _), amount)| a == addr && **amount > 0)
            .map(|((_, denom), amount)| Coin { denom: denom.clone(), amount: *amount })
            .collect())
    }

    fn send_coins(&self, from: &Address, to: &Address, denom: &str, amount: Balance) -> Result<(), InheritanceError> {
        let mut map = self.balances.lock().unwrap();
        let key = (from.clone(), denom.to_string());
        let have = *map.get(&key).unwrap_or(&0);
        if have < amount {
            return Err(InheritanceError::InsufficientAssets);
        }
        map.insert(key, have - amount);
        let to_key = (to.clone(), denom.to_string());
        let to_have = *map.get(&to_key).unwrap_or(&0);
        map.insert(to_key, to_have + amount);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryEquity {
    holdings: Mutex<HashMap<(Address, u64, u32), u128>>,
}

impl MemoryEquity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_holding(&self, addr: &Address, company_id: u64, class_id: u32, shares: u128) {
        self.holdings.lock().unwrap().insert((addr.clone(), company_id, class_id), shares);
    }
}

impl Equity for MemoryEquity {
    fn get_all_holdings_by_address(&self, addr: &Address) -> Result<Vec<EquityHolding>, InheritanceError> {
        let map = self.holdings.lock().unwrap();
        Ok(map
            .iter()
            .filter(|((a, _, _), shares)| a == addr && **shares > 0)
            .map(|((_, company_id, class_id), shares)| EquityHolding {
                company_id: *company_id,
                class_id: *class_id,
                shares: *shares,
            })
            .collect())
    }

    fn transfer_shares(
        &self,
        company_id: u64,
        class_id: u32,
        from: &Address,
        to: &Address,
        shares: u128,
    ) -> Result<(), InheritanceError> {
        let mut map = self.holdings.lock().unwrap();
        let from_key = (from.clone(), company_id, class_id);
        let have = *map.get(&from_key).unwrap_or(&0);
        if have < shares {
            return Err(InheritanceError::InsufficientAssets);
        }
        map.insert(from_key, have - shares);
        let to_key = (to.clone(), company_id, class_id);
        let to_have = *map.get(&to_key).unwrap_or(&0);
        map.insert(to_key, to_have + shares);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStaking {
    stakes: Mutex<HashMap<Address, Balance>>,
}

impl MemoryStaking {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_stake(&self, addr: &Address, amount: Balance) {
        self.stakes.lock().unwrap().insert(addr.clone(), amount);
    }
}

impl Staking for MemoryStaking {
    fn get_user_stake(&self, addr: &Address) -> Result<Balance, InheritanceError> {
        Ok(*self.stakes.lock().unwrap().get(addr).unwrap_or(&0))
    }

    fn unstake_for_inheritance(&self, from: &Address, to: &Address, amount: Balance) -> Result<(), InheritanceError> {
        let mut map = self.stakes.lock().unwrap();
        let have = *map.get(from).unwrap_or(&0);
        if have < amount {
            return Err(InheritanceError::InsufficientAssets);
        }
        map.insert(from.clone(), have - amount);
        // Unbonding retains its usual delay at the host layer; this reference
        // implementation credits the beneficiary's stake directly since the
        // delay mechanics live in the (out-of-scope) staking module.
        let to_have = *map.get(to).unwrap_or(&0);
        map.insert(to.clone(), to_have + amount);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryLending {
    loans: Mutex<HashMap<u64, Loan>>,
}

impl MemoryLending {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_loan(&self, loan: Loan) {
        self.loans.lock().unwrap().insert(loan.loan_id, loan);
    }
}

impl Lending for MemoryLending {
    fn get_user_loans(&self, addr: &Address) -> Result<Vec<Loan>, InheritanceError> {
        let map = self.loans.lock().unwrap();
        Ok(map
            .values()
            .filter(|l| &l.borrower == addr || &l.lender == addr)
            .filter(|l| l.status != LoanStatus::Closed)
            .cloned()
            .collect())
    }

    fn transfer_borrower_position(&self, loan_id: u64, from: &Address, to: &Address) -> Result<(), InheritanceError> {
        let mut map = self.loans.lock().unwrap();
        let loan = map.get_mut(&loan_id).ok_or_else(|| InheritanceError::Other(format!("loan {loan_id} not found")))?;
        if &loan.borrower != from {
            return Err(InheritanceError::Other("not the borrower on this loan".into()));
        }
        loan.borrower = to.clone();
        Ok(())
    }

    fn transfer_lender_position(&self, loan_id: u64, from: &Address, to: &Address) -> Result<(), InheritanceError> {
        let mut map = self.loans.lock().unwrap();
        let loan = map.get_mut(&loan_id).ok_or_else(|| InheritanceError::Other(format!("loan {loan_id} not found")))?;
        if &loan.lender != from {
            return Err(InheritanceError::Other("not the lender on this loan".into()));
        }
        loan.lender = to.clone();
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryEscrow {
    escrows: Mutex<HashMap<u64, Escrow>>,
}

impl MemoryEscrow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_escrow(&self, escrow: Escrow) {
        self.escrows.lock().unwrap().insert(escrow.escrow_id, escrow);
    }
}

impl EscrowModule for MemoryEscrow {
    fn get_all_escrows(&self) -> Result<Vec<Escrow>, InheritanceError> {
        Ok(self.escrows.lock().unwrap().values().cloned().collect())
    }

    fn transfer_buyer_position(&self, escrow_id: u64, from: &Address, to: &Address) -> Result<(), InheritanceError> {
        let mut map = self.escrows.lock().unwrap();
        let e = map.get_mut(&escrow_id).ok_or_else(|| InheritanceError::Other(format!("escrow {escrow_id} not found")))?;
        if e.status == EscrowStatus::Disputed {
            return Err(InheritanceError::Other("escrow is disputed".into()));
        }
        if &e.sender != from {
            return Err(InheritanceError::Other("not the buyer on this escrow".into()));
        }
        e.sender = to.clone();
        Ok(())
    }

    fn transfer_seller_position(&self, escrow_id: u64, from: &Address, to: &Address) -> Result<(), InheritanceError> {
        let mut map = self.escrows.lock().unwrap();
        let e = map.get_mut(&escrow_id).ok_or_else(|| InheritanceError::Other(format!("escrow {escrow_id} not found")))?;
        if e.status == EscrowStatus::Disputed {
            return Err(InheritanceError::Other("escrow is disputed".into()));
        }
        if &e.recipient != from {
            return Err(InheritanceError::Other("not the seller on this escrow".into()));
        }
        e.recipient = to.clone();
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryBanRegistry {
    banned: Mutex<std::collections::HashSet<Address>>,
}

impl MemoryBanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ban(&self, addr: &Address) {
        self.banned.lock().unwrap().insert(addr.clone());
    }
}

impl BanRegistry for MemoryBanRegistry {
    fn is_address_banned(&self, addr: &Address) -> bool {
        self.banned.lock().unwrap().contains(addr)
    }
}

#[derive(Default)]
pub struct MemoryAccountRegistry {
    modules: Mutex<HashMap<String, Address>>,
}

impl MemoryAccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_module_address(&self, name: &str, addr: Address) {
        self.modules.lock().unwrap().insert(name.to_string(), addr);
    }
}

impl AccountRegistry for MemoryAccountRegistry {
    fn get_module_address(&self, name: &str) -> Option<Address> {
        self.modules.lock().unwrap().get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_send_coins_moves_balance() {
        let ledger = MemoryLedger::new();
        let a = Address::from_seed(b"a");
        let b = Address::from_seed(b"b");
        ledger.set_balance(&a, "uhodl", 1_000_000);
        ledger.send_coins(&a, &b, "uhodl", 600_000).unwrap();
        let a_balances = ledger.get_all_balances(&a).unwrap();
        let b_balances = ledger.get_all_balances(&b).unwrap();
        assert_eq!(a_balances[0].amount, 400_000);
        assert_eq!(b_balances[0].amount, 600_000);
    }

    #[test]
    fn ledger_send_coins_insufficient_errors() {
        let ledger = MemoryLedger::new();
        let a = Address::from_seed(b"a");
        let b = Address::from_seed(b"b");
        ledger.set_balance(&a, "uhodl", 100);
        let err = ledger.send_coins(&a, &b, "uhodl", 200).unwrap_err();
        assert!(matches!(err, InheritanceError::InsufficientAssets));
    }
}
