//! Narrow interfaces consumed by the inheritance core.
//!
//! Each trait here is exactly the surface the engine needs from a sibling
//! module of the host chain; nothing more. They are wired into a
//! `StateEngine` at application startup (see `inheritance-node`), never
//! looked up through a package-level global.

pub mod memory;

use inheritance_core::error::InheritanceError;
use inheritance_core::types::{Address, Balance};

/// A single non-zero denomination balance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Coin {
    pub denom: String,
    pub amount: Balance,
}

pub trait Ledger {
    fn get_all_balances(&self, addr: &Address) -> Result<Vec<Coin>, InheritanceError>;
    fn send_coins(&self, from: &Address, to: &Address, denom: &str, amount: Balance) -> Result<(), InheritanceError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EquityHolding {
    pub company_id: u64,
    pub class_id: u32,
    pub shares: u128,
}

pub trait Equity {
    fn get_all_holdings_by_address(&self, addr: &Address) -> Result<Vec<EquityHolding>, InheritanceError>;
    fn transfer_shares(
        &self,
        company_id: u64,
        class_id: u32,
        from: &Address,
        to: &Address,
        shares: u128,
    ) -> Result<(), InheritanceError>;
}

pub trait Staking {
    fn get_user_stake(&self, addr: &Address) -> Result<Balance, InheritanceError>;
    fn unstake_for_inheritance(&self, from: &Address, to: &Address, amount: Balance) -> Result<(), InheritanceError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoanStatus {
    Pending,
    Active,
    Closed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Loan {
    pub loan_id: u64,
    pub status: LoanStatus,
    pub borrower: Address,
    pub lender: Address,
}

pub trait Lending {
    fn get_user_loans(&self, addr: &Address) -> Result<Vec<Loan>, InheritanceError>;
    fn transfer_borrower_position(&self, loan_id: u64, from: &Address, to: &Address) -> Result<(), InheritanceError>;
    fn transfer_lender_position(&self, loan_id: u64, from: &Address, to: &Address) -> Result<(), InheritanceError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EscrowStatus {
    Funded,
    Active,
    Disputed,
    Closed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Escrow {
    pub escrow_id: u64,
    pub status: EscrowStatus,
    pub sender: Address,
    pub recipient: Address,
}

pub trait EscrowModule {
    fn get_all_escrows(&self) -> Result<Vec<Escrow>, InheritanceError>;
    fn transfer_buyer_position(&self, escrow_id: u64, from: &Address, to: &Address) -> Result<(), InheritanceError>;
    fn transfer_seller_position(&self, escrow_id: u64, from: &Address, to: &Address) -> Result<(), InheritanceError>;
}

pub trait BanRegistry {
    fn is_address_banned(&self, addr: &Address) -> bool;
}

pub trait AccountRegistry {
    fn get_module_address(&self, name: &str) -> Option<Address>;
}

/// Bundles every external dependency the engine needs, wired once at
/// construction.
pub struct ExternalModules {
    pub ledger: Box<dyn Ledger + Send + Sync>,
    pub equity: Box<dyn Equity + Send + Sync>,
    pub staking: Box<dyn Staking + Send + Sync>,
    pub lending: Box<dyn Lending + Send + Sync>,
    pub escrow: Box<dyn EscrowModule + Send + Sync>,
    pub ban_registry: Box<dyn BanRegistry + Send + Sync>,
    pub account_registry: Box<dyn AccountRegistry + Send + Sync>,
}
