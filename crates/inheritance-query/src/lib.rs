//! inheritance-query
//!
//! Read-only query and describe layer over `inheritance-state`'s `StateDb`.
//! The create/trigger/claim logic lives in `inheritance-state`'s
//! `StateEngine`; this crate only answers questions about what is already
//! stored there.

pub mod query;

pub use query::{ActivityQuery, ClaimQuery, PlanQuery, TriggerQuery};
