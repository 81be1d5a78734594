pub mod actions;
pub mod constants;
pub mod entities;
pub mod error;
pub mod events;
pub mod types;
pub mod validate;

pub use actions::{Action, BeneficiaryInput};
pub use entities::*;
pub use error::InheritanceError;
pub use events::{CancelReason, ClaimCloseReason, Event, SkipReason};
pub use types::*;
