//! ─── Inheritance Module Protocol Constants ──────────────────────────────────

use crate::types::Seconds;

/// Days expressed in seconds, to keep the defaults below legible.
const DAY: Seconds = 24 * 3600;
const YEAR: Seconds = 365 * DAY;

/// Governance-settable default: minimum `inactivityPeriod` on a plan.
pub const DEFAULT_MIN_INACTIVITY_PERIOD_SECS: Seconds = 180 * DAY;

/// Governance-settable default: minimum `gracePeriod` on a plan.
pub const DEFAULT_MIN_GRACE_PERIOD_SECS: Seconds = 30 * DAY;

/// Governance-settable default: minimum `claimWindow` on a plan.
pub const DEFAULT_MIN_CLAIM_WINDOW_SECS: Seconds = 30 * DAY;

/// Governance-settable default: maximum `claimWindow` on a plan.
pub const DEFAULT_MAX_CLAIM_WINDOW_SECS: Seconds = 365 * DAY;

/// Governance-settable default: ultra-long inactivity threshold.
pub const DEFAULT_ULTRA_LONG_INACTIVITY_SECS: Seconds = 50 * YEAR;

/// Governance-settable default: maximum beneficiaries per plan.
pub const DEFAULT_MAX_BENEFICIARIES: u32 = 16;

/// Hard bound on cascade recursion. Not governance-settable:
/// this is a protocol safety bound, not a tunable parameter.
pub const MAX_CASCADE_DEPTH: u32 = 10;

/// Cap on results returned by a single bounded owner/beneficiary plan
/// lookup, so a caller that only needs a page doesn't force a full
/// materialization of every plan an address is party to.
pub const MAX_PLANS_PER_QUERY: usize = 100;

/// Scale for `Percentage` parts-per-million values; exported from `types`.
pub use crate::types::PPM_SCALE;
