use std::collections::HashSet;

use crate::actions::BeneficiaryInput;
use crate::constants::PPM_SCALE;
use crate::entities::Params;
use crate::error::InheritanceError;
use crate::types::Seconds;

/// Checks unique priorities, exact percentage-sum, period bounds, and
/// beneficiary count for a proposed plan. Used by both
/// `CreatePlan` and `UpdatePlan` — the invariants apply identically to both.
pub fn validate_plan_fields(
    beneficiaries: &[BeneficiaryInput],
    inactivity_period_secs: Seconds,
    grace_period_secs: Seconds,
    claim_window_secs: Seconds,
    params: &Params,
) -> Result<(), InheritanceError> {
    if beneficiaries.is_empty() {
        return Err(InheritanceError::InvalidPlan("at least one beneficiary is required".into()));
    }
    if beneficiaries.len() as u32 > params.max_beneficiaries {
        return Err(InheritanceError::TooManyBeneficiaries {
            max: params.max_beneficiaries,
            got: beneficiaries.len() as u32,
        });
    }

    let mut seen_priorities = HashSet::new();
    let mut sum_ppm: u64 = 0;
    for b in beneficiaries {
        if b.priority == 0 {
            return Err(InheritanceError::InvalidBeneficiary("priority must be strictly positive".into()));
        }
        if !seen_priorities.insert(b.priority) {
            return Err(InheritanceError::DuplicatePriority(b.priority));
        }
        if b.percentage_ppm > PPM_SCALE {
            return Err(InheritanceError::InvalidBeneficiary("percentage exceeds 100%".into()));
        }
        sum_ppm += b.percentage_ppm;
    }
    if sum_ppm != PPM_SCALE {
        return Err(InheritanceError::InvalidPercentage { got_ppm: sum_ppm });
    }

    if inactivity_period_secs < params.min_inactivity_period_secs {
        return Err(InheritanceError::InvalidInactivity { min: params.min_inactivity_period_secs });
    }
    if grace_period_secs < params.min_grace_period_secs {
        return Err(InheritanceError::InvalidGracePeriod { min: params.min_grace_period_secs });
    }
    if claim_window_secs < params.min_claim_window_secs || claim_window_secs > params.max_claim_window_secs {
        return Err(InheritanceError::InvalidClaimWindow {
            min: params.min_claim_window_secs,
            max: params.max_claim_window_secs,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Address;

    fn ben(priority: u32, ppm: u64) -> BeneficiaryInput {
        BeneficiaryInput {
            address: Address::from_seed(format!("b{priority}").as_bytes()),
            priority,
            percentage_ppm: ppm,
            specific_assets: vec![],
        }
    }

    #[test]
    fn rejects_percentage_sum_below_one() {
        let params = Params::defaults();
        let bens = vec![ben(1, 600_000), ben(2, 300_000)];
        let err = validate_plan_fields(&bens, 365 * 86400, 30 * 86400, 180 * 86400, &params).unwrap_err();
        assert!(matches!(err, InheritanceError::InvalidPercentage { got_ppm: 900_000 }));
    }

    #[test]
    fn rejects_duplicate_priority() {
        let params = Params::defaults();
        let bens = vec![ben(1, 600_000), ben(1, 400_000)];
        let err = validate_plan_fields(&bens, 365 * 86400, 30 * 86400, 180 * 86400, &params).unwrap_err();
        assert!(matches!(err, InheritanceError::DuplicatePriority(1)));
    }

    #[test]
    fn accepts_exact_sum() {
        let params = Params::defaults();
        let bens = vec![ben(1, 600_000), ben(2, 400_000)];
        validate_plan_fields(&bens, 365 * 86400, 30 * 86400, 180 * 86400, &params).unwrap();
    }

    #[test]
    fn rejects_too_short_grace_period() {
        let params = Params::defaults();
        let bens = vec![ben(1, 1_000_000)];
        let err = validate_plan_fields(&bens, 365 * 86400, 86400, 180 * 86400, &params).unwrap_err();
        assert!(matches!(err, InheritanceError::InvalidGracePeriod { .. }));
    }
}
