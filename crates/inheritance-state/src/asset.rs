//! Percentage-based and full-position asset movement across all five
//! asset kinds, with overflow-safe fixed-point math.

use inheritance_core::constants::PPM_SCALE;
use inheritance_core::entities::{SpecificAsset, TransferredAsset};
use inheritance_core::types::{Address, Balance, BlockTime};
use inheritance_external::{EscrowStatus, ExternalModules, Loan, LoanStatus};
use tracing::warn;

/// `floor(amount * percentage_ppm / PPM_SCALE)`, computed so it cannot
/// overflow even for balances near `u128::MAX`. The naive product
/// `amount * percentage_ppm` can itself overflow a `u128` once `amount`
/// exceeds roughly `2^128 / 10^6`; dividing first keeps every intermediate
/// value bounded by the larger of the two operands.
pub fn floor_percentage(amount: u128, percentage_ppm: u64) -> u128 {
    if percentage_ppm == 0 || amount == 0 {
        return 0;
    }
    let ppm_scale = PPM_SCALE as u128;
    let percentage_ppm = percentage_ppm as u128;
    match amount.checked_mul(percentage_ppm) {
        Some(product) => product / ppm_scale,
        None => {
            // Divide-first path: split amount into whole "percentage points"
            // of the scale and a remainder, so each multiplication stays
            // within u128 range. Equivalent to (amount / scale) * pct
            //   + (amount % scale) * pct / scale, computed without ever
            // forming `amount * pct` directly.
            let whole = amount / ppm_scale;
            let rem = amount % ppm_scale;
            let from_whole = whole.saturating_mul(percentage_ppm);
            let from_rem = (rem * percentage_ppm) / ppm_scale;
            from_whole.saturating_add(from_rem)
        }
    }
    .min(amount)
}

/// Accumulated result of one beneficiary's asset transfer pass.
pub struct AssetTransferOutcome {
    pub transferred: Vec<TransferredAsset>,
    /// Per-denom/holding failures, logged by the caller and omitted from the
    /// receipt — they do not abort the claim.
    pub skipped_count: u32,
}

/// Runs the full asset handler for one beneficiary claim: specific
/// allocations first, then the percentage step against what remains,
/// across fungible, equity, staking, lending, and escrow.
pub fn transfer_assets_for_claim(
    ext: &ExternalModules,
    owner: &Address,
    beneficiary: &Address,
    percentage_ppm: u64,
    specific_assets: &[SpecificAsset],
    now: BlockTime,
) -> AssetTransferOutcome {
    let mut transferred = Vec::new();
    let mut skipped = 0u32;

    // ── Specific assets, in declaration order, before the percentage step ──
    for asset in specific_assets {
        match asset {
            SpecificAsset::Fungible { denom, amount } => {
                match ext.ledger.send_coins(owner, beneficiary, denom, *amount) {
                    Ok(()) => transferred.push(TransferredAsset::Fungible {
                        denom: denom.clone(),
                        amount: *amount,
                        transferred_at: now,
                    }),
                    Err(e) => {
                        warn!(%denom, amount, error = %e, "specific fungible allocation failed, skipping");
                        skipped += 1;
                    }
                }
            }
            SpecificAsset::Equity { company_id, class_id, shares } => {
                match ext.equity.transfer_shares(*company_id, *class_id, owner, beneficiary, *shares) {
                    Ok(()) => transferred.push(TransferredAsset::Equity {
                        company_id: *company_id,
                        class_id: *class_id,
                        shares: *shares,
                        transferred_at: now,
                    }),
                    Err(e) => {
                        warn!(company_id, class_id, error = %e, "specific equity allocation failed, skipping");
                        skipped += 1;
                    }
                }
            }
        }
    }

    // ── Fungible balances, percentage step ──────────────────────────────
    match ext.ledger.get_all_balances(owner) {
        Ok(coins) => {
            for coin in coins {
                let amount = floor_percentage(coin.amount, percentage_ppm);
                if amount == 0 {
                    continue; // dust/zero amounts are skipped
                }
                match ext.ledger.send_coins(owner, beneficiary, &coin.denom, amount) {
                    Ok(()) => transferred.push(TransferredAsset::Fungible {
                        denom: coin.denom,
                        amount,
                        transferred_at: now,
                    }),
                    Err(e) => {
                        warn!(denom = %coin.denom, error = %e, "fungible transfer failed, skipping");
                        skipped += 1;
                    }
                }
            }
        }
        Err(e) => {
            warn!(error = %e, "failed to list owner balances");
            skipped += 1;
        }
    }

    // ── Equity shares, percentage step ──────────────────────────────────
    match ext.equity.get_all_holdings_by_address(owner) {
        Ok(holdings) => {
            for h in holdings {
                let shares = floor_percentage(h.shares, percentage_ppm);
                if shares == 0 {
                    continue;
                }
                match ext.equity.transfer_shares(h.company_id, h.class_id, owner, beneficiary, shares) {
                    Ok(()) => transferred.push(TransferredAsset::Equity {
                        company_id: h.company_id,
                        class_id: h.class_id,
                        shares,
                        transferred_at: now,
                    }),
                    Err(e) => {
                        warn!(company_id = h.company_id, error = %e, "equity transfer failed, skipping");
                        skipped += 1;
                    }
                }
            }
        }
        Err(e) => {
            warn!(error = %e, "failed to list owner equity holdings");
            skipped += 1;
        }
    }

    // ── Staked stake, percentage step ────────────────────────────────────
    match ext.staking.get_user_stake(owner) {
        Ok(stake) => {
            let amount = floor_percentage(stake, percentage_ppm);
            if amount > 0 {
                match ext.staking.unstake_for_inheritance(owner, beneficiary, amount) {
                    Ok(()) => transferred.push(TransferredAsset::Staked { amount, transferred_at: now }),
                    Err(e) => {
                        warn!(error = %e, "stake transfer failed, skipping");
                        skipped += 1;
                    }
                }
            }
        }
        Err(e) => {
            warn!(error = %e, "failed to read owner stake");
            skipped += 1;
        }
    }

    // ── Loan positions, full transfer (not percentage) ───────────────────
    match ext.lending.get_user_loans(owner) {
        Ok(loans) => {
            for loan in loans {
                if !matches!(loan.status, LoanStatus::Pending | LoanStatus::Active) {
                    continue;
                }
                if ext.ban_registry.is_address_banned(beneficiary) {
                    warn!(loan_id = loan.loan_id, "beneficiary banned, skipping loan transfer");
                    skipped += 1;
                    continue;
                }
                let result = if loan.borrower == *owner {
                    ext.lending.transfer_borrower_position(loan.loan_id, owner, beneficiary)
                } else {
                    ext.lending.transfer_lender_position(loan.loan_id, owner, beneficiary)
                };
                match result {
                    Ok(()) => transferred.push(TransferredAsset::LoanPosition {
                        loan_id: loan.loan_id,
                        transferred_at: now,
                    }),
                    Err(e) => {
                        warn!(loan_id = loan.loan_id, error = %e, "loan position transfer failed, skipping");
                        skipped += 1;
                    }
                }
            }
        }
        Err(e) => {
            warn!(error = %e, "failed to list owner loans");
            skipped += 1;
        }
    }

    // ── Escrow positions, full transfer ──────────────────────────────────
    match ext.escrow.get_all_escrows() {
        Ok(escrows) => {
            for escrow in escrows {
                let owner_is_party = escrow.sender == *owner || escrow.recipient == *owner;
                if !owner_is_party || escrow.status == EscrowStatus::Disputed {
                    continue;
                }
                if !matches!(escrow.status, EscrowStatus::Active | EscrowStatus::Funded) {
                    continue;
                }
                if ext.ban_registry.is_address_banned(beneficiary) {
                    warn!(escrow_id = escrow.escrow_id, "beneficiary banned, skipping escrow transfer");
                    skipped += 1;
                    continue;
                }
                let result = if escrow.sender == *owner {
                    ext.escrow.transfer_buyer_position(escrow.escrow_id, owner, beneficiary)
                } else {
                    ext.escrow.transfer_seller_position(escrow.escrow_id, owner, beneficiary)
                };
                match result {
                    Ok(()) => transferred.push(TransferredAsset::EscrowPosition {
                        escrow_id: escrow.escrow_id,
                        transferred_at: now,
                    }),
                    Err(e) => {
                        warn!(escrow_id = escrow.escrow_id, error = %e, "escrow position transfer failed, skipping");
                        skipped += 1;
                    }
                }
            }
        }
        Err(e) => {
            warn!(error = %e, "failed to list escrows");
            skipped += 1;
        }
    }

    AssetTransferOutcome { transferred, skipped_count: skipped }
}

/// Transfers all remaining fungible balances of `owner` to `charity`.
/// Per-kind partial failures are logged, not propagated.
pub fn transfer_all_to_charity(ext: &ExternalModules, owner: &Address, charity: &Address) {
    match ext.ledger.get_all_balances(owner) {
        Ok(coins) => {
            for coin in coins {
                if coin.amount == 0 {
                    continue;
                }
                if let Err(e) = ext.ledger.send_coins(owner, charity, &coin.denom, coin.amount) {
                    warn!(denom = %coin.denom, error = %e, "charity fallback transfer failed");
                }
            }
        }
        Err(e) => warn!(error = %e, "failed to list owner balances for charity fallback"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_percentage_basic() {
        assert_eq!(floor_percentage(1_000_000, 600_000), 600_000);
        assert_eq!(floor_percentage(1_000_000, 400_000), 400_000);
    }

    #[test]
    fn floor_percentage_truncates() {
        // 7 * 0.333333 = 2.333331 -> floor 2
        assert_eq!(floor_percentage(7, 333_333), 2);
    }

    #[test]
    fn floor_percentage_handles_overflow_prone_balances() {
        // amount * PPM_SCALE alone already exceeds u128::MAX (~3.4e38) here,
        // forcing the divide-first fallback path; still no panic or truncation.
        let amount: u128 = 1_000_000_000_000_000_000_000_000_000_000_000_000; // 1e36
        let result = floor_percentage(amount, 500_000); // 50%
        assert_eq!(result, 500_000_000_000_000_000_000_000_000_000_000_000); // 5e35
    }

    #[test]
    fn floor_percentage_never_exceeds_amount() {
        assert!(floor_percentage(3, 999_999) <= 3);
        assert_eq!(floor_percentage(0, 1_000_000), 0);
    }
}
