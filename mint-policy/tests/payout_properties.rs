//! Property tests for the payout calculator.

use mrd_mint_policy::{calculate_payouts, Coin, StakeHolder, StakeholderParams, STAKEHOLDER_SCALE};
use proptest::prelude::*;

/// Up to eight stakeholders whose percentages sum to exactly the scale.
fn full_params() -> impl Strategy<Value = StakeholderParams> {
    prop::collection::vec(1u64..STAKEHOLDER_SCALE, 0..8).prop_map(|mut cuts| {
        cuts.sort_unstable();
        cuts.dedup();

        let mut bounds = vec![0];
        bounds.extend(cuts);
        bounds.push(STAKEHOLDER_SCALE);

        let holders = bounds
            .windows(2)
            .enumerate()
            .map(|(i, w)| StakeHolder::new(format!("holder{i}"), w[1] - w[0]))
            .collect();
        StakeholderParams::new(holders)
    })
}

proptest! {
    #[test]
    fn payouts_never_exceed_total(params in full_params(), total in any::<u64>()) {
        prop_assert!(params.validate().is_ok());

        let total = total as u128;
        let plan = calculate_payouts(&Coin::new("umrd", total), &params);
        let paid: u128 = plan.values().map(|c| c.amount).sum();

        prop_assert!(paid <= total);
        prop_assert!(plan.values().all(|c| c.amount <= total && c.amount > 0));

        let divisible = params
            .iter()
            .all(|s| (s.percentage as u128 * total) % STAKEHOLDER_SCALE as u128 == 0);
        if divisible {
            prop_assert_eq!(paid, total);
        }
    }

    #[test]
    fn scale_total_pays_percentages(params in full_params()) {
        let plan = calculate_payouts(&Coin::new("umrd", STAKEHOLDER_SCALE as u128), &params);
        for holder in params.iter() {
            prop_assert_eq!(plan[&holder.address].amount, holder.percentage as u128);
        }
    }

    #[test]
    fn multiples_of_scale_are_paid_in_full(params in full_params(), factor in 0u64..1_000_000) {
        let total = STAKEHOLDER_SCALE as u128 * factor as u128;
        let plan = calculate_payouts(&Coin::new("umrd", total), &params);
        let paid: u128 = plan.values().map(|c| c.amount).sum();
        prop_assert_eq!(paid, total);
    }
}
