//! Stakeholder list and proportional payout of minted coins.

use crate::{
    coin::{Address, Coin},
    ParamsError,
};
use primitive_types::U256;
use std::collections::{BTreeMap, BTreeSet};

/// Scale for stakeholder percentages. 100_000_000 represents 100%.
pub const STAKEHOLDER_SCALE: u64 = 100_000_000;

/// An address entitled to a fixed share of every block provision.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StakeHolder {
    pub address: Address,

    /// Share in parts of [`STAKEHOLDER_SCALE`].
    pub percentage: u64,
}

impl StakeHolder {
    pub fn new(address: impl Into<Address>, percentage: u64) -> Self {
        Self {
            address: address.into(),
            percentage,
        }
    }
}

/// Ordered stakeholder list.
///
/// Valid when empty, or when the percentages sum to exactly
/// [`STAKEHOLDER_SCALE`] with no empty, repeated or zero-share entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StakeholderParams {
    #[cfg_attr(feature = "serde", serde(default))]
    pub stakeholders: Vec<StakeHolder>,
}

impl StakeholderParams {
    pub fn new(stakeholders: Vec<StakeHolder>) -> Self {
        Self { stakeholders }
    }

    pub fn is_empty(&self) -> bool {
        self.stakeholders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StakeHolder> + '_ {
        self.stakeholders.iter()
    }

    /// Sum of all percentages. Cannot overflow.
    pub fn total_percentage(&self) -> u128 {
        self.stakeholders
            .iter()
            .map(|s| s.percentage as u128)
            .sum()
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.stakeholders.is_empty() {
            return Ok(());
        }

        let mut seen = BTreeSet::new();
        for holder in &self.stakeholders {
            if !holder.address.is_valid() {
                return Err(ParamsError::EmptyStakeholderAddress);
            }
            if !seen.insert(&holder.address) {
                return Err(ParamsError::DuplicateStakeholder(holder.address.clone()));
            }
        }

        let total = self.total_percentage();
        if total != STAKEHOLDER_SCALE as u128 {
            return Err(ParamsError::StakeholderSum { total });
        }
        Ok(())
    }
}

/// One entry of a payout plan.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PayoutPair {
    pub address: Address,
    pub coin: Coin,
}

/// `⌊total_amount × percentage / STAKEHOLDER_SCALE⌋`.
pub fn payout_share(total_amount: u128, percentage: u64) -> u128 {
    let share = U256::from(total_amount) * U256::from(percentage) / U256::from(STAKEHOLDER_SCALE);
    // share <= total_amount whenever percentage <= scale; larger inputs are
    // rejected by validation, so saturate rather than wrap.
    if share > U256::from(u128::MAX) {
        u128::MAX
    } else {
        share.as_u128()
    }
}

/// Split `total` across the stakeholders.
///
/// Each amount is truncated; remainders are not redistributed. Zero amounts
/// are left out of the plan.
pub fn calculate_payouts(total: &Coin, params: &StakeholderParams) -> BTreeMap<Address, Coin> {
    let mut plan: BTreeMap<Address, Coin> = BTreeMap::new();

    for holder in params.iter() {
        let amount = payout_share(total.amount, holder.percentage);
        if amount == 0 {
            continue;
        }
        plan.entry(holder.address.clone())
            .and_modify(|coin| coin.amount = coin.amount.saturating_add(amount))
            .or_insert_with(|| Coin::new(total.denom.clone(), amount));
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uneven_split() -> StakeholderParams {
        StakeholderParams::new(vec![
            StakeHolder::new("addr1", 50_000_000),
            StakeHolder::new("addr2", 49_000_000),
            StakeHolder::new("addr3", 500_001),
            StakeHolder::new("addr4", 499_999),
        ])
    }

    #[test]
    fn test_exact_split_across_uneven_shares() {
        let params = uneven_split();
        assert!(params.validate().is_ok());

        let plan = calculate_payouts(&Coin::new("umrd", 100_000_000), &params);
        let amounts: Vec<(&str, u128)> = plan
            .iter()
            .map(|(addr, coin)| (addr.as_str(), coin.amount))
            .collect();
        assert_eq!(
            amounts,
            vec![
                ("addr1", 50_000_000),
                ("addr2", 49_000_000),
                ("addr3", 500_001),
                ("addr4", 499_999),
            ]
        );
        assert!(plan.values().all(|c| c.denom == "umrd"));
    }

    #[test]
    fn test_truncation_remainder_is_kept_back() {
        let params = uneven_split();
        let plan = calculate_payouts(&Coin::new("umrd", 999), &params);
        let paid: u128 = plan.values().map(|c| c.amount).sum();

        // 499 + 489 + 4 + 4
        assert_eq!(paid, 996);
        assert_eq!(plan[&Address::from("addr3")].amount, 4);
    }

    #[test]
    fn test_empty_params_empty_plan() {
        let plan = calculate_payouts(&Coin::new("umrd", 12_345), &StakeholderParams::default());
        assert!(plan.is_empty());
    }

    #[test]
    fn test_zero_amounts_are_omitted() {
        let params = StakeholderParams::new(vec![
            StakeHolder::new("big", 99_999_999),
            StakeHolder::new("tiny", 1),
        ]);
        let plan = calculate_payouts(&Coin::new("umrd", 10), &params);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[&Address::from("big")].amount, 9);
    }

    #[test]
    fn test_validation_rules() {
        assert!(StakeholderParams::default().validate().is_ok());

        let short = StakeholderParams::new(vec![StakeHolder::new("a", 99_999_999)]);
        assert_eq!(
            short.validate(),
            Err(ParamsError::StakeholderSum { total: 99_999_999 })
        );

        let long = StakeholderParams::new(vec![
            StakeHolder::new("a", STAKEHOLDER_SCALE),
            StakeHolder::new("b", 1),
        ]);
        assert!(matches!(
            long.validate(),
            Err(ParamsError::StakeholderSum { .. })
        ));

        let duplicate = StakeholderParams::new(vec![
            StakeHolder::new("a", 50_000_000),
            StakeHolder::new("a", 50_000_000),
        ]);
        assert_eq!(
            duplicate.validate(),
            Err(ParamsError::DuplicateStakeholder(Address::from("a")))
        );

        // A zero share is listed but never paid.
        let zero = StakeholderParams::new(vec![
            StakeHolder::new("a", STAKEHOLDER_SCALE),
            StakeHolder::new("b", 0),
        ]);
        assert!(zero.validate().is_ok());
        let plan = calculate_payouts(&Coin::new("umrd", 1_000), &zero);
        assert_eq!(plan.len(), 1);
        assert!(!plan.contains_key(&Address::from("b")));

        let blank = StakeholderParams::new(vec![StakeHolder::new("", STAKEHOLDER_SCALE)]);
        assert_eq!(blank.validate(), Err(ParamsError::EmptyStakeholderAddress));
    }

    #[test]
    fn test_payout_share_handles_wide_products() {
        assert_eq!(payout_share(u128::MAX, STAKEHOLDER_SCALE), u128::MAX);
        assert_eq!(payout_share(u128::MAX, 50_000_000), u128::MAX / 2);
    }
}
