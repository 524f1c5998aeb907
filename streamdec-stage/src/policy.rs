use crate::error::StageError;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// How the target rate is derived from a stream's source rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSelection {
    /// Smallest allowed rate strictly above the source rate.
    #[default]
    NextAbove,
    /// Smallest allowed rate at or above the source rate, the highest allowed rate for
    /// sources faster than all of them.
    AtLeast,
}

/// Chooses the rate a stream is converted to, once, from its first source rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRatePolicy {
    allowed: Vec<u32>,
    selection: RateSelection,
}

impl TargetRatePolicy {
    pub fn new(allowed: Vec<u32>, selection: RateSelection) -> Result<Self, StageError> {
        if allowed.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(StageError::UnsortedRates(allowed));
        }
        Ok(Self { allowed, selection })
    }

    pub fn allowed(&self) -> &[u32] {
        &self.allowed
    }

    pub fn selection(&self) -> RateSelection {
        self.selection
    }

    #[instrument(level = "trace", skip(self), ret)]
    pub fn select(&self, source_rate: u32) -> Option<u32> {
        match self.selection {
            RateSelection::NextAbove => self.allowed.iter().copied().find(|&rate| rate > source_rate),
            RateSelection::AtLeast => self
                .allowed
                .iter()
                .copied()
                .find(|&rate| rate >= source_rate)
                .or_else(|| self.allowed.last().copied()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_log::test;

    const RATES: [u32; 3] = [22_050, 44_100, 48_000];

    #[test]
    fn unsorted_rates_are_rejected() {
        assert!(matches!(
            TargetRatePolicy::new(vec![48_000, 44_100], RateSelection::NextAbove),
            Err(StageError::UnsortedRates(rates)) if rates == vec![48_000, 44_100]
        ));
        assert!(matches!(
            TargetRatePolicy::new(vec![44_100, 44_100], RateSelection::AtLeast),
            Err(StageError::UnsortedRates(_))
        ));
    }

    #[test]
    fn next_above_is_strictly_greater() {
        let policy = TargetRatePolicy::new(RATES.to_vec(), RateSelection::NextAbove).unwrap();
        assert_eq!(policy.select(8_000), Some(22_050));
        assert_eq!(policy.select(22_050), Some(44_100));
        assert_eq!(policy.select(44_100), Some(48_000));
        assert_eq!(policy.select(48_000), None);
        assert_eq!(policy.select(96_000), None);
    }

    #[test]
    fn at_least_keeps_matching_rate_and_falls_back_to_highest() {
        let policy = TargetRatePolicy::new(RATES.to_vec(), RateSelection::AtLeast).unwrap();
        assert_eq!(policy.select(8_000), Some(22_050));
        assert_eq!(policy.select(44_100), Some(44_100));
        assert_eq!(policy.select(44_101), Some(48_000));
        assert_eq!(policy.select(96_000), Some(48_000));
    }

    #[test]
    fn empty_list_never_selects() {
        for selection in [RateSelection::NextAbove, RateSelection::AtLeast] {
            let policy = TargetRatePolicy::new(Vec::new(), selection).unwrap();
            assert_eq!(policy.select(44_100), None);
        }
    }
}
