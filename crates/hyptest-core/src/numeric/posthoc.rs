//! Post-hoc comparisons
//!
//! When an omnibus test is significant, the conditions are compared
//! pairwise and the p-values adjusted to control the family-wise error rate.

use super::parametric::paired_t;
use crate::{StatsError, StatsResult};
use anofox_tests::{p_adjust, PAdjustMethod};

/// One pairwise comparison between variables `first` and `second`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairwiseComparison {
    pub first: usize,
    pub second: usize,
    pub statistic: f64,
    pub p_value: f64,
    /// Holm-Bonferroni adjusted p-value
    pub p_adjusted: f64,
}

/// Holm-Bonferroni step-down adjustment, in the input order
pub fn holm(p_values: &[f64]) -> StatsResult<Vec<f64>> {
    if let Some((i, p)) = p_values
        .iter()
        .enumerate()
        .find(|(_, p)| !(0.0..=1.0).contains(*p))
    {
        return Err(StatsError::InvalidInput(format!(
            "p-value at index {} is out of range [0, 1]: {}",
            i, p
        )));
    }
    Ok(p_adjust(p_values, PAdjustMethod::Holm))
}

/// Paired t-tests for every pair of columns, Holm-Bonferroni adjusted
///
/// Comparisons are listed in index order: (0, 1), (0, 2), ..., (1, 2), ...
pub fn pairwise_paired_t_holm(columns: &[Vec<f64>]) -> StatsResult<Vec<PairwiseComparison>> {
    let k = columns.len();
    let mut comparisons = Vec::with_capacity(k * k.saturating_sub(1) / 2);
    for first in 0..k {
        for second in (first + 1)..k {
            let t = paired_t(&columns[first], &columns[second])?;
            comparisons.push(PairwiseComparison {
                first,
                second,
                statistic: t.statistic,
                p_value: t.p_value,
                p_adjusted: f64::NAN,
            });
        }
    }

    let raw: Vec<f64> = comparisons.iter().map(|c| c.p_value).collect();
    for (comparison, adjusted) in comparisons.iter_mut().zip(holm(&raw)?) {
        comparison.p_adjusted = adjusted;
    }
    Ok(comparisons)
}
