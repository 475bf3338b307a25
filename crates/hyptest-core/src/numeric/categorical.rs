//! Categorical tests on paired binary variables
//!
//! - McNemar's test (chi-square with continuity correction)
//! - Cochran's Q test

use super::{chi2_sf, convert_backend_error, TestStatistic};
use crate::{StatsError, StatsResult};
use anofox_tests::mcnemar_test as lib_mcnemar_test;

/// Distinct values across all samples, sorted; at most two are allowed
fn binary_levels<'a, I>(samples: I, test: &str) -> StatsResult<Vec<f64>>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut levels: Vec<f64> = samples.into_iter().flatten().copied().collect();
    levels.sort_by(f64::total_cmp);
    levels.dedup();
    if levels.len() > 2 {
        return Err(StatsError::InvalidInput(format!(
            "{} requires dichotomous variables, found {} distinct values",
            test,
            levels.len()
        )));
    }
    Ok(levels)
}

/// McNemar's test on two complete, paired binary variables
///
/// The pairs are cross-tabulated with the lower value first. Only the
/// discordant cells count: `chi2 = (|b - c| - 1)^2 / (b + c)` with df 1.
pub fn mcnemar(x: &[f64], y: &[f64]) -> StatsResult<TestStatistic> {
    if x.len() != y.len() {
        return Err(StatsError::InvalidInput(
            "McNemar test requires equal length samples".into(),
        ));
    }
    let levels = binary_levels([x, y], "McNemar test")?;
    let low = levels.first().copied().unwrap_or(f64::NAN);

    // rows: x low / high, columns: y low / high
    let mut table = [[0usize; 2]; 2];
    for (a, d) in x.iter().zip(y) {
        table[usize::from(*a != low)][usize::from(*d != low)] += 1;
    }
    if table[0][1] + table[1][0] == 0 {
        return Err(StatsError::InsufficientDataMsg(
            "McNemar test requires at least one discordant pair".into(),
        ));
    }

    let result = lib_mcnemar_test(&table, true).map_err(convert_backend_error)?;
    Ok(TestStatistic {
        statistic: result.statistic,
        p_value: result.p_value,
        df: Some(result.df),
    })
}

/// Cochran's Q test on k complete binary variables (one column each)
///
/// The larger of the two observed values counts as success.
pub fn cochran_q(columns: &[Vec<f64>]) -> StatsResult<TestStatistic> {
    let k = columns.len();
    if k < 2 {
        return Err(StatsError::InsufficientDataMsg(
            "Cochran's Q test requires at least 2 variables".into(),
        ));
    }
    let n = columns[0].len();
    if columns.iter().any(|c| c.len() != n) {
        return Err(StatsError::InvalidInput(
            "Cochran's Q test requires equal length samples".into(),
        ));
    }
    let levels = binary_levels(columns.iter().map(Vec::as_slice), "Cochran's Q test")?;
    let success = levels.last().copied().unwrap_or(f64::NAN);

    let column_totals: Vec<f64> = columns
        .iter()
        .map(|c| c.iter().filter(|v| **v == success).count() as f64)
        .collect();
    let row_totals: Vec<f64> = (0..n)
        .map(|row| columns.iter().filter(|c| c[row] == success).count() as f64)
        .collect();

    let kf = k as f64;
    let grand: f64 = column_totals.iter().sum();
    let numerator = (kf - 1.0) * (kf * column_totals.iter().map(|c| c * c).sum::<f64>() - grand * grand);
    let denominator = kf * grand - row_totals.iter().map(|r| r * r).sum::<f64>();
    if denominator <= 0.0 {
        return Err(StatsError::Provider(
            "Cochran's Q test is undefined when every case responds identically".into(),
        ));
    }
    let statistic = numerator / denominator;
    let df = kf - 1.0;

    Ok(TestStatistic {
        statistic,
        p_value: chi2_sf(statistic, df)?,
        df: Some(df),
    })
}
