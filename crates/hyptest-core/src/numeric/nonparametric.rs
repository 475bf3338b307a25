//! Nonparametric statistical tests
//!
//! - Wilcoxon signed-rank test
//! - Mann-Whitney U test (two-sided, and the one-sided normal approximation)
//! - Kruskal-Wallis H test
//! - Dunn's pairwise test
//! - Friedman test

use super::{chi2_sf, convert_backend_error, tie_term, TestStatistic};
use crate::{StatsError, StatsResult};
use anofox_tests::{
    dunn_test, kruskal_wallis as lib_kruskal_wallis, mann_whitney_u as lib_mann_whitney_u, rank,
    wilcoxon_signed_rank as lib_wilcoxon_signed_rank, Alternative, PAdjustMethod,
};

/// Largest sample for which the signed-rank test uses the exact distribution
const WILCOXON_EXACT_MAX: usize = 50;

/// Mann-Whitney uses the exact distribution when the smaller group is at most this size
const MANN_WHITNEY_EXACT_MAX: usize = 8;

/// Wilcoxon signed-rank test on paired, complete samples
///
/// Zero differences are dropped. The statistic is `T = min(W+, W-)`. The
/// p-value is exact for up to 50 pairs without tied absolute differences,
/// otherwise it comes from the tie-corrected normal approximation.
pub fn wilcoxon_signed_rank(x: &[f64], y: &[f64]) -> StatsResult<TestStatistic> {
    if x.len() != y.len() {
        return Err(StatsError::InvalidInput(
            "Wilcoxon signed-rank test requires equal length samples".into(),
        ));
    }
    let n = x.iter().zip(y).filter(|(a, b)| a != b).count();
    if n == 0 {
        return Err(StatsError::InsufficientDataMsg(
            "Wilcoxon signed-rank test requires at least 1 non-zero difference".into(),
        ));
    }

    let result = lib_wilcoxon_signed_rank(
        x,
        y,
        Alternative::TwoSided,
        false,
        n <= WILCOXON_EXACT_MAX,
        None,
        None,
    )
    .map_err(convert_backend_error)?;
    let total = (n * (n + 1)) as f64 / 2.0;

    Ok(TestStatistic {
        statistic: result.statistic.min(total - result.statistic),
        p_value: result.p_value,
        df: None,
    })
}

fn check_mann_whitney_input(x: &[f64], y: &[f64]) -> StatsResult<()> {
    if x.is_empty() || y.is_empty() {
        return Err(StatsError::InsufficientDataMsg(
            "Mann-Whitney U test requires at least 1 observation per group".into(),
        ));
    }
    // the rank variance vanishes when every value is the same
    if x.iter().chain(y).all(|v| *v == x[0]) {
        return Err(StatsError::Provider(
            "All numbers are identical in Mann-Whitney U test".into(),
        ));
    }
    Ok(())
}

/// Two-sided Mann-Whitney U test
///
/// Reports U of the first sample. Without ties, and when either group has
/// at most 8 values, the p-value comes from the exact null distribution;
/// otherwise from the normal approximation with tie and continuity
/// correction.
pub fn mann_whitney_u(x: &[f64], y: &[f64]) -> StatsResult<TestStatistic> {
    check_mann_whitney_input(x, y)?;
    let exact = x.len().min(y.len()) <= MANN_WHITNEY_EXACT_MAX;
    let result = lib_mann_whitney_u(x, y, Alternative::TwoSided, true, exact, None, None)
        .map_err(convert_backend_error)?;

    Ok(TestStatistic {
        statistic: result.statistic,
        p_value: result.p_value,
        df: None,
    })
}

/// One-sided Mann-Whitney U normal approximation
///
/// Returns `min(U1, U2)` and the one-sided p-value with continuity
/// correction, taken in the direction the data lean. Callers wanting a
/// two-sided answer double the p-value.
pub fn mann_whitney_u_one_sided(x: &[f64], y: &[f64]) -> StatsResult<TestStatistic> {
    check_mann_whitney_input(x, y)?;
    let one_sided = |alternative| {
        lib_mann_whitney_u(x, y, alternative, true, false, None, None).map_err(convert_backend_error)
    };
    let less = one_sided(Alternative::Less)?;
    let greater = one_sided(Alternative::Greater)?;
    let pairs = (x.len() * y.len()) as f64;

    Ok(TestStatistic {
        statistic: less.statistic.min(pairs - less.statistic),
        p_value: less.p_value.min(greater.p_value),
        df: None,
    })
}

fn check_groups(groups: &[Vec<f64>], test: &str) -> StatsResult<()> {
    if groups.len() < 2 {
        return Err(StatsError::InsufficientDataMsg(format!(
            "{} requires at least 2 groups",
            test
        )));
    }
    if let Some(i) = groups.iter().position(|g| g.is_empty()) {
        return Err(StatsError::InsufficientDataMsg(format!(
            "{} requires at least 1 observation per group (group {} is empty)",
            test, i
        )));
    }
    Ok(())
}

/// Kruskal-Wallis H test with tie correction, df = groups - 1
pub fn kruskal_wallis(groups: &[Vec<f64>]) -> StatsResult<TestStatistic> {
    check_groups(groups, "Kruskal-Wallis test")?;

    let slices: Vec<&[f64]> = groups.iter().map(Vec::as_slice).collect();
    let result = lib_kruskal_wallis(&slices).map_err(convert_backend_error)?;
    if !result.statistic.is_finite() {
        return Err(StatsError::Provider(
            "All numbers are identical in Kruskal-Wallis test".into(),
        ));
    }

    Ok(TestStatistic {
        statistic: result.statistic,
        p_value: result.p_value,
        df: Some(result.df),
    })
}

/// Dunn's test: unadjusted two-sided p-values for every pair of groups
///
/// Mean ranks come from the pooled ranking; the variance carries the usual
/// tie correction. The returned matrix is symmetric with a unit diagonal.
pub fn dunn(groups: &[Vec<f64>]) -> StatsResult<Vec<Vec<f64>>> {
    check_groups(groups, "Dunn's test")?;

    let values: Vec<f64> = groups.iter().flatten().copied().collect();
    let labels: Vec<usize> = groups
        .iter()
        .enumerate()
        .flat_map(|(i, g)| std::iter::repeat(i).take(g.len()))
        .collect();
    let result = dunn_test(&values, &labels, PAdjustMethod::None).map_err(convert_backend_error)?;

    let k = groups.len();
    let mut p_values = vec![vec![1.0; k]; k];
    for c in &result.comparisons {
        p_values[c.group1][c.group2] = c.p_value;
        p_values[c.group2][c.group1] = c.p_value;
    }
    Ok(p_values)
}

/// Friedman test on complete repeated measures (one column per condition)
pub fn friedman(columns: &[Vec<f64>]) -> StatsResult<TestStatistic> {
    let k = columns.len();
    if k < 2 {
        return Err(StatsError::InsufficientDataMsg(
            "Friedman test requires at least 2 variables".into(),
        ));
    }
    let n = columns[0].len();
    if columns.iter().any(|c| c.len() != n) {
        return Err(StatsError::InvalidInput(
            "Friedman test requires equal length samples".into(),
        ));
    }
    if n == 0 {
        return Err(StatsError::NoValidData);
    }

    let mut rank_sums = vec![0.0; k];
    let mut ties = 0.0;
    for row in 0..n {
        let values: Vec<f64> = columns.iter().map(|c| c[row]).collect();
        let ranks = rank(&values).map_err(convert_backend_error)?;
        for (sum, r) in rank_sums.iter_mut().zip(ranks) {
            *sum += r;
        }
        ties += tie_term(&values);
    }

    let (nf, kf) = (n as f64, k as f64);
    let correction = 1.0 - ties / (nf * kf * (kf * kf - 1.0));
    if correction <= 0.0 {
        return Err(StatsError::Provider(
            "Friedman test is undefined when every row is fully tied".into(),
        ));
    }
    let ss: f64 = rank_sums.iter().map(|r| r * r).sum();
    let statistic = (12.0 / (nf * kf * (kf + 1.0)) * ss - 3.0 * nf * (kf + 1.0)) / correction;
    let df = kf - 1.0;

    Ok(TestStatistic {
        statistic,
        p_value: chi2_sf(statistic, df)?,
        df: Some(df),
    })
}
