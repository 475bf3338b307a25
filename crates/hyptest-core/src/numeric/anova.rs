//! Analysis of variance
//!
//! - One-way repeated measures ANOVA with Mauchly's sphericity test and the
//!   Greenhouse-Geisser epsilon
//! - Multi-way repeated measures ANOVA on long-form data
//! - Between-subjects factorial ANOVA (Type III, sum-to-zero coding)

use super::linalg::{
    congruence, covariance, determinant, helmert_contrasts, residual_sum_of_squares, square, trace,
};
use super::{chi2_sf, f_sf};
use crate::{StatsError, StatsResult};
use faer::Mat;
use std::collections::HashMap;

/// Relative size below which the covariance of difference scores counts as zero
const SPHERICITY_TOL: f64 = 1e-10;

/// One-way repeated measures ANOVA together with its sphericity diagnostics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RmAnova {
    pub statistic: f64,
    pub df_num: f64,
    pub df_den: f64,
    /// Uncorrected p-value
    pub p_value: f64,
    /// Mauchly's W
    pub mauchly_w: f64,
    pub mauchly_p: f64,
    /// Greenhouse-Geisser epsilon
    pub gg_epsilon: f64,
}

impl RmAnova {
    /// p-value with both df scaled by the Greenhouse-Geisser epsilon
    pub fn p_greenhouse_geisser(&self) -> StatsResult<f64> {
        f_sf(
            self.statistic,
            self.df_num * self.gg_epsilon,
            self.df_den * self.gg_epsilon,
        )
    }
}

/// One row of an ANOVA table
#[derive(Debug, Clone, PartialEq)]
pub struct AnovaTerm {
    /// Indices of the factors in this term (one for a main effect)
    pub factors: Vec<usize>,
    pub df_num: f64,
    pub df_den: f64,
    pub statistic: f64,
    pub p_value: f64,
}

/// One observation of a within-subject design in long form
#[derive(Debug, Clone, PartialEq)]
pub struct LongRow {
    pub subject: usize,
    /// Level index per factor
    pub levels: Vec<usize>,
    pub value: f64,
}

/// Long-form repeated measures data
#[derive(Debug, Clone, PartialEq)]
pub struct LongTable {
    /// Level count per factor
    pub levels: Vec<usize>,
    pub rows: Vec<LongRow>,
}

/// One-way repeated measures ANOVA on complete columns (one per condition)
pub fn repeated_measures_oneway(columns: &[Vec<f64>]) -> StatsResult<RmAnova> {
    let k = columns.len();
    if k < 2 {
        return Err(StatsError::InsufficientDataMsg(
            "Repeated measures ANOVA requires at least 2 conditions".into(),
        ));
    }
    let n = columns[0].len();
    if columns.iter().any(|c| c.len() != n) {
        return Err(StatsError::InvalidInput(
            "Repeated measures ANOVA requires equal length samples".into(),
        ));
    }
    if n < 2 {
        return Err(StatsError::InsufficientDataMsg(
            "Repeated measures ANOVA requires at least 2 complete cases".into(),
        ));
    }

    let (nf, kf) = (n as f64, k as f64);
    let grand_mean = columns.iter().flatten().sum::<f64>() / (nf * kf);
    let ss_total: f64 = columns.iter().flatten().map(|v| (v - grand_mean).powi(2)).sum();
    let ss_conditions: f64 = columns
        .iter()
        .map(|c| nf * (c.iter().sum::<f64>() / nf - grand_mean).powi(2))
        .sum();
    let ss_subjects: f64 = (0..n)
        .map(|row| {
            let subject_mean = columns.iter().map(|c| c[row]).sum::<f64>() / kf;
            kf * (subject_mean - grand_mean).powi(2)
        })
        .sum();
    let ss_error = (ss_total - ss_conditions - ss_subjects).max(0.0);

    let df_num = kf - 1.0;
    let df_den = (kf - 1.0) * (nf - 1.0);
    let statistic = (ss_conditions / df_num) / (ss_error / df_den);
    let p_value = f_sf(statistic, df_num, df_den)?;

    let (mauchly_w, mauchly_p, gg_epsilon) = sphericity(columns)?;

    Ok(RmAnova {
        statistic,
        df_num,
        df_den,
        p_value,
        mauchly_w,
        mauchly_p,
        gg_epsilon,
    })
}

/// Mauchly's W, its chi-square p-value, and the Greenhouse-Geisser epsilon
fn sphericity(columns: &[Vec<f64>]) -> StatsResult<(f64, f64, f64)> {
    let k = columns.len();
    if k == 2 {
        // one difference score: sphericity holds by construction
        return Ok((1.0, 1.0, 1.0));
    }

    let n = columns[0].len() as f64;
    let p = (k - 1) as f64;
    let s = covariance(columns);
    let t = congruence(&helmert_contrasts(k), &s);
    let tr = trace(&t);
    if tr <= SPHERICITY_TOL * trace(&s) {
        // difference scores do not vary: their covariance is trivially spherical
        return Ok((1.0, 1.0, 1.0));
    }

    let w = determinant(&t) / (tr / p).powf(p);
    let d = 1.0 - (2.0 * p * p + p + 2.0) / (6.0 * p * (n - 1.0));
    let chi = -(n - 1.0) * d * w.max(0.0).ln();
    let df = p * (p + 1.0) / 2.0 - 1.0;
    let p_w = chi2_sf(chi, df)?;

    let epsilon = (tr * tr / (p * trace(&square(&t)))).clamp(1.0 / p, 1.0);
    Ok((w, p_w, epsilon))
}

/// Mixed-radix index of `levels` restricted to the factors in `mask`
fn project(mask: usize, levels: &[usize], radices: &[usize]) -> usize {
    let mut index = 0;
    for (f, (&level, &radix)) in levels.iter().zip(radices).enumerate() {
        if mask & (1 << f) != 0 {
            index = index * radix + level;
        }
    }
    index
}

fn mask_size(mask: usize, radices: &[usize]) -> usize {
    radices
        .iter()
        .enumerate()
        .filter(|(f, _)| mask & (1 << f) != 0)
        .map(|(_, r)| *r)
        .product()
}

/// Every combination of level indices for the factors in `mask`,
/// laid out over all factors (factors outside the mask stay 0)
fn level_combinations(mask: usize, radices: &[usize]) -> Vec<Vec<usize>> {
    let mut combos = vec![vec![0; radices.len()]];
    for (f, &radix) in radices.iter().enumerate() {
        if mask & (1 << f) == 0 {
            continue;
        }
        combos = combos
            .into_iter()
            .flat_map(|combo| {
                (0..radix).map(move |level| {
                    let mut next = combo.clone();
                    next[f] = level;
                    next
                })
            })
            .collect();
    }
    combos
}

/// Non-empty subsets of `0..m` ordered by size, then lexicographically
pub(crate) fn term_masks(m: usize) -> Vec<usize> {
    let mut masks: Vec<usize> = (1..(1usize << m)).collect();
    let members = |mask: usize| -> Vec<usize> { (0..m).filter(|f| mask & (1 << f) != 0).collect() };
    masks.sort_by(|a, b| {
        a.count_ones()
            .cmp(&b.count_ones())
            .then_with(|| members(*a).cmp(&members(*b)))
    });
    masks
}

/// Multi-way repeated measures ANOVA
///
/// Subjects are crossed with every factor and contribute exactly one value
/// per cell. Each term (a non-empty subset of factors) is tested against
/// its interaction with the subject factor.
pub fn repeated_measures_multiway(table: &LongTable) -> StatsResult<Vec<AnovaTerm>> {
    let m = table.levels.len();
    if m == 0 {
        return Err(StatsError::InvalidInput(
            "Repeated measures ANOVA requires at least 1 factor".into(),
        ));
    }
    if let Some(f) = table.levels.iter().position(|&l| l < 2) {
        return Err(StatsError::InvalidInput(format!(
            "Factor {} needs at least 2 levels",
            f
        )));
    }

    // dense subject ids in order of first appearance
    let mut subject_ids: HashMap<usize, usize> = HashMap::new();
    for row in &table.rows {
        let next = subject_ids.len();
        subject_ids.entry(row.subject).or_insert(next);
    }
    let n_subjects = subject_ids.len();
    if n_subjects < 2 {
        return Err(StatsError::InsufficientDataMsg(
            "Repeated measures ANOVA requires at least 2 complete cases".into(),
        ));
    }

    // the subject acts as one more crossed factor, stored last
    let mut radices = table.levels.clone();
    radices.push(n_subjects);
    let n_cells: usize = table.levels.iter().product();
    let n_obs = n_cells * n_subjects;

    let mut seen = vec![false; n_obs];
    let mut observations: Vec<(Vec<usize>, f64)> = Vec::with_capacity(n_obs);
    for row in &table.rows {
        if row.levels.len() != m || row.levels.iter().zip(&table.levels).any(|(l, r)| l >= r) {
            return Err(StatsError::InvalidInput(
                "Long-form row does not match the factor levels".into(),
            ));
        }
        let mut full = row.levels.clone();
        full.push(subject_ids[&row.subject]);
        let slot = project(usize::MAX, &full, &radices);
        if std::mem::replace(&mut seen[slot], true) {
            return Err(StatsError::InvalidInput(
                "Each subject must have exactly one value per cell".into(),
            ));
        }
        observations.push((full, row.value));
    }
    if observations.len() != n_obs {
        return Err(StatsError::InvalidInput(
            "Each subject must have a value in every cell".into(),
        ));
    }

    // marginal means for every subset of (factors + subject)
    let all = (1usize << (m + 1)) - 1;
    let mut means: HashMap<usize, Vec<f64>> = HashMap::new();
    for mask in 0..=all {
        let size = mask_size(mask, &radices);
        let mut sums = vec![0.0; size];
        for (full, value) in &observations {
            sums[project(mask, full, &radices)] += value;
        }
        let per_cell = (n_obs / size) as f64;
        means.insert(mask, sums.into_iter().map(|s| s / per_cell).collect());
    }

    let sum_of_squares = |mask: usize| -> f64 {
        let size = mask_size(mask, &radices);
        let submasks: Vec<usize> = (0..=mask).filter(|h| h & !mask == 0).collect();
        let effects: f64 = level_combinations(mask, &radices)
            .iter()
            .map(|combo| {
                let effect: f64 = submasks
                    .iter()
                    .map(|&h| {
                        let sign = if (mask.count_ones() - h.count_ones()) % 2 == 0 { 1.0 } else { -1.0 };
                        sign * means[&h][project(h, combo, &radices)]
                    })
                    .sum();
                effect * effect
            })
            .sum();
        (n_obs / size) as f64 * effects
    };

    let subject_bit = 1usize << m;
    term_masks(m)
        .into_iter()
        .map(|mask| {
            let df_num: f64 = (0..m)
                .filter(|f| mask & (1 << f) != 0)
                .map(|f| (table.levels[f] - 1) as f64)
                .product();
            let df_den = df_num * (n_subjects - 1) as f64;
            let statistic = (sum_of_squares(mask) / df_num) / (sum_of_squares(mask | subject_bit) / df_den);
            Ok(AnovaTerm {
                factors: (0..m).filter(|f| mask & (1 << f) != 0).collect(),
                df_num,
                df_den,
                statistic,
                p_value: f_sf(statistic, df_num, df_den)?,
            })
        })
        .collect()
}

/// Between-subjects factorial ANOVA with all interactions
///
/// `codes[f][i]` is the level index of observation `i` on factor `f`.
/// Sums of squares are Type III under sum-to-zero (effect) coding: each
/// term's SS is the increase in residual SS when its columns are dropped
/// from the full model. Every cell of the design needs an observation.
pub fn factorial_anova(y: &[f64], codes: &[Vec<usize>], levels: &[usize]) -> StatsResult<Vec<AnovaTerm>> {
    let m = levels.len();
    let n = y.len();
    if m == 0 || codes.len() != m {
        return Err(StatsError::InvalidInput(
            "Factorial ANOVA requires one code vector per factor".into(),
        ));
    }
    if codes.iter().any(|c| c.len() != n) {
        return Err(StatsError::InvalidInput(
            "Factorial ANOVA requires equal length samples".into(),
        ));
    }
    if let Some(f) = levels.iter().position(|&l| l < 2) {
        return Err(StatsError::InsufficientDataMsg(format!(
            "Factor {} needs at least 2 groups",
            f
        )));
    }

    let n_cells: usize = levels.iter().product();
    let mut cell_counts = vec![0usize; n_cells];
    for i in 0..n {
        let cell: Vec<usize> = codes.iter().map(|c| c[i]).collect();
        if cell.iter().zip(levels).any(|(c, l)| c >= l) {
            return Err(StatsError::InvalidInput("Level code out of range".into()));
        }
        cell_counts[project(usize::MAX, &cell, levels)] += 1;
    }
    if cell_counts.iter().any(|&c| c == 0) {
        return Err(StatsError::InsufficientDataMsg(
            "Every combination of groups needs at least 1 observation".into(),
        ));
    }
    if n <= n_cells {
        return Err(StatsError::InsufficientDataMsg(
            "Factorial ANOVA requires more observations than cells".into(),
        ));
    }

    // effect-coded columns of each term
    let effect = |f: usize, i: usize, column: usize| -> f64 {
        let code = codes[f][i];
        if code == column {
            1.0
        } else if code == levels[f] - 1 {
            -1.0
        } else {
            0.0
        }
    };
    let masks = term_masks(m);
    let term_columns: Vec<Vec<Vec<f64>>> = masks
        .iter()
        .map(|&mask| {
            let effect_radices: Vec<usize> = levels.iter().map(|l| l - 1).collect();
            level_combinations(mask, &effect_radices)
                .into_iter()
                .map(|combo| {
                    (0..n)
                        .map(|i| {
                            (0..m)
                                .filter(|f| mask & (1 << f) != 0)
                                .map(|f| effect(f, i, combo[f]))
                                .product()
                        })
                        .collect()
                })
                .collect()
        })
        .collect();

    let design = |skip: Option<usize>| -> Mat<f64> {
        let mut columns: Vec<&Vec<f64>> = Vec::new();
        for (t, cols) in term_columns.iter().enumerate() {
            if Some(t) != skip {
                columns.extend(cols.iter());
            }
        }
        Mat::from_fn(n, columns.len() + 1, |i, j| if j == 0 { 1.0 } else { columns[j - 1][i] })
    };

    let sse_full = residual_sum_of_squares(&design(None), y)?;
    let df_den = (n - n_cells) as f64;
    let ms_error = sse_full / df_den;

    masks
        .iter()
        .enumerate()
        .map(|(t, &mask)| {
            let ss = residual_sum_of_squares(&design(Some(t)), y)? - sse_full;
            let df_num = term_columns[t].len() as f64;
            let statistic = (ss / df_num) / ms_error;
            Ok(AnovaTerm {
                factors: (0..m).filter(|f| mask & (1 << f) != 0).collect(),
                df_num,
                df_den,
                statistic,
                p_value: f_sf(statistic, df_num, df_den)?,
            })
        })
        .collect()
}
