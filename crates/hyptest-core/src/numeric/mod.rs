//! Numeric provider boundary
//!
//! Every statistic the dispatcher reports is computed behind the
//! [`NumericProvider`] trait. Each method has a default body that calls a
//! routine in one of the submodules, so [`DefaultProvider`] is an empty impl
//! and a caller can swap out a single routine by overriding one method.
//! Most routines wrap the `anofox_tests` backend; the ones it lacks are
//! computed here on statrs distributions and faer matrices.
//!
//! - parametric: paired / independent t, Levene, single-case tests
//! - nonparametric: Wilcoxon, Mann-Whitney, Kruskal-Wallis, Friedman, Dunn
//! - categorical: McNemar, Cochran's Q
//! - anova: repeated measures (one-way with Mauchly, multi-way), factorial
//! - posthoc: Holm correction, pairwise paired t
//! - power: sensitivity power analysis for t-tests

pub mod anova;
pub mod categorical;
pub mod linalg;
pub mod nonparametric;
pub mod parametric;
pub mod posthoc;
pub mod power;

use crate::StatsError;
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal, StudentsT};

pub use anova::{AnovaTerm, LongTable, RmAnova};
pub use parametric::{FTest, SlopeTest, TTest};
pub use posthoc::PairwiseComparison;

/// Statistic, p-value and (when the test has one) degrees of freedom
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestStatistic {
    pub statistic: f64,
    pub p_value: f64,
    pub df: Option<f64>,
}

/// Numeric routines the dispatcher delegates to
///
/// Inputs are already cleaned: missing values were removed by the caller
/// according to the test's deletion policy.
pub trait NumericProvider {
    fn paired_t(&self, x: &[f64], y: &[f64]) -> crate::StatsResult<TTest> {
        parametric::paired_t(x, y)
    }

    fn student_t(&self, x: &[f64], y: &[f64]) -> crate::StatsResult<TTest> {
        parametric::independent_t(x, y, parametric::Variance::Pooled)
    }

    fn welch_t(&self, x: &[f64], y: &[f64]) -> crate::StatsResult<TTest> {
        parametric::independent_t(x, y, parametric::Variance::Unpooled)
    }

    fn levene(&self, groups: &[Vec<f64>]) -> crate::StatsResult<FTest> {
        parametric::levene(groups)
    }

    fn modified_t(&self, case: f64, controls: &[f64]) -> crate::StatsResult<TestStatistic> {
        parametric::modified_t(case, controls)
    }

    fn slope_extremity(
        &self,
        n_trials: usize,
        case_slope: f64,
        case_se: f64,
        control_slopes: &[f64],
        control_se: &[f64],
    ) -> crate::StatsResult<SlopeTest> {
        parametric::slope_extremity(n_trials, case_slope, case_se, control_slopes, control_se)
    }

    fn wilcoxon_signed_rank(&self, x: &[f64], y: &[f64]) -> crate::StatsResult<TestStatistic> {
        nonparametric::wilcoxon_signed_rank(x, y)
    }

    /// Two-sided Mann-Whitney U test, U of the first sample
    fn mann_whitney_u(&self, x: &[f64], y: &[f64]) -> crate::StatsResult<TestStatistic> {
        nonparametric::mann_whitney_u(x, y)
    }

    /// One-sided normal approximation, U = min(U1, U2)
    fn mann_whitney_u_one_sided(&self, x: &[f64], y: &[f64]) -> crate::StatsResult<TestStatistic> {
        nonparametric::mann_whitney_u_one_sided(x, y)
    }

    fn kruskal_wallis(&self, groups: &[Vec<f64>]) -> crate::StatsResult<TestStatistic> {
        nonparametric::kruskal_wallis(groups)
    }

    /// Matrix of unadjusted two-sided p-values, diagonal 1
    fn dunn(&self, groups: &[Vec<f64>]) -> crate::StatsResult<Vec<Vec<f64>>> {
        nonparametric::dunn(groups)
    }

    fn friedman(&self, columns: &[Vec<f64>]) -> crate::StatsResult<TestStatistic> {
        nonparametric::friedman(columns)
    }

    fn mcnemar(&self, x: &[f64], y: &[f64]) -> crate::StatsResult<TestStatistic> {
        categorical::mcnemar(x, y)
    }

    fn cochran_q(&self, columns: &[Vec<f64>]) -> crate::StatsResult<TestStatistic> {
        categorical::cochran_q(columns)
    }

    fn repeated_measures_anova(&self, columns: &[Vec<f64>]) -> crate::StatsResult<RmAnova> {
        anova::repeated_measures_oneway(columns)
    }

    fn repeated_measures_anova_long(&self, table: &LongTable) -> crate::StatsResult<Vec<AnovaTerm>> {
        anova::repeated_measures_multiway(table)
    }

    fn factorial_anova(
        &self,
        y: &[f64],
        codes: &[Vec<usize>],
        levels: &[usize],
    ) -> crate::StatsResult<Vec<AnovaTerm>> {
        anova::factorial_anova(y, codes, levels)
    }

    fn pairwise_paired_t_holm(
        &self,
        columns: &[Vec<f64>],
    ) -> crate::StatsResult<Vec<PairwiseComparison>> {
        posthoc::pairwise_paired_t_holm(columns)
    }

    fn min_effect_size_paired(&self, n: usize) -> crate::StatsResult<f64> {
        power::min_effect_size_one_sample(n, power::TARGET_POWER, power::ALPHA)
    }

    fn min_effect_size_independent(&self, n1: usize, n2: usize) -> crate::StatsResult<f64> {
        power::min_effect_size_two_sample(n1, n2, power::TARGET_POWER, power::ALPHA)
    }
}

/// Default provider: every method keeps its default body
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProvider;

impl NumericProvider for DefaultProvider {}

/// Convert a statrs construction error into our error type
pub(crate) fn convert_error<E: std::fmt::Display>(e: E) -> StatsError {
    StatsError::Provider(e.to_string())
}

/// Convert an anofox_tests error into our error type
pub(crate) fn convert_backend_error(e: anofox_tests::StatError) -> StatsError {
    StatsError::InvalidInput(e.to_string())
}

/// Filter NaN values from a slice
pub(crate) fn filter_nan(data: &[f64]) -> Vec<f64> {
    data.iter().copied().filter(|x| !x.is_nan()).collect()
}

pub(crate) fn mean(data: &[f64]) -> f64 {
    data.iter().sum::<f64>() / data.len() as f64
}

/// Sample variance (n - 1 denominator)
pub(crate) fn variance(data: &[f64]) -> f64 {
    let m = mean(data);
    data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() as f64 - 1.0)
}

/// Sum of `t^3 - t` over groups of tied values
pub(crate) fn tie_term(data: &[f64]) -> f64 {
    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mut total = 0.0;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i + 1;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        let t = (j - i) as f64;
        total += t * t * t - t;
        i = j;
    }
    total
}

pub(crate) fn t_two_tailed_p(t: f64, df: f64) -> crate::StatsResult<f64> {
    let dist = StudentsT::new(0.0, 1.0, df).map_err(convert_error)?;
    Ok((2.0 * dist.sf(t.abs())).min(1.0))
}

/// Two-tailed critical value of the t distribution
pub(crate) fn t_critical(df: f64, alpha: f64) -> crate::StatsResult<f64> {
    let dist = StudentsT::new(0.0, 1.0, df).map_err(convert_error)?;
    Ok(dist.inverse_cdf(1.0 - alpha / 2.0))
}

pub(crate) fn f_sf(f: f64, df_num: f64, df_den: f64) -> crate::StatsResult<f64> {
    let dist = FisherSnedecor::new(df_num, df_den).map_err(convert_error)?;
    Ok(dist.sf(f))
}

pub(crate) fn chi2_sf(x: f64, df: f64) -> crate::StatsResult<f64> {
    let dist = ChiSquared::new(df).map_err(convert_error)?;
    Ok(dist.sf(x))
}

pub(crate) fn standard_normal() -> crate::StatsResult<Normal> {
    Normal::new(0.0, 1.0).map_err(convert_error)
}
