//! Parametric tests
//!
//! - Paired and independent samples t-test (Student, Welch)
//! - Levene's test for homogeneity of variances
//! - Crawford-Howell modified t-test for a single case
//! - Slope extremity test for a single case

use super::{convert_backend_error, convert_error, mean, t_two_tailed_p, variance, TestStatistic};
use crate::{StatsError, StatsResult};
use anofox_tests::{brown_forsythe, t_test as lib_t_test, Alternative, TTestKind, TTestResult};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

/// Coverage of the confidence interval reported with every t-test
const CONFIDENCE_LEVEL: f64 = 0.95;

/// Variance assumption for the independent samples t-test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variance {
    /// Student's t: pooled variance
    Pooled,
    /// Welch's t: separate variances, Welch-Satterthwaite df
    Unpooled,
}

/// t-test result with the 95% confidence interval of the mean difference
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTest {
    pub statistic: f64,
    pub p_value: f64,
    pub df: f64,
    /// mean(x) - mean(y)
    pub mean_difference: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

impl From<TTestResult> for TTest {
    fn from(r: TTestResult) -> Self {
        let (ci_lower, ci_upper) = r
            .conf_int
            .as_ref()
            .map_or((f64::NAN, f64::NAN), |ci| (ci.lower, ci.upper));
        TTest {
            statistic: r.statistic,
            p_value: r.p_value,
            df: r.df,
            // paired results carry the mean difference in mean_x
            mean_difference: r.mean_x - r.mean_y.unwrap_or(0.0),
            ci_lower,
            ci_upper,
        }
    }
}

/// F test with two degrees of freedom
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FTest {
    pub statistic: f64,
    pub df_num: f64,
    pub df_den: f64,
    pub p_value: f64,
}

/// Result of the slope extremity test and the variant that was chosen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlopeTest {
    pub statistic: f64,
    pub df: f64,
    pub p_value: f64,
    pub method: &'static str,
}

/// Paired samples t-test on equal-length, complete samples
pub fn paired_t(x: &[f64], y: &[f64]) -> StatsResult<TTest> {
    if x.len() != y.len() {
        return Err(StatsError::InvalidInput(
            "Paired t-test requires equal length samples".into(),
        ));
    }
    if x.len() < 2 {
        return Err(StatsError::InsufficientDataMsg(
            "Paired t-test requires at least 2 complete pairs".into(),
        ));
    }

    lib_t_test(
        x,
        y,
        TTestKind::Paired,
        Alternative::TwoSided,
        0.0,
        Some(CONFIDENCE_LEVEL),
    )
    .map(TTest::from)
    .map_err(convert_backend_error)
}

/// Independent samples t-test
pub fn independent_t(x: &[f64], y: &[f64], assumption: Variance) -> StatsResult<TTest> {
    if x.len() < 2 || y.len() < 2 {
        return Err(StatsError::InsufficientDataMsg(
            "t-test requires at least 2 observations in each group".into(),
        ));
    }

    let kind = match assumption {
        Variance::Pooled => TTestKind::Student,
        Variance::Unpooled => TTestKind::Welch,
    };
    lib_t_test(x, y, kind, Alternative::TwoSided, 0.0, Some(CONFIDENCE_LEVEL))
        .map(TTest::from)
        .map_err(convert_backend_error)
}

/// Levene's test, centred on group medians (Brown-Forsythe)
pub fn levene(groups: &[Vec<f64>]) -> StatsResult<FTest> {
    let k = groups.len();
    if k < 2 {
        return Err(StatsError::InsufficientDataMsg(
            "Levene test requires at least 2 groups".into(),
        ));
    }
    if let Some(i) = groups.iter().position(|g| g.is_empty()) {
        return Err(StatsError::InsufficientDataMsg(format!(
            "Levene test requires at least 1 observation per group (group {} is empty)",
            i
        )));
    }
    let n_total: usize = groups.iter().map(Vec::len).sum();
    if n_total <= k {
        return Err(StatsError::InsufficientDataMsg(
            "Levene test requires more observations than groups".into(),
        ));
    }

    let slices: Vec<&[f64]> = groups.iter().map(Vec::as_slice).collect();
    let result = brown_forsythe(&slices).map_err(convert_backend_error)?;

    Ok(FTest {
        statistic: result.statistic,
        df_num: result.df1,
        df_den: result.df2,
        p_value: result.p_value,
    })
}

/// Crawford-Howell modified t-test: one case against a control sample
pub fn modified_t(case: f64, controls: &[f64]) -> StatsResult<TestStatistic> {
    if controls.len() < 2 {
        return Err(StatsError::InsufficientDataMsg(
            "Modified t-test requires at least 2 control observations".into(),
        ));
    }
    let n = controls.len() as f64;
    let sd = variance(controls).sqrt();
    let statistic = (case - mean(controls)) / (sd * ((n + 1.0) / n).sqrt());
    let df = n - 1.0;

    Ok(TestStatistic {
        statistic,
        p_value: t_two_tailed_p(statistic, df)?,
        df: Some(df),
    })
}

/// Compare a single case's slope with control slopes
///
/// The case's standard error is first compared with the controls' average
/// squared standard error (two-sided F, `n_trials - 2` df per slope). When
/// they are compatible the Crawford-Howell test is run on the slopes;
/// otherwise the case's excess sampling variance is added to the
/// denominator and df follow Welch-Satterthwaite.
pub fn slope_extremity(
    n_trials: usize,
    case_slope: f64,
    case_se: f64,
    control_slopes: &[f64],
    control_se: &[f64],
) -> StatsResult<SlopeTest> {
    if control_slopes.len() != control_se.len() {
        return Err(StatsError::InvalidInput(
            "Slope test requires one standard error per control slope".into(),
        ));
    }
    if control_slopes.len() < 2 {
        return Err(StatsError::InsufficientDataMsg(
            "Slope test requires at least 2 control participants".into(),
        ));
    }
    if n_trials < 3 {
        return Err(StatsError::InvalidInput(
            "Slope test requires at least 3 trials per participant".into(),
        ));
    }

    let n = control_slopes.len() as f64;
    let slope_df = (n_trials - 2) as f64;
    let mean_control_var = control_se.iter().map(|se| se * se).sum::<f64>() / n;
    let case_var = case_se * case_se;

    let ratio = case_var / mean_control_var;
    let f_dist = FisherSnedecor::new(slope_df, n * slope_df).map_err(convert_error)?;
    let p_homogeneity = (2.0 * f_dist.cdf(ratio).min(f_dist.sf(ratio))).min(1.0);

    let control_var = variance(control_slopes) * (n + 1.0) / n;
    let difference = case_slope - mean(control_slopes);

    if p_homogeneity >= 0.05 {
        let statistic = difference / control_var.sqrt();
        let df = n - 1.0;
        return Ok(SlopeTest {
            statistic,
            df,
            p_value: t_two_tailed_p(statistic, df)?,
            method: "Crawford-Howell test",
        });
    }

    let excess = (case_var - mean_control_var).max(0.0);
    let total = control_var + excess;
    let statistic = difference / total.sqrt();
    let df = total.powi(2) / (control_var.powi(2) / (n - 1.0) + excess.powi(2) / slope_df);

    Ok(SlopeTest {
        statistic,
        df,
        p_value: t_two_tailed_p(statistic, df)?,
        method: "Welch-Satterthwaite test",
    })
}
