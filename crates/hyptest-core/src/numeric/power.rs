//! Sensitivity power analysis for t-tests
//!
//! Given the sample size(s) actually observed, find the smallest Cohen's d
//! that a two-sided test at `alpha` would detect with the requested power.
//! The noncentral t distribution is approximated by a normal deviate:
//!
//! `P(T' > t) ~ 1 - Phi((t (1 - 1/(4 df)) - delta) / sqrt(1 + t^2 / (2 df)))`

use super::{standard_normal, t_critical};
use crate::{StatsError, StatsResult};
use statrs::distribution::ContinuousCDF;

pub const TARGET_POWER: f64 = 0.95;
pub const ALPHA: f64 = 0.05;

const MAX_EFFECT: f64 = 100.0;
const TOLERANCE: f64 = 1e-10;
const MAX_ITER: usize = 200;

/// Power of a two-sided t-test with noncentrality `delta`
fn two_sided_power(delta: f64, df: f64, alpha: f64) -> StatsResult<f64> {
    let normal = standard_normal()?;
    let t = t_critical(df, alpha)?;
    let shrunk = t * (1.0 - 1.0 / (4.0 * df));
    let scale = (1.0 + t * t / (2.0 * df)).sqrt();
    let upper = normal.sf((shrunk - delta) / scale);
    let lower = normal.cdf((-shrunk - delta) / scale);
    Ok(upper + lower)
}

/// Bisection for the effect size, `delta = d * scale`
fn solve_effect_size(scale: f64, df: f64, power: f64, alpha: f64) -> StatsResult<f64> {
    if !(0.0..1.0).contains(&alpha) || alpha == 0.0 {
        return Err(StatsError::InvalidInput(format!(
            "alpha must be in (0, 1), got {}",
            alpha
        )));
    }
    if !(alpha..1.0).contains(&power) {
        return Err(StatsError::InvalidInput(format!(
            "power must be in [alpha, 1), got {}",
            power
        )));
    }

    let (mut lo, mut hi) = (0.0, MAX_EFFECT);
    if two_sided_power(hi * scale, df, alpha)? < power {
        return Err(StatsError::Provider(
            "no effect size reaches the requested power".into(),
        ));
    }
    for _ in 0..MAX_ITER {
        let mid = (lo + hi) / 2.0;
        if two_sided_power(mid * scale, df, alpha)? < power {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < TOLERANCE {
            break;
        }
    }
    Ok((lo + hi) / 2.0)
}

/// Minimal Cohen's d for a one-sample (or paired) t-test on `n` observations
pub fn min_effect_size_one_sample(n: usize, power: f64, alpha: f64) -> StatsResult<f64> {
    if n < 2 {
        return Err(StatsError::InsufficientDataMsg(
            "Power analysis requires at least 2 observations".into(),
        ));
    }
    let nf = n as f64;
    solve_effect_size(nf.sqrt(), nf - 1.0, power, alpha)
}

/// Minimal Cohen's d for an independent two-sample t-test
pub fn min_effect_size_two_sample(n1: usize, n2: usize, power: f64, alpha: f64) -> StatsResult<f64> {
    if n1 == 0 || n2 == 0 || n1 + n2 < 3 {
        return Err(StatsError::InsufficientDataMsg(
            "Power analysis requires at least 3 observations in two nonempty groups".into(),
        ));
    }
    let (a, b) = (n1 as f64, n2 as f64);
    solve_effect_size((a * b / (a + b)).sqrt(), a + b - 2.0, power, alpha)
}
