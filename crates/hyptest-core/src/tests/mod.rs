//! Hypothesis-test dispatcher
//!
//! [`HypothesisTests`] validates the variable selection, applies the
//! missing-value policy of each test family, calls the numeric provider and
//! assembles a [`Report`]. Methods are split by family:
//!
//! - variables: paired comparisons of two or more variables
//! - repeated: repeated measures ANOVA (one-way and multi-way)
//! - groups: independent groups (t-tests, Mann-Whitney, Kruskal-Wallis, two-way ANOVA)
//! - single_case: a single case against a control group

pub mod repeated;

pub use groups::TwoGroupTest;
pub use repeated::{cell_map, Cell};

use crate::numeric::{filter_nan, NumericProvider, DefaultProvider};
use crate::results::Dof;
use crate::{Dataset, StatsError, StatsResult, TestOptions};

/// Threshold for the sphericity decision and the post-hoc gates
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Entry point for every test
#[derive(Debug, Clone, Default)]
pub struct HypothesisTests<P = DefaultProvider> {
    provider: P,
    options: TestOptions,
}

impl HypothesisTests<DefaultProvider> {
    pub fn new(options: TestOptions) -> Self {
        Self {
            provider: DefaultProvider,
            options,
        }
    }
}

impl<P: NumericProvider> HypothesisTests<P> {
    /// Use a different numeric provider
    pub fn with_provider(provider: P, options: TestOptions) -> Self {
        Self { provider, options }
    }

    pub fn options(&self) -> &TestOptions {
        &self.options
    }
}

fn require_exactly(var_names: &[&str], count: usize, message: &str) -> StatsResult<()> {
    if var_names.len() != count {
        return Err(StatsError::Arity(message.to_string()));
    }
    Ok(())
}

fn require_at_least(var_names: &[&str], count: usize, message: &str) -> StatsResult<()> {
    if var_names.len() < count {
        return Err(StatsError::Arity(message.to_string()));
    }
    Ok(())
}

/// Integer df coming back from the provider as f64
fn exact(df: f64) -> Dof {
    Dof::Exact(df.round().max(0.0) as usize)
}

/// Groups of `var_name` by `group_name`, missing values dropped per group
fn split_groups(data: &Dataset, var_name: &str, group_name: &str) -> StatsResult<(Vec<String>, Vec<Vec<f64>>)> {
    let groups = data.split_into_groups(var_name, group_name)?;
    Ok(groups
        .into_iter()
        .map(|g| (g.label, filter_nan(&g.values)))
        .unzip())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_helpers() {
        assert!(require_exactly(&["a", "b"], 2, "two").is_ok());
        assert_eq!(
            require_exactly(&["a"], 2, "two").unwrap_err(),
            StatsError::Arity("two".into())
        );
        assert!(require_at_least(&["a", "b", "c"], 2, "many").is_ok());
        assert!(require_at_least(&[], 2, "many").is_err());
    }

    #[test]
    fn test_exact_df() {
        assert_eq!(exact(19.0), Dof::Exact(19));
        assert_eq!(exact(2.0000000001), Dof::Exact(2));
    }

    #[test]
    fn test_split_groups_drops_missing() {
        let data = Dataset::from_columns([
            ("y", vec![1.0, f64::NAN, 3.0, 4.0]),
            ("g", vec![1.0, 1.0, 2.0, 2.0]),
        ])
        .unwrap();
        let (labels, groups) = split_groups(&data, "y", "g").unwrap();
        assert_eq!(labels, vec!["1", "2"]);
        assert_eq!(groups, vec![vec![1.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn test_default_options() {
        let tests = HypothesisTests::new(TestOptions::default());
        assert!(!tests.options().run_power_analysis);
    }
}
