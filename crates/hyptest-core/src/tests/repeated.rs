//! Repeated measures ANOVA
//!
//! Without factors every variable is one condition of a single
//! within-subject factor: Mauchly's test decides between the uncorrected
//! and the Greenhouse-Geisser corrected F test, and a significant result is
//! followed by Holm corrected pairwise t-tests.
//!
//! With factors the variables are the cells of a multi-way design. They are
//! mapped to factor-level combinations through an explicit [`Cell`] map and
//! reshaped to long form; every term is reported, post-hoc tests are not.

use super::{exact, require_at_least, HypothesisTests, SIGNIFICANCE_LEVEL};
use crate::numeric::anova::{LongRow, LongTable};
use crate::numeric::NumericProvider;
use crate::results::{
    Analysis, Decision, Dof, LabelledComparison, PostHoc, Report, TestKind, TestResult,
};
use crate::{Dataset, Factor, StatsError, StatsResult};
use tracing::debug;

/// Note attached to every multi-way analysis
pub const MULTIWAY_POST_HOC_NOTE: &str =
    "Post-hoc comparisons are not computed for designs with more than one factor.";

/// One cell of a within-subject design
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Level index per factor
    pub levels: Vec<usize>,
    /// Variable that holds the measurements of this cell
    pub variable: String,
}

/// Map variables to factor-level combinations
///
/// Variables are taken in the order of the cartesian product of the factor
/// levels, first factor varying slowest: with factors A (2 levels) and B
/// (3 levels) the variables are A0B0, A0B1, A0B2, A1B0, ...
pub fn cell_map(var_names: &[&str], factors: &[Factor]) -> StatsResult<Vec<Cell>> {
    if let Some(f) = factors.iter().find(|f| f.levels < 2) {
        return Err(StatsError::InvalidFactor {
            name: f.name.clone(),
            levels: f.levels,
        });
    }
    let expected: usize = factors.iter().map(|f| f.levels).product();
    if expected != var_names.len() {
        return Err(StatsError::FactorMismatch {
            expected,
            actual: var_names.len(),
        });
    }

    Ok(var_names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let mut levels = vec![0; factors.len()];
            let mut rest = index;
            for (slot, factor) in levels.iter_mut().zip(factors).rev() {
                *slot = rest % factor.levels;
                rest /= factor.levels;
            }
            Cell {
                levels,
                variable: name.to_string(),
            }
        })
        .collect())
}

impl<P: NumericProvider> HypothesisTests<P> {
    /// Repeated measures ANOVA over `var_names`
    ///
    /// Pass no factors for the one-way design. Otherwise the product of the
    /// factor levels must equal the number of variables.
    pub fn repeated_measures_anova(&self, data: &Dataset, var_names: &[&str], factors: &[Factor]) -> Report {
        Report::new(
            TestKind::RepeatedMeasuresAnova,
            self.repeated_measures_analysis(data, var_names, factors),
        )
    }

    fn repeated_measures_analysis(
        &self,
        data: &Dataset,
        var_names: &[&str],
        factors: &[Factor],
    ) -> StatsResult<Analysis> {
        require_at_least(var_names, 2, "At least two repeated measures are required.")?;
        if factors.is_empty() {
            self.one_way(data, var_names)
        } else {
            let cells = cell_map(var_names, factors)?;
            self.multi_way(data, &cells, factors)
        }
    }

    fn one_way(&self, data: &Dataset, var_names: &[&str]) -> StatsResult<Analysis> {
        let cases = data.complete_cases(var_names)?;
        let rm = self.provider.repeated_measures_anova(&cases)?;

        let mauchly = TestResult::new(TestKind::Mauchly, rm.mauchly_w, rm.mauchly_p);
        let violated = rm.mauchly_p < SIGNIFICANCE_LEVEL;
        debug!(
            w = rm.mauchly_w,
            p = rm.mauchly_p,
            epsilon = rm.gg_epsilon,
            violated,
            "sphericity check"
        );

        let (df, p_value, decision) = if violated {
            (
                vec![
                    Dof::Approx(rm.df_num * rm.gg_epsilon),
                    Dof::Approx(rm.df_den * rm.gg_epsilon),
                ],
                rm.p_greenhouse_geisser()?,
                Decision::SphericityViolated,
            )
        } else {
            (
                vec![exact(rm.df_num), exact(rm.df_den)],
                rm.p_value,
                Decision::SphericityNotViolated,
            )
        };

        let mut result = TestResult::new(TestKind::RepeatedMeasuresAnova, rm.statistic, p_value).with_df(df);
        result.decisions.push(decision);

        if p_value < SIGNIFICANCE_LEVEL {
            debug!(p = p_value, "running Holm corrected pairwise comparisons");
            let comparisons = self.provider.pairwise_paired_t_holm(&cases)?;
            result.post_hoc = Some(PostHoc::Pairwise(
                comparisons
                    .into_iter()
                    .map(|comparison| LabelledComparison {
                        first: var_names[comparison.first].to_string(),
                        second: var_names[comparison.second].to_string(),
                        comparison,
                    })
                    .collect(),
            ));
        }

        Ok(Analysis {
            assumption: Some(mauchly),
            ..Analysis::single(result)
        })
    }

    fn multi_way(&self, data: &Dataset, cells: &[Cell], factors: &[Factor]) -> StatsResult<Analysis> {
        let var_names: Vec<&str> = cells.iter().map(|c| c.variable.as_str()).collect();
        let subjects = data.complete_rows(&var_names)?;
        let columns = data.select(&var_names)?;

        let mut rows = Vec::with_capacity(subjects.len() * cells.len());
        for &subject in &subjects {
            for (cell, column) in cells.iter().zip(&columns) {
                rows.push(LongRow {
                    subject,
                    levels: cell.levels.clone(),
                    value: column[subject],
                });
            }
        }
        let table = LongTable {
            levels: factors.iter().map(|f| f.levels).collect(),
            rows,
        };
        debug!(
            factors = factors.len(),
            subjects = subjects.len(),
            observations = table.rows.len(),
            "reshaped repeated measures to long form"
        );

        let terms = self.provider.repeated_measures_anova_long(&table)?;
        let results = terms
            .into_iter()
            .map(|term| {
                let names = term.factors.iter().map(|&f| factors[f].name.clone()).collect();
                TestResult::new(TestKind::RepeatedMeasuresAnova, term.statistic, term.p_value)
                    .with_df([exact(term.df_num), exact(term.df_den)])
                    .with_term(names)
            })
            .collect();

        Ok(Analysis {
            heading: None,
            power: None,
            estimate: None,
            assumption: None,
            results,
            notes: vec![MULTIWAY_POST_HOC_NOTE.to_string()],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TestOptions;
    use approx::assert_relative_eq;

    fn tests() -> HypothesisTests {
        HypothesisTests::new(TestOptions::default())
    }

    #[test]
    fn test_cell_map_first_factor_slowest() {
        let factors = [Factor::new("A", 2), Factor::new("B", 3)];
        let names = ["a0b0", "a0b1", "a0b2", "a1b0", "a1b1", "a1b2"];
        let cells = cell_map(&names, &factors).unwrap();

        assert_eq!(cells[0].levels, vec![0, 0]);
        assert_eq!(cells[2].levels, vec![0, 2]);
        assert_eq!(cells[3].levels, vec![1, 0]);
        assert_eq!(cells[5].levels, vec![1, 2]);
        assert_eq!(cells[4].variable, "a1b1");
    }

    #[test]
    fn test_cell_map_mismatch() {
        let factors = [Factor::new("A", 2), Factor::new("B", 2)];
        assert_eq!(
            cell_map(&["a", "b", "c"], &factors).unwrap_err(),
            StatsError::FactorMismatch { expected: 4, actual: 3 }
        );
        assert!(matches!(
            cell_map(&["a", "b"], &[Factor::new("A", 1)]),
            Err(StatsError::InvalidFactor { .. })
        ));
    }

    #[test]
    fn test_too_few_variables() {
        let data = Dataset::from_columns([("a", vec![1.0, 2.0, 3.0])]).unwrap();
        let report = tests().repeated_measures_anova(&data, &["a"], &[]);
        assert!(report.error().unwrap().is_configuration());
        assert!(report
            .to_string()
            .contains("two repeated measures are required"));
    }

    #[test]
    fn test_factor_mismatch_is_reported() {
        let data = Dataset::from_columns([
            ("a", vec![1.0, 2.0, 3.0]),
            ("b", vec![2.0, 3.0, 5.0]),
            ("c", vec![3.0, 5.0, 4.0]),
        ])
        .unwrap();
        let report = tests().repeated_measures_anova(&data, &["a", "b", "c"], &[Factor::new("A", 2)]);
        assert_eq!(
            report.to_string(),
            "Factor levels multiply to 2 cells but 3 variables were given"
        );
    }

    #[test]
    fn test_one_way_sphericity_violated() {
        let data = Dataset::from_columns([
            ("t1", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            ("t2", vec![2.0, 2.5, 4.5, 4.0, 7.0, 6.5]),
            ("t3", vec![8.0, 1.0, 9.0, 2.0, 12.0, 3.0]),
        ])
        .unwrap();
        let report = tests().repeated_measures_anova(&data, &["t1", "t2", "t3"], &[]);
        let analysis = report.analysis().unwrap();
        let result = analysis.result().unwrap();

        assert_relative_eq!(analysis.assumption.as_ref().unwrap().statistic, 0.023339, epsilon = 1e-5);
        assert_eq!(result.decisions, vec![Decision::SphericityViolated]);
        // df scaled by epsilon = 0.505904
        assert_relative_eq!(result.df[0].value(), 2.0 * 0.505904, epsilon = 1e-5);
        assert_relative_eq!(result.df[1].value(), 10.0 * 0.505904, epsilon = 1e-4);
        assert_relative_eq!(result.p_value, 0.322053, epsilon = 1e-5);
        assert!(result.post_hoc.is_none());
        assert!(report.to_string().contains("<decision>Sphericity is violated."));
    }

    #[test]
    fn test_one_way_constant_difference_scores() {
        let base = [13.0, 12.5, 10.5, 9.5, 11.0, 14.5];
        let data = Dataset::from_columns([
            ("t1", base.to_vec()),
            ("t2", base.iter().map(|v| v + 1.0).collect()),
            ("t3", base.iter().map(|v| v + 2.0).collect()),
        ])
        .unwrap();
        let report = tests().repeated_measures_anova(&data, &["t1", "t2", "t3"], &[]);

        assert!(report.error().is_none(), "unexpected error: {}", report);
        let analysis = report.analysis().unwrap();
        let result = analysis.result().unwrap();
        assert_relative_eq!(analysis.assumption.as_ref().unwrap().p_value, 1.0);
        assert_eq!(result.decisions, vec![Decision::SphericityNotViolated]);
        assert_eq!(result.df, vec![Dof::Exact(2), Dof::Exact(10)]);
        assert!(result.p_value < 1e-10);
    }

    #[test]
    fn test_one_way_with_post_hoc() {
        let data = Dataset::from_columns([
            ("t1", vec![1.0, 2.0, 3.0, 4.0, 5.0, f64::NAN]),
            ("t2", vec![2.0, 3.5, 3.0, 5.5, 6.0, 1.0]),
            ("t3", vec![4.0, 6.0, 5.5, 8.0, 9.0, 2.0]),
        ])
        .unwrap();
        let report = tests().repeated_measures_anova(&data, &["t1", "t2", "t3"], &[]);
        let result = report.analysis().unwrap().result().unwrap().clone();

        // listwise deletion leaves 5 cases
        assert_eq!(result.df, vec![Dof::Exact(2), Dof::Exact(8)]);
        assert_relative_eq!(result.statistic, 97.5, epsilon = 1e-8);
        assert_eq!(result.decisions, vec![Decision::SphericityNotViolated]);

        match result.post_hoc {
            Some(PostHoc::Pairwise(rows)) => {
                let pairs: Vec<_> = rows.iter().map(|r| (r.first.as_str(), r.second.as_str())).collect();
                assert_eq!(pairs, vec![("t1", "t2"), ("t1", "t3"), ("t2", "t3")]);
            }
            other => panic!("expected pairwise post-hoc, got {:?}", other),
        }
        assert!(report.to_string().contains("Holm-Bonferroni"));
    }

    #[test]
    fn test_multi_way_rows_and_note() {
        let data = Dataset::from_columns([
            ("a1b1", vec![3.0, 4.0, 5.0, 4.5, 6.0]),
            ("a1b2", vec![5.0, 5.5, 7.0, 6.0, 8.5]),
            ("a2b1", vec![4.0, 6.0, 6.5, 5.0, 7.5]),
            ("a2b2", vec![9.0, 8.0, 11.0, 9.5, 12.0]),
        ])
        .unwrap();
        let factors = [Factor::new("A", 2), Factor::new("B", 2)];
        let report = tests().repeated_measures_anova(&data, &["a1b1", "a1b2", "a2b1", "a2b2"], &factors);
        let analysis = report.analysis().unwrap();

        assert_eq!(analysis.results.len(), 3);
        let labels: Vec<_> = analysis.results.iter().map(TestResult::label).collect();
        assert_eq!(
            labels,
            vec!["Main effect of A", "Main effect of B", "Interaction of factors A, B"]
        );
        for result in &analysis.results {
            assert_eq!(result.df, vec![Dof::Exact(1), Dof::Exact(4)]);
            assert!(result.post_hoc.is_none());
        }
        assert_eq!(analysis.notes, vec![MULTIWAY_POST_HOC_NOTE.to_string()]);
        assert!(report.to_string().ends_with(&format!("{}\n", MULTIWAY_POST_HOC_NOTE)));
    }
}
