//! Text rendering of results
//!
//! Reports use a small markup vocabulary understood by the host
//! application: `<i>` for statistic symbols, `<decision>` / `<default>`
//! around decision narratives, and HTML tables for post-hoc results.

use crate::results::{Analysis, Dof, LabelledComparison, PostHoc, Report, TestKind, TestResult};
use std::fmt;

/// Class of every post-hoc table
pub const TABLE_CLASS: &str = "table_cs_pd";

/// Format `x` with `digits` significant digits, like C's `%.*g`
pub fn format_sig(x: f64, digits: usize) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if x == 0.0 {
        return "0".to_string();
    }

    let digits = digits.max(1);
    // Exponent after rounding to the requested significant digits
    let sci = format!("{:.*e}", digits - 1, x);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m.to_string(), e.parse::<i32>().unwrap_or(0)),
        None => (sci.clone(), 0),
    };

    if exponent < -4 || exponent >= digits as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(&mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, x)).to_string()
    }
}

/// Drop trailing zeros of a fractional part, and the point if nothing is left
fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// `<i>p</i> < .001` or `<i>p</i> = .XXX`
pub fn print_p(p: f64) -> String {
    if p < 0.001 {
        "<i>p</i> < .001".to_string()
    } else {
        let fixed = format!("{:.3}", p);
        let fixed = fixed.strip_prefix('0').unwrap_or(&fixed);
        format!("<i>p</i> = {}", fixed)
    }
}

/// Largest number of fractional digits among the finite values
///
/// Uses the shortest decimal rendering that round-trips, so `2.5` counts
/// one digit and `3` none.
pub fn precision(values: &[f64]) -> usize {
    values
        .iter()
        .filter(|v| v.is_finite())
        .map(|v| {
            let s = format!("{}", v);
            s.split_once('.').map_or(0, |(_, frac)| frac.len())
        })
        .max()
        .unwrap_or(0)
}

/// HTML table with bold row labels and an optional header row
pub fn html_table(header: Option<&[String]>, rows: &[(String, Vec<String>)]) -> String {
    let mut out = format!("<table class=\"{}\">\n", TABLE_CLASS);
    if let Some(columns) = header {
        out.push_str("  <thead>\n    <tr>\n      <th></th>\n");
        for column in columns {
            out.push_str(&format!("      <th>{}</th>\n", column));
        }
        out.push_str("    </tr>\n  </thead>\n");
    }
    out.push_str("  <tbody>\n");
    for (label, cells) in rows {
        out.push_str(&format!("    <tr>\n      <th>{}</th>\n", label));
        for cell in cells {
            out.push_str(&format!("      <td>{}</td>\n", cell));
        }
        out.push_str("    </tr>\n");
    }
    out.push_str("  </tbody>\n</table>\n");
    out
}

impl fmt::Display for Dof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dof::Exact(v) => write!(f, "{}", v),
            Dof::Approx(v) => write!(f, "{}", format_sig(*v, 3)),
        }
    }
}

impl TestResult {
    /// Text in front of the statistic
    pub fn label(&self) -> String {
        match (&self.term, &self.method_note) {
            (Some(names), _) if names.len() == 1 => format!("Main effect of {}", names[0]),
            (Some(names), _) if self.kind == TestKind::TwoWayAnova && names.len() == 2 => {
                format!("Interaction of {} and {}", names[0], names[1])
            }
            (Some(names), _) => format!("Interaction of factors {}", names.join(", ")),
            (None, Some(method)) => format!("{} with {}", self.kind.heading(), method),
            (None, None) => self.kind.heading().to_string(),
        }
    }

    /// `sym(df, N = n) = stat, p`
    pub fn statistic_text(&self) -> String {
        let mut parts: Vec<String> = self.df.iter().map(Dof::to_string).collect();
        if let Some(n) = self.n {
            parts.push(format!("<i>N</i> = {}", n));
        }
        let args = if parts.is_empty() {
            String::new()
        } else {
            format!("({})", parts.join(", "))
        };
        format!(
            "{}{} = {}, {}",
            self.symbol().markup(),
            args,
            format_sig(self.statistic, 3),
            print_p(self.p_value)
        )
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for decision in &self.decisions {
            write!(f, "\n<decision>{}\n<default>", decision.text())?;
        }
        writeln!(f, "{}: {}", self.label(), self.statistic_text())?;
        if let Some(post_hoc) = &self.post_hoc {
            write!(f, "{}", post_hoc)?;
        }
        Ok(())
    }
}

fn pairwise_row(row: &LabelledComparison) -> (String, Vec<String>) {
    (
        format!("{} - {}", row.first, row.second),
        vec![format!(
            "<i>t</i> = {}, {}",
            format_sig(row.comparison.statistic, 3),
            print_p(row.comparison.p_adjusted)
        )],
    )
}

impl fmt::Display for PostHoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostHoc::Pairwise(rows) => {
                writeln!(f, "\nComparing variables pairwise with the Holm-Bonferroni correction:")?;
                let rows: Vec<_> = rows.iter().map(pairwise_row).collect();
                write!(f, "{}", html_table(None, &rows))
            }
            PostHoc::Matrix { labels, p_values } => {
                writeln!(f, "\nGroups differ. Post-hoc test of the means.")?;
                writeln!(f, "Results of Dunn's test (p values).")?;
                let rows: Vec<_> = labels
                    .iter()
                    .zip(p_values)
                    .map(|(label, row)| {
                        (label.clone(), row.iter().map(|p| format!("{:.3}", p)).collect())
                    })
                    .collect();
                write!(f, "{}", html_table(Some(labels), &rows))
            }
        }
    }
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(heading) = &self.heading {
            writeln!(f, "{}:", heading)?;
        }
        if let Some(power) = &self.power {
            writeln!(
                f,
                "Sensitivity power analysis. Minimal effect size to reach 95% power (effect size is in d): {:.2}",
                power.effect_size
            )?;
        }
        if let Some(estimate) = &self.estimate {
            let prec = estimate.decimals;
            writeln!(
                f,
                "Difference between the two groups: {:.*}, 95% confidence interval [{:.*}, {:.*}]",
                prec, estimate.difference, prec, estimate.lower, prec, estimate.upper
            )?;
        }
        if let Some(assumption) = &self.assumption {
            write!(f, "{}: {}.", assumption.label(), assumption.statistic_text())?;
            // a decision narrative starts on its own line
            if self.results.iter().all(|r| r.decisions.is_empty()) {
                writeln!(f)?;
            }
        }
        for result in &self.results {
            write!(f, "{}", result)?;
        }
        for note in &self.notes {
            writeln!(f, "{}", note)?;
        }
        Ok(())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Ok(analysis) => write!(f, "{}", analysis),
            Err(e) if e.is_configuration() => write!(f, "{}", e),
            Err(e) => write!(f, "{}: {}", self.kind.heading(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::PairwiseComparison;
    use crate::results::{Decision, MeanDifference};
    use crate::StatsError;

    #[test]
    fn test_format_sig_matches_c() {
        assert_eq!(format_sig(3.086975, 3), "3.09");
        assert_eq!(format_sig(-1.897367, 3), "-1.9");
        assert_eq!(format_sig(0.023339, 3), "0.0233");
        assert_eq!(format_sig(100.0, 3), "100");
        assert_eq!(format_sig(1.0, 3), "1");
        assert_eq!(format_sig(0.0, 3), "0");
        assert_eq!(format_sig(0.0001, 3), "0.0001");
        assert_eq!(format_sig(1234.5, 3), "1.23e+03");
        assert_eq!(format_sig(999.6, 3), "1e+03");
        assert_eq!(format_sig(0.00001234, 3), "1.23e-05");
        assert_eq!(format_sig(f64::NAN, 3), "nan");
    }

    #[test]
    fn test_print_p() {
        assert_eq!(print_p(0.036682), "<i>p</i> = .037");
        assert_eq!(print_p(0.0005), "<i>p</i> < .001");
        assert_eq!(print_p(0.5), "<i>p</i> = .500");
        assert_eq!(print_p(1.0), "<i>p</i> = 1.000");
    }

    #[test]
    fn test_precision() {
        assert_eq!(precision(&[1.0, 2.5, 3.25]), 2);
        assert_eq!(precision(&[3.0, f64::NAN, 7.0]), 0);
        assert_eq!(precision(&[]), 0);
    }

    #[test]
    fn test_result_line() {
        let r = TestResult::new(TestKind::PairedT, 3.086975, 0.036682).with_df([Dof::Exact(4)]);
        assert_eq!(
            r.to_string(),
            "Result of paired samples t-test: <i>t</i>(4) = 3.09, <i>p</i> = .037\n"
        );

        let r = TestResult::new(TestKind::Friedman, 8.0, 0.018).with_df([Dof::Exact(2)]).with_n(4);
        assert_eq!(
            r.to_string(),
            "Result of the Friedman test: &chi;<sup>2</sup>(2, <i>N</i> = 4) = 8, <i>p</i> = .018\n"
        );
    }

    #[test]
    fn test_term_labels() {
        let main = TestResult::new(TestKind::TwoWayAnova, 1.0, 0.5).with_term(vec!["A".into()]);
        assert_eq!(main.label(), "Main effect of A");
        let inter = TestResult::new(TestKind::TwoWayAnova, 1.0, 0.5)
            .with_term(vec!["A".into(), "B".into()]);
        assert_eq!(inter.label(), "Interaction of A and B");
        let rm = TestResult::new(TestKind::RepeatedMeasuresAnova, 1.0, 0.5)
            .with_term(vec!["A".into(), "B".into()]);
        assert_eq!(rm.label(), "Interaction of factors A, B");
        let slope = TestResult::new(TestKind::SlopeTest, 1.0, 0.5)
            .with_method_note("Crawford-Howell test");
        assert_eq!(slope.label(), "Result of slope test with Crawford-Howell test");
    }

    #[test]
    fn test_sphericity_rendering() {
        let mut f_row = TestResult::new(TestKind::RepeatedMeasuresAnova, 1.208991, 0.322053)
            .with_df([Dof::Approx(1.011808), Dof::Approx(5.05904)]);
        f_row.decisions.push(Decision::SphericityViolated);
        let analysis = Analysis {
            assumption: Some(TestResult::new(TestKind::Mauchly, 0.023339, 0.000545)),
            ..Analysis::single(f_row)
        };
        assert_eq!(
            analysis.to_string(),
            "Result of Mauchly's test to check sphericity: <i>W</i> = 0.0233, <i>p</i> < .001.\n\
             <decision>Sphericity is violated. >> Using Greenhouse-Geisser correction.\n\
             <default>Result of repeated measures ANOVA: <i>F</i>(1.01, 5.06) = 1.21, <i>p</i> = .322\n"
        );
    }

    #[test]
    fn test_pairwise_table() {
        let post_hoc = PostHoc::Pairwise(vec![LabelledComparison {
            first: "a".into(),
            second: "b".into(),
            comparison: PairwiseComparison {
                first: 0,
                second: 1,
                statistic: -4.5,
                p_value: 0.01,
                p_adjusted: 0.03,
            },
        }]);
        let text = post_hoc.to_string();
        assert!(text.contains("Holm-Bonferroni"));
        assert!(text.contains("<table class=\"table_cs_pd\">"));
        assert!(text.contains("<th>a - b</th>"));
        assert!(text.contains("<td><i>t</i> = -4.5, <i>p</i> = .030</td>"));
    }

    #[test]
    fn test_matrix_table() {
        let post_hoc = PostHoc::Matrix {
            labels: vec!["1".into(), "2".into()],
            p_values: vec![vec![1.0, 0.1797], vec![0.1797, 1.0]],
        };
        let text = post_hoc.to_string();
        assert!(text.contains("Dunn's test"));
        assert!(text.contains("<thead>"));
        assert!(text.contains("<td>0.180</td>"));
        assert!(text.contains("<th>2</th>"));
    }

    #[test]
    fn test_estimate_and_power_lines() {
        let analysis = Analysis {
            power: Some(crate::results::PowerAnalysis { effect_size: 1.6236 }),
            estimate: Some(MeanDifference {
                difference: -1.2,
                lower: -2.65,
                upper: 0.25,
                decimals: 2,
            }),
            ..Analysis::single(TestResult::new(TestKind::IndependentT, -1.9, 0.094).with_df([Dof::Exact(8)]))
        };
        let text = analysis.to_string();
        assert!(text.starts_with("Sensitivity power analysis."));
        assert!(text.contains("(effect size is in d): 1.62\n"));
        assert!(text.contains("Difference between the two groups: -1.20, 95% confidence interval [-2.65, 0.25]\n"));
        assert!(text.ends_with("<i>t</i>(8) = -1.9, <i>p</i> = .094\n"));
    }

    #[test]
    fn test_report_errors() {
        let config = Report::new(
            TestKind::PairedT,
            Err(StatsError::Arity("Paired t-test requires two variables.".into())),
        );
        assert_eq!(config.to_string(), "Paired t-test requires two variables.");

        let provider = Report::new(
            TestKind::MannWhitney,
            Err(StatsError::Provider("All numbers are identical in Mann-Whitney U test".into())),
        );
        assert_eq!(
            provider.to_string(),
            "Result of independent samples Mann-Whitney rank test: All numbers are identical in Mann-Whitney U test"
        );
    }
}
