//! Structured results of a hypothesis test call
//!
//! Every dispatcher method returns a [`Report`]. Its [`Analysis`] holds the
//! numbers in render order; `Display` (in `report`) turns it into text.

use crate::numeric::PairwiseComparison;
use crate::StatsError;

/// Test identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestKind {
    PairedT,
    Wilcoxon,
    McNemar,
    CochranQ,
    Mauchly,
    RepeatedMeasuresAnova,
    Friedman,
    Levene,
    IndependentT,
    WelchT,
    MannWhitney,
    KruskalWallis,
    TwoWayAnova,
    ModifiedT,
    SlopeTest,
}

impl TestKind {
    /// Text that introduces the result of this test
    pub fn heading(&self) -> &'static str {
        match self {
            TestKind::PairedT => "Result of paired samples t-test",
            TestKind::Wilcoxon => "Result of Wilcoxon signed-rank test",
            TestKind::McNemar => "Result of the McNemar test",
            TestKind::CochranQ => "Result of Cochran's Q test",
            TestKind::Mauchly => "Result of Mauchly's test to check sphericity",
            TestKind::RepeatedMeasuresAnova => "Result of repeated measures ANOVA",
            TestKind::Friedman => "Result of the Friedman test",
            TestKind::Levene => "Levene test",
            TestKind::IndependentT => "Result of independent samples t-test",
            TestKind::WelchT => "Result of Welch's unequal variances t-test",
            TestKind::MannWhitney => "Result of independent samples Mann-Whitney rank test",
            TestKind::KruskalWallis => "Result of the Kruskal-Wallis test",
            TestKind::TwoWayAnova => "Result of two-way ANOVA",
            TestKind::ModifiedT => "Result of the modified independent samples t-test",
            TestKind::SlopeTest => "Result of slope test",
        }
    }

    pub fn symbol(&self) -> Symbol {
        match self {
            TestKind::PairedT
            | TestKind::IndependentT
            | TestKind::WelchT
            | TestKind::ModifiedT
            | TestKind::SlopeTest => Symbol::T,
            TestKind::Wilcoxon => Symbol::SignedRankT,
            TestKind::McNemar | TestKind::Friedman | TestKind::KruskalWallis => Symbol::ChiSquare,
            TestKind::CochranQ => Symbol::Q,
            TestKind::Mauchly | TestKind::Levene => Symbol::W,
            TestKind::RepeatedMeasuresAnova | TestKind::TwoWayAnova => Symbol::F,
            TestKind::MannWhitney => Symbol::U,
        }
    }
}

/// Statistic symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    T,
    /// Wilcoxon's T
    SignedRankT,
    U,
    W,
    Q,
    F,
    ChiSquare,
}

impl Symbol {
    /// Markup for the symbol
    pub fn markup(&self) -> &'static str {
        match self {
            Symbol::T => "<i>t</i>",
            Symbol::SignedRankT => "<i>T</i>",
            Symbol::U => "<i>U</i>",
            Symbol::W => "<i>W</i>",
            Symbol::Q => "<i>Q</i>",
            Symbol::F => "<i>F</i>",
            Symbol::ChiSquare => "&chi;<sup>2</sup>",
        }
    }
}

/// One degrees-of-freedom value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dof {
    /// Integer df, printed as is
    Exact(usize),
    /// Corrected or estimated df, printed to 3 significant digits
    Approx(f64),
}

impl Dof {
    pub fn value(&self) -> f64 {
        match self {
            Dof::Exact(v) => *v as f64,
            Dof::Approx(v) => *v,
        }
    }
}

/// Branch taken while choosing a procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    SphericityViolated,
    SphericityNotViolated,
}

impl Decision {
    pub fn text(&self) -> &'static str {
        match self {
            Decision::SphericityViolated => {
                "Sphericity is violated. >> Using Greenhouse-Geisser correction."
            }
            Decision::SphericityNotViolated => "Sphericity is not violated.",
        }
    }
}

/// Pairwise comparison labelled with the variable names it compares
#[derive(Debug, Clone, PartialEq)]
pub struct LabelledComparison {
    pub first: String,
    pub second: String,
    pub comparison: PairwiseComparison,
}

/// Result of a post-hoc procedure
#[derive(Debug, Clone, PartialEq)]
pub enum PostHoc {
    /// Holm-Bonferroni corrected paired t-tests, in comparison-index order
    Pairwise(Vec<LabelledComparison>),
    /// Symmetric matrix of p-values between groups, diagonal 1
    Matrix {
        labels: Vec<String>,
        p_values: Vec<Vec<f64>>,
    },
}

/// One reported test
#[derive(Debug, Clone, PartialEq)]
pub struct TestResult {
    /// Test identifier
    pub kind: TestKind,
    /// Factor names of an ANOVA term (one name for a main effect)
    pub term: Option<Vec<String>>,
    /// Procedure chosen at run time, e.g. the slope test variant
    pub method_note: Option<String>,
    /// Test statistic (t, T, U, W, Q, F or chi-square)
    pub statistic: f64,
    /// Degrees of freedom, empty for statistics without df
    pub df: Vec<Dof>,
    /// Number of cases, for tests that report it next to df
    pub n: Option<usize>,
    /// p-value
    pub p_value: f64,
    /// Narrative of the branches taken, rendered before the result
    pub decisions: Vec<Decision>,
    pub post_hoc: Option<PostHoc>,
}

impl TestResult {
    pub fn new(kind: TestKind, statistic: f64, p_value: f64) -> Self {
        Self {
            kind,
            term: None,
            method_note: None,
            statistic,
            df: Vec::new(),
            n: None,
            p_value,
            decisions: Vec::new(),
            post_hoc: None,
        }
    }

    pub fn with_df(mut self, df: impl IntoIterator<Item = Dof>) -> Self {
        self.df = df.into_iter().collect();
        self
    }

    pub fn with_n(mut self, n: usize) -> Self {
        self.n = Some(n);
        self
    }

    pub fn with_term(mut self, names: Vec<String>) -> Self {
        self.term = Some(names);
        self
    }

    pub fn with_method_note(mut self, note: impl Into<String>) -> Self {
        self.method_note = Some(note.into());
        self
    }

    pub fn symbol(&self) -> Symbol {
        self.kind.symbol()
    }
}

/// Mean difference of two groups with its 95% confidence interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanDifference {
    pub difference: f64,
    pub lower: f64,
    pub upper: f64,
    /// Decimals to print, one more than the resolution of the data
    pub decimals: usize,
}

/// Sensitivity power analysis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerAnalysis {
    /// Minimal Cohen's d reaching 95% power at alpha = .05
    pub effect_size: f64,
}

/// Everything one dispatcher call produces, in render order
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// Line printed above the result rows
    pub heading: Option<String>,
    pub power: Option<PowerAnalysis>,
    pub estimate: Option<MeanDifference>,
    /// Assumption check run before the main test
    pub assumption: Option<TestResult>,
    pub results: Vec<TestResult>,
    /// Documented limitations of this analysis
    pub notes: Vec<String>,
}

impl Analysis {
    pub fn single(result: TestResult) -> Self {
        Self {
            heading: None,
            power: None,
            estimate: None,
            assumption: None,
            results: vec![result],
            notes: Vec::new(),
        }
    }

    /// The main result, if exactly one was produced
    pub fn result(&self) -> Option<&TestResult> {
        match self.results.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

/// Outcome of one dispatcher call
///
/// Formatting a report always yields text: the rendered analysis, or the
/// error message (prefixed with the test heading unless it is a
/// configuration error).
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub kind: TestKind,
    pub outcome: Result<Analysis, StatsError>,
}

impl Report {
    pub fn new(kind: TestKind, outcome: Result<Analysis, StatsError>) -> Self {
        Self { kind, outcome }
    }

    pub fn analysis(&self) -> Option<&Analysis> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&StatsError> {
        self.outcome.as_ref().err()
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}
