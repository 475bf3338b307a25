//! hyptest-core: classical hypothesis tests on tabular data
//!
//! This crate provides paired and independent group comparisons, rank
//! tests, repeated measures and factorial ANOVA with post-hoc procedures,
//! and renders every result as marked-up text for a host statistics
//! application (via FFI in hyptest-ffi).

pub mod errors;
pub mod numeric;
pub mod report;
pub mod results;
pub mod tests;
pub mod types;

pub use errors::{StatsError, StatsResult};
pub use numeric::{NumericProvider, DefaultProvider};
pub use results::{Analysis, Report, TestKind, TestResult};
pub use tests::{HypothesisTests, TwoGroupTest, SIGNIFICANCE_LEVEL};
pub use types::*;
