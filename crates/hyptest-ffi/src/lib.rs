//! C FFI boundary for hyptest
//!
//! The host passes its table as named, validity-masked columns and gets the
//! rendered report back as a NUL-terminated string allocated with `malloc`.
//! Reports must be released with [`hyptest_free_report`].

mod types;

pub use types::*;

use hyptest_core::{Dataset, Factor, HypothesisTests, Report, StatsError, TestOptions};
use libc::c_char;
use std::ffi::CStr;
use std::slice;

/// Convert StatsError to ErrorCode
fn error_to_code(err: &StatsError) -> ErrorCode {
    if err.is_configuration() {
        return ErrorCode::Configuration;
    }
    match err {
        StatsError::NoValidData => ErrorCode::NoValidData,
        StatsError::InsufficientDataMsg(_) => ErrorCode::InsufficientData,
        StatsError::InvalidInput(_) => ErrorCode::InvalidInput,
        StatsError::SingularMatrix => ErrorCode::SingularMatrix,
        _ => ErrorCode::ComputationError,
    }
}

/// Copy a string into a malloc'd, NUL-terminated buffer
unsafe fn alloc_string(s: &str) -> *mut c_char {
    let len = s.len() + 1;
    let ptr = libc::malloc(len) as *mut c_char;
    if !ptr.is_null() {
        std::ptr::copy_nonoverlapping(s.as_ptr(), ptr as *mut u8, s.len());
        *ptr.add(s.len()) = 0;
    }
    ptr
}

unsafe fn read_str<'a>(ptr: *const c_char, what: &str) -> Result<&'a str, String> {
    if ptr.is_null() {
        return Err(format!("{} is NULL", what));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| format!("{} is not valid UTF-8", what))
}

unsafe fn read_strs<'a>(ptrs: *const *const c_char, count: usize, what: &str) -> Result<Vec<&'a str>, String> {
    if ptrs.is_null() {
        return if count == 0 {
            Ok(Vec::new())
        } else {
            Err(format!("{} is NULL", what))
        };
    }
    slice::from_raw_parts(ptrs, count)
        .iter()
        .map(|&p| read_str(p, what))
        .collect()
}

unsafe fn read_dataset(columns: *const NamedColumn, column_count: usize) -> Result<Dataset, String> {
    if columns.is_null() || column_count == 0 {
        return Err("columns is NULL or empty".into());
    }
    let mut dataset = Dataset::new();
    for column in slice::from_raw_parts(columns, column_count) {
        let name = read_str(column.name, "column name")?;
        dataset
            .push_column(name, column.values.to_vec())
            .map_err(|e| e.to_string())?;
    }
    Ok(dataset)
}

unsafe fn read_factors(factors: *const FactorSpec, factor_count: usize) -> Result<Vec<Factor>, String> {
    if factors.is_null() || factor_count == 0 {
        return Ok(Vec::new());
    }
    slice::from_raw_parts(factors, factor_count)
        .iter()
        .map(|f| -> Result<Factor, String> { Ok(Factor::new(read_str(f.name, "factor name")?, f.levels)) })
        .collect()
}

/// Render the report, run under `catch_unwind`, and record its status
unsafe fn finish<F>(run: F, out_error: *mut HyptestError) -> *mut c_char
where
    F: FnOnce() -> Result<Report, String>,
{
    let outcome = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(run)) {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::error!("panic while running hypothesis test");
            if !out_error.is_null() {
                (*out_error).set(ErrorCode::InternalError, "Internal panic in hypothesis test");
            }
            return std::ptr::null_mut();
        }
    };

    let report = match outcome {
        Ok(report) => report,
        Err(msg) => {
            if !out_error.is_null() {
                (*out_error).set(ErrorCode::InvalidInput, &msg);
            }
            return std::ptr::null_mut();
        }
    };

    // the report text is returned even when the test itself failed
    if let (Some(err), false) = (report.error(), out_error.is_null()) {
        (*out_error).set(error_to_code(err), &err.to_string());
    }
    let text = alloc_string(&report.to_string());
    if text.is_null() && !out_error.is_null() {
        (*out_error).set(ErrorCode::AllocationFailure, "Failed to allocate report");
    }
    text
}

/// Compare variables measured on the same cases
///
/// `factors` is only used by the repeated measures ANOVA and may be NULL.
///
/// # Safety
/// - `columns` must point to `column_count` valid NamedColumn structs
/// - `var_names` must point to `var_count` NUL-terminated strings
/// - `factors` must be NULL or point to `factor_count` valid FactorSpec structs
/// - `out_error` must be NULL or a valid pointer
///
/// # Returns
/// The report text (free with `hyptest_free_report`), or NULL when the
/// arguments could not be read. A failed test still returns its text; the
/// failure is recorded in `out_error`.
#[no_mangle]
pub unsafe extern "C" fn hyptest_compare_variables(
    columns: *const NamedColumn,
    column_count: usize,
    var_names: *const *const c_char,
    var_count: usize,
    factors: *const FactorSpec,
    factor_count: usize,
    test: VariablesTestFFI,
    options: TestOptionsFFI,
    out_error: *mut HyptestError,
) -> *mut c_char {
    if !out_error.is_null() {
        *out_error = HyptestError::success();
    }

    finish(
        || {
            let data = read_dataset(columns, column_count)?;
            let names = read_strs(var_names, var_count, "variable name")?;
            let factors = read_factors(factors, factor_count)?;
            let tests = HypothesisTests::new(TestOptions {
                run_power_analysis: options.run_power_analysis,
            });

            Ok(match test {
                VariablesTestFFI::PairedT => tests.paired_t_test(&data, &names),
                VariablesTestFFI::PairedWilcoxon => tests.paired_wilcox_test(&data, &names),
                VariablesTestFFI::McNemar => tests.mcnemar_test(&data, &names),
                VariablesTestFFI::CochranQ => tests.cochran_q_test(&data, &names),
                VariablesTestFFI::Friedman => tests.friedman_test(&data, &names),
                VariablesTestFFI::RepeatedMeasuresAnova => {
                    tests.repeated_measures_anova(&data, &names, &factors)
                }
            })
        },
        out_error,
    )
}

/// Compare independent groups on one dependent variable
///
/// Every test uses the first grouping variable, except the two-way ANOVA
/// which uses both.
///
/// # Safety
/// - `columns` must point to `column_count` valid NamedColumn structs
/// - `var_name` must be a NUL-terminated string
/// - `group_names` must point to `group_count` NUL-terminated strings
/// - `out_error` must be NULL or a valid pointer
///
/// # Returns
/// See `hyptest_compare_variables`.
#[no_mangle]
pub unsafe extern "C" fn hyptest_compare_groups(
    columns: *const NamedColumn,
    column_count: usize,
    var_name: *const c_char,
    group_names: *const *const c_char,
    group_count: usize,
    test: GroupsTestFFI,
    options: TestOptionsFFI,
    out_error: *mut HyptestError,
) -> *mut c_char {
    if !out_error.is_null() {
        *out_error = HyptestError::success();
    }

    finish(
        || {
            let data = read_dataset(columns, column_count)?;
            let var_name = read_str(var_name, "variable name")?;
            let groups = read_strs(group_names, group_count, "grouping variable name")?;
            let first = *groups
                .first()
                .ok_or_else(|| "group_names is empty".to_string())?;
            let tests = HypothesisTests::new(TestOptions {
                run_power_analysis: options.run_power_analysis,
            });

            Ok(match test {
                GroupsTestFFI::IndependentT => tests.independent_t_test(&data, var_name, first),
                GroupsTestFFI::WelchT => tests.welch_t_test(&data, var_name, first),
                GroupsTestFFI::MannWhitney => tests.mann_whitney_test(&data, var_name, first),
                GroupsTestFFI::KruskalWallis => tests.kruskal_wallis_test(&data, var_name, first),
                GroupsTestFFI::Levene => tests.levene_test(&data, var_name, first),
                GroupsTestFFI::TwoWayAnova => tests.two_way_anova(&data, var_name, &groups),
            })
        },
        out_error,
    )
}

/// Free a report returned by this library
///
/// # Safety
/// - `report` must be NULL or a pointer returned by a `hyptest_*` function
#[no_mangle]
pub unsafe extern "C" fn hyptest_free_report(report: *mut c_char) {
    if !report.is_null() {
        libc::free(report as *mut libc::c_void);
    }
}

/// Get library version string
#[no_mangle]
pub extern "C" fn hyptest_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}
