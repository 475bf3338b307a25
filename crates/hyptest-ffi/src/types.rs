//! C-compatible types for FFI boundary

use libc::c_char;

/// Error codes for FFI boundary
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    InvalidInput = 1,
    SingularMatrix = 2,
    InsufficientData = 3,
    NoValidData = 4,
    /// Wrong variable count, factor mismatch, unknown or duplicate column
    Configuration = 5,
    /// A numeric routine failed
    ComputationError = 6,
    AllocationFailure = 7,
    InternalError = 99,
}

/// Error information for FFI
#[repr(C)]
pub struct HyptestError {
    pub code: ErrorCode,
    pub message: [c_char; 256],
}

impl HyptestError {
    pub fn success() -> Self {
        Self {
            code: ErrorCode::Success,
            message: [0; 256],
        }
    }

    /// Store `msg`, truncated to 255 bytes at a character boundary
    pub fn set(&mut self, code: ErrorCode, msg: &str) {
        self.code = code;
        let len = msg
            .char_indices()
            .map(|(i, c)| i + c.len_utf8())
            .take_while(|&end| end <= 255)
            .last()
            .unwrap_or(0);
        for (i, &b) in msg.as_bytes()[..len].iter().enumerate() {
            self.message[i] = b as c_char;
        }
        self.message[len] = 0;
    }
}

/// Array of f64 values with validity mask for NULL handling
#[repr(C)]
pub struct DataArray {
    /// Pointer to data values
    pub data: *const f64,
    /// Validity bitmask: bit i is 1 if data[i] is valid, 0 if NULL
    /// Can be NULL if all values are valid
    pub validity: *const u8,
    /// Number of elements
    pub len: usize,
}

impl DataArray {
    /// Check if index i is valid (not NULL)
    ///
    /// # Safety
    /// Caller must ensure index is within bounds
    pub unsafe fn is_valid(&self, i: usize) -> bool {
        if self.validity.is_null() {
            return true;
        }
        ((*self.validity.add(i / 8)) >> (i % 8)) & 1 == 1
    }

    /// Convert to Vec<f64>, NULL entries become missing values (NaN)
    ///
    /// # Safety
    /// Caller must ensure pointers are valid and len is correct
    pub unsafe fn to_vec(&self) -> Vec<f64> {
        if self.data.is_null() {
            return vec![f64::NAN; self.len];
        }
        (0..self.len)
            .map(|i| if self.is_valid(i) { *self.data.add(i) } else { f64::NAN })
            .collect()
    }
}

/// One column of the input table
#[repr(C)]
pub struct NamedColumn {
    /// NUL-terminated UTF-8 column name
    pub name: *const c_char,
    pub values: DataArray,
}

/// Within-subject factor of a repeated measures design
#[repr(C)]
pub struct FactorSpec {
    /// NUL-terminated UTF-8 factor name
    pub name: *const c_char,
    pub levels: usize,
}

/// Test options for FFI
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct TestOptionsFFI {
    /// Add a sensitivity power analysis to t-test reports
    pub run_power_analysis: bool,
}

/// Tests that compare variables measured on the same cases
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariablesTestFFI {
    PairedT = 0,
    PairedWilcoxon = 1,
    McNemar = 2,
    CochranQ = 3,
    Friedman = 4,
    /// Uses the factors when any are given
    RepeatedMeasuresAnova = 5,
}

/// Tests that compare independent groups
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupsTestFFI {
    IndependentT = 0,
    WelchT = 1,
    MannWhitney = 2,
    KruskalWallis = 3,
    Levene = 4,
    /// Needs two grouping variables
    TwoWayAnova = 5,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    fn stored(err: &HyptestError) -> String {
        unsafe { CStr::from_ptr(err.message.as_ptr()) }
            .to_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_set_short_message() {
        let mut err = HyptestError::success();
        err.set(ErrorCode::InvalidInput, "bad input");
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert_eq!(stored(&err), "bad input");
    }

    #[test]
    fn test_set_truncates_at_char_boundary() {
        // two bytes per character: byte 255 falls inside the 128th one
        let msg = "é".repeat(200);
        let mut err = HyptestError::success();
        err.set(ErrorCode::ComputationError, &msg);

        let text = stored(&err);
        assert_eq!(text.len(), 254);
        assert!(text.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_set_keeps_255_ascii_bytes() {
        let mut err = HyptestError::success();
        err.set(ErrorCode::InvalidInput, &"x".repeat(300));
        assert_eq!(stored(&err).len(), 255);
    }
}
