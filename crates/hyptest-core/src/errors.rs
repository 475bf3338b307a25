use thiserror::Error;

/// Errors that can occur while preparing or running a hypothesis test
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    // Configuration errors
    #[error("{0}")]
    Arity(String),

    #[error("Factor levels multiply to {expected} cells but {actual} variables were given")]
    FactorMismatch { expected: usize, actual: usize },

    #[error("Factor {name} needs at least 2 levels, got {levels}")]
    InvalidFactor { name: String, levels: usize },

    #[error("Unknown variable: {0}")]
    UnknownColumn(String),

    #[error("Duplicate variable: {0}")]
    DuplicateColumn(String),

    #[error("Column {name} has {len} rows, expected {expected}")]
    RaggedColumn {
        name: String,
        len: usize,
        expected: usize,
    },

    // Data errors
    #[error("All rows filtered due to missing values")]
    NoValidData,

    #[error("{0}")]
    InsufficientDataMsg(String),

    #[error("{0}")]
    InvalidInput(String),

    // Numerical errors
    #[error("Matrix is singular or near-singular")]
    SingularMatrix,

    #[error("{0}")]
    Provider(String),
}

impl StatsError {
    /// Configuration errors are reported on their own, without a test heading.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            StatsError::Arity(_)
                | StatsError::FactorMismatch { .. }
                | StatsError::InvalidFactor { .. }
                | StatsError::UnknownColumn(_)
                | StatsError::DuplicateColumn(_)
                | StatsError::RaggedColumn { .. }
        )
    }
}

/// Result type for statistical operations
pub type StatsResult<T> = Result<T, StatsError>;
