use crate::errors::{StatsError, StatsResult};

/// Rectangular table of named numeric columns
///
/// Missing values are stored as `NaN`. Columns are validated on insertion:
/// every column must have the same number of rows and names must be unique.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dataset from `(name, values)` pairs
    pub fn from_columns<I, S>(columns: I) -> StatsResult<Self>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let mut dataset = Self::new();
        for (name, values) in columns {
            dataset.push_column(name, values)?;
        }
        Ok(dataset)
    }

    /// Append a column
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> StatsResult<()> {
        let name = name.into();
        if self.names.iter().any(|n| *n == name) {
            return Err(StatsError::DuplicateColumn(name));
        }
        if let Some(first) = self.columns.first() {
            if first.len() != values.len() {
                return Err(StatsError::RaggedColumn {
                    name,
                    len: values.len(),
                    expected: first.len(),
                });
            }
        }
        self.names.push(name);
        self.columns.push(values);
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn column(&self, name: &str) -> StatsResult<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
            .ok_or_else(|| StatsError::UnknownColumn(name.to_string()))
    }

    pub fn select(&self, names: &[&str]) -> StatsResult<Vec<&[f64]>> {
        names.iter().map(|name| self.column(name)).collect()
    }

    /// Indices of rows where none of `names` is missing
    pub fn complete_rows(&self, names: &[&str]) -> StatsResult<Vec<usize>> {
        let columns = self.select(names)?;
        Ok((0..self.n_rows())
            .filter(|&row| columns.iter().all(|col| !col[row].is_nan()))
            .collect())
    }

    /// Listwise deletion: the selected columns restricted to complete rows
    pub fn complete_cases(&self, names: &[&str]) -> StatsResult<Vec<Vec<f64>>> {
        let columns = self.select(names)?;
        let rows = self.complete_rows(names)?;
        Ok(columns
            .iter()
            .map(|col| rows.iter().map(|&row| col[row]).collect())
            .collect())
    }

    /// Split `var_name` by the distinct non-missing values of `group_name`
    ///
    /// Levels are sorted ascending. Values of the dependent variable keep
    /// their missing entries; callers drop them per group.
    pub fn split_into_groups(&self, var_name: &str, group_name: &str) -> StatsResult<Vec<Group>> {
        let values = self.column(var_name)?;
        let grouping = self.column(group_name)?;

        let mut levels: Vec<f64> = grouping.iter().copied().filter(|g| !g.is_nan()).collect();
        levels.sort_by(f64::total_cmp);
        levels.dedup();

        Ok(levels
            .into_iter()
            .map(|level| Group {
                label: level_label(level),
                values: grouping
                    .iter()
                    .zip(values)
                    .filter(|(g, _)| **g == level)
                    .map(|(_, v)| *v)
                    .collect(),
            })
            .collect())
    }
}

/// Values of the dependent variable that share one grouping level
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub label: String,
    pub values: Vec<f64>,
}

/// Label used for a grouping level in reports
pub fn level_label(level: f64) -> String {
    format!("{}", level)
}

/// Within-subject factor of a repeated-measures design
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Factor {
    pub name: String,
    pub levels: usize,
}

impl Factor {
    pub fn new(name: impl Into<String>, levels: usize) -> Self {
        Self {
            name: name.into(),
            levels,
        }
    }
}

/// Options shared by every test call
#[derive(Debug, Clone, Default)]
pub struct TestOptions {
    /// Prepend a sensitivity power analysis to t-test reports
    pub run_power_analysis: bool,
}
