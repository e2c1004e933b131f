//! The relational intermediate of the evaluator: named columns over rows of
//! strings.
//!
//! A fresh table is the identity for [`ResultTable::merge`]; once a table
//! has columns, an empty row set means the constraints so far are
//! unsatisfiable. Tables are moved into `merge`, never copied.

use std::collections::{HashMap, HashSet};

/// A named-column relation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    columns: Vec<String>,
    col_index: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
    initialized: bool,
}

impl ResultTable {
    /// The identity table: merging it with any table yields the other table.
    pub fn new() -> Self {
        Self::default()
    }

    /// A single-column table.
    pub fn from_column(name: impl Into<String>, values: Vec<String>) -> Self {
        let name = name.into();
        Self::from_columns(vec![name], values.into_iter().map(|v| vec![v]).collect())
    }

    /// A table with the given columns and rows. Every row must have one cell
    /// per column.
    pub fn from_columns(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        let col_index = columns
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, c)| (c, i))
            .collect();
        Self {
            columns,
            col_index,
            rows,
            initialized: true,
        }
    }

    /// Whether the table has columns but no satisfying rows.
    pub fn is_empty(&self) -> bool {
        self.initialized && self.rows.is_empty()
    }

    /// Whether the table is still the merge identity.
    pub fn is_identity(&self) -> bool {
        !self.initialized
    }

    /// Column membership.
    pub fn contains_column(&self, name: &str) -> bool {
        self.col_index.contains_key(name)
    }

    /// The column names, in insertion order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Natural join on shared column names; a Cartesian product when no
    /// column is shared. Consumes both operands.
    pub fn merge(self, other: ResultTable) -> ResultTable {
        if !self.initialized {
            return other;
        }
        if !other.initialized {
            return self;
        }

        let shared: Vec<String> = self
            .columns
            .iter()
            .filter(|c| other.contains_column(c))
            .cloned()
            .collect();

        let other_extra: Vec<usize> = (0..other.columns.len())
            .filter(|i| !self.contains_column(&other.columns[*i]))
            .collect();

        let mut columns = self.columns.clone();
        columns.extend(other_extra.iter().map(|i| other.columns[*i].clone()));

        let mut rows = Vec::new();
        if shared.is_empty() {
            for left in &self.rows {
                for right in &other.rows {
                    let mut row = left.clone();
                    row.extend(other_extra.iter().map(|i| right[*i].clone()));
                    rows.push(row);
                }
            }
        } else {
            // Hash join: bucket the right rows by their shared-column key.
            let left_key_cols: Vec<usize> = shared.iter().map(|c| self.col_index[c]).collect();
            let right_key_cols: Vec<usize> = shared.iter().map(|c| other.col_index[c]).collect();

            let mut buckets: HashMap<Vec<&str>, Vec<&Vec<String>>> = HashMap::new();
            for right in &other.rows {
                let key: Vec<&str> = right_key_cols.iter().map(|i| right[*i].as_str()).collect();
                buckets.entry(key).or_default().push(right);
            }

            for left in &self.rows {
                let key: Vec<&str> = left_key_cols.iter().map(|i| left[*i].as_str()).collect();
                if let Some(matches) = buckets.get(&key) {
                    for right in matches {
                        let mut row = left.clone();
                        row.extend(other_extra.iter().map(|i| right[*i].clone()));
                        rows.push(row);
                    }
                }
            }
        }

        ResultTable::from_columns(columns, rows)
    }

    /// The distinct values of one column, in row order. Empty when the
    /// column is absent.
    pub fn column_values(&self, name: &str) -> Vec<String> {
        let Some(&idx) = self.col_index.get(name) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .map(|r| r[idx].clone())
            .filter(|v| seen.insert(v.clone()))
            .collect()
    }

    /// Project rows to the requested columns, in that order, keeping
    /// duplicates. Requested columns must all be present.
    pub fn project(&self, columns: &[String]) -> Vec<Vec<String>> {
        let indices: Vec<usize> = columns
            .iter()
            .filter_map(|c| self.col_index.get(c).copied())
            .collect();
        debug_assert_eq!(indices.len(), columns.len());
        self.rows
            .iter()
            .map(|r| indices.iter().map(|i| r[*i].clone()).collect())
            .collect()
    }

    /// Like [`ResultTable::project`] but with duplicate rows removed,
    /// preserving first-occurrence order.
    pub fn project_distinct(&self, columns: &[String]) -> Vec<Vec<String>> {
        let mut seen = HashSet::new();
        self.project(columns)
            .into_iter()
            .filter(|row| seen.insert(row.clone()))
            .collect()
    }

    /// Remove a column, keeping the remaining cells in place.
    pub fn drop_column(&mut self, name: &str) {
        let Some(idx) = self.col_index.remove(name) else {
            return;
        };
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        self.col_index = self
            .columns
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, c)| (c, i))
            .collect();
    }

    /// Deduplicate rows, preserving first-occurrence order. Useful after
    /// dropping columns.
    pub fn compact(&mut self) {
        let mut seen = HashSet::new();
        self.rows.retain(|row| seen.insert(row.clone()));
    }
}
