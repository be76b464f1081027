//! The in-memory tabular artifact.
//!
//! A [`Table`] is the working representation inside the extract and
//! transform stages: a header row plus ordered data rows, read from and
//! materialized to comma-separated text. Missing values are empty cells.

use crate::errors::StageError;
use csv::{ReaderBuilder, WriterBuilder};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// An in-memory table with named columns and an ordered collection of rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Creates a table from headers and rows.
    ///
    /// Rows are padded or truncated to the header width so every cell is
    /// addressable by column index.
    #[must_use]
    pub fn new(headers: Vec<String>, mut rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        for row in &mut rows {
            row.resize(width, String::new());
        }
        Self { headers, rows }
    }

    /// Reads a table from a comma-separated file with a header row.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsed.
    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self, StageError> {
        let file = File::open(path.as_ref())?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self::new(headers, rows))
    }

    /// Materializes the table to a comma-separated file with a header row,
    /// overwriting any existing file. The writer is flushed before
    /// returning, so a successful return means the bytes are on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), StageError> {
        let file = File::create(path.as_ref())?;
        let mut writer = WriterBuilder::new().from_writer(file);

        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Returns the column names.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Returns the number of data rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Returns the index of the named column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Returns the cell at `(row, column)`, if present. An empty cell is a
    /// missing value.
    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(column)).map(String::as_str)
    }

    /// Drops the named columns where present. Absent names are ignored; the
    /// projection is best-effort.
    pub fn drop_columns(&mut self, names: &[&str]) {
        let drop_indices: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| names.contains(&h.as_str()))
            .map(|(i, _)| i)
            .collect();

        if drop_indices.is_empty() {
            return;
        }

        let keep = |i: &usize| !drop_indices.contains(i);
        self.headers = self
            .headers
            .iter()
            .enumerate()
            .filter(|(i, _)| keep(i))
            .map(|(_, h)| h.clone())
            .collect();
        for row in &mut self.rows {
            *row = row
                .iter()
                .enumerate()
                .filter(|(i, _)| keep(i))
                .map(|(_, c)| c.clone())
                .collect();
        }
    }

    /// Computes the median of a numeric column over its non-missing cells.
    ///
    /// The median is recomputed from the currently loaded rows on every
    /// call; nothing is cached across runs.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::TransformComputation`] if the column does not
    /// exist, contains a non-numeric value, or has no non-missing values to
    /// compute from.
    pub fn median(&self, column: &str) -> Result<f64, StageError> {
        let idx = self
            .column_index(column)
            .ok_or_else(|| StageError::transform(column, "column not present"))?;

        let mut values = Vec::new();
        for row in &self.rows {
            let cell = &row[idx];
            if cell.is_empty() {
                continue;
            }
            let value: f64 = cell
                .parse()
                .map_err(|_| StageError::transform(column, format!("non-numeric value '{cell}'")))?;
            values.push(value);
        }

        if values.is_empty() {
            return Err(StageError::transform(column, "no values to compute a median from"));
        }

        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let mid = values.len() / 2;
        if values.len() % 2 == 1 {
            Ok(values[mid])
        } else {
            Ok((values[mid - 1] + values[mid]) / 2.0)
        }
    }

    /// Returns the most frequent non-missing value of a column. Ties are
    /// broken by the value first encountered walking the column top-down.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::TransformComputation`] if the column does not
    /// exist or has no non-missing values.
    pub fn mode(&self, column: &str) -> Result<String, StageError> {
        let idx = self
            .column_index(column)
            .ok_or_else(|| StageError::transform(column, "column not present"))?;

        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut first_seen: HashMap<&str, usize> = HashMap::new();
        for (position, row) in self.rows.iter().enumerate() {
            let cell = row[idx].as_str();
            if cell.is_empty() {
                continue;
            }
            *counts.entry(cell).or_insert(0) += 1;
            first_seen.entry(cell).or_insert(position);
        }

        counts
            .iter()
            .max_by(|(a, count_a), (b, count_b)| {
                count_a
                    .cmp(count_b)
                    .then_with(|| first_seen[*b].cmp(&first_seen[*a]))
            })
            .map(|(value, _)| (*value).to_string())
            .ok_or_else(|| StageError::transform(column, "no values to compute a mode from"))
    }

    /// Replaces every missing cell of `column` with `value`.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::TransformComputation`] if the column does not
    /// exist.
    pub fn fill_missing(&mut self, column: &str, value: &str) -> Result<(), StageError> {
        let idx = self
            .column_index(column)
            .ok_or_else(|| StageError::transform(column, "column not present"))?;

        for row in &mut self.rows {
            if row[idx].is_empty() {
                row[idx] = value.to_string();
            }
        }
        Ok(())
    }

    /// Replaces spaces with underscores in every column name.
    pub fn normalize_headers(&mut self) {
        for header in &mut self.headers {
            *header = header.replace(' ', "_");
        }
    }
}
