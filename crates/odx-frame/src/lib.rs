//! Columnar, nullable, string-typed table used to move data between the
//! ingest, rule, validation, and emit stages of an export.
//!
//! Every cell is `Option<String>`. There is no numeric/date/bool storage
//! tier — normalization and typing happen at the edges (ingest parsing,
//! normalizer calls, CSV emission), not inside the frame itself.

mod error;

pub use error::FrameError;

use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct TabularFrame {
    headers: Vec<String>,
    columns: Vec<Vec<Option<String>>>,
}

impl TabularFrame {
    /// Build a frame from row-major data. Rows shorter than `headers` are
    /// padded with `None`; longer rows are truncated — mirroring the
    /// teacher CSV backend's ragged-row tolerance.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let width = headers.len();
        let mut columns: Vec<Vec<Option<String>>> = vec![Vec::with_capacity(rows.len()); width];
        for row in rows {
            for (i, column) in columns.iter_mut().enumerate() {
                column.push(row.get(i).cloned().unwrap_or(None));
            }
        }
        Self { headers, columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.headers
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, column: &str, row: usize) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.columns[idx].get(row)?.as_deref()
    }

    /// Replace every `None` in `column` with `default`. No-op if the column
    /// doesn't exist.
    pub fn fill_null(&mut self, column: &str, default: &str) {
        if let Some(idx) = self.column_index(column) {
            for cell in self.columns[idx].iter_mut() {
                if cell.is_none() {
                    *cell = Some(default.to_string());
                }
            }
        }
    }

    /// Add `name` as a new column, or overwrite it if it already exists.
    /// `values` must have exactly [`Self::len`] entries.
    pub fn with_column(&mut self, name: &str, values: Vec<Option<String>>) {
        debug_assert_eq!(values.len(), self.len(), "with_column length mismatch");
        match self.column_index(name) {
            Some(idx) => self.columns[idx] = values,
            None => {
                self.headers.push(name.to_string());
                self.columns.push(values);
            }
        }
    }

    pub fn rename(&mut self, from: &str, to: &str) -> Result<(), FrameError> {
        let idx = self
            .column_index(from)
            .ok_or_else(|| FrameError::UnknownColumn(from.to_string()))?;
        self.headers[idx] = to.to_string();
        Ok(())
    }

    /// Select and reorder columns to exactly `columns`, adding missing ones
    /// as all-null.
    pub fn select(&self, columns: &[&str]) -> TabularFrame {
        let height = self.len();
        let mut out = TabularFrame {
            headers: columns.iter().map(|c| c.to_string()).collect(),
            columns: Vec::with_capacity(columns.len()),
        };
        for name in columns {
            let column = match self.column_index(name) {
                Some(idx) => self.columns[idx].clone(),
                None => vec![None; height],
            };
            out.columns.push(column);
        }
        out
    }

    /// Keep only the given row indices, in the given order, across every
    /// column.
    pub fn select_rows(&self, rows: &[usize]) -> TabularFrame {
        TabularFrame {
            headers: self.headers.clone(),
            columns: self
                .columns
                .iter()
                .map(|col| rows.iter().map(|&r| col[r].clone()).collect())
                .collect(),
        }
    }

    /// Coerce every column to plain text: for this string-only frame, the
    /// only observable effect is replacing every remaining `None` with `""`.
    pub fn cast_to_text(&mut self) {
        for column in self.columns.iter_mut() {
            for cell in column.iter_mut() {
                if cell.is_none() {
                    *cell = Some(String::new());
                }
            }
        }
    }

    /// Stable ascending sort by `column`'s text value. `None` sorts before
    /// every `Some`.
    pub fn sort_by(&mut self, column: &str) -> Result<(), FrameError> {
        let idx = self
            .column_index(column)
            .ok_or_else(|| FrameError::UnknownColumn(column.to_string()))?;
        let mut order: Vec<usize> = (0..self.len()).collect();
        let key = &self.columns[idx];
        order.sort_by(|&a, &b| key[a].cmp(&key[b]));

        for column in self.columns.iter_mut() {
            let reordered: Vec<Option<String>> = order.iter().map(|&i| column[i].clone()).collect();
            *column = reordered;
        }
        Ok(())
    }

    /// Each row as a name -> value map, omitting columns that are null for
    /// that row. Used by the rule engine, which treats a missing key and a
    /// null cell identically.
    pub fn iter_rows_named(&self) -> impl Iterator<Item = BTreeMap<String, String>> + '_ {
        (0..self.len()).map(move |row| {
            self.headers
                .iter()
                .enumerate()
                .filter_map(|(idx, name)| {
                    self.columns[idx][row]
                        .as_ref()
                        .map(|v| (name.clone(), v.clone()))
                })
                .collect()
        })
    }

    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self, FrameError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let row: Vec<Option<String>> = record
                .iter()
                .map(|field| if field.is_empty() { None } else { Some(field.to_string()) })
                .collect();
            rows.push(row);
        }
        Ok(Self::from_rows(headers, rows))
    }

    /// Write UTF-8, LF-terminated, comma-separated CSV with minimal quoting,
    /// then verify the header line was written exactly as expected.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), FrameError> {
        let mut buffer = Vec::new();
        {
            let mut writer = csv::WriterBuilder::new()
                .delimiter(b',')
                .terminator(csv::Terminator::Any(b'\n'))
                .quote_style(csv::QuoteStyle::Necessary)
                .from_writer(&mut buffer);
            writer.write_record(&self.headers)?;
            for row in 0..self.len() {
                let record: Vec<&str> = self
                    .columns
                    .iter()
                    .map(|col| col[row].as_deref().unwrap_or(""))
                    .collect();
                writer.write_record(record)?;
            }
            writer.flush()?;
        }

        let expected_header = self.headers.join(",");
        let written_header = buffer
            .split(|&b| b == b'\n')
            .next()
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .unwrap_or_default();
        if written_header != expected_header {
            return Err(FrameError::HeaderMismatch {
                written: written_header,
                expected: expected_header,
            });
        }

        let mut file = std::fs::File::create(path)?;
        file.write_all(&buffer)?;
        Ok(())
    }
}
