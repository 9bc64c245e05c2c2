//! CSV ingest and numeric coercion.
//!
//! This module is responsible for turning a loan-records CSV into a
//! column-major table of optional `f64` values that are safe to model.
//!
//! Design goals:
//! - **Read everything as text first**, then coerce to numeric; cells that do
//!   not parse become missing (and are counted, not fatal)
//! - **Row-level validation** (skip bad rows in lenient mode, but report what happened)
//! - **Strict mode for scoring** so the output row count always matches the input
//! - **Separation of concerns**: no modeling logic here

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use log::{debug, info, warn};

use crate::error::AppError;

/// Rectangular numeric table, column-major.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoanTable {
    pub names: Vec<String>,
    pub columns: Vec<Vec<Option<f64>>>,
}

impl LoanTable {
    pub fn n_rows(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    pub fn n_cols(&self) -> usize {
        self.names.len()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        let name = normalize_header_name(name);
        self.names.iter().position(|n| *n == name)
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.position(name).map(|i| self.columns[i].as_slice())
    }

    /// Remove a column and return its values.
    pub fn take_column(&mut self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.position(name)?;
        self.names.remove(idx);
        Some(self.columns.remove(idx))
    }

    /// Keep only the given rows (in the given order).
    pub fn select_rows(&self, rows: &[usize]) -> LoanTable {
        LoanTable {
            names: self.names.clone(),
            columns: self
                .columns
                .iter()
                .map(|col| rows.iter().map(|&r| col[r]).collect())
                .collect(),
        }
    }

    /// Keep only the given columns (in the given order).
    pub fn select_columns(&self, cols: &[usize]) -> LoanTable {
        LoanTable {
            names: cols.iter().map(|&c| self.names[c].clone()).collect(),
            columns: cols.iter().map(|&c| self.columns[c].clone()).collect(),
        }
    }
}

/// How strictly to treat malformed rows.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub id_column: String,
    /// When set, a malformed row aborts the load instead of being skipped.
    pub strict: bool,
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: identifiers + numeric table + what was dropped or coerced.
#[derive(Debug, Clone)]
pub struct IngestedTable {
    /// Row identifiers (from the id column, or 1-based row numbers if absent).
    pub ids: Vec<String>,
    pub table: LoanTable,
    /// Columns with no numeric content; excluded from `table`.
    pub text_columns: Vec<String>,
    /// Per-column count of non-empty cells that failed numeric coercion.
    pub coerced: Vec<(String, usize)>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl IngestedTable {
    pub fn rows_used(&self) -> usize {
        self.ids.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Cell {
    Missing,
    Value(f64),
    Text,
}

#[derive(Debug, Default)]
struct RawColumn {
    values: Vec<Option<f64>>,
    parsed: usize,
    text: usize,
}

/// Load a loan-records CSV and coerce every non-id column to numeric.
pub fn load_table(path: &Path, opts: &IngestOptions) -> Result<IngestedTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    let ingested = read_table(file, opts)
        .map_err(|e| AppError::new(e.exit_code(), format!("{}: {}", path.display(), e.message())))?;

    info!(
        "Loaded {}: {} rows x {} numeric columns ({} rows skipped)",
        path.display(),
        ingested.rows_used(),
        ingested.table.n_cols(),
        ingested.row_errors.len()
    );
    Ok(ingested)
}

/// Same as `load_table` but from any reader (used by tests and scoring).
pub fn read_table<R: std::io::Read>(reader: R, opts: &IngestOptions) -> Result<IngestedTable, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();

    let header_names = unique_header_names(&headers);
    let id_name = normalize_header_name(&opts.id_column);
    let id_idx = header_names.iter().position(|n| *n == id_name);
    if id_idx.is_none() {
        debug!("No `{}` column; using row numbers as identifiers", opts.id_column);
    }

    let mut raw: Vec<RawColumn> = (0..header_names.len()).map(|_| RawColumn::default()).collect();
    let mut ids = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: header is line 1 and CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                if opts.strict {
                    return Err(AppError::new(2, format!("CSV parse error on line {line}: {e}")));
                }
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        if record.len() > header_names.len() {
            let message = format!(
                "Row has {} fields but the header has {}",
                record.len(),
                header_names.len()
            );
            if opts.strict {
                return Err(AppError::new(2, format!("Line {line}: {message}")));
            }
            row_errors.push(RowError { line, message });
            continue;
        }

        let id = match id_idx {
            Some(i) => record.get(i).unwrap_or("").to_string(),
            None => (ids.len() + 1).to_string(),
        };
        ids.push(id);

        for (col_idx, col) in raw.iter_mut().enumerate() {
            if Some(col_idx) == id_idx {
                continue;
            }
            match parse_cell(record.get(col_idx)) {
                Cell::Missing => col.values.push(None),
                Cell::Value(v) => {
                    col.parsed += 1;
                    col.values.push(Some(v));
                }
                Cell::Text => {
                    col.text += 1;
                    col.values.push(None);
                }
            }
        }
    }

    if ids.is_empty() {
        return Err(AppError::new(3, "CSV contains no usable data rows."));
    }

    let mut table = LoanTable::default();
    let mut text_columns = Vec::new();
    let mut coerced = Vec::new();

    for (col_idx, (name, col)) in header_names.into_iter().zip(raw).enumerate() {
        if Some(col_idx) == id_idx {
            continue;
        }
        if col.parsed == 0 && col.text > 0 {
            debug!("Column `{name}` has no numeric values; treating it as text");
            text_columns.push(name);
            continue;
        }
        if col.text > 0 {
            coerced.push((name.clone(), col.text));
        }
        table.names.push(name);
        table.columns.push(col.values);
    }

    if !text_columns.is_empty() {
        warn!("Excluding {} text column(s): {}", text_columns.len(), text_columns.join(", "));
    }
    for (name, n) in &coerced {
        debug!("Column `{name}`: {n} non-numeric cell(s) coerced to missing");
    }

    Ok(IngestedTable {
        ids,
        table,
        text_columns,
        coerced,
        row_errors,
        rows_read,
    })
}

/// Normalized header names; a repeated name gets a `_2`, `_3`, ... suffix so
/// every column stays addressable by name.
fn unique_header_names(headers: &StringRecord) -> Vec<String> {
    let mut taken = HashSet::new();
    let mut names = Vec::with_capacity(headers.len());
    for raw in headers.iter() {
        let base = normalize_header_name(raw);
        let mut name = base.clone();
        let mut k = 2;
        while !taken.insert(name.clone()) {
            name = format!("{base}_{k}");
            k += 1;
        }
        if name != base {
            warn!("Duplicate column `{base}` renamed to `{name}`");
        }
        names.push(name);
    }
    names
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, the id column is never found.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_cell(s: Option<&str>) -> Cell {
    let Some(s) = s.map(str::trim) else {
        return Cell::Missing;
    };
    if is_missing_token(s) {
        return Cell::Missing;
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Cell::Value(v),
        Ok(_) => Cell::Missing,
        Err(_) => Cell::Text,
    }
}

fn is_missing_token(s: &str) -> bool {
    matches!(s, "" | "NA" | "na" | "N/A" | "NaN" | "nan" | "NULL" | "null" | ".")
}
