//! CSV export.
//!
//! Prediction files have one header line plus one value per scored record, in
//! input order, so they line up row-for-row with the test file they were
//! computed from.

use std::fs::File;
use std::path::Path;

use log::info;

use crate::error::AppError;

/// Write a single-column prediction CSV.
pub fn write_predictions_csv(path: &Path, column: &str, values: &[f64]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_predictions(file, column, values)?;
    info!("Wrote {} {column} prediction(s) to {}", values.len(), path.display());
    Ok(())
}

/// Same as `write_predictions_csv` but to any writer.
pub fn write_predictions<W: std::io::Write>(writer: W, column: &str, values: &[f64]) -> Result<(), AppError> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record([column])
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;
    for v in values {
        out.write_record([format!("{v:.10}")])
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

/// Write a text table (header + rows) such as a synthetic loan file.
pub fn write_table_csv(path: &Path, headers: &[String], rows: &[Vec<String>]) -> Result<(), AppError> {
    let mut out = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))?;
    out.write_record(headers)
        .map_err(|e| AppError::new(2, format!("Failed to write CSV header: {e}")))?;
    for row in rows {
        out.write_record(row)
            .map_err(|e| AppError::new(2, format!("Failed to write CSV row: {e}")))?;
    }
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush CSV: {e}")))?;
    info!("Wrote {} row(s) to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_and_one_row_per_value() {
        let mut buf = Vec::new();
        write_predictions(&mut buf, "pd", &[0.1, 0.25]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "pd\n0.1000000000\n0.2500000000\n");
    }

    #[test]
    fn table_round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loans.csv");
        let headers = vec!["id".to_string(), "f1".to_string()];
        let rows = vec![vec!["a".to_string(), "1.5".to_string()], vec!["b".to_string(), String::new()]];
        write_table_csv(&path, &headers, &rows).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "id,f1\na,1.5\nb,\n");
    }
}
