use crate::data::Table;
use crate::error::{PipelineError, Result};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Read CSV data from stdin
pub fn read_csv_from_stdin() -> Result<Table> {
    read_csv_from_reader(io::stdin().lock())
}

/// Read CSV data from a file on disk
pub fn read_csv_from_path(path: &Path) -> Result<Table> {
    let file = File::open(path)?;
    read_csv_from_reader(file)
}

pub fn read_csv_from_reader<R: Read>(reader: R) -> Result<Table> {
    read_csv_cancellable(reader, None)
}

/// Read CSV, checking `abort` between records.
///
/// Rows shorter than the header are padded with empty cells so they coerce
/// to "discard" downstream instead of indexing out of bounds. Rows with a
/// cell that is not valid UTF-8 are skipped; only structural CSV errors fail
/// the whole table.
pub fn read_csv_cancellable<R: Read>(reader: R, abort: Option<&AtomicBool>) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    let width = headers.len();

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for record in rdr.byte_records() {
        if abort.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Err(PipelineError::Cancelled);
        }
        let record = record?;
        let row: std::result::Result<Vec<String>, _> = record
            .iter()
            .map(|cell| std::str::from_utf8(cell).map(str::to_string))
            .collect();
        match row {
            Ok(mut row) => {
                row.resize(width, String::new());
                rows.push(row);
            }
            Err(_) => skipped += 1,
        }
    }

    debug!(columns = width, rows = rows.len(), skipped, "read CSV table");
    Ok(Table { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_basic() {
        let csv = "color,sellingprice\nred,100\nblue,200\n";
        let table = read_csv_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["color", "sellingprice"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec!["blue", "200"]);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let csv = "a,b,c\n1,2\n";
        let table = read_csv_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.rows[0], vec!["1", "2", ""]);
    }

    #[test]
    fn test_headers_with_spaces_and_trimming() {
        let csv = "Education Level , Income\n PhD , 5000 \n";
        let table = read_csv_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["Education Level", "Income"]);
        assert_eq!(table.rows[0], vec!["PhD", "5000"]);
    }

    #[test]
    fn test_invalid_utf8_row_is_skipped() {
        let csv: &[u8] = b"color,sellingprice\nred,100\n\xffbad,200\nblue,300\n";
        let table = read_csv_from_reader(csv).unwrap();
        assert_eq!(table.rows, vec![vec!["red", "100"], vec!["blue", "300"]]);
    }

    #[test]
    fn test_abort_flag_cancels() {
        let flag = AtomicBool::new(true);
        let csv = "a\n1\n";
        let result = read_csv_cancellable(csv.as_bytes(), Some(&flag));
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = read_csv_from_path(Path::new("/definitely/not/here.csv"));
        assert!(matches!(result, Err(PipelineError::Io(_))));
    }
}
