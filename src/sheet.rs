//! Property spreadsheet loading: Excel workbooks and CSV exports

use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use csv::{ByteRecord, StringRecord};
use encoding_rs::WINDOWS_1252;
use tracing::debug;

use crate::error::{EpcError, Result};
use crate::record::PropertyRecord;

/// Columns a sheet must have for any record to be searchable
const REQUIRED_COLUMNS: [&str; 2] = ["Address Line 1", "Post Code"];

/// Workbook formats read through calamine
const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Load property records from a workbook (first worksheet) or a CSV file
pub fn load_records(path: &Path) -> Result<Vec<PropertyRecord>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let records = if extension == "csv" {
        read_records(std::fs::File::open(path)?)?
    } else if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
        read_workbook(path)?
    } else {
        return Err(EpcError::Sheet(format!(
            "{} is not a spreadsheet (expected .xlsx, .xls, .ods or .csv)",
            path.display()
        )));
    };

    debug!(path = %path.display(), count = records.len(), "loaded property sheet");
    Ok(records)
}

/// Read the first worksheet of an Excel/ODS workbook
pub fn read_workbook(path: &Path) -> Result<Vec<PropertyRecord>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| EpcError::Sheet(format!("{} has no worksheets", path.display())))??;
    records_from_range(&range)
}

/// Map a worksheet onto records. The first row of the range is the header.
pub fn records_from_range(range: &Range<Data>) -> Result<Vec<PropertyRecord>> {
    let mut rows = range.rows();
    let headers = rows.next().map(cells_to_record).unwrap_or_default();
    // Sheet row numbers are 1-based and the range may not start at A1
    let first_row = range.start().map_or(1, |(row, _)| row as usize + 1);

    records_from_rows(
        &headers,
        rows.enumerate()
            .map(|(i, row)| (first_row + 1 + i, cells_to_record(row))),
    )
}

/// Read property records from CSV data with a header row.
///
/// Cells that are not valid UTF-8 are decoded as Windows-1252, which is what
/// Excel's plain "CSV" export writes.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<PropertyRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = decode_record(reader.byte_headers()?);
    let mut rows = Vec::new();
    for (i, row) in reader.byte_records().enumerate() {
        // Line 1 is the header
        rows.push((i + 2, decode_record(&row?)));
    }
    records_from_rows(&headers, rows)
}

/// Check the header, then deserialize every non-blank row
fn records_from_rows(
    headers: &StringRecord,
    rows: impl IntoIterator<Item = (usize, StringRecord)>,
) -> Result<Vec<PropertyRecord>> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(EpcError::Sheet(format!(
            "missing column(s): {}",
            missing.join(", ")
        )));
    }

    let mut records = Vec::new();
    for (line, row) in rows {
        if row.iter().all(str::is_empty) {
            debug!(row = line, "skipping blank row");
            continue;
        }
        let record = row
            .deserialize::<PropertyRecord>(Some(headers))
            .map_err(|e| EpcError::Sheet(format!("row {}: {}", line, e)))?;
        records.push(record);
    }
    Ok(records)
}

fn decode_record(record: &ByteRecord) -> StringRecord {
    record
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let text = decode_field(field);
            // Excel's "CSV UTF-8" export starts with a byte order mark
            if i == 0 {
                text.trim_start_matches('\u{feff}').to_string()
            } else {
                text
            }
        })
        .collect()
}

fn decode_field(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned(),
    }
}

fn cells_to_record(row: &[Data]) -> StringRecord {
    row.iter().map(cell_text).collect()
}

/// Cell value as the text a user sees. Whole-number floats drop the `.0`
/// so UPRNs and plot numbers stored as numbers read back unchanged.
fn cell_text(cell: &Data) -> String {
    let text = match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    };
    text.trim().to_string()
}
