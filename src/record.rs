use serde::{Deserialize, Serialize};

/// Characters Windows and most filesystems reject in a file name
const INVALID_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Placeholder for a missing scheme abbreviation
pub const UNKNOWN_SCHEME: &str = "UNK";
/// Placeholder for any other missing filename field
pub const UNKNOWN_FIELD: &str = "Unknown";

/// One property row from the input spreadsheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    #[serde(rename = "Address Line 1", default)]
    pub address_line_1: Option<String>,
    #[serde(rename = "Address Line 2", default)]
    pub address_line_2: Option<String>,
    #[serde(rename = "Address Line 3", default)]
    pub address_line_3: Option<String>,
    #[serde(rename = "Address Line 4", default)]
    pub address_line_4: Option<String>,
    #[serde(rename = "Address Line 5", default)]
    pub address_line_5: Option<String>,
    #[serde(rename = "Town", default)]
    pub town: Option<String>,
    #[serde(rename = "Post Code", default)]
    pub postcode: Option<String>,
    #[serde(rename = "Scheme Abbreviation", default)]
    pub scheme: Option<String>,
    #[serde(rename = "Development Plot Number", default)]
    pub plot: Option<String>,
    #[serde(rename = "Tenure", default)]
    pub tenure: Option<String>,
    #[serde(rename = "UPRN", default)]
    pub uprn: Option<String>,
}

impl PropertyRecord {
    /// Address lines 1-5 and town, comma-joined, skipping blank cells
    pub fn full_address(&self) -> String {
        [
            &self.address_line_1,
            &self.address_line_2,
            &self.address_line_3,
            &self.address_line_4,
            &self.address_line_5,
            &self.town,
        ]
        .into_iter()
        .filter_map(|cell| present(cell.as_deref()))
        .collect::<Vec<_>>()
        .join(", ")
    }

    /// Postcode as typed in the sheet, trimmed. Empty if missing.
    pub fn postcode(&self) -> String {
        present(self.postcode.as_deref()).unwrap_or_default().to_string()
    }

    /// Target PDF file name for this property
    pub fn filename(&self) -> String {
        certificate_filename(
            self.scheme.as_deref(),
            self.plot.as_deref(),
            self.tenure.as_deref(),
            self.uprn.as_deref(),
        )
    }
}

/// Returns the trimmed cell value, or `None` for blanks and `nan` placeholders
pub fn present(cell: Option<&str>) -> Option<&str> {
    let value = cell?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(value)
    }
}

/// Build `EPC - {scheme} - {plot} - {tenure} - {uprn}.pdf`, safe for any filesystem
pub fn certificate_filename(
    scheme: Option<&str>,
    plot: Option<&str>,
    tenure: Option<&str>,
    uprn: Option<&str>,
) -> String {
    let filename = format!(
        "EPC - {} - {} - {} - {}.pdf",
        present(scheme).unwrap_or(UNKNOWN_SCHEME),
        present(plot).unwrap_or(UNKNOWN_FIELD),
        present(tenure).unwrap_or(UNKNOWN_FIELD),
        present(uprn).unwrap_or(UNKNOWN_FIELD),
    );
    sanitize_filename(&filename)
}

/// Replace characters that are invalid in file names with `_`
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|ch| if INVALID_FILENAME_CHARS.contains(&ch) { '_' } else { ch })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> PropertyRecord {
        PropertyRecord {
            address_line_1: Some("9 Mallard House".into()),
            address_line_2: Some("Iris Avenue".into()),
            address_line_3: Some("nan".into()),
            address_line_4: Some("   ".into()),
            address_line_5: None,
            town: Some(" Canterbury ".into()),
            postcode: Some(" CT1 1AA ".into()),
            scheme: Some("SPA".into()),
            plot: Some("12".into()),
            tenure: Some("Shared Ownership".into()),
            uprn: Some("100012345678".into()),
        }
    }

    #[test]
    fn test_full_address_skips_placeholders() {
        assert_eq!(record().full_address(), "9 Mallard House, Iris Avenue, Canterbury");
        assert_eq!(PropertyRecord::default().full_address(), "");
    }

    #[test]
    fn test_postcode_trimmed() {
        assert_eq!(record().postcode(), "CT1 1AA");
        assert_eq!(PropertyRecord::default().postcode(), "");
    }

    #[test]
    fn test_filename() {
        assert_eq!(
            record().filename(),
            "EPC - SPA - 12 - Shared Ownership - 100012345678.pdf"
        );
    }

    #[test]
    fn test_filename_missing_fields() {
        let name = certificate_filename(None, Some("12"), Some("NaN"), None);
        assert_eq!(name, "EPC - UNK - 12 - Unknown - Unknown.pdf");
    }

    #[test]
    fn test_filename_sanitized() {
        let name = certificate_filename(Some("S/P"), Some("12?"), Some("Rent: Social"), Some("1*2"));
        assert_eq!(name, "EPC - S_P - 12_ - Rent_ Social - 1_2.pdf");
    }

    #[test]
    fn test_present() {
        assert_eq!(present(Some(" x ")), Some("x"));
        assert_eq!(present(Some("NAN")), None);
        assert_eq!(present(Some("")), None);
        assert_eq!(present(None), None);
    }
}
