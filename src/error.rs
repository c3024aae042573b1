use thiserror::Error;

#[derive(Error, Debug)]
pub enum EpcError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] ureq::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    ExcelError(#[from] calamine::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("No matching address: {0}")]
    NoMatch(String),

    #[error("PDF rendering failed: {0}")]
    PdfRender(String),

    #[error("Spreadsheet error: {0}")]
    Sheet(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl EpcError {
    /// Get an actionable hint for how to resolve this error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            EpcError::HttpError(_) => Some(
                "Check your internet connection, or try:\n  epc-scrape search \"<postcode>\""
            ),
            EpcError::Navigation(_) => Some(
                "The portal markup may have changed. Inspect the results with:\n  epc-scrape search \"<postcode>\" --address \"<address>\""
            ),
            EpcError::NoMatch(_) => Some(
                "Compare the spreadsheet address against the portal's list:\n  epc-scrape search \"<postcode>\" --address \"<address>\""
            ),
            EpcError::PdfRender(_) => Some(
                "Run `epc-scrape enable-pdf` to set up PDF rendering, or `epc-scrape doctor` to check it"
            ),
            EpcError::Sheet(_) | EpcError::CsvError(_) | EpcError::ExcelError(_) => Some(
                "The first worksheet needs a header row (Address Line 1, Town, Post Code, ...)"
            ),
            EpcError::ConfigError(_) | EpcError::TomlError(_) => Some(
                "Check your configuration with `epc-scrape config show`"
            ),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EpcError>;
