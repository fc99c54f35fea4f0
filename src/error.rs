use thiserror::Error;

#[derive(Error, Debug)]
pub enum UsageForecastError {
    #[error("Could not decode input as UTF-8 or Shift_JIS: {0}")]
    Decode(String),

    #[error("Input contains no header row")]
    EmptyInput,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Required columns not found: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("No rows with {column} == '{label}' found in input")]
    NoProfileRows { column: String, label: String },

    #[error("No row in column '{0}' holds a parseable date")]
    NoDatedRows(String),

    #[error("Configuration lists no metric to forecast")]
    NoMetrics,

    #[error("Invalid contract length of {0} days: contract must span at least one day")]
    InvalidContractDays(i64),

    #[error("Invalid annual volume {value} for metric '{metric}': must be a positive number")]
    InvalidVolume { metric: String, value: f64 },

    #[error("Invalid busy month {0}: must be between 1 and 12")]
    InvalidBusyMonth(u32),

    #[error("Invalid busy factor {0}: must be a finite multiplier of at least 1.0")]
    InvalidBusyFactor(f64),

    #[error("Invalid forecast horizon: {0}")]
    InvalidHorizon(String),

    #[error("Spreadsheet export error: {0}")]
    Export(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<rust_xlsxwriter::XlsxError> for UsageForecastError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        Self::Export(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, UsageForecastError>;
