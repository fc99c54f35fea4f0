//! Raw upload handling: text decoding, tolerant CSV parsing, header
//! normalization and the profile-row filter.

use crate::error::{Result, UsageForecastError};
use log::{debug, info};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf8,
    ShiftJis,
}

/// Decodes the upload, trying UTF-8 first and Shift_JIS second.
pub fn decode_bytes(raw: &[u8]) -> Result<(String, SourceEncoding)> {
    let body = raw.strip_prefix(UTF8_BOM).unwrap_or(raw);

    if let Ok(text) = std::str::from_utf8(body) {
        debug!("Decoded {} bytes as UTF-8", raw.len());
        return Ok((text.to_string(), SourceEncoding::Utf8));
    }

    let (text, had_errors) = encoding_rs::SHIFT_JIS.decode_without_bom_handling(body);
    if had_errors {
        return Err(UsageForecastError::Decode(format!(
            "{} bytes contain sequences invalid in both encodings",
            raw.len()
        )));
    }

    debug!("Decoded {} bytes as Shift_JIS", raw.len());
    Ok((text.into_owned(), SourceEncoding::ShiftJis))
}

/// A parsed delimited file: trimmed headers plus every well-formed row.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    skipped_lines: usize,
}

impl UsageTable {
    /// Parses comma-delimited text with a header row. Lines whose field count
    /// differs from the header are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(UsageForecastError::EmptyInput);
        }

        let mut rows = Vec::new();
        let mut skipped_lines = 0;

        for (idx, record) in reader.records().enumerate() {
            match record {
                Ok(record) if record.len() == headers.len() => {
                    rows.push(record.iter().map(str::to_string).collect());
                }
                Ok(record) => {
                    debug!(
                        "Skipping record #{}: expected {} fields, found {}",
                        idx + 1,
                        headers.len(),
                        record.len()
                    );
                    skipped_lines += 1;
                }
                Err(e) => {
                    debug!("Skipping unreadable record #{}: {}", idx + 1, e);
                    skipped_lines += 1;
                }
            }
        }

        info!(
            "Parsed {} rows with {} columns ({} malformed lines skipped)",
            rows.len(),
            headers.len(),
            skipped_lines
        );

        Ok(Self {
            headers,
            rows,
            skipped_lines,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| UsageForecastError::MissingColumns(vec![name.to_string()]))
    }

    /// Resolves every named column, reporting all absent ones together.
    pub fn require_columns(&self, names: &[String]) -> Result<Vec<usize>> {
        let missing: Vec<String> = names
            .iter()
            .filter(|n| self.column_index(n).is_none())
            .cloned()
            .collect();

        if !missing.is_empty() {
            return Err(UsageForecastError::MissingColumns(missing));
        }

        Ok(names
            .iter()
            .filter_map(|n| self.column_index(n))
            .collect())
    }

    /// Keeps the rows whose `column` equals `label` exactly.
    pub fn filter_profile(&self, column: &str, label: &str) -> Result<Self> {
        let idx = self.require_column(column)?;
        let rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .filter(|row| row[idx] == label)
            .cloned()
            .collect();

        debug!(
            "Profile filter {} == '{}' kept {} of {} rows",
            column,
            label,
            rows.len(),
            self.rows.len()
        );

        Ok(Self {
            headers: self.headers.clone(),
            rows,
            skipped_lines: self.skipped_lines,
        })
    }
}

/// Parsed input after the required-column checks and profile filtering.
#[derive(Debug, Clone)]
pub struct NormalizedInput {
    pub table: UsageTable,
    pub encoding: SourceEncoding,
}

/// Decodes, parses and validates an upload, then keeps only the rows of the
/// configured profile. Checks run profile column, date column, metric columns,
/// and the first failure stops the pipeline.
pub fn ingest(
    raw: &[u8],
    profile_column: &str,
    profile_label: &str,
    date_column: &str,
    metric_columns: &[String],
) -> Result<NormalizedInput> {
    let (text, encoding) = decode_bytes(raw)?;
    let table = UsageTable::parse(&text)?;

    table.require_column(profile_column)?;
    table.require_column(date_column)?;
    table.require_columns(metric_columns)?;

    let table = table.filter_profile(profile_column, profile_label)?;
    if table.is_empty() {
        return Err(UsageForecastError::NoProfileRows {
            column: profile_column.to_string(),
            label: profile_label.to_string(),
        });
    }

    Ok(NormalizedInput { table, encoding })
}
