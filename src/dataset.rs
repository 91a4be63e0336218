//! Read-only customer dataset loaded once at startup.

use crate::errors::{AppError, ResultExt};
use crate::models::CustomerRecord;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Columns every dataset must carry, in prompt order.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "name",
    "days_since_last_activity",
    "open_tickets",
    "total_tickets",
    "total_revenue",
    "opportunities_won",
    "opportunities_lost",
    "email_engagement",
];

/// Customer records in file order.
#[derive(Debug, Clone)]
pub struct CustomerDataset {
    records: Vec<CustomerRecord>,
}

impl CustomerDataset {
    /// Loads the dataset from a CSV file.
    ///
    /// # Errors
    ///
    /// * `AppError::FileNotFound` if the file does not exist.
    /// * `AppError::InvalidDataset` if a required column is missing, a cell
    ///   cannot be parsed, or there are no rows.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => AppError::FileNotFound(path.display().to_string()),
            _ => AppError::InvalidDataset(format!("cannot read {}: {}", path.display(), e)),
        })?;

        let dataset = Self::from_reader(file)
            .with_context(|| format!("Failed to load {}", path.display()))?;

        tracing::info!("Loaded {} customers from {}", dataset.len(), path.display());
        Ok(dataset)
    }

    /// Parses CSV text with a header row from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, AppError> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = rdr.headers().context("Failed to read CSV headers")?.clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(AppError::InvalidDataset(format!(
                    "missing column '{}'",
                    column
                )));
            }
        }

        let mut records = Vec::new();
        for (idx, row) in rdr.deserialize::<CustomerRecord>().enumerate() {
            // Row numbers are 1-based and exclude the header
            let record = row.with_context(|| format!("Invalid customer row {}", idx + 1))?;
            if !record.total_revenue.is_finite() {
                return Err(AppError::InvalidDataset(format!(
                    "row {}: total_revenue must be a finite number",
                    idx + 1
                )));
            }
            records.push(record);
        }

        if records.is_empty() {
            return Err(AppError::InvalidDataset(
                "dataset has no customer rows".to_string(),
            ));
        }

        Ok(Self { records })
    }

    pub fn records(&self) -> &[CustomerRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }

    /// Finds a customer by exact name. The first row wins on duplicates.
    pub fn lookup_by_name(&self, name: &str) -> Result<&CustomerRecord, AppError> {
        self.records
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| AppError::NotFound(format!("Customer '{}' not found", name)))
    }

    /// Returns the customer at a zero-based position.
    pub fn at(&self, index: usize) -> Result<&CustomerRecord, AppError> {
        self.records.get(index).ok_or_else(|| {
            AppError::NotFound(format!(
                "No customer at index {} (dataset has {})",
                index,
                self.records.len()
            ))
        })
    }

    /// Returns the first `n` customers.
    ///
    /// `n` must be between 1 and the dataset size.
    pub fn prefix(&self, n: usize) -> Result<&[CustomerRecord], AppError> {
        if n == 0 || n > self.records.len() {
            return Err(AppError::BadRequest(format!(
                "count must be between 1 and {}",
                self.records.len()
            )));
        }
        Ok(&self.records[..n])
    }
}
