use std::path::Path;

use async_trait::async_trait;
use datanode_core::StorageType;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::traits::{FileFormat, StorageError, StorageResult};

/// Parsed content of a CSV file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    /// Column names; empty when the format reads files without header.
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        CsvTable { headers, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the column named `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// CSV storage format
///
/// All rows must have the same number of fields; ragged files fail to read.
#[derive(Debug, Clone)]
pub struct CsvFormat {
    pub has_header: bool,
    pub delimiter: u8,
}

impl CsvFormat {
    pub fn new() -> Self {
        CsvFormat {
            has_header: true,
            delimiter: b',',
        }
    }

    pub fn without_header(mut self) -> Self {
        self.has_header = false;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileFormat for CsvFormat {
    type Data = CsvTable;

    fn storage_type(&self) -> StorageType {
        StorageType::Csv
    }

    async fn read(&self, path: &Path) -> StorageResult<CsvTable> {
        let bytes = fs::read(path).await.map_err(|e| {
            StorageError::ReadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(self.has_header)
            .delimiter(self.delimiter)
            .from_reader(bytes.as_slice());

        let parse_err = |e: ::csv::Error| {
            StorageError::ReadFailed(format!("Invalid CSV in {}: {}", path.display(), e))
        };

        let headers = if self.has_header {
            reader
                .headers()
                .map_err(parse_err)?
                .iter()
                .map(String::from)
                .collect()
        } else {
            Vec::new()
        };

        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record = record.map_err(parse_err)?;
            rows.push(record.iter().map(String::from).collect());
        }

        Ok(CsvTable { headers, rows })
    }

    async fn write(&self, path: &Path, data: &CsvTable) -> StorageResult<()> {
        let start = std::time::Instant::now();

        let mut writer = ::csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(Vec::new());

        let write_err = |e: ::csv::Error| {
            StorageError::WriteFailed(format!("Failed to encode CSV for {}: {}", path.display(), e))
        };

        if self.has_header && !data.headers.is_empty() {
            writer.write_record(&data.headers).map_err(write_err)?;
        }
        for row in &data.rows {
            writer.write_record(row).map_err(write_err)?;
        }
        let bytes = writer.into_inner().map_err(|e| {
            StorageError::WriteFailed(format!("Failed to flush CSV for {}: {}", path.display(), e))
        })?;

        let mut file = fs::File::create(path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;
        file.write_all(&bytes).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;
        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            rows = data.rows.len(),
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "CSV write successful"
        );

        Ok(())
    }
}
