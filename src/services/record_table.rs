//! The persisted record table: a CSV file with one row per object.
//!
//! Writing goes through [`RecordSink`] so the crawl can target either a CSV
//! table or an in-memory record set. The header row is written when a CSV
//! sink is opened, so even an empty crawl produces a valid table.

use crate::{
    errors::InventoryResult,
    models::object::{ObjectRecord, RECORD_COLUMNS},
};
use csv::{ReaderBuilder, WriterBuilder};
use std::{
    fs::{self, File},
    io::{Read, Write},
    path::Path,
};
use tracing::{debug, info};

/// Append-only destination for crawled records.
pub trait RecordSink {
    fn write_record(&mut self, record: &ObjectRecord) -> InventoryResult<()>;

    /// Push buffered rows to durable storage.
    fn flush(&mut self) -> InventoryResult<()> {
        Ok(())
    }
}

impl RecordSink for Vec<ObjectRecord> {
    fn write_record(&mut self, record: &ObjectRecord) -> InventoryResult<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// CSV-backed record sink.
pub struct CsvRecordSink<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl CsvRecordSink<File> {
    /// Create (or truncate) the table at `path`, creating parent directories.
    pub fn create(path: impl AsRef<Path>) -> InventoryResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
                info!("Created output directory {}", parent.display());
            }
        }
        Self::from_writer(File::create(path)?)
    }
}

impl<W: Write> CsvRecordSink<W> {
    /// Wrap a writer and emit the header row.
    pub fn from_writer(inner: W) -> InventoryResult<Self> {
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(inner);
        writer.write_record(RECORD_COLUMNS)?;
        Ok(Self { writer, rows: 0 })
    }

    /// Data rows written so far (header excluded).
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[cfg(test)]
    pub fn into_inner(self) -> InventoryResult<W> {
        self.writer
            .into_inner()
            .map_err(|err| err.into_error().into())
    }
}

impl<W: Write> RecordSink for CsvRecordSink<W> {
    fn write_record(&mut self, record: &ObjectRecord) -> InventoryResult<()> {
        self.writer.serialize(record)?;
        self.rows += 1;
        Ok(())
    }

    fn flush(&mut self) -> InventoryResult<()> {
        self.writer.flush()?;
        debug!(rows = self.rows, "flushed record table");
        Ok(())
    }
}

/// Read a whole record table.
///
/// Rows may be short; missing columns take their defaults and `size` is
/// parsed leniently.
pub fn read_records<R: Read>(reader: R) -> InventoryResult<Vec<ObjectRecord>> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut records = Vec::new();
    for row in reader.deserialize::<ObjectRecord>() {
        records.push(row?);
    }
    Ok(records)
}

pub fn read_records_from_path(path: impl AsRef<Path>) -> InventoryResult<Vec<ObjectRecord>> {
    let path = path.as_ref();
    info!("Reading record table {}", path.display());
    read_records(File::open(path)?)
}
