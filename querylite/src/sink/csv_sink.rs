// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Streaming CSV sink

use super::{RowSink, SinkError};
use crate::config::{ConfigError, CsvConfig};
use crate::exec::materializer::MaterializedRow;
use crate::types::any_to_string;
use std::io::Write;

/// Writes rows as delimited records, header first
///
/// When the first row has no members there is no header. Each such row is
/// still written as one record, which the csv crate encodes as `""`.
pub struct CsvSink<W: Write> {
    writer: Option<csv::Writer<W>>,
    write_headers: bool,
    header_written: bool,
    closed: bool,
}

impl<W: Write> CsvSink<W> {
    /// Comma-delimited sink with a header line
    pub fn new(output: W) -> Self {
        Self::with_delimiter(output, b',', true)
    }

    /// Sink configured from the `csv` section of the configuration
    pub fn from_config(output: W, config: &CsvConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_delimiter(
            output,
            config.delimiter_byte()?,
            config.write_headers,
        ))
    }

    pub fn with_delimiter(output: W, delimiter: u8, write_headers: bool) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .from_writer(output);
        Self {
            writer: Some(writer),
            write_headers,
            header_written: false,
            closed: false,
        }
    }

    /// Close the sink and hand back the underlying writer
    pub fn into_inner(mut self) -> Result<W, SinkError> {
        self.close()?;
        match self.writer.take() {
            Some(writer) => writer.into_inner().map_err(|e| e.into_error().into()),
            None => Err(closed_error()),
        }
    }

    fn writer(&mut self) -> Result<&mut csv::Writer<W>, SinkError> {
        match self.writer.as_mut() {
            Some(writer) if !self.closed => Ok(writer),
            _ => Err(closed_error()),
        }
    }
}

fn closed_error() -> SinkError {
    SinkError::Io(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "CSV sink is closed",
    ))
}

impl<W: Write> RowSink for CsvSink<W> {
    fn write_row(&mut self, row: &MaterializedRow) -> Result<(), SinkError> {
        if self.write_headers && !self.header_written {
            if !row.columns.is_empty() {
                self.writer()?.write_record(row.columns.iter())?;
            }
            self.header_written = true;
        }
        let record: Vec<String> = row.cells.iter().map(any_to_string).collect();
        self.writer()?.write_record(&record)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

impl<W: Write> Drop for CsvSink<W> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::debug!("Ignoring CSV close error on drop: {}", e);
        }
    }
}
