// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Streaming JSON lines sink
//!
//! Each row is written as one compact JSON object followed by a newline. The
//! row value is serialized as evaluated, not the aligned cells, so members
//! beyond the discovered columns are kept.

use super::{RowSink, SinkError};
use crate::exec::materializer::MaterializedRow;
use crate::logging::QueryLogger;
use std::io::Write;
use std::sync::Arc;

/// Writes one JSON object per row
pub struct JsonSink<W: Write> {
    output: W,
    logger: Arc<dyn QueryLogger>,
    skipped: usize,
    closed: bool,
}

impl<W: Write> JsonSink<W> {
    /// `logger` receives a warning for every row that cannot be serialized
    pub fn new(output: W, logger: Arc<dyn QueryLogger>) -> Self {
        Self {
            output,
            logger,
            skipped: 0,
            closed: false,
        }
    }

    /// Rows dropped because they could not be serialized
    pub fn skipped_rows(&self) -> usize {
        self.skipped
    }

    pub fn get_ref(&self) -> &W {
        &self.output
    }
}

impl<W: Write> RowSink for JsonSink<W> {
    fn write_row(&mut self, row: &MaterializedRow) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "JSON sink is closed",
            )));
        }

        let mut line = match serde_json::to_vec(&row.row) {
            Ok(line) => line,
            Err(e) => {
                self.skipped += 1;
                self.logger
                    .warn(&format!("Skipping row that cannot be serialized: {}", e));
                return Ok(());
            }
        };
        line.push(b'\n');
        self.output.write_all(&line)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.output.flush()?;
        Ok(())
    }
}

impl<W: Write> Drop for JsonSink<W> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::debug!("Ignoring JSON close error on drop: {}", e);
        }
    }
}
