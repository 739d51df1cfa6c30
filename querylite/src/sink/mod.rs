// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Result sinks
//!
//! A sink consumes materialized rows one at a time. `drain` pulls rows from a
//! materializer into exactly one sink until the rows run out, an error
//! occurs, or the context is cancelled.

pub mod csv_sink;
pub mod json_sink;
pub mod table;

pub use csv_sink::CsvSink;
pub use json_sink::JsonSink;
pub use table::{TableResult, TableRow, TableSink};

use crate::coordinator::QueryError;
use crate::exec::context::Context;
use crate::exec::error::ExecutionError;
use crate::exec::materializer::MaterializedRow;
use thiserror::Error;

/// Errors raised while writing rows out
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Destination for materialized rows
pub trait RowSink {
    fn write_row(&mut self, row: &MaterializedRow) -> Result<(), SinkError>;

    /// Flush buffered output; calling it again is a no-op
    fn close(&mut self) -> Result<(), SinkError>;
}

/// Outcome of a drain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Rows handed to the sink
    pub rows: usize,
    /// The context was cancelled before the rows ran out
    pub cancelled: bool,
    /// Rows the sink accepted but dropped
    pub skipped_rows: usize,
}

/// Pull every row into `sink`
///
/// The sink is not closed here; the caller owns it.
pub fn drain<I, S>(rows: I, sink: &mut S, ctx: &Context) -> Result<DrainStats, QueryError>
where
    I: IntoIterator<Item = Result<MaterializedRow, ExecutionError>>,
    S: RowSink + ?Sized,
{
    let mut stats = DrainStats::default();
    let mut rows = rows.into_iter();
    loop {
        if ctx.is_cancelled() {
            log::debug!("Drain cancelled after {} row(s)", stats.rows);
            stats.cancelled = true;
            break;
        }
        match rows.next() {
            Some(row) => {
                sink.write_row(&row?)?;
                stats.rows += 1;
            }
            None => {
                // A stream that saw cancellation ends like an exhausted one,
                // so a deadline passing right after the last row also counts.
                stats.cancelled = ctx.is_cancelled();
                break;
            }
        }
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingSink {
        written: Vec<Vec<Value>>,
        fail_at: Option<usize>,
    }

    impl RowSink for CountingSink {
        fn write_row(&mut self, row: &MaterializedRow) -> Result<(), SinkError> {
            if self.fail_at == Some(self.written.len()) {
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed").into());
            }
            self.written.push(row.cells.clone());
            Ok(())
        }

        fn close(&mut self) -> Result<(), SinkError> {
            Ok(())
        }
    }

    fn rows(n: i64) -> Vec<Result<MaterializedRow, ExecutionError>> {
        let columns: Arc<[String]> = vec!["n".to_string()].into();
        (1..=n)
            .map(|i| {
                Ok(MaterializedRow {
                    columns: columns.clone(),
                    cells: vec![Value::Int(i)],
                    row: Value::Int(i),
                })
            })
            .collect()
    }

    #[test]
    fn test_drain_all_rows() {
        let mut sink = CountingSink::default();
        let stats = drain(rows(5), &mut sink, &Context::background()).unwrap();
        assert_eq!(
            stats,
            DrainStats {
                rows: 5,
                ..Default::default()
            }
        );
        assert_eq!(sink.written.len(), 5);
    }

    #[test]
    fn test_drain_propagates_evaluation_error() {
        let mut input = rows(2);
        input.push(Err(ExecutionError::RuntimeError("boom".to_string())));
        let mut sink = CountingSink::default();
        let err = drain(input, &mut sink, &Context::background()).unwrap_err();
        assert!(matches!(err, QueryError::Execution(_)));
        assert_eq!(sink.written.len(), 2);
    }

    #[test]
    fn test_drain_propagates_sink_error() {
        let mut sink = CountingSink {
            fail_at: Some(1),
            ..Default::default()
        };
        let err = drain(rows(3), &mut sink, &Context::background()).unwrap_err();
        assert!(matches!(err, QueryError::Sink(SinkError::Io(_))));
    }

    #[test]
    fn test_drain_reports_cancellation() {
        let (ctx, guard) = Context::background().with_cancel();
        drop(guard);
        let mut sink = CountingSink::default();
        let stats = drain(rows(3), &mut sink, &ctx).unwrap();
        assert!(stats.cancelled);
        assert_eq!(stats.rows, 0);
        assert!(sink.written.is_empty());
    }

    #[test]
    fn test_cancellation_seen_at_end_of_stream_is_reported() {
        let (ctx, _guard) = Context::background().with_cancel();
        let canceller = ctx.clone();
        let mut input = rows(2).into_iter();
        let stream = std::iter::from_fn(move || {
            let next = input.next();
            if next.is_none() {
                canceller.cancel();
            }
            next
        });

        let mut sink = CountingSink::default();
        let stats = drain(stream, &mut sink, &ctx).unwrap();
        assert_eq!(stats.rows, 2);
        assert!(stats.cancelled);
    }
}
