//! Helpers that cancel a context partway through a drain

use querylite::{Context, MaterializedRow, RowSink, SinkError};
use std::io::{self, Write};

/// Sink wrapper that cancels `ctx` once `after` rows have been written
pub struct CancellingSink<S> {
    pub inner: S,
    ctx: Context,
    after: usize,
    written: usize,
}

impl<S: RowSink> CancellingSink<S> {
    pub fn new(inner: S, ctx: &Context, after: usize) -> Self {
        Self {
            inner,
            ctx: ctx.clone(),
            after,
            written: 0,
        }
    }
}

impl<S: RowSink> RowSink for CancellingSink<S> {
    fn write_row(&mut self, row: &MaterializedRow) -> Result<(), SinkError> {
        self.inner.write_row(row)?;
        self.written += 1;
        if self.written >= self.after {
            self.ctx.cancel();
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.inner.close()
    }
}

/// Writer that cancels `ctx` once `after` complete lines have been written
pub struct CancellingWriter {
    pub output: Vec<u8>,
    ctx: Context,
    after: usize,
}

impl CancellingWriter {
    pub fn new(ctx: &Context, after: usize) -> Self {
        Self {
            output: Vec::new(),
            ctx: ctx.clone(),
            after,
        }
    }

    pub fn lines(&self) -> usize {
        self.output.iter().filter(|b| **b == b'\n').count()
    }
}

impl Write for CancellingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.extend_from_slice(buf);
        if self.lines() >= self.after {
            self.ctx.cancel();
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
