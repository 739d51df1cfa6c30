//! Writer that stops accepting output after a fixed number of writes

use std::io::{self, Write};

/// Accepts `writes` calls to `write`, then fails every call with `BrokenPipe`
pub struct FailingWriter {
    pub output: Vec<u8>,
    writes_left: usize,
    pub failures: usize,
}

impl FailingWriter {
    pub fn new(writes: usize) -> Self {
        Self {
            output: Vec::new(),
            writes_left: writes,
            failures: 0,
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.writes_left == 0 {
            self.failures += 1;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away"));
        }
        self.writes_left -= 1;
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
