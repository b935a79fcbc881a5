/* Copyright 2025 The NeoShell Contributors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Byte destinations of encoders. A [`Sink`] is created by [`open_sink()`], written to by one
//! encoder at a time, and closed exactly once. All operations take `&self` as each sink
//! serializes access through an internal mutex so `close()` and `reset()` are safe while a writer
//! is active.

mod file;
mod gzip;
mod memory;
mod process;

use std::io::{self, Write};
use std::sync::Arc;

pub use file::{FileSink, STDOUT};
pub use gzip::GzipSink;
pub use memory::MemorySink;
pub use process::ProcessSink;

use crate::error::{NeoShellCodecError, Result};

/// Prefix of output targets that are commands to pipe the output to.
pub const EXEC_PREFIX: &str = "exec ";

/// A byte writer with flush, close, and reset semantics.
pub trait Sink: Send + Sync {
    /// Write all of `bytes`. Returns [`NeoShellCodecError::EndOfStream`] after [`Sink::close()`].
    fn write(&self, bytes: &[u8]) -> Result<()>;

    /// Write buffered bytes to the destination.
    fn flush(&self) -> Result<()>;

    /// Close the current destination and reopen it identically.
    fn reset(&self) -> Result<()>;

    /// Flush and release the destination. Closing an already closed sink does nothing.
    fn close(&self) -> Result<()>;
}

/// Create the sink for `target`. `-` is standard output, `exec CMD` pipes to a child process
/// running `CMD`, and anything else is a file that is truncated.
pub fn open_sink(target: &str) -> Result<Arc<dyn Sink>> {
    let target = target.trim();

    if target.is_empty() {
        Err(NeoShellCodecError::InvalidArgument(
            "no output target was provided.".to_owned(),
        ))
    } else if let Some(command) = target.strip_prefix(EXEC_PREFIX) {
        Ok(Arc::new(ProcessSink::new(command)?))
    } else {
        Ok(Arc::new(FileSink::new(target)?))
    }
}

/// Adapter that lets [`std::io::Write`] based writers, such as the csv crate's writer, write to a
/// [`Sink`].
pub struct SinkWriter {
    sink: Arc<dyn Sink>,
}

impl SinkWriter {
    pub fn new(sink: Arc<dyn Sink>) -> Self {
        Self { sink }
    }
}

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink.write(buf).map_err(into_io_error)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush().map_err(into_io_error)
    }
}

fn into_io_error(error: NeoShellCodecError) -> io::Error {
    match error {
        NeoShellCodecError::Io(error) => error,
        NeoShellCodecError::EndOfStream => io::Error::new(io::ErrorKind::BrokenPipe, error),
        error => io::Error::other(error),
    }
}
