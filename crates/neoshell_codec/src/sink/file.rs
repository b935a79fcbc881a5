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

//! Sink that writes to a file or to standard output.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::error::{NeoShellCodecError, Result};
use crate::sink::Sink;

/// Path that denotes standard output.
pub const STDOUT: &str = "-";

/// Mutable state of a [`FileSink`].
struct FileState {
    /// Buffered writer for the open destination, [`None`] when closed.
    writer: Option<BufWriter<Box<dyn Write + Send>>>,
    /// Set when the sink has been closed.
    closed: bool,
}

/// Sink that writes through a buffer to a file that is truncated when opened, or to standard
/// output if the path is [`STDOUT`]. Standard output is flushed but never closed.
pub struct FileSink {
    path: Option<PathBuf>,
    state: Mutex<FileState>,
}

impl FileSink {
    /// Create a sink for `path` and open it.
    pub fn new(path: &str) -> Result<Self> {
        let path = if path == STDOUT {
            None
        } else {
            Some(PathBuf::from(path))
        };

        let sink = Self {
            path,
            state: Mutex::new(FileState {
                writer: None,
                closed: false,
            }),
        };

        sink.reset()?;
        Ok(sink)
    }

    fn open(&self) -> Result<BufWriter<Box<dyn Write + Send>>> {
        let destination: Box<dyn Write + Send> = match &self.path {
            Some(path) => {
                debug!(path = %path.display(), "Opening file sink.");
                Box::new(File::create(path)?)
            }
            None => Box::new(io::stdout()),
        };

        Ok(BufWriter::new(destination))
    }

    fn lock(&self) -> Result<MutexGuard<'_, FileState>> {
        self.state.lock().map_err(|_| {
            NeoShellCodecError::Io(io::Error::other("the file sink lock is poisoned"))
        })
    }
}

impl Sink for FileSink {
    fn write(&self, bytes: &[u8]) -> Result<()> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        match state.writer.as_mut() {
            Some(writer) if !state.closed => Ok(writer.write_all(bytes)?),
            _ => Err(NeoShellCodecError::EndOfStream),
        }
    }

    fn flush(&self) -> Result<()> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        match state.writer.as_mut() {
            Some(writer) if !state.closed => Ok(writer.flush()?),
            _ => Err(NeoShellCodecError::EndOfStream),
        }
    }

    fn reset(&self) -> Result<()> {
        let mut state = self.lock()?;
        if state.closed {
            return Err(NeoShellCodecError::EndOfStream);
        }

        // Dropping the previous writer releases the file handle after it has been flushed.
        if let Some(mut writer) = state.writer.take() {
            writer.flush()?;
        }

        state.writer = Some(self.open()?);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let mut state = self.lock()?;
        if state.closed {
            return Ok(());
        }
        state.closed = true;

        if let Some(mut writer) = state.writer.take() {
            writer.flush()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::TempDir;

    fn file_sink(temp_dir: &TempDir) -> (FileSink, PathBuf) {
        let path = temp_dir.path().join("sink.txt");
        (FileSink::new(path.to_str().unwrap()).unwrap(), path)
    }

    #[test]
    fn test_new_truncates_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("sink.txt");
        fs::write(&path, "previous content").unwrap();

        let sink = FileSink::new(path.to_str().unwrap()).unwrap();
        sink.close().unwrap();

        assert_eq!("", fs::read_to_string(path).unwrap());
    }

    #[test]
    fn test_flush_writes_buffered_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let (sink, path) = file_sink(&temp_dir);

        sink.write(b"first").unwrap();
        sink.flush().unwrap();

        assert_eq!("first", fs::read_to_string(path).unwrap());
    }

    #[test]
    fn test_reset_reopens_and_truncates() {
        let temp_dir = TempDir::new().unwrap();
        let (sink, path) = file_sink(&temp_dir);

        sink.write(b"first run").unwrap();
        sink.reset().unwrap();
        sink.write(b"second").unwrap();
        sink.close().unwrap();

        assert_eq!("second", fs::read_to_string(path).unwrap());
    }

    #[test]
    fn test_close_twice_is_a_no_op() {
        let temp_dir = TempDir::new().unwrap();
        let (sink, _path) = file_sink(&temp_dir);

        sink.close().unwrap();
        sink.close().unwrap();
    }

    #[test]
    fn test_write_after_close_is_end_of_stream() {
        let temp_dir = TempDir::new().unwrap();
        let (sink, _path) = file_sink(&temp_dir);

        sink.close().unwrap();
        assert!(matches!(
            sink.write(b"late"),
            Err(NeoShellCodecError::EndOfStream)
        ));
        assert!(matches!(sink.reset(), Err(NeoShellCodecError::EndOfStream)));
    }
}
