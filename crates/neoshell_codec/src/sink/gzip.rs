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


//! Sink that compresses the bytes written to it with gzip before writing them to another sink.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use flate2::Compression as Level;
use flate2::write::GzEncoder;

use crate::error::{NeoShellCodecError, Result};
use crate::sink::{Sink, SinkWriter};

/// Sink that writes one gzip stream to an inner sink. The stream is finished when the sink is
/// closed, and a reset starts a new stream after resetting the inner sink.
pub struct GzipSink {
    inner: Arc<dyn Sink>,
    /// Encoder of the current stream, [`None`] when closed.
    encoder: Mutex<Option<GzEncoder<SinkWriter>>>,
}

impl GzipSink {
    pub fn new(inner: Arc<dyn Sink>) -> Self {
        let encoder = Self::encoder(&inner);
        Self {
            inner,
            encoder: Mutex::new(Some(encoder)),
        }
    }

    fn encoder(inner: &Arc<dyn Sink>) -> GzEncoder<SinkWriter> {
        GzEncoder::new(SinkWriter::new(inner.clone()), Level::default())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<GzEncoder<SinkWriter>>>> {
        self.encoder
            .lock()
            .map_err(|_| NeoShellCodecError::EndOfStream)
    }

    fn with_encoder(
        &self,
        operation: impl FnOnce(&mut GzEncoder<SinkWriter>) -> io::Result<()>,
    ) -> Result<()> {
        let mut encoder = self.lock()?;
        let encoder = encoder.as_mut().ok_or(NeoShellCodecError::EndOfStream)?;
        operation(encoder).map_err(NeoShellCodecError::from)
    }
}

impl Sink for GzipSink {
    fn write(&self, bytes: &[u8]) -> Result<()> {
        self.with_encoder(|encoder| encoder.write_all(bytes))
    }

    fn flush(&self) -> Result<()> {
        self.with_encoder(|encoder| encoder.flush())
    }

    fn reset(&self) -> Result<()> {
        let mut encoder = self.lock()?;
        if encoder.is_none() {
            return Err(NeoShellCodecError::EndOfStream);
        }

        // The unfinished stream is discarded with the output of the inner sink.
        *encoder = None;
        self.inner.reset()?;
        *encoder = Some(Self::encoder(&self.inner));

        Ok(())
    }

    fn close(&self) -> Result<()> {
        let Some(encoder) = self.lock()?.take() else {
            return Ok(());
        };

        let result = encoder.finish().map(|_writer| ());
        let close_result = self.inner.close();

        result?;
        close_result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Read;

    use flate2::read::MultiGzDecoder;

    use crate::sink::MemorySink;

    /// Sink that records raw bytes, as [`MemorySink`] only returns text.
    #[derive(Default)]
    struct ByteSink {
        bytes: Mutex<Vec<u8>>,
        closed: Mutex<bool>,
    }

    impl Sink for ByteSink {
        fn write(&self, bytes: &[u8]) -> Result<()> {
            self.bytes.lock().unwrap().extend_from_slice(bytes);
            Ok(())
        }

        fn flush(&self) -> Result<()> {
            Ok(())
        }

        fn reset(&self) -> Result<()> {
            self.bytes.lock().unwrap().clear();
            Ok(())
        }

        fn close(&self) -> Result<()> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }
    }

    fn decompress(bytes: &[u8]) -> String {
        let mut text = String::new();
        MultiGzDecoder::new(bytes).read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn test_written_bytes_round_trip() {
        let inner = Arc::new(ByteSink::default());
        let sink = GzipSink::new(inner.clone());

        sink.write(b"NAME,VALUE\n").unwrap();
        sink.flush().unwrap();
        sink.write(b"x,1.5\n").unwrap();
        sink.close().unwrap();

        assert!(*inner.closed.lock().unwrap());
        assert_eq!("NAME,VALUE\nx,1.5\n", decompress(&inner.bytes.lock().unwrap()));
    }

    #[test]
    fn test_reset_starts_a_new_stream() {
        let inner = Arc::new(ByteSink::default());
        let sink = GzipSink::new(inner.clone());

        sink.write(b"old").unwrap();
        sink.flush().unwrap();
        sink.reset().unwrap();
        sink.write(b"new").unwrap();
        sink.close().unwrap();

        assert_eq!("new", decompress(&inner.bytes.lock().unwrap()));
    }

    #[test]
    fn test_closed_sink_reports_end_of_stream() {
        let sink = GzipSink::new(Arc::new(MemorySink::new()));
        sink.close().unwrap();
        sink.close().unwrap();

        assert!(matches!(sink.write(b"row"), Err(NeoShellCodecError::EndOfStream)));
        assert!(matches!(sink.reset(), Err(NeoShellCodecError::EndOfStream)));
    }
}
