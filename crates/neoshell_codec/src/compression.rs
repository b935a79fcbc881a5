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


//! Optional gzip compression of the output of `sql` and `export` and of the input of `import`.

use std::fmt::{Display, Formatter};
use std::io::{BufReader, Read};
use std::str::FromStr;
use std::sync::Arc;

use flate2::read::MultiGzDecoder;

use crate::error::{NeoShellCodecError, Result};
use crate::sink::{GzipSink, Sink};

/// Compression of a byte stream, written as `-` when the stream is not compressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Compression {
    #[default]
    None,
    Gzip,
}

impl Compression {
    /// Return `sink` wrapped so the bytes written to it are compressed.
    pub fn compress(self, sink: Arc<dyn Sink>) -> Arc<dyn Sink> {
        match self {
            Self::None => sink,
            Self::Gzip => Arc::new(GzipSink::new(sink)),
        }
    }

    /// Return `reader` wrapped so the bytes read from it are decompressed. Concatenated gzip
    /// members are read as one stream.
    pub fn decompress<'a>(self, reader: Box<dyn Read + Send + 'a>) -> Box<dyn Read + Send + 'a> {
        match self {
            Self::None => reader,
            Self::Gzip => Box::new(BufReader::new(MultiGzDecoder::new(reader))),
        }
    }
}

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("-"),
            Self::Gzip => f.write_str("gzip"),
        }
    }
}

impl FromStr for Compression {
    type Err = NeoShellCodecError;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "-" | "" => Ok(Self::None),
            "gzip" => Ok(Self::Gzip),
            _ => Err(NeoShellCodecError::InvalidArgument(format!(
                "unknown compression '{name}', use gzip."
            ))),
        }
    }
}
