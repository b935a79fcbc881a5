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

//! The [`Error`] and [`Result`] types used throughout `neoshell_codec`.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Error as IoError;
use std::result::Result as StdResult;

use csv::Error as CsvError;
use serde_json::Error as JsonError;

/// Result type used throughout `neoshell_codec`.
pub type Result<T> = StdResult<T, NeoShellCodecError>;

/// Error type used throughout `neoshell_codec`.
#[derive(Debug)]
pub enum NeoShellCodecError {
    /// Error returned when a child process started by a sink fails or exits with a non-zero code.
    ChildProcess(String),
    /// Error returned by the csv crate.
    Csv(CsvError),
    /// Error returned when a single cell cannot be converted to the type of its column.
    Decode {
        line: u64,
        column_index: usize,
        column_name: String,
        reason: String,
    },
    /// Error returned when a sink is written to, flushed, or reset after it has been closed.
    EndOfStream,
    /// Error returned when an invalid argument was passed.
    InvalidArgument(String),
    /// Error returned from IO operations.
    Io(IoError),
    /// Error returned by serde_json.
    Json(JsonError),
    /// Error returned when a record does not have the same number of fields as the schema.
    UnexpectedColumnCount {
        line: u64,
        found: usize,
        expected: usize,
    },
}

impl Display for NeoShellCodecError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::ChildProcess(reason) => write!(f, "Child Process Error: {reason}"),
            Self::Csv(reason) => write!(f, "Csv Error: {reason}"),
            Self::Decode {
                line,
                column_index,
                column_name,
                reason,
            } => write!(
                f,
                "Decode Error: line {line}, column {column_index} ({column_name}): {reason}"
            ),
            Self::EndOfStream => write!(f, "End Of Stream Error: the sink is closed"),
            Self::InvalidArgument(reason) => write!(f, "Invalid Argument Error: {reason}"),
            Self::Io(reason) => write!(f, "Io Error: {reason}"),
            Self::Json(reason) => write!(f, "Json Error: {reason}"),
            Self::UnexpectedColumnCount {
                line,
                found,
                expected,
            } => write!(
                f,
                "Unexpected Column Count Error: line {line} has columns {found}, expected {expected}"
            ),
        }
    }
}

impl Error for NeoShellCodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        // Return the error that caused self to occur if one exists.
        match self {
            Self::ChildProcess(_reason) => None,
            Self::Csv(reason) => Some(reason),
            Self::Decode { .. } => None,
            Self::EndOfStream => None,
            Self::InvalidArgument(_reason) => None,
            Self::Io(reason) => Some(reason),
            Self::Json(reason) => Some(reason),
            Self::UnexpectedColumnCount { .. } => None,
        }
    }
}

impl From<CsvError> for NeoShellCodecError {
    fn from(error: CsvError) -> Self {
        Self::Csv(error)
    }
}

impl From<IoError> for NeoShellCodecError {
    fn from(error: IoError) -> Self {
        Self::Io(error)
    }
}

impl From<JsonError> for NeoShellCodecError {
    fn from(error: JsonError) -> Self {
        Self::Json(error)
    }
}
