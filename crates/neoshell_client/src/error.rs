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

//! The [`Error`] and [`Result`] types used throughout `neoshell_client`.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Error as IoError;
use std::result::Result as StdResult;

use arrow::error::ArrowError;
use neoshell_codec::error::NeoShellCodecError;
use rustyline::error::ReadlineError as RustyLineError;
use serde_json::Error as JsonError;
use tonic::Status as TonicStatusError;
use tonic::transport::Error as TonicTransportError;

/// Result type used throughout `neoshell_client`.
pub type Result<T> = StdResult<T, NeoShellClientError>;

/// Error type used throughout `neoshell_client`.
#[derive(Debug)]
pub enum NeoShellClientError {
    /// Reason returned by the server in a `{success: false, reason}` response.
    Application(String),
    /// Error returned by Apache Arrow.
    Arrow(ArrowError),
    /// Returned when the user cancels a running command, it is never printed as an error.
    Cancelled,
    /// Error returned by `neoshell_codec`.
    Codec(NeoShellCodecError),
    /// Error returned when an invalid argument was passed.
    InvalidArgument(String),
    /// Error returned from IO operations.
    Io(IoError),
    /// Error returned by serde_json.
    Json(JsonError),
    /// Error returned by RustyLine.
    RustyLine(RustyLineError),
    /// Returned when the server does not respond before a deadline.
    Timeout(String),
    /// Status returned by Tonic.
    TonicStatus(TonicStatusError),
    /// Error returned by Tonic.
    TonicTransport(TonicTransportError),
}

impl NeoShellClientError {
    /// Return [`true`] if the error is the result of the user cancelling a command.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl Display for NeoShellClientError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Application(reason) => write!(f, "{reason}"),
            Self::Arrow(reason) => write!(f, "Arrow Error: {reason}"),
            Self::Cancelled => write!(f, "user cancelled"),
            Self::Codec(reason) => write!(f, "{reason}"),
            Self::InvalidArgument(reason) => write!(f, "Invalid Argument Error: {reason}"),
            Self::Io(reason) => write!(f, "Io Error: {reason}"),
            Self::Json(reason) => write!(f, "Json Error: {reason}"),
            Self::RustyLine(reason) => write!(f, "RustyLine Error: {reason}"),
            Self::Timeout(reason) => write!(f, "Timeout Error: {reason}"),
            Self::TonicStatus(reason) => write!(f, "Tonic Status Error: {reason}"),
            Self::TonicTransport(reason) => write!(f, "Tonic Transport Error: {reason}"),
        }
    }
}

impl Error for NeoShellClientError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        // Return the error that caused self to occur if one exists.
        match self {
            Self::Application(_reason) => None,
            Self::Arrow(reason) => Some(reason),
            Self::Cancelled => None,
            Self::Codec(reason) => Some(reason),
            Self::InvalidArgument(_reason) => None,
            Self::Io(reason) => Some(reason),
            Self::Json(reason) => Some(reason),
            Self::RustyLine(reason) => Some(reason),
            Self::Timeout(_reason) => None,
            Self::TonicStatus(reason) => Some(reason),
            Self::TonicTransport(reason) => Some(reason),
        }
    }
}

impl From<ArrowError> for NeoShellClientError {
    fn from(error: ArrowError) -> Self {
        Self::Arrow(error)
    }
}

impl From<NeoShellCodecError> for NeoShellClientError {
    fn from(error: NeoShellCodecError) -> Self {
        Self::Codec(error)
    }
}

impl From<IoError> for NeoShellClientError {
    fn from(error: IoError) -> Self {
        Self::Io(error)
    }
}

impl From<JsonError> for NeoShellClientError {
    fn from(error: JsonError) -> Self {
        Self::Json(error)
    }
}

impl From<RustyLineError> for NeoShellClientError {
    fn from(error: RustyLineError) -> Self {
        Self::RustyLine(error)
    }
}

impl From<TonicStatusError> for NeoShellClientError {
    fn from(error: TonicStatusError) -> Self {
        Self::TonicStatus(error)
    }
}

impl From<TonicTransportError> for NeoShellClientError {
    fn from(error: TonicTransportError) -> Self {
        Self::TonicTransport(error)
    }
}
