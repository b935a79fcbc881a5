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

//! Decoders that parse CSV or JSON input into rows of a target schema. Errors carry the line,
//! column index, and column name of the cell that could not be decoded, so `import` can report
//! where it stopped.

mod csv;
mod json;

use std::fmt::{Display, Formatter};
use std::io::Read;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

pub use csv::CsvDecoder;
pub use json::JsonDecoder;

use crate::context::RenderContext;
use crate::error::{NeoShellCodecError, Result};
use crate::schema::{Column, ColumnType, Columns, Row, Value};

/// Input format of a row stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Json,
}

impl Display for InputFormat {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Csv => f.write_str("csv"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for InputFormat {
    type Err = NeoShellCodecError;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(NeoShellCodecError::InvalidArgument(format!(
                "unknown input format '{name}', use one of csv, json."
            ))),
        }
    }
}

/// Decoder for one of the input formats.
pub enum RowDecoder<R: Read> {
    Csv(CsvDecoder<R>),
    Json(JsonDecoder<R>),
}

impl<R: Read> RowDecoder<R> {
    /// Create a decoder for `format` that reads from `reader`. If `skip_header` is set the first
    /// CSV record is skipped. JSON input is read up to the start of `data.rows` before returning.
    pub fn new(
        format: InputFormat,
        reader: R,
        columns: Columns,
        context: RenderContext,
        skip_header: bool,
    ) -> Result<Self> {
        match format {
            InputFormat::Csv => Ok(Self::Csv(CsvDecoder::new(
                reader,
                columns,
                context,
                skip_header,
            ))),
            InputFormat::Json => Ok(Self::Json(JsonDecoder::new(reader, columns, context)?)),
        }
    }

    /// Return the next row or [`None`] at the end of the input.
    pub fn next_row(&mut self) -> Result<Option<Row>> {
        match self {
            Self::Csv(decoder) => decoder.next_row(),
            Self::Json(decoder) => decoder.next_row(),
        }
    }
}

/// Return a decode error for the cell at `column_index` of the row at `line`.
pub(crate) fn decode_error(
    line: u64,
    column_index: usize,
    column: &Column,
    reason: impl Into<String>,
) -> NeoShellCodecError {
    NeoShellCodecError::Decode {
        line,
        column_index,
        column_name: column.name.clone(),
        reason: reason.into(),
    }
}

/// Parse the text of a cell as a value of `column_type`. The parsing is the inverse of the value
/// formatter except that `NULL` is not interpreted as a null value.
pub(crate) fn parse_value(
    text: &str,
    column_type: ColumnType,
    context: &RenderContext,
) -> std::result::Result<Value, String> {
    let value = match column_type {
        ColumnType::Int16 => Value::Int16(parse_number(text, column_type)?),
        ColumnType::Int32 => Value::Int32(parse_number(text, column_type)?),
        ColumnType::Int64 => Value::Int64(parse_number(text, column_type)?),
        ColumnType::Float32 => Value::Float32(parse_number(text, column_type)?),
        ColumnType::Float64 => Value::Float64(parse_number(text, column_type)?),
        ColumnType::String => Value::String(text.to_owned()),
        ColumnType::DateTime => Value::DateTime(
            context
                .time_format
                .parse(text, &context.zone)
                .map_err(|error| error.to_string())?,
        ),
        ColumnType::Ipv4 => Value::Ipv4(parse_number::<Ipv4Addr>(text, column_type)?),
        ColumnType::Ipv6 => Value::Ipv6(parse_number::<Ipv6Addr>(text, column_type)?),
        ColumnType::Binary => Value::Binary(parse_binary(text)),
    };

    Ok(value)
}

fn parse_number<T: FromStr>(text: &str, column_type: ColumnType) -> std::result::Result<T, String>
where
    T::Err: Display,
{
    text.trim()
        .parse()
        .map_err(|error| format!("'{text}' is not a valid {column_type}: {error}"))
}

/// Parse binary cells written as `0x` followed by hexadecimal digits. Any other text is taken
/// as the bytes of the text.
fn parse_binary(text: &str) -> Vec<u8> {
    let hex = match text.strip_prefix("0x") {
        Some(hex) if hex.len() % 2 == 0 && hex.bytes().all(|byte| byte.is_ascii_hexdigit()) => hex,
        _ => return text.as_bytes().to_vec(),
    };

    (0..hex.len())
        .step_by(2)
        .filter_map(|index| u8::from_str_radix(&hex[index..index + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::zone::Zone;

    #[test]
    fn test_parse_integer_out_of_range() {
        let result = parse_value("70000", ColumnType::Int16, &RenderContext::default());
        assert!(result.unwrap_err().contains("int16"));
    }

    #[test]
    fn test_null_text_is_not_null() {
        assert_eq!(
            Value::String("NULL".to_owned()),
            parse_value("NULL", ColumnType::String, &RenderContext::default()).unwrap()
        );
        assert!(parse_value("NULL", ColumnType::Int64, &RenderContext::default()).is_err());
    }

    #[test]
    fn test_parse_datetime_with_context() {
        let context = RenderContext::builder()
            .time_format("s".parse().unwrap())
            .zone(Zone::Utc)
            .build();
        let value = parse_value("1735787045", ColumnType::DateTime, &context).unwrap();

        assert_eq!(
            "1735787045",
            crate::format::format_value(&value, &context)
        );
    }

    #[test]
    fn test_parse_binary() {
        assert_eq!(vec![0, 255], parse_binary("0x00ff"));
        assert_eq!(b"raw".to_vec(), parse_binary("raw"));
    }

    #[test]
    fn test_parse_input_format() {
        assert_eq!(InputFormat::Csv, "CSV".parse().unwrap());
        assert!("box".parse::<InputFormat>().is_err());
    }
}
