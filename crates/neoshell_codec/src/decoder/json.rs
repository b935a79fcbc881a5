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

//! Decoder for documents of the form written by the JSON encoder. Only `data.rows` is read, the
//! other keys are skipped, and the "line" of an error is the one-based index of the row. The input
//! is read one row at a time, so the rows before a malformed row are returned before its error.

use std::io::{BufRead, BufReader, Read};

use serde::de::Error as _;
use serde_json::Value as JsonValue;

use crate::context::RenderContext;
use crate::decoder::{decode_error, parse_value};
use crate::error::{NeoShellCodecError, Result};
use crate::schema::{Column, ColumnType, Columns, Row, Value};

/// Position of the decoder in `data.rows`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RowsState {
    First,
    Next,
    Done,
}

pub struct JsonDecoder<R: Read> {
    scanner: Scanner<BufReader<R>>,
    state: RowsState,
    row_index: u64,
    columns: Columns,
    context: RenderContext,
    buffer: Vec<u8>,
}

impl<R: Read> JsonDecoder<R> {
    /// Create a decoder and read `reader` until the start of `data.rows`. Returns
    /// [`NeoShellCodecError`] if the document is not an object or has no `data` object.
    pub fn new(reader: R, columns: Columns, context: RenderContext) -> Result<Self> {
        let mut decoder = Self {
            scanner: Scanner::new(BufReader::new(reader)),
            state: RowsState::Done,
            row_index: 0,
            columns,
            context,
            buffer: vec![],
        };

        if !decoder.scanner.enter_member("data")? {
            return Err(syntax_error("missing field `data`"));
        }
        if decoder.scanner.enter_member("rows")? {
            decoder.scanner.expect(b'[')?;
            decoder.state = RowsState::First;
        }

        Ok(decoder)
    }

    pub(super) fn next_row(&mut self) -> Result<Option<Row>> {
        let more = match self.state {
            RowsState::First => self.scanner.first_element(),
            RowsState::Next => self.scanner.next_element(),
            RowsState::Done => return Ok(None),
        }
        .map_err(|error| row_error(self.row_index + 1, error))?;

        if !more {
            self.state = RowsState::Done;
            return Ok(None);
        }
        self.state = RowsState::Next;
        self.row_index += 1;

        self.buffer.clear();
        self.scanner
            .value(&mut self.buffer)
            .map_err(|error| row_error(self.row_index, error))?;
        let cells: Vec<JsonValue> = serde_json::from_slice(&self.buffer)
            .map_err(|error| row_error(self.row_index, error.into()))?;

        if cells.len() != self.columns.len() {
            return Err(NeoShellCodecError::UnexpectedColumnCount {
                line: self.row_index,
                found: cells.len(),
                expected: self.columns.len(),
            });
        }

        let mut row = Vec::with_capacity(cells.len());
        for (column_index, (cell, column)) in cells.iter().zip(self.columns.iter()).enumerate() {
            let value = self
                .json_value(cell, column)
                .map_err(|reason| decode_error(self.row_index, column_index, column, reason))?;
            row.push(value);
        }

        Ok(Some(row))
    }

    fn json_value(&self, cell: &JsonValue, column: &Column) -> std::result::Result<Value, String> {
        match (cell, column.column_type) {
            (JsonValue::Null, _) => Ok(Value::Null),
            (JsonValue::String(text), _) => parse_value(text, column.column_type, &self.context),
            (JsonValue::Number(number), ColumnType::Int16) => {
                let integer = integer(number, column.column_type)?;
                i16::try_from(integer)
                    .map(Value::Int16)
                    .map_err(|error| format!("{integer} is not a valid int16: {error}"))
            }
            (JsonValue::Number(number), ColumnType::Int32) => {
                let integer = integer(number, column.column_type)?;
                i32::try_from(integer)
                    .map(Value::Int32)
                    .map_err(|error| format!("{integer} is not a valid int32: {error}"))
            }
            (JsonValue::Number(number), ColumnType::Int64) => {
                integer(number, column.column_type).map(Value::Int64)
            }
            (JsonValue::Number(number), ColumnType::Float32) => float(number)
                .map(|value| Value::Float32(value as f32)),
            (JsonValue::Number(number), ColumnType::Float64) => float(number).map(Value::Float64),
            (JsonValue::Number(number), ColumnType::DateTime) => {
                // Epoch numbers are interpreted in the configured unit, nanoseconds by default.
                parse_value(&number.to_string(), column.column_type, &self.context).or_else(|_| {
                    let nanoseconds = integer(number, column.column_type)?;
                    Ok(Value::DateTime(chrono::DateTime::from_timestamp_nanos(
                        nanoseconds,
                    )))
                })
            }
            (JsonValue::Number(number), _) => {
                parse_value(&number.to_string(), column.column_type, &self.context)
            }
            (JsonValue::Bool(boolean), ColumnType::String) => Ok(Value::String(boolean.to_string())),
            (cell, column_type) => Err(format!("{cell} is not a valid {column_type}")),
        }
    }
}

/// Return `number` as an integer. Floats without a fraction are accepted as the JSON encoder
/// writes integers with the configured precision.
fn integer(number: &serde_json::Number, column_type: ColumnType) -> std::result::Result<i64, String> {
    if let Some(integer) = number.as_i64() {
        return Ok(integer);
    }

    match number.as_f64() {
        Some(float)
            if float.fract() == 0.0 && float >= i64::MIN as f64 && float < i64::MAX as f64 =>
        {
            Ok(float as i64)
        }
        _ => Err(format!("{number} is not a valid {column_type}")),
    }
}

fn float(number: &serde_json::Number) -> std::result::Result<f64, String> {
    number
        .as_f64()
        .ok_or_else(|| format!("{number} is not a valid double"))
}

/// Add the index of the row to syntax errors.
fn row_error(line: u64, error: NeoShellCodecError) -> NeoShellCodecError {
    match error {
        NeoShellCodecError::Json(error) => syntax_error(format!("row {line}: {error}")),
        error => error,
    }
}

fn syntax_error(message: impl std::fmt::Display) -> NeoShellCodecError {
    NeoShellCodecError::Json(serde_json::Error::custom(message))
}

/// Reads the structure of a JSON document one byte at a time so single values can be copied out
/// and parsed on their own. Only strings and the nesting of arrays and objects are checked, the
/// copied values are validated when they are parsed.
struct Scanner<R: BufRead> {
    reader: R,
    skipped: Vec<u8>,
}

impl<R: BufRead> Scanner<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            skipped: vec![],
        }
    }

    /// Read the object at the current position until its member `name` and stop in front of the
    /// member's value. Returns `false` if the object ends without such a member.
    fn enter_member(&mut self, name: &str) -> Result<bool> {
        self.expect(b'{')?;
        if self.peek_token()? == Some(b'}') {
            self.bump();
            return Ok(false);
        }

        let mut raw_key = vec![];
        loop {
            if self.peek_token()? != Some(b'"') {
                return Err(syntax_error("expected an object key"));
            }

            raw_key.clear();
            self.string(&mut raw_key)?;
            self.expect(b':')?;

            let key: String = serde_json::from_slice(&raw_key)?;
            if key == name {
                return Ok(true);
            }

            let mut skipped = std::mem::take(&mut self.skipped);
            skipped.clear();
            let result = self.value(&mut skipped);
            self.skipped = skipped;
            result?;

            match self.peek_token()? {
                Some(b',') => self.bump(),
                Some(b'}') => {
                    self.bump();
                    return Ok(false);
                }
                _ => return Err(syntax_error("expected ',' or '}' after an object member")),
            }
        }
    }

    /// Return `true` if the array that was just opened has an element.
    fn first_element(&mut self) -> Result<bool> {
        match self.peek_token()? {
            Some(b']') => {
                self.bump();
                Ok(false)
            }
            Some(_) => Ok(true),
            None => Err(end_of_input()),
        }
    }

    /// Consume the separator after an array element and return `true` if another element follows.
    fn next_element(&mut self) -> Result<bool> {
        match self.peek_token()? {
            Some(b',') => {
                self.bump();
                Ok(true)
            }
            Some(b']') => {
                self.bump();
                Ok(false)
            }
            Some(byte) => Err(syntax_error(format!(
                "expected ',' or ']' after an array element, found '{}'",
                byte as char
            ))),
            None => Err(end_of_input()),
        }
    }

    fn expect(&mut self, expected: u8) -> Result<()> {
        match self.peek_token()? {
            Some(byte) if byte == expected => {
                self.bump();
                Ok(())
            }
            Some(byte) => Err(syntax_error(format!(
                "expected '{}', found '{}'",
                expected as char, byte as char
            ))),
            None => Err(end_of_input()),
        }
    }

    /// Copy the value at the current position to `output`.
    fn value(&mut self, output: &mut Vec<u8>) -> Result<()> {
        match self.peek_token()? {
            None => Err(end_of_input()),
            Some(b'"') => self.string(output),
            Some(b'[' | b'{') => {
                let mut depth = 0_usize;
                loop {
                    match self.peek()? {
                        Some(b'"') => self.string(output)?,
                        Some(_) => match self.copy_byte(output)? {
                            b'[' | b'{' => depth += 1,
                            b']' | b'}' => {
                                depth -= 1;
                                if depth == 0 {
                                    return Ok(());
                                }
                            }
                            _ => (),
                        },
                        None => return Err(end_of_input()),
                    }
                }
            }
            Some(_) => {
                while let Some(byte) = self.peek()? {
                    if matches!(byte, b',' | b']' | b'}') || byte.is_ascii_whitespace() {
                        break;
                    }
                    self.bump();
                    output.push(byte);
                }
                Ok(())
            }
        }
    }

    /// Copy the string at the current position, including its quotes, to `output`.
    fn string(&mut self, output: &mut Vec<u8>) -> Result<()> {
        self.copy_byte(output)?;
        loop {
            match self.copy_byte(output)? {
                b'"' => return Ok(()),
                b'\\' => {
                    self.copy_byte(output)?;
                }
                _ => (),
            }
        }
    }

    fn copy_byte(&mut self, output: &mut Vec<u8>) -> Result<u8> {
        let byte = self.peek()?.ok_or_else(end_of_input)?;
        self.bump();
        output.push(byte);
        Ok(byte)
    }

    /// Skip whitespace and return the next byte without consuming it.
    fn peek_token(&mut self) -> Result<Option<u8>> {
        while let Some(byte) = self.peek()? {
            if !byte.is_ascii_whitespace() {
                return Ok(Some(byte));
            }
            self.bump();
        }
        Ok(None)
    }

    fn peek(&mut self) -> Result<Option<u8>> {
        Ok(self.reader.fill_buf()?.first().copied())
    }

    fn bump(&mut self) {
        self.reader.consume(1);
    }
}

fn end_of_input() -> NeoShellCodecError {
    syntax_error("unexpected end of input")
}
