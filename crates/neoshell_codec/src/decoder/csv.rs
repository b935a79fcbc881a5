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

//! Decoder that parses one row per CSV record.

use std::io::Read;

use ::csv::{Reader, ReaderBuilder, StringRecord};

use crate::context::RenderContext;
use crate::decoder::{decode_error, parse_value};
use crate::error::{NeoShellCodecError, Result};
use crate::schema::{Columns, Row};

pub struct CsvDecoder<R: Read> {
    reader: Reader<R>,
    record: StringRecord,
    columns: Columns,
    context: RenderContext,
    skip_header: bool,
}

impl<R: Read> CsvDecoder<R> {
    pub fn new(reader: R, columns: Columns, context: RenderContext, skip_header: bool) -> Self {
        // Records are flexible so the arity can be checked per record with its line number.
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(context.delimiter as u8)
            .from_reader(reader);

        Self {
            reader,
            record: StringRecord::new(),
            columns,
            context,
            skip_header,
        }
    }

    pub(super) fn next_row(&mut self) -> Result<Option<Row>> {
        loop {
            if !self.reader.read_record(&mut self.record)? {
                return Ok(None);
            }

            if self.skip_header {
                self.skip_header = false;
                continue;
            }

            let line = self
                .record
                .position()
                .map_or(0, |position| position.line());

            if self.record.len() != self.columns.len() {
                return Err(NeoShellCodecError::UnexpectedColumnCount {
                    line,
                    found: self.record.len(),
                    expected: self.columns.len(),
                });
            }

            let mut row = Vec::with_capacity(self.columns.len());
            for (column_index, (field, column)) in
                self.record.iter().zip(self.columns.iter()).enumerate()
            {
                let value = parse_value(field, column.column_type, &self.context)
                    .map_err(|reason| decode_error(line, column_index, column, reason))?;
                row.push(value);
            }

            return Ok(Some(row));
        }
    }
}
