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

//! Encoder that writes one CSV record per row. Fields are only quoted when required.

use std::sync::Arc;

use ::csv::{Writer, WriterBuilder};

use crate::context::RenderContext;
use crate::encoder::{ROWNUM_HEADER, check_arity};
use crate::error::Result;
use crate::format::format_value;
use crate::schema::{Columns, Value};
use crate::sink::{Sink, SinkWriter};

pub struct CsvEncoder {
    pub(super) context: RenderContext,
    sink: Arc<dyn Sink>,
    columns: Columns,
    writer: Option<Writer<SinkWriter>>,
    row_number: u64,
}

impl CsvEncoder {
    pub fn new(context: RenderContext, sink: Arc<dyn Sink>) -> Self {
        Self {
            context,
            sink,
            columns: Columns::default(),
            writer: None,
            row_number: 0,
        }
    }

    pub(super) fn open(&mut self, columns: &Columns) -> Result<()> {
        self.columns = columns.clone();

        // The delimiter is validated to be ASCII when it is parsed.
        let mut writer = WriterBuilder::new()
            .delimiter(self.context.delimiter as u8)
            .flexible(false)
            .from_writer(SinkWriter::new(self.sink.clone()));

        if self.context.heading {
            let mut header = Vec::with_capacity(columns.len() + 1);
            if self.context.rownum {
                header.push(ROWNUM_HEADER.to_owned());
            }
            header.extend(columns.names());
            writer.write_record(&header)?;
        }

        self.writer = Some(writer);
        Ok(())
    }

    pub(super) fn render_row(&mut self, row: &[Value]) -> Result<()> {
        check_arity(&self.columns, row, self.row_number + 1)?;
        self.row_number += 1;

        let mut record = Vec::with_capacity(row.len() + 1);
        if self.context.rownum {
            record.push(self.row_number.to_string());
        }
        record.extend(row.iter().map(|value| format_value(value, &self.context)));

        if let Some(writer) = self.writer.as_mut() {
            writer.write_record(&record)?;
        }

        Ok(())
    }

    pub(super) fn page_flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }

        Ok(())
    }

    pub(super) fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        self.sink.close()
    }
}
