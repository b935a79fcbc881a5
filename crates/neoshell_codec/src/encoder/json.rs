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

//! Encoder that writes the whole row stream as one JSON document of the form
//! `{"data":{"columns":[…],"types":[…],"rows":[[…],…]}}`. Rows are written as they arrive, so
//! the document is only complete after the encoder is closed.

use std::sync::Arc;

use crate::context::RenderContext;
use crate::encoder::check_arity;
use crate::error::Result;
use crate::format::format_value;
use crate::schema::{ColumnType, Columns, Value};
use crate::sink::Sink;

/// Name of the row number column in JSON output.
const ROWNUM_COLUMN: &str = "ROWNUM";

pub struct JsonEncoder {
    pub(super) context: RenderContext,
    sink: Arc<dyn Sink>,
    columns: Columns,
    row_number: u64,
}

impl JsonEncoder {
    pub fn new(context: RenderContext, sink: Arc<dyn Sink>) -> Self {
        Self {
            context,
            sink,
            columns: Columns::default(),
            row_number: 0,
        }
    }

    pub(super) fn open(&mut self, columns: &Columns) -> Result<()> {
        self.columns = columns.clone();

        let mut names = Vec::with_capacity(columns.len() + 1);
        let mut types = Vec::with_capacity(columns.len() + 1);
        if self.context.rownum {
            names.push(ROWNUM_COLUMN.to_owned());
            types.push(ColumnType::String.name().to_owned());
        }
        names.extend(columns.names());
        types.extend(columns.iter().map(|column| column.column_type.name().to_owned()));

        let header = format!(
            r#"{{"data":{{"columns":{},"types":{},"rows":["#,
            serde_json::to_string(&names)?,
            serde_json::to_string(&types)?
        );

        self.sink.write(header.as_bytes())
    }

    pub(super) fn render_row(&mut self, row: &[Value]) -> Result<()> {
        check_arity(&self.columns, row, self.row_number + 1)?;
        self.row_number += 1;

        let mut output = String::new();
        if self.row_number > 1 {
            output.push(',');
        }

        output.push('[');
        if self.context.rownum {
            output.push_str(&self.row_number.to_string());
            if !row.is_empty() {
                output.push(',');
            }
        }

        for (index, value) in row.iter().enumerate() {
            if index > 0 {
                output.push(',');
            }
            output.push_str(&self.json_token(value)?);
        }
        output.push(']');

        self.sink.write(output.as_bytes())
    }

    pub(super) fn page_flush(&mut self) -> Result<()> {
        self.sink.flush()
    }

    pub(super) fn close(&mut self) -> Result<()> {
        self.sink.write(b"]}}\n")?;
        self.sink.flush()?;
        self.sink.close()
    }

    /// Return `value` as a JSON token. Numbers keep the text produced by the value formatter so
    /// the precision is honored, and datetimes are numbers if they are formatted as epochs.
    fn json_token(&self, value: &Value) -> Result<String> {
        let token = match value {
            Value::Null => "null".to_owned(),
            Value::Float32(number) if !number.is_finite() => "null".to_owned(),
            Value::Float64(number) if !number.is_finite() => "null".to_owned(),
            Value::Int16(_)
            | Value::Int32(_)
            | Value::Int64(_)
            | Value::Float32(_)
            | Value::Float64(_) => format_value(value, &self.context),
            Value::DateTime(_) if self.context.time_format.is_epoch() => {
                format_value(value, &self.context)
            }
            _ => serde_json::to_string(&format_value(value, &self.context))?,
        };

        Ok(token)
    }
}
