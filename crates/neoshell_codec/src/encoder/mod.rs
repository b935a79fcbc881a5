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

//! Encoders that serialize a row stream to a [`Sink`]. Every encoder follows the same contract:
//! [`RowEncoder::open()`] locks in the schema and writes the header, [`RowEncoder::render_row()`]
//! appends a row, [`RowEncoder::page_flush()`] renders what is buffered, and
//! [`RowEncoder::close()`] writes the footer and closes the sink. The output is valid for the
//! format even if no rows are rendered.

mod boxed;
pub mod chart;
mod csv;
mod json;

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

pub use boxed::BoxEncoder;
pub use chart::{ChartEncoder, Series};
pub use csv::CsvEncoder;
pub use json::JsonEncoder;

use crate::context::RenderContext;
use crate::error::{NeoShellCodecError, Result};
use crate::schema::{Columns, Value};
use crate::sink::Sink;

/// Name of the row number column in CSV and box output.
pub(crate) const ROWNUM_HEADER: &str = "#";

/// Output format of a row stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Box,
    Csv,
    Json,
}

impl OutputFormat {
    /// Return the number of lines the header of the format occupies, used to size pager pages.
    pub fn header_height(&self) -> usize {
        match self {
            Self::Box => 4,
            Self::Csv => 1,
            Self::Json => 0,
        }
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Box => f.write_str("box"),
            Self::Csv => f.write_str("csv"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = NeoShellCodecError;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "-" | "box" => Ok(Self::Box),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(NeoShellCodecError::InvalidArgument(format!(
                "unknown format '{name}', use one of -, box, csv, json."
            ))),
        }
    }
}

/// Encoder for one of the tabular output formats.
pub enum RowEncoder {
    Box(BoxEncoder),
    Csv(CsvEncoder),
    Json(JsonEncoder),
}

impl RowEncoder {
    /// Create an encoder for `format` that writes to `sink` according to `context`.
    pub fn new(format: OutputFormat, context: RenderContext, sink: Arc<dyn Sink>) -> Self {
        match format {
            OutputFormat::Box => Self::Box(BoxEncoder::new(context, sink)),
            OutputFormat::Csv => Self::Csv(CsvEncoder::new(context, sink)),
            OutputFormat::Json => Self::Json(JsonEncoder::new(context, sink)),
        }
    }

    pub fn format(&self) -> OutputFormat {
        match self {
            Self::Box(_) => OutputFormat::Box,
            Self::Csv(_) => OutputFormat::Csv,
            Self::Json(_) => OutputFormat::Json,
        }
    }

    pub fn context(&self) -> &RenderContext {
        match self {
            Self::Box(encoder) => &encoder.context,
            Self::Csv(encoder) => &encoder.context,
            Self::Json(encoder) => &encoder.context,
        }
    }

    /// Return the MIME type of the output.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Box(_) => "text/plain",
            Self::Csv(_) => "text/csv",
            Self::Json(_) => "application/json",
        }
    }

    /// Lock in `columns` as the schema of the stream and write the header.
    pub fn open(&mut self, columns: &Columns) -> Result<()> {
        match self {
            Self::Box(encoder) => encoder.open(columns),
            Self::Csv(encoder) => encoder.open(columns),
            Self::Json(encoder) => encoder.open(columns),
        }
    }

    /// Append `row`. Returns [`NeoShellCodecError::UnexpectedColumnCount`] if the arity of `row`
    /// differs from the schema.
    pub fn render_row(&mut self, row: &[Value]) -> Result<()> {
        match self {
            Self::Box(encoder) => encoder.render_row(row),
            Self::Csv(encoder) => encoder.render_row(row),
            Self::Json(encoder) => encoder.render_row(row),
        }
    }

    /// Render the buffered content. If `keep_heading` is not set, later output has no header.
    pub fn page_flush(&mut self, keep_heading: bool) -> Result<()> {
        match self {
            Self::Box(encoder) => encoder.page_flush(keep_heading),
            Self::Csv(encoder) => encoder.page_flush(),
            Self::Json(encoder) => encoder.page_flush(),
        }
    }

    /// Render the remaining rows, write the footer, and close the sink.
    pub fn close(&mut self) -> Result<()> {
        match self {
            Self::Box(encoder) => encoder.close(),
            Self::Csv(encoder) => encoder.close(),
            Self::Json(encoder) => encoder.close(),
        }
    }
}

/// Return an error if `row` does not have the arity of `columns`. `row_number` is one-based.
pub(crate) fn check_arity(columns: &Columns, row: &[Value], row_number: u64) -> Result<()> {
    if row.len() == columns.len() {
        Ok(())
    } else {
        Err(NeoShellCodecError::UnexpectedColumnCount {
            line: row_number,
            found: row.len(),
            expected: columns.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::schema::{Column, ColumnType};
    use crate::sink::MemorySink;

    fn columns() -> Columns {
        Columns::new(vec![
            Column::new("NAME", ColumnType::String),
            Column::new("VALUE", ColumnType::Float64),
        ])
    }

    fn rows() -> Vec<Vec<Value>> {
        (0..5)
            .map(|index| vec![Value::String(format!("tag{index}")), Value::Float64(index as f64)])
            .collect()
    }

    fn encode(format: OutputFormat, rownum: bool, flush_after_every_row: bool) -> String {
        let sink = Arc::new(MemorySink::new());
        let context = RenderContext::builder().rownum(rownum).build();
        let mut encoder = RowEncoder::new(format, context, sink.clone());

        encoder.open(&columns()).unwrap();
        for row in rows() {
            encoder.render_row(&row).unwrap();
            if flush_after_every_row {
                encoder.page_flush(false).unwrap();
            }
        }
        encoder.close().unwrap();

        assert!(sink.is_closed());
        sink.contents()
    }

    #[test]
    fn test_parse_output_formats() {
        assert_eq!(OutputFormat::Box, "-".parse().unwrap());
        assert_eq!(OutputFormat::Json, "JSON".parse().unwrap());
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_header_heights() {
        assert_eq!(4, OutputFormat::Box.header_height());
        assert_eq!(1, OutputFormat::Csv.header_height());
        assert_eq!(0, OutputFormat::Json.header_height());
    }

    #[test]
    fn test_render_row_rejects_wrong_arity() {
        let sink = Arc::new(MemorySink::new());
        let mut encoder = RowEncoder::new(OutputFormat::Csv, RenderContext::default(), sink);
        encoder.open(&columns()).unwrap();

        let result = encoder.render_row(&[Value::Null]);
        assert!(matches!(
            result,
            Err(NeoShellCodecError::UnexpectedColumnCount {
                found: 1,
                expected: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_header_arity_follows_rownum() {
        for rownum in [false, true] {
            let expected = columns().len() + usize::from(rownum);

            let csv = encode(OutputFormat::Csv, rownum, false);
            let header = csv.lines().next().unwrap();
            assert_eq!(expected, header.split(',').count());

            let json = encode(OutputFormat::Json, rownum, false);
            let document: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(
                expected,
                document["data"]["columns"].as_array().unwrap().len()
            );
        }
    }

    #[test]
    fn test_non_interactive_page_flush_does_not_change_csv_or_json() {
        for format in [OutputFormat::Csv, OutputFormat::Json] {
            assert_eq!(encode(format, true, false), encode(format, true, true));
        }
    }

    #[test]
    fn test_content_types() {
        let encoder = RowEncoder::new(
            OutputFormat::Json,
            RenderContext::default(),
            Arc::new(MemorySink::new()),
        );
        assert_eq!("application/json", encoder.content_type());
    }
}
