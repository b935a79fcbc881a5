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

//! Encoder that draws rows as a table with box-drawing characters.

use std::sync::Arc;

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

use crate::context::RenderContext;
use crate::encoder::{ROWNUM_HEADER, check_arity};
use crate::error::Result;
use crate::format::format_value;
use crate::schema::{Columns, Value};
use crate::sink::Sink;

/// Number of buffered rows that triggers rendering even if the consumer does not flush pages.
const HEARTBEAT_ROWS: usize = 1000;

/// Encoder that accumulates rows in a table and draws it when a page is flushed, every
/// [`HEARTBEAT_ROWS`] rows, and when closed.
pub struct BoxEncoder {
    pub(super) context: RenderContext,
    sink: Arc<dyn Sink>,
    columns: Columns,
    table: Table,
    buffered_rows: usize,
    row_number: u64,
    /// Set if the next rendered table should have a header.
    show_header: bool,
    /// Set once any table has been written to the sink.
    rendered: bool,
}

impl BoxEncoder {
    pub fn new(context: RenderContext, sink: Arc<dyn Sink>) -> Self {
        Self {
            context,
            sink,
            columns: Columns::default(),
            table: Table::new(),
            buffered_rows: 0,
            row_number: 0,
            show_header: false,
            rendered: false,
        }
    }

    pub(super) fn open(&mut self, columns: &Columns) -> Result<()> {
        self.columns = columns.clone();
        self.show_header = self.context.heading;
        self.table = self.new_table();
        Ok(())
    }

    pub(super) fn render_row(&mut self, row: &[Value]) -> Result<()> {
        check_arity(&self.columns, row, self.row_number + 1)?;
        self.row_number += 1;

        let mut cells = Vec::with_capacity(row.len() + 1);
        if self.context.rownum {
            cells.push(Cell::new(self.row_number).set_alignment(CellAlignment::Right));
        }

        for (value, column) in row.iter().zip(self.columns.iter()) {
            let cell = Cell::new(format_value(value, &self.context));
            if column.column_type.is_numeric() {
                cells.push(cell.set_alignment(CellAlignment::Right));
            } else {
                cells.push(cell);
            }
        }

        self.table.add_row(cells);
        self.buffered_rows += 1;

        if self.buffered_rows >= HEARTBEAT_ROWS {
            self.render_table(false)?;
        }

        Ok(())
    }

    pub(super) fn page_flush(&mut self, keep_heading: bool) -> Result<()> {
        self.render_table(keep_heading)?;
        self.sink.flush()
    }

    pub(super) fn close(&mut self) -> Result<()> {
        // An empty result still shows its header unless something has already been rendered.
        if self.buffered_rows > 0 || (!self.rendered && self.show_header) {
            self.render_table(false)?;
        }

        self.sink.flush()?;
        self.sink.close()
    }

    /// Write the buffered rows and start a new table. The new table only has a header if
    /// `keep_heading` is set and the context has heading enabled.
    fn render_table(&mut self, keep_heading: bool) -> Result<()> {
        if self.buffered_rows > 0 || (self.show_header && !self.rendered) {
            let mut output = self.table.to_string();
            output.push('\n');
            self.sink.write(output.as_bytes())?;
            self.rendered = true;
        }

        self.show_header = keep_heading && self.context.heading;
        self.table = self.new_table();
        self.buffered_rows = 0;
        Ok(())
    }

    fn new_table(&self) -> Table {
        let mut table = Table::new();
        if self.context.interactive {
            table.load_preset(self.context.box_style.preset());
        } else {
            table.load_preset(&self.context.box_style.borderless_preset());
        }
        table.set_content_arrangement(ContentArrangement::Disabled);

        if self.show_header {
            let mut header = Vec::with_capacity(self.columns.len() + 1);
            if self.context.rownum {
                header.push(Cell::new(ROWNUM_HEADER));
            }
            header.extend(self.columns.iter().map(|column| Cell::new(&column.name)));
            table.set_header(header);
        }

        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::context::BoxStyle;
    use crate::schema::{Column, ColumnType};
    use crate::sink::MemorySink;

    fn encoder(interactive: bool, heading: bool) -> (BoxEncoder, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let context = RenderContext::builder()
            .box_style(BoxStyle::Light)
            .interactive(interactive)
            .heading(heading)
            .rownum(true)
            .build();

        let mut encoder = BoxEncoder::new(context, sink.clone());
        encoder
            .open(&Columns::new(vec![
                Column::new("NAME", ColumnType::String),
                Column::new("VALUE", ColumnType::Int64),
            ]))
            .unwrap();

        (encoder, sink)
    }

    #[test]
    fn test_interactive_table_has_border() {
        let (mut encoder, sink) = encoder(true, true);
        encoder
            .render_row(&[Value::String("a".to_owned()), Value::Int64(1)])
            .unwrap();
        encoder.close().unwrap();

        let output = sink.contents();
        assert!(output.starts_with('┌'));
        assert!(output.contains("NAME"));
        assert!(output.contains("│ 1 │ a    │"));
    }

    #[test]
    fn test_non_interactive_table_has_no_border() {
        let (mut encoder, sink) = encoder(false, true);
        encoder
            .render_row(&[Value::String("a".to_owned()), Value::Int64(1)])
            .unwrap();
        encoder.close().unwrap();

        let output = sink.contents();
        assert!(!output.contains('│'));
        assert!(!output.contains('┌'));
        assert!(output.contains("NAME"));
    }

    #[test]
    fn test_page_flush_repeats_header_only_if_kept() {
        let (mut encoder, sink) = encoder(true, true);
        let row = [Value::String("a".to_owned()), Value::Int64(1)];

        encoder.render_row(&row).unwrap();
        encoder.page_flush(true).unwrap();
        encoder.render_row(&row).unwrap();
        encoder.page_flush(false).unwrap();
        encoder.render_row(&row).unwrap();
        encoder.close().unwrap();

        assert_eq!(2, sink.contents().matches("NAME").count());
    }

    #[test]
    fn test_empty_result_shows_header() {
        let (mut encoder, sink) = encoder(true, true);
        encoder.close().unwrap();

        assert!(sink.contents().contains("VALUE"));
    }

    #[test]
    fn test_empty_result_without_heading_writes_nothing() {
        let (mut encoder, sink) = encoder(true, false);
        encoder.close().unwrap();

        assert_eq!("", sink.contents());
    }

    #[test]
    fn test_heartbeat_renders_without_flush() {
        let (mut encoder, sink) = encoder(false, false);
        for index in 0..HEARTBEAT_ROWS as i64 {
            encoder
                .render_row(&[Value::String("a".to_owned()), Value::Int64(index)])
                .unwrap();
        }

        assert_eq!(HEARTBEAT_ROWS, sink.contents().lines().count());
    }
}
