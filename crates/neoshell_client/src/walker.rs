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


//! Fetch-on-demand backing store of the `walk` table. Rows are fetched from the cursor in blocks
//! when the view asks for a row that has not been fetched yet, and kept as formatted text.

use neoshell_codec::context::RenderContext;
use neoshell_codec::format::format_value;
use neoshell_codec::schema::ColumnType;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::database::{Cursor, Database};
use crate::error::Result;

/// Number of rows fetched from the cursor at a time.
pub const FETCH_SIZE: usize = 400;

struct WalkerState {
    cursor: Option<Box<dyn Cursor>>,
    /// The header followed by the rows fetched so far.
    rows: Vec<Vec<String>>,
    eof: bool,
    /// Error that ended fetching before the end of the result.
    fetch_error: Option<String>,
}

/// Rows of a query shared between the view and the fetcher. Every access goes through one mutex.
pub struct Walker<'a> {
    database: &'a dyn Database,
    sql: String,
    render_context: RenderContext,
    state: Mutex<WalkerState>,
}

impl<'a> Walker<'a> {
    /// Run `sql` and return a walker over its result. Returns [`NeoShellClientError`] if the query
    /// fails.
    ///
    /// [`NeoShellClientError`]: crate::error::NeoShellClientError
    pub async fn try_new(
        database: &'a dyn Database,
        sql: &str,
        render_context: RenderContext,
    ) -> Result<Self> {
        let walker = Self {
            database,
            sql: sql.to_owned(),
            render_context,
            state: Mutex::new(WalkerState {
                cursor: None,
                rows: vec![],
                eof: true,
                fetch_error: None,
            }),
        };

        walker.reload().await?;
        Ok(walker)
    }

    /// Run the query again and discard the rows fetched so far.
    pub async fn reload(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(mut cursor) = state.cursor.take() {
            cursor.close().await?;
        }

        let cursor = self.database.query(&self.sql, &[]).await?;

        let mut header = vec![];
        if self.render_context.rownum {
            header.push("ROWNUM".to_owned());
        }
        for column in cursor.columns().iter() {
            if column.column_type == ColumnType::DateTime {
                header.push(format!("{}({})", column.name, self.render_context.zone));
            } else {
                header.push(column.name.clone());
            }
        }

        state.cursor = Some(cursor);
        state.rows = vec![header];
        state.eof = false;
        state.fetch_error = None;

        debug!(sql = self.sql, "Walker loaded.");
        Ok(())
    }

    /// Return the header of the table.
    pub async fn header(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state.rows.first().cloned().unwrap_or_default()
    }

    /// Return the number of rows including the header, [`usize::MAX`] while the end of the result
    /// has not been reached so the view keeps asking for rows.
    pub async fn row_count(&self) -> usize {
        let state = self.state.lock().await;
        if state.eof { state.rows.len() } else { usize::MAX }
    }

    /// Return the error that truncated the result, if fetching failed.
    pub async fn fetch_error(&self) -> Option<String> {
        let state = self.state.lock().await;
        state.fetch_error.clone()
    }

    /// Return the row at `index` where index 0 is the header, fetching more rows if needed.
    /// Returns [`None`] if the result has fewer rows.
    pub async fn row(&self, index: usize) -> Option<Vec<String>> {
        let mut state = self.state.lock().await;

        while index >= state.rows.len() && !state.eof {
            self.fetch_more(&mut state).await;
        }

        state.rows.get(index).cloned()
    }

    /// Fetch every remaining row and return the number of rows including the header.
    pub async fn fetch_to_end(&self) -> usize {
        let mut state = self.state.lock().await;
        while !state.eof {
            self.fetch_more(&mut state).await;
        }
        state.rows.len()
    }

    /// Close the cursor.
    pub async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.eof = true;
        if let Some(mut cursor) = state.cursor.take() {
            cursor.close().await?;
        }
        Ok(())
    }

    async fn fetch_more(&self, state: &mut WalkerState) {
        let Some(cursor) = state.cursor.as_mut() else {
            state.eof = true;
            return;
        };

        for _ in 0..FETCH_SIZE {
            match cursor.next().await {
                Ok(Some(row)) => {
                    let number = state.rows.len();
                    let mut cells = Vec::with_capacity(row.len() + 1);
                    if self.render_context.rownum {
                        cells.push(number.to_string());
                    }
                    cells.extend(row.iter().map(|value| format_value(value, &self.render_context)));
                    state.rows.push(cells);
                }
                Ok(None) => {
                    state.eof = true;
                    break;
                }
                Err(error) => {
                    warn!(%error, "Failed to fetch rows, the result is truncated.");
                    state.fetch_error = Some(error.to_string());
                    state.eof = true;
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};
    use neoshell_codec::schema::{Column, Columns, Value};
    use neoshell_codec::timeformat::{EpochUnit, TimeFormat};
    use neoshell_codec::zone::Zone;

    use crate::database::memory::MemoryDatabase;

    fn database(count: i64) -> MemoryDatabase {
        let database = MemoryDatabase::new();
        let columns = Columns::new(vec![
            Column::new("TIME", ColumnType::DateTime),
            Column::new("VALUE", ColumnType::Int64),
        ]);
        let rows = (0..count)
            .map(|value| {
                vec![
                    Value::DateTime(Utc.timestamp_opt(value, 0).unwrap()),
                    Value::Int64(value),
                ]
            })
            .collect();
        database.create_table("numbers", columns, rows);
        database
    }

    fn render_context() -> RenderContext {
        RenderContext::builder()
            .zone(Zone::Utc)
            .time_format(TimeFormat::Epoch(EpochUnit::Seconds))
            .rownum(true)
            .build()
    }

    #[tokio::test]
    async fn test_header_names_zone_of_datetime_columns() {
        let database = database(1);
        let walker = Walker::try_new(&database, "select * from numbers", render_context())
            .await
            .unwrap();

        assert_eq!(vec!["ROWNUM", "TIME(UTC)", "VALUE"], walker.header().await);
    }

    #[tokio::test]
    async fn test_rows_are_fetched_in_blocks() {
        let database = database(1000);
        let walker = Walker::try_new(&database, "select * from numbers", render_context())
            .await
            .unwrap();

        assert_eq!(usize::MAX, walker.row_count().await);
        assert_eq!(
            Some(vec!["1".to_owned(), "0".to_owned(), "0".to_owned()]),
            walker.row(1).await
        );
        assert_eq!(FETCH_SIZE + 1, walker.state.lock().await.rows.len());

        assert_eq!(Some("401".to_owned()), walker.row(401).await.map(|row| row[0].clone()));
        assert_eq!(2 * FETCH_SIZE + 1, walker.state.lock().await.rows.len());
        assert_eq!(usize::MAX, walker.row_count().await);
    }

    #[tokio::test]
    async fn test_row_count_is_exact_at_end() {
        let database = database(5);
        let walker = Walker::try_new(&database, "select * from numbers", render_context())
            .await
            .unwrap();

        assert_eq!(None, walker.row(6).await);
        assert_eq!(6, walker.row_count().await);
        assert_eq!(6, walker.fetch_to_end().await);
    }

    #[tokio::test]
    async fn test_reload_runs_query_again() {
        let database = database(5);
        let walker = Walker::try_new(&database, "select * from numbers", render_context())
            .await
            .unwrap();
        walker.fetch_to_end().await;

        walker.reload().await.unwrap();

        assert_eq!(usize::MAX, walker.row_count().await);
        assert_eq!(2, database.queries().len());
        assert_eq!(1, database.closed_cursors());

        walker.close().await.unwrap();
        assert_eq!(2, database.closed_cursors());
    }

    #[tokio::test]
    async fn test_without_rownum() {
        let database = database(2);
        let context = RenderContext::builder().zone(Zone::Utc).build();
        let walker = Walker::try_new(&database, "select * from numbers", context)
            .await
            .unwrap();

        assert_eq!(vec!["TIME(UTC)", "VALUE"], walker.header().await);
        assert_eq!(2, walker.row(2).await.unwrap().len());
    }

    #[tokio::test]
    async fn test_fetch_error_truncates_result() {
        let database = database(10).with_fail_after(3);
        let walker = Walker::try_new(&database, "select * from numbers", render_context())
            .await
            .unwrap();

        assert_eq!(None, walker.row(5).await);
        assert_eq!(4, walker.row_count().await);
        assert!(walker.fetch_error().await.unwrap().contains("connection reset"));

        walker.reload().await.unwrap();
        assert_eq!(None, walker.fetch_error().await);
    }
}
