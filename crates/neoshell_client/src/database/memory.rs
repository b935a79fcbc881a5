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

//! In-memory implementation of [`Database`] used to test the verbs without a server. Tables
//! support `select * from`, `insert into … values(…)`, `create tag table`, `truncate table`, and
//! appenders. Any other query returns the result registered for its exact text.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use neoshell_codec::schema::{Column, ColumnType, Columns, Row, Value};
use serde_json::Value as JsonValue;

use crate::database::catalog::{self, ColumnDescription, ListedTable, TableDescription, TableKind};
use crate::database::{Appender, Cursor, Database, ManagementAction, check_management_response};
use crate::error::{NeoShellClientError, Result};

#[derive(Clone, Debug)]
struct MemoryTable {
    columns: Columns,
    rows: Vec<Row>,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<String, MemoryTable>,
    results: HashMap<String, (Columns, Vec<Row>)>,
    management_responses: HashMap<&'static str, JsonValue>,
    queries: Vec<(String, Vec<Value>)>,
    statements: Vec<(String, Vec<Value>)>,
    actions: Vec<ManagementAction>,
}

/// Database that keeps its tables in memory and records every request.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
    closed_cursors: Arc<AtomicUsize>,
    /// Number of rows a cursor returns before it blocks forever, used to test cancellation.
    stall_after: Option<usize>,
    /// Number of rows a cursor returns before it fails.
    fail_after: Option<usize>,
    remote: bool,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stall_after(mut self, rows: usize) -> Self {
        self.stall_after = Some(rows);
        self
    }

    pub fn with_fail_after(mut self, rows: usize) -> Self {
        self.fail_after = Some(rows);
        self
    }

    pub fn with_remote(mut self, remote: bool) -> Self {
        self.remote = remote;
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap()
    }

    pub fn create_table(&self, name: &str, columns: Columns, rows: Vec<Row>) {
        self.state()
            .tables
            .insert(name.to_uppercase(), MemoryTable { columns, rows });
    }

    pub fn rows(&self, name: &str) -> Vec<Row> {
        self.state()
            .tables
            .get(&name.to_uppercase())
            .map(|table| table.rows.clone())
            .unwrap_or_default()
    }

    pub fn add_result(&self, sql: &str, columns: Columns, rows: Vec<Row>) {
        self.state()
            .results
            .insert(sql.to_owned(), (columns, rows));
    }

    pub fn add_management_response(&self, action_type: &'static str, response: JsonValue) {
        self.state()
            .management_responses
            .insert(action_type, response);
    }

    pub fn queries(&self) -> Vec<(String, Vec<Value>)> {
        self.state().queries.clone()
    }

    pub fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.state().statements.clone()
    }

    pub fn actions(&self) -> Vec<ManagementAction> {
        self.state().actions.clone()
    }

    pub fn closed_cursors(&self) -> usize {
        self.closed_cursors.load(Ordering::SeqCst)
    }

    fn table_result(&self, sql: &str) -> Option<(Columns, Vec<Row>)> {
        let lowercase = sql.trim().to_lowercase();
        let name = lowercase.strip_prefix("select * from ")?.trim();

        self.state()
            .tables
            .get(&name.to_uppercase())
            .map(|table| (table.columns.clone(), table.rows.clone()))
    }
}

/// Schema of the tag tables created by `create tag table`.
pub fn tag_table_columns() -> Columns {
    Columns::new(vec![
        Column::new("NAME", ColumnType::String),
        Column::new("TIME", ColumnType::DateTime),
        Column::new("VALUE", ColumnType::Float64),
    ])
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Box<dyn Cursor>> {
        self.state().queries.push((sql.to_owned(), params.to_vec()));

        let result = self.table_result(sql).or_else(|| self.state().results.get(sql).cloned());
        let (columns, rows) = result.ok_or_else(|| {
            NeoShellClientError::Application(format!("no result for '{sql}'"))
        })?;

        Ok(Box::new(MemoryCursor {
            columns,
            rows: rows.into(),
            returned: 0,
            stall_after: self.stall_after,
            fail_after: self.fail_after,
            closed: false,
            closed_cursors: self.closed_cursors.clone(),
        }))
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<String> {
        let mut state = self.state();
        state.statements.push((sql.to_owned(), params.to_vec()));

        let lowercase = sql.trim().to_lowercase();
        if let Some(rest) = lowercase.strip_prefix("insert into ") {
            let name = rest.split_whitespace().next().unwrap_or_default().to_uppercase();
            let table = state.tables.get_mut(&name).ok_or_else(|| {
                NeoShellClientError::Application(format!("table '{name}' does not exist"))
            })?;
            table.rows.push(params.to_vec());
            Ok("a row inserted.".to_owned())
        } else if let Some(rest) = lowercase.strip_prefix("create tag table ") {
            let name = rest.split_whitespace().next().unwrap_or_default().to_uppercase();
            state.tables.insert(
                name,
                MemoryTable {
                    columns: tag_table_columns(),
                    rows: vec![],
                },
            );
            Ok("executed.".to_owned())
        } else if let Some(rest) = lowercase.strip_prefix("truncate table ") {
            let name = rest.trim().to_uppercase();
            if let Some(table) = state.tables.get_mut(&name) {
                table.rows.clear();
            }
            Ok("truncated.".to_owned())
        } else {
            Ok(String::new())
        }
    }

    async fn appender(&self, table: &str, _columns: &Columns) -> Result<Box<dyn Appender>> {
        if !self.state().tables.contains_key(&table.to_uppercase()) {
            return Err(NeoShellClientError::Application(format!(
                "table '{table}' does not exist"
            )));
        }

        Ok(Box::new(MemoryAppender {
            database: self.clone(),
            table: table.to_uppercase(),
            appended: 0,
        }))
    }

    async fn tables(&self) -> Result<Vec<String>> {
        let mut tables: Vec<String> = self.state().tables.keys().cloned().collect();
        tables.sort();
        Ok(tables)
    }

    async fn server_info(&self) -> Result<Vec<(String, String)>> {
        Ok(vec![
            ("build.version".to_owned(), "v1.0.0".to_owned()),
            ("runtime.os".to_owned(), "linux".to_owned()),
        ])
    }

    async fn manage(&self, action: &ManagementAction) -> Result<JsonValue> {
        let mut state = self.state();
        state.actions.push(action.clone());

        let response = state
            .management_responses
            .get(action.action_type())
            .cloned()
            .unwrap_or_else(|| serde_json::json!({"success": true}));

        check_management_response(response)
    }

    fn is_remote(&self) -> bool {
        self.remote
    }

    async fn describe(&self, table: &str, include_hidden: bool) -> Result<TableDescription> {
        let memory_table = self.state().tables.get(&table.to_uppercase()).cloned();

        match memory_table {
            Some(memory_table) => Ok(TableDescription {
                name: table.to_uppercase(),
                table_type: 6,
                flag: 0,
                id: 1,
                columns: memory_table
                    .columns
                    .iter()
                    .map(|column| ColumnDescription {
                        name: column.name.clone(),
                        type_code: type_code(column.column_type),
                        length: column.length.unwrap_or_default() as i64,
                    })
                    .collect(),
            }),
            None => catalog::describe(self, table, include_hidden).await,
        }
    }

    async fn list_tables(&self, kind: TableKind, include_hidden: bool) -> Result<Vec<ListedTable>> {
        if kind != TableKind::Tables {
            return catalog::list_tables(self, kind, include_hidden).await;
        }

        let tables = self
            .tables()
            .await?
            .into_iter()
            .enumerate()
            .filter(|(_, name)| include_hidden || !name.starts_with('_'))
            .map(|(index, name)| ListedTable {
                id: index as i64 + 1,
                name,
                description: "Tag Table".to_owned(),
            })
            .collect();

        Ok(tables)
    }
}

fn type_code(column_type: ColumnType) -> i64 {
    match column_type {
        ColumnType::Int16 => 4,
        ColumnType::Int32 => 8,
        ColumnType::Int64 => 12,
        ColumnType::Float32 => 16,
        ColumnType::Float64 => 20,
        ColumnType::String => 5,
        ColumnType::DateTime => 6,
        ColumnType::Ipv4 => 32,
        ColumnType::Ipv6 => 36,
        ColumnType::Binary => 97,
    }
}

struct MemoryCursor {
    columns: Columns,
    rows: VecDeque<Row>,
    returned: usize,
    stall_after: Option<usize>,
    fail_after: Option<usize>,
    closed: bool,
    closed_cursors: Arc<AtomicUsize>,
}

#[async_trait]
impl Cursor for MemoryCursor {
    fn columns(&self) -> &Columns {
        &self.columns
    }

    async fn next(&mut self) -> Result<Option<Row>> {
        if self.closed {
            return Ok(None);
        }

        if self.stall_after == Some(self.returned) {
            std::future::pending::<()>().await;
        }

        if self.fail_after == Some(self.returned) {
            return Err(NeoShellClientError::Application(
                "connection reset by server".to_owned(),
            ));
        }

        self.returned += 1;
        Ok(self.rows.pop_front())
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.closed_cursors.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

struct MemoryAppender {
    database: MemoryDatabase,
    table: String,
    appended: u64,
}

#[async_trait]
impl Appender for MemoryAppender {
    async fn append(&mut self, row: Row) -> Result<()> {
        if let Some(table) = self.database.state().tables.get_mut(&self.table) {
            table.rows.push(row);
        }
        self.appended += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<u64> {
        Ok(self.appended)
    }
}
