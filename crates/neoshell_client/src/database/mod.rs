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

//! Operations for interacting with the database server. The verbs only depend on the
//! [`Database`] trait so they can be run against the Apache Arrow Flight client or, in tests, an
//! in-memory database.

pub mod catalog;
pub mod flight;
#[cfg(test)]
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use neoshell_codec::schema::{Columns, Row, Value};
use serde_json::Value as JsonValue;

use crate::database::catalog::{ListedTable, TableDescription, TableKind};
use crate::error::{NeoShellClientError, Result};

/// Keywords that start statements which return rows.
const FETCHABLE_KEYWORDS: [&str; 5] = ["SELECT", "EXPLAIN", "SHOW", "DESC", "WITH"];

/// Deadline of the key management actions.
const KEY_ACTION_TIMEOUT: Duration = Duration::from_secs(4);

/// Deadline of the shutdown action.
const SHUTDOWN_ACTION_TIMEOUT: Duration = Duration::from_secs(3);

/// A finite, non-restartable sequence of typed rows produced by a query.
#[async_trait]
pub trait Cursor: Send {
    /// Returns the schema of the rows, it is known before the first row is fetched.
    fn columns(&self) -> &Columns;

    /// Returns the next row or [`None`] when the cursor is drained or closed.
    async fn next(&mut self) -> Result<Option<Row>>;

    /// Release the cursor. Calling close more than once has no effect.
    async fn close(&mut self) -> Result<()>;
}

/// Bulk-ingest handle for a single table.
#[async_trait]
pub trait Appender: Send {
    /// Buffer `row` and send the buffered rows if the buffer is full.
    async fn append(&mut self, row: Row) -> Result<()>;

    /// Send the buffered rows and return the number of rows appended in total.
    async fn close(&mut self) -> Result<u64>;
}

/// Management actions with a JSON request and a `{success, reason, …}` JSON response.
#[derive(Clone, Debug, PartialEq)]
pub enum ManagementAction {
    ListKeys,
    GenKey {
        id: String,
        not_before: i64,
        not_after: i64,
    },
    DelKey {
        id: String,
    },
    Shutdown,
}

impl ManagementAction {
    /// Returns the type of the Apache Arrow Flight action.
    pub fn action_type(&self) -> &'static str {
        match self {
            Self::ListKeys => "ListKeys",
            Self::GenKey { .. } => "GenKey",
            Self::DelKey { .. } => "DelKey",
            Self::Shutdown => "Shutdown",
        }
    }

    /// Returns the JSON body of the request.
    pub fn body(&self) -> JsonValue {
        match self {
            Self::ListKeys | Self::Shutdown => serde_json::json!({}),
            Self::GenKey {
                id,
                not_before,
                not_after,
            } => serde_json::json!({
                "id": id,
                "type": "ec",
                "notBefore": not_before,
                "notAfter": not_after,
            }),
            Self::DelKey { id } => serde_json::json!({ "id": id }),
        }
    }

    /// Returns how long to wait for the response.
    pub fn timeout(&self) -> Duration {
        match self {
            Self::Shutdown => SHUTDOWN_ACTION_TIMEOUT,
            _ => KEY_ACTION_TIMEOUT,
        }
    }
}

/// Trait for interacting with a database server.
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute the query in `sql` with `params` bound to its placeholders and return a cursor over
    /// the result.
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Box<dyn Cursor>>;

    /// Execute the statement in `sql` with `params` bound to its placeholders and return the
    /// message of the server.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<String>;

    /// Return an appender that writes rows with the schema in `columns` to `table`.
    async fn appender(&self, table: &str, columns: &Columns) -> Result<Box<dyn Appender>>;

    /// Return the name of all the tables.
    async fn tables(&self) -> Result<Vec<String>>;

    /// Return the information the server reports about itself as name and value pairs.
    async fn server_info(&self) -> Result<Vec<(String, String)>>;

    /// Execute `action` and return the JSON response if it succeeded.
    async fn manage(&self, action: &ManagementAction) -> Result<JsonValue>;

    /// Return [`true`] if the server is not on the loopback interface.
    fn is_remote(&self) -> bool;

    /// Return the description of `table` from the system catalogs. Hidden columns are only
    /// included if `include_hidden` is [`true`].
    async fn describe(&self, table: &str, include_hidden: bool) -> Result<TableDescription> {
        catalog::describe(self, table, include_hidden).await
    }

    /// Return the tables of `kind` from the system catalogs. Hidden tables are only included if
    /// `include_hidden` is [`true`].
    async fn list_tables(&self, kind: TableKind, include_hidden: bool) -> Result<Vec<ListedTable>> {
        catalog::list_tables(self, kind, include_hidden).await
    }

    /// Return the execution plan of `sql` as text.
    async fn explain(&self, sql: &str) -> Result<String> {
        let mut cursor = self.query(&format!("EXPLAIN {sql}"), &[]).await?;
        let rows = fetch_all(cursor.as_mut()).await?;

        let lines: Vec<String> = rows
            .iter()
            .filter_map(|row| match row.first() {
                Some(Value::String(line)) => Some(line.clone()),
                _ => None,
            })
            .collect();

        Ok(lines.join("\n"))
    }
}

/// Drain `cursor` into a vector and close it.
pub async fn fetch_all(cursor: &mut dyn Cursor) -> Result<Vec<Row>> {
    let mut rows = vec![];
    while let Some(row) = cursor.next().await? {
        rows.push(row);
    }
    cursor.close().await?;

    Ok(rows)
}

/// Return [`true`] if `sql` is a statement that returns rows.
pub fn is_fetchable(sql: &str) -> bool {
    let first_word = sql
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default()
        .to_uppercase();

    FETCHABLE_KEYWORDS.contains(&first_word.as_str())
}

/// Replace each `?` placeholder outside of quoted literals in `sql` with the SQL literal of the
/// corresponding value in `params`. Returns [`NeoShellClientError`] if the number of placeholders
/// and values differ.
pub fn bind_parameters(sql: &str, params: &[Value]) -> Result<String> {
    if params.is_empty() {
        return Ok(sql.to_owned());
    }

    let mut bound = String::with_capacity(sql.len() + params.len() * 8);
    let mut params_iter = params.iter();
    let mut in_quotes = false;

    for c in sql.chars() {
        match c {
            '\'' => {
                in_quotes = !in_quotes;
                bound.push(c);
            }
            '?' if !in_quotes => {
                let value = params_iter.next().ok_or_else(|| {
                    NeoShellClientError::InvalidArgument(format!(
                        "more placeholders than the {} parameters given.",
                        params.len()
                    ))
                })?;
                bound.push_str(&sql_literal(value));
            }
            _ => bound.push(c),
        }
    }

    if params_iter.next().is_some() {
        return Err(NeoShellClientError::InvalidArgument(format!(
            "fewer placeholders than the {} parameters given.",
            params.len()
        )));
    }

    Ok(bound)
}

/// Return `value` as a SQL literal. Datetimes are integer nanoseconds since the Unix epoch.
fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_owned(),
        Value::Int16(value) => value.to_string(),
        Value::Int32(value) => value.to_string(),
        Value::Int64(value) => value.to_string(),
        Value::Float32(value) => value.to_string(),
        Value::Float64(value) => value.to_string(),
        Value::String(value) => quote(value),
        Value::DateTime(value) => value
            .timestamp_nanos_opt()
            .map_or_else(|| "NULL".to_owned(), |nanoseconds| nanoseconds.to_string()),
        Value::Ipv4(value) => quote(&value.to_string()),
        Value::Ipv6(value) => quote(&value.to_string()),
        Value::Binary(value) => {
            let hex: String = value.iter().map(|byte| format!("{byte:02x}")).collect();
            quote(&format!("0x{hex}"))
        }
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Flatten the nested objects in `json` into dotted names and their values, sorted by key.
pub fn flatten_json(json: &JsonValue) -> Vec<(String, String)> {
    let mut pairs = vec![];
    flatten_json_into(json, String::new(), &mut pairs);
    pairs
}

fn flatten_json_into(json: &JsonValue, prefix: String, pairs: &mut Vec<(String, String)>) {
    match json {
        JsonValue::Object(map) => {
            for (key, value) in map {
                let name = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_json_into(value, name, pairs);
            }
        }
        JsonValue::String(text) => pairs.push((prefix, text.clone())),
        other => pairs.push((prefix, other.to_string())),
    }
}

/// Return the reason of a `{success: false, reason}` response as an error, otherwise `response`.
pub fn check_management_response(response: JsonValue) -> Result<JsonValue> {
    match response.get("success").and_then(JsonValue::as_bool) {
        Some(true) => Ok(response),
        _ => {
            let reason = response
                .get("reason")
                .and_then(JsonValue::as_str)
                .unwrap_or("the server did not report success")
                .to_owned();
            Err(NeoShellClientError::Application(reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};

    // Tests for is_fetchable().
    #[test]
    fn test_is_fetchable() {
        assert!(is_fetchable("select * from t"));
        assert!(is_fetchable("  EXPLAIN select 1"));
        assert!(is_fetchable("with x as (select 1) select * from x"));
        assert!(!is_fetchable("insert into t values(1)"));
        assert!(!is_fetchable("create tag table t (name varchar(20))"));
        assert!(!is_fetchable(""));
    }

    // Tests for bind_parameters().
    #[test]
    fn test_bind_parameters() {
        let time = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let bound = bind_parameters(
            "select * from t where name = ? and time between ? and ? and note <> '?'",
            &[
                Value::String("it's".to_owned()),
                Value::DateTime(time),
                Value::Int64(7),
            ],
        )
        .unwrap();

        assert_eq!(
            "select * from t where name = 'it''s' and time between 1735787045000000000 and 7 and note <> '?'",
            bound
        );
    }

    #[test]
    fn test_bind_parameters_count_mismatch() {
        assert!(bind_parameters("values(?, ?)", &[Value::Null]).is_err());
        assert!(bind_parameters("values(?)", &[Value::Null, Value::Null]).is_err());
        assert_eq!(
            "values(NULL)",
            bind_parameters("values(?)", &[Value::Null]).unwrap()
        );
    }

    // Tests for flatten_json().
    #[test]
    fn test_flatten_json() {
        let json = serde_json::json!({
            "version": {"major": 8, "engine": "standard"},
            "runtime": {"os": "linux", "pid": 42}
        });

        let pairs = flatten_json(&json);
        assert!(pairs.contains(&("version.major".to_owned(), "8".to_owned())));
        assert!(pairs.contains(&("version.engine".to_owned(), "standard".to_owned())));
        assert!(pairs.contains(&("runtime.pid".to_owned(), "42".to_owned())));
        assert_eq!(4, pairs.len());
    }

    // Tests for check_management_response().
    #[test]
    fn test_check_management_response() {
        assert!(check_management_response(serde_json::json!({"success": true})).is_ok());

        let error =
            check_management_response(serde_json::json!({"success": false, "reason": "no key"}))
                .unwrap_err();
        assert_eq!("no key", error.to_string());
    }

    #[test]
    fn test_management_action_bodies_and_timeouts() {
        let action = ManagementAction::DelKey {
            id: "eleven".to_owned(),
        };
        assert_eq!("DelKey", action.action_type());
        assert_eq!(serde_json::json!({"id": "eleven"}), action.body());
        assert_eq!(KEY_ACTION_TIMEOUT, action.timeout());
        assert_eq!(SHUTDOWN_ACTION_TIMEOUT, ManagementAction::Shutdown.timeout());
    }
}
