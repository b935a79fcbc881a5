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

//! Implementation of [`Database`] for servers with an Apache Arrow Flight interface. Queries are
//! sent as tickets to `do_get()`, statements and management requests as actions to
//! `do_action()`, and appended rows as record batches to `do_put()`.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use arrow::array::{
    Array, ArrayRef, AsArray, BinaryArray, Float32Array, Float64Array, Int16Array, Int32Array,
    Int64Array, StringArray, TimestampNanosecondArray,
};
use arrow::datatypes::{
    DataType, Field, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type, Schema,
    SchemaRef, TimeUnit, TimestampMicrosecondType, TimestampMillisecondType,
    TimestampNanosecondType, TimestampSecondType, UInt8Type, UInt16Type, UInt32Type, UInt64Type,
};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use arrow_flight::encode::FlightDataEncoderBuilder;
use arrow_flight::flight_service_client::FlightServiceClient;
use arrow_flight::{Action, Criteria, FlightData, FlightDescriptor, Ticket, utils};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::DateTime;
use futures::{TryStreamExt, stream};
use neoshell_codec::error::NeoShellCodecError;
use neoshell_codec::schema::{Column, ColumnType, Columns, Row, Value};
use serde_json::Value as JsonValue;
use tonic::transport::{Channel, Endpoint};
use tonic::{Status, Streaming};
use tracing::debug;

use crate::database::{
    Appender, Cursor, Database, ManagementAction, bind_parameters, check_management_response,
    flatten_json,
};
use crate::error::{NeoShellClientError, Result};

/// Number of rows an appender buffers before sending them to the server.
const APPENDER_BATCH_SIZE: usize = 1000;

/// Error to emit when the server does not provide a response when one is expected.
const TRANSPORT_ERROR: &str = "transport error: no messages received.";

/// Client for a database server with an Apache Arrow Flight interface.
pub struct FlightDatabase {
    /// Address of the server as given by the user.
    address: String,
    /// Apache Arrow Flight client connected to the server.
    flight_client: FlightServiceClient<Channel>,
    /// Maximum time to wait for the first response to a query, [`None`] to wait indefinitely.
    query_timeout: Option<Duration>,
}

impl FlightDatabase {
    /// Connect to the server at `address`. Returns [`NeoShellClientError`] if the address is
    /// invalid or a connection to the server cannot be established.
    pub async fn connect(address: &str, query_timeout: Option<Duration>) -> Result<Self> {
        let grpc_address = grpc_address(address);
        debug!(address, grpc_address, "Connecting to server.");

        let channel = Endpoint::new(grpc_address)?.connect().await?;

        Ok(Self {
            address: address.to_owned(),
            flight_client: FlightServiceClient::new(channel),
            query_timeout,
        })
    }

    /// Execute the action `action_type` with `body` and return the body of the first response.
    async fn do_action(&self, action_type: &str, body: Bytes) -> Result<Bytes> {
        let action = Action {
            r#type: action_type.to_owned(),
            body,
        };

        let mut flight_client = self.flight_client.clone();
        let maybe_result = flight_client
            .do_action(action)
            .await?
            .into_inner()
            .message()
            .await?;

        Ok(maybe_result.map(|result| result.body).unwrap_or_default())
    }
}

#[async_trait]
impl Database for FlightDatabase {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Box<dyn Cursor>> {
        let sql = bind_parameters(sql, params)?;
        debug!(sql, "Executing query.");

        let ticket = Ticket::new(sql);
        let mut flight_client = self.flight_client.clone();

        // The first message of the stream contains the schema so the columns are known even if
        // the result is empty.
        let (stream, flight_data) = with_timeout(self.query_timeout, async move {
            let mut stream = flight_client.do_get(ticket).await?.into_inner();
            let flight_data = stream
                .message()
                .await?
                .ok_or_else(|| Status::internal(TRANSPORT_ERROR))?;
            Ok((stream, flight_data))
        })
        .await?;

        let schema = Arc::new(Schema::try_from(&flight_data)?);
        let columns = schema_to_columns(&schema);

        Ok(Box::new(FlightCursor {
            stream: Some(stream),
            schema,
            columns,
            rows: VecDeque::new(),
            dictionaries_by_id: HashMap::new(),
        }))
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<String> {
        let sql = bind_parameters(sql, params)?;
        debug!(sql, "Executing statement.");

        let body = self
            .do_action("CommandStatementUpdate", Bytes::from(sql))
            .await?;
        let message = String::from_utf8_lossy(&body).trim().to_owned();

        if message.is_empty() {
            Ok("executed.".to_owned())
        } else {
            Ok(message)
        }
    }

    async fn appender(&self, table: &str, columns: &Columns) -> Result<Box<dyn Appender>> {
        Ok(Box::new(FlightAppender {
            flight_client: self.flight_client.clone(),
            table: table.to_uppercase(),
            columns: columns.clone(),
            rows: Vec::with_capacity(APPENDER_BATCH_SIZE),
            appended: 0,
        }))
    }

    async fn tables(&self) -> Result<Vec<String>> {
        let criteria = Criteria {
            expression: Bytes::new(),
        };

        let mut flight_client = self.flight_client.clone();
        let mut stream = flight_client.list_flights(criteria).await?.into_inner();

        let mut table_names = vec![];
        while let Some(flight_info) = stream.message().await? {
            if let Some(flight_descriptor) = flight_info.flight_descriptor {
                table_names.extend(flight_descriptor.path);
            }
        }

        Ok(table_names)
    }

    async fn server_info(&self) -> Result<Vec<(String, String)>> {
        let body = self.do_action("ServerInfo", Bytes::new()).await?;
        let json: JsonValue = serde_json::from_slice(&body)?;

        Ok(flatten_json(&json))
    }

    async fn manage(&self, action: &ManagementAction) -> Result<JsonValue> {
        let body = Bytes::from(serde_json::to_vec(&action.body())?);
        let action_type = action.action_type();
        debug!(action_type, "Executing management action.");

        let response_body = with_timeout(
            Some(action.timeout()),
            self.do_action(action_type, body),
        )
        .await?;

        let response: JsonValue = if response_body.is_empty() {
            serde_json::json!({"success": true})
        } else {
            serde_json::from_slice(&response_body)?
        };

        check_management_response(response)
    }

    fn is_remote(&self) -> bool {
        !is_loopback_address(&self.address)
    }
}

/// Cursor over the record batches streamed by `do_get()`.
struct FlightCursor {
    /// Stream of Apache Arrow Flight data, [`None`] once it is drained or closed.
    stream: Option<Streaming<FlightData>>,
    schema: SchemaRef,
    columns: Columns,
    /// Rows of the last received record batch that have not been returned yet.
    rows: VecDeque<Row>,
    dictionaries_by_id: HashMap<i64, ArrayRef>,
}

#[async_trait]
impl Cursor for FlightCursor {
    fn columns(&self) -> &Columns {
        &self.columns
    }

    async fn next(&mut self) -> Result<Option<Row>> {
        loop {
            if let Some(row) = self.rows.pop_front() {
                return Ok(Some(row));
            }

            let Some(stream) = self.stream.as_mut() else {
                return Ok(None);
            };

            match stream.message().await? {
                Some(flight_data) => {
                    let record_batch = utils::flight_data_to_arrow_batch(
                        &flight_data,
                        self.schema.clone(),
                        &self.dictionaries_by_id,
                    )?;
                    self.rows.extend(record_batch_to_rows(&record_batch)?);
                }
                None => self.stream = None,
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the stream cancels the request so the server stops producing batches.
        self.stream = None;
        self.rows.clear();
        Ok(())
    }
}

/// Appender that sends the buffered rows as a record batch to `do_put()`.
struct FlightAppender {
    flight_client: FlightServiceClient<Channel>,
    table: String,
    columns: Columns,
    rows: Vec<Row>,
    appended: u64,
}

impl FlightAppender {
    async fn send(&mut self) -> Result<()> {
        if self.rows.is_empty() {
            return Ok(());
        }

        let record_batch = rows_to_record_batch(&self.columns, &self.rows)?;
        let flight_descriptor = FlightDescriptor::new_path(vec![self.table.clone()]);

        let flight_data: Vec<FlightData> = FlightDataEncoderBuilder::new()
            .with_flight_descriptor(Some(flight_descriptor))
            .build(stream::iter(vec![Ok(record_batch)]))
            .try_collect()
            .await
            .map_err(Status::from)?;

        let mut put_results = self
            .flight_client
            .do_put(stream::iter(flight_data))
            .await?
            .into_inner();
        while put_results.message().await?.is_some() {}

        debug!(table = self.table, rows = self.rows.len(), "Appended rows.");
        self.appended += self.rows.len() as u64;
        self.rows.clear();

        Ok(())
    }
}

#[async_trait]
impl Appender for FlightAppender {
    async fn append(&mut self, row: Row) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(NeoShellClientError::InvalidArgument(format!(
                "row has {} values but table {} has {} columns.",
                row.len(),
                self.table,
                self.columns.len()
            )));
        }

        self.rows.push(row);
        if self.rows.len() >= APPENDER_BATCH_SIZE {
            self.send().await?;
        }

        Ok(())
    }

    async fn close(&mut self) -> Result<u64> {
        self.send().await?;
        Ok(self.appended)
    }
}

/// Await `future` for at most `timeout`, or indefinitely if `timeout` is [`None`].
async fn with_timeout<T>(
    timeout: Option<Duration>,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, future).await.map_err(|_| {
            NeoShellClientError::Timeout(format!("no response within {}s.", timeout.as_secs_f64()))
        })?,
        None => future.await,
    }
}

/// Return the address of the gRPC channel for `address`. The `tcp://` scheme is replaced with
/// `http://` and addresses without a scheme are assumed to be `http://`.
pub fn grpc_address(address: &str) -> String {
    if let Some(host_and_port) = address.strip_prefix("tcp://") {
        format!("http://{host_and_port}")
    } else if address.contains("://") {
        address.to_owned()
    } else {
        format!("http://{address}")
    }
}

/// Return [`true`] if the host of `address` is `localhost` or a loopback address.
pub fn is_loopback_address(address: &str) -> bool {
    let authority = address
        .split_once("://")
        .map_or(address, |(_scheme, rest)| rest)
        .split('/')
        .next()
        .unwrap_or_default();

    let host = if let Some(bracketed) = authority.strip_prefix('[') {
        bracketed.split(']').next().unwrap_or_default()
    } else {
        authority.split(':').next().unwrap_or_default()
    };

    host.eq_ignore_ascii_case("localhost")
        || host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}

/// Return the columns of `schema` with the logical type each Apache Arrow type is decoded as.
fn schema_to_columns(schema: &Schema) -> Columns {
    let columns = schema
        .fields()
        .iter()
        .map(|field| {
            let column_type = match field.data_type() {
                DataType::Int8 | DataType::Int16 | DataType::UInt8 => ColumnType::Int16,
                DataType::Int32 | DataType::UInt16 => ColumnType::Int32,
                DataType::Int64 | DataType::UInt32 | DataType::UInt64 => ColumnType::Int64,
                DataType::Float32 => ColumnType::Float32,
                DataType::Float64 => ColumnType::Float64,
                DataType::Timestamp(_, _) => ColumnType::DateTime,
                DataType::Binary | DataType::LargeBinary | DataType::FixedSizeBinary(_) => {
                    ColumnType::Binary
                }
                _ => ColumnType::String,
            };
            Column::new(field.name(), column_type)
        })
        .collect();

    Columns::new(columns)
}

/// Return the schema of record batches appended to a table with `columns`.
fn columns_to_schema(columns: &Columns) -> Schema {
    let fields: Vec<Field> = columns
        .iter()
        .map(|column| {
            let data_type = match column.column_type {
                ColumnType::Int16 => DataType::Int16,
                ColumnType::Int32 => DataType::Int32,
                ColumnType::Int64 => DataType::Int64,
                ColumnType::Float32 => DataType::Float32,
                ColumnType::Float64 => DataType::Float64,
                ColumnType::DateTime => DataType::Timestamp(TimeUnit::Nanosecond, None),
                ColumnType::Binary => DataType::Binary,
                ColumnType::String | ColumnType::Ipv4 | ColumnType::Ipv6 => DataType::Utf8,
            };
            Field::new(&column.name, data_type, true)
        })
        .collect();

    Schema::new(fields)
}

/// Convert each row in `record_batch` to a [`Row`].
fn record_batch_to_rows(record_batch: &RecordBatch) -> Result<Vec<Row>> {
    let mut rows = vec![Vec::with_capacity(record_batch.num_columns()); record_batch.num_rows()];
    let schema = record_batch.schema();

    for (column_index, (array, field)) in record_batch
        .columns()
        .iter()
        .zip(schema.fields().iter())
        .enumerate()
    {
        for (index, row) in rows.iter_mut().enumerate() {
            let value =
                array_value(array, index).map_err(|reason| NeoShellCodecError::Decode {
                    line: index as u64 + 1,
                    column_index,
                    column_name: field.name().clone(),
                    reason,
                })?;
            row.push(value);
        }
    }

    Ok(rows)
}

/// Return the value at `index` in `array`. Types without a logical type are formatted as text.
/// Returns the reason as text if the value cannot be represented.
fn array_value(array: &ArrayRef, index: usize) -> std::result::Result<Value, String> {
    if array.is_null(index) {
        return Ok(Value::Null);
    }

    let value = match array.data_type() {
        DataType::Int8 => Value::Int16(array.as_primitive::<Int8Type>().value(index) as i16),
        DataType::Int16 => Value::Int16(array.as_primitive::<Int16Type>().value(index)),
        DataType::UInt8 => Value::Int16(array.as_primitive::<UInt8Type>().value(index) as i16),
        DataType::Int32 => Value::Int32(array.as_primitive::<Int32Type>().value(index)),
        DataType::UInt16 => Value::Int32(array.as_primitive::<UInt16Type>().value(index) as i32),
        DataType::Int64 => Value::Int64(array.as_primitive::<Int64Type>().value(index)),
        DataType::UInt32 => Value::Int64(array.as_primitive::<UInt32Type>().value(index) as i64),
        DataType::UInt64 => {
            let value = array.as_primitive::<UInt64Type>().value(index);
            Value::Int64(
                i64::try_from(value).map_err(|error| format!("{value} is not a valid int64: {error}"))?,
            )
        }
        DataType::Float32 => Value::Float32(array.as_primitive::<Float32Type>().value(index)),
        DataType::Float64 => Value::Float64(array.as_primitive::<Float64Type>().value(index)),
        DataType::Utf8 => Value::String(array.as_string::<i32>().value(index).to_owned()),
        DataType::LargeUtf8 => Value::String(array.as_string::<i64>().value(index).to_owned()),
        DataType::Timestamp(time_unit, _) => {
            let nanoseconds = match time_unit {
                TimeUnit::Second => array
                    .as_primitive::<TimestampSecondType>()
                    .value(index)
                    .checked_mul(1_000_000_000),
                TimeUnit::Millisecond => array
                    .as_primitive::<TimestampMillisecondType>()
                    .value(index)
                    .checked_mul(1_000_000),
                TimeUnit::Microsecond => array
                    .as_primitive::<TimestampMicrosecondType>()
                    .value(index)
                    .checked_mul(1_000),
                TimeUnit::Nanosecond => {
                    Some(array.as_primitive::<TimestampNanosecondType>().value(index))
                }
            };
            nanoseconds.map_or(Value::Null, |nanoseconds| {
                Value::DateTime(DateTime::from_timestamp_nanos(nanoseconds))
            })
        }
        DataType::Binary => Value::Binary(array.as_binary::<i32>().value(index).to_vec()),
        DataType::LargeBinary => Value::Binary(array.as_binary::<i64>().value(index).to_vec()),
        DataType::FixedSizeBinary(_) => {
            Value::Binary(array.as_fixed_size_binary().value(index).to_vec())
        }
        _ => {
            let formatter = ArrayFormatter::try_new(array.as_ref(), &FormatOptions::default())
                .map_err(|error| error.to_string())?;
            Value::String(formatter.value(index).to_string())
        }
    };

    Ok(value)
}

/// Convert `rows` to a record batch with the schema of `columns`.
fn rows_to_record_batch(columns: &Columns, rows: &[Row]) -> Result<RecordBatch> {
    let schema = Arc::new(columns_to_schema(columns));

    let arrays = columns
        .iter()
        .enumerate()
        .map(|(index, column)| column_array(column, index, rows))
        .collect::<Result<Vec<ArrayRef>>>()?;

    Ok(RecordBatch::try_new(schema, arrays)?)
}

/// Build the array of the column at `index` in `rows`.
fn column_array(column: &Column, index: usize, rows: &[Row]) -> Result<ArrayRef> {
    let array: ArrayRef = match column.column_type {
        ColumnType::Int16 => Arc::new(Int16Array::from(column_values(
            column,
            index,
            rows,
            |value| match value {
                Value::Int16(value) => Some(*value),
                _ => None,
            },
        )?)),
        ColumnType::Int32 => Arc::new(Int32Array::from(column_values(
            column,
            index,
            rows,
            |value| match value {
                Value::Int16(value) => Some(*value as i32),
                Value::Int32(value) => Some(*value),
                _ => None,
            },
        )?)),
        ColumnType::Int64 => Arc::new(Int64Array::from(column_values(
            column,
            index,
            rows,
            |value| match value {
                Value::Int16(value) => Some(*value as i64),
                Value::Int32(value) => Some(*value as i64),
                Value::Int64(value) => Some(*value),
                _ => None,
            },
        )?)),
        ColumnType::Float32 => Arc::new(Float32Array::from(column_values(
            column,
            index,
            rows,
            |value| match value {
                Value::Float32(value) => Some(*value),
                _ => None,
            },
        )?)),
        ColumnType::Float64 => Arc::new(Float64Array::from(column_values(
            column,
            index,
            rows,
            |value| value.as_f64(),
        )?)),
        ColumnType::DateTime => Arc::new(TimestampNanosecondArray::from(column_values(
            column,
            index,
            rows,
            |value| match value {
                Value::DateTime(value) => value.timestamp_nanos_opt(),
                _ => None,
            },
        )?)),
        ColumnType::Binary => Arc::new(BinaryArray::from_iter(column_values(
            column,
            index,
            rows,
            |value| match value {
                Value::Binary(value) => Some(value.clone()),
                _ => None,
            },
        )?)),
        ColumnType::String | ColumnType::Ipv4 | ColumnType::Ipv6 => {
            Arc::new(StringArray::from_iter(column_values(
                column,
                index,
                rows,
                |value| match value {
                    Value::String(value) => Some(value.clone()),
                    Value::Ipv4(value) => Some(value.to_string()),
                    Value::Ipv6(value) => Some(value.to_string()),
                    _ => None,
                },
            )?))
        }
    };

    Ok(array)
}

/// Extract the values of the column at `index` in `rows` with `extract`. Returns
/// [`NeoShellClientError`] if a value does not have the type of `column`.
fn column_values<T>(
    column: &Column,
    index: usize,
    rows: &[Row],
    extract: impl Fn(&Value) -> Option<T>,
) -> Result<Vec<Option<T>>> {
    rows.iter()
        .map(|row| match row.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => extract(value).map(Some).ok_or_else(|| {
                NeoShellClientError::InvalidArgument(format!(
                    "{value:?} is not a valid {} for column {}.",
                    column.column_type, column.name
                ))
            }),
        })
        .collect()
}
