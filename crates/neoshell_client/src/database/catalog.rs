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

//! Descriptions of tables and columns read from the system catalogs of the server.

use neoshell_codec::context::RenderContext;
use neoshell_codec::format::format_value;
use neoshell_codec::schema::{Column, ColumnType, Columns, Value};

use crate::database::{Database, fetch_all};
use crate::error::{NeoShellClientError, Result};

/// Catalog codes of the column types.
const COLUMN_TYPES: [(i64, &str); 16] = [
    (4, "int16"),
    (104, "uint16"),
    (8, "int32"),
    (108, "uint32"),
    (12, "int64"),
    (112, "uint64"),
    (16, "float"),
    (20, "double"),
    (5, "varchar"),
    (49, "text"),
    (53, "clob"),
    (57, "blob"),
    (97, "binary"),
    (6, "datetime"),
    (32, "ipv4"),
    (36, "ipv6"),
];

/// Catalog codes of the table types.
const TABLE_TYPES: [(i64, &str); 6] = [
    (0, "Log Table"),
    (1, "Fixed Table"),
    (3, "Volatile Table"),
    (4, "Lookup Table"),
    (5, "KeyValue Table"),
    (6, "Tag Table"),
];

/// Catalog flags of the table types.
const TABLE_FLAGS: [(i64, &str); 4] = [(1, "data"), (2, "rollup"), (4, "meta"), (8, "stat")];

/// Name of the catalog type code `code`, `undef` if it is unknown.
pub fn column_type_name(code: i64) -> &'static str {
    COLUMN_TYPES
        .iter()
        .find(|(type_code, _)| *type_code == code)
        .map_or("undef", |(_, name)| name)
}

/// Logical type that values of the catalog type code `code` are decoded as.
pub fn column_type(code: i64) -> Option<ColumnType> {
    let column_type = match column_type_name(code) {
        "int16" => ColumnType::Int16,
        "uint16" | "int32" => ColumnType::Int32,
        "uint32" | "int64" | "uint64" => ColumnType::Int64,
        "float" => ColumnType::Float32,
        "double" => ColumnType::Float64,
        "varchar" | "text" | "clob" => ColumnType::String,
        "blob" | "binary" => ColumnType::Binary,
        "datetime" => ColumnType::DateTime,
        "ipv4" => ColumnType::Ipv4,
        "ipv6" => ColumnType::Ipv6,
        _ => return None,
    };

    Some(column_type)
}

/// Description of the table type `table_type` with the flag `flag` as a suffix if it is set.
pub fn table_type_description(table_type: i64, flag: i64) -> String {
    let mut description = TABLE_TYPES
        .iter()
        .find(|(code, _)| *code == table_type)
        .map_or("undef", |(_, name)| name)
        .to_owned();

    if let Some((_, name)) = TABLE_FLAGS.iter().find(|(code, _)| *code == flag) {
        description.push_str(&format!(" ({name})"));
    }

    description
}

/// The system catalogs `show` can list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableKind {
    Tables,
    MetaTables,
    VirtualTables,
}

impl TableKind {
    fn sql(&self) -> &'static str {
        match self {
            Self::Tables => "select NAME, TYPE, FLAG, ID from M$SYS_TABLES order by ID",
            Self::MetaTables => "select NAME, TYPE, 0, ID from M$TABLES order by ID",
            Self::VirtualTables => "select NAME, TYPE, 0, ID from V$TABLES order by ID",
        }
    }
}

/// A table listed by `show`.
#[derive(Clone, Debug, PartialEq)]
pub struct ListedTable {
    pub id: i64,
    pub name: String,
    pub description: String,
}

/// A column of a [`TableDescription`].
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDescription {
    pub name: String,
    pub type_code: i64,
    pub length: i64,
}

impl ColumnDescription {
    pub fn type_name(&self) -> &'static str {
        column_type_name(self.type_code)
    }
}

/// The result of `desc <table>`.
#[derive(Clone, Debug, PartialEq)]
pub struct TableDescription {
    pub name: String,
    pub table_type: i64,
    pub flag: i64,
    pub id: i64,
    pub columns: Vec<ColumnDescription>,
}

impl TableDescription {
    pub fn type_description(&self) -> String {
        table_type_description(self.table_type, self.flag)
    }

    /// Return the schema that rows of the table are decoded with. Returns
    /// [`NeoShellClientError`] if a column has a type without a logical type.
    pub fn to_columns(&self) -> Result<Columns> {
        let columns = self
            .columns
            .iter()
            .map(|column| {
                let column_type = column_type(column.type_code).ok_or_else(|| {
                    NeoShellClientError::InvalidArgument(format!(
                        "column {} has the unsupported type code {}.",
                        column.name, column.type_code
                    ))
                })?;
                Ok(Column::new(&column.name, column_type).with_length(column.length.max(0) as u32))
            })
            .collect::<Result<Vec<Column>>>()?;

        Ok(Columns::new(columns))
    }
}

/// Read the description of `table` from `M$SYS_TABLES` and `M$SYS_COLUMNS`.
pub(super) async fn describe<D: Database + ?Sized>(
    database: &D,
    table: &str,
    include_hidden: bool,
) -> Result<TableDescription> {
    let mut cursor = database
        .query(
            "select NAME, TYPE, FLAG, ID from M$SYS_TABLES where NAME = ?",
            &[Value::String(table.to_uppercase())],
        )
        .await?;
    let rows = fetch_all(cursor.as_mut()).await?;

    let row = rows.first().ok_or_else(|| {
        NeoShellClientError::InvalidArgument(format!("table '{table}' does not exist."))
    })?;

    let mut description = TableDescription {
        name: text(row, 0),
        table_type: integer(row, 1),
        flag: integer(row, 2),
        id: integer(row, 3),
        columns: vec![],
    };

    let mut cursor = database
        .query(
            "select NAME, TYPE, LENGTH from M$SYS_COLUMNS where TABLE_ID = ? order by ID",
            &[Value::Int64(description.id)],
        )
        .await?;

    for row in fetch_all(cursor.as_mut()).await? {
        let name = text(&row, 0);
        if !include_hidden && name.starts_with('_') {
            continue;
        }

        description.columns.push(ColumnDescription {
            name,
            type_code: integer(&row, 1),
            length: integer(&row, 2),
        });
    }

    Ok(description)
}

/// Read the tables of `kind` from its system catalog.
pub(super) async fn list_tables<D: Database + ?Sized>(
    database: &D,
    kind: TableKind,
    include_hidden: bool,
) -> Result<Vec<ListedTable>> {
    let mut cursor = database.query(kind.sql(), &[]).await?;
    let rows = fetch_all(cursor.as_mut()).await?;

    let tables = rows
        .iter()
        .filter(|row| include_hidden || !text(row, 0).starts_with('_'))
        .map(|row| {
            let description = match (kind, row.get(1)) {
                (TableKind::Tables, _) => table_type_description(integer(row, 1), integer(row, 2)),
                (_, Some(value)) => format_value(value, &RenderContext::default()),
                (_, None) => String::new(),
            };

            ListedTable {
                id: integer(row, 3),
                name: text(row, 0),
                description,
            }
        })
        .collect();

    Ok(tables)
}

fn text(row: &[Value], index: usize) -> String {
    match row.get(index) {
        Some(Value::String(text)) => text.clone(),
        Some(value) => format_value(value, &RenderContext::default()),
        None => String::new(),
    }
}

fn integer(row: &[Value], index: usize) -> i64 {
    match row.get(index) {
        Some(Value::Int16(value)) => *value as i64,
        Some(Value::Int32(value)) => *value as i64,
        Some(Value::Int64(value)) => *value,
        Some(Value::String(text)) => text.trim().parse().unwrap_or_default(),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::database::memory::MemoryDatabase;

    // Tests for column_type_name() and column_type().
    #[test]
    fn test_column_type_codes() {
        assert_eq!("varchar", column_type_name(5));
        assert_eq!("uint64", column_type_name(112));
        assert_eq!("undef", column_type_name(1000));
        assert_eq!(Some(ColumnType::Int32), column_type(104));
        assert_eq!(Some(ColumnType::DateTime), column_type(6));
        assert_eq!(None, column_type(1000));
    }

    // Tests for table_type_description().
    #[test]
    fn test_table_type_description() {
        assert_eq!("Tag Table", table_type_description(6, 0));
        assert_eq!("Tag Table (rollup)", table_type_description(6, 2));
        assert_eq!("Log Table (stat)", table_type_description(0, 8));
        assert_eq!("undef", table_type_description(99, 0));
    }

    // Tests for describe().
    #[tokio::test]
    async fn test_describe_from_catalog_rows() {
        let database = MemoryDatabase::new();
        database.add_result(
            "select NAME, TYPE, FLAG, ID from M$SYS_TABLES where NAME = ?",
            Columns::new(vec![
                Column::new("NAME", ColumnType::String),
                Column::new("TYPE", ColumnType::Int32),
                Column::new("FLAG", ColumnType::Int32),
                Column::new("ID", ColumnType::Int64),
            ]),
            vec![vec![
                Value::String("SENSORS".to_owned()),
                Value::Int32(6),
                Value::Int32(0),
                Value::Int64(13),
            ]],
        );
        database.add_result(
            "select NAME, TYPE, LENGTH from M$SYS_COLUMNS where TABLE_ID = ? order by ID",
            Columns::new(vec![
                Column::new("NAME", ColumnType::String),
                Column::new("TYPE", ColumnType::Int32),
                Column::new("LENGTH", ColumnType::Int32),
            ]),
            vec![
                vec![Value::String("NAME".to_owned()), Value::Int32(5), Value::Int32(100)],
                vec![Value::String("TIME".to_owned()), Value::Int32(6), Value::Int32(8)],
                vec![Value::String("VALUE".to_owned()), Value::Int32(20), Value::Int32(8)],
                vec![Value::String("_RID".to_owned()), Value::Int32(12), Value::Int32(8)],
            ],
        );

        let description = describe(&database, "sensors", false).await.unwrap();
        assert_eq!("SENSORS", description.name);
        assert_eq!("Tag Table", description.type_description());
        assert_eq!(3, description.columns.len());

        let columns = description.to_columns().unwrap();
        assert_eq!(
            vec![ColumnType::String, ColumnType::DateTime, ColumnType::Float64],
            columns.types()
        );

        let (sql, params) = database.queries().remove(0);
        assert!(sql.starts_with("select NAME, TYPE, FLAG, ID from M$SYS_TABLES"));
        assert_eq!(vec![Value::String("SENSORS".to_owned())], params);

        let description = describe(&database, "sensors", true).await.unwrap();
        assert_eq!(4, description.columns.len());
    }

    #[tokio::test]
    async fn test_describe_missing_table() {
        let database = MemoryDatabase::new();
        database.add_result(
            "select NAME, TYPE, FLAG, ID from M$SYS_TABLES where NAME = ?",
            Columns::new(vec![Column::new("NAME", ColumnType::String)]),
            vec![],
        );

        let error = describe(&database, "missing", false).await.unwrap_err();
        assert!(error.to_string().contains("'missing' does not exist"));
    }

    // Tests for list_tables().
    #[tokio::test]
    async fn test_list_tables_skips_hidden_tables() {
        let database = MemoryDatabase::new();
        database.add_result(
            TableKind::Tables.sql(),
            Columns::new(vec![
                Column::new("NAME", ColumnType::String),
                Column::new("TYPE", ColumnType::Int32),
                Column::new("FLAG", ColumnType::Int32),
                Column::new("ID", ColumnType::Int64),
            ]),
            vec![
                vec![
                    Value::String("SENSORS".to_owned()),
                    Value::Int32(6),
                    Value::Int32(0),
                    Value::Int64(1),
                ],
                vec![
                    Value::String("_SENSORS_DATA_0".to_owned()),
                    Value::Int32(6),
                    Value::Int32(1),
                    Value::Int64(2),
                ],
            ],
        );

        let tables = list_tables(&database, TableKind::Tables, false).await.unwrap();
        assert_eq!(
            vec![ListedTable {
                id: 1,
                name: "SENSORS".to_owned(),
                description: "Tag Table".to_owned(),
            }],
            tables
        );

        let tables = list_tables(&database, TableKind::Tables, true).await.unwrap();
        assert_eq!("Tag Table (data)", tables[1].description);
    }
}
