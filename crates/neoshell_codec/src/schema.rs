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

//! The typed data model shared by cursors, encoders, and decoders: logical column types, column
//! schemas, cell values, and rows.

use std::fmt::{Display, Formatter};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::{NeoShellCodecError, Result};

/// The closed set of logical column types a row stream can contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    DateTime,
    Ipv4,
    Ipv6,
    Binary,
}

impl ColumnType {
    /// Return the name used for the type in JSON headers and `desc` output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float",
            Self::Float64 => "double",
            Self::String => "string",
            Self::DateTime => "datetime",
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
            Self::Binary => "binary",
        }
    }

    /// Return [`true`] if values of the type are rendered as numbers in JSON.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Int16 | Self::Int32 | Self::Int64 | Self::Float32 | Self::Float64
        )
    }
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColumnType {
    type Err = NeoShellCodecError;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "int16" | "short" => Ok(Self::Int16),
            "int32" | "integer" | "int" => Ok(Self::Int32),
            "int64" | "long" => Ok(Self::Int64),
            "float" | "float32" => Ok(Self::Float32),
            "double" | "float64" => Ok(Self::Float64),
            "string" | "varchar" | "text" => Ok(Self::String),
            "datetime" => Ok(Self::DateTime),
            "ipv4" => Ok(Self::Ipv4),
            "ipv6" => Ok(Self::Ipv6),
            "binary" | "blob" => Ok(Self::Binary),
            _ => Err(NeoShellCodecError::InvalidArgument(format!(
                "unknown column type '{name}'."
            ))),
        }
    }
}

/// A named and typed column. `length` is only set for bounded types such as `varchar(200)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    pub length: Option<u32>,
}

impl Column {
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_owned(),
            column_type,
            length: None,
        }
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }
}

/// The ordered and immutable schema of a row stream.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Columns(Vec<Column>);

impl Columns {
    pub fn new(columns: Vec<Column>) -> Self {
        Self(columns)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Column> {
        self.0.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Column> {
        self.0.get(index)
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|column| column.name.clone()).collect()
    }

    pub fn types(&self) -> Vec<ColumnType> {
        self.0.iter().map(|column| column.column_type).collect()
    }

    /// Return the index of the column with `name`, compared case-insensitively.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.0
            .iter()
            .position(|column| column.name.eq_ignore_ascii_case(name))
    }
}

impl<'a> IntoIterator for &'a Columns {
    type Item = &'a Column;
    type IntoIter = std::slice::Iter<'a, Column>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A single cell. Datetime cells hold an absolute instant, the time zone used for rendering is
/// part of the render context and not of the value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    DateTime(DateTime<Utc>),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Binary(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Return the value as [`f64`] if it is numeric. Used when building chart series.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int16(value) => Some(*value as f64),
            Self::Int32(value) => Some(*value as f64),
            Self::Int64(value) => Some(*value as f64),
            Self::Float32(value) => Some(*value as f64),
            Self::Float64(value) => Some(*value),
            _ => None,
        }
    }
}

/// An ordered tuple of cells with exactly the arity of its schema.
pub type Row = Vec<Value>;

#[cfg(test)]
mod tests {
    use super::*;

    // Tests for ColumnType.
    #[test]
    fn test_column_type_names_round_trip() {
        for column_type in [
            ColumnType::Int16,
            ColumnType::Int32,
            ColumnType::Int64,
            ColumnType::Float32,
            ColumnType::Float64,
            ColumnType::String,
            ColumnType::DateTime,
            ColumnType::Ipv4,
            ColumnType::Ipv6,
            ColumnType::Binary,
        ] {
            assert_eq!(column_type, column_type.name().parse().unwrap());
        }
    }

    #[test]
    fn test_column_type_float64_is_named_double() {
        assert_eq!("double", ColumnType::Float64.name());
    }

    #[test]
    fn test_unknown_column_type() {
        assert!("decimal".parse::<ColumnType>().is_err());
    }

    // Tests for Columns.
    #[test]
    fn test_index_of_is_case_insensitive() {
        let columns = Columns::new(vec![
            Column::new("NAME", ColumnType::String),
            Column::new("TIME", ColumnType::DateTime),
        ]);

        assert_eq!(Some(1), columns.index_of("time"));
        assert_eq!(None, columns.index_of("value"));
    }
}
