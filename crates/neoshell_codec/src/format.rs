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

//! Conversion of cells to the text used by every encoder. The encoders only decide whether the
//! text is written as a JSON string, a CSV field, or a table cell.

use std::fmt::Write;

use crate::context::RenderContext;
use crate::schema::Value;

/// Text written for null cells.
pub const NULL: &str = "NULL";

/// Format `value` as text according to `context`.
pub fn format_value(value: &Value, context: &RenderContext) -> String {
    match value {
        Value::Null => NULL.to_owned(),
        Value::String(value) => value.clone(),
        Value::DateTime(time) => context.time_format.format(time, &context.zone),
        Value::Float32(value) => format_float(*value as f64, Some(*value), context.precision),
        Value::Float64(value) => format_float(*value, None, context.precision),
        Value::Int16(value) => value.to_string(),
        Value::Int32(value) => value.to_string(),
        Value::Int64(value) => value.to_string(),
        Value::Ipv4(address) => address.to_string(),
        Value::Ipv6(address) => address.to_string(),
        Value::Binary(bytes) => format_binary(bytes),
    }
}

/// Format a float with exactly `precision` digits after the decimal point or, if `precision` is
/// negative, with the shortest text that parses back to the same value. `single` is set for
/// `float` columns so their shortest form is computed at single precision.
fn format_float(value: f64, single: Option<f32>, precision: i32) -> String {
    if precision >= 0 {
        format!("{value:.*}", precision as usize)
    } else if let Some(single) = single {
        single.to_string()
    } else {
        value.to_string()
    }
}

/// Format binary cells as `0x` followed by lowercase hexadecimal digits.
fn format_binary(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(2 + bytes.len() * 2);
    output.push_str("0x");
    for byte in bytes {
        let _ = write!(output, "{byte:02x}");
    }
    output
}
