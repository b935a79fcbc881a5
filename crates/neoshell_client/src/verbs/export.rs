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

//! Implementation of the `export` verb.

use clap::Parser;
use neoshell_codec::compression::Compression;
use neoshell_codec::context::RenderContext;
use neoshell_codec::encoder::{OutputFormat, RowEncoder};
use neoshell_codec::fields::strip_quote;
use neoshell_codec::sink::STDOUT;
use neoshell_codec::timeformat::{EpochUnit, TimeFormat};
use neoshell_codec::zone::Zone;

use crate::dispatcher::ActionContext;
use crate::error::Result;
use crate::pipeline::run_query;
use crate::verbs::{
    parse_compression, parse_delimiter_option, parse_options, parse_output_format,
    parse_time_format, parse_zone, rows_selected, switch, unquoted,
};

/// Export every row of a table.
#[derive(Parser, Debug)]
#[command(name = "export", disable_version_flag = true)]
pub struct ExportOptions {
    /// Output file, `exec COMMAND` to pipe the output to a command, or `-` for standard output.
    #[arg(short, long, default_value = STDOUT, value_parser = unquoted)]
    output: String,
    /// Output format [box|csv|json].
    #[arg(short, long, default_value = "csv", value_parser = parse_output_format)]
    format: OutputFormat,
    /// Compress the output [gzip], not compressed by default.
    #[arg(long, default_value = "-", value_parser = parse_compression)]
    compress: Compression,
    /// Delimiter of CSV output.
    #[arg(short, long, default_value = ",", value_parser = parse_delimiter_option)]
    delimiter: char,
    /// Time format [ns|us|ms|s|<layout>], see "help timeformat".
    #[arg(short = 't', long, value_parser = parse_time_format)]
    timeformat: Option<TimeFormat>,
    /// Time zone of datetime values, see "help tz".
    #[arg(long, value_parser = parse_zone)]
    tz: Option<Zone>,
    /// Print the heading.
    #[arg(long, overrides_with = "no_heading")]
    heading: bool,
    #[arg(long, overrides_with = "heading", hide = true)]
    no_heading: bool,
    /// Print the number of exported rows.
    #[arg(long, overrides_with = "no_footer")]
    footer: bool,
    #[arg(long, overrides_with = "footer", hide = true)]
    no_footer: bool,
    /// Number of digits after the decimal point of floats, -1 for all digits.
    #[arg(short, long, default_value_t = -1, allow_negative_numbers = true)]
    precision: i32,
    /// The table to export.
    #[arg(value_parser = unquoted)]
    table: String,
}

pub async fn run(context: &ActionContext<'_>, arguments: &str) -> Result<()> {
    let Some(options) = parse_options::<ExportOptions>(context, "export", arguments)? else {
        return Ok(());
    };

    let settings = context.configuration_manager.values();
    let render_context = RenderContext::builder()
        .zone(options.tz.unwrap_or(settings.zone))
        .time_format(
            options
                .timeformat
                .unwrap_or(TimeFormat::Epoch(EpochUnit::Nanoseconds)),
        )
        .precision(options.precision)
        .rownum(false)
        .heading(switch(options.heading, options.no_heading, false))
        .delimiter(options.delimiter)
        .box_style(settings.box_style)
        .build();

    let sql = format!("select * from {}", strip_quote(&options.table));
    let mut cursor = context.database.query(&sql, &[]).await?;
    let sink = match context.console.open_output(&options.output) {
        Ok(sink) => sink,
        Err(error) => {
            cursor.close().await?;
            return Err(error);
        }
    };

    let sink = options.compress.compress(sink);
    let mut encoder = RowEncoder::new(options.format, render_context, sink);
    let rows = run_query(cursor.as_mut(), &mut encoder, None, &context.cancel).await?;

    if switch(options.footer, options.no_footer, false) {
        context.console.println(&rows_selected(rows))?;
    }

    Ok(())
}
