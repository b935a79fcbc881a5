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

//! Implementation of the `sql` verb.

use clap::Parser;
use neoshell_codec::compression::Compression;
use neoshell_codec::context::RenderContext;
use neoshell_codec::encoder::{OutputFormat, RowEncoder};
use neoshell_codec::fields::strip_quote;
use neoshell_codec::sink::STDOUT;
use neoshell_codec::timeformat::TimeFormat;
use neoshell_codec::zone::Zone;

use crate::database::is_fetchable;
use crate::dispatcher::ActionContext;
use crate::error::Result;
use crate::pipeline::{Pager, run_query};
use crate::verbs::{
    parse_compression, parse_delimiter_option, parse_options, parse_output_format,
    parse_time_format, parse_zone, rows_selected, switch, unquoted,
};

/// Execute a SQL statement and print its result.
#[derive(Parser, Debug)]
#[command(name = "sql", disable_version_flag = true)]
pub struct SqlOptions {
    /// Output file, `exec COMMAND` to pipe the output to a command, or `-` for standard output.
    #[arg(short, long, default_value = STDOUT, value_parser = unquoted)]
    output: String,
    /// Output format [box|csv|json].
    #[arg(short, long, default_value = "box", value_parser = parse_output_format)]
    format: OutputFormat,
    /// Compress the output [gzip], not compressed by default.
    #[arg(long, default_value = "-", value_parser = parse_compression)]
    compress: Compression,
    /// Delimiter of CSV output.
    #[arg(short, long, default_value = ",", value_parser = parse_delimiter_option)]
    delimiter: char,
    /// Include the row number as the first column (default).
    #[arg(long, overrides_with = "no_rownum")]
    rownum: bool,
    #[arg(long, overrides_with = "rownum", hide = true)]
    no_rownum: bool,
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
    /// Print the number of selected rows after the result (default).
    #[arg(long, overrides_with = "no_footer")]
    footer: bool,
    #[arg(long, overrides_with = "footer", hide = true)]
    no_footer: bool,
    /// Number of digits after the decimal point of floats, -1 for all digits.
    #[arg(short, long, default_value_t = -1, allow_negative_numbers = true)]
    precision: i32,
    /// The SQL statement.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    query: Vec<String>,
}

pub async fn run(context: &ActionContext<'_>, arguments: &str) -> Result<()> {
    let Some(options) = parse_options::<SqlOptions>(context, "sql", arguments)? else {
        return Ok(());
    };

    let sql = strip_quote(&options.query.join(" "));
    context.history.add(&sql);

    if !is_fetchable(&sql) {
        let message = context.database.execute(&sql, &[]).await?;
        return context.console.println(&message);
    }

    let settings = context.configuration_manager.values();
    let interactive = options.output == STDOUT
        && options.compress == Compression::None
        && context.console.is_interactive();

    let render_context = RenderContext::builder()
        .zone(options.tz.unwrap_or(settings.zone))
        .time_format(options.timeformat.unwrap_or(settings.time_format))
        .precision(options.precision)
        .rownum(switch(options.rownum, options.no_rownum, true))
        .heading(switch(options.heading, options.no_heading, settings.heading))
        .delimiter(options.delimiter)
        .box_style(settings.box_style)
        .interactive(interactive)
        .build();

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
    let mut pager = if interactive {
        context.console.pager()
    } else {
        None
    };

    let pager = pager.as_mut().map(|pager| pager.as_mut() as &mut dyn Pager);
    let rows = run_query(cursor.as_mut(), &mut encoder, pager, &context.cancel).await?;

    if switch(options.footer, options.no_footer, true) {
        context.console.println(&rows_selected(rows))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Read;

    use chrono::{TimeZone, Utc};
    use flate2::read::GzDecoder;
    use neoshell_codec::schema::{Column, ColumnType, Columns, Value};
    use tempfile::TempDir;

    use crate::cancel::CancellationToken;
    use crate::configuration::ConfigurationManager;
    use crate::console::tests::MemoryConsole;
    use crate::database::memory::{MemoryDatabase, tag_table_columns};
    use crate::dispatcher::SqlHistory;
    use crate::pipeline::PagerAction;

    fn database() -> MemoryDatabase {
        let database = MemoryDatabase::new();
        database.create_table(
            "example",
            tag_table_columns(),
            vec![
                vec![
                    Value::String("x".to_owned()),
                    Value::DateTime(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()),
                    Value::Float64(1.5),
                ],
                vec![
                    Value::String("y".to_owned()),
                    Value::DateTime(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 6).unwrap()),
                    Value::Float64(2.25),
                ],
            ],
        );
        database
    }

    async fn run_sql(database: &MemoryDatabase, console: &MemoryConsole, arguments: &str) {
        let configuration_manager = ConfigurationManager::default();
        let history = SqlHistory::default();
        let context = ActionContext {
            database,
            console,
            configuration_manager: &configuration_manager,
            history: &history,
            cancel: CancellationToken::new(),
        };

        run(&context, arguments).await.unwrap();
        assert!(!history.entries().is_empty());
    }

    #[tokio::test]
    async fn test_sql_csv_output() {
        let console = MemoryConsole::new();
        run_sql(
            &database(),
            &console,
            "-f csv --no-rownum -t ns --tz UTC -p 3 select * from example",
        )
        .await;

        assert_eq!(
            "NAME,TIME,VALUE\nx,1735787045000000000,1.500\ny,1735787046000000000,2.250\n\
             2 rows selected.\n",
            console.output()
        );
    }

    #[tokio::test]
    async fn test_sql_json_output_to_file_without_footer() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("result.json");
        let console = MemoryConsole::new();

        run_sql(
            &database(),
            &console,
            &format!(
                "-o {} -f json --no-footer select * from example",
                path.to_str().unwrap()
            ),
        )
        .await;

        let document: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(2, document["data"]["rows"].as_array().unwrap().len());
        assert_eq!("ROWNUM", document["data"]["columns"][0]);
        assert_eq!("", console.output());
    }

    #[tokio::test]
    async fn test_sql_gzip_output_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("result.csv.gz");
        let console = MemoryConsole::new();

        run_sql(
            &database(),
            &console,
            &format!(
                "-o {} --compress gzip -f csv --no-rownum -t s --tz UTC select * from example",
                path.to_str().unwrap()
            ),
        )
        .await;

        let mut text = String::new();
        GzDecoder::new(std::fs::File::open(path).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!("NAME,TIME,VALUE\nx,1735787045,1.5\ny,1735787046,2.25\n", text);
        assert_eq!("2 rows selected.\n", console.output());
    }

    #[tokio::test]
    async fn test_sql_statement_prints_server_message() {
        let database = database();
        let console = MemoryConsole::new();

        run_sql(&database, &console, "create tag table other (name varchar(100))").await;

        assert_eq!("executed.\n", console.output());
        assert_eq!(1, database.statements().len());
        assert!(database.queries().is_empty());
    }

    #[tokio::test]
    async fn test_sql_pager_quit_prints_no_error_or_footer() {
        let database = MemoryDatabase::new();
        let columns = Columns::new(vec![Column::new("ID", ColumnType::Int64)]);
        let rows = (0..12).map(|id| vec![Value::Int64(id)]).collect();
        database.create_table("numbers", columns, rows);

        // 7 terminal rows leave 5 rows per page below the CSV header and the prompt.
        let console = MemoryConsole::new().with_pager(7, vec![PagerAction::Quit]);
        let configuration_manager = ConfigurationManager::default();
        let history = SqlHistory::default();
        let context = ActionContext {
            database: &database,
            console: &console,
            configuration_manager: &configuration_manager,
            history: &history,
            cancel: CancellationToken::new(),
        };

        let error = run(&context, "-f csv --no-rownum select * from numbers")
            .await
            .unwrap_err();

        assert!(error.is_cancelled());
        assert_eq!("ID\n0\n1\n2\n3\n4\n", console.output());
        assert_eq!(1, database.closed_cursors());
    }
}
