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


//! Implementation of the `import` verb that writes CSV or JSON rows into a table, either with one
//! `INSERT` per row or through an appender.

use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::str::FromStr;

use clap::Parser;
use neoshell_codec::compression::Compression;
use neoshell_codec::context::RenderContext;
use neoshell_codec::decoder::{InputFormat, RowDecoder};
use neoshell_codec::error::NeoShellCodecError;
use neoshell_codec::fields::strip_quote;
use neoshell_codec::schema::Row;
use neoshell_codec::sink::STDOUT;
use neoshell_codec::timeformat::TimeFormat;
use neoshell_codec::zone::Zone;
use tracing::debug;

use crate::database::catalog::TableKind;
use crate::database::{Appender, Database};
use crate::dispatcher::ActionContext;
use crate::error::{NeoShellClientError, Result};
use crate::verbs::{
    parse_compression, parse_delimiter_option, parse_options, parse_time_format, parse_zone,
    unquoted,
};

/// How the imported rows are written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportMethod {
    Insert,
    Append,
}

impl Display for ImportMethod {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Insert => f.write_str("insert"),
            Self::Append => f.write_str("append"),
        }
    }
}

impl FromStr for ImportMethod {
    type Err = NeoShellClientError;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "insert" => Ok(Self::Insert),
            "append" => Ok(Self::Append),
            _ => Err(NeoShellClientError::InvalidArgument(format!(
                "unknown method '{name}', use one of insert, append."
            ))),
        }
    }
}

/// Import rows into a table.
#[derive(Parser, Debug)]
#[command(name = "import", disable_version_flag = true)]
pub struct ImportOptions {
    /// Input file or `-` for standard input.
    #[arg(short, long, default_value = STDOUT, value_parser = unquoted)]
    input: String,
    /// Input format [csv|json].
    #[arg(short, long, default_value = "csv", value_parser = parse_input_format)]
    format: InputFormat,
    /// The first line is a header and is skipped.
    #[arg(long, overrides_with = "no_header")]
    header: bool,
    /// There is no header line (default).
    #[arg(long, overrides_with = "header")]
    no_header: bool,
    /// Write method [insert|append].
    #[arg(long, default_value = "insert", value_parser = parse_method)]
    method: ImportMethod,
    /// Create the table if it does not exist.
    #[arg(long)]
    create_table: bool,
    /// Truncate the table before importing.
    #[arg(long)]
    truncate_table: bool,
    /// The input is compressed [gzip], not compressed by default. Ignored for interactive input.
    #[arg(short = 'z', long, default_value = "-", value_parser = parse_compression)]
    compress: Compression,
    /// Delimiter of CSV input.
    #[arg(short, long, default_value = ",", value_parser = parse_delimiter_option)]
    delimiter: char,
    /// Time zone of datetime values without an offset, see "help tz".
    #[arg(long, default_value = "UTC", value_parser = parse_zone)]
    tz: Zone,
    /// Time format [ns|us|ms|s|<layout>], see "help timeformat".
    #[arg(short = 't', long, default_value = "ns", value_parser = parse_time_format)]
    timeformat: TimeFormat,
    /// Line that ends interactive input.
    #[arg(long, default_value = ".", value_parser = unquoted)]
    eof: String,
    /// The table to write to.
    #[arg(value_parser = unquoted)]
    table: String,
}

fn parse_input_format(value: &str) -> std::result::Result<InputFormat, NeoShellCodecError> {
    strip_quote(value).parse()
}

fn parse_method(value: &str) -> std::result::Result<ImportMethod, String> {
    strip_quote(value).parse().map_err(|error: NeoShellClientError| error.to_string())
}

pub async fn run(context: &ActionContext<'_>, arguments: &str) -> Result<()> {
    let Some(options) = parse_options::<ImportOptions>(context, "import", arguments)? else {
        return Ok(());
    };

    prepare_table(context, &options).await?;

    let description = context.database.describe(&options.table, false).await?;
    let columns = description.to_columns()?;

    let reading_stdin = options.input == STDOUT;
    let interactive = reading_stdin && context.console.is_interactive();

    let reader: Box<dyn Read + Send> = if reading_stdin {
        let stdin = context.console.stdin();
        if interactive {
            context
                .console
                .println(&format!("# Enter {}⏎ to quit", options.eof))?;
            context.console.println(&format!(
                "# {}",
                columns.names().join(&options.delimiter.to_string())
            ))?;
            Box::new(UntilEofMark::new(stdin, &options.eof))
        } else {
            options.compress.decompress(Box::new(stdin))
        }
    } else {
        options
            .compress
            .decompress(Box::new(BufReader::new(File::open(&options.input)?)))
    };

    let render_context = RenderContext::builder()
        .zone(options.tz.clone())
        .time_format(options.timeformat.clone())
        .delimiter(options.delimiter)
        .build();

    let skip_header = options.header && !options.no_header;
    let mut decoder = RowDecoder::new(options.format, reader, columns, render_context, skip_header)?;

    let mut writer = RowWriter::new(context.database, &options);
    let mut records = 0_u64;

    let result = loop {
        if context.cancel.is_cancelled() {
            break Err(NeoShellClientError::Cancelled);
        }

        let row = match decoder.next_row() {
            Ok(Some(row)) => row,
            Ok(None) => break Ok(()),
            Err(error) => break Err(error.into()),
        };

        if let Err(error) = writer.write(row).await {
            break Err(error);
        }
        records += 1;
    };

    // Rows written before a failure are kept.
    let close_result = writer.close().await;
    debug!(records, table = options.table, "Import finished.");

    result?;
    close_result?;

    context.console.println(&format!(
        "import total {records} record(s) {}ed",
        options.method
    ))
}

/// Create or truncate the table as requested. Returns [`NeoShellClientError`] if it does not exist
/// and should not be created.
async fn prepare_table(context: &ActionContext<'_>, options: &ImportOptions) -> Result<()> {
    let table = &options.table;
    let exists = table_exists(context.database, table).await?;

    if !exists {
        if !options.create_table {
            return Err(NeoShellClientError::Application(format!(
                "Table '{table}' does not exist"
            )));
        }

        context
            .database
            .execute(
                &format!(
                    "create tag table {table} (name varchar(200) primary key, \
                     time datetime basetime, value double summarized)"
                ),
                &[],
            )
            .await?;
        context.console.println(&format!("Table '{table}' created"))?;
    } else if options.truncate_table {
        context
            .database
            .execute(&format!("truncate table {table}"), &[])
            .await?;
        context
            .console
            .println(&format!("Table '{table}' truncated"))?;
    }

    Ok(())
}

async fn table_exists(database: &dyn Database, table: &str) -> Result<bool> {
    let tables = database.list_tables(TableKind::Tables, true).await?;
    Ok(tables
        .iter()
        .any(|listed| listed.name.eq_ignore_ascii_case(table)))
}

/// Writes rows with `INSERT` statements or an appender that is opened on the first row.
struct RowWriter<'a> {
    database: &'a dyn Database,
    method: ImportMethod,
    table: &'a str,
    appender: Option<Box<dyn Appender>>,
}

impl<'a> RowWriter<'a> {
    fn new(database: &'a dyn Database, options: &'a ImportOptions) -> Self {
        Self {
            database,
            method: options.method,
            table: &options.table,
            appender: None,
        }
    }

    async fn write(&mut self, row: Row) -> Result<()> {
        match self.method {
            ImportMethod::Insert => {
                let placeholders = vec!["?"; row.len()].join(",");
                let sql = format!("insert into {} values({placeholders})", self.table);
                self.database.execute(&sql, &row).await?;
            }
            ImportMethod::Append => {
                if self.appender.is_none() {
                    let description = self.database.describe(self.table, false).await?;
                    let columns = description.to_columns()?;
                    self.appender = Some(self.database.appender(self.table, &columns).await?);
                }

                if let Some(appender) = self.appender.as_mut() {
                    appender.append(row).await?;
                }
            }
        }

        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut appender) = self.appender.take() {
            appender.close().await?;
        }
        Ok(())
    }
}

/// Reader that returns the lines of a reader until a line equal to the eof mark.
struct UntilEofMark<R: BufRead> {
    reader: R,
    eof_mark: String,
    line: Vec<u8>,
    position: usize,
    done: bool,
}

impl<R: BufRead> UntilEofMark<R> {
    fn new(reader: R, eof_mark: &str) -> Self {
        Self {
            reader,
            eof_mark: eof_mark.to_owned(),
            line: vec![],
            position: 0,
            done: false,
        }
    }
}

impl<R: BufRead> Read for UntilEofMark<R> {
    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        while self.position == self.line.len() {
            if self.done {
                return Ok(0);
            }

            self.line.clear();
            self.position = 0;

            if self.reader.read_until(b'\n', &mut self.line)? == 0 {
                self.done = true;
                return Ok(0);
            }

            let content = String::from_utf8_lossy(&self.line);
            if content.trim_end_matches(['\r', '\n']) == self.eof_mark {
                self.line.clear();
                self.done = true;
                return Ok(0);
            }
        }

        let remaining = &self.line[self.position..];
        let length = remaining.len().min(buffer.len());
        buffer[..length].copy_from_slice(&remaining[..length]);
        self.position += length;

        Ok(length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::{Cursor, Write};

    use flate2::write::GzEncoder;
    use neoshell_codec::schema::{Column, ColumnType, Columns, Value};
    use tempfile::NamedTempFile;

    use crate::console::tests::MemoryConsole;
    use crate::database::memory::{MemoryDatabase, tag_table_columns};
    use crate::verbs::tests::TestEnvironment;

    fn two_column_database() -> MemoryDatabase {
        let database = MemoryDatabase::new();
        database.create_table(
            "pairs",
            Columns::new(vec![
                Column::new("NAME", ColumnType::String),
                Column::new("VALUE", ColumnType::Float64),
            ]),
            vec![],
        );
        database
    }

    // Tests for UntilEofMark.
    #[test]
    fn test_until_eof_mark_stops_at_mark() {
        let mut reader = UntilEofMark::new(Cursor::new("a,1\nb,2\r\n.\nc,3\n"), ".");
        let mut text = String::new();
        reader.read_to_string(&mut text).unwrap();

        assert_eq!("a,1\nb,2\r\n", text);
    }

    #[test]
    fn test_until_eof_mark_without_mark_reads_everything() {
        let mut reader = UntilEofMark::new(Cursor::new("a,1\nb,2"), "END");
        let mut text = String::new();
        reader.read_to_string(&mut text).unwrap();

        assert_eq!("a,1\nb,2", text);
    }

    // Tests for run().
    #[tokio::test]
    async fn test_import_arity_mismatch_writes_no_rows() {
        let environment = TestEnvironment::new(two_column_database())
            .with_console(MemoryConsole::new().with_input("a,b,c\n"));

        let error = run(&environment.context(), "pairs").await.unwrap_err();
        let message = error.to_string();

        assert!(message.contains("line 1"));
        assert!(message.contains("columns 3"));
        assert!(message.contains("expected 2"));
        assert!(environment.database.rows("pairs").is_empty());
        assert!(environment.database.statements().is_empty());
    }

    #[tokio::test]
    async fn test_import_insert_from_stdin() {
        let environment = TestEnvironment::new(two_column_database())
            .with_console(MemoryConsole::new().with_input("NAME,VALUE\nx,1.5\ny,2\n"));

        run(&environment.context(), "--header pairs").await.unwrap();

        assert_eq!("import total 2 record(s) inserted\n", environment.output());
        assert_eq!(
            vec![
                vec![Value::String("x".to_owned()), Value::Float64(1.5)],
                vec![Value::String("y".to_owned()), Value::Float64(2.0)],
            ],
            environment.database.rows("pairs")
        );
        assert_eq!(
            "insert into pairs values(?,?)",
            environment.database.statements()[0].0
        );
    }

    #[tokio::test]
    async fn test_import_stops_at_first_bad_row() {
        let environment = TestEnvironment::new(two_column_database())
            .with_console(MemoryConsole::new().with_input("x,1\ny,oops\nz,3\n"));

        let error = run(&environment.context(), "pairs").await.unwrap_err();

        assert!(error.to_string().contains("line 2"));
        assert_eq!(1, environment.database.rows("pairs").len());
        assert_eq!("", environment.output());
    }

    #[tokio::test]
    async fn test_import_append_from_file_with_semicolons() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "x;1\ny;2\nz;3\n").unwrap();

        let environment = TestEnvironment::new(two_column_database());
        run(
            &environment.context(),
            &format!(
                "-i {} --method append -d ; pairs",
                file.path().to_str().unwrap()
            ),
        )
        .await
        .unwrap();

        assert_eq!("import total 3 record(s) appended\n", environment.output());
        assert_eq!(3, environment.database.rows("pairs").len());
        assert!(environment.database.statements().is_empty());
    }

    #[tokio::test]
    async fn test_import_interactive_input_ends_at_eof_mark() {
        let console = MemoryConsole::new()
            .with_input("x,1\nEND\ny,2\n")
            .with_pager(24, vec![]);
        let environment = TestEnvironment::new(two_column_database()).with_console(console);

        run(&environment.context(), "--eof END pairs").await.unwrap();

        assert_eq!(
            "# Enter END⏎ to quit\n# NAME,VALUE\nimport total 1 record(s) inserted\n",
            environment.output()
        );
        assert_eq!(1, environment.database.rows("pairs").len());
    }

    #[tokio::test]
    async fn test_import_missing_table() {
        let environment = TestEnvironment::new(MemoryDatabase::new())
            .with_console(MemoryConsole::new().with_input("x,1\n"));

        let error = run(&environment.context(), "missing").await.unwrap_err();
        assert_eq!("Table 'missing' does not exist", error.to_string());
    }

    #[tokio::test]
    async fn test_import_create_table() {
        let environment = TestEnvironment::new(MemoryDatabase::new()).with_console(
            MemoryConsole::new().with_input("x,1735787045000000000,1.5\n"),
        );

        run(&environment.context(), "--create-table sensors")
            .await
            .unwrap();

        assert_eq!(
            "Table 'sensors' created\nimport total 1 record(s) inserted\n",
            environment.output()
        );
        assert_eq!(tag_table_columns().len(), environment.database.rows("sensors")[0].len());
    }

    #[tokio::test]
    async fn test_import_truncate_table() {
        let database = MemoryDatabase::new();
        database.create_table(
            "pairs",
            Columns::new(vec![
                Column::new("NAME", ColumnType::String),
                Column::new("VALUE", ColumnType::Float64),
            ]),
            vec![vec![Value::String("old".to_owned()), Value::Float64(0.0)]],
        );

        let environment = TestEnvironment::new(database)
            .with_console(MemoryConsole::new().with_input("x,1\n"));
        run(&environment.context(), "--truncate-table pairs")
            .await
            .unwrap();

        assert!(environment.output().starts_with("Table 'pairs' truncated\n"));
        assert_eq!(
            vec![vec![Value::String("x".to_owned()), Value::Float64(1.0)]],
            environment.database.rows("pairs")
        );
    }

    #[tokio::test]
    async fn test_import_gzip_file() {
        let mut encoder = GzEncoder::new(NamedTempFile::new().unwrap(), flate2::Compression::default());
        encoder.write_all(b"x,1.5\ny,2\n").unwrap();
        let file = encoder.finish().unwrap();

        let environment = TestEnvironment::new(two_column_database());
        run(
            &environment.context(),
            &format!("--compress gzip -i {} pairs", file.path().to_str().unwrap()),
        )
        .await
        .unwrap();

        assert_eq!("import total 2 record(s) inserted\n", environment.output());
        assert_eq!(
            vec![
                vec![Value::String("x".to_owned()), Value::Float64(1.5)],
                vec![Value::String("y".to_owned()), Value::Float64(2.0)],
            ],
            environment.database.rows("pairs")
        );
    }

    #[tokio::test]
    async fn test_import_json_keeps_rows_before_malformed_tail() {
        let environment = TestEnvironment::new(two_column_database()).with_console(
            MemoryConsole::new().with_input(r#"{"data":{"rows":[["x",1],["y",2],["#),
        );

        let error = run(&environment.context(), "-f json pairs").await.unwrap_err();

        assert!(error.to_string().contains("row 3"));
        assert_eq!(2, environment.database.rows("pairs").len());
    }
}
