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

//! The built-in verbs of the shell. Each verb parses its options from the quote-aware fields of
//! its arguments with clap and writes its output through the console of the [`ActionContext`].

pub mod chart;
pub mod desc;
pub mod explain;
pub mod export;
pub mod help;
pub mod import;
pub mod key;
pub mod set;
pub mod show;
pub mod shutdown;
pub mod sql;
pub mod walk;

use std::iter;

use clap::Parser;
use clap::error::ErrorKind;
use neoshell_codec::compression::Compression;
use neoshell_codec::context::{RenderContext, parse_delimiter};
use neoshell_codec::encoder::{OutputFormat, RowEncoder};
use neoshell_codec::error::NeoShellCodecError;
use neoshell_codec::fields::{split_fields, strip_quote};
use neoshell_codec::schema::{Column, ColumnType, Columns, Value};
use neoshell_codec::timeformat::TimeFormat;
use neoshell_codec::zone::Zone;

use crate::dispatcher::ActionContext;
use crate::error::{NeoShellClientError, Result};

/// Parse the options of `verb` from `arguments`. Returns [`None`] if help was requested, in which
/// case the usage of the verb has been printed.
pub(crate) fn parse_options<T: Parser>(
    context: &ActionContext<'_>,
    verb: &str,
    arguments: &str,
) -> Result<Option<T>> {
    let fields = split_fields(arguments, false);

    match T::try_parse_from(iter::once(verb.to_owned()).chain(fields)) {
        Ok(options) => Ok(Some(options)),
        Err(error) if matches!(error.kind(), ErrorKind::DisplayHelp) => {
            context.console.println(error.render().to_string().trim_end())?;
            Ok(None)
        }
        Err(error) => {
            let rendered = error.render().to_string();
            let reason = rendered.lines().next().unwrap_or_default();
            Err(NeoShellClientError::InvalidArgument(
                reason.trim_start_matches("error: ").to_owned(),
            ))
        }
    }
}

/// Resolve a `--flag`/`--no-flag` pair. The flags override each other so at most one is set.
pub(crate) fn switch(on: bool, off: bool, default: bool) -> bool {
    if on {
        true
    } else if off {
        false
    } else {
        default
    }
}

pub(crate) fn unquoted(value: &str) -> std::result::Result<String, NeoShellCodecError> {
    Ok(strip_quote(value))
}

pub(crate) fn parse_zone(value: &str) -> std::result::Result<Zone, NeoShellCodecError> {
    strip_quote(value).parse()
}

pub(crate) fn parse_time_format(
    value: &str,
) -> std::result::Result<TimeFormat, NeoShellCodecError> {
    strip_quote(value).parse()
}

pub(crate) fn parse_output_format(
    value: &str,
) -> std::result::Result<OutputFormat, NeoShellCodecError> {
    strip_quote(value).parse()
}

pub(crate) fn parse_compression(
    value: &str,
) -> std::result::Result<Compression, NeoShellCodecError> {
    strip_quote(value).parse()
}

pub(crate) fn parse_delimiter_option(
    value: &str,
) -> std::result::Result<char, NeoShellCodecError> {
    parse_delimiter(&strip_quote(value))
}

/// Print `rows` of text as a box with `headers` on standard output.
pub(crate) fn print_box(
    context: &ActionContext<'_>,
    headers: &[&str],
    rows: Vec<Vec<String>>,
) -> Result<()> {
    let columns = Columns::new(
        headers
            .iter()
            .map(|header| Column::new(header, ColumnType::String))
            .collect(),
    );

    let settings = context.configuration_manager.values();
    let render_context = RenderContext::builder()
        .box_style(settings.box_style)
        .interactive(context.console.is_interactive())
        .build();

    let sink = context.console.stdout()?;
    let mut encoder = RowEncoder::new(OutputFormat::Box, render_context, sink);

    encoder.open(&columns)?;
    for row in rows {
        let row: Vec<Value> = row.into_iter().map(Value::String).collect();
        encoder.render_row(&row)?;
    }
    encoder.close()?;

    Ok(())
}

/// Return the message printed after a query returned `rows` rows.
pub(crate) fn rows_selected(rows: u64) -> String {
    match rows {
        0 => "no rows selected.".to_owned(),
        1 => "a row selected.".to_owned(),
        rows => format!("{rows} rows selected."),
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    use crate::cancel::CancellationToken;
    use crate::configuration::ConfigurationManager;
    use crate::console::tests::MemoryConsole;
    use crate::database::memory::MemoryDatabase;
    use crate::dispatcher::SqlHistory;

    #[derive(Parser, Debug)]
    #[command(name = "sample", disable_version_flag = true)]
    struct SampleOptions {
        #[arg(short, long, default_value = "-", value_parser = unquoted)]
        output: String,
        #[arg(long, overrides_with = "no_heading")]
        heading: bool,
        #[arg(long, overrides_with = "heading")]
        no_heading: bool,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        rest: Vec<String>,
    }

    /// Database, console, and settings a verb runs against.
    pub struct TestEnvironment {
        pub database: MemoryDatabase,
        pub console: MemoryConsole,
        pub configuration_manager: ConfigurationManager,
        pub history: SqlHistory,
    }

    impl TestEnvironment {
        pub fn new(database: MemoryDatabase) -> Self {
            Self {
                database,
                console: MemoryConsole::new(),
                configuration_manager: ConfigurationManager::default(),
                history: SqlHistory::default(),
            }
        }

        pub fn with_console(mut self, console: MemoryConsole) -> Self {
            self.console = console;
            self
        }

        pub fn context(&self) -> ActionContext<'_> {
            ActionContext {
                database: &self.database,
                console: &self.console,
                configuration_manager: &self.configuration_manager,
                history: &self.history,
                cancel: CancellationToken::new(),
            }
        }

        pub fn output(&self) -> String {
            self.console.output()
        }
    }

    fn with_context<T>(run: impl FnOnce(&ActionContext<'_>) -> T) -> (T, String) {
        let environment = TestEnvironment::new(MemoryDatabase::new());
        let result = run(&environment.context());
        (result, environment.output())
    }

    // Tests for parse_options().
    #[test]
    fn test_parse_options_strips_quotes_and_keeps_rest() {
        let (options, _output) = with_context(|context| {
            parse_options::<SampleOptions>(
                context,
                "sample",
                "-o \"out file.csv\" --no-heading select 'a  b' --x",
            )
            .unwrap()
            .unwrap()
        });

        assert_eq!("out file.csv", options.output);
        assert!(!switch(options.heading, options.no_heading, true));
        assert_eq!(vec!["select", "'a  b'", "--x"], options.rest);
    }

    #[test]
    fn test_parse_options_help_prints_usage() {
        let (options, output) = with_context(|context| {
            parse_options::<SampleOptions>(context, "sample", "--help").unwrap()
        });

        assert!(options.is_none());
        assert!(output.contains("Usage: sample"));
    }

    #[test]
    fn test_parse_options_error_is_one_line() {
        let (result, _output) = with_context(|context| {
            parse_options::<SampleOptions>(context, "sample", "--unknown")
        });

        let message = result.unwrap_err().to_string();
        assert!(message.contains("--unknown"));
        assert!(!message.contains('\n'));
    }

    // Tests for switch().
    #[test]
    fn test_switch() {
        assert!(switch(true, false, false));
        assert!(!switch(false, true, true));
        assert!(switch(false, false, true));
    }

    // Tests for rows_selected().
    #[test]
    fn test_rows_selected() {
        assert_eq!("no rows selected.", rows_selected(0));
        assert_eq!("a row selected.", rows_selected(1));
        assert_eq!("12 rows selected.", rows_selected(12));
    }
}
