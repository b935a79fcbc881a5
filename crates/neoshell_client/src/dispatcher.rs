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

//! The command dispatcher. A line is routed to the verb named by its first word, by a trailing
//! `\verb` suffix, or to `sql` if neither names a verb. The dispatcher also owns the SQL history
//! that `sql` and `walk` add to and that the completer offers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use neoshell_codec::fields::split_fields;
use tracing::{debug, warn};

use crate::cancel::CancellationToken;
use crate::configuration::ConfigurationManager;
use crate::console::Console;
use crate::database::Database;
use crate::error::Result;
use crate::verbs;

/// Maximum number of statements kept in the SQL history.
pub const SQL_HISTORY_SIZE: usize = 10;

/// The action a verb runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerbKind {
    Sql,
    Explain,
    Export,
    Import,
    Desc,
    Show,
    Walk,
    Chart,
    Set,
    Key,
    Shutdown,
    Help,
    Exit,
}

/// A built-in verb of the shell.
#[derive(Debug)]
pub struct Verb {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub kind: VerbKind,
    pub description: &'static str,
    /// Words completed after the name of the verb.
    pub completions: &'static [&'static str],
}

/// Every verb of the shell.
pub static VERBS: &[Verb] = &[
    Verb {
        name: "sql",
        aliases: &[],
        kind: VerbKind::Sql,
        description: "Execute a SQL statement",
        completions: &[],
    },
    Verb {
        name: "explain",
        aliases: &[],
        kind: VerbKind::Explain,
        description: "Print the execution plan of a query",
        completions: &[],
    },
    Verb {
        name: "export",
        aliases: &[],
        kind: VerbKind::Export,
        description: "Export the rows of a table",
        completions: &[
            "--output",
            "--format",
            "--compress",
            "--delimiter",
            "--timeformat",
            "--tz",
        ],
    },
    Verb {
        name: "import",
        aliases: &[],
        kind: VerbKind::Import,
        description: "Import rows into a table",
        completions: &[
            "--input",
            "--format",
            "--header",
            "--method",
            "--create-table",
            "--truncate-table",
            "--compress",
            "--eof",
        ],
    },
    Verb {
        name: "desc",
        aliases: &["describe"],
        kind: VerbKind::Desc,
        description: "Describe a table",
        completions: &["--all"],
    },
    Verb {
        name: "show",
        aliases: &[],
        kind: VerbKind::Show,
        description: "Show server information and tables",
        completions: &["info", "tables", "meta-tables", "virtual-tables"],
    },
    Verb {
        name: "walk",
        aliases: &[],
        kind: VerbKind::Walk,
        description: "Browse the result of a query in a scrollable table",
        completions: &[],
    },
    Verb {
        name: "chart",
        aliases: &[],
        kind: VerbKind::Chart,
        description: "Draw the values of tags as a chart",
        completions: &["--range", "--refresh", "--count", "--output", "--format", "--time"],
    },
    Verb {
        name: "set",
        aliases: &[],
        kind: VerbKind::Set,
        description: "Show or change settings",
        completions: &["vi-mode", "box-style", "tz", "timeformat", "heading"],
    },
    Verb {
        name: "key",
        aliases: &[],
        kind: VerbKind::Key,
        description: "Manage client keys",
        completions: &["list", "gen", "del"],
    },
    Verb {
        name: "shutdown",
        aliases: &[],
        kind: VerbKind::Shutdown,
        description: "Shut down the server",
        completions: &[],
    },
    Verb {
        name: "help",
        aliases: &["\\h"],
        kind: VerbKind::Help,
        description: "Print help",
        completions: &["timeformat", "tz"],
    },
    Verb {
        name: "exit",
        aliases: &["quit", "\\q"],
        kind: VerbKind::Exit,
        description: "Exit the shell",
        completions: &[],
    },
];

/// Return the verb with `name` or an alias of `name`.
pub fn find_verb(name: &str) -> Option<&'static Verb> {
    let name = name.to_lowercase();
    VERBS
        .iter()
        .find(|verb| verb.name == name)
        .or_else(|| VERBS.iter().find(|verb| verb.aliases.contains(&name.as_str())))
}

/// Whether the shell should keep reading commands after a line has been dispatched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// The most recent SQL statements, oldest first.
#[derive(Debug, Default)]
pub struct SqlHistory {
    entries: Mutex<VecDeque<String>>,
}

impl SqlHistory {
    pub fn add(&self, sql: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if entries.back().is_some_and(|last| last == sql) {
            return;
        }

        entries.push_back(sql.to_owned());
        while entries.len() > SQL_HISTORY_SIZE {
            entries.pop_front();
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

/// Everything a verb needs to run.
pub struct ActionContext<'a> {
    pub database: &'a dyn Database,
    pub console: &'a dyn Console,
    pub configuration_manager: &'a ConfigurationManager,
    pub history: &'a SqlHistory,
    /// Root cancellation token of the command.
    pub cancel: CancellationToken,
}

/// Routes lines to verbs and prints their errors.
pub struct Dispatcher {
    database: Arc<dyn Database>,
    console: Arc<dyn Console>,
    configuration_manager: Arc<ConfigurationManager>,
    history: Arc<SqlHistory>,
}

impl Dispatcher {
    pub fn new(
        database: Arc<dyn Database>,
        console: Arc<dyn Console>,
        configuration_manager: Arc<ConfigurationManager>,
    ) -> Self {
        Self {
            database,
            console,
            configuration_manager,
            history: Arc::new(SqlHistory::default()),
        }
    }

    /// Return the SQL history shared with the completer.
    pub fn history(&self) -> &Arc<SqlHistory> {
        &self.history
    }

    pub fn configuration_manager(&self) -> &ConfigurationManager {
        &self.configuration_manager
    }

    /// Run the verb `line` is routed to. Errors are printed as a single `ERR` line except when the
    /// user cancelled the command.
    pub async fn dispatch(&self, line: &str, cancel: CancellationToken) -> Flow {
        let line = line.trim();
        if line.is_empty() {
            return Flow::Continue;
        }

        let (verb, arguments) = route(line);
        debug!(verb = verb.name, arguments, "Dispatching command.");

        if verb.kind == VerbKind::Exit {
            return Flow::Exit;
        }

        let context = ActionContext {
            database: self.database.as_ref(),
            console: self.console.as_ref(),
            configuration_manager: &self.configuration_manager,
            history: self.history.as_ref(),
            cancel,
        };

        if let Err(error) = run_verb(verb.kind, &context, &arguments).await {
            if error.is_cancelled() {
                debug!(verb = verb.name, "Command cancelled.");
            } else if let Err(print_error) = self.console.println(&format!("ERR {error}")) {
                warn!(%error, %print_error, "Failed to print error.");
            }
        }

        Flow::Continue
    }
}

async fn run_verb(kind: VerbKind, context: &ActionContext<'_>, arguments: &str) -> Result<()> {
    match kind {
        VerbKind::Sql => verbs::sql::run(context, arguments).await,
        VerbKind::Explain => verbs::explain::run(context, arguments).await,
        VerbKind::Export => verbs::export::run(context, arguments).await,
        VerbKind::Import => verbs::import::run(context, arguments).await,
        VerbKind::Desc => verbs::desc::run(context, arguments).await,
        VerbKind::Show => verbs::show::run(context, arguments).await,
        VerbKind::Walk => verbs::walk::run(context, arguments).await,
        VerbKind::Chart => verbs::chart::run(context, arguments).await,
        VerbKind::Set => verbs::set::run(context, arguments),
        VerbKind::Key => verbs::key::run(context, arguments).await,
        VerbKind::Shutdown => verbs::shutdown::run(context, arguments).await,
        VerbKind::Help => verbs::help::run(context, arguments),
        VerbKind::Exit => Ok(()),
    }
}

/// Return the verb `line` is routed to and the arguments of the verb.
pub fn route(line: &str) -> (&'static Verb, String) {
    let line = line.trim();

    if let Some((prefix, verb)) = split_suffix(line).and_then(|(prefix, word)| {
        let verb = find_verb(word)?;
        Some((prefix, verb))
    }) {
        return (verb, prefix.to_owned());
    }

    let first_word = split_fields(line, true).into_iter().next();
    match first_word.and_then(|word| find_verb(&word)) {
        Some(verb) => {
            let arguments = line
                .split_once(char::is_whitespace)
                .map_or("", |(_word, arguments)| arguments)
                .trim();
            (verb, arguments.to_owned())
        }
        // Unknown verbs are SQL statements.
        None => (&VERBS[0], line.to_owned()),
    }
}

/// Split a trailing `\word` suffix from `line`. Returns the text before the suffix and the word.
fn split_suffix(line: &str) -> Option<(&str, &str)> {
    let (prefix, suffix) = line.rsplit_once(char::is_whitespace)?;
    let word = suffix.strip_prefix('\\')?;

    if prefix.trim().is_empty()
        || word.is_empty()
        || !word.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return None;
    }

    Some((prefix.trim_end(), word))
}

/// Collects the lines of a statement that spans multiple lines until it ends with `;`.
#[derive(Debug, Default)]
pub struct LineAccumulator {
    parts: Vec<String>,
}

impl LineAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return [`true`] if lines have been collected for an unfinished statement.
    pub fn is_continuing(&self) -> bool {
        !self.parts.is_empty()
    }

    /// Discard the collected lines.
    pub fn clear(&mut self) {
        self.parts.clear();
    }

    /// Add `line` and return the complete command if `line` finishes it. `exit`, `help`, and
    /// `set` are complete without a `;` when they start a command. Empty lines are skipped and
    /// keep the collected lines.
    pub fn push(&mut self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        if self.parts.is_empty() && is_single_line_command(line) {
            return Some(line.trim_end_matches(';').trim_end().to_owned());
        }

        self.parts.push(line.to_owned());
        if !line.ends_with(';') {
            return None;
        }

        let command = self.parts.join(" ");
        self.parts.clear();

        Some(command.trim_end_matches(';').trim_end().to_owned())
    }
}

fn is_single_line_command(line: &str) -> bool {
    let first_word = line
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .trim_end_matches(';')
        .to_lowercase();

    matches!(
        first_word.as_str(),
        "exit" | "quit" | "\\q" | "help" | "\\h" | "set"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use neoshell_codec::schema::{Column, ColumnType, Columns, Value};

    use crate::console::tests::MemoryConsole;
    use crate::database::memory::MemoryDatabase;

    fn dispatcher(database: MemoryDatabase) -> (Dispatcher, Arc<MemoryConsole>) {
        let console = Arc::new(MemoryConsole::new());
        let dispatcher = Dispatcher::new(
            Arc::new(database),
            console.clone(),
            Arc::new(ConfigurationManager::default()),
        );
        (dispatcher, console)
    }

    // Tests for find_verb() and route().
    #[test]
    fn test_find_verb_by_name_and_alias() {
        assert_eq!(VerbKind::Desc, find_verb("describe").unwrap().kind);
        assert_eq!(VerbKind::Exit, find_verb("\\q").unwrap().kind);
        assert_eq!(VerbKind::Show, find_verb("SHOW").unwrap().kind);
        assert!(find_verb("select").is_none());
    }

    #[test]
    fn test_route_known_verb() {
        let (verb, arguments) = route("desc  example");
        assert_eq!(VerbKind::Desc, verb.kind);
        assert_eq!("example", arguments);
    }

    #[test]
    fn test_route_unknown_verb_to_sql() {
        let (verb, arguments) = route("select * from example");
        assert_eq!(VerbKind::Sql, verb.kind);
        assert_eq!("select * from example", arguments);
    }

    #[test]
    fn test_route_suffix() {
        let (verb, arguments) = route("select * from example \\walk");
        assert_eq!(VerbKind::Walk, verb.kind);
        assert_eq!("select * from example", arguments);

        let (verb, arguments) = route("select '\\n' from example \\unknown");
        assert_eq!(VerbKind::Sql, verb.kind);
        assert_eq!("select '\\n' from example \\unknown", arguments);
    }

    // Tests for SqlHistory.
    #[test]
    fn test_sql_history_keeps_last_entries() {
        let history = SqlHistory::default();
        for index in 0..15 {
            history.add(&format!("select {index}"));
        }
        history.add("select 14");

        let entries = history.entries();
        assert_eq!(SQL_HISTORY_SIZE, entries.len());
        assert_eq!("select 5", entries[0]);
        assert_eq!("select 14", entries[SQL_HISTORY_SIZE - 1]);
    }

    // Tests for LineAccumulator.
    #[test]
    fn test_multi_line_statement_is_joined() {
        let mut accumulator = LineAccumulator::new();

        assert_eq!(None, accumulator.push("select *"));
        assert!(accumulator.is_continuing());
        assert_eq!(None, accumulator.push("from t"));
        assert_eq!(
            Some("select * from t where id=1".to_owned()),
            accumulator.push("where id=1;")
        );
        assert!(!accumulator.is_continuing());
    }

    #[test]
    fn test_single_line_commands_do_not_need_semicolon() {
        let mut accumulator = LineAccumulator::new();

        assert_eq!(Some("help sql".to_owned()), accumulator.push("help sql"));
        assert_eq!(Some("set tz UTC".to_owned()), accumulator.push("set tz UTC"));
        assert_eq!(Some("exit".to_owned()), accumulator.push("exit;"));
    }

    #[test]
    fn test_empty_line_keeps_collected_lines() {
        let mut accumulator = LineAccumulator::new();

        assert_eq!(None, accumulator.push("select *"));
        assert_eq!(None, accumulator.push(""));
        assert_eq!(None, accumulator.push("   "));
        assert!(accumulator.is_continuing());
        assert_eq!(Some("select * from t".to_owned()), accumulator.push("from t;"));
        assert!(!accumulator.is_continuing());
    }

    #[test]
    fn test_empty_line_without_collected_lines_is_ignored() {
        let mut accumulator = LineAccumulator::new();

        assert_eq!(None, accumulator.push(""));
        assert!(!accumulator.is_continuing());
        assert_eq!(Some("show tables".to_owned()), accumulator.push("show tables;"));
    }

    // Tests for Dispatcher.
    #[tokio::test]
    async fn test_multi_line_statement_is_dispatched_and_added_to_history() {
        let database = MemoryDatabase::new();
        database.add_result(
            "select * from t where id=1",
            Columns::new(vec![Column::new("ID", ColumnType::Int64)]),
            vec![vec![Value::Int64(1)]],
        );
        let (dispatcher, console) = dispatcher(database.clone());

        let mut accumulator = LineAccumulator::new();
        let mut command = None;
        for line in "select *\nfrom t\nwhere id=1;".lines() {
            command = accumulator.push(line);
        }

        let command = command.unwrap();
        assert_eq!("select * from t where id=1", command);
        assert_eq!(
            Flow::Continue,
            dispatcher.dispatch(&command, CancellationToken::new()).await
        );

        assert_eq!(vec![command.clone()], dispatcher.history().entries());
        assert_eq!(command, database.queries()[0].0);
        assert!(!console.output().contains("ERR"));
    }

    #[tokio::test]
    async fn test_errors_are_printed_on_one_line() {
        let (dispatcher, console) = dispatcher(MemoryDatabase::new());

        dispatcher
            .dispatch("select * from missing", CancellationToken::new())
            .await;

        assert_eq!("ERR no result for 'select * from missing'\n", console.output());
    }

    #[tokio::test]
    async fn test_exit() {
        let (dispatcher, _console) = dispatcher(MemoryDatabase::new());
        assert_eq!(
            Flow::Exit,
            dispatcher.dispatch("exit", CancellationToken::new()).await
        );
    }
}
