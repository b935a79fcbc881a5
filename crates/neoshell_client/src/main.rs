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

//! Implementation of NeoShell's command line client.

mod cancel;
mod chart;
mod configuration;
mod console;
mod database;
mod dispatcher;
mod error;
mod helper;
mod pipeline;
mod shell;
mod tty;
mod verbs;
mod walker;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use neoshell_codec::context::BoxStyle;
use tracing::warn;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::configuration::{ConfigurationManager, SettingValues};
use crate::console::StdConsole;
use crate::database::Database;
use crate::database::flight::FlightDatabase;
use crate::dispatcher::Dispatcher;
use crate::error::{NeoShellClientError, Result};

/// Default address of the server to connect to.
const DEFAULT_SERVER: &str = "tcp://127.0.0.1:5655";

/// Name of the history file in the temporary directory if `--history-file` is not given.
const HISTORY_FILE_NAME: &str = "neoshell_history";

/// Interactive shell for time-series tag databases. Without a command, a prompt is opened.
#[derive(Parser, Debug)]
#[command(name = "neoshell", version)]
struct Cli {
    /// Address of the server.
    #[arg(short, long, default_value = DEFAULT_SERVER)]
    server: String,
    /// Name of the user.
    #[arg(short, long, default_value = "sys")]
    user: String,
    /// Box style of tables [simple|bold|double|light|round].
    #[arg(long, default_value = "light", value_parser = parse_box_style)]
    box_style: BoxStyle,
    /// File the commands of the prompt are saved to, an empty path disables the history.
    #[arg(long, default_value_os_t = default_history_file())]
    history_file: PathBuf,
    /// Use vi editing mode at the prompt.
    #[arg(long)]
    vi_mode: bool,
    /// Seconds to wait for the first response to a query, 0 to wait indefinitely.
    #[arg(long, default_value_t = 0)]
    query_timeout: u64,
    /// Log debug messages to standard error.
    #[arg(short, long)]
    verbose: bool,
    /// Command to execute instead of opening the prompt.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

/// Parse the command line arguments, connect to the server, and execute the command given as
/// arguments or the commands read from the prompt. Exits with a non-zero code only if the client
/// cannot be started.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs are written to stderr so they are never mixed with rows written to stdout.
    let level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let stderr_log = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(level);
    tracing_subscriber::registry().with(stderr_log).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("ERR {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let query_timeout = (cli.query_timeout > 0).then(|| Duration::from_secs(cli.query_timeout));
    let database = FlightDatabase::connect(&cli.server, query_timeout)
        .await
        .map_err(|error| {
            NeoShellClientError::Application(format!("cannot connect to {}: {error}", cli.server))
        })?;
    let database: Arc<dyn Database> = Arc::new(database);

    let settings = SettingValues {
        vi_mode: cli.vi_mode,
        box_style: cli.box_style,
        ..SettingValues::default()
    };
    let dispatcher = Dispatcher::new(
        database.clone(),
        Arc::new(StdConsole::new()),
        Arc::new(ConfigurationManager::new(settings)),
    );

    if !cli.command.is_empty() {
        let command = cli.command.join(" ");
        shell::run_command(&dispatcher, command.trim()).await;
        return Ok(());
    }

    let table_names = database.tables().await.unwrap_or_else(|error| {
        warn!(%error, "Failed to retrieve table names for completion.");
        vec![]
    });

    let history_file = expand_history_file(&cli.history_file);
    shell::run(&dispatcher, &cli.user, history_file.as_deref(), table_names).await
}

fn parse_box_style(value: &str) -> std::result::Result<BoxStyle, String> {
    value.parse().map_err(|error: neoshell_codec::error::NeoShellCodecError| error.to_string())
}

fn default_history_file() -> PathBuf {
    std::env::temp_dir().join(HISTORY_FILE_NAME)
}

/// Return the history file with a leading `~` replaced by the home directory of the user, or
/// [`None`] if `history_file` is empty.
fn expand_history_file(history_file: &Path) -> Option<PathBuf> {
    if history_file.as_os_str().is_empty() {
        return None;
    }

    match (history_file.strip_prefix("~"), dirs::home_dir()) {
        (Ok(relative_path), Some(home)) => Some(home.join(relative_path)),
        _ => Some(history_file.to_owned()),
    }
}
