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

//! The read-eval-print loop of the shell. Lines are collected until a command is complete, then
//! dispatched with a new cancellation token that Ctrl-C cancels while the command runs.

use std::path::Path;

use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::{EditMode, Editor};
use tracing::{debug, warn};

use crate::cancel::CancellationToken;
use crate::configuration::ConfigurationManager;
use crate::dispatcher::{Dispatcher, Flow, LineAccumulator};
use crate::error::Result;
use crate::helper::ShellHelper;

/// Return the prompt of the shell and the prompt shown while a statement spans multiple lines.
pub fn prompts(user: &str) -> (String, String) {
    let prompt = format!("{user}@neoshell> ");
    let continuation_prompt = format!("{:>width$}> ", "-", width = prompt.chars().count() - 2);
    (prompt, continuation_prompt)
}

/// Read commands with a line editor and dispatch them until the user exits. Previously executed
/// commands are read from `history_file` and the commands of the session are appended to it.
pub async fn run(
    dispatcher: &Dispatcher,
    user: &str,
    history_file: Option<&Path>,
    table_names: Vec<String>,
) -> Result<()> {
    let mut editor = Editor::<ShellHelper, FileHistory>::new()?;
    editor.set_helper(Some(ShellHelper::new(
        dispatcher.history().clone(),
        table_names,
    )));
    apply_settings(&mut editor, dispatcher.configuration_manager());

    if let Some(history_file) = history_file {
        // The file does not exist the first time the shell is used.
        let _ = editor.load_history(history_file);
    }

    // Specify where to find helpful information about the verbs supported by the shell.
    println!("Type \\h for help.\n");

    let (prompt, continuation_prompt) = prompts(user);
    let mut accumulator = LineAccumulator::new();

    let result = loop {
        let prompt = if accumulator.is_continuing() {
            &continuation_prompt
        } else {
            &prompt
        };

        let line = match editor.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) if accumulator.is_continuing() => {
                accumulator.clear();
                continue;
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break Ok(()),
            Err(error) => break Err(error.into()),
        };

        let Some(command) = accumulator.push(&line) else {
            continue;
        };

        if let Err(error) = editor.add_history_entry(command.as_str()) {
            warn!(%error, "Failed to add command to history.");
        }

        if run_command(dispatcher, &command).await == Flow::Exit {
            break Ok(());
        }

        apply_settings(&mut editor, dispatcher.configuration_manager());
    };

    if let Some(history_file) = history_file {
        if let Err(error) = editor.append_history(history_file) {
            warn!(%error, history_file = %history_file.display(), "Failed to save history.");
        }
    }

    result
}

/// Dispatch `command` with a new cancellation token that is cancelled if Ctrl-C is pressed before
/// the command completes.
pub async fn run_command(dispatcher: &Dispatcher, command: &str) -> Flow {
    let cancel = CancellationToken::new();
    let ctrl_c_watcher = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let flow = dispatcher.dispatch(command, cancel).await;

    ctrl_c_watcher.abort();
    flow
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        debug!("Ctrl-C pressed, cancelling command.");
        cancel.cancel();
    }
}

/// Apply the settings that change the behavior of the line editor.
fn apply_settings(
    editor: &mut Editor<ShellHelper, FileHistory>,
    configuration_manager: &ConfigurationManager,
) {
    editor.set_edit_mode(edit_mode(configuration_manager.values().vi_mode));
}

fn edit_mode(vi_mode: bool) -> EditMode {
    if vi_mode { EditMode::Vi } else { EditMode::Emacs }
}
