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

//! Sink that pipes bytes to the standard input of a child process. The standard output of the
//! child is copied to the standard output of this process by a thread that is joined when the
//! child is closed, so no output is lost when [`Sink::close()`] returns.

use std::io::{self, BufWriter, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::error::{NeoShellCodecError, Result};
use crate::fields;
use crate::sink::Sink;

/// A running child process and the thread copying its output.
struct RunningChild {
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    copier: Option<JoinHandle<io::Result<u64>>>,
}

struct ProcessState {
    running: Option<RunningChild>,
    closed: bool,
}

/// Sink that writes to a spawned child process.
pub struct ProcessSink {
    program: String,
    arguments: Vec<String>,
    state: Mutex<ProcessState>,
}

impl ProcessSink {
    /// Create a sink for the command line `command` and start the child. Quoted arguments are
    /// kept together and have their quotes removed. Returns
    /// [`NeoShellCodecError::ChildProcess`] if the child cannot be started.
    pub fn new(command: &str) -> Result<Self> {
        let mut fields = fields::split_fields(command, true).into_iter();
        let program = fields.next().ok_or_else(|| {
            NeoShellCodecError::InvalidArgument("no command to execute was provided.".to_owned())
        })?;

        let sink = Self {
            program,
            arguments: fields.collect(),
            state: Mutex::new(ProcessState {
                running: None,
                closed: false,
            }),
        };

        sink.reset()?;
        Ok(sink)
    }

    fn spawn(&self) -> Result<RunningChild> {
        debug!(program = %self.program, arguments = ?self.arguments, "Starting child process.");

        let mut child = Command::new(&self.program)
            .args(&self.arguments)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|error| {
                NeoShellCodecError::ChildProcess(format!(
                    "cannot start '{}': {error}",
                    self.program
                ))
            })?;

        let stdin = child.stdin.take().map(BufWriter::new);
        let copier = child.stdout.take().map(|mut stdout| {
            thread::spawn(move || {
                let mut parent_stdout = io::stdout();
                let copied = io::copy(&mut stdout, &mut parent_stdout)?;
                parent_stdout.flush()?;
                Ok(copied)
            })
        });

        Ok(RunningChild {
            child,
            stdin,
            copier,
        })
    }

    /// Close the standard input of `running`, wait for the copier to drain the output of the
    /// child and for the child to exit. Returns [`NeoShellCodecError::ChildProcess`] if the child
    /// exited with a non-zero code.
    fn finish(&self, mut running: RunningChild) -> Result<()> {
        let flushed = match running.stdin.take() {
            Some(mut stdin) => stdin.flush(),
            None => Ok(()),
        };

        if let Some(copier) = running.copier.take() {
            match copier.join() {
                Ok(Ok(copied)) => debug!(bytes = copied, "Child process output drained."),
                Ok(Err(error)) => warn!("Cannot copy output of child process: {error}"),
                Err(_panic) => warn!("The thread copying output of the child process panicked."),
            }
        }

        let status = running.child.wait()?;
        if !status.success() {
            return Err(NeoShellCodecError::ChildProcess(format!(
                "'{}' exited with {status}",
                self.program
            )));
        }

        // A child may exit before reading all of its input, that is only an error if it failed.
        if let Err(error) = flushed {
            debug!("Cannot flush input of child process: {error}");
        }

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, ProcessState>> {
        self.state.lock().map_err(|_| {
            NeoShellCodecError::ChildProcess("the process sink lock is poisoned".to_owned())
        })
    }
}

impl Sink for ProcessSink {
    fn write(&self, bytes: &[u8]) -> Result<()> {
        let mut state = self.lock()?;
        if state.closed {
            return Err(NeoShellCodecError::EndOfStream);
        }

        match state
            .running
            .as_mut()
            .and_then(|running| running.stdin.as_mut())
        {
            Some(stdin) => Ok(stdin.write_all(bytes)?),
            None => Err(NeoShellCodecError::EndOfStream),
        }
    }

    fn flush(&self) -> Result<()> {
        let mut state = self.lock()?;
        if state.closed {
            return Err(NeoShellCodecError::EndOfStream);
        }

        match state
            .running
            .as_mut()
            .and_then(|running| running.stdin.as_mut())
        {
            Some(stdin) => Ok(stdin.flush()?),
            None => Err(NeoShellCodecError::EndOfStream),
        }
    }

    fn reset(&self) -> Result<()> {
        let mut state = self.lock()?;
        if state.closed {
            return Err(NeoShellCodecError::EndOfStream);
        }

        if let Some(running) = state.running.take() {
            self.finish(running)?;
        }

        state.running = Some(self.spawn()?);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let mut state = self.lock()?;
        if state.closed {
            return Ok(());
        }
        state.closed = true;

        match state.running.take() {
            Some(running) => self.finish(running),
            None => Ok(()),
        }
    }
}
