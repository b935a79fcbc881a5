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

//! The standard streams the verbs read from and write to. The process uses [`StdConsole`] while
//! tests use a console that keeps everything in memory.

use std::io::{self, BufRead, IsTerminal};
use std::sync::Arc;

use neoshell_codec::sink::{FileSink, STDOUT, Sink, open_sink};

use crate::error::Result;
use crate::pipeline::Pager;
use crate::tty::TerminalPager;

/// Standard streams of the shell.
pub trait Console: Send + Sync {
    /// Return a new sink that writes to standard output. Closing it does not close the stream.
    fn stdout(&self) -> Result<Arc<dyn Sink>>;

    /// Return a reader for standard input.
    fn stdin(&self) -> Box<dyn BufRead + Send>;

    /// Return [`true`] if standard input and output are attached to a terminal.
    fn is_interactive(&self) -> bool;

    /// Return the pager used for output to standard output, [`None`] if it should not be paged.
    fn pager(&self) -> Option<Box<dyn Pager>>;

    /// Return the sink for an output target, standard output for `-`.
    fn open_output(&self, target: &str) -> Result<Arc<dyn Sink>> {
        if target.trim() == STDOUT {
            self.stdout()
        } else {
            Ok(open_sink(target)?)
        }
    }

    /// Write `line` followed by a newline to standard output.
    fn println(&self, line: &str) -> Result<()> {
        let sink = self.stdout()?;
        sink.write(line.as_bytes())?;
        sink.write(b"\n")?;
        sink.close()?;
        Ok(())
    }
}

/// Console for the standard streams of the process.
pub struct StdConsole {
    interactive: bool,
}

impl StdConsole {
    pub fn new() -> Self {
        Self {
            interactive: io::stdin().is_terminal() && io::stdout().is_terminal(),
        }
    }
}

impl Console for StdConsole {
    fn stdout(&self) -> Result<Arc<dyn Sink>> {
        Ok(Arc::new(FileSink::new(STDOUT)?))
    }

    fn stdin(&self) -> Box<dyn BufRead + Send> {
        Box::new(io::BufReader::new(io::stdin()))
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn pager(&self) -> Option<Box<dyn Pager>> {
        if self.interactive {
            Some(Box::new(TerminalPager))
        } else {
            None
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    use std::io::Cursor;
    use std::sync::Mutex;

    use neoshell_codec::sink::MemorySink;

    use crate::pipeline::PagerAction;
    use crate::pipeline::tests::ScriptedPager;

    /// Console that collects the output of every sink it hands out and reads from a fixed input.
    #[derive(Default)]
    pub struct MemoryConsole {
        sinks: Mutex<Vec<Arc<MemorySink>>>,
        input: Mutex<String>,
        /// Terminal rows and pager script, the console is interactive if set.
        pager: Option<(usize, Vec<PagerAction>)>,
    }

    impl MemoryConsole {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_input(self, input: &str) -> Self {
            *self.input.lock().unwrap() = input.to_owned();
            self
        }

        pub fn with_pager(mut self, terminal_rows: usize, actions: Vec<PagerAction>) -> Self {
            self.pager = Some((terminal_rows, actions));
            self
        }

        /// Return everything written to standard output.
        pub fn output(&self) -> String {
            self.sinks
                .lock()
                .unwrap()
                .iter()
                .map(|sink| sink.contents())
                .collect()
        }
    }

    impl Console for MemoryConsole {
        fn stdout(&self) -> Result<Arc<dyn Sink>> {
            let sink = Arc::new(MemorySink::new());
            self.sinks.lock().unwrap().push(sink.clone());
            Ok(sink)
        }

        fn stdin(&self) -> Box<dyn BufRead + Send> {
            Box::new(Cursor::new(self.input.lock().unwrap().clone().into_bytes()))
        }

        fn is_interactive(&self) -> bool {
            self.pager.is_some()
        }

        fn pager(&self) -> Option<Box<dyn Pager>> {
            self.pager.as_ref().map(|(terminal_rows, actions)| {
                Box::new(ScriptedPager::new(*terminal_rows, actions.clone())) as Box<dyn Pager>
            })
        }
    }

    #[test]
    fn test_memory_console_collects_every_sink() {
        let console = MemoryConsole::new();
        console.println("first").unwrap();
        console.println("second").unwrap();

        assert_eq!("first\nsecond\n", console.output());
    }
}
