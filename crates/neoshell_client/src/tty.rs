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

//! Terminal handling for the pager, the walker, and the terminal chart. The terminal is switched
//! to raw mode with `stty` and restored when the returned guard is dropped, so every exit path
//! leaves the terminal as it was found.

use std::io::{self, Read, Write};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{NeoShellClientError, Result};
use crate::pipeline::{Pager, PagerAction};

/// Size used when the size of the terminal cannot be determined.
const DEFAULT_TERMINAL_SIZE: (usize, usize) = (24, 80);

/// A key read from the terminal in raw mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Home,
    End,
    Enter,
    Esc,
    CtrlC,
    Char(char),
    Unknown,
}

/// Guard that keeps the terminal in raw mode until it is dropped.
pub struct RawMode {
    saved_state: String,
}

impl RawMode {
    /// Switch the terminal to raw mode. If `wait` is set, reads block until a key is pressed,
    /// otherwise they return after at most a tenth of a second so the caller can poll.
    pub fn enter(wait: bool) -> Result<Self> {
        let saved_state = stty_capture("-g")?;

        if wait {
            stty("raw -echo min 1 time 0")?;
        } else {
            stty("raw -echo min 0 time 1")?;
        }

        Ok(Self { saved_state })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(error) = stty(&self.saved_state) {
            debug!(%error, "Failed to restore the terminal.");
        }
    }
}

/// Guard that shows the alternate screen with the cursor hidden until it is dropped.
pub struct AlternateScreen;

impl AlternateScreen {
    pub fn enter() -> Result<Self> {
        let mut stdout = io::stdout();
        stdout.write_all(b"\x1b[?1049h\x1b[?25l")?;
        stdout.flush()?;
        Ok(Self)
    }

    /// Clear the screen and draw `lines` from the top left corner.
    pub fn draw(&self, lines: &[String]) -> Result<()> {
        let mut frame = String::from("\x1b[H\x1b[2J");
        frame.push_str(&lines.join("\r\n"));

        let mut stdout = io::stdout();
        stdout.write_all(frame.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}

impl Drop for AlternateScreen {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = stdout.write_all(b"\x1b[0m\x1b[?25h\x1b[?1049l");
        let _ = stdout.flush();
    }
}

/// Return the number of rows and columns of the terminal.
pub fn terminal_size() -> (usize, usize) {
    stty_capture("size")
        .ok()
        .and_then(|size| {
            let mut parts = size.split_whitespace();
            let rows = parts.next()?.parse().ok()?;
            let columns = parts.next()?.parse().ok()?;
            Some((rows, columns))
        })
        .filter(|(rows, columns)| *rows > 0 && *columns > 0)
        .unwrap_or(DEFAULT_TERMINAL_SIZE)
}

/// Read a key from standard input. Returns [`None`] if no key was pressed before the read timed
/// out, which only happens when not waiting for keys.
pub fn read_key() -> Result<Option<Key>> {
    let mut stdin = io::stdin();
    let mut buffer = [0u8; 16];

    let read = stdin.read(&mut buffer)?;
    if read == 0 {
        return Ok(None);
    }

    let mut sequence = buffer[..read].to_vec();
    if sequence == [0x1b] {
        // The rest of an escape sequence may arrive in a separate read.
        let mut rest = [0u8; 8];
        let read = stdin.read(&mut rest)?;
        sequence.extend_from_slice(&rest[..read]);
    }

    Ok(Some(parse_key(&sequence)))
}

/// Parse the bytes sent by the terminal for a single key press.
pub fn parse_key(sequence: &[u8]) -> Key {
    match sequence {
        [] => Key::Unknown,
        [0x03, ..] => Key::CtrlC,
        [b'\r', ..] | [b'\n', ..] => Key::Enter,
        [0x1b, b'[', rest @ ..] | [0x1b, b'O', rest @ ..] => match rest {
            [b'A', ..] => Key::Up,
            [b'B', ..] => Key::Down,
            [b'C', ..] => Key::Right,
            [b'D', ..] => Key::Left,
            [b'H', ..] | [b'1', b'~', ..] => Key::Home,
            [b'F', ..] | [b'4', b'~', ..] => Key::End,
            [b'5', b'~', ..] => Key::PageUp,
            [b'6', b'~', ..] => Key::PageDown,
            _ => Key::Unknown,
        },
        [0x1b, ..] => Key::Esc,
        [byte, ..] if (0x20..=0x7e).contains(byte) => Key::Char(*byte as char),
        _ => Key::Unknown,
    }
}

/// Pager that prompts with `:` on the terminal and waits for a single key.
pub struct TerminalPager;

impl Pager for TerminalPager {
    fn terminal_rows(&self) -> usize {
        terminal_size().0
    }

    fn pause(&mut self) -> Result<PagerAction> {
        let mut stdout = io::stdout();
        stdout.write_all(b":")?;
        stdout.flush()?;

        let key = {
            let _raw_mode = RawMode::enter(true)?;
            read_key()?
        };

        // Erase the prompt so the next page continues on the same line.
        stdout.write_all(b"\r\x1b[K")?;
        stdout.flush()?;

        match key {
            Some(Key::Char('q' | 'Q')) | Some(Key::CtrlC) => Ok(PagerAction::Quit),
            _ => Ok(PagerAction::Continue),
        }
    }
}

fn stty(arguments: &str) -> Result<()> {
    let status = Command::new("sh")
        .arg("-c")
        .arg(format!("stty {arguments} < /dev/tty > /dev/tty 2>/dev/null"))
        .stdin(Stdio::null())
        .status()?;

    if status.success() {
        Ok(())
    } else {
        Err(NeoShellClientError::Io(io::Error::other(format!(
            "stty {arguments} failed with {status}."
        ))))
    }
}

fn stty_capture(arguments: &str) -> Result<String> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(format!("stty {arguments} < /dev/tty 2>/dev/null"))
        .stdin(Stdio::null())
        .output()?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
    } else {
        Err(NeoShellClientError::Io(io::Error::other(format!(
            "stty {arguments} failed with {}.",
            output.status
        ))))
    }
}
