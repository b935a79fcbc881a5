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

//! Sink that collects everything written to it in memory.

use std::sync::Mutex;

use crate::error::{NeoShellCodecError, Result};
use crate::sink::Sink;

#[derive(Default)]
struct MemoryState {
    /// Bytes written since the last reset.
    buffer: Vec<u8>,
    /// Number of times the sink has been flushed.
    flushes: usize,
    closed: bool,
}

/// Sink that keeps the written bytes in memory so they can be inspected after rendering.
#[derive(Default)]
pub struct MemorySink {
    state: Mutex<MemoryState>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the bytes written since the last reset as text.
    pub fn contents(&self) -> String {
        self.state
            .lock()
            .map(|state| String::from_utf8_lossy(&state.buffer).into_owned())
            .unwrap_or_default()
    }

    /// Return the number of times [`Sink::flush()`] has been called.
    pub fn flushes(&self) -> usize {
        self.state.lock().map(|state| state.flushes).unwrap_or(0)
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().map(|state| state.closed).unwrap_or(true)
    }

    fn with_open_state<T>(&self, operation: impl FnOnce(&mut MemoryState) -> T) -> Result<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| NeoShellCodecError::EndOfStream)?;

        if state.closed {
            Err(NeoShellCodecError::EndOfStream)
        } else {
            Ok(operation(&mut state))
        }
    }
}

impl Sink for MemorySink {
    fn write(&self, bytes: &[u8]) -> Result<()> {
        self.with_open_state(|state| state.buffer.extend_from_slice(bytes))
    }

    fn flush(&self) -> Result<()> {
        self.with_open_state(|state| state.flushes += 1)
    }

    fn reset(&self) -> Result<()> {
        self.with_open_state(|state| state.buffer.clear())
    }

    fn close(&self) -> Result<()> {
        if let Ok(mut state) = self.state.lock() {
            state.closed = true;
        }
        Ok(())
    }
}
