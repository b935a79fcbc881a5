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

//! The query pipeline that pumps the rows of a [`Cursor`] into a [`RowEncoder`]. Interactive runs
//! pause after every page so the user can continue or quit, non-interactive runs flush the encoder
//! periodically so buffers stay bounded.

use neoshell_codec::encoder::RowEncoder;
use tracing::debug;

use crate::cancel::CancellationToken;
use crate::database::Cursor;
use crate::error::{NeoShellClientError, Result};

/// Number of rows between flushes when the output is not paged.
pub const NON_INTERACTIVE_FLUSH_ROWS: u64 = 1000;

/// What to do after a pager pause.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PagerAction {
    Continue,
    Quit,
}

/// Pauses the output between pages and asks the user how to proceed.
pub trait Pager: Send {
    /// Return the number of rows of the terminal.
    fn terminal_rows(&self) -> usize;

    /// Wait for the user to continue or quit.
    fn pause(&mut self) -> Result<PagerAction>;
}

/// Return the number of rows rendered between pauses, zero if the output should not be paged.
pub fn page_height(terminal_rows: usize, header_height: usize, heading: bool) -> usize {
    let header_height = if heading { header_height } else { 0 };
    terminal_rows.saturating_sub(1 + header_height)
}

/// Render every row of `cursor` with `encoder` and return the number of rows rendered. The cursor
/// is closed and the encoder is closed on every path. Returns [`NeoShellClientError::Cancelled`] if
/// the user quit the pager or `cancel` was cancelled, and [`NeoShellClientError`] if the cursor or
/// encoder fails.
pub async fn run_query(
    cursor: &mut dyn Cursor,
    encoder: &mut RowEncoder,
    pager: Option<&mut dyn Pager>,
    cancel: &CancellationToken,
) -> Result<u64> {
    let result = pump_rows(cursor, encoder, pager, cancel).await;

    let close_cursor_result = cursor.close().await;
    let close_encoder_result = encoder.close().map_err(NeoShellClientError::from);

    let rows = result?;
    close_cursor_result?;
    close_encoder_result?;

    Ok(rows)
}

async fn pump_rows(
    cursor: &mut dyn Cursor,
    encoder: &mut RowEncoder,
    mut pager: Option<&mut dyn Pager>,
    cancel: &CancellationToken,
) -> Result<u64> {
    encoder.open(cursor.columns())?;

    let page_height = pager.as_ref().map_or(0, |pager| {
        page_height(
            pager.terminal_rows(),
            encoder.format().header_height(),
            encoder.context().heading,
        )
    });
    let mut next_pause = page_height as u64;
    let mut rows = 0;

    loop {
        let maybe_row = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(NeoShellClientError::Cancelled),
            maybe_row = cursor.next() => maybe_row?,
        };

        let Some(row) = maybe_row else {
            break;
        };

        encoder.render_row(&row)?;
        rows += 1;

        match pager.as_deref_mut() {
            Some(pager) if page_height > 0 && rows == next_pause => {
                encoder.page_flush(true)?;
                match pager.pause()? {
                    PagerAction::Continue => next_pause += page_height as u64,
                    PagerAction::Quit => {
                        debug!(rows, "User quit the pager.");
                        return Err(NeoShellClientError::Cancelled);
                    }
                }
            }
            None if rows % NON_INTERACTIVE_FLUSH_ROWS == 0 => encoder.page_flush(false)?,
            _ => (),
        }
    }

    Ok(rows)
}
