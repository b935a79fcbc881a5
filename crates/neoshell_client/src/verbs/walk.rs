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


//! Implementation of the `walk` verb that shows the result of a query in a scrollable table on
//! the alternate screen of the terminal.

use std::iter;

use clap::Parser;
use neoshell_codec::context::RenderContext;
use neoshell_codec::fields::strip_quote;
use neoshell_codec::timeformat::TimeFormat;
use neoshell_codec::zone::Zone;

use crate::cancel::CancellationToken;
use crate::dispatcher::ActionContext;
use crate::error::{NeoShellClientError, Result};
use crate::tty::{self, AlternateScreen, Key, RawMode};
use crate::verbs::{parse_options, parse_time_format, parse_zone, switch};
use crate::walker::Walker;

const TITLE: &str = " ESC to quit, R to reload, arrows/j/k to scroll, g/G to jump ";

/// Execute a query and walk through its result.
#[derive(Parser, Debug)]
#[command(name = "walk", disable_version_flag = true)]
pub struct WalkOptions {
    /// Show the row number (default).
    #[arg(long, overrides_with = "no_rownum")]
    rownum: bool,
    #[arg(long, overrides_with = "rownum", hide = true)]
    no_rownum: bool,
    /// Number of digits after the decimal point of floats, -1 for all digits.
    #[arg(short, long, default_value_t = -1, allow_negative_numbers = true)]
    precision: i32,
    /// Time format [ns|us|ms|s|<layout>], see "help timeformat".
    #[arg(short = 't', long, value_parser = parse_time_format)]
    timeformat: Option<TimeFormat>,
    /// Time zone of datetime values, see "help tz".
    #[arg(long, value_parser = parse_zone)]
    tz: Option<Zone>,
    /// The query.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    query: Vec<String>,
}

pub async fn run(context: &ActionContext<'_>, arguments: &str) -> Result<()> {
    let Some(options) = parse_options::<WalkOptions>(context, "walk", arguments)? else {
        return Ok(());
    };

    if !context.console.is_interactive() {
        return Err(NeoShellClientError::InvalidArgument(
            "walk requires an interactive terminal.".to_owned(),
        ));
    }

    let settings = context.configuration_manager.values();
    let render_context = RenderContext::builder()
        .zone(options.tz.unwrap_or(settings.zone))
        .time_format(options.timeformat.unwrap_or(settings.time_format))
        .precision(options.precision)
        .rownum(switch(options.rownum, options.no_rownum, true))
        .build();

    let sql = strip_quote(&options.query.join(" "));
    let walker = Walker::try_new(context.database, &sql, render_context).await?;
    context.history.add(&sql);

    let result = browse(&walker, &context.cancel).await;
    walker.close().await?;

    result
}

/// Show the rows of `walker` until the user quits.
async fn browse(walker: &Walker<'_>, cancel: &CancellationToken) -> Result<()> {
    let (terminal_rows, terminal_columns) = tty::terminal_size();
    let mut view = WalkView::new(terminal_rows.saturating_sub(3).max(1));

    let screen = AlternateScreen::enter()?;
    let _raw_mode = RawMode::enter(true)?;

    while !cancel.is_cancelled() {
        let header = walker.header().await;
        let mut rows = Vec::with_capacity(view.height);
        for index in view.top..view.top + view.height {
            match walker.row(index).await {
                Some(row) => rows.push(row),
                None => break,
            }
        }

        let title = walker
            .fetch_error()
            .await
            .map_or_else(|| TITLE.to_owned(), |error| fetch_error_title(&error));
        screen.draw(&render_frame(&title, &header, &rows, view.left, terminal_columns))?;

        let Some(key) = tty::read_key()? else {
            continue;
        };

        match view.handle_key(key, walker.row_count().await) {
            ViewCommand::Redraw => (),
            ViewCommand::Reload => {
                walker.reload().await?;
                view.top = 1;
            }
            ViewCommand::End => {
                let row_count = walker.fetch_to_end().await;
                view.scroll_to_end(row_count);
            }
            ViewCommand::Quit => break,
        }
    }

    Ok(())
}

/// What the walk loop does after a key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ViewCommand {
    Redraw,
    Reload,
    End,
    Quit,
}

/// Scroll position of the table. Row 0 is the header so `top` starts at 1.
#[derive(Debug, PartialEq)]
struct WalkView {
    top: usize,
    left: usize,
    height: usize,
}

impl WalkView {
    fn new(height: usize) -> Self {
        Self {
            top: 1,
            left: 0,
            height,
        }
    }

    /// Apply `key` given `row_count` rows including the header.
    fn handle_key(&mut self, key: Key, row_count: usize) -> ViewCommand {
        let last_top = row_count.saturating_sub(1).max(1);

        match key {
            Key::Up | Key::Char('k') => self.top = self.top.saturating_sub(1).max(1),
            Key::Down | Key::Char('j') | Key::Enter => self.top = (self.top + 1).min(last_top),
            Key::PageUp => self.top = self.top.saturating_sub(self.height).max(1),
            Key::PageDown | Key::Char(' ') => {
                self.top = self.top.saturating_add(self.height).min(last_top)
            }
            Key::Home | Key::Char('g') => self.top = 1,
            Key::End | Key::Char('G') => return ViewCommand::End,
            Key::Left | Key::Char('h') => self.left = self.left.saturating_sub(1),
            Key::Right | Key::Char('l') => self.left += 1,
            Key::Char('r' | 'R') => return ViewCommand::Reload,
            Key::Esc | Key::CtrlC | Key::Char('q' | 'Q') => return ViewCommand::Quit,
            Key::Char(_) | Key::Unknown => (),
        }

        ViewCommand::Redraw
    }

    fn scroll_to_end(&mut self, row_count: usize) {
        self.top = row_count.saturating_sub(self.height).max(1);
    }
}

/// Return the title line shown when fetching rows failed.
fn fetch_error_title(error: &str) -> String {
    format!(" ERR {error} | the result is truncated, R to reload, ESC to quit ")
}

/// Return the lines of the screen with `title` first, the first column fixed, and the other
/// columns starting at `left`. Lines are cut at `width` characters.
fn render_frame(
    title: &str,
    header: &[String],
    rows: &[Vec<String>],
    left: usize,
    width: usize,
) -> Vec<String> {
    let column_count = header.len();
    let visible: Vec<usize> = (0..column_count)
        .filter(|index| *index == 0 || *index > left.min(column_count.saturating_sub(2)))
        .collect();

    let widths: Vec<usize> = visible
        .iter()
        .map(|index| {
            iter::once(header)
                .chain(rows.iter().map(Vec::as_slice))
                .filter_map(|row| row.get(*index))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_line = |cells: &[String]| -> String {
        let line = visible
            .iter()
            .zip(&widths)
            .map(|(index, width)| {
                let cell = cells.get(*index).map_or("", String::as_str);
                format!("{cell:<width$}")
            })
            .collect::<Vec<String>>()
            .join(" │ ");
        line.trim_end().chars().take(width).collect()
    };

    let mut lines = vec![title.chars().take(width).collect(), format_line(header)];
    lines.push("─".repeat(width.min(widths.iter().sum::<usize>() + 3 * widths.len())));
    lines.extend(rows.iter().map(|row| format_line(row)));

    lines
}
