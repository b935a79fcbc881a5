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


//! Line chart drawn with text on the alternate screen of the terminal.

use neoshell_codec::encoder::chart::Series;

use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::tty::{self, AlternateScreen, Key, RawMode};

const TITLE: &str = " ESC to quit ";

/// Markers of the series, reused if there are more series than markers.
const MARKERS: [char; 6] = ['•', '+', '*', 'o', 'x', '#'];

/// Lines that are not part of the plot area: title, x-axis, x-labels, and legend.
const DECORATION_LINES: usize = 4;

/// Chart on the alternate screen. The terminal is restored when it is dropped.
pub struct TerminalChart {
    screen: AlternateScreen,
    _raw_mode: RawMode,
}

impl TerminalChart {
    pub fn enter() -> Result<Self> {
        let screen = AlternateScreen::enter()?;
        // Reads time out so the key listener can notice when the chart is done.
        let raw_mode = RawMode::enter(false)?;

        Ok(Self {
            screen,
            _raw_mode: raw_mode,
        })
    }

    /// Draw `series` over the whole terminal.
    pub fn draw(&self, series: &[Series]) -> Result<()> {
        let (rows, columns) = tty::terminal_size();
        self.screen.draw(&render_chart(series, columns, rows))
    }
}

/// Read keys until a quit key is pressed or `cancel` is cancelled. Quitting cancels `cancel` so
/// the scheduler stops. Blocks the calling thread.
pub fn listen_for_quit(cancel: &CancellationToken) {
    while !cancel.is_cancelled() {
        match tty::read_key() {
            Ok(Some(Key::Esc | Key::CtrlC | Key::Char('q' | 'Q'))) | Err(_) => {
                cancel.cancel();
            }
            Ok(_) => (),
        }
    }
}

/// Return the lines of a chart of `series` that fits in `width` columns and `height` rows.
pub fn render_chart(series: &[Series], width: usize, height: usize) -> Vec<String> {
    let mut lines = vec![TITLE.to_owned()];

    let values = series.iter().flat_map(|series| series.values.iter());
    let (min, max) = values
        .filter(|value| value.is_finite())
        .fold(None, |range: Option<(f64, f64)>, value| match range {
            None => Some((*value, *value)),
            Some((min, max)) => Some((min.min(*value), max.max(*value))),
        })
        .map_or((0.0, 1.0), |(min, max)| {
            if min == max { (min - 1.0, max + 1.0) } else { (min, max) }
        });

    let max_label = format_axis_value(max);
    let min_label = format_axis_value(min);
    let label_width = max_label.chars().count().max(min_label.chars().count());

    let plot_width = width.saturating_sub(label_width + 2).max(1);
    let plot_height = height.saturating_sub(DECORATION_LINES).max(2);

    let mut grid = vec![vec![' '; plot_width]; plot_height];
    for (index, series) in series.iter().enumerate() {
        let marker = MARKERS[index % MARKERS.len()];
        let count = series.values.len();

        for (position, value) in series.values.iter().enumerate() {
            if !value.is_finite() {
                continue;
            }

            let x = if count > 1 {
                position * (plot_width - 1) / (count - 1)
            } else {
                0
            };
            let scaled = (value - min) / (max - min) * (plot_height - 1) as f64;
            let y = plot_height - 1 - (scaled.round() as usize).min(plot_height - 1);
            grid[y][x] = marker;
        }
    }

    for (row, cells) in grid.iter().enumerate() {
        let label = if row == 0 {
            max_label.as_str()
        } else if row == plot_height - 1 {
            min_label.as_str()
        } else {
            ""
        };
        let cells: String = cells.iter().collect();
        lines.push(format!("{label:>label_width$} │{}", cells.trim_end()));
    }

    lines.push(format!("{:label_width$} └{}", "", "─".repeat(plot_width)));
    lines.push(x_labels(series, label_width + 2, plot_width));
    lines.push(legend(series));

    lines
}

fn format_axis_value(value: f64) -> String {
    let text = format!("{value:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_owned()
}

/// Return the first and last label of the longest series under the ends of the x-axis.
fn x_labels(series: &[Series], indent: usize, plot_width: usize) -> String {
    let Some(longest) = series.iter().max_by_key(|series| series.labels.len()) else {
        return String::new();
    };

    let first = longest.labels.first().map_or("", String::as_str);
    let last = longest.labels.last().map_or("", String::as_str);

    if longest.labels.len() < 2 {
        return format!("{:indent$}{first}", "");
    }

    let gap = plot_width.saturating_sub(first.chars().count());
    format!("{:indent$}{first}{last:>gap$}", "")
}

fn legend(series: &[Series]) -> String {
    series
        .iter()
        .enumerate()
        .map(|(index, series)| format!("{} {}", MARKERS[index % MARKERS.len()], series.name))
        .collect::<Vec<String>>()
        .join("   ")
}
