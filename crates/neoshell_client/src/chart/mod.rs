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


//! The chart planner that turns tag paths into queries over a time range, and the scheduler that
//! repeats the queries every refresh period.

pub mod terminal;

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use neoshell_codec::encoder::chart::Series;
use neoshell_codec::schema::Value;
use neoshell_codec::timeformat::TimeFormat;
use neoshell_codec::zone::Zone;
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::debug;

use crate::cancel::CancellationToken;
use crate::database::Database;
use crate::error::{NeoShellClientError, Result};

/// Column charted if a tag path does not name one.
pub const DEFAULT_FIELD: &str = "VALUE";

/// Layout of the labels of the values.
const LABEL_FORMAT: &str = "%H:%M:%S";

/// A tag path of the form `<table>/<tag>[#<column>]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagPath {
    pub table: String,
    pub tag: String,
    pub field: String,
}

impl TagPath {
    /// Return the name of the series, the lowercase tag followed by the column if it is not the
    /// default column.
    pub fn label(&self) -> String {
        if self.field.eq_ignore_ascii_case(DEFAULT_FIELD) {
            self.tag.to_lowercase()
        } else {
            format!("{}-{}", self.tag, self.field).to_lowercase()
        }
    }

    /// Return the query for the values of the tag between two bound times.
    pub fn sql(&self) -> String {
        format!(
            "select TIME, {} from {} where NAME = ? AND TIME between ? AND ? order by TIME",
            self.field, self.table
        )
    }
}

impl FromStr for TagPath {
    type Err = NeoShellClientError;

    fn from_str(path: &str) -> Result<Self> {
        let (table, rest) = path.split_once('/').ok_or_else(|| {
            NeoShellClientError::InvalidArgument(format!("table name not found in '{path}'."))
        })?;

        let (tag, field) = rest.split_once('#').unwrap_or((rest, DEFAULT_FIELD));

        if table.is_empty() || tag.is_empty() || field.is_empty() {
            return Err(NeoShellClientError::InvalidArgument(format!(
                "'{path}' is not a tag path, use <table>/<tag>[#<column>]."
            )));
        }

        Ok(Self {
            table: table.to_uppercase(),
            tag: tag.to_owned(),
            field: field.to_owned(),
        })
    }
}

/// The end of the time range of a chart.
#[derive(Clone, Debug, PartialEq)]
pub enum ChartTime {
    /// The wall clock at the start of each run.
    Now,
    Fixed(DateTime<Utc>),
}

impl ChartTime {
    /// Parse `text` with `time_format` in `zone`, `now` and the empty string follow the clock.
    pub fn parse(text: &str, time_format: &TimeFormat, zone: &Zone) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() || text.eq_ignore_ascii_case("now") {
            Ok(Self::Now)
        } else {
            Ok(Self::Fixed(time_format.parse(text, zone)?))
        }
    }

    /// Return the range of `range` length that ends at this time.
    pub fn range(&self, range: Duration) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let end = match self {
            Self::Now => Utc::now(),
            Self::Fixed(time) => *time,
        };

        let range = chrono::Duration::from_std(range).map_err(|error| {
            NeoShellClientError::InvalidArgument(format!("range is too long: {error}"))
        })?;

        Ok((end - range, end))
    }
}

/// The queries of a chart and the range they cover.
#[derive(Clone, Debug)]
pub struct ChartPlan {
    pub paths: Vec<TagPath>,
    pub time: ChartTime,
    pub range: Duration,
    /// Zone of the value labels.
    pub zone: Zone,
}

impl ChartPlan {
    /// Query the values of every tag path and return a series for each of them.
    pub async fn run(
        &self,
        database: &dyn Database,
        cancel: &CancellationToken,
    ) -> Result<Vec<Series>> {
        let (from, to) = self.time.range(self.range)?;
        let mut all_series = Vec::with_capacity(self.paths.len());

        for path in &self.paths {
            let params = [
                Value::String(path.tag.clone()),
                Value::DateTime(from),
                Value::DateTime(to),
            ];
            let mut cursor = database.query(&path.sql(), &params).await?;
            let mut series = Series::new(&path.label());

            let result = loop {
                if cancel.is_cancelled() {
                    break Err(NeoShellClientError::Cancelled);
                }

                match cursor.next().await {
                    Ok(Some(row)) => {
                        if let (Some(Value::DateTime(time)), Some(value)) =
                            (row.first(), row.get(1).and_then(Value::as_f64))
                        {
                            let label = self.zone.localize(time).0.format(LABEL_FORMAT);
                            series.push(value, label.to_string());
                        }
                    }
                    Ok(None) => break Ok(()),
                    Err(error) => break Err(error),
                }
            };

            cursor.close().await?;
            result?;

            debug!(tag = path.tag, values = series.len(), "Chart series queried.");
            all_series.push(series);
        }

        Ok(all_series)
    }
}

/// Decides when the chart runs. The first run starts immediately, the following runs start every
/// refresh period until the count is reached or the token is cancelled.
pub struct Scheduler {
    interval: Option<Interval>,
    count: Option<u64>,
    runs: u64,
}

impl Scheduler {
    /// Create a scheduler that runs once if `refresh` is [`None`] and at most `count` times if it
    /// is set.
    pub fn new(refresh: Option<Duration>, count: Option<u64>) -> Self {
        let interval = refresh.filter(|refresh| !refresh.is_zero()).map(|refresh| {
            let mut interval = time::interval(refresh);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        Self {
            interval,
            count,
            runs: 0,
        }
    }

    /// Wait for the next run. Returns [`false`] if there are no more runs.
    pub async fn next_run(&mut self, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() || self.count.is_some_and(|count| self.runs >= count) {
            return false;
        }

        match self.interval.as_mut() {
            None if self.runs > 0 => return false,
            None => (),
            Some(interval) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return false,
                    _ = interval.tick() => (),
                }
            }
        }

        self.runs += 1;
        true
    }

    pub fn runs(&self) -> u64 {
        self.runs
    }
}

/// Parse a duration such as `500ms`, `3s`, `1m`, or `1h30m`. A bare `0` is zero.
pub fn parse_duration(text: &str) -> Result<Duration> {
    let text = text.trim();
    let invalid = || {
        NeoShellClientError::InvalidArgument(format!(
            "invalid duration '{text}', use a number followed by ns, us, ms, s, m, or h."
        ))
    };

    if text == "0" {
        return Ok(Duration::ZERO);
    }
    if text.is_empty() {
        return Err(invalid());
    }

    let mut total = Duration::ZERO;
    let mut rest = text;

    while !rest.is_empty() {
        let number_length = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        let number: f64 = rest[..number_length].parse().map_err(|_| invalid())?;
        rest = &rest[number_length..];

        let unit_length = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let seconds_per_unit = match &rest[..unit_length] {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_length..];

        total += Duration::try_from_secs_f64(number * seconds_per_unit).map_err(|_| invalid())?;
    }

    Ok(total)
}
