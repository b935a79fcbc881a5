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


//! Implementation of the `chart` verb.

use std::time::Duration;

use clap::Parser;
use neoshell_codec::encoder::chart::{ChartEncoder, PageOptions};
use neoshell_codec::error::NeoShellCodecError;
use neoshell_codec::fields::strip_quote;
use neoshell_codec::sink::STDOUT;
use neoshell_codec::timeformat::TimeFormat;
use neoshell_codec::zone::Zone;
use tracing::debug;

use crate::chart::terminal::{self, TerminalChart};
use crate::chart::{ChartPlan, ChartTime, Scheduler, TagPath, parse_duration};
use crate::dispatcher::ActionContext;
use crate::error::{NeoShellClientError, Result};
use crate::verbs::{parse_options, parse_time_format, parse_zone, unquoted};

/// Output of a chart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartFormat {
    /// Line chart in the terminal.
    Terminal,
    Json,
    Html,
}

fn parse_chart_format(value: &str) -> std::result::Result<ChartFormat, NeoShellCodecError> {
    match strip_quote(value).to_lowercase().as_str() {
        "none" | "-" => Ok(ChartFormat::Terminal),
        "json" => Ok(ChartFormat::Json),
        "html" => Ok(ChartFormat::Html),
        _ => Err(NeoShellCodecError::InvalidArgument(format!(
            "unknown chart format '{value}', use one of none, json, html."
        ))),
    }
}

fn parse_duration_option(value: &str) -> std::result::Result<Duration, String> {
    parse_duration(&strip_quote(value)).map_err(|error| error.to_string())
}

/// Draw the values of tags as a line chart.
#[derive(Parser, Debug)]
#[command(name = "chart", disable_version_flag = true)]
pub struct ChartOptions {
    /// Time zone of --time and of the value labels, see "help tz".
    #[arg(long, value_parser = parse_zone)]
    tz: Option<Zone>,
    /// Time format of --time, see "help timeformat".
    #[arg(short = 't', long, value_parser = parse_time_format)]
    timeformat: Option<TimeFormat>,
    /// End of the time range, `now` follows the clock.
    #[arg(long, default_value = "now", value_parser = unquoted)]
    time: String,
    /// Length of the time range that ends at --time, e.g. 30s or 1m.
    #[arg(long, default_value = "1m", value_parser = parse_duration_option)]
    range: Duration,
    /// Refresh period if --time is now, 0 draws the chart once.
    #[arg(short, long, default_value = "0", value_parser = parse_duration_option)]
    refresh: Duration,
    /// Number of times the chart is drawn, 0 for no limit.
    #[arg(short = 'n', long, default_value_t = 0)]
    count: u64,
    /// Output file, `exec COMMAND` to pipe the output to a command, or `-` for standard output.
    #[arg(short, long, default_value = STDOUT, value_parser = unquoted)]
    output: String,
    /// Output format [none|json|html], none draws the chart in the terminal.
    #[arg(short, long, default_value = "none", value_parser = parse_chart_format)]
    format: ChartFormat,
    /// Title of html output.
    #[arg(long, alias = "html-title", default_value = "Chart", value_parser = unquoted)]
    title: String,
    /// Subtitle of html output.
    #[arg(long, alias = "html-subtitle", default_value = "", value_parser = unquoted)]
    subtitle: String,
    /// Width of the chart in html output.
    #[arg(long, alias = "html-width", default_value_t = 1600)]
    width: u32,
    /// Height of the chart in html output.
    #[arg(long, alias = "html-height", default_value_t = 900)]
    height: u32,
    /// Tag paths as <table>/<tag>[#<column>], the column defaults to value.
    #[arg(required = true, value_parser = unquoted)]
    tag_paths: Vec<String>,
}

pub async fn run(context: &ActionContext<'_>, arguments: &str) -> Result<()> {
    let Some(options) = parse_options::<ChartOptions>(context, "chart", arguments)? else {
        return Ok(());
    };

    let settings = context.configuration_manager.values();
    let zone = options.tz.unwrap_or(settings.zone);
    let time_format = options.timeformat.unwrap_or(settings.time_format);

    let paths = options
        .tag_paths
        .iter()
        .map(|path| path.parse())
        .collect::<Result<Vec<TagPath>>>()?;
    let time = ChartTime::parse(&options.time, &time_format, &zone)?;

    // Refreshing a chart with a fixed time would draw the same chart again.
    let refresh = (time == ChartTime::Now && !options.refresh.is_zero()).then_some(options.refresh);
    let count = (options.count > 0).then_some(options.count);

    let plan = ChartPlan {
        paths,
        time,
        range: options.range,
        zone,
    };

    match options.format {
        ChartFormat::Terminal => chart_terminal(context, &plan, refresh).await,
        ChartFormat::Json | ChartFormat::Html => {
            let sink = context.console.open_output(&options.output)?;
            let mut encoder = if options.format == ChartFormat::Json {
                ChartEncoder::json(sink)
            } else {
                ChartEncoder::html(
                    sink,
                    PageOptions {
                        title: options.title,
                        subtitle: options.subtitle,
                        width: options.width,
                        height: options.height,
                    },
                )
            };

            let mut scheduler = Scheduler::new(refresh, count);
            let result = async {
                while scheduler.next_run(&context.cancel).await {
                    let series = plan.run(context.database, &context.cancel).await?;
                    encoder.render(&series)?;
                }
                Ok::<(), NeoShellClientError>(())
            }
            .await;

            let close_result = encoder.close();
            debug!(runs = scheduler.runs(), "Chart finished.");

            result?;
            Ok(close_result?)
        }
    }
}

/// Draw the chart in the terminal until the user quits. The number of runs is not limited as the
/// chart ends when the user quits.
async fn chart_terminal(
    context: &ActionContext<'_>,
    plan: &ChartPlan,
    refresh: Option<Duration>,
) -> Result<()> {
    if !context.console.is_interactive() {
        return Err(NeoShellClientError::InvalidArgument(
            "the terminal chart requires an interactive terminal, use --format json or html."
                .to_owned(),
        ));
    }

    let chart = TerminalChart::enter()?;

    let cancel = context.cancel.clone();
    let listener = tokio::task::spawn_blocking(move || terminal::listen_for_quit(&cancel));

    let mut scheduler = Scheduler::new(refresh, None);
    let result = async {
        let mut last_series = vec![];
        while scheduler.next_run(&context.cancel).await {
            last_series = plan.run(context.database, &context.cancel).await?;
            chart.draw(&last_series)?;
        }

        // A single run stays on screen until the user quits.
        if !context.cancel.is_cancelled() {
            chart.draw(&last_series)?;
            context.cancel.cancelled().await;
        }
        Ok::<(), NeoShellClientError>(())
    }
    .await;

    context.cancel.cancel();
    let _ = listener.await;
    drop(chart);

    match result {
        Err(error) if error.is_cancelled() => Ok(()),
        result => result,
    }
}
