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

//! Series of chart values and the encoders that write them as a Chart.js compatible JSON model
//! or as a self-contained HTML page embedding that model.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::sink::Sink;

/// A named series of values with a time label for each value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
    pub labels: Vec<String>,
}

impl Series {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            values: vec![],
            labels: vec![],
        }
    }

    /// Append `value` with `label`, values and labels always have the same length.
    pub fn push(&mut self, value: f64, label: String) {
        self.values.push(value);
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Chart.js chart configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartModel {
    #[serde(rename = "type")]
    pub chart_type: String,
    pub data: ChartData,
    pub options: ChartOptions,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<Option<f64>>,
    #[serde(rename = "borderWidth")]
    pub border_width: u32,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartOptions {
    pub scales: Scales,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Scales {
    pub y: Axis,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    #[serde(rename = "beginAtZero")]
    pub begin_at_zero: bool,
}

impl ChartModel {
    /// Build a line chart of `series`. The labels of the x-axis are the labels of the longest
    /// series and non-finite values are left as gaps.
    pub fn line(series: &[Series]) -> Self {
        let labels = series
            .iter()
            .max_by_key(|series| series.len())
            .map(|series| series.labels.clone())
            .unwrap_or_default();

        let datasets = series
            .iter()
            .map(|series| Dataset {
                label: series.name.clone(),
                data: series
                    .values
                    .iter()
                    .map(|value| value.is_finite().then_some(*value))
                    .collect(),
                border_width: 1,
            })
            .collect();

        Self {
            chart_type: "line".to_owned(),
            data: ChartData { labels, datasets },
            options: ChartOptions {
                scales: Scales {
                    y: Axis {
                        begin_at_zero: false,
                    },
                },
            },
        }
    }
}

/// Title, subtitle, and size of an HTML chart page.
#[derive(Clone, Debug, PartialEq)]
pub struct PageOptions {
    pub title: String,
    pub subtitle: String,
    pub width: u32,
    pub height: u32,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            title: "Chart".to_owned(),
            subtitle: String::new(),
            width: 1600,
            height: 900,
        }
    }
}

/// Encoder that writes the series of each chart run as a complete document. Before every run
/// except the first, the sink is reset so a file always holds the latest chart.
pub enum ChartEncoder {
    Json { sink: Arc<dyn Sink>, runs: usize },
    Html {
        sink: Arc<dyn Sink>,
        options: PageOptions,
        runs: usize,
    },
}

impl ChartEncoder {
    pub fn json(sink: Arc<dyn Sink>) -> Self {
        Self::Json { sink, runs: 0 }
    }

    pub fn html(sink: Arc<dyn Sink>, options: PageOptions) -> Self {
        Self::Html {
            sink,
            options,
            runs: 0,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json { .. } => "application/json",
            Self::Html { .. } => "text/html",
        }
    }

    /// Write `series` as a new document.
    pub fn render(&mut self, series: &[Series]) -> Result<()> {
        let payload = serde_json::to_string(&ChartModel::line(series))?;

        let (sink, runs, document) = match self {
            Self::Json { sink, runs } => (sink, runs, payload + "\n"),
            Self::Html {
                sink,
                options,
                runs,
            } => {
                let document = render_page(options, &payload);
                (sink, runs, document)
            }
        };

        if *runs > 0 {
            sink.reset()?;
        }
        *runs += 1;

        sink.write(document.as_bytes())?;
        sink.flush()
    }

    pub fn close(&mut self) -> Result<()> {
        match self {
            Self::Json { sink, .. } | Self::Html { sink, .. } => sink.close(),
        }
    }
}

/// Materialize the HTML page template with the pre-serialized Chart.js `payload`.
fn render_page(options: &PageOptions, payload: &str) -> String {
    // A "</" in the payload would end the script element.
    let payload = payload.replace("</", "<\\/");

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="https://cdn.jsdelivr.net/npm/chart.js"></script>
</head>
<body>
<h2>{title}</h2>
<h4>{subtitle}</h4>
<div style="width:{width}px;height:{height}px">
<canvas id="chart"></canvas>
</div>
<script>
new Chart(document.getElementById("chart"), {payload});
</script>
</body>
</html>
"#,
        title = escape_html(&options.title),
        subtitle = escape_html(&options.subtitle),
        width = options.width,
        height = options.height,
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::sink::MemorySink;

    fn series() -> Vec<Series> {
        let mut cpu = Series::new("temp.cpu");
        cpu.push(1.5, "03:04:05".to_owned());
        cpu.push(f64::NAN, "03:04:06".to_owned());

        let mut raw = Series::new("temp.cpu-raw");
        raw.push(7.0, "03:04:05".to_owned());

        vec![cpu, raw]
    }

    #[test]
    fn test_line_model() {
        let model = ChartModel::line(&series());

        assert_eq!("line", model.chart_type);
        assert_eq!(vec!["03:04:05", "03:04:06"], model.data.labels);
        assert_eq!(vec![Some(1.5), None], model.data.datasets[0].data);
        assert_eq!("temp.cpu-raw", model.data.datasets[1].label);
        assert!(!model.options.scales.y.begin_at_zero);
    }

    #[test]
    fn test_json_model_field_names() {
        let json = serde_json::to_string(&ChartModel::line(&series())).unwrap();

        assert!(json.starts_with(r#"{"type":"line","data":{"labels":["03:04:05","03:04:06"]"#));
        assert!(json.contains(r#""borderWidth":1"#));
        assert!(json.ends_with(r#""options":{"scales":{"y":{"beginAtZero":false}}}}"#));
    }

    #[test]
    fn test_json_encoder_keeps_only_latest_run() {
        let sink = Arc::new(MemorySink::new());
        let mut encoder = ChartEncoder::json(sink.clone());

        encoder.render(&series()).unwrap();
        encoder.render(&series()[1..]).unwrap();
        encoder.close().unwrap();

        let model: ChartModel = serde_json::from_str(sink.contents().trim_end()).unwrap();
        assert_eq!(1, model.data.datasets.len());
        assert!(sink.is_closed());
    }

    #[test]
    fn test_html_page_embeds_payload_and_options() {
        let sink = Arc::new(MemorySink::new());
        let options = PageOptions {
            title: "CPU <load>".to_owned(),
            ..PageOptions::default()
        };
        let mut encoder = ChartEncoder::html(sink.clone(), options);

        encoder.render(&series()).unwrap();
        encoder.close().unwrap();

        let page = sink.contents();
        assert!(page.contains("<title>CPU &lt;load&gt;</title>"));
        assert!(page.contains("width:1600px;height:900px"));
        assert!(page.contains(r#"{"type":"line""#));
        assert_eq!("text/html", encoder.content_type());
    }
}
