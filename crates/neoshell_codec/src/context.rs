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

//! The render context that parameterizes encoders and decoders.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::{NeoShellCodecError, Result};
use crate::timeformat::TimeFormat;
use crate::zone::Zone;

/// Line style of the box encoder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BoxStyle {
    Simple,
    Bold,
    Double,
    #[default]
    Light,
    Round,
}

impl BoxStyle {
    pub const NAMES: [&'static str; 5] = ["simple", "bold", "double", "light", "round"];

    /// Return the comfy-table preset of the style. Rows are never separated by lines.
    pub(crate) fn preset(&self) -> &'static str {
        match self {
            Self::Simple => "||--+-++|    ++++++",
            Self::Bold => "┃┃━━┣━╋┫┃    ┳┻┏┓┗┛",
            Self::Double => "║║══╠═╬╣║    ╦╩╔╗╚╝",
            Self::Light => "││──├─┼┤│    ┬┴┌┐└┘",
            Self::Round => "││──├─┼┤│    ┬┴╭╮╰╯",
        }
    }

    /// Return the comfy-table preset of the style without outer border and column separators.
    pub(crate) fn borderless_preset(&self) -> String {
        let header_line = self.preset().chars().nth(5).unwrap_or('-');
        format!("     {header_line}{}", " ".repeat(13))
    }
}

impl Display for BoxStyle {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let name = match self {
            Self::Simple => "simple",
            Self::Bold => "bold",
            Self::Double => "double",
            Self::Light => "light",
            Self::Round => "round",
        };
        f.write_str(name)
    }
}

impl FromStr for BoxStyle {
    type Err = NeoShellCodecError;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "bold" => Ok(Self::Bold),
            "double" => Ok(Self::Double),
            "light" => Ok(Self::Light),
            "round" => Ok(Self::Round),
            _ => Err(NeoShellCodecError::InvalidArgument(format!(
                "unknown box style '{name}', use one of {}.",
                Self::NAMES.join(", ")
            ))),
        }
    }
}

/// Options shared by every encoder and decoder of a row stream. The context is fixed between
/// opening and closing an encoder.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderContext {
    /// Zone datetime cells are rendered in and custom layouts are parsed in.
    pub zone: Zone,
    /// Integer epoch unit or layout of datetime cells.
    pub time_format: TimeFormat,
    /// Number of digits after the decimal point of floats, -1 for the shortest exact form.
    pub precision: i32,
    /// Prefix each row with its row number.
    pub rownum: bool,
    /// Emit a header row.
    pub heading: bool,
    /// Field delimiter of CSV.
    pub delimiter: char,
    /// Line style of box output.
    pub box_style: BoxStyle,
    /// Output goes to a terminal, box output is drawn with an outer border if set.
    pub interactive: bool,
}

impl RenderContext {
    /// Return a builder that starts from the default context.
    pub fn builder() -> RenderContextBuilder {
        RenderContextBuilder {
            context: Self::default(),
        }
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            zone: Zone::Local,
            time_format: TimeFormat::default(),
            precision: -1,
            rownum: false,
            heading: true,
            delimiter: ',',
            box_style: BoxStyle::Light,
            interactive: false,
        }
    }
}

/// Builder for [`RenderContext`] used by the verbs to apply their options.
pub struct RenderContextBuilder {
    context: RenderContext,
}

impl RenderContextBuilder {
    pub fn zone(mut self, zone: Zone) -> Self {
        self.context.zone = zone;
        self
    }

    pub fn time_format(mut self, time_format: TimeFormat) -> Self {
        self.context.time_format = time_format;
        self
    }

    pub fn precision(mut self, precision: i32) -> Self {
        self.context.precision = precision;
        self
    }

    pub fn rownum(mut self, rownum: bool) -> Self {
        self.context.rownum = rownum;
        self
    }

    pub fn heading(mut self, heading: bool) -> Self {
        self.context.heading = heading;
        self
    }

    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.context.delimiter = delimiter;
        self
    }

    pub fn box_style(mut self, box_style: BoxStyle) -> Self {
        self.context.box_style = box_style;
        self
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.context.interactive = interactive;
        self
    }

    pub fn build(self) -> RenderContext {
        self.context
    }
}

/// Parse a delimiter given on the command line. `\t` and `tab` are accepted for tabs.
pub fn parse_delimiter(text: &str) -> Result<char> {
    if text == "\\t" || text.eq_ignore_ascii_case("tab") {
        return Ok('\t');
    }

    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(delimiter), None) if delimiter.is_ascii() => Ok(delimiter),
        _ => Err(NeoShellCodecError::InvalidArgument(format!(
            "delimiter must be a single ASCII character, not '{text}'."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_have_all_components() {
        for name in BoxStyle::NAMES {
            let style: BoxStyle = name.parse().unwrap();
            assert_eq!(19, style.preset().chars().count());
            assert_eq!(19, style.borderless_preset().chars().count());
        }
    }

    #[test]
    fn test_unknown_box_style() {
        assert!("dotted".parse::<BoxStyle>().is_err());
    }

    #[test]
    fn test_builder_overrides_defaults() {
        let context = RenderContext::builder()
            .zone(Zone::Utc)
            .precision(3)
            .rownum(true)
            .build();

        assert_eq!(Zone::Utc, context.zone);
        assert_eq!(3, context.precision);
        assert!(context.rownum);
        assert!(context.heading);
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!('\t', parse_delimiter("\\t").unwrap());
        assert_eq!('|', parse_delimiter("|").unwrap());
        assert!(parse_delimiter("||").is_err());
    }
}
