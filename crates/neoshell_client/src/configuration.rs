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

//! Management of the runtime settings of the shell. The settings are initialized from the command
//! line arguments, changed with the `set` verb, and used as the defaults of the verb options.

use std::sync::{PoisonError, RwLock};

use neoshell_codec::context::BoxStyle;
use neoshell_codec::timeformat::TimeFormat;
use neoshell_codec::zone::Zone;

use crate::error::{NeoShellClientError, Result};

/// Name and description of each setting in the order they are shown by `set`.
pub const SETTINGS: [(&str, &str); 5] = [
    ("vi-mode", "use vi editing mode (on|off)"),
    ("box-style", "box style of tables (simple|bold|double|light|round)"),
    ("tz", "default time zone (Local|UTC|<IANA name>)"),
    ("timeformat", "default time format (ns|us|ms|s|<layout>)"),
    ("heading", "print the heading of results (on|off)"),
];

/// Values of the settings at a point in time.
#[derive(Clone, Debug, PartialEq)]
pub struct SettingValues {
    pub vi_mode: bool,
    pub box_style: BoxStyle,
    pub zone: Zone,
    pub time_format: TimeFormat,
    pub heading: bool,
}

impl Default for SettingValues {
    fn default() -> Self {
        Self {
            vi_mode: false,
            box_style: BoxStyle::Light,
            zone: Zone::Local,
            time_format: TimeFormat::default(),
            heading: true,
        }
    }
}

/// Manages the settings and provides functionality for updating them from `set key value`.
#[derive(Debug, Default)]
pub struct ConfigurationManager {
    values: RwLock<SettingValues>,
}

impl ConfigurationManager {
    pub fn new(values: SettingValues) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }

    /// Return a copy of the current settings.
    pub fn values(&self) -> SettingValues {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Set the setting named `key` to `value`. Returns [`NeoShellClientError`] if `key` is not a
    /// setting or `value` is not valid for it.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);

        match key.to_lowercase().as_str() {
            "vi-mode" => values.vi_mode = parse_switch(key, value)?,
            "box-style" => values.box_style = value.parse()?,
            "tz" => values.zone = value.parse()?,
            "timeformat" => values.time_format = value.parse()?,
            "heading" => values.heading = parse_switch(key, value)?,
            _ => {
                return Err(NeoShellClientError::InvalidArgument(format!(
                    "unknown setting '{key}'."
                )));
            }
        }

        tracing::debug!(key, value, "Setting changed.");
        Ok(())
    }

    /// Return the name, current value, and description of every setting.
    pub fn describe(&self) -> Vec<(String, String, String)> {
        let values = self.values();

        SETTINGS
            .iter()
            .map(|(name, description)| {
                let value = match *name {
                    "vi-mode" => switch_name(values.vi_mode).to_owned(),
                    "box-style" => values.box_style.to_string(),
                    "tz" => values.zone.to_string(),
                    "timeformat" => values.time_format.to_string(),
                    _ => switch_name(values.heading).to_owned(),
                };
                (name.to_uppercase(), value, (*description).to_owned())
            })
            .collect()
    }
}

fn parse_switch(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => Err(NeoShellClientError::InvalidArgument(format!(
            "{key} must be on or off, not '{value}'."
        ))),
    }
}

fn switch_name(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}
