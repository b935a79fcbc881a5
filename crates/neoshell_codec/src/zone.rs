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

//! Time zones accepted by `--tz`: `Local`, `UTC`, or an IANA zone name.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{NeoShellCodecError, Result};

/// The zone datetime cells are rendered in and custom layouts are parsed in.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Zone {
    #[default]
    Local,
    Utc,
    Named(Tz),
}

impl Zone {
    /// Convert the instant `time` to the wall clock of the zone. Returns the local time with its
    /// offset and the abbreviation of the zone at that instant.
    pub fn localize(&self, time: &DateTime<Utc>) -> (DateTime<FixedOffset>, String) {
        match self {
            Self::Local => {
                let local = time.with_timezone(&Local);
                (local.fixed_offset(), local.format("%Z").to_string())
            }
            Self::Utc => (time.fixed_offset(), "UTC".to_owned()),
            Self::Named(tz) => {
                let named = time.with_timezone(tz);
                (named.fixed_offset(), named.format("%Z").to_string())
            }
        }
    }

    /// Interpret the wall clock time `naive` in the zone. For ambiguous local times the earliest
    /// instant is returned and [`None`] is returned for local times skipped by a transition.
    pub fn from_local(&self, naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            Self::Local => Local
                .from_local_datetime(naive)
                .earliest()
                .map(|time| time.with_timezone(&Utc)),
            Self::Utc => Some(Utc.from_utc_datetime(naive)),
            Self::Named(tz) => tz
                .from_local_datetime(naive)
                .earliest()
                .map(|time| time.with_timezone(&Utc)),
        }
    }
}

impl Display for Zone {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Local => f.write_str("Local"),
            Self::Utc => f.write_str("UTC"),
            Self::Named(tz) => f.write_str(tz.name()),
        }
    }
}

impl FromStr for Zone {
    type Err = NeoShellCodecError;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "local" | "" => Ok(Self::Local),
            "utc" | "gmt" => Ok(Self::Utc),
            _ => name.parse::<Tz>().map(Self::Named).map_err(|error| {
                NeoShellCodecError::InvalidArgument(format!("unknown time zone '{name}': {error}"))
            }),
        }
    }
}
