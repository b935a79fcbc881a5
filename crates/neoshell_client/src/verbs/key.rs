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


//! Implementation of the `key` verb that manages the keys clients authenticate with.

use chrono::{DateTime, Duration, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use serde::Deserialize;

use crate::database::ManagementAction;
use crate::dispatcher::ActionContext;
use crate::error::{NeoShellClientError, Result};
use crate::verbs::{parse_options, print_box, unquoted};

/// How long a generated key is valid.
const KEY_VALIDITY_DAYS: i64 = 10 * 365;

/// Manage client keys.
#[derive(Parser, Debug)]
#[command(name = "key", disable_version_flag = true)]
pub struct KeyOptions {
    #[command(subcommand)]
    command: Option<KeyCommand>,
}

#[derive(Subcommand, Debug)]
enum KeyCommand {
    /// List registered keys.
    List,
    /// Generate a new key with the given id.
    Gen {
        #[arg(value_parser = unquoted)]
        id: String,
    },
    /// Delete the key with the given id.
    Del {
        #[arg(value_parser = unquoted)]
        id: String,
    },
}

/// Response of the `ListKeys` action.
#[derive(Deserialize, Debug, Default)]
struct KeyList {
    #[serde(default)]
    keys: Vec<RegisteredKey>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RegisteredKey {
    id: String,
    #[serde(default)]
    not_before: i64,
    #[serde(default)]
    not_after: i64,
}

/// Response of the `GenKey` action.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct GeneratedKey {
    certificate: String,
    key: String,
    token: String,
}

pub async fn run(context: &ActionContext<'_>, arguments: &str) -> Result<()> {
    let Some(options) = parse_options::<KeyOptions>(context, "key", arguments)? else {
        return Ok(());
    };

    match options.command {
        Some(KeyCommand::List) => list_keys(context).await,
        Some(KeyCommand::Gen { id }) => generate_key(context, &id).await,
        Some(KeyCommand::Del { id }) => {
            let action = ManagementAction::DelKey { id };
            context.database.manage(&action).await?;
            context.console.println("deleted")
        }
        None => {
            let help = KeyOptions::command().render_help().to_string();
            context.console.println(help.trim_end())
        }
    }
}

async fn list_keys(context: &ActionContext<'_>) -> Result<()> {
    let response = context.database.manage(&ManagementAction::ListKeys).await?;
    let key_list: KeyList = serde_json::from_value(response)?;

    let rows = key_list
        .keys
        .into_iter()
        .enumerate()
        .map(|(index, key)| {
            vec![
                (index + 1).to_string(),
                key.id,
                format_timestamp(key.not_before),
                format_timestamp(key.not_after),
            ]
        })
        .collect();

    print_box(context, &["ROWNUM", "ID", "VALID FROM", "EXPIRE"], rows)
}

async fn generate_key(context: &ActionContext<'_>, id: &str) -> Result<()> {
    let id = id.to_lowercase();
    if !is_valid_key_id(&id) {
        return Err(NeoShellClientError::InvalidArgument(
            "id contains invalid letter, use only alphanumerics and _.@-".to_owned(),
        ));
    }

    let now = Utc::now();
    let action = ManagementAction::GenKey {
        id,
        not_before: now.timestamp(),
        not_after: (now + Duration::days(KEY_VALIDITY_DAYS)).timestamp(),
    };

    let response = context.database.manage(&action).await?;
    let generated_key: GeneratedKey = serde_json::from_value(response)?;

    let console = context.console;
    console.println(&generated_key.certificate)?;
    console.println(&generated_key.key)?;
    console.println("-----BEGIN TOKEN-----")?;
    console.println(&generated_key.token)?;
    console.println("-----END TOKEN-----")?;
    console.println("\nCaution:\n  This is the last chance to copy and store PRIVATE KEY and TOKEN.")?;
    console.println("  It can not be redone.")
}

/// Return [`true`] if `id` starts with a lowercase letter followed by at least one lowercase
/// letter, digit, or one of `_.@-`.
fn is_valid_key_id(id: &str) -> bool {
    let mut chars = id.chars();

    let starts_with_letter = chars.next().is_some_and(|first| first.is_ascii_lowercase());
    let rest: Vec<char> = chars.collect();

    starts_with_letter
        && !rest.is_empty()
        && rest.iter().all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '@' | '-')
        })
}

/// Return the seconds since the Unix epoch in `seconds` as a UTC timestamp.
fn format_timestamp(seconds: i64) -> String {
    DateTime::<Utc>::from_timestamp(seconds, 0)
        .map(|time| time.to_string())
        .unwrap_or_default()
}
