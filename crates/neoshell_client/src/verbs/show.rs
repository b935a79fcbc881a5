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


//! Implementation of the `show` verb.

use clap::{CommandFactory, Parser, Subcommand};

use crate::database::catalog::TableKind;
use crate::dispatcher::ActionContext;
use crate::error::Result;
use crate::verbs::{parse_options, print_box};

/// Display information about the server and its tables.
#[derive(Parser, Debug)]
#[command(name = "show", disable_version_flag = true)]
pub struct ShowOptions {
    #[command(subcommand)]
    command: Option<ShowCommand>,
}

#[derive(Subcommand, Debug)]
enum ShowCommand {
    /// Show server information.
    Info,
    /// List tables.
    Tables {
        /// Include hidden tables.
        #[arg(short, long)]
        all: bool,
    },
    /// List meta tables.
    MetaTables {
        /// Include hidden tables.
        #[arg(short, long)]
        all: bool,
    },
    /// List virtual tables.
    VirtualTables {
        /// Include hidden tables.
        #[arg(short, long)]
        all: bool,
    },
}

pub async fn run(context: &ActionContext<'_>, arguments: &str) -> Result<()> {
    let Some(options) = parse_options::<ShowOptions>(context, "show", arguments)? else {
        return Ok(());
    };

    match options.command {
        Some(ShowCommand::Info) => show_info(context).await,
        Some(ShowCommand::Tables { all }) => show_tables(context, TableKind::Tables, all).await,
        Some(ShowCommand::MetaTables { all }) => {
            show_tables(context, TableKind::MetaTables, all).await
        }
        Some(ShowCommand::VirtualTables { all }) => {
            show_tables(context, TableKind::VirtualTables, all).await
        }
        None => {
            let help = ShowOptions::command().render_help().to_string();
            context.console.println(help.trim_end())
        }
    }
}

async fn show_info(context: &ActionContext<'_>) -> Result<()> {
    let rows = context
        .database
        .server_info()
        .await?
        .into_iter()
        .map(|(name, value)| vec![name, value])
        .collect();

    print_box(context, &["NAME", "VALUE"], rows)
}

async fn show_tables(
    context: &ActionContext<'_>,
    kind: TableKind,
    include_hidden: bool,
) -> Result<()> {
    let tables = context.database.list_tables(kind, include_hidden).await?;

    let rows = tables
        .into_iter()
        .enumerate()
        .map(|(index, table)| {
            vec![
                (index + 1).to_string(),
                table.id.to_string(),
                table.name,
                table.description,
            ]
        })
        .collect();

    print_box(context, &["#", "ID", "NAME", "TYPE"], rows)
}
