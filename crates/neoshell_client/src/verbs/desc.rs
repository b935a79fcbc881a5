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


//! Implementation of the `desc` verb.

use clap::Parser;

use crate::dispatcher::ActionContext;
use crate::error::Result;
use crate::verbs::{parse_options, print_box, unquoted};

/// Describe the columns of a table.
#[derive(Parser, Debug)]
#[command(name = "desc", disable_version_flag = true)]
pub struct DescOptions {
    /// Include hidden columns.
    #[arg(short, long)]
    all: bool,
    /// The table to describe.
    #[arg(value_parser = unquoted)]
    table: String,
}

pub async fn run(context: &ActionContext<'_>, arguments: &str) -> Result<()> {
    let Some(options) = parse_options::<DescOptions>(context, "desc", arguments)? else {
        return Ok(());
    };

    let description = context.database.describe(&options.table, options.all).await?;

    context.console.println(&format!(
        "{} ({})",
        description.name,
        description.type_description()
    ))?;

    let rows = description
        .columns
        .iter()
        .map(|column| {
            vec![
                column.name.clone(),
                column.type_name().to_owned(),
                column.length.to_string(),
            ]
        })
        .collect();

    print_box(context, &["NAME", "TYPE", "LENGTH"], rows)
}
