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

//! Implementation of the `explain` verb.

use clap::Parser;
use neoshell_codec::fields::strip_quote;

use crate::dispatcher::ActionContext;
use crate::error::Result;
use crate::verbs::parse_options;

/// Print the execution plan of a query.
#[derive(Parser, Debug)]
#[command(name = "explain", disable_version_flag = true)]
pub struct ExplainOptions {
    /// The query to explain.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    query: Vec<String>,
}

pub async fn run(context: &ActionContext<'_>, arguments: &str) -> Result<()> {
    let Some(options) = parse_options::<ExplainOptions>(context, "explain", arguments)? else {
        return Ok(());
    };

    let sql = strip_quote(&options.query.join(" "));
    let plan = context.database.explain(&sql).await?;

    context.console.println(&plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    use neoshell_codec::schema::{Column, ColumnType, Columns, Value};

    use crate::database::memory::MemoryDatabase;
    use crate::verbs::tests::TestEnvironment;

    #[tokio::test]
    async fn test_explain_prints_plan_lines() {
        let database = MemoryDatabase::new();
        database.add_result(
            "EXPLAIN select * from example",
            Columns::new(vec![Column::new("PLAN", ColumnType::String)]),
            vec![
                vec![Value::String("PROJECT".to_owned())],
                vec![Value::String(" FULL SCAN (EXAMPLE)".to_owned())],
            ],
        );

        let environment = TestEnvironment::new(database);
        run(&environment.context(), "select * from example")
            .await
            .unwrap();

        assert_eq!("PROJECT\n FULL SCAN (EXAMPLE)\n", environment.output());
    }
}
