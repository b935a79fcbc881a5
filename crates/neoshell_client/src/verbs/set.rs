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


//! Implementation of the `set` verb.

use neoshell_codec::fields::split_fields;

use crate::dispatcher::ActionContext;
use crate::error::{NeoShellClientError, Result};
use crate::verbs::print_box;

const USAGE: &str = "usage: set [<key> <value>], run set without arguments to list the settings";

pub fn run(context: &ActionContext<'_>, arguments: &str) -> Result<()> {
    let fields = split_fields(arguments, true);

    match fields.as_slice() {
        [] => {
            let rows = context
                .configuration_manager
                .describe()
                .into_iter()
                .map(|(name, value, description)| vec![name, value, description])
                .collect();

            print_box(context, &["NAME", "VALUE", "DESCRIPTION"], rows)
        }
        [key, value] => context.configuration_manager.set(key, value),
        _ => Err(NeoShellClientError::InvalidArgument(USAGE.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use neoshell_codec::context::BoxStyle;

    use crate::database::memory::MemoryDatabase;
    use crate::verbs::tests::TestEnvironment;

    #[test]
    fn test_set_without_arguments_lists_settings() {
        let environment = TestEnvironment::new(MemoryDatabase::new());
        run(&environment.context(), "").unwrap();

        let output = environment.output();
        assert!(output.contains("DESCRIPTION"));
        assert!(output.contains("BOX-STYLE"));
        assert!(output.contains("light"));
    }

    #[test]
    fn test_set_changes_setting() {
        let environment = TestEnvironment::new(MemoryDatabase::new());
        run(&environment.context(), "box-style \"round\"").unwrap();

        assert_eq!(
            BoxStyle::Round,
            environment.configuration_manager.values().box_style
        );
        assert_eq!("", environment.output());
    }

    #[test]
    fn test_set_unknown_key_or_missing_value() {
        let environment = TestEnvironment::new(MemoryDatabase::new());

        let error = run(&environment.context(), "color on").unwrap_err();
        assert!(error.to_string().contains("color"));
        assert!(run(&environment.context(), "vi-mode").is_err());
    }
}
