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


//! Implementation of the `shutdown` verb.

use crate::database::ManagementAction;
use crate::dispatcher::ActionContext;
use crate::error::{NeoShellClientError, Result};

pub async fn run(context: &ActionContext<'_>, _arguments: &str) -> Result<()> {
    if context.database.is_remote() {
        return Err(NeoShellClientError::InvalidArgument(
            "server shutdown is not allowed from a remote session.".to_owned(),
        ));
    }

    context.database.manage(&ManagementAction::Shutdown).await?;
    context.console.println("server shutting down...")
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::database::memory::MemoryDatabase;
    use crate::verbs::tests::TestEnvironment;

    #[tokio::test]
    async fn test_shutdown_local_server() {
        let environment = TestEnvironment::new(MemoryDatabase::new());
        run(&environment.context(), "").await.unwrap();

        assert_eq!("server shutting down...\n", environment.output());
        assert_eq!(
            vec![ManagementAction::Shutdown],
            environment.database.actions()
        );
    }

    #[tokio::test]
    async fn test_shutdown_refused_for_remote_server() {
        let environment = TestEnvironment::new(MemoryDatabase::new().with_remote(true));
        let error = run(&environment.context(), "").await.unwrap_err();

        assert!(error.to_string().contains("not allowed"));
        assert!(environment.database.actions().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_prints_failure_reason() {
        let database = MemoryDatabase::new();
        database.add_management_response(
            "Shutdown",
            serde_json::json!({"success": false, "reason": "permission denied"}),
        );

        let environment = TestEnvironment::new(database);
        let error = run(&environment.context(), "").await.unwrap_err();

        assert_eq!("permission denied", error.to_string());
        assert_eq!("", environment.output());
    }
}
