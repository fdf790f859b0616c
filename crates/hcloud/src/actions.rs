//! Asynchronous actions returned by mutating requests.

use tracing::{debug, info};

use crate::client::Client;
use crate::error::ClientError;
use crate::models::{Action, ActionStatus};

/// Client for actions.
pub struct ActionsClient<'a> {
    client: &'a Client,
}

impl Client {
    /// Actions.
    #[must_use]
    pub fn actions(&self) -> ActionsClient<'_> {
        ActionsClient { client: self }
    }
}

impl ActionsClient<'_> {
    /// Get an action by ID.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_by_id(&self, id: i64) -> Result<Action, ClientError> {
        #[derive(serde::Deserialize)]
        struct ActionResponse {
            action: Action,
        }

        let response: ActionResponse = self.client.get(&format!("actions/{id}"), &[]).await?;
        Ok(response.action)
    }

    /// Poll an action until it is no longer running.
    ///
    /// # Errors
    /// Returns [`ClientError::ActionFailed`] if the action ends with an error,
    /// [`ClientError::ActionTimeout`] if it is still running after the
    /// configured number of polls.
    pub async fn wait_until_finished(&self, action: Action) -> Result<Action, ClientError> {
        let config = self.client.config();
        let mut action = action;
        let mut retries = 0;

        while action.status == ActionStatus::Running {
            if retries >= config.poll_max_retries {
                return Err(ClientError::ActionTimeout {
                    id: action.id,
                    retries,
                });
            }

            tokio::time::sleep(config.poll_interval.interval(retries)).await;
            retries += 1;

            action = self.get_by_id(action.id).await?;
            debug!(
                action_id = action.id,
                command = %action.command,
                progress = action.progress,
                "Polling action status"
            );
        }

        if action.status == ActionStatus::Error {
            let (code, message) = action
                .error
                .map(|e| (e.code, e.message))
                .unwrap_or_default();
            return Err(ClientError::ActionFailed {
                id: action.id,
                code,
                message,
            });
        }

        info!(action_id = action.id, command = %action.command, "Action finished");
        Ok(action)
    }
}
