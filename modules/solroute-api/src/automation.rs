use async_trait::async_trait;
use pump_client::{PumpClient, PumpError, PumpOptions};

use crate::error::AutomationError;
use crate::traits::{Automation, AutomationSession};

/// Wrapper to make `PumpClient` implement the `Automation` seam.
/// Each `authenticate` builds a brand new client: new cookie jar, new wallet.
pub struct PumpAutomation {
    options: PumpOptions,
}

impl PumpAutomation {
    pub fn new(options: PumpOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Automation for PumpAutomation {
    async fn authenticate(&self) -> Result<Box<dyn AutomationSession>, AutomationError> {
        let mut client = PumpClient::new(self.options.clone())
            .map_err(|e| AutomationError::Auth(e.to_string()))?;
        client
            .start()
            .await
            .map_err(|e| AutomationError::Auth(e.to_string()))?;

        tracing::debug!(address = %client.address(), "Platform session started");
        Ok(Box::new(PumpSession { client }))
    }
}

struct PumpSession {
    client: PumpClient,
}

#[async_trait]
impl AutomationSession for PumpSession {
    async fn post_comment(
        &mut self,
        target: &str,
        text: &str,
        attachment: Option<&str>,
    ) -> Result<(), AutomationError> {
        self.client
            .post_comment(target, text, attachment)
            .await
            .map_err(into_automation_error)
    }

    async fn like(&mut self, message_id: &str) -> Result<(), AutomationError> {
        self.client
            .like_message(message_id)
            .await
            .map_err(into_automation_error)
    }
}

fn into_automation_error(err: PumpError) -> AutomationError {
    match err {
        PumpError::AuthRequired => AutomationError::AuthRequired,
        other => AutomationError::Submission(other.to_string()),
    }
}
