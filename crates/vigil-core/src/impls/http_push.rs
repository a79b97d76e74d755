//! Push sender posting to an HTTP push gateway.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::PushError;
use crate::ports::{PushNote, PushSender};

/// [`PushSender`] that POSTs each note as JSON to a gateway endpoint.
///
/// The note's `key` rides along in the body so the gateway can collapse a
/// re-submission for the same subject. Delivery is the gateway's problem;
/// this adapter only reports whether the submission was accepted.
pub struct HttpPushSender {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpPushSender {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("vigil/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl PushSender for HttpPushSender {
    async fn send(&self, note: PushNote) -> Result<(), PushError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&note)
            .send()
            .await
            .map_err(|err| PushError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PushError::Rejected {
                key: note.key,
                status: status.as_u16(),
            });
        }
        debug!(key = %note.key, "push submitted");
        Ok(())
    }
}
