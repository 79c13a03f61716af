//! Remote channel: webhook-triggered automation
//!
//! Fires an HTTP GET at a preconfigured trigger URL with the number embedded
//! as the query component. The automation service on the device reads the
//! query and places the call. Only HTTP 200 counts as success. This channel
//! cannot end calls; they are expected to end on their own after the hold
//! window.

use async_trait::async_trait;
use std::time::Duration;
use url::Url;

use crate::config::RemoteChannelConfig;
use crate::error::{Error, Result};
use crate::types::ChannelKind;

use super::CallChannel;

/// Call channel triggering a third-party automation webhook
#[derive(Debug)]
pub struct RemoteChannel {
    client: reqwest::Client,
    trigger_url: Url,
    request_timeout: Duration,
    probe_number: String,
}

impl RemoteChannel {
    /// Create a channel for the configured trigger URL
    ///
    /// Fails with a configuration error when the URL is missing or
    /// unparseable, so misconfiguration surfaces at startup rather than on
    /// the first dispatch.
    pub fn new(config: &RemoteChannelConfig) -> Result<Self> {
        let raw = config.trigger_url.as_deref().ok_or_else(|| {
            Error::config("remote trigger URL is not set", "remote.trigger_url")
        })?;
        let trigger_url = Url::parse(raw).map_err(|e| {
            Error::config(format!("invalid trigger URL: {e}"), "remote.trigger_url")
        })?;

        Ok(Self {
            client: reqwest::Client::new(),
            trigger_url,
            request_timeout: config.request_timeout,
            probe_number: config.probe_number.clone(),
        })
    }

    async fn trigger(&self, number: &str) -> Result<()> {
        // The trigger service contract takes the number as the raw query
        // component: https://host/.../call_trigger?<number>
        let mut url = self.trigger_url.clone();
        url.set_query(Some(&urlencoding::encode(number)));

        let request = self.client.get(url.clone()).timeout(self.request_timeout);
        let result = tokio::time::timeout(self.request_timeout, request.send()).await;

        match result {
            Ok(Ok(response)) if response.status() == reqwest::StatusCode::OK => {
                tracing::debug!(number = %number, "trigger accepted");
                Ok(())
            }
            Ok(Ok(response)) => Err(Error::Initiation(format!(
                "trigger returned status {}",
                response.status()
            ))),
            Ok(Err(e)) if e.is_timeout() => Err(Error::RequestTimeout(self.request_timeout)),
            Ok(Err(e)) if e.is_connect() => Err(Error::Unreachable(format!(
                "cannot reach trigger service: {e}"
            ))),
            Ok(Err(e)) => Err(Error::Network(e)),
            Err(_) => Err(Error::RequestTimeout(self.request_timeout)),
        }
    }
}

#[async_trait]
impl CallChannel for RemoteChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Remote
    }

    async fn initiate(&self, canonical: &str) -> Result<()> {
        self.trigger(canonical).await
    }

    async fn probe(&self) -> Result<()> {
        // The trigger endpoint has no health route; fire it with the probe
        // number, which also verifies the macro is active end to end.
        self.trigger(&self.probe_number).await
    }
}
