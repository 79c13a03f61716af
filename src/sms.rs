//! SMS dispatch
//!
//! Structurally the same pipeline as calling (format, validate, dispatch,
//! log) with no hold or terminate phase. Two transports: the device shell
//! (compose in the default SMS app via intents and key events) and an
//! on-device SMS gateway app spoken to over HTTP with basic auth.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::channel::{CommandExecutor, ShellExecutor};
use crate::config::{Config, UnreachablePolicy};
use crate::error::{Error, Result};
use crate::number::{NumberFormat, PhoneNumber};
use crate::outcome_log::{OutcomeLog, OutcomeRecord};
use crate::types::BatchSummary;

/// Keycode moving focus to the send button in the SMS app
const KEYCODE_DPAD_RIGHT: u32 = 22;
/// Keycode pressing the focused send button
const KEYCODE_ENTER: u32 = 66;

/// Request body for the SMS gateway app
#[derive(Debug, Serialize)]
struct GatewayMessage<'a> {
    phone: &'a str,
    message: &'a str,
    sim: u32,
}

enum SmsTransport {
    /// Drive the device's SMS app over the shell
    Local {
        executor: Arc<dyn CommandExecutor>,
        ui_step_delay: Duration,
    },
    /// POST to an SMS gateway app running on the device
    Gateway {
        client: reqwest::Client,
        url: Url,
        username: Option<String>,
        password: Option<String>,
        timeout: Duration,
        sim_slot: u32,
    },
}

/// Sends the configured message to lists of numbers
pub struct SmsSender {
    transport: SmsTransport,
    format: NumberFormat,
    log: OutcomeLog,
    message: String,
    send_delay: Duration,
    policy: UnreachablePolicy,
}

impl std::fmt::Debug for SmsSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsSender").finish_non_exhaustive()
    }
}

impl SmsSender {
    /// Sender driving the device's SMS app over adb
    pub fn local(config: &Config) -> Result<Self> {
        Self::local_with_executor(config, Arc::new(ShellExecutor::new(&config.local.adb_path)))
    }

    /// Sender using a custom command executor (used in tests)
    pub fn local_with_executor(
        config: &Config,
        executor: Arc<dyn CommandExecutor>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transport: SmsTransport::Local {
                executor,
                ui_step_delay: config.sms.ui_step_delay,
            },
            format: NumberFormat::new(&config.number_format),
            log: OutcomeLog::messages(&config.sms_log_path),
            message: config.sms.message.clone(),
            send_delay: config.sms.send_delay,
            policy: config.unreachable_policy,
        })
    }

    /// Sender posting to the configured SMS gateway
    pub fn gateway(config: &Config) -> Result<Self> {
        config.validate()?;
        let raw = config.sms.gateway_url.as_deref().ok_or_else(|| {
            Error::config("SMS gateway URL is not set", "sms.gateway_url")
        })?;
        let url = Url::parse(raw).map_err(|e| {
            Error::config(format!("invalid SMS gateway URL: {e}"), "sms.gateway_url")
        })?;

        Ok(Self {
            transport: SmsTransport::Gateway {
                client: reqwest::Client::new(),
                url,
                username: config.sms.gateway_username.clone(),
                password: config.sms.gateway_password.clone(),
                timeout: config.sms.gateway_timeout,
                sim_slot: config.sms.sim_slot,
            },
            format: NumberFormat::new(&config.number_format),
            log: OutcomeLog::messages(&config.sms_log_path),
            message: config.sms.message.clone(),
            send_delay: config.sms.send_delay,
            policy: config.unreachable_policy,
        })
    }

    /// Reachability check for the selected transport
    pub async fn probe(&self) -> Result<()> {
        match &self.transport {
            SmsTransport::Local { executor, .. } => {
                let output = executor.run("getprop ro.product.model").await?;
                if output.stdout.is_empty() || output.stderr.contains("Error") {
                    return Err(Error::Unreachable(
                        "device did not answer probe".to_string(),
                    ));
                }
                Ok(())
            }
            SmsTransport::Gateway {
                client,
                url,
                username,
                password,
                timeout,
                ..
            } => {
                let mut request = client.get(url.clone()).timeout(*timeout);
                if let Some(user) = username {
                    request = request.basic_auth(user, password.as_deref());
                }
                // Any HTTP answer proves the gateway app is listening
                match request.send().await {
                    Ok(_) => Ok(()),
                    Err(e) => Err(Error::Unreachable(format!(
                        "cannot connect to SMS gateway: {e}"
                    ))),
                }
            }
        }
    }

    async fn send_canonical(&self, canonical: &str) -> Result<()> {
        match &self.transport {
            SmsTransport::Local {
                executor,
                ui_step_delay,
            } => {
                executor
                    .run(&format!(
                        "am start -a android.intent.action.SENDTO -d sms:{canonical}"
                    ))
                    .await
                    .and_then(fail_on_shell_error)?;
                // Wait for the SMS app to open before typing
                tokio::time::sleep(*ui_step_delay).await;

                // `input text` cannot carry literal spaces
                let escaped = self.message.replace(' ', "%s");
                executor
                    .run(&format!("input text {escaped}"))
                    .await
                    .and_then(fail_on_shell_error)?;
                tokio::time::sleep(*ui_step_delay).await;

                executor
                    .run(&format!("input keyevent {KEYCODE_DPAD_RIGHT}"))
                    .await
                    .and_then(fail_on_shell_error)?;
                executor
                    .run(&format!("input keyevent {KEYCODE_ENTER}"))
                    .await
                    .and_then(fail_on_shell_error)?;
                Ok(())
            }
            SmsTransport::Gateway {
                client,
                url,
                username,
                password,
                timeout,
                sim_slot,
            } => {
                let body = GatewayMessage {
                    phone: canonical,
                    message: &self.message,
                    sim: *sim_slot,
                };
                let mut request = client.post(url.clone()).json(&body).timeout(*timeout);
                if let Some(user) = username {
                    request = request.basic_auth(user, password.as_deref());
                }

                let result = tokio::time::timeout(*timeout, request.send()).await;
                match result {
                    Ok(Ok(response)) if response.status() == reqwest::StatusCode::OK => Ok(()),
                    Ok(Ok(response)) => Err(Error::Initiation(format!(
                        "SMS gateway returned status {}",
                        response.status()
                    ))),
                    Ok(Err(e)) if e.is_timeout() => Err(Error::RequestTimeout(*timeout)),
                    Ok(Err(e)) if e.is_connect() => Err(Error::Unreachable(format!(
                        "cannot connect to SMS gateway: {e}"
                    ))),
                    Ok(Err(e)) => Err(Error::Network(e)),
                    Err(_) => Err(Error::RequestTimeout(*timeout)),
                }
            }
        }
    }

    /// Send the configured message to one number and log the outcome
    ///
    /// Invalid numbers are logged and reported via [`Error::InvalidNumber`]
    /// without touching the transport. A message is sent at most once: a
    /// timed-out gateway request may still have been delivered, so a failed
    /// send is never reissued.
    pub async fn send(&self, raw: &str) -> Result<()> {
        let number = PhoneNumber::parse(raw, &self.format);
        if !number.valid {
            tracing::warn!(number = %raw, "skipping invalid number");
            self.log
                .append(&OutcomeRecord::failure(raw, "Invalid number format"))
                .await?;
            return Err(Error::InvalidNumber(raw.to_string()));
        }

        tracing::info!(number = %number.canonical, "sending SMS");
        match self.send_canonical(&number.canonical).await {
            Ok(()) => {
                self.log.append(&OutcomeRecord::success(raw)).await?;
                Ok(())
            }
            Err(e) => {
                self.log
                    .append(&OutcomeRecord::failure(raw, e.to_string()))
                    .await?;
                Err(e)
            }
        }
    }

    /// Send the configured message to every number in order
    ///
    /// Same batch semantics as calling: probe first (honoring the configured
    /// [`UnreachablePolicy`]), continue past per-number failures, abort the
    /// remainder only when the transport becomes unreachable.
    pub async fn send_batch<I, S>(&self, numbers: I) -> Result<BatchSummary>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut summary = BatchSummary::default();

        if let Err(e) = self.probe().await {
            tracing::warn!(error = %e, "SMS transport probe failed");
            match self.policy {
                UnreachablePolicy::Abort => {
                    summary.aborted = true;
                    return Ok(summary);
                }
                UnreachablePolicy::Proceed => {
                    tracing::warn!("proceeding despite failed probe");
                }
            }
        }

        for raw in numbers {
            match self.send(raw.as_ref()).await {
                Ok(()) => summary.ended += 1,
                Err(Error::InvalidNumber(_)) => summary.skipped_invalid += 1,
                Err(Error::Unreachable(reason)) => {
                    summary.failed += 1;
                    summary.aborted = true;
                    tracing::error!(error = %reason, "SMS transport unreachable, aborting batch");
                    break;
                }
                Err(Error::Io(e)) => return Err(Error::Io(e)),
                Err(_) => summary.failed += 1,
            }
            tokio::time::sleep(self.send_delay).await;
        }

        tracing::info!(
            ended = summary.ended,
            failed = summary.failed,
            skipped_invalid = summary.skipped_invalid,
            "SMS batch complete"
        );
        Ok(summary)
    }
}

fn fail_on_shell_error(output: crate::channel::CommandOutput) -> Result<()> {
    if output.stderr.contains("Error") {
        Err(Error::Initiation(format!(
            "device shell reported: {}",
            output.stderr
        )))
    } else {
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::CommandOutput;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use wiremock::matchers::{body_json_string, header_exists, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FakeExecutor {
        commands: Mutex<Vec<String>>,
    }

    impl FakeExecutor {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                commands: Mutex::new(Vec::new()),
            })
        }

        fn commands(&self) -> Vec<String> {
            self.commands.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandExecutor for FakeExecutor {
        async fn run(&self, command: &str) -> Result<CommandOutput> {
            self.commands.lock().unwrap().push(command.to_string());
            Ok(CommandOutput {
                stdout: "ok".to_string(),
                stderr: String::new(),
            })
        }
    }

    fn fast_config(temp_dir: &TempDir) -> Config {
        let mut config = Config {
            sms_log_path: temp_dir.path().join("sms_log.txt"),
            ..Default::default()
        };
        config.sms.ui_step_delay = Duration::from_millis(1);
        config.sms.send_delay = Duration::from_millis(1);
        config.sms.message = "Hello there".to_string();
        config
    }

    #[tokio::test]
    async fn local_transport_issues_the_compose_and_send_sequence() {
        let temp_dir = TempDir::new().unwrap();
        let config = fast_config(&temp_dir);
        let executor = FakeExecutor::new();
        let sender = SmsSender::local_with_executor(&config, executor.clone()).unwrap();

        sender.send("0712345678").await.unwrap();

        let commands = executor.commands();
        assert_eq!(
            commands[0],
            "am start -a android.intent.action.SENDTO -d sms:0712345678"
        );
        assert_eq!(commands[1], "input text Hello%sthere");
        assert_eq!(commands[2], "input keyevent 22");
        assert_eq!(commands[3], "input keyevent 66");

        let log = tokio::fs::read_to_string(&config.sms_log_path).await.unwrap();
        assert!(log.contains("SUCCESS - Message sent to 0712345678"));
    }

    #[tokio::test]
    async fn invalid_number_is_logged_and_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let config = fast_config(&temp_dir);
        let executor = FakeExecutor::new();
        let sender = SmsSender::local_with_executor(&config, executor.clone()).unwrap();

        let err = sender.send("abc").await.unwrap_err();
        assert!(matches!(err, Error::InvalidNumber(_)), "got {err:?}");
        assert!(executor.commands().is_empty(), "transport never touched");

        let log = tokio::fs::read_to_string(&config.sms_log_path).await.unwrap();
        assert!(log.contains("FAILED - abc - Invalid number format"));
    }

    #[tokio::test]
    async fn gateway_posts_with_basic_auth_and_sim_slot() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header_exists("authorization"))
            .and(body_json_string(
                r#"{"phone":"0712345678","message":"Hello there","sim":1}"#,
            ))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let mut config = fast_config(&temp_dir);
        config.sms.gateway_url = Some(server.uri());
        config.sms.gateway_username = Some("sms".to_string());
        config.sms.gateway_password = Some("secret".to_string());
        config.sms.sim_slot = 1;

        let sender = SmsSender::gateway(&config).unwrap();
        sender.send("0712345678").await.unwrap();
    }

    #[tokio::test]
    async fn gateway_rejection_is_an_initiation_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let mut config = fast_config(&temp_dir);
        config.sms.gateway_url = Some(server.uri());

        let sender = SmsSender::gateway(&config).unwrap();
        let err = sender.send("0712345678").await.unwrap_err();

        assert!(matches!(err, Error::Initiation(_)), "got {err:?}");
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn timed_out_gateway_post_is_not_reissued() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .expect(1)
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let mut config = fast_config(&temp_dir);
        config.sms.gateway_url = Some(server.uri());
        config.sms.gateway_timeout = Duration::from_millis(100);

        let sender = SmsSender::gateway(&config).unwrap();
        let err = sender.send("0712345678").await.unwrap_err();

        assert!(matches!(err, Error::RequestTimeout(_)), "got {err:?}");
        let requests = server.received_requests().await.unwrap();
        assert_eq!(
            requests.len(),
            1,
            "a timed-out message may have been delivered, it must not be sent again"
        );

        let log = tokio::fs::read_to_string(&config.sms_log_path).await.unwrap();
        assert!(log.contains("FAILED - 0712345678"));
    }

    #[tokio::test]
    async fn missing_gateway_url_is_a_configuration_error() {
        let temp_dir = TempDir::new().unwrap();
        let config = fast_config(&temp_dir);
        let err = SmsSender::gateway(&config).unwrap_err();
        assert!(
            matches!(err, Error::Config { key: Some(ref k), .. } if k == "sms.gateway_url"),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn batch_counts_mirror_the_call_runner() {
        let temp_dir = TempDir::new().unwrap();
        let config = fast_config(&temp_dir);
        let executor = FakeExecutor::new();
        let sender = SmsSender::local_with_executor(&config, executor).unwrap();

        let summary = sender
            .send_batch(["0712345671", "abc", "0712345672"])
            .await
            .unwrap();

        assert_eq!(summary.ended, 2);
        assert_eq!(summary.skipped_invalid, 1);
        assert_eq!(summary.failed, 0);

        let log = tokio::fs::read_to_string(&config.sms_log_path).await.unwrap();
        assert_eq!(log.lines().count(), 3);
    }
}
