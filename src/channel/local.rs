//! Local channel: direct device-shell control over ADB
//!
//! Issues Android intents and key events through `adb shell`. The command
//! execution seam is a trait so the channel logic is testable without a
//! device attached.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::LocalChannelConfig;
use crate::error::{Error, Result};
use crate::types::ChannelKind;

use super::CallChannel;

/// Android keycode for the end-call button
const KEYCODE_ENDCALL: u32 = 6;

/// Captured output of a device shell command
#[derive(Clone, Debug, Default)]
pub struct CommandOutput {
    /// Trimmed stdout
    pub stdout: String,
    /// Trimmed stderr
    pub stderr: String,
}

/// Seam over "run a device shell command"
///
/// The production implementation shells out to `adb shell`; tests substitute
/// a recording fake.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run a shell-style command string on the device, returning its output
    ///
    /// A spawn-level failure (adb missing, no device) is a connectivity
    /// error, not command output.
    async fn run(&self, command: &str) -> Result<CommandOutput>;
}

/// Executes device commands via the adb binary
#[derive(Clone, Debug)]
pub struct ShellExecutor {
    adb_path: PathBuf,
}

impl ShellExecutor {
    /// Create an executor using the given adb binary
    pub fn new(adb_path: impl Into<PathBuf>) -> Self {
        Self {
            adb_path: adb_path.into(),
        }
    }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn run(&self, command: &str) -> Result<CommandOutput> {
        let output = tokio::process::Command::new(&self.adb_path)
            .arg("shell")
            .args(command.split_whitespace())
            .output()
            .await
            .map_err(|e| Error::Unreachable(format!("device shell unavailable: {e}")))?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Call channel driving the device directly over its shell
///
/// Supports both initiation (CALL intent) and termination (ENDCALL key
/// event), so held calls are released at the end of the ring window.
pub struct LocalChannel {
    executor: Arc<dyn CommandExecutor>,
    dial_settle: Duration,
    sim_slot: Option<u32>,
}

impl LocalChannel {
    /// Create a channel shelling out to adb per the configuration
    pub fn new(config: &LocalChannelConfig) -> Self {
        Self::with_executor(config, Arc::new(ShellExecutor::new(&config.adb_path)))
    }

    /// Create a channel with a custom command executor (used in tests)
    pub fn with_executor(config: &LocalChannelConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            executor,
            dial_settle: config.dial_settle,
            sim_slot: config.sim_slot,
        }
    }

    fn dial_command(&self, canonical: &str) -> String {
        let mut command =
            format!("am start -a android.intent.action.CALL -d tel:{canonical}");
        if let Some(slot) = self.sim_slot {
            // Honored by multi-SIM dialers that read the simSlot extra
            command.push_str(&format!(" --ei simSlot {slot}"));
        }
        command
    }
}

#[async_trait]
impl CallChannel for LocalChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Local
    }

    async fn initiate(&self, canonical: &str) -> Result<()> {
        let output = self.executor.run(&self.dial_command(canonical)).await?;

        if output.stderr.contains("Error") {
            return Err(Error::Initiation(format!(
                "device shell reported: {}",
                output.stderr
            )));
        }

        tracing::debug!(number = %canonical, "dial intent issued");
        // Let the call intent take effect before the caller proceeds
        tokio::time::sleep(self.dial_settle).await;
        Ok(())
    }

    fn supports_terminate(&self) -> bool {
        true
    }

    async fn terminate(&self) -> Result<()> {
        let output = self
            .executor
            .run(&format!("input keyevent {KEYCODE_ENDCALL}"))
            .await?;

        if output.stderr.contains("Error") {
            return Err(Error::Termination(format!(
                "device shell reported: {}",
                output.stderr
            )));
        }

        tracing::debug!("end-call key event issued");
        Ok(())
    }

    async fn probe(&self) -> Result<()> {
        let output = self.executor.run("getprop ro.product.model").await?;

        if output.stdout.is_empty() || output.stderr.contains("Error") {
            return Err(Error::Unreachable(format!(
                "device did not answer probe: {}",
                if output.stderr.is_empty() {
                    "empty response"
                } else {
                    output.stderr.as_str()
                }
            )));
        }

        tracing::info!(device = %output.stdout, "device reachable");
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every command and replays scripted outputs
    struct FakeExecutor {
        commands: Mutex<Vec<String>>,
        output: CommandOutput,
    }

    impl FakeExecutor {
        fn succeeding() -> Arc<Self> {
            Arc::new(Self {
                commands: Mutex::new(Vec::new()),
                output: CommandOutput {
                    stdout: "Pixel 7".to_string(),
                    stderr: String::new(),
                },
            })
        }

        fn erroring(stderr: &str) -> Arc<Self> {
            Arc::new(Self {
                commands: Mutex::new(Vec::new()),
                output: CommandOutput {
                    stdout: String::new(),
                    stderr: stderr.to_string(),
                },
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
            Ok(self.output.clone())
        }
    }

    fn fast_config() -> LocalChannelConfig {
        LocalChannelConfig {
            dial_settle: Duration::from_millis(1),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn initiate_issues_call_intent_with_tel_uri() {
        let executor = FakeExecutor::succeeding();
        let channel = LocalChannel::with_executor(&fast_config(), executor.clone());

        channel.initiate("254712345678").await.unwrap();

        let commands = executor.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(
            commands[0],
            "am start -a android.intent.action.CALL -d tel:254712345678"
        );
    }

    #[tokio::test]
    async fn sim_slot_is_passed_as_intent_extra() {
        let executor = FakeExecutor::succeeding();
        let config = LocalChannelConfig {
            sim_slot: Some(1),
            ..fast_config()
        };
        let channel = LocalChannel::with_executor(&config, executor.clone());

        channel.initiate("254712345678").await.unwrap();

        assert!(executor.commands()[0].ends_with("--ei simSlot 1"));
    }

    #[tokio::test]
    async fn error_on_stderr_fails_initiation() {
        let executor = FakeExecutor::erroring("Error: Activity not started");
        let channel = LocalChannel::with_executor(&fast_config(), executor);

        let err = channel.initiate("254712345678").await.unwrap_err();
        assert!(matches!(err, Error::Initiation(_)), "got {err:?}");
        assert!(err.to_string().contains("Activity not started"));
    }

    #[tokio::test]
    async fn benign_stderr_is_not_a_failure() {
        let executor = FakeExecutor::erroring("Warning: slow dialer");
        let channel = LocalChannel::with_executor(&fast_config(), executor);

        assert!(channel.initiate("254712345678").await.is_ok());
    }

    #[tokio::test]
    async fn terminate_sends_endcall_key_event() {
        let executor = FakeExecutor::succeeding();
        let channel = LocalChannel::with_executor(&fast_config(), executor.clone());

        assert!(channel.supports_terminate());
        channel.terminate().await.unwrap();

        assert_eq!(executor.commands(), vec!["input keyevent 6".to_string()]);
    }

    #[tokio::test]
    async fn probe_requires_a_device_answer() {
        let executor = FakeExecutor::succeeding();
        let channel = LocalChannel::with_executor(&fast_config(), executor);
        channel.probe().await.unwrap();

        let silent = FakeExecutor::erroring("");
        let channel = LocalChannel::with_executor(&fast_config(), silent);
        let err = channel.probe().await.unwrap_err();
        assert!(matches!(err, Error::Unreachable(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn missing_adb_binary_is_unreachable() {
        let config = LocalChannelConfig {
            adb_path: PathBuf::from("/nonexistent/adb-binary"),
            ..fast_config()
        };
        let channel = LocalChannel::new(&config);

        let err = channel.probe().await.unwrap_err();
        assert!(matches!(err, Error::Unreachable(_)), "got {err:?}");
    }
}
