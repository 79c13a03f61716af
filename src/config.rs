//! Configuration types for callout
//!
//! All knobs the two deployments disagree on (trunk-prefix rewrite, trigger
//! URL, request timeout, SIM slot) are explicit fields here rather than
//! module-level constants, so tests and embedders can run multiple
//! configurations side by side.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Phone number format settings
///
/// Defaults describe the deployed example plan (Kenya): country code `254`,
/// 9-digit subscriber numbers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NumberFormatConfig {
    /// Country calling code prepended to local subscriber numbers (default: "254")
    #[serde(default = "default_country_code")]
    pub country_code: String,

    /// Digits in a country-code-free subscriber number (default: 9)
    #[serde(default = "default_subscriber_len")]
    pub subscriber_len: usize,

    /// Rewrite a leading national trunk prefix `0` into international form
    ///
    /// The two existing deployments disagree on this behavior, so it is a
    /// named option rather than a hard-coded rule (default: false).
    /// Deployments whose channel requires fully international numbers
    /// (typically the device-shell one) are expected to enable it; with it
    /// off, trunk-prefixed input still validates and is dialed as-is.
    #[serde(default)]
    pub rewrite_trunk_prefix: bool,
}

impl Default for NumberFormatConfig {
    fn default() -> Self {
        Self {
            country_code: default_country_code(),
            subscriber_len: default_subscriber_len(),
            rewrite_trunk_prefix: false,
        }
    }
}

/// Call lifecycle timing settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// How long a call rings before termination (default: 20s)
    ///
    /// Calibrated to register as a missed call rather than a connected call.
    #[serde(default = "default_ring_hold", with = "duration_millis")]
    pub ring_hold: Duration,

    /// Delay between initiation and the ring window, letting the call take
    /// effect on-device (default: 1.5s)
    #[serde(default = "default_initiate_settle", with = "duration_millis")]
    pub initiate_settle: Duration,

    /// Pause between completed attempts to avoid overloading the trigger
    /// service or the device (default: 1s)
    #[serde(default = "default_inter_attempt_delay", with = "duration_millis")]
    pub inter_attempt_delay: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            ring_hold: default_ring_hold(),
            initiate_settle: default_initiate_settle(),
            inter_attempt_delay: default_inter_attempt_delay(),
        }
    }
}

/// Device-shell (local) channel settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocalChannelConfig {
    /// Path to the adb executable (default: "adb", resolved via PATH)
    #[serde(default = "default_adb_path")]
    pub adb_path: PathBuf,

    /// Delay after issuing the dial command before returning, letting the
    /// call intent take effect (default: 500ms)
    #[serde(default = "default_dial_settle", with = "duration_millis")]
    pub dial_settle: Duration,

    /// SIM slot selector for multi-line devices (None = device default)
    #[serde(default)]
    pub sim_slot: Option<u32>,
}

impl Default for LocalChannelConfig {
    fn default() -> Self {
        Self {
            adb_path: default_adb_path(),
            dial_settle: default_dial_settle(),
            sim_slot: None,
        }
    }
}

/// Webhook (remote) channel settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteChannelConfig {
    /// Webhook trigger URL; required when the remote channel is selected
    #[serde(default)]
    pub trigger_url: Option<String>,

    /// Bound on each trigger request (default: 20s)
    ///
    /// The deployed trigger service can be slow after several back-to-back
    /// calls, hence the unusually generous default. Tunable.
    #[serde(default = "default_request_timeout", with = "duration_millis")]
    pub request_timeout: Duration,

    /// Number used by the pre-batch reachability probe (default: "0712345678")
    #[serde(default = "default_probe_number")]
    pub probe_number: String,
}

impl Default for RemoteChannelConfig {
    fn default() -> Self {
        Self {
            trigger_url: None,
            request_timeout: default_request_timeout(),
            probe_number: default_probe_number(),
        }
    }
}

/// Retry policy for transient initiation failures
///
/// Defaults implement the deployed policy: timeout-class failures get exactly
/// one retry after a 2 second backoff; everything else fails immediately.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the initial try (default: 1)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 2s)
    #[serde(default = "default_initial_delay", with = "duration_millis")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 2s)
    #[serde(default = "default_max_delay", with = "duration_millis")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false, keeps timing predictable
    /// for the single sequential flow)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

/// SMS dispatch settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SmsConfig {
    /// Message body sent to every number
    #[serde(default = "default_sms_message")]
    pub message: String,

    /// SMS gateway base URL; required for the gateway transport
    #[serde(default)]
    pub gateway_url: Option<String>,

    /// SMS gateway username (HTTP basic auth)
    #[serde(default)]
    pub gateway_username: Option<String>,

    /// SMS gateway password (HTTP basic auth)
    #[serde(default)]
    pub gateway_password: Option<String>,

    /// Bound on each gateway request (default: 5s)
    #[serde(default = "default_gateway_timeout", with = "duration_millis")]
    pub gateway_timeout: Duration,

    /// SIM slot the gateway sends from (default: 0)
    #[serde(default)]
    pub sim_slot: u32,

    /// Pause between the compose/type/send steps of the device SMS app,
    /// letting the UI catch up (default: 1s)
    #[serde(default = "default_ui_step_delay", with = "duration_millis")]
    pub ui_step_delay: Duration,

    /// Pause between messages (default: 1s)
    #[serde(default = "default_send_delay", with = "duration_millis")]
    pub send_delay: Duration,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            message: default_sms_message(),
            gateway_url: None,
            gateway_username: None,
            gateway_password: None,
            gateway_timeout: default_gateway_timeout(),
            sim_slot: 0,
            ui_step_delay: default_ui_step_delay(),
            send_delay: default_send_delay(),
        }
    }
}

/// What the batch runner does when the pre-batch reachability probe fails
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreachablePolicy {
    /// Stop before dispatching anything (default, safe for automated runs)
    #[default]
    Abort,
    /// Warn and dispatch anyway
    Proceed,
}

/// Main configuration for callout
///
/// Fields are organized into logical sub-configs. All sub-config fields carry
/// serde defaults, so a `Config::default()` works out of the box for the
/// local channel; only the remote channel and the SMS gateway require
/// explicit URLs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Contact list file, one number per line, order = dial order
    #[serde(default = "default_contacts_path")]
    pub contacts_path: PathBuf,

    /// Append-only call outcome log
    #[serde(default = "default_call_log_path")]
    pub call_log_path: PathBuf,

    /// Append-only SMS outcome log
    #[serde(default = "default_sms_log_path")]
    pub sms_log_path: PathBuf,

    /// Phone number format settings
    #[serde(default)]
    pub number_format: NumberFormatConfig,

    /// Call lifecycle timing
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Device-shell channel settings
    #[serde(default)]
    pub local: LocalChannelConfig,

    /// Webhook channel settings
    #[serde(default)]
    pub remote: RemoteChannelConfig,

    /// Retry policy for transient initiation failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// SMS dispatch settings
    #[serde(default)]
    pub sms: SmsConfig,

    /// Probe failure policy for non-interactive runs
    #[serde(default)]
    pub unreachable_policy: UnreachablePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            contacts_path: default_contacts_path(),
            call_log_path: default_call_log_path(),
            sms_log_path: default_sms_log_path(),
            number_format: NumberFormatConfig::default(),
            dispatch: DispatchConfig::default(),
            local: LocalChannelConfig::default(),
            remote: RemoteChannelConfig::default(),
            retry: RetryConfig::default(),
            sms: SmsConfig::default(),
            unreachable_policy: UnreachablePolicy::default(),
        }
    }
}

impl Config {
    /// Validate settings that would otherwise fail mid-run
    ///
    /// Checked at construction so misconfiguration surfaces before any
    /// attempt is made. Channel-specific requirements (trigger URL, gateway
    /// URL) are validated by the respective channel constructors.
    pub fn validate(&self) -> Result<()> {
        if self.contacts_path.as_os_str().is_empty() {
            return Err(Error::config("contacts path is empty", "contacts_path"));
        }
        if self.call_log_path.as_os_str().is_empty() {
            return Err(Error::config("call log path is empty", "call_log_path"));
        }
        if self.dispatch.ring_hold.is_zero() {
            return Err(Error::config(
                "ring hold window must be greater than zero",
                "dispatch.ring_hold",
            ));
        }
        if self.number_format.country_code.is_empty()
            || !self
                .number_format
                .country_code
                .chars()
                .all(|c| c.is_ascii_digit())
        {
            return Err(Error::config(
                "country code must be non-empty digits",
                "number_format.country_code",
            ));
        }
        if self.number_format.subscriber_len == 0 {
            return Err(Error::config(
                "subscriber length must be greater than zero",
                "number_format.subscriber_len",
            ));
        }
        Ok(())
    }
}

fn default_country_code() -> String {
    "254".to_string()
}

fn default_subscriber_len() -> usize {
    9
}

fn default_ring_hold() -> Duration {
    Duration::from_secs(20)
}

fn default_initiate_settle() -> Duration {
    Duration::from_millis(1500)
}

fn default_inter_attempt_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_adb_path() -> PathBuf {
    PathBuf::from("adb")
}

fn default_dial_settle() -> Duration {
    Duration::from_millis(500)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_probe_number() -> String {
    "0712345678".to_string()
}

fn default_max_attempts() -> u32 {
    1
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_sms_message() -> String {
    "Hello! This is an automated message.".to_string()
}

fn default_gateway_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_ui_step_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_send_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_contacts_path() -> PathBuf {
    PathBuf::from("data/contacts.csv")
}

fn default_call_log_path() -> PathBuf {
    PathBuf::from("data/call_log.txt")
}

fn default_sms_log_path() -> PathBuf {
    PathBuf::from("data/sms_log.txt")
}

// Duration serialization helper (milliseconds; several delays are sub-second)
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
