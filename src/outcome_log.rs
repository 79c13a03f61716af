//! Append-only outcome log
//!
//! One timestamped line per terminal attempt, written open-append-close so
//! there is no long-lived file handle. Records are write-once; the log is
//! never truncated or rewritten.

use chrono::{DateTime, Local};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

use crate::error::Result;

/// Terminal outcome of one attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// The attempt completed its full lifecycle
    Success,
    /// The attempt failed terminally
    Failed,
}

/// A single immutable log entry describing the terminal result of one attempt
#[derive(Clone, Debug)]
pub struct OutcomeRecord {
    /// When the terminal transition happened
    pub timestamp: DateTime<Local>,
    /// The raw number the attempt was for
    pub number: String,
    /// Terminal outcome
    pub status: OutcomeStatus,
    /// Failure reason, present only for failed outcomes
    pub error: Option<String>,
}

impl OutcomeRecord {
    /// Record a successful attempt, timestamped now
    pub fn success(number: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            number: number.into(),
            status: OutcomeStatus::Success,
            error: None,
        }
    }

    /// Record a failed attempt, timestamped now
    pub fn failure(number: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            number: number.into(),
            status: OutcomeStatus::Failed,
            error: Some(error.into()),
        }
    }
}

/// Append-only writer for outcome records
///
/// The success-line wording differs between the call log (`Call to <n>`) and
/// the SMS log (`Message sent to <n>`); failure lines share one format.
#[derive(Clone, Debug)]
pub struct OutcomeLog {
    path: PathBuf,
    action: &'static str,
}

impl OutcomeLog {
    /// Log for call outcomes
    pub fn calls(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            action: "Call to",
        }
    }

    /// Log for SMS outcomes
    pub fn messages(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            action: "Message sent to",
        }
    }

    /// Path this log appends to
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Append one record, creating the file (and parent directory) if needed
    pub async fn append(&self, record: &OutcomeRecord) -> Result<()> {
        let timestamp = record.timestamp.format("%Y-%m-%d %H:%M:%S");
        let line = match record.status {
            OutcomeStatus::Success => {
                format!("[{timestamp}] SUCCESS - {} {}\n", self.action, record.number)
            }
            OutcomeStatus::Failed => format!(
                "[{timestamp}] FAILED - {} - {}\n",
                record.number,
                record.error.as_deref().unwrap_or("unknown error")
            ),
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn success_and_failure_lines_match_log_format() {
        let temp_dir = TempDir::new().unwrap();
        let log = OutcomeLog::calls(temp_dir.path().join("call_log.txt"));

        log.append(&OutcomeRecord::success("254712345678")).await.unwrap();
        log.append(&OutcomeRecord::failure("abc", "Invalid number format"))
            .await
            .unwrap();

        let content = tokio::fs::read_to_string(log.path()).await.unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("SUCCESS - Call to 254712345678"), "{}", lines[0]);
        assert!(lines[1].contains("FAILED - abc - Invalid number format"), "{}", lines[1]);
        assert!(lines[0].starts_with('['), "line should start with a timestamp");
    }

    #[tokio::test]
    async fn sms_log_uses_message_wording() {
        let temp_dir = TempDir::new().unwrap();
        let log = OutcomeLog::messages(temp_dir.path().join("sms_log.txt"));

        log.append(&OutcomeRecord::success("254712345678")).await.unwrap();

        let content = tokio::fs::read_to_string(log.path()).await.unwrap();
        assert!(content.contains("SUCCESS - Message sent to 254712345678"));
    }

    #[tokio::test]
    async fn append_never_truncates_earlier_lines() {
        let temp_dir = TempDir::new().unwrap();
        let log = OutcomeLog::calls(temp_dir.path().join("call_log.txt"));

        log.append(&OutcomeRecord::success("254700000001")).await.unwrap();
        log.append(&OutcomeRecord::success("254700000002")).await.unwrap();
        let first_run = tokio::fs::read_to_string(log.path()).await.unwrap();

        log.append(&OutcomeRecord::failure("254700000003", "busy")).await.unwrap();
        let combined = tokio::fs::read_to_string(log.path()).await.unwrap();

        assert!(
            combined.starts_with(&first_run),
            "earlier lines must be an unmodified prefix of the combined log"
        );
        assert_eq!(combined.lines().count(), 3);
    }

    #[tokio::test]
    async fn missing_parent_directory_is_created() {
        let temp_dir = TempDir::new().unwrap();
        let log = OutcomeLog::calls(temp_dir.path().join("data").join("call_log.txt"));

        log.append(&OutcomeRecord::success("254712345678")).await.unwrap();
        assert!(log.path().exists());
    }
}
