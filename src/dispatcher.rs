//! Call dispatcher: the per-number lifecycle state machine
//!
//! Drives one attempt through `Pending → Initiated → Ringing → {Ended |
//! Failed}`: normalize and validate the number, initiate through the channel
//! (with the bounded timeout-retry policy), settle, hold for the ring
//! window, terminate when the channel supports it, and write exactly one
//! outcome record at the terminal transition.

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::channel::CallChannel;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::number::{NumberFormat, PhoneNumber};
use crate::outcome_log::{OutcomeLog, OutcomeRecord};
use crate::retry::call_with_retry;
use crate::types::{AttemptStatus, CallAttempt, Event};

/// Reason recorded for numbers that fail validation
const INVALID_NUMBER_REASON: &str = "Invalid number format";

/// Event channel capacity; dispatch is sequential so this never backs up
/// unless a subscriber stops reading.
const EVENT_CAPACITY: usize = 64;

/// Orchestrates the call lifecycle for single numbers
///
/// Construction-time choices: the channel variant, the number format, and
/// all timing. The dispatcher never branches on the channel kind at runtime;
/// it only consults [`CallChannel::supports_terminate`].
pub struct CallDispatcher {
    channel: Arc<dyn CallChannel>,
    format: NumberFormat,
    log: OutcomeLog,
    config: Config,
    event_tx: broadcast::Sender<Event>,
}

impl CallDispatcher {
    /// Create a dispatcher for the given channel and configuration
    pub fn new(channel: Arc<dyn CallChannel>, config: &Config) -> Result<Self> {
        config.validate()?;
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            channel,
            format: NumberFormat::new(&config.number_format),
            log: OutcomeLog::calls(&config.call_log_path),
            config: config.clone(),
            event_tx,
        })
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The channel this dispatcher drives
    pub fn channel(&self) -> &Arc<dyn CallChannel> {
        &self.channel
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<Event> {
        self.event_tx.clone()
    }

    fn emit(&self, event: Event) {
        // Send fails only when nobody is subscribed, which is fine
        self.event_tx.send(event).ok();
    }

    /// Dispatch one number through the full call lifecycle
    ///
    /// Returns the terminal [`CallAttempt`] for invalid, failed, and ended
    /// outcomes alike; callers distinguish them via `attempt.number.valid`
    /// and `attempt.status`. The only dispatch-level errors are
    /// [`Error::Unreachable`] (so a batch can abort) and log I/O failures.
    pub async fn dispatch(&self, raw: &str) -> Result<CallAttempt> {
        let number = PhoneNumber::parse(raw, &self.format);
        let mut attempt = CallAttempt::new(number, self.channel.kind());

        // Invalid numbers never touch the channel
        if !attempt.number.valid {
            attempt.fail(INVALID_NUMBER_REASON);
            tracing::warn!(number = %raw, "skipping invalid number");
            self.emit(Event::SkippedInvalid {
                number: raw.to_string(),
            });
            self.log
                .append(&OutcomeRecord::failure(raw, INVALID_NUMBER_REASON))
                .await?;
            return Ok(attempt);
        }

        tracing::info!(
            number = %attempt.number.canonical,
            raw = %raw,
            channel = %attempt.channel,
            "dispatching call"
        );
        self.emit(Event::AttemptStarted {
            number: raw.to_string(),
            canonical: attempt.number.canonical.clone(),
            channel: attempt.channel,
        });

        // Pending -> Initiated, with one bounded retry for timeout-class errors
        let canonical = attempt.number.canonical.clone();
        let init_result = call_with_retry(&self.config.retry, || {
            let channel = Arc::clone(&self.channel);
            let number = canonical.clone();
            async move { channel.initiate(&number).await }
        })
        .await;

        match init_result {
            Ok(()) => {}
            Err(Error::Unreachable(reason)) => {
                attempt.fail(reason.clone());
                self.record_failure(&attempt).await?;
                return Err(Error::Unreachable(reason));
            }
            Err(e) => {
                attempt.fail(e.to_string());
                self.record_failure(&attempt).await?;
                return Ok(attempt);
            }
        }

        attempt.advance(AttemptStatus::Initiated);
        self.emit(Event::Initiated {
            number: attempt.number.raw.clone(),
        });

        // Let the call/trigger take effect on-device before the ring window
        tokio::time::sleep(self.config.dispatch.initiate_settle).await;

        attempt.advance(AttemptStatus::Ringing);
        let hold = self.config.dispatch.ring_hold;
        tracing::info!(number = %attempt.number.canonical, hold_ms = hold.as_millis() as u64, "ringing");
        self.emit(Event::Ringing {
            number: attempt.number.raw.clone(),
            hold_ms: hold.as_millis() as u64,
        });
        tokio::time::sleep(hold).await;

        // Release the call when the channel can; a failed end-call command is
        // a warning, not a failed attempt, since the call may already have
        // ended on-device.
        if self.channel.supports_terminate()
            && let Err(e) = self.channel.terminate().await
        {
            tracing::warn!(
                number = %attempt.number.canonical,
                error = %e,
                "could not end call, it may end naturally on-device"
            );
            self.emit(Event::TerminationWarning {
                number: attempt.number.raw.clone(),
                error: e.to_string(),
            });
        }

        attempt.advance(AttemptStatus::Ended);
        self.log
            .append(&OutcomeRecord::success(&attempt.number.raw))
            .await?;
        tracing::info!(number = %attempt.number.canonical, "call completed");
        self.emit(Event::Ended {
            number: attempt.number.raw.clone(),
        });

        Ok(attempt)
    }

    async fn record_failure(&self, attempt: &CallAttempt) -> Result<()> {
        let reason = attempt.error.as_deref().unwrap_or("unknown error").to_string();
        tracing::error!(number = %attempt.number.raw, error = %reason, "call failed");
        self.emit(Event::Failed {
            number: attempt.number.raw.clone(),
            error: reason.clone(),
        });
        self.log
            .append(&OutcomeRecord::failure(&attempt.number.raw, reason))
            .await
    }
}
