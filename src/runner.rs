//! Batch runner: drives the dispatcher over an ordered contact list
//!
//! Strictly sequential: each attempt runs to completion before the next
//! starts, so outcome records land in list order. A single number's failure
//! never halts the batch; only a connectivity-level failure does.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::channel::CallChannel;
use crate::config::{Config, UnreachablePolicy};
use crate::contacts::ContactList;
use crate::dispatcher::CallDispatcher;
use crate::error::{Error, Result};
use crate::types::{AttemptStatus, BatchSummary, Event};

/// Runs a call batch over an ordered sequence of raw numbers
pub struct BatchRunner {
    dispatcher: CallDispatcher,
    channel: Arc<dyn CallChannel>,
    policy: UnreachablePolicy,
    inter_attempt_delay: Duration,
    contacts_path: std::path::PathBuf,
    event_tx: broadcast::Sender<Event>,
}

impl BatchRunner {
    /// Create a runner for the given channel and configuration
    pub fn new(channel: Arc<dyn CallChannel>, config: &Config) -> Result<Self> {
        let dispatcher = CallDispatcher::new(Arc::clone(&channel), config)?;
        let event_tx = dispatcher.event_sender();
        Ok(Self {
            dispatcher,
            channel,
            policy: config.unreachable_policy,
            inter_attempt_delay: config.dispatch.inter_attempt_delay,
            contacts_path: config.contacts_path.clone(),
            event_tx,
        })
    }

    /// Subscribe to lifecycle events for the whole run
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.dispatcher.subscribe()
    }

    fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Load the configured contact list and run the batch over it
    pub async fn run_contacts(&self) -> Result<BatchSummary> {
        let contacts = ContactList::load(&self.contacts_path).await?;
        self.run(contacts.numbers()).await
    }

    /// Run the batch over an ordered sequence of raw numbers
    ///
    /// Probes the channel first; on probe failure the configured
    /// [`UnreachablePolicy`] decides between aborting with a zero summary
    /// (default) and proceeding anyway. Dispatches strictly in order with the
    /// configured inter-attempt delay, continuing past per-number failures.
    /// Only [`Error::Unreachable`] aborts the remainder.
    pub async fn run<I, S>(&self, numbers: I) -> Result<BatchSummary>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut summary = BatchSummary::default();

        if let Err(e) = self.channel.probe().await {
            tracing::warn!(error = %e, "channel reachability probe failed");
            self.emit(Event::ProbeFailed {
                error: e.to_string(),
            });
            match self.policy {
                UnreachablePolicy::Abort => {
                    tracing::error!("aborting batch before the first dispatch");
                    summary.aborted = true;
                    self.emit(Event::BatchComplete { summary });
                    return Ok(summary);
                }
                UnreachablePolicy::Proceed => {
                    tracing::warn!("proceeding despite failed probe");
                }
            }
        }

        for raw in numbers {
            let raw = raw.as_ref();
            match self.dispatcher.dispatch(raw).await {
                Ok(attempt) if !attempt.number.valid => summary.skipped_invalid += 1,
                Ok(attempt) if attempt.status == AttemptStatus::Ended => summary.ended += 1,
                Ok(_) => summary.failed += 1,
                Err(Error::Unreachable(reason)) => {
                    // The failed attempt was already logged by the dispatcher
                    summary.failed += 1;
                    summary.aborted = true;
                    tracing::error!(error = %reason, "channel unreachable, aborting remainder of batch");
                    self.emit(Event::BatchAborted { error: reason });
                    break;
                }
                Err(e) => {
                    // Log I/O failure: outcome records can no longer be
                    // trusted, so stop, but still signal the run's end
                    summary.aborted = true;
                    tracing::error!(error = %e, "batch halted by dispatch error");
                    self.emit(Event::BatchComplete { summary });
                    return Err(e);
                }
            }

            tokio::time::sleep(self.inter_attempt_delay).await;
        }

        tracing::info!(
            ended = summary.ended,
            failed = summary.failed,
            skipped_invalid = summary.skipped_invalid,
            aborted = summary.aborted,
            "batch complete"
        );
        self.emit(Event::BatchComplete { summary });
        Ok(summary)
    }
}
