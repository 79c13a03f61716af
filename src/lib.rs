//! # callout
//!
//! Outbound call and SMS dispatch library for missed-call outreach
//! automation: dial or message each number in a list, hold the call for a
//! bounded ring window, release it, and record per-number outcomes.
//!
//! ## Design Philosophy
//!
//! callout is designed to be:
//! - **Channel-agnostic** - the dispatch state machine is written once
//!   against a capability trait; device-shell and webhook channels plug in
//! - **Honest about observability** - a channel cannot see device call
//!   state, so success means "the command executed", never "the call is
//!   confirmed"
//! - **Library-first** - no CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - consumers subscribe to lifecycle events, no polling
//!   required
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use callout::{BatchRunner, Config, RemoteChannel};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         remote: callout::RemoteChannelConfig {
//!             trigger_url: Some("https://trigger.example.com/abc/call_trigger".into()),
//!             ..Default::default()
//!         },
//!         ..Default::default()
//!     };
//!
//!     let channel = Arc::new(RemoteChannel::new(&config.remote)?);
//!     let runner = BatchRunner::new(channel, &config)?;
//!
//!     // Subscribe to events
//!     let mut events = runner.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = runner.run_contacts().await?;
//!     println!(
//!         "ended: {}, failed: {}, skipped: {}",
//!         summary.ended, summary.failed, summary.skipped_invalid
//!     );
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Call channel abstraction and its two variants
pub mod channel;
/// Configuration types
pub mod config;
/// Contact list file management
pub mod contacts;
/// Per-number call lifecycle state machine
pub mod dispatcher;
/// Error types
pub mod error;
/// Phone number normalization and validation
pub mod number;
/// Append-only outcome log
pub mod outcome_log;
/// Retry logic for transient channel failures
pub mod retry;
/// Batch runner driving the dispatcher over a contact list
pub mod runner;
/// SMS dispatch
pub mod sms;
/// Core types and lifecycle events
pub mod types;

// Re-export commonly used types
pub use channel::{
    CallChannel, CommandExecutor, CommandOutput, LocalChannel, RemoteChannel, ShellExecutor,
};
pub use config::{
    Config, DispatchConfig, LocalChannelConfig, NumberFormatConfig, RemoteChannelConfig,
    RetryConfig, SmsConfig, UnreachablePolicy,
};
pub use contacts::ContactList;
pub use dispatcher::CallDispatcher;
pub use error::{Error, Result};
pub use number::{NumberFormat, PhoneNumber};
pub use outcome_log::{OutcomeLog, OutcomeRecord, OutcomeStatus};
pub use retry::{IsRetryable, call_with_retry};
pub use runner::BatchRunner;
pub use sms::SmsSender;
pub use types::{AttemptStatus, BatchSummary, CallAttempt, ChannelKind, Event};
