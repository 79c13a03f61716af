//! Call channel abstraction
//!
//! A channel is the mechanism that actually places a call on behalf of this
//! system. Two variants exist: [`LocalChannel`] drives the device directly
//! over its shell, [`RemoteChannel`] fires a webhook at a third-party
//! automation service. Channel selection is a construction-time choice; the
//! dispatcher is written once against this trait.
//!
//! A channel cannot observe device call state. `Ok(())` from any operation
//! means "the command executed without transport error", never "a call is
//! confirmed active/ended". That distinction is inherent to the domain.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::ChannelKind;

/// Local (device-shell) channel
pub mod local;
/// Remote (webhook) channel
pub mod remote;

pub use local::{CommandExecutor, CommandOutput, LocalChannel, ShellExecutor};
pub use remote::RemoteChannel;

/// Capability set shared by both channel variants
#[async_trait]
pub trait CallChannel: Send + Sync {
    /// Which variant this channel is
    fn kind(&self) -> ChannelKind;

    /// Place a call to the canonical number
    ///
    /// Returns `Ok(())` once the command/trigger was accepted; this does not
    /// confirm the call connected on-device.
    async fn initiate(&self, canonical: &str) -> Result<()>;

    /// Whether this channel can end a call it initiated
    ///
    /// Checked once by the dispatcher at construction; a channel without
    /// terminate support relies on calls ending on their own after the hold
    /// window.
    fn supports_terminate(&self) -> bool {
        false
    }

    /// End the current call
    ///
    /// Default implementation for channels without terminate support.
    async fn terminate(&self) -> Result<()> {
        Err(Error::NotSupported(format!(
            "{} channel cannot terminate calls",
            self.kind()
        )))
    }

    /// Reachability check run before the first dispatch of a batch
    async fn probe(&self) -> Result<()>;
}
