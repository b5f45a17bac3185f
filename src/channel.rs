//! Client communication channels
//!
//! The session core never talks to a network directly. Everything it
//! sends to a participant goes through a [`Channel`], which an embedding
//! server implements over whatever transport it uses (WebSockets,
//! server-sent events, an in-process queue in tests).

use crate::game::{SyncMessage, UpdateMessage};

/// One participant's outbound message channel
///
/// Channels are looked up on demand through finder closures
/// (`Fn(Id) -> Option<C>`), so a participant with no live connection is
/// simply skipped; the session state does not depend on delivery.
pub trait Channel {
    /// Delivers an incremental update about a change in the session
    fn send_update(&self, message: &UpdateMessage);

    /// Delivers a full view of the current state
    ///
    /// Sent when a participant connects or reconnects and needs to
    /// replace whatever stale view it holds.
    fn send_sync(&self, message: &SyncMessage);

    /// Closes the channel once the session is over
    fn close(self);
}
