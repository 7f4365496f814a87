// SPDX-License-Identifier: GPL-3.0-only
//! Transport seam between the client and a device channel
//!
//! A transport delivers one command at a time and hands back the single
//! reply, and it pushes device-initiated notifications into whatever sink
//! the client installed. Framing and serialization live entirely behind
//! this trait.

pub mod socket;

use std::sync::Arc;

use thiserror::Error;

use crate::notify::Notification;
use crate::protocol::{Reply, Request};

/// Where a transport delivers incoming notifications. Called on the
/// transport's own delivery thread.
pub type NotifySink = Arc<dyn Fn(Notification) + Send + Sync>;

/// Transport-level failures: the command may never have reached the
/// device, or the channel died before the reply came back.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to send command: {0}")]
    Send(#[source] std::io::Error),

    #[error("channel closed before reply")]
    Closed,

    #[error("failed to read reply: {0}")]
    Receive(#[source] std::io::Error),

    #[error("malformed reply frame: {0}")]
    Malformed(String),

    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A channel to the device.
///
/// Implementations must deliver at most one command at a time; the client
/// serializes calls, so `submit` is `&self` but never re-entered.
pub trait Transport: Send + Sync {
    /// Send one command and wait for its reply. For fire-and-forget
    /// requests (`expects_reply()` is false) the transport returns
    /// `Reply::Code(0)` as soon as the command is written out.
    fn submit(&self, request: Request) -> Result<Reply, TransportError>;

    /// Install the notification sink. Replaces any previous sink;
    /// notifications arriving with no sink installed are dropped.
    fn set_notify_sink(&self, sink: NotifySink);
}
