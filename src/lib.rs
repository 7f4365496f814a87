// SPDX-License-Identifier: GPL-3.0-only
//! Host-side power and mode control for a TV/HDMI output driven by a
//! companion video device.
//!
//! The device is reached through a [`transport::Transport`]: one command
//! in flight at a time, one reply per command, plus an independent stream
//! of asynchronous notifications. [`client::TvClient`] layers the control
//! operations on top: display-state queries, mode enumeration, the
//! power-on negotiation paths, EDID retrieval and audio capability
//! probing.

#[macro_use]
extern crate tracing;

pub mod audio;
pub mod client;
pub mod display;
pub mod edid;
pub mod error;
pub mod notify;
pub mod protocol;
pub mod transport;

pub use client::TvClient;
pub use error::{Result, TvError};
