// SPDX-License-Identifier: GPL-3.0-only
//! Asynchronous device notifications and their subscriber registry.
//!
//! Notifications arrive on the transport's delivery thread, independent
//! of any outstanding command. Subscribers are called on that thread, so
//! callbacks must not issue new commands synchronously or they can
//! deadlock against the command lock.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::display::{ModeGroup, PreferredMode, SdtvAspect, SdtvMode};
use crate::error::{Result, TvError};

/// Fixed number of subscriber slots.
pub const MAX_SUBSCRIBERS: usize = 8;

/// Something the device announced on its own initiative.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Notification {
    /// HDMI cable pulled; output forced off.
    HdmiUnplugged,
    /// HDMI cable present; display powered down.
    HdmiAttached { preferred: Option<PreferredMode> },
    /// Output is up in DVI signalling.
    DviActive { group: ModeGroup, code: u32 },
    /// Output is up in HDMI signalling.
    HdmiActive { group: ModeGroup, code: u32 },
    /// HDCP authentication dropped; `retrying` when the device will try
    /// again on its own.
    HdcpUnauthorized { retrying: bool },
    /// Link is HDCP protected.
    HdcpAuthenticated,
    HdcpKeyDownloaded { ok: bool },
    HdcpSrmDownloaded { keys: u32 },
    /// A mode switch is in flight; a terminal notification follows.
    ChangingMode,
    SdtvAttached,
    SdtvUnplugged,
    SdtvActive { mode: SdtvMode, aspect: SdtvAspect },
    SdtvCopyProtectChanged { enabled: bool },
}

impl Notification {
    /// Stable reason name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Notification::HdmiUnplugged => "hdmi_unplugged",
            Notification::HdmiAttached { .. } => "hdmi_attached",
            Notification::DviActive { .. } => "dvi_active",
            Notification::HdmiActive { .. } => "hdmi_active",
            Notification::HdcpUnauthorized { .. } => "hdcp_unauthorized",
            Notification::HdcpAuthenticated => "hdcp_authenticated",
            Notification::HdcpKeyDownloaded { .. } => "hdcp_key_downloaded",
            Notification::HdcpSrmDownloaded { .. } => "hdcp_srm_downloaded",
            Notification::ChangingMode => "changing_mode",
            Notification::SdtvAttached => "sdtv_attached",
            Notification::SdtvUnplugged => "sdtv_unplugged",
            Notification::SdtvActive { .. } => "sdtv_active",
            Notification::SdtvCopyProtectChanged { .. } => "sdtv_copy_protect",
        }
    }
}

/// Subscriber callback: opaque context word plus the notification.
pub type NotifyFn = Arc<dyn Fn(usize, &Notification) + Send + Sync>;

struct Subscriber {
    callback: NotifyFn,
    context: usize,
}

/// Bounded fan-out registry for [`Notification`]s.
///
/// Registration is first-free-slot; a full registry is an error rather
/// than a silent overwrite.
pub struct NotificationDispatcher {
    slots: Mutex<[Option<Subscriber>; MAX_SUBSCRIBERS]>,
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        NotificationDispatcher {
            slots: Mutex::new(std::array::from_fn(|_| None)),
        }
    }

    /// Add a subscriber. The same callback may be registered more than
    /// once with different context words.
    pub fn register(&self, callback: NotifyFn, context: usize) -> Result<()> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let free = slots
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or(TvError::RegistryFull)?;
        *free = Some(Subscriber { callback, context });
        Ok(())
    }

    /// Remove every registration of `callback`, regardless of context.
    /// Returns how many slots were cleared.
    pub fn unregister(&self, callback: &NotifyFn) -> usize {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let mut cleared = 0;
        for slot in slots.iter_mut() {
            if let Some(sub) = slot {
                if Arc::ptr_eq(&sub.callback, callback) {
                    *slot = None;
                    cleared += 1;
                }
            }
        }
        cleared
    }

    /// Remove only registrations matching both `callback` and `context`.
    pub fn unregister_exact(&self, callback: &NotifyFn, context: usize) -> usize {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let mut cleared = 0;
        for slot in slots.iter_mut() {
            if let Some(sub) = slot {
                if Arc::ptr_eq(&sub.callback, callback) && sub.context == context {
                    *slot = None;
                    cleared += 1;
                }
            }
        }
        cleared
    }

    pub fn subscriber_count(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.iter().filter(|s| s.is_some()).count()
    }

    /// Deliver to all current subscribers. Callbacks run outside the
    /// slot lock so a callback may (un)register without deadlocking.
    pub fn dispatch(&self, notification: &Notification) {
        let targets: Vec<(NotifyFn, usize)> = {
            let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots
                .iter()
                .flatten()
                .map(|sub| (Arc::clone(&sub.callback), sub.context))
                .collect()
        };
        if targets.is_empty() {
            debug!("notification '{}' with no subscribers", notification.name());
            return;
        }
        for (callback, context) in targets {
            callback(context, notification);
        }
    }
}
