//! Per-zone notify configuration.

use std::net::SocketAddr;
use std::sync::Arc;
use crate::tsig::Key;

//------------ NotifyTarget --------------------------------------------------

/// One secondary server to be notified of zone changes.
#[derive(Clone, Debug)]
pub struct NotifyTarget {
    /// The address NOTIFY messages are sent to.
    addr: SocketAddr,

    /// The key messages to this target are signed with, if any.
    key: Option<Arc<Key>>,
}

impl NotifyTarget {
    /// Creates a target that receives unsigned NOTIFY messages.
    pub fn new(addr: SocketAddr) -> Self {
        NotifyTarget { addr, key: None }
    }

    /// Creates a target whose NOTIFY messages are signed with `key`.
    pub fn with_key(addr: SocketAddr, key: Arc<Key>) -> Self {
        NotifyTarget {
            addr,
            key: Some(key),
        }
    }

    /// Returns the address of the target.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the signing key of the target, if it has one.
    pub fn key(&self) -> Option<&Arc<Key>> {
        self.key.as_ref()
    }
}

//------------ ZoneNotifyConfig ----------------------------------------------

/// The notify configuration of a single zone.
///
/// The target list is immutable for the lifetime of the config; a
/// configuration reload replaces the whole value through re-registration.
#[derive(Clone, Debug)]
pub struct ZoneNotifyConfig {
    /// Whether notifying is enabled at all for this zone.
    enabled: bool,

    /// The secondaries to notify, in the order they are tried.
    targets: Vec<NotifyTarget>,
}

impl ZoneNotifyConfig {
    /// Creates a config that notifies the given targets in order.
    pub fn new(targets: Vec<NotifyTarget>) -> Self {
        ZoneNotifyConfig {
            enabled: true,
            targets,
        }
    }

    /// Creates a config for a zone that never sends NOTIFY.
    pub fn disabled() -> Self {
        ZoneNotifyConfig {
            enabled: false,
            targets: Vec::new(),
        }
    }

    /// Returns whether this zone sends NOTIFY at all.
    ///
    /// A zone with an empty target list is treated the same as a disabled
    /// one: campaigns for it are no-ops.
    pub fn notify_enabled(&self) -> bool {
        self.enabled && !self.targets.is_empty()
    }

    /// Returns the ordered list of targets.
    pub fn targets(&self) -> &[NotifyTarget] {
        &self.targets
    }
}
