//! Sending NOTIFY to secondary servers.
//!
//! When a zone's serial number changes, an authoritative server informs
//! the zone's configured secondaries by sending each a DNS NOTIFY query as
//! defined in [RFC 1996], waiting for an acknowledgement and retrying on a
//! fixed interval up to a bound before moving on to the next secondary.
//! This module implements that broadcast: a bounded fire-and-forget
//! mechanism, not reliable delivery.
//!
//! The moving parts are:
//!
//! * [`ZoneNotifyConfig`] and [`NotifyTarget`] describe whom to notify;
//! * [`NotifyRegistry`] holds one [`NotifyState`] per registered zone;
//! * [`Notifier`] runs the campaigns, talking to the network through the
//!   [`SocketProvider`] seam;
//! * [`NotifyRunner`] (feature `net`) is the tokio event loop that feeds
//!   the notifier with readiness and timeout events.
//!
//! [RFC 1996]: https://tools.ietf.org/html/rfc1996

pub mod config;
pub mod driver;
pub mod net;
pub mod registry;
pub mod reply;

use core::time::Duration;

pub use self::config::{NotifyTarget, ZoneNotifyConfig};
pub use self::driver::{
    Notifier, NotifyEvent, NotifySocket, SocketProvider,
};
#[cfg(feature = "net")]
pub use self::net::{NotifyCommand, NotifyRunner, UdpProvider};
pub use self::registry::{NotifyRegistry, NotifyState};
pub use self::reply::ReplyOutcome;

/// The time between two sends to the same target.
pub const NOTIFY_RETRY_INTERVAL: Duration = Duration::from_secs(15);

/// The number of timed-out sends after which a target is given up on.
///
/// Together with the initial send this makes for six attempts per target.
pub const NOTIFY_MAX_RETRIES: u32 = 5;
