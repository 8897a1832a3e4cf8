//! Sending DNS NOTIFY for authoritative name servers.
//!
//! This crate implements the notify side of [RFC 1996]: whenever one of
//! an authoritative server's zones changes its serial number, each of the
//! zone's configured secondaries is sent a NOTIFY query and chased with
//! retries on a fixed interval until it acknowledges or its retry budget
//! runs out, at which point the next secondary is tried. Campaigns for
//! different zones run independently and none of this ever blocks: the
//! whole subsystem is a set of small per-zone state machines driven by
//! socket-readiness and timeout events.
//!
//! The crate is structured as follows:
//!
//! * [base] holds the fundamental DNS types the subsystem needs: names,
//!   the SOA snapshot, IANA values, and the scratch packet buffer.
//! * [notify] holds the subsystem proper: per-zone configuration and
//!   state, the campaign-driving [`Notifier`][notify::Notifier], and –
//!   behind the default-on `net` feature – the tokio event loop that
//!   drives it against real UDP sockets.
//! * [tsig] signs NOTIFY requests to targets configured with a shared
//!   secret.
//!
//! The embedding server registers every zone once at configuration load,
//! then reports serial changes either by calling
//! [`Notifier::start_campaign`][notify::Notifier::start_campaign]
//! directly or by sending a
//! [`NotifyCommand`][notify::net::NotifyCommand] to a running
//! [`NotifyRunner`][notify::net::NotifyRunner].
//!
//! [RFC 1996]: https://tools.ietf.org/html/rfc1996

#![warn(missing_docs)]

pub mod base;
pub mod notify;
pub mod tsig;
