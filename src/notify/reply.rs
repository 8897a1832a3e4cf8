//! Validating NOTIFY replies.

use tracing::{info, warn};
use crate::base::iana::{Opcode, Rcode};
use crate::base::wire::{PacketBuf, HEADER_LEN};
use super::registry::NotifyState;

//------------ ReplyOutcome --------------------------------------------------

/// Whether a reply acknowledges the outstanding NOTIFY.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReplyOutcome {
    /// The current target has acknowledged the notification.
    Acknowledged,

    /// The reply does not count; the campaign keeps trying.
    Rejected,
}

//------------ validate_reply ------------------------------------------------

/// Checks a received packet against the zone's outstanding NOTIFY.
///
/// The checks mirror RFC 1996 and the behavior of NSD: the reply must be a
/// NOTIFY response carrying the ID of the message last sent. A response
/// code of NOTIMP counts as an acknowledgement – a server that does not
/// implement NOTIFY at all will never answer differently, so retrying
/// against it is futile. Any other error code is logged and rejected,
/// leaving the retry schedule to run its course.
///
/// The reply's TSIG, if any, is not verified; an acknowledgement carries
/// no payload that would need protecting.
pub(super) fn validate_reply<S>(
    zone: &NotifyState<S>,
    packet: &PacketBuf,
) -> ReplyOutcome {
    if packet.len() < HEADER_LEN {
        warn!("zone {}: received short notify reply", zone.apex);
        return ReplyOutcome::Rejected;
    }
    if packet.opcode() != Opcode::Notify || !packet.qr() {
        warn!(
            "zone {}: received bad notify reply opcode/flags",
            zone.apex
        );
        return ReplyOutcome::Rejected;
    }
    if packet.id() != zone.query_id {
        warn!("zone {}: received notify-ack with bad ID", zone.apex);
        return ReplyOutcome::Rejected;
    }
    let target = match zone.current_target() {
        Some(target) => target,
        None => return ReplyOutcome::Rejected,
    };
    let rcode = packet.rcode();
    if rcode != Rcode::NoError {
        warn!(
            "zone {}: received notify response error {} from {}",
            zone.apex,
            rcode,
            target.addr()
        );
        if rcode == Rcode::NotImp {
            // RFC 1996: a NOTIMP reply means consider retries done.
            return ReplyOutcome::Acknowledged;
        }
        return ReplyOutcome::Rejected;
    }
    info!(
        "zone {}: host {} acknowledges notify",
        zone.apex,
        target.addr()
    );
    ReplyOutcome::Acknowledged
}

//============ Testing =======================================================
