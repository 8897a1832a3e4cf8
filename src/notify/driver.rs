//! Driving notify campaigns.
//!
//! The [`Notifier`] owns the registry of per-zone notify states and runs
//! each zone's campaign: building and sending NOTIFY messages, reacting to
//! replies and timeouts, and walking the target list until every secondary
//! has acknowledged or exhausted its retries.
//!
//! The notifier itself performs no waiting. It arms a deadline and an
//! outstanding socket per zone and expects its owner – normally the
//! [`NotifyRunner`][super::net::NotifyRunner] – to call
//! [`on_event`][Notifier::on_event] whenever one of the two fires. Socket
//! creation and I/O sit behind the [`SocketProvider`] and [`NotifySocket`]
//! traits so that the state machine can be exercised without a network.

use std::io;
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use crate::base::iana::{Class, Opcode, Rtype};
use crate::base::name::ZoneName;
use crate::base::soa::Soa;
use crate::base::wire::{PacketBuf, ShortBuf, HEADER_LEN};
use crate::tsig;
use super::config::ZoneNotifyConfig;
use super::registry::{NotifyRegistry, NotifyState};
use super::reply::{validate_reply, ReplyOutcome};
use super::{NOTIFY_MAX_RETRIES, NOTIFY_RETRY_INTERVAL};

//------------ SocketProvider ------------------------------------------------

/// A source of one-shot UDP exchanges.
pub trait SocketProvider {
    /// The socket type handed out for each exchange.
    type Socket: NotifySocket;

    /// Sends `msg` to `target` from a fresh non-blocking socket.
    ///
    /// Returns the socket so the caller can wait for the reply. An error
    /// means the datagram never left this host.
    fn send(
        &mut self,
        target: SocketAddr,
        msg: &[u8],
    ) -> io::Result<Self::Socket>;
}

//------------ NotifySocket --------------------------------------------------

/// The receiving end of an outstanding NOTIFY exchange.
///
/// Dropping the socket closes it.
pub trait NotifySocket {
    /// Reads one waiting datagram into the buffer, without blocking.
    ///
    /// On success the buffer is in read mode holding the datagram and the
    /// datagram's length is returned.
    fn recv(&mut self, buf: &mut PacketBuf) -> io::Result<usize>;
}

//------------ NotifyEvent ---------------------------------------------------

/// The two things that can happen to an armed zone.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NotifyEvent {
    /// The zone's socket has a datagram waiting.
    Readable,

    /// The zone's deadline has passed.
    Timeout,
}

//------------ Notifier ------------------------------------------------------

/// The notify sender for a set of zones.
pub struct Notifier<P: SocketProvider> {
    /// The per-zone states, keyed by apex.
    registry: NotifyRegistry<P::Socket>,

    /// Where sockets come from.
    provider: P,
}

impl<P: SocketProvider> Notifier<P> {
    /// Creates a notifier drawing sockets from the given provider.
    pub fn new(provider: P) -> Self {
        Notifier {
            registry: NotifyRegistry::new(),
            provider,
        }
    }

    /// Returns the registry of per-zone states.
    pub fn registry(&self) -> &NotifyRegistry<P::Socket> {
        &self.registry
    }

    /// Registers a zone at configuration load.
    ///
    /// The optional SOA is the zone's current SOA if it is already known,
    /// as it would be for a primary zone loaded from disk. The zone starts
    /// out with no active campaign.
    ///
    /// # Panics
    ///
    /// Panics if the apex is already registered.
    pub fn register(
        &mut self,
        apex: ZoneName,
        config: ZoneNotifyConfig,
        current_soa: Option<Soa>,
    ) {
        self.registry
            .insert(NotifyState::new(apex, config, current_soa));
    }

    /// Starts (or restarts) a notify campaign for a zone.
    ///
    /// Called by the zone-update pipeline whenever the zone's serial
    /// changes. The campaign restarts from the first target with a clean
    /// retry budget; the first send happens on the next scheduling tick,
    /// no I/O is performed here.
    ///
    /// # Panics
    ///
    /// Panics if the zone is not registered – a SOA change can only ever
    /// be observed for a known zone.
    pub fn start_campaign(&mut self, apex: &ZoneName, new_soa: Soa) {
        let zone = self
            .registry
            .get_mut(apex)
            .expect("notify campaign started for unregistered zone");
        if !zone.config.notify_enabled() {
            debug!("zone {}: no notify targets, nothing to do", zone.apex);
            return;
        }
        zone.current_soa = Some(new_soa);
        zone.retry_count = 0;
        zone.notify_current = Some(0);
        zone.deadline = Some(Instant::now());
    }

    /// Handles a readiness or timeout event for one zone.
    ///
    /// This is the single entry point the event loop dispatches into; it
    /// performs the first send of a campaign as well as every retry and
    /// next-target send. The packet buffer is scratch space for this call
    /// only.
    ///
    /// # Panics
    ///
    /// Panics if the zone is not registered.
    pub fn on_event(
        &mut self,
        apex: &ZoneName,
        event: NotifyEvent,
        packet: &mut PacketBuf,
    ) {
        let zone = self
            .registry
            .get_mut(apex)
            .expect("notify event for unregistered zone");
        if !zone.is_active() {
            // A stale event for a finished campaign.
            return;
        }
        match event {
            NotifyEvent::Readable => {
                if let Some(socket) = zone.socket.as_mut() {
                    let received = socket.recv(packet);
                    match received {
                        Ok(len) if len >= HEADER_LEN => {
                            if validate_reply(zone, packet)
                                == ReplyOutcome::Acknowledged
                            {
                                Self::advance(zone);
                            }
                        }
                        Ok(len) => {
                            debug!(
                                "zone {}: dropped {} octet notify reply",
                                zone.apex, len
                            );
                        }
                        Err(err) => {
                            debug!(
                                "zone {}: failed to read notify reply: {}",
                                zone.apex, err
                            );
                        }
                    }
                }
            }
            NotifyEvent::Timeout => {
                debug!("zone {}: notify timeout", zone.apex);
                // Only an actual outstanding datagram consumes retry
                // budget. The first tick of a campaign and ticks after a
                // failed local send have no socket and resend for free.
                if zone.socket.is_some() {
                    zone.retry_count += 1;
                    if zone.retry_count > NOTIFY_MAX_RETRIES {
                        let addr = zone
                            .current_target()
                            .map(|target| target.addr());
                        match addr {
                            Some(addr) => warn!(
                                "zone {}: max notify send count reached, \
                                 {} unreachable",
                                zone.apex, addr
                            ),
                            None => warn!(
                                "zone {}: max notify send count reached",
                                zone.apex
                            ),
                        }
                        Self::advance(zone);
                    }
                }
            }
        }
        // The campaign may just have advanced or finished; if a target is
        // still current, this send covers first sends, retries, and
        // next-target sends alike.
        if zone.is_active() {
            Self::send_zone(&mut self.provider, zone, packet);
        }
    }

    /// Closes every open notify socket.
    ///
    /// Called at process termination. Idempotent; campaign positions are
    /// left untouched.
    pub fn shutdown(&mut self) {
        for zone in self.registry.iter_mut() {
            if zone.socket.take().is_some() {
                debug!("zone {}: closed notify socket", zone.apex);
            }
        }
    }

    /// Moves a zone on to its next target.
    fn advance(zone: &mut NotifyState<P::Socket>) {
        zone.retry_count = 0;
        let next = zone.notify_current.map(|idx| idx + 1);
        match next {
            Some(idx) if idx < zone.config.targets().len() => {
                zone.notify_current = Some(idx);
            }
            _ => {
                info!(
                    "zone {}: no more notify targets, stopping notify",
                    zone.apex
                );
                zone.disable();
            }
        }
    }

    /// Builds and sends the NOTIFY for the zone's current target.
    ///
    /// Closes any previous socket first: a zone never has more than one
    /// exchange outstanding. The deadline is armed unconditionally, so a
    /// failed local send simply comes around again on the next timeout
    /// tick.
    fn send_zone(
        provider: &mut P,
        zone: &mut NotifyState<P::Socket>,
        packet: &mut PacketBuf,
    ) {
        let current = match zone.notify_current {
            Some(current) => current,
            None => return,
        };
        zone.socket = None;
        zone.deadline = Some(Instant::now() + NOTIFY_RETRY_INTERVAL);
        let addr = match zone.config.targets().get(current) {
            Some(target) => target.addr(),
            None => {
                // The target list shrank under a reload; treat it as
                // running off the end of the list.
                zone.disable();
                return;
            }
        };
        let query_id = rand::random::<u16>();
        if let Err(err) = Self::build_message(zone, packet, query_id) {
            error!(
                "zone {}: could not build notify message: {}",
                zone.apex, err
            );
            return;
        }
        packet.flip();
        match provider.send(addr, packet.as_slice()) {
            Ok(socket) => {
                zone.socket = Some(socket);
                info!(
                    "zone {}: sent notify #{} to {}",
                    zone.apex, zone.retry_count, addr
                );
            }
            Err(err) => {
                error!(
                    "zone {}: could not send notify #{} to {}: {}",
                    zone.apex, zone.retry_count, addr, err
                );
            }
        }
    }

    /// Builds the NOTIFY message into the packet buffer.
    ///
    /// Leaves the buffer in write mode; the caller flips it.
    fn build_message(
        zone: &mut NotifyState<P::Socket>,
        packet: &mut PacketBuf,
        query_id: u16,
    ) -> Result<(), ShortBuf> {
        packet.start_query(&zone.apex, Rtype::SOA, Class::IN)?;
        packet.set_id(query_id);
        zone.query_id = query_id;
        packet.set_opcode(Opcode::Notify);
        packet.set_aa(true);
        if let Some(soa) = zone
            .current_soa
            .as_ref()
            .filter(|soa| soa.serial() != 0)
        {
            packet.push_soa(&zone.apex, soa)?;
        }
        let key = match zone.notify_current {
            Some(idx) => zone
                .config
                .targets()
                .get(idx)
                .and_then(|target| target.key())
                .cloned(),
            None => None,
        };
        if let Some(key) = key {
            tsig::sign_request(packet, &mut zone.signing, &key)?;
        }
        Ok(())
    }
}

/// # Scheduling Information
///
/// The event loop uses these to decide what to wait for. They never mutate
/// campaign state.
impl<P: SocketProvider> Notifier<P> {
    /// Returns whether the zone has a campaign in flight.
    pub fn is_active(&self, apex: &ZoneName) -> bool {
        self.registry
            .get(apex)
            .map(NotifyState::is_active)
            .unwrap_or(false)
    }

    /// Returns the apexes of all active zones whose deadline has passed.
    pub fn due_zones(&self, now: Instant) -> Vec<ZoneName> {
        self.registry
            .iter()
            .filter(|zone| {
                zone.is_active()
                    && zone.deadline().map_or(false, |at| at <= now)
            })
            .map(|zone| zone.apex().clone())
            .collect()
    }

    /// Returns the earliest armed deadline across all zones.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.registry
            .iter()
            .filter(|zone| zone.is_active())
            .filter_map(NotifyState::deadline)
            .min()
    }

    /// Returns the sockets of all zones with an exchange outstanding.
    pub fn armed_sockets(&self) -> Vec<(ZoneName, P::Socket)>
    where
        P::Socket: Clone,
    {
        self.registry
            .iter()
            .filter(|zone| zone.is_active())
            .filter_map(|zone| {
                zone.socket
                    .as_ref()
                    .map(|socket| (zone.apex.clone(), socket.clone()))
            })
            .collect()
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;
    use crate::notify::config::NotifyTarget;
    use crate::tsig::{Algorithm, Key};

    //-------- Mock network --------------------------------------------------

    #[derive(Default)]
    struct MockNet {
        sent: Vec<(SocketAddr, Vec<u8>)>,
        reply: Option<Vec<u8>>,
        fail_send: bool,
    }

    struct MockProvider {
        net: Rc<RefCell<MockNet>>,
    }

    #[derive(Clone)]
    struct MockSocket {
        net: Rc<RefCell<MockNet>>,
    }

    impl SocketProvider for MockProvider {
        type Socket = MockSocket;

        fn send(
            &mut self,
            target: SocketAddr,
            msg: &[u8],
        ) -> io::Result<MockSocket> {
            let mut net = self.net.borrow_mut();
            if net.fail_send {
                return Err(io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    "out of sockets",
                ));
            }
            net.sent.push((target, msg.to_vec()));
            Ok(MockSocket {
                net: self.net.clone(),
            })
        }
    }

    impl NotifySocket for MockSocket {
        fn recv(&mut self, buf: &mut PacketBuf) -> io::Result<usize> {
            match self.net.borrow_mut().reply.take() {
                Some(data) => buf.fill(|space| {
                    space[..data.len()].copy_from_slice(&data);
                    Ok(data.len())
                }),
                None => Err(io::Error::new(
                    io::ErrorKind::WouldBlock,
                    "no datagram waiting",
                )),
            }
        }
    }

    //-------- Helpers -------------------------------------------------------

    fn target_addr(idx: usize) -> SocketAddr {
        format!("192.0.2.{}:53", idx + 1).parse().unwrap()
    }

    fn setup(
        num_targets: usize,
    ) -> (Notifier<MockProvider>, ZoneName, Rc<RefCell<MockNet>>) {
        let net = Rc::new(RefCell::new(MockNet::default()));
        let mut notifier = Notifier::new(MockProvider { net: net.clone() });
        let apex: ZoneName = "example.com".parse().unwrap();
        let targets =
            (0..num_targets).map(|idx| NotifyTarget::new(target_addr(idx)));
        notifier.register(
            apex.clone(),
            ZoneNotifyConfig::new(targets.collect()),
            None,
        );
        (notifier, apex, net)
    }

    fn soa(serial: u32) -> Soa {
        Soa::new(
            "ns1.example.com".parse().unwrap(),
            "hostmaster.example.com".parse().unwrap(),
            serial,
            3600,
            300,
            86400,
            60,
            3600,
        )
    }

    fn timeout(
        notifier: &mut Notifier<MockProvider>,
        apex: &ZoneName,
        packet: &mut PacketBuf,
    ) {
        notifier.on_event(apex, NotifyEvent::Timeout, packet);
    }

    /// Builds a minimal reply header matching the given sent message.
    fn reply_for(sent: &[u8], rcode: u8) -> Vec<u8> {
        let mut reply = vec![0u8; HEADER_LEN];
        reply[..2].copy_from_slice(&sent[..2]);
        reply[2] = 0x80 | (4 << 3) | 0x04;
        reply[3] = rcode;
        reply
    }

    fn inject_reply(net: &Rc<RefCell<MockNet>>, reply: Vec<u8>) {
        net.borrow_mut().reply = Some(reply);
    }

    fn last_sent(net: &Rc<RefCell<MockNet>>) -> (SocketAddr, Vec<u8>) {
        net.borrow().sent.last().cloned().unwrap()
    }

    //-------- Tests ---------------------------------------------------------

    #[test]
    fn bounded_retries_then_disabled() {
        let (mut notifier, apex, net) = setup(2);
        let mut packet = PacketBuf::new();
        notifier.start_campaign(&apex, soa(5));

        // Per target: one free first send plus five retry sends, then the
        // sixth timeout advances. The advancing tick also performs the
        // next target's first send.
        for _ in 0..13 {
            assert!(notifier.is_active(&apex));
            timeout(&mut notifier, &apex, &mut packet);
        }
        assert!(!notifier.is_active(&apex));

        let net = net.borrow();
        assert_eq!(net.sent.len(), 12);
        let to_first =
            net.sent.iter().filter(|(addr, _)| *addr == target_addr(0));
        let to_second =
            net.sent.iter().filter(|(addr, _)| *addr == target_addr(1));
        assert_eq!(to_first.count(), 6);
        assert_eq!(to_second.count(), 6);
    }

    #[test]
    fn ack_advances_to_next_target() {
        let (mut notifier, apex, net) = setup(2);
        let mut packet = PacketBuf::new();
        notifier.start_campaign(&apex, soa(5));
        timeout(&mut notifier, &apex, &mut packet);

        let (addr, sent) = last_sent(&net);
        assert_eq!(addr, target_addr(0));
        inject_reply(&net, reply_for(&sent, 0));
        notifier.on_event(&apex, NotifyEvent::Readable, &mut packet);

        // Advanced to the second target and immediately sent to it.
        let (addr, _) = last_sent(&net);
        assert_eq!(addr, target_addr(1));
        assert_eq!(net.borrow().sent.len(), 2);
        assert!(notifier.is_active(&apex));
        let zone = notifier.registry().get(&apex).unwrap();
        assert_eq!(zone.retry_count(), 0);
    }

    #[test]
    fn ack_short_circuits_remaining_retries() {
        let (mut notifier, apex, net) = setup(1);
        let mut packet = PacketBuf::new();
        notifier.start_campaign(&apex, soa(5));
        for _ in 0..3 {
            timeout(&mut notifier, &apex, &mut packet);
        }
        let (_, sent) = last_sent(&net);
        inject_reply(&net, reply_for(&sent, 0));
        notifier.on_event(&apex, NotifyEvent::Readable, &mut packet);

        // Only target acknowledged: campaign over, retry budget unused.
        assert!(!notifier.is_active(&apex));
        assert_eq!(net.borrow().sent.len(), 3);
    }

    #[test]
    fn bad_id_is_ignored() {
        let (mut notifier, apex, net) = setup(2);
        let mut packet = PacketBuf::new();
        notifier.start_campaign(&apex, soa(5));
        timeout(&mut notifier, &apex, &mut packet);

        let (_, sent) = last_sent(&net);
        let mut reply = reply_for(&sent, 0);
        reply[0] ^= 0xFF;
        inject_reply(&net, reply);
        notifier.on_event(&apex, NotifyEvent::Readable, &mut packet);

        // No advancement, but the tick resent to the same target.
        let (addr, _) = last_sent(&net);
        assert_eq!(addr, target_addr(0));
        assert_eq!(net.borrow().sent.len(), 2);
        assert!(notifier.is_active(&apex));
    }

    #[test]
    fn notimp_counts_as_ack() {
        let (mut notifier, apex, net) = setup(2);
        let mut packet = PacketBuf::new();
        notifier.start_campaign(&apex, soa(5));
        timeout(&mut notifier, &apex, &mut packet);

        let (_, sent) = last_sent(&net);
        inject_reply(&net, reply_for(&sent, 4));
        notifier.on_event(&apex, NotifyEvent::Readable, &mut packet);

        let (addr, _) = last_sent(&net);
        assert_eq!(addr, target_addr(1));
    }

    #[test]
    fn zero_targets_is_a_noop() {
        let (mut notifier, apex, net) = setup(0);
        notifier.start_campaign(&apex, soa(5));
        assert!(!notifier.is_active(&apex));
        assert!(notifier.due_zones(Instant::now()).is_empty());
        assert!(net.borrow().sent.is_empty());
    }

    #[test]
    fn restart_resets_progress() {
        let (mut notifier, apex, net) = setup(2);
        let mut packet = PacketBuf::new();
        notifier.start_campaign(&apex, soa(5));
        // Exhaust the first target so the campaign sits on the second.
        for _ in 0..7 {
            timeout(&mut notifier, &apex, &mut packet);
        }
        let (addr, _) = last_sent(&net);
        assert_eq!(addr, target_addr(1));

        notifier.start_campaign(&apex, soa(6));
        let zone = notifier.registry().get(&apex).unwrap();
        assert_eq!(zone.retry_count(), 0);
        timeout(&mut notifier, &apex, &mut packet);
        let (addr, _) = last_sent(&net);
        assert_eq!(addr, target_addr(0));
    }

    #[test]
    fn send_failure_spends_no_retry_budget() {
        let (mut notifier, apex, net) = setup(1);
        let mut packet = PacketBuf::new();
        net.borrow_mut().fail_send = true;
        notifier.start_campaign(&apex, soa(5));
        for _ in 0..10 {
            timeout(&mut notifier, &apex, &mut packet);
        }
        // Still trying the first target, budget untouched.
        assert!(notifier.is_active(&apex));
        let zone = notifier.registry().get(&apex).unwrap();
        assert_eq!(zone.retry_count(), 0);
        assert!(net.borrow().sent.is_empty());

        net.borrow_mut().fail_send = false;
        timeout(&mut notifier, &apex, &mut packet);
        assert_eq!(net.borrow().sent.len(), 1);
        assert!(notifier.is_active(&apex));
    }

    #[test]
    fn soa_included_only_when_serial_known() {
        let (mut notifier, apex, net) = setup(1);
        let mut packet = PacketBuf::new();
        notifier.start_campaign(&apex, soa(0));
        timeout(&mut notifier, &apex, &mut packet);
        let (_, sent) = last_sent(&net);
        assert_eq!(u16::from_be_bytes([sent[6], sent[7]]), 0);

        notifier.start_campaign(&apex, soa(5));
        timeout(&mut notifier, &apex, &mut packet);
        let (_, sent) = last_sent(&net);
        assert_eq!(u16::from_be_bytes([sent[6], sent[7]]), 1);
        // Fresh ID for every message sent.
        assert_eq!(
            u16::from_be_bytes([sent[0], sent[1]]),
            notifier.registry().get(&apex).unwrap().query_id()
        );
    }

    #[test]
    fn notify_message_shape() {
        let (mut notifier, apex, net) = setup(1);
        let mut packet = PacketBuf::new();
        notifier.start_campaign(&apex, soa(5));
        timeout(&mut notifier, &apex, &mut packet);

        let (_, sent) = last_sent(&net);
        // NOTIFY opcode, query, AA set.
        assert_eq!((sent[2] >> 3) & 0x0F, 4);
        assert_eq!(sent[2] & 0x80, 0);
        assert_eq!(sent[2] & 0x04, 0x04);
        // One SOA question for the apex.
        assert_eq!(u16::from_be_bytes([sent[4], sent[5]]), 1);
        assert_eq!(
            &sent[HEADER_LEN..HEADER_LEN + 13],
            b"\x07example\x03com\x00"
        );
        assert_eq!(&sent[HEADER_LEN + 13..HEADER_LEN + 17], &[0, 6, 0, 1]);
    }

    #[test]
    fn signed_when_target_has_key() {
        let net = Rc::new(RefCell::new(MockNet::default()));
        let mut notifier = Notifier::new(MockProvider { net: net.clone() });
        let apex: ZoneName = "example.com".parse().unwrap();
        let key = Arc::new(Key::new(
            Algorithm::Sha256,
            b"secret",
            "key.example".parse().unwrap(),
        ));
        notifier.register(
            apex.clone(),
            ZoneNotifyConfig::new(vec![NotifyTarget::with_key(
                target_addr(0),
                key,
            )]),
            None,
        );
        let mut packet = PacketBuf::new();
        notifier.start_campaign(&apex, soa(5));
        timeout(&mut notifier, &apex, &mut packet);

        let (_, sent) = last_sent(&net);
        // The TSIG record sits in the additional section.
        assert_eq!(u16::from_be_bytes([sent[10], sent[11]]), 1);
    }

    #[test]
    fn shutdown_closes_sockets_idempotently() {
        let (mut notifier, apex, _net) = setup(1);
        let mut packet = PacketBuf::new();
        notifier.start_campaign(&apex, soa(5));
        timeout(&mut notifier, &apex, &mut packet);
        assert!(!notifier.armed_sockets().is_empty());

        notifier.shutdown();
        assert!(notifier.armed_sockets().is_empty());
        notifier.shutdown();
        assert!(notifier.armed_sockets().is_empty());
    }

    #[test]
    #[should_panic(expected = "unregistered zone")]
    fn campaign_for_unknown_zone_panics() {
        let (mut notifier, _, _) = setup(1);
        let other: ZoneName = "example.net".parse().unwrap();
        notifier.start_campaign(&other, soa(1));
    }
}
