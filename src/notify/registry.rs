//! The per-zone notify state and the registry holding it.

use std::collections::BTreeMap;
use std::time::Instant;
use crate::base::name::ZoneName;
use crate::base::soa::Soa;
use crate::tsig::SigningContext;
use super::config::{NotifyTarget, ZoneNotifyConfig};

//------------ NotifyState ---------------------------------------------------

/// The notify state machine of one zone.
///
/// A campaign is active exactly while [`notify_current`] holds the index
/// of the target currently being notified. The socket is tracked
/// separately: an active campaign may momentarily have no socket after a
/// failed local send, in which case the armed deadline drives a plain
/// resend.
///
/// [`notify_current`]: Self::is_active
#[derive(Debug)]
pub struct NotifyState<S> {
    /// The zone's apex name; its identity in the registry.
    pub(super) apex: ZoneName,

    /// The zone's notify configuration.
    pub(super) config: ZoneNotifyConfig,

    /// Our own copy of the SOA most recently handed to a campaign.
    pub(super) current_soa: Option<Soa>,

    /// The index of the target currently being notified.
    ///
    /// `None` means no campaign is active.
    pub(super) notify_current: Option<usize>,

    /// The number of timed-out sends against the current target.
    ///
    /// Reset to zero whenever the current target changes.
    pub(super) retry_count: u32,

    /// The ID of the last NOTIFY message actually sent.
    pub(super) query_id: u16,

    /// The socket of the outstanding exchange.
    ///
    /// Dropping the socket closes it; there is never more than one per
    /// zone.
    pub(super) socket: Option<S>,

    /// When the current attempt counts as timed out.
    pub(super) deadline: Option<Instant>,

    /// Scratch state for TSIG signing, reused across sends.
    pub(super) signing: SigningContext,
}

impl<S> NotifyState<S> {
    /// Creates the state for a freshly registered zone.
    ///
    /// The zone starts out with no active campaign.
    pub(super) fn new(
        apex: ZoneName,
        config: ZoneNotifyConfig,
        current_soa: Option<Soa>,
    ) -> Self {
        NotifyState {
            apex,
            config,
            current_soa,
            notify_current: None,
            retry_count: 0,
            query_id: 0,
            socket: None,
            deadline: None,
            signing: SigningContext::default(),
        }
    }

    /// Returns the apex name of the zone.
    pub fn apex(&self) -> &ZoneName {
        &self.apex
    }

    /// Returns whether a campaign is currently active.
    pub fn is_active(&self) -> bool {
        self.notify_current.is_some()
    }

    /// Returns the target currently being notified, if any.
    pub fn current_target(&self) -> Option<&NotifyTarget> {
        self.notify_current
            .and_then(|idx| self.config.targets().get(idx))
    }

    /// Returns the number of timed-out sends against the current target.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Returns the ID of the last sent NOTIFY message.
    pub fn query_id(&self) -> u16 {
        self.query_id
    }

    /// Returns the deadline of the current attempt, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Stops the campaign, closing the socket.
    ///
    /// Idempotent; disabling an inactive zone does nothing.
    pub(super) fn disable(&mut self) {
        self.socket = None;
        self.notify_current = None;
        self.deadline = None;
    }
}

//------------ NotifyRegistry ------------------------------------------------

/// The ordered collection of all zones' notify states.
///
/// Zones are keyed by their apex name. Insertion happens once per zone at
/// configuration load; the collection supports exact lookup and in-order
/// traversal, the latter used at shutdown to close any open sockets.
#[derive(Debug, Default)]
pub struct NotifyRegistry<S> {
    zones: BTreeMap<ZoneName, NotifyState<S>>,
}

impl<S> NotifyRegistry<S> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        NotifyRegistry {
            zones: BTreeMap::new(),
        }
    }

    /// Inserts the state of a newly registered zone.
    ///
    /// # Panics
    ///
    /// Registering the same apex twice is a programming error and panics.
    pub(super) fn insert(&mut self, state: NotifyState<S>) {
        let apex = state.apex.clone();
        if self.zones.insert(apex.clone(), state).is_some() {
            panic!("duplicate notify registration for zone {}", apex);
        }
    }

    /// Looks up the state of a zone by its exact apex name.
    pub fn get(&self, apex: &ZoneName) -> Option<&NotifyState<S>> {
        self.zones.get(apex)
    }

    /// Looks up the mutable state of a zone by its exact apex name.
    pub(super) fn get_mut(
        &mut self,
        apex: &ZoneName,
    ) -> Option<&mut NotifyState<S>> {
        self.zones.get_mut(apex)
    }

    /// Returns an iterator over all zones in apex order.
    pub fn iter(&self) -> impl Iterator<Item = &NotifyState<S>> {
        self.zones.values()
    }

    /// Returns a mutable iterator over all zones in apex order.
    pub(super) fn iter_mut(
        &mut self,
    ) -> impl Iterator<Item = &mut NotifyState<S>> {
        self.zones.values_mut()
    }

    /// Returns the number of registered zones.
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Returns whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

//============ Testing =======================================================
