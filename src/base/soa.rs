//! The per-zone SOA snapshot.
//!
//! The notify sender keeps a private copy of the SOA it last announced for
//! each zone so that a concurrent configuration reload cannot change a
//! campaign mid-flight. [`Soa`] is that copy: a plain value type covering
//! the SOA record data of RFC 1035, section 3.3.13, plus the record's TTL.

use super::wire::{PacketBuf, ShortBuf};
use crate::base::name::ZoneName;

//------------ Soa -----------------------------------------------------------

/// SOA record data together with the record's TTL.
///
/// A zone's serial of zero is treated as "no SOA known yet": the NOTIFY
/// message for such a zone carries no answer record.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Soa {
    mname: ZoneName,
    rname: ZoneName,
    serial: u32,
    refresh: u32,
    retry: u32,
    expire: u32,
    minimum: u32,
    ttl: u32,
}

impl Soa {
    /// Creates new SOA data from its content.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mname: ZoneName,
        rname: ZoneName,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
        ttl: u32,
    ) -> Self {
        Soa {
            mname,
            rname,
            serial,
            refresh,
            retry,
            expire,
            minimum,
            ttl,
        }
    }

    /// The primary name server for the zone.
    pub fn mname(&self) -> &ZoneName {
        &self.mname
    }

    /// The mailbox of the person responsible for the zone.
    pub fn rname(&self) -> &ZoneName {
        &self.rname
    }

    /// The serial number of the zone.
    pub fn serial(&self) -> u32 {
        self.serial
    }

    /// The time interval in seconds before the zone should be refreshed.
    pub fn refresh(&self) -> u32 {
        self.refresh
    }

    /// The time interval in seconds before a failed refresh is retried.
    pub fn retry(&self) -> u32 {
        self.retry
    }

    /// The upper limit in seconds before the zone loses authority.
    pub fn expire(&self) -> u32 {
        self.expire
    }

    /// The minimum TTL field of the SOA record.
    pub fn minimum(&self) -> u32 {
        self.minimum
    }

    /// The TTL of the SOA record itself.
    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    /// Appends the record data – not the full record – to a buffer.
    pub fn compose_rdata(
        &self,
        target: &mut PacketBuf,
    ) -> Result<(), ShortBuf> {
        self.mname.compose(target)?;
        self.rname.compose(target)?;
        target.write_u32(self.serial)?;
        target.write_u32(self.refresh)?;
        target.write_u32(self.retry)?;
        target.write_u32(self.expire)?;
        target.write_u32(self.minimum)
    }
}
