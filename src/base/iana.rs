//! IANA DNS parameter values used by the notify subsystem.
//!
//! Only the values this crate actually touches are given names; everything
//! else is carried as its raw integer so that unknown values survive a
//! round trip through a message unharmed.

use core::fmt;

//------------ Opcode --------------------------------------------------------

/// DNS OpCodes.
///
/// The opcode specifies the kind of query to be performed. The initial set
/// of values is defined in [RFC 1035]; the NOTIFY opcode was added by
/// [RFC 1996].
///
/// [RFC 1035]: https://tools.ietf.org/html/rfc1035
/// [RFC 1996]: https://tools.ietf.org/html/rfc1996
#[derive(Clone, Copy, Debug)]
pub enum Opcode {
    /// A standard query (0).
    Query,

    /// A NOTIFY query (4).
    ///
    /// NOTIFY queries allow primary servers to inform secondary servers
    /// when a zone has changed.
    Notify,

    /// Any other opcode.
    Int(u8),
}

impl Opcode {
    /// Creates an opcode from its integer value.
    ///
    /// Only the lower four bits are considered.
    pub fn from_int(value: u8) -> Self {
        match value & 0x0F {
            0 => Opcode::Query,
            4 => Opcode::Notify,
            value => Opcode::Int(value),
        }
    }

    /// Returns the integer value of the opcode.
    pub fn to_int(self) -> u8 {
        match self {
            Opcode::Query => 0,
            Opcode::Notify => 4,
            Opcode::Int(value) => value & 0x0F,
        }
    }
}

//--- PartialEq and Eq

impl PartialEq for Opcode {
    fn eq(&self, other: &Self) -> bool {
        self.to_int() == other.to_int()
    }
}

impl Eq for Opcode {}

//--- Display

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Opcode::Query => f.write_str("QUERY"),
            Opcode::Notify => f.write_str("NOTIFY"),
            Opcode::Int(value) => write!(f, "OPCODE{}", value),
        }
    }
}

//------------ Rcode ---------------------------------------------------------

/// DNS response codes.
///
/// The response code of a reply indicates what happened at the server when
/// processing the query. The four bit header variant represented here is
/// defined in [RFC 1035].
///
/// [RFC 1035]: https://tools.ietf.org/html/rfc1035
#[derive(Clone, Copy, Debug)]
pub enum Rcode {
    /// No error condition (0).
    NoError,

    /// Format error (1) – the server was unable to interpret the query.
    FormErr,

    /// Server failure (2).
    ServFail,

    /// Name error (3) – the queried name does not exist.
    NXDomain,

    /// Not implemented (4) – the server does not support this kind of
    /// query.
    ///
    /// For NOTIFY, [RFC 1996] instructs the sender to consider retries
    /// done when it receives this code.
    ///
    /// [RFC 1996]: https://tools.ietf.org/html/rfc1996
    NotImp,

    /// Query refused (5) – refused for policy reasons.
    Refused,

    /// Any other response code.
    Int(u8),
}

impl Rcode {
    /// Creates an rcode from its integer value.
    ///
    /// Only the lower four bits are considered.
    pub fn from_int(value: u8) -> Self {
        match value & 0x0F {
            0 => Rcode::NoError,
            1 => Rcode::FormErr,
            2 => Rcode::ServFail,
            3 => Rcode::NXDomain,
            4 => Rcode::NotImp,
            5 => Rcode::Refused,
            value => Rcode::Int(value),
        }
    }

    /// Returns the integer value of the rcode.
    pub fn to_int(self) -> u8 {
        match self {
            Rcode::NoError => 0,
            Rcode::FormErr => 1,
            Rcode::ServFail => 2,
            Rcode::NXDomain => 3,
            Rcode::NotImp => 4,
            Rcode::Refused => 5,
            Rcode::Int(value) => value & 0x0F,
        }
    }
}

//--- PartialEq and Eq

impl PartialEq for Rcode {
    fn eq(&self, other: &Self) -> bool {
        self.to_int() == other.to_int()
    }
}

impl Eq for Rcode {}

//--- Display

impl fmt::Display for Rcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Rcode::NoError => f.write_str("NOERROR"),
            Rcode::FormErr => f.write_str("FORMERR"),
            Rcode::ServFail => f.write_str("SERVFAIL"),
            Rcode::NXDomain => f.write_str("NXDOMAIN"),
            Rcode::NotImp => f.write_str("NOTIMP"),
            Rcode::Refused => f.write_str("REFUSED"),
            Rcode::Int(value) => write!(f, "RCODE{}", value),
        }
    }
}

//------------ Rtype ---------------------------------------------------------

/// DNS record types.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Rtype(u16);

impl Rtype {
    /// The start of a zone of authority (SOA) record type.
    pub const SOA: Rtype = Rtype(6);

    /// The transaction signature (TSIG) pseudo record type.
    pub const TSIG: Rtype = Rtype(250);

    /// Creates a record type from its integer value.
    pub fn from_int(value: u16) -> Self {
        Rtype(value)
    }

    /// Returns the integer value of the record type.
    pub fn to_int(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Rtype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Rtype::SOA => f.write_str("SOA"),
            Rtype::TSIG => f.write_str("TSIG"),
            Rtype(value) => write!(f, "TYPE{}", value),
        }
    }
}

//------------ Class ---------------------------------------------------------

/// DNS class values.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Class(u16);

impl Class {
    /// The Internet class (IN).
    pub const IN: Class = Class(1);

    /// The ANY query class, used as the class of TSIG records.
    pub const ANY: Class = Class(255);

    /// Creates a class from its integer value.
    pub fn from_int(value: u16) -> Self {
        Class(value)
    }

    /// Returns the integer value of the class.
    pub fn to_int(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Class::IN => f.write_str("IN"),
            Class::ANY => f.write_str("ANY"),
            Class(value) => write!(f, "CLASS{}", value),
        }
    }
}

//============ Testing =======================================================
