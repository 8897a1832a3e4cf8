//! Signing NOTIFY requests with TSIG.
//!
//! Notify targets may be configured with a shared secret. Messages to such
//! a target carry a TSIG record as defined in [RFC 2845]: an HMAC computed
//! over the whole message and a set of TSIG variables, placed in a pseudo
//! record at the end of the additional section.
//!
//! Keys are managed through the [`Key`] type which ties together the
//! secret, the algorithm it is used with, and the key's name. Only the
//! SHA based algorithms of [RFC 4635] are supported; HMAC-MD5 is
//! deliberately absent.
//!
//! Replies to NOTIFY are acknowledgements without payload, so their
//! signatures are not verified – as a comment in NSD puts it: "could
//! check tsig, but why."
//!
//! [RFC 2845]: https://tools.ietf.org/html/rfc2845
//! [RFC 4635]: https://tools.ietf.org/html/rfc4635

use core::fmt;
use core::str::FromStr;
use ring::hmac;
use std::time::{SystemTime, UNIX_EPOCH};
use crate::base::iana::{Class, Rtype};
use crate::base::name::ZoneName;
use crate::base::wire::{PacketBuf, ShortBuf};

/// The fudge written into signed requests: how many seconds a receiver may
/// consider the signature's timestamp off from its own clock.
const TSIG_FUDGE: u16 = 300;

//------------ Algorithm -----------------------------------------------------

/// The TSIG algorithms supported by this crate.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Algorithm {
    /// HMAC-SHA1.
    Sha1,

    /// HMAC-SHA256.
    Sha256,

    /// HMAC-SHA384.
    Sha384,

    /// HMAC-SHA512.
    Sha512,
}

impl Algorithm {
    /// Returns the ring HMAC algorithm for this TSIG algorithm.
    fn into_hmac_algorithm(self) -> hmac::Algorithm {
        match self {
            Algorithm::Sha1 => hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY,
            Algorithm::Sha256 => hmac::HMAC_SHA256,
            Algorithm::Sha384 => hmac::HMAC_SHA384,
            Algorithm::Sha512 => hmac::HMAC_SHA512,
        }
    }

    /// Returns the native length of a signature created with this
    /// algorithm.
    pub fn native_len(self) -> usize {
        match self {
            Algorithm::Sha1 => 20,
            Algorithm::Sha256 => 32,
            Algorithm::Sha384 => 48,
            Algorithm::Sha512 => 64,
        }
    }

    /// The wire format of the algorithm's registered name.
    fn wire_name(self) -> &'static [u8] {
        match self {
            Algorithm::Sha1 => b"\x09hmac-sha1\x00",
            Algorithm::Sha256 => b"\x0bhmac-sha256\x00",
            Algorithm::Sha384 => b"\x0bhmac-sha384\x00",
            Algorithm::Sha512 => b"\x0bhmac-sha512\x00",
        }
    }
}

//--- FromStr

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("hmac-sha1") {
            Ok(Algorithm::Sha1)
        } else if s.eq_ignore_ascii_case("hmac-sha256") {
            Ok(Algorithm::Sha256)
        } else if s.eq_ignore_ascii_case("hmac-sha384") {
            Ok(Algorithm::Sha384)
        } else if s.eq_ignore_ascii_case("hmac-sha512") {
            Ok(Algorithm::Sha512)
        } else {
            Err(UnknownAlgorithm)
        }
    }
}

//--- Display

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Algorithm::Sha1 => "hmac-sha1",
            Algorithm::Sha256 => "hmac-sha256",
            Algorithm::Sha384 => "hmac-sha384",
            Algorithm::Sha512 => "hmac-sha512",
        })
    }
}

//------------ Key -----------------------------------------------------------

/// A key for signing NOTIFY requests.
///
/// While TSIG technically allows any secret to be used with any algorithm,
/// a `Key` ties the two together, and additionally carries the key's name
/// that identifies it to the receiver.
#[derive(Debug)]
pub struct Key {
    /// The key's bits and algorithm.
    key: hmac::Key,

    /// The name of the key as a domain name.
    name: ZoneName,

    /// The algorithm of the key.
    algorithm: Algorithm,
}

impl Key {
    /// Creates a new key from its components.
    pub fn new(algorithm: Algorithm, secret: &[u8], name: ZoneName) -> Self {
        Key {
            key: hmac::Key::new(algorithm.into_hmac_algorithm(), secret),
            name,
            algorithm,
        }
    }

    /// Returns the name of the key.
    pub fn name(&self) -> &ZoneName {
        &self.name
    }

    /// Returns the algorithm of the key.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

//------------ SigningContext ------------------------------------------------

/// Per-zone scratch state for signing.
///
/// One context lives in each zone's notify state and is reused for every
/// send of a campaign, so the staging allocation is made once per zone
/// rather than once per message.
#[derive(Debug, Default)]
pub struct SigningContext {
    /// Staging space for the data the MAC is computed over.
    scratch: Vec<u8>,
}

//------------ sign_request --------------------------------------------------

/// Signs the message in `packet` with `key`, appending a TSIG record.
///
/// The buffer must be in write mode containing the complete message; the
/// header's ID must already be set since it is covered by the signature.
/// Bumps the additional count.
pub fn sign_request(
    packet: &mut PacketBuf,
    ctx: &mut SigningContext,
    key: &Key,
) -> Result<(), ShortBuf> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let now = now.to_be_bytes();
    // The time signed field is 48 bits wide.
    let time48 = &now[2..8];

    // The MAC covers the message followed by the TSIG variables: key
    // name, class, ttl, algorithm name, time signed, fudge, error, and
    // other data (RFC 2845, section 3.4).
    ctx.scratch.clear();
    ctx.scratch.extend_from_slice(packet.written());
    ctx.scratch.extend_from_slice(key.name.as_wire());
    ctx.scratch.extend_from_slice(&Class::ANY.to_int().to_be_bytes());
    ctx.scratch.extend_from_slice(&0u32.to_be_bytes());
    ctx.scratch.extend_from_slice(key.algorithm.wire_name());
    ctx.scratch.extend_from_slice(time48);
    ctx.scratch.extend_from_slice(&TSIG_FUDGE.to_be_bytes());
    ctx.scratch.extend_from_slice(&0u16.to_be_bytes());
    ctx.scratch.extend_from_slice(&0u16.to_be_bytes());
    let mac = hmac::sign(&key.key, &ctx.scratch);
    let mac = mac.as_ref();

    let original_id = packet.id();
    key.name.compose(packet)?;
    packet.write_u16(Rtype::TSIG.to_int())?;
    packet.write_u16(Class::ANY.to_int())?;
    packet.write_u32(0)?;
    packet.write_len_prefixed(|buf| {
        buf.write_slice(key.algorithm.wire_name())?;
        buf.write_slice(time48)?;
        buf.write_u16(TSIG_FUDGE)?;
        buf.write_u16(mac.len() as u16)?;
        buf.write_slice(mac)?;
        buf.write_u16(original_id)?;
        buf.write_u16(0)?;
        buf.write_u16(0)
    })?;
    let count = packet.arcount();
    packet.set_arcount(count + 1);
    Ok(())
}

//------------ UnknownAlgorithm ----------------------------------------------

/// A TSIG algorithm name was not recognized.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UnknownAlgorithm;

impl fmt::Display for UnknownAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("unknown TSIG algorithm")
    }
}

impl std::error::Error for UnknownAlgorithm {}

//============ Testing =======================================================
