//! Domain names as zone identities.
//!
//! The notify subsystem only ever deals with complete, owned domain names:
//! the apexes of the zones it is configured for and the names of TSIG keys.
//! [`ZoneName`] therefore is a deliberately small type: an owned,
//! uncompressed wire-format name, stored with all letters lowercased so
//! that comparison and ordering are case-insensitive.

use core::fmt;
use core::str::FromStr;
use super::wire::{PacketBuf, ShortBuf};

//------------ ZoneName ------------------------------------------------------

/// An absolute domain name in uncompressed wire format.
///
/// The name is kept in its canonical lowercase form. Equality and ordering
/// operate on the stored octets, which makes the type usable as the key of
/// the notify registry.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ZoneName {
    /// The wire format octets, ending in the root label.
    octets: Box<[u8]>,
}

impl ZoneName {
    /// The maximum length of a wire format name.
    pub const MAX_LEN: usize = 255;

    /// The maximum length of a single label.
    const MAX_LABEL_LEN: usize = 63;

    /// Creates the root name.
    pub fn root() -> Self {
        ZoneName {
            octets: Box::new([0]),
        }
    }

    /// Creates a name from its wire format octets.
    ///
    /// The octets must be a complete, uncompressed name ending in the root
    /// label. Letters are lowercased on the way in.
    pub fn from_wire(octets: &[u8]) -> Result<Self, NameError> {
        if octets.len() > Self::MAX_LEN {
            return Err(NameError::LongName);
        }
        let mut pos = 0;
        loop {
            let len = match octets.get(pos) {
                Some(&len) => usize::from(len),
                None => return Err(NameError::ShortName),
            };
            if len == 0 {
                if pos + 1 != octets.len() {
                    return Err(NameError::TrailingData);
                }
                break;
            }
            if len > Self::MAX_LABEL_LEN {
                return Err(NameError::LongLabel);
            }
            pos += len + 1;
        }
        Ok(ZoneName {
            octets: octets.to_ascii_lowercase().into_boxed_slice(),
        })
    }

    /// Returns the wire format octets of the name.
    pub fn as_wire(&self) -> &[u8] {
        &self.octets
    }

    /// Returns the length of the name in wire format.
    pub fn wire_len(&self) -> usize {
        self.octets.len()
    }

    /// Appends the name to a packet buffer.
    pub fn compose(&self, target: &mut PacketBuf) -> Result<(), ShortBuf> {
        target.write_slice(&self.octets)
    }

    /// Returns an iterator over the labels of the name.
    fn iter_labels(&self) -> impl Iterator<Item = &[u8]> {
        LabelIter {
            octets: &self.octets,
            pos: 0,
        }
    }
}

//--- FromStr

impl FromStr for ZoneName {
    type Err = NameError;

    /// Parses a name from its dotted textual representation.
    ///
    /// Both `"example.com"` and `"example.com."` denote the same absolute
    /// name; the empty string and `"."` denote the root. Escape sequences
    /// are not supported – zone apexes and key names come from
    /// configuration, not from zone files.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_suffix('.').unwrap_or(s);
        if s.is_empty() {
            return Ok(Self::root());
        }
        let mut octets = Vec::with_capacity(s.len() + 2);
        for label in s.split('.') {
            if label.is_empty() {
                return Err(NameError::EmptyLabel);
            }
            if label.len() > Self::MAX_LABEL_LEN {
                return Err(NameError::LongLabel);
            }
            if !label.is_ascii() {
                return Err(NameError::BadSymbol);
            }
            octets.push(label.len() as u8);
            octets.extend(label.bytes().map(|ch| ch.to_ascii_lowercase()));
        }
        octets.push(0);
        if octets.len() > Self::MAX_LEN {
            return Err(NameError::LongName);
        }
        Ok(ZoneName {
            octets: octets.into_boxed_slice(),
        })
    }
}

//--- Display

impl fmt::Display for ZoneName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for label in self.iter_labels() {
            if !first {
                f.write_str(".")?;
            }
            first = false;
            for &ch in label {
                if ch.is_ascii_graphic() && ch != b'.' {
                    write!(f, "{}", ch as char)?;
                } else {
                    write!(f, "\\{:03}", ch)?;
                }
            }
        }
        if first {
            f.write_str(".")?;
        }
        Ok(())
    }
}

//------------ LabelIter -----------------------------------------------------

/// An iterator over the labels of a name, excluding the root label.
struct LabelIter<'a> {
    octets: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for LabelIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let len = usize::from(*self.octets.get(self.pos)?);
        if len == 0 {
            return None;
        }
        let start = self.pos + 1;
        self.pos = start + len;
        self.octets.get(start..start + len)
    }
}

//------------ NameError -----------------------------------------------------

/// A domain name was rejected.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NameError {
    /// The name exceeds the maximum length of 255 octets.
    LongName,

    /// A label exceeds the maximum length of 63 octets.
    LongLabel,

    /// The name contains an empty non-root label.
    EmptyLabel,

    /// The name contains a non-ASCII symbol.
    BadSymbol,

    /// The wire format ended before the root label.
    ShortName,

    /// The wire format continues past the root label.
    TrailingData,
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            NameError::LongName => "long domain name",
            NameError::LongLabel => "long label",
            NameError::EmptyLabel => "empty label",
            NameError::BadSymbol => "illegal symbol in domain name",
            NameError::ShortName => "incomplete domain name",
            NameError::TrailingData => "trailing data after domain name",
        })
    }
}

impl std::error::Error for NameError {}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn from_str() {
        let name: ZoneName = "example.com".parse().unwrap();
        assert_eq!(name.as_wire(), b"\x07example\x03com\x00");
        assert_eq!(name.to_string(), "example.com");

        let dotted: ZoneName = "example.com.".parse().unwrap();
        assert_eq!(name, dotted);

        let root: ZoneName = ".".parse().unwrap();
        assert_eq!(root, ZoneName::root());
        assert_eq!(root.to_string(), ".");
        assert_eq!("".parse::<ZoneName>().unwrap(), ZoneName::root());
    }

    #[test]
    fn from_str_rejects() {
        assert_eq!(
            "example..com".parse::<ZoneName>(),
            Err(NameError::EmptyLabel)
        );
        assert_eq!(
            "exämple.com".parse::<ZoneName>(),
            Err(NameError::BadSymbol)
        );
        let long = "a".repeat(64);
        assert_eq!(long.parse::<ZoneName>(), Err(NameError::LongLabel));
        let too_long = ["aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"; 9].join(".");
        assert_eq!(too_long.parse::<ZoneName>(), Err(NameError::LongName));
    }

    #[test]
    fn case_insensitive() {
        let lower: ZoneName = "example.com".parse().unwrap();
        let upper: ZoneName = "EXAMPLE.COM".parse().unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn from_wire() {
        let name = ZoneName::from_wire(b"\x07Example\x03CoM\x00").unwrap();
        assert_eq!(name.as_wire(), b"\x07example\x03com\x00");
        assert!(ZoneName::from_wire(b"\x07example").is_err());
        assert!(ZoneName::from_wire(b"\x00\x00").is_err());
    }
}
