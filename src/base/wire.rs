//! The scratch packet buffer.
//!
//! [`PacketBuf`] stages one DNS message at a time, either on its way out or
//! as just received. It follows the classic two-mode discipline: after
//! [`clear`][PacketBuf::clear] the buffer is in write mode and data is
//! appended at the write position; [`flip`][PacketBuf::flip] turns the
//! written data into the readable message. One buffer is shared by all
//! zones of a notify run – it is handed into the event handler by reference
//! and must never be retained across ticks.
//!
//! The header accessors operate on the fixed twelve octet message header
//! at the start of the buffer regardless of the current mode. Callers
//! reading a received message must check [`len`][PacketBuf::len] against
//! [`HEADER_LEN`] before consulting them.

use core::fmt;
use std::io;
use super::iana::{Class, Opcode, Rcode, Rtype};
use super::name::ZoneName;
use super::soa::Soa;

/// The length of a DNS message header.
pub const HEADER_LEN: usize = 12;

//------------ PacketBuf -----------------------------------------------------

/// A fixed-capacity buffer for staging DNS messages.
pub struct PacketBuf {
    /// The octets of the buffer.
    octets: Vec<u8>,

    /// The read or write position.
    pos: usize,

    /// The end of readable data in read mode, the capacity in write mode.
    limit: usize,
}

impl PacketBuf {
    /// The default capacity, ample for any NOTIFY exchange.
    const DEFAULT_CAPACITY: usize = 4096;

    /// Creates a new buffer with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates a new buffer with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if the capacity is smaller than a message header.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity >= HEADER_LEN);
        PacketBuf {
            octets: vec![0; capacity],
            pos: 0,
            limit: capacity,
        }
    }

    /// Resets the buffer into write mode.
    pub fn clear(&mut self) {
        self.pos = 0;
        self.limit = self.octets.len();
    }

    /// Switches the buffer from write mode into read mode.
    ///
    /// The data written so far becomes the readable message.
    pub fn flip(&mut self) {
        self.limit = self.pos;
        self.pos = 0;
    }

    /// Returns the readable message.
    ///
    /// In write mode this is the whole capacity; call
    /// [`flip`][Self::flip] first.
    pub fn as_slice(&self) -> &[u8] {
        &self.octets[..self.limit]
    }

    /// Returns the data written so far in write mode.
    pub fn written(&self) -> &[u8] {
        &self.octets[..self.pos]
    }

    /// Returns the length of the readable message.
    pub fn len(&self) -> usize {
        self.limit
    }

    /// Returns whether the readable message is empty.
    pub fn is_empty(&self) -> bool {
        self.limit == 0
    }

    /// Fills the buffer with one received datagram.
    ///
    /// The closure receives the entire buffer space and returns the length
    /// of the datagram it placed there. On success the buffer ends up in
    /// read mode holding exactly that datagram.
    pub fn fill<F>(&mut self, op: F) -> io::Result<usize>
    where
        F: FnOnce(&mut [u8]) -> io::Result<usize>,
    {
        self.clear();
        let len = op(&mut self.octets[..])?;
        self.pos = 0;
        self.limit = len;
        Ok(len)
    }
}

/// # Appending Data
///
impl PacketBuf {
    /// Appends a single octet.
    pub fn write_u8(&mut self, value: u8) -> Result<(), ShortBuf> {
        self.write_slice(&[value])
    }

    /// Appends a big-endian 16 bit value.
    pub fn write_u16(&mut self, value: u16) -> Result<(), ShortBuf> {
        self.write_slice(&value.to_be_bytes())
    }

    /// Appends a big-endian 32 bit value.
    pub fn write_u32(&mut self, value: u32) -> Result<(), ShortBuf> {
        self.write_slice(&value.to_be_bytes())
    }

    /// Appends a slice of octets.
    pub fn write_slice(&mut self, data: &[u8]) -> Result<(), ShortBuf> {
        if self.limit - self.pos < data.len() {
            return Err(ShortBuf);
        }
        self.octets[self.pos..self.pos + data.len()].copy_from_slice(data);
        self.pos += data.len();
        Ok(())
    }

    /// Appends data prefixed by its 16 bit length.
    ///
    /// Writes a length placeholder, runs the closure, and backfills the
    /// placeholder with the length of whatever the closure appended.
    pub fn write_len_prefixed<F>(&mut self, op: F) -> Result<(), ShortBuf>
    where
        F: FnOnce(&mut Self) -> Result<(), ShortBuf>,
    {
        self.write_u16(0)?;
        let start = self.pos;
        op(self)?;
        let len = u16::try_from(self.pos - start).map_err(|_| ShortBuf)?;
        self.octets[start - 2..start].copy_from_slice(&len.to_be_bytes());
        Ok(())
    }
}

/// # Header Access
///
impl PacketBuf {
    /// Returns the ID field of the header.
    pub fn id(&self) -> u16 {
        u16::from_be_bytes([self.octets[0], self.octets[1]])
    }

    /// Sets the ID field of the header.
    pub fn set_id(&mut self, value: u16) {
        self.octets[..2].copy_from_slice(&value.to_be_bytes());
    }

    /// Returns the value of the QR bit.
    ///
    /// An unset bit marks a query, a set bit a response.
    pub fn qr(&self) -> bool {
        self.octets[2] & 0x80 != 0
    }

    /// Sets the value of the QR bit.
    pub fn set_qr(&mut self, set: bool) {
        if set {
            self.octets[2] |= 0x80;
        } else {
            self.octets[2] &= !0x80;
        }
    }

    /// Returns the opcode of the message.
    pub fn opcode(&self) -> Opcode {
        Opcode::from_int((self.octets[2] >> 3) & 0x0F)
    }

    /// Sets the opcode of the message.
    pub fn set_opcode(&mut self, opcode: Opcode) {
        self.octets[2] =
            (self.octets[2] & 0b1000_0111) | (opcode.to_int() << 3);
    }

    /// Returns the value of the AA bit.
    pub fn aa(&self) -> bool {
        self.octets[2] & 0x04 != 0
    }

    /// Sets the value of the AA bit.
    pub fn set_aa(&mut self, set: bool) {
        if set {
            self.octets[2] |= 0x04;
        } else {
            self.octets[2] &= !0x04;
        }
    }

    /// Returns the response code of the message.
    pub fn rcode(&self) -> Rcode {
        Rcode::from_int(self.octets[3] & 0x0F)
    }

    /// Sets the response code of the message.
    pub fn set_rcode(&mut self, rcode: Rcode) {
        self.octets[3] = (self.octets[3] & 0xF0) | rcode.to_int();
    }

    /// Returns the number of questions in the message.
    pub fn qdcount(&self) -> u16 {
        u16::from_be_bytes([self.octets[4], self.octets[5]])
    }

    /// Sets the number of questions in the message.
    pub fn set_qdcount(&mut self, value: u16) {
        self.octets[4..6].copy_from_slice(&value.to_be_bytes());
    }

    /// Returns the number of answer records in the message.
    pub fn ancount(&self) -> u16 {
        u16::from_be_bytes([self.octets[6], self.octets[7]])
    }

    /// Sets the number of answer records in the message.
    pub fn set_ancount(&mut self, value: u16) {
        self.octets[6..8].copy_from_slice(&value.to_be_bytes());
    }

    /// Returns the number of additional records in the message.
    pub fn arcount(&self) -> u16 {
        u16::from_be_bytes([self.octets[10], self.octets[11]])
    }

    /// Sets the number of additional records in the message.
    pub fn set_arcount(&mut self, value: u16) {
        self.octets[10..12].copy_from_slice(&value.to_be_bytes());
    }
}

/// # Message Construction
///
impl PacketBuf {
    /// Resets the buffer and starts a query for the given question.
    ///
    /// Writes a zeroed header with a question count of one followed by the
    /// question section. Header fields such as the ID and opcode are set
    /// through the header accessors afterwards.
    pub fn start_query(
        &mut self,
        qname: &ZoneName,
        qtype: Rtype,
        qclass: Class,
    ) -> Result<(), ShortBuf> {
        self.clear();
        self.write_slice(&[0; HEADER_LEN])?;
        self.set_qdcount(1);
        qname.compose(self)?;
        self.write_u16(qtype.to_int())?;
        self.write_u16(qclass.to_int())
    }

    /// Appends a complete SOA record to the answer section.
    ///
    /// The owner name is written uncompressed. Bumps the answer count.
    pub fn push_soa(
        &mut self,
        owner: &ZoneName,
        soa: &Soa,
    ) -> Result<(), ShortBuf> {
        owner.compose(self)?;
        self.write_u16(Rtype::SOA.to_int())?;
        self.write_u16(Class::IN.to_int())?;
        self.write_u32(soa.ttl())?;
        self.write_len_prefixed(|buf| soa.compose_rdata(buf))?;
        let count = self.ancount();
        self.set_ancount(count + 1);
        Ok(())
    }
}

//--- Default

impl Default for PacketBuf {
    fn default() -> Self {
        Self::new()
    }
}

//--- Debug

impl fmt::Debug for PacketBuf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PacketBuf")
            .field("pos", &self.pos)
            .field("limit", &self.limit)
            .field("capacity", &self.octets.len())
            .finish()
    }
}

//------------ ShortBuf ------------------------------------------------------

/// The buffer is too short to append the data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ShortBuf;

impl fmt::Display for ShortBuf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("buffer size exceeded")
    }
}

impl std::error::Error for ShortBuf {}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn header_bits() {
        let mut buf = PacketBuf::new();
        buf.clear();
        buf.write_slice(&[0; HEADER_LEN]).unwrap();
        buf.set_id(0x1234);
        buf.set_opcode(Opcode::Notify);
        buf.set_qr(true);
        buf.set_aa(true);
        buf.set_rcode(Rcode::NotImp);
        assert_eq!(buf.id(), 0x1234);
        assert_eq!(buf.opcode(), Opcode::Notify);
        assert!(buf.qr());
        assert!(buf.aa());
        assert_eq!(buf.rcode(), Rcode::NotImp);

        buf.set_qr(false);
        assert!(!buf.qr());
        assert_eq!(buf.opcode(), Opcode::Notify);
    }

    #[test]
    fn notify_query() {
        let apex: ZoneName = "example.com".parse().unwrap();
        let mut buf = PacketBuf::new();
        buf.start_query(&apex, Rtype::SOA, Class::IN).unwrap();
        buf.set_opcode(Opcode::Notify);
        buf.set_aa(true);
        buf.flip();

        let msg = buf.as_slice();
        assert_eq!(msg.len(), HEADER_LEN + 13 + 4);
        assert_eq!(buf.qdcount(), 1);
        assert_eq!(buf.ancount(), 0);
        assert_eq!(&msg[HEADER_LEN..HEADER_LEN + 13], b"\x07example\x03com\x00");
        assert_eq!(&msg[HEADER_LEN + 13..], &[0, 6, 0, 1]);
    }

    #[test]
    fn soa_answer() {
        let apex: ZoneName = "example.com".parse().unwrap();
        let soa = Soa::new(
            "ns1.example.com".parse().unwrap(),
            "hostmaster.example.com".parse().unwrap(),
            5,
            3600,
            300,
            86400,
            60,
            3600,
        );
        let mut buf = PacketBuf::new();
        buf.start_query(&apex, Rtype::SOA, Class::IN).unwrap();
        buf.push_soa(&apex, &soa).unwrap();
        buf.flip();

        assert_eq!(buf.ancount(), 1);
        let rdata_len = soa.mname().wire_len() + soa.rname().wire_len() + 20;
        let record_len = apex.wire_len() + 10 + rdata_len;
        assert_eq!(
            buf.len(),
            HEADER_LEN + apex.wire_len() + 4 + record_len
        );
        // The rdata length field sits ten octets into the record, right
        // before the rdata itself.
        let record_start = HEADER_LEN + apex.wire_len() + 4;
        let len_off = record_start + apex.wire_len() + 8;
        let written = u16::from_be_bytes([
            buf.as_slice()[len_off],
            buf.as_slice()[len_off + 1],
        ]);
        assert_eq!(usize::from(written), rdata_len);
    }

    #[test]
    fn fill_and_flip() {
        let mut buf = PacketBuf::new();
        let len = buf
            .fill(|space| {
                space[..3].copy_from_slice(b"abc");
                Ok(3)
            })
            .unwrap();
        assert_eq!(len, 3);
        assert_eq!(buf.as_slice(), b"abc");
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn short_buf() {
        let mut buf = PacketBuf::with_capacity(HEADER_LEN);
        buf.clear();
        buf.write_slice(&[0; HEADER_LEN]).unwrap();
        assert_eq!(buf.write_u8(0), Err(ShortBuf));
    }
}
