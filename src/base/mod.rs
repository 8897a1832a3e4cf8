//! Fundamental DNS types for the notify subsystem.

pub mod iana;
pub mod name;
pub mod soa;
pub mod wire;

pub use self::name::ZoneName;
pub use self::soa::Soa;
pub use self::wire::PacketBuf;
