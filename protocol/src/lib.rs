//! The DHCP wire-format crate.
//!
//! Provides the mutable [`Packet`](struct.Packet.html) representation of a
//! DHCP message, byte-exact encoding and decoding per RFC 2131/2132, a
//! static registry of option payload types, typed option accessors, and
//! structured sub-codecs for the RFC-specific options.

mod error;
mod v4;

extern crate bytes;
extern crate eui48;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

pub use error::{DecodeError, OptionError, ValidationError};
pub use v4::*;
