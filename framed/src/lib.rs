//! UDP socket framing for DHCP packets.

mod socket;

#[macro_use]
extern crate futures;
extern crate net2;
extern crate tokio;

extern crate protocol;

pub use socket::DhcpFramed;
