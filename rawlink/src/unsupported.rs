//! Fallback backend for platforms without raw frame support; opening
//! always fails and the server falls back to layer-3 broadcast.

use std::io::{self, Write};

use eui48::MacAddress;

pub struct RawLink;

impl RawLink {
    pub fn open(_iface: &str) -> io::Result<RawLink> {
        Err(io::Error::new(
            io::ErrorKind::Other,
            "raw frame injection is not supported on this platform",
        ))
    }

    pub fn hardware_address(&self) -> MacAddress {
        MacAddress::default()
    }
}

impl Write for RawLink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::Other,
            "raw frame injection is not supported on this platform",
        ))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
