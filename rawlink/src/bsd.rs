//! /dev/bpf backend.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::process::Command;

use eui48::MacAddress;
use libc;

// #define BIOCSETIF _IOW('B', 108, struct ifreq)
const BIOCSETIF: libc::c_ulong = 0x8020426c;

#[repr(C)]
struct IfReq {
    ifr_name: [libc::c_char; 16],
    ifr_ifru: [u8; 16],
}

impl IfReq {
    fn from_name(iface: &str) -> io::Result<IfReq> {
        if iface.len() >= 16 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "interface name too long",
            ));
        }
        let mut req = IfReq {
            ifr_name: [0; 16],
            ifr_ifru: [0; 16],
        };
        for (slot, byte) in req.ifr_name.iter_mut().zip(iface.bytes()) {
            *slot = byte as libc::c_char;
        }
        Ok(req)
    }
}

/// A /dev/bpf device associated with one interface.
pub struct RawLink {
    iface: String,
    file: File,
    hardware_address: MacAddress,
}

impl RawLink {
    /// Probes /dev/bpf0.. until a free device is found and associates it
    /// with the named interface.
    pub fn open(iface: &str) -> io::Result<RawLink> {
        let mut i = 0;
        loop {
            let path_str = format!("/dev/bpf{}", i);
            i += 1;
            let path = Path::new(&path_str);
            if !path.exists() {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no free bpf device"));
            }

            let f = OpenOptions::new().read(true).write(true).open(path);
            if let Err(ref e) = f {
                if e.raw_os_error() == Some(libc::EBUSY) {
                    continue;
                }
            }

            let file = f?;
            let mut req = IfReq::from_name(iface)?;
            if unsafe { libc::ioctl(file.as_raw_fd(), BIOCSETIF, &mut req) } < 0 {
                return Err(io::Error::last_os_error());
            }

            return Ok(RawLink {
                iface: iface.to_owned(),
                hardware_address: interface_mac(iface)?,
                file,
            });
        }
    }

    /// The hardware address of the bound interface, used as the source MAC
    /// of injected frames.
    pub fn hardware_address(&self) -> MacAddress {
        self.hardware_address
    }
}

impl Write for RawLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Re-associate on each write; the device can be stolen between
        // sends by another BIOCSETIF holder.
        let mut req = IfReq::from_name(&self.iface)?;
        if unsafe { libc::ioctl(self.file.as_raw_fd(), BIOCSETIF, &mut req) } < 0 {
            return Err(io::Error::last_os_error());
        }
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Portable-enough retrieval of an interface MAC by parsing ifconfig.
fn interface_mac(iface: &str) -> io::Result<MacAddress> {
    let output = Command::new("/sbin/ifconfig").arg(iface).output()?;
    let text = String::from_utf8_lossy(&output.stdout);
    for line in text.lines() {
        let mut parts = line.split_whitespace();
        if let (Some(keyword), Some(address)) = (parts.next(), parts.next()) {
            if keyword == "ether" || keyword == "lladdr" {
                if let Ok(mac) = MacAddress::parse_str(address) {
                    return Ok(mac);
                }
            }
        }
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        "no hardware address in ifconfig output",
    ))
}
