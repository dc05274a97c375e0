//! AF_PACKET backend.

use std::ffi::CString;
use std::io::{self, Write};
use std::mem;

use eui48::MacAddress;
use libc;

/// The socket is write-only in practice; binding it to a protocol nothing
/// speaks keeps the kernel from queueing inbound frames on it.
const ETH_P_SNAP: u16 = 0x0005;

/// A raw packet socket bound to one interface.
pub struct RawLink {
    fd: libc::c_int,
    hardware_address: MacAddress,
}

impl RawLink {
    /// Opens and binds a raw socket on the named interface, reading the
    /// interface's hardware address back from the bound socket name.
    ///
    /// # Errors
    /// `io::Error` if the interface does not exist or the socket cannot be
    /// created or bound. Requires `CAP_NET_RAW`.
    pub fn open(iface: &str) -> io::Result<RawLink> {
        let name = CString::new(iface)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "interface name with NUL"))?;
        let index = unsafe { libc::if_nametoindex(name.as_ptr()) };
        if index == 0 {
            return Err(io::Error::last_os_error());
        }

        let fd = unsafe {
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW,
                libc::c_int::from(ETH_P_SNAP.to_be()),
            )
        };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        let mut addr: libc::sockaddr_ll = unsafe { mem::zeroed() };
        addr.sll_family = libc::AF_PACKET as libc::c_ushort;
        addr.sll_protocol = ETH_P_SNAP.to_be();
        addr.sll_ifindex = index as libc::c_int;
        let bound = unsafe {
            libc::bind(
                fd,
                &addr as *const libc::sockaddr_ll as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        if bound < 0 {
            let error = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(error);
        }

        let mut bound_addr: libc::sockaddr_ll = unsafe { mem::zeroed() };
        let mut length = mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t;
        let named = unsafe {
            libc::getsockname(
                fd,
                &mut bound_addr as *mut libc::sockaddr_ll as *mut libc::sockaddr,
                &mut length,
            )
        };
        if named < 0 || bound_addr.sll_halen < 6 {
            let error = io::Error::new(
                io::ErrorKind::Other,
                "no hardware address on the interface",
            );
            unsafe { libc::close(fd) };
            return Err(error);
        }

        let mut octets = [0u8; 6];
        octets.copy_from_slice(&bound_addr.sll_addr[..6]);

        Ok(RawLink {
            fd,
            hardware_address: MacAddress::new(octets),
        })
    }

    /// The hardware address of the bound interface, used as the source MAC
    /// of injected frames.
    pub fn hardware_address(&self) -> MacAddress {
        self.hardware_address
    }
}

impl Write for RawLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let sent = unsafe { libc::send(self.fd, buf.as_ptr() as *const libc::c_void, buf.len(), 0) };
        if sent < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(sent as usize)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for RawLink {
    fn drop(&mut self) {
        unsafe { libc::close(self.fd) };
    }
}
