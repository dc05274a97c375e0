//! Raw layer-2 frame injection.
//!
//! Exposes a single `RawLink` type that opens a write-only raw socket on a
//! named interface and reports the interface's hardware address, so callers
//! can source Ethernet frames from it. The OS backends are selected at
//! compile time.

extern crate eui48;
extern crate libc;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::RawLink;

#[cfg(any(
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "macos"
))]
mod bsd;
#[cfg(any(
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "macos"
))]
pub use bsd::RawLink;

#[cfg(not(any(
    target_os = "linux",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "macos"
)))]
mod unsupported;
#[cfg(not(any(
    target_os = "linux",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "macos"
)))]
pub use unsupported::RawLink;
