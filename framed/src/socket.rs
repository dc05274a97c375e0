use std::net::SocketAddr;

use futures::task;
use futures::{Async, AsyncSink, Poll, Sink, StartSend, Stream};
use net2::UdpBuilder;
use tokio::io;
use tokio::net::UdpSocket;
use tokio::reactor::Handle;

use protocol::{DecodeError, Packet};

const BUFFER_READ_CAPACITY: usize = 2048;

/// A bound UDP socket framing DHCP packets in both directions.
///
/// Decoding happens on receive; a packet that fails to parse is yielded as
/// an error alongside its source address so the caller can penalise the
/// sender without tearing the stream down.
pub struct DhcpFramed {
    socket: UdpSocket,
    buf_read: Vec<u8>,

    pending: Option<(SocketAddr, Vec<u8>)>,
    send_attempts: u8,
}

impl DhcpFramed {
    /// Binds to `addr` with `SO_BROADCAST` set.
    ///
    /// # Errors
    /// `io::Error` on socket construction or bind failure; binding errors
    /// are fatal at startup by design.
    pub fn new(addr: SocketAddr, reuse_addr: bool, reuse_port: bool) -> io::Result<Self> {
        let socket = UdpBuilder::new_v4()?;
        if reuse_addr {
            socket.reuse_address(true)?;
        }
        #[cfg(target_os = "linux")]
        {
            if reuse_port {
                use net2::unix::UnixUdpBuilderExt;
                socket.reuse_port(true)?;
            }
        }
        #[cfg(not(target_os = "linux"))]
        {
            let _ = reuse_port;
        }

        let socket = socket.bind(addr)?;
        let socket = UdpSocket::from_std(socket, &Handle::default())?;
        socket.set_broadcast(true)?;

        Ok(DhcpFramed {
            socket,
            buf_read: vec![0u8; BUFFER_READ_CAPACITY],

            pending: None,
            send_attempts: 0,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl Stream for DhcpFramed {
    type Item = (SocketAddr, Result<Packet, DecodeError>);
    type Error = io::Error;

    fn poll(&mut self) -> Poll<Option<Self::Item>, Self::Error> {
        let (amount, addr) = try_ready!(self.socket.poll_recv_from(&mut self.buf_read));
        Ok(Async::Ready(Some((
            addr,
            Packet::from_bytes(&self.buf_read[..amount]),
        ))))
    }
}

impl Sink for DhcpFramed {
    type SinkItem = (SocketAddr, Packet);
    type SinkError = io::Error;

    fn start_send(&mut self, item: Self::SinkItem) -> StartSend<Self::SinkItem, io::Error> {
        if self.pending.is_some() {
            self.poll_complete()?;
            if self.pending.is_some() {
                return Ok(AsyncSink::NotReady(item));
            }
        }

        let (addr, packet) = item;
        self.pending = Some((addr, packet.to_bytes()));
        self.send_attempts = 0;
        self.poll_complete()?;

        Ok(AsyncSink::Ready)
    }

    fn poll_complete(&mut self) -> Poll<(), io::Error> {
        let outcome = match self.pending {
            None => return Ok(Async::Ready(())),
            Some((addr, ref data)) => match self.socket.poll_send_to(data, &addr) {
                Ok(Async::Ready(sent)) => Ok(sent == data.len()),
                Ok(Async::NotReady) => return Ok(Async::NotReady),
                Err(error) => Err(error),
            },
        };
        match outcome {
            Ok(true) => {
                self.pending = None;
                self.send_attempts = 0;
                Ok(Async::Ready(()))
            }
            Ok(false) => {
                self.pending = None;
                Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "Failed to write entire datagram to socket",
                ))
            }
            Err(error) => {
                // One retry on the next wakeup, then the datagram is
                // dropped.
                if self.send_attempts == 0 {
                    self.send_attempts = 1;
                    task::current().notify();
                    Ok(Async::NotReady)
                } else {
                    self.pending = None;
                    Err(error)
                }
            }
        }
    }

    fn close(&mut self) -> Poll<(), io::Error> {
        try_ready!(self.poll_complete());
        Ok(Async::Ready(()))
    }
}
