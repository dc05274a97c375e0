//! The socket-facing server loop.
//!
//! One future drives everything: the control channel, the one-second
//! suspender tick, pending sends, and reception on the DHCP and PXE
//! sockets. Packets are processed inline on this task, which keeps
//! responses to any one client in receive order; the only blocking call
//! on the path is the backend lookup. Raw frame writes, which may stall
//! on a busy device, are pushed onto a small thread pool.

use std::io::Write;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use eui48::MacAddress;
use futures::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::{Async, AsyncSink, Future, Poll, Sink, Stream};
use futures_cpupool::CpuPool;
use tokio::io;
use tokio::timer::{Delay, Interval};

use framed::DhcpFramed;
use protocol::{DecodeError, Packet};
use rawlink::RawLink;

use backend::Backend;
use cache::DefinitionCache;
use config::Config;
use engine::{Engine, PortClass, Reply};
use hooks::Hooks;
use netlink::{self, Destination};
use suspend::Suspender;

/// How long a failed raw write waits before its single retry.
const RAW_SEND_RETRY_DELAY_MS: u64 = 50;

/// Semantic events delivered by the process supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Drain, flush the cache, reinitialise the backend, rerun callbacks.
    Reload,
    /// Flush pending sends within the grace period, then resolve.
    Shutdown,
}

/// Sends raw frames without stalling the socket task.
struct RawResponder {
    link: Arc<Mutex<RawLink>>,
    pool: CpuPool,
    hardware_address: MacAddress,
}

impl RawResponder {
    fn send(&self, frame: Vec<u8>, destination: MacAddress) {
        let link = self.link.to_owned();
        self.pool
            .spawn_fn(move || {
                let mut link = link.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                if let Err(error) = link.write_all(&frame) {
                    warn!("Raw send to {} failed ({}); retrying once", destination, error);
                    thread::sleep(Duration::from_millis(RAW_SEND_RETRY_DELAY_MS));
                    if let Err(error) = link.write_all(&frame) {
                        warn!("Raw send to {} dropped: {}", destination, error);
                    }
                }
                Ok::<(), ()>(())
            })
            .forget();
    }
}

/// The server future; resolves on shutdown.
pub struct Server {
    config: Arc<Config>,
    engine: Engine,
    suspender: Arc<Suspender>,
    dhcp: DhcpFramed,
    pxe: Option<DhcpFramed>,
    raw: Option<RawResponder>,
    ticker: Interval,
    control: UnboundedReceiver<ControlEvent>,
    reload_callbacks: Vec<Box<dyn Fn() + Send>>,
    shutdown: Option<Delay>,
}

impl Server {
    /// Binds the sockets and assembles the engine around the given
    /// backend and hooks. Bind failures are fatal by design.
    ///
    /// Returns the server future and the control handle the supervisor
    /// uses to deliver `reload` and `shutdown`.
    pub fn new(
        config: Config,
        backend: Arc<dyn Backend>,
        hooks: Arc<dyn Hooks>,
    ) -> io::Result<(Self, UnboundedSender<ControlEvent>)> {
        let config = Arc::new(config);
        let cache = Arc::new(DefinitionCache::new(backend, config.cache.to_owned()));
        let suspender = Arc::new(Suspender::new(
            config.enable_suspend,
            config.suspend_threshold,
        ));
        let engine = Engine::new(
            config.to_owned(),
            cache,
            suspender.to_owned(),
            hooks,
        );

        let any = IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0));
        let dhcp = DhcpFramed::new(SocketAddr::new(any, config.server_port), true, true)?;
        let pxe = match config.proxy_port {
            Some(port) => Some(DhcpFramed::new(SocketAddr::new(any, port), true, true)?),
            None => None,
        };

        let raw = match config.response_interface {
            Some(ref iface) => {
                let link = RawLink::open(iface)?;
                let hardware_address = link.hardware_address();
                info!("Raw responses leave {} as {}", iface, hardware_address);
                Some(RawResponder {
                    link: Arc::new(Mutex::new(link)),
                    pool: CpuPool::new(1),
                    hardware_address,
                })
            }
            None => None,
        };

        let ticker = Interval::new(
            Instant::now() + Duration::from_secs(1),
            Duration::from_secs(1),
        );
        let (sender, control) = mpsc::unbounded();

        info!(
            "Serving {} on port {} (PXE: {:?})",
            config.server_ip, config.server_port, config.proxy_port
        );

        Ok((
            Server {
                config,
                engine,
                suspender,
                dhcp,
                pxe,
                raw,
                ticker,
                control,
                reload_callbacks: Vec::new(),
                shutdown: None,
            },
            sender,
        ))
    }

    /// Registers a callback to run after every reinitialisation.
    pub fn register_reload_callback<F: Fn() + Send + 'static>(&mut self, callback: F) {
        self.reload_callbacks.push(Box::new(callback));
    }

    fn reload(&mut self) {
        info!("Reinitialising");
        if let Err(error) = self.engine.reinitialise() {
            error!("Reinitialisation failed: {}", error);
        }
        for callback in &self.reload_callbacks {
            callback();
        }
    }

    fn begin_shutdown(&mut self) {
        if self.shutdown.is_none() {
            info!(
                "Shutting down; draining for up to {} seconds",
                self.config.shutdown_grace
            );
            self.shutdown = Some(Delay::new(
                Instant::now() + Duration::from_secs(self.config.shutdown_grace),
            ));
        }
    }

    fn process(
        &mut self,
        source: SocketAddr,
        result: Result<Packet, DecodeError>,
        port: PortClass,
    ) {
        let packet = match result {
            Ok(packet) => packet,
            Err(error) => {
                warn!("Invalid packet from {}: {}", source, error);
                self.engine.penalise_source(source);
                return;
            }
        };

        if let Some(reply) = self.engine.handle(packet, source, port) {
            self.transmit(reply);
        }
    }

    fn transmit(&mut self, reply: Reply) {
        let (destination, source_port) =
            netlink::choose_destination(&reply, &self.config, self.raw.is_some());
        match destination {
            Destination::Unicast(ip, port) => {
                self.send_udp(reply, SocketAddr::new(IpAddr::V4(ip), port));
            }
            Destination::Broadcast(port) => {
                let broadcast = IpAddr::V4(Ipv4Addr::new(255, 255, 255, 255));
                self.send_udp(reply, SocketAddr::new(broadcast, port));
            }
            Destination::Hardware { mac, ip, port } => {
                if let Some(ref raw) = self.raw {
                    let payload = reply.packet.to_bytes();
                    let frame = netlink::assemble_frame(
                        &raw.hardware_address,
                        &mac,
                        &self.config.response_interface_qtags,
                        self.config.server_ip,
                        ip,
                        source_port,
                        port,
                        &payload,
                    );
                    trace!("Sending {} bytes to {} via the raw link", frame.len(), mac);
                    raw.send(frame, mac);
                }
            }
        }
    }

    fn send_udp(&mut self, reply: Reply, destination: SocketAddr) {
        let result = {
            let socket = match (reply.port, self.pxe.as_mut()) {
                (PortClass::Proxy, Some(pxe)) => pxe,
                _ => &mut self.dhcp,
            };
            socket.start_send((destination, reply.packet))
        };
        match result {
            Ok(AsyncSink::Ready) => trace!("Response queued for {}", destination),
            Ok(AsyncSink::NotReady(_)) => {
                warn!("Send queue full; dropping the response to {}", destination);
            }
            Err(error) => warn!("Unable to send to {}: {}", destination, error),
        }
    }
}

impl Future for Server {
    type Item = ();
    type Error = io::Error;

    fn poll(&mut self) -> Poll<(), io::Error> {
        loop {
            loop {
                match self.control.poll() {
                    Ok(Async::Ready(Some(ControlEvent::Reload))) => self.reload(),
                    Ok(Async::Ready(Some(ControlEvent::Shutdown))) => self.begin_shutdown(),
                    Ok(Async::Ready(None)) | Ok(Async::NotReady) | Err(()) => break,
                }
            }

            if let Some(ref mut deadline) = self.shutdown {
                let mut flushed = match self.dhcp.poll_complete() {
                    Ok(state) => state.is_ready(),
                    Err(_) => true,
                };
                if let Some(ref mut pxe) = self.pxe {
                    flushed = match pxe.poll_complete() {
                        Ok(state) => state.is_ready(),
                        Err(_) => true,
                    } && flushed;
                }
                if flushed {
                    info!("Pending responses drained; shutdown complete");
                    return Ok(Async::Ready(()));
                }
                return match deadline.poll() {
                    Ok(Async::Ready(_)) => {
                        warn!("Shutdown grace elapsed with responses pending");
                        Ok(Async::Ready(()))
                    }
                    Ok(Async::NotReady) => Ok(Async::NotReady),
                    Err(error) => {
                        warn!("Shutdown timer failed: {}", error);
                        Ok(Async::Ready(()))
                    }
                };
            }

            match self.ticker.poll() {
                Ok(Async::Ready(_)) => {
                    self.suspender.tick();
                    continue;
                }
                Ok(Async::NotReady) => {}
                Err(error) => warn!("Interval timer failed: {}", error),
            }

            // Flush before accepting more work; a full send slot means the
            // next response would be dropped.
            match self.dhcp.poll_complete() {
                Ok(Async::Ready(())) => {}
                Ok(Async::NotReady) => return Ok(Async::NotReady),
                Err(error) => warn!("Socket error while sending: {}", error),
            }
            let pxe_flush = match self.pxe {
                Some(ref mut pxe) => pxe.poll_complete(),
                None => Ok(Async::Ready(())),
            };
            match pxe_flush {
                Ok(Async::Ready(())) => {}
                Ok(Async::NotReady) => return Ok(Async::NotReady),
                Err(error) => warn!("Socket error while sending (PXE): {}", error),
            }

            let mut activity = false;

            match self.dhcp.poll() {
                Ok(Async::Ready(Some((source, result)))) => {
                    self.process(source, result, PortClass::Server);
                    activity = true;
                }
                Ok(Async::Ready(None)) | Ok(Async::NotReady) => {}
                Err(error) => {
                    warn!("Socket error while receiving: {}", error);
                    activity = true;
                }
            }

            let pxe_item = match self.pxe {
                Some(ref mut pxe) => pxe.poll(),
                None => Ok(Async::NotReady),
            };
            match pxe_item {
                Ok(Async::Ready(Some((source, result)))) => {
                    self.process(source, result, PortClass::Proxy);
                    activity = true;
                }
                Ok(Async::Ready(None)) | Ok(Async::NotReady) => {}
                Err(error) => {
                    warn!("Socket error while receiving (PXE): {}", error);
                    activity = true;
                }
            }

            if !activity {
                return Ok(Async::NotReady);
            }
        }
    }
}
